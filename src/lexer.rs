//! Zero-copy lexer for the target dialect.
//!
//! Hand-scanned rather than regex-driven: the token grammar is small and a
//! manual scan avoids pulling in a regex dependency the teacher doesn't
//! carry. Token ordering and edge cases (line continuation swallowing the
//! trailing underscore, preprocessor-directive vs. date-literal
//! disambiguation, a dropped catch-all for unrecognised characters) are
//! grounded in `original_source/src/lexer.py`.

use crate::token::{Token, TokenKind};

struct Cursor<'src> {
    src: &'src str,
    chars: Vec<(usize, char)>,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'src> Cursor<'src> {
    fn new(src: &'src str) -> Self {
        Self {
            src,
            chars: src.char_indices().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|(_, c)| *c)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).map(|(_, c)| *c)
    }

    fn byte_offset(&self, idx: usize) -> usize {
        self.chars.get(idx).map(|(b, _)| *b).unwrap_or(self.src.len())
    }

    fn slice(&self, start_idx: usize, end_idx: usize) -> &'src str {
        &self.src[self.byte_offset(start_idx)..self.byte_offset(end_idx)]
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn at_crlf_or_lf(&self, idx: usize) -> Option<usize> {
        match self.chars.get(idx).map(|(_, c)| *c) {
            Some('\r') if self.chars.get(idx + 1).map(|(_, c)| *c) == Some('\n') => Some(idx + 2),
            Some('\n') => Some(idx + 1),
            _ => None,
        }
    }
}

/// Lex `source` into a token stream. Never fails: unrecognised characters are
/// silently dropped, matching the original lexer's `MISMATCH` handling.
pub fn lex(source: &str) -> Vec<Token<'_>> {
    let mut cur = Cursor::new(source);
    let mut tokens = Vec::new();

    while let Some(c) = cur.peek() {
        let (line, column) = (cur.line, cur.column);
        let start_idx = cur.pos;

        // Line continuation: run of spaces/tabs immediately followed by `_`
        // then a newline. Consumed entirely, no token emitted.
        if (c == ' ' || c == '\t') && try_line_continuation(&mut cur) {
            continue;
        }

        match c {
            ' ' | '\t' => {
                while matches!(cur.peek(), Some(' ') | Some('\t')) {
                    cur.advance();
                }
                continue;
            }
            '\r' | '\n' => {
                if let Some(next_idx) = cur.at_crlf_or_lf(start_idx) {
                    while cur.pos < next_idx {
                        cur.advance();
                    }
                }
                tokens.push(Token::new(TokenKind::Newline, "\n", line, column));
                continue;
            }
            '\'' => {
                while !matches!(cur.peek(), None | Some('\r') | Some('\n')) {
                    cur.advance();
                }
                let text = cur.slice(start_idx, cur.pos);
                tokens.push(Token::new(TokenKind::Comment, text, line, column));
                continue;
            }
            '"' => {
                cur.advance();
                loop {
                    match cur.peek() {
                        None | Some('\r') | Some('\n') => break,
                        Some('"') => {
                            cur.advance();
                            // `""` inside a string is an escaped quote.
                            if cur.peek() == Some('"') {
                                cur.advance();
                            } else {
                                break;
                            }
                        }
                        Some(_) => {
                            cur.advance();
                        }
                    }
                }
                let text = cur.slice(start_idx, cur.pos);
                tokens.push(Token::new(TokenKind::Str, text, line, column));
                continue;
            }
            '#' => {
                let next = cur.peek_at(1);
                if matches!(next, Some(c2) if c2.is_ascii_alphabetic() || c2 == '_') {
                    cur.advance();
                    while matches!(cur.peek(), Some(c2) if c2.is_ascii_alphanumeric() || c2 == '_')
                    {
                        cur.advance();
                    }
                    let text = cur.slice(start_idx, cur.pos);
                    tokens.push(Token::new(TokenKind::Preproc, text, line, column));
                } else {
                    // Date literal: `#...#`, stops at newline or a closing `#`.
                    cur.advance();
                    loop {
                        match cur.peek() {
                            None | Some('\r') | Some('\n') => break,
                            Some('#') => {
                                cur.advance();
                                break;
                            }
                            Some(_) => {
                                cur.advance();
                            }
                        }
                    }
                    let text = cur.slice(start_idx, cur.pos);
                    // Treated as a string-flavoured literal — spec.md's token
                    // kinds don't enumerate a date kind, and diagnostics never
                    // need to distinguish it from any other opaque literal.
                    tokens.push(Token::new(TokenKind::Str, text, line, column));
                }
                continue;
            }
            '&' if matches!(cur.peek_at(1), Some('h') | Some('H')) => {
                cur.advance();
                cur.advance();
                while matches!(cur.peek(), Some(c2) if c2.is_ascii_hexdigit()) {
                    cur.advance();
                }
                let text = cur.slice(start_idx, cur.pos);
                tokens.push(Token::new(TokenKind::Int, text, line, column));
                continue;
            }
            c if c.is_ascii_digit() => {
                while matches!(cur.peek(), Some(c2) if c2.is_ascii_digit()) {
                    cur.advance();
                }
                let mut is_float = false;
                if cur.peek() == Some('.') && matches!(cur.peek_at(1), Some(c2) if c2.is_ascii_digit())
                {
                    is_float = true;
                    cur.advance();
                    while matches!(cur.peek(), Some(c2) if c2.is_ascii_digit()) {
                        cur.advance();
                    }
                }
                let text = cur.slice(start_idx, cur.pos);
                let kind = if is_float { TokenKind::Float } else { TokenKind::Int };
                tokens.push(Token::new(kind, text, line, column));
                continue;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while matches!(cur.peek(), Some(c2) if c2.is_ascii_alphanumeric() || c2 == '_') {
                    cur.advance();
                }
                let text = cur.slice(start_idx, cur.pos);
                tokens.push(Token::new(TokenKind::Ident, text, line, column));
                continue;
            }
            _ => {
                if let Some(op_len) = match_operator(&cur) {
                    for _ in 0..op_len {
                        cur.advance();
                    }
                    let text = cur.slice(start_idx, cur.pos);
                    tokens.push(Token::new(TokenKind::Operator, text, line, column));
                } else {
                    // MISMATCH — silently dropped.
                    cur.advance();
                }
                continue;
            }
        }
    }

    tokens.push(Token::eof(cur.line, cur.column));
    tokens
}

fn try_line_continuation(cur: &mut Cursor<'_>) -> bool {
    let mut lookahead = cur.pos;
    while matches!(cur.chars.get(lookahead).map(|(_, c)| *c), Some(' ') | Some('\t')) {
        lookahead += 1;
    }
    if lookahead == cur.pos {
        return false;
    }
    if cur.chars.get(lookahead).map(|(_, c)| *c) != Some('_') {
        return false;
    }
    let after_underscore = lookahead + 1;
    let consumed = match cur.at_crlf_or_lf(after_underscore) {
        Some(end) => end,
        None => return false,
    };
    while cur.pos < consumed {
        cur.advance();
    }
    true
}

/// Two-character operators first, then the single-character punctuator set.
fn match_operator(cur: &Cursor<'_>) -> Option<usize> {
    let c0 = cur.peek()?;
    let c1 = cur.peek_at(1);
    let two = match (c0, c1) {
        ('<', Some('>')) => true,
        ('<', Some('=')) => true,
        ('>', Some('=')) => true,
        (':', Some('=')) => true,
        _ => false,
    };
    if two {
        return Some(2);
    }
    if "+-*/^=&<>().,:".contains(c0) {
        return Some(1);
    }
    None
}
