//! Conditional-compilation preprocessor.
//!
//! Runs between the lexer and the parser, stripping `#If`/`#ElseIf`/`#Else`/
//! `#End If`/`#Const` directives and the token runs they make inactive.
//! Grounded in `original_source/src/preprocessor.py`: a frame stack of
//! `{active, taken}` pairs, directive tokens never forwarded, and the
//! newline that ends a directive line always forwarded so downstream line
//! numbers stay accurate even though our tokens already carry their own.

use std::collections::HashMap;

use crate::token::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq)]
pub enum DefineValue {
    Bool(bool),
    Num(f64),
    Str(String),
}

impl DefineValue {
    fn truthy(&self) -> bool {
        match self {
            DefineValue::Bool(b) => *b,
            DefineValue::Num(n) => *n != 0.0,
            DefineValue::Str(s) => !s.is_empty(),
        }
    }

    fn as_num(&self) -> Option<f64> {
        match self {
            DefineValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            DefineValue::Num(n) => Some(*n),
            DefineValue::Str(_) => None,
        }
    }

    fn values_equal(&self, other: &DefineValue) -> bool {
        match (self.as_num(), other.as_num()) {
            (Some(a), Some(b)) => a == b,
            _ => match (self, other) {
                (DefineValue::Str(a), DefineValue::Str(b)) => a.eq_ignore_ascii_case(b),
                _ => false,
            },
        }
    }
}

/// Parses a `--define KEY=VALUE,KEY2=VALUE2` string into a defines map,
/// keys upper-cased, matching `config.py`'s `parse_defines`.
pub fn parse_defines(spec: &str) -> HashMap<String, DefineValue> {
    let mut out = HashMap::new();
    for pair in spec.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let mut parts = pair.splitn(2, '=');
        let key = parts.next().unwrap_or("").trim().to_ascii_uppercase();
        if key.is_empty() {
            continue;
        }
        let value = parts.next().map(str::trim).unwrap_or("");
        let parsed = if value.is_empty() {
            DefineValue::Bool(true)
        } else if value.eq_ignore_ascii_case("true") {
            DefineValue::Bool(true)
        } else if value.eq_ignore_ascii_case("false") {
            DefineValue::Bool(false)
        } else if let Ok(n) = value.parse::<f64>() {
            DefineValue::Num(n)
        } else {
            DefineValue::Str(value.to_string())
        };
        out.insert(key, parsed);
    }
    out
}

struct Frame {
    active: bool,
    taken: bool,
}

/// Strip conditional-compilation directives and their inactive branches.
/// `#Const` assignments made while scanning mutate a local copy of
/// `defines` — later directives in the same file see earlier `#Const`s.
pub fn preprocess<'src>(tokens: &[Token<'src>], defines: &HashMap<String, DefineValue>) -> Vec<Token<'src>> {
    let mut defines = defines.clone();
    let mut stack = vec![Frame { active: true, taken: false }];
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    let n = tokens.len();

    while i < n {
        let tok = &tokens[i];

        if tok.kind == TokenKind::Preproc {
            let directive = tok.value.to_ascii_lowercase();
            let mut j = i + 1;
            while j < n && !matches!(tokens[j].kind, TokenKind::Newline | TokenKind::Eof) {
                j += 1;
            }
            let line = strip_trailing_then(&tokens[i + 1..j]);

            match directive.as_str() {
                "#if" => {
                    let parent_active = stack.last().map(|f| f.active).unwrap_or(true);
                    let cond = eval_expr(line, &defines).map(|v| v.truthy()).unwrap_or(false);
                    let active = parent_active && cond;
                    stack.push(Frame { active, taken: active });
                }
                "#elseif" => {
                    let parent_active = parent_frame_active(&stack);
                    if let Some(frame) = stack.last_mut() {
                        if parent_active && !frame.taken {
                            let cond = eval_expr(line, &defines).map(|v| v.truthy()).unwrap_or(false);
                            frame.active = cond;
                            frame.taken = frame.taken || cond;
                        } else {
                            frame.active = false;
                        }
                    }
                }
                "#else" => {
                    let parent_active = parent_frame_active(&stack);
                    if let Some(frame) = stack.last_mut() {
                        if parent_active && !frame.taken {
                            frame.active = true;
                            frame.taken = true;
                        } else {
                            frame.active = false;
                        }
                    }
                }
                "#end" => {
                    if stack.len() > 1 {
                        stack.pop();
                    }
                }
                "#const" => {
                    if let Some((name_tok, rest)) = line.split_first() {
                        let name = name_tok.value.to_ascii_uppercase();
                        let rest = if rest.first().map(|t| t.is_op("=")).unwrap_or(false) {
                            &rest[1..]
                        } else {
                            rest
                        };
                        if let Some(val) = eval_expr(rest, &defines) {
                            defines.insert(name, val);
                        }
                    }
                }
                _ => {}
            }

            if j < n && tokens[j].kind == TokenKind::Newline {
                out.push(tokens[j].clone());
            }
            i = j + 1;
            continue;
        }

        if tok.kind == TokenKind::Newline {
            out.push(tok.clone());
            i += 1;
            continue;
        }

        if stack.last().map(|f| f.active).unwrap_or(true) {
            out.push(tok.clone());
        }
        i += 1;
    }

    out
}

fn parent_frame_active(stack: &[Frame]) -> bool {
    if stack.len() >= 2 {
        stack[stack.len() - 2].active
    } else {
        true
    }
}

fn strip_trailing_then<'a>(line: &'a [Token<'a>]) -> &'a [Token<'a>] {
    match line.last() {
        Some(t) if t.is_ident("then") => &line[..line.len() - 1],
        _ => line,
    }
}

struct ExprParser<'a, 'src> {
    toks: &'a [Token<'src>],
    pos: usize,
    defines: &'a HashMap<String, DefineValue>,
}

impl<'a, 'src> ExprParser<'a, 'src> {
    fn peek(&self) -> Option<&Token<'src>> {
        self.toks.get(self.pos)
    }

    fn bump(&mut self) -> Option<&Token<'src>> {
        let t = self.toks.get(self.pos);
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn or_expr(&mut self) -> Option<DefineValue> {
        let mut lhs = self.and_expr()?;
        while matches!(self.peek(), Some(t) if t.is_ident("or")) {
            self.bump();
            let rhs = self.and_expr()?;
            lhs = DefineValue::Bool(lhs.truthy() || rhs.truthy());
        }
        Some(lhs)
    }

    fn and_expr(&mut self) -> Option<DefineValue> {
        let mut lhs = self.not_expr()?;
        while matches!(self.peek(), Some(t) if t.is_ident("and")) {
            self.bump();
            let rhs = self.not_expr()?;
            lhs = DefineValue::Bool(lhs.truthy() && rhs.truthy());
        }
        Some(lhs)
    }

    fn not_expr(&mut self) -> Option<DefineValue> {
        if matches!(self.peek(), Some(t) if t.is_ident("not")) {
            self.bump();
            let v = self.not_expr()?;
            return Some(DefineValue::Bool(!v.truthy()));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Option<DefineValue> {
        let lhs = self.primary()?;
        if let Some(t) = self.peek() {
            if t.is_op("=") {
                self.bump();
                let rhs = self.primary()?;
                return Some(DefineValue::Bool(lhs.values_equal(&rhs)));
            }
            if t.is_op("<>") {
                self.bump();
                let rhs = self.primary()?;
                return Some(DefineValue::Bool(!lhs.values_equal(&rhs)));
            }
        }
        Some(lhs)
    }

    fn primary(&mut self) -> Option<DefineValue> {
        let t = self.bump()?;
        match t.kind {
            TokenKind::Int | TokenKind::Float => {
                t.value.trim_start_matches("&H").parse::<f64>().ok()
                    .or_else(|| i64::from_str_radix(t.value.trim_start_matches("&H"), 16).ok().map(|n| n as f64))
                    .map(DefineValue::Num)
            }
            TokenKind::Str => {
                let inner = t.value.trim_matches('"');
                Some(DefineValue::Str(inner.replace("\"\"", "\"")))
            }
            TokenKind::Ident => {
                if t.value.eq_ignore_ascii_case("true") {
                    Some(DefineValue::Bool(true))
                } else if t.value.eq_ignore_ascii_case("false") {
                    Some(DefineValue::Bool(false))
                } else {
                    let key = t.value.to_ascii_uppercase();
                    Some(self.defines.get(&key).cloned().unwrap_or(DefineValue::Bool(false)))
                }
            }
            TokenKind::Operator if t.value == "(" => {
                let v = self.or_expr()?;
                if matches!(self.peek(), Some(t2) if t2.is_op(")")) {
                    self.bump();
                }
                Some(v)
            }
            _ => None,
        }
    }
}

/// Evaluate a directive condition. Any parse failure (malformed expression,
/// unexpected token) defaults to `false`, matching the original's blanket
/// `except Exception: return False`.
fn eval_expr(line: &[Token<'_>], defines: &HashMap<String, DefineValue>) -> Option<DefineValue> {
    if line.is_empty() {
        return Some(DefineValue::Bool(false));
    }
    let mut parser = ExprParser { toks: line, pos: 0, defines };
    parser.or_expr().or(Some(DefineValue::Bool(false)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn run(src: &str, defines: &HashMap<String, DefineValue>) -> Vec<String> {
        let toks = lex(src);
        preprocess(&toks, defines)
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::Newline | TokenKind::Eof))
            .map(|t| t.value.to_string())
            .collect()
    }

    #[test]
    fn test_if_true_keeps_body() {
        let mut d = HashMap::new();
        d.insert("DEBUGMODE".to_string(), DefineValue::Bool(true));
        let out = run("#If DEBUGMODE Then\nx = 1\n#End If\n", &d);
        assert_eq!(out, vec!["x", "=", "1"]);
    }

    #[test]
    fn test_if_false_drops_body() {
        let d = HashMap::new();
        let out = run("#If DEBUGMODE Then\nx = 1\n#End If\n", &d);
        assert!(out.is_empty());
    }

    #[test]
    fn test_else_branch_taken_when_if_false() {
        let d = HashMap::new();
        let out = run("#If DEBUGMODE Then\nx = 1\n#Else\ny = 2\n#End If\n", &d);
        assert_eq!(out, vec!["y", "=", "2"]);
    }

    #[test]
    fn test_elseif_chain_first_match_wins() {
        let mut d = HashMap::new();
        d.insert("A".to_string(), DefineValue::Bool(false));
        d.insert("B".to_string(), DefineValue::Bool(true));
        let out = run(
            "#If A Then\nx = 1\n#ElseIf B Then\nx = 2\n#Else\nx = 3\n#End If\n",
            &d,
        );
        assert_eq!(out, vec!["x", "=", "2"]);
    }

    #[test]
    fn test_undefined_identifier_defaults_false() {
        let d = HashMap::new();
        let out = run("#If Undeclared Then\nx = 1\n#End If\n", &d);
        assert!(out.is_empty());
    }

    #[test]
    fn test_const_defines_symbol_used_later() {
        let d = HashMap::new();
        let out = run("#Const FOO = True\n#If FOO Then\nx = 1\n#End If\n", &d);
        assert_eq!(out, vec!["x", "=", "1"]);
    }

    #[test]
    fn test_nested_if_respects_parent_inactive() {
        let mut d = HashMap::new();
        d.insert("INNER".to_string(), DefineValue::Bool(true));
        let out = run(
            "#If False Then\n#If INNER Then\nx = 1\n#End If\n#End If\n",
            &d,
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_equality_comparison() {
        let mut d = HashMap::new();
        d.insert("VERSION".to_string(), DefineValue::Num(7.0));
        let out = run("#If VERSION = 7 Then\nx = 1\n#End If\n", &d);
        assert_eq!(out, vec!["x", "=", "1"]);
    }

    #[test]
    fn test_parse_defines_basic() {
        let d = parse_defines("DEBUG=True,VERSION=7,NAME=foo");
        assert_eq!(d.get("DEBUG"), Some(&DefineValue::Bool(true)));
        assert_eq!(d.get("VERSION"), Some(&DefineValue::Num(7.0)));
        assert_eq!(d.get("NAME"), Some(&DefineValue::Str("foo".to_string())));
    }
}
