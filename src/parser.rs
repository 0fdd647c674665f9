//! Coarse, recovery-oriented parser.
//!
//! Classifies top-level lines and captures enough structure for the
//! analyzer while leaving statement interiors as opaque token lists.
//! Grounded in `original_source/src/parser.py`'s `VBAParser`: the same
//! dispatch-by-leading-keyword shape, the same `parseBlock(endMarkers)`
//! recursive statement-block parser where only `With` becomes a
//! first-class node and `If`/`For`/`Do`/`Select`/`While` are flattened
//! into their contained statements, and the same tolerant recovery on an
//! unexpected block terminator (consume and keep going, never loop).

use crate::ast::{
    BodyNode, EnumDecl, Mechanism, Module, ModuleKind, ProcKind, ProcedureDecl, Scope,
    StatementNode, UdtDecl, VariableDecl, WithNode,
};
use crate::decl_scan::{scan_declarations, split_top_level_commas};
use crate::token::{Token, TokenKind};
use crate::types::Diagnostic;

const DEF_PREFIXES: &[&str] = &[
    "defbool", "defbyte", "defint", "deflong", "defcur", "defsng", "defdbl", "defdec", "defdate",
    "defstr", "defobj", "defvar",
];

pub fn parse_module<'src>(
    filename: &str,
    kind: ModuleKind,
    tokens: &[Token<'src>],
) -> (Module<'src>, Vec<Diagnostic>) {
    let filtered: Vec<Token<'src>> = tokens
        .iter()
        .filter(|t| t.kind != TokenKind::Comment)
        .cloned()
        .collect();
    let mut parser = Parser {
        tokens: filtered,
        pos: 0,
        filename: filename.to_string(),
        diagnostics: Vec::new(),
    };
    let mut module = Module::new(filename, kind);
    parser.parse_top_level(&mut module);
    (module, parser.diagnostics)
}

struct Parser<'src> {
    tokens: Vec<Token<'src>>,
    pos: usize,
    filename: String,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Parser<'src> {
    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token<'src>> {
        let t = self.tokens.get(self.pos).cloned();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn is_ident(&self, word: &str) -> bool {
        self.peek().map(|t| t.is_ident(word)).unwrap_or(false)
    }

    fn is_op(&self, word: &str) -> bool {
        self.peek().map(|t| t.is_op(word)).unwrap_or(false)
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().map(|t| t.kind), None | Some(TokenKind::Eof))
    }

    fn current_line(&self) -> usize {
        self.peek().map(|t| t.line).unwrap_or(0)
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek().map(|t| t.kind), Some(TokenKind::Newline)) {
            self.advance();
        }
    }

    fn skip_newline_token(&mut self) {
        if matches!(self.peek().map(|t| t.kind), Some(TokenKind::Newline)) {
            self.advance();
        }
    }

    fn consume_to_newline(&mut self) {
        while !matches!(
            self.peek().map(|t| t.kind),
            None | Some(TokenKind::Newline) | Some(TokenKind::Eof)
        ) {
            self.advance();
        }
        self.skip_newline_token();
    }

    fn is_def_prefix(&self) -> bool {
        self.peek()
            .map(|t| t.kind == TokenKind::Ident && DEF_PREFIXES.iter().any(|p| t.value.eq_ignore_ascii_case(p)))
            .unwrap_or(false)
    }

    fn try_scope_keyword(&self) -> Option<Scope> {
        let t = self.peek()?;
        if t.kind != TokenKind::Ident {
            return None;
        }
        match t.value.to_ascii_lowercase().as_str() {
            "dim" => Some(Scope::Dim),
            "private" => Some(Scope::Private),
            "public" => Some(Scope::Public),
            "global" => Some(Scope::Global),
            "friend" => Some(Scope::Friend),
            "static" => Some(Scope::Dim),
            _ => None,
        }
    }

    /// Peek whether the tokens at the current position spell one of
    /// `markers` (each a space-separated sequence of identifiers), without
    /// consuming anything.
    fn peek_marker_index(&self, markers: &[&str]) -> Option<usize> {
        'outer: for (idx, m) in markers.iter().enumerate() {
            for (k, w) in m.split_whitespace().enumerate() {
                match self.tokens.get(self.pos + k) {
                    Some(t) if t.is_ident(w) => continue,
                    _ => continue 'outer,
                }
            }
            return Some(idx);
        }
        None
    }

    fn consume_marker(&mut self, marker: &str) {
        for w in marker.split_whitespace() {
            if self.is_ident(w) {
                self.advance();
            }
        }
        self.consume_to_newline();
    }

    /// Like [`Self::consume_marker`], but captures the marker's line as a
    /// `StatementNode` instead of discarding it. Boundary markers such as
    /// `Next`/`Loop`/`Wend`/`End Select`/`End With`/`End If`/bare `Else`
    /// must stay visible to the analyzer's unreachable-code walker, which
    /// clears its flag on seeing one; `End Sub`/`End Function`/`End
    /// Property`/`End Type`/`End Enum` are not boundary markers and keep
    /// using the discarding form.
    fn consume_marker_as_statement(&mut self, marker: &str) -> StatementNode<'src> {
        let line = self.current_line();
        let start = self.pos;
        for w in marker.split_whitespace() {
            if self.is_ident(w) {
                self.advance();
            }
        }
        let tokens = self.tokens[start..self.pos].to_vec();
        self.consume_to_newline();
        StatementNode { tokens, line }
    }

    // ── top level ────────────────────────────────────────────────────────

    fn parse_top_level(&mut self, module: &mut Module<'src>) {
        loop {
            self.skip_newlines();
            if self.at_eof() {
                break;
            }
            let pos_before = self.pos;

            if self.is_ident("attribute") {
                self.parse_attribute(module);
                continue;
            }
            if self.is_ident("option") || self.is_ident("implements") {
                self.consume_to_newline();
                continue;
            }
            if self.is_def_prefix() {
                self.consume_to_newline();
                continue;
            }

            let mut scope = self.try_scope_keyword();
            if scope.is_some() {
                self.advance();
            }

            if self.is_ident("withevents") {
                self.advance();
                self.parse_variable_decls(module, scope.unwrap_or(Scope::Dim));
                continue;
            }
            if self.is_ident("sub") || self.is_ident("function") || self.is_ident("property") {
                self.parse_procedure_like(module, scope.unwrap_or(Scope::Public));
                continue;
            }
            if self.is_ident("event") {
                self.parse_procedure_like(module, scope.unwrap_or(Scope::Public));
                continue;
            }
            if self.is_ident("declare") {
                self.parse_declare(module, scope.unwrap_or(Scope::Public));
                continue;
            }
            if self.is_ident("type") {
                self.parse_udt(module, scope.unwrap_or(Scope::Public));
                continue;
            }
            if self.is_ident("enum") {
                self.parse_enum(module, scope.unwrap_or(Scope::Public));
                continue;
            }
            if self.is_ident("const") {
                self.advance();
                self.parse_variable_decls(module, scope.unwrap_or(Scope::Public));
                continue;
            }
            if scope.is_some() {
                self.parse_variable_decls(module, scope.take().unwrap());
                continue;
            }

            if self.pos == pos_before {
                let line = self.current_line();
                self.diagnostics.push(Diagnostic::new(
                    &self.filename,
                    line,
                    "Syntax warning: unrecognized top-level statement.",
                ));
            }
            self.consume_to_newline();
        }
    }

    fn parse_attribute(&mut self, module: &mut Module<'src>) {
        self.advance(); // 'Attribute'
        let name = self.advance().map(|t| t.value.to_string()).unwrap_or_default();
        if self.is_op("=") {
            self.advance();
        }
        let mut value = String::new();
        while !matches!(
            self.peek().map(|t| t.kind),
            None | Some(TokenKind::Newline) | Some(TokenKind::Eof)
        ) {
            let t = self.advance().unwrap();
            if t.kind == TokenKind::Str {
                value = unquote(t.value);
            } else if value.is_empty() {
                value = t.value.to_string();
            }
        }
        self.skip_newline_token();
        if !name.is_empty() {
            if name.eq_ignore_ascii_case("VB_Name") && !value.is_empty() {
                module.name = value.clone();
            }
            module.attributes.insert(name, value);
        }
    }

    fn parse_variable_decls(&mut self, module: &mut Module<'src>, scope: Scope) {
        let line = self.current_line();
        let start = self.pos;
        while !matches!(
            self.peek().map(|t| t.kind),
            None | Some(TokenKind::Newline) | Some(TokenKind::Eof)
        ) {
            self.advance();
        }
        let seg = self.tokens[start..self.pos].to_vec();
        self.skip_newline_token();
        for group in scan_declarations(&seg) {
            module
                .variables
                .push(VariableDecl::new(group.name, group.type_name, scope, line));
        }
    }

    fn parse_udt(&mut self, module: &mut Module<'src>, scope: Scope) {
        self.advance(); // 'Type'
        let name = self.advance().map(|t| t.value).unwrap_or("");
        self.skip_newline_token();
        let mut members = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_eof() {
                break;
            }
            if self.peek_marker_index(&["end type"]).is_some() {
                self.consume_marker("end type");
                break;
            }
            let line = self.current_line();
            let start = self.pos;
            while !matches!(
                self.peek().map(|t| t.kind),
                None | Some(TokenKind::Newline) | Some(TokenKind::Eof)
            ) {
                self.advance();
            }
            let seg = self.tokens[start..self.pos].to_vec();
            self.skip_newline_token();
            for g in scan_declarations(&seg) {
                members.push(VariableDecl::new(g.name, g.type_name, Scope::Public, line));
            }
        }
        module.udts.insert(name.to_ascii_lowercase(), UdtDecl { name, scope, members });
    }

    fn parse_enum(&mut self, module: &mut Module<'src>, scope: Scope) {
        self.advance(); // 'Enum'
        let name = self.advance().map(|t| t.value).unwrap_or("");
        self.skip_newline_token();
        let mut members = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_eof() {
                break;
            }
            if self.peek_marker_index(&["end enum"]).is_some() {
                self.consume_marker("end enum");
                break;
            }
            let line = self.current_line();
            let start = self.pos;
            while !matches!(
                self.peek().map(|t| t.kind),
                None | Some(TokenKind::Newline) | Some(TokenKind::Eof)
            ) {
                self.advance();
            }
            if let Some(name_tok) = self.tokens.get(start) {
                if name_tok.kind == TokenKind::Ident {
                    members.push(name_tok.value);
                    module
                        .variables
                        .push(VariableDecl::new(name_tok.value, "Long", scope, line));
                }
            }
            self.skip_newline_token();
        }
        module.enums.insert(name.to_ascii_lowercase(), EnumDecl { name, scope, members });
    }

    fn parse_declare(&mut self, module: &mut Module<'src>, scope: Scope) {
        let line = self.current_line();
        self.advance(); // 'Declare'
        let mut is_ptr_safe = false;
        if self.is_ident("ptrsafe") {
            is_ptr_safe = true;
            self.advance();
        }
        let kind = if self.is_ident("function") {
            self.advance();
            ProcKind::DeclareFunction
        } else {
            self.advance(); // 'Sub'
            ProcKind::DeclareSub
        };
        let name = self.advance().map(|t| t.value).unwrap_or("");
        let mut proc = ProcedureDecl::new(name, kind, line);
        proc.scope = scope;
        proc.is_ptr_safe = is_ptr_safe;

        if self.is_ident("lib") {
            self.advance();
            if let Some(t) = self.peek().cloned() {
                if t.kind == TokenKind::Str {
                    proc.lib_name = Some(unquote(t.value));
                    self.advance();
                }
            }
        }
        if self.is_ident("alias") {
            self.advance();
            if let Some(t) = self.peek().cloned() {
                if t.kind == TokenKind::Str {
                    proc.alias_name = Some(unquote(t.value));
                    self.advance();
                }
            }
        }
        if self.is_op("(") {
            proc.args = self.parse_arg_list();
        }
        if self.is_ident("as") {
            self.advance();
            proc.return_type = self.parse_type_signature();
        }
        self.skip_newline_token();
        module.procedures.push(proc);
    }

    fn parse_procedure_like(&mut self, module: &mut Module<'src>, scope: Scope) {
        let line = self.current_line();
        let kw = self.advance().unwrap();
        let kind = match kw.value.to_ascii_lowercase().as_str() {
            "sub" => ProcKind::Sub,
            "function" => ProcKind::Function,
            "event" => ProcKind::Event,
            "property" => {
                if self.is_ident("let") {
                    self.advance();
                    ProcKind::PropertyLet
                } else if self.is_ident("set") {
                    self.advance();
                    ProcKind::PropertySet
                } else {
                    if self.is_ident("get") {
                        self.advance();
                    }
                    ProcKind::PropertyGet
                }
            }
            _ => ProcKind::Sub,
        };
        let name = self.advance().map(|t| t.value).unwrap_or("");
        let mut proc = ProcedureDecl::new(name, kind, line);
        proc.scope = scope;

        if self.is_op("(") {
            proc.args = self.parse_arg_list();
        }
        if self.is_ident("as") {
            self.advance();
            proc.return_type = self.parse_type_signature();
        }
        self.skip_newline_token();

        let end_marker: Option<&str> = match &proc.kind {
            ProcKind::Sub => Some("end sub"),
            ProcKind::Function => Some("end function"),
            ProcKind::PropertyGet | ProcKind::PropertyLet | ProcKind::PropertySet => {
                Some("end property")
            }
            _ => None,
        };
        if let Some(marker) = end_marker {
            let (body, matched) = self.parse_block(&[marker]);
            proc.body = body;
            if matched.is_some() {
                self.consume_marker(marker);
            } else {
                self.diagnostics.push(Diagnostic::new(
                    &self.filename,
                    line,
                    format!("Syntax warning: missing '{marker}' for '{name}'."),
                ));
            }
        }
        module.procedures.push(proc);
    }

    fn parse_arg_list(&mut self) -> Vec<VariableDecl<'src>> {
        self.advance(); // '('
        let start = self.pos;
        let mut depth = 1;
        while depth > 0 {
            match self.peek() {
                None => break,
                Some(t) if t.is_op("(") => {
                    depth += 1;
                    self.advance();
                }
                Some(t) if t.is_op(")") => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
        let inner = self.tokens[start..self.pos].to_vec();
        if self.is_op(")") {
            self.advance();
        }
        split_top_level_commas(&inner)
            .into_iter()
            .filter(|seg| !seg.is_empty())
            .map(parse_one_arg)
            .collect()
    }

    fn parse_type_signature(&mut self) -> String {
        if self.is_ident("new") {
            self.advance();
        }
        let mut parts = Vec::new();
        loop {
            match self.peek() {
                Some(t) if t.kind == TokenKind::Ident => {
                    parts.push(t.value.to_string());
                    self.advance();
                    if self.is_op(".") {
                        self.advance();
                        continue;
                    }
                    break;
                }
                _ => break,
            }
        }
        if parts.is_empty() {
            "Variant".to_string()
        } else {
            parts.join(".")
        }
    }

    // ── procedure bodies ─────────────────────────────────────────────────

    fn parse_block(&mut self, end_markers: &[&str]) -> (Vec<BodyNode<'src>>, Option<usize>) {
        let mut body = Vec::new();
        loop {
            self.skip_newlines();
            if self.at_eof() {
                return (body, None);
            }
            if let Some(idx) = self.peek_marker_index(end_markers) {
                return (body, Some(idx));
            }
            if self.is_ident("with") {
                body.push(BodyNode::With(self.parse_with()));
                continue;
            }
            if self.is_ident("if") {
                body.extend(self.parse_if());
                continue;
            }
            if self.is_ident("for") {
                body.extend(self.parse_structural(&["next"]));
                continue;
            }
            if self.is_ident("do") {
                body.extend(self.parse_structural(&["loop"]));
                continue;
            }
            if self.is_ident("while") {
                body.extend(self.parse_structural(&["wend"]));
                continue;
            }
            if self.is_ident("select") {
                body.extend(self.parse_structural(&["end select"]));
                continue;
            }
            let stmts = self.collect_statement();
            body.extend(stmts.into_iter().map(BodyNode::Statement));
        }
    }

    fn parse_structural(&mut self, end_markers: &[&str]) -> Vec<BodyNode<'src>> {
        let mut out = Vec::new();
        let line = self.current_line();
        let start = self.pos;
        while !matches!(
            self.peek().map(|t| t.kind),
            None | Some(TokenKind::Newline) | Some(TokenKind::Eof)
        ) {
            self.advance();
        }
        out.push(BodyNode::Statement(StatementNode {
            tokens: self.tokens[start..self.pos].to_vec(),
            line,
        }));
        self.skip_newline_token();
        let (body, matched) = self.parse_block(end_markers);
        out.extend(body);
        if matched.is_some() {
            out.push(BodyNode::Statement(self.consume_marker_as_statement(end_markers[0])));
        }
        out
    }

    fn parse_with(&mut self) -> WithNode<'src> {
        let line = self.current_line();
        self.advance(); // 'With'
        let start = self.pos;
        while !matches!(
            self.peek().map(|t| t.kind),
            None | Some(TokenKind::Newline) | Some(TokenKind::Eof)
        ) {
            self.advance();
        }
        let expr = self.tokens[start..self.pos].to_vec();
        self.skip_newline_token();
        let (mut body, matched) = self.parse_block(&["end with"]);
        if matched.is_some() {
            body.push(BodyNode::Statement(self.consume_marker_as_statement("end with")));
        }
        WithNode { expr, body, line }
    }

    /// Consume `If`/`ElseIf` through `Then` (or end of line), returning the
    /// header tokens, its source line, and whether this is the block form
    /// (nothing follows `Then` but a newline) versus the single-line form.
    fn parse_condition_then_header(&mut self) -> (Vec<Token<'src>>, usize, bool) {
        let line = self.current_line();
        let start = self.pos;
        self.advance(); // 'If' / 'ElseIf'
        while !(self.is_ident("then")
            || matches!(
                self.peek().map(|t| t.kind),
                None | Some(TokenKind::Newline) | Some(TokenKind::Eof)
            ))
        {
            self.advance();
        }
        if self.is_ident("then") {
            self.advance();
        }
        let is_block = matches!(
            self.peek().map(|t| t.kind),
            None | Some(TokenKind::Newline) | Some(TokenKind::Eof)
        );
        let header = self.tokens[start..self.pos].to_vec();
        (header, line, is_block)
    }

    fn parse_if(&mut self) -> Vec<BodyNode<'src>> {
        let mut out = Vec::new();
        let (header, line, is_block) = self.parse_condition_then_header();
        out.push(BodyNode::Statement(StatementNode { tokens: header, line }));

        if !is_block {
            out.extend(self.collect_statement().into_iter().map(BodyNode::Statement));
            return out;
        }
        self.skip_newline_token();

        loop {
            let (body, marker) = self.parse_block(&["else", "elseif", "end if"]);
            out.extend(body);
            match marker {
                Some(0) => {
                    out.push(BodyNode::Statement(self.consume_marker_as_statement("else")));
                    let (else_body, end_marker) = self.parse_block(&["end if"]);
                    out.extend(else_body);
                    if end_marker.is_some() {
                        out.push(BodyNode::Statement(self.consume_marker_as_statement("end if")));
                    }
                    break;
                }
                Some(1) => {
                    let (header2, line2, is_block2) = self.parse_condition_then_header();
                    out.push(BodyNode::Statement(StatementNode { tokens: header2, line: line2 }));
                    if !is_block2 {
                        out.extend(self.collect_statement().into_iter().map(BodyNode::Statement));
                        break;
                    }
                    self.skip_newline_token();
                    continue;
                }
                Some(2) => {
                    out.push(BodyNode::Statement(self.consume_marker_as_statement("end if")));
                    break;
                }
                _ => {
                    self.diagnostics.push(Diagnostic::new(
                        &self.filename,
                        line,
                        "Syntax warning: missing 'End If'.",
                    ));
                    break;
                }
            }
        }
        out
    }

    /// Reads tokens until newline/EOF, splitting top-level `:` separators
    /// into distinct statements. The colon itself stays in the preceding
    /// statement's token list so a leading `Name:` label is visible to the
    /// analyzer as a two-token prefix.
    fn collect_statement(&mut self) -> Vec<StatementNode<'src>> {
        let mut out = Vec::new();
        let mut current: Vec<Token<'src>> = Vec::new();
        let mut depth = 0i32;
        let line = self.current_line();
        loop {
            match self.peek().map(|t| t.kind) {
                None | Some(TokenKind::Eof) => break,
                Some(TokenKind::Newline) => {
                    self.advance();
                    break;
                }
                _ => {}
            }
            let tok = self.advance().unwrap();
            if tok.is_op("(") {
                depth += 1;
            } else if tok.is_op(")") {
                depth -= 1;
            }
            let is_top_level_colon = tok.is_op(":") && depth == 0;
            current.push(tok);
            if is_top_level_colon {
                out.push(StatementNode { tokens: std::mem::take(&mut current), line });
            }
        }
        if !current.is_empty() {
            out.push(StatementNode { tokens: current, line });
        }
        out
    }
}

fn unquote(s: &str) -> String {
    s.trim_matches('"').replace("\"\"", "\"")
}

fn parse_one_arg<'src>(seg: &[Token<'src>]) -> VariableDecl<'src> {
    let mut i = 0;
    let mut optional = false;
    let mut mechanism = Mechanism::ByRef;
    let mut paramarray = false;
    loop {
        match seg.get(i) {
            Some(t) if t.is_ident("optional") => {
                optional = true;
                i += 1;
            }
            Some(t) if t.is_ident("byval") => {
                mechanism = Mechanism::ByVal;
                i += 1;
            }
            Some(t) if t.is_ident("byref") => {
                mechanism = Mechanism::ByRef;
                i += 1;
            }
            Some(t) if t.is_ident("paramarray") => {
                paramarray = true;
                i += 1;
            }
            _ => break,
        }
    }

    let name = seg.get(i).map(|t| t.value).unwrap_or("");
    i += 1;

    let mut is_array = false;
    if seg.get(i).map(|t| t.is_op("(")).unwrap_or(false) {
        is_array = true;
        let mut depth = 1;
        i += 1;
        while i < seg.len() && depth > 0 {
            if seg[i].is_op("(") {
                depth += 1;
            } else if seg[i].is_op(")") {
                depth -= 1;
            }
            i += 1;
        }
    }

    let mut type_name = "Variant".to_string();
    if seg.get(i).map(|t| t.is_ident("as")).unwrap_or(false) {
        i += 1;
        if seg.get(i).map(|t| t.is_ident("new")).unwrap_or(false) {
            i += 1;
        }
        let mut parts = Vec::new();
        loop {
            match seg.get(i) {
                Some(t) if t.kind == TokenKind::Ident => {
                    parts.push(t.value);
                    i += 1;
                    if seg.get(i).map(|t2| t2.is_op(".")).unwrap_or(false) {
                        i += 1;
                        continue;
                    }
                    break;
                }
                _ => break,
            }
        }
        if !parts.is_empty() {
            type_name = parts.join(".");
        }
    }
    if is_array {
        type_name.push_str("()");
    }

    let mut decl = VariableDecl::new(name, type_name, Scope::Dim, 0);
    decl.optional = optional;
    decl.paramarray = paramarray;
    decl.mechanism = mechanism;
    decl
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::preprocessor::{preprocess, DefineValue};
    use std::collections::HashMap;

    fn parse(src: &str) -> Module<'_> {
        let toks = lex(src);
        let filtered = preprocess(&toks, &HashMap::<String, DefineValue>::new());
        parse_module("Test.bas", ModuleKind::Module, &filtered).0
    }

    #[test]
    fn test_attribute_sets_module_name() {
        let m = parse("Attribute VB_Name = \"MyModule\"\n");
        assert_eq!(m.name, "MyModule");
    }

    #[test]
    fn test_module_level_variable_declaration() {
        let m = parse("Public counter As Long\n");
        assert_eq!(m.variables.len(), 1);
        assert_eq!(m.variables[0].name, "counter");
        assert_eq!(m.variables[0].type_name, "Long");
        assert_eq!(m.variables[0].scope, Scope::Public);
    }

    #[test]
    fn test_simple_sub_with_args_and_body() {
        let m = parse("Sub S()\n  Dim x As Integer\n  y = 1\nEnd Sub\n");
        assert_eq!(m.procedures.len(), 1);
        let proc = &m.procedures[0];
        assert_eq!(proc.name, "S");
        assert_eq!(proc.kind, ProcKind::Sub);
        assert_eq!(proc.body.len(), 2);
    }

    #[test]
    fn test_function_with_args_and_return_type() {
        let m = parse("Public Function Add(a As Integer, b As Integer) As Integer\nAdd = a + b\nEnd Function\n");
        let proc = &m.procedures[0];
        assert_eq!(proc.args.len(), 2);
        assert_eq!(proc.return_type, "Integer");
    }

    #[test]
    fn test_optional_and_paramarray_args() {
        let m = parse("Sub T(Optional x As Integer, ParamArray rest())\nEnd Sub\n");
        let proc = &m.procedures[0];
        assert!(proc.args[0].optional);
        assert!(proc.args[1].paramarray);
    }

    #[test]
    fn test_with_block_parses_as_node() {
        let m = parse("Sub U()\n  With ActiveDoc\n    .Save\n  End With\nEnd Sub\n");
        let proc = &m.procedures[0];
        assert!(matches!(proc.body[0], BodyNode::With(_)));
    }

    #[test]
    fn test_single_line_if_then_exit_sub() {
        let m = parse("Sub V()\n  If x Then Exit Sub\n  Dim y As Long\nEnd Sub\n");
        let proc = &m.procedures[0];
        // header + Exit Sub + Dim y As Long = 3 statements
        assert_eq!(proc.body.len(), 3);
    }

    #[test]
    fn test_block_if_else_if_else_flattened() {
        let m = parse(
            "Sub W()\n  If a Then\n    x = 1\n  ElseIf b Then\n    x = 2\n  Else\n    x = 3\n  End If\nEnd Sub\n",
        );
        let proc = &m.procedures[0];
        assert!(proc.body.len() >= 5);
    }

    #[test]
    fn test_for_loop_flattened_not_first_class() {
        let m = parse("Sub X()\n  For i = 1 To 10\n    y = i\n  Next i\nEnd Sub\n");
        let proc = &m.procedures[0];
        for node in &proc.body {
            assert!(matches!(node, BodyNode::Statement(_)));
        }
        // header + body statement + trailing "Next i" boundary marker.
        assert_eq!(proc.body.len(), 3);
    }

    #[test]
    fn test_udt_members() {
        let m = parse("Public Type Point\n  X As Integer\n  Y As Integer\nEnd Type\n");
        let udt = m.udts.get("point").unwrap();
        assert_eq!(udt.members.len(), 2);
    }

    #[test]
    fn test_enum_members_become_long_variables_and_type() {
        let m = parse("Public Enum Color\n  Red\n  Green\n  Blue\nEnd Enum\n");
        assert_eq!(m.variables.len(), 3);
        assert!(m.variables.iter().all(|v| v.type_name == "Long"));
        assert_eq!(m.enums.get("color").unwrap().members.len(), 3);
    }

    #[test]
    fn test_declare_with_lib_and_alias() {
        let m = parse(
            "Private Declare PtrSafe Function GetTick Lib \"kernel32\" Alias \"GetTickCount\" () As Long\n",
        );
        let proc = &m.procedures[0];
        assert_eq!(proc.kind, ProcKind::DeclareFunction);
        assert!(proc.is_ptr_safe);
        assert_eq!(proc.lib_name.as_deref(), Some("kernel32"));
        assert_eq!(proc.alias_name.as_deref(), Some("GetTickCount"));
    }

    #[test]
    fn test_colon_chained_statements_become_separate_nodes() {
        let m = parse("Sub Y()\n  a = 1 : b = 2\nEnd Sub\n");
        let proc = &m.procedures[0];
        assert_eq!(proc.body.len(), 2);
    }

    #[test]
    fn test_label_preserved_as_statement_prefix() {
        let m = parse("Sub Z()\n  MyLabel:\n  GoTo MyLabel\nEnd Sub\n");
        let proc = &m.procedures[0];
        if let BodyNode::Statement(stmt) = &proc.body[0] {
            assert_eq!(stmt.tokens[0].value, "MyLabel");
            assert_eq!(stmt.tokens[1].value, ":");
        } else {
            panic!("expected statement node");
        }
    }
}
