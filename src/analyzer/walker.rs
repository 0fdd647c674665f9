//! Statement / expression walker (spec.md §4.4.1 and §4.4.3): unreachable
//! code detection over a flattened procedure body, local-declaration
//! extraction, and the dot-chain resolver that threads a `With` stack
//! through recursive block walks. Grounded in
//! `original_source/src/analyzer.py`'s `_walk_block`/`_analyze_tokens`.

use crate::analyzer::members;
use crate::analyzer::signature;
use crate::analyzer::Analyzer;
use crate::ast::BodyNode;
use crate::decl_scan;
use crate::symbol_table::{ScopeId, Symbol, SymbolKind};
use crate::token::{Token, TokenKind};
use crate::types::Diagnostic;

const KEYWORDS: &[&str] = &[
    "and", "or", "not", "xor", "eqv", "imp", "mod", "is", "like", "to", "step", "then", "else",
    "elseif", "end", "dim", "redim", "preserve", "erase", "set", "let", "call", "new", "nothing",
    "true", "false", "me", "byref", "byval", "optional", "paramarray", "goto", "gosub", "resume",
    "return", "exit", "sub", "function", "property", "get", "next", "loop", "wend", "with",
    "for", "each", "in", "do", "while", "until", "select", "case", "if", "declare", "lib",
    "alias", "ptrsafe", "type", "enum", "const", "public", "private", "global", "friend",
    "static", "withevents", "implements", "option", "explicit", "attribute", "as", "on", "error",
    "stop", "rem", "empty", "null", "event",
];

fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| word.eq_ignore_ascii_case(k))
}

/// Receiver types opaque enough that an unresolved member on them is never
/// worth diagnosing — spec.md §7's explicit suppression list.
fn is_opaque_type(ty: &str) -> bool {
    matches!(
        ty.to_ascii_lowercase().as_str(),
        "object" | "variant" | "unknown" | "control" | "form"
    )
}

fn is_scalar_primitive(ty: &str) -> bool {
    matches!(
        ty.to_ascii_lowercase().as_str(),
        "string" | "integer" | "long" | "boolean" | "double" | "currency" | "date" | "single" | "byte"
    )
}

fn is_callable_kind(kind: Option<SymbolKind>) -> bool {
    matches!(kind, Some(SymbolKind::Function) | Some(SymbolKind::Procedure) | Some(SymbolKind::Global))
}

fn looks_like_arg_start(tok: &Token) -> bool {
    matches!(tok.kind, TokenKind::Str | TokenKind::Int | TokenKind::Float | TokenKind::Ident)
        || tok.is_op("-")
        || tok.is_op("+")
}

fn is_boundary_statement(tokens: &[Token]) -> bool {
    match tokens.first() {
        Some(t) if t.is_ident("else") || t.is_ident("elseif") || t.is_ident("next") || t.is_ident("loop")
            || t.is_ident("wend") || t.is_ident("case") =>
        {
            true
        }
        Some(t) if t.is_ident("end") => tokens
            .get(1)
            .map(|t2| t2.is_ident("select") || t2.is_ident("with") || t2.is_ident("if"))
            .unwrap_or(false),
        _ => false,
    }
}

fn is_label_definition(tokens: &[Token]) -> bool {
    tokens.len() == 2 && tokens[0].kind == TokenKind::Ident && tokens[1].is_op(":")
}

fn is_if_then_header(tokens: &[Token]) -> bool {
    let starts_if = tokens.first().map(|t| t.is_ident("if") || t.is_ident("elseif")).unwrap_or(false);
    let ends_then = tokens.last().map(|t| t.is_ident("then")).unwrap_or(false);
    starts_if && ends_then
}

fn is_unconditional_jump(tokens: &[Token]) -> bool {
    match tokens.first() {
        Some(t) if t.is_ident("goto") => true,
        Some(t) if t.is_ident("exit") => tokens
            .get(1)
            .map(|t2| t2.is_ident("sub") || t2.is_ident("function") || t2.is_ident("property"))
            .unwrap_or(false),
        Some(t) if t.is_ident("end") && tokens.len() == 1 => true,
        _ => false,
    }
}

fn is_local_decl_statement(tokens: &[Token]) -> bool {
    tokens
        .first()
        .map(|t| t.is_ident("dim") || t.is_ident("static") || t.is_ident("const"))
        .unwrap_or(false)
}

fn unquote_str(s: &str) -> String {
    s.trim_matches('"').replace("\"\"", "\"")
}

fn extract_paren_group<'t, 'src>(tokens: &'t [Token<'src>], open_idx: usize) -> (&'t [Token<'src>], usize) {
    let start = open_idx + 1;
    let mut depth = 1i32;
    let mut j = start;
    while j < tokens.len() && depth > 0 {
        if tokens[j].is_op("(") {
            depth += 1;
        } else if tokens[j].is_op(")") {
            depth -= 1;
            if depth == 0 {
                break;
            }
        }
        j += 1;
    }
    let inner = &tokens[start..j.min(tokens.len())];
    let end = if j < tokens.len() { j + 1 } else { j };
    (inner, end)
}

/// Walk a flattened procedure (or `With`) body, tracking an `unreachable`
/// flag across the flat statement sequence and recursing into nested
/// `With` bodies with a fresh flag of their own.
pub(super) fn walk_block<'a, 'src>(
    az: &mut Analyzer<'a, 'src>,
    filename: &str,
    proc_name: &str,
    scope: ScopeId,
    with_stack: &mut Vec<String>,
    body: &[BodyNode<'src>],
) {
    let mut unreachable = false;
    let mut prev_line: Option<usize> = None;
    let mut prev_was_if_header = false;

    for node in body {
        match node {
            BodyNode::Statement(stmt) => {
                let tokens = &stmt.tokens;
                if tokens.is_empty() {
                    continue;
                }
                if is_boundary_statement(tokens) || is_label_definition(tokens) {
                    unreachable = false;
                    prev_line = Some(stmt.line);
                    prev_was_if_header = false;
                    continue;
                }
                if unreachable {
                    az.diagnostics.push(Diagnostic::new(
                        filename,
                        stmt.line,
                        format!("Unreachable code in '{proc_name}'."),
                    ));
                    prev_line = Some(stmt.line);
                    prev_was_if_header = false;
                    continue;
                }

                let is_if_header = is_if_then_header(tokens);
                if is_local_decl_statement(tokens) {
                    extract_local_decls(az, filename, proc_name, scope, with_stack, tokens, stmt.line);
                } else {
                    analyze_tokens(az, filename, proc_name, scope, with_stack, tokens, stmt.line);
                }

                if is_unconditional_jump(tokens) {
                    let is_conditional_fragment = prev_was_if_header && prev_line == Some(stmt.line);
                    if !is_conditional_fragment {
                        unreachable = true;
                    }
                }
                prev_line = Some(stmt.line);
                prev_was_if_header = is_if_header;
            }
            BodyNode::With(w) => {
                let recv = analyze_tokens(az, filename, proc_name, scope, with_stack, &w.expr, w.line)
                    .unwrap_or_else(|| "Unknown".to_string());
                with_stack.push(recv);
                walk_block(az, filename, proc_name, scope, with_stack, &w.body);
                with_stack.pop();
                unreachable = false;
                prev_line = Some(w.line);
                prev_was_if_header = false;
            }
        }
    }
}

/// Scan a `Dim|Static|Const` statement's declarations, defining each in
/// `scope` before analyzing its initializer (spec.md's resolved Open
/// Question on `Dim x = expr` ordering). A name already present in
/// `scope`'s own table is a duplicate declaration and is not redefined.
fn extract_local_decls<'a, 'src>(
    az: &mut Analyzer<'a, 'src>,
    filename: &str,
    proc_name: &str,
    scope: ScopeId,
    with_stack: &mut Vec<String>,
    tokens: &[Token<'src>],
    line: usize,
) {
    for group in decl_scan::scan_declarations(&tokens[1..]) {
        if az.table.resolve_local(scope, group.name).is_some() {
            az.diagnostics.push(Diagnostic::new(
                filename,
                line,
                format!("Duplicate declaration of '{}' in '{proc_name}'.", group.name),
            ));
            continue;
        }
        az.table.define(scope, group.name, Symbol::new(group.type_name.clone(), SymbolKind::Variable));
        if !group.init.is_empty() {
            analyze_tokens(az, filename, proc_name, scope, with_stack, &group.init, line);
        }
    }
}

#[derive(Default)]
struct WalkState {
    last_type: Option<String>,
    last_kind: Option<SymbolKind>,
    last_name: Option<String>,
    last_symbol: Option<Symbol>,
    expect_member: bool,
    prev_keyword: Option<String>,
}

/// Analyze one statement's (or sub-expression's) flat token list, emitting
/// diagnostics and returning the tracked type of the trailing expression —
/// used by `With` to seed its receiver-type stack entry.
pub(super) fn analyze_tokens<'a, 'src>(
    az: &mut Analyzer<'a, 'src>,
    filename: &str,
    proc_name: &str,
    scope: ScopeId,
    with_stack: &mut Vec<String>,
    tokens: &[Token<'src>],
    line: usize,
) -> Option<String> {
    let mut state = WalkState::default();
    let mut i = 0usize;

    while i < tokens.len() {
        let tok = &tokens[i];
        match tok.kind {
            TokenKind::Ident => {
                let word = tok.value;

                if is_keyword(word) {
                    let kw = word.to_ascii_lowercase();
                    state = WalkState::default();
                    state.prev_keyword = Some(kw);
                    i += 1;
                    continue;
                }

                if tokens.get(i + 1).map(|t| t.is_op(":=")).unwrap_or(false) {
                    state = WalkState::default();
                    i += 2;
                    continue;
                }

                let at_label_position =
                    i == 0 || tokens.get(i - 1).map(|t| t.is_op(":")).unwrap_or(false);
                if at_label_position && tokens.get(i + 1).map(|t| t.is_op(":")).unwrap_or(false) {
                    i += 2;
                    continue;
                }

                if matches!(state.prev_keyword.as_deref(), Some("goto") | Some("resume") | Some("gosub")) {
                    state.prev_keyword = None;
                    i += 1;
                    continue;
                }

                if state.expect_member && state.last_type.is_some() {
                    let ty = state.last_type.clone().unwrap();
                    match members::resolve_member(az, &ty, word) {
                        Some(new_ty) => {
                            state.last_type = Some(new_ty);
                            state.last_kind = Some(SymbolKind::Variable);
                            state.last_symbol = None;
                        }
                        None => {
                            if !is_opaque_type(&ty) {
                                az.diagnostics.push(Diagnostic::new(
                                    filename,
                                    line,
                                    format!("Member '{word}' not found in type '{ty}' inside '{proc_name}'."),
                                ));
                            }
                            state.last_type = Some("Unknown".to_string());
                            state.last_kind = Some(SymbolKind::Unknown);
                            state.last_symbol = None;
                        }
                    }
                    state.expect_member = false;
                    state.last_name = Some(word.to_string());
                    i += 1;
                    continue;
                }

                // Root identifier resolution.
                if let Some(sym) = az.table.resolve(scope, word) {
                    state.last_type = Some(sym.type_name.clone());
                    state.last_kind = Some(sym.kind);
                    state.last_symbol = Some(sym.clone());
                } else if az.model.resolve_enum_member(word).is_some() {
                    state.last_type = Some("Long".to_string());
                    state.last_kind = Some(SymbolKind::EnumItem);
                    state.last_symbol = None;
                } else if az.table.has_form_ancestor(scope) {
                    state.last_type = Some("Object".to_string());
                    state.last_kind = Some(SymbolKind::Unknown);
                    state.last_symbol = None;
                } else {
                    az.diagnostics.push(Diagnostic::new(
                        filename,
                        line,
                        format!("Undefined identifier '{word}' in '{proc_name}'."),
                    ));
                    state.last_type = Some("Unknown".to_string());
                    state.last_kind = Some(SymbolKind::Unknown);
                    state.last_symbol = None;
                }
                state.last_name = Some(word.to_string());
                state.prev_keyword = None;
                i += 1;

                // A callable not immediately followed by `(` or `.` is being
                // used in space-separated call syntax — the rest of the
                // statement (possibly empty) is its argument list. End of
                // statement counts too, so a zero-arg bare call like
                // `MsgBox` still gets its `min_args` checked.
                if is_callable_kind(state.last_kind) {
                    let treat_as_call = match tokens.get(i) {
                        None => true,
                        Some(next) => looks_like_arg_start(next),
                    };
                    if treat_as_call {
                        let rest = &tokens[i..];
                        let groups = decl_scan::split_top_level_commas(rest);
                        if let Some(sig) = state.last_symbol.as_ref().and_then(|s| s.signature) {
                            signature::validate_arg_count(
                                az,
                                &groups,
                                sig,
                                filename,
                                line,
                                proc_name,
                                word,
                            );
                        }
                        for g in &groups {
                            analyze_tokens(az, filename, proc_name, scope, with_stack, g, line);
                        }
                        i = tokens.len();
                    }
                }
                continue;
            }
            TokenKind::Operator if tok.value == "." => {
                if state.last_type.is_none() {
                    if let Some(top) = with_stack.last() {
                        state.last_type = Some(top.clone());
                    } else {
                        az.diagnostics.push(Diagnostic::new(
                            filename,
                            line,
                            format!("Dot-reference without enclosing 'With' block in '{proc_name}'."),
                        ));
                        state.last_type = Some("Unknown".to_string());
                    }
                }
                state.expect_member = true;
                state.prev_keyword = None;
                i += 1;
            }
            TokenKind::Operator if tok.value == "(" => {
                if state.last_kind == Some(SymbolKind::Variable)
                    && is_scalar_primitive(state.last_type.as_deref().unwrap_or(""))
                {
                    az.diagnostics.push(Diagnostic::new(
                        filename,
                        line,
                        format!(
                            "'{}' is not callable in '{proc_name}'.",
                            state.last_name.clone().unwrap_or_default()
                        ),
                    ));
                }
                let (inner, end) = extract_paren_group(tokens, i);

                let mut create_object_type: Option<String> = None;
                if state.last_name.as_deref().map(|n| n.eq_ignore_ascii_case("createobject")).unwrap_or(false) {
                    if let Some(first) = inner.first() {
                        if first.kind == TokenKind::Str {
                            let cname = unquote_str(first.value);
                            if az.model.get_class(&cname).is_some() {
                                create_object_type = Some(cname);
                            }
                        }
                    }
                }

                if let Some(sig) = state.last_symbol.as_ref().and_then(|s| s.signature) {
                    let groups = decl_scan::split_top_level_commas(inner);
                    signature::validate_arg_count(
                        az,
                        &groups,
                        sig,
                        filename,
                        line,
                        proc_name,
                        state.last_name.as_deref().unwrap_or(""),
                    );
                }

                analyze_tokens(az, filename, proc_name, scope, with_stack, inner, line);

                let new_type = if let Some(ct) = create_object_type {
                    ct
                } else if let Some(cur) = state.last_type.clone() {
                    if let Some(stripped) = cur.strip_suffix("()") {
                        stripped.to_string()
                    } else if let Some(item_ty) = members::resolve_member(az, &cur, "Item") {
                        item_ty
                    } else {
                        cur
                    }
                } else {
                    "Unknown".to_string()
                };
                state.last_type = Some(new_type);
                state.last_kind = None;
                state.last_symbol = None;
                state.expect_member = false;
                i = end;
            }
            TokenKind::Operator => {
                state = WalkState::default();
                i += 1;
            }
            _ => {
                state = WalkState::default();
                i += 1;
            }
        }
    }

    state.last_type
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ModuleKind;
    use crate::lexer::lex;
    use crate::object_model::ObjectModel;
    use crate::parser::parse_module;
    use crate::preprocessor::{preprocess, DefineValue};
    use crate::symbol_table::ScopeKind;
    use std::collections::HashMap;

    fn body_for(src: &str) -> (Analyzer<'static, 'static>, ScopeId, Vec<BodyNode<'static>>) {
        let leaked_src: &'static str = Box::leak(src.to_string().into_boxed_str());
        let toks = lex(leaked_src);
        let filtered = preprocess(&toks, &HashMap::<String, DefineValue>::new());
        let (module, _) = parse_module("A.bas", ModuleKind::Module, &filtered);
        let model: &'static ObjectModel = Box::leak(Box::new(ObjectModel::empty()));
        let modules: &'static [crate::ast::Module<'static>] = Box::leak(vec![].into_boxed_slice());
        let mut az = crate::analyzer::pass1::run(modules, model);
        let scope = az.table.new_child(ScopeKind::Procedure, az.global);
        let body = module.procedures.into_iter().next().unwrap().body;
        (az, scope, body)
    }

    #[test]
    fn test_undefined_identifier_scenario() {
        let (mut az, scope, body) =
            body_for("Sub S()\n  Dim x As Integer\n  y = 1\nEnd Sub\n");
        walk_block(&mut az, "A.bas", "S", scope, &mut Vec::new(), &body);
        assert_eq!(az.diagnostics.len(), 1);
        assert_eq!(az.diagnostics[0].message, "Undefined identifier 'y' in 'S'.");
        assert_eq!(az.diagnostics[0].line, 3);
    }

    #[test]
    fn test_unreachable_after_exit_sub() {
        let (mut az, scope, body) = body_for("Sub V()\n  Exit Sub\n  Dim x As Long\nEnd Sub\n");
        walk_block(&mut az, "P.bas", "V", scope, &mut Vec::new(), &body);
        assert_eq!(az.diagnostics.len(), 1);
        assert!(az.diagnostics[0].message.contains("Unreachable"));
        assert_eq!(az.diagnostics[0].line, 3);
    }

    #[test]
    fn test_single_line_if_then_exit_sub_not_unreachable() {
        let (mut az, scope, body) =
            body_for("Sub V()\n  If x Then Exit Sub\n  Dim y As Long\nEnd Sub\n");
        walk_block(&mut az, "P.bas", "V", scope, &mut Vec::new(), &body);
        assert!(!az.diagnostics.iter().any(|d| d.message.contains("Unreachable")));
    }

    #[test]
    fn test_orphan_dot_outside_with() {
        let (mut az, scope, body) = body_for("Sub U()\n  .Save\nEnd Sub\n");
        walk_block(&mut az, "U.bas", "U", scope, &mut Vec::new(), &body);
        assert!(az.diagnostics.iter().any(|d| d.message.contains("without enclosing")));
    }

    #[test]
    fn test_duplicate_local_declaration() {
        let (mut az, scope, body) =
            body_for("Sub S()\n  Dim x As Integer\n  Dim x As Long\nEnd Sub\n");
        walk_block(&mut az, "A.bas", "S", scope, &mut Vec::new(), &body);
        assert!(az.diagnostics.iter().any(|d| d.message.contains("Duplicate declaration")));
    }
}
