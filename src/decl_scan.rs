//! Shared token-scanning helpers used by both the parser's module-level
//! declaration handling and the analyzer's local-declaration extractor
//! (spec.md §4.4.2) — the same `(name [() ] [As [New] Type] [= init])`
//! shape appears in both places, just with different callers consuming
//! the result.

use crate::token::Token;

/// Split `tokens` on top-level commas, honoring parenthesis nesting so a
/// comma inside a call or array-bound expression doesn't split the group.
pub fn split_top_level_commas<'t, 'src>(tokens: &'t [Token<'src>]) -> Vec<&'t [Token<'src>]> {
    let mut groups = Vec::new();
    let mut depth = 0i32;
    let mut start = 0usize;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.is_op("(") {
            depth += 1;
        } else if tok.is_op(")") {
            depth -= 1;
        } else if tok.is_op(",") && depth == 0 {
            groups.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    groups.push(&tokens[start..]);
    groups
}

#[derive(Debug, Clone)]
pub struct DeclGroup<'src> {
    pub name: &'src str,
    pub type_name: String,
    pub is_array: bool,
    pub init: Vec<Token<'src>>,
}

/// Scan a single `name [()] [As [New] Qualified.Type] [= expr]` segment.
/// Returns `None` if the segment doesn't start with an identifier (e.g. a
/// trailing empty group from a stray comma).
fn scan_one<'src>(segment: &[Token<'src>]) -> Option<DeclGroup<'src>> {
    let mut i = 0;
    let name = segment.get(i)?;
    if !name.is_kind(crate::token::TokenKind::Ident) {
        return None;
    }
    let name = name.value;
    i += 1;

    let mut is_array = false;
    if segment.get(i).map(|t| t.is_op("(")).unwrap_or(false) {
        is_array = true;
        let mut depth = 1;
        i += 1;
        while i < segment.len() && depth > 0 {
            if segment[i].is_op("(") {
                depth += 1;
            } else if segment[i].is_op(")") {
                depth -= 1;
            }
            i += 1;
        }
    }

    let mut type_name = "Variant".to_string();
    let mut has_explicit_type = false;
    if segment.get(i).map(|t| t.is_ident("as")).unwrap_or(false) {
        i += 1;
        if segment.get(i).map(|t| t.is_ident("new")).unwrap_or(false) {
            i += 1;
        }
        let mut parts = Vec::new();
        while let Some(t) = segment.get(i) {
            if t.is_kind(crate::token::TokenKind::Ident) {
                parts.push(t.value);
                i += 1;
                if segment.get(i).map(|t2| t2.is_op(".")).unwrap_or(false) {
                    i += 1;
                    continue;
                }
                break;
            }
            break;
        }
        if !parts.is_empty() {
            type_name = parts.join(".");
            has_explicit_type = true;
        }
    }
    let _ = has_explicit_type;

    if is_array {
        type_name.push_str("()");
    }

    let mut init = Vec::new();
    if segment.get(i).map(|t| t.is_op("=")).unwrap_or(false) {
        i += 1;
        init = segment[i..].to_vec();
    }

    Some(DeclGroup { name, type_name, is_array, init })
}

/// Scan a full declaration statement's tokens (with any leading
/// `Dim`/`Static`/`Const`/scope keyword already stripped by the caller)
/// into one [`DeclGroup`] per comma-separated name. Matches the dialect's
/// real semantics: `As Type` applies only to the name immediately
/// preceding it, not to earlier names in the same comma list — `Dim a, b
/// As Integer` leaves `a` an implicit `Variant`.
pub fn scan_declarations<'src>(tokens: &[Token<'src>]) -> Vec<DeclGroup<'src>> {
    split_top_level_commas(tokens)
        .into_iter()
        .filter_map(scan_one)
        .collect()
}
