//! Member resolution — a single ordered, case-insensitive lookup chain
//! shared by every `expr.Member` the walker sees. Grounded in
//! `original_source/src/analyzer.py`'s `resolve_member`, which tries UDTs,
//! then the object model, then module-scoped members, before giving up and
//! retrying against a qualified name's trailing segment.

use crate::analyzer::Analyzer;
use crate::ast::ModuleKind;

/// Resolve `member_name` on a value of `type_name`, returning the member's
/// declared type if found. Order matters: UDT members shadow everything
/// else, and the qualified-name retry is the last resort.
pub(super) fn resolve_member(az: &Analyzer, type_name: &str, member_name: &str) -> Option<String> {
    let tl = type_name.to_ascii_lowercase();
    let ml = member_name.to_ascii_lowercase();

    if let Some(udt) = az.udts.get(&tl) {
        if let Some(m) = udt.members.iter().find(|m| m.name.eq_ignore_ascii_case(member_name)) {
            return Some(m.type_name.clone());
        }
    }

    if let Some(class) = az.model.get_class(&tl) {
        if let Some(m) = class.members.get(&ml) {
            return Some(m.type_name.clone());
        }
    }

    if let Some(kind) = az.module_kind_of.get(&tl) {
        if *kind == ModuleKind::Module {
            if let Some(ty) = lookup_module_member(az, &tl, &ml) {
                return Some(ty);
            }
        } else {
            if let Some(ty) = lookup_module_member(az, &tl, &ml) {
                return Some(ty);
            }
            for fallback in fallback_chain(&tl, *kind) {
                if let Some(class) = az.model.get_class(fallback) {
                    if let Some(m) = class.members.get(&ml) {
                        return Some(m.type_name.clone());
                    }
                }
            }
        }
    }

    if let Some(idx) = type_name.rfind('.') {
        let trailing = &type_name[idx + 1..];
        if !trailing.is_empty() && !trailing.eq_ignore_ascii_case(type_name) {
            return resolve_member(az, trailing, member_name);
        }
    }

    None
}

fn lookup_module_member(az: &Analyzer, module_key: &str, member_key: &str) -> Option<String> {
    az.module_public_members
        .get(module_key)
        .and_then(|members| members.get(member_key))
        .map(|sym| sym.type_name.clone())
}

/// COM-style fallback classes tried after a module's own public members
/// come up empty. `ThisDocument` additionally falls back to `Document`/
/// `IVDocument`; any `Form`-kind module falls back to `UserForm`, then
/// unconditionally to `Object`.
fn fallback_chain(module_key: &str, kind: ModuleKind) -> Vec<&'static str> {
    let mut chain = Vec::new();
    if module_key == "thisdocument" {
        chain.push("document");
        chain.push("ivdocument");
    }
    if kind == ModuleKind::Form {
        chain.push("userform");
        chain.push("object");
    }
    chain
}
