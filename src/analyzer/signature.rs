//! Argument-count validation (spec.md §4.4.4) and the `Signature` derived
//! from a procedure's argument list. Grounded in
//! `original_source/src/analyzer.py`'s `check_arg_count` and the
//! `min_args`/`max_args` convention object-model globals also carry.

use crate::analyzer::Analyzer;
use crate::ast::ProcedureDecl;
use crate::symbol_table::Signature;
use crate::token::Token;
use crate::types::Diagnostic;

/// `min_args` = non-optional, non-paramarray argument count. `max_args` is
/// `None` (unbounded) when any argument is `ParamArray`, else the total
/// argument count.
pub(crate) fn procedure_signature(proc: &ProcedureDecl) -> Signature {
    let min_args = proc.args.iter().filter(|a| !a.optional && !a.paramarray).count();
    let has_paramarray = proc.args.iter().any(|a| a.paramarray);
    let max_args = if has_paramarray { None } else { Some(proc.args.len()) };
    Signature { min_args, max_args }
}

/// A single comma-split group with exactly one (empty) entry means zero
/// arguments were actually written — `split_top_level_commas` always
/// returns at least one group, even for an empty token slice.
pub(crate) fn count_args(args: &[&[Token]]) -> usize {
    if args.len() == 1 && args[0].is_empty() {
        0
    } else {
        args.len()
    }
}

pub(crate) fn validate_arg_count(
    az: &mut Analyzer,
    args: &[&[Token]],
    sig: Signature,
    filename: &str,
    line: usize,
    proc_name: &str,
    callee_name: &str,
) {
    let n = count_args(args);
    if n < sig.min_args {
        az.diagnostics.push(Diagnostic::new(
            filename,
            line,
            format!(
                "'{callee_name}' expects at least {} argument(s) in '{proc_name}'.",
                sig.min_args
            ),
        ));
    } else if let Some(max) = sig.max_args {
        if n > max {
            az.diagnostics.push(Diagnostic::new(
                filename,
                line,
                format!("'{callee_name}' expects at most {max} argument(s) in '{proc_name}'."),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ProcKind, VariableDecl, Scope};

    fn proc_with_args(args: Vec<VariableDecl<'static>>) -> ProcedureDecl<'static> {
        let mut p = ProcedureDecl::new("P", ProcKind::Sub, 1);
        p.args = args;
        p
    }

    #[test]
    fn test_signature_all_required() {
        let p = proc_with_args(vec![
            VariableDecl::new("a", "Integer", Scope::Dim, 0),
            VariableDecl::new("b", "Integer", Scope::Dim, 0),
        ]);
        let sig = procedure_signature(&p);
        assert_eq!(sig.min_args, 2);
        assert_eq!(sig.max_args, Some(2));
    }

    #[test]
    fn test_signature_with_optional() {
        let mut opt = VariableDecl::new("b", "Integer", Scope::Dim, 0);
        opt.optional = true;
        let p = proc_with_args(vec![VariableDecl::new("a", "Integer", Scope::Dim, 0), opt]);
        let sig = procedure_signature(&p);
        assert_eq!(sig.min_args, 1);
        assert_eq!(sig.max_args, Some(2));
    }

    #[test]
    fn test_signature_with_paramarray_is_unbounded() {
        let mut rest = VariableDecl::new("rest", "Variant", Scope::Dim, 0);
        rest.paramarray = true;
        let p = proc_with_args(vec![rest]);
        let sig = procedure_signature(&p);
        assert_eq!(sig.max_args, None);
    }

    #[test]
    fn test_count_args_empty_call_is_zero() {
        let toks: Vec<Token> = Vec::new();
        let groups = crate::decl_scan::split_top_level_commas(&toks);
        assert_eq!(count_args(&groups), 0);
    }
}
