//! Resolution: build each module's scope (pre-populated with every
//! declaration regardless of visibility), then walk every procedure body
//! in a fresh procedure scope with its own `With` stack. Grounded in
//! `original_source/src/analyzer.py`'s `Analyzer._resolve` pass.

use crate::analyzer::pass1::{procedure_symbol, scope_kind_for_module};
use crate::analyzer::walker;
use crate::analyzer::Analyzer;
use crate::ast::{Module, ModuleKind};
use crate::symbol_table::{ScopeKind, Symbol, SymbolKind};

pub(super) fn run<'a, 'src>(az: &mut Analyzer<'a, 'src>, modules: &'a [Module<'src>]) {
    for module in modules {
        let module_scope = build_module_scope(az, module);
        az.module_scope_of.insert(module.name.to_ascii_lowercase(), module_scope);

        for proc in &module.procedures {
            if proc.body.is_empty() {
                continue;
            }
            let proc_scope = az.table.new_child(ScopeKind::Procedure, module_scope);
            for arg in &proc.args {
                az.table.define(proc_scope, arg.name, Symbol::new(arg.type_name.clone(), SymbolKind::Variable));
            }
            let mut with_stack: Vec<String> = Vec::new();
            walker::walk_block(az, &module.filename, proc.name, proc_scope, &mut with_stack, &proc.body);
        }
    }
}

/// A module scope sees every declaration the module makes, public or
/// private — only the *global* scope cares about visibility (pass 1).
fn build_module_scope(az: &mut Analyzer, module: &Module) -> crate::symbol_table::ScopeId {
    let scope = az.table.new_child(scope_kind_for_module(module.kind), az.global);

    for var in &module.variables {
        az.table.define(scope, var.name, Symbol::new(var.type_name.clone(), SymbolKind::Variable));
    }
    for proc in &module.procedures {
        az.table.define(scope, proc.name, procedure_symbol(proc));
    }
    for udt in module.udts.values() {
        az.table.define(scope, udt.name, Symbol::new(udt.name, SymbolKind::Type));
    }
    for en in module.enums.values() {
        az.table.define(scope, en.name, Symbol::new("Long", SymbolKind::Type));
    }
    if module.kind != ModuleKind::Module {
        az.table.define(scope, "Me", Symbol::new(module.name.clone(), SymbolKind::Class));
    }

    scope
}
