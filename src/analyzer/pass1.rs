//! Discovery: register every externally-visible symbol across the whole
//! project before any procedure body is walked, so forward references and
//! cross-module references resolve regardless of file order. Grounded in
//! `original_source/src/analyzer.py`'s `Analyzer._discover` sweep.

use std::collections::HashMap;

use crate::analyzer::signature::procedure_signature;
use crate::analyzer::Analyzer;
use crate::ast::{Module, ModuleKind, ProcKind, Scope};
use crate::object_model::ObjectModel;
use crate::symbol_table::{ScopeKind, Symbol, SymbolKind, SymbolTable};

pub(super) fn run<'a, 'src>(modules: &'a [Module<'src>], model: &'a ObjectModel) -> Analyzer<'a, 'src> {
    let mut table = SymbolTable::new();
    let global = table.new_global();

    let mut az = Analyzer {
        model,
        table,
        global,
        udts: HashMap::new(),
        module_kind_of: HashMap::new(),
        module_public_members: HashMap::new(),
        module_scope_of: HashMap::new(),
        diagnostics: Vec::new(),
    };

    load_object_model_globals(&mut az);

    for module in modules {
        az.module_kind_of.insert(module.name.to_ascii_lowercase(), module.kind);

        // Register the module's own name in global scope unconditionally —
        // this is what lets a qualified reference like `OtherModule.Sub`
        // resolve `OtherModule` as a root identifier in pass 2.
        az.table.define(
            az.global,
            &module.name,
            Symbol::new(module.name.clone(), module_name_symbol_kind(module.kind)),
        );

        intern_udts(&mut az, module);
        register_public_types(&mut az, module);
        register_module_scope_symbols(&mut az, module);
        register_public_members(&mut az, module);

        // Predeclared class/form instances (VB_PredeclaredId) get the same
        // name defined again as their own default instance.
        if module.kind != ModuleKind::Module && module.is_predeclared() {
            az.table.define(
                az.global,
                &module.name,
                Symbol::new(module.name.clone(), SymbolKind::Class),
            );
        }
    }

    az
}

fn load_object_model_globals(az: &mut Analyzer) {
    for (name, desc) in &az.model.globals {
        let mut sym = Symbol::new(desc.type_name.clone(), SymbolKind::Global);
        if let Some(min_args) = desc.min_args {
            sym = sym.with_signature(crate::symbol_table::Signature {
                min_args,
                max_args: desc.max_args,
            });
        }
        az.table.define(az.global, name, sym);
    }
}

fn intern_udts<'a, 'src>(az: &mut Analyzer<'a, 'src>, module: &'a Module<'src>) {
    for udt in module.udts.values() {
        az.udts.insert(udt.name.to_ascii_lowercase(), udt);
    }
}

fn register_public_types(az: &mut Analyzer, module: &Module) {
    for udt in module.udts.values() {
        if udt.scope.is_externally_visible() {
            az.table.define(az.global, udt.name, Symbol::new(udt.name, SymbolKind::Type));
        }
    }
    for en in module.enums.values() {
        if en.scope.is_externally_visible() {
            az.table.define(az.global, en.name, Symbol::new("Long", SymbolKind::Type));
        }
    }
}

/// Standard modules (`Module` kind) contribute their public top-level
/// variables and procedures directly into the global namespace — that's
/// what lets `Foo` resolve a public `Sub Foo()` declared in `Module1`
/// without qualifying it.
fn register_module_scope_symbols(az: &mut Analyzer, module: &Module) {
    if module.kind != ModuleKind::Module {
        return;
    }
    for var in &module.variables {
        if var.scope.is_externally_visible() {
            az.table.define(az.global, var.name, Symbol::new(var.type_name.clone(), SymbolKind::Variable));
        }
    }
    for proc in &module.procedures {
        if proc.scope.is_externally_visible() {
            az.table.define(az.global, proc.name, procedure_symbol(proc));
        }
    }
}

/// Regardless of module kind, build the per-module public-member map used
/// by qualified member resolution (`Module1.Foo`, `frmMain.txtName`, a
/// class instance's public property).
fn register_public_members(az: &mut Analyzer, module: &Module) {
    let mut members = HashMap::new();
    for var in &module.variables {
        if var.scope.is_externally_visible() {
            members.insert(
                var.name.to_ascii_lowercase(),
                Symbol::new(var.type_name.clone(), SymbolKind::Variable),
            );
        }
    }
    for proc in &module.procedures {
        if proc.scope.is_externally_visible() {
            members.insert(proc.name.to_ascii_lowercase(), procedure_symbol(proc));
        }
    }
    az.module_public_members.insert(module.name.to_ascii_lowercase(), members);
}

pub(super) fn procedure_symbol(proc: &crate::ast::ProcedureDecl) -> Symbol {
    let kind = match proc.kind {
        ProcKind::Function | ProcKind::DeclareFunction | ProcKind::PropertyGet => SymbolKind::Function,
        _ => SymbolKind::Procedure,
    };
    Symbol::new(proc.return_type.clone(), kind).with_signature(procedure_signature(proc))
}

/// Symbol kind for a module's own name when registered into global scope —
/// standard modules resolve as `Module`, class/form modules as `Class`.
fn module_name_symbol_kind(kind: ModuleKind) -> SymbolKind {
    match kind {
        ModuleKind::Module => SymbolKind::Module,
        ModuleKind::Class | ModuleKind::Form => SymbolKind::Class,
    }
}

/// Scope kind a module's own root scope should have, matching
/// [`ModuleKind`] onto [`ScopeKind`] for pass 2's scope construction.
pub(super) fn scope_kind_for_module(kind: ModuleKind) -> ScopeKind {
    match kind {
        ModuleKind::Module => ScopeKind::Module,
        ModuleKind::Class => ScopeKind::Class,
        ModuleKind::Form => ScopeKind::Form,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::VariableDecl;

    #[test]
    fn test_public_module_variable_reaches_global_scope() {
        let mut m = Module::new("A.bas", ModuleKind::Module);
        m.name = "A".to_string();
        m.variables.push(VariableDecl::new("Counter", "Long", Scope::Public, 1));
        let model = ObjectModel::empty();
        let az = run(std::slice::from_ref(&m), &model);
        assert!(az.table.resolve(az.global, "counter").is_some());
    }

    #[test]
    fn test_private_module_variable_not_in_global_scope() {
        let mut m = Module::new("A.bas", ModuleKind::Module);
        m.name = "A".to_string();
        m.variables.push(VariableDecl::new("Secret", "Long", Scope::Private, 1));
        let model = ObjectModel::empty();
        let az = run(std::slice::from_ref(&m), &model);
        assert!(az.table.resolve(az.global, "secret").is_none());
    }

    #[test]
    fn test_udts_interned_process_wide_regardless_of_scope() {
        use crate::ast::UdtDecl;
        let mut m = Module::new("A.bas", ModuleKind::Module);
        m.name = "A".to_string();
        m.udts.insert(
            "point".to_string(),
            UdtDecl { name: "Point", scope: Scope::Private, members: Vec::new() },
        );
        let model = ObjectModel::empty();
        let az = run(std::slice::from_ref(&m), &model);
        assert!(az.udts.contains_key("point"));
    }

    #[test]
    fn test_module_name_itself_resolves_in_global_scope() {
        let mut m = Module::new("Utils.bas", ModuleKind::Module);
        m.name = "Utils".to_string();
        let model = ObjectModel::empty();
        let az = run(std::slice::from_ref(&m), &model);
        let sym = az.table.resolve(az.global, "utils").unwrap();
        assert_eq!(sym.type_name, "Utils");
    }

    #[test]
    fn test_non_predeclared_class_name_still_resolves_in_global_scope() {
        let mut m = Module::new("Cls.cls", ModuleKind::Class);
        m.name = "Cls".to_string();
        let model = ObjectModel::empty();
        let az = run(std::slice::from_ref(&m), &model);
        assert!(az.table.resolve(az.global, "cls").is_some());
    }

    #[test]
    fn test_object_model_global_signature_loaded() {
        let value: serde_json::Value =
            serde_json::from_str(r#"{"globals": {"MsgBox": {"type": "Integer", "min_args": 1, "max_args": 5}}}"#)
                .unwrap();
        let model = ObjectModel::from_json(&value).unwrap();
        let az = run(&[], &model);
        let sym = az.table.resolve(az.global, "msgbox").unwrap();
        let sig = sym.signature.unwrap();
        assert_eq!(sig.min_args, 1);
        assert_eq!(sig.max_args, Some(5));
    }

    #[test]
    fn test_public_class_member_registered_for_qualified_lookup() {
        use crate::ast::ProcedureDecl;
        let mut m = Module::new("Cls.cls", ModuleKind::Class);
        m.name = "Cls".to_string();
        let mut proc = ProcedureDecl::new("DoThing", ProcKind::Sub, 1);
        proc.scope = Scope::Public;
        m.procedures.push(proc);
        let model = ObjectModel::empty();
        let az = run(std::slice::from_ref(&m), &model);
        let members = az.module_public_members.get("cls").unwrap();
        assert!(members.contains_key("dothing"));
    }
}
