//! Two-pass static analyzer: discovery (pass 1) then flow-sensitive
//! resolution (pass 2). Grounded in `original_source/src/analyzer.py`'s
//! `Analyzer` class — the split between a module-independent discovery
//! sweep and a per-procedure resolution walk, and the process-wide UDT
//! intern table that lets member lookups ignore declaration order.

mod members;
mod pass1;
mod pass2;
mod signature;
mod walker;

use std::collections::HashMap;

use crate::ast::{Module, ModuleKind, UdtDecl};
use crate::object_model::ObjectModel;
use crate::symbol_table::{ScopeId, Symbol, SymbolTable};
use crate::types::Diagnostic;

/// Shared analysis state threaded through both passes and the walker.
/// Lives only for the duration of one `analyze` call.
pub(crate) struct Analyzer<'a, 'src> {
    pub(crate) model: &'a ObjectModel,
    pub(crate) table: SymbolTable,
    pub(crate) global: ScopeId,
    /// Every UDT declared anywhere, public or private, keyed by lowercase
    /// name — member lookups don't care which module declared it.
    pub(crate) udts: HashMap<String, &'a UdtDecl<'src>>,
    pub(crate) module_kind_of: HashMap<String, ModuleKind>,
    /// Public (externally visible) members per module, keyed by lowercase
    /// module name, then lowercase member name.
    pub(crate) module_public_members: HashMap<String, HashMap<String, Symbol>>,
    pub(crate) module_scope_of: HashMap<String, ScopeId>,
    pub(crate) diagnostics: Vec<Diagnostic>,
}

/// Run the full two-pass analysis over every parsed module and return the
/// diagnostics in emission order.
pub fn analyze<'src>(modules: &[Module<'src>], model: &ObjectModel) -> Vec<Diagnostic> {
    let mut az = pass1::run(modules, model);
    pass2::run(&mut az, modules);
    az.diagnostics
}
