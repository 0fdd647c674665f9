//! Scoped, case-insensitive symbol table with parent-chain lookup.
//!
//! Scopes form a tree for the duration of one analysis run. Rather than
//! threading parent references through borrows (which fights the
//! recursive, multi-module shape of pass 2), scopes live in a flat arena
//! and hold a parent *index* — the arena-with-stable-indices approach
//! spec.md's design notes call out as the language-neutral way to avoid
//! ownership cycles here.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Module,
    Class,
    Form,
    Procedure,
    Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Procedure,
    Function,
    Global,
    Class,
    Module,
    Type,
    Library,
    EnumItem,
    Unknown,
}

/// Argument-count bounds for a callable symbol. `max_args: None` means
/// unbounded (a `ParamArray` argument, or no declared upper bound).
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub min_args: usize,
    pub max_args: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub type_name: String,
    pub kind: SymbolKind,
    pub signature: Option<Signature>,
}

impl Symbol {
    pub fn new(type_name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            type_name: type_name.into(),
            kind,
            signature: None,
        }
    }

    pub fn with_signature(mut self, sig: Signature) -> Self {
        self.signature = Some(sig);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

struct ScopeData {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    symbols: HashMap<String, Symbol>,
}

pub struct SymbolTable {
    scopes: Vec<ScopeData>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { scopes: Vec::new() }
    }

    /// Create the single global scope. Must be called exactly once, first.
    pub fn new_global(&mut self) -> ScopeId {
        self.push_scope(ScopeKind::Global, None)
    }

    pub fn new_child(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        self.push_scope(kind, Some(parent))
    }

    fn push_scope(&mut self, kind: ScopeKind, parent: Option<ScopeId>) -> ScopeId {
        self.scopes.push(ScopeData {
            kind,
            parent,
            symbols: HashMap::new(),
        });
        ScopeId(self.scopes.len() - 1)
    }

    pub fn kind_of(&self, scope: ScopeId) -> ScopeKind {
        self.scopes[scope.0].kind
    }

    pub fn parent_of(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0].parent
    }

    /// Any ancestor (including `scope` itself) has kind `Form`.
    pub fn has_form_ancestor(&self, scope: ScopeId) -> bool {
        let mut cur = Some(scope);
        while let Some(id) = cur {
            if self.kind_of(id) == ScopeKind::Form {
                return true;
            }
            cur = self.parent_of(id);
        }
        false
    }

    /// Define `name` in `scope`, overwriting any existing entry. The table
    /// itself never diagnoses a redefinition — callers that care (local
    /// `Dim` extraction) check `resolve_local` first.
    pub fn define(&mut self, scope: ScopeId, name: &str, symbol: Symbol) {
        self.scopes[scope.0]
            .symbols
            .insert(name.to_ascii_lowercase(), symbol);
    }

    /// Look up `name` in `scope`'s own table only, no ancestor walk.
    pub fn resolve_local(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        self.scopes[scope.0].symbols.get(&name.to_ascii_lowercase())
    }

    /// Look up `name` walking the parent chain starting at `scope`.
    pub fn resolve(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let key = name.to_ascii_lowercase();
        let mut cur = Some(scope);
        while let Some(id) = cur {
            if let Some(sym) = self.scopes[id.0].symbols.get(&key) {
                return Some(sym);
            }
            cur = self.scopes[id.0].parent;
        }
        None
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_insensitive_define_and_resolve() {
        let mut table = SymbolTable::new();
        let global = table.new_global();
        table.define(global, "MsgBox", Symbol::new("Variant", SymbolKind::Global));
        assert!(table.resolve(global, "msgbox").is_some());
        assert!(table.resolve(global, "MSGBOX").is_some());
    }

    #[test]
    fn test_child_resolves_through_parent() {
        let mut table = SymbolTable::new();
        let global = table.new_global();
        table.define(global, "Foo", Symbol::new("Long", SymbolKind::Global));
        let module = table.new_child(ScopeKind::Module, global);
        let proc = table.new_child(ScopeKind::Procedure, module);
        assert!(table.resolve(proc, "foo").is_some());
    }

    #[test]
    fn test_local_does_not_see_parent() {
        let mut table = SymbolTable::new();
        let global = table.new_global();
        table.define(global, "Foo", Symbol::new("Long", SymbolKind::Global));
        let module = table.new_child(ScopeKind::Module, global);
        assert!(table.resolve_local(module, "foo").is_none());
        assert!(table.resolve(module, "foo").is_some());
    }

    #[test]
    fn test_shadowing_prefers_nearest_scope() {
        let mut table = SymbolTable::new();
        let global = table.new_global();
        table.define(global, "x", Symbol::new("Long", SymbolKind::Global));
        let module = table.new_child(ScopeKind::Module, global);
        table.define(module, "x", Symbol::new("String", SymbolKind::Variable));
        assert_eq!(table.resolve(module, "x").unwrap().type_name, "String");
        assert_eq!(table.resolve(global, "x").unwrap().type_name, "Long");
    }

    #[test]
    fn test_form_ancestor_detection() {
        let mut table = SymbolTable::new();
        let global = table.new_global();
        let form_module = table.new_child(ScopeKind::Form, global);
        let proc = table.new_child(ScopeKind::Procedure, form_module);
        assert!(table.has_form_ancestor(proc));
        let plain_module = table.new_child(ScopeKind::Module, global);
        assert!(!table.has_form_ancestor(plain_module));
    }
}
