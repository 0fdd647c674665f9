//! AST types for the target dialect's coarse, recovery-oriented grammar.
//!
//! Design goals, carried over from the original Python-analyzer port this
//! crate replaced:
//! - Zero-copy: names and statement bodies borrow `&'src str`/`Token<'src>`
//!   slices from the source buffer.
//! - Tagged variants, not inheritance: every node is a closed sum type the
//!   analyzer's walker switches on, rather than an ad-hoc class hierarchy.
//! - Statement interiors stay opaque token lists — only `With` blocks
//!   affect expression-resolution semantics, so only `With` gets a
//!   first-class node; `If`/`For`/`Do`/`Select`/`While` are flattened into
//!   their contained statements during parsing.

use std::collections::HashMap;

use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    Module,
    Class,
    Form,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Dim,
    Private,
    Public,
    Global,
    Friend,
    Local,
}

impl Scope {
    pub fn is_externally_visible(&self) -> bool {
        matches!(self, Scope::Public | Scope::Global | Scope::Friend)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    ByRef,
    ByVal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcKind {
    Sub,
    Function,
    PropertyGet,
    PropertyLet,
    PropertySet,
    Event,
    DeclareSub,
    DeclareFunction,
}

/// A variable or argument declaration. The same type backs `Dim`/module-level
/// declarations and procedure argument lists — arguments simply leave `scope`
/// at its default and use `optional`/`paramarray`/`mechanism` instead.
#[derive(Debug, Clone)]
pub struct VariableDecl<'src> {
    pub name: &'src str,
    pub type_name: String,
    pub scope: Scope,
    pub optional: bool,
    pub paramarray: bool,
    pub mechanism: Mechanism,
    pub line: usize,
}

impl<'src> VariableDecl<'src> {
    pub fn new(name: &'src str, type_name: impl Into<String>, scope: Scope, line: usize) -> Self {
        Self {
            name,
            type_name: type_name.into(),
            scope,
            optional: false,
            paramarray: false,
            mechanism: Mechanism::ByRef,
            line,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcedureDecl<'src> {
    pub name: &'src str,
    pub kind: ProcKind,
    pub return_type: String,
    pub scope: Scope,
    pub args: Vec<VariableDecl<'src>>,
    pub body: Vec<BodyNode<'src>>,
    pub lib_name: Option<String>,
    pub alias_name: Option<String>,
    pub is_ptr_safe: bool,
    pub line: usize,
}

impl<'src> ProcedureDecl<'src> {
    pub fn new(name: &'src str, kind: ProcKind, line: usize) -> Self {
        Self {
            name,
            kind,
            return_type: "Variant".to_string(),
            scope: Scope::Public,
            args: Vec::new(),
            body: Vec::new(),
            lib_name: None,
            alias_name: None,
            is_ptr_safe: false,
            line,
        }
    }

    pub fn is_callable_kind(&self) -> bool {
        matches!(
            self.kind,
            ProcKind::Sub
                | ProcKind::Function
                | ProcKind::DeclareSub
                | ProcKind::DeclareFunction
                | ProcKind::PropertyGet
        )
    }
}

#[derive(Debug, Clone)]
pub struct WithNode<'src> {
    pub expr: Vec<Token<'src>>,
    pub body: Vec<BodyNode<'src>>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub struct StatementNode<'src> {
    pub tokens: Vec<Token<'src>>,
    pub line: usize,
}

#[derive(Debug, Clone)]
pub enum BodyNode<'src> {
    Statement(StatementNode<'src>),
    With(WithNode<'src>),
}

#[derive(Debug, Clone)]
pub struct UdtDecl<'src> {
    pub name: &'src str,
    pub scope: Scope,
    pub members: Vec<VariableDecl<'src>>,
}

#[derive(Debug, Clone)]
pub struct EnumDecl<'src> {
    pub name: &'src str,
    pub scope: Scope,
    pub members: Vec<&'src str>,
}

#[derive(Debug, Clone)]
pub struct Module<'src> {
    pub filename: String,
    pub name: String,
    pub kind: ModuleKind,
    pub attributes: HashMap<String, String>,
    pub variables: Vec<VariableDecl<'src>>,
    pub procedures: Vec<ProcedureDecl<'src>>,
    pub udts: HashMap<String, UdtDecl<'src>>,
    pub enums: HashMap<String, EnumDecl<'src>>,
}

impl<'src> Module<'src> {
    pub fn new(filename: impl Into<String>, kind: ModuleKind) -> Self {
        let filename = filename.into();
        Self {
            name: filename.clone(),
            filename,
            kind,
            attributes: HashMap::new(),
            variables: Vec::new(),
            procedures: Vec::new(),
            udts: HashMap::new(),
            enums: HashMap::new(),
        }
    }

    pub fn is_predeclared(&self) -> bool {
        self.attributes
            .get("VB_PredeclaredId")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}
