// This module holds the declaration and scope records of a compilation unit. Declarations and
// scopes live in index-addressed tables owned by FileAst and are referred to by DeclId and
// ScopeId, so identifiers, statements and the code generator can point at a declaration
// without shared ownership. Each Declaration knows its owning scope (fixed when it is
// declared), its sized type, its optional initializer and its flag set. The only field that
// changes after semantic analysis is memory_offset, a write-once cell the layout and code
// generation phase fills in exactly once; a second write is rejected.

//! Declarations, scopes and the compilation unit that owns them.

use std::cell::OnceCell;

use hashbrown::HashMap;

use super::{Definition, SourceLocation};
use super::types::SizedType;

/// Index of a declaration in its [`FileAst`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub u32);

/// Index of a scope in its [`FileAst`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

/// Declaration flag set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeclFlags(u32);

impl DeclFlags {
    pub const IS_CONSTANT: DeclFlags = DeclFlags(0x1);
    pub const HAS_BEEN_INFERRED: DeclFlags = DeclFlags(0x2);
    pub const HAS_BEEN_GENERATED: DeclFlags = DeclFlags(0x4);

    pub const fn empty() -> Self {
        DeclFlags(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: DeclFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: DeclFlags) {
        self.0 |= other.0;
    }

    pub const fn union(self, other: DeclFlags) -> Self {
        DeclFlags(self.0 | other.0)
    }
}

/// A named binding.
#[derive(Debug)]
pub struct Declaration {
    pub name: String,
    pub ty: Option<SizedType>,
    pub definition: Option<Definition>,
    pub flags: DeclFlags,
    pub location: SourceLocation,
    scope: ScopeId,
    memory_offset: OnceCell<u64>,
}

impl Declaration {
    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    pub fn is_constant(&self) -> bool {
        self.flags.contains(DeclFlags::IS_CONSTANT)
    }

    /// Whether the declared type is a function type.
    pub fn is_function_declaration(&self) -> bool {
        self.ty.as_ref().is_some_and(SizedType::is_function)
    }

    /// Byte offset in the static segment or the enclosing frame, once assigned.
    pub fn memory_offset(&self) -> Option<u64> {
        self.memory_offset.get().copied()
    }

    /// Record the storage offset. Fails with the already recorded offset on a second call.
    pub fn assign_memory_offset(&self, offset: u64) -> Result<(), u64> {
        self.memory_offset
            .set(offset)
            .map_err(|_| self.memory_offset().unwrap_or(offset))
    }
}

/// A lexical scope.
#[derive(Debug, Default)]
pub struct Scope {
    pub parent: Option<ScopeId>,
    decls: Vec<DeclId>,
    names: HashMap<String, DeclId>,
}

impl Scope {
    /// Declarations in declaration order.
    pub fn decls(&self) -> &[DeclId] {
        &self.decls
    }

    pub fn lookup(&self, name: &str) -> Option<DeclId> {
        self.names.get(name).copied()
    }

    pub fn is_global(&self) -> bool {
        self.parent.is_none()
    }
}

/// Root of a compilation unit: every scope and declaration of one file.
#[derive(Debug)]
pub struct FileAst {
    pub filename: Option<String>,
    /// Top-level items in source order.
    pub items: Vec<DeclId>,
    scopes: Vec<Scope>,
    decls: Vec<Declaration>,
    global_scope: ScopeId,
}

impl FileAst {
    pub fn new(filename: Option<String>) -> Self {
        Self {
            filename,
            items: Vec::new(),
            scopes: vec![Scope::default()],
            decls: Vec::new(),
            global_scope: ScopeId(0),
        }
    }

    pub fn global_scope(&self) -> ScopeId {
        self.global_scope
    }

    /// Open a new scope nested in `parent`.
    pub fn add_scope(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        id
    }

    /// Add a declaration to `scope`. Top-level declarations are also recorded as items.
    ///
    /// A later declaration with the same name shadows the earlier one for lookups,
    /// both stay in declaration order.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        ty: Option<SizedType>,
        flags: DeclFlags,
        location: SourceLocation,
    ) -> DeclId {
        let name = name.into();
        let id = DeclId(self.decls.len() as u32);
        self.decls.push(Declaration {
            name: name.clone(),
            ty,
            definition: None,
            flags,
            location,
            scope,
            memory_offset: OnceCell::new(),
        });

        let owner = &mut self.scopes[scope.0 as usize];
        owner.decls.push(id);
        owner.names.insert(name, id);

        if scope == self.global_scope {
            self.items.push(id);
        }
        id
    }

    /// Attach the initializer of a declaration.
    pub fn define(&mut self, decl: DeclId, definition: Definition) {
        self.decls[decl.0 as usize].definition = Some(definition);
    }

    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0 as usize]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    /// Whether the declaration lives in a scope without a parent.
    pub fn is_global(&self, id: DeclId) -> bool {
        self.scope(self.decl(id).scope).is_global()
    }

    /// Resolve `name` starting at `scope` and walking outwards.
    pub fn resolve(&self, mut scope: ScopeId, name: &str) -> Option<DeclId> {
        loop {
            let current = self.scope(scope);
            if let Some(id) = current.lookup(name) {
                return Some(id);
            }
            scope = current.parent?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::BasicType;

    #[test]
    fn test_flags() {
        let mut flags = DeclFlags::empty();
        assert!(!flags.contains(DeclFlags::IS_CONSTANT));
        flags.insert(DeclFlags::IS_CONSTANT);
        assert!(flags.contains(DeclFlags::IS_CONSTANT));
        assert!(!flags.contains(DeclFlags::HAS_BEEN_GENERATED));
        assert_eq!(
            DeclFlags::IS_CONSTANT.union(DeclFlags::HAS_BEEN_INFERRED).bits(),
            0x3
        );
    }

    #[test]
    fn test_declaration_order_and_lookup() {
        let mut ast = FileAst::new(None);
        let global = ast.global_scope();
        let x = ast.declare(global, "x", Some(SizedType::direct(BasicType::S32)), DeclFlags::empty(), SourceLocation::default());
        let y = ast.declare(global, "y", Some(SizedType::direct(BasicType::S32)), DeclFlags::empty(), SourceLocation::default());

        assert_eq!(ast.scope(global).decls(), &[x, y]);
        assert_eq!(ast.items, vec![x, y]);
        assert_eq!(ast.scope(global).lookup("y"), Some(y));
        assert!(ast.is_global(x));
    }

    #[test]
    fn test_resolve_walks_parents() {
        let mut ast = FileAst::new(None);
        let global = ast.global_scope();
        let x = ast.declare(global, "x", None, DeclFlags::empty(), SourceLocation::default());
        let inner = ast.add_scope(global);
        let y = ast.declare(inner, "y", None, DeclFlags::empty(), SourceLocation::default());

        assert_eq!(ast.resolve(inner, "x"), Some(x));
        assert_eq!(ast.resolve(inner, "y"), Some(y));
        assert_eq!(ast.resolve(global, "y"), None);
        assert!(!ast.is_global(y));
        assert!(ast.items.len() == 1);
    }

    #[test]
    fn test_memory_offset_is_write_once() {
        let mut ast = FileAst::new(None);
        let global = ast.global_scope();
        let x = ast.declare(global, "x", None, DeclFlags::empty(), SourceLocation::default());

        let decl = ast.decl(x);
        assert_eq!(decl.memory_offset(), None);
        decl.assign_memory_offset(16).unwrap();
        assert_eq!(decl.assign_memory_offset(32), Err(16));
        assert_eq!(decl.memory_offset(), Some(16));
    }
}
