// This module is the type-annotated AST consumed by the bytecode generator. It is produced by
// the parser and semantic stages (or by the test_ast fixture reader) and arrives fully
// resolved: every declaration carries a sized type, every identifier points at its
// declaration and every scope is final. The node hierarchy is expressed as closed enums
// (Definition, Statement, ExprKind) so each dispatch point in the generator matches them
// exhaustively. Declarations and scopes themselves live in the index-addressed tables of
// FileAst (see scope.rs); the sized type model is in types.rs.

//! Resolved, type-annotated syntax tree.

use std::fmt;

pub mod scope;
pub mod types;

pub use scope::{DeclFlags, DeclId, Declaration, FileAst, Scope, ScopeId};
pub use types::{ArrayTooLarge, ArrayType, BasicType, DirectType, FunctionType, SizedType, POINTER_BITS};

/// Position of a node in its source file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Initializer of a declaration.
#[derive(Debug, Clone)]
pub enum Definition {
    Function(FunctionDefinition),
    Expression(Expression),
}

/// A function body bound to a declaration.
#[derive(Debug, Clone)]
pub struct FunctionDefinition {
    pub signature: FunctionType,
    /// `None` only for foreign functions.
    pub body: Option<StatementBlock>,
    pub location: SourceLocation,
}

impl FunctionDefinition {
    pub fn is_foreign(&self) -> bool {
        self.signature.is_foreign
    }
}

/// A `{ ... }` block with its own scope.
#[derive(Debug, Clone)]
pub struct StatementBlock {
    pub statements: Vec<Statement>,
    pub scope: ScopeId,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub enum Statement {
    /// Local declaration; the record lives in the enclosing block's scope.
    Declaration(DeclId),
    Assignment(Assignment),
    Call(FunctionCall),
    Return(ReturnStatement),
    Block(StatementBlock),
}

impl Statement {
    pub fn location(&self, ast: &FileAst) -> SourceLocation {
        match self {
            Statement::Declaration(id) => ast.decl(*id).location,
            Statement::Assignment(a) => a.location,
            Statement::Call(c) => c.location,
            Statement::Return(r) => r.location,
            Statement::Block(b) => b.location,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub lhs: Expression,
    pub rhs: Expression,
    pub op: AssignOp,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct FunctionCall {
    pub function_name: String,
    pub args: Vec<Expression>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub location: SourceLocation,
}

/// An expression with the type semantic analysis gave it.
#[derive(Debug, Clone)]
pub struct Expression {
    pub kind: ExprKind,
    pub ty: Option<SizedType>,
    pub location: SourceLocation,
}

impl Expression {
    pub fn new(kind: ExprKind, ty: Option<SizedType>, location: SourceLocation) -> Self {
        Self { kind, ty, location }
    }

    /// Literal expression typed by its own literal type.
    pub fn literal(literal: Literal, location: SourceLocation) -> Self {
        let ty = SizedType::Direct(literal.ty.clone());
        Self::new(ExprKind::Literal(literal), Some(ty), location)
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    Identifier(Identifier),
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Assignment(Box<Assignment>),
    Call(FunctionCall),
    MemberAccess {
        base: Box<Expression>,
        member: String,
    },
    Index {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    /// Compile-time `#run` directive, folded away by semantic analysis.
    Run(Box<Expression>),
}

#[derive(Debug, Clone)]
pub struct Identifier {
    pub name: String,
    pub decl: DeclId,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LiteralValue,
    pub ty: DirectType,
}

impl Literal {
    pub fn new(value: LiteralValue, basic: BasicType) -> Self {
        Self {
            value,
            ty: DirectType::new(basic),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
    BitNot,
    Deref,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}
