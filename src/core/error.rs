// This module defines the error types of the bytecode generator using the thiserror crate.
// CompileError has two classes: Unsupported, a recognised AST shape whose lowering does not
// exist yet (calls, returns, nested blocks, identifier/unary/binary evaluation, non-identifier
// assignment targets, assignment expressions, values wider than the register file), reported with the construct and its source
// location so callers can collect several; and Internal, a violated precondition that the
// semantic stage is supposed to guarantee, carrying an InvariantViolation that names the
// broken invariant (missing or malformed sizes, layout misuse, run directives that survived
// semantic analysis, register counter misuse, bad configuration). Diagnostics is the aggregate returned by compile_program when generation
// fails; it never comes with a partial program. CompileResult<T> is the usual alias.

//! Error types for the bytecode generator.
//!
//! Using thiserror for idiomatic error handling.

use std::fmt;

use thiserror::Error;

use crate::ast::SourceLocation;

/// Recognised constructs that have no bytecode lowering yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Construct {
    FunctionCallStatement,
    ReturnStatement,
    NestedBlockStatement,
    IdentifierExpression,
    UnaryOperation,
    BinaryOperation,
    FunctionCallExpression,
    MemberAccessExpression,
    IndexExpression,
    AssignmentExpression,
    CompoundAssignment,
    /// Assignment whose target is not a bare identifier.
    AssignmentTarget,
    /// Value needing more scratch registers than the index space holds.
    OversizedValue,
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Construct::FunctionCallStatement => "function call statement",
            Construct::ReturnStatement => "return statement",
            Construct::NestedBlockStatement => "nested statement block",
            Construct::IdentifierExpression => "identifier evaluation",
            Construct::UnaryOperation => "unary operation",
            Construct::BinaryOperation => "binary operation",
            Construct::FunctionCallExpression => "function call expression",
            Construct::MemberAccessExpression => "member access evaluation",
            Construct::IndexExpression => "index evaluation",
            Construct::AssignmentExpression => "assignment used as an expression",
            Construct::CompoundAssignment => "compound assignment",
            Construct::AssignmentTarget => "assignment to a non-identifier target",
            Construct::OversizedValue => "value wider than the scratch register file",
        };
        f.write_str(text)
    }
}

/// Preconditions of the generator that upstream stages must uphold.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("declaration `{name}` has no type")]
    MissingType { name: String },

    #[error("declaration `{name}` has a zero-sized type")]
    ZeroSizedType { name: String },

    #[error("declaration `{name}` has a size of {bits} bits, not a whole number of bytes")]
    UnalignedSize { name: String, bits: u32 },

    #[error("global layout requested for a scope that has an enclosing scope")]
    NestedScopeLayout,

    #[error("declaration `{name}` already has memory offset {existing}")]
    OffsetAlreadyAssigned { name: String, existing: u64 },

    #[error("declaration `{name}` is stored before any memory offset was assigned")]
    MissingOffset { name: String },

    #[error("store reached for zero-sized declaration `{name}`")]
    ZeroSizedStore { name: String },

    #[error("expression at {location} has no type")]
    MissingExpressionType { location: SourceLocation },

    #[error("unexpected {kind} at {location} during bytecode generation")]
    UnexpectedExpression {
        kind: &'static str,
        location: SourceLocation,
    },

    #[error("literal at {location} cannot be lowered: {reason}")]
    InvalidLiteral {
        location: SourceLocation,
        reason: &'static str,
    },

    #[error("function `{name}` is not foreign but has no body")]
    MissingFunctionBody { name: String },

    #[error("scratch register index space exhausted (requested {requested} past {current})")]
    RegisterOverflow { current: u16, requested: u64 },

    #[error("register restore to {mark} above current counter {current}")]
    RestoreAboveCounter { mark: u16, current: u16 },

    #[error("invalid generator configuration: {reason}")]
    InvalidConfig { reason: String },
}

/// Main error type for bytecode generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("{location}: {construct} is not supported by the bytecode generator yet")]
    Unsupported {
        construct: Construct,
        location: SourceLocation,
    },

    #[error("internal consistency failure: {0}")]
    Internal(#[from] InvariantViolation),
}

impl CompileError {
    pub fn unsupported(construct: Construct, location: SourceLocation) -> Self {
        CompileError::Unsupported {
            construct,
            location,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, CompileError::Unsupported { .. })
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, CompileError::Internal(_))
    }
}

/// Result type alias for generator operations.
pub type CompileResult<T> = Result<T, CompileError>;

/// Every error recorded by a failed generation pass, in the order found.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("bytecode generation failed with {} error(s)", .errors.len())]
pub struct Diagnostics {
    errors: Vec<CompileError>,
}

impl Diagnostics {
    pub fn new(errors: Vec<CompileError>) -> Self {
        Self { errors }
    }

    pub fn errors(&self) -> &[CompileError] {
        &self.errors
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The internal failure that aborted generation, if any.
    pub fn internal(&self) -> Option<&InvariantViolation> {
        self.errors.iter().find_map(|e| match e {
            CompileError::Internal(v) => Some(v),
            CompileError::Unsupported { .. } => None,
        })
    }
}

impl From<CompileError> for Diagnostics {
    fn from(error: CompileError) -> Self {
        Diagnostics::new(vec![error])
    }
}
