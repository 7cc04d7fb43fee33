//! Test AST (TAST) fixtures for exercising the bytecode generator.
//!
//! A small textual format that builds a fully resolved, type-annotated
//! [`FileAst`] without a real front end. Identifiers are resolved through the
//! scope chain while parsing and every expression gets a type, so the result
//! is what the semantic stage would hand to the generator.
//!
//! # TAST Format
//!
//! ```text
//! ; Comments start with semicolon
//! x : s32 = 5;
//! greeting : string = "hi";
//! puts :: foreign fn(string, ...) -> s32;
//! main :: fn() {
//!     a : s64;
//!     a = 7;
//!     puts("x");
//!     return;
//! }
//! ```
//!
//! `name : T = e;` declares a variable, `name : T : e;` or `name :: e;` a
//! constant. A function type followed by a block is a function definition.

use thiserror::Error;

use crate::ast::{FileAst, SourceLocation};

pub mod check;
pub mod parser;

pub use check::{CheckDirective, RunDirective, TestRunner, TestSpec};

/// Malformed fixture text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{location}: {message}")]
pub struct ParseError {
    pub location: SourceLocation,
    pub message: String,
}

impl ParseError {
    pub fn new(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

/// Parse fixture text into a resolved AST.
pub fn parse_file(text: &str, filename: Option<&str>) -> Result<FileAst, ParseError> {
    parser::Parser::new(text, filename).parse()
}
