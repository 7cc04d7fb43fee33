//! c2bc - bytecode generation for a small C-like language.
//!
//! Takes a resolved, type-annotated [`ast::FileAst`] and lowers it to a
//! register-based bytecode [`bytecode::Program`]: a preamble that initializes
//! globals, one function per function definition, and a zero-filled memory
//! image holding the static segment and the stack.
//!
//! # Primary Usage
//!
//! ```ignore
//! use bumpalo::Bump;
//! use c2bc::bytecode::compile_program;
//! use c2bc::core::CompilationSession;
//!
//! let arena = Bump::new();
//! let session = CompilationSession::new(&arena);
//! let program = compile_program(&session, &ast)?;
//! println!("{}", program);
//! ```
//!
//! # Architecture
//!
//! - [`ast`] - Resolved syntax tree, scopes and sized types
//! - [`bytecode`] - Instructions, layout and the generator
//! - [`core`] - Session, scratch registers and errors
//! - [`test_ast`] - Textual AST fixtures and the check harness

pub mod ast;
pub mod bytecode;
pub mod core;
pub mod test_ast;

pub use crate::bytecode::{compile_program, BytecodeGenerator, GeneratorConfig, Program};
pub use crate::core::{CompilationSession, CompileError, Diagnostics, SessionStats};
