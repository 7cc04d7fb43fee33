// This module holds the infrastructure shared by every stage of the bytecode generator:
// session management (arena allocation through bumpalo, string interning and generation
// statistics), the LIFO scratch register counter, and the error types. None of it knows
// about the shape of the AST beyond source locations.

//! Core infrastructure.
//!
//! # Key Components
//!
//! ## Session Management (`session`)
//! - Arena-based memory allocation using `bumpalo`
//! - Interned string data and function names
//! - Generation statistics
//!
//! ## Scratch Registers (`register_file`)
//! - Single counter with marks restored in LIFO order
//! - Consecutive registers for values wider than 64 bits
//!
//! ## Errors (`error`)
//! - Unsupported constructs versus internal invariant violations
//! - `Diagnostics` aggregate for failed generation

pub mod error;
pub mod register_file;
pub mod session;

pub use error::{CompileError, CompileResult, Construct, Diagnostics, InvariantViolation};
pub use register_file::{Reg, RegisterMark, ScratchRegisters};
pub use session::{CompilationSession, SessionStats};
