// This module is the bytecode back end. The instruction, function and program modules hold
// the output representation (flat instruction records appended to per-function sequences and
// the program that owns them together with its memory image). layout computes the static
// segment and the declaration sizing rules, config carries the generator's tunables, and
// generator performs the lowering from the resolved AST. printer renders programs in the
// textual dump format used by bcdump and the fixture tests.

//! Bytecode representation and generation.

pub mod config;
pub mod function;
pub mod generator;
pub mod instruction;
pub mod layout;
pub mod printer;
pub mod program;

pub use config::GeneratorConfig;
pub use function::{Function, FunctionId};
pub use generator::{compile_program, BytecodeGenerator, ENTRY_FUNCTION_NAME};
pub use instruction::{truncate_op_size, Instruction, IntoPayload, Opcode};
pub use layout::{compute_global_layout, page_round, PAGE_SIZE, STACK_SIZE};
pub use program::{MemoryImage, Program};
