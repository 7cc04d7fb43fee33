//! Per-function instruction sequences.

use std::fmt;

use super::instruction::{Instruction, Opcode};
use crate::core::register_file::Reg;

/// Identity of a generated function within one program. The preamble is always 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(pub u32);

impl FunctionId {
    pub const PREAMBLE: FunctionId = FunctionId(0);
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A generated function: its frame size and its append-only instruction sequence.
///
/// Fields are only mutable while the generator owns the function; once it is
/// handed to a [`Program`](super::Program) it is read-only.
#[derive(Debug, Clone)]
pub struct Function<'arena> {
    name: Option<&'arena str>,
    id: FunctionId,
    local_variables_size: u64,
    instructions: Vec<Instruction>,
}

impl<'arena> Function<'arena> {
    /// The implicit function that initializes globals.
    pub fn preamble() -> Self {
        Self {
            name: None,
            id: FunctionId::PREAMBLE,
            local_variables_size: 0,
            instructions: Vec::new(),
        }
    }

    pub fn new(name: &'arena str, id: FunctionId) -> Self {
        Self {
            name: Some(name),
            id,
            local_variables_size: 0,
            instructions: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&'arena str> {
        self.name
    }

    pub fn id(&self) -> FunctionId {
        self.id
    }

    /// Bytes of frame storage used by locals so far.
    pub fn local_variables_size(&self) -> u64 {
        self.local_variables_size
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Claim `size` bytes of frame storage and return their offset.
    pub(crate) fn reserve_local(&mut self, size: u64) -> u64 {
        let offset = self.local_variables_size;
        self.local_variables_size += size;
        offset
    }

    /// Append an instruction and return its sequence index.
    pub fn emit(
        &mut self,
        opcode: Opcode,
        src: Option<Reg>,
        dst: Option<Reg>,
        op_size: u8,
        big_const: u64,
    ) -> usize {
        let index = self.instructions.len();
        self.instructions.push(Instruction {
            opcode,
            src,
            dst,
            op_size,
            big_const,
            index,
        });
        log::trace!(
            "{}[{}]: {} src={:?} dst={:?} size={} const={:#x}",
            self.name.unwrap_or("<preamble>"),
            index,
            opcode,
            src,
            dst,
            op_size,
            big_const
        );
        index
    }
}
