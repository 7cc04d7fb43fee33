//! Bytecode instruction records.

use std::fmt;

use crate::core::register_file::Reg;

/// Bytecode operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// Clear `dst`.
    ZeroReg,
    /// Load the 64-bit payload into `dst`.
    LoadBigConstantToReg,
    /// Store `src` to stack base + payload.
    StoreToStackPlusConstant,
    /// Store `src` to static segment base + payload.
    StoreToBssPlusConstant,
}

impl Opcode {
    pub const fn name(self) -> &'static str {
        match self {
            Opcode::ZeroReg => "BC_ZERO_REG",
            Opcode::LoadBigConstantToReg => "BC_LOAD_BIG_CONSTANT_TO_REG",
            Opcode::StoreToStackPlusConstant => "BC_STORE_TO_STACK_PLUS_CONSTANT",
            Opcode::StoreToBssPlusConstant => "BC_STORE_TO_BSS_PLUS_CONSTANT",
        }
    }

    pub const fn is_store(self) -> bool {
        matches!(
            self,
            Opcode::StoreToStackPlusConstant | Opcode::StoreToBssPlusConstant
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One bytecode instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub src: Option<Reg>,
    pub dst: Option<Reg>,
    /// Operand size in bytes, 1 to 8.
    pub op_size: u8,
    /// Immediate value or segment offset, as a raw bit pattern.
    pub big_const: u64,
    /// Position in the owning function's sequence.
    pub index: usize,
}

/// Bit-for-bit reinterpretation into an instruction payload.
///
/// This is never a numeric conversion; executors reinterpret the payload back
/// according to the operand type.
pub trait IntoPayload {
    fn into_payload(self) -> u64;
}

impl IntoPayload for u64 {
    fn into_payload(self) -> u64 {
        self
    }
}

impl IntoPayload for i64 {
    fn into_payload(self) -> u64 {
        u64::from_ne_bytes(self.to_ne_bytes())
    }
}

impl IntoPayload for f64 {
    fn into_payload(self) -> u64 {
        self.to_bits()
    }
}

impl IntoPayload for f32 {
    fn into_payload(self) -> u64 {
        self.to_bits() as u64
    }
}

impl IntoPayload for bool {
    fn into_payload(self) -> u64 {
        self as u64
    }
}

impl<T> IntoPayload for *const T {
    fn into_payload(self) -> u64 {
        self as usize as u64
    }
}

/// Operand size of the chunk that starts with `bits` remaining: whole bytes below 8, else 8.
pub fn truncate_op_size(bits: i64) -> u8 {
    let bytes = bits / 8;
    if bytes < 8 {
        bytes as u8
    } else {
        8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_payload_is_bit_pattern() {
        assert_eq!((-1i64).into_payload(), u64::MAX);
        assert_eq!((-3i64).into_payload(), 0xFFFF_FFFF_FFFF_FFFD);
    }

    #[test]
    fn test_float_payload_is_bit_pattern() {
        assert_eq!(1.5f64.into_payload(), 0x3FF8_0000_0000_0000);
        assert_eq!(1.5f32.into_payload(), 0x3FC0_0000);
    }

    #[test]
    fn test_pointer_payload_round_trips() {
        let data = [7u8, 8, 9];
        let payload = data.as_ptr().into_payload();
        assert_eq!(payload as usize as *const u8, data.as_ptr());
    }

    #[test]
    fn test_truncate_op_size() {
        assert_eq!(truncate_op_size(32), 4);
        assert_eq!(truncate_op_size(64), 8);
        assert_eq!(truncate_op_size(128), 8);
        assert_eq!(truncate_op_size(8), 1);
    }

    #[test]
    fn test_opcode_names() {
        assert_eq!(Opcode::StoreToBssPlusConstant.to_string(), "BC_STORE_TO_BSS_PLUS_CONSTANT");
        assert!(Opcode::StoreToStackPlusConstant.is_store());
        assert!(!Opcode::ZeroReg.is_store());
    }
}
