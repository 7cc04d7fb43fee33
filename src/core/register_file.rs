//! Scratch register allocation.
//!
//! Registers are abstract 64-bit slots numbered by a single counter. Values are
//! given consecutive registers (`ceil(bits / 64)` of them) and released in LIFO
//! order: every statement or sub-expression takes a [`RegisterMark`] before it
//! reserves anything and restores to it when done, so registers of one statement
//! are never live in an unrelated later one. There is no spilling and no
//! cross-statement liveness.

use std::fmt;

use super::error::{CompileResult, InvariantViolation};

/// Width of one scratch register.
pub const REGISTER_BITS: u64 = 64;

/// Scratch register index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Reg(pub u16);

impl Reg {
    /// The `n`-th register after this one.
    pub const fn offset(self, n: u16) -> Reg {
        Reg(self.0 + n)
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Checkpoint of the register counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterMark(u16);

/// Number of registers needed to hold `size_in_bits`.
pub fn registers_for_bits(size_in_bits: u64) -> u64 {
    size_in_bits.div_ceil(REGISTER_BITS)
}

/// LIFO scratch register counter for one generation pass.
#[derive(Debug, Default)]
pub struct ScratchRegisters {
    next: u16,
    high_water: u16,
}

impl ScratchRegisters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current counter value.
    pub fn mark(&self) -> RegisterMark {
        RegisterMark(self.next)
    }

    /// Whether a value of `size_in_bits` still fits in the register index space.
    pub fn can_reserve(&self, size_in_bits: u64) -> bool {
        self.next as u64 + registers_for_bits(size_in_bits) <= u16::MAX as u64
    }

    /// Reserve enough consecutive registers for `size_in_bits` and return the first.
    pub fn reserve(&mut self, size_in_bits: u64) -> CompileResult<Reg> {
        let count = registers_for_bits(size_in_bits);
        let first = Reg(self.next);
        let end = self.next as u64 + count;
        if !self.can_reserve(size_in_bits) {
            return Err(InvariantViolation::RegisterOverflow {
                current: self.next,
                requested: count,
            }
            .into());
        }

        self.next = end as u16;
        self.high_water = self.high_water.max(self.next);
        log::trace!("reserved {} register(s) at r{} for {} bits", count, first, size_in_bits);
        Ok(first)
    }

    /// Release every register reserved since `mark` was taken.
    pub fn restore(&mut self, mark: RegisterMark) -> CompileResult<()> {
        if mark.0 > self.next {
            return Err(InvariantViolation::RestoreAboveCounter {
                mark: mark.0,
                current: self.next,
            }
            .into());
        }
        self.next = mark.0;
        Ok(())
    }

    /// Number of registers currently reserved.
    pub fn in_use(&self) -> u16 {
        self.next
    }

    /// Highest number of registers reserved at once.
    pub fn high_water(&self) -> u16 {
        self.high_water
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_advances_by_word_count() {
        let mut regs = ScratchRegisters::new();
        assert_eq!(regs.reserve(32).unwrap(), Reg(0));
        assert_eq!(regs.reserve(128).unwrap(), Reg(1));
        assert_eq!(regs.reserve(72).unwrap(), Reg(3));
        assert_eq!(regs.in_use(), 5);
    }

    #[test]
    fn test_zero_bits_reserve_nothing() {
        let mut regs = ScratchRegisters::new();
        assert_eq!(regs.reserve(0).unwrap(), Reg(0));
        assert_eq!(regs.in_use(), 0);
    }

    #[test]
    fn test_restore_reuses_registers() {
        let mut regs = ScratchRegisters::new();
        let mark = regs.mark();
        let first = regs.reserve(64).unwrap();
        regs.restore(mark).unwrap();

        let second = regs.reserve(64).unwrap();
        assert_eq!(first, second);
        assert_eq!(regs.high_water(), 1);
    }

    #[test]
    fn test_nested_marks() {
        let mut regs = ScratchRegisters::new();
        let outer = regs.mark();
        regs.reserve(128).unwrap();
        let inner = regs.mark();
        assert_eq!(regs.reserve(64).unwrap(), Reg(2));
        regs.restore(inner).unwrap();
        assert_eq!(regs.in_use(), 2);
        regs.restore(outer).unwrap();
        assert_eq!(regs.in_use(), 0);
        assert_eq!(regs.high_water(), 3);
    }

    #[test]
    fn test_restore_above_counter_is_rejected() {
        let mut regs = ScratchRegisters::new();
        regs.reserve(64).unwrap();
        let mark = regs.mark();
        regs.restore(RegisterMark(0)).unwrap();

        assert!(regs.restore(mark).is_err());
    }

    #[test]
    fn test_overflow_is_rejected() {
        let mut regs = ScratchRegisters::new();
        regs.reserve((u16::MAX as u64 - 1) * 64).unwrap();
        assert!(regs.reserve(128).is_err());
        assert_eq!(registers_for_bits(65), 2);
    }

    #[test]
    fn test_can_reserve_tracks_remaining_space() {
        let mut regs = ScratchRegisters::new();
        assert!(regs.can_reserve(u16::MAX as u64 * 64));
        assert!(!regs.can_reserve(u16::MAX as u64 * 64 + 1));

        regs.reserve(64).unwrap();
        assert!(!regs.can_reserve(u16::MAX as u64 * 64));
        assert!(regs.can_reserve((u16::MAX as u64 - 1) * 64));
    }
}
