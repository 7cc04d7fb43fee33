// This module provides arena-based compilation session management using the bumpalo crate.
// CompilationSession wraps the caller-supplied Bump arena for one compilation unit: it
// allocates the zero-filled memory image backing the static and stack segments, interns
// string literal data (whose address becomes an immediate payload) and function names, and
// collects SessionStats. Everything allocated through the session shares the arena lifetime
// and is never freed individually. SessionStats tracks functions generated, instructions
// emitted with a per-opcode breakdown, the largest function, the register high-water mark
// and the number of unsupported-construct diagnostics, and renders them via Display.

//! Arena-based compilation session management.
//!
//! All compilation objects are tied to the session lifetime, eliminating
//! individual deallocation.

use bumpalo::Bump;
use hashbrown::HashMap;
use std::cell::RefCell;
use std::fmt;

/// Arena-based compilation session.
pub struct CompilationSession<'arena> {
    /// Arena allocator for compilation objects.
    arena: &'arena Bump,

    /// Session statistics for debugging.
    stats: RefCell<SessionStats>,

    /// String interning for literal data and names.
    interned_strings: RefCell<HashMap<String, &'arena str>>,
}

impl<'arena> CompilationSession<'arena> {
    /// Create a new compilation session with the given arena.
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            stats: RefCell::new(SessionStats::default()),
            interned_strings: RefCell::new(HashMap::new()),
        }
    }

    /// Allocate `len` zero-filled bytes in the session arena.
    pub fn alloc_zeroed(&self, len: usize) -> &'arena mut [u8] {
        self.arena.alloc_slice_fill_copy(len, 0u8)
    }

    /// Intern a string in the arena.
    pub fn intern_str(&self, s: &str) -> &'arena str {
        let mut strings = self.interned_strings.borrow_mut();
        if let Some(&interned) = strings.get(s) {
            return interned;
        }

        let interned = self.arena.alloc_str(s);
        strings.insert(s.to_string(), interned);
        interned
    }

    /// Record that a function finished generating.
    pub fn record_function_generated(&self, name: &str, instruction_count: usize) {
        let mut stats = self.stats.borrow_mut();
        stats.functions_generated += 1;

        if stats.largest_function_size < instruction_count || stats.largest_function_name.is_empty() {
            stats.largest_function_size = instruction_count;
            stats.largest_function_name = name.to_string();
        }
    }

    /// Record an emitted instruction.
    pub fn record_instruction_emitted(&self, opcode: &str) {
        let mut stats = self.stats.borrow_mut();
        stats.instructions_emitted += 1;
        *stats
            .instruction_counts
            .entry(opcode.to_string())
            .or_insert(0) += 1;
    }

    /// Record the register high-water mark of the pass.
    pub fn record_register_high_water(&self, registers: u16) {
        let mut stats = self.stats.borrow_mut();
        stats.register_high_water = stats.register_high_water.max(registers);
    }

    /// Record an unsupported-construct diagnostic.
    pub fn record_unsupported(&self) {
        self.stats.borrow_mut().unsupported_constructs += 1;
    }

    /// Record the final static segment size.
    pub fn record_static_size(&self, bytes: u64) {
        self.stats.borrow_mut().static_segment_size = bytes;
    }

    /// Get compilation statistics.
    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }
}

/// Compilation session statistics.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    /// Number of functions generated, preamble excluded.
    pub functions_generated: usize,

    /// Number of instructions emitted.
    pub instructions_emitted: usize,

    /// Count of each opcode emitted.
    pub instruction_counts: std::collections::HashMap<String, usize>,

    /// Instruction count of the largest function.
    pub largest_function_size: usize,

    /// Name of largest function.
    pub largest_function_name: String,

    /// Most scratch registers reserved at once.
    pub register_high_water: u16,

    /// Unsupported-construct diagnostics recorded.
    pub unsupported_constructs: usize,

    /// Page-rounded static segment size in bytes.
    pub static_segment_size: u64,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compilation Session Statistics:")?;
        writeln!(f, "  Functions generated: {}", self.functions_generated)?;
        writeln!(f, "  Instructions emitted: {}", self.instructions_emitted)?;
        writeln!(f, "  Static segment size: {} bytes", self.static_segment_size)?;
        writeln!(f, "  Register high-water mark: {}", self.register_high_water)?;
        writeln!(f, "  Unsupported constructs: {}", self.unsupported_constructs)?;

        if !self.largest_function_name.is_empty() {
            writeln!(
                f,
                "  Largest function: {} ({} instructions)",
                self.largest_function_name, self.largest_function_size
            )?;
        }

        if !self.instruction_counts.is_empty() {
            writeln!(f, "  Instruction breakdown:")?;
            let mut sorted: Vec<_> = self.instruction_counts.iter().collect();
            sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

            for (opcode, count) in sorted {
                writeln!(f, "    {}: {}", opcode, count)?;
            }
        }

        Ok(())
    }
}
