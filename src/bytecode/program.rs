// This module defines the output of the bytecode generator. A Program owns the implicit
// preamble function (global initialization, run once before user code), every generated user
// function in completion order, the index of the entry function when a global `main` exists,
// and the MemoryImage: one zero-filled allocation from the session arena split into the
// page-aligned static segment followed by the fixed-budget stack segment. The two segments
// are disjoint views of that allocation. A Program is built once by the generator and never
// mutated afterwards; consumers (the debug printer, a future executor) only read it.

//! Generated bytecode program and its memory image.

use super::function::Function;

/// The single allocation backing the static ("BSS") and stack segments.
#[derive(Debug)]
pub struct MemoryImage<'arena> {
    bytes: &'arena mut [u8],
    bss_size: u64,
    stack_size: u64,
}

impl<'arena> MemoryImage<'arena> {
    /// Wrap `bytes`, whose length must be `bss_size + stack_size`.
    pub fn new(bytes: &'arena mut [u8], bss_size: u64, stack_size: u64) -> Self {
        debug_assert_eq!(bytes.len() as u64, bss_size + stack_size);
        Self {
            bytes,
            bss_size,
            stack_size,
        }
    }

    pub fn bss_size(&self) -> u64 {
        self.bss_size
    }

    pub fn stack_size(&self) -> u64 {
        self.stack_size
    }

    /// Offset of the stack segment within the allocation.
    pub fn stack_base(&self) -> u64 {
        self.bss_size
    }

    pub fn alloc_size(&self) -> u64 {
        self.bss_size + self.stack_size
    }

    pub fn bss(&self) -> &[u8] {
        &self.bytes[..self.bss_size as usize]
    }

    pub fn stack(&self) -> &[u8] {
        &self.bytes[self.bss_size as usize..]
    }

    /// Both segments, mutably and without overlap.
    pub fn segments_mut(&mut self) -> (&mut [u8], &mut [u8]) {
        self.bytes.split_at_mut(self.bss_size as usize)
    }
}

/// A complete bytecode program.
#[derive(Debug)]
pub struct Program<'arena> {
    preamble: Function<'arena>,
    functions: Vec<Function<'arena>>,
    entry: Option<usize>,
    memory: MemoryImage<'arena>,
}

impl<'arena> Program<'arena> {
    pub(crate) fn new(
        preamble: Function<'arena>,
        functions: Vec<Function<'arena>>,
        entry: Option<usize>,
        memory: MemoryImage<'arena>,
    ) -> Self {
        Self {
            preamble,
            functions,
            entry,
            memory,
        }
    }

    /// The implicit global initializer.
    pub fn preamble(&self) -> &Function<'arena> {
        &self.preamble
    }

    /// User functions, in the order their generation completed.
    pub fn functions(&self) -> &[Function<'arena>] {
        &self.functions
    }

    /// The function execution starts at, if a global `main` was declared.
    pub fn entry_function(&self) -> Option<&Function<'arena>> {
        self.entry.map(|i| &self.functions[i])
    }

    pub fn function(&self, name: &str) -> Option<&Function<'arena>> {
        self.functions.iter().find(|f| f.name() == Some(name))
    }

    pub fn memory(&self) -> &MemoryImage<'arena> {
        &self.memory
    }

    /// Instructions across the preamble and every function.
    pub fn instruction_count(&self) -> usize {
        self.preamble.instructions().len()
            + self
                .functions
                .iter()
                .map(|f| f.instructions().len())
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;

    #[test]
    fn test_memory_segments_are_disjoint() {
        let arena = Bump::new();
        let bytes = arena.alloc_slice_fill_copy(4096 + 1024, 0u8);
        let mut memory = MemoryImage::new(bytes, 4096, 1024);

        assert_eq!(memory.stack_base(), 4096);
        assert_eq!(memory.bss().len(), 4096);
        assert_eq!(memory.stack().len(), 1024);

        let (bss, stack) = memory.segments_mut();
        bss[4095] = 1;
        stack[0] = 2;
        assert_eq!(memory.bss()[4095], 1);
        assert_eq!(memory.stack()[0], 2);
    }
}
