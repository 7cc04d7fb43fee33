//! Generator configuration.

use super::layout::{PAGE_SIZE, STACK_SIZE};
use crate::core::error::{CompileResult, InvariantViolation};

/// Tunables of a generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Alignment of the static segment size; must be a power of two.
    pub page_size: u64,
    /// Bytes reserved for the stack segment.
    pub stack_size: u64,
    /// Emit explicit zeroing for declarations without an initializer instead of
    /// relying on the zero-filled memory image. Zeroing holds the whole value in
    /// scratch registers, so a declaration wider than `u16::MAX` registers is
    /// reported as unsupported.
    pub explicit_zero_init: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            stack_size: STACK_SIZE,
            explicit_zero_init: false,
        }
    }
}

impl GeneratorConfig {
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_stack_size(mut self, stack_size: u64) -> Self {
        self.stack_size = stack_size;
        self
    }

    pub fn with_explicit_zero_init(mut self, enabled: bool) -> Self {
        self.explicit_zero_init = enabled;
        self
    }

    pub fn validate(&self) -> CompileResult<()> {
        if !self.page_size.is_power_of_two() {
            return Err(InvariantViolation::InvalidConfig {
                reason: format!("page size {} is not a power of two", self.page_size),
            }
            .into());
        }
        if usize::try_from(self.stack_size).is_err() {
            return Err(InvariantViolation::InvalidConfig {
                reason: format!("stack size {} does not fit in memory", self.stack_size),
            }
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GeneratorConfig::default();
        assert_eq!(config.page_size, 4096);
        assert_eq!(config.stack_size, 10 * 1024);
        assert!(!config.explicit_zero_init);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_page_size_must_be_power_of_two() {
        assert!(GeneratorConfig::default().with_page_size(3000).validate().is_err());
        assert!(GeneratorConfig::default().with_page_size(0).validate().is_err());
        assert!(GeneratorConfig::default().with_page_size(64).validate().is_ok());
    }
}
