//! Lowering configuration.

/// Whether indexing emits bounds checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundsCheckMode {
    #[default]
    On,
    Off,
}

impl BoundsCheckMode {
    #[must_use]
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::On)
    }
}

impl std::fmt::Display for BoundsCheckMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => write!(f, "on"),
            Self::Off => write!(f, "off"),
        }
    }
}

/// Options consulted while lowering array operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoweringConfig {
    /// Checks on element access and on slice copies.
    pub bounds_checks: BoundsCheckMode,
    /// Assertions are on. Keeps the checked slice copy even when bounds
    /// checks are off.
    pub assertions: bool,
    /// Constant array literals with at most this many elements are stored
    /// inline; longer ones are copied from a read-only global.
    pub literal_inline_limit: usize,
}

impl Default for LoweringConfig {
    fn default() -> Self {
        Self {
            bounds_checks: BoundsCheckMode::On,
            assertions: true,
            literal_inline_limit: 4,
        }
    }
}

impl LoweringConfig {
    /// No bounds checks and no assertions.
    #[must_use]
    pub fn unchecked() -> Self {
        Self {
            bounds_checks: BoundsCheckMode::Off,
            assertions: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_bounds_checks(mut self, mode: BoundsCheckMode) -> Self {
        self.bounds_checks = mode;
        self
    }

    #[must_use]
    pub fn with_assertions(mut self, assertions: bool) -> Self {
        self.assertions = assertions;
        self
    }

    #[must_use]
    pub fn with_literal_inline_limit(mut self, limit: usize) -> Self {
        self.literal_inline_limit = limit;
        self
    }

    /// Whether slice copies go through the checked runtime entry.
    #[must_use]
    pub fn checks_slice_copies(&self) -> bool {
        self.assertions || self.bounds_checks.is_enabled()
    }
}

#[cfg(test)]
mod tests;
