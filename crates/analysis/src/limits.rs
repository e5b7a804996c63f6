//! Resolver limits.

/// Longest dependency chain a query walks by default.
pub const DEFAULT_MAX_DEPENDENCY_DEPTH: usize = 1_024;

/// Knobs for dependency queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Maximum number of lines in one chain.
    pub max_depth: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPENDENCY_DEPTH,
        }
    }
}
