//! Engine configuration

/// Array engine configuration
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Capacity below which a write never triggers the sparseness check (default: 256)
    pub min_sparse_index: u32,
    /// Dense capacity ceiling; growth at or above it converts to slow mode (default: 2^29)
    pub slot_limit: u32,
    /// Length-shrink gap from which slow arrays enumerate instead of walking (default: 2^24)
    pub shrink_enumeration_gap: u32,
    /// Maximum nesting of native calls (default: 1000)
    pub max_call_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_sparse_index: 256,
            slot_limit: 1 << 29,
            shrink_enumeration_gap: 1 << 24,
            max_call_depth: 1000,
        }
    }
}
