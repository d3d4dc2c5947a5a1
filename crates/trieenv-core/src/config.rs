//! Configuration management for trieenv tables
//!
//! Provides sizing presets for typical environment workloads
//! and validation for custom configurations.

/// Table configuration with sizing presets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Trie nodes reserved up front
    pub initial_node_capacity: usize,
    /// Anchor slots reserved up front
    pub initial_anchor_capacity: usize,
    /// Maximum number of live entries (None = unlimited)
    pub max_entries: Option<usize>,
    /// Maximum key size in bytes (None = unlimited)
    pub max_key_size: Option<usize>,
    /// Walk the anchor chain before releasing it at teardown
    pub verify_on_teardown: bool,
}

impl Config {
    /// A few hundred bindings: a package namespace or a local frame.
    pub fn standard() -> Self {
        Self {
            initial_node_capacity: 256,
            initial_anchor_capacity: 64,
            max_entries: None,
            max_key_size: None,
            verify_on_teardown: false,
        }
    }

    /// Hundreds of thousands of bindings loaded in bulk.
    pub fn large() -> Self {
        Self {
            initial_node_capacity: 1 << 16,
            initial_anchor_capacity: 1 << 14,
            max_entries: None,
            max_key_size: None,
            verify_on_teardown: false,
        }
    }

    /// Standard sizing with a hard entry limit.
    pub fn bounded(max_entries: usize) -> Self {
        let standard = Self::standard();
        Self {
            initial_anchor_capacity: standard.initial_anchor_capacity.min(max_entries),
            max_entries: Some(max_entries),
            ..standard
        }
    }

    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), String> {
        if self.initial_node_capacity > u32::MAX as usize {
            return Err("initial_node_capacity must fit in u32".into());
        }
        if self.initial_anchor_capacity > u32::MAX as usize {
            return Err("initial_anchor_capacity must fit in u32".into());
        }
        if self.max_entries == Some(0) {
            return Err("max_entries must be > 0 when set".into());
        }
        if let Some(max) = self.max_entries {
            if max > u32::MAX as usize {
                return Err("max_entries must fit in u32".into());
            }
            if self.initial_anchor_capacity > max {
                return Err("initial_anchor_capacity must be <= max_entries".into());
            }
        }
        if self.max_key_size == Some(0) {
            return Err("max_key_size must be > 0 when set".into());
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self { Self::standard() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_presets_valid() {
        assert!(Config::standard().validate().is_ok());
        assert!(Config::large().validate().is_ok());
        assert!(Config::bounded(10).validate().is_ok());
    }

    #[test]
    fn test_preset_ordering() {
        let s = Config::standard();
        let l = Config::large();
        assert!(l.initial_node_capacity > s.initial_node_capacity);
        assert!(l.initial_anchor_capacity > s.initial_anchor_capacity);
    }

    #[test]
    fn test_rejects_zero_limits() {
        let mut c = Config::standard();
        c.max_key_size = Some(0);
        assert!(c.validate().is_err());

        let mut c = Config::standard();
        c.max_entries = Some(0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_rejects_reservation_above_limit() {
        let mut c = Config::bounded(8);
        c.initial_anchor_capacity = 16;
        assert!(c.validate().is_err());
    }
}
