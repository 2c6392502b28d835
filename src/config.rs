//! Session configuration

use serde::{Deserialize, Serialize};

/// How fresh row identifiers are produced for INSERT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdStrategy {
    /// Store auto-increment when the store offers it, otherwise the clock
    Auto,
    /// Always delegate to the store's auto-increment key column
    StoreAutoIncrement,
    /// Always synthesize identifiers from the wall clock
    Clock,
}

/// Fallback engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Answer unrecognised SELECTs by materializing tables into SQLite.
    /// When disabled those statements fail as unsupported.
    pub enabled: bool,

    /// Materialize into a temporary on-disk database instead of memory
    pub spill_to_disk: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            spill_to_disk: false,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Constant first key component of every base table row
    pub partition: i64,

    /// Prefix for index table names: `<prefix>_<table>_<column>`
    pub index_prefix: String,

    pub id_strategy: IdStrategy,

    pub fallback: FallbackConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            partition: 0,
            index_prefix: "ix".to_string(),
            id_strategy: IdStrategy::Auto,
            fallback: FallbackConfig::default(),
        }
    }
}

impl Config {
    /// Create config for tests: clock ids are never used unless asked for,
    /// so identifiers stay small and predictable.
    pub fn for_testing() -> Self {
        Self {
            id_strategy: IdStrategy::StoreAutoIncrement,
            ..Self::default()
        }
    }
}
