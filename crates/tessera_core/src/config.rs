//! # Configuration
//!
//! Build-time ceilings for the id spaces and runtime storage tuning.
//!
//! The ceilings are compile-time constants: bitsets are sized from them and
//! exceeding one is a setup error, not something to recover from mid-frame.
//! Storage tuning is loaded once at startup from TOML.
//!
//! ```toml
//! initial_capacity = 1024
//! poison_freed_slots = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EcsError, EcsResult};

/// Maximum number of distinct data component types per registry.
pub const MAX_COMPONENTS: usize = 128;

/// Maximum number of distinct tag types per registry.
pub const MAX_TAG_COMPONENTS: usize = 64;

/// Maximum number of distinct message tag types per registry.
pub const MAX_MESSAGE_TAGS: usize = 64;

/// Maximum number of data components in one archetype.
pub const MAX_COMPONENTS_PER_ARCHETYPE: usize = 32;

/// Maximum number of tags in one archetype.
pub const MAX_TAGS_PER_ARCHETYPE: usize = 16;

/// Byte pattern written into dead slots when poisoning is enabled.
pub const POISON_BYTE: u8 = 0xCD;

const _: () = assert!(MAX_COMPONENTS % 64 == 0 && MAX_TAG_COMPONENTS % 64 == 0);
const _: () = assert!(MAX_COMPONENTS <= u16::MAX as usize);

/// Runtime tuning for [`ArchetypeStorage`](crate::ArchetypeStorage).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Capacity a storage is created with.
    pub initial_capacity: usize,
    /// Fill fresh and vacated slots with [`POISON_BYTE`].
    pub poison_freed_slots: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            poison_freed_slots: cfg!(debug_assertions),
        }
    }
}

impl StorageConfig {
    /// Debugging preset: small storages, poisoning always on.
    #[must_use]
    pub const fn debug() -> Self {
        Self {
            initial_capacity: 4,
            poison_freed_slots: true,
        }
    }

    /// Parses a configuration from TOML text.
    ///
    /// Missing keys fall back to [`StorageConfig::default`].
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the text is not valid TOML or
    /// contains unknown keys.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        toml::from_str(text).map_err(|e| EcsError::InvalidConfig(e.to_string()))
    }

    /// Loads a configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| EcsError::InvalidConfig(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = StorageConfig::from_toml_str(
            "initial_capacity = 256\npoison_freed_slots = true\n",
        )
        .unwrap();
        assert_eq!(config.initial_capacity, 256);
        assert!(config.poison_freed_slots);
    }

    #[test]
    fn test_missing_keys_use_defaults() {
        let config = StorageConfig::from_toml_str("initial_capacity = 8").unwrap();
        assert_eq!(config.initial_capacity, 8);
        assert_eq!(
            config.poison_freed_slots,
            StorageConfig::default().poison_freed_slots
        );
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = StorageConfig::from_toml_str("grow_factor = 2").unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(_)));
    }

    #[test]
    fn test_missing_file_rejected() {
        let err = StorageConfig::from_toml_file("/nonexistent/tessera.toml").unwrap_err();
        assert!(matches!(err, EcsError::InvalidConfig(_)));
    }
}
