//! # Core Error Types
//!
//! All errors that can occur in the registry, archetype and storage layers.

use thiserror::Error;

/// Numbering space a type id is allocated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IdSpace {
    /// Components that occupy storage.
    Component,
    /// Zero-sized presence markers.
    Tag,
    /// Message tags.
    MessageTag,
}

impl std::fmt::Display for IdSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Component => f.write_str("component"),
            Self::Tag => f.write_str("tag"),
            Self::MessageTag => f.write_str("message tag"),
        }
    }
}

/// Errors that can occur in the storage core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// More distinct types were registered than the build-time ceiling allows.
    #[error("{space} id space exhausted: limit is {limit}")]
    ComponentLimitExceeded {
        /// The id space that ran out.
        space: IdSpace,
        /// The configured ceiling.
        limit: usize,
    },

    /// A type with a non-zero size was registered as a tag.
    #[error("type {0} is not zero-sized and cannot be a tag")]
    NotZeroSized(&'static str),

    /// A zero-sized type was registered as a data component.
    #[error("type {0} is zero-sized and must be registered as a tag")]
    ZeroSizedComponent(&'static str),

    /// An archetype description holds too many data components.
    #[error("too many components in archetype: limit is {limit}")]
    TooManyComponents {
        /// Per-archetype ceiling.
        limit: usize,
    },

    /// An archetype description holds too many tags.
    #[error("too many tags in archetype: limit is {limit}")]
    TooManyTags {
        /// Per-archetype ceiling.
        limit: usize,
    },

    /// The storage is full; reserve more capacity and retry.
    #[error("storage full: capacity {capacity}")]
    CapacityExceeded {
        /// Current capacity.
        capacity: usize,
    },

    /// A slot index outside `[0, len)` was used.
    #[error("index {index} out of bounds for storage of length {len}")]
    IndexOutOfBounds {
        /// Offending index.
        index: usize,
        /// Number of occupied slots.
        len: usize,
    },

    /// A structural mutation was attempted while readers hold the storage.
    #[error("storage is locked by {readers} reader(s)")]
    StorageLocked {
        /// Number of outstanding locks.
        readers: usize,
    },

    /// The requested capacity does not produce a valid memory layout.
    #[error("layout overflow for capacity {capacity}")]
    LayoutOverflow {
        /// Requested capacity.
        capacity: usize,
    },

    /// An archetype description mixed types from two registries.
    #[error("archetype description mixes types from different registries")]
    RegistryMismatch,

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for storage core operations.
pub type EcsResult<T> = Result<T, EcsError>;
