//! # Entity Identifiers
//!
//! The storage core never allocates entity ids itself; an external directory
//! hands them out. Storages only keep them in their entity column so a slot
//! can be mapped back to its owner and stale handles can be detected.

/// Stable identity of an entity.
///
/// - Lower 32 bits: directory index
/// - Upper 32 bits: generation, bumped when the index is reused
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Null/invalid entity id.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates an entity id from a directory index and generation.
    ///
    /// Index `u32::MAX` at generation `u32::MAX` is reserved for
    /// [`EntityId::NULL`].
    ///
    /// # Panics
    ///
    /// In debug builds, panics if the pair is the reserved one.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        debug_assert!(
            index != u32::MAX || generation != u32::MAX,
            "index/generation pair is reserved for EntityId::NULL"
        );
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Rebuilds an id from [`EntityId::to_bits`].
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw 64-bit representation.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Directory index portion.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Generation portion.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// `true` unless this is [`EntityId::NULL`].
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != u64::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_valid() {
            write!(f, "{}v{}", self.index(), self.generation())
        } else {
            f.write_str("null")
        }
    }
}
