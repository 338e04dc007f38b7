//! # Archetype Queries
//!
//! A query is matched against archetype signatures, never against entities:
//! the scheduler tests each live storage once and then walks its columns.

use super::bits::ArchetypeBits;

/// Required / subtractive / require-any triple.
///
/// An archetype is compatible when it has every `required` id, none of the
/// `subtractive` ids, and at least one `require_any` id (an empty
/// `require_any` matches everything).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArchetypeQueryDesc {
    /// Ids the archetype must contain.
    pub required: ArchetypeBits,
    /// Ids the archetype must not contain.
    pub subtractive: ArchetypeBits,
    /// Ids of which the archetype must contain at least one.
    pub require_any: ArchetypeBits,
}

impl ArchetypeQueryDesc {
    /// Query that matches every archetype.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            required: ArchetypeBits::new(),
            subtractive: ArchetypeBits::new(),
            require_any: ArchetypeBits::new(),
        }
    }

    /// Replaces the required set.
    #[must_use]
    pub const fn with_required(mut self, bits: ArchetypeBits) -> Self {
        self.required = bits;
        self
    }

    /// Replaces the subtractive set.
    #[must_use]
    pub const fn with_subtractive(mut self, bits: ArchetypeBits) -> Self {
        self.subtractive = bits;
        self
    }

    /// Replaces the require-any set.
    #[must_use]
    pub const fn with_require_any(mut self, bits: ArchetypeBits) -> Self {
        self.require_any = bits;
        self
    }

    /// Tests an archetype signature against this query.
    #[inline]
    #[must_use]
    pub fn compatible(&self, bits: &ArchetypeBits) -> bool {
        bits.all(&self.required)
            & !self.subtractive.any(bits)
            & bits.any_or_empty(&self.require_any)
    }
}
