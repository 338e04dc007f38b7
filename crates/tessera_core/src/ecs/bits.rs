//! # Archetype Bits
//!
//! Fixed-width bitset over the component and tag id spaces. The first
//! [`MAX_COMPONENTS`] bits belong to data components, the following
//! [`MAX_TAG_COMPONENTS`] bits to tags, so a component and a tag with the same
//! raw id never alias.
//!
//! Every set operation is a single pass over the words, O(words) not O(bits).

use super::component::{ComponentId, TagComponentId};
use crate::config::{MAX_COMPONENTS, MAX_TAG_COMPONENTS};

const BITS_PER_WORD: usize = u64::BITS as usize;
const COMPONENT_WORDS: usize = MAX_COMPONENTS / BITS_PER_WORD;

/// Number of 64-bit words in an [`ArchetypeBits`].
pub const BIT_WORDS: usize = (MAX_COMPONENTS + MAX_TAG_COMPONENTS) / BITS_PER_WORD;

/// Set of component and tag ids.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArchetypeBits {
    words: [u64; BIT_WORDS],
}

impl ArchetypeBits {
    /// Creates an empty set.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            words: [0; BIT_WORDS],
        }
    }

    #[inline]
    fn component_bit(id: ComponentId) -> (usize, u64) {
        assert!(
            id.index() < MAX_COMPONENTS,
            "component id {} out of range (max {MAX_COMPONENTS})",
            id.value()
        );
        (id.index() / BITS_PER_WORD, 1 << (id.index() % BITS_PER_WORD))
    }

    #[inline]
    fn tag_bit(id: TagComponentId) -> (usize, u64) {
        assert!(
            id.index() < MAX_TAG_COMPONENTS,
            "tag id {} out of range (max {MAX_TAG_COMPONENTS})",
            id.value()
        );
        (
            COMPONENT_WORDS + id.index() / BITS_PER_WORD,
            1 << (id.index() % BITS_PER_WORD),
        )
    }

    /// Sets the bit of a data component.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not below [`MAX_COMPONENTS`].
    #[inline]
    pub fn add(&mut self, id: ComponentId) -> &mut Self {
        let (word, mask) = Self::component_bit(id);
        self.words[word] |= mask;
        self
    }

    /// Clears the bit of a data component.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not below [`MAX_COMPONENTS`].
    #[inline]
    pub fn remove(&mut self, id: ComponentId) -> &mut Self {
        let (word, mask) = Self::component_bit(id);
        self.words[word] &= !mask;
        self
    }

    /// Tests the bit of a data component.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not below [`MAX_COMPONENTS`].
    #[inline]
    #[must_use]
    pub fn exists(&self, id: ComponentId) -> bool {
        let (word, mask) = Self::component_bit(id);
        self.words[word] & mask != 0
    }

    /// Sets the bit of a tag.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not below [`MAX_TAG_COMPONENTS`].
    #[inline]
    pub fn add_tag(&mut self, id: TagComponentId) -> &mut Self {
        let (word, mask) = Self::tag_bit(id);
        self.words[word] |= mask;
        self
    }

    /// Clears the bit of a tag.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not below [`MAX_TAG_COMPONENTS`].
    #[inline]
    pub fn remove_tag(&mut self, id: TagComponentId) -> &mut Self {
        let (word, mask) = Self::tag_bit(id);
        self.words[word] &= !mask;
        self
    }

    /// Tests the bit of a tag.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not below [`MAX_TAG_COMPONENTS`].
    #[inline]
    #[must_use]
    pub fn exists_tag(&self, id: TagComponentId) -> bool {
        let (word, mask) = Self::tag_bit(id);
        self.words[word] & mask != 0
    }

    /// `self ⊇ other`.
    #[inline]
    #[must_use]
    pub fn all(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .fold(true, |acc, (a, b)| acc & (a & b == *b))
    }

    /// `self ∩ other ≠ ∅`.
    #[inline]
    #[must_use]
    pub fn any(&self, other: &Self) -> bool {
        self.words
            .iter()
            .zip(&other.words)
            .fold(0, |acc, (a, b)| acc | (a & b))
            != 0
    }

    /// [`any`](Self::any), or `true` when `other` is empty.
    #[inline]
    #[must_use]
    pub fn any_or_empty(&self, other: &Self) -> bool {
        let (common, rhs) = self
            .words
            .iter()
            .zip(&other.words)
            .fold((0, 0), |(common, rhs), (a, b)| (common | (a & b), rhs | b));
        common != 0 || rhs == 0
    }

    /// Bitwise identical.
    #[inline]
    #[must_use]
    pub fn equals(&self, other: &Self) -> bool {
        self.words == other.words
    }

    /// No bit set.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().fold(0, |acc, w| acc | w) == 0
    }

    /// Number of set bits across both spaces.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

impl FromIterator<ComponentId> for ArchetypeBits {
    fn from_iter<I: IntoIterator<Item = ComponentId>>(iter: I) -> Self {
        let mut bits = Self::new();
        for id in iter {
            bits.add(id);
        }
        bits
    }
}
