//! # Column Layout
//!
//! Computes where each column of an archetype storage starts inside its single
//! allocation:
//!
//! ```text
//! offset 0                 aligned                aligned
//! | EntityId x capacity | pad | Comp0 x capacity | pad | Comp1 x capacity |
//! ```
//!
//! Each column starts at the next multiple of its component's alignment, and
//! the whole block is aligned to the archetype's largest alignment, so every
//! element of every column is properly aligned.

use std::alloc::Layout;
use std::mem::size_of;

use crate::ecs::{Archetype, EntityId};
use crate::error::{EcsError, EcsResult};

/// Rounds `value` up to a multiple of `align` (a power of two).
///
/// Returns `None` on overflow.
#[inline]
#[must_use]
pub fn align_up(value: usize, align: usize) -> Option<usize> {
    debug_assert!(align.is_power_of_two(), "alignment must be a power of 2");
    let mask = align - 1;
    value.checked_add(mask).map(|v| v & !mask)
}

/// Byte offsets of every column for one capacity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnLayout {
    offsets: Vec<usize>,
    capacity: usize,
    layout: Layout,
}

impl ColumnLayout {
    /// Lays out `capacity` rows of `archetype`.
    ///
    /// The entity column always sits at offset 0. Blocks are never zero-sized,
    /// so a capacity of 0 still yields a valid, aligned allocation.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::LayoutOverflow`] if the block would not fit `isize`.
    pub fn new(archetype: &Archetype, capacity: usize) -> EcsResult<Self> {
        let overflow = || EcsError::LayoutOverflow { capacity };

        let mut offset = size_of::<EntityId>()
            .checked_mul(capacity)
            .ok_or_else(overflow)?;
        let mut offsets = Vec::with_capacity(archetype.count());

        for info in archetype.components() {
            offset = align_up(offset, info.align()).ok_or_else(overflow)?;
            offsets.push(offset);
            let column = info.size().checked_mul(capacity).ok_or_else(overflow)?;
            offset = offset.checked_add(column).ok_or_else(overflow)?;
        }

        let layout =
            Layout::from_size_align(offset.max(1), archetype.max_align()).map_err(|_| overflow())?;

        Ok(Self {
            offsets,
            capacity,
            layout,
        })
    }

    /// Offset of data column `column`.
    #[inline]
    #[must_use]
    pub fn offset(&self, column: usize) -> usize {
        self.offsets[column]
    }

    /// Offsets of all data columns, in archetype order.
    #[inline]
    #[must_use]
    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Rows this layout was computed for.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Allocation layout of the whole block.
    #[inline]
    #[must_use]
    pub fn layout(&self) -> Layout {
        self.layout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{ArchetypeDesc, ComponentRegistry};

    #[derive(Default)]
    struct Flag {
        _value: u8,
    }

    #[derive(Default)]
    #[repr(align(16))]
    struct Transform {
        _m: [f32; 4],
    }

    #[derive(Default)]
    struct Counter {
        _value: u16,
    }

    fn archetype() -> Archetype {
        let mut registry = ComponentRegistry::new();
        let mut desc = ArchetypeDesc::new();
        desc.add::<Flag>(&mut registry)
            .unwrap()
            .add::<Transform>(&mut registry)
            .unwrap()
            .add::<Counter>(&mut registry)
            .unwrap();
        Archetype::new(desc)
    }

    #[test]
    fn test_align_up() {
        assert_eq!(align_up(0, 8), Some(0));
        assert_eq!(align_up(1, 8), Some(8));
        assert_eq!(align_up(16, 16), Some(16));
        assert_eq!(align_up(usize::MAX, 2), None);
    }

    #[test]
    fn test_columns_are_aligned() {
        let archetype = archetype();
        let layout = ColumnLayout::new(&archetype, 3).unwrap();

        // Ids are sorted by registration: Flag, Transform, Counter.
        // Entity column: 3 * 8 = 24 bytes.
        assert_eq!(layout.offset(0), 24); // Flag, align 1
        assert_eq!(layout.offset(1), 32); // 27 -> 32 for align 16
        assert_eq!(layout.offset(2), 80); // 32 + 3 * 16
        assert_eq!(layout.layout().size(), 86);
        assert_eq!(layout.layout().align(), 16);

        for (info, &offset) in archetype.components().iter().zip(layout.offsets()) {
            assert_eq!(offset % info.align(), 0);
        }
    }

    #[test]
    fn test_zero_capacity_is_allocatable() {
        let layout = ColumnLayout::new(&archetype(), 0).unwrap();
        assert_eq!(layout.layout().size(), 1);
        assert!(layout.offsets().iter().all(|&o| o == 0));
    }

    #[test]
    fn test_overflow_detected() {
        let err = ColumnLayout::new(&archetype(), usize::MAX / 4).unwrap_err();
        assert_eq!(
            err,
            EcsError::LayoutOverflow {
                capacity: usize::MAX / 4
            }
        );
    }
}
