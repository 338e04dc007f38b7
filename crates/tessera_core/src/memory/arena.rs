//! # Block Arena
//!
//! One raw, aligned heap block. The arena knows nothing about what lives in
//! it: constructing and dropping values is the owner's job. Dropping the arena
//! only frees the memory.

// SAFETY: This module requires unsafe for raw allocation.
// Every pointer handed out stays within the block it was derived from.
#![allow(unsafe_code)]

use std::alloc::{alloc, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;

use crate::config::POISON_BYTE;

/// An owned, aligned, uninitialized memory block.
///
/// # Thread Safety
///
/// The arena is plain memory; synchronization is up to the owner.
pub struct Arena {
    ptr: NonNull<u8>,
    layout: Layout,
}

impl Arena {
    /// Allocates a block for `layout`.
    ///
    /// Aborts through [`handle_alloc_error`] if the allocator fails.
    ///
    /// # Panics
    ///
    /// Panics if `layout` is zero-sized.
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        assert!(layout.size() > 0, "arena layout must not be zero-sized");

        // SAFETY: layout has a non-zero size.
        let ptr = unsafe { alloc(layout) };
        let Some(ptr) = NonNull::new(ptr) else {
            handle_alloc_error(layout)
        };
        Self { ptr, layout }
    }

    /// Allocates a block and fills it with [`POISON_BYTE`].
    #[must_use]
    pub fn new_poisoned(layout: Layout) -> Self {
        let mut arena = Self::new(layout);
        arena.poison(0, layout.size());
        arena
    }

    /// Base address of the block.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Size of the block in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Alignment of the block.
    #[inline]
    #[must_use]
    pub fn align(&self) -> usize {
        self.layout.align()
    }

    /// Fills `len` bytes starting at `offset` with [`POISON_BYTE`].
    ///
    /// Whatever lived there is overwritten without being dropped.
    ///
    /// # Panics
    ///
    /// Panics if the range leaves the block.
    pub fn poison(&mut self, offset: usize, len: usize) {
        let end = offset.checked_add(len);
        assert!(
            end.is_some_and(|end| end <= self.size()),
            "poison range {offset}+{len} outside block of {} bytes",
            self.size()
        );
        // SAFETY: the range was checked to lie inside the block.
        unsafe {
            std::ptr::write_bytes(self.ptr.as_ptr().add(offset), POISON_BYTE, len);
        }
    }
}

impl Drop for Arena {
    fn drop(&mut self) {
        // SAFETY: ptr was allocated with exactly this layout.
        unsafe {
            dealloc(self.ptr.as_ptr(), self.layout);
        }
    }
}

impl std::fmt::Debug for Arena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Arena")
            .field("ptr", &self.ptr)
            .field("size", &self.layout.size())
            .field("align", &self.layout.align())
            .finish()
    }
}

// SAFETY: the arena exclusively owns its block; it holds no thread-bound state.
unsafe impl Send for Arena {}
// SAFETY: shared access only exposes the base address; writes need `&mut self`
// or the owner's own synchronization.
unsafe impl Sync for Arena {}
