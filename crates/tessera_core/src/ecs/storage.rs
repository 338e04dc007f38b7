//! # Archetype Storage
//!
//! Columnar storage for every entity of one archetype.
//!
//! The storage guarantees:
//! - One allocation per capacity, split into aligned columns
//! - O(1) add and swap-remove erase
//! - No implicit growth: [`ArchetypeStorage::reserve`] is the only way to grow
//! - Every component value is dropped exactly once
//!
//! ## Memory Layout
//!
//! ```text
//! | EntityId[cap] | pad | Comp0[cap] | pad | Comp1[cap] | ...
//!   slot 0..len are live, len..cap are dead (poisoned in debug)
//! ```
//!
//! Slot indices are not stable: erase moves the last entity into the hole and
//! reports it so the entity directory can be fixed up. Cached
//! `(storage, index)` handles must be checked with [`ArchetypeStorage::is_valid`].

// SAFETY: This module requires unsafe for type-erased column access.
// Every raw access stays below `capacity` for writes and below `len` for reads
// of live values; column types are checked through `TypeId` before any cast.
#![allow(unsafe_code)]

use std::mem::size_of;
use std::ptr::{self, NonNull};
use std::sync::Arc;

use super::archetype::Archetype;
use super::component::ComponentId;
use super::entity::EntityId;
use crate::config::StorageConfig;
use crate::error::{EcsError, EcsResult};
use crate::memory::{Arena, ColumnLayout};
use crate::sync::{LockCounter, StorageLock};

/// Memory statistics of one storage.
///
/// Used for profiling growth policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageStats {
    /// Occupied slots.
    pub len: usize,
    /// Allocated slots.
    pub capacity: usize,
    /// Bytes in the backing block, padding included.
    pub bytes_allocated: usize,
    /// Bytes per entity across all columns, entity id included.
    pub bytes_per_entity: usize,
}

impl StorageStats {
    /// Fraction of slots in use (0.0 to 1.0).
    #[must_use]
    pub fn occupancy(&self) -> f32 {
        if self.capacity == 0 {
            0.0
        } else {
            self.len as f32 / self.capacity as f32
        }
    }
}

/// All entities sharing one archetype, stored column by column.
pub struct ArchetypeStorage {
    /// Archetype of every entity stored here.
    archetype: Arc<Archetype>,
    /// Backing block holding all columns.
    arena: Arena,
    /// Column offsets for the current capacity.
    layout: ColumnLayout,
    /// Number of live slots.
    len: usize,
    /// Outstanding readers.
    locks: LockCounter,
    /// Fill dead slots with the poison pattern.
    poison: bool,
}

impl ArchetypeStorage {
    /// Creates a storage for `archetype` with room for `capacity` entities.
    ///
    /// Dead slots are poisoned in debug builds.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::LayoutOverflow`] if `capacity` is too large.
    pub fn new(archetype: Arc<Archetype>, capacity: usize) -> EcsResult<Self> {
        Self::build(archetype, capacity, cfg!(debug_assertions))
    }

    /// Creates a storage sized and tuned by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::LayoutOverflow`] if the configured capacity is too large.
    pub fn with_config(archetype: Arc<Archetype>, config: &StorageConfig) -> EcsResult<Self> {
        Self::build(archetype, config.initial_capacity, config.poison_freed_slots)
    }

    fn build(archetype: Arc<Archetype>, capacity: usize, poison: bool) -> EcsResult<Self> {
        let layout = ColumnLayout::new(&archetype, capacity)?;
        let arena = Self::allocate(&layout, poison);
        tracing::debug!(
            "created storage for archetype {:#018x}: capacity {}, {} bytes",
            archetype.hash(),
            capacity,
            arena.size()
        );
        Ok(Self {
            archetype,
            arena,
            layout,
            len: 0,
            locks: LockCounter::new(),
            poison,
        })
    }

    fn allocate(layout: &ColumnLayout, poison: bool) -> Arena {
        if poison {
            Arena::new_poisoned(layout.layout())
        } else {
            Arena::new(layout.layout())
        }
    }

    // ========================================================================
    // RAW SLOT ACCESS
    // ========================================================================

    #[inline]
    fn entity_ptr(&self) -> *mut EntityId {
        self.arena.as_ptr().cast()
    }

    /// Address of slot `index` in data column `column`.
    ///
    /// # Safety
    ///
    /// `column < archetype.count()` and `index <= capacity`.
    #[inline]
    unsafe fn slot_ptr(&self, column: usize, index: usize) -> *mut u8 {
        let size = self.archetype.components()[column].size();
        self.arena
            .as_ptr()
            .add(self.layout.offset(column) + size * index)
    }

    fn ensure_unlocked(&self, operation: &str) -> EcsResult<()> {
        self.locks.ensure_unlocked().map_err(|err| {
            tracing::error!(
                "{operation} on locked storage for archetype {:#018x}: {err}",
                self.archetype.hash()
            );
            err
        })
    }

    /// Drops the values of rows `start..end`.
    ///
    /// # Safety
    ///
    /// The rows must hold live values that are not used afterwards.
    unsafe fn drop_rows(&mut self, start: usize, end: usize) {
        for (column, info) in self.archetype.components().iter().enumerate() {
            if !info.needs_drop() {
                continue;
            }
            for index in start..end {
                info.destroy(self.slot_ptr(column, index));
            }
        }
    }

    fn poison_rows(&mut self, start: usize, end: usize) {
        if !self.poison || start >= end {
            return;
        }
        let rows = end - start;
        self.arena
            .poison(size_of::<EntityId>() * start, size_of::<EntityId>() * rows);
        for (column, info) in self.archetype.components().iter().enumerate() {
            let offset = self.layout.offset(column) + info.size() * start;
            self.arena.poison(offset, info.size() * rows);
        }
    }

    // ========================================================================
    // STRUCTURAL MUTATION
    // ========================================================================

    /// Appends `entity`, default-constructing every component.
    ///
    /// Never grows the storage: when full it fails without side effects and the
    /// caller must [`reserve`](Self::reserve) and retry.
    ///
    /// # Errors
    ///
    /// - [`EcsError::CapacityExceeded`] if `len() == capacity()`
    /// - [`EcsError::StorageLocked`] if readers hold the storage
    pub fn add(&mut self, entity: EntityId) -> EcsResult<usize> {
        self.ensure_unlocked("add")?;
        if self.len == self.capacity() {
            return Err(EcsError::CapacityExceeded {
                capacity: self.capacity(),
            });
        }

        let index = self.len;
        // SAFETY: index < capacity, so every slot written is inside its column.
        unsafe {
            self.entity_ptr().add(index).write(entity);
            for (column, info) in self.archetype.components().iter().enumerate() {
                info.construct(self.slot_ptr(column, index));
            }
        }
        self.len += 1;
        Ok(index)
    }

    /// Removes the entity at `index` by swap-remove.
    ///
    /// The last live row is moved into `index` and its entity is returned so
    /// the caller can update its directory. Returns `None` when `index` was the
    /// last row. The erased entity's component values are dropped; the vacated
    /// tail slot is left dead.
    ///
    /// # Errors
    ///
    /// - [`EcsError::IndexOutOfBounds`] if `index >= len()`
    /// - [`EcsError::StorageLocked`] if readers hold the storage
    pub fn erase(&mut self, index: usize) -> EcsResult<Option<EntityId>> {
        self.ensure_unlocked("erase")?;
        if index >= self.len {
            return Err(EcsError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }

        let last = self.len - 1;
        let mut moved = None;

        // SAFETY: index and last are both < len, so both rows are live.
        // After the swap the erased values sit in the tail slot, which leaves
        // the live range before they are dropped: a panicking drop leaks
        // instead of dropping twice.
        unsafe {
            if index != last {
                let entities = self.entity_ptr();
                ptr::swap_nonoverlapping(entities.add(index), entities.add(last), 1);
                for (column, info) in self.archetype.components().iter().enumerate() {
                    ptr::swap_nonoverlapping(
                        self.slot_ptr(column, index),
                        self.slot_ptr(column, last),
                        info.size(),
                    );
                }
                moved = Some(entities.add(index).read());
            }
            self.len = last;
            self.drop_rows(last, last + 1);
        }
        self.poison_rows(last, last + 1);
        Ok(moved)
    }

    /// Drops every live entity's components. Capacity is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StorageLocked`] if readers hold the storage.
    pub fn clear(&mut self) -> EcsResult<()> {
        self.ensure_unlocked("clear")?;
        let len = self.len;
        self.len = 0;
        // SAFETY: rows 0..len were live and are now outside the live range.
        unsafe {
            self.drop_rows(0, len);
        }
        self.poison_rows(0, len);
        tracing::debug!(
            "cleared {len} entities from archetype {:#018x}",
            self.archetype.hash()
        );
        Ok(())
    }

    /// Grows the storage to hold at least `capacity` entities.
    ///
    /// Never shrinks. Existing rows are moved bit-for-bit into the new block;
    /// every previously obtained column pointer is invalidated.
    ///
    /// # Errors
    ///
    /// - [`EcsError::LayoutOverflow`] if `capacity` is too large
    /// - [`EcsError::StorageLocked`] if readers hold the storage
    pub fn reserve(&mut self, capacity: usize) -> EcsResult<()> {
        self.ensure_unlocked("reserve")?;
        if capacity <= self.capacity() {
            return Ok(());
        }

        let layout = ColumnLayout::new(&self.archetype, capacity)?;
        let arena = Self::allocate(&layout, self.poison);

        // SAFETY: both blocks hold at least `len` rows in every column, and
        // they are distinct allocations.
        unsafe {
            ptr::copy_nonoverlapping(
                self.arena.as_ptr(),
                arena.as_ptr(),
                size_of::<EntityId>() * self.len,
            );
            for (column, info) in self.archetype.components().iter().enumerate() {
                ptr::copy_nonoverlapping(
                    self.arena.as_ptr().add(self.layout.offset(column)),
                    arena.as_ptr().add(layout.offset(column)),
                    info.size() * self.len,
                );
            }
        }

        tracing::debug!(
            "grew storage for archetype {:#018x}: {} -> {} ({} entities moved)",
            self.archetype.hash(),
            self.capacity(),
            capacity,
            self.len
        );

        // The old block only holds moved-from bytes now; dropping it frees memory.
        self.arena = arena;
        self.layout = layout;
        Ok(())
    }

    // ========================================================================
    // LOCKING
    // ========================================================================

    /// Registers a reader. Structural mutation fails until it is released.
    #[inline]
    pub fn lock(&self) {
        self.locks.acquire();
    }

    /// Releases a reader registered with [`lock`](Self::lock).
    pub fn unlock(&self) {
        if !self.locks.release() {
            tracing::warn!(
                "unbalanced unlock on storage for archetype {:#018x}",
                self.archetype.hash()
            );
        }
    }

    /// Whether any reader is registered.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locks.is_locked()
    }

    /// Number of registered readers.
    #[inline]
    #[must_use]
    pub fn lock_count(&self) -> usize {
        self.locks.readers()
    }

    /// Locks the storage for reading until the guard is dropped.
    #[inline]
    pub fn read(&self) -> StorageLock<'_> {
        StorageLock::new(self)
    }

    // ========================================================================
    // ACCESS
    // ========================================================================

    /// Whether `index` is live and holds `entity`.
    ///
    /// The only safe way to confirm a cached `(storage, index)` handle after
    /// intervening erases.
    #[inline]
    #[must_use]
    pub fn is_valid(&self, entity: EntityId, index: usize) -> bool {
        self.entities().get(index) == Some(&entity)
    }

    /// Entity ids by slot index.
    #[inline]
    #[must_use]
    pub fn entities(&self) -> &[EntityId] {
        // SAFETY: the entity column starts at offset 0 of a block aligned for
        // EntityId, and slots 0..len are initialized.
        unsafe { std::slice::from_raw_parts(self.entity_ptr(), self.len) }
    }

    /// Column of data component `T`, or `None` if the archetype lacks it.
    #[must_use]
    pub fn components<T: 'static>(&self) -> Option<&[T]> {
        let column = self.archetype.position_of::<T>()?;
        // SAFETY: the column stores `T` (checked by TypeId), is aligned for
        // `T`, and slots 0..len are initialized.
        unsafe {
            Some(std::slice::from_raw_parts(
                self.slot_ptr(column, 0).cast::<T>(),
                self.len,
            ))
        }
    }

    /// Mutable column of data component `T`, or `None` if the archetype lacks it.
    #[must_use]
    pub fn components_mut<T: 'static>(&mut self) -> Option<&mut [T]> {
        let column = self.archetype.position_of::<T>()?;
        // SAFETY: as in `components`, and `&mut self` gives exclusive access.
        unsafe {
            Some(std::slice::from_raw_parts_mut(
                self.slot_ptr(column, 0).cast::<T>(),
                self.len,
            ))
        }
    }

    /// Component `T` of the entity at `index`.
    #[must_use]
    pub fn component<T: 'static>(&self, index: usize) -> Option<&T> {
        self.components::<T>()?.get(index)
    }

    /// Mutable component `T` of the entity at `index`.
    #[must_use]
    pub fn component_mut<T: 'static>(&mut self, index: usize) -> Option<&mut T> {
        self.components_mut::<T>()?.get_mut(index)
    }

    /// Base address of the column for `id`, or `None` if the archetype lacks it.
    ///
    /// For schedulers that walk columns by id. The pointer is valid for
    /// `len()` elements until the next structural mutation; hold a lock while
    /// using it.
    #[must_use]
    pub fn column_ptr(&self, id: ComponentId) -> Option<NonNull<u8>> {
        let column = self.archetype.position(id)?;
        // SAFETY: column < count and slot 0 is inside the block.
        NonNull::new(unsafe { self.slot_ptr(column, 0) })
    }

    /// Number of live entities.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks if empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of slots allocated.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.layout.capacity()
    }

    /// Archetype of every entity in this storage.
    #[inline]
    #[must_use]
    pub fn archetype(&self) -> &Arc<Archetype> {
        &self.archetype
    }

    /// Memory statistics.
    #[must_use]
    pub fn stats(&self) -> StorageStats {
        StorageStats {
            len: self.len,
            capacity: self.capacity(),
            bytes_allocated: self.arena.size(),
            bytes_per_entity: self.archetype.bytes_per_entity(),
        }
    }
}

impl Drop for ArchetypeStorage {
    fn drop(&mut self) {
        if self.is_locked() {
            tracing::error!(
                "storage for archetype {:#018x} dropped with {} reader(s)",
                self.archetype.hash(),
                self.lock_count()
            );
        }
        let len = self.len;
        self.len = 0;
        // SAFETY: rows 0..len were live and the storage is going away.
        unsafe {
            self.drop_rows(0, len);
        }
    }
}

impl std::fmt::Debug for ArchetypeStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchetypeStorage")
            .field("archetype", &format_args!("{:#018x}", self.archetype.hash()))
            .field("len", &self.len)
            .field("capacity", &self.capacity())
            .field("readers", &self.lock_count())
            .finish()
    }
}
