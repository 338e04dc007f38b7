//! # Storage Locks
//!
//! Readers that walk a storage's columns directly hold a lock on it for the
//! duration. Two layers keep structural mutation away from them:
//!
//! - [`StorageLock`] borrows the storage, so while a guard lives the borrow
//!   checker rejects every `&mut` method: add, erase, clear and reserve.
//! - [`LockCounter`] is checked at runtime by those same methods, which covers
//!   schedulers that pair [`lock`](crate::ArchetypeStorage::lock) and
//!   [`unlock`](crate::ArchetypeStorage::unlock) by hand.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::ecs::ArchetypeStorage;
use crate::error::{EcsError, EcsResult};

/// Number of outstanding readers.
#[derive(Debug, Default)]
pub struct LockCounter {
    readers: AtomicUsize,
}

impl LockCounter {
    /// Creates an unlocked counter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            readers: AtomicUsize::new(0),
        }
    }

    /// Registers one reader.
    #[inline]
    pub fn acquire(&self) {
        self.readers.fetch_add(1, Ordering::AcqRel);
    }

    /// Releases one reader.
    ///
    /// Returns `false`, leaving the counter at zero, if nothing was held.
    #[inline]
    pub fn release(&self) -> bool {
        self.readers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }

    /// Current number of readers.
    #[inline]
    #[must_use]
    pub fn readers(&self) -> usize {
        self.readers.load(Ordering::Acquire)
    }

    /// Whether at least one reader is registered.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.readers() > 0
    }

    /// Fails with [`EcsError::StorageLocked`] while readers are registered.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::StorageLocked`] if locked.
    #[inline]
    pub fn ensure_unlocked(&self) -> EcsResult<()> {
        match self.readers() {
            0 => Ok(()),
            readers => Err(EcsError::StorageLocked { readers }),
        }
    }
}

/// Shared read access to a storage; unlocks on drop.
///
/// Dereferences to the storage, so every read accessor is available.
///
/// ## Usage
///
/// ```rust,ignore
/// let guard = storage.read();
/// for (entity, pos) in guard.entities().iter().zip(guard.components::<Position>().unwrap()) {
///     // ...
/// }
/// // storage.add(..) here would not compile: `guard` still borrows `storage`.
/// ```
#[must_use = "the storage unlocks as soon as the guard is dropped"]
pub struct StorageLock<'a> {
    storage: &'a ArchetypeStorage,
}

impl<'a> StorageLock<'a> {
    /// Locks `storage` for reading.
    pub fn new(storage: &'a ArchetypeStorage) -> Self {
        storage.lock();
        Self { storage }
    }
}

impl Deref for StorageLock<'_> {
    type Target = ArchetypeStorage;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.storage
    }
}

impl Drop for StorageLock<'_> {
    fn drop(&mut self) {
        self.storage.unlock();
    }
}

impl std::fmt::Debug for StorageLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageLock")
            .field("len", &self.storage.len())
            .field("readers", &self.storage.lock_count())
            .finish()
    }
}
