//! # Synchronization Primitives
//!
//! Storages are mutated by one owner and read by many scheduler jobs. The
//! reader count on each storage turns "never mutate while someone iterates"
//! from a convention into a checked rule.
//!
//! ```text
//!   job A ──read()──┐
//!   job B ──read()──┼──► ArchetypeStorage (readers = 2)
//!   owner ──add()───┘        └─► Err(StorageLocked)
//! ```

mod lock;

pub use lock::{LockCounter, StorageLock};
