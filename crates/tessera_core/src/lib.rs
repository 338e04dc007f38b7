//! # Tessera Core
//!
//! Archetype storage core for an Entity Component System:
//! - Explicit component registry with dense ids
//! - Bitset signatures for constant-time query matching
//! - Columnar, swap-remove storage per archetype
//!
//! ## Architecture Rules
//!
//! 1. **No implicit growth** - Storages only grow on `reserve`
//! 2. **Data-oriented design** - Each component lives in its own contiguous column
//! 3. **Checked mutation** - Structural changes fail while readers hold a storage
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tessera_core::{Archetype, ArchetypeDesc, ArchetypeStorage, ComponentRegistry, EntityId};
//!
//! let mut registry = ComponentRegistry::new();
//! let mut desc = ArchetypeDesc::new();
//! desc.add::<Position>(&mut registry)?.add::<Velocity>(&mut registry)?;
//!
//! let mut storage = ArchetypeStorage::new(Arc::new(Archetype::new(desc)), 1024)?;
//! let index = storage.add(EntityId::new(0, 0))?;
//! storage.component_mut::<Position>(index).unwrap().x = 1.0;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;
pub mod sync;

pub use config::StorageConfig;
pub use ecs::{
    Archetype, ArchetypeBits, ArchetypeCache, ArchetypeDesc, ArchetypeQueryDesc,
    ArchetypeStorage, Component, ComponentId, ComponentInfo, ComponentRegistry, EntityId,
    MsgTagId, RegistryId, StorageStats, TagComponentId, TypeKey,
};
pub use error::{EcsError, EcsResult, IdSpace};
pub use memory::{Arena, ColumnLayout};
pub use sync::{LockCounter, StorageLock};
