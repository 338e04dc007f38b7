//! # Entity Component System
//!
//! Archetype-based storage core.
//!
//! ## Design Philosophy
//!
//! - Every distinct type gets a dense id from an explicit registry
//! - An archetype is the sorted set of component and tag ids an entity has
//! - Entities of one archetype live together in one columnar storage
//! - Queries match archetypes by bitset, never by walking entities

mod archetype;
mod bits;
mod component;
mod entity;
mod query;
mod registry;
mod storage;

pub use archetype::{Archetype, ArchetypeCache, ArchetypeDesc};
pub use bits::{ArchetypeBits, BIT_WORDS};
pub use component::{Component, ComponentId, ComponentInfo, MsgTagId, TagComponentId, TypeKey};
pub use entity::EntityId;
pub use query::ArchetypeQueryDesc;
pub use registry::{ComponentRegistry, RegistryId};
pub use storage::{ArchetypeStorage, StorageStats};
