//! # Component Registry
//!
//! Assigns compact ids to component types. A registry is an explicit value,
//! typically one per world, so tests and worlds never share numbering.
//!
//! Three id spaces are kept apart:
//!
//! | Space | Id type | Ceiling |
//! |---|---|---|
//! | data components | [`ComponentId`] | [`MAX_COMPONENTS`] |
//! | zero-sized tags | [`TagComponentId`] | [`MAX_TAG_COMPONENTS`] |
//! | message tags | [`MsgTagId`] | [`MAX_MESSAGE_TAGS`] |
//!
//! Ids are handed out sequentially on first registration and never reused.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::mem::size_of;
use std::sync::atomic::{AtomicU64, Ordering};

use super::component::{Component, ComponentId, ComponentInfo, MsgTagId, TagComponentId, TypeKey};
use crate::config::{MAX_COMPONENTS, MAX_MESSAGE_TAGS, MAX_TAG_COMPONENTS};
use crate::error::{EcsError, EcsResult, IdSpace};

static NEXT_REGISTRY: AtomicU64 = AtomicU64::new(0);

/// Process-unique identity of one [`ComponentRegistry`].
///
/// Ids from different registries are unrelated numbers; archetypes carry the
/// identity of the registry they were described against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistryId(u64);

impl RegistryId {
    fn next() -> Self {
        Self(NEXT_REGISTRY.fetch_add(1, Ordering::Relaxed))
    }
}

/// Registry mapping Rust types to component, tag and message tag ids.
#[derive(Debug)]
pub struct ComponentRegistry {
    id: RegistryId,
    by_type: HashMap<TypeId, TypeKey>,
    components: Vec<ComponentInfo>,
    tag_names: Vec<&'static str>,
    message_tags: HashMap<TypeId, MsgTagId>,
}

fn next_id(len: usize, limit: usize, space: IdSpace) -> EcsResult<u16> {
    if len >= limit {
        return Err(EcsError::ComponentLimitExceeded { space, limit });
    }
    u16::try_from(len).map_err(|_| EcsError::ComponentLimitExceeded { space, limit })
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self {
            id: RegistryId::next(),
            by_type: HashMap::new(),
            components: Vec::new(),
            tag_names: Vec::new(),
            message_tags: HashMap::new(),
        }
    }
}

impl ComponentRegistry {
    /// Creates an empty registry with a fresh [`RegistryId`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Identity of this registry.
    #[inline]
    #[must_use]
    pub fn id(&self) -> RegistryId {
        self.id
    }

    /// Registers `T` in the space matching its size.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentLimitExceeded`] if the space is full.
    pub fn register<T: Component>(&mut self) -> EcsResult<TypeKey> {
        if size_of::<T>() == 0 {
            self.register_tag::<T>().map(TypeKey::Tag)
        } else {
            self.register_component::<T>().map(TypeKey::Component)
        }
    }

    /// Registers data component `T`, returning its existing id if known.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ZeroSizedComponent`] if `T` is zero-sized
    /// - [`EcsError::ComponentLimitExceeded`] if [`MAX_COMPONENTS`] is reached
    pub fn register_component<T: Component>(&mut self) -> EcsResult<ComponentId> {
        match self.by_type.get(&TypeId::of::<T>()) {
            Some(TypeKey::Component(id)) => return Ok(*id),
            Some(TypeKey::Tag(_)) => return Err(EcsError::ZeroSizedComponent(type_name::<T>())),
            None => {}
        }
        if size_of::<T>() == 0 {
            return Err(EcsError::ZeroSizedComponent(type_name::<T>()));
        }

        let id = ComponentId::new(next_id(
            self.components.len(),
            MAX_COMPONENTS,
            IdSpace::Component,
        )?);
        self.components.push(ComponentInfo::of::<T>(id));
        self.by_type.insert(TypeId::of::<T>(), TypeKey::Component(id));
        tracing::trace!("registered component {} as {}", type_name::<T>(), id.value());
        Ok(id)
    }

    /// Registers zero-sized tag `T`, returning its existing id if known.
    ///
    /// # Errors
    ///
    /// - [`EcsError::NotZeroSized`] if `T` has a size
    /// - [`EcsError::ComponentLimitExceeded`] if [`MAX_TAG_COMPONENTS`] is reached
    pub fn register_tag<T: 'static>(&mut self) -> EcsResult<TagComponentId> {
        match self.by_type.get(&TypeId::of::<T>()) {
            Some(TypeKey::Tag(id)) => return Ok(*id),
            Some(TypeKey::Component(_)) => return Err(EcsError::NotZeroSized(type_name::<T>())),
            None => {}
        }
        if size_of::<T>() != 0 {
            return Err(EcsError::NotZeroSized(type_name::<T>()));
        }

        let id = TagComponentId::new(next_id(
            self.tag_names.len(),
            MAX_TAG_COMPONENTS,
            IdSpace::Tag,
        )?);
        self.tag_names.push(type_name::<T>());
        self.by_type.insert(TypeId::of::<T>(), TypeKey::Tag(id));
        tracing::trace!("registered tag {} as {}", type_name::<T>(), id.value());
        Ok(id)
    }

    /// Registers message tag `T`, returning its existing id if known.
    ///
    /// Message tags have their own numbering; a type may be both a tag and a
    /// message tag without the ids interfering.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ComponentLimitExceeded`] if [`MAX_MESSAGE_TAGS`] is reached.
    pub fn register_message_tag<T: 'static>(&mut self) -> EcsResult<MsgTagId> {
        if let Some(id) = self.message_tags.get(&TypeId::of::<T>()) {
            return Ok(*id);
        }
        let id = MsgTagId::new(next_id(
            self.message_tags.len(),
            MAX_MESSAGE_TAGS,
            IdSpace::MessageTag,
        )?);
        self.message_tags.insert(TypeId::of::<T>(), id);
        tracing::trace!("registered message tag {} as {}", type_name::<T>(), id.value());
        Ok(id)
    }

    /// Id space and id of `T`, if registered.
    #[must_use]
    pub fn key_of<T: 'static>(&self) -> Option<TypeKey> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Component id of `T`, if registered as a data component.
    #[must_use]
    pub fn id_of<T: 'static>(&self) -> Option<ComponentId> {
        match self.key_of::<T>()? {
            TypeKey::Component(id) => Some(id),
            TypeKey::Tag(_) => None,
        }
    }

    /// Tag id of `T`, if registered as a tag.
    #[must_use]
    pub fn tag_id_of<T: 'static>(&self) -> Option<TagComponentId> {
        match self.key_of::<T>()? {
            TypeKey::Tag(id) => Some(id),
            TypeKey::Component(_) => None,
        }
    }

    /// Message tag id of `T`, if registered.
    #[must_use]
    pub fn message_tag_id_of<T: 'static>(&self) -> Option<MsgTagId> {
        self.message_tags.get(&TypeId::of::<T>()).copied()
    }

    /// Descriptor of a registered data component.
    #[must_use]
    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.components.get(id.index())
    }

    /// Descriptor of `T`, if registered as a data component.
    #[must_use]
    pub fn info_of<T: 'static>(&self) -> Option<&ComponentInfo> {
        self.info(self.id_of::<T>()?)
    }

    /// Type name of a registered tag.
    #[must_use]
    pub fn tag_name(&self, id: TagComponentId) -> Option<&'static str> {
        self.tag_names.get(id.index()).copied()
    }

    /// Number of registered data components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Number of registered tags.
    #[must_use]
    pub fn tag_count(&self) -> usize {
        self.tag_names.len()
    }

    /// Number of registered message tags.
    #[must_use]
    pub fn message_tag_count(&self) -> usize {
        self.message_tags.len()
    }
}
