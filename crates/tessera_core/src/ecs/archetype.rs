//! # Archetypes
//!
//! An archetype is the exact set of component and tag types an entity has.
//! Entities sharing an archetype live in the same [`ArchetypeStorage`], one
//! column per data component:
//!
//! ```text
//! Archetype {Position, Velocity, #Player}:
//! | EntityId[] | Position[] | Velocity[] |     (#Player occupies no column)
//! ```
//!
//! [`ArchetypeDesc`] is the mutable builder, [`Archetype`] the canonical,
//! immutable identity: sorted by id, hashed once, comparable by content.
//!
//! [`ArchetypeStorage`]: crate::ArchetypeStorage

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::mem::{align_of, size_of};
use std::sync::Arc;

use parking_lot::RwLock;

use super::bits::ArchetypeBits;
use super::component::{Component, ComponentId, ComponentInfo, TagComponentId, TypeKey};
use super::entity::EntityId;
use super::query::ArchetypeQueryDesc;
use super::registry::{ComponentRegistry, RegistryId};
use crate::config::{MAX_COMPONENTS_PER_ARCHETYPE, MAX_TAGS_PER_ARCHETYPE};
use crate::error::{EcsError, EcsResult};

/// Incremental description of an archetype.
///
/// Order of insertion does not matter; [`Archetype::new`] canonicalizes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArchetypeDesc {
    registry: Option<RegistryId>,
    components: Vec<ComponentInfo>,
    tags: Vec<TagComponentId>,
}

impl ArchetypeDesc {
    /// Creates an empty description.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `T`, registering it first if needed.
    ///
    /// Zero-sized types go to the tag list, everything else to the component
    /// list.
    ///
    /// # Errors
    ///
    /// - [`EcsError::RegistryMismatch`] if earlier types came from another registry
    /// - registry errors from [`ComponentRegistry::register`]
    /// - [`EcsError::TooManyComponents`] / [`EcsError::TooManyTags`]
    pub fn add<T: Component>(&mut self, registry: &mut ComponentRegistry) -> EcsResult<&mut Self> {
        match self.registry {
            Some(bound) if bound != registry.id() => return Err(EcsError::RegistryMismatch),
            _ => self.registry = Some(registry.id()),
        }
        match registry.register::<T>()? {
            TypeKey::Tag(id) => self.add_tag_id(id),
            TypeKey::Component(id) => self.add_info(ComponentInfo::of::<T>(id)),
        }
    }

    /// Adds a data component descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TooManyComponents`] past [`MAX_COMPONENTS_PER_ARCHETYPE`].
    pub fn add_info(&mut self, info: ComponentInfo) -> EcsResult<&mut Self> {
        if self.components.len() >= MAX_COMPONENTS_PER_ARCHETYPE {
            return Err(EcsError::TooManyComponents {
                limit: MAX_COMPONENTS_PER_ARCHETYPE,
            });
        }
        self.components.push(info);
        Ok(self)
    }

    /// Adds a tag id.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::TooManyTags`] past [`MAX_TAGS_PER_ARCHETYPE`].
    pub fn add_tag_id(&mut self, id: TagComponentId) -> EcsResult<&mut Self> {
        if self.tags.len() >= MAX_TAGS_PER_ARCHETYPE {
            return Err(EcsError::TooManyTags {
                limit: MAX_TAGS_PER_ARCHETYPE,
            });
        }
        self.tags.push(id);
        Ok(self)
    }

    /// Registry the typed [`add`](Self::add) calls resolved against.
    ///
    /// `None` when only raw descriptors and tag ids were added.
    #[must_use]
    pub fn registry(&self) -> Option<RegistryId> {
        self.registry
    }

    /// Data component descriptors in insertion order.
    #[must_use]
    pub fn components(&self) -> &[ComponentInfo] {
        &self.components
    }

    /// Tag ids in insertion order.
    #[must_use]
    pub fn tags(&self) -> &[TagComponentId] {
        &self.tags
    }
}

/// Canonical, immutable archetype identity.
///
/// Equality and hashing depend only on the set of component and tag types and
/// the registry that numbered them.
#[derive(Clone, Debug)]
pub struct Archetype {
    hash: u64,
    desc: ArchetypeDesc,
    max_align: usize,
    bits: ArchetypeBits,
}

impl Archetype {
    /// Canonicalizes `desc`: sorts by id and drops duplicates.
    #[must_use]
    pub fn new(mut desc: ArchetypeDesc) -> Self {
        desc.components.sort_by_key(ComponentInfo::id);
        desc.components.dedup_by_key(|info| info.id());
        desc.tags.sort_unstable();
        desc.tags.dedup();
        Self::from_sorted(desc)
    }

    /// Builds an archetype from a description already sorted by id.
    ///
    /// # Panics
    ///
    /// In debug builds, panics if ids are not strictly increasing.
    #[must_use]
    pub fn from_sorted(desc: ArchetypeDesc) -> Self {
        debug_assert!(
            desc.components.windows(2).all(|w| w[0].id() < w[1].id()),
            "components must be sorted by id"
        );
        debug_assert!(
            desc.tags.windows(2).all(|w| w[0] < w[1]),
            "tags must be sorted by id"
        );

        let mut hasher = DefaultHasher::new();
        desc.registry.hash(&mut hasher);
        desc.components.len().hash(&mut hasher);
        desc.tags.len().hash(&mut hasher);

        let mut bits = ArchetypeBits::new();
        let mut max_align = align_of::<EntityId>();

        for info in &desc.components {
            debug_assert_eq!(info.size() % info.align(), 0);
            bits.add(info.id());
            info.id().hash(&mut hasher);
            info.type_id().hash(&mut hasher);
            max_align = max_align.max(info.align());
        }
        for &tag in &desc.tags {
            bits.add_tag(tag);
            tag.hash(&mut hasher);
        }

        Self {
            hash: hasher.finish(),
            desc,
            max_align,
            bits,
        }
    }

    /// Canonical description.
    #[inline]
    #[must_use]
    pub fn desc(&self) -> &ArchetypeDesc {
        &self.desc
    }

    /// Data components, sorted by id. Column `i` stores `components()[i]`.
    #[inline]
    #[must_use]
    pub fn components(&self) -> &[ComponentInfo] {
        &self.desc.components
    }

    /// Tags, sorted by id.
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &[TagComponentId] {
        &self.desc.tags
    }

    /// Precomputed content hash.
    #[inline]
    #[must_use]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Largest alignment among the entity column and all data components.
    #[inline]
    #[must_use]
    pub fn max_align(&self) -> usize {
        self.max_align
    }

    /// Number of data components (columns besides the entity column).
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.desc.components.len()
    }

    /// Number of tags.
    #[inline]
    #[must_use]
    pub fn tag_count(&self) -> usize {
        self.desc.tags.len()
    }

    /// Bytes one entity occupies across all columns, entity id included.
    #[must_use]
    pub fn bytes_per_entity(&self) -> usize {
        size_of::<EntityId>()
            + self
                .desc
                .components
                .iter()
                .map(ComponentInfo::size)
                .sum::<usize>()
    }

    /// Signature used for query matching.
    #[inline]
    #[must_use]
    pub fn bits(&self) -> &ArchetypeBits {
        &self.bits
    }

    /// Superset test over components and tags.
    #[inline]
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.bits.all(&other.bits)
    }

    /// Column index of `id`, or the sentinel [`count()`](Self::count) if absent.
    ///
    /// Compare against `count()` before using the result; [`position`](Self::position)
    /// is the `Option` form.
    #[must_use]
    pub fn index_of(&self, id: ComponentId) -> usize {
        self.position(id).unwrap_or(self.count())
    }

    /// Column index of `id`.
    #[must_use]
    pub fn position(&self, id: ComponentId) -> Option<usize> {
        self.desc
            .components
            .binary_search_by_key(&id, ComponentInfo::id)
            .ok()
    }

    /// Column index of data component `T`.
    #[must_use]
    pub fn position_of<T: 'static>(&self) -> Option<usize> {
        self.desc.components.iter().position(ComponentInfo::is::<T>)
    }

    /// Whether data component `id` is present.
    #[inline]
    #[must_use]
    pub fn has_component_id(&self, id: ComponentId) -> bool {
        self.bits.exists(id)
    }

    /// Whether tag `id` is present.
    #[inline]
    #[must_use]
    pub fn has_tag(&self, id: TagComponentId) -> bool {
        self.bits.exists_tag(id)
    }

    /// Whether data component `T` is present.
    #[must_use]
    pub fn has_component<T: 'static>(&self) -> bool {
        self.position_of::<T>().is_some()
    }

    /// Whether tag `T` is present. Tags are resolved through `registry`.
    #[must_use]
    pub fn has_tag_type<T: 'static>(&self, registry: &ComponentRegistry) -> bool {
        registry
            .tag_id_of::<T>()
            .is_some_and(|id| self.has_tag(id))
    }

    /// Whether `T` is present, as a tag if zero-sized, else as a component.
    #[must_use]
    pub fn has<T: 'static>(&self, registry: &ComponentRegistry) -> bool {
        if size_of::<T>() == 0 {
            self.has_tag_type::<T>(registry)
        } else {
            self.has_component::<T>()
        }
    }
}

impl PartialEq for Archetype {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
            && self.desc.registry == other.desc.registry
            && self.bits.equals(&other.bits)
            && self.desc.components == other.desc.components
    }
}

impl Eq for Archetype {}

impl Hash for Archetype {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

/// Interning table: one shared [`Archetype`] per registry and distinct type set.
///
/// One cache may serve several worlds; archetypes described against different
/// registries never merge, even when their ids coincide.
///
/// Safe to share between threads; lookups take a read lock, first-time
/// insertion a write lock.
#[derive(Debug, Default)]
pub struct ArchetypeCache {
    archetypes: RwLock<HashSet<Arc<Archetype>>>,
}

impl ArchetypeCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared archetype for `desc`, creating it on first use.
    pub fn intern(&self, desc: ArchetypeDesc) -> Arc<Archetype> {
        let archetype = Archetype::new(desc);
        if let Some(existing) = self.archetypes.read().get(&archetype) {
            return Arc::clone(existing);
        }

        let mut archetypes = self.archetypes.write();
        if let Some(existing) = archetypes.get(&archetype) {
            return Arc::clone(existing);
        }
        tracing::trace!(
            "interned archetype {:#018x} with {} components and {} tags",
            archetype.hash(),
            archetype.count(),
            archetype.tag_count()
        );
        let archetype = Arc::new(archetype);
        archetypes.insert(Arc::clone(&archetype));
        archetype
    }

    /// Shared archetype equal to `archetype`, if interned.
    #[must_use]
    pub fn get(&self, archetype: &Archetype) -> Option<Arc<Archetype>> {
        self.archetypes.read().get(archetype).cloned()
    }

    /// All interned archetypes compatible with `query`.
    ///
    /// Query bits are registry-relative; a cache shared between registries
    /// should be queried through [`matching_in`](Self::matching_in).
    #[must_use]
    pub fn matching(&self, query: &ArchetypeQueryDesc) -> Vec<Arc<Archetype>> {
        self.archetypes
            .read()
            .iter()
            .filter(|archetype| query.compatible(archetype.bits()))
            .cloned()
            .collect()
    }

    /// Interned archetypes of `registry` compatible with `query`.
    #[must_use]
    pub fn matching_in(
        &self,
        registry: RegistryId,
        query: &ArchetypeQueryDesc,
    ) -> Vec<Arc<Archetype>> {
        self.archetypes
            .read()
            .iter()
            .filter(|archetype| {
                archetype.desc.registry == Some(registry) && query.compatible(archetype.bits())
            })
            .cloned()
            .collect()
    }

    /// Number of interned archetypes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.archetypes.read().len()
    }

    /// Checks if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archetypes.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    #[repr(C)]
    struct Position {
        _x: f32,
        _y: f32,
    }

    #[derive(Default)]
    #[repr(C)]
    struct Velocity {
        _x: f32,
        _y: f32,
    }

    #[derive(Default)]
    #[repr(C)]
    struct Impulse {
        _x: f32,
        _y: f32,
    }

    #[derive(Default)]
    struct Mass {
        _kg: f64,
    }

    #[derive(Default)]
    struct Player;

    #[derive(Default)]
    struct Frozen;

    fn registry() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.register::<Position>().unwrap();
        registry.register::<Velocity>().unwrap();
        registry.register::<Mass>().unwrap();
        registry.register::<Player>().unwrap();
        registry.register::<Frozen>().unwrap();
        registry
    }

    #[test]
    fn test_desc_routes_tags() {
        let mut registry = registry();
        let mut desc = ArchetypeDesc::new();
        desc.add::<Position>(&mut registry)
            .unwrap()
            .add::<Player>(&mut registry)
            .unwrap();

        assert_eq!(desc.components().len(), 1);
        assert_eq!(desc.components()[0].size(), size_of::<Position>());
        assert_eq!(desc.components()[0].align(), align_of::<Position>());
        assert_eq!(desc.tags(), &[registry.tag_id_of::<Player>().unwrap()]);
    }

    #[test]
    fn test_order_independent_identity() {
        let mut registry = registry();
        let mut forward = ArchetypeDesc::new();
        forward
            .add::<Position>(&mut registry)
            .unwrap()
            .add::<Velocity>(&mut registry)
            .unwrap()
            .add::<Player>(&mut registry)
            .unwrap();
        let mut backward = ArchetypeDesc::new();
        backward
            .add::<Player>(&mut registry)
            .unwrap()
            .add::<Velocity>(&mut registry)
            .unwrap()
            .add::<Position>(&mut registry)
            .unwrap();

        let a = Archetype::new(forward);
        let b = Archetype::new(backward);
        assert_eq!(a, b);
        assert_eq!(a.hash(), b.hash());
        assert_eq!(a.components(), b.components());
    }

    #[test]
    fn test_tags_change_identity() {
        let mut registry = registry();
        let mut plain = ArchetypeDesc::new();
        plain.add::<Position>(&mut registry).unwrap();
        let mut tagged = plain.clone();
        tagged.add::<Frozen>(&mut registry).unwrap();

        let plain = Archetype::new(plain);
        let tagged = Archetype::new(tagged);
        assert_ne!(plain, tagged);
        assert!(tagged.contains(&plain));
        assert!(!plain.contains(&tagged));
        assert!(tagged.has::<Frozen>(&registry));
        assert!(!plain.has::<Frozen>(&registry));
    }

    #[test]
    fn test_duplicates_collapse() {
        let mut registry = registry();
        let mut desc = ArchetypeDesc::new();
        desc.add::<Mass>(&mut registry)
            .unwrap()
            .add::<Mass>(&mut registry)
            .unwrap();
        let archetype = Archetype::new(desc);
        assert_eq!(archetype.count(), 1);
    }

    #[test]
    fn test_index_of_sentinel() {
        let mut registry = registry();
        let mut desc = ArchetypeDesc::new();
        desc.add::<Velocity>(&mut registry)
            .unwrap()
            .add::<Position>(&mut registry)
            .unwrap();
        let archetype = Archetype::new(desc);

        let pos = registry.id_of::<Position>().unwrap();
        let mass = registry.id_of::<Mass>().unwrap();
        assert_eq!(archetype.index_of(pos), 0);
        assert_eq!(archetype.index_of(mass), archetype.count());
        assert_eq!(archetype.position(mass), None);
        assert_eq!(archetype.position_of::<Velocity>(), Some(1));
        assert!(archetype.has_component::<Position>());
        assert!(!archetype.has_component::<Mass>());
        assert!(archetype.has_component_id(pos));
    }

    #[test]
    fn test_max_align_includes_entity_column() {
        let mut registry = registry();
        let mut desc = ArchetypeDesc::new();
        desc.add::<Position>(&mut registry).unwrap();
        let archetype = Archetype::new(desc);
        assert_eq!(archetype.max_align(), align_of::<EntityId>());
        assert_eq!(archetype.bytes_per_entity(), 8 + 8);
    }

    #[test]
    fn test_too_many_tags() {
        let mut desc = ArchetypeDesc::new();
        for i in 0..MAX_TAGS_PER_ARCHETYPE {
            desc.add_tag_id(TagComponentId::new(i as u16)).unwrap();
        }
        assert_eq!(
            desc.add_tag_id(TagComponentId::new(99)).unwrap_err(),
            EcsError::TooManyTags {
                limit: MAX_TAGS_PER_ARCHETYPE
            }
        );
    }

    #[test]
    fn test_cache_interns_once() {
        let mut registry = registry();
        let cache = ArchetypeCache::new();

        let mut a = ArchetypeDesc::new();
        a.add::<Position>(&mut registry)
            .unwrap()
            .add::<Velocity>(&mut registry)
            .unwrap();
        let mut b = ArchetypeDesc::new();
        b.add::<Velocity>(&mut registry)
            .unwrap()
            .add::<Position>(&mut registry)
            .unwrap();
        let mut c = ArchetypeDesc::new();
        c.add::<Position>(&mut registry).unwrap();

        let first = cache.intern(a);
        let second = cache.intern(b);
        let third = cache.intern(c);
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(cache.len(), 2);

        let velocity = registry.id_of::<Velocity>().unwrap();
        let query = ArchetypeQueryDesc::new().with_required([velocity].into_iter().collect());
        let matching = cache.matching(&query);
        assert_eq!(matching.len(), 1);
        assert!(Arc::ptr_eq(&matching[0], &first));
    }

    #[test]
    fn test_registries_never_share_archetypes() {
        // Position and Impulse get id 0 in their own registries and share
        // size and alignment.
        let mut first = ComponentRegistry::new();
        let mut second = ComponentRegistry::new();
        let cache = ArchetypeCache::new();

        let mut positions = ArchetypeDesc::new();
        positions.add::<Position>(&mut first).unwrap();
        let mut impulses = ArchetypeDesc::new();
        impulses.add::<Impulse>(&mut second).unwrap();
        assert_eq!(first.id_of::<Position>(), second.id_of::<Impulse>());

        let a = cache.intern(positions);
        let b = cache.intern(impulses);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(*a, *b);
        assert_eq!(cache.len(), 2);
        assert!(a.has_component::<Position>());
        assert!(b.has_component::<Impulse>());
        assert!(!b.has_component::<Position>());

        let query = ArchetypeQueryDesc::new();
        assert_eq!(cache.matching(&query).len(), 2);
        let only_second = cache.matching_in(second.id(), &query);
        assert_eq!(only_second.len(), 1);
        assert!(Arc::ptr_eq(&only_second[0], &b));
    }

    #[test]
    fn test_same_types_in_two_registries_stay_apart() {
        let mut first = ComponentRegistry::new();
        let mut second = ComponentRegistry::new();

        let mut a = ArchetypeDesc::new();
        a.add::<Position>(&mut first).unwrap();
        let mut b = ArchetypeDesc::new();
        b.add::<Position>(&mut second).unwrap();
        assert_eq!(a.registry(), Some(first.id()));
        assert_ne!(Archetype::new(a), Archetype::new(b));
    }

    #[test]
    fn test_desc_rejects_mixed_registries() {
        let mut first = ComponentRegistry::new();
        let mut second = ComponentRegistry::new();
        let mut desc = ArchetypeDesc::new();
        desc.add::<Position>(&mut first).unwrap();
        assert_eq!(
            desc.add::<Velocity>(&mut second).unwrap_err(),
            EcsError::RegistryMismatch
        );
        assert_eq!(desc.components().len(), 1);
        assert!(second.id_of::<Velocity>().is_none());
    }
}
