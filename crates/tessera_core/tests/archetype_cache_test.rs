//! Integration tests for archetype identity, interning and query matching.

use std::sync::Arc;
use std::thread;

use tessera_core::{
    Archetype, ArchetypeBits, ArchetypeCache, ArchetypeDesc, ArchetypeQueryDesc,
    ArchetypeStorage, ComponentRegistry, EntityId,
};

#[derive(Default)]
struct A {
    _value: u32,
}
#[derive(Default)]
struct B {
    _value: u64,
}
#[derive(Default)]
struct C {
    _value: f32,
}
#[derive(Default)]
struct D {
    _value: [u8; 3],
}
#[derive(Default)]
struct Hidden;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Heat {
    kelvin: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct Charge {
    coulomb: u32,
}

struct Fixture {
    registry: ComponentRegistry,
    cache: ArchetypeCache,
}

impl Fixture {
    fn new() -> Self {
        let mut registry = ComponentRegistry::new();
        registry.register::<A>().unwrap();
        registry.register::<B>().unwrap();
        registry.register::<C>().unwrap();
        registry.register::<D>().unwrap();
        registry.register::<Hidden>().unwrap();
        Self {
            registry,
            cache: ArchetypeCache::new(),
        }
    }

    fn desc(
        &mut self,
        build: impl FnOnce(&mut ArchetypeDesc, &mut ComponentRegistry),
    ) -> ArchetypeDesc {
        let mut desc = ArchetypeDesc::new();
        build(&mut desc, &mut self.registry);
        desc
    }

    fn bits<T: 'static>(&self) -> ArchetypeBits {
        let mut bits = ArchetypeBits::new();
        if let Some(id) = self.registry.id_of::<T>() {
            bits.add(id);
        } else if let Some(id) = self.registry.tag_id_of::<T>() {
            bits.add_tag(id);
        }
        bits
    }
}

#[test]
fn test_declaration_order_does_not_matter() {
    let mut fixture = Fixture::new();
    let abd = fixture.desc(|d, r| {
        d.add::<A>(r).unwrap().add::<B>(r).unwrap().add::<D>(r).unwrap();
    });
    let dba = fixture.desc(|d, r| {
        d.add::<D>(r).unwrap().add::<B>(r).unwrap().add::<A>(r).unwrap();
    });

    let first = fixture.cache.intern(abd);
    let second = fixture.cache.intern(dba);
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(fixture.cache.len(), 1);
}

#[test]
fn test_query_matches_interned_archetypes() {
    let mut fixture = Fixture::new();
    let abd = fixture.desc(|d, r| {
        d.add::<A>(r).unwrap().add::<B>(r).unwrap().add::<D>(r).unwrap();
    });
    let abc = fixture.desc(|d, r| {
        d.add::<A>(r).unwrap().add::<B>(r).unwrap().add::<C>(r).unwrap();
    });
    let a = fixture.desc(|d, r| {
        d.add::<A>(r).unwrap();
    });
    let abd_hidden = fixture.desc(|d, r| {
        d.add::<A>(r)
            .unwrap()
            .add::<B>(r)
            .unwrap()
            .add::<D>(r)
            .unwrap()
            .add::<Hidden>(r)
            .unwrap();
    });

    let abd = fixture.cache.intern(abd);
    fixture.cache.intern(abc);
    fixture.cache.intern(a);
    fixture.cache.intern(abd_hidden);

    // Required {A}, excluded {C}, any of {B, D}, and no Hidden tag.
    let required = fixture.bits::<A>();
    let mut subtractive = fixture.bits::<C>();
    subtractive.add_tag(fixture.registry.tag_id_of::<Hidden>().unwrap());
    let mut any = fixture.bits::<B>();
    any.add(fixture.registry.id_of::<D>().unwrap());

    let query = ArchetypeQueryDesc::new()
        .with_required(required)
        .with_subtractive(subtractive)
        .with_require_any(any);

    let matches = fixture.cache.matching(&query);
    assert_eq!(matches.len(), 1);
    assert!(Arc::ptr_eq(&matches[0], &abd));
}

#[test]
fn test_empty_query_matches_everything() {
    let mut fixture = Fixture::new();
    let a = fixture.desc(|d, r| {
        d.add::<A>(r).unwrap();
    });
    fixture.cache.intern(a);
    fixture.cache.intern(ArchetypeDesc::new());

    assert_eq!(fixture.cache.matching(&ArchetypeQueryDesc::new()).len(), 2);
}

#[test]
fn test_concurrent_interning_shares_one_archetype() {
    let mut fixture = Fixture::new();
    let desc = fixture.desc(|d, r| {
        d.add::<B>(r).unwrap().add::<C>(r).unwrap();
    });
    let cache = Arc::new(ArchetypeCache::new());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = Arc::clone(&cache);
            let desc = desc.clone();
            thread::spawn(move || {
                (0..100)
                    .map(|_| cache.intern(desc.clone()))
                    .collect::<Vec<Arc<Archetype>>>()
            })
        })
        .collect();

    let all: Vec<Arc<Archetype>> = handles
        .into_iter()
        .flat_map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(cache.len(), 1);
    let first = &all[0];
    assert!(all.iter().all(|archetype| Arc::ptr_eq(archetype, first)));
    assert_eq!(cache.get(first), Some(Arc::clone(first)));
}

#[test]
fn test_containment_and_lookup() {
    let mut fixture = Fixture::new();
    let abc = Archetype::new(fixture.desc(|d, r| {
        d.add::<C>(r).unwrap().add::<A>(r).unwrap().add::<B>(r).unwrap();
    }));
    let ab = Archetype::new(fixture.desc(|d, r| {
        d.add::<A>(r).unwrap().add::<B>(r).unwrap();
    }));

    assert!(abc.contains(&ab));
    assert!(!ab.contains(&abc));

    let c = fixture.registry.id_of::<C>().unwrap();
    assert_eq!(abc.index_of(c), 2);
    assert_eq!(ab.index_of(c), ab.count());
    assert!(abc.has_component::<C>());
    assert!(!ab.has_component::<C>());
}

#[test]
fn test_shared_cache_keeps_worlds_apart() {
    // Heat and Charge both get id 0 in their own world's registry.
    let mut thermal = ComponentRegistry::new();
    let mut electric = ComponentRegistry::new();
    let cache = ArchetypeCache::new();

    let mut heat = ArchetypeDesc::new();
    heat.add::<Heat>(&mut thermal).unwrap();
    let mut charge = ArchetypeDesc::new();
    charge.add::<Charge>(&mut electric).unwrap();
    assert_eq!(thermal.id_of::<Heat>(), electric.id_of::<Charge>());

    let heat = cache.intern(heat);
    let charge = cache.intern(charge);
    assert!(!Arc::ptr_eq(&heat, &charge));
    assert_eq!(cache.len(), 2);

    let mut storage = ArchetypeStorage::new(charge, 2).unwrap();
    let index = storage.add(EntityId::new(0, 0)).unwrap();
    storage.component_mut::<Charge>(index).unwrap().coulomb = 3;
    assert_eq!(storage.components::<Charge>().unwrap(), &[Charge { coulomb: 3 }]);
    assert!(storage.components::<Heat>().is_none());

    let query = ArchetypeQueryDesc::new();
    let thermal_only = cache.matching_in(thermal.id(), &query);
    assert_eq!(thermal_only.len(), 1);
    assert!(Arc::ptr_eq(&thermal_only[0], &heat));
    assert_eq!(heat.components()[0].name(), std::any::type_name::<Heat>());
}
