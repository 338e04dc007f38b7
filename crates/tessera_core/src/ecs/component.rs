//! # Component Types
//!
//! Components are plain data with a default value. Zero-sized components are
//! tags: they mark presence in an archetype and never occupy storage.
//!
//! Storage is type-erased, so every data component is described by a
//! [`ComponentInfo`] carrying its layout and the two operations the storage
//! needs: default-construct in place and drop in place. Moves are bitwise.

// SAFETY: This module defines the type-erased construct/destroy entry points.
// Callers of those entry points uphold the pointer contracts documented below.
#![allow(unsafe_code)]

use std::any::TypeId;
use std::mem::{align_of, needs_drop, size_of};

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Default`: new slots are default-constructed
/// - `Send + Sync`: storages are shared with worker threads
/// - `'static`: identified by `TypeId`
///
/// Dropping a component must not panic; bulk destruction never checks.
pub trait Component: Default + Send + Sync + 'static {}

impl<T: Default + Send + Sync + 'static> Component for T {}

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        pub struct $name(u16);

        impl $name {
            /// Wraps a raw id value.
            #[inline]
            #[must_use]
            pub const fn new(value: u16) -> Self {
                Self(value)
            }

            /// Raw id value.
            #[inline]
            #[must_use]
            pub const fn value(self) -> u16 {
                self.0
            }

            /// Id as a bit/array index.
            #[inline]
            #[must_use]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

id_type! {
    /// Id of a data component, unique within one registry's component space.
    ComponentId
}

id_type! {
    /// Id of a zero-sized tag, unique within one registry's tag space.
    TagComponentId
}

id_type! {
    /// Id of a message tag, unique within one registry's message tag space.
    MsgTagId
}

/// A registered type resolved to its id space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKey {
    /// Data component.
    Component(ComponentId),
    /// Zero-sized tag.
    Tag(TagComponentId),
}

/// Type-erased descriptor of a data component.
#[derive(Clone, Copy)]
pub struct ComponentInfo {
    id: ComponentId,
    type_id: TypeId,
    name: &'static str,
    size: usize,
    align: usize,
    needs_drop: bool,
    construct: unsafe fn(*mut u8),
    destroy: unsafe fn(*mut u8),
}

/// Writes `T::default()` to `ptr`.
///
/// # Safety
///
/// `ptr` must be valid for writes and aligned for `T`; any value already there
/// is overwritten without being dropped.
unsafe fn construct_in_place<T: Component>(ptr: *mut u8) {
    ptr.cast::<T>().write(T::default());
}

/// Drops the `T` at `ptr`.
///
/// # Safety
///
/// `ptr` must point to an initialized, aligned `T` that is not used afterwards.
unsafe fn destroy_in_place<T: Component>(ptr: *mut u8) {
    std::ptr::drop_in_place(ptr.cast::<T>());
}

impl ComponentInfo {
    /// Describes data component `T` under `id`.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized; tags have no descriptor.
    #[must_use]
    pub fn of<T: Component>(id: ComponentId) -> Self {
        assert!(
            size_of::<T>() > 0,
            "{} is zero-sized and has no storage descriptor",
            std::any::type_name::<T>()
        );
        Self {
            id,
            type_id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
            needs_drop: needs_drop::<T>(),
            construct: construct_in_place::<T>,
            destroy: destroy_in_place::<T>,
        }
    }

    /// Component id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Rust type identity.
    #[inline]
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Rust type name, for diagnostics.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Size in bytes, always a multiple of [`ComponentInfo::align`].
    #[inline]
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Alignment in bytes.
    #[inline]
    #[must_use]
    pub const fn align(&self) -> usize {
        self.align
    }

    /// Whether dropping a value does anything.
    #[inline]
    #[must_use]
    pub const fn needs_drop(&self) -> bool {
        self.needs_drop
    }

    /// `true` if this descriptor was built for `T`.
    #[inline]
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Default-constructs a value at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for `size()` bytes of writes and aligned to
    /// `align()`. A live value at `ptr` is leaked, not dropped.
    #[inline]
    pub unsafe fn construct(&self, ptr: *mut u8) {
        (self.construct)(ptr);
    }

    /// Drops the value at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must hold a live value of this component type, which is dead
    /// afterwards.
    #[inline]
    pub unsafe fn destroy(&self, ptr: *mut u8) {
        (self.destroy)(ptr);
    }
}

impl PartialEq for ComponentInfo {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.type_id == other.type_id
            && self.size == other.size
            && self.align == other.align
    }
}

impl Eq for ComponentInfo {}

impl std::fmt::Debug for ComponentInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("align", &self.align)
            .finish()
    }
}
