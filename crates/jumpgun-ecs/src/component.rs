//! Typed component storage keyed by a stable component kind.
//!
//! A [`ComponentSet`] holds the boxed components of one entity. Lookups go
//! through [`ComponentKind`] (backed by the Rust `TypeId`), so asking for a
//! capability the entity does not have yields `None` instead of a synthesized
//! default. Callers that cannot proceed without a sibling use
//! [`ComponentSet::require`], which turns the absence into
//! [`EcsError::MissingComponent`].
//!
//! The set is generic over the boxed trait object so the game crate can store
//! its own `dyn Component` here. The only requirement is [`ComponentObject`],
//! which every `'static` type gets for free.

use std::any::{Any, TypeId};
use std::fmt;

use crate::entity::EntityId;
use crate::EcsError;

// ---------------------------------------------------------------------------
// ComponentKind
// ---------------------------------------------------------------------------

/// Stable identifier for a component type.
#[derive(Clone, Copy)]
pub struct ComponentKind {
    type_id: TypeId,
    name: &'static str,
}

impl ComponentKind {
    pub fn of<T: Any>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Unqualified type name, used in diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentKind {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentKind {}

impl std::hash::Hash for ComponentKind {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentKind({})", self.name)
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    // Generic parameters would contain `::` too; none of our components are generic.
    full.rsplit("::").next().unwrap_or(full)
}

// ---------------------------------------------------------------------------
// ComponentObject
// ---------------------------------------------------------------------------

/// Downcasting support for boxed components.
///
/// Blanket-implemented for every `'static` type; trait objects pick it up by
/// declaring it as a supertrait.
pub trait ComponentObject: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn component_kind(&self) -> ComponentKind;
}

impl<T: Any> ComponentObject for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn component_kind(&self) -> ComponentKind {
        ComponentKind::of::<T>()
    }
}

// ---------------------------------------------------------------------------
// ComponentSet
// ---------------------------------------------------------------------------

struct Slot<C: ?Sized> {
    kind: ComponentKind,
    /// `None` while the component is checked out for its own update call.
    value: Option<Box<C>>,
}

/// The components owned by a single entity, in insertion order.
///
/// At most one component per kind. The set is fixed once the entity has been
/// admitted; components are never removed while the entity lives.
pub struct ComponentSet<C: ?Sized> {
    slots: Vec<Slot<C>>,
}

impl<C: ?Sized> Default for ComponentSet<C> {
    fn default() -> Self {
        Self { slots: Vec::new() }
    }
}

impl<C: ?Sized + ComponentObject> ComponentSet<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component. Fails if one of the same kind is already present.
    pub fn insert(&mut self, component: Box<C>) -> Result<ComponentKind, EcsError> {
        let kind = ComponentObject::component_kind(&*component);
        if self.contains(kind) {
            return Err(EcsError::DuplicateComponent {
                component: kind.name().to_owned(),
            });
        }
        self.slots.push(Slot {
            kind,
            value: Some(component),
        });
        Ok(kind)
    }

    /// Whether the entity owns a component of `kind`, including one that is
    /// currently checked out.
    pub fn contains(&self, kind: ComponentKind) -> bool {
        self.slots.iter().any(|s| s.kind == kind)
    }

    pub fn has<T: Any>(&self) -> bool {
        self.contains(ComponentKind::of::<T>())
    }

    /// Typed lookup. `None` when absent or checked out.
    pub fn get<T: Any>(&self) -> Option<&T> {
        let kind = ComponentKind::of::<T>();
        self.slots
            .iter()
            .find(|s| s.kind == kind)
            .and_then(|s| s.value.as_deref())
            .and_then(|c| ComponentObject::as_any(c).downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self) -> Option<&mut T> {
        let kind = ComponentKind::of::<T>();
        self.slots
            .iter_mut()
            .find(|s| s.kind == kind)
            .and_then(|s| s.value.as_deref_mut())
            .and_then(|c| ComponentObject::as_any_mut(c).downcast_mut::<T>())
    }

    /// Like [`get`](Self::get), but a missing component is an error naming
    /// the owning entity.
    pub fn require<T: Any>(&self, owner: EntityId) -> Result<&T, EcsError> {
        self.get::<T>().ok_or_else(|| EcsError::MissingComponent {
            entity: owner,
            component: ComponentKind::of::<T>().name().to_owned(),
        })
    }

    pub fn require_mut<T: Any>(&mut self, owner: EntityId) -> Result<&mut T, EcsError> {
        self.get_mut::<T>().ok_or_else(|| EcsError::MissingComponent {
            entity: owner,
            component: ComponentKind::of::<T>().name().to_owned(),
        })
    }

    /// First kind in `required` that this set lacks.
    pub fn first_missing(&self, required: &[ComponentKind]) -> Option<ComponentKind> {
        required.iter().copied().find(|k| !self.contains(*k))
    }

    pub fn kinds(&self) -> impl Iterator<Item = ComponentKind> + '_ {
        self.slots.iter().map(|s| s.kind)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Temporarily take the component at `index` out of the set so it can be
    /// mutated alongside its siblings. Pair with [`restore`](Self::restore).
    pub fn checkout(&mut self, index: usize) -> Option<Box<C>> {
        self.slots.get_mut(index).and_then(|s| s.value.take())
    }

    pub fn restore(&mut self, index: usize, component: Box<C>) {
        if let Some(slot) = self.slots.get_mut(index) {
            debug_assert!(slot.value.is_none(), "restoring into an occupied slot");
            slot.value = Some(component);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &C> + '_ {
        self.slots.iter().filter_map(|s| s.value.as_deref())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut C> + '_ {
        self.slots.iter_mut().filter_map(|s| s.value.as_deref_mut())
    }
}

impl<C: ?Sized> fmt::Debug for ComponentSet<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.slots.iter().map(|s| s.kind.name()))
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
