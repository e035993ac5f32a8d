//! Entity handles and per-entity component storage.
//!
//! An [`Entity`] is a cheaply-cloneable handle over a shared record: a
//! monotonically increasing `u64` id, a liveness flag, and a map from
//! component kind ([`TypeId`]) to component cell. Every handle to the same
//! entity observes the same component data, so a query result list and the
//! world's own store always agree.
//!
//! Component *values* may be mutated in place at any time through the
//! cell returned by [`Entity::get`]; the component *set* (which kinds are
//! present) changes only through the world's deferred structural-change
//! pipeline, never mid-tick.

use std::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::component::{Comp, ComponentKinds};

/// A unique entity identifier.
///
/// Ids are allocated by the world, start at 1 (0 is never allocated), and
/// are never reused after destruction.
pub type EntityId = u64;

struct EntityInner {
    id: EntityId,
    alive: Cell<bool>,
    components: RefCell<HashMap<TypeId, Rc<dyn Any>>>,
}

/// A shared handle to one entity.
///
/// Cloning is cheap and every clone refers to the same component data.
/// Equality compares entity ids.
#[derive(Clone)]
pub struct Entity {
    inner: Rc<EntityInner>,
}

impl Entity {
    pub(crate) fn new(id: EntityId) -> Self {
        Self {
            inner: Rc::new(EntityInner {
                id,
                alive: Cell::new(true),
                components: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// The entity's id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.inner.id
    }

    /// Whether the entity is still live. Flips to `false` permanently when
    /// a despawn is applied by the structural-change pipeline.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.alive.get()
    }

    pub(crate) fn kill(&self) {
        self.inner.alive.set(false);
    }

    /// Fetch the component of kind `T`, if present.
    ///
    /// Absence is a first-class outcome; this never panics. The returned
    /// [`Comp`] cell allows in-place reads and writes of the value.
    #[must_use]
    pub fn get<T: 'static>(&self) -> Option<Comp<T>> {
        let cell = self
            .inner
            .components
            .borrow()
            .get(&TypeId::of::<T>())
            .cloned()?;
        let cell = cell.downcast::<RefCell<T>>().ok()?;
        Some(Comp::from_cell(cell))
    }

    /// Whether a component of kind `T` is present.
    #[must_use]
    pub fn has<T: 'static>(&self) -> bool {
        self.has_kind(TypeId::of::<T>())
    }

    /// Whether every kind in the tuple `K` is present, e.g.
    /// `entity.has_all::<(Position, Velocity)>()`.
    #[must_use]
    pub fn has_all<K: ComponentKinds>(&self) -> bool {
        K::kinds().iter().all(|kind| self.has_kind(*kind))
    }

    /// Number of components currently attached.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.inner.components.borrow().len()
    }

    pub(crate) fn has_kind(&self, kind: TypeId) -> bool {
        self.inner.components.borrow().contains_key(&kind)
    }

    /// Insert a component, overwriting any existing value of the same kind.
    pub(crate) fn insert<T: 'static>(&self, value: T) {
        self.insert_cell(TypeId::of::<T>(), Rc::new(RefCell::new(value)));
    }

    pub(crate) fn insert_cell(&self, kind: TypeId, cell: Rc<dyn Any>) {
        self.inner.components.borrow_mut().insert(kind, cell);
    }

    /// Remove a component by kind. Removing an absent kind is a no-op.
    pub(crate) fn remove_kind(&self, kind: TypeId) {
        self.inner.components.borrow_mut().remove(&kind);
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Entity {}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.inner.id)
            .field("alive", &self.inner.alive.get())
            .finish()
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({})", self.inner.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Health {
        current: f32,
    }

    struct Frozen;

    #[test]
    fn test_get_absent_component_is_none() {
        let e = Entity::new(1);
        assert!(e.get::<Health>().is_none());
        assert!(!e.has::<Health>());
    }

    #[test]
    fn test_insert_and_get() {
        let e = Entity::new(1);
        e.insert(Health { current: 80.0 });
        let health = e.get::<Health>().unwrap();
        assert_eq!(health.borrow().current, 80.0);
    }

    #[test]
    fn test_insert_overwrites_same_kind() {
        let e = Entity::new(1);
        e.insert(Health { current: 80.0 });
        e.insert(Health { current: 20.0 });
        assert_eq!(e.component_count(), 1);
        assert_eq!(e.get::<Health>().unwrap().borrow().current, 20.0);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let e = Entity::new(1);
        e.remove_kind(TypeId::of::<Health>());
        assert_eq!(e.component_count(), 0);
    }

    #[test]
    fn test_has_all() {
        let e = Entity::new(1);
        e.insert(Health { current: 1.0 });
        e.insert(Frozen);
        assert!(e.has_all::<(Health, Frozen)>());
        e.remove_kind(TypeId::of::<Frozen>());
        assert!(e.has_all::<(Health,)>());
        assert!(!e.has_all::<(Health, Frozen)>());
    }

    #[test]
    fn test_handles_share_component_data() {
        let e = Entity::new(1);
        let clone = e.clone();
        e.insert(Health { current: 10.0 });
        clone.get::<Health>().unwrap().borrow_mut().current = 99.0;
        assert_eq!(e.get::<Health>().unwrap().borrow().current, 99.0);
    }

    #[test]
    fn test_kill_is_permanent() {
        let e = Entity::new(1);
        assert!(e.is_alive());
        e.kill();
        assert!(!e.is_alive());
    }

    #[test]
    fn test_equality_is_by_id() {
        let a = Entity::new(7);
        let b = Entity::new(7);
        let c = Entity::new(8);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
