//! Component cells and the tuple traits used to name component kinds.
//!
//! A component is an arbitrary `'static` value whose runtime kind, its
//! [`TypeId`], is its lookup key on an entity. The kind tag is chosen at
//! compile time, so every value's kind is discoverable by construction.
//!
//! Two tuple traits make kind lists ergonomic at call sites:
//!
//! - [`ComponentKinds`] names a set of kinds by type, e.g.
//!   `Query::entities::<(Position, Velocity)>()`.
//! - [`ComponentBundle`] carries a set of component values into a spawn,
//!   e.g. `world.spawn((Position::default(), Velocity::default()))`.
//!
//! Both are implemented for tuples up to arity 8. `ComponentBundle` is
//! sealed: installing components onto a live entity outside the world's
//! structural-change pipeline would silently desynchronise query
//! membership, so only the crate can drive installation.

use std::any::TypeId;
use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use crate::entity::Entity;

/// A shared cell holding one component value.
///
/// Returned by [`Entity::get`]. In-place mutation through
/// [`Comp::borrow_mut`] is always allowed and does not affect query
/// membership; only adding or removing component kinds does.
pub struct Comp<T> {
    cell: Rc<RefCell<T>>,
}

impl<T> Comp<T> {
    pub(crate) fn from_cell(cell: Rc<RefCell<T>>) -> Self {
        Self { cell }
    }

    /// Immutably borrow the component value.
    ///
    /// # Panics
    ///
    /// Panics if the same component is currently mutably borrowed.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, T> {
        self.cell.borrow()
    }

    /// Mutably borrow the component value.
    ///
    /// # Panics
    ///
    /// Panics if the same component is currently borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.cell.borrow_mut()
    }
}

impl<T> Clone for Comp<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

/// A tuple of component types used to name a set of component kinds.
pub trait ComponentKinds {
    /// The [`TypeId`] of every type in the tuple, in tuple order.
    fn kinds() -> Vec<TypeId>;
}

impl ComponentKinds for () {
    fn kinds() -> Vec<TypeId> {
        Vec::new()
    }
}

macro_rules! impl_component_kinds {
    ($($name:ident),+) => {
        impl<$($name: 'static),+> ComponentKinds for ($($name,)+) {
            fn kinds() -> Vec<TypeId> {
                vec![$(TypeId::of::<$name>(),)+]
            }
        }
    };
}

impl_component_kinds!(A);
impl_component_kinds!(A, B);
impl_component_kinds!(A, B, C);
impl_component_kinds!(A, B, C, D);
impl_component_kinds!(A, B, C, D, E);
impl_component_kinds!(A, B, C, D, E, F);
impl_component_kinds!(A, B, C, D, E, F, G);
impl_component_kinds!(A, B, C, D, E, F, G, H);

mod sealed {
    use crate::entity::Entity;

    pub trait Install {
        fn install(self, entity: &Entity);
    }
}

pub(crate) use sealed::Install;

/// A tuple of component values handed to a spawn call.
///
/// At most one value per kind ends up on the entity; a later tuple element
/// of the same kind overwrites an earlier one.
pub trait ComponentBundle: sealed::Install {}

impl<T: sealed::Install> ComponentBundle for T {}

impl sealed::Install for () {
    fn install(self, _entity: &Entity) {}
}

macro_rules! impl_component_bundle {
    ($($name:ident),+) => {
        #[allow(non_snake_case)]
        impl<$($name: 'static),+> sealed::Install for ($($name,)+) {
            fn install(self, entity: &Entity) {
                let ($($name,)+) = self;
                $(entity.insert($name);)+
            }
        }
    };
}

impl_component_bundle!(A);
impl_component_bundle!(A, B);
impl_component_bundle!(A, B, C);
impl_component_bundle!(A, B, C, D);
impl_component_bundle!(A, B, C, D, E);
impl_component_bundle!(A, B, C, D, E, F);
impl_component_bundle!(A, B, C, D, E, F, G);
impl_component_bundle!(A, B, C, D, E, F, G, H);
