//! Query descriptors — what a system declares it needs.
//!
//! A [`Query`] resolves to exactly one argument of the bound system, in
//! declaration order. The six descriptor kinds form a tagged enum and are
//! dispatched by structural matching, never by marker identity.
//!
//! Descriptors are built by chaining:
//!
//! ```
//! use reflex_ecs::Query;
//!
//! struct Position;
//! struct Velocity;
//! struct Frozen;
//! struct Config;
//!
//! let q = Query::entities::<(Position, Velocity)>()
//!     .without::<(Frozen,)>();
//! let r = Query::resource::<Config>().nullable();
//! # let _ = (q, r);
//! ```

use std::any::{type_name, TypeId};
use std::rc::Rc;

use crate::component::ComponentKinds;
use crate::entity::Entity;

/// An opaque predicate over entities, attached to an entity query.
///
/// Predicates are evaluated at query granularity: the runtime never
/// decomposes them, it only re-runs them against the base membership when
/// the owning system is invalidated.
pub type EntityFilter = Rc<dyn Fn(&Entity) -> bool>;

/// The entity-set portion of a query: required kinds, excluded kinds, and
/// optional opaque predicates.
#[derive(Clone)]
pub struct EntityQuery {
    pub(crate) required: Vec<TypeId>,
    pub(crate) excluded: Vec<TypeId>,
    pub(crate) filters: Vec<EntityFilter>,
}

impl std::fmt::Debug for EntityQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityQuery")
            .field("required", &self.required.len())
            .field("excluded", &self.excluded.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}

/// A declared system parameter.
#[derive(Clone, Debug)]
pub enum Query {
    /// The set of live entities carrying all required kinds and none of the
    /// excluded kinds, further narrowed by any predicates.
    Entities(EntityQuery),
    /// A singleton resource by kind.
    Resource {
        /// The resource's kind tag.
        kind: TypeId,
        /// Type name, for diagnostics.
        name: &'static str,
        /// When `true`, the parameter is satisfiable even while absent.
        nullable: bool,
    },
    /// The read side of an event channel.
    EventReader {
        /// The event's kind tag.
        kind: TypeId,
        /// Type name, for diagnostics.
        name: &'static str,
    },
    /// The write side of an event channel.
    EventWriter {
        /// The event's kind tag.
        kind: TypeId,
        /// Type name, for diagnostics.
        name: &'static str,
    },
    /// The deferred-command sink.
    Commands,
    /// The world handle itself.
    World,
}

impl Query {
    /// Declare an entity-set parameter requiring every kind in the tuple
    /// `K`, e.g. `Query::entities::<(Position, Velocity)>()`.
    #[must_use]
    pub fn entities<K: ComponentKinds>() -> Self {
        Self::Entities(EntityQuery {
            required: K::kinds(),
            excluded: Vec::new(),
            filters: Vec::new(),
        })
    }

    /// Exclude entities carrying any kind in the tuple `K`.
    ///
    /// # Panics
    ///
    /// Panics when chained onto a non-entity query.
    #[must_use]
    pub fn without<K: ComponentKinds>(self) -> Self {
        match self {
            Self::Entities(mut q) => {
                q.excluded.extend(K::kinds());
                Self::Entities(q)
            }
            _ => panic!("without() applies only to entity queries"),
        }
    }

    /// Narrow the entity set with an opaque predicate.
    ///
    /// # Panics
    ///
    /// Panics when chained onto a non-entity query.
    #[must_use]
    pub fn filtered(self, filter: impl Fn(&Entity) -> bool + 'static) -> Self {
        match self {
            Self::Entities(mut q) => {
                q.filters.push(Rc::new(filter));
                Self::Entities(q)
            }
            _ => panic!("filtered() applies only to entity queries"),
        }
    }

    /// Declare a required singleton resource of type `T`.
    #[must_use]
    pub fn resource<T: 'static>() -> Self {
        Self::Resource {
            kind: TypeId::of::<T>(),
            name: type_name::<T>(),
            nullable: false,
        }
    }

    /// Mark a resource parameter as satisfiable even while the resource is
    /// absent. The system then reads it through
    /// [`crate::Ctx::try_resource`].
    ///
    /// # Panics
    ///
    /// Panics when chained onto a non-resource query.
    #[must_use]
    pub fn nullable(self) -> Self {
        match self {
            Self::Resource { kind, name, .. } => Self::Resource {
                kind,
                name,
                nullable: true,
            },
            _ => panic!("nullable() applies only to resource queries"),
        }
    }

    /// Declare an event-reader parameter for event type `E`.
    #[must_use]
    pub fn reader<E: 'static>() -> Self {
        Self::EventReader {
            kind: TypeId::of::<E>(),
            name: type_name::<E>(),
        }
    }

    /// Declare an event-writer parameter for event type `E`.
    #[must_use]
    pub fn writer<E: 'static>() -> Self {
        Self::EventWriter {
            kind: TypeId::of::<E>(),
            name: type_name::<E>(),
        }
    }

    /// Declare the deferred-command sink parameter.
    #[must_use]
    pub fn commands() -> Self {
        Self::Commands
    }

    /// Declare the world-handle parameter.
    #[must_use]
    pub fn world() -> Self {
        Self::World
    }
}
