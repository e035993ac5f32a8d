//! # reflex_ecs
//!
//! A single-threaded reactive ECS runtime. Systems declare the data they
//! need as an ordered list of queries; the world resolves each declaration
//! into a cached pack and only rebuilds a system's arguments when a
//! structural change actually touches one of its packs. Systems whose
//! requirements are unmet (an empty entity set, an absent non-nullable
//! resource) are skipped instead of invoked.
//!
//! This crate provides:
//!
//! - [`World`] — entity/resource storage, event channels, and the fixed
//!   per-tick pipeline.
//! - [`Entity`] and [`Comp`] — shared entity handles and component cells.
//! - [`Query`] — the declarative query language systems are built from.
//! - [`EventReader`] / [`EventWriter`] — double-buffered event channels
//!   with exactly-one-tick visibility.
//! - [`Commands`] — deferred world mutations, executed at the next tick's
//!   synchronization point.
//! - [`Plugin`] — reusable bundles of registrations.
//!
//! ```
//! use reflex_ecs::{Phase, Query, World};
//!
//! #[derive(Debug)]
//! struct Position {
//!     x: f32,
//!     y: f32,
//! }
//! #[derive(Debug)]
//! struct Velocity {
//!     dx: f32,
//!     dy: f32,
//! }
//!
//! let mut world = World::new();
//! world
//!     .add_system(
//!         Phase::Update,
//!         "movement",
//!         vec![Query::entities::<(Position, Velocity)>()],
//!         |ctx| {
//!             for entity in ctx.entities(0) {
//!                 let position = entity.get::<Position>().unwrap();
//!                 let velocity = entity.get::<Velocity>().unwrap();
//!                 let velocity = velocity.borrow();
//!                 let mut position = position.borrow_mut();
//!                 position.x += velocity.dx;
//!                 position.y += velocity.dy;
//!             }
//!         },
//!     )
//!     .unwrap();
//!
//! world.spawn((Position { x: 0.0, y: 0.0 }, Velocity { dx: 1.0, dy: 0.0 }));
//! world.start_up();
//! world.run_tick();
//! world.run_tick();
//! ```

pub mod commands;
pub mod component;
pub mod entity;
pub mod error;
pub mod event;
mod pack;
pub mod plugin;
pub mod query;
pub mod system;
pub mod world;

pub use commands::{Command, Commands};
pub use component::{Comp, ComponentBundle, ComponentKinds};
pub use entity::{Entity, EntityId};
pub use error::EcsError;
pub use event::{EventReader, EventWriter};
pub use plugin::Plugin;
pub use query::{EntityFilter, Query};
pub use system::{Ctx, Phase, SystemFn};
pub use world::{Res, World};
