//! Deferred command queue.
//!
//! Systems never mutate the world directly. [`Commands`] records nullary
//! mutations as closures; the world drains and executes them once per tick,
//! in enqueue order, at a fixed pipeline point before structural changes
//! are applied. The handle is cheap to clone; every clone feeds the same
//! queue.

use std::cell::RefCell;
use std::rc::Rc;

use crate::component::ComponentBundle;
use crate::entity::Entity;
use crate::world::World;

/// A recorded deferred mutation.
pub type Command = Box<dyn FnOnce(&World)>;

/// A shared handle to the world's deferred-command queue.
#[derive(Clone, Default)]
pub struct Commands {
    queue: Rc<RefCell<Vec<Command>>>,
}

impl Commands {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record an arbitrary deferred mutation.
    pub fn add(&self, command: impl FnOnce(&World) + 'static) {
        self.queue.borrow_mut().push(Box::new(command));
    }

    /// Record a deferred spawn with the given component bundle.
    pub fn spawn<B: ComponentBundle + 'static>(&self, bundle: B) {
        self.add(move |world| {
            world.spawn(bundle);
        });
    }

    /// Record a deferred despawn.
    pub fn despawn(&self, entity: &Entity) {
        let entity = entity.clone();
        self.add(move |world| world.despawn(&entity));
    }

    /// Record a deferred resource insertion, replacing any existing
    /// resource of the same kind wholesale.
    pub fn insert_resource<T: 'static>(&self, value: T) {
        self.add(move |world| world.insert_resource(value));
    }

    /// Drain the queue, leaving it empty.
    pub(crate) fn take(&self) -> Vec<Command> {
        std::mem::take(&mut *self.queue.borrow_mut())
    }

    /// Number of commands currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.borrow().is_empty()
    }
}
