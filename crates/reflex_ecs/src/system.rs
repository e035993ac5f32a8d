//! System bindings and execution.
//!
//! A system is registered as a callable plus an ordered list of
//! [`Query`] descriptors and a [`Phase`]. Registration eagerly builds one
//! query pack per descriptor, in declaration order, and wraps everything in
//! a [`SystemPack`] binding.
//!
//! Per tick, the binding decides two things independently:
//!
//! 1. whether to re-resolve its cached argument list (`needs_refresh`,
//!    set by structural notifications and by pack `update()` hooks), and
//! 2. whether to invoke at all (every pack valid after the refresh).
//!
//! A refresh aborts at the first invalid pack and marks the binding
//! skipped for the tick; no partial argument list ever reaches a system.

use std::rc::Rc;

use tracing::trace;

use crate::commands::Commands;
use crate::entity::Entity;
use crate::error::EcsError;
use crate::event::{EventReader, EventWriter};
use crate::pack::{ArgValue, PackContext, QueryPack};
use crate::query::Query;
use crate::world::{Res, World};

/// The fixed execution buckets of the tick pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Runs exactly once, before any tick.
    StartUp,
    /// Runs every tick, before `LateUpdate`.
    Update,
    /// Runs every tick after `Update`; the frame counter increments at
    /// entry to this phase.
    LateUpdate,
}

/// The callable shape of a system.
pub type SystemFn = Box<dyn FnMut(Ctx<'_>)>;

/// Positional access to a system's resolved arguments.
///
/// Arguments appear in the order the queries were declared at
/// registration. Accessors panic on an index or type that contradicts the
/// declaration; that is a programming error in the system, not a runtime
/// condition.
pub struct Ctx<'a> {
    world: &'a World,
    system: &'a str,
    args: &'a [ArgValue],
}

impl<'a> Ctx<'a> {
    /// The entity set resolved for the entity query at `index`.
    ///
    /// Never empty: a system with an empty entity set is skipped, not
    /// invoked.
    #[must_use]
    pub fn entities(&self, index: usize) -> &'a [Entity] {
        match self.arg(index) {
            ArgValue::Entities(entities) => entities,
            _ => self.mismatch(index, "an entity query"),
        }
    }

    /// The resource resolved for the non-nullable resource query at
    /// `index`. Guaranteed present while the system runs.
    #[must_use]
    pub fn resource<T: 'static>(&self, index: usize) -> Res<T> {
        match self.try_resource::<T>(index) {
            Some(resource) => resource,
            None => panic!(
                "system '{}' argument {index}: resource {} is absent; \
                 declare it nullable and use try_resource()",
                self.system,
                std::any::type_name::<T>()
            ),
        }
    }

    /// The resource resolved for the resource query at `index`, or `None`
    /// while absent. Intended for nullable declarations.
    #[must_use]
    pub fn try_resource<T: 'static>(&self, index: usize) -> Option<Res<T>> {
        let cell = match self.arg(index) {
            ArgValue::Resource(cell) => cell.clone()?,
            _ => self.mismatch(index, "a resource query"),
        };
        match cell.downcast::<std::cell::RefCell<T>>() {
            Ok(cell) => Some(Res::from_cell(cell)),
            Err(_) => panic!(
                "system '{}' argument {index}: declared resource kind does not match {}",
                self.system,
                std::any::type_name::<T>()
            ),
        }
    }

    /// The event reader at `index`. Never drained while the system runs.
    #[must_use]
    pub fn reader<E: 'static>(&self, index: usize) -> EventReader<E> {
        match self.arg(index) {
            ArgValue::EventReader(channel) => {
                if channel.kind() != std::any::TypeId::of::<E>() {
                    panic!(
                        "system '{}' argument {index}: declared event reader is for {}, not {}",
                        self.system,
                        channel.name(),
                        std::any::type_name::<E>()
                    );
                }
                EventReader::new(channel.clone())
            }
            _ => self.mismatch(index, "an event reader query"),
        }
    }

    /// The event writer at `index`.
    #[must_use]
    pub fn writer<E: 'static>(&self, index: usize) -> EventWriter<E> {
        match self.arg(index) {
            ArgValue::EventWriter(channel, marks) => {
                if channel.kind() != std::any::TypeId::of::<E>() {
                    panic!(
                        "system '{}' argument {index}: declared event writer is for {}, not {}",
                        self.system,
                        channel.name(),
                        std::any::type_name::<E>()
                    );
                }
                EventWriter::new(channel.clone(), marks.clone())
            }
            _ => self.mismatch(index, "an event writer query"),
        }
    }

    /// The deferred-command sink at `index`.
    #[must_use]
    pub fn commands(&self, index: usize) -> Commands {
        match self.arg(index) {
            ArgValue::Commands(commands) => commands.clone(),
            _ => self.mismatch(index, "a commands query"),
        }
    }

    /// The world handle at `index`.
    #[must_use]
    pub fn world(&self, index: usize) -> &'a World {
        match self.arg(index) {
            ArgValue::World => self.world,
            _ => self.mismatch(index, "a world query"),
        }
    }

    fn arg(&self, index: usize) -> &'a ArgValue {
        match self.args.get(index) {
            Some(arg) => arg,
            None => panic!(
                "system '{}' has {} declared queries, argument {index} does not exist",
                self.system,
                self.args.len()
            ),
        }
    }

    fn mismatch(&self, index: usize, expected: &str) -> ! {
        panic!(
            "system '{}' argument {index} was not declared as {expected}",
            self.system
        )
    }
}

/// One registered system: its callable, its packs, and its argument cache.
pub(crate) struct SystemPack {
    name: String,
    func: SystemFn,
    packs: Vec<QueryPack>,
    /// Cached argument list, rebuilt only when an input changed.
    args: Vec<ArgValue>,
    /// Whether the cached arguments form a complete, valid list.
    valid: bool,
    /// Set by structural notifications; forces an argument rebuild.
    needs_refresh: bool,
}

impl SystemPack {
    pub(crate) fn new(
        name: String,
        queries: Vec<Query>,
        func: SystemFn,
        ctx: &PackContext<'_>,
    ) -> Result<Self, EcsError> {
        let packs = queries
            .into_iter()
            .map(|query| QueryPack::build(query, &name, ctx))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name,
            func,
            packs,
            args: Vec::new(),
            valid: false,
            needs_refresh: true,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Run one execution attempt: poll pack update hooks, refresh the
    /// argument cache if anything changed, then invoke or skip.
    pub(crate) fn execute(&mut self, world: &World) {
        for pack in &mut self.packs {
            pack.begin_execution();
        }
        for pack in &mut self.packs {
            if pack.update() {
                self.needs_refresh = true;
            }
        }
        if self.needs_refresh {
            self.refresh_args();
            self.needs_refresh = false;
        }
        if !self.valid {
            trace!(system = %self.name, "skipped: unsatisfied query parameter");
            return;
        }
        (self.func)(Ctx {
            world,
            system: &self.name,
            args: &self.args,
        });
    }

    /// Rebuild the cached arguments in declared order, aborting at the
    /// first unsatisfiable pack.
    fn refresh_args(&mut self) {
        self.args.clear();
        for pack in &mut self.packs {
            pack.ensure_fresh();
        }
        for pack in &self.packs {
            if !pack.is_valid() {
                self.args.clear();
                self.valid = false;
                return;
            }
            self.args.push(pack.value());
        }
        self.valid = true;
    }

    // -- Structural notifications, fanned out by the world --

    pub(crate) fn on_entity_added(&mut self, entity: &Entity) {
        let mut changed = false;
        for pack in &mut self.packs {
            changed |= pack.on_entity_added(entity);
        }
        if changed {
            self.needs_refresh = true;
        }
    }

    pub(crate) fn on_entity_removed(&mut self, entity: &Entity) {
        let mut changed = false;
        for pack in &mut self.packs {
            changed |= pack.on_entity_removed(entity);
        }
        if changed {
            self.needs_refresh = true;
        }
    }

    pub(crate) fn on_entity_changed(&mut self, entity: &Entity) {
        let mut changed = false;
        for pack in &mut self.packs {
            changed |= pack.on_entity_changed(entity);
        }
        if changed {
            self.needs_refresh = true;
        }
    }

    pub(crate) fn on_resource_change(
        &mut self,
        resources: &std::collections::HashMap<std::any::TypeId, Rc<dyn std::any::Any>>,
    ) {
        let mut changed = false;
        for pack in &mut self.packs {
            changed |= pack.on_resource_change(resources);
        }
        if changed {
            self.needs_refresh = true;
        }
    }

    pub(crate) fn on_event_flushed(&mut self, kind: std::any::TypeId) {
        if self.packs.iter().any(|pack| pack.reads_event(kind)) {
            self.needs_refresh = true;
        }
    }

    pub(crate) fn on_event_cleared(&mut self, kind: std::any::TypeId) {
        if self.packs.iter().any(|pack| pack.reads_event(kind)) {
            self.needs_refresh = true;
        }
    }
}
