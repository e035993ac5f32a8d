//! Query packs — one per declared system parameter.
//!
//! A pack resolves one [`Query`] into an argument value and tracks whether
//! that argument can currently be supplied. Packs are updated
//! incrementally: the world pushes structural notifications (entity
//! added/removed/changed, resource changed, event flushed/cleared) into
//! every system's packs at fixed pipeline points, and each pack reports
//! whether the notification changed its result. This keeps per-tick work
//! proportional to the number of structural events, not to the number of
//! entities.
//!
//! Entity-query predicates are the exception: they are opaque, so the
//! filtered view is recomputed by a full rescan of the base membership, at
//! most once per execution in which the base changed or the owning system
//! was otherwise invalidated.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

use crate::commands::Commands;
use crate::entity::Entity;
use crate::error::EcsError;
use crate::event::{DirtyMarks, EventChannel};
use crate::query::{EntityFilter, EntityQuery, Query};

/// A resolved argument, cached by the owning system binding between
/// refreshes.
pub(crate) enum ArgValue {
    Entities(Vec<Entity>),
    Resource(Option<Rc<dyn Any>>),
    EventReader(EventChannel),
    EventWriter(EventChannel, DirtyMarks),
    Commands(Commands),
    World,
}

/// Everything a pack needs from the world at construction time.
pub(crate) struct PackContext<'a> {
    pub channels: &'a HashMap<TypeId, EventChannel>,
    pub entities: &'a HashMap<crate::entity::EntityId, Entity>,
    pub resources: &'a HashMap<TypeId, Rc<dyn Any>>,
    pub commands: &'a Commands,
    pub marks: &'a DirtyMarks,
}

pub(crate) enum QueryPack {
    Entities(EntityPack),
    Resource(ResourcePack),
    Reader(ReaderPack),
    Writer(WriterPack),
    Commands(Commands),
    World,
}

impl std::fmt::Debug for QueryPack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Entities(_) => "Entities",
            Self::Resource(_) => "Resource",
            Self::Reader(_) => "Reader",
            Self::Writer(_) => "Writer",
            Self::Commands(_) => "Commands",
            Self::World => "World",
        };
        f.write_str(name)
    }
}

impl QueryPack {
    /// Build a pack for one declared query. This is where a missing event
    /// channel registration surfaces, fatally, before any tick runs.
    pub(crate) fn build(
        query: Query,
        system: &str,
        ctx: &PackContext<'_>,
    ) -> Result<Self, EcsError> {
        match query {
            Query::Entities(q) => Ok(Self::Entities(EntityPack::new(q, ctx.entities))),
            Query::Resource {
                kind, nullable, ..
            } => Ok(Self::Resource(ResourcePack {
                kind,
                nullable,
                value: ctx.resources.get(&kind).cloned(),
            })),
            Query::EventReader { kind, name } => {
                let channel = Self::lookup_channel(kind, name, system, ctx)?;
                Ok(Self::Reader(ReaderPack { channel }))
            }
            Query::EventWriter { kind, name } => {
                let channel = Self::lookup_channel(kind, name, system, ctx)?;
                Ok(Self::Writer(WriterPack {
                    channel,
                    marks: ctx.marks.clone(),
                }))
            }
            Query::Commands => Ok(Self::Commands(ctx.commands.clone())),
            Query::World => Ok(Self::World),
        }
    }

    fn lookup_channel(
        kind: TypeId,
        name: &'static str,
        system: &str,
        ctx: &PackContext<'_>,
    ) -> Result<EventChannel, EcsError> {
        ctx.channels
            .get(&kind)
            .cloned()
            .ok_or_else(|| EcsError::UnregisteredEvent {
                system: system.to_string(),
                event: name,
            })
    }

    /// The resolved argument handed to the system.
    pub(crate) fn value(&self) -> ArgValue {
        match self {
            Self::Entities(pack) => ArgValue::Entities(pack.results().to_vec()),
            Self::Resource(pack) => ArgValue::Resource(pack.value.clone()),
            Self::Reader(pack) => ArgValue::EventReader(pack.channel.clone()),
            Self::Writer(pack) => {
                ArgValue::EventWriter(pack.channel.clone(), pack.marks.clone())
            }
            Self::Commands(commands) => ArgValue::Commands(commands.clone()),
            Self::World => ArgValue::World,
        }
    }

    /// Whether this parameter can currently be supplied.
    pub(crate) fn is_valid(&self) -> bool {
        match self {
            Self::Entities(pack) => !pack.results().is_empty(),
            Self::Resource(pack) => pack.value.is_some() || pack.nullable,
            Self::Reader(pack) => !pack.channel.read_is_empty(),
            Self::Writer(_) | Self::Commands(_) | Self::World => true,
        }
    }

    /// Pre-execution recomputation hook. Only filtered entity packs do any
    /// work here; the result is OR'ed into the owning system's refresh
    /// flag.
    pub(crate) fn update(&mut self) -> bool {
        match self {
            Self::Entities(pack) => pack.update(),
            _ => false,
        }
    }

    /// Called while rebuilding the argument list so a filtered view is
    /// fresh even when the base set did not change this execution.
    pub(crate) fn ensure_fresh(&mut self) {
        if let Self::Entities(pack) = self {
            pack.ensure_fresh();
        }
    }

    /// Clears the once-per-execution rescan marker.
    pub(crate) fn begin_execution(&mut self) {
        if let Self::Entities(pack) = self {
            pack.rescanned = false;
        }
    }

    pub(crate) fn on_entity_added(&mut self, entity: &Entity) -> bool {
        match self {
            Self::Entities(pack) => pack.add(entity),
            _ => false,
        }
    }

    pub(crate) fn on_entity_removed(&mut self, entity: &Entity) -> bool {
        match self {
            Self::Entities(pack) => pack.remove(entity),
            _ => false,
        }
    }

    pub(crate) fn on_entity_changed(&mut self, entity: &Entity) -> bool {
        match self {
            Self::Entities(pack) => pack.toggle(entity),
            _ => false,
        }
    }

    pub(crate) fn on_resource_change(
        &mut self,
        resources: &HashMap<TypeId, Rc<dyn Any>>,
    ) -> bool {
        match self {
            Self::Resource(pack) => pack.refetch(resources),
            _ => false,
        }
    }

    /// Whether this pack reads the given event kind. Only readers force a
    /// refresh on flush/clear; writers are insensitive to buffer state.
    pub(crate) fn reads_event(&self, kind: TypeId) -> bool {
        matches!(self, Self::Reader(pack) if pack.channel.kind() == kind)
    }
}

/// Incrementally maintained entity-set membership.
pub(crate) struct EntityPack {
    required: Vec<TypeId>,
    excluded: Vec<TypeId>,
    filters: Vec<EntityFilter>,
    /// Entities satisfying required/excluded kinds, in notification order.
    base: Vec<Entity>,
    /// Base narrowed by the predicates; unused when there are none.
    filtered: Vec<Entity>,
    /// Base membership changed since the filtered view was last rebuilt.
    base_dirty: bool,
    /// Rescanned during the current execution already.
    rescanned: bool,
}

impl EntityPack {
    fn new(query: EntityQuery, entities: &HashMap<crate::entity::EntityId, Entity>) -> Self {
        let mut pack = Self {
            required: query.required,
            excluded: query.excluded,
            filters: query.filters,
            base: Vec::new(),
            filtered: Vec::new(),
            base_dirty: false,
            rescanned: false,
        };

        // Snapshot entities that already exist at registration time, in id
        // order for determinism.
        let mut existing: Vec<&Entity> = entities.values().collect();
        existing.sort_by_key(|e| e.id());
        for entity in existing {
            if pack.matches(entity) {
                pack.base.push(entity.clone());
            }
        }
        if !pack.filters.is_empty() {
            pack.rescan();
        }
        pack
    }

    /// Membership test: every required kind present, no excluded kind
    /// present. Predicates are handled separately by the filtered view.
    fn matches(&self, entity: &Entity) -> bool {
        self.required.iter().all(|kind| entity.has_kind(*kind))
            && !self.excluded.iter().any(|kind| entity.has_kind(*kind))
    }

    fn results(&self) -> &[Entity] {
        if self.filters.is_empty() {
            &self.base
        } else {
            &self.filtered
        }
    }

    fn position(&self, entity: &Entity) -> Option<usize> {
        self.base.iter().position(|e| e.id() == entity.id())
    }

    fn add(&mut self, entity: &Entity) -> bool {
        if self.matches(entity) {
            self.base.push(entity.clone());
            self.base_dirty = true;
            true
        } else {
            false
        }
    }

    fn remove(&mut self, entity: &Entity) -> bool {
        if let Some(pos) = self.position(entity) {
            self.base.remove(pos);
            self.base_dirty = true;
            true
        } else {
            false
        }
    }

    /// Re-test after a component add/remove and toggle membership.
    fn toggle(&mut self, entity: &Entity) -> bool {
        match self.position(entity) {
            Some(pos) => {
                if self.matches(entity) {
                    // Still a member, but a replaced component may change
                    // what the predicates see.
                    if !self.filters.is_empty() {
                        self.base_dirty = true;
                    }
                    false
                } else {
                    self.base.remove(pos);
                    self.base_dirty = true;
                    true
                }
            }
            None => {
                if self.matches(entity) {
                    self.base.push(entity.clone());
                    self.base_dirty = true;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn update(&mut self) -> bool {
        if self.filters.is_empty() || !self.base_dirty {
            return false;
        }
        self.rescan()
    }

    fn ensure_fresh(&mut self) {
        if !self.filters.is_empty() && !self.rescanned {
            self.rescan();
        }
    }

    /// Full rescan of the base membership through the predicates. Returns
    /// whether the filtered view changed.
    fn rescan(&mut self) -> bool {
        self.base_dirty = false;
        self.rescanned = true;
        let next: Vec<Entity> = self
            .base
            .iter()
            .filter(|entity| self.filters.iter().all(|filter| filter(entity)))
            .cloned()
            .collect();
        let changed = next.len() != self.filtered.len()
            || next
                .iter()
                .zip(&self.filtered)
                .any(|(a, b)| a.id() != b.id());
        self.filtered = next;
        changed
    }
}

/// Reference-identity change detection over one resource kind.
pub(crate) struct ResourcePack {
    kind: TypeId,
    nullable: bool,
    value: Option<Rc<dyn Any>>,
}

impl ResourcePack {
    /// Re-fetch the current cell; reports changed only when the reference
    /// differs. Contents are never compared.
    fn refetch(&mut self, resources: &HashMap<TypeId, Rc<dyn Any>>) -> bool {
        let next = resources.get(&self.kind).cloned();
        let same = match (&self.value, &next) {
            (Some(old), Some(new)) => Rc::ptr_eq(old, new),
            (None, None) => true,
            _ => false,
        };
        self.value = next;
        !same
    }
}

pub(crate) struct ReaderPack {
    channel: EventChannel,
}

pub(crate) struct WriterPack {
    channel: EventChannel,
    marks: DirtyMarks,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Query;

    struct Position;
    struct Velocity;
    struct Frozen;

    fn entity_query(query: Query) -> EntityQuery {
        match query {
            Query::Entities(q) => q,
            other => panic!("unexpected query: {other:?}"),
        }
    }

    fn empty_pack(query: Query) -> EntityPack {
        EntityPack::new(entity_query(query), &HashMap::new())
    }

    fn entity(id: u64) -> Entity {
        Entity::new(id)
    }

    #[test]
    fn test_membership_requires_all_and_excludes_any() {
        let mut pack = empty_pack(
            Query::entities::<(Position, Velocity)>().without::<(Frozen,)>(),
        );

        let matching = entity(1);
        matching.insert(Position);
        matching.insert(Velocity);
        assert!(pack.add(&matching));

        let missing_kind = entity(2);
        missing_kind.insert(Position);
        assert!(!pack.add(&missing_kind));

        let excluded = entity(3);
        excluded.insert(Position);
        excluded.insert(Velocity);
        excluded.insert(Frozen);
        assert!(!pack.add(&excluded));

        assert_eq!(pack.results().len(), 1);
    }

    #[test]
    fn test_any_excluded_kind_blocks_membership() {
        // An entity carrying just one of several excluded kinds is out.
        let mut pack = empty_pack(Query::entities::<(Position,)>().without::<(Frozen, Velocity)>());
        let e = entity(1);
        e.insert(Position);
        e.insert(Velocity);
        assert!(!pack.add(&e));
    }

    #[test]
    fn test_toggle_tracks_component_changes() {
        let mut pack = empty_pack(Query::entities::<(Position,)>().without::<(Frozen,)>());
        let e = entity(1);
        e.insert(Position);
        e.insert(Frozen);

        assert!(!pack.add(&e));

        e.remove_kind(TypeId::of::<Frozen>());
        assert!(pack.toggle(&e));
        assert_eq!(pack.results().len(), 1);

        e.insert(Frozen);
        assert!(pack.toggle(&e));
        assert!(pack.results().is_empty());

        // No membership change, no signal.
        assert!(!pack.toggle(&e));
    }

    #[test]
    fn test_remove_absent_entity_reports_unchanged() {
        let mut pack = empty_pack(Query::entities::<(Position,)>());
        assert!(!pack.remove(&entity(9)));
    }

    #[test]
    fn test_pack_snapshots_existing_entities_in_id_order() {
        let mut entities = HashMap::new();
        for id in [3u64, 1, 2] {
            let e = entity(id);
            e.insert(Position);
            entities.insert(id, e);
        }
        let pack = EntityPack::new(entity_query(Query::entities::<(Position,)>()), &entities);
        let ids: Vec<u64> = pack.results().iter().map(Entity::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_filter_rescan_runs_once_per_base_change() {
        let mut pack = empty_pack(
            Query::entities::<(Position,)>().filtered(|e| e.id() % 2 == 1),
        );

        let odd = entity(1);
        odd.insert(Position);
        let even = entity(2);
        even.insert(Position);
        pack.add(&odd);
        pack.add(&even);

        assert!(pack.update());
        assert_eq!(pack.results().len(), 1);
        assert_eq!(pack.results()[0].id(), 1);

        // Base unchanged: no further rescan work.
        pack.rescanned = false;
        assert!(!pack.update());
    }

    #[test]
    fn test_resource_pack_compares_reference_not_contents() {
        let kind = TypeId::of::<Position>();
        let mut pack = ResourcePack {
            kind,
            nullable: false,
            value: None,
        };

        let mut resources: HashMap<TypeId, Rc<dyn Any>> = HashMap::new();
        let cell: Rc<dyn Any> = Rc::new(std::cell::RefCell::new(Position));
        resources.insert(kind, Rc::clone(&cell));

        assert!(pack.refetch(&resources));
        // Same cell again: unchanged.
        assert!(!pack.refetch(&resources));

        // A fresh cell with identical contents still counts as changed.
        resources.insert(kind, Rc::new(std::cell::RefCell::new(Position)));
        assert!(pack.refetch(&resources));

        resources.remove(&kind);
        assert!(pack.refetch(&resources));
        assert!(pack.value.is_none());
    }

    #[test]
    fn test_unregistered_event_fails_pack_construction() {
        struct Boom;
        let channels = HashMap::new();
        let entities = HashMap::new();
        let resources = HashMap::new();
        let commands = Commands::default();
        let marks = DirtyMarks::default();
        let ctx = PackContext {
            channels: &channels,
            entities: &entities,
            resources: &resources,
            commands: &commands,
            marks: &marks,
        };

        let err = QueryPack::build(Query::reader::<Boom>(), "reactor", &ctx).unwrap_err();
        match err {
            EcsError::UnregisteredEvent { system, event } => {
                assert_eq!(system, "reactor");
                assert!(event.contains("Boom"));
            }
        }
    }
}
