//! Scene graph and entity lifecycle.
//!
//! The [`Scene`] owns every entity, the live update order, the collider list
//! and the event bus. Mutation of those lists happens in exactly one place,
//! [`Scene::cleanup`], which runs once per frame after updates and collision:
//!
//! 1. Queued entities are validated. An entity whose components name a hard
//!    dependency it does not have is rejected with
//!    [`EcsError::MissingComponent`] and never becomes visible.
//! 2. Accepted entities join the live list in creation order, then `awake`
//!    runs on all of them, then `start` runs on all of them.
//! 3. Accepted entities with a collider component join the collider list.
//! 4. Queued destructions run `on_destroy` and are removed from every list.
//!
//! Between cleanups, [`Scene::create`] and [`Scene::destroy`] only queue.
//! A destroyed entity keeps updating and colliding until the boundary.
//!
//! Components see the world through a [`FrameContext`]. While a component
//! runs, it is checked out of its entity, so it can borrow its siblings
//! mutably and read every other entity at the same time.

use std::collections::HashMap;

use tracing::{debug, error, warn};

use jumpgun_ecs::command::CommandBuffer;
use jumpgun_ecs::component::{ComponentKind, ComponentObject, ComponentSet};
use jumpgun_ecs::entity::{EntityAllocator, EntityId};
use jumpgun_ecs::event::{Inbox, SubscriptionId};
use jumpgun_ecs::geometry::{Rect, Vec2};
use jumpgun_ecs::EcsError;

use crate::event::{EventKind, GameBus, GameEvent};
use crate::services::{RenderSurface, Services};

// ---------------------------------------------------------------------------
// Component
// ---------------------------------------------------------------------------

/// A unit of behaviour attached to one entity.
///
/// All hooks have empty defaults. Siblings are looked up by type through the
/// context, never by index.
pub trait Component: ComponentObject {
    /// Sibling kinds this component cannot work without. Checked when the
    /// entity is admitted.
    fn requires(&self) -> Vec<ComponentKind> {
        Vec::new()
    }

    /// Whether the owning entity takes part in collision checks.
    fn is_collider(&self) -> bool {
        false
    }

    fn awake(&mut self, _ctx: &mut FrameContext<'_>) {}

    fn start(&mut self, _ctx: &mut FrameContext<'_>) {}

    fn update(&mut self, _ctx: &mut FrameContext<'_>) {}

    fn draw(&self, _entity: &Entity, _surface: &mut dyn RenderSurface) {}

    /// Runs at the cleanup boundary that removes the entity. Release bus
    /// subscriptions here.
    fn on_destroy(&mut self, _ctx: &mut FrameContext<'_>) {}
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    World,
    Ui,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transform {
    pub position: Vec2,
}

impl Transform {
    pub fn translate(&mut self, by: Vec2) {
        self.position += by;
    }
}

pub struct Entity {
    id: EntityId,
    tag: String,
    layer: Layer,
    pub transform: Transform,
    extent: Option<Vec2>,
    components: ComponentSet<dyn Component>,
    build_errors: Vec<EcsError>,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn position(&self) -> Vec2 {
        self.transform.position
    }

    /// Visual size, known once a sprite has been resolved.
    pub fn extent(&self) -> Option<Vec2> {
        self.extent
    }

    pub fn set_extent(&mut self, extent: Vec2) {
        self.extent = Some(extent);
    }

    /// Box centred on the position with the visual size.
    pub fn bounding_box(&self) -> Option<Rect> {
        self.extent
            .map(|size| Rect::from_center(self.transform.position, size))
    }

    pub fn get<T: Component>(&self) -> Option<&T> {
        self.components.get::<T>()
    }

    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.components.get_mut::<T>()
    }

    pub fn has<T: Component>(&self) -> bool {
        self.components.has::<T>()
    }

    pub fn components(&self) -> &ComponentSet<dyn Component> {
        &self.components
    }

    fn is_collider(&self) -> bool {
        self.components.iter().any(|c| c.is_collider())
    }

    /// First reason this entity cannot be admitted, if any.
    fn admission_error(&self) -> Option<EcsError> {
        if let Some(e) = self.build_errors.first() {
            return Some(e.clone());
        }
        self.components.iter().find_map(|c| {
            self.components
                .first_missing(&c.requires())
                .map(|kind| EcsError::MissingComponent {
                    entity: self.id,
                    component: kind.name().to_owned(),
                })
        })
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("tag", &self.tag)
            .field("layer", &self.layer)
            .field("position", &self.transform.position)
            .field("components", &self.components)
            .finish()
    }
}

/// Assembles an entity before it is handed to [`Scene::create`].
pub struct EntityBuilder {
    tag: String,
    layer: Layer,
    position: Vec2,
    components: ComponentSet<dyn Component>,
    errors: Vec<EcsError>,
}

impl EntityBuilder {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            layer: Layer::World,
            position: Vec2::ZERO,
            components: ComponentSet::new(),
            errors: Vec::new(),
        }
    }

    pub fn at(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn layer(mut self, layer: Layer) -> Self {
        self.layer = layer;
        self
    }

    /// Attach a component. A duplicate kind is remembered and rejects the
    /// entity at admission.
    pub fn with<C: Component>(mut self, component: C) -> Self {
        if let Err(e) = self.components.insert(Box::new(component)) {
            self.errors.push(e);
        }
        self
    }

    fn build(self, id: EntityId) -> Entity {
        Entity {
            id,
            tag: self.tag,
            layer: self.layer,
            transform: Transform {
                position: self.position,
            },
            extent: None,
            components: self.components,
            build_errors: self.errors,
        }
    }
}

// ---------------------------------------------------------------------------
// CleanupReport / UpdateScope
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
pub struct CleanupReport {
    pub admitted: Vec<EntityId>,
    pub rejected: Vec<(EntityId, EcsError)>,
    pub destroyed: Vec<EntityId>,
}

impl CleanupReport {
    pub fn is_empty(&self) -> bool {
        self.admitted.is_empty() && self.rejected.is_empty() && self.destroyed.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateScope {
    All,
    /// Only `Layer::Ui` entities update (the game is paused).
    UiOnly,
}

// ---------------------------------------------------------------------------
// Scene
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct Scene {
    entities: HashMap<EntityId, Entity>,
    live: Vec<EntityId>,
    colliders: Vec<EntityId>,
    allocator: EntityAllocator,
    commands: CommandBuffer<Entity>,
    bus: GameBus,
}

#[derive(Clone, Copy)]
enum Hook {
    Awake,
    Start,
    Update,
    Destroy,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an entity for admission at the next cleanup boundary.
    ///
    /// The id is valid immediately (it can be destroyed or remembered), but
    /// the entity is not visible to updates, lookups or collision yet.
    pub fn create(&mut self, builder: EntityBuilder) -> EntityId {
        queue_create(&mut self.allocator, &mut self.commands, builder)
    }

    /// Queue an entity for removal at the next cleanup boundary.
    pub fn destroy(&mut self, id: EntityId) -> Result<(), EcsError> {
        queue_destroy(&self.entities, &mut self.commands, id)
    }

    /// Queue every live or pending entity matching `pred` for removal.
    pub fn destroy_where<F: Fn(&Entity) -> bool>(&mut self, pred: F) -> usize {
        let doomed: Vec<EntityId> = self
            .live
            .iter()
            .filter_map(|id| self.entities.get(id))
            .filter(|e| pred(e))
            .map(Entity::id)
            .collect();
        let mut queued = 0;
        for id in doomed {
            if !self.commands.is_pending_despawn(id) && self.commands.despawn(id) {
                queued += 1;
            }
        }
        queued
    }

    /// Apply queued admissions, then queued removals.
    pub fn cleanup(&mut self, services: &mut Services) -> CleanupReport {
        let batch = self.commands.drain();
        let mut report = CleanupReport::default();

        // -- admission --------------------------------------------------------
        for (id, entity) in batch.spawns {
            if let Some(err) = entity.admission_error() {
                error!(entity = %id, tag = entity.tag(), error = %err, "entity rejected at admission");
                self.allocator.release(id);
                report.rejected.push((id, err));
                continue;
            }
            self.entities.insert(id, entity);
            self.live.push(id);
            report.admitted.push(id);
        }
        for id in report.admitted.clone() {
            self.run_hook(id, Hook::Awake, 0.0, services);
        }
        for id in report.admitted.clone() {
            self.run_hook(id, Hook::Start, 0.0, services);
        }
        for id in &report.admitted {
            if self.entities.get(id).is_some_and(Entity::is_collider) {
                self.colliders.push(*id);
            }
        }

        // -- removal ----------------------------------------------------------
        for id in batch.despawns {
            if !self.entities.contains_key(&id) {
                // Rejected at admission above; its id is already released.
                continue;
            }
            self.run_hook(id, Hook::Destroy, 0.0, services);
            self.entities.remove(&id);
            self.live.retain(|e| *e != id);
            self.colliders.retain(|e| *e != id);
            self.allocator.release(id);
            report.destroyed.push(id);
        }

        if !report.is_empty() {
            debug!(
                admitted = report.admitted.len(),
                rejected = report.rejected.len(),
                destroyed = report.destroyed.len(),
                live = self.live.len(),
                "cleanup"
            );
        }
        report
    }

    /// Run `update` on every live entity in admission order.
    pub fn update(&mut self, dt: f32, scope: UpdateScope, services: &mut Services) {
        let order = self.live.clone();
        for id in order {
            let in_scope = match scope {
                UpdateScope::All => true,
                UpdateScope::UiOnly => self.entities.get(&id).is_some_and(|e| e.layer == Layer::Ui),
            };
            if in_scope {
                self.run_hook(id, Hook::Update, dt, services);
            }
        }
    }

    /// Draw world entities, then UI entities, each in admission order.
    pub fn draw(&self, surface: &mut dyn RenderSurface) {
        for layer in [Layer::World, Layer::Ui] {
            for entity in self.live_entities().filter(|e| e.layer == layer) {
                for component in entity.components.iter() {
                    component.draw(entity, surface);
                }
            }
        }
    }

    fn run_hook(&mut self, id: EntityId, hook: Hook, dt: f32, services: &mut Services) {
        let Some(mut entity) = self.entities.remove(&id) else {
            return;
        };
        for index in 0..entity.components.len() {
            let Some(mut component) = entity.components.checkout(index) else {
                continue;
            };
            let mut ctx = FrameContext {
                dt,
                entity: &mut entity,
                entities: &self.entities,
                live: &self.live,
                colliders: &self.colliders,
                allocator: &mut self.allocator,
                commands: &mut self.commands,
                bus: &mut self.bus,
                services: &mut *services,
            };
            match hook {
                Hook::Awake => component.awake(&mut ctx),
                Hook::Start => component.start(&mut ctx),
                Hook::Update => component.update(&mut ctx),
                Hook::Destroy => component.on_destroy(&mut ctx),
            }
            entity.components.restore(index, component);
        }
        self.entities.insert(id, entity);
    }

    // -- queries --------------------------------------------------------------

    pub fn is_live(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn is_pending(&self, id: EntityId) -> bool {
        self.commands.is_pending_spawn(id)
    }

    pub fn is_pending_destroy(&self, id: EntityId) -> bool {
        self.commands.is_pending_despawn(id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn component<T: Component>(&self, id: EntityId) -> Option<&T> {
        self.entities.get(&id).and_then(|e| e.get::<T>())
    }

    pub fn live_ids(&self) -> &[EntityId] {
        &self.live
    }

    pub fn collider_ids(&self) -> &[EntityId] {
        &self.colliders
    }

    pub fn live_entities(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.live.iter().filter_map(|id| self.entities.get(id))
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<&Entity> {
        self.live_entities().find(|e| e.tag == tag)
    }

    pub fn count_tag(&self, tag: &str) -> usize {
        self.live_entities().filter(|e| e.tag == tag).count()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn pending_count(&self) -> usize {
        self.commands.pending_spawns()
    }

    // -- events ---------------------------------------------------------------

    pub fn publish(&mut self, event: &GameEvent) -> usize {
        self.bus.publish(event)
    }

    pub fn bus(&self) -> &GameBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut GameBus {
        &mut self.bus
    }
}

fn queue_create(
    allocator: &mut EntityAllocator,
    commands: &mut CommandBuffer<Entity>,
    builder: EntityBuilder,
) -> EntityId {
    let id = allocator.allocate();
    let entity = builder.build(id);
    debug!(entity = %id, tag = entity.tag(), "entity queued for admission");
    commands.spawn(id, entity);
    id
}

fn queue_destroy(
    entities: &HashMap<EntityId, Entity>,
    commands: &mut CommandBuffer<Entity>,
    id: EntityId,
) -> Result<(), EcsError> {
    if entities.contains_key(&id) || commands.is_pending_spawn(id) {
        commands.despawn(id);
        Ok(())
    } else {
        warn!(entity = %id, "destroy of unknown entity");
        Err(EcsError::StaleEntity { entity: id })
    }
}

// ---------------------------------------------------------------------------
// FrameContext
// ---------------------------------------------------------------------------

/// What a component can see and do while one of its hooks runs.
pub struct FrameContext<'a> {
    dt: f32,
    entity: &'a mut Entity,
    entities: &'a HashMap<EntityId, Entity>,
    live: &'a [EntityId],
    colliders: &'a [EntityId],
    allocator: &'a mut EntityAllocator,
    commands: &'a mut CommandBuffer<Entity>,
    bus: &'a mut GameBus,
    services: &'a mut Services,
}

impl<'a> FrameContext<'a> {
    /// Seconds since the previous frame. Zero during awake/start/destroy.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    // -- own entity -----------------------------------------------------------

    pub fn id(&self) -> EntityId {
        self.entity.id
    }

    pub fn tag(&self) -> &str {
        &self.entity.tag
    }

    pub fn position(&self) -> Vec2 {
        self.entity.transform.position
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.entity.transform.position = position;
    }

    pub fn translate(&mut self, by: Vec2) {
        self.entity.transform.translate(by);
    }

    pub fn extent(&self) -> Option<Vec2> {
        self.entity.extent
    }

    pub fn set_extent(&mut self, extent: Vec2) {
        self.entity.set_extent(extent);
    }

    pub fn bounding_box(&self) -> Option<Rect> {
        self.entity.bounding_box()
    }

    /// A sibling component, or `None` if the entity lacks that capability.
    pub fn sibling<T: Component>(&self) -> Option<&T> {
        self.entity.components.get::<T>()
    }

    pub fn sibling_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.entity.components.get_mut::<T>()
    }

    /// A sibling the caller cannot work without.
    pub fn require<T: Component>(&self) -> Result<&T, EcsError> {
        self.entity.components.require::<T>(self.entity.id)
    }

    pub fn require_mut<T: Component>(&mut self) -> Result<&mut T, EcsError> {
        let owner = self.entity.id;
        self.entity.components.require_mut::<T>(owner)
    }

    // -- the rest of the scene ------------------------------------------------

    /// Another live entity. The running entity is not visible through this.
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<&Entity> {
        self.others().find(|e| e.tag == tag)
    }

    pub fn others(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.live.iter().filter_map(|id| self.entities.get(id))
    }

    /// Live collidable entities other than the running one.
    pub fn colliders(&self) -> impl Iterator<Item = &Entity> + '_ {
        self.colliders.iter().filter_map(|id| self.entities.get(id))
    }

    // -- lifecycle --------------------------------------------------------------

    pub fn instantiate(&mut self, builder: EntityBuilder) -> EntityId {
        queue_create(self.allocator, self.commands, builder)
    }

    pub fn destroy(&mut self, id: EntityId) -> Result<(), EcsError> {
        if id == self.entity.id {
            self.destroy_self();
            return Ok(());
        }
        queue_destroy(self.entities, self.commands, id)
    }

    pub fn destroy_self(&mut self) {
        let id = self.entity.id;
        if !self.commands.is_pending_despawn(id) {
            self.commands.despawn(id);
        }
    }

    pub fn is_being_destroyed(&self) -> bool {
        self.commands.is_pending_despawn(self.entity.id)
    }

    // -- events -----------------------------------------------------------------

    pub fn publish(&mut self, event: &GameEvent) -> usize {
        self.bus.publish(event)
    }

    pub fn forward<T, F>(&mut self, kind: EventKind, inbox: &Inbox<T>, map: F) -> SubscriptionId
    where
        T: 'static,
        F: Fn(&GameEvent) -> Option<T> + 'static,
    {
        self.bus.forward(kind, inbox, map)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    // -- services ---------------------------------------------------------------

    pub fn services(&mut self) -> &mut Services {
        &mut *self.services
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{RecordingAudio, ScriptedInput};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    struct Probe {
        name: &'static str,
        log: Log,
    }

    impl Component for Probe {
        fn awake(&mut self, _ctx: &mut FrameContext<'_>) {
            self.log.borrow_mut().push(format!("awake:{}", self.name));
        }
        fn start(&mut self, _ctx: &mut FrameContext<'_>) {
            self.log.borrow_mut().push(format!("start:{}", self.name));
        }
        fn update(&mut self, _ctx: &mut FrameContext<'_>) {
            self.log.borrow_mut().push(format!("update:{}", self.name));
        }
        fn on_destroy(&mut self, _ctx: &mut FrameContext<'_>) {
            self.log.borrow_mut().push(format!("destroy:{}", self.name));
        }
    }

    struct Needy;
    impl Component for Needy {
        fn requires(&self) -> Vec<ComponentKind> {
            vec![ComponentKind::of::<Probe>()]
        }
    }

    fn services() -> Services {
        Services::headless(ScriptedInput::new(), RecordingAudio::new())
    }

    fn probe(name: &'static str, log: &Log) -> EntityBuilder {
        EntityBuilder::new(name).with(Probe {
            name,
            log: Rc::clone(log),
        })
    }

    #[test]
    fn all_awakes_run_before_any_start() {
        let log: Log = Rc::default();
        let mut scene = Scene::new();
        let mut svc = services();
        scene.create(probe("a", &log));
        scene.create(probe("b", &log));
        scene.cleanup(&mut svc);
        assert_eq!(
            *log.borrow(),
            vec!["awake:a", "awake:b", "start:a", "start:b"]
        );
    }

    #[test]
    fn pending_entity_is_not_updated() {
        let log: Log = Rc::default();
        let mut scene = Scene::new();
        let mut svc = services();
        let id = scene.create(probe("a", &log));
        scene.update(0.016, UpdateScope::All, &mut svc);
        assert!(log.borrow().is_empty());
        assert!(!scene.is_live(id));
        assert!(scene.is_pending(id));
    }

    #[test]
    fn destroyed_entity_updates_until_cleanup() {
        let log: Log = Rc::default();
        let mut scene = Scene::new();
        let mut svc = services();
        let id = scene.create(probe("a", &log));
        scene.cleanup(&mut svc);
        log.borrow_mut().clear();

        scene.destroy(id).unwrap();
        scene.update(0.016, UpdateScope::All, &mut svc);
        assert_eq!(*log.borrow(), vec!["update:a"]);
        let report = scene.cleanup(&mut svc);
        assert_eq!(report.destroyed, vec![id]);
        assert_eq!(log.borrow().last().map(String::as_str), Some("destroy:a"));
        assert!(!scene.is_live(id));
    }

    #[test]
    fn missing_dependency_rejects_entity() {
        let mut scene = Scene::new();
        let mut svc = services();
        let id = scene.create(EntityBuilder::new("broken").with(Needy));
        let report = scene.cleanup(&mut svc);
        assert!(report.admitted.is_empty());
        assert_eq!(report.rejected.len(), 1);
        assert!(matches!(
            &report.rejected[0].1,
            EcsError::MissingComponent { component, .. } if component == "Probe"
        ));
        assert!(!scene.is_live(id));
        assert_eq!(scene.live_count(), 0);
    }

    #[test]
    fn duplicate_component_rejects_entity() {
        let log: Log = Rc::default();
        let mut scene = Scene::new();
        let mut svc = services();
        let builder = probe("a", &log).with(Probe {
            name: "again",
            log: Rc::clone(&log),
        });
        scene.create(builder);
        let report = scene.cleanup(&mut svc);
        assert!(matches!(
            report.rejected[0].1,
            EcsError::DuplicateComponent { .. }
        ));
    }

    #[test]
    fn destroying_unknown_id_is_stale() {
        let mut scene = Scene::new();
        let err = scene.destroy(EntityId::new(42, 0)).unwrap_err();
        assert!(matches!(err, EcsError::StaleEntity { .. }));
    }

    #[test]
    fn ui_only_scope_skips_world_entities() {
        let log: Log = Rc::default();
        let mut scene = Scene::new();
        let mut svc = services();
        scene.create(probe("world", &log));
        scene.create(probe("menu", &log).layer(Layer::Ui));
        scene.cleanup(&mut svc);
        log.borrow_mut().clear();
        scene.update(0.016, UpdateScope::UiOnly, &mut svc);
        assert_eq!(*log.borrow(), vec!["update:menu"]);
    }
}
