//! Scene lifecycle: deferred admission and removal, two-pass activation,
//! collider registration and hard dependencies.

use std::cell::RefCell;
use std::rc::Rc;

use jumpgun_engine::prelude::*;

type Log = Rc<RefCell<Vec<String>>>;

fn services() -> Services {
    Services::headless(ScriptedInput::new(), RecordingAudio::new())
}

/// Marks itself ready in `awake`.
struct Beacon {
    ready: bool,
}

impl Component for Beacon {
    fn awake(&mut self, _ctx: &mut FrameContext<'_>) {
        self.ready = true;
    }
}

/// Looks for another entity's beacon in `start`.
struct Seeker {
    target: &'static str,
    log: Log,
}

impl Component for Seeker {
    fn start(&mut self, ctx: &mut FrameContext<'_>) {
        let seen = ctx
            .find_by_tag(self.target)
            .and_then(|e| e.get::<Beacon>())
            .map(|b| b.ready);
        self.log.borrow_mut().push(format!("{seen:?}"));
    }
}

/// Spawns a child and destroys itself on its first update.
struct Splitter;

impl Component for Splitter {
    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        let pos = ctx.position();
        ctx.instantiate(EntityBuilder::new("child").at(pos));
        ctx.destroy_self();
        // Second request in the same frame is ignored.
        ctx.destroy_self();
    }
}

#[test]
fn start_sees_siblings_prepared_in_awake_of_a_later_entity() {
    let log: Log = Rc::default();
    let mut scene = Scene::new();
    let mut svc = services();
    // Seeker is created first, so its start would miss the beacon if
    // activation were a single pass.
    scene.create(EntityBuilder::new("seeker").with(Seeker {
        target: "beacon",
        log: Rc::clone(&log),
    }));
    scene.create(EntityBuilder::new("beacon").with(Beacon { ready: false }));
    scene.cleanup(&mut svc);
    assert_eq!(*log.borrow(), vec!["Some(true)"]);
}

#[test]
fn entities_created_during_update_wait_for_the_boundary() {
    let mut scene = Scene::new();
    let mut svc = services();
    let parent = scene.create(EntityBuilder::new("parent").with(Splitter));
    scene.cleanup(&mut svc);

    scene.update(0.016, UpdateScope::All, &mut svc);
    assert_eq!(scene.count_tag("child"), 0);
    assert!(scene.is_live(parent));
    assert!(scene.is_pending_destroy(parent));

    let report = scene.cleanup(&mut svc);
    assert_eq!(report.admitted.len(), 1);
    assert_eq!(report.destroyed, vec![parent]);
    assert_eq!(scene.count_tag("child"), 1);
    assert!(!scene.is_live(parent));
}

#[test]
fn create_then_destroy_before_boundary_never_goes_live() {
    let mut scene = Scene::new();
    let mut svc = services();
    let id = scene.create(EntityBuilder::new("ghost"));
    scene.destroy(id).unwrap();
    let report = scene.cleanup(&mut svc);
    // Admission runs before removal, so the entity exists for an instant
    // and leaves in the same cleanup.
    assert_eq!(report.admitted, vec![id]);
    assert_eq!(report.destroyed, vec![id]);
    assert!(!scene.is_live(id));
    assert_eq!(scene.live_count(), 0);
}

#[test]
fn colliders_register_at_admission_and_leave_at_removal() {
    let mut scene = Scene::new();
    let mut svc = services();
    let solid = scene.create(
        EntityBuilder::new("platform")
            .with(SpriteRenderer::new("platform_grass"))
            .with(Collider::new()),
    );
    let decor = scene.create(EntityBuilder::new("decor").with(SpriteRenderer::new("portal")));
    assert!(scene.collider_ids().is_empty());

    scene.cleanup(&mut svc);
    assert_eq!(scene.collider_ids(), &[solid]);
    assert!(scene.is_live(decor));

    scene.destroy(solid).unwrap();
    assert_eq!(scene.collider_ids(), &[solid], "removal waits for cleanup");
    scene.cleanup(&mut svc);
    assert!(scene.collider_ids().is_empty());
}

#[test]
fn collider_without_sprite_is_rejected() {
    let mut scene = Scene::new();
    let mut svc = services();
    let id = scene.create(EntityBuilder::new("broken").with(Collider::new()));
    let report = scene.cleanup(&mut svc);
    assert!(report.admitted.is_empty());
    match &report.rejected[..] {
        [(rejected, EcsError::MissingComponent { component, .. })] => {
            assert_eq!(*rejected, id);
            assert_eq!(component, "SpriteRenderer");
        }
        other => panic!("unexpected rejection report: {other:?}"),
    }
    assert!(scene.collider_ids().is_empty());
    assert!(matches!(scene.destroy(id), Err(EcsError::StaleEntity { .. })));
}

#[test]
fn sprite_gives_the_entity_its_extent() {
    let mut scene = Scene::new();
    let mut svc = services();
    let id = scene.create(
        EntityBuilder::new("player")
            .at(Vec2::new(100.0, 100.0))
            .with(SpriteRenderer::new("player1")),
    );
    scene.cleanup(&mut svc);
    let entity = scene.entity(id).unwrap();
    assert_eq!(entity.extent(), Some(Vec2::new(34.0, 48.0)));
    assert_eq!(
        entity.bounding_box(),
        Some(Rect::new(83.0, 76.0, 34.0, 48.0))
    );
}

#[test]
fn draw_puts_ui_over_world() {
    let mut scene = Scene::new();
    let mut svc = services();
    scene.create(Button::spawn(ButtonKind::Start));
    scene.create(EntityBuilder::new("ground").with(SpriteRenderer::new("ground_grass")));
    scene.cleanup(&mut svc);

    let mut surface = RecordingSurface::new();
    scene.draw(&mut surface);
    let order: Vec<&str> = surface.calls.iter().map(|c| c.sprite.as_str()).collect();
    assert_eq!(order, vec!["ground_grass", "button_start"]);
}

#[test]
fn ids_are_recycled_with_a_new_generation() {
    let mut scene = Scene::new();
    let mut svc = services();
    let first = scene.create(EntityBuilder::new("a"));
    scene.cleanup(&mut svc);
    scene.destroy(first).unwrap();
    scene.cleanup(&mut svc);

    let second = scene.create(EntityBuilder::new("b"));
    assert_eq!(second.index(), first.index());
    assert_ne!(second.generation(), first.generation());
    assert!(matches!(scene.destroy(first), Err(EcsError::StaleEntity { .. })));
}
