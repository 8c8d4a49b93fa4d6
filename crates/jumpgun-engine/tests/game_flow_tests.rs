//! End-to-end flow through `Game::frame`: menus, a level, pausing, death,
//! and level progression, all with scripted input.

use std::time::Duration;

use jumpgun_engine::prelude::*;

const DT: f32 = 1.0 / 60.0;

// -- Harness ------------------------------------------------------------------

struct Harness {
    game: Game,
    input: ScriptedInput,
    audio: RecordingAudio,
    surface: RecordingSurface,
    ready: Vec<u32>,
    failures: Vec<LevelError>,
}

impl Harness {
    fn with_config(config: GameConfig) -> Self {
        let input = ScriptedInput::new();
        let audio = RecordingAudio::new();
        let services = Services::headless(input.clone(), audio.clone());
        Self {
            game: Game::new(config, services).unwrap(),
            input,
            audio,
            surface: RecordingSurface::new(),
            ready: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn new() -> Self {
        Self::with_config(inline_config())
    }

    fn run(&mut self, frames: usize) {
        for _ in 0..frames {
            self.surface.clear();
            let report = self.game.frame(DT, &mut self.surface).unwrap();
            self.ready.extend(report.level_ready);
            self.failures.extend(report.level_error);
        }
    }

    fn click(&mut self, kind: ButtonKind) {
        self.input.move_mouse(kind.slot() + Vec2::new(20.0, 20.0));
        self.input.set_mouse_button(MouseButtonState::Pressed);
        self.run(1);
        self.input.set_mouse_button(MouseButtonState::Released);
        self.run(2);
    }

    fn tap(&mut self, key: Key) {
        self.input.press(key);
        self.run(1);
        self.input.release(key);
        self.run(1);
    }

    /// Main menu to level 1 with the given character.
    fn enter_level(&mut self, pick: ButtonKind) {
        self.run(1);
        self.click(ButtonKind::Start);
        self.click(pick);
        self.run(2);
    }

    fn scene(&self) -> &Scene {
        &self.game.core().scene
    }

    fn ids_tagged(&self, tag: &str) -> Vec<EntityId> {
        self.scene()
            .live_entities()
            .filter(|e| e.tag() == tag)
            .map(Entity::id)
            .collect()
    }

    fn publish(&mut self, event: GameEvent) {
        self.game.core_mut().scene.publish(&event);
    }
}

fn inline_config() -> GameConfig {
    let mut config = GameConfig::default();
    config.level.background_generation = false;
    config
}

// -- Menus --------------------------------------------------------------------

#[test]
fn main_menu_shows_its_four_buttons() {
    let mut h = Harness::new();
    h.run(1);
    assert_eq!(h.game.mode(), GameMode::MainMenu);
    assert_eq!(h.scene().count_tag("button"), 4);
    assert_eq!(h.surface.calls.len(), 4);
}

#[test]
fn hovering_plays_the_sound_once() {
    let mut h = Harness::new();
    h.run(1);
    h.input.move_mouse(ButtonKind::Settings.slot() + Vec2::new(20.0, 20.0));
    h.run(10);
    assert_eq!(h.audio.count("button_hover"), 1);
    assert_eq!(h.game.mode(), GameMode::MainMenu);
}

#[test]
fn held_mouse_does_not_click_a_button_that_appears_under_it() {
    let mut h = Harness::new();
    h.run(1);
    // Start and Character1 overlap; keep the mouse pressed through the switch.
    h.input.move_mouse(ButtonKind::Start.slot() + Vec2::new(20.0, 20.0));
    h.input.set_mouse_button(MouseButtonState::Pressed);
    h.run(10);
    assert_eq!(h.game.mode(), GameMode::CharacterSelection);
    assert_eq!(h.audio.count("button_click"), 1);
}

#[test]
fn settings_menus_navigate_and_toggle_audio() {
    let mut h = Harness::new();
    h.run(1);
    h.click(ButtonKind::Settings);
    assert_eq!(h.game.mode(), GameMode::Settings);
    assert_eq!(h.scene().count_tag("button"), 3);

    h.click(ButtonKind::Audio);
    assert_eq!(h.game.mode(), GameMode::Audio);
    h.click(ButtonKind::Sfx);
    assert_eq!(h.game.mode(), GameMode::Audio);
    assert!(!h.game.core().services.sfx_enabled());
    assert!(h.game.core().services.music_enabled());

    h.click(ButtonKind::Back);
    assert_eq!(h.game.mode(), GameMode::Settings);
    h.click(ButtonKind::Back);
    assert_eq!(h.game.mode(), GameMode::MainMenu);
    assert_eq!(h.scene().count_tag("button"), 4);
}

#[test]
fn quit_button_requests_exit_and_stays() {
    let mut h = Harness::new();
    h.run(1);
    assert!(!h.game.quit_requested());
    h.click(ButtonKind::Quit);
    assert!(h.game.quit_requested());
    assert_eq!(h.game.mode(), GameMode::MainMenu);
}

// -- Gameplay -----------------------------------------------------------------

#[test]
fn picking_a_character_starts_level_one() {
    let mut h = Harness::new();
    h.enter_level(ButtonKind::Character2);

    assert_eq!(h.game.mode(), GameMode::Gameplay);
    assert_eq!(h.ready, vec![1]);
    assert!(h.failures.is_empty());
    let core = h.game.core();
    assert_eq!(core.character(), Some(Character::Ranger));
    assert!(core.session_active());
    assert_eq!(h.scene().count_tag("button"), 0);
    assert_eq!(h.scene().count_tag("player"), 1);
    assert_eq!(h.scene().count_tag("ground"), 1);
    assert_eq!(h.scene().count_tag("platform"), 4);
    assert_eq!(h.scene().count_tag("enemy"), 2);
    assert_eq!(core.level.remaining_enemies(), 2);
    assert_eq!(h.surface.count("player2"), 1);
}

#[test]
fn start_portal_closes_once_the_player_is_through() {
    let mut h = Harness::new();
    h.enter_level(ButtonKind::Character1);
    assert_eq!(h.scene().count_tag("portal"), 1);
    h.run(60);
    assert_eq!(h.scene().count_tag("portal"), 0);
    assert_eq!(h.game.core().level.level(), 1);
}

#[test]
fn pause_freezes_the_world_and_resume_thaws_it() {
    let mut h = Harness::new();
    h.enter_level(ButtonKind::Character1);
    h.run(5);

    h.tap(Key::Escape);
    assert_eq!(h.game.mode(), GameMode::Paused);
    assert_eq!(h.scene().count_tag("button"), 2);

    let snapshot = |h: &Harness| -> Vec<(EntityId, Vec2)> {
        h.scene()
            .live_entities()
            .filter(|e| e.layer() == Layer::World)
            .map(|e| (e.id(), e.position()))
            .collect()
    };
    let before = snapshot(&h);
    h.input.press(Key::D);
    h.run(30);
    h.input.release(Key::D);
    h.run(1);
    assert_eq!(snapshot(&h), before, "world moved while paused");

    h.tap(Key::Escape);
    assert_eq!(h.game.mode(), GameMode::Gameplay);
    assert_eq!(h.scene().count_tag("button"), 0);
}

#[test]
fn resume_button_returns_to_the_same_level() {
    let mut h = Harness::new();
    h.enter_level(ButtonKind::Character1);
    h.tap(Key::Escape);
    h.click(ButtonKind::Resume);
    assert_eq!(h.game.mode(), GameMode::Gameplay);
    assert_eq!(h.ready, vec![1], "resuming must not restart the level");
    assert_eq!(h.scene().count_tag("player"), 1);
}

#[test]
fn quit_to_main_tears_the_session_down() {
    let mut h = Harness::new();
    h.enter_level(ButtonKind::Character1);
    h.tap(Key::Escape);
    h.click(ButtonKind::QuitToMain);

    assert_eq!(h.game.mode(), GameMode::MainMenu);
    let core = h.game.core();
    assert!(!core.session_active());
    assert_eq!(core.player(), None);
    assert_eq!(h.scene().live_count(), 4, "only the menu buttons remain");

    // A fresh session starts over at level 1.
    h.click(ButtonKind::Start);
    h.click(ButtonKind::Character1);
    h.run(1);
    assert_eq!(h.ready, vec![1, 1]);
    assert_eq!(h.scene().count_tag("player"), 1);
}

#[test]
fn player_death_records_a_highscore() {
    let mut h = Harness::new();
    h.enter_level(ButtonKind::Character1);
    h.publish(GameEvent::EnemyAttack {
        enemy: EntityId::new(0, 0),
        damage: 1_000,
        ranged: false,
    });
    for _ in 0..5 {
        h.run(1);
        if h.game.mode() == GameMode::Highscore {
            break;
        }
    }
    assert_eq!(h.game.mode(), GameMode::Highscore);
    assert_eq!(h.game.core().highscores(), &[1]);
    assert!(!h.game.core().session_active());
    assert_eq!(h.scene().count_tag("enemy"), 0);
    assert_eq!(h.scene().count_tag("button"), 1);

    h.click(ButtonKind::Back);
    assert_eq!(h.game.mode(), GameMode::MainMenu);
}

#[test]
fn clearing_the_level_opens_the_exit_and_advances() {
    let mut h = Harness::new();
    h.enter_level(ButtonKind::Character1);
    let player = h.game.core().player().unwrap();

    for enemy in h.ids_tagged("enemy") {
        h.publish(GameEvent::EnemyHit { enemy, damage: 1_000 });
    }
    h.run(3);
    assert_eq!(h.scene().count_tag("enemy"), 0);
    assert!(h.game.core().level.exit_spawned());
    let exit_at = h.game.core().config.level.exit_portal;
    let exits = h
        .scene()
        .live_entities()
        .filter_map(|e| e.get::<Portal>())
        .filter(|p| p.kind() == PortalKind::Exit)
        .count();
    assert_eq!(exits, 1);

    // Walk into the exit.
    if let Some(entity) = h.game.core_mut().scene.entity_mut(player) {
        entity.transform.position = exit_at;
    }
    for _ in 0..120 {
        h.run(1);
        if h.game.core().level.level() == 2 {
            break;
        }
    }
    let core = h.game.core();
    assert_eq!(core.level.level(), 2);
    assert_eq!(h.ready, vec![1, 2]);
    h.run(1);
    assert_eq!(h.scene().count_tag("platform"), 5);
    assert_eq!(h.scene().count_tag("enemy"), 2);
    assert!(h.scene().is_live(player), "the player carries over");
    let back_at = h.scene().entity(player).map(Entity::position).unwrap();
    assert!((back_at.x - 40.0).abs() < 1.0, "player returned to the spawn point");
}

#[test]
fn debug_keys_skip_levels_and_open_the_exit() {
    let mut config = inline_config();
    config.debug.level_keys = true;
    let mut h = Harness::with_config(config);
    h.enter_level(ButtonKind::Character1);

    h.tap(Key::K);
    assert_eq!(h.game.core().level.level(), 2);
    assert_eq!(h.ready, vec![1, 2]);

    h.tap(Key::L);
    assert!(h.game.core().level.exit_spawned());
    h.tap(Key::L);
    let exits = h
        .scene()
        .live_entities()
        .filter_map(|e| e.get::<Portal>())
        .filter(|p| p.kind() == PortalKind::Exit)
        .count();
    assert_eq!(exits, 1, "the exit opens once per level");
}

#[test]
fn failed_level_generation_keeps_the_current_level() {
    let mut config = inline_config();
    config.debug.level_keys = true;
    let mut h = Harness::with_config(config.clone());
    // Built past validation: level 2 needs one platform more than the grid holds.
    let mut crowded = config;
    crowded.level.start_platforms = 24;
    crowded.level.max_platforms = 25;
    h.game.core_mut().level = LevelManager::new(&crowded);
    let failed = Inbox::new();
    h.game.core_mut().scene.bus_mut().forward(
        EventKind::LevelGenerationFailed,
        &failed,
        |e| match e {
            GameEvent::LevelGenerationFailed { level, .. } => Some(*level),
            _ => None,
        },
    );

    h.enter_level(ButtonKind::Character1);
    assert_eq!(h.ready, vec![1]);
    assert_eq!(h.scene().count_tag("platform"), 24);

    h.tap(Key::K);
    assert!(matches!(
        h.failures[..],
        [LevelError::NoValidPlacement { requested: 25, .. }]
    ));
    assert_eq!(failed.drain(), vec![2]);
    assert_eq!(h.game.mode(), GameMode::Gameplay);
    assert_eq!(h.game.core().level.level(), 1);
    assert_eq!(h.ready, vec![1]);
    assert_eq!(h.scene().count_tag("platform"), 24);
    assert_eq!(h.scene().count_tag("enemy"), 2);
    assert!(h.game.core().player().is_some_and(|p| h.scene().is_live(p)));

    // The level can still be cleared.
    for enemy in h.ids_tagged("enemy") {
        h.publish(GameEvent::EnemyHit { enemy, damage: 1_000 });
    }
    h.run(3);
    assert!(h.game.core().level.exit_spawned());
}

#[test]
fn debug_keys_are_ignored_unless_enabled() {
    let mut h = Harness::new();
    h.enter_level(ButtonKind::Character1);
    h.tap(Key::K);
    h.tap(Key::L);
    assert_eq!(h.game.core().level.level(), 1);
    assert!(!h.game.core().level.exit_spawned());
}

#[test]
fn background_generation_delivers_the_level() {
    let mut config = GameConfig::default();
    config.level.background_generation = true;
    let mut h = Harness::with_config(config);
    h.enter_level(ButtonKind::Character1);

    for _ in 0..500 {
        if !h.ready.is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
        h.run(1);
    }
    assert_eq!(h.ready, vec![1]);
    h.run(1);
    assert_eq!(h.scene().count_tag("platform"), 4);
}

#[test]
fn same_seed_same_level_one() {
    let layout = |seed: u64| {
        let mut config = inline_config();
        config.level.seed = seed;
        let mut h = Harness::with_config(config);
        h.enter_level(ButtonKind::Character1);
        h.game.core().level.layout().map(LevelLayout::fingerprint)
    };
    assert_eq!(layout(11), layout(11));
    assert!(layout(11).is_some());
}
