//! Menu and game-mode flow.
//!
//! The top-level state machine runs over a [`GameCore`], which owns the
//! scene, the services and the level manager. Menu modes spawn their buttons
//! on `enter`, react to clicks in `execute`, and destroy their buttons on
//! `exit`, so every mode starts from a clean set of UI entities.
//!
//! Clicks, key presses and player deaths reach the modes through inboxes fed
//! by the scene's bus; a mode only acts on clicks for buttons it shows.

use tracing::{info, warn};

use jumpgun_ecs::entity::EntityId;
use jumpgun_ecs::event::{Inbox, SubscriptionId};

use crate::components::{Button, ButtonKind, Character, Player};
use crate::config::GameConfig;
use crate::event::{accept, EventKind};
use crate::fsm::{State, StateMachine, Transition};
use crate::level::LevelManager;
use crate::scene::{Layer, Scene};
use crate::services::{Key, Services};

/// Highscore table length.
pub const HIGHSCORE_SLOTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameMode {
    MainMenu,
    CharacterSelection,
    Settings,
    Audio,
    Controls,
    Highscore,
    Gameplay,
    Paused,
}

// ---------------------------------------------------------------------------
// GameCore
// ---------------------------------------------------------------------------

/// Everything the modes act on.
pub struct GameCore {
    pub scene: Scene,
    pub services: Services,
    pub level: LevelManager,
    pub config: GameConfig,
    highscores: Vec<u32>,
    character: Option<Character>,
    player: Option<EntityId>,
    session_active: bool,
    quit: bool,
    clicks: Inbox<ButtonKind>,
    keys: Inbox<Key>,
    deaths: Inbox<u32>,
    subscriptions: Vec<SubscriptionId>,
}

impl GameCore {
    pub fn new(config: GameConfig, services: Services) -> Self {
        let mut core = Self {
            scene: Scene::new(),
            services,
            level: LevelManager::new(&config),
            config,
            highscores: Vec::new(),
            character: None,
            player: None,
            session_active: false,
            quit: false,
            clicks: Inbox::new(),
            keys: Inbox::new(),
            deaths: Inbox::new(),
            subscriptions: Vec::new(),
        };
        let bus = core.scene.bus_mut();
        core.subscriptions.push(bus.forward(EventKind::ButtonClicked, &core.clicks, |e| {
            accept(e.as_button())
        }));
        core.subscriptions.push(bus.forward(EventKind::KeyPress, &core.keys, |e| {
            accept(e.as_key_press()).and_then(|(key, down)| down.then_some(key))
        }));
        core.subscriptions.push(bus.forward(EventKind::PlayerDeath, &core.deaths, |e| {
            accept(e.as_player_death())
        }));
        core
    }

    /// Levels reached, best first.
    pub fn highscores(&self) -> &[u32] {
        &self.highscores
    }

    pub fn record_highscore(&mut self, level: u32) {
        self.highscores.push(level);
        self.highscores.sort_unstable_by(|a, b| b.cmp(a));
        self.highscores.truncate(HIGHSCORE_SLOTS);
    }

    pub fn character(&self) -> Option<Character> {
        self.character
    }

    pub fn player(&self) -> Option<EntityId> {
        self.player
    }

    pub fn session_active(&self) -> bool {
        self.session_active
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    /// Spawn the player and start level 1.
    fn begin_session(&mut self) {
        let character = self.character.unwrap_or(Character::Soldier);
        let player = Player::new(
            character,
            self.config.player.clone(),
            self.config.physics.clone(),
            self.config.screen.width,
        );
        let id = self
            .scene
            .create(player.entity(self.config.level.spawn_point, self.config.debug.collider_outlines));
        self.player = Some(id);
        self.session_active = true;
        self.level.reset();
        self.level.attach(self.scene.bus_mut());
        self.level.start(&mut self.scene);
        info!(character = ?character, "session started");
    }

    /// Remove every world entity and rewind the level manager.
    fn end_session(&mut self) {
        self.scene.destroy_where(|e| e.layer() == Layer::World);
        self.level.detach(self.scene.bus_mut());
        self.level.reset();
        self.player = None;
        self.session_active = false;
        info!("session ended");
    }

    /// Clicks aimed at one of `shown`, oldest first.
    fn clicks_for(&self, shown: &[ButtonKind]) -> Vec<ButtonKind> {
        self.clicks
            .drain()
            .into_iter()
            .filter(|b| shown.contains(b))
            .collect()
    }
}

impl std::fmt::Debug for GameCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameCore")
            .field("level", &self.level)
            .field("highscores", &self.highscores)
            .field("session_active", &self.session_active)
            .field("quit", &self.quit)
            .finish()
    }
}

pub type ModeMachine = StateMachine<GameMode, GameCore>;

pub fn mode_machine() -> ModeMachine {
    StateMachine::new()
        .with_state(
            GameMode::MainMenu,
            MenuScreen::new(
                GameMode::MainMenu,
                &[
                    ButtonKind::Start,
                    ButtonKind::Settings,
                    ButtonKind::Highscores,
                    ButtonKind::Quit,
                ],
            ),
        )
        .with_state(
            GameMode::CharacterSelection,
            MenuScreen::new(
                GameMode::CharacterSelection,
                &[ButtonKind::Character1, ButtonKind::Character2, ButtonKind::Back],
            ),
        )
        .with_state(
            GameMode::Settings,
            MenuScreen::new(
                GameMode::Settings,
                &[ButtonKind::Audio, ButtonKind::Controls, ButtonKind::Back],
            ),
        )
        .with_state(
            GameMode::Audio,
            MenuScreen::new(
                GameMode::Audio,
                &[ButtonKind::Music, ButtonKind::Sfx, ButtonKind::Back],
            ),
        )
        .with_state(
            GameMode::Controls,
            MenuScreen::new(GameMode::Controls, &[ButtonKind::Back]),
        )
        .with_state(
            GameMode::Highscore,
            MenuScreen::new(GameMode::Highscore, &[ButtonKind::Back]),
        )
        .with_state(GameMode::Gameplay, GameplayMode)
        .with_state(GameMode::Paused, PausedMode::default())
}

// ---------------------------------------------------------------------------
// Menus
// ---------------------------------------------------------------------------

/// A screen of buttons.
pub struct MenuScreen {
    mode: GameMode,
    buttons: &'static [ButtonKind],
    spawned: Vec<EntityId>,
}

impl MenuScreen {
    pub fn new(mode: GameMode, buttons: &'static [ButtonKind]) -> Self {
        Self {
            mode,
            buttons,
            spawned: Vec::new(),
        }
    }

    fn route(&self, core: &mut GameCore, button: ButtonKind) -> Transition<GameMode> {
        use ButtonKind as B;
        use GameMode as M;
        let next = match (self.mode, button) {
            (M::MainMenu, B::Start) => M::CharacterSelection,
            (M::MainMenu, B::Settings) => M::Settings,
            (M::MainMenu, B::Highscores) => M::Highscore,
            (M::MainMenu, B::Quit) => {
                info!("quit requested");
                core.quit = true;
                return Transition::Stay;
            }
            (M::CharacterSelection, B::Character1) => {
                core.character = Some(Character::Soldier);
                M::Gameplay
            }
            (M::CharacterSelection, B::Character2) => {
                core.character = Some(Character::Ranger);
                M::Gameplay
            }
            (M::Settings, B::Audio) => M::Audio,
            (M::Settings, B::Controls) => M::Controls,
            (M::Audio, B::Music) => {
                let on = !core.services.music_enabled();
                core.services.set_music_enabled(on);
                return Transition::Stay;
            }
            (M::Audio, B::Sfx) => {
                let on = !core.services.sfx_enabled();
                core.services.set_sfx_enabled(on);
                return Transition::Stay;
            }
            (M::Audio | M::Controls, B::Back) => M::Settings,
            (_, B::Back) => M::MainMenu,
            (mode, button) => {
                warn!(mode = ?mode, button = ?button, "button has no action here");
                return Transition::Stay;
            }
        };
        Transition::To(next)
    }
}

impl State<GameMode, GameCore> for MenuScreen {
    fn enter(&mut self, core: &mut GameCore) {
        core.clicks.drain();
        self.spawned = self
            .buttons
            .iter()
            .map(|kind| core.scene.create(Button::spawn(*kind)))
            .collect();
    }

    fn execute(&mut self, core: &mut GameCore, _dt: f32) -> Transition<GameMode> {
        core.keys.drain();
        for button in core.clicks_for(self.buttons) {
            if let Transition::To(next) = self.route(core, button) {
                return Transition::To(next);
            }
        }
        Transition::Stay
    }

    fn exit(&mut self, core: &mut GameCore) {
        for id in self.spawned.drain(..) {
            if core.scene.is_live(id) || core.scene.is_pending(id) {
                let _ = core.scene.destroy(id);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Gameplay
// ---------------------------------------------------------------------------

pub struct GameplayMode;

impl State<GameMode, GameCore> for GameplayMode {
    fn enter(&mut self, core: &mut GameCore) {
        core.keys.drain();
        if !core.session_active {
            core.deaths.drain();
            core.begin_session();
        }
    }

    fn execute(&mut self, core: &mut GameCore, _dt: f32) -> Transition<GameMode> {
        if let Some(level) = core.deaths.drain().into_iter().next() {
            info!(level, "player died, recording highscore");
            core.record_highscore(level);
            core.end_session();
            return Transition::To(GameMode::Highscore);
        }
        if core.keys.drain().contains(&Key::Escape) {
            return Transition::To(GameMode::Paused);
        }
        Transition::Stay
    }
}

/// Gameplay frozen behind a resume/quit menu.
#[derive(Default)]
pub struct PausedMode {
    spawned: Vec<EntityId>,
}

const PAUSE_BUTTONS: [ButtonKind; 2] = [ButtonKind::Resume, ButtonKind::QuitToMain];

impl State<GameMode, GameCore> for PausedMode {
    fn enter(&mut self, core: &mut GameCore) {
        core.clicks.drain();
        core.keys.drain();
        self.spawned = PAUSE_BUTTONS
            .iter()
            .map(|kind| core.scene.create(Button::spawn(*kind)))
            .collect();
    }

    fn execute(&mut self, core: &mut GameCore, _dt: f32) -> Transition<GameMode> {
        if core.keys.drain().contains(&Key::Escape) {
            return Transition::To(GameMode::Gameplay);
        }
        for button in core.clicks_for(&PAUSE_BUTTONS) {
            match button {
                ButtonKind::Resume => return Transition::To(GameMode::Gameplay),
                ButtonKind::QuitToMain => {
                    core.end_session();
                    return Transition::To(GameMode::MainMenu);
                }
                _ => {}
            }
        }
        Transition::Stay
    }

    fn exit(&mut self, core: &mut GameCore) {
        for id in self.spawned.drain(..) {
            if core.scene.is_live(id) || core.scene.is_pending(id) {
                let _ = core.scene.destroy(id);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{RecordingAudio, ScriptedInput};

    fn core() -> GameCore {
        GameCore::new(
            GameConfig::default(),
            Services::headless(ScriptedInput::new(), RecordingAudio::new()),
        )
    }

    #[test]
    fn highscores_keep_the_best_five() {
        let mut core = core();
        for level in [3, 9, 1, 4, 7, 2, 8] {
            core.record_highscore(level);
        }
        assert_eq!(core.highscores(), &[9, 8, 7, 4, 3]);
    }

    #[test]
    fn main_menu_routes_buttons() {
        let mut core = core();
        let menu = MenuScreen::new(GameMode::MainMenu, &[ButtonKind::Start, ButtonKind::Quit]);
        assert_eq!(
            menu.route(&mut core, ButtonKind::Start),
            Transition::To(GameMode::CharacterSelection)
        );
        assert_eq!(menu.route(&mut core, ButtonKind::Quit), Transition::Stay);
        assert!(core.quit_requested());
    }

    #[test]
    fn back_from_audio_returns_to_settings() {
        let mut core = core();
        let audio = MenuScreen::new(GameMode::Audio, &[ButtonKind::Back]);
        assert_eq!(
            audio.route(&mut core, ButtonKind::Back),
            Transition::To(GameMode::Settings)
        );
        let scores = MenuScreen::new(GameMode::Highscore, &[ButtonKind::Back]);
        assert_eq!(
            scores.route(&mut core, ButtonKind::Back),
            Transition::To(GameMode::MainMenu)
        );
    }

    #[test]
    fn audio_buttons_toggle_settings() {
        let mut core = core();
        let audio = MenuScreen::new(GameMode::Audio, &[ButtonKind::Music, ButtonKind::Sfx]);
        audio.route(&mut core, ButtonKind::Sfx);
        assert!(!core.services.sfx_enabled());
        audio.route(&mut core, ButtonKind::Music);
        assert!(!core.services.music_enabled());
    }

    #[test]
    fn menu_exit_removes_its_buttons() {
        let mut core = core();
        let mut machine = mode_machine();
        machine.start(GameMode::MainMenu, &mut core).unwrap();
        core.scene.cleanup(&mut core.services);
        assert_eq!(core.scene.count_tag("button"), 4);

        machine.change_state(GameMode::Settings, &mut core).unwrap();
        core.scene.cleanup(&mut core.services);
        assert_eq!(core.scene.count_tag("button"), 3);
    }
}
