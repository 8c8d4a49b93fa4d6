//! Interfaces to the collaborators the core does not own: assets, audio,
//! input and the render surface.
//!
//! The core only ever talks to these traits. A real frontend plugs in its
//! texture loader, mixer and window; the headless implementations at the
//! bottom of this module drive tests and the demo.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use jumpgun_ecs::geometry::Vec2;

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// A resolved visual: its name and pixel size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteHandle {
    pub name: String,
    pub size: Vec2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color::rgba(255, 255, 255, 255);
    pub const GRAY: Color = Color::rgba(128, 128, 128, 255);
    pub const RED: Color = Color::rgba(255, 0, 0, 255);

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Keys the core reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    A,
    D,
    Space,
    LeftShift,
    E,
    Escape,
    K,
    L,
}

impl Key {
    pub const ALL: [Key; 8] = [
        Key::A,
        Key::D,
        Key::Space,
        Key::LeftShift,
        Key::E,
        Key::Escape,
        Key::K,
        Key::L,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MouseButtonState {
    Pressed,
    #[default]
    Released,
}

// ---------------------------------------------------------------------------
// Collaborator traits
// ---------------------------------------------------------------------------

pub trait AssetResolver {
    /// Failures are not modeled; an unknown name still yields a handle.
    fn resolve_sprite(&self, name: &str) -> SpriteHandle;
}

/// Fire-and-forget sound playback.
pub trait AudioService {
    fn play_clip(&mut self, name: &str);
    fn play_random(&mut self, category: &str);
}

/// Polled input state.
pub trait InputService {
    fn is_key_down(&self, key: Key) -> bool;
    fn mouse_position(&self) -> Vec2;
    fn mouse_button(&self) -> MouseButtonState;
}

pub trait RenderSurface {
    /// Draw `sprite` centred on `position`.
    fn draw(&mut self, sprite: &SpriteHandle, position: Vec2, tint: Color, flip_horizontal: bool);
}

// ---------------------------------------------------------------------------
// Services
// ---------------------------------------------------------------------------

/// The collaborator bundle handed to components and modes.
///
/// Owned by the frame driver and passed down by reference; there are no
/// process-wide singletons.
pub struct Services {
    pub assets: Box<dyn AssetResolver>,
    pub audio: Box<dyn AudioService>,
    pub input: Box<dyn InputService>,
    sfx_enabled: bool,
    music_enabled: bool,
}

impl Services {
    pub fn new(
        assets: Box<dyn AssetResolver>,
        audio: Box<dyn AudioService>,
        input: Box<dyn InputService>,
    ) -> Self {
        Self {
            assets,
            audio,
            input,
            sfx_enabled: true,
            music_enabled: true,
        }
    }

    /// Headless services with the game's default sprite table.
    pub fn headless(input: ScriptedInput, audio: RecordingAudio) -> Self {
        Self::new(
            Box::new(HeadlessAssets::game_defaults()),
            Box::new(audio),
            Box::new(input),
        )
    }

    /// Play a sound effect unless effects are muted.
    pub fn play_sfx(&mut self, name: &str) {
        if self.sfx_enabled {
            self.audio.play_clip(name);
        }
    }

    pub fn play_random_sfx(&mut self, category: &str) {
        if self.sfx_enabled {
            self.audio.play_random(category);
        }
    }

    pub fn sfx_enabled(&self) -> bool {
        self.sfx_enabled
    }

    pub fn set_sfx_enabled(&mut self, enabled: bool) {
        self.sfx_enabled = enabled;
    }

    pub fn music_enabled(&self) -> bool {
        self.music_enabled
    }

    pub fn set_music_enabled(&mut self, enabled: bool) {
        if enabled && !self.music_enabled {
            self.audio.play_clip("music");
        }
        self.music_enabled = enabled;
    }
}

// ---------------------------------------------------------------------------
// Headless implementations
// ---------------------------------------------------------------------------

/// Sprite table keyed by name with a fallback size for unknown sprites.
#[derive(Debug, Clone)]
pub struct HeadlessAssets {
    sizes: HashMap<String, Vec2>,
    fallback: Vec2,
}

impl HeadlessAssets {
    pub fn new(fallback: Vec2) -> Self {
        Self {
            sizes: HashMap::new(),
            fallback,
        }
    }

    /// Sizes matching the shipped art.
    pub fn game_defaults() -> Self {
        let table: &[(&str, f32, f32)] = &[
            ("player1", 34.0, 48.0),
            ("player2", 34.0, 48.0),
            ("mushroom", 40.0, 40.0),
            ("worm", 48.0, 28.0),
            ("skeleton", 44.0, 64.0),
            ("reaper", 96.0, 96.0),
            ("projectile", 12.0, 6.0),
            ("portal", 50.0, 64.0),
            ("platform_grass", 192.0, 32.0),
            ("platform_desert", 192.0, 32.0),
            ("platform_graveyard", 192.0, 32.0),
            ("ground_grass", 1280.0, 30.0),
            ("ground_desert", 1280.0, 30.0),
            ("ground_graveyard", 1280.0, 30.0),
            ("button_character1", 150.0, 150.0),
            ("button_character2", 150.0, 150.0),
        ];
        let mut assets = Self::new(Vec2::new(150.0, 50.0));
        for (name, w, h) in table {
            assets = assets.with_sprite(name, Vec2::new(*w, *h));
        }
        assets
    }

    pub fn with_sprite(mut self, name: &str, size: Vec2) -> Self {
        self.sizes.insert(name.to_owned(), size);
        self
    }
}

impl AssetResolver for HeadlessAssets {
    fn resolve_sprite(&self, name: &str) -> SpriteHandle {
        let size = match self.sizes.get(name) {
            Some(size) => *size,
            None => {
                debug!(sprite = name, "unknown sprite, using fallback size");
                self.fallback
            }
        };
        SpriteHandle {
            name: name.to_owned(),
            size,
        }
    }
}

/// Audio sink that remembers what was played. Clones share the log.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    played: Rc<RefCell<Vec<String>>>,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<String> {
        self.played.borrow().clone()
    }

    pub fn count(&self, name: &str) -> usize {
        self.played.borrow().iter().filter(|p| *p == name).count()
    }
}

impl AudioService for RecordingAudio {
    fn play_clip(&mut self, name: &str) {
        self.played.borrow_mut().push(name.to_owned());
    }

    fn play_random(&mut self, category: &str) {
        self.played.borrow_mut().push(format!("{category}:*"));
    }
}

#[derive(Debug, Default)]
struct InputState {
    keys: HashSet<Key>,
    mouse: Vec2,
    button: MouseButtonState,
}

/// Input driven by the caller. Clones share state, so a test can keep one
/// handle while the game owns another.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    state: Rc<RefCell<InputState>>,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press(&self, key: Key) {
        self.state.borrow_mut().keys.insert(key);
    }

    pub fn release(&self, key: Key) {
        self.state.borrow_mut().keys.remove(&key);
    }

    pub fn move_mouse(&self, to: Vec2) {
        self.state.borrow_mut().mouse = to;
    }

    pub fn set_mouse_button(&self, state: MouseButtonState) {
        self.state.borrow_mut().button = state;
    }
}

impl InputService for ScriptedInput {
    fn is_key_down(&self, key: Key) -> bool {
        self.state.borrow().keys.contains(&key)
    }

    fn mouse_position(&self) -> Vec2 {
        self.state.borrow().mouse
    }

    fn mouse_button(&self) -> MouseButtonState {
        self.state.borrow().button
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub sprite: String,
    pub position: Vec2,
    pub tint: Color,
    pub flip_horizontal: bool,
}

/// Render surface that records draw calls instead of rasterising them.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    pub calls: Vec<DrawCall>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn count(&self, sprite: &str) -> usize {
        self.calls.iter().filter(|c| c.sprite == sprite).count()
    }
}

impl RenderSurface for RecordingSurface {
    fn draw(&mut self, sprite: &SpriteHandle, position: Vec2, tint: Color, flip_horizontal: bool) {
        self.calls.push(DrawCall {
            sprite: sprite.name.clone(),
            position,
            tint,
            flip_horizontal,
        });
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
