//! Menu buttons.
//!
//! A button knows its own slot on the screen and reports clicks on the bus;
//! what a click means is decided by the active game mode.

use tracing::debug;

use jumpgun_ecs::component::ComponentKind;
use jumpgun_ecs::geometry::{Rect, Vec2};

use crate::event::GameEvent;
use crate::scene::{Component, EntityBuilder, FrameContext, Layer};
use crate::services::{Color, MouseButtonState};

use super::SpriteRenderer;

/// Side of the square probe around the mouse cursor.
const CURSOR_SIZE: f32 = 10.0;

/// Minimum gap between two clicks on the same button.
pub const CLICK_COOLDOWN: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonKind {
    Start,
    Settings,
    Highscores,
    Quit,
    Audio,
    Controls,
    Music,
    Sfx,
    Back,
    QuitToMain,
    Resume,
    Character1,
    Character2,
}

impl ButtonKind {
    /// Top-left corner of the button on a 1280x720 screen.
    pub fn slot(self) -> Vec2 {
        let (x, y) = match self {
            ButtonKind::Start => (566.0, 365.0),
            ButtonKind::Settings => (517.0, 437.0),
            ButtonKind::Highscores => (470.0, 505.0),
            ButtonKind::Quit => (577.0, 575.0),
            ButtonKind::Audio => (563.0, 405.0),
            ButtonKind::Controls => (493.0, 486.0),
            ButtonKind::Music => (553.0, 375.0),
            ButtonKind::Sfx => (614.0, 443.0),
            ButtonKind::Back => (583.0, 639.0),
            ButtonKind::QuitToMain => (487.0, 700.0),
            ButtonKind::Resume => (556.0, 631.0),
            ButtonKind::Character1 => (448.0, 365.0),
            ButtonKind::Character2 => (686.0, 365.0),
        };
        Vec2::new(x, y)
    }

    pub fn sprite(self) -> &'static str {
        match self {
            ButtonKind::Start => "button_start",
            ButtonKind::Settings => "button_settings",
            ButtonKind::Highscores => "button_highscores",
            ButtonKind::Quit => "button_quit",
            ButtonKind::Audio => "button_audio",
            ButtonKind::Controls => "button_controls",
            ButtonKind::Music => "button_music",
            ButtonKind::Sfx => "button_sfx",
            ButtonKind::Back => "button_back",
            ButtonKind::QuitToMain => "button_quit_to_main",
            ButtonKind::Resume => "button_resume",
            ButtonKind::Character1 => "button_character1",
            ButtonKind::Character2 => "button_character2",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Button {
    kind: ButtonKind,
    hovered: bool,
    /// Set once the mouse has been seen released, so a press that opened
    /// this menu does not also click a button under the cursor.
    armed: bool,
    cooldown: f32,
    clicks: u32,
}

impl Button {
    pub fn new(kind: ButtonKind) -> Self {
        Self {
            kind,
            hovered: false,
            armed: false,
            cooldown: 0.0,
            clicks: 0,
        }
    }

    /// A complete UI entity for `kind` at its slot.
    pub fn spawn(kind: ButtonKind) -> EntityBuilder {
        EntityBuilder::new("button")
            .layer(Layer::Ui)
            .at(kind.slot())
            .with(SpriteRenderer::new(kind.sprite()))
            .with(Button::new(kind))
    }

    pub fn kind(&self) -> ButtonKind {
        self.kind
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn clicks(&self) -> u32 {
        self.clicks
    }

    fn set_hover(&mut self, ctx: &mut FrameContext<'_>, hovered: bool) {
        if hovered == self.hovered {
            return;
        }
        self.hovered = hovered;
        if hovered {
            ctx.services().play_sfx("button_hover");
        }
        let tint = if hovered { Color::GRAY } else { Color::WHITE };
        if let Some(sprite) = ctx.sibling_mut::<SpriteRenderer>() {
            sprite.tint = tint;
        }
    }
}

impl Component for Button {
    fn requires(&self) -> Vec<ComponentKind> {
        vec![ComponentKind::of::<SpriteRenderer>()]
    }

    fn start(&mut self, ctx: &mut FrameContext<'_>) {
        // Slots name the top-left corner; entities are positioned by centre.
        if let Some(extent) = ctx.extent() {
            ctx.set_position(self.kind.slot() + extent * 0.5);
        }
        self.armed = ctx.services().input.mouse_button() == MouseButtonState::Released;
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        self.cooldown = (self.cooldown - ctx.dt()).max(0.0);

        let (mouse, state) = {
            let input = &ctx.services().input;
            (input.mouse_position(), input.mouse_button())
        };
        if state == MouseButtonState::Released {
            self.armed = true;
        }

        let cursor = Rect::new(mouse.x, mouse.y, CURSOR_SIZE, CURSOR_SIZE);
        let over = ctx.bounding_box().is_some_and(|b| b.intersects(&cursor));
        self.set_hover(ctx, over);

        if over && state == MouseButtonState::Pressed && self.armed && self.cooldown <= 0.0 {
            self.armed = false;
            self.cooldown = CLICK_COOLDOWN;
            self.clicks += 1;
            debug!(button = ?self.kind, "button clicked");
            ctx.services().play_sfx("button_click");
            ctx.publish(&GameEvent::ButtonClicked { button: self.kind });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_slot_is_on_screen() {
        let kinds = [
            ButtonKind::Start,
            ButtonKind::Settings,
            ButtonKind::Highscores,
            ButtonKind::Quit,
            ButtonKind::Audio,
            ButtonKind::Controls,
            ButtonKind::Music,
            ButtonKind::Sfx,
            ButtonKind::Back,
            ButtonKind::QuitToMain,
            ButtonKind::Resume,
            ButtonKind::Character1,
            ButtonKind::Character2,
        ];
        for kind in kinds {
            let slot = kind.slot();
            assert!(slot.x >= 0.0 && slot.x < 1280.0, "{kind:?}");
            assert!(slot.y >= 0.0 && slot.y <= 720.0, "{kind:?}");
            assert!(kind.sprite().starts_with("button_"));
        }
    }
}
