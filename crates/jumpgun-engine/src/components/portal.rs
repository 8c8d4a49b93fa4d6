use tracing::info;

use jumpgun_ecs::component::ComponentKind;
use jumpgun_ecs::geometry::Vec2;

use crate::event::GameEvent;
use crate::scene::{Component, EntityBuilder, FrameContext};
use crate::services::Color;

use super::{Collider, SpriteRenderer};

/// Seconds the closing animation takes once the player has stepped in.
pub const CLOSE_SECONDS: f32 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalKind {
    /// Where the player arrives. Closes behind them.
    Start,
    /// Appears once the level is cleared and leads to the next one.
    Exit,
}

/// Opens on spawn and closes when the player touches it.
///
/// The portal looks for the player among the live colliders itself instead
/// of waiting for collision events, so it reacts in the same frame the
/// player arrives.
#[derive(Debug, Clone)]
pub struct Portal {
    kind: PortalKind,
    closing: Option<f32>,
    finished: bool,
}

impl Portal {
    pub fn new(kind: PortalKind) -> Self {
        Self {
            kind,
            closing: None,
            finished: false,
        }
    }

    pub fn entity(self, position: Vec2) -> EntityBuilder {
        EntityBuilder::new("portal")
            .at(position)
            .with(SpriteRenderer::new("portal"))
            .with(Collider::new())
            .with(self)
    }

    pub fn kind(&self) -> PortalKind {
        self.kind
    }

    pub fn is_closing(&self) -> bool {
        self.closing.is_some()
    }

    fn player_inside(ctx: &FrameContext<'_>) -> bool {
        let Some(own) = ctx.bounding_box() else {
            return false;
        };
        ctx.colliders()
            .filter(|e| e.tag() == "player")
            .filter_map(|e| e.bounding_box())
            .any(|b| own.intersects(&b))
    }

    fn close(&mut self, ctx: &mut FrameContext<'_>) {
        self.finished = true;
        if self.kind == PortalKind::Exit {
            info!(portal = %ctx.id(), "exit portal closed");
            ctx.publish(&GameEvent::NextLevel);
        }
        ctx.destroy_self();
    }
}

impl Component for Portal {
    fn requires(&self) -> Vec<ComponentKind> {
        vec![ComponentKind::of::<Collider>()]
    }

    fn start(&mut self, ctx: &mut FrameContext<'_>) {
        ctx.services().play_sfx("portal_open");
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        if self.finished {
            return;
        }
        if self.closing.is_none() && Self::player_inside(ctx) {
            self.closing = Some(CLOSE_SECONDS);
        }
        let Some(remaining) = self.closing else {
            return;
        };
        let remaining = remaining - ctx.dt();
        self.closing = Some(remaining);

        let alpha = (remaining / CLOSE_SECONDS).clamp(0.0, 1.0);
        if let Some(sprite) = ctx.sibling_mut::<SpriteRenderer>() {
            sprite.tint = Color::rgba(255, 255, 255, (alpha * 255.0) as u8);
        }
        if remaining <= 0.0 {
            self.close(ctx);
        }
    }
}
