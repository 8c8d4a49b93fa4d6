use jumpgun_ecs::geometry::Vec2;

use crate::scene::{Component, Entity, FrameContext};
use crate::services::{Color, RenderSurface, SpriteHandle};

/// Draws one sprite centred on the entity and gives the entity its extent.
#[derive(Debug, Clone)]
pub struct SpriteRenderer {
    sprite: String,
    handle: Option<SpriteHandle>,
    pub tint: Color,
    pub flip_horizontal: bool,
    pub hidden: bool,
}

impl SpriteRenderer {
    pub fn new(sprite: impl Into<String>) -> Self {
        Self {
            sprite: sprite.into(),
            handle: None,
            tint: Color::WHITE,
            flip_horizontal: false,
            hidden: false,
        }
    }

    pub fn sprite(&self) -> &str {
        &self.sprite
    }

    pub fn size(&self) -> Option<Vec2> {
        self.handle.as_ref().map(|h| h.size)
    }
}

impl Component for SpriteRenderer {
    fn awake(&mut self, ctx: &mut FrameContext<'_>) {
        let handle = ctx.services().assets.resolve_sprite(&self.sprite);
        ctx.set_extent(handle.size);
        self.handle = Some(handle);
    }

    fn draw(&self, entity: &Entity, surface: &mut dyn RenderSurface) {
        if self.hidden {
            return;
        }
        if let Some(handle) = &self.handle {
            surface.draw(handle, entity.position(), self.tint, self.flip_horizontal);
        }
    }
}
