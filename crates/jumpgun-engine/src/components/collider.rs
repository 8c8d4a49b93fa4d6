use jumpgun_ecs::component::ComponentKind;
use jumpgun_ecs::geometry::Vec2;

use crate::scene::{Component, Entity};
use crate::services::{Color, RenderSurface, SpriteHandle};

use super::SpriteRenderer;

/// Marks an entity as collidable. The box comes from the sprite's extent,
/// so a sprite renderer is required.
#[derive(Debug, Clone, Default)]
pub struct Collider {
    pub debug_outline: bool,
}

impl Collider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_outline(debug_outline: bool) -> Self {
        Self { debug_outline }
    }
}

impl Component for Collider {
    fn requires(&self) -> Vec<ComponentKind> {
        vec![ComponentKind::of::<SpriteRenderer>()]
    }

    fn is_collider(&self) -> bool {
        true
    }

    fn draw(&self, entity: &Entity, surface: &mut dyn RenderSurface) {
        if !self.debug_outline {
            return;
        }
        if let Some(bounds) = entity.bounding_box() {
            let outline = SpriteHandle {
                name: "collision_box".to_owned(),
                size: Vec2::new(bounds.width, bounds.height),
            };
            surface.draw(&outline, bounds.center(), Color::RED, false);
        }
    }
}
