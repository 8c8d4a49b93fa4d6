use jumpgun_ecs::component::ComponentKind;
use jumpgun_ecs::entity::EntityId;
use jumpgun_ecs::event::{Inbox, SubscriptionId};
use jumpgun_ecs::geometry::{Rect, Vec2};

use tracing::trace;

use crate::collision::Contact;
use crate::event::{accept, EventKind, GameEvent};
use crate::scene::{Component, EntityBuilder, FrameContext};

use super::{Collider, SpriteRenderer};

/// Who fired a projectile, and therefore what it can hurt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Faction {
    Player,
    Enemy,
}

impl Faction {
    /// Tag of the entities this faction's shots damage.
    pub fn target_tag(self) -> &'static str {
        match self {
            Faction::Player => "enemy",
            Faction::Enemy => "player",
        }
    }
}

/// A straight-flying shot. Removed on its first hit or once it leaves the
/// play area.
pub struct Projectile {
    faction: Faction,
    shooter: EntityId,
    velocity: Vec2,
    damage: i32,
    bounds: Rect,
    spent: bool,
    contacts: Inbox<Contact>,
    subscription: Option<SubscriptionId>,
}

impl Projectile {
    pub fn new(faction: Faction, shooter: EntityId, velocity: Vec2, damage: i32) -> Self {
        Self {
            faction,
            shooter,
            velocity,
            damage,
            bounds: Rect::new(0.0, 0.0, 1280.0, 720.0),
            spent: false,
            contacts: Inbox::new(),
            subscription: None,
        }
    }

    /// Area outside which the shot is discarded.
    pub fn within(mut self, bounds: Rect) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn entity(self, origin: Vec2) -> EntityBuilder {
        let mut sprite = SpriteRenderer::new("projectile");
        sprite.flip_horizontal = self.velocity.x < 0.0;
        EntityBuilder::new("projectile")
            .at(origin)
            .with(sprite)
            .with(Collider::new())
            .with(self)
    }

    pub fn faction(&self) -> Faction {
        self.faction
    }

    pub fn damage(&self) -> i32 {
        self.damage
    }

    fn hit(&mut self, ctx: &mut FrameContext<'_>, target: EntityId) {
        self.spent = true;
        trace!(projectile = %ctx.id(), target = %target, "projectile hit");
        let event = match self.faction {
            Faction::Player => GameEvent::EnemyHit {
                enemy: target,
                damage: self.damage,
            },
            Faction::Enemy => GameEvent::EnemyAttack {
                enemy: self.shooter,
                damage: self.damage,
                ranged: true,
            },
        };
        ctx.publish(&event);
        ctx.destroy_self();
    }
}

impl Component for Projectile {
    fn requires(&self) -> Vec<ComponentKind> {
        vec![ComponentKind::of::<Collider>()]
    }

    fn start(&mut self, ctx: &mut FrameContext<'_>) {
        let me = ctx.id();
        self.subscription = Some(ctx.forward(EventKind::Collision, &self.contacts, move |e| {
            accept(e.as_contact()).filter(|c| c.from == me).cloned()
        }));
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>) {
        if self.spent {
            return;
        }
        let target = self.faction.target_tag();
        let struck = self
            .contacts
            .drain()
            .into_iter()
            .find(|c| c.with_tag == target && c.with != self.shooter);
        if let Some(contact) = struck {
            self.hit(ctx, contact.with);
            return;
        }

        let dt = ctx.dt();
        ctx.translate(self.velocity * dt);
        if !self.bounds.contains_point(ctx.position()) {
            self.spent = true;
            ctx.destroy_self();
        }
    }

    fn on_destroy(&mut self, ctx: &mut FrameContext<'_>) {
        if let Some(sub) = self.subscription.take() {
            ctx.unsubscribe(sub);
        }
    }
}
