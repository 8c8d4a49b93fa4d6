//! Axis-aligned collision between live colliders.
//!
//! Boxes are derived on demand from each entity's position and visual extent
//! and are never stored. [`run`] tests every live collider against every
//! other and publishes one [`GameEvent::Collision`] per ordered overlapping
//! pair; reacting to a contact (filtering by the other side's tag) is up to
//! the subscribers.
//!
//! [`GroundTracker`] holds the landing rules shared by anything affected by
//! gravity.

use tracing::trace;

use jumpgun_ecs::entity::EntityId;
use jumpgun_ecs::geometry::Rect;

use crate::event::GameEvent;
use crate::scene::{Entity, Scene};

// ---------------------------------------------------------------------------
// Contact
// ---------------------------------------------------------------------------

/// One side's view of an overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub from: EntityId,
    pub from_tag: String,
    pub from_box: Rect,
    pub with: EntityId,
    pub with_tag: String,
    pub with_box: Rect,
}

pub fn bounding_box(entity: &Entity) -> Option<Rect> {
    entity.bounding_box()
}

/// Contacts between `id` and every other live collider, in collider order.
///
/// Empty if `id` is not a live collider or has no extent yet.
pub fn check_collision(scene: &Scene, id: EntityId) -> Vec<Contact> {
    let Some(me) = scene.entity(id) else {
        return Vec::new();
    };
    let Some(my_box) = me.bounding_box() else {
        return Vec::new();
    };
    scene
        .collider_ids()
        .iter()
        .filter(|other| **other != id)
        .filter_map(|other| scene.entity(*other))
        .filter_map(|other| {
            let other_box = other.bounding_box()?;
            my_box.intersects(&other_box).then(|| Contact {
                from: id,
                from_tag: me.tag().to_owned(),
                from_box: my_box,
                with: other.id(),
                with_tag: other.tag().to_owned(),
                with_box: other_box,
            })
        })
        .collect()
}

/// Check every live collider and publish its contacts. Returns how many
/// contacts were published.
pub fn run(scene: &mut Scene) -> usize {
    let ids: Vec<EntityId> = scene.collider_ids().to_vec();
    let mut published = 0;
    for id in ids {
        for contact in check_collision(scene, id) {
            trace!(from = %contact.from, with = %contact.with, "collision");
            scene.publish(&GameEvent::Collision(contact));
            published += 1;
        }
    }
    published
}

// ---------------------------------------------------------------------------
// GroundTracker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroundOutcome {
    /// Touched down this check. Reset fall state now.
    Landed,
    /// Still on the remembered support.
    Grounded,
    Airborne,
    /// Ran into a support's side; shift horizontally by this much.
    Pushed(f32),
}

/// Grounded status with the landing tie-break and debounce.
///
/// Once grounded, the status holds for as long as the entity's box still
/// overlaps the box it landed on, so standing exactly on a boundary does not
/// flicker and the landing reset fires once per landing.
#[derive(Debug, Clone)]
pub struct GroundTracker {
    tolerance: f32,
    push: f32,
    support: Option<Rect>,
}

impl GroundTracker {
    pub fn new(tolerance: f32, push: f32) -> Self {
        Self {
            tolerance,
            push,
            support: None,
        }
    }

    pub fn is_grounded(&self) -> bool {
        self.support.is_some()
    }

    pub fn support(&self) -> Option<Rect> {
        self.support
    }

    /// Forget the support, e.g. when jumping.
    pub fn release(&mut self) {
        self.support = None;
    }

    /// Classify `own` against the overlapping `supports`.
    ///
    /// While airborne, each support is tested in order: bottom edge within
    /// tolerance of its top lands; hitting its underside does nothing;
    /// hitting its left or right side pushes away. The first decisive
    /// support wins.
    pub fn check(&mut self, own: Rect, supports: &[Rect]) -> GroundOutcome {
        if let Some(support) = self.support {
            if own.intersects(&support) {
                return GroundOutcome::Grounded;
            }
            self.support = None;
        }

        for other in supports {
            if own.bottom_line().intersects(other)
                && own.bottom() >= other.top()
                && own.bottom() <= other.top() + self.tolerance
            {
                self.support = Some(*other);
                return GroundOutcome::Landed;
            }
            if own.intersects(&other.bottom_line()) {
                continue;
            }
            if own.intersects(&other.left_line()) {
                return GroundOutcome::Pushed(-self.push);
            }
            if own.intersects(&other.right_line()) {
                return GroundOutcome::Pushed(self.push);
            }
        }
        GroundOutcome::Airborne
    }

    /// Looser rule used by enemies: any overlap grounds.
    pub fn settle(&mut self, own: Rect, supports: &[Rect]) -> GroundOutcome {
        if let Some(support) = self.support {
            if own.intersects(&support) {
                return GroundOutcome::Grounded;
            }
            self.support = None;
        }
        match supports.iter().find(|s| own.intersects(s)) {
            Some(s) => {
                self.support = Some(*s);
                GroundOutcome::Landed
            }
            None => GroundOutcome::Airborne,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker() -> GroundTracker {
        GroundTracker::new(5.0, 10.0)
    }

    const PLATFORM: Rect = Rect::new(100.0, 500.0, 200.0, 32.0);

    #[test]
    fn landing_within_tolerance_grounds_once() {
        let mut t = tracker();
        // Bottom at 503: 3px into the platform.
        let own = Rect::new(150.0, 455.0, 34.0, 48.0);
        assert_eq!(t.check(own, &[PLATFORM]), GroundOutcome::Landed);
        assert_eq!(t.check(own, &[PLATFORM]), GroundOutcome::Grounded);
        assert_eq!(t.check(own, &[PLATFORM]), GroundOutcome::Grounded);
    }

    #[test]
    fn deep_overlap_is_not_a_landing() {
        let mut t = tracker();
        // Bottom at 520, far below the top edge; box straddles the left side.
        let own = Rect::new(80.0, 472.0, 34.0, 48.0);
        assert_eq!(t.check(own, &[PLATFORM]), GroundOutcome::Pushed(-10.0));
        assert!(!t.is_grounded());
    }

    #[test]
    fn right_side_pushes_right() {
        let mut t = tracker();
        let own = Rect::new(290.0, 490.0, 34.0, 30.0);
        assert_eq!(t.check(own, &[PLATFORM]), GroundOutcome::Pushed(10.0));
    }

    #[test]
    fn head_bump_from_below_does_nothing() {
        let mut t = tracker();
        // Top at 530, inside the platform's bottom strip.
        let own = Rect::new(150.0, 530.0, 34.0, 48.0);
        assert_eq!(t.check(own, &[PLATFORM]), GroundOutcome::Airborne);
    }

    #[test]
    fn leaving_the_support_ungrounds() {
        let mut t = tracker();
        let own = Rect::new(150.0, 455.0, 34.0, 48.0);
        t.check(own, &[PLATFORM]);
        let jumped = own.translated(jumpgun_ecs::geometry::Vec2::new(0.0, -100.0));
        assert_eq!(t.check(jumped, &[]), GroundOutcome::Airborne);
        assert!(!t.is_grounded());
        assert_eq!(t.check(own, &[PLATFORM]), GroundOutcome::Landed);
    }

    #[test]
    fn settle_grounds_on_any_overlap() {
        let mut t = tracker();
        let own = Rect::new(150.0, 480.0, 40.0, 40.0);
        assert_eq!(t.settle(own, &[PLATFORM]), GroundOutcome::Landed);
        assert_eq!(t.settle(own, &[PLATFORM]), GroundOutcome::Grounded);
    }
}
