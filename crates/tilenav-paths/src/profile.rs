//! Capability profiles: what an agent may walk through.

use tilenav_core::{AccessTags, CollisionMask, TileData, TileRef};

/// The capability set of an agent: how far it plans, which doors it may
/// open and which obstruction layers stop it.
///
/// Profiles are compared by value and double as reachability cache keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessProfile {
    /// Planning horizon in tiles. Region flooding stops at twice this
    /// distance from the source region.
    pub vision_radius: u32,
    pub access: AccessTags,
    pub collision: CollisionMask,
}

impl AccessProfile {
    /// A profile from its three capabilities.
    pub const fn new(vision_radius: u32, access: AccessTags, collision: CollisionMask) -> Self {
        Self {
            vision_radius,
            access,
            collision,
        }
    }

    /// The same profile with another planning horizon; `0` is unbounded.
    pub const fn with_vision_radius(self, vision_radius: u32) -> Self {
        Self {
            vision_radius,
            ..self
        }
    }

    pub const fn with_access(self, access: AccessTags) -> Self {
        Self { access, ..self }
    }

    pub const fn with_collision(self, collision: CollisionMask) -> Self {
        Self { collision, ..self }
    }

    /// Whether reachability computed for `other` answers the same question
    /// as for `self`, up to the vision radius.
    #[inline]
    pub fn same_capabilities(&self, other: &AccessProfile) -> bool {
        self.access == other.access && self.collision == other.collision
    }

    /// Whether a tile with terrain `data` and obstruction mask `blocking`
    /// can be entered.
    #[inline]
    pub fn can_enter(&self, data: &TileData, blocking: CollisionMask) -> bool {
        data.passable
            && !self.collision.blocked_by(blocking)
            && data.door.is_none_or(|req| self.access.satisfies(req))
    }
}

/// Someone asking reachability questions: where it stands and what it can
/// do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Agent {
    pub tile: TileRef,
    pub profile: AccessProfile,
}

impl Agent {
    /// An agent standing on `tile`.
    pub const fn new(tile: TileRef, profile: AccessProfile) -> Self {
        Self { tile, profile }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_rules() {
        let p = AccessProfile::new(10, AccessTags::tag(2), CollisionMask::layer(0));
        assert!(p.can_enter(&TileData::FLOOR, CollisionMask::NONE));
        assert!(!p.can_enter(&TileData::WALL, CollisionMask::NONE));
        assert!(!p.can_enter(&TileData::FLOOR, CollisionMask::layer(0)));
        assert!(p.can_enter(&TileData::FLOOR, CollisionMask::layer(5)));
        assert!(p.can_enter(&TileData::door(AccessTags::tag(2)), CollisionMask::NONE));
        assert!(!p.can_enter(&TileData::door(AccessTags::tag(3)), CollisionMask::NONE));
        assert!(p.can_enter(&TileData::door(AccessTags::NONE), CollisionMask::NONE));
    }

    #[test]
    fn capability_equivalence_ignores_radius() {
        let a = AccessProfile::new(5, AccessTags::tag(1), CollisionMask::layer(0));
        assert!(a.same_capabilities(&a.with_vision_radius(50)));
        assert!(!a.same_capabilities(&a.with_access(AccessTags::NONE)));
        assert_ne!(a, a.with_vision_radius(50));
    }
}
