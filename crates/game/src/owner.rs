use glam::Vec3;

use crate::ammo::Cheats;
use crate::handle::EntityId;

/// How this process relates to the replicated owner of a weapon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetRole {
    /// Server copy; the only place ammo and damage are authoritative.
    Authority,
    /// The owning client's copy.
    AutonomousProxy,
    /// Everybody else's copy; cosmetic only.
    SimulatedProxy,
}

impl NetRole {
    pub fn is_authority(self) -> bool {
        self == NetRole::Authority
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aim {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Default for Aim {
    fn default() -> Self {
        Self {
            origin: Vec3::ZERO,
            direction: Vec3::NEG_Z,
        }
    }
}

impl Aim {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }
}

/// Snapshot of everything a weapon needs to know about its owner for one call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OwnerView {
    pub actor: EntityId,
    pub role: NetRole,
    pub locally_controlled: bool,
    /// Whether this process renders anything. Dedicated servers do not.
    pub has_view: bool,
    pub fire_allowed: bool,
    pub reload_allowed: bool,
    pub infinite_ammo: bool,
    pub infinite_clip: bool,
    pub targeting: bool,
    /// Camera ray used for hit traces.
    pub aim: Aim,
    pub muzzle: Aim,
}

impl OwnerView {
    pub fn new(actor: EntityId, role: NetRole, locally_controlled: bool, has_view: bool) -> Self {
        Self {
            actor,
            role,
            locally_controlled,
            has_view,
            fire_allowed: true,
            reload_allowed: true,
            infinite_ammo: false,
            infinite_clip: false,
            targeting: false,
            aim: Aim::default(),
            muzzle: Aim::default(),
        }
    }

    /// Server and owner in one process, as in a single-player or listen session.
    pub fn standalone(actor: EntityId) -> Self {
        Self::new(actor, NetRole::Authority, true, true)
    }

    pub fn dedicated_server(actor: EntityId) -> Self {
        Self::new(actor, NetRole::Authority, false, false)
    }

    pub fn owning_client(actor: EntityId) -> Self {
        Self::new(actor, NetRole::AutonomousProxy, true, true)
    }

    pub fn observer(actor: EntityId) -> Self {
        Self::new(actor, NetRole::SimulatedProxy, false, true)
    }

    pub fn is_authority(&self) -> bool {
        self.role.is_authority()
    }

    pub fn cheats(&self) -> Cheats {
        Cheats {
            infinite_ammo: self.infinite_ammo,
            infinite_clip: self.infinite_clip,
        }
    }
}
