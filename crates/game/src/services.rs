//! Seams between the weapon core and the engine around it.
//!
//! The core never renders, traces, spawns, or applies damage itself; it goes
//! through these traits, all of which are handed in per call via [`WeaponCtx`].

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::damage::{DamageEvent, TakeHitInfo};
use crate::handle::{EntityId, WeaponId};
use crate::hit::ProjectileSpawn;
use crate::net::Outbox;
use crate::owner::OwnerView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SurfaceKind {
    #[default]
    Default,
    Concrete,
    Dirt,
    Water,
    Metal,
    Wood,
    Grass,
    Glass,
    Flesh,
}

impl SurfaceKind {
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => SurfaceKind::Concrete,
            2 => SurfaceKind::Dirt,
            3 => SurfaceKind::Water,
            4 => SurfaceKind::Metal,
            5 => SurfaceKind::Wood,
            6 => SurfaceKind::Grass,
            7 => SurfaceKind::Glass,
            8 => SurfaceKind::Flesh,
            _ => SurfaceKind::Default,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceHit {
    pub blocking: bool,
    pub point: Vec3,
    pub normal: Vec3,
    pub surface: SurfaceKind,
    pub entity: Option<EntityId>,
}

impl TraceHit {
    pub fn miss(end: Vec3) -> Self {
        Self {
            blocking: false,
            point: end,
            normal: Vec3::ZERO,
            surface: SurfaceKind::Default,
            entity: None,
        }
    }
}

/// Axis-aligned bounds of an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Bounds {
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents: half_extents.abs(),
        }
    }

    /// Leeway widens every half-extent by the same amount.
    pub fn contains_with_leeway(&self, point: Vec3, leeway: f32) -> bool {
        let delta = (point - self.center).abs();
        let limit = self.half_extents + Vec3::splat(leeway.max(0.0));
        delta.cmple(limit).all()
    }
}

pub trait SpatialQuery {
    fn trace_ray(&self, from: Vec3, to: Vec3, ignore: Option<EntityId>) -> TraceHit;

    fn bounds_of(&self, entity: EntityId) -> Option<Bounds>;

    fn entities_in_radius(&self, _center: Vec3, _radius: f32) -> Vec<EntityId> {
        Vec::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SoundHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectHandle(pub u32);

/// UI-facing notifications.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WeaponEvent {
    AmmoChanged { weapon: WeaponId, clip: u32, total: u32 },
    ReloadStarted { weapon: WeaponId, duration: f32 },
    Equipped { weapon: WeaponId, duration: f32 },
    Unequipped { weapon: WeaponId },
    OutOfAmmo { weapon: WeaponId },
}

/// Audio, animation, and effects. Every method defaults to doing nothing, so
/// headless processes can pass [`NullPresentation`].
pub trait Presentation {
    /// Returns the animation length in seconds, or zero if nothing played.
    fn play_animation(&mut self, _weapon: WeaponId, _animation: &str) -> f32 {
        0.0
    }

    fn stop_animation(&mut self, _weapon: WeaponId, _animation: &str) {}

    fn play_sound(&mut self, _weapon: WeaponId, _sound: &str) -> Option<SoundHandle> {
        None
    }

    fn stop_sound(&mut self, _handle: SoundHandle) {}

    fn spawn_muzzle_effect(&mut self, _weapon: WeaponId, _effect: &str) -> Option<EffectHandle> {
        None
    }

    fn stop_effect(&mut self, _handle: EffectHandle) {}

    fn spawn_trail(&mut self, _weapon: WeaponId, _from: Vec3, _to: Vec3) {}

    fn spawn_impact(&mut self, _weapon: WeaponId, _hit: &TraceHit) {}

    fn spawn_explosion(&mut self, _projectile: EntityId, _at: Vec3) {}

    /// Camera shake and force feedback for the local player.
    fn play_fire_feedback(&mut self, _weapon: WeaponId) {}

    fn attach_weapon(&mut self, _weapon: WeaponId) {}

    fn detach_weapon(&mut self, _weapon: WeaponId) {}

    fn take_hit(&mut self, _target: EntityId, _info: &TakeHitInfo) {}

    fn notify(&mut self, _event: WeaponEvent) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullPresentation;

impl Presentation for NullPresentation {}

pub trait ProjectileSpawner {
    fn spawn_projectile(&mut self, spawn: ProjectileSpawn) -> EntityId;
}

pub trait DamageSink {
    /// Returns the damage actually applied.
    fn apply_damage(&mut self, target: EntityId, event: &DamageEvent) -> f32;
}

/// Everything a weapon may touch during one call.
pub struct WeaponCtx<'a> {
    pub now: f32,
    pub owner: OwnerView,
    pub fx: &'a mut dyn Presentation,
    pub world: &'a dyn SpatialQuery,
    pub spawner: &'a mut dyn ProjectileSpawner,
    pub damage: &'a mut dyn DamageSink,
    pub outbox: &'a mut Outbox,
}
