mod instant;
mod projectile;
mod trajectory;

pub use instant::{HitRecord, InstantHit};
pub use projectile::{Projectile, ProjectileHit, ProjectileSpawn};
pub use trajectory::{
    AdjustedShot, MUZZLE_PROBE_LENGTH, PENETRATION_BACKOFF, PROJECTILE_AIM_RANGE, adjust_shot,
    cone_direction, is_penetrating,
};

use glam::Vec3;

use crate::handle::WeaponId;
use crate::services::{TraceHit, WeaponCtx};
use crate::weapon::{HitConfig, WeaponState};

/// How a shot turns into damage.
#[derive(Debug, Clone)]
pub enum HitStrategy {
    Instant(InstantHit),
    Projectile(ProjectileHit),
}

impl HitStrategy {
    pub fn from_config(config: &HitConfig) -> Self {
        match config {
            HitConfig::Instant(instant) => HitStrategy::Instant(InstantHit::new(instant.clone())),
            HitConfig::Projectile(projectile) => {
                HitStrategy::Projectile(ProjectileHit::new(projectile.clone()))
            }
        }
    }

    pub fn fire(&mut self, weapon: WeaponId, ctx: &mut WeaponCtx<'_>) {
        match self {
            HitStrategy::Instant(instant) => instant.fire(weapon, ctx),
            HitStrategy::Projectile(projectile) => projectile.fire(weapon, ctx),
        }
    }

    pub fn on_burst_finished(&mut self) {
        if let HitStrategy::Instant(instant) = self {
            instant.reset_spread();
        }
    }

    pub fn current_spread(&self, targeting: bool) -> f32 {
        match self {
            HitStrategy::Instant(instant) => instant.current_spread(targeting),
            HitStrategy::Projectile(_) => 0.0,
        }
    }

    pub fn hit_notify(&self) -> Option<&HitRecord> {
        match self {
            HitStrategy::Instant(instant) => instant.hit_notify(),
            HitStrategy::Projectile(_) => None,
        }
    }

    pub fn server_notify_hit(
        &mut self,
        weapon: WeaponId,
        state: WeaponState,
        impact: &TraceHit,
        shoot_dir: Vec3,
        seed: u32,
        spread: f32,
        ctx: &mut WeaponCtx<'_>,
    ) {
        match self {
            HitStrategy::Instant(instant) => {
                instant.server_notify_hit(weapon, state, impact, shoot_dir, seed, spread, ctx)
            }
            HitStrategy::Projectile(_) => {
                log::debug!("{weapon} fires projectiles, dropping hit notification");
            }
        }
    }

    pub fn server_notify_miss(
        &mut self,
        weapon: WeaponId,
        shoot_dir: Vec3,
        seed: u32,
        spread: f32,
        ctx: &mut WeaponCtx<'_>,
    ) {
        match self {
            HitStrategy::Instant(instant) => {
                instant.server_notify_miss(weapon, shoot_dir, seed, spread, ctx)
            }
            HitStrategy::Projectile(_) => {
                log::debug!("{weapon} fires projectiles, dropping miss notification");
            }
        }
    }

    pub fn server_fire_projectile(
        &mut self,
        weapon: WeaponId,
        origin: Vec3,
        direction: Vec3,
        ctx: &mut WeaponCtx<'_>,
    ) {
        match self {
            HitStrategy::Projectile(projectile) => {
                projectile.server_fire_projectile(weapon, origin, direction, ctx)
            }
            HitStrategy::Instant(_) => {
                log::debug!("{weapon} is hitscan, dropping projectile request");
            }
        }
    }

    /// Replays a replicated shot on a process that did not fire it.
    pub fn simulate_hit(&mut self, weapon: WeaponId, record: HitRecord, ctx: &mut WeaponCtx<'_>) {
        if let HitStrategy::Instant(instant) = self {
            instant.apply_hit_notify(weapon, record, ctx);
        }
    }
}
