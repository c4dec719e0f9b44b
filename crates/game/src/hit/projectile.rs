use glam::Vec3;

use super::trajectory::{PROJECTILE_AIM_RANGE, adjust_shot};
use crate::damage::{Causer, DamageEvent, radial_falloff};
use crate::handle::{EntityId, WeaponId};
use crate::net::RemoteCall;
use crate::services::{DamageSink, SpatialQuery, TraceHit, WeaponCtx};
use crate::weapon::ProjectileConfig;

/// Pushes the explosion origin off the surface it hit.
const EXPLOSION_SURFACE_OFFSET: f32 = 0.1;

/// Request handed to the projectile spawner on the authority. The projectile
/// takes its speed from `config` when it initializes its velocity.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectileSpawn {
    pub weapon: WeaponId,
    pub instigator: EntityId,
    pub origin: Vec3,
    pub direction: Vec3,
    pub config: ProjectileConfig,
}

#[derive(Debug, Clone)]
pub struct ProjectileHit {
    config: ProjectileConfig,
}

impl ProjectileHit {
    pub fn new(config: ProjectileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProjectileConfig {
        &self.config
    }

    /// Aims along the camera ray, then corrects for the muzzle offset unless
    /// the barrel is inside geometry.
    pub fn fire(&mut self, weapon: WeaponId, ctx: &mut WeaponCtx<'_>) {
        let owner = ctx.owner;
        let shoot_dir = owner.aim.direction.normalize_or_zero();
        let end = owner.aim.origin + shoot_dir * PROJECTILE_AIM_RANGE;
        let impact = ctx.world.trace_ray(owner.aim.origin, end, Some(owner.actor));
        let shot = adjust_shot(owner.muzzle, shoot_dir, &impact, ctx.world, Some(owner.actor));

        if shot.penetrating {
            log::trace!("{weapon} muzzle inside geometry, spawning at impact");
        }

        if owner.is_authority() {
            self.server_fire_projectile(weapon, shot.origin, shot.direction, ctx);
        } else {
            ctx.outbox.push(RemoteCall::FireProjectile {
                weapon,
                origin: shot.origin.into(),
                direction: shot.direction.into(),
            });
        }
    }

    pub fn server_fire_projectile(
        &mut self,
        weapon: WeaponId,
        origin: Vec3,
        direction: Vec3,
        ctx: &mut WeaponCtx<'_>,
    ) {
        if !ctx.owner.is_authority() {
            return;
        }

        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || !origin.is_finite() {
            log::debug!("{weapon} rejected projectile request with degenerate aim");
            return;
        }

        let spawn = ProjectileSpawn {
            weapon,
            instigator: ctx.owner.actor,
            origin,
            direction,
            config: self.config.clone(),
        };
        let id = ctx.spawner.spawn_projectile(spawn);
        log::debug!("{weapon} spawned projectile {id}");
    }
}

/// Flight and explosion of one spawned projectile.
#[derive(Debug, Clone)]
pub struct Projectile {
    id: EntityId,
    weapon: WeaponId,
    instigator: EntityId,
    config: ProjectileConfig,
    position: Vec3,
    velocity: Vec3,
    age: f32,
    exploded: bool,
}

impl Projectile {
    pub fn new(id: EntityId, spawn: &ProjectileSpawn) -> Self {
        let mut projectile = Self {
            id,
            weapon: spawn.weapon,
            instigator: spawn.instigator,
            config: spawn.config.clone(),
            position: spawn.origin,
            velocity: Vec3::ZERO,
            age: 0.0,
            exploded: false,
        };
        projectile.init_velocity(spawn.direction);
        projectile
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn weapon(&self) -> WeaponId {
        self.weapon
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn has_exploded(&self) -> bool {
        self.exploded
    }

    pub fn is_expired(&self) -> bool {
        self.age >= self.config.life
    }

    pub fn init_velocity(&mut self, direction: Vec3) {
        self.velocity = direction.normalize_or_zero() * self.config.speed;
    }

    /// Moves the projectile by `dt` seconds and returns the first blocking
    /// hit along the way, leaving the projectile at the impact point.
    pub fn advance(&mut self, dt: f32, world: &dyn SpatialQuery) -> Option<TraceHit> {
        if self.exploded {
            return None;
        }

        self.age += dt;
        let target = self.position + self.velocity * dt;
        let hit = world.trace_ray(self.position, target, Some(self.instigator));
        if hit.blocking {
            self.position = hit.point;
            Some(hit)
        } else {
            self.position = target;
            None
        }
    }

    /// Cosmetic flight for a replicated copy: stops at the first blocking hit
    /// and waits there for the authority's explosion.
    pub fn coast(&mut self, dt: f32, world: &dyn SpatialQuery) {
        if self.advance(dt, world).is_some() {
            self.velocity = Vec3::ZERO;
        }
    }

    /// Applies radial damage once. Later calls do nothing and return zero.
    pub fn explode(
        &mut self,
        impact: &TraceHit,
        world: &dyn SpatialQuery,
        damage: &mut dyn DamageSink,
    ) -> usize {
        if self.exploded {
            return 0;
        }
        self.exploded = true;
        self.velocity = Vec3::ZERO;

        let origin = impact.point + impact.normal * EXPLOSION_SURFACE_OFFSET;
        let radius = self.config.explosion_radius;
        if self.config.explosion_damage <= 0.0 || radius <= 0.0 {
            return 0;
        }

        let mut hits = 0;
        for target in world.entities_in_radius(origin, radius) {
            let distance = world
                .bounds_of(target)
                .map_or(0.0, |bounds| bounds.center.distance(origin));
            let amount = radial_falloff(self.config.explosion_damage, distance, radius);
            if amount <= 0.0 {
                continue;
            }

            let event = DamageEvent::radial(
                amount,
                self.config.damage_type,
                self.instigator,
                Causer::Projectile(self.id),
                origin,
                radius,
            );
            damage.apply_damage(target, &event);
            hits += 1;
        }

        log::debug!("projectile {} exploded at {origin}, {hits} targets", self.id);
        hits
    }

    /// Observer side of the replicated exploded flag. Returns true the first
    /// time, when the explosion effect should play.
    pub fn apply_exploded(&mut self, exploded: bool, at: Vec3) -> bool {
        if exploded && !self.exploded {
            self.exploded = true;
            self.position = at;
            self.velocity = Vec3::ZERO;
            true
        } else {
            false
        }
    }
}
