use glam::Vec3;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rkyv::{Archive, Deserialize, Serialize};

use super::trajectory::{adjust_shot, cone_direction};
use crate::damage::{Causer, DamageEvent};
use crate::handle::{EntityId, WeaponId};
use crate::net::RemoteCall;
use crate::owner::OwnerView;
use crate::services::{TraceHit, WeaponCtx};
use crate::weapon::{InstantConfig, WeaponState};

/// Everything an observer needs to replay a hitscan shot locally.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct HitRecord {
    pub origin: [f32; 3],
    pub aim: [f32; 3],
    pub seed: u32,
    pub spread: f32,
}

impl HitRecord {
    pub fn new(origin: Vec3, aim: Vec3, seed: u32, spread: f32) -> Self {
        Self {
            origin: origin.into(),
            aim: aim.into(),
            seed,
            spread,
        }
    }

    pub fn origin(&self) -> Vec3 {
        Vec3::from(self.origin)
    }

    pub fn aim(&self) -> Vec3 {
        Vec3::from(self.aim)
    }
}

fn half_angle(spread: f32) -> f32 {
    (spread * 0.5).to_radians()
}

#[derive(Debug, Clone)]
pub struct InstantHit {
    config: InstantConfig,
    shots_fired: u32,
    hit_notify: Option<HitRecord>,
    rng: StdRng,
}

impl InstantHit {
    pub fn new(config: InstantConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: InstantConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: InstantConfig, rng: StdRng) -> Self {
        Self {
            config,
            shots_fired: 0,
            hit_notify: None,
            rng,
        }
    }

    pub fn config(&self) -> &InstantConfig {
        &self.config
    }

    pub fn hit_notify(&self) -> Option<&HitRecord> {
        self.hit_notify.as_ref()
    }

    pub fn shots_fired(&self) -> u32 {
        self.shots_fired
    }

    pub fn reset_spread(&mut self) {
        self.shots_fired = 0;
    }

    /// Cone angle in degrees for the next shot.
    pub fn current_spread(&self, targeting: bool) -> f32 {
        let config = &self.config;
        let spread = (config.spread + config.firing_spread_increment * self.shots_fired as f32)
            .min(config.firing_spread_max);
        if targeting {
            spread * config.targeting_spread_mod
        } else {
            spread
        }
    }

    pub fn fire(&mut self, weapon: WeaponId, ctx: &mut WeaponCtx<'_>) {
        let seed = self.rng.next_u32();
        let spread = self.current_spread(ctx.owner.targeting);
        let aim = ctx.owner.aim;
        let shoot_dir = cone_direction(seed, aim.direction, half_angle(spread));
        let end = aim.origin + shoot_dir * self.config.range;

        let impact = ctx.world.trace_ray(aim.origin, end, Some(ctx.owner.actor));
        log::trace!(
            "{weapon} shot seed={seed} spread={spread:.2} blocking={} entity={:?}",
            impact.blocking,
            impact.entity
        );

        self.process_instant_hit(weapon, &impact, aim.origin, shoot_dir, seed, spread, ctx);
        self.shots_fired = self.shots_fired.saturating_add(1);
    }

    fn process_instant_hit(
        &mut self,
        weapon: WeaponId,
        impact: &TraceHit,
        origin: Vec3,
        shoot_dir: Vec3,
        seed: u32,
        spread: f32,
        ctx: &mut WeaponCtx<'_>,
    ) {
        let owner = ctx.owner;
        if owner.locally_controlled && !owner.is_authority() {
            let call = if impact.blocking || impact.entity.is_some() {
                RemoteCall::NotifyHit {
                    weapon,
                    impact: impact.into(),
                    shoot_dir: shoot_dir.into(),
                    seed,
                    spread,
                }
            } else {
                RemoteCall::NotifyMiss {
                    weapon,
                    shoot_dir: shoot_dir.into(),
                    seed,
                    spread,
                }
            };
            ctx.outbox.push(call);
        }

        self.process_confirmed_hit(weapon, impact, origin, shoot_dir, seed, spread, ctx);
    }

    fn process_confirmed_hit(
        &mut self,
        weapon: WeaponId,
        impact: &TraceHit,
        origin: Vec3,
        shoot_dir: Vec3,
        seed: u32,
        spread: f32,
        ctx: &mut WeaponCtx<'_>,
    ) {
        let owner = ctx.owner;
        if owner.is_authority() {
            if let Some(target) = impact.entity {
                self.deal_damage(weapon, target, impact, shoot_dir, ctx);
            }
            self.hit_notify = Some(HitRecord::new(origin, owner.aim.direction, seed, spread));
        }

        if owner.has_view {
            let end = if impact.blocking {
                impact.point
            } else {
                origin + shoot_dir * self.config.range
            };
            self.spawn_shot_effects(weapon, &owner, impact, shoot_dir, end, ctx);
        }
    }

    fn spawn_shot_effects(
        &self,
        weapon: WeaponId,
        owner: &OwnerView,
        impact: &TraceHit,
        shoot_dir: Vec3,
        end: Vec3,
        ctx: &mut WeaponCtx<'_>,
    ) {
        let shot = adjust_shot(owner.muzzle, shoot_dir, impact, ctx.world, Some(owner.actor));
        ctx.fx.spawn_trail(weapon, shot.origin, end);
        if impact.blocking {
            ctx.fx.spawn_impact(weapon, impact);
        }
    }

    fn deal_damage(
        &self,
        weapon: WeaponId,
        target: EntityId,
        impact: &TraceHit,
        shoot_dir: Vec3,
        ctx: &mut WeaponCtx<'_>,
    ) {
        let event = DamageEvent::point(
            self.config.hit_damage,
            self.config.damage_type,
            ctx.owner.actor,
            Causer::Weapon(weapon),
            impact.point,
            impact.normal,
            shoot_dir,
        );
        let applied = ctx.damage.apply_damage(target, &event);
        log::debug!("{weapon} hit {target} for {applied}");
    }

    /// Authority-side check of a client-claimed hit. Rejections are silent
    /// apart from a debug log; the client never learns about them.
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
        let owner = ctx.owner;
        if !owner.is_authority() {
            return;
        }

        let spread = spread.clamp(0.0, self.config.firing_spread_max);
        let tolerance = spread.to_radians().sin().abs();
        let view_dir = (impact.point - owner.aim.origin).normalize_or_zero();
        let view_dot = owner.aim.direction.dot(view_dir);
        if view_dot <= self.config.allowed_view_dot_hit_dir - tolerance {
            log::debug!("{weapon} rejected hit: view dot {view_dot:.3} too far off aim");
            return;
        }

        if state == WeaponState::Idle {
            log::debug!("{weapon} rejected hit: weapon is idle");
            return;
        }

        if let Some(target) = impact.entity {
            match ctx.world.bounds_of(target) {
                Some(bounds)
                    if bounds.contains_with_leeway(impact.point, self.config.client_side_hit_leeway) => {}
                Some(_) => {
                    log::debug!("{weapon} rejected hit on {target}: outside bounds");
                    return;
                }
                None => {
                    log::debug!("{weapon} rejected hit on {target}: unknown target");
                    return;
                }
            }
        }

        self.process_confirmed_hit(weapon, impact, owner.aim.origin, shoot_dir, seed, spread, ctx);
    }

    pub fn server_notify_miss(
        &mut self,
        weapon: WeaponId,
        shoot_dir: Vec3,
        seed: u32,
        spread: f32,
        ctx: &mut WeaponCtx<'_>,
    ) {
        let owner = ctx.owner;
        if !owner.is_authority() {
            return;
        }

        let spread = spread.clamp(0.0, self.config.firing_spread_max);
        self.hit_notify = Some(HitRecord::new(owner.aim.origin, owner.aim.direction, seed, spread));

        if owner.has_view {
            let end = owner.aim.origin + shoot_dir * self.config.range;
            ctx.fx.spawn_trail(weapon, owner.muzzle.origin, end);
        }
    }

    /// Stores a replicated hit and replays it locally.
    pub fn apply_hit_notify(&mut self, weapon: WeaponId, record: HitRecord, ctx: &mut WeaponCtx<'_>) {
        self.hit_notify = Some(record);
        if ctx.owner.locally_controlled || !ctx.owner.has_view {
            return;
        }
        self.simulate_instant_hit(weapon, &record, ctx);
    }

    pub fn simulate_instant_hit(&self, weapon: WeaponId, record: &HitRecord, ctx: &mut WeaponCtx<'_>) {
        let origin = record.origin();
        let shoot_dir = cone_direction(record.seed, record.aim(), half_angle(record.spread));
        let end = origin + shoot_dir * self.config.range;
        let owner = ctx.owner;

        let impact = ctx.world.trace_ray(origin, end, Some(owner.actor));
        let end = if impact.blocking { impact.point } else { end };
        self.spawn_shot_effects(weapon, &owner, &impact, shoot_dir, end, ctx);
    }
}
