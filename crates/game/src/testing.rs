//! In-memory collaborators for tests and headless tools: a box-only world,
//! recording presentation, and damage and spawn logs.

use std::collections::HashMap;

use glam::Vec3;

use crate::ammo::{AmmoConfig, AmmoKind};
use crate::damage::{DamageEvent, TakeHitInfo};
use crate::handle::{EntityId, WeaponId};
use crate::hit::ProjectileSpawn;
use crate::net::Outbox;
use crate::owner::OwnerView;
use crate::services::{
    Bounds, DamageSink, EffectHandle, Presentation, ProjectileSpawner, SoundHandle, SpatialQuery,
    SurfaceKind, TraceHit, WeaponCtx, WeaponEvent,
};
use crate::weapon::{HitConfig, InstantConfig, PresentationConfig, ProjectileConfig, WeaponConfig};

#[derive(Debug, Clone, PartialEq)]
pub enum FxCall {
    PlayAnimation(WeaponId, String),
    StopAnimation(WeaponId, String),
    PlaySound(WeaponId, String),
    StopSound(SoundHandle),
    MuzzleEffect(WeaponId, String),
    StopEffect(EffectHandle),
    Trail { weapon: WeaponId, from: Vec3, to: Vec3 },
    Impact { weapon: WeaponId, point: Vec3, surface: SurfaceKind },
    Explosion(EntityId, Vec3),
    FireFeedback(WeaponId),
    Attach(WeaponId),
    Detach(WeaponId),
    TakeHit(EntityId, TakeHitInfo),
    Event(WeaponEvent),
}

#[derive(Debug, Default)]
pub struct RecordingFx {
    pub calls: Vec<FxCall>,
    animation_lengths: HashMap<String, f32>,
    next_handle: u32,
}

impl RecordingFx {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_animation_length(&mut self, animation: &str, seconds: f32) {
        self.animation_lengths.insert(animation.to_string(), seconds);
    }

    pub fn count(&self, pred: impl Fn(&FxCall) -> bool) -> usize {
        self.calls.iter().filter(|call| pred(call)).count()
    }

    pub fn sounds(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                FxCall::PlaySound(_, sound) => Some(sound.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<WeaponEvent> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                FxCall::Event(event) => Some(*event),
                _ => None,
            })
            .collect()
    }

    pub fn trails(&self) -> usize {
        self.count(|call| matches!(call, FxCall::Trail { .. }))
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    fn handle(&mut self) -> u32 {
        self.next_handle += 1;
        self.next_handle
    }
}

impl Presentation for RecordingFx {
    fn play_animation(&mut self, weapon: WeaponId, animation: &str) -> f32 {
        self.calls
            .push(FxCall::PlayAnimation(weapon, animation.to_string()));
        self.animation_lengths.get(animation).copied().unwrap_or(0.0)
    }

    fn stop_animation(&mut self, weapon: WeaponId, animation: &str) {
        self.calls
            .push(FxCall::StopAnimation(weapon, animation.to_string()));
    }

    fn play_sound(&mut self, weapon: WeaponId, sound: &str) -> Option<SoundHandle> {
        self.calls.push(FxCall::PlaySound(weapon, sound.to_string()));
        Some(SoundHandle(self.handle()))
    }

    fn stop_sound(&mut self, handle: SoundHandle) {
        self.calls.push(FxCall::StopSound(handle));
    }

    fn spawn_muzzle_effect(&mut self, weapon: WeaponId, effect: &str) -> Option<EffectHandle> {
        self.calls.push(FxCall::MuzzleEffect(weapon, effect.to_string()));
        Some(EffectHandle(self.handle()))
    }

    fn stop_effect(&mut self, handle: EffectHandle) {
        self.calls.push(FxCall::StopEffect(handle));
    }

    fn spawn_trail(&mut self, weapon: WeaponId, from: Vec3, to: Vec3) {
        self.calls.push(FxCall::Trail { weapon, from, to });
    }

    fn spawn_impact(&mut self, weapon: WeaponId, hit: &TraceHit) {
        self.calls.push(FxCall::Impact {
            weapon,
            point: hit.point,
            surface: hit.surface,
        });
    }

    fn spawn_explosion(&mut self, projectile: EntityId, at: Vec3) {
        self.calls.push(FxCall::Explosion(projectile, at));
    }

    fn play_fire_feedback(&mut self, weapon: WeaponId) {
        self.calls.push(FxCall::FireFeedback(weapon));
    }

    fn attach_weapon(&mut self, weapon: WeaponId) {
        self.calls.push(FxCall::Attach(weapon));
    }

    fn detach_weapon(&mut self, weapon: WeaponId) {
        self.calls.push(FxCall::Detach(weapon));
    }

    fn take_hit(&mut self, target: EntityId, info: &TakeHitInfo) {
        self.calls.push(FxCall::TakeHit(target, *info));
    }

    fn notify(&mut self, event: WeaponEvent) {
        self.calls.push(FxCall::Event(event));
    }
}

#[derive(Debug, Clone)]
pub struct WorldBox {
    pub entity: Option<EntityId>,
    pub bounds: Bounds,
    pub surface: SurfaceKind,
}

/// Axis-aligned boxes only; enough for aiming and validation tests.
#[derive(Debug, Clone, Default)]
pub struct BoxWorld {
    boxes: Vec<WorldBox>,
}

impl BoxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_target(&mut self, entity: EntityId, center: Vec3, half_extents: Vec3) {
        self.boxes.push(WorldBox {
            entity: Some(entity),
            bounds: Bounds::new(center, half_extents),
            surface: SurfaceKind::Flesh,
        });
    }

    pub fn add_wall(&mut self, center: Vec3, half_extents: Vec3, surface: SurfaceKind) {
        self.boxes.push(WorldBox {
            entity: None,
            bounds: Bounds::new(center, half_extents),
            surface,
        });
    }

    pub fn move_target(&mut self, entity: EntityId, center: Vec3) {
        for world_box in &mut self.boxes {
            if world_box.entity == Some(entity) {
                world_box.bounds.center = center;
            }
        }
    }
}

/// Segment/box slab test. Returns the entry fraction along the segment and
/// the face normal; a segment starting inside reports a hit at its start.
fn intersect(from: Vec3, delta: Vec3, bounds: &Bounds) -> Option<(f32, Vec3)> {
    let min = bounds.center - bounds.half_extents;
    let max = bounds.center + bounds.half_extents;
    let mut enter = 0.0_f32;
    let mut exit = 1.0_f32;
    let mut normal = Vec3::ZERO;

    for axis in 0..3 {
        let origin = from[axis];
        let d = delta[axis];
        if d.abs() < f32::EPSILON {
            if origin < min[axis] || origin > max[axis] {
                return None;
            }
            continue;
        }

        let inv = 1.0 / d;
        let mut t0 = (min[axis] - origin) * inv;
        let mut t1 = (max[axis] - origin) * inv;
        if t0 > t1 {
            std::mem::swap(&mut t0, &mut t1);
        }
        if t0 > enter {
            enter = t0;
            normal = Vec3::ZERO;
            normal[axis] = -d.signum();
        }
        exit = exit.min(t1);
        if enter > exit {
            return None;
        }
    }

    if normal == Vec3::ZERO {
        normal = -delta.normalize_or_zero();
    }
    Some((enter, normal))
}

impl SpatialQuery for BoxWorld {
    fn trace_ray(&self, from: Vec3, to: Vec3, ignore: Option<EntityId>) -> TraceHit {
        let delta = to - from;
        let nearest = self
            .boxes
            .iter()
            .filter(|world_box| ignore.is_none() || world_box.entity != ignore)
            .filter_map(|world_box| {
                intersect(from, delta, &world_box.bounds).map(|(t, normal)| (t, normal, world_box))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0));

        match nearest {
            Some((t, normal, world_box)) => TraceHit {
                blocking: true,
                point: from + delta * t,
                normal,
                surface: world_box.surface,
                entity: world_box.entity,
            },
            None => TraceHit::miss(to),
        }
    }

    fn bounds_of(&self, entity: EntityId) -> Option<Bounds> {
        self.boxes
            .iter()
            .find(|world_box| world_box.entity == Some(entity))
            .map(|world_box| world_box.bounds)
    }

    fn entities_in_radius(&self, center: Vec3, radius: f32) -> Vec<EntityId> {
        self.boxes
            .iter()
            .filter_map(|world_box| {
                let entity = world_box.entity?;
                let bounds = &world_box.bounds;
                let closest = center.clamp(
                    bounds.center - bounds.half_extents,
                    bounds.center + bounds.half_extents,
                );
                (closest.distance(center) <= radius).then_some(entity)
            })
            .collect()
    }
}

#[derive(Debug, Default)]
pub struct DamageLog {
    pub events: Vec<(EntityId, DamageEvent)>,
    health: HashMap<EntityId, f32>,
}

impl DamageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_health(&mut self, entity: EntityId, health: f32) {
        self.health.insert(entity, health);
    }

    pub fn health(&self, entity: EntityId) -> Option<f32> {
        self.health.get(&entity).copied()
    }

    pub fn total_for(&self, entity: EntityId) -> f32 {
        self.events
            .iter()
            .filter(|(target, _)| *target == entity)
            .map(|(_, event)| event.damage)
            .sum()
    }
}

impl DamageSink for DamageLog {
    fn apply_damage(&mut self, target: EntityId, event: &DamageEvent) -> f32 {
        self.events.push((target, *event));
        match self.health.get_mut(&target) {
            Some(health) => {
                let applied = event.damage.min(*health).max(0.0);
                *health -= applied;
                applied
            }
            None => event.damage,
        }
    }
}

#[derive(Debug)]
pub struct SpawnLog {
    pub spawns: Vec<(EntityId, ProjectileSpawn)>,
    next_id: u32,
}

impl Default for SpawnLog {
    fn default() -> Self {
        Self {
            spawns: Vec::new(),
            next_id: 1000,
        }
    }
}

impl ProjectileSpawner for SpawnLog {
    fn spawn_projectile(&mut self, spawn: ProjectileSpawn) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.spawns.push((id, spawn));
        id
    }
}

/// All collaborators one process needs, with an outbox for its remote calls.
#[derive(Debug, Default)]
pub struct Rig {
    pub fx: RecordingFx,
    pub world: BoxWorld,
    pub damage: DamageLog,
    pub spawner: SpawnLog,
    pub outbox: Outbox,
}

impl Rig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ctx(&mut self, now: f32, owner: OwnerView) -> WeaponCtx<'_> {
        WeaponCtx {
            now,
            owner,
            fx: &mut self.fx,
            world: &self.world,
            spawner: &mut self.spawner,
            damage: &mut self.damage,
            outbox: &mut self.outbox,
        }
    }
}

/// Automatic hitscan rifle: 30-round clip, five shots a second.
pub fn rifle() -> WeaponConfig {
    WeaponConfig {
        name: "rifle".to_string(),
        ammo: AmmoConfig {
            max_ammo: 120,
            clip_size: 30,
            initial_clips: 2,
            time_between_shots: 0.2,
            no_anim_reload_duration: 1.5,
            ..Default::default()
        },
        allow_automatic_catchup: true,
        presentation: PresentationConfig {
            fire_animation: Some("rifle_fire".to_string()),
            reload_animation: Some("rifle_reload".to_string()),
            equip_animation: Some("rifle_equip".to_string()),
            fire_loop_sound: Some("rifle_loop".to_string()),
            fire_finish_sound: Some("rifle_tail".to_string()),
            looped_fire_sound: true,
            out_of_ammo_sound: Some("dry_fire".to_string()),
            reload_sound: Some("rifle_reload".to_string()),
            equip_sound: Some("rifle_equip".to_string()),
            muzzle_effect: Some("rifle_flash".to_string()),
            looped_muzzle_effect: true,
            ..Default::default()
        },
        hit: HitConfig::Instant(InstantConfig::default()),
    }
}

/// Single-shot rocket launcher.
pub fn launcher() -> WeaponConfig {
    WeaponConfig {
        name: "launcher".to_string(),
        ammo: AmmoConfig {
            max_ammo: 12,
            clip_size: 1,
            initial_clips: 4,
            time_between_shots: 0.8,
            no_anim_reload_duration: 1.0,
            kind: AmmoKind::Rocket,
            ..Default::default()
        },
        allow_automatic_catchup: false,
        presentation: PresentationConfig {
            fire_sound: Some("launcher_fire".to_string()),
            ..Default::default()
        },
        hit: HitConfig::Projectile(ProjectileConfig::default()),
    }
}
