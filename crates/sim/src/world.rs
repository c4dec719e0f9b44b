use std::collections::BTreeMap;

use glam::Vec3;

use armory::{
    DamageEvent, DamageSink, EntityId, Presentation, Projectile, ProjectileSpawn,
    ProjectileSpawner, SpatialQuery, TakeHitInfo,
};

use crate::config::SimConfig;
use crate::physics::PhysicsWorld;

const FIRST_TARGET_ID: u32 = 100;
const FIRST_PROJECTILE_ID: u32 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetHealth {
    pub health: f32,
    pub max_health: f32,
}

impl TargetHealth {
    pub fn is_dead(&self) -> bool {
        self.health <= 0.0
    }
}

/// Target health plus the last hit each target took, for replication.
#[derive(Debug, Default)]
pub struct Health {
    targets: BTreeMap<EntityId, TargetHealth>,
    last_hits: BTreeMap<EntityId, TakeHitInfo>,
    fresh: Vec<EntityId>,
}

impl Health {
    pub fn insert(&mut self, entity: EntityId, health: f32) {
        self.targets.insert(
            entity,
            TargetHealth {
                health,
                max_health: health,
            },
        );
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, TargetHealth)> + '_ {
        self.targets.iter().map(|(entity, health)| (*entity, *health))
    }

    /// Mirrors a kill reported by the authority onto this peer's copy.
    pub fn mark_killed(&mut self, entity: EntityId) {
        if let Some(state) = self.targets.get_mut(&entity) {
            state.health = 0.0;
        }
    }

    /// Targets hit since the last drain, with their latest hit.
    pub fn drain_hits(&mut self) -> Vec<(EntityId, TakeHitInfo)> {
        let fresh = std::mem::take(&mut self.fresh);
        fresh
            .into_iter()
            .filter_map(|entity| self.last_hits.get(&entity).map(|info| (entity, *info)))
            .collect()
    }
}

impl DamageSink for Health {
    fn apply_damage(&mut self, target: EntityId, event: &DamageEvent) -> f32 {
        let Some(state) = self.targets.get_mut(&target) else {
            log::debug!("{target} has no health, ignoring {:.1} damage", event.damage);
            return 0.0;
        };
        if state.is_dead() {
            return 0.0;
        }

        let applied = event.damage.clamp(0.0, state.health);
        state.health -= applied;
        let killed = state.is_dead();
        if killed {
            log::info!("{target} killed by {}", event.instigator);
        }

        match self.last_hits.get_mut(&target) {
            Some(info) => info.record(event, applied, killed),
            None => {
                let mut info = TakeHitInfo::new(event, applied, killed);
                info.ensure_replication();
                self.last_hits.insert(target, info);
            }
        }
        if !self.fresh.contains(&target) {
            self.fresh.push(target);
        }
        applied
    }
}

#[derive(Debug)]
pub struct Projectiles {
    next_id: u32,
    live: Vec<Projectile>,
    retired: Vec<Projectile>,
    spawned: u32,
}

impl Default for Projectiles {
    fn default() -> Self {
        Self {
            next_id: FIRST_PROJECTILE_ID,
            live: Vec::new(),
            retired: Vec::new(),
            spawned: 0,
        }
    }
}

impl Projectiles {
    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    /// Projectiles in flight plus the ones that exploded or expired during
    /// the last step, so their final state can still be replicated.
    pub fn announced(&self) -> impl Iterator<Item = &Projectile> + '_ {
        self.live.iter().chain(&self.retired)
    }
}

impl ProjectileSpawner for Projectiles {
    fn spawn_projectile(&mut self, spawn: ProjectileSpawn) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.spawned += 1;
        self.live.push(Projectile::new(id, &spawn));
        id
    }
}

/// One process's view of the scene. Each peer owns its own copy so traces
/// run against local geometry.
pub struct Arena {
    pub physics: PhysicsWorld,
    pub health: Health,
    pub projectiles: Projectiles,
}

impl Arena {
    pub fn new(config: &SimConfig) -> Self {
        let mut physics = PhysicsWorld::new(config.tick_duration());
        let mut health = Health::default();
        physics.add_ground(0.0, 50.0);

        for (index, target) in config.targets.iter().enumerate() {
            let entity = EntityId(FIRST_TARGET_ID + index as u32);
            physics.add_target(
                entity,
                Vec3::from(target.position),
                Vec3::from(target.half_extents),
            );
            health.insert(entity, target.health);
        }
        for wall in &config.walls {
            physics.add_wall(
                Vec3::from(wall.position),
                Vec3::from(wall.half_extents),
                wall.surface,
            );
        }
        physics.step();

        Self {
            physics,
            health,
            projectiles: Projectiles::default(),
        }
    }

    /// Clears dead targets out of the scene, then flies live projectiles and
    /// detonates the ones that hit something.
    pub fn step(&mut self, dt: f32, fx: &mut dyn Presentation) {
        for (entity, target) in self.health.iter() {
            if target.is_dead() && self.physics.bounds_of(entity).is_some() {
                log::debug!("removing {entity} from the scene");
                self.physics.remove_target(entity);
            }
        }
        self.physics.step();

        let Self {
            physics,
            health,
            projectiles,
        } = self;
        for projectile in &mut projectiles.live {
            if let Some(hit) = projectile.advance(dt, &*physics) {
                let victims = projectile.explode(&hit, &*physics, &mut *health);
                fx.spawn_explosion(projectile.id(), hit.point);
                log::debug!("projectile {} hit {victims} targets", projectile.id());
            } else if projectile.is_expired() {
                log::debug!("projectile {} expired at {}", projectile.id(), projectile.position());
            }
        }
        let (retired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut projectiles.live)
            .into_iter()
            .partition(|projectile| projectile.has_exploded() || projectile.is_expired());
        projectiles.live = live;
        projectiles.retired = retired;
    }
}
