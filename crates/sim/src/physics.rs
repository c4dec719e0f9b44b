use std::collections::HashMap;

use glam::Vec3;
use rapier3d::prelude::*;

use armory::{Bounds, EntityId, SpatialQuery, SurfaceKind, TraceHit};

#[derive(Debug, Clone, Copy)]
struct Body {
    handle: RigidBodyHandle,
    half_extents: Vec3,
}

/// Rapier-backed scene geometry. Targets are kinematic boxes keyed by entity;
/// walls are static colliders with a surface kind.
pub struct PhysicsWorld {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    gravity: Vector,
    entities: HashMap<EntityId, Body>,
    owners: HashMap<ColliderHandle, EntityId>,
    surfaces: HashMap<ColliderHandle, SurfaceKind>,
}

impl PhysicsWorld {
    pub fn new(tick: Real) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = tick;
        integration_parameters.min_ccd_dt = tick / 100.0;

        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters,
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            gravity: Vector::new(0.0, -9.81, 0.0),
            entities: HashMap::new(),
            owners: HashMap::new(),
            surfaces: HashMap::new(),
        }
    }

    /// Advances the pipeline; also refreshes the broad phase that ray queries
    /// read from.
    pub fn step(&mut self) {
        self.pipeline.step(
            self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            &(),
            &(),
        );
    }

    pub fn add_target(&mut self, entity: EntityId, position: Vec3, half_extents: Vec3) {
        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(Vector::new(position.x, position.y, position.z))
            .build();
        let handle = self.bodies.insert(body);

        let collider =
            ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z).build();
        let collider = self
            .colliders
            .insert_with_parent(collider, handle, &mut self.bodies);

        self.entities.insert(
            entity,
            Body {
                handle,
                half_extents,
            },
        );
        self.owners.insert(collider, entity);
        self.surfaces.insert(collider, SurfaceKind::Flesh);
    }

    pub fn add_wall(&mut self, position: Vec3, half_extents: Vec3, surface: SurfaceKind) {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .translation(Vector::new(position.x, position.y, position.z))
            .build();
        let handle = self.colliders.insert(collider);
        self.surfaces.insert(handle, surface);
    }

    pub fn add_ground(&mut self, y: Real, half_size: Real) {
        self.add_wall(
            Vec3::new(0.0, y, 0.0),
            Vec3::new(half_size, 0.1, half_size),
            SurfaceKind::Dirt,
        );
    }

    pub fn remove_target(&mut self, entity: EntityId) {
        let Some(body) = self.entities.remove(&entity) else {
            return;
        };
        self.owners.retain(|_, owner| *owner != entity);
        self.bodies.remove(
            body.handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn position_of(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|body| {
            let t = body.translation();
            Vec3::new(t.x, t.y, t.z)
        })
    }
}

impl SpatialQuery for PhysicsWorld {
    fn trace_ray(&self, from: Vec3, to: Vec3, ignore: Option<EntityId>) -> TraceHit {
        let delta = to - from;
        let length = delta.length();
        if length <= f32::EPSILON {
            return TraceHit::miss(to);
        }
        let direction = delta / length;

        let mut filter = QueryFilter::default();
        if let Some(body) = ignore.and_then(|entity| self.entities.get(&entity)) {
            filter = filter.exclude_rigid_body(body.handle);
        }
        let query = self.broad_phase.as_query_pipeline(
            self.narrow_phase.query_dispatcher(),
            &self.bodies,
            &self.colliders,
            filter,
        );

        let ray = Ray::new(
            Vector::new(from.x, from.y, from.z),
            Vector::new(direction.x, direction.y, direction.z),
        );
        match query.cast_ray_and_get_normal(&ray, length, true) {
            Some((collider, intersection)) => {
                let normal = intersection.normal;
                TraceHit {
                    blocking: true,
                    point: from + direction * intersection.time_of_impact,
                    normal: Vec3::new(normal.x, normal.y, normal.z),
                    surface: self.surfaces.get(&collider).copied().unwrap_or_default(),
                    entity: self.owners.get(&collider).copied(),
                }
            }
            None => TraceHit::miss(to),
        }
    }

    fn bounds_of(&self, entity: EntityId) -> Option<Bounds> {
        let body = self.entities.get(&entity)?;
        let center = self.position_of(body.handle)?;
        Some(Bounds::new(center, body.half_extents))
    }

    fn entities_in_radius(&self, center: Vec3, radius: f32) -> Vec<EntityId> {
        let mut found: Vec<EntityId> = self
            .entities
            .iter()
            .filter_map(|(entity, body)| {
                let position = self.position_of(body.handle)?;
                let closest = center.clamp(position - body.half_extents, position + body.half_extents);
                (closest.distance(center) <= radius).then_some(*entity)
            })
            .collect();
        found.sort_by_key(|entity| entity.0);
        found
    }
}
