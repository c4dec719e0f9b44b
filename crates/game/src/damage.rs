//! Damage events handed to the damage sink, plus the replicated record of the
//! last hit a target took.

use glam::Vec3;
use rkyv::{Archive, Deserialize, Serialize};

use crate::handle::{EntityId, WeaponId};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
    Archive,
    Serialize,
    Deserialize,
)]
#[rkyv(derive(Debug))]
pub enum DamageType {
    #[default]
    Generic,
    Ballistic,
    Explosive,
    Energy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum Causer {
    Weapon(WeaponId),
    Projectile(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageKind {
    General,
    Point {
        point: Vec3,
        normal: Vec3,
        shot_direction: Vec3,
    },
    Radial {
        origin: Vec3,
        radius: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    pub damage: f32,
    pub damage_type: DamageType,
    pub instigator: EntityId,
    pub causer: Causer,
    pub kind: DamageKind,
}

impl DamageEvent {
    pub fn point(
        damage: f32,
        damage_type: DamageType,
        instigator: EntityId,
        causer: Causer,
        point: Vec3,
        normal: Vec3,
        shot_direction: Vec3,
    ) -> Self {
        Self {
            damage,
            damage_type,
            instigator,
            causer,
            kind: DamageKind::Point {
                point,
                normal,
                shot_direction,
            },
        }
    }

    pub fn radial(
        damage: f32,
        damage_type: DamageType,
        instigator: EntityId,
        causer: Causer,
        origin: Vec3,
        radius: f32,
    ) -> Self {
        Self {
            damage,
            damage_type,
            instigator,
            causer,
            kind: DamageKind::Radial { origin, radius },
        }
    }
}

/// Linear falloff from full damage at the origin to nothing at the edge.
pub fn radial_falloff(base: f32, distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    base * (1.0 - distance / radius).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum DamageKindRecord {
    General,
    Point {
        point: [f32; 3],
        normal: [f32; 3],
        shot_direction: [f32; 3],
    },
    Radial {
        origin: [f32; 3],
        radius: f32,
    },
}

impl From<DamageKind> for DamageKindRecord {
    fn from(kind: DamageKind) -> Self {
        match kind {
            DamageKind::General => DamageKindRecord::General,
            DamageKind::Point {
                point,
                normal,
                shot_direction,
            } => DamageKindRecord::Point {
                point: point.into(),
                normal: normal.into(),
                shot_direction: shot_direction.into(),
            },
            DamageKind::Radial { origin, radius } => DamageKindRecord::Radial {
                origin: origin.into(),
                radius,
            },
        }
    }
}

impl From<DamageKindRecord> for DamageKind {
    fn from(record: DamageKindRecord) -> Self {
        match record {
            DamageKindRecord::General => DamageKind::General,
            DamageKindRecord::Point {
                point,
                normal,
                shot_direction,
            } => DamageKind::Point {
                point: Vec3::from(point),
                normal: Vec3::from(normal),
                shot_direction: Vec3::from(shot_direction),
            },
            DamageKindRecord::Radial { origin, radius } => DamageKind::Radial {
                origin: Vec3::from(origin),
                radius,
            },
        }
    }
}

/// Replicated description of the most recent hit a target took.
///
/// Two identical hits in a row would not register as a change, so every
/// recorded hit bumps `ensure_replication`.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct TakeHitInfo {
    pub actual_damage: f32,
    pub damage_type: DamageType,
    pub instigator: EntityId,
    pub causer: Causer,
    pub kind: DamageKindRecord,
    pub killed: bool,
    pub ensure_replication: u8,
}

impl TakeHitInfo {
    pub fn new(event: &DamageEvent, actual_damage: f32, killed: bool) -> Self {
        Self {
            actual_damage,
            damage_type: event.damage_type,
            instigator: event.instigator,
            causer: event.causer,
            kind: event.kind.into(),
            killed,
            ensure_replication: 0,
        }
    }

    pub fn record(&mut self, event: &DamageEvent, actual_damage: f32, killed: bool) {
        let counter = self.ensure_replication;
        *self = Self::new(event, actual_damage, killed);
        self.ensure_replication = counter;
        self.ensure_replication();
    }

    pub fn ensure_replication(&mut self) {
        self.ensure_replication = self.ensure_replication.wrapping_add(1);
    }

    pub fn damage_event(&self) -> DamageEvent {
        DamageEvent {
            damage: self.actual_damage,
            damage_type: self.damage_type,
            instigator: self.instigator,
            causer: self.causer,
            kind: self.kind.into(),
        }
    }
}
