use glam::Vec3;
use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::damage::TakeHitInfo;
use crate::handle::{EntityId, WeaponId};
use crate::hit::HitRecord;
use crate::services::{SurfaceKind, TraceHit};

pub const PROTOCOL_VERSION: u32 = 1;
pub const PROTOCOL_MAGIC: u32 = 0x41524D59;

const SEQUENCE_WRAP_THRESHOLD: u32 = u32::MAX / 2;

#[inline]
pub fn sequence_greater_than(s1: u32, s2: u32) -> bool {
    ((s1 > s2) && (s1 - s2 <= SEQUENCE_WRAP_THRESHOLD))
        || ((s1 < s2) && (s2 - s1 > SEQUENCE_WRAP_THRESHOLD))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReliabilityMode {
    Unreliable,
    Reliable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub struct PacketHeader {
    pub magic: u32,
    pub version: u32,
    pub sequence: u32,
}

impl PacketHeader {
    pub fn new(sequence: u32) -> Self {
        Self {
            magic: PROTOCOL_MAGIC,
            version: PROTOCOL_VERSION,
            sequence,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == PROTOCOL_MAGIC && self.version == PROTOCOL_VERSION
    }
}

/// Wire form of a trace result.
#[derive(Debug, Clone, Copy, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct ImpactRecord {
    pub blocking: bool,
    pub point: [f32; 3],
    pub normal: [f32; 3],
    pub surface: u8,
    pub entity: Option<EntityId>,
}

impl From<&TraceHit> for ImpactRecord {
    fn from(hit: &TraceHit) -> Self {
        Self {
            blocking: hit.blocking,
            point: hit.point.into(),
            normal: hit.normal.into(),
            surface: hit.surface.to_u8(),
            entity: hit.entity,
        }
    }
}

impl From<&ImpactRecord> for TraceHit {
    fn from(record: &ImpactRecord) -> Self {
        Self {
            blocking: record.blocking,
            point: Vec3::from(record.point),
            normal: Vec3::from(record.normal),
            surface: SurfaceKind::from_u8(record.surface),
            entity: record.entity,
        }
    }
}

/// Requests between the owning client and the authority. Everything except
/// [`RemoteCall::ClientStartReload`] travels client to server.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum RemoteCall {
    StartFire {
        weapon: WeaponId,
    },
    StopFire {
        weapon: WeaponId,
    },
    StartReload {
        weapon: WeaponId,
    },
    StopReload {
        weapon: WeaponId,
    },
    HandleFiring {
        weapon: WeaponId,
    },
    NotifyHit {
        weapon: WeaponId,
        impact: ImpactRecord,
        shoot_dir: [f32; 3],
        seed: u32,
        spread: f32,
    },
    NotifyMiss {
        weapon: WeaponId,
        shoot_dir: [f32; 3],
        seed: u32,
        spread: f32,
    },
    FireProjectile {
        weapon: WeaponId,
        origin: [f32; 3],
        direction: [f32; 3],
    },
    EquipWeapon {
        weapon: WeaponId,
    },
    ClientStartReload {
        weapon: WeaponId,
    },
}

impl RemoteCall {
    pub fn weapon(&self) -> WeaponId {
        match self {
            RemoteCall::StartFire { weapon }
            | RemoteCall::StopFire { weapon }
            | RemoteCall::StartReload { weapon }
            | RemoteCall::StopReload { weapon }
            | RemoteCall::HandleFiring { weapon }
            | RemoteCall::NotifyHit { weapon, .. }
            | RemoteCall::NotifyMiss { weapon, .. }
            | RemoteCall::FireProjectile { weapon, .. }
            | RemoteCall::EquipWeapon { weapon }
            | RemoteCall::ClientStartReload { weapon } => *weapon,
        }
    }

    pub fn reliability(&self) -> ReliabilityMode {
        match self {
            RemoteCall::NotifyMiss { .. } => ReliabilityMode::Unreliable,
            _ => ReliabilityMode::Reliable,
        }
    }

    pub fn is_client_bound(&self) -> bool {
        matches!(self, RemoteCall::ClientStartReload { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct InventoryEntry {
    pub weapon: WeaponId,
    pub config_key: String,
}

/// Who receives a replicated field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    Everyone,
    OwnerOnly,
    SkipOwner,
}

impl Audience {
    pub fn includes(self, is_owner: bool) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::OwnerOnly => is_owner,
            Audience::SkipOwner => !is_owner,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    Inventory,
    CurrentWeapon,
    BurstCounter(WeaponId),
    PendingReload(WeaponId),
    HitNotify(WeaponId),
    Ammo(WeaponId),
    TakeHit(EntityId),
    Projectile(EntityId),
}

/// A replicated field value, sent whenever the authority sees it change.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum FieldUpdate {
    Inventory { weapons: Vec<InventoryEntry> },
    /// Carries the config key so observers can build the weapon on demand.
    CurrentWeapon { weapon: Option<InventoryEntry> },
    BurstCounter { weapon: WeaponId, value: u32 },
    PendingReload { weapon: WeaponId, pending: bool },
    HitNotify { weapon: WeaponId, record: HitRecord },
    Ammo { weapon: WeaponId, total: u32, clip: u32 },
    TakeHit { target: EntityId, info: TakeHitInfo },
    /// Sent when the authority spawns a projectile and again when it explodes.
    Projectile {
        projectile: EntityId,
        weapon: WeaponId,
        position: [f32; 3],
        velocity: [f32; 3],
        exploded: bool,
    },
}

impl FieldUpdate {
    pub fn key(&self) -> FieldKey {
        match self {
            FieldUpdate::Inventory { .. } => FieldKey::Inventory,
            FieldUpdate::CurrentWeapon { .. } => FieldKey::CurrentWeapon,
            FieldUpdate::BurstCounter { weapon, .. } => FieldKey::BurstCounter(*weapon),
            FieldUpdate::PendingReload { weapon, .. } => FieldKey::PendingReload(*weapon),
            FieldUpdate::HitNotify { weapon, .. } => FieldKey::HitNotify(*weapon),
            FieldUpdate::Ammo { weapon, .. } => FieldKey::Ammo(*weapon),
            FieldUpdate::TakeHit { target, .. } => FieldKey::TakeHit(*target),
            FieldUpdate::Projectile { projectile, .. } => FieldKey::Projectile(*projectile),
        }
    }

    pub fn audience(&self) -> Audience {
        match self {
            FieldUpdate::Inventory { .. } | FieldUpdate::Ammo { .. } => Audience::OwnerOnly,
            FieldUpdate::CurrentWeapon { .. }
            | FieldUpdate::TakeHit { .. }
            | FieldUpdate::Projectile { .. } => Audience::Everyone,
            FieldUpdate::BurstCounter { .. }
            | FieldUpdate::PendingReload { .. }
            | FieldUpdate::HitNotify { .. } => Audience::SkipOwner,
        }
    }

    /// Hit replays are cosmetic and may be lost; state fields must arrive.
    pub fn reliability(&self) -> ReliabilityMode {
        match self {
            FieldUpdate::HitNotify { .. } => ReliabilityMode::Unreliable,
            _ => ReliabilityMode::Reliable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum Payload {
    Call { actor: EntityId, call: RemoteCall },
    Update { actor: EntityId, update: FieldUpdate },
}

impl Payload {
    pub fn reliability(&self) -> ReliabilityMode {
        match self {
            Payload::Call { call, .. } => call.reliability(),
            Payload::Update { update, .. } => update.reliability(),
        }
    }
}

#[derive(Debug, Clone, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct Packet {
    pub header: PacketHeader,
    pub payload: Payload,
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
    #[error("bad packet header (magic {magic:#x}, version {version})")]
    InvalidHeader { magic: u32, version: u32 },
}

impl Packet {
    pub fn new(header: PacketHeader, payload: Payload) -> Self {
        Self { header, payload }
    }

    pub fn serialize(&self) -> Result<Vec<u8>, PacketError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(PacketError::Serialize)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, PacketError> {
        let packet =
            rkyv::from_bytes::<Self, rancor::Error>(data).map_err(PacketError::Deserialize)?;
        if !packet.header.is_valid() {
            return Err(PacketError::InvalidHeader {
                magic: packet.header.magic,
                version: packet.header.version,
            });
        }
        Ok(packet)
    }
}

/// Remote calls produced during one weapon operation, drained by whoever
/// owns the transport.
#[derive(Debug, Clone, Default)]
pub struct Outbox {
    calls: Vec<RemoteCall>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, call: RemoteCall) {
        self.calls.push(call);
    }

    pub fn drain(&mut self) -> std::vec::Drain<'_, RemoteCall> {
        self.calls.drain(..)
    }

    pub fn calls(&self) -> &[RemoteCall] {
        &self.calls
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_comparison() {
        assert!(sequence_greater_than(2, 1));
        assert!(!sequence_greater_than(1, 2));
        assert!(sequence_greater_than(0, u32::MAX));
        assert!(!sequence_greater_than(u32::MAX, 0));
    }

    #[test]
    fn test_packet_serialization() {
        let payload = Payload::Call {
            actor: EntityId(4),
            call: RemoteCall::NotifyHit {
                weapon: WeaponId(2),
                impact: ImpactRecord {
                    blocking: true,
                    point: [1.0, 2.0, 3.0],
                    normal: [0.0, 1.0, 0.0],
                    surface: SurfaceKind::Metal.to_u8(),
                    entity: Some(EntityId(9)),
                },
                shoot_dir: [0.0, 0.0, -1.0],
                seed: 77,
                spread: 3.5,
            },
        };
        let packet = Packet::new(PacketHeader::new(12), payload.clone());

        let bytes = packet.serialize().unwrap();
        let decoded = Packet::deserialize(&bytes).unwrap();

        assert_eq!(decoded.header, packet.header);
        assert_eq!(decoded.payload, payload);
    }

    #[test]
    fn test_rejects_foreign_header() {
        let mut header = PacketHeader::new(1);
        header.magic = 0xDEADBEEF;
        let packet = Packet::new(
            header,
            Payload::Call {
                actor: EntityId(1),
                call: RemoteCall::StartFire { weapon: WeaponId(1) },
            },
        );
        let bytes = packet.serialize().unwrap();
        assert!(matches!(
            Packet::deserialize(&bytes),
            Err(PacketError::InvalidHeader { .. })
        ));
    }

    #[test]
    fn test_audiences() {
        let ammo = FieldUpdate::Ammo {
            weapon: WeaponId(1),
            total: 10,
            clip: 5,
        };
        assert!(ammo.audience().includes(true));
        assert!(!ammo.audience().includes(false));

        let burst = FieldUpdate::BurstCounter {
            weapon: WeaponId(1),
            value: 3,
        };
        assert!(!burst.audience().includes(true));
        assert!(burst.audience().includes(false));

        let rocket = FieldUpdate::Projectile {
            projectile: EntityId(10),
            weapon: WeaponId(2),
            position: [0.0; 3],
            velocity: [0.0, 0.0, -20.0],
            exploded: false,
        };
        assert!(rocket.audience().includes(true));
        assert!(rocket.audience().includes(false));
        assert_eq!(rocket.reliability(), ReliabilityMode::Reliable);
        assert_eq!(rocket.key(), FieldKey::Projectile(EntityId(10)));
    }

    #[test]
    fn test_miss_is_unreliable() {
        let miss = RemoteCall::NotifyMiss {
            weapon: WeaponId(1),
            shoot_dir: [1.0, 0.0, 0.0],
            seed: 0,
            spread: 0.0,
        };
        assert_eq!(miss.reliability(), ReliabilityMode::Unreliable);
        assert_eq!(
            RemoteCall::StartReload { weapon: WeaponId(1) }.reliability(),
            ReliabilityMode::Reliable
        );
    }
}
