pub mod ammo;
pub mod damage;
pub mod error;
pub mod handle;
pub mod hit;
pub mod inventory;
pub mod net;
pub mod owner;
pub mod services;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod timer;
pub mod weapon;

pub use ammo::{AmmoConfig, AmmoKind, AmmoLedger, Cheats};
pub use damage::{Causer, DamageEvent, DamageKind, DamageType, TakeHitInfo};
pub use error::ConfigError;
pub use handle::{EntityId, WeaponId, WeaponIdAllocator};
pub use hit::{HitRecord, HitStrategy, InstantHit, Projectile, ProjectileHit, ProjectileSpawn};
pub use inventory::InventoryRegistry;
pub use net::{
    Audience, Channel, FieldKey, FieldTracker, FieldUpdate, InventoryEntry, LinkConditions,
    LinkStats, Outbox, Packet, PacketError, Payload, ReceiveTracker, ReliabilityMode,
    RemoteCall, ReplicationBridge, SimulatedLink,
};
pub use owner::{Aim, NetRole, OwnerView};
pub use services::{
    Bounds, DamageSink, EffectHandle, NullPresentation, Presentation, ProjectileSpawner,
    SoundHandle, SpatialQuery, SurfaceKind, TraceHit, WeaponCtx, WeaponEvent,
};
pub use timer::{TimerKind, TimerSet};
pub use weapon::{
    Arsenal, HitConfig, InstantConfig, Intent, PresentationConfig, ProjectileConfig,
    WeaponConfig, WeaponInstance, WeaponState,
};
