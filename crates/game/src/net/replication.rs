use std::collections::HashMap;

use super::protocol::{FieldUpdate, InventoryEntry};
use crate::damage::TakeHitInfo;
use crate::handle::{EntityId, WeaponId};
use crate::hit::{HitRecord, Projectile};
use crate::inventory::InventoryRegistry;

#[derive(Debug, Clone, Default, PartialEq)]
struct WeaponShadow {
    burst_counter: u32,
    pending_reload: bool,
    hit_notify: Option<HitRecord>,
    ammo: Option<(u32, u32)>,
}

/// Authority-side change detection. Remembers the last value sent for every
/// replicated field and emits updates only for fields that changed.
#[derive(Debug, Default)]
pub struct ReplicationBridge {
    inventory: Option<Vec<InventoryEntry>>,
    current: Option<Option<WeaponId>>,
    weapons: HashMap<WeaponId, WeaponShadow>,
    take_hits: HashMap<EntityId, TakeHitInfo>,
    projectiles: HashMap<EntityId, bool>,
}

impl ReplicationBridge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collect(&mut self, registry: &InventoryRegistry) -> Vec<FieldUpdate> {
        let mut updates = Vec::new();

        let entries: Vec<InventoryEntry> = registry
            .weapons()
            .iter()
            .map(|weapon| InventoryEntry {
                weapon: weapon.id(),
                config_key: weapon.config_key().to_string(),
            })
            .collect();
        if self.inventory.as_ref() != Some(&entries) {
            updates.push(FieldUpdate::Inventory {
                weapons: entries.clone(),
            });
            self.inventory = Some(entries);
        }

        let current = registry.current_weapon_id();
        if self.current != Some(current) {
            let entry = registry.current_weapon().map(|weapon| InventoryEntry {
                weapon: weapon.id(),
                config_key: weapon.config_key().to_string(),
            });
            updates.push(FieldUpdate::CurrentWeapon { weapon: entry });
            self.current = Some(current);
        }

        self.weapons
            .retain(|id, _| registry.weapons().iter().any(|weapon| weapon.id() == *id));

        for weapon in registry.weapons() {
            let id = weapon.id();
            let shadow = self.weapons.entry(id).or_default();

            let ammo = (
                weapon.ledger().current_ammo(),
                weapon.ledger().current_ammo_in_clip(),
            );
            if shadow.ammo != Some(ammo) {
                updates.push(FieldUpdate::Ammo {
                    weapon: id,
                    total: ammo.0,
                    clip: ammo.1,
                });
                shadow.ammo = Some(ammo);
            }

            if shadow.pending_reload != weapon.is_pending_reload() {
                shadow.pending_reload = weapon.is_pending_reload();
                updates.push(FieldUpdate::PendingReload {
                    weapon: id,
                    pending: shadow.pending_reload,
                });
            }

            if shadow.burst_counter != weapon.burst_counter() {
                shadow.burst_counter = weapon.burst_counter();
                updates.push(FieldUpdate::BurstCounter {
                    weapon: id,
                    value: shadow.burst_counter,
                });
            }

            let hit_notify = weapon.strategy().hit_notify().copied();
            if hit_notify.is_some() && shadow.hit_notify != hit_notify {
                shadow.hit_notify = hit_notify;
                if let Some(record) = hit_notify {
                    updates.push(FieldUpdate::HitNotify { weapon: id, record });
                }
            }
        }

        updates
    }

    /// Announces new projectiles and their explosion. Pass every projectile
    /// alive this tick, including ones that exploded during it; anything
    /// missing is forgotten.
    pub fn collect_projectiles<'a>(
        &mut self,
        projectiles: impl IntoIterator<Item = &'a Projectile>,
    ) -> Vec<FieldUpdate> {
        let mut updates = Vec::new();
        let mut seen = HashMap::new();

        for projectile in projectiles {
            let id = projectile.id();
            let exploded = projectile.has_exploded();
            if self.projectiles.get(&id) != Some(&exploded) {
                updates.push(FieldUpdate::Projectile {
                    projectile: id,
                    weapon: projectile.weapon(),
                    position: projectile.position().into(),
                    velocity: projectile.velocity().into(),
                    exploded,
                });
            }
            seen.insert(id, exploded);
        }

        self.projectiles = seen;
        updates
    }

    pub fn collect_take_hit(&mut self, target: EntityId, info: &TakeHitInfo) -> Option<FieldUpdate> {
        if self.take_hits.get(&target) == Some(info) {
            return None;
        }
        self.take_hits.insert(target, *info);
        Some(FieldUpdate::TakeHit {
            target,
            info: *info,
        })
    }
}
