//! Per-owner weapon collection and current-weapon selection.
//!
//! Every operation takes a [`WeaponCtx`] and stamps the registry's own
//! [`OwnerView`] into it before touching a weapon.

use glam::Vec3;

use crate::error::ConfigError;
use crate::handle::{EntityId, WeaponId, WeaponIdAllocator};
use crate::hit::{HitStrategy, Projectile, ProjectileSpawn};
use crate::net::{FieldUpdate, InventoryEntry, RemoteCall};
use crate::owner::{Aim, OwnerView};
use crate::services::{TraceHit, WeaponCtx};
use crate::weapon::{Arsenal, ProjectileConfig, WeaponInstance, WeaponState};

#[derive(Debug, Clone)]
pub struct InventoryRegistry {
    owner: OwnerView,
    weapons: Vec<WeaponInstance>,
    current: Option<WeaponId>,
    wants_to_fire: bool,
    projectiles: Vec<Projectile>,
    last_tick: Option<f32>,
}

impl InventoryRegistry {
    pub fn new(owner: OwnerView) -> Self {
        Self {
            owner,
            weapons: Vec::new(),
            current: None,
            wants_to_fire: false,
            projectiles: Vec::new(),
            last_tick: None,
        }
    }

    pub fn owner(&self) -> &OwnerView {
        &self.owner
    }

    pub fn owner_mut(&mut self) -> &mut OwnerView {
        &mut self.owner
    }

    pub fn set_aim(&mut self, aim: Aim, muzzle: Aim) {
        self.owner.aim = aim;
        self.owner.muzzle = muzzle;
    }

    pub fn weapons(&self) -> &[WeaponInstance] {
        &self.weapons
    }

    /// Replicated copies of this owner's projectiles still in flight.
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn weapon(&self, id: WeaponId) -> Option<&WeaponInstance> {
        self.weapons.iter().find(|weapon| weapon.id() == id)
    }

    fn weapon_mut(&mut self, id: WeaponId) -> Option<&mut WeaponInstance> {
        self.weapons.iter_mut().find(|weapon| weapon.id() == id)
    }

    pub fn contains(&self, id: WeaponId) -> bool {
        self.weapon(id).is_some()
    }

    fn index_of(&self, id: WeaponId) -> Option<usize> {
        self.weapons.iter().position(|weapon| weapon.id() == id)
    }

    pub fn current_weapon_id(&self) -> Option<WeaponId> {
        self.current
    }

    pub fn current_weapon(&self) -> Option<&WeaponInstance> {
        self.current.and_then(|id| self.weapon(id))
    }

    /// First weapon built from the given config key.
    pub fn find_weapon(&self, config_key: &str) -> Option<WeaponId> {
        self.weapons
            .iter()
            .find(|weapon| weapon.config_key() == config_key)
            .map(WeaponInstance::id)
    }

    pub fn len(&self) -> usize {
        self.weapons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weapons.is_empty()
    }

    pub fn wants_to_fire(&self) -> bool {
        self.wants_to_fire
    }

    /// Authority only. Returns false when ignored.
    pub fn add_weapon(&mut self, weapon: WeaponInstance) -> bool {
        if !self.owner.is_authority() {
            log::debug!("ignoring add of {} on non-authority", weapon.id());
            return false;
        }
        self.insert_weapon(weapon)
    }

    fn insert_weapon(&mut self, mut weapon: WeaponInstance) -> bool {
        if self.contains(weapon.id()) {
            log::debug!("{} already in inventory of {}", weapon.id(), self.owner.actor);
            return false;
        }
        weapon.on_enter_inventory();
        self.weapons.push(weapon);
        true
    }

    /// Authority only. Removing the current weapon leaves no current weapon.
    pub fn remove_weapon(&mut self, id: WeaponId, ctx: &mut WeaponCtx<'_>) -> Option<WeaponInstance> {
        if !self.owner.is_authority() {
            log::debug!("ignoring removal of {id} on non-authority");
            return None;
        }
        self.take_weapon(id, ctx)
    }

    fn take_weapon(&mut self, id: WeaponId, ctx: &mut WeaponCtx<'_>) -> Option<WeaponInstance> {
        let index = self.index_of(id)?;
        ctx.owner = self.owner;
        let mut weapon = self.weapons.remove(index);
        weapon.on_leave_inventory(ctx);
        if self.current == Some(id) {
            self.current = None;
        }
        Some(weapon)
    }

    /// Builds the loadout on the authority and equips its first weapon.
    pub fn spawn_default_inventory(
        &mut self,
        arsenal: &Arsenal,
        loadout: &[&str],
        ids: &mut WeaponIdAllocator,
        ctx: &mut WeaponCtx<'_>,
    ) -> Result<(), ConfigError> {
        if !self.owner.is_authority() {
            log::debug!("ignoring default inventory on non-authority");
            return Ok(());
        }

        for key in loadout {
            let config = arsenal.get(key)?;
            self.add_weapon(WeaponInstance::new(ids.next_id(), *key, config.clone()));
        }

        if let Some(first) = self.weapons.first().map(WeaponInstance::id) {
            self.equip_weapon(first, ctx);
        }
        Ok(())
    }

    pub fn destroy_inventory(&mut self, ctx: &mut WeaponCtx<'_>) -> Vec<WeaponInstance> {
        if !self.owner.is_authority() {
            log::debug!("ignoring inventory teardown on non-authority");
            return Vec::new();
        }

        let ids: Vec<WeaponId> = self.weapons.iter().rev().map(WeaponInstance::id).collect();
        ids.into_iter()
            .filter_map(|id| self.take_weapon(id, ctx))
            .collect()
    }

    pub fn equip_weapon(&mut self, id: WeaponId, ctx: &mut WeaponCtx<'_>) {
        if !self.contains(id) {
            log::debug!("cannot equip {id}: not in inventory of {}", self.owner.actor);
            return;
        }

        if self.owner.is_authority() {
            let last = self.current;
            self.set_current_weapon(Some(id), last, ctx);
        } else {
            ctx.outbox.push(RemoteCall::EquipWeapon { weapon: id });
        }
    }

    fn can_switch(&self) -> bool {
        self.weapons.len() >= 2
            && self
                .current_weapon()
                .is_none_or(|weapon| weapon.state() != WeaponState::Equipping)
    }

    pub fn next_weapon(&mut self, ctx: &mut WeaponCtx<'_>) {
        if !self.can_switch() {
            return;
        }
        let count = self.weapons.len();
        let next = self
            .current
            .and_then(|id| self.index_of(id))
            .map_or(0, |index| (index + 1) % count);
        let id = self.weapons[next].id();
        self.equip_weapon(id, ctx);
    }

    pub fn previous_weapon(&mut self, ctx: &mut WeaponCtx<'_>) {
        if !self.can_switch() {
            return;
        }
        let count = self.weapons.len();
        let previous = self
            .current
            .and_then(|id| self.index_of(id))
            .map_or(count - 1, |index| (index + count - 1) % count);
        let id = self.weapons[previous].id();
        self.equip_weapon(id, ctx);
    }

    /// Unequips the outgoing weapon, then equips `new`. `last` is what the
    /// caller believes was current; it decides whether the equip is animated.
    pub fn set_current_weapon(
        &mut self,
        new: Option<WeaponId>,
        last: Option<WeaponId>,
        ctx: &mut WeaponCtx<'_>,
    ) {
        if let Some(id) = new {
            if !self.contains(id) {
                log::debug!("cannot make {id} current: not in inventory");
                return;
            }
        }

        let outgoing = last.or(if new != self.current { self.current } else { None });
        ctx.owner = self.owner;

        if let Some(weapon) = outgoing.and_then(|id| self.weapon_mut(id)) {
            weapon.on_unequip(ctx);
        }

        self.current = new;

        if let Some(weapon) = new.and_then(|id| self.weapon_mut(id)) {
            weapon.on_equip(last, ctx);
        }
    }

    pub fn start_weapon_fire(&mut self, ctx: &mut WeaponCtx<'_>) {
        if self.wants_to_fire {
            return;
        }
        self.wants_to_fire = true;
        ctx.owner = self.owner;
        if let Some(weapon) = self.current.and_then(|id| self.weapon_mut(id)) {
            weapon.start_fire(ctx);
        }
    }

    pub fn stop_weapon_fire(&mut self, ctx: &mut WeaponCtx<'_>) {
        if !self.wants_to_fire {
            return;
        }
        self.wants_to_fire = false;
        ctx.owner = self.owner;
        if let Some(weapon) = self.current.and_then(|id| self.weapon_mut(id)) {
            weapon.stop_fire(ctx);
        }
    }

    pub fn reload(&mut self, ctx: &mut WeaponCtx<'_>) {
        ctx.owner = self.owner;
        if let Some(weapon) = self.current.and_then(|id| self.weapon_mut(id)) {
            weapon.start_reload(false, ctx);
        }
    }

    /// Authority only. Returns the rounds actually added.
    pub fn give_ammo(&mut self, id: WeaponId, amount: u32, ctx: &mut WeaponCtx<'_>) -> u32 {
        let is_current = self.current == Some(id);
        ctx.owner = self.owner;
        match self.weapon_mut(id) {
            Some(weapon) => weapon.give_ammo(amount, is_current, ctx),
            None => {
                log::debug!("cannot give ammo to {id}: not in inventory");
                0
            }
        }
    }

    pub fn tick(&mut self, ctx: &mut WeaponCtx<'_>) {
        ctx.owner = self.owner;
        for weapon in &mut self.weapons {
            weapon.tick(ctx);
        }

        let dt = self.last_tick.map_or(0.0, |last| (ctx.now - last).max(0.0));
        self.last_tick = Some(ctx.now);
        self.projectiles.retain(|projectile| !projectile.has_exploded());
        for projectile in &mut self.projectiles {
            projectile.coast(dt, ctx.world);
        }
        self.projectiles.retain(|projectile| !projectile.is_expired());
    }

    /// Entry point for calls arriving from the peer. Calls for unknown
    /// weapons, or arriving at the wrong side, are dropped.
    pub fn handle_remote_call(&mut self, call: &RemoteCall, ctx: &mut WeaponCtx<'_>) {
        let id = call.weapon();
        if !self.contains(id) {
            log::debug!("dropping {call:?}: {id} not in inventory of {}", self.owner.actor);
            return;
        }

        let authority = self.owner.is_authority();
        let allowed = if call.is_client_bound() {
            !authority && self.owner.locally_controlled
        } else {
            authority
        };
        if !allowed {
            log::debug!("dropping {call:?} on {:?}", self.owner.role);
            return;
        }

        if let RemoteCall::EquipWeapon { weapon } = call {
            self.equip_weapon(*weapon, ctx);
            return;
        }

        ctx.owner = self.owner;
        let Some(weapon) = self.weapon_mut(id) else {
            return;
        };

        match call {
            RemoteCall::StartFire { .. } => weapon.start_fire(ctx),
            RemoteCall::StopFire { .. } => weapon.stop_fire(ctx),
            RemoteCall::StartReload { .. } | RemoteCall::ClientStartReload { .. } => {
                weapon.start_reload(false, ctx)
            }
            RemoteCall::StopReload { .. } => weapon.stop_reload(ctx),
            RemoteCall::HandleFiring { .. } => weapon.server_handle_firing(ctx),
            RemoteCall::NotifyHit {
                impact,
                shoot_dir,
                seed,
                spread,
                ..
            } => weapon.server_notify_hit(
                &TraceHit::from(impact),
                Vec3::from(*shoot_dir),
                *seed,
                *spread,
                ctx,
            ),
            RemoteCall::NotifyMiss {
                shoot_dir,
                seed,
                spread,
                ..
            } => weapon.server_notify_miss(Vec3::from(*shoot_dir), *seed, *spread, ctx),
            RemoteCall::FireProjectile {
                origin, direction, ..
            } => weapon.server_fire_projectile(Vec3::from(*origin), Vec3::from(*direction), ctx),
            RemoteCall::EquipWeapon { .. } => {}
        }
    }

    /// Applies one replicated field on a non-authority copy.
    pub fn apply_update(&mut self, update: &FieldUpdate, arsenal: &Arsenal, ctx: &mut WeaponCtx<'_>) {
        if self.owner.is_authority() {
            log::debug!("authority ignores replicated {:?}", update.key());
            return;
        }
        ctx.owner = self.owner;

        match update {
            FieldUpdate::Inventory { weapons } => self.apply_inventory_list(weapons, arsenal, ctx),
            FieldUpdate::CurrentWeapon { weapon } => {
                self.on_rep_current_weapon(weapon.as_ref(), arsenal, ctx)
            }
            FieldUpdate::BurstCounter { weapon, value } => {
                if let Some(weapon) = self.weapon_mut(*weapon) {
                    weapon.apply_burst_counter(*value, ctx);
                }
            }
            FieldUpdate::PendingReload { weapon, pending } => {
                if let Some(weapon) = self.weapon_mut(*weapon) {
                    weapon.apply_pending_reload(*pending, ctx);
                }
            }
            FieldUpdate::HitNotify { weapon, record } => {
                if let Some(weapon) = self.weapon_mut(*weapon) {
                    weapon.apply_hit_notify(*record, ctx);
                }
            }
            FieldUpdate::Ammo {
                weapon,
                total,
                clip,
            } => {
                if let Some(weapon) = self.weapon_mut(*weapon) {
                    weapon.apply_authoritative_ammo(*total, *clip, ctx);
                }
            }
            FieldUpdate::TakeHit { target, info } => ctx.fx.take_hit(*target, info),
            FieldUpdate::Projectile {
                projectile,
                weapon,
                position,
                velocity,
                exploded,
            } => self.apply_projectile(
                *projectile,
                *weapon,
                Vec3::from(*position),
                Vec3::from(*velocity),
                *exploded,
                ctx,
            ),
        }
    }

    /// Spawns a coasting copy the first time a projectile is announced and
    /// plays its explosion when the authority reports one.
    fn apply_projectile(
        &mut self,
        id: EntityId,
        weapon: WeaponId,
        position: Vec3,
        velocity: Vec3,
        exploded: bool,
        ctx: &mut WeaponCtx<'_>,
    ) {
        let index = match self.projectiles.iter().position(|projectile| projectile.id() == id) {
            Some(index) => index,
            None => {
                let spawn = ProjectileSpawn {
                    weapon,
                    instigator: self.owner.actor,
                    origin: position,
                    direction: velocity,
                    config: self.projectile_config(weapon),
                };
                self.projectiles.push(Projectile::new(id, &spawn));
                self.projectiles.len() - 1
            }
        };

        if self.projectiles[index].apply_exploded(exploded, position) {
            ctx.fx.spawn_explosion(id, position);
        }
    }

    fn projectile_config(&self, weapon: WeaponId) -> ProjectileConfig {
        match self.weapon(weapon).map(WeaponInstance::strategy) {
            Some(HitStrategy::Projectile(hit)) => hit.config().clone(),
            _ => {
                log::debug!("no projectile settings for {weapon}, using defaults");
                ProjectileConfig::default()
            }
        }
    }

    pub fn on_rep_current_weapon(
        &mut self,
        entry: Option<&InventoryEntry>,
        arsenal: &Arsenal,
        ctx: &mut WeaponCtx<'_>,
    ) {
        let new = match entry {
            Some(entry) if self.ensure_weapon(entry, arsenal) => Some(entry.weapon),
            Some(_) => return,
            None => None,
        };
        let last = self.current;
        self.set_current_weapon(new, last, ctx);
    }

    pub fn apply_inventory_list(
        &mut self,
        entries: &[InventoryEntry],
        arsenal: &Arsenal,
        ctx: &mut WeaponCtx<'_>,
    ) {
        let stale: Vec<WeaponId> = self
            .weapons
            .iter()
            .map(WeaponInstance::id)
            .filter(|id| !entries.iter().any(|entry| entry.weapon == *id))
            .collect();
        for id in stale {
            self.take_weapon(id, ctx);
        }

        for entry in entries {
            self.ensure_weapon(entry, arsenal);
        }

        self.weapons.sort_by_key(|weapon| {
            entries
                .iter()
                .position(|entry| entry.weapon == weapon.id())
                .unwrap_or(usize::MAX)
        });
    }

    fn ensure_weapon(&mut self, entry: &InventoryEntry, arsenal: &Arsenal) -> bool {
        if self.contains(entry.weapon) {
            return true;
        }
        match arsenal.get(&entry.config_key) {
            Ok(config) => self.insert_weapon(WeaponInstance::new(
                entry.weapon,
                entry.config_key.clone(),
                config.clone(),
            )),
            Err(err) => {
                log::debug!("cannot materialize {}: {err}", entry.weapon);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::EntityId;
    use crate::net::ImpactRecord;
    use crate::services::SpatialQuery;
    use crate::testing::{FxCall, Rig, launcher, rifle};

    fn arsenal() -> Arsenal {
        let mut arsenal = Arsenal::new();
        arsenal.insert("rifle", rifle()).unwrap();
        arsenal.insert("launcher", launcher()).unwrap();
        arsenal
    }

    fn stocked(owner: OwnerView, rig: &mut Rig, now: f32) -> InventoryRegistry {
        let mut inventory = InventoryRegistry::new(owner);
        let mut ids = WeaponIdAllocator::default();
        inventory
            .spawn_default_inventory(&arsenal(), &["rifle", "launcher"], &mut ids, &mut rig.ctx(now, owner))
            .unwrap();
        inventory
    }

    #[test]
    fn test_default_inventory_equips_first_weapon() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let inventory = stocked(owner, &mut rig, 0.0);

        assert_eq!(inventory.len(), 2);
        assert_eq!(inventory.current_weapon_id(), Some(WeaponId(1)));
        assert_eq!(inventory.find_weapon("launcher"), Some(WeaponId(2)));
        let current = inventory.current_weapon().unwrap();
        assert!(current.is_equipped());
        assert_eq!(current.state(), WeaponState::Idle);
    }

    #[test]
    fn test_unknown_loadout_key_fails() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut inventory = InventoryRegistry::new(owner);
        let mut ids = WeaponIdAllocator::default();
        let err = inventory
            .spawn_default_inventory(&arsenal(), &["railgun"], &mut ids, &mut rig.ctx(0.0, owner))
            .unwrap_err();
        assert_eq!(err, ConfigError::UnknownConfig("railgun".to_string()));
    }

    #[test]
    fn test_membership_changes_are_authority_only() {
        let mut rig = Rig::new();
        let client = OwnerView::owning_client(EntityId(1));
        let mut inventory = InventoryRegistry::new(client);

        assert!(!inventory.add_weapon(WeaponInstance::new(WeaponId(1), "rifle", rifle())));
        assert!(inventory.is_empty());

        let server = OwnerView::dedicated_server(EntityId(1));
        let mut inventory = InventoryRegistry::new(server);
        assert!(inventory.add_weapon(WeaponInstance::new(WeaponId(1), "rifle", rifle())));
        assert!(!inventory.add_weapon(WeaponInstance::new(WeaponId(1), "rifle", rifle())));
        assert!(inventory.weapon(WeaponId(1)).unwrap().is_in_inventory());

        let removed = inventory.remove_weapon(WeaponId(1), &mut rig.ctx(0.0, server)).unwrap();
        assert!(!removed.is_in_inventory());
        assert!(inventory.remove_weapon(WeaponId(1), &mut rig.ctx(0.0, server)).is_none());
    }

    #[test]
    fn test_removing_current_weapon_leaves_none_current() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut inventory = stocked(owner, &mut rig, 0.0);

        let removed = inventory.remove_weapon(WeaponId(1), &mut rig.ctx(1.0, owner)).unwrap();
        assert!(!removed.is_equipped());
        assert!(!removed.is_attached());
        assert_eq!(inventory.current_weapon_id(), None);
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn test_next_and_previous_cycle_once_equipped() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut inventory = stocked(owner, &mut rig, 0.0);

        inventory.next_weapon(&mut rig.ctx(1.0, owner));
        assert_eq!(inventory.current_weapon_id(), Some(WeaponId(2)));
        assert_eq!(inventory.current_weapon().unwrap().state(), WeaponState::Equipping);
        assert!(!inventory.weapon(WeaponId(1)).unwrap().is_attached());

        inventory.next_weapon(&mut rig.ctx(1.1, owner));
        assert_eq!(inventory.current_weapon_id(), Some(WeaponId(2)));

        inventory.tick(&mut rig.ctx(1.6, owner));
        assert_eq!(inventory.current_weapon().unwrap().state(), WeaponState::Idle);

        inventory.next_weapon(&mut rig.ctx(2.0, owner));
        assert_eq!(inventory.current_weapon_id(), Some(WeaponId(1)));
        inventory.tick(&mut rig.ctx(2.6, owner));

        inventory.previous_weapon(&mut rig.ctx(3.0, owner));
        assert_eq!(inventory.current_weapon_id(), Some(WeaponId(2)));
    }

    #[test]
    fn test_cycling_without_current_picks_an_end() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut inventory = InventoryRegistry::new(owner);
        for (id, key, config) in [(1, "rifle", rifle()), (2, "launcher", launcher()), (3, "rifle", rifle())] {
            inventory.add_weapon(WeaponInstance::new(WeaponId(id), key, config));
        }

        inventory.previous_weapon(&mut rig.ctx(0.0, owner));
        assert_eq!(inventory.current_weapon_id(), Some(WeaponId(3)));

        let mut inventory = InventoryRegistry::new(owner);
        inventory.add_weapon(WeaponInstance::new(WeaponId(1), "rifle", rifle()));
        inventory.add_weapon(WeaponInstance::new(WeaponId(2), "launcher", launcher()));
        inventory.next_weapon(&mut rig.ctx(0.0, owner));
        assert_eq!(inventory.current_weapon_id(), Some(WeaponId(1)));
    }

    #[test]
    fn test_single_weapon_does_not_cycle() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut inventory = InventoryRegistry::new(owner);
        let mut ids = WeaponIdAllocator::default();
        inventory
            .spawn_default_inventory(&arsenal(), &["rifle"], &mut ids, &mut rig.ctx(0.0, owner))
            .unwrap();
        rig.fx.clear();

        inventory.next_weapon(&mut rig.ctx(1.0, owner));
        inventory.previous_weapon(&mut rig.ctx(1.0, owner));
        assert_eq!(inventory.current_weapon_id(), Some(WeaponId(1)));
        assert!(rig.fx.calls.is_empty());
    }

    #[test]
    fn test_client_equip_asks_authority() {
        let mut rig = Rig::new();
        let client = OwnerView::owning_client(EntityId(1));
        let mut inventory = InventoryRegistry::new(client);
        let entries = vec![
            InventoryEntry { weapon: WeaponId(4), config_key: "rifle".to_string() },
            InventoryEntry { weapon: WeaponId(5), config_key: "launcher".to_string() },
        ];
        inventory.apply_update(&FieldUpdate::Inventory { weapons: entries }, &arsenal(), &mut rig.ctx(0.0, client));
        assert_eq!(inventory.len(), 2);

        inventory.equip_weapon(WeaponId(5), &mut rig.ctx(0.1, client));
        assert_eq!(rig.outbox.calls(), &[RemoteCall::EquipWeapon { weapon: WeaponId(5) }]);
        assert_eq!(inventory.current_weapon_id(), None);

        let current = FieldUpdate::CurrentWeapon {
            weapon: Some(InventoryEntry { weapon: WeaponId(5), config_key: "launcher".to_string() }),
        };
        inventory.apply_update(&current, &arsenal(), &mut rig.ctx(0.2, client));
        assert_eq!(inventory.current_weapon_id(), Some(WeaponId(5)));
        assert!(inventory.current_weapon().unwrap().is_equipped());
    }

    #[test]
    fn test_inventory_list_drops_stale_weapons_and_keeps_order() {
        let mut rig = Rig::new();
        let client = OwnerView::owning_client(EntityId(1));
        let mut inventory = InventoryRegistry::new(client);
        let entry = |id: u32, key: &str| InventoryEntry { weapon: WeaponId(id), config_key: key.to_string() };

        let first = FieldUpdate::Inventory { weapons: vec![entry(1, "rifle"), entry(2, "launcher")] };
        inventory.apply_update(&first, &arsenal(), &mut rig.ctx(0.0, client));

        let second = FieldUpdate::Inventory {
            weapons: vec![entry(3, "rifle"), entry(2, "launcher"), entry(9, "railgun")],
        };
        inventory.apply_update(&second, &arsenal(), &mut rig.ctx(1.0, client));

        let ids: Vec<WeaponId> = inventory.weapons().iter().map(WeaponInstance::id).collect();
        assert_eq!(ids, vec![WeaponId(3), WeaponId(2)]);
    }

    #[test]
    fn test_observer_materializes_current_weapon() {
        let mut rig = Rig::new();
        let observer = OwnerView::observer(EntityId(1));
        let mut inventory = InventoryRegistry::new(observer);
        let current = FieldUpdate::CurrentWeapon {
            weapon: Some(InventoryEntry { weapon: WeaponId(7), config_key: "rifle".to_string() }),
        };

        inventory.apply_update(&current, &arsenal(), &mut rig.ctx(0.0, observer));
        assert_eq!(inventory.current_weapon_id(), Some(WeaponId(7)));
        assert!(inventory.current_weapon().unwrap().is_attached());

        inventory.apply_update(&FieldUpdate::CurrentWeapon { weapon: None }, &arsenal(), &mut rig.ctx(1.0, observer));
        assert_eq!(inventory.current_weapon_id(), None);
        assert!(!inventory.weapon(WeaponId(7)).unwrap().is_attached());
    }

    #[test]
    fn test_authority_ignores_replicated_fields() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut inventory = stocked(owner, &mut rig, 0.0);
        let update = FieldUpdate::Ammo { weapon: WeaponId(1), total: 0, clip: 0 };

        inventory.apply_update(&update, &arsenal(), &mut rig.ctx(1.0, owner));
        assert_eq!(inventory.weapon(WeaponId(1)).unwrap().ledger().current_ammo(), 60);
    }

    #[test]
    fn test_remote_calls_for_wrong_side_or_unknown_weapon_are_dropped() {
        let mut rig = Rig::new();
        let server = OwnerView::dedicated_server(EntityId(1));
        let mut inventory = stocked(server, &mut rig, 0.0);

        inventory.handle_remote_call(&RemoteCall::StartFire { weapon: WeaponId(42) }, &mut rig.ctx(0.5, server));
        inventory.handle_remote_call(&RemoteCall::ClientStartReload { weapon: WeaponId(1) }, &mut rig.ctx(0.5, server));
        let rifle = inventory.weapon(WeaponId(1)).unwrap();
        assert_eq!(rifle.state(), WeaponState::Idle);
        assert!(!rifle.is_pending_reload());

        let client = OwnerView::owning_client(EntityId(1));
        let mut mirror = InventoryRegistry::new(client);
        mirror.apply_update(
            &FieldUpdate::Inventory {
                weapons: vec![InventoryEntry { weapon: WeaponId(1), config_key: "rifle".to_string() }],
            },
            &arsenal(),
            &mut rig.ctx(0.5, client),
        );
        mirror.handle_remote_call(&RemoteCall::HandleFiring { weapon: WeaponId(1) }, &mut rig.ctx(0.6, client));
        assert_eq!(mirror.weapon(WeaponId(1)).unwrap().ledger().current_ammo(), 60);
    }

    #[test]
    fn test_server_honours_client_start_fire() {
        let mut rig = Rig::new();
        let server = OwnerView::dedicated_server(EntityId(1));
        let mut inventory = stocked(server, &mut rig, 0.0);

        inventory.handle_remote_call(&RemoteCall::StartFire { weapon: WeaponId(1) }, &mut rig.ctx(1.0, server));
        inventory.handle_remote_call(&RemoteCall::HandleFiring { weapon: WeaponId(1) }, &mut rig.ctx(1.0, server));

        let rifle = inventory.weapon(WeaponId(1)).unwrap();
        assert_eq!(rifle.state(), WeaponState::Firing);
        assert_eq!(rifle.ledger().current_ammo_in_clip(), 29);
        assert_eq!(rifle.burst_counter(), 1);
    }

    #[test]
    fn test_claimed_hit_outside_target_bounds_deals_no_damage() {
        let mut rig = Rig::new();
        rig.world.add_target(EntityId(2), Vec3::new(0.0, 0.0, -10.0), Vec3::splat(0.5));
        let server = OwnerView::dedicated_server(EntityId(1));
        let mut inventory = stocked(server, &mut rig, 0.0);
        inventory.handle_remote_call(&RemoteCall::StartFire { weapon: WeaponId(1) }, &mut rig.ctx(1.0, server));

        let mut hit = rig.world.trace_ray(Vec3::ZERO, Vec3::new(0.0, 0.0, -20.0), None);
        assert_eq!(hit.entity, Some(EntityId(2)));
        hit.point = Vec3::new(3.0, 0.0, -10.0);
        let forged = RemoteCall::NotifyHit {
            weapon: WeaponId(1),
            impact: ImpactRecord::from(&hit),
            shoot_dir: [0.0, 0.0, -1.0],
            seed: 7,
            spread: 1.0,
        };
        inventory.handle_remote_call(&forged, &mut rig.ctx(1.05, server));
        assert_eq!(rig.damage.total_for(EntityId(2)), 0.0);

        hit.point = Vec3::new(0.2, 0.0, -9.5);
        let honest = RemoteCall::NotifyHit {
            weapon: WeaponId(1),
            impact: ImpactRecord::from(&hit),
            shoot_dir: [0.0, 0.0, -1.0],
            seed: 7,
            spread: 1.0,
        };
        inventory.handle_remote_call(&honest, &mut rig.ctx(1.1, server));
        assert!(rig.damage.total_for(EntityId(2)) > 0.0);
    }

    #[test]
    fn test_destroy_inventory_returns_every_weapon() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut inventory = stocked(owner, &mut rig, 0.0);

        let weapons = inventory.destroy_inventory(&mut rig.ctx(1.0, owner));
        assert_eq!(weapons.len(), 2);
        assert!(weapons.iter().all(|weapon| !weapon.is_in_inventory() && !weapon.is_attached()));
        assert!(inventory.is_empty());
        assert_eq!(inventory.current_weapon_id(), None);
    }

    #[test]
    fn test_ammo_grant_routes_to_named_weapon() {
        let mut rig = Rig::new();
        let owner = OwnerView::standalone(EntityId(1));
        let mut inventory = stocked(owner, &mut rig, 0.0);

        assert_eq!(inventory.give_ammo(WeaponId(2), 100, &mut rig.ctx(1.0, owner)), 8);
        assert_eq!(inventory.give_ammo(WeaponId(42), 100, &mut rig.ctx(1.0, owner)), 0);
    }

    #[test]
    fn test_observer_copy_coasts_and_explodes_once() {
        let mut rig = Rig::new();
        let observer = OwnerView::observer(EntityId(1));
        let mut inventory = InventoryRegistry::new(observer);
        let current = FieldUpdate::CurrentWeapon {
            weapon: Some(InventoryEntry { weapon: WeaponId(5), config_key: "launcher".to_string() }),
        };
        inventory.apply_update(&current, &arsenal(), &mut rig.ctx(0.0, observer));

        let spawned = FieldUpdate::Projectile {
            projectile: EntityId(1000),
            weapon: WeaponId(5),
            position: [0.0, 1.0, 0.0],
            velocity: [0.0, 0.0, -20.0],
            exploded: false,
        };
        inventory.apply_update(&spawned, &arsenal(), &mut rig.ctx(0.0, observer));
        inventory.tick(&mut rig.ctx(0.0, observer));
        inventory.tick(&mut rig.ctx(0.5, observer));
        let copy = &inventory.projectiles()[0];
        assert!((copy.position().z + 10.0).abs() < 1e-4);
        assert!(!copy.has_exploded());

        let exploded = FieldUpdate::Projectile {
            projectile: EntityId(1000),
            weapon: WeaponId(5),
            position: [0.0, 1.0, -12.0],
            velocity: [0.0; 3],
            exploded: true,
        };
        inventory.apply_update(&exploded, &arsenal(), &mut rig.ctx(0.6, observer));
        inventory.apply_update(&exploded, &arsenal(), &mut rig.ctx(0.6, observer));
        let explosions: Vec<&FxCall> =
            rig.fx.calls.iter().filter(|call| matches!(call, FxCall::Explosion(..))).collect();
        assert_eq!(explosions, vec![&FxCall::Explosion(EntityId(1000), Vec3::new(0.0, 1.0, -12.0))]);

        inventory.tick(&mut rig.ctx(0.7, observer));
        assert!(inventory.projectiles().is_empty());
    }

    #[test]
    fn test_authority_ignores_projectile_updates() {
        let mut rig = Rig::new();
        let server = OwnerView::dedicated_server(EntityId(1));
        let mut inventory = InventoryRegistry::new(server);
        let update = FieldUpdate::Projectile {
            projectile: EntityId(1000),
            weapon: WeaponId(5),
            position: [0.0; 3],
            velocity: [0.0, 0.0, -20.0],
            exploded: true,
        };
        inventory.apply_update(&update, &arsenal(), &mut rig.ctx(0.0, server));
        assert!(inventory.projectiles().is_empty());
        assert!(rig.fx.calls.is_empty());
    }
}
