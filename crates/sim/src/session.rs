use std::collections::VecDeque;
use std::fmt;

use anyhow::Result;
use glam::Vec3;

use armory::{
    Aim, Channel, EntityId, FieldTracker, FieldUpdate, InventoryRegistry, LinkStats, Outbox,
    OwnerView, Payload, ReplicationBridge, SimulatedLink, WeaponCtx, WeaponIdAllocator,
};

use crate::config::{Action, ScriptStep, SimConfig};
use crate::presentation::{FxTally, LogPresentation};
use crate::world::{Arena, TargetHealth};

const PLAYER: EntityId = EntityId(1);
const EYE: Vec3 = Vec3::new(0.0, 1.6, 0.0);
const MUZZLE_OFFSET: Vec3 = Vec3::new(0.2, -0.15, -0.4);

fn millis(now: f32) -> u64 {
    (now * 1000.0).round() as u64
}

/// One process: its inventory copy, its scene, and what it has received.
pub struct Peer {
    label: &'static str,
    inventory: InventoryRegistry,
    fx: LogPresentation,
    arena: Arena,
    outbox: Outbox,
    fields: FieldTracker,
}

impl Peer {
    fn new(label: &'static str, owner: OwnerView, config: &SimConfig) -> Self {
        let mut inventory = InventoryRegistry::new(owner);
        inventory.set_aim(
            Aim::new(EYE, Vec3::NEG_Z),
            Aim::new(EYE + MUZZLE_OFFSET, Vec3::NEG_Z),
        );
        Self {
            label,
            inventory,
            fx: LogPresentation::new(label, config.animations.clone()),
            arena: Arena::new(config),
            outbox: Outbox::new(),
            fields: FieldTracker::new(),
        }
    }

    pub fn inventory(&self) -> &InventoryRegistry {
        &self.inventory
    }

    pub fn tally(&self) -> FxTally {
        self.fx.tally()
    }

    fn split(&mut self, now: f32) -> (&mut InventoryRegistry, WeaponCtx<'_>) {
        let ctx = WeaponCtx {
            now,
            owner: *self.inventory.owner(),
            fx: &mut self.fx,
            world: &self.arena.physics,
            spawner: &mut self.arena.projectiles,
            damage: &mut self.arena.health,
            outbox: &mut self.outbox,
        };
        (&mut self.inventory, ctx)
    }

    fn tick(&mut self, now: f32, dt: f32) {
        let (inventory, mut ctx) = self.split(now);
        inventory.tick(&mut ctx);
        self.arena.step(dt, &mut self.fx);
    }

    fn receive(&mut self, channel: &mut Channel, now: f32, config: &SimConfig) {
        let label = self.label;
        for (sequence, payload) in channel.receive(millis(now)) {
            if let Payload::Update { update, .. } = &payload {
                if !self.fields.accept(update.key(), sequence) {
                    log::trace!("[{label}] stale {:?} ({sequence})", update.key());
                    continue;
                }
                if let FieldUpdate::TakeHit { target, info } = update {
                    if info.killed {
                        self.arena.health.mark_killed(*target);
                    }
                }
            }
            let (inventory, mut ctx) = self.split(now);
            match payload {
                Payload::Call { call, .. } => inventory.handle_remote_call(&call, &mut ctx),
                Payload::Update { update, .. } => {
                    inventory.apply_update(&update, &config.arsenal, &mut ctx)
                }
            }
        }
    }
}

/// Dedicated server, owning client, and one observer in lockstep, joined by
/// simulated links.
pub struct Session {
    config: SimConfig,
    server: Peer,
    client: Peer,
    observer: Peer,
    bridge: ReplicationBridge,
    up: Channel,
    down: Channel,
    watch: Channel,
    script: VecDeque<ScriptStep>,
    now: f32,
}

impl Session {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let mut server = Peer::new("server", OwnerView::dedicated_server(PLAYER), &config);
        let client = Peer::new("client", OwnerView::owning_client(PLAYER), &config);
        let observer = Peer::new("observer", OwnerView::observer(PLAYER), &config);

        let loadout: Vec<&str> = config.loadout.iter().map(String::as_str).collect();
        let mut ids = WeaponIdAllocator::default();
        let (inventory, mut ctx) = server.split(0.0);
        inventory.spawn_default_inventory(&config.arsenal, &loadout, &mut ids, &mut ctx)?;

        let link = |salt: u64| SimulatedLink::new(config.link.clone(), config.seed.wrapping_add(salt));
        let (up, down, watch) = (
            Channel::new(link(1)),
            Channel::new(link(2)),
            Channel::new(link(3)),
        );

        let mut script: Vec<ScriptStep> = config.script.clone();
        script.sort_by(|a, b| a.at.total_cmp(&b.at));

        Ok(Self {
            server,
            client,
            observer,
            bridge: ReplicationBridge::new(),
            up,
            down,
            watch,
            script: script.into(),
            now: 0.0,
            config,
        })
    }

    pub fn server(&self) -> &Peer {
        &self.server
    }

    pub fn client(&self) -> &Peer {
        &self.client
    }

    pub fn observer(&self) -> &Peer {
        &self.observer
    }

    pub fn run(&mut self) -> Result<SessionReport> {
        while self.now < self.config.duration {
            self.step()?;
        }
        Ok(self.report())
    }

    pub fn step(&mut self) -> Result<()> {
        let dt = self.config.tick_duration();
        self.now += dt;
        let now = self.now;
        let ms = millis(now);

        while self.script.front().is_some_and(|step| step.at <= now) {
            if let Some(step) = self.script.pop_front() {
                self.perform(&step.action);
            }
        }

        self.client.tick(now, dt);
        for call in self.client.outbox.drain().collect::<Vec<_>>() {
            self.up.send(ms, Payload::Call { actor: PLAYER, call })?;
        }

        self.server.receive(&mut self.up, now, &self.config);
        self.server.tick(now, dt);
        self.publish(ms)?;

        self.client.receive(&mut self.down, now, &self.config);
        self.observer.receive(&mut self.watch, now, &self.config);
        self.observer.tick(now, dt);
        Ok(())
    }

    fn perform(&mut self, action: &Action) {
        log::info!("t={:.2} client {action:?}", self.now);
        let (inventory, mut ctx) = self.client.split(self.now);
        match action {
            Action::StartFire => inventory.start_weapon_fire(&mut ctx),
            Action::StopFire => inventory.stop_weapon_fire(&mut ctx),
            Action::Reload => inventory.reload(&mut ctx),
            Action::NextWeapon => inventory.next_weapon(&mut ctx),
            Action::PreviousWeapon => inventory.previous_weapon(&mut ctx),
            Action::Equip(key) => match inventory.find_weapon(key) {
                Some(id) => inventory.equip_weapon(id, &mut ctx),
                None => log::warn!("client has no {key} to equip"),
            },
        }
    }

    /// Field updates go out before the server's calls so the client holds the
    /// latest ammo when a reload request lands.
    fn publish(&mut self, ms: u64) -> Result<()> {
        let mut updates = self.bridge.collect(&self.server.inventory);
        for (target, info) in self.server.arena.health.drain_hits() {
            updates.extend(self.bridge.collect_take_hit(target, &info));
        }
        updates.extend(self.bridge.collect_projectiles(self.server.arena.projectiles.announced()));

        for update in updates {
            let audience = update.audience();
            if audience.includes(true) {
                let payload = Payload::Update {
                    actor: PLAYER,
                    update: update.clone(),
                };
                self.down.send(ms, payload)?;
            }
            if audience.includes(false) {
                self.watch.send(ms, Payload::Update { actor: PLAYER, update })?;
            }
        }

        for call in self.server.outbox.drain().collect::<Vec<_>>() {
            self.down.send(ms, Payload::Call { actor: PLAYER, call })?;
        }
        Ok(())
    }

    pub fn report(&self) -> SessionReport {
        let weapons = self
            .server
            .inventory
            .weapons()
            .iter()
            .map(|weapon| {
                let ledger = |peer: &Peer| {
                    peer.inventory
                        .weapon(weapon.id())
                        .map(|w| (w.ledger().current_ammo(), w.ledger().current_ammo_in_clip()))
                };
                WeaponReport {
                    key: weapon.config_key().to_string(),
                    server: ledger(&self.server),
                    client: ledger(&self.client),
                }
            })
            .collect();

        SessionReport {
            elapsed: self.now,
            weapons,
            targets: self.server.arena.health.iter().collect(),
            projectiles: self.server.arena.projectiles.spawned(),
            links: [
                ("up", self.up.link().stats().clone()),
                ("down", self.down.link().stats().clone()),
                ("watch", self.watch.link().stats().clone()),
            ],
            fx: [
                ("client", self.client.tally()),
                ("observer", self.observer.tally()),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeaponReport {
    pub key: String,
    pub server: Option<(u32, u32)>,
    pub client: Option<(u32, u32)>,
}

impl WeaponReport {
    pub fn in_sync(&self) -> bool {
        self.server == self.client
    }
}

#[derive(Debug, Clone)]
pub struct SessionReport {
    pub elapsed: f32,
    pub weapons: Vec<WeaponReport>,
    pub targets: Vec<(EntityId, TargetHealth)>,
    pub projectiles: u32,
    pub links: [(&'static str, LinkStats); 3],
    pub fx: [(&'static str, FxTally); 2],
}

impl SessionReport {
    pub fn in_sync(&self) -> bool {
        self.weapons.iter().all(WeaponReport::in_sync)
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "session ran {:.2}s", self.elapsed)?;
        for weapon in &self.weapons {
            let show = |ammo: Option<(u32, u32)>| match ammo {
                Some((total, clip)) => format!("{clip}/{total}"),
                None => "-".to_string(),
            };
            writeln!(
                f,
                "  {:<10} server {:>8}  client {:>8}{}",
                weapon.key,
                show(weapon.server),
                show(weapon.client),
                if weapon.in_sync() { "" } else { "  (diverged)" }
            )?;
        }
        for (entity, target) in &self.targets {
            writeln!(
                f,
                "  {entity} health {:.0}/{:.0}",
                target.health, target.max_health
            )?;
        }
        writeln!(f, "  projectiles spawned {}", self.projectiles)?;
        for (name, stats) in &self.links {
            writeln!(
                f,
                "  link {name:<5} sent {} delivered {} dropped {} dup {} retx {}",
                stats.sent, stats.delivered, stats.dropped, stats.duplicated, stats.retransmitted
            )?;
        }
        for (peer, tally) in &self.fx {
            writeln!(
                f,
                "  {peer:<8} sounds {} muzzle {} trails {} impacts {} explosions {} hits seen {}",
                tally.sounds,
                tally.muzzle_effects,
                tally.trails,
                tally.impacts,
                tally.explosions,
                tally.hits_seen
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use armory::{LinkConditions, SpatialQuery, WeaponState};

    use super::*;
    use crate::config::TargetConfig;

    fn run(config: SimConfig) -> (Session, SessionReport) {
        let mut session = Session::new(config).unwrap();
        let report = session.run().unwrap();
        (session, report)
    }

    #[test]
    fn test_default_scenario_stays_in_sync() {
        let (session, report) = run(SimConfig::default());

        assert!(report.in_sync(), "{report}");
        assert_eq!(report.projectiles, 1);
        assert!(report.targets.iter().any(|(_, target)| target.health < target.max_health));
        assert!(report.fx[1].1.hits_seen > 0);
        for peer in [session.server(), session.client()] {
            let current = peer.inventory().current_weapon().unwrap();
            assert_eq!(current.config_key(), "rifle");
            assert_eq!(current.state(), WeaponState::Idle);
        }
    }

    #[test]
    fn test_lossy_link_converges() {
        let config = SimConfig {
            link: LinkConditions {
                loss_percent: 15.0,
                duplicate_percent: 5.0,
                min_latency_ms: 40,
                max_latency_ms: 90,
                jitter_ms: 20,
                ..Default::default()
            },
            ..Default::default()
        };
        let (_, report) = run(config);

        assert!(report.in_sync(), "{report}");
        assert!(report.links[1].1.retransmitted > 0);
    }

    #[test]
    fn test_rocket_explodes_once_on_every_peer() {
        let script = [
            (0.5, Action::Equip("launcher".to_string())),
            (2.0, Action::StartFire),
            (2.2, Action::StopFire),
        ];
        let config = SimConfig {
            duration: 5.0,
            script: script
                .into_iter()
                .map(|(at, action)| ScriptStep { at, action })
                .collect(),
            ..Default::default()
        };
        let (_, report) = run(config);

        assert_eq!(report.projectiles, 1);
        for (peer, tally) in &report.fx {
            assert_eq!(tally.explosions, 1, "{peer}");
        }
    }

    #[test]
    fn test_kills_clear_targets_on_every_peer() {
        let config = SimConfig {
            duration: 8.0,
            targets: vec![TargetConfig {
                health: 20.0,
                ..Default::default()
            }],
            ..Default::default()
        };
        let (session, report) = run(config);

        let (target, health) = report.targets[0];
        assert!(health.is_dead(), "{report}");
        for peer in [session.server(), session.client(), session.observer()] {
            assert!(peer.arena.physics.bounds_of(target).is_none(), "{}", peer.label);
            assert!(peer.arena.health.iter().all(|(_, health)| health.is_dead()));
        }
    }

    #[test]
    fn test_script_equips_by_key() {
        let config = SimConfig {
            duration: 2.0,
            script: vec![ScriptStep {
                at: 0.5,
                action: Action::Equip("launcher".to_string()),
            }],
            ..Default::default()
        };
        let (session, _) = run(config);
        for peer in [session.server(), session.client(), session.observer()] {
            assert_eq!(
                peer.inventory().current_weapon().map(|weapon| weapon.config_key()),
                Some("launcher")
            );
        }
    }
}
