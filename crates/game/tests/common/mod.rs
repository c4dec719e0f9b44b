//! Three in-process peers (dedicated server, owning client, observer) joined
//! by simulated links.

#![allow(dead_code)]

use glam::Vec3;

use armory::testing::{Rig, launcher, rifle};
use armory::{
    Arsenal, Channel, EntityId, FieldTracker, InventoryRegistry, LinkConditions, OwnerView,
    Payload, Presentation, Projectile, ReplicationBridge, SimulatedLink, WeaponIdAllocator,
};

pub const ACTOR: EntityId = EntityId(1);
pub const TARGET: EntityId = EntityId(2);
pub const STEP: f32 = 0.02;

pub struct Peer {
    pub inventory: InventoryRegistry,
    pub rig: Rig,
    pub fields: FieldTracker,
}

impl Peer {
    fn new(owner: OwnerView) -> Self {
        let mut rig = Rig::new();
        rig.world
            .add_target(TARGET, Vec3::new(0.0, 0.0, -10.0), Vec3::splat(2.5));
        Self {
            inventory: InventoryRegistry::new(owner),
            rig,
            fields: FieldTracker::new(),
        }
    }

    fn tick(&mut self, now: f32) {
        let owner = *self.inventory.owner();
        self.inventory.tick(&mut self.rig.ctx(now, owner));
    }

    fn receive(&mut self, channel: &mut Channel, now: f32, arsenal: &Arsenal) {
        let owner = *self.inventory.owner();
        for (sequence, payload) in channel.receive(millis(now)) {
            let mut ctx = self.rig.ctx(now, owner);
            match payload {
                Payload::Call { call, .. } => self.inventory.handle_remote_call(&call, &mut ctx),
                Payload::Update { update, .. } => {
                    if self.fields.accept(update.key(), sequence) {
                        self.inventory.apply_update(&update, arsenal, &mut ctx);
                    }
                }
            }
        }
    }
}

fn millis(now: f32) -> u64 {
    (now * 1000.0).round() as u64
}

pub struct Session {
    pub arsenal: Arsenal,
    pub server: Peer,
    pub client: Peer,
    pub observer: Peer,
    pub now: f32,
    /// Every projectile the server spawned, kept after it explodes.
    pub projectiles: Vec<Projectile>,
    launched: usize,
    bridge: ReplicationBridge,
    up: Channel,
    down: Channel,
    watch: Channel,
}

impl Session {
    pub fn new() -> Self {
        Self::with_link(LinkConditions::perfect())
    }

    pub fn with_link(conditions: LinkConditions) -> Self {
        let mut arsenal = Arsenal::new();
        arsenal.insert("rifle", rifle()).unwrap();
        arsenal.insert("launcher", launcher()).unwrap();

        let mut server = Peer::new(OwnerView::dedicated_server(ACTOR));
        let owner = *server.inventory.owner();
        let mut ids = WeaponIdAllocator::default();
        server
            .inventory
            .spawn_default_inventory(
                &arsenal,
                &["rifle", "launcher"],
                &mut ids,
                &mut server.rig.ctx(0.0, owner),
            )
            .unwrap();

        Self {
            arsenal,
            server,
            client: Peer::new(OwnerView::owning_client(ACTOR)),
            observer: Peer::new(OwnerView::observer(ACTOR)),
            now: 0.0,
            projectiles: Vec::new(),
            launched: 0,
            bridge: ReplicationBridge::new(),
            up: Channel::new(SimulatedLink::new(conditions.clone(), 1)),
            down: Channel::new(SimulatedLink::new(conditions.clone(), 2)),
            watch: Channel::new(SimulatedLink::new(conditions, 3)),
        }
    }

    pub fn client_ctx<R>(&mut self, f: impl FnOnce(&mut InventoryRegistry, &mut armory::WeaponCtx<'_>) -> R) -> R {
        let owner = *self.client.inventory.owner();
        let mut ctx = self.client.rig.ctx(self.now, owner);
        f(&mut self.client.inventory, &mut ctx)
    }

    pub fn step(&mut self) {
        self.now += STEP;
        let now = self.now;

        self.client.tick(now);
        for call in self.client.rig.outbox.drain().collect::<Vec<_>>() {
            self.up
                .send(millis(now), Payload::Call { actor: ACTOR, call })
                .unwrap();
        }

        self.server.receive(&mut self.up, now, &self.arsenal);
        self.server.tick(now);
        self.fly_projectiles();

        // Field updates go out before calls so the client sees fresh ammo
        // before it is asked to reload.
        let mut updates = self.bridge.collect(&self.server.inventory);
        updates.extend(self.bridge.collect_projectiles(&self.projectiles));
        for update in updates {
            let audience = update.audience();
            if audience.includes(true) {
                self.down
                    .send(millis(now), Payload::Update { actor: ACTOR, update: update.clone() })
                    .unwrap();
            }
            if audience.includes(false) {
                self.watch
                    .send(millis(now), Payload::Update { actor: ACTOR, update })
                    .unwrap();
            }
        }
        for call in self.server.rig.outbox.drain().collect::<Vec<_>>() {
            self.down
                .send(millis(now), Payload::Call { actor: ACTOR, call })
                .unwrap();
        }

        self.client.receive(&mut self.down, now, &self.arsenal);
        self.observer.receive(&mut self.watch, now, &self.arsenal);
        self.observer.tick(now);
    }

    fn fly_projectiles(&mut self) {
        let rig = &mut self.server.rig;
        for (id, spawn) in &rig.spawner.spawns[self.launched..] {
            self.projectiles.push(Projectile::new(*id, spawn));
        }
        self.launched = rig.spawner.spawns.len();
        for projectile in &mut self.projectiles {
            if let Some(hit) = projectile.advance(STEP, &rig.world) {
                projectile.explode(&hit, &rig.world, &mut rig.damage);
                rig.fx.spawn_explosion(projectile.id(), hit.point);
            }
        }
    }

    pub fn run_until(&mut self, until: f32) {
        while self.now < until {
            self.step();
        }
    }

    pub fn start_fire(&mut self) {
        self.client_ctx(|inventory, ctx| inventory.start_weapon_fire(ctx));
    }

    pub fn stop_fire(&mut self) {
        self.client_ctx(|inventory, ctx| inventory.stop_weapon_fire(ctx));
    }
}
