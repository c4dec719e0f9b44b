use std::collections::BTreeMap;

use glam::Vec3;

use armory::{
    EffectHandle, EntityId, Presentation, SoundHandle, TakeHitInfo, TraceHit, WeaponEvent,
    WeaponId,
};

/// Counters for what one peer would have shown or played.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FxTally {
    pub sounds: u32,
    pub muzzle_effects: u32,
    pub trails: u32,
    pub impacts: u32,
    pub explosions: u32,
    pub hits_seen: u32,
}

/// Headless presentation: everything becomes a log line.
#[derive(Debug)]
pub struct LogPresentation {
    peer: &'static str,
    animations: BTreeMap<String, f32>,
    next_handle: u32,
    tally: FxTally,
}

impl LogPresentation {
    pub fn new(peer: &'static str, animations: BTreeMap<String, f32>) -> Self {
        Self {
            peer,
            animations,
            next_handle: 0,
            tally: FxTally::default(),
        }
    }

    pub fn tally(&self) -> FxTally {
        self.tally
    }

    fn handle(&mut self) -> u32 {
        self.next_handle = self.next_handle.wrapping_add(1);
        self.next_handle
    }
}

impl Presentation for LogPresentation {
    fn play_animation(&mut self, weapon: WeaponId, animation: &str) -> f32 {
        let length = self.animations.get(animation).copied().unwrap_or(0.0);
        log::trace!("[{}] {weapon} animation {animation} ({length:.2}s)", self.peer);
        length
    }

    fn stop_animation(&mut self, weapon: WeaponId, animation: &str) {
        log::trace!("[{}] {weapon} stop animation {animation}", self.peer);
    }

    fn play_sound(&mut self, weapon: WeaponId, sound: &str) -> Option<SoundHandle> {
        self.tally.sounds += 1;
        log::trace!("[{}] {weapon} sound {sound}", self.peer);
        Some(SoundHandle(self.handle()))
    }

    fn spawn_muzzle_effect(&mut self, weapon: WeaponId, effect: &str) -> Option<EffectHandle> {
        self.tally.muzzle_effects += 1;
        log::trace!("[{}] {weapon} muzzle {effect}", self.peer);
        Some(EffectHandle(self.handle()))
    }

    fn spawn_trail(&mut self, weapon: WeaponId, from: Vec3, to: Vec3) {
        self.tally.trails += 1;
        log::trace!("[{}] {weapon} trail {from} -> {to}", self.peer);
    }

    fn spawn_impact(&mut self, weapon: WeaponId, hit: &TraceHit) {
        self.tally.impacts += 1;
        log::debug!(
            "[{}] {weapon} impact on {:?} at {}",
            self.peer,
            hit.surface,
            hit.point
        );
    }

    fn spawn_explosion(&mut self, projectile: EntityId, at: Vec3) {
        self.tally.explosions += 1;
        log::debug!("[{}] projectile {projectile} exploded at {at}", self.peer);
    }

    fn take_hit(&mut self, target: EntityId, info: &TakeHitInfo) {
        self.tally.hits_seen += 1;
        log::debug!(
            "[{}] {target} took {:.1} {:?} damage{}",
            self.peer,
            info.actual_damage,
            info.damage_type,
            if info.killed { " (killed)" } else { "" }
        );
    }

    fn notify(&mut self, event: WeaponEvent) {
        match event {
            WeaponEvent::AmmoChanged { .. } => log::trace!("[{}] {event:?}", self.peer),
            _ => log::debug!("[{}] {event:?}", self.peer),
        }
    }
}
