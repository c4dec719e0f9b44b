mod config;
mod firing;
mod lifecycle;
mod state;

pub use config::{
    Arsenal, DEFAULT_EQUIP_DURATION, HitConfig, InstantConfig, PresentationConfig,
    ProjectileConfig, WeaponConfig,
};
pub use firing::REFIRE_EPSILON;
pub use state::{Intent, WeaponState, determine_state};

use crate::ammo::{AmmoLedger, Cheats};
use crate::handle::WeaponId;
use crate::hit::HitStrategy;
use crate::owner::OwnerView;
use crate::services::{EffectHandle, SoundHandle};
use crate::timer::TimerSet;

/// One weapon as seen by one process. Server, owning client, and observers
/// each hold their own copy and reconcile through replication.
#[derive(Debug, Clone)]
pub struct WeaponInstance {
    id: WeaponId,
    config_key: String,
    config: WeaponConfig,
    ledger: AmmoLedger,
    strategy: HitStrategy,
    state: WeaponState,
    intent: Intent,
    burst_counter: u32,
    last_fire_time: Option<f32>,
    timer_adjustment: f32,
    refire_slack: f32,
    equip_started: f32,
    equip_duration: f32,
    timers: TimerSet,
    in_inventory: bool,
    attached: bool,
    playing_fire_animation: bool,
    fire_sound: Option<SoundHandle>,
    muzzle_effect: Option<EffectHandle>,
}

impl WeaponInstance {
    pub fn new(id: WeaponId, config_key: impl Into<String>, config: WeaponConfig) -> Self {
        Self {
            id,
            config_key: config_key.into(),
            ledger: AmmoLedger::new(&config.ammo),
            strategy: HitStrategy::from_config(&config.hit),
            config,
            state: WeaponState::Idle,
            intent: Intent::empty(),
            burst_counter: 0,
            last_fire_time: None,
            timer_adjustment: 0.0,
            refire_slack: 0.0,
            equip_started: 0.0,
            equip_duration: 0.0,
            timers: TimerSet::new(),
            in_inventory: false,
            attached: false,
            playing_fire_animation: false,
            fire_sound: None,
            muzzle_effect: None,
        }
    }

    pub fn id(&self) -> WeaponId {
        self.id
    }

    pub fn config_key(&self) -> &str {
        &self.config_key
    }

    pub fn config(&self) -> &WeaponConfig {
        &self.config
    }

    pub fn ledger(&self) -> &AmmoLedger {
        &self.ledger
    }

    pub fn strategy(&self) -> &HitStrategy {
        &self.strategy
    }

    pub fn state(&self) -> WeaponState {
        self.state
    }

    pub fn intent(&self) -> Intent {
        self.intent
    }

    pub fn burst_counter(&self) -> u32 {
        self.burst_counter
    }

    pub fn last_fire_time(&self) -> Option<f32> {
        self.last_fire_time
    }

    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    pub fn is_equipped(&self) -> bool {
        self.intent.contains(Intent::EQUIPPED)
    }

    pub fn is_pending_reload(&self) -> bool {
        self.intent.contains(Intent::PENDING_RELOAD)
    }

    pub fn is_pending_equip(&self) -> bool {
        self.intent.contains(Intent::PENDING_EQUIP)
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn is_in_inventory(&self) -> bool {
        self.in_inventory
    }

    pub fn equip_started(&self) -> f32 {
        self.equip_started
    }

    pub fn equip_duration(&self) -> f32 {
        self.equip_duration
    }

    fn cheats(&self, owner: &OwnerView) -> Cheats {
        Cheats {
            infinite_ammo: self.config.ammo.infinite_ammo || owner.infinite_ammo,
            infinite_clip: self.config.ammo.infinite_clip || owner.infinite_clip,
        }
    }

    fn time_between_shots(&self) -> f32 {
        self.config.ammo.time_between_shots
    }

    fn reload_eligible_in(&self, state: WeaponState, owner: &OwnerView) -> bool {
        owner.reload_allowed
            && self.ledger.has_reload_material(&self.config.ammo, self.cheats(owner))
            && state.accepts_actions()
    }

    fn fire_eligible_in(&self, state: WeaponState, owner: &OwnerView) -> bool {
        owner.fire_allowed
            && self.in_inventory
            && state.accepts_actions()
            && !self.intent.contains(Intent::PENDING_RELOAD)
    }

    pub fn can_reload(&self, owner: &OwnerView) -> bool {
        self.reload_eligible_in(self.state, owner)
    }

    pub fn can_fire(&self, owner: &OwnerView) -> bool {
        self.fire_eligible_in(self.state, owner)
    }
}
