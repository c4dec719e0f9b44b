//! Ammo bookkeeping for a single weapon instance.
//!
//! The ledger only ever moves between valid states:
//! `0 <= clip <= clip_size` and `clip <= total <= max_ammo`.
//! None of the operations fail; callers check eligibility first.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AmmoKind {
    #[default]
    Bullet,
    Rocket,
    Laser,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmmoConfig {
    pub kind: AmmoKind,
    pub max_ammo: u32,
    pub clip_size: u32,
    pub initial_clips: u32,
    pub ammo_per_shot: u32,
    /// Seconds between two consecutive shots.
    pub time_between_shots: f32,
    /// Reload length used when the reload animation reports no duration.
    pub no_anim_reload_duration: f32,
    pub infinite_ammo: bool,
    pub infinite_clip: bool,
}

impl Default for AmmoConfig {
    fn default() -> Self {
        Self {
            kind: AmmoKind::Bullet,
            max_ammo: 100,
            clip_size: 20,
            initial_clips: 4,
            ammo_per_shot: 1,
            time_between_shots: 0.2,
            no_anim_reload_duration: 1.0,
            infinite_ammo: false,
            infinite_clip: false,
        }
    }
}

/// Infinite ammo/clip switches, merged from weapon data and owner cheats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cheats {
    pub infinite_ammo: bool,
    pub infinite_clip: bool,
}

impl Cheats {
    pub fn any(&self) -> bool {
        self.infinite_ammo || self.infinite_clip
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AmmoLedger {
    current_ammo: u32,
    current_ammo_in_clip: u32,
}

impl AmmoLedger {
    pub fn new(config: &AmmoConfig) -> Self {
        if config.initial_clips == 0 {
            return Self::default();
        }

        let total = config
            .clip_size
            .saturating_mul(config.initial_clips)
            .min(config.max_ammo);
        Self {
            current_ammo: total,
            current_ammo_in_clip: config.clip_size.min(total),
        }
    }

    /// Rebuilds a ledger from authoritative values, clamping anything a
    /// misbehaving peer could send outside the bounds.
    pub fn from_parts(config: &AmmoConfig, total: u32, clip: u32) -> Self {
        let current_ammo = total.min(config.max_ammo);
        Self {
            current_ammo,
            current_ammo_in_clip: clip.min(config.clip_size).min(current_ammo),
        }
    }

    pub fn current_ammo(&self) -> u32 {
        self.current_ammo
    }

    pub fn current_ammo_in_clip(&self) -> u32 {
        self.current_ammo_in_clip
    }

    pub fn reserve(&self) -> u32 {
        self.current_ammo - self.current_ammo_in_clip
    }

    pub fn is_clip_empty(&self) -> bool {
        self.current_ammo_in_clip == 0
    }

    /// Adds up to `amount` rounds without exceeding `max_ammo`. Returns the
    /// number of rounds actually added.
    pub fn give(&mut self, config: &AmmoConfig, amount: u32) -> u32 {
        let missing = config.max_ammo.saturating_sub(self.current_ammo);
        let added = amount.min(missing);
        self.current_ammo += added;
        added
    }

    pub fn consume(&mut self, config: &AmmoConfig, cheats: Cheats) {
        if cheats.infinite_ammo {
            return;
        }

        let cost = config.ammo_per_shot.max(1);
        if cheats.infinite_clip {
            self.current_ammo_in_clip = self.current_ammo_in_clip.saturating_sub(cost);
        } else {
            let spent = cost.min(self.current_ammo_in_clip);
            self.current_ammo_in_clip -= spent;
            self.current_ammo -= spent;
        }
    }

    /// Moves reserve rounds into the clip. Returns the clip delta.
    pub fn reload(&mut self, config: &AmmoConfig, cheats: Cheats) -> u32 {
        let space = config.clip_size.saturating_sub(self.current_ammo_in_clip);
        let delta = if cheats.infinite_clip {
            space
        } else {
            space.min(self.reserve())
        };

        self.current_ammo_in_clip += delta;

        if cheats.infinite_clip {
            self.current_ammo = self.current_ammo.max(self.current_ammo_in_clip);
        }

        delta
    }

    /// Ammo half of the reload eligibility check: the clip has room and there
    /// is something to put in it.
    pub fn has_reload_material(&self, config: &AmmoConfig, cheats: Cheats) -> bool {
        self.current_ammo_in_clip < config.clip_size && (self.reserve() > 0 || cheats.infinite_clip)
    }

    pub fn can_shoot(&self, cheats: Cheats) -> bool {
        self.current_ammo_in_clip > 0 || cheats.any()
    }
}
