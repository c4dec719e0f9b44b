use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use armory::{
    AmmoConfig, AmmoKind, Arsenal, HitConfig, InstantConfig, LinkConditions, PresentationConfig,
    ProjectileConfig, SurfaceKind, WeaponConfig,
};

/// Automatic hitscan rifle used when no arsenal file is given.
fn stock_rifle() -> WeaponConfig {
    WeaponConfig {
        name: "rifle".to_string(),
        ammo: AmmoConfig {
            max_ammo: 120,
            clip_size: 30,
            initial_clips: 2,
            time_between_shots: 0.2,
            no_anim_reload_duration: 1.5,
            ..Default::default()
        },
        allow_automatic_catchup: true,
        presentation: PresentationConfig {
            fire_animation: Some("rifle_fire".to_string()),
            reload_animation: Some("rifle_reload".to_string()),
            equip_animation: Some("rifle_equip".to_string()),
            fire_loop_sound: Some("rifle_loop".to_string()),
            fire_finish_sound: Some("rifle_tail".to_string()),
            looped_fire_sound: true,
            out_of_ammo_sound: Some("dry_fire".to_string()),
            reload_sound: Some("rifle_reload".to_string()),
            equip_sound: Some("rifle_equip".to_string()),
            muzzle_effect: Some("rifle_flash".to_string()),
            looped_muzzle_effect: true,
            ..Default::default()
        },
        hit: HitConfig::Instant(InstantConfig::default()),
    }
}

fn stock_launcher() -> WeaponConfig {
    WeaponConfig {
        name: "launcher".to_string(),
        ammo: AmmoConfig {
            max_ammo: 12,
            clip_size: 1,
            initial_clips: 4,
            time_between_shots: 0.8,
            no_anim_reload_duration: 1.0,
            kind: AmmoKind::Rocket,
            ..Default::default()
        },
        allow_automatic_catchup: false,
        presentation: PresentationConfig {
            fire_sound: Some("launcher_fire".to_string()),
            ..Default::default()
        },
        hit: HitConfig::Projectile(ProjectileConfig::default()),
    }
}

/// A timed input from the owning player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Action {
    StartFire,
    StopFire,
    Reload,
    NextWeapon,
    PreviousWeapon,
    Equip(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub at: f32,
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
    pub health: f32,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 1.0, -15.0],
            half_extents: [0.5, 1.0, 0.5],
            health: 100.0,
        }
    }
}

/// Static cover; blocks traces and rockets but takes no damage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallConfig {
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
    #[serde(default)]
    pub surface: SurfaceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick_rate: u32,
    pub duration: f32,
    pub seed: u64,
    pub arsenal: Arsenal,
    pub loadout: Vec<String>,
    /// Animation lengths in seconds; anything missing reports zero.
    pub animations: BTreeMap<String, f32>,
    pub link: LinkConditions,
    pub targets: Vec<TargetConfig>,
    pub walls: Vec<WallConfig>,
    pub script: Vec<ScriptStep>,
}

impl Default for SimConfig {
    fn default() -> Self {
        let mut arsenal = Arsenal::new();
        let mut loadout = Vec::new();
        for (key, config) in [("rifle", stock_rifle()), ("launcher", stock_launcher())] {
            // Built-in configs are known good.
            if arsenal.insert(key, config).is_ok() {
                loadout.push(key.to_string());
            }
        }

        let animations = BTreeMap::from([
            ("rifle_reload".to_string(), 1.8),
            ("rifle_equip".to_string(), 0.6),
        ]);

        let script = [
            (0.5, Action::StartFire),
            (2.5, Action::StopFire),
            (3.0, Action::Reload),
            (5.0, Action::NextWeapon),
            (6.0, Action::StartFire),
            (6.3, Action::StopFire),
            (8.5, Action::PreviousWeapon),
            (9.5, Action::StartFire),
            (17.0, Action::StopFire),
        ]
        .into_iter()
        .map(|(at, action)| ScriptStep { at, action })
        .collect();

        Self {
            tick_rate: 60,
            duration: 20.0,
            seed: 7,
            arsenal,
            loadout,
            animations,
            link: LinkConditions::default(),
            targets: vec![
                TargetConfig::default(),
                TargetConfig {
                    position: [3.0, 1.0, -25.0],
                    ..Default::default()
                },
            ],
            walls: vec![WallConfig {
                position: [3.0, 1.0, -20.0],
                half_extents: [1.5, 1.0, 0.2],
                surface: SurfaceKind::Concrete,
            }],
            script,
        }
    }
}

impl SimConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: SimConfig =
            ron::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Swaps in weapon definitions from a standalone RON arsenal file.
    pub fn load_arsenal(&mut self, path: &Path) -> Result<()> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let arsenal: Arsenal =
            ron::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
        arsenal.validate()?;
        self.arsenal = arsenal;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.arsenal.validate()?;
        if self.tick_rate == 0 {
            bail!("tick_rate must be positive");
        }
        if self.loadout.is_empty() {
            bail!("loadout is empty");
        }
        for key in &self.loadout {
            self.arsenal.get(key)?;
        }
        if self.link.min_latency_ms > self.link.max_latency_ms {
            bail!(
                "min latency {}ms exceeds max latency {}ms",
                self.link.min_latency_ms,
                self.link.max_latency_ms
            );
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }
}
