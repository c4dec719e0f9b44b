use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ammo::AmmoConfig;
use crate::damage::DamageType;
use crate::error::ConfigError;

/// Equip length used when no equip animation reports a duration.
pub const DEFAULT_EQUIP_DURATION: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub name: String,
    pub ammo: AmmoConfig,
    /// Let an automatic weapon fire early after a late refire tick.
    pub allow_automatic_catchup: bool,
    pub presentation: PresentationConfig,
    pub hit: HitConfig,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self {
            name: "weapon".to_string(),
            ammo: AmmoConfig::default(),
            allow_automatic_catchup: true,
            presentation: PresentationConfig::default(),
            hit: HitConfig::Instant(InstantConfig::default()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PresentationConfig {
    pub fire_animation: Option<String>,
    pub looped_fire_animation: bool,
    pub reload_animation: Option<String>,
    pub equip_animation: Option<String>,
    pub fire_sound: Option<String>,
    pub fire_loop_sound: Option<String>,
    pub fire_finish_sound: Option<String>,
    pub looped_fire_sound: bool,
    pub out_of_ammo_sound: Option<String>,
    pub reload_sound: Option<String>,
    pub equip_sound: Option<String>,
    pub muzzle_effect: Option<String>,
    pub looped_muzzle_effect: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HitConfig {
    Instant(InstantConfig),
    Projectile(ProjectileConfig),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstantConfig {
    /// Full cone angle in degrees.
    pub spread: f32,
    pub targeting_spread_mod: f32,
    pub firing_spread_increment: f32,
    pub firing_spread_max: f32,
    pub range: f32,
    pub hit_damage: f32,
    pub damage_type: DamageType,
    /// Added to every half-extent of the target bounds when checking a claim.
    pub client_side_hit_leeway: f32,
    pub allowed_view_dot_hit_dir: f32,
}

impl Default for InstantConfig {
    fn default() -> Self {
        Self {
            spread: 5.0,
            targeting_spread_mod: 0.25,
            firing_spread_increment: 1.0,
            firing_spread_max: 10.0,
            range: 100.0,
            hit_damage: 10.0,
            damage_type: DamageType::Ballistic,
            client_side_hit_leeway: 0.5,
            allowed_view_dot_hit_dir: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileConfig {
    pub projectile_class: String,
    pub speed: f32,
    pub life: f32,
    pub explosion_damage: f32,
    pub explosion_radius: f32,
    pub damage_type: DamageType,
}

impl Default for ProjectileConfig {
    fn default() -> Self {
        Self {
            projectile_class: "rocket".to_string(),
            speed: 20.0,
            life: 10.0,
            explosion_damage: 100.0,
            explosion_radius: 3.0,
            damage_type: DamageType::Explosive,
        }
    }
}

fn non_negative(weapon: &str, field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidTiming {
            weapon: weapon.to_string(),
            field,
            value,
        })
    }
}

fn positive(weapon: &str, field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive {
            weapon: weapon.to_string(),
            field,
            value,
        })
    }
}

impl WeaponConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.name.as_str();
        let ammo = &self.ammo;

        if ammo.clip_size == 0 {
            return Err(ConfigError::ZeroClip {
                weapon: name.to_string(),
            });
        }
        if ammo.clip_size > ammo.max_ammo {
            return Err(ConfigError::ClipExceedsMax {
                weapon: name.to_string(),
                clip: ammo.clip_size,
                max: ammo.max_ammo,
            });
        }
        non_negative(name, "time_between_shots", ammo.time_between_shots)?;
        positive(name, "no_anim_reload_duration", ammo.no_anim_reload_duration)?;

        match &self.hit {
            HitConfig::Instant(instant) => {
                non_negative(name, "spread", instant.spread)?;
                non_negative(name, "targeting_spread_mod", instant.targeting_spread_mod)?;
                non_negative(name, "firing_spread_increment", instant.firing_spread_increment)?;
                if instant.firing_spread_max < instant.spread {
                    return Err(ConfigError::SpreadRange {
                        weapon: name.to_string(),
                        base: instant.spread,
                        max: instant.firing_spread_max,
                    });
                }
                positive(name, "range", instant.range)?;
                non_negative(name, "hit_damage", instant.hit_damage)?;
                non_negative(name, "client_side_hit_leeway", instant.client_side_hit_leeway)?;
            }
            HitConfig::Projectile(projectile) => {
                positive(name, "speed", projectile.speed)?;
                positive(name, "life", projectile.life)?;
                non_negative(name, "explosion_damage", projectile.explosion_damage)?;
                non_negative(name, "explosion_radius", projectile.explosion_radius)?;
            }
        }

        Ok(())
    }

    pub fn is_automatic(&self) -> bool {
        self.ammo.time_between_shots > 0.0
    }
}

/// Named weapon configurations, keyed by the string that goes over the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arsenal {
    configs: BTreeMap<String, WeaponConfig>,
}

impl Arsenal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, config: WeaponConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.configs.insert(key.into(), config);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<&WeaponConfig, ConfigError> {
        self.configs
            .get(key)
            .ok_or_else(|| ConfigError::UnknownConfig(key.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.configs.values().try_for_each(WeaponConfig::validate)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}
