use thiserror::Error;

/// Construction-time problems with weapon data. Runtime weapon operations
/// never fail; bad data is rejected before a weapon exists.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("weapon '{weapon}': clip size must be positive")]
    ZeroClip { weapon: String },

    #[error("weapon '{weapon}': clip size {clip} exceeds max ammo {max}")]
    ClipExceedsMax { weapon: String, clip: u32, max: u32 },

    #[error("weapon '{weapon}': {field} must be finite and non-negative, got {value}")]
    InvalidTiming {
        weapon: String,
        field: &'static str,
        value: f32,
    },

    #[error("weapon '{weapon}': {field} must be positive, got {value}")]
    NonPositive {
        weapon: String,
        field: &'static str,
        value: f32,
    },

    #[error("weapon '{weapon}': firing spread max {max} is below base spread {base}")]
    SpreadRange { weapon: String, base: f32, max: f32 },

    #[error("unknown weapon config '{0}'")]
    UnknownConfig(String),
}
