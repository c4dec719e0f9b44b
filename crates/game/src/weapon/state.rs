use bitflags::bitflags;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WeaponState {
    #[default]
    Idle,
    Firing,
    Reloading,
    Equipping,
}

impl WeaponState {
    /// Fire and reload requests are only honoured from these states.
    pub fn accepts_actions(self) -> bool {
        matches!(self, WeaponState::Idle | WeaponState::Firing)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Intent: u8 {
        const EQUIPPED = 1 << 0;
        const PENDING_EQUIP = 1 << 1;
        const PENDING_RELOAD = 1 << 2;
        const WANTS_TO_FIRE = 1 << 3;
        const REFIRING = 1 << 4;
    }
}

/// Derives the state from intent flags. A pending reload that cannot start
/// keeps whatever state the weapon is already in.
pub fn determine_state(
    current: WeaponState,
    intent: Intent,
    can_reload: bool,
    can_fire: bool,
) -> WeaponState {
    if intent.contains(Intent::EQUIPPED) {
        if intent.contains(Intent::PENDING_RELOAD) {
            if can_reload {
                WeaponState::Reloading
            } else {
                current
            }
        } else if intent.contains(Intent::WANTS_TO_FIRE) && can_fire {
            WeaponState::Firing
        } else {
            WeaponState::Idle
        }
    } else if intent.contains(Intent::PENDING_EQUIP) {
        WeaponState::Equipping
    } else {
        WeaponState::Idle
    }
}
