use std::fmt;

use rkyv::{Archive, Deserialize, Serialize};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Archive, Serialize, Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct EntityId(pub u32);

impl EntityId {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Archive, Serialize, Deserialize,
)]
#[rkyv(derive(Debug))]
pub struct WeaponId(pub u32);

impl WeaponId {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WeaponId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "weapon#{}", self.0)
    }
}

/// Hands out weapon ids on the authority. Clients never allocate; they learn
/// ids from the replicated inventory list.
#[derive(Debug, Clone)]
pub struct WeaponIdAllocator {
    next: u32,
}

impl Default for WeaponIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl WeaponIdAllocator {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> WeaponId {
        let id = WeaponId(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        id
    }
}
