//! Per-weapon deferred work. Each kind has at most one pending entry;
//! setting a kind again replaces the old deadline.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    HandleFiring,
    Refire,
    StopReload,
    ReloadWeapon,
    EquipFinished,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Scheduled {
    kind: TimerKind,
    due: f32,
    order: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TimerSet {
    pending: Vec<Scheduled>,
    next_order: u64,
}

impl TimerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, kind: TimerKind, now: f32, delay: f32) {
        self.clear(kind);
        self.pending.push(Scheduled {
            kind,
            due: now + delay.max(0.0),
            order: self.next_order,
        });
        self.next_order += 1;
    }

    /// Returns whether anything was cancelled. Clearing an idle kind is a no-op.
    pub fn clear(&mut self, kind: TimerKind) -> bool {
        let before = self.pending.len();
        self.pending.retain(|t| t.kind != kind);
        before != self.pending.len()
    }

    pub fn clear_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_active(&self, kind: TimerKind) -> bool {
        self.pending.iter().any(|t| t.kind == kind)
    }

    pub fn due_at(&self, kind: TimerKind) -> Option<f32> {
        self.pending.iter().find(|t| t.kind == kind).map(|t| t.due)
    }

    /// Removes and returns the earliest timer due at or before `now`.
    /// Ties fire in the order they were scheduled.
    pub fn pop_due(&mut self, now: f32) -> Option<TimerKind> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due <= now)
            .min_by(|(_, a), (_, b)| a.due.total_cmp(&b.due).then(a.order.cmp(&b.order)))
            .map(|(i, _)| i)?;
        Some(self.pending.swap_remove(index).kind)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
