use std::collections::{HashMap, VecDeque};

use super::protocol::{FieldKey, sequence_greater_than};

/// Drops packets that were already delivered once.
#[derive(Debug)]
pub struct ReceiveTracker {
    last_received: Option<u32>,
    recent_sequences: VecDeque<u32>,
    max_recent: usize,
}

impl Default for ReceiveTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiveTracker {
    pub fn new() -> Self {
        Self::with_window(256)
    }

    pub fn with_window(max_recent: usize) -> Self {
        Self {
            last_received: None,
            recent_sequences: VecDeque::with_capacity(max_recent),
            max_recent: max_recent.max(1),
        }
    }

    /// Returns false for a duplicate.
    pub fn record_received(&mut self, sequence: u32) -> bool {
        if self.recent_sequences.contains(&sequence) {
            return false;
        }

        if self.recent_sequences.len() >= self.max_recent {
            self.recent_sequences.pop_front();
        }
        self.recent_sequences.push_back(sequence);

        match self.last_received {
            Some(last) if !sequence_greater_than(sequence, last) => {}
            _ => self.last_received = Some(sequence),
        }

        true
    }

    pub fn last_received(&self) -> Option<u32> {
        self.last_received
    }
}

/// Per-field newest-wins filter for replicated values. A value that arrives
/// after a newer one for the same field is stale and must not be applied.
#[derive(Debug, Default)]
pub struct FieldTracker {
    newest: HashMap<FieldKey, u32>,
}

impl FieldTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accept(&mut self, key: FieldKey, sequence: u32) -> bool {
        match self.newest.get(&key) {
            Some(&newest) if !sequence_greater_than(sequence, newest) => false,
            _ => {
                self.newest.insert(key, sequence);
                true
            }
        }
    }
}
