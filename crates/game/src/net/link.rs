//! In-process lossy link with latency, jitter, loss, and duplication.
//!
//! Reliable sends are never lost: a "dropped" reliable packet is delivered
//! after extra retransmission delay instead. Packets sent on one link are
//! released in send order whenever their release times tie.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::protocol::ReliabilityMode;

const MAX_RETRANSMITS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConditions {
    pub loss_percent: f32,
    pub duplicate_percent: f32,
    pub min_latency_ms: u32,
    pub max_latency_ms: u32,
    pub jitter_ms: u32,
    pub retransmit_ms: u32,
    /// Reliable traffic never overtakes earlier reliable traffic.
    pub ordered_reliable: bool,
}

impl Default for LinkConditions {
    fn default() -> Self {
        Self {
            loss_percent: 0.0,
            duplicate_percent: 0.0,
            min_latency_ms: 0,
            max_latency_ms: 0,
            jitter_ms: 0,
            retransmit_ms: 100,
            ordered_reliable: true,
        }
    }
}

impl LinkConditions {
    pub fn perfect() -> Self {
        Self::default()
    }

    fn should_drop(&self, rng: &mut StdRng) -> bool {
        self.loss_percent > 0.0 && rng.gen_range(0.0..100.0) < self.loss_percent
    }

    fn should_duplicate(&self, rng: &mut StdRng) -> bool {
        self.duplicate_percent > 0.0 && rng.gen_range(0.0..100.0) < self.duplicate_percent
    }

    fn delay_ms(&self, rng: &mut StdRng) -> u64 {
        let base = u64::from(self.min_latency_ms);
        let range = self.max_latency_ms.saturating_sub(self.min_latency_ms);
        let spread = if range > 0 { rng.gen_range(0..=range) } else { 0 };
        let jitter = if self.jitter_ms > 0 {
            rng.gen_range(0..=self.jitter_ms)
        } else {
            0
        };
        base + u64::from(spread) + u64::from(jitter)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub sent: u64,
    pub delivered: u64,
    pub dropped: u64,
    pub duplicated: u64,
    pub retransmitted: u64,
}

#[derive(Debug)]
struct InFlight {
    release_ms: u64,
    order: u64,
    bytes: Vec<u8>,
}

impl PartialEq for InFlight {
    fn eq(&self, other: &Self) -> bool {
        self.release_ms == other.release_ms && self.order == other.order
    }
}

impl Eq for InFlight {}

impl PartialOrd for InFlight {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InFlight {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap
        other
            .release_ms
            .cmp(&self.release_ms)
            .then_with(|| other.order.cmp(&self.order))
    }
}

#[derive(Debug)]
pub struct SimulatedLink {
    conditions: LinkConditions,
    queue: BinaryHeap<InFlight>,
    rng: StdRng,
    next_order: u64,
    last_reliable_release: u64,
    stats: LinkStats,
}

impl SimulatedLink {
    pub fn new(conditions: LinkConditions, seed: u64) -> Self {
        Self {
            conditions,
            queue: BinaryHeap::new(),
            rng: StdRng::seed_from_u64(seed),
            next_order: 0,
            last_reliable_release: 0,
            stats: LinkStats::default(),
        }
    }

    pub fn perfect() -> Self {
        Self::new(LinkConditions::perfect(), 0)
    }

    pub fn conditions(&self) -> &LinkConditions {
        &self.conditions
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.queue.len()
    }

    pub fn send(&mut self, now_ms: u64, bytes: Vec<u8>, reliability: ReliabilityMode) {
        self.stats.sent += 1;

        let mut release_ms = now_ms + self.conditions.delay_ms(&mut self.rng);
        if self.conditions.should_drop(&mut self.rng) {
            match reliability {
                ReliabilityMode::Unreliable => {
                    self.stats.dropped += 1;
                    return;
                }
                ReliabilityMode::Reliable => {
                    let mut attempts = 1;
                    while attempts < MAX_RETRANSMITS && self.conditions.should_drop(&mut self.rng) {
                        attempts += 1;
                    }
                    self.stats.retransmitted += u64::from(attempts);
                    release_ms += u64::from(self.conditions.retransmit_ms) * u64::from(attempts);
                }
            }
        }

        if reliability == ReliabilityMode::Reliable && self.conditions.ordered_reliable {
            release_ms = release_ms.max(self.last_reliable_release);
            self.last_reliable_release = release_ms;
        }

        if self.conditions.should_duplicate(&mut self.rng) {
            self.stats.duplicated += 1;
            let echo_ms = now_ms + self.conditions.delay_ms(&mut self.rng);
            self.enqueue(echo_ms.max(release_ms), bytes.clone());
        }

        self.enqueue(release_ms, bytes);
    }

    fn enqueue(&mut self, release_ms: u64, bytes: Vec<u8>) {
        self.queue.push(InFlight {
            release_ms,
            order: self.next_order,
            bytes,
        });
        self.next_order += 1;
    }

    pub fn receive(&mut self, now_ms: u64) -> Vec<Vec<u8>> {
        let mut delivered = Vec::new();
        while self.queue.peek().is_some_and(|p| p.release_ms <= now_ms) {
            if let Some(packet) = self.queue.pop() {
                delivered.push(packet.bytes);
            }
        }
        self.stats.delivered += delivered.len() as u64;
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_link_delivers_in_order() {
        let mut link = SimulatedLink::perfect();
        link.send(0, vec![1], ReliabilityMode::Reliable);
        link.send(0, vec![2], ReliabilityMode::Unreliable);
        link.send(0, vec![3], ReliabilityMode::Reliable);

        assert_eq!(link.receive(0), vec![vec![1], vec![2], vec![3]]);
        assert_eq!(link.in_flight(), 0);
    }

    #[test]
    fn test_latency_holds_packets() {
        let conditions = LinkConditions {
            min_latency_ms: 50,
            max_latency_ms: 50,
            ..Default::default()
        };
        let mut link = SimulatedLink::new(conditions, 1);
        link.send(100, vec![7], ReliabilityMode::Reliable);

        assert!(link.receive(149).is_empty());
        assert_eq!(link.receive(150), vec![vec![7]]);
    }

    #[test]
    fn test_total_loss_drops_unreliable_but_not_reliable() {
        let conditions = LinkConditions {
            loss_percent: 100.0,
            retransmit_ms: 10,
            ..Default::default()
        };
        let mut link = SimulatedLink::new(conditions, 3);
        link.send(0, vec![1], ReliabilityMode::Unreliable);
        link.send(0, vec![2], ReliabilityMode::Reliable);

        let delivered = link.receive(10_000);
        assert_eq!(delivered, vec![vec![2]]);
        assert_eq!(link.stats().dropped, 1);
        assert_eq!(link.stats().retransmitted, u64::from(MAX_RETRANSMITS));
    }

    #[test]
    fn test_reliable_order_survives_jitter() {
        let conditions = LinkConditions {
            min_latency_ms: 10,
            max_latency_ms: 80,
            jitter_ms: 30,
            ..Default::default()
        };
        let mut link = SimulatedLink::new(conditions, 42);
        for i in 0..50u8 {
            link.send(u64::from(i), vec![i], ReliabilityMode::Reliable);
        }

        let delivered: Vec<u8> = link.receive(10_000).into_iter().map(|b| b[0]).collect();
        let expected: Vec<u8> = (0..50).collect();
        assert_eq!(delivered, expected);
    }

    #[test]
    fn test_duplicates_are_delivered_twice() {
        let conditions = LinkConditions {
            duplicate_percent: 100.0,
            ..Default::default()
        };
        let mut link = SimulatedLink::new(conditions, 5);
        link.send(0, vec![9], ReliabilityMode::Reliable);
        assert_eq!(link.receive(0).len(), 2);
        assert_eq!(link.stats().duplicated, 1);
    }
}
