use super::link::SimulatedLink;
use super::protocol::{Packet, PacketError, PacketHeader, Payload};
use super::tracking::ReceiveTracker;

/// One direction of traffic between two processes: sequencing on the way
/// in, duplicate suppression on the way out.
#[derive(Debug)]
pub struct Channel {
    link: SimulatedLink,
    next_sequence: u32,
    tracker: ReceiveTracker,
}

impl Channel {
    pub fn new(link: SimulatedLink) -> Self {
        Self {
            link,
            next_sequence: 1,
            tracker: ReceiveTracker::new(),
        }
    }

    pub fn link(&self) -> &SimulatedLink {
        &self.link
    }

    /// Returns the sequence stamped on the packet.
    pub fn send(&mut self, now_ms: u64, payload: Payload) -> Result<u32, PacketError> {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);

        let reliability = payload.reliability();
        let bytes = Packet::new(PacketHeader::new(sequence), payload).serialize()?;
        self.link.send(now_ms, bytes, reliability);
        Ok(sequence)
    }

    pub fn receive(&mut self, now_ms: u64) -> Vec<(u32, Payload)> {
        let mut delivered = Vec::new();
        for bytes in self.link.receive(now_ms) {
            match Packet::deserialize(&bytes) {
                Ok(packet) => {
                    let sequence = packet.header.sequence;
                    if self.tracker.record_received(sequence) {
                        delivered.push((sequence, packet.payload));
                    } else {
                        log::trace!("dropping duplicate packet {sequence}");
                    }
                }
                Err(err) => log::warn!("dropping undecodable packet: {err}"),
            }
        }
        delivered
    }

    pub fn in_flight(&self) -> usize {
        self.link.in_flight()
    }
}
