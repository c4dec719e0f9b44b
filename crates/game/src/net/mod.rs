pub mod channel;
pub mod link;
pub mod protocol;
pub mod replication;
pub mod tracking;

pub use channel::Channel;
pub use link::{LinkConditions, LinkStats, SimulatedLink};
pub use protocol::{
    Audience, FieldKey, FieldUpdate, ImpactRecord, InventoryEntry, Outbox, PROTOCOL_MAGIC,
    PROTOCOL_VERSION, Packet, PacketError, PacketHeader, Payload, ReliabilityMode, RemoteCall,
    sequence_greater_than,
};
pub use replication::ReplicationBridge;
pub use tracking::{FieldTracker, ReceiveTracker};
