//! Link layer data channel engine
//!
//! - [`PduRingBuffer`]: ring of variable sized PDUs in caller-owned storage
//! - [`LinkLayerDataBuffer`]: transmit and receive rings plus the acknowledgment scheme
//! - [`ChannelSelector`]: data channel of each connection event
//! - [`NotificationArbiter`]: which characteristic gets notified or indicated next

pub mod channel_map;
pub mod counters;
pub mod data_buffer;
pub mod lock;
pub mod notification_queue;
pub mod ring_buffer;

pub use channel_map::{ChannelMap, ChannelMapError, ChannelSelector};
pub use counters::LinkCounters;
pub use data_buffer::{BufferError, LinkLayerDataBuffer};
pub use lock::{CriticalSectionLock, LockGuard, NoLock};
pub use notification_queue::{slot_bytes, NotificationArbiter, Outgoing};
pub use ring_buffer::{PduRingBuffer, Region};
