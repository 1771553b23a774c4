#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod link_layer;
pub mod pdu;

pub use link_layer::{
    BufferError, ChannelMap, ChannelMapError, ChannelSelector, CriticalSectionLock, LinkCounters,
    LinkLayerDataBuffer, LockGuard, NoLock, NotificationArbiter, Outgoing, PduRingBuffer, Region, slot_bytes,
};
pub use pdu::{DefaultLayout, Header, Llid, PduLayout};
