//! Data channel PDU framing
//!
//! Provides the typed 2-byte data channel header and the in-memory layouts
//! used to store PDUs in the link layer ring buffers.

pub mod header;
pub mod layout;

pub use header::{Header, Llid};
pub use layout::{DefaultLayout, PduLayout};
