//! Link Layer configuration constants

/// Data channel PDU sizes
pub mod pdu {
    /// Size of the data channel PDU header (LLID/NESN/SN/MD byte + length byte)
    pub const HEADER_SIZE: usize = 2;

    /// Smallest maximum PDU size (header + payload) a connection may negotiate.
    ///
    /// Also the size both directions fall back to on every new connection.
    pub const MIN_PDU_SIZE: usize = 29;

    /// Largest maximum PDU size (header + payload)
    pub const MAX_PDU_SIZE: usize = 251;

    /// Upper bound for the in-memory size of an empty PDU in any layout
    pub const MAX_EMPTY_PDU_MEMORY: usize = 8;
}

/// Data channel selection
pub mod channels {
    /// Number of data channels (channel indices 0..=36)
    pub const DATA_CHANNEL_COUNT: usize = 37;

    /// Size of the channel map on the wire
    pub const CHANNEL_MAP_SIZE: usize = 5;

    /// Mask for the valid bits of the last channel map byte (bits 37..=39 are RFU)
    pub const LAST_BYTE_MASK: u8 = 0x1f;

    /// Hop increment range (inclusive)
    pub const MIN_HOP_INCREMENT: u8 = 5;
    pub const MAX_HOP_INCREMENT: u8 = 16;

    /// A channel map must enable at least this many channels
    pub const MIN_USED_CHANNELS: usize = 2;
}

/// Notification / indication arbitration
pub mod notifications {
    /// Bits of state kept per characteristic
    pub const BITS_PER_SLOT: usize = 2;

    /// Slot bit marking a queued notification
    pub const NOTIFICATION_BIT: u8 = 0x01;

    /// Slot bit marking a queued indication
    pub const INDICATION_BIT: u8 = 0x02;
}
