//! Packet and anomaly counters of a connection

/// Counters maintained by the data buffer while a connection is running.
///
/// All counters wrap on overflow and are cleared by `reset()`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkCounters {
    /// Queued PDUs acknowledged by the peer (synthesized empty PDUs not included)
    pub transmitted: u32,
    /// New PDUs with a payload moved into the receive ring
    pub received: u32,
    /// Retransmissions of an already accepted PDU
    pub duplicates: u32,
    /// Received PDUs dropped for carrying the reserved LLID
    pub reserved_llid: u32,
    /// Receptions reported with a failed CRC, or with a length that did not fit
    pub crc_errors: u32,
}

impl LinkCounters {
    pub const fn new() -> Self {
        Self {
            transmitted: 0,
            received: 0,
            duplicates: 0,
            reserved_llid: 0,
            crc_errors: 0,
        }
    }

    pub(crate) fn count_transmitted(&mut self) {
        self.transmitted = self.transmitted.wrapping_add(1);
    }

    pub(crate) fn count_received(&mut self) {
        self.received = self.received.wrapping_add(1);
    }

    pub(crate) fn count_duplicate(&mut self) {
        self.duplicates = self.duplicates.wrapping_add(1);
    }

    pub(crate) fn count_reserved_llid(&mut self) {
        self.reserved_llid = self.reserved_llid.wrapping_add(1);
    }

    pub(crate) fn count_crc_error(&mut self) {
        self.crc_errors = self.crc_errors.wrapping_add(1);
    }
}
