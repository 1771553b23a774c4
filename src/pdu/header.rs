//! Data channel PDU header
//!
//! # Wire Format
//!
//! ```text
//! byte 0: [LLID: 2 bits][NESN: 1][SN: 1][MD: 1][RFU: 3]   (LSB first)
//! byte 1: [Length: 8 bits]
//! ```
//!
//! - `LLID`: PDU type, see [`Llid`]
//! - `NESN`: next expected sequence number (acknowledges the peer's last PDU)
//! - `SN`: sequence number of this PDU
//! - `MD`: more data, the sender has further PDUs queued for this connection event
//! - `RFU`: reserved, must be zero
//! - `Length`: payload length in bytes (0-251)

use core::fmt;

const LLID_MASK: u16 = 0b0000_0011;
const NESN_FLAG: u16 = 0b0000_0100;
const SN_FLAG: u16 = 0b0000_1000;
const MD_FLAG: u16 = 0b0001_0000;
const RFU_MASK: u16 = 0b1110_0000;
const LENGTH_SHIFT: u16 = 8;

/// Values of the LLID field
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Llid {
    /// Reserved (0b00), never a valid data channel PDU
    Reserved = 0b00,

    /// Continuation fragment of an L2CAP message, or an empty PDU (0b01)
    Continuation = 0b01,

    /// Start of an L2CAP message, or a complete unfragmented message (0b10)
    Start = 0b10,

    /// LL control PDU (0b11)
    Control = 0b11,
}

impl Llid {
    /// Decode the two LLID bits of a header byte
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0b01 => Self::Continuation,
            0b10 => Self::Start,
            0b11 => Self::Control,
            _ => Self::Reserved,
        }
    }
}

/// 16-bit data channel PDU header
///
/// Stored and transmitted little-endian: the flag byte first, the length byte second.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Header(u16);

impl Header {
    /// Header with the given LLID and every other field zero
    pub const fn new(llid: Llid) -> Self {
        Self(llid as u16)
    }

    /// Header of an empty PDU (LLID continuation, length 0)
    pub const fn empty() -> Self {
        Self::new(Llid::Continuation)
    }

    /// Header from its raw 16-bit representation
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Header from the two header bytes as they appear on air
    pub const fn from_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }

    pub const fn raw(&self) -> u16 {
        self.0
    }

    pub const fn to_bytes(&self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    pub fn llid(&self) -> Llid {
        Llid::from_bits((self.0 & LLID_MASK) as u8)
    }

    pub fn set_llid(&mut self, llid: Llid) {
        self.0 = (self.0 & !LLID_MASK) | llid as u16;
    }

    /// Next expected sequence number
    pub fn nesn(&self) -> bool {
        self.0 & NESN_FLAG != 0
    }

    pub fn set_nesn(&mut self, nesn: bool) {
        self.set_flag(NESN_FLAG, nesn);
    }

    /// Sequence number
    pub fn sn(&self) -> bool {
        self.0 & SN_FLAG != 0
    }

    pub fn set_sn(&mut self, sn: bool) {
        self.set_flag(SN_FLAG, sn);
    }

    /// More data
    pub fn md(&self) -> bool {
        self.0 & MD_FLAG != 0
    }

    pub fn set_md(&mut self, md: bool) {
        self.set_flag(MD_FLAG, md);
    }

    /// The three reserved bits of the flag byte, shifted down
    pub fn rfu(&self) -> u8 {
        ((self.0 & RFU_MASK) >> 5) as u8
    }

    pub fn payload_length(&self) -> u8 {
        (self.0 >> LENGTH_SHIFT) as u8
    }

    pub fn set_payload_length(&mut self, length: u8) {
        self.0 = (self.0 & 0x00ff) | (u16::from(length) << LENGTH_SHIFT);
    }

    /// Builder-style setter for the payload length
    pub fn with_payload_length(mut self, length: u8) -> Self {
        self.set_payload_length(length);
        self
    }

    fn set_flag(&mut self, flag: u16, value: bool) {
        if value {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("llid", &self.llid())
            .field("nesn", &self.nesn())
            .field("sn", &self.sn())
            .field("md", &self.md())
            .field("length", &self.payload_length())
            .finish()
    }
}
