//! In-memory PDU layouts
//!
//! Some radios DMA PDUs in a format that differs from the on-air format,
//! e.g. with padding bytes around the payload. A [`PduLayout`] describes
//! how a PDU is stored so the ring buffers can be shared with such radios.

use super::header::Header;
use crate::config::pdu::HEADER_SIZE;

/// Describes how a data channel PDU is laid out in memory
///
/// The header always occupies the first two bytes of a stored PDU, although
/// a layout is free to encode it differently there.
pub trait PduLayout {
    /// Read the header of the PDU starting at `pdu[0]`
    fn header(pdu: &[u8]) -> Header;

    /// Write the header of the PDU starting at `pdu[0]`
    fn set_header(pdu: &mut [u8], header: Header);

    /// Payload of a stored PDU
    fn body(pdu: &[u8]) -> &[u8];

    /// Writable payload of a stored PDU
    fn body_mut(pdu: &mut [u8]) -> &mut [u8];

    /// Bytes of memory needed to store a PDU with `payload_size` payload bytes
    fn memory_size(payload_size: usize) -> usize;

    /// Bytes of memory per PDU in addition to header and payload
    fn overhead() -> usize {
        Self::memory_size(0) - HEADER_SIZE
    }
}

/// Stores PDUs exactly as they appear on air
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultLayout;

impl PduLayout for DefaultLayout {
    fn header(pdu: &[u8]) -> Header {
        Header::from_bytes([pdu[0], pdu[1]])
    }

    fn set_header(pdu: &mut [u8], header: Header) {
        pdu[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
    }

    fn body(pdu: &[u8]) -> &[u8] {
        &pdu[HEADER_SIZE..]
    }

    fn body_mut(pdu: &mut [u8]) -> &mut [u8] {
        &mut pdu[HEADER_SIZE..]
    }

    fn memory_size(payload_size: usize) -> usize {
        HEADER_SIZE + payload_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::Llid;

    #[test]
    fn test_default_layout_has_no_overhead() {
        assert_eq!(DefaultLayout::overhead(), 0);
        assert_eq!(DefaultLayout::memory_size(27), 29);
    }

    #[test]
    fn test_default_layout_roundtrips_header_in_place() {
        let mut pdu = [0u8; 6];
        DefaultLayout::set_header(&mut pdu, Header::new(Llid::Start).with_payload_length(4));
        DefaultLayout::body_mut(&mut pdu).copy_from_slice(&[0x12, 0x34, 0x56, 0x78]);

        assert_eq!(pdu, [0x02, 0x04, 0x12, 0x34, 0x56, 0x78]);
        assert_eq!(DefaultLayout::header(&pdu).payload_length(), 4);
        assert_eq!(DefaultLayout::body(&pdu), &[0x12, 0x34, 0x56, 0x78]);
    }
}
