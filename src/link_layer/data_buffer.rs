//! Link layer data channel buffer
//!
//! Holds the transmit and receive rings of one connection and runs the link
//! layer's stop-and-wait acknowledgment scheme on top of them.
//!
//! # Execution contexts
//!
//! The radio interrupt calls [`allocate_receive_buffer`], [`received`],
//! [`crc_error`], [`timeout`] and [`next_transmit`]. These never block and
//! never lock. Everything the rest of the stack calls (transmit allocation and
//! commit, draining received PDUs, size changes) runs with the buffer's
//! [`LockGuard`] held.
//!
//! # Sequence numbers
//!
//! The SN of a queued PDU is fixed when it is committed and the toggle for
//! the next PDU flips right away. With only one PDU in flight per direction
//! the peer acknowledges a PDU by sending a NESN different from its SN. When
//! nothing is queued an empty PDU is synthesized, which takes a sequence
//! number of its own and has to be acknowledged like any other PDU.
//!
//! [`allocate_receive_buffer`]: LinkLayerDataBuffer::allocate_receive_buffer
//! [`received`]: LinkLayerDataBuffer::received
//! [`crc_error`]: LinkLayerDataBuffer::crc_error
//! [`timeout`]: LinkLayerDataBuffer::timeout
//! [`next_transmit`]: LinkLayerDataBuffer::next_transmit

use core::fmt;
use core::marker::PhantomData;

use super::counters::LinkCounters;
use super::lock::{LockGuard, NoLock};
use super::ring_buffer::{PduRingBuffer, Region};
use crate::config::pdu::{HEADER_SIZE, MAX_EMPTY_PDU_MEMORY, MAX_PDU_SIZE, MIN_PDU_SIZE};
use crate::pdu::{DefaultLayout, Header, Llid, PduLayout};

/// Errors reported by [`LinkLayerDataBuffer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    /// Maximum PDU size outside of `29..=251` or larger than the ring storage
    InvalidSize(usize),
    /// Payload does not fit into a PDU of the current maximum transmit size
    PayloadTooLarge(usize),
    /// Transmit ring is full
    NoSpace,
    /// PDUs with the reserved LLID can not be queued
    ReservedLlid,
    /// Raw storage is only accessible while the buffer is stopped
    Running,
}

impl fmt::Display for BufferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSize(size) => write!(f, "invalid maximum PDU size {}", size),
            Self::PayloadTooLarge(len) => write!(f, "payload of {} bytes exceeds the maximum PDU size", len),
            Self::NoSpace => write!(f, "transmit buffer full"),
            Self::ReservedLlid => write!(f, "reserved LLID"),
            Self::Running => write!(f, "buffer is running"),
        }
    }
}

/// Transmit and receive buffers of a single connection.
///
/// `TX` and `RX` are the sizes of the two ring storages in bytes. `G` guards
/// the operations called outside of the radio interrupt and `L` defines how
/// the radio expects PDUs in memory.
///
/// Usable in a `static`: [`new`](Self::new) is `const` and nothing is
/// allocated. PDUs are handed out as [`Region`]s into the storage; the
/// `*_buffer_mut` accessors turn them into byte slices.
pub struct LinkLayerDataBuffer<const TX: usize, const RX: usize, G: LockGuard = NoLock, L: PduLayout = DefaultLayout> {
    tx_storage: [u8; TX],
    rx_storage: [u8; RX],
    tx_ring: PduRingBuffer<TX, L>,
    rx_ring: PduRingBuffer<RX, L>,

    max_tx_size: usize,
    max_rx_size: usize,

    /// SN for the next committed or synthesized PDU
    sequence_number: bool,
    next_expected_sequence_number: bool,

    empty_pdu: [u8; MAX_EMPTY_PDU_MEMORY],
    /// The last PDU handed to the radio was `empty_pdu` and it is not acknowledged yet
    empty_pending: bool,
    empty_sequence_number: bool,

    counters: LinkCounters,
    running: bool,
    _lock: PhantomData<fn() -> G>,
}

impl<const TX: usize, const RX: usize, G: LockGuard, L: PduLayout> LinkLayerDataBuffer<TX, RX, G, L> {
    const STORAGE_FITS_MIN_PDU: () = assert!(
        TX >= MIN_PDU_SIZE && RX >= MIN_PDU_SIZE,
        "ring storage too small for a minimum sized PDU"
    );

    /// Create a running buffer in the state [`reset`](Self::reset) leaves it in
    pub const fn new() -> Self {
        let () = Self::STORAGE_FITS_MIN_PDU;

        Self {
            tx_storage: [0; TX],
            rx_storage: [0; RX],
            tx_ring: PduRingBuffer::new(),
            rx_ring: PduRingBuffer::new(),
            max_tx_size: MIN_PDU_SIZE,
            max_rx_size: MIN_PDU_SIZE,
            sequence_number: false,
            next_expected_sequence_number: false,
            empty_pdu: [0; MAX_EMPTY_PDU_MEMORY],
            empty_pending: false,
            empty_sequence_number: false,
            counters: LinkCounters::new(),
            running: true,
            _lock: PhantomData,
        }
    }

    /// Prepare the buffer for a new connection.
    ///
    /// Empties both rings, sets both maximum sizes back to 29, clears the
    /// sequence numbers and the counters and puts the buffer into running mode.
    pub fn reset(&mut self) {
        self.tx_ring.reset(&mut self.tx_storage);
        self.rx_ring.reset(&mut self.rx_storage);

        self.max_tx_size = MIN_PDU_SIZE;
        self.max_rx_size = MIN_PDU_SIZE;

        self.sequence_number = false;
        self.next_expected_sequence_number = false;
        self.empty_pending = false;
        self.empty_sequence_number = false;

        self.counters = LinkCounters::new();
        self.running = true;

        log::debug!("LL: Data buffer reset ({} bytes TX, {} bytes RX)", TX, RX);
    }

    /// Leave running mode, e.g. on disconnect.
    ///
    /// The storage can then be borrowed through [`raw`](Self::raw) until the
    /// next [`reset`](Self::reset).
    pub fn stop(&mut self) {
        self.running = false;
        log::debug!("LL: Data buffer stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Transmit and receive storage, for use by other parts of the stack
    /// while there is no connection
    pub fn raw(&mut self) -> Result<(&mut [u8], &mut [u8]), BufferError> {
        if self.running {
            return Err(BufferError::Running);
        }

        Ok((&mut self.tx_storage[..], &mut self.rx_storage[..]))
    }

    /// Current maximum size of a received PDU (header and payload)
    pub fn max_rx_size(&self) -> usize {
        self.max_rx_size
    }

    /// Change the maximum receive PDU size, e.g. after a data length update
    pub fn set_max_rx_size(&mut self, size: usize) -> Result<(), BufferError> {
        Self::check_size(size, self.largest_rx_size())?;

        let _lock = G::acquire();
        self.max_rx_size = size;
        log::debug!("LL: Max RX size {}", size);

        Ok(())
    }

    /// Largest value accepted by [`set_max_rx_size`](Self::set_max_rx_size)
    pub fn largest_rx_size(&self) -> usize {
        MAX_PDU_SIZE.min(RX.saturating_sub(L::overhead()))
    }

    /// Current maximum size of a transmitted PDU (header and payload)
    pub fn max_tx_size(&self) -> usize {
        self.max_tx_size
    }

    /// Change the maximum transmit PDU size
    pub fn set_max_tx_size(&mut self, size: usize) -> Result<(), BufferError> {
        Self::check_size(size, self.largest_tx_size())?;

        let _lock = G::acquire();
        self.max_tx_size = size;
        log::debug!("LL: Max TX size {}", size);

        Ok(())
    }

    /// Largest value accepted by [`set_max_tx_size`](Self::set_max_tx_size)
    pub fn largest_tx_size(&self) -> usize {
        MAX_PDU_SIZE.min(TX.saturating_sub(L::overhead()))
    }

    /// Packet counters since the last reset
    pub fn counters(&self) -> LinkCounters {
        self.counters
    }

    // ----- Transmit side, outside of the radio interrupt -----

    /// Allocate room for a PDU of `size` bytes (header and payload).
    ///
    /// Returns `None` if the transmit ring is full, or if `size` is not
    /// between the header size and [`max_tx_size`](Self::max_tx_size). The
    /// region is part of the ring only after
    /// [`commit_transmit_buffer`](Self::commit_transmit_buffer).
    pub fn allocate_transmit_buffer(&self, size: usize) -> Option<Region> {
        debug_assert!(self.running, "buffer not running");

        if size < HEADER_SIZE || size > self.max_tx_size {
            return None;
        }

        let _lock = G::acquire();
        self.tx_ring.alloc_front(L::memory_size(size - HEADER_SIZE))
    }

    /// Allocate room for a PDU of [`max_tx_size`](Self::max_tx_size) bytes
    pub fn allocate_max_transmit_buffer(&self) -> Option<Region> {
        self.allocate_transmit_buffer(self.max_tx_size)
    }

    /// Memory of an allocated transmit region
    pub fn transmit_buffer_mut(&mut self, region: Region) -> &mut [u8] {
        &mut self.tx_storage[region.range()]
    }

    /// Queue a PDU that was written into an allocated transmit region.
    ///
    /// The header's length field tells how much of the region is used. The
    /// RFU bits must be zero; SN is assigned here and NESN and MD are
    /// maintained by [`next_transmit`](Self::next_transmit).
    pub fn commit_transmit_buffer(&mut self, region: Region) {
        debug_assert!(self.running, "buffer not running");

        let _lock = G::acquire();

        let pdu = &mut self.tx_storage[region.range()];
        let mut header = L::header(pdu);

        debug_assert_eq!(header.rfu(), 0, "RFU bits set in committed PDU");
        debug_assert!(header.llid() != Llid::Reserved, "committed PDU has the reserved LLID");

        header.set_sn(self.sequence_number);
        L::set_header(pdu, header);
        self.sequence_number = !self.sequence_number;

        self.tx_ring.push_front(&mut self.tx_storage, region);
    }

    /// Allocate, fill and commit a PDU in one go
    pub fn enqueue(&mut self, llid: Llid, payload: &[u8]) -> Result<(), BufferError> {
        if llid == Llid::Reserved {
            return Err(BufferError::ReservedLlid);
        }

        let size = HEADER_SIZE + payload.len();
        if size > self.max_tx_size {
            return Err(BufferError::PayloadTooLarge(payload.len()));
        }

        let region = self.allocate_transmit_buffer(size).ok_or(BufferError::NoSpace)?;

        let pdu = self.transmit_buffer_mut(region);
        // Bounded by max_tx_size, so the length fits the length field
        L::set_header(pdu, Header::new(llid).with_payload_length(payload.len() as u8));
        L::body_mut(pdu)[..payload.len()].copy_from_slice(payload);

        self.commit_transmit_buffer(region);
        Ok(())
    }

    // ----- Receive side, outside of the radio interrupt -----

    /// Oldest received PDU, as stored by the layout.
    ///
    /// Returns the same PDU until [`free_received`](Self::free_received) is called.
    pub fn next_received(&self) -> Option<&[u8]> {
        debug_assert!(self.running, "buffer not running");

        let _lock = G::acquire();
        self.rx_ring
            .next_end(&self.rx_storage)
            .map(|region| &self.rx_storage[region.range()])
    }

    /// Remove the PDU returned by [`next_received`](Self::next_received)
    pub fn free_received(&mut self) {
        debug_assert!(self.running, "buffer not running");

        let _lock = G::acquire();
        self.rx_ring.pop_end(&self.rx_storage);
    }

    // ----- Radio interrupt -----

    /// Region of [`max_rx_size`](Self::max_rx_size) PDU bytes to receive the
    /// next PDU into, or `None` if the receive ring is full.
    ///
    /// There should be at most one region handed to the radio at a time. It
    /// is released by one of [`received`](Self::received),
    /// [`crc_error`](Self::crc_error) or [`timeout`](Self::timeout).
    pub fn allocate_receive_buffer(&self) -> Option<Region> {
        self.rx_ring.alloc_front(L::memory_size(self.max_rx_size - HEADER_SIZE))
    }

    /// Memory of an allocated receive region
    pub fn receive_buffer_mut(&mut self, region: Region) -> &mut [u8] {
        &mut self.rx_storage[region.range()]
    }

    /// A PDU was received into `region` without CRC error.
    ///
    /// Acknowledges the outstanding transmit PDU if the peer's NESN says so,
    /// then keeps the PDU if it is new and carries a payload. Returns the PDU
    /// to send next.
    pub fn received(&mut self, region: Region) -> &[u8] {
        if region.len() < L::memory_size(0) || region.range().end > RX {
            return self.crc_error();
        }

        let header = L::header(&self.rx_storage[region.range()]);

        if L::memory_size(usize::from(header.payload_length())) > region.len() {
            log::trace!("LL: RX length {} exceeds the receive buffer", header.payload_length());
            return self.crc_error();
        }

        self.acknowledge(header.nesn());

        if header.llid() == Llid::Reserved {
            self.counters.count_reserved_llid();
            log::trace!("LL: Dropped PDU with reserved LLID");
        } else if header.sn() == self.next_expected_sequence_number {
            self.next_expected_sequence_number = !self.next_expected_sequence_number;

            if header.payload_length() != 0 {
                self.rx_ring.push_front(&mut self.rx_storage, region);
                self.counters.count_received();
            }
        } else {
            self.counters.count_duplicate();
            log::trace!("LL: Dropped retransmitted PDU (SN {})", u8::from(header.sn()));
        }

        self.next_transmit()
    }

    /// A PDU was received with a CRC error.
    ///
    /// Nothing changes; without a new NESN the peer retransmits. Returns an
    /// empty slice.
    pub fn crc_error(&mut self) -> &[u8] {
        self.counters.count_crc_error();
        log::trace!("LL: CRC error");

        &[]
    }

    /// Nothing was received in time. Retrying is up to the connection event scheduler.
    pub fn timeout(&mut self) {}

    /// The PDU to put on air next.
    ///
    /// Repeated calls return the same PDU until it is acknowledged, only NESN
    /// (and MD on a pending empty PDU) follow the current state. If nothing
    /// is queued an empty PDU is sent.
    pub fn next_transmit(&mut self) -> &[u8] {
        let nesn = self.next_expected_sequence_number;

        if self.empty_pending {
            let more_data = !self.tx_ring.is_empty();
            return self.stamp_empty_pdu(more_data, nesn);
        }

        if let Some(head) = self.tx_ring.next_end(&self.tx_storage) {
            let more_data = self.tx_ring.more_than_one(&self.tx_storage);

            let pdu = &mut self.tx_storage[head.range()];
            let mut header = L::header(pdu);
            header.set_md(more_data);
            header.set_nesn(nesn);
            L::set_header(pdu, header);

            return pdu;
        }

        // A new empty PDU takes the next sequence number
        self.empty_sequence_number = self.sequence_number;
        self.sequence_number = !self.sequence_number;
        self.empty_pending = true;

        self.stamp_empty_pdu(false, nesn)
    }

    fn stamp_empty_pdu(&mut self, more_data: bool, nesn: bool) -> &[u8] {
        let size = L::memory_size(0);
        debug_assert!(size <= MAX_EMPTY_PDU_MEMORY, "layout overhead too large for the empty PDU");

        let mut header = Header::empty();
        header.set_sn(self.empty_sequence_number);
        header.set_md(more_data);
        header.set_nesn(nesn);
        L::set_header(&mut self.empty_pdu[..], header);

        &self.empty_pdu[..size.min(MAX_EMPTY_PDU_MEMORY)]
    }

    fn acknowledge(&mut self, nesn: bool) {
        if self.empty_pending {
            if self.empty_sequence_number != nesn {
                self.empty_pending = false;
            }
            return;
        }

        // Nothing queued if the peer talks before anything was sent
        let Some(head) = self.tx_ring.next_end(&self.tx_storage) else {
            return;
        };

        if L::header(&self.tx_storage[head.range()]).sn() != nesn {
            self.tx_ring.pop_end(&self.tx_storage);
            self.counters.count_transmitted();
        }
    }

    fn check_size(size: usize, largest: usize) -> Result<(), BufferError> {
        if size < MIN_PDU_SIZE || size > largest {
            log::debug!("LL: Rejected max PDU size {} (allowed {}..={})", size, MIN_PDU_SIZE, largest);
            return Err(BufferError::InvalidSize(size));
        }

        Ok(())
    }
}

impl<const TX: usize, const RX: usize, G: LockGuard, L: PduLayout> Default for LinkLayerDataBuffer<TX, RX, G, L> {
    fn default() -> Self {
        Self::new()
    }
}
