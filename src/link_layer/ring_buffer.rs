//! Ring buffer for variable sized data channel PDUs
//!
//! PDUs are stored back to back in a caller-owned byte array. The length
//! field of each stored PDU doubles as the link to the next one, so the ring
//! only keeps two offsets:
//!
//! ```text
//! front == end            empty; both may point anywhere into the storage
//! front >  end            all PDUs live in [end, front)
//! end   >  front          split; PDUs live in [end, wrap point) and [0, front)
//! ```
//!
//! When a PDU does not fit between `front` and the physical end of the
//! storage it is placed at offset 0 and a wrap mark (a header with the
//! reserved LLID) is left at the old `front`, telling the reader to continue
//! at the start. One byte always stays unused between the write and read
//! positions, so an empty ring can be told apart from a full one without a
//! counter.
//!
//! The writer side (`alloc_front`, `push_front`) and the reader side
//! (`next_end`, `pop_end`) may run in different execution contexts. There
//! is no internal locking: there must only be one writer and one reader.

use core::marker::PhantomData;
use core::ops::Range;

use crate::config::pdu::HEADER_SIZE;
use crate::pdu::{DefaultLayout, Header, Llid, PduLayout};

/// Header value marking the point where the reader has to wrap to offset 0
const WRAP_MARK: Header = Header::from_raw(0);

/// Location of a PDU inside a ring buffer's storage
///
/// Only handed out by the ring's allocation calls:
///
/// ```compile_fail
/// let region = le_link_layer::Region::new(0, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    offset: usize,
    len: usize,
}

impl Region {
    pub(crate) const fn new(offset: usize, len: usize) -> Self {
        Self { offset, len }
    }

    /// Offset of the first byte in the storage
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Size of the region in bytes
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Byte range of the region, suitable for slicing the storage
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Fixed size ring of variable sized PDUs
///
/// The ring does not own its storage; every call that needs to look at the
/// stored bytes takes the `SIZE` byte array it was reset with.
pub struct PduRingBuffer<const SIZE: usize, L: PduLayout = DefaultLayout> {
    /// Next write position
    front: usize,
    /// Next read position
    end: usize,
    _layout: PhantomData<fn() -> L>,
}

impl<const SIZE: usize, L: PduLayout> PduRingBuffer<SIZE, L> {
    /// Size of the storage in bytes
    pub const CAPACITY: usize = SIZE;

    const STORAGE_FITS_HEADER: () = assert!(SIZE > HEADER_SIZE, "ring storage too small for a PDU header");

    /// Create an empty ring
    pub const fn new() -> Self {
        let () = Self::STORAGE_FITS_HEADER;

        Self {
            front: 0,
            end: 0,
            _layout: PhantomData,
        }
    }

    /// Empty the ring.
    ///
    /// Afterwards the whole storage, minus the slack byte, is available for
    /// a single PDU.
    pub fn reset(&mut self, storage: &mut [u8; SIZE]) {
        self.front = 0;
        self.end = 0;

        L::set_header(&mut storage[..], WRAP_MARK);
    }

    /// Return a writable region of `size` bytes at the front of the ring.
    ///
    /// Idempotent: as long as the ring is not modified, repeated calls with
    /// the same `size` yield the same region. Returns `None` if there is no
    /// contiguous room for `size` bytes. An empty ring takes up to `SIZE`
    /// bytes, wherever the previous PDUs left off.
    pub fn alloc_front(&self, size: usize) -> Option<Region> {
        debug_assert!(size >= L::memory_size(0));

        // Split ring: the free room is between front and end, minus one slack byte
        if self.end > self.front {
            return (size < self.end - self.front).then(|| Region::new(self.front, size));
        }

        if size <= SIZE - self.front {
            return Some(Region::new(self.front, size));
        }

        // Nothing is stored, so the reader follows the new PDU to the start
        if self.is_empty() {
            return (size <= SIZE).then(|| Region::new(0, size));
        }

        // Wrap to the start, again keeping one byte between the new PDU and end
        (size < self.end).then(|| Region::new(0, size))
    }

    /// Store a PDU previously allocated with [`alloc_front`](Self::alloc_front).
    ///
    /// The length field of the PDU's header determines how many bytes of the
    /// region become part of the ring. Zero length PDUs are fine, the reserved
    /// LLID is not.
    pub fn push_front(&mut self, storage: &mut [u8; SIZE], pdu: Region) {
        let length = Self::stored_length(&storage[pdu.offset()..]);

        debug_assert!(pdu.len() >= length, "PDU length exceeds its allocation");
        debug_assert!(
            L::header(&storage[pdu.offset()..]).llid() != Llid::Reserved,
            "PDUs with the reserved LLID can not be stored"
        );

        let was_empty = self.front == self.end;

        // The PDU was placed at the start; the reader has to wrap at the old front.
        // An empty ring moves the reader along instead, the PDU may cover the old front.
        if !was_empty && self.front != pdu.offset() && self.front + 1 < SIZE {
            L::set_header(&mut storage[self.front..], WRAP_MARK);
        }

        self.front = pdu.offset() + length;

        if was_empty {
            self.end = pdu.offset();
        }
    }

    /// The oldest PDU in the ring, or `None` if the ring is empty
    pub fn next_end(&self, storage: &[u8; SIZE]) -> Option<Region> {
        if self.is_empty() {
            return None;
        }

        Some(Region::new(self.end, Self::stored_length(&storage[self.end..])))
    }

    /// Remove the oldest PDU from the ring
    pub fn pop_end(&mut self, storage: &[u8; SIZE]) {
        debug_assert!(!self.is_empty(), "pop_end() on an empty ring");
        if self.is_empty() {
            return;
        }

        self.end += Self::stored_length(&storage[self.end..]);

        if self.end != self.front && (self.end + 1 >= SIZE || Self::is_wrap_mark(&storage[self.end..])) {
            self.end = 0;
        }
    }

    /// True if the ring holds at least two PDUs
    pub fn more_than_one(&self, storage: &[u8; SIZE]) -> bool {
        !self.is_empty() && self.end + Self::stored_length(&storage[self.end..]) != self.front
    }

    pub fn is_empty(&self) -> bool {
        self.front == self.end
    }

    fn stored_length(pdu: &[u8]) -> usize {
        L::memory_size(usize::from(L::header(pdu).payload_length()))
    }

    fn is_wrap_mark(pdu: &[u8]) -> bool {
        L::header(pdu).llid() == Llid::Reserved
    }
}

impl<const SIZE: usize, L: PduLayout> Default for PduRingBuffer<SIZE, L> {
    fn default() -> Self {
        Self::new()
    }
}
