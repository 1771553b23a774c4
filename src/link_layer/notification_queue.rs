//! Notification and indication arbitration
//!
//! Every characteristic that can be notified or indicated owns a 2 bit slot:
//! one bit for a pending notification, one for a pending indication. Slots
//! are served round robin. Only one indication may wait for its confirmation
//! at any time, across all characteristics of the connection.

use crate::config::notifications::{BITS_PER_SLOT, INDICATION_BIT, NOTIFICATION_BIT};

const SLOT_MASK: u8 = (1 << BITS_PER_SLOT) - 1;
const SLOTS_PER_BYTE: usize = 8 / BITS_PER_SLOT;

/// Bytes needed to hold `characteristics` slots
pub const fn slot_bytes(characteristics: usize) -> usize {
    characteristics.div_ceil(SLOTS_PER_BYTE)
}

/// What the connection should send next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outgoing {
    /// Notify the characteristic with this index
    Notification(usize),
    /// Indicate the characteristic with this index; it stays outstanding until confirmed
    Indication(usize),
}

/// Pending notifications and indications of `N` characteristics
///
/// `BYTES` is the size of the slot storage and has to be `slot_bytes(N)`:
///
/// ```
/// use le_link_layer::link_layer::{slot_bytes, NotificationArbiter};
///
/// let mut arbiter = NotificationArbiter::<17, { slot_bytes(17) }>::new();
/// assert!(arbiter.queue_notification(12));
/// ```
#[derive(Debug, Clone)]
pub struct NotificationArbiter<const N: usize, const BYTES: usize> {
    slots: [u8; BYTES],
    /// Slot the next round robin pass starts at
    next: usize,
    outstanding_confirmation: Option<usize>,
}

impl<const N: usize, const BYTES: usize> NotificationArbiter<N, BYTES> {
    const STORAGE_MATCHES: () = assert!(BYTES == slot_bytes(N), "BYTES must be slot_bytes(N)");

    pub const fn new() -> Self {
        let () = Self::STORAGE_MATCHES;

        Self {
            slots: [0; BYTES],
            next: 0,
            outstanding_confirmation: None,
        }
    }

    /// Number of characteristics
    pub const fn len(&self) -> usize {
        N
    }

    /// True if nothing is queued
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|&byte| byte == 0)
    }

    /// Queue a notification of the characteristic at `index`.
    ///
    /// Returns false if one was already queued, or if `index` is out of range.
    pub fn queue_notification(&mut self, index: usize) -> bool {
        self.add(index, NOTIFICATION_BIT)
    }

    /// Queue an indication of the characteristic at `index`.
    ///
    /// Returns false if one was already queued, if the indication of this
    /// very characteristic is still waiting for its confirmation, or if
    /// `index` is out of range. Outstanding indications of other
    /// characteristics do not prevent queuing.
    pub fn queue_indication(&mut self, index: usize) -> bool {
        if self.outstanding_confirmation == Some(index) {
            return false;
        }

        self.add(index, INDICATION_BIT)
    }

    /// Take the next notification or indication to send.
    ///
    /// Visits every slot once, starting after the slot served last. A queued
    /// indication takes precedence over a notification of the same slot, but
    /// is skipped while another indication waits for its confirmation.
    pub fn dequeue_indication_or_confirmation(&mut self) -> Option<Outgoing> {
        for offset in 0..N {
            let index = (self.next + offset) % N;
            let slot = self.at(index);

            if slot & INDICATION_BIT != 0 && self.outstanding_confirmation.is_none() {
                self.remove(index, INDICATION_BIT);
                self.outstanding_confirmation = Some(index);
                self.next = (index + 1) % N;

                return Some(Outgoing::Indication(index));
            }

            if slot & NOTIFICATION_BIT != 0 {
                self.remove(index, NOTIFICATION_BIT);
                self.next = (index + 1) % N;

                return Some(Outgoing::Notification(index));
            }
        }

        None
    }

    /// The outstanding indication was confirmed by the peer.
    ///
    /// Does not check which characteristic the confirmation belongs to; the
    /// protocol only allows one outstanding indication anyway.
    pub fn indication_confirmed(&mut self) {
        self.outstanding_confirmation = None;
    }

    /// Index of the indication waiting for its confirmation
    pub fn outstanding_confirmation(&self) -> Option<usize> {
        self.outstanding_confirmation
    }

    /// Forget everything, e.g. on disconnect
    pub fn clear_indications_and_confirmations(&mut self) {
        self.slots = [0; BYTES];
        self.next = 0;
        self.outstanding_confirmation = None;
    }

    fn position(index: usize) -> (usize, usize) {
        (index / SLOTS_PER_BYTE, (index % SLOTS_PER_BYTE) * BITS_PER_SLOT)
    }

    fn at(&self, index: usize) -> u8 {
        let (byte, shift) = Self::position(index);
        (self.slots[byte] >> shift) & SLOT_MASK
    }

    fn add(&mut self, index: usize, bit: u8) -> bool {
        if index >= N {
            return false;
        }

        let (byte, shift) = Self::position(index);
        let newly_set = self.slots[byte] & (bit << shift) == 0;
        self.slots[byte] |= bit << shift;

        newly_set
    }

    fn remove(&mut self, index: usize, bit: u8) {
        let (byte, shift) = Self::position(index);
        self.slots[byte] &= !(bit << shift);
    }
}

impl<const N: usize, const BYTES: usize> Default for NotificationArbiter<N, BYTES> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Queue17 = NotificationArbiter<17, { slot_bytes(17) }>;
    type Queue8 = NotificationArbiter<8, { slot_bytes(8) }>;
    type Queue3 = NotificationArbiter<3, { slot_bytes(3) }>;

    use Outgoing::{Indication, Notification};

    #[test]
    fn test_slot_bytes() {
        assert_eq!(slot_bytes(0), 0);
        assert_eq!(slot_bytes(1), 1);
        assert_eq!(slot_bytes(4), 1);
        assert_eq!(slot_bytes(5), 2);
        assert_eq!(slot_bytes(17), 5);
    }

    mod notifications {
        use super::*;

        #[test]
        fn test_empty_queue() {
            let mut queue = Queue17::new();
            assert!(queue.is_empty());
            assert_eq!(queue.dequeue_indication_or_confirmation(), None);
        }

        #[test]
        fn test_adding_one_notification() {
            let mut queue = Queue17::new();
            assert!(queue.queue_notification(12));
            assert!(!queue.is_empty());
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Notification(12)));
        }

        #[test]
        fn test_dequeued_elements_are_removed() {
            let mut queue = Queue17::new();
            assert!(queue.queue_notification(12));
            queue.dequeue_indication_or_confirmation();
            assert_eq!(queue.dequeue_indication_or_confirmation(), None);
        }

        #[test]
        fn test_adding_two_notifications() {
            let mut queue = Queue17::new();
            assert!(queue.queue_notification(12));
            assert!(queue.queue_notification(16));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Notification(12)));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Notification(16)));
        }

        #[test]
        fn test_adding_notification_twice() {
            let mut queue = Queue17::new();
            assert!(queue.queue_notification(12));
            assert!(!queue.queue_notification(12));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Notification(12)));
            assert_eq!(queue.dequeue_indication_or_confirmation(), None);
        }

        #[test]
        fn test_round_robin() {
            let mut queue = Queue17::new();
            assert!(queue.queue_notification(12));
            assert!(queue.queue_notification(16));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Notification(12)));

            assert!(queue.queue_notification(12));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Notification(16)));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Notification(12)));
        }

        #[test]
        fn test_wrap_around() {
            let mut queue = Queue17::new();
            assert!(queue.queue_notification(16));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Notification(16)));

            assert!(queue.queue_notification(0));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Notification(0)));

            assert_eq!(queue.dequeue_indication_or_confirmation(), None);
        }

        #[test]
        fn test_out_of_range_index() {
            let mut queue = Queue3::new();
            assert!(!queue.queue_notification(3));
            assert!(!queue.queue_indication(100));
            assert!(queue.is_empty());
        }

        #[test]
        fn test_every_slot_is_served_once() {
            let mut queue = Queue8::new();
            for index in 0..8 {
                assert!(queue.queue_notification(index));
            }

            for index in 0..8 {
                assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Notification(index)));
            }
            assert!(queue.is_empty());
        }
    }

    mod indications {
        use super::*;

        #[test]
        fn test_queue_an_indication() {
            let mut queue = Queue3::new();
            assert!(queue.queue_indication(2));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Indication(2)));
            assert_eq!(queue.outstanding_confirmation(), Some(2));
        }

        #[test]
        fn test_mixed_notification_and_indication() {
            let mut queue = Queue3::new();
            assert!(queue.queue_notification(2));
            assert!(queue.queue_indication(2));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Indication(2)));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Notification(2)));
        }

        #[test]
        fn test_no_indication_until_confirmed() {
            let mut queue = Queue17::new();
            assert!(queue.queue_notification(12));
            assert!(queue.queue_indication(2));
            assert!(queue.queue_indication(16));

            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Indication(2)));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Notification(12)));
            assert_eq!(queue.dequeue_indication_or_confirmation(), None);

            queue.indication_confirmed();
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Indication(16)));
        }

        #[test]
        fn test_double_indication_recognized() {
            let mut queue = Queue17::new();
            assert!(queue.queue_indication(16));
            assert!(!queue.queue_indication(16));

            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Indication(16)));

            assert!(!queue.queue_indication(16));
            queue.indication_confirmed();

            assert!(queue.queue_indication(16));
        }

        #[test]
        fn test_other_index_can_be_queued_while_outstanding() {
            let mut queue = Queue8::new();
            assert!(queue.queue_indication(1));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Indication(1)));

            assert!(queue.queue_indication(5));
            assert_eq!(queue.dequeue_indication_or_confirmation(), None);
            assert!(!queue.is_empty());
        }

        #[test]
        fn test_confirming_the_wrong_index() {
            let mut queue = Queue8::new();
            assert!(queue.queue_indication(1));
            assert!(queue.queue_indication(2));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Indication(1)));

            // Any confirmation clears the outstanding indication
            queue.indication_confirmed();
            assert_eq!(queue.outstanding_confirmation(), None);
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Indication(2)));
        }
    }

    mod clearing {
        use super::*;

        #[test]
        fn test_still_empty() {
            let mut queue = Queue8::new();
            queue.clear_indications_and_confirmations();
            assert_eq!(queue.dequeue_indication_or_confirmation(), None);
        }

        #[test]
        fn test_clear_all() {
            let mut queue = Queue3::new();
            assert!(queue.queue_notification(2));
            assert!(queue.queue_indication(2));

            queue.clear_indications_and_confirmations();
            assert_eq!(queue.dequeue_indication_or_confirmation(), None);
        }

        #[test]
        fn test_clear_outstanding_confirmation() {
            let mut queue = Queue3::new();
            assert!(queue.queue_indication(2));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Indication(2)));

            queue.clear_indications_and_confirmations();

            assert!(queue.queue_indication(2));
            assert_eq!(queue.dequeue_indication_or_confirmation(), Some(Indication(2)));
        }
    }

    #[test]
    fn test_no_characteristics() {
        let mut queue = NotificationArbiter::<0, 0>::new();
        assert_eq!(queue.len(), 0);
        assert!(!queue.queue_notification(0));
        assert_eq!(queue.dequeue_indication_or_confirmation(), None);
    }
}
