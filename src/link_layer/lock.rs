//! Scoped critical sections
//!
//! The data buffer's main-thread operations touch the same ring positions
//! as the radio interrupt. They run with a [`LockGuard`] held: constructing
//! the guard keeps the interrupt out, dropping it lets the interrupt in again.

use core::marker::PhantomData;

use critical_section::RestoreState;

/// A critical section held for as long as the guard lives.
///
/// Guards are acquired and dropped within a single method of the data
/// buffer, so they always nest properly.
pub trait LockGuard: Sized {
    /// Enter the critical section
    fn acquire() -> Self;
}

/// No locking at all.
///
/// For buffers only ever used from a single execution context, e.g. when the
/// radio driver polls instead of using interrupts, and for host tests.
#[derive(Debug)]
pub struct NoLock;

impl LockGuard for NoLock {
    fn acquire() -> Self {
        NoLock
    }
}

/// Critical section provided by the platform's `critical-section` implementation
///
/// On single core microcontrollers this disables interrupts and restores the
/// previous interrupt state when dropped.
pub struct CriticalSectionLock {
    restore_state: RestoreState,
    // The restore state belongs to the context that acquired it
    _not_send: PhantomData<*const ()>,
}

impl LockGuard for CriticalSectionLock {
    fn acquire() -> Self {
        // SAFETY: released exactly once, in `drop`
        let restore_state = unsafe { critical_section::acquire() };

        Self {
            restore_state,
            _not_send: PhantomData,
        }
    }
}

impl Drop for CriticalSectionLock {
    fn drop(&mut self) {
        // SAFETY: `restore_state` came from the matching `acquire`
        unsafe { critical_section::release(self.restore_state) }
    }
}


#[cfg(test)]
mod tests {
    use super::mock::TrackingLock;
    use super::*;

    #[test]
    fn test_critical_section_lock_nests() {
        let outer = CriticalSectionLock::acquire();
        {
            let _inner = CriticalSectionLock::acquire();
        }
        let value = critical_section::with(|_| 42);
        drop(outer);

        assert_eq!(value, 42);
    }

    #[test]
    fn test_tracking_lock_is_released_on_drop() {
        let before = TrackingLock::acquisitions();
        {
            let _lock = TrackingLock::acquire();
            assert!(TrackingLock::is_locked());
        }
        assert!(!TrackingLock::is_locked());
        assert_eq!(TrackingLock::acquisitions(), before + 1);
    }
}
