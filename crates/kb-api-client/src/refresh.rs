//! Single-flight guard for token revalidation.
//!
//! At most one refresh runs at a time. Requests that arrive while one is in flight
//! do not wait for it; they go out with the token they already hold.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct RefreshCoordinator {
    in_flight: AtomicBool,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_refreshing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Claim the refresh slot. Returns `None` if another refresh holds it; the slot
    /// is released when the guard drops.
    pub fn try_begin(&self) -> Option<RefreshGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| RefreshGuard {
                flag: &self.in_flight,
            })
    }

    /// Force the slot free.
    pub fn reset(&self) {
        self.in_flight.store(false, Ordering::SeqCst);
    }
}

#[must_use = "the refresh slot is released as soon as the guard is dropped"]
pub struct RefreshGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_holder_at_a_time() {
        let coordinator = RefreshCoordinator::new();

        let guard = coordinator.try_begin().expect("slot should be free");
        assert!(coordinator.is_refreshing());
        assert!(coordinator.try_begin().is_none());

        drop(guard);
        assert!(!coordinator.is_refreshing());
        assert!(coordinator.try_begin().is_some());
    }

    #[test]
    fn reset_frees_slot() {
        let coordinator = RefreshCoordinator::new();
        let guard = coordinator.try_begin();
        std::mem::forget(guard);
        assert!(coordinator.is_refreshing());

        coordinator.reset();
        assert!(!coordinator.is_refreshing());
    }
}
