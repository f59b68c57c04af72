//! Single-flight guard for block production.

use std::sync::atomic::{AtomicBool, Ordering};

/// Holds the in-progress flag for as long as it lives.
///
/// The flag is cleared on drop, so every exit path of a production cycle,
/// early returns and errors included, releases it.
#[derive(Debug)]
pub struct ProductionGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> ProductionGuard<'a> {
    /// `None` if another holder already set the flag.
    pub fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for ProductionGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
