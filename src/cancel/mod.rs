/// Monotonic solve clock
pub mod clock;
/// Cancellation state and handler logic
pub mod context;
/// Cancellation policy config
pub mod config;
/// Statistics reporter seam
pub mod report;
/// Signal registration
pub mod signals;

#[cfg(test)]
pub(crate) mod test_util {
    use std::sync::{Mutex, MutexGuard};

    /// Signal dispositions are process-wide, but the test harness runs tests on parallel threads.
    static SIGNAL_LOCK: Mutex<()> = Mutex::new(());

    pub fn signal_lock() -> MutexGuard<'static, ()> {
        SIGNAL_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }
}
