use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative stop flag shared between the interrupt handler and the
/// recorder loop.
///
/// `request_stop` only stores into an atomic: no allocation, no locking,
/// no I/O, so it is safe to call from a signal-handling context. The flag
/// is never reset; a session that has been asked to stop stays stopped.
#[derive(Clone, Debug, Default)]
pub struct ShutdownSignal {
    stop: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self {
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request a stop. Once this returns, every subsequent `should_stop`
    /// call on any clone observes `true`.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Non-blocking check, polled once per loop iteration.
    pub fn should_stop(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_clear() {
        let signal = ShutdownSignal::new();
        assert!(!signal.should_stop());
    }

    #[test]
    fn test_stop_visible_to_all_clones() {
        let signal = ShutdownSignal::new();
        let handler_side = signal.clone();

        handler_side.request_stop();
        assert!(signal.should_stop());
        assert!(handler_side.should_stop());
    }

    #[test]
    fn test_stop_is_sticky() {
        let signal = ShutdownSignal::new();
        signal.request_stop();
        signal.request_stop();
        assert!(signal.should_stop());
        assert!(signal.should_stop());
    }
}
