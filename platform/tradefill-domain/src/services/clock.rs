use std::time::Duration;

/// Source of "now" and of blocking waits, injected so planning and retry
/// timing can be driven deterministically.
pub trait Clock {
    fn now_ts(&self) -> i64;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ts(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}
