//! Session timer: a seconds counter with a start/stop lifecycle.

/// Whole seconds of active play.
///
/// The host drives it with one `tick` per elapsed second; there is no
/// wall-clock correction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timer {
    seconds: u64,
    running: bool,
}

impl Timer {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            seconds: 0,
            running: false,
        }
    }

    /// A stopped timer resumed at `seconds`.
    #[must_use]
    pub const fn resumed_at(seconds: u64) -> Self {
        Self {
            seconds,
            running: false,
        }
    }

    pub const fn start(&mut self) {
        self.running = true;
    }

    pub const fn stop(&mut self) {
        self.running = false;
    }

    /// Advance by one second when running. Returns whether the count moved.
    pub const fn tick(&mut self) -> bool {
        if self.running {
            self.seconds = self.seconds.saturating_add(1);
        }
        self.running
    }

    #[must_use]
    pub const fn seconds(&self) -> u64 {
        self.seconds
    }

    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn formatted(&self) -> String {
        format_mm_ss(self.seconds)
    }
}

/// `MM:SS`, with minutes allowed to grow past 59.
#[must_use]
pub fn format_mm_ss(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
