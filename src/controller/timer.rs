// src/controller/timer.rs

/// What a single one-second tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    Tick,
    /// Fired once, the first tick remaining time drops to the warning threshold.
    Warning { remaining_seconds: u64 },
    /// Fired once, when remaining time reaches zero.
    Expired,
}

/// Elapsed-time counter for one attempt, optionally bounded by a time limit.
#[derive(Debug, Clone)]
pub struct AttemptTimer {
    elapsed: u64,
    limit: Option<u64>,
    warning_at: u64,
    warned: bool,
    expired: bool,
}

impl AttemptTimer {
    pub fn new(limit_seconds: Option<u64>, warning_at: u64) -> Self {
        Self {
            elapsed: 0,
            limit: limit_seconds,
            warning_at,
            warned: false,
            expired: false,
        }
    }

    pub fn tick(&mut self) -> TimerSignal {
        self.elapsed += 1;

        let Some(remaining) = self.remaining() else {
            return TimerSignal::Tick;
        };

        if remaining == 0 {
            if self.expired {
                return TimerSignal::Tick;
            }
            self.expired = true;
            return TimerSignal::Expired;
        }

        if !self.warned && remaining <= self.warning_at {
            self.warned = true;
            return TimerSignal::Warning {
                remaining_seconds: remaining,
            };
        }

        TimerSignal::Tick
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    /// `None` for untimed attempts.
    pub fn remaining(&self) -> Option<u64> {
        self.limit.map(|limit| limit.saturating_sub(self.elapsed))
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}
