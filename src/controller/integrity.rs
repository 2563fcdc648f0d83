// src/controller/integrity.rs

use std::fmt;

use tokio::sync::mpsc;

/// Environment signal suggesting the taker left the exam surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrityEvent {
    TabHidden,
    WindowBlurred,
    FullscreenExited,
    /// Screenshot or print shortcut. Cannot be blocked, only flagged.
    ScreenshotAttempt,
}

impl fmt::Display for IntegrityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IntegrityEvent::TabHidden => "tab hidden",
            IntegrityEvent::WindowBlurred => "window lost focus",
            IntegrityEvent::FullscreenExited => "full screen exited",
            IntegrityEvent::ScreenshotAttempt => "screenshot attempt",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationOutcome {
    /// Limit already reached; the count no longer moves.
    Ignored,
    Warned { count: u32, limit: u32 },
    LimitReached { count: u32 },
}

/// Monotonic violation counter for one attempt.
#[derive(Debug, Clone)]
pub struct IntegrityMonitor {
    count: u32,
    limit: u32,
}

impl IntegrityMonitor {
    pub fn new(limit: u32) -> Self {
        Self {
            count: 0,
            limit: limit.max(1),
        }
    }

    pub fn record(&mut self, _event: IntegrityEvent) -> ViolationOutcome {
        if self.limit_reached() {
            return ViolationOutcome::Ignored;
        }
        self.count += 1;
        if self.limit_reached() {
            ViolationOutcome::LimitReached { count: self.count }
        } else {
            ViolationOutcome::Warned {
                count: self.count,
                limit: self.limit,
            }
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn limit_reached(&self) -> bool {
        self.count >= self.limit
    }
}

/// Sending half handed to whatever watches the host surface.
#[derive(Debug, Clone)]
pub struct IntegrityReporter {
    tx: mpsc::UnboundedSender<IntegrityEvent>,
}

impl IntegrityReporter {
    /// Returns false once the feed has been dropped.
    pub fn report(&self, event: IntegrityEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Receiving half, drained by the host loop and forwarded to the controller.
#[derive(Debug)]
pub struct IntegrityFeed {
    rx: mpsc::UnboundedReceiver<IntegrityEvent>,
}

impl IntegrityFeed {
    pub fn channel() -> (IntegrityReporter, IntegrityFeed) {
        let (tx, rx) = mpsc::unbounded_channel();
        (IntegrityReporter { tx }, IntegrityFeed { rx })
    }

    pub async fn recv(&mut self) -> Option<IntegrityEvent> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Option<IntegrityEvent> {
        self.rx.try_recv().ok()
    }
}

/// Implemented by hosts that can observe visibility, focus, full screen and key signals.
pub trait IntegritySource {
    fn subscribe(&mut self) -> IntegrityFeed;
}
