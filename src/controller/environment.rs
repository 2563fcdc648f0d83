// src/controller/environment.rs

use super::integrity::IntegrityEvent;

/// User-facing notification raised by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    ViolationWarning {
        event: IntegrityEvent,
        count: u32,
        limit: u32,
    },
    TimeWarning {
        remaining_seconds: u64,
    },
    TimeExpired,
    /// Violation limit hit; the attempt is being submitted with no answers.
    ForcedSubmit,
    ConfirmSubmit {
        answered: usize,
        total: usize,
    },
    Submitted {
        score: u32,
        passed: bool,
    },
    SubmissionFailed(String),
}

/// The host surface the controller runs inside (browser tab, terminal, test double).
pub trait Environment {
    /// Ask for exclusive full-screen / focus mode at attempt start.
    fn request_focus_mode(&mut self);

    fn release_focus_mode(&mut self);

    fn notify(&mut self, notice: Notice);
}
