// src/handlers/console.rs

use crate::controller::{
    Environment, IntegrityEvent, IntegrityFeed, IntegrityReporter, IntegritySource, Notice,
};

/// Terminal host: buffers output lines and forwards simulated integrity signals.
#[derive(Debug, Default)]
pub struct ConsoleEnvironment {
    outbox: Vec<String>,
    focus_mode: bool,
    reporter: Option<IntegrityReporter>,
}

impl ConsoleEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn say(&mut self, line: impl Into<String>) {
        self.outbox.push(line.into());
    }

    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.outbox)
    }

    pub fn in_focus_mode(&self) -> bool {
        self.focus_mode
    }

    /// Pushes a signal into the subscribed feed. Returns false without a subscriber.
    pub fn signal(&self, event: IntegrityEvent) -> bool {
        self.reporter
            .as_ref()
            .is_some_and(|reporter| reporter.report(event))
    }
}

impl IntegritySource for ConsoleEnvironment {
    fn subscribe(&mut self) -> IntegrityFeed {
        let (reporter, feed) = IntegrityFeed::channel();
        self.reporter = Some(reporter);
        feed
    }
}

impl Environment for ConsoleEnvironment {
    fn request_focus_mode(&mut self) {
        self.focus_mode = true;
        self.say("[exam mode on: stay in this window until you submit]");
    }

    fn release_focus_mode(&mut self) {
        self.focus_mode = false;
        self.say("[exam mode off]");
    }

    fn notify(&mut self, notice: Notice) {
        let line = match notice {
            Notice::ViolationWarning {
                event,
                count,
                limit,
            } => format!(
                "WARNING: {} detected ({} of {}). At {} the attempt is submitted with no answers.",
                event, count, limit, limit
            ),
            Notice::TimeWarning { remaining_seconds } => {
                format!("WARNING: {} seconds left.", remaining_seconds)
            }
            Notice::TimeExpired => "Time is up. Submitting your answers.".to_string(),
            Notice::ForcedSubmit => {
                "Too many integrity violations. Attempt submitted with no answers.".to_string()
            }
            Notice::ConfirmSubmit { answered, total } => format!(
                "Submit {} of {} answers? You cannot change them afterwards. (confirm/cancel)",
                answered, total
            ),
            Notice::Submitted { score, passed } => format!(
                "Submitted. Score: {}% ({})",
                score,
                if passed { "passed" } else { "not passed" }
            ),
            Notice::SubmissionFailed(msg) => format!("{}. Type retry to try again.", msg),
        };
        self.say(line);
    }
}
