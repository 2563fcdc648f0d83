// src/error.rs

use std::fmt;

use crate::controller::AttemptStatus;

/// Crate-wide error enum.
/// Every failure a quiz attempt can surface to the user goes through here.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptError {
    // Zero questions, or the grading service refused to open the quiz.
    QuizUnavailable(String),

    // Every allowed attempt has been used.
    AttemptLimitExceeded { used: u32, max: i32 },

    // Network or validation failure reported by the grading service.
    SubmissionFailed(String),

    // Manual submit with unanswered questions.
    IncompleteAnswers { answered: usize, total: usize },

    RetakeNotAllowed(String),

    // Action not valid in the current status.
    InvalidTransition {
        action: &'static str,
        status: AttemptStatus,
    },

    InvalidAnswer(String),

    // Answers are frozen by a forced or outstanding submission.
    AttemptLocked(String),

    InvalidQuiz(String),

    NotFound(String),

    Io(String),

    PollTimeout { attempts: u32 },

    TaskFailed(String),
}

impl AttemptError {
    /// Whether the user can get past this error without leaving the attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AttemptError::AttemptLimitExceeded { .. }
                | AttemptError::SubmissionFailed(_)
                | AttemptError::IncompleteAnswers { .. }
                | AttemptError::InvalidAnswer(_)
        )
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptError::QuizUnavailable(msg) => write!(f, "quiz unavailable: {}", msg),
            AttemptError::AttemptLimitExceeded { used, max } => write!(
                f,
                "attempt limit reached ({} of {} used), contact your instructor for more attempts",
                used, max
            ),
            AttemptError::SubmissionFailed(msg) => write!(f, "submission failed: {}", msg),
            AttemptError::IncompleteAnswers { answered, total } => write!(
                f,
                "answer every question before submitting ({} of {} answered)",
                answered, total
            ),
            AttemptError::RetakeNotAllowed(msg) => write!(f, "retake not allowed: {}", msg),
            AttemptError::InvalidTransition { action, status } => {
                write!(f, "cannot {} while {}", action, status)
            }
            AttemptError::InvalidAnswer(msg) => write!(f, "invalid answer: {}", msg),
            AttemptError::AttemptLocked(msg) => write!(f, "attempt locked: {}", msg),
            AttemptError::InvalidQuiz(msg) => write!(f, "invalid quiz: {}", msg),
            AttemptError::NotFound(msg) => write!(f, "not found: {}", msg),
            AttemptError::Io(msg) => write!(f, "io error: {}", msg),
            AttemptError::PollTimeout { attempts } => {
                write!(f, "task did not finish after {} polls", attempts)
            }
            AttemptError::TaskFailed(msg) => write!(f, "task failed: {}", msg),
        }
    }
}

impl std::error::Error for AttemptError {}

/// Malformed quiz files are reported as invalid quizzes.
impl From<serde_json::Error> for AttemptError {
    fn from(err: serde_json::Error) -> Self {
        AttemptError::InvalidQuiz(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AttemptError {
    fn from(err: validator::ValidationErrors) -> Self {
        AttemptError::InvalidQuiz(err.to_string())
    }
}

impl From<std::io::Error> for AttemptError {
    fn from(err: std::io::Error) -> Self {
        AttemptError::Io(err.to_string())
    }
}
