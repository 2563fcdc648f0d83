// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quiz::Quiz;

/// Sentinel for "no attempt cap" in attempt accounting fields.
pub const UNLIMITED_ATTEMPTS: i32 = -1;

/// Returned by the grading service when an attempt is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartedAttempt {
    pub attempt_id: String,
    pub quiz: Quiz,
}

/// Per-question outcome shown in the feedback view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionFeedback {
    pub question_id: String,
    pub is_correct: bool,
    pub points_earned: i32,
    pub points_possible: i32,
    #[serde(default)]
    pub correct_option_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Essays are scored by a person later.
    #[serde(default)]
    pub requires_review: bool,
}

/// Grading outcome of one submitted attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    /// Percentage, 0 to 100.
    pub score: u32,
    pub passed: bool,
    pub attempt_number: u32,
    /// Attempt cap, `UNLIMITED_ATTEMPTS` when uncapped.
    pub total_attempts: i32,
    /// Attempts left, `UNLIMITED_ATTEMPTS` when uncapped.
    pub remaining_attempts: i32,
    #[serde(default)]
    pub feedback: Vec<QuestionFeedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
}

impl SubmissionResult {
    pub fn allows_retake(&self) -> bool {
        self.remaining_attempts == UNLIMITED_ATTEMPTS || self.remaining_attempts > 0
    }
}
