// src/controller/state.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::integrity::IntegrityMonitor;
use super::timer::AttemptTimer;
use crate::error::AttemptError;
use crate::models::{AnswerSheet, Question, SubmissionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    /// The quiz has no questions. Terminal.
    Unavailable,
    NotStarted,
    InProgress,
    Completed,
    /// Read-only detail view over a completed attempt.
    ViewingFeedback,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AttemptStatus::Unavailable => "unavailable",
            AttemptStatus::NotStarted => "not started",
            AttemptStatus::InProgress => "in progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::ViewingFeedback => "viewing feedback",
        };
        f.write_str(label)
    }
}

/// Which of the three completion paths produced a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    Manual,
    Timeout,
    Violation,
}

impl fmt::Display for SubmitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubmitReason::Manual => "manual submit",
            SubmitReason::Timeout => "time expired",
            SubmitReason::Violation => "integrity violations",
        };
        f.write_str(label)
    }
}

/// An answer sheet on its way to the grading service.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionRequest {
    pub id: u64,
    pub reason: SubmitReason,
    pub quiz_id: String,
    pub attempt_id: String,
    pub answers: AnswerSheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttemptProgress {
    pub answered: usize,
    pub total: usize,
    /// Rounded down.
    pub percent: u32,
}

impl AttemptProgress {
    pub fn new(answered: usize, total: usize) -> Self {
        let percent = if total == 0 {
            0
        } else {
            (answered * 100 / total) as u32
        };
        Self {
            answered,
            total,
            percent,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.answered == self.total
    }
}

/// Everything owned by a single attempt. Replaced wholesale on retake.
#[derive(Debug, Clone)]
pub struct AttemptState {
    pub(crate) attempt_number: u32,
    pub(crate) attempt_id: Option<String>,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) status: AttemptStatus,
    pub(crate) questions: Vec<Question>,
    pub(crate) current_index: usize,
    pub(crate) answers: AnswerSheet,
    pub(crate) timer: AttemptTimer,
    pub(crate) monitor: IntegrityMonitor,
    pub(crate) awaiting_confirmation: bool,
    pub(crate) in_flight: Option<u64>,
    pub(crate) failed_request: Option<SubmissionRequest>,
    pub(crate) locked_by: Option<SubmitReason>,
    pub(crate) submit_reason: Option<SubmitReason>,
    pub(crate) result: Option<SubmissionResult>,
    pub(crate) last_error: Option<AttemptError>,
}

impl AttemptState {
    pub(crate) fn fresh(attempt_number: u32, status: AttemptStatus, violation_limit: u32) -> Self {
        Self {
            attempt_number,
            attempt_id: None,
            started_at: None,
            status,
            questions: Vec::new(),
            current_index: 0,
            answers: AnswerSheet::new(),
            timer: AttemptTimer::new(None, 0),
            monitor: IntegrityMonitor::new(violation_limit),
            awaiting_confirmation: false,
            in_flight: None,
            failed_request: None,
            locked_by: None,
            submit_reason: None,
            result: None,
            last_error: None,
        }
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    pub fn attempt_id(&self) -> Option<&str> {
        self.attempt_id.as_deref()
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn answers(&self) -> &AnswerSheet {
        &self.answers
    }

    pub fn violation_count(&self) -> u32 {
        self.monitor.count()
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.timer.elapsed()
    }

    pub fn submit_reason(&self) -> Option<SubmitReason> {
        self.submit_reason
    }

    pub(crate) fn progress(&self) -> AttemptProgress {
        let answered = self
            .questions
            .iter()
            .filter(|q| self.answers.is_answered(&q.id))
            .count();
        AttemptProgress::new(answered, self.questions.len())
    }
}
