// src/grading/mod.rs

pub mod local;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AttemptError,
    models::{AnswerSheet, StartedAttempt, SubmissionResult},
};

pub use local::LocalGrader;

/// The external service that opens attempts and scores answer sheets.
///
/// `submit_attempt` must be safe to call again after a failure: the
/// controller retries with the same attempt id and answers.
#[async_trait]
pub trait GradingService: Send + Sync {
    async fn start_attempt(&self, quiz_id: &str) -> Result<StartedAttempt, AttemptError>;

    async fn submit_attempt(
        &self,
        quiz_id: &str,
        attempt_id: &str,
        answers: &AnswerSheet,
    ) -> Result<SubmissionResult, AttemptError>;
}

#[async_trait]
impl<G: GradingService + ?Sized> GradingService for Arc<G> {
    async fn start_attempt(&self, quiz_id: &str) -> Result<StartedAttempt, AttemptError> {
        (**self).start_attempt(quiz_id).await
    }

    async fn submit_attempt(
        &self,
        quiz_id: &str,
        attempt_id: &str,
        answers: &AnswerSheet,
    ) -> Result<SubmissionResult, AttemptError> {
        (**self).submit_attempt(quiz_id, attempt_id, answers).await
    }
}
