// src/controller/mod.rs

pub mod environment;
pub mod integrity;
pub mod ordering;
pub mod state;
pub mod timer;

use chrono::Utc;
use rand::{Rng, SeedableRng, rngs::StdRng};

pub use environment::{Environment, Notice};
pub use integrity::{IntegrityEvent, IntegrityFeed, IntegrityReporter, IntegritySource};
pub use state::{AttemptProgress, AttemptState, AttemptStatus, SubmissionRequest, SubmitReason};

use crate::{
    config::AttemptPolicy,
    error::AttemptError,
    grading::GradingService,
    models::{
        AnswerSheet, AnswerValue, Question, QuestionFeedback, QuestionType, Quiz, SubmissionResult,
    },
};
use integrity::ViolationOutcome;
use timer::{AttemptTimer, TimerSignal};

/// Drives one quiz attempt from start to graded feedback.
///
/// All mutation happens synchronously inside the caller's event callback.
/// The only suspension points are the two grading-service calls
/// (`start` and `dispatch`), and a second submission cannot be issued
/// while one is outstanding.
pub struct QuizAttemptController<E, R = StdRng> {
    quiz: Quiz,
    policy: AttemptPolicy,
    env: E,
    rng: R,
    attempts_used: u32,
    state: AttemptState,
    next_request_id: u64,
}

impl<E: Environment> QuizAttemptController<E, StdRng> {
    pub fn new(quiz: Quiz, env: E, policy: AttemptPolicy) -> Self {
        Self::with_rng(quiz, env, policy, StdRng::from_entropy())
    }
}

impl<E: Environment, R: Rng> QuizAttemptController<E, R> {
    pub fn with_rng(quiz: Quiz, env: E, policy: AttemptPolicy, rng: R) -> Self {
        let status = if quiz.questions.is_empty() {
            AttemptStatus::Unavailable
        } else {
            AttemptStatus::NotStarted
        };
        Self {
            state: AttemptState::fresh(1, status, policy.violation_limit),
            quiz,
            policy,
            env,
            rng,
            attempts_used: 0,
            next_request_id: 1,
        }
    }

    /// Attempts already consumed before this controller was created.
    pub fn with_attempts_used(mut self, used: u32) -> Self {
        self.attempts_used = used;
        self.state.attempt_number = used + 1;
        self
    }

    // ----- Accessors -----

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    pub fn status(&self) -> AttemptStatus {
        self.state.status
    }

    pub fn environment(&self) -> &E {
        &self.env
    }

    pub fn environment_mut(&mut self) -> &mut E {
        &mut self.env
    }

    pub fn attempts_used(&self) -> u32 {
        self.attempts_used
    }

    pub fn attempt_number(&self) -> u32 {
        self.state.attempt_number
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.state.timer.elapsed()
    }

    pub fn remaining_seconds(&self) -> Option<u64> {
        self.state.timer.remaining()
    }

    pub fn violation_count(&self) -> u32 {
        self.state.monitor.count()
    }

    pub fn answers(&self) -> &AnswerSheet {
        &self.state.answers
    }

    pub fn progress(&self) -> AttemptProgress {
        self.state.progress()
    }

    pub fn last_result(&self) -> Option<&SubmissionResult> {
        self.state.result.as_ref()
    }

    pub fn last_error(&self) -> Option<&AttemptError> {
        self.state.last_error.as_ref()
    }

    pub fn submission_in_flight(&self) -> bool {
        self.state.in_flight.is_some()
    }

    pub fn awaiting_confirmation(&self) -> bool {
        self.state.awaiting_confirmation
    }

    /// Question sequence of the current attempt, fixed at start.
    pub fn questions(&self) -> &[Question] {
        &self.state.questions
    }

    pub fn question_order(&self) -> Vec<String> {
        self.state.questions.iter().map(|q| q.id.clone()).collect()
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.state.questions.get(self.state.current_index)
    }

    // ----- Start -----

    /// `not-started -> in-progress`.
    pub async fn start<G: GradingService + ?Sized>(
        &mut self,
        grader: &G,
    ) -> Result<(), AttemptError> {
        match self.state.status {
            AttemptStatus::NotStarted => {}
            AttemptStatus::Unavailable => {
                return Err(AttemptError::QuizUnavailable(
                    "this quiz has no questions".to_string(),
                ));
            }
            status => {
                return Err(AttemptError::InvalidTransition {
                    action: "start",
                    status,
                });
            }
        }

        if let Some(max) = self.quiz.attempt_cap() {
            if self.attempts_used >= max {
                tracing::info!(
                    "Start of quiz '{}' refused: {} of {} attempts used",
                    self.quiz.id,
                    self.attempts_used,
                    max
                );
                return Err(AttemptError::AttemptLimitExceeded {
                    used: self.attempts_used,
                    max: max as i32,
                });
            }
        }

        let started = grader
            .start_attempt(&self.quiz.id)
            .await
            .map_err(|e| match e {
                AttemptError::AttemptLimitExceeded { .. } | AttemptError::QuizUnavailable(_) => e,
                other => AttemptError::QuizUnavailable(other.to_string()),
            })?;

        self.quiz = started.quiz;
        if self.quiz.questions.is_empty() {
            self.state.status = AttemptStatus::Unavailable;
            return Err(AttemptError::QuizUnavailable(
                "this quiz has no questions".to_string(),
            ));
        }

        let mut state = AttemptState::fresh(
            self.state.attempt_number,
            AttemptStatus::InProgress,
            self.policy.violation_limit,
        );
        state.attempt_id = Some(started.attempt_id);
        state.started_at = Some(Utc::now());
        state.questions = ordering::presentation_order(&self.quiz, &mut self.rng);
        state.timer = AttemptTimer::new(
            self.quiz.time_limit_seconds(),
            self.policy.time_warning_seconds,
        );
        self.state = state;

        self.env.request_focus_mode();
        tracing::info!(
            "Attempt {} of quiz '{}' started ({} questions)",
            self.state.attempt_number,
            self.quiz.id,
            self.state.questions.len()
        );
        Ok(())
    }

    // ----- Navigation -----

    pub fn next(&mut self) -> Result<usize, AttemptError> {
        self.ensure_in_progress("navigate")?;
        if self.state.current_index + 1 < self.state.questions.len() {
            self.state.current_index += 1;
        }
        Ok(self.state.current_index)
    }

    pub fn previous(&mut self) -> Result<usize, AttemptError> {
        self.ensure_in_progress("navigate")?;
        self.state.current_index = self.state.current_index.saturating_sub(1);
        Ok(self.state.current_index)
    }

    pub fn jump_to(&mut self, index: usize) -> Result<usize, AttemptError> {
        self.ensure_in_progress("navigate")?;
        if index >= self.state.questions.len() {
            return Err(AttemptError::NotFound(format!(
                "question {} (quiz has {})",
                index + 1,
                self.state.questions.len()
            )));
        }
        self.state.current_index = index;
        Ok(index)
    }

    // ----- Answers -----

    /// Sets exactly one entry of the answer sheet.
    pub fn answer(&mut self, question_id: &str, value: AnswerValue) -> Result<(), AttemptError> {
        self.ensure_editable("answer")?;
        let question = self.find_question(question_id)?;
        check_answer(question, &value)?;
        self.state.answers.insert(question_id, value);
        Ok(())
    }

    pub fn answer_current(&mut self, value: AnswerValue) -> Result<(), AttemptError> {
        let question_id = self.current_question_id("answer")?;
        self.answer(&question_id, value)
    }

    /// Adds or removes one option of a multiple-choice answer.
    pub fn toggle_choice(&mut self, question_id: &str, option_id: &str) -> Result<(), AttemptError> {
        self.ensure_editable("answer")?;
        let question = self.find_question(question_id)?;
        if question.question_type != QuestionType::MultipleChoice {
            return Err(AttemptError::InvalidAnswer(format!(
                "question {} is {}, not multiple_choice",
                question_id, question.question_type
            )));
        }
        if question.option(option_id).is_none() {
            return Err(AttemptError::InvalidAnswer(format!(
                "question {} has no option {}",
                question_id, option_id
            )));
        }

        let mut selected = match self.state.answers.get(question_id) {
            Some(AnswerValue::MultiChoice(ids)) => ids.clone(),
            _ => Vec::new(),
        };
        if let Some(pos) = selected.iter().position(|id| id == option_id) {
            selected.remove(pos);
        } else {
            selected.push(option_id.to_string());
        }
        self.state
            .answers
            .insert(question_id, AnswerValue::MultiChoice(selected));
        Ok(())
    }

    pub fn clear_answer(&mut self, question_id: &str) -> Result<(), AttemptError> {
        self.ensure_editable("answer")?;
        self.find_question(question_id)?;
        self.state.answers.remove(question_id);
        Ok(())
    }

    // ----- Manual submit -----

    /// First half of a manual submit: checks completeness and asks for confirmation.
    ///
    /// `Ok(false)` is a no-op: the attempt is already finished or a submission is outstanding.
    pub fn request_submit(&mut self) -> Result<bool, AttemptError> {
        if self.submission_closed() {
            return Ok(false);
        }
        self.ensure_in_progress("submit")?;
        self.ensure_unlocked()?;

        let progress = self.state.progress();
        if !progress.is_complete() {
            return Err(AttemptError::IncompleteAnswers {
                answered: progress.answered,
                total: progress.total,
            });
        }

        self.state.awaiting_confirmation = true;
        self.env.notify(Notice::ConfirmSubmit {
            answered: progress.answered,
            total: progress.total,
        });
        Ok(true)
    }

    pub fn cancel_submit(&mut self) {
        self.state.awaiting_confirmation = false;
    }

    /// Second half of a manual submit. `Ok(None)` is a no-op, as for `request_submit`.
    pub fn confirm_submit(&mut self) -> Result<Option<SubmissionRequest>, AttemptError> {
        if self.submission_closed() {
            return Ok(None);
        }
        self.ensure_in_progress("confirm submit")?;
        self.ensure_unlocked()?;
        if !self.state.awaiting_confirmation {
            return Err(AttemptError::InvalidTransition {
                action: "confirm submit before requesting it",
                status: self.state.status,
            });
        }

        let progress = self.state.progress();
        if !progress.is_complete() {
            self.state.awaiting_confirmation = false;
            return Err(AttemptError::IncompleteAnswers {
                answered: progress.answered,
                total: progress.total,
            });
        }

        let answers = self.state.answers.clone();
        Ok(self.begin_submission(SubmitReason::Manual, answers))
    }

    // ----- Timer and integrity -----

    /// One-second tick. Returns the timeout submission when time runs out.
    pub fn tick(&mut self) -> Option<SubmissionRequest> {
        if self.state.status != AttemptStatus::InProgress {
            return None;
        }

        match self.state.timer.tick() {
            TimerSignal::Tick => None,
            TimerSignal::Warning { remaining_seconds } => {
                tracing::warn!(
                    "Quiz '{}': {} seconds remaining",
                    self.quiz.id,
                    remaining_seconds
                );
                self.env.notify(Notice::TimeWarning { remaining_seconds });
                None
            }
            TimerSignal::Expired => {
                tracing::warn!(
                    "Quiz '{}': time expired after {} seconds, submitting",
                    self.quiz.id,
                    self.state.timer.elapsed()
                );
                self.env.notify(Notice::TimeExpired);
                let answers = self.state.answers.clone();
                self.begin_submission(SubmitReason::Timeout, answers)
            }
        }
    }

    /// Records an integrity signal. Returns the zero-score submission once the limit is hit.
    pub fn record_violation(&mut self, event: IntegrityEvent) -> Option<SubmissionRequest> {
        if self.state.status != AttemptStatus::InProgress {
            return None;
        }

        match self.state.monitor.record(event) {
            ViolationOutcome::Ignored => None,
            ViolationOutcome::Warned { count, limit } => {
                tracing::warn!(
                    "Quiz '{}': integrity violation {}/{} ({})",
                    self.quiz.id,
                    count,
                    limit,
                    event
                );
                self.env.notify(Notice::ViolationWarning {
                    event,
                    count,
                    limit,
                });
                None
            }
            ViolationOutcome::LimitReached { count } => {
                tracing::warn!(
                    "Quiz '{}': violation limit reached ({}), forcing empty submission",
                    self.quiz.id,
                    event
                );
                self.env.notify(Notice::ViolationWarning {
                    event,
                    count,
                    limit: self.state.monitor.limit(),
                });
                self.env.notify(Notice::ForcedSubmit);
                let blank = AnswerSheet::blank_for(&self.state.questions);
                self.begin_submission(SubmitReason::Violation, blank)
            }
        }
    }

    // ----- Submission handoff -----

    /// Sends `request` to the grading service and applies the outcome.
    pub async fn dispatch<G: GradingService + ?Sized>(
        &mut self,
        grader: &G,
        request: SubmissionRequest,
    ) -> Result<SubmissionResult, AttemptError> {
        let outcome = grader
            .submit_attempt(&request.quiz_id, &request.attempt_id, &request.answers)
            .await;
        self.complete_submission(request, outcome)
    }

    /// Applies the grading outcome of an outstanding request.
    ///
    /// Success moves to `completed`. Failure stays `in-progress`, keeps the
    /// request for `retry_submission` and surfaces the error. The answer
    /// sheet stays locked until that retry succeeds.
    pub fn complete_submission(
        &mut self,
        mut request: SubmissionRequest,
        outcome: Result<SubmissionResult, AttemptError>,
    ) -> Result<SubmissionResult, AttemptError> {
        if self.state.in_flight != Some(request.id) {
            return Err(AttemptError::InvalidTransition {
                action: "complete a submission that is not outstanding",
                status: self.state.status,
            });
        }
        self.state.in_flight = None;

        match outcome {
            Ok(result) => {
                self.state.status = AttemptStatus::Completed;
                self.state.submit_reason = Some(request.reason);
                self.state.failed_request = None;
                self.state.last_error = None;
                self.attempts_used = (self.attempts_used + 1).max(result.attempt_number);
                self.state.result = Some(result.clone());

                self.env.release_focus_mode();
                self.env.notify(Notice::Submitted {
                    score: result.score,
                    passed: result.passed,
                });
                tracing::info!(
                    "Attempt {} of quiz '{}' graded ({}): score {}, passed {}",
                    result.attempt_number,
                    self.quiz.id,
                    request.reason,
                    result.score,
                    result.passed
                );
                Ok(result)
            }
            Err(e) => {
                let err = match e {
                    AttemptError::SubmissionFailed(_) => e,
                    other => AttemptError::SubmissionFailed(other.to_string()),
                };
                tracing::error!(
                    "Submission of quiz '{}' ({}) failed: {}",
                    self.quiz.id,
                    request.reason,
                    err
                );

                // Limits crossed while the call was outstanding still apply on retry.
                if self.state.monitor.limit_reached() {
                    request.reason = SubmitReason::Violation;
                    request.answers = AnswerSheet::blank_for(&self.state.questions);
                    self.state.locked_by = Some(SubmitReason::Violation);
                } else if self.state.timer.is_expired() && self.state.locked_by.is_none() {
                    request.reason = SubmitReason::Timeout;
                    self.state.locked_by = Some(SubmitReason::Timeout);
                }

                self.state.failed_request = Some(request);
                self.state.last_error = Some(err.clone());
                self.env.notify(Notice::SubmissionFailed(err.to_string()));
                Err(err)
            }
        }
    }

    /// Re-issues the last failed submission with the same answer sheet.
    pub fn retry_submission(&mut self) -> Result<Option<SubmissionRequest>, AttemptError> {
        if self.submission_closed() {
            return Ok(None);
        }
        self.ensure_in_progress("retry submission")?;
        let Some(failed) = self.state.failed_request.take() else {
            return Err(AttemptError::InvalidTransition {
                action: "retry without a failed submission",
                status: self.state.status,
            });
        };
        tracing::info!("Retrying {} for quiz '{}'", failed.reason, self.quiz.id);
        Ok(self.begin_submission(failed.reason, failed.answers))
    }

    // ----- After completion -----

    /// `completed <-> viewing-feedback`. No side effects.
    pub fn toggle_feedback(&mut self) -> Result<AttemptStatus, AttemptError> {
        self.state.status = match self.state.status {
            AttemptStatus::Completed => AttemptStatus::ViewingFeedback,
            AttemptStatus::ViewingFeedback => AttemptStatus::Completed,
            status => {
                return Err(AttemptError::InvalidTransition {
                    action: "view feedback",
                    status,
                });
            }
        };
        Ok(self.state.status)
    }

    /// Per-question detail, only while viewing feedback.
    pub fn feedback(&self) -> Option<&[QuestionFeedback]> {
        if self.state.status != AttemptStatus::ViewingFeedback {
            return None;
        }
        self.state.result.as_ref().map(|r| r.feedback.as_slice())
    }

    /// `completed -> not-started` with a brand-new attempt state.
    pub fn retake(&mut self) -> Result<(), AttemptError> {
        let status = self.state.status;
        if !matches!(
            status,
            AttemptStatus::Completed | AttemptStatus::ViewingFeedback
        ) {
            return Err(AttemptError::InvalidTransition {
                action: "retake",
                status,
            });
        }

        let Some(result) = self.state.result.as_ref() else {
            return Err(AttemptError::InvalidTransition {
                action: "retake an ungraded attempt",
                status,
            });
        };
        if !result.allows_retake() {
            return Err(AttemptError::RetakeNotAllowed(
                "no attempts remaining".to_string(),
            ));
        }
        if let Some(max) = self.quiz.attempt_cap() {
            if self.attempts_used >= max {
                return Err(AttemptError::RetakeNotAllowed(format!(
                    "{} of {} attempts used",
                    self.attempts_used, max
                )));
            }
        }

        let next = self.state.attempt_number + 1;
        self.state = AttemptState::fresh(next, AttemptStatus::NotStarted, self.policy.violation_limit);
        tracing::info!("Quiz '{}' ready for attempt {}", self.quiz.id, next);
        Ok(())
    }

    /// Discards an unfinished attempt (view closed or navigated away).
    pub fn abandon(&mut self) {
        if self.state.status != AttemptStatus::InProgress {
            return;
        }
        self.env.release_focus_mode();
        tracing::info!(
            "Attempt {} of quiz '{}' abandoned after {} seconds",
            self.state.attempt_number,
            self.quiz.id,
            self.state.timer.elapsed()
        );
        self.state = AttemptState::fresh(
            self.state.attempt_number,
            AttemptStatus::NotStarted,
            self.policy.violation_limit,
        );
    }

    // ----- Internals -----

    fn begin_submission(
        &mut self,
        reason: SubmitReason,
        answers: AnswerSheet,
    ) -> Option<SubmissionRequest> {
        if self.state.status != AttemptStatus::InProgress || self.state.in_flight.is_some() {
            return None;
        }
        let attempt_id = self.state.attempt_id.clone()?;

        let id = self.next_request_id;
        self.next_request_id += 1;

        self.state.in_flight = Some(id);
        self.state.awaiting_confirmation = false;
        self.state.failed_request = None;
        if reason != SubmitReason::Manual {
            self.state.locked_by = Some(reason);
        }

        Some(SubmissionRequest {
            id,
            reason,
            quiz_id: self.quiz.id.clone(),
            attempt_id,
            answers,
        })
    }

    /// True when any further submission trigger must be ignored.
    fn submission_closed(&self) -> bool {
        matches!(
            self.state.status,
            AttemptStatus::Completed | AttemptStatus::ViewingFeedback
        ) || self.state.in_flight.is_some()
    }

    fn ensure_in_progress(&self, action: &'static str) -> Result<(), AttemptError> {
        if self.state.status != AttemptStatus::InProgress {
            return Err(AttemptError::InvalidTransition {
                action,
                status: self.state.status,
            });
        }
        Ok(())
    }

    fn ensure_unlocked(&self) -> Result<(), AttemptError> {
        if let Some(reason) = self.state.locked_by {
            return Err(AttemptError::AttemptLocked(format!(
                "submitted after {}, use retry",
                reason
            )));
        }
        Ok(())
    }

    fn ensure_editable(&self, action: &'static str) -> Result<(), AttemptError> {
        self.ensure_in_progress(action)?;
        if self.state.in_flight.is_some() {
            return Err(AttemptError::AttemptLocked(
                "a submission is in progress".to_string(),
            ));
        }
        // A retry must send exactly the sheet that failed.
        if self.state.failed_request.is_some() {
            return Err(AttemptError::AttemptLocked(
                "the last submission failed, use retry".to_string(),
            ));
        }
        self.ensure_unlocked()
    }

    fn find_question(&self, question_id: &str) -> Result<&Question, AttemptError> {
        self.state
            .questions
            .iter()
            .find(|q| q.id == question_id)
            .ok_or_else(|| AttemptError::NotFound(format!("question {}", question_id)))
    }

    fn current_question_id(&self, action: &'static str) -> Result<String, AttemptError> {
        self.ensure_in_progress(action)?;
        self.current_question()
            .map(|q| q.id.clone())
            .ok_or_else(|| AttemptError::NotFound("current question".to_string()))
    }
}

/// Checks the value shape against the question type and option ids.
fn check_answer(question: &Question, value: &AnswerValue) -> Result<(), AttemptError> {
    if !value.matches_type(question.question_type) {
        return Err(AttemptError::InvalidAnswer(format!(
            "wrong answer kind for {} question {}",
            question.question_type, question.id
        )));
    }

    let unknown = match value {
        AnswerValue::Choice(id) if !id.is_empty() => {
            question.option(id).is_none().then(|| id.clone())
        }
        AnswerValue::MultiChoice(ids) => ids.iter().find(|id| question.option(id).is_none()).cloned(),
        _ => None,
    };

    match unknown {
        Some(id) => Err(AttemptError::InvalidAnswer(format!(
            "question {} has no option {}",
            question.id, id
        ))),
        None => Ok(()),
    }
}
