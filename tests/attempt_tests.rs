// tests/attempt_tests.rs

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use proctor::{
    AttemptError, GradingService, QuizAttemptController,
    config::AttemptPolicy,
    controller::{AttemptStatus, Environment, IntegrityEvent, Notice, SubmitReason},
    models::{
        AnswerOption, AnswerSheet, AnswerValue, Question, QuestionFeedback, QuestionType, Quiz,
        StartedAttempt, SubmissionResult, UNLIMITED_ATTEMPTS,
    },
};
use rand::{SeedableRng, rngs::StdRng};

/// Host double that records everything the controller asks of it.
#[derive(Debug, Default)]
struct RecordingEnv {
    notices: Vec<Notice>,
    focus_requests: u32,
    focus_releases: u32,
}

impl Environment for RecordingEnv {
    fn request_focus_mode(&mut self) {
        self.focus_requests += 1;
    }

    fn release_focus_mode(&mut self) {
        self.focus_releases += 1;
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice);
    }
}

/// Grading double with scripted outcomes.
struct MockGrader {
    quiz: Quiz,
    outcomes: Mutex<VecDeque<Result<SubmissionResult, AttemptError>>>,
    submissions: Mutex<Vec<AnswerSheet>>,
}

impl MockGrader {
    fn new(quiz: &Quiz) -> Self {
        Self {
            quiz: quiz.clone(),
            outcomes: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(Vec::new()),
        }
    }

    fn then(self, outcome: Result<SubmissionResult, AttemptError>) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    fn submissions(&self) -> Vec<AnswerSheet> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl GradingService for MockGrader {
    async fn start_attempt(&self, _quiz_id: &str) -> Result<StartedAttempt, AttemptError> {
        Ok(StartedAttempt {
            attempt_id: "attempt-1".to_string(),
            quiz: self.quiz.clone(),
        })
    }

    async fn submit_attempt(
        &self,
        _quiz_id: &str,
        _attempt_id: &str,
        answers: &AnswerSheet,
    ) -> Result<SubmissionResult, AttemptError> {
        self.submissions.lock().unwrap().push(answers.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(result(100, true, 1, UNLIMITED_ATTEMPTS, UNLIMITED_ATTEMPTS)))
    }
}

fn result(score: u32, passed: bool, attempt: u32, total: i32, remaining: i32) -> SubmissionResult {
    SubmissionResult {
        score,
        passed,
        attempt_number: attempt,
        total_attempts: total,
        remaining_attempts: remaining,
        feedback: Vec::new(),
        submitted_at: None,
    }
}

fn question(id: &str, order: i32) -> Question {
    Question {
        id: id.to_string(),
        order,
        text: format!("Question {}", id),
        question_type: QuestionType::SingleChoice,
        answers: ["A", "B", "C", "D"]
            .iter()
            .map(|o| AnswerOption {
                id: o.to_string(),
                text: format!("Option {}", o),
                is_correct: None,
            })
            .collect(),
        points: 1,
        explanation: None,
    }
}

fn quiz(questions: usize) -> Quiz {
    Quiz {
        id: "history-101".to_string(),
        title: "History basics".to_string(),
        questions: (1..=questions)
            .map(|i| question(&format!("q{}", i), i as i32))
            .collect(),
        time_limit: None,
        max_attempts: None,
        passing_score: 70,
        shuffle_questions: false,
        shuffle_answers: false,
    }
}

fn controller(quiz: &Quiz) -> QuizAttemptController<RecordingEnv, StdRng> {
    QuizAttemptController::with_rng(
        quiz.clone(),
        RecordingEnv::default(),
        AttemptPolicy::default(),
        StdRng::seed_from_u64(11),
    )
}

fn choice(id: &str) -> AnswerValue {
    AnswerValue::Choice(id.to_string())
}

#[tokio::test]
async fn test_manual_submit_scenario_single_attempt() {
    // Arrange: 3 questions, no shuffle, no time limit, one attempt allowed.
    let mut quiz = quiz(3);
    quiz.max_attempts = Some(1);
    let grader = MockGrader::new(&quiz).then(Ok(result(67, false, 1, 1, 0)));
    let mut attempt = controller(&quiz);

    // Act
    attempt.start(&grader).await.unwrap();
    attempt.answer("q1", choice("A")).unwrap();
    attempt.answer("q2", choice("B")).unwrap();
    let rejected = attempt.request_submit();

    // Assert
    assert_eq!(
        rejected,
        Err(AttemptError::IncompleteAnswers {
            answered: 2,
            total: 3
        })
    );
    assert_eq!(attempt.status(), AttemptStatus::InProgress);

    attempt.answer("q3", choice("C")).unwrap();
    assert_eq!(attempt.request_submit(), Ok(true));
    let request = attempt.confirm_submit().unwrap().expect("request issued");
    assert_eq!(request.reason, SubmitReason::Manual);

    let graded = attempt.dispatch(&grader, request).await.unwrap();
    assert_eq!(graded.score, 67);
    assert!(!graded.passed);
    assert_eq!(attempt.status(), AttemptStatus::Completed);
    assert_eq!(attempt.attempts_used(), 1);

    let submitted = &grader.submissions()[0];
    assert_eq!(submitted.get("q1"), Some(&choice("A")));
    assert_eq!(submitted.get("q3"), Some(&choice("C")));

    assert!(matches!(
        attempt.retake(),
        Err(AttemptError::RetakeNotAllowed(_))
    ));
}

#[tokio::test]
async fn test_confirm_requires_prior_request() {
    let quiz = quiz(1);
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();
    attempt.answer("q1", choice("A")).unwrap();

    assert!(matches!(
        attempt.confirm_submit(),
        Err(AttemptError::InvalidTransition { .. })
    ));

    attempt.request_submit().unwrap();
    attempt.cancel_submit();
    assert!(!attempt.awaiting_confirmation());
    assert!(attempt.confirm_submit().is_err());
}

#[tokio::test]
async fn test_three_focus_losses_force_blank_submission() {
    // Arrange
    let quiz = quiz(3);
    let grader = MockGrader::new(&quiz).then(Ok(result(0, false, 1, -1, -1)));
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();
    attempt.answer("q1", choice("A")).unwrap();
    attempt.answer("q2", choice("B")).unwrap();
    attempt.answer("q3", choice("C")).unwrap();

    // Act
    assert!(attempt.record_violation(IntegrityEvent::WindowBlurred).is_none());
    assert!(attempt.record_violation(IntegrityEvent::WindowBlurred).is_none());
    let request = attempt
        .record_violation(IntegrityEvent::WindowBlurred)
        .expect("third violation submits");
    attempt.dispatch(&grader, request).await.unwrap();

    // Assert
    assert_eq!(attempt.status(), AttemptStatus::Completed);
    assert_eq!(
        attempt.state().submit_reason(),
        Some(SubmitReason::Violation)
    );
    let submitted = &grader.submissions()[0];
    assert_eq!(submitted.len(), 3);
    for id in ["q1", "q2", "q3"] {
        assert_eq!(submitted.get(id), Some(&AnswerValue::Choice(String::new())));
    }

    // Further signals are ignored once the attempt is over.
    assert!(attempt.record_violation(IntegrityEvent::TabHidden).is_none());
    assert_eq!(attempt.violation_count(), 3);

    let warnings = attempt
        .environment()
        .notices
        .iter()
        .filter(|n| matches!(n, Notice::ViolationWarning { .. }))
        .count();
    assert_eq!(warnings, 3);
    assert!(attempt.environment().notices.contains(&Notice::ForcedSubmit));
}

#[tokio::test]
async fn test_mixed_signals_count_toward_the_same_limit() {
    let quiz = quiz(2);
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();

    assert!(attempt.record_violation(IntegrityEvent::TabHidden).is_none());
    assert!(attempt.record_violation(IntegrityEvent::ScreenshotAttempt).is_none());
    assert_eq!(attempt.violation_count(), 2);
    let request = attempt.record_violation(IntegrityEvent::FullscreenExited);
    assert_eq!(request.map(|r| r.reason), Some(SubmitReason::Violation));
}

#[tokio::test]
async fn test_signals_ignored_before_start() {
    let quiz = quiz(2);
    let mut attempt = controller(&quiz);
    assert!(attempt.record_violation(IntegrityEvent::TabHidden).is_none());
    assert_eq!(attempt.violation_count(), 0);
}

#[tokio::test]
async fn test_time_limit_expires_after_600_ticks() {
    // Arrange
    let mut quiz = quiz(3);
    quiz.time_limit = Some(10);
    let grader = MockGrader::new(&quiz).then(Ok(result(33, false, 1, -1, -1)));
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();
    attempt.answer("q2", choice("D")).unwrap();

    // Act
    for _ in 1..600 {
        assert!(attempt.tick().is_none());
    }
    assert_eq!(attempt.remaining_seconds(), Some(1));
    let request = attempt.tick().expect("tick 600 submits");

    // Assert
    assert_eq!(request.reason, SubmitReason::Timeout);
    assert_eq!(request.answers.len(), 1);
    assert_eq!(request.answers.get("q2"), Some(&choice("D")));

    attempt.dispatch(&grader, request).await.unwrap();
    assert_eq!(attempt.status(), AttemptStatus::Completed);
    assert_eq!(attempt.elapsed_seconds(), 600);

    let notices = &attempt.environment().notices;
    assert_eq!(
        notices
            .iter()
            .filter(|n| matches!(n, Notice::TimeWarning { .. }))
            .collect::<Vec<_>>(),
        vec![&Notice::TimeWarning {
            remaining_seconds: 60
        }]
    );
    assert!(notices.contains(&Notice::TimeExpired));

    // The timer stops with the attempt.
    assert!(attempt.tick().is_none());
    assert_eq!(attempt.elapsed_seconds(), 600);
}

#[tokio::test]
async fn test_untimed_attempt_never_expires() {
    let quiz = quiz(1);
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();

    for _ in 0..5000 {
        assert!(attempt.tick().is_none());
    }
    assert_eq!(attempt.status(), AttemptStatus::InProgress);
    assert_eq!(attempt.elapsed_seconds(), 5000);
    assert_eq!(attempt.remaining_seconds(), None);
}

#[tokio::test]
async fn test_navigation_stays_in_bounds() {
    let quiz = quiz(4);
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);

    assert!(matches!(
        attempt.next(),
        Err(AttemptError::InvalidTransition { .. })
    ));

    attempt.start(&grader).await.unwrap();
    assert_eq!(attempt.previous(), Ok(0));

    let moves = [1, 1, 1, 1, 1, -1, 1, -1, -1, -1, -1, -1, 1];
    for step in moves {
        let index = if step > 0 {
            attempt.next().unwrap()
        } else {
            attempt.previous().unwrap()
        };
        assert!(index < 4);
        assert_eq!(index, attempt.current_index());
    }

    assert_eq!(attempt.jump_to(3), Ok(3));
    assert_eq!(attempt.next(), Ok(3));
    assert!(matches!(attempt.jump_to(4), Err(AttemptError::NotFound(_))));
    assert_eq!(attempt.current_index(), 3);
}

#[tokio::test]
async fn test_navigation_does_not_require_answers() {
    let quiz = quiz(3);
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();

    attempt.next().unwrap();
    attempt.next().unwrap();
    assert_eq!(attempt.current_question().map(|q| q.id.as_str()), Some("q3"));
    assert_eq!(attempt.progress().answered, 0);
}

#[tokio::test]
async fn test_answers_are_checked_against_question() {
    let mut quiz = quiz(2);
    quiz.questions[1].question_type = QuestionType::MultipleChoice;
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();

    assert!(matches!(
        attempt.answer("q1", AnswerValue::Text("A".to_string())),
        Err(AttemptError::InvalidAnswer(_))
    ));
    assert!(matches!(
        attempt.answer("q1", choice("Z")),
        Err(AttemptError::InvalidAnswer(_))
    ));
    assert!(matches!(
        attempt.answer("q9", choice("A")),
        Err(AttemptError::NotFound(_))
    ));

    attempt.toggle_choice("q2", "A").unwrap();
    attempt.toggle_choice("q2", "C").unwrap();
    attempt.toggle_choice("q2", "A").unwrap();
    assert_eq!(
        attempt.answers().get("q2"),
        Some(&AnswerValue::MultiChoice(vec!["C".to_string()]))
    );
    assert!(attempt.toggle_choice("q1", "A").is_err());

    // Re-answering replaces the single entry.
    attempt.answer("q1", choice("A")).unwrap();
    attempt.answer("q1", choice("B")).unwrap();
    assert_eq!(attempt.answers().get("q1"), Some(&choice("B")));
    assert_eq!(attempt.answers().len(), 2);

    attempt.clear_answer("q1").unwrap();
    assert_eq!(attempt.progress().answered, 1);
}

#[tokio::test]
async fn test_submit_is_noop_while_in_flight_and_after_completion() {
    // Arrange
    let quiz = quiz(2);
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();
    attempt.answer("q1", choice("A")).unwrap();
    attempt.answer("q2", choice("A")).unwrap();
    attempt.request_submit().unwrap();
    let request = attempt.confirm_submit().unwrap().unwrap();

    // Act / Assert: every other trigger is ignored while the call is outstanding.
    assert!(attempt.submission_in_flight());
    assert_eq!(attempt.request_submit(), Ok(false));
    assert_eq!(attempt.confirm_submit(), Ok(None));
    assert_eq!(attempt.retry_submission(), Ok(None));
    for _ in 0..3 {
        assert!(attempt.record_violation(IntegrityEvent::TabHidden).is_none());
    }
    assert!(matches!(
        attempt.answer("q1", choice("B")),
        Err(AttemptError::AttemptLocked(_))
    ));

    attempt
        .complete_submission(request.clone(), Ok(result(100, true, 1, -1, -1)))
        .unwrap();
    assert_eq!(attempt.status(), AttemptStatus::Completed);

    assert_eq!(attempt.request_submit(), Ok(false));
    assert_eq!(attempt.confirm_submit(), Ok(None));
    assert!(attempt.tick().is_none());
    assert!(matches!(
        attempt.complete_submission(request, Ok(result(0, false, 2, -1, -1))),
        Err(AttemptError::InvalidTransition { .. })
    ));
    assert_eq!(attempt.last_result().map(|r| r.score), Some(100));
}

#[tokio::test]
async fn test_failed_submission_stays_in_progress_and_retry_reuses_answers() {
    // Arrange
    let quiz = quiz(2);
    let grader = MockGrader::new(&quiz)
        .then(Err(AttemptError::SubmissionFailed(
            "503 service unavailable".to_string(),
        )))
        .then(Ok(result(50, false, 1, -1, -1)));
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();
    attempt.answer("q1", choice("A")).unwrap();
    attempt.answer("q2", choice("C")).unwrap();
    attempt.request_submit().unwrap();
    let request = attempt.confirm_submit().unwrap().unwrap();

    // Act
    let failed = attempt.dispatch(&grader, request).await;

    // Assert
    assert!(matches!(failed, Err(AttemptError::SubmissionFailed(_))));
    assert_eq!(attempt.status(), AttemptStatus::InProgress);
    assert!(!attempt.submission_in_flight());
    assert!(attempt.last_error().is_some());
    assert_eq!(attempt.environment().focus_releases, 0);

    let retry = attempt.retry_submission().unwrap().unwrap();
    assert_eq!(retry.reason, SubmitReason::Manual);
    attempt.dispatch(&grader, retry).await.unwrap();

    assert_eq!(attempt.status(), AttemptStatus::Completed);
    assert!(attempt.last_error().is_none());
    let submissions = grader.submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0], submissions[1]);
}

#[tokio::test]
async fn test_answers_frozen_between_failure_and_retry() {
    // Arrange
    let quiz = quiz(2);
    let grader = MockGrader::new(&quiz)
        .then(Err(AttemptError::SubmissionFailed(
            "503 service unavailable".to_string(),
        )))
        .then(Ok(result(50, false, 1, -1, -1)));
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();
    attempt.answer("q1", choice("A")).unwrap();
    attempt.answer("q2", choice("C")).unwrap();
    attempt.request_submit().unwrap();
    let request = attempt.confirm_submit().unwrap().unwrap();
    assert!(attempt.dispatch(&grader, request).await.is_err());

    // Act
    let changed = attempt.answer("q1", choice("D"));
    let cleared = attempt.clear_answer("q2");
    let toggled = attempt.toggle_choice("q1", "B");

    // Assert
    assert!(matches!(changed, Err(AttemptError::AttemptLocked(_))));
    assert!(matches!(cleared, Err(AttemptError::AttemptLocked(_))));
    assert!(toggled.is_err());
    assert_eq!(attempt.answers().get("q1"), Some(&choice("A")));
    assert_eq!(attempt.progress().answered, 2);
    assert_eq!(attempt.next(), Ok(1));

    let retry = attempt.retry_submission().unwrap().unwrap();
    assert_eq!(&retry.answers, attempt.answers());
    attempt.dispatch(&grader, retry).await.unwrap();

    assert_eq!(attempt.status(), AttemptStatus::Completed);
    assert_eq!(grader.submissions()[1].get("q1"), Some(&choice("A")));
}

#[tokio::test]
async fn test_violation_blank_sheet_matches_question_types() {
    let mut quiz = quiz(3);
    quiz.questions[1].question_type = QuestionType::MultipleChoice;
    quiz.questions[2].question_type = QuestionType::ShortAnswer;
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();
    attempt
        .answer("q2", AnswerValue::MultiChoice(vec!["A".to_string()]))
        .unwrap();
    attempt
        .answer("q3", AnswerValue::Text("typed".to_string()))
        .unwrap();

    let mut request = None;
    for _ in 0..3 {
        request = attempt.record_violation(IntegrityEvent::TabHidden);
    }
    let request = request.expect("limit reached");

    assert_eq!(request.answers.get("q1"), Some(&choice("")));
    assert_eq!(
        request.answers.get("q2"),
        Some(&AnswerValue::MultiChoice(Vec::new()))
    );
    assert_eq!(
        request.answers.get("q3"),
        Some(&AnswerValue::Text(String::new()))
    );
}

#[tokio::test]
async fn test_retry_without_failure_is_rejected() {
    let quiz = quiz(1);
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();

    assert!(matches!(
        attempt.retry_submission(),
        Err(AttemptError::InvalidTransition { .. })
    ));
}

#[tokio::test]
async fn test_failed_forced_submission_locks_answers() {
    let mut quiz = quiz(2);
    quiz.time_limit = Some(1);
    let grader = MockGrader::new(&quiz)
        .then(Err(AttemptError::SubmissionFailed("timeout".to_string())));
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();
    attempt.answer("q1", choice("B")).unwrap();

    let mut request = None;
    for _ in 0..60 {
        if let Some(r) = attempt.tick() {
            request = Some(r);
        }
    }
    let request = request.expect("time limit reached");
    assert!(attempt.dispatch(&grader, request).await.is_err());

    assert_eq!(attempt.status(), AttemptStatus::InProgress);
    assert!(matches!(
        attempt.answer("q2", choice("A")),
        Err(AttemptError::AttemptLocked(_))
    ));
    assert!(matches!(
        attempt.request_submit(),
        Err(AttemptError::AttemptLocked(_))
    ));
    // Navigation still works while waiting to retry.
    assert_eq!(attempt.next(), Ok(1));

    let retry = attempt.retry_submission().unwrap().unwrap();
    assert_eq!(retry.reason, SubmitReason::Timeout);
    assert_eq!(retry.answers.get("q1"), Some(&choice("B")));
    assert_eq!(retry.answers.get("q2"), None);
}

#[tokio::test]
async fn test_violation_limit_during_failed_submit_forces_blank_retry() {
    let quiz = quiz(1);
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();
    attempt.answer("q1", choice("A")).unwrap();
    attempt.request_submit().unwrap();
    let request = attempt.confirm_submit().unwrap().unwrap();

    for _ in 0..3 {
        attempt.record_violation(IntegrityEvent::FullscreenExited);
    }
    let _ = attempt.complete_submission(
        request,
        Err(AttemptError::SubmissionFailed("connection reset".to_string())),
    );

    let retry = attempt.retry_submission().unwrap().unwrap();
    assert_eq!(retry.reason, SubmitReason::Violation);
    assert!(retry.answers.iter().all(|(_, v)| v.is_blank()));
}

#[tokio::test]
async fn test_retake_with_unlimited_attempts_is_fresh() {
    // Arrange
    let quiz = quiz(2);
    let grader = MockGrader::new(&quiz).then(Ok(result(50, false, 1, -1, -1)));
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();
    attempt.answer("q1", choice("A")).unwrap();
    attempt.answer("q2", choice("A")).unwrap();
    attempt.next().unwrap();
    attempt.record_violation(IntegrityEvent::TabHidden);
    attempt.tick();
    attempt.request_submit().unwrap();
    let request = attempt.confirm_submit().unwrap().unwrap();
    attempt.dispatch(&grader, request).await.unwrap();

    // Act
    attempt.retake().unwrap();

    // Assert
    assert_eq!(attempt.status(), AttemptStatus::NotStarted);
    assert_eq!(attempt.attempt_number(), 2);
    assert!(attempt.answers().is_empty());
    assert_eq!(attempt.violation_count(), 0);
    assert_eq!(attempt.elapsed_seconds(), 0);
    assert!(attempt.last_result().is_none());

    attempt.start(&grader).await.unwrap();
    assert_eq!(attempt.status(), AttemptStatus::InProgress);
    assert_eq!(attempt.current_index(), 0);
    assert_eq!(attempt.environment().focus_requests, 2);
}

#[tokio::test]
async fn test_retake_allowed_after_passing_while_attempts_remain() {
    let mut quiz = quiz(1);
    quiz.max_attempts = Some(3);
    let grader = MockGrader::new(&quiz).then(Ok(result(100, true, 1, 3, 2)));
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();
    attempt.answer("q1", choice("A")).unwrap();
    attempt.request_submit().unwrap();
    let request = attempt.confirm_submit().unwrap().unwrap();
    attempt.dispatch(&grader, request).await.unwrap();

    assert!(attempt.retake().is_ok());
}

#[tokio::test]
async fn test_retake_rejected_when_no_attempts_remain() {
    let quiz = quiz(1);
    let grader = MockGrader::new(&quiz).then(Ok(result(40, false, 3, 3, 0)));
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();
    attempt.answer("q1", choice("A")).unwrap();
    attempt.request_submit().unwrap();
    let request = attempt.confirm_submit().unwrap().unwrap();
    attempt.dispatch(&grader, request).await.unwrap();

    assert_eq!(
        attempt.retake(),
        Err(AttemptError::RetakeNotAllowed(
            "no attempts remaining".to_string()
        ))
    );
    assert_eq!(attempt.status(), AttemptStatus::Completed);
}

#[tokio::test]
async fn test_retake_rejected_before_completion() {
    let quiz = quiz(1);
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);
    assert!(attempt.retake().is_err());
    attempt.start(&grader).await.unwrap();
    assert!(attempt.retake().is_err());
}

#[tokio::test]
async fn test_attempt_limit_blocks_start() {
    let mut quiz = quiz(1);
    quiz.max_attempts = Some(2);
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz).with_attempts_used(2);

    assert_eq!(
        attempt.start(&grader).await,
        Err(AttemptError::AttemptLimitExceeded { used: 2, max: 2 })
    );
    assert_eq!(attempt.status(), AttemptStatus::NotStarted);
    assert_eq!(attempt.environment().focus_requests, 0);
}

#[tokio::test]
async fn test_empty_quiz_is_unavailable() {
    let quiz = quiz(0);
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);

    assert_eq!(attempt.status(), AttemptStatus::Unavailable);
    assert!(matches!(
        attempt.start(&grader).await,
        Err(AttemptError::QuizUnavailable(_))
    ));
    assert_eq!(attempt.status(), AttemptStatus::Unavailable);
    assert!(attempt.tick().is_none());
}

#[tokio::test]
async fn test_focus_mode_follows_attempt() {
    let quiz = quiz(1);
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);

    attempt.start(&grader).await.unwrap();
    assert_eq!(attempt.environment().focus_requests, 1);
    assert_eq!(attempt.environment().focus_releases, 0);

    attempt.abandon();
    assert_eq!(attempt.environment().focus_releases, 1);
    assert_eq!(attempt.status(), AttemptStatus::NotStarted);
    assert!(attempt.answers().is_empty());
}

#[tokio::test]
async fn test_unshuffled_questions_follow_order_field() {
    let mut quiz = quiz(3);
    quiz.questions[0].order = 3;
    quiz.questions[1].order = 1;
    quiz.questions[2].order = 2;
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();

    assert_eq!(attempt.question_order(), vec!["q2", "q3", "q1"]);
    let first_answers: Vec<&str> = attempt.questions()[0]
        .answers
        .iter()
        .map(|a| a.id.as_str())
        .collect();
    assert_eq!(first_answers, vec!["A", "B", "C", "D"]);
}

#[tokio::test]
async fn test_shuffled_order_is_fixed_for_the_attempt() {
    // Arrange
    let mut quiz = quiz(12);
    quiz.shuffle_questions = true;
    quiz.shuffle_answers = true;
    let grader = MockGrader::new(&quiz);
    let mut attempt = controller(&quiz);
    attempt.start(&grader).await.unwrap();

    // Act
    let first = attempt.question_order();
    attempt.next().unwrap();
    attempt.answer_current(choice("A")).unwrap();
    attempt.tick();
    let second = attempt.question_order();

    // Assert
    assert_eq!(first, second);
    let ids: HashSet<String> = first.iter().cloned().collect();
    assert_eq!(ids.len(), 12);
    for question in attempt.questions() {
        let options: HashSet<&str> = question.answers.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(options, HashSet::from(["A", "B", "C", "D"]));
    }
}

#[tokio::test]
async fn test_same_seed_gives_same_shuffle() {
    let mut quiz = quiz(8);
    quiz.shuffle_questions = true;
    let grader = MockGrader::new(&quiz);

    let mut a = controller(&quiz);
    let mut b = controller(&quiz);
    a.start(&grader).await.unwrap();
    b.start(&grader).await.unwrap();

    assert_eq!(a.question_order(), b.question_order());
}

#[tokio::test]
async fn test_feedback_view_is_read_only_toggle() {
    let quiz = quiz(1);
    let mut graded = result(0, false, 1, -1, -1);
    graded.feedback = vec![QuestionFeedback {
        question_id: "q1".to_string(),
        is_correct: false,
        points_earned: 0,
        points_possible: 1,
        correct_option_ids: vec!["B".to_string()],
        explanation: Some("B is the answer".to_string()),
        requires_review: false,
    }];
    let grader = MockGrader::new(&quiz).then(Ok(graded));
    let mut attempt = controller(&quiz);

    assert!(attempt.toggle_feedback().is_err());

    attempt.start(&grader).await.unwrap();
    attempt.answer("q1", choice("A")).unwrap();
    attempt.request_submit().unwrap();
    let request = attempt.confirm_submit().unwrap().unwrap();
    attempt.dispatch(&grader, request).await.unwrap();

    assert!(attempt.feedback().is_none());
    assert_eq!(attempt.toggle_feedback(), Ok(AttemptStatus::ViewingFeedback));
    assert_eq!(attempt.feedback().map(|f| f.len()), Some(1));
    assert_eq!(attempt.toggle_feedback(), Ok(AttemptStatus::Completed));
    assert_eq!(attempt.last_result().map(|r| r.score), Some(0));
}
