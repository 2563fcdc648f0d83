// src/grading/local.rs

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::GradingService;
use crate::{
    error::AttemptError,
    models::{
        AnswerSheet, AnswerValue, Question, QuestionFeedback, QuestionType, Quiz, StartedAttempt,
        SubmissionResult, UNLIMITED_ATTEMPTS,
    },
};

/// One opened attempt and, once graded, its result.
#[derive(Debug, Clone)]
struct AttemptRecord {
    attempt_id: String,
    started_at: DateTime<Utc>,
    result: Option<SubmissionResult>,
}

#[derive(Debug, Clone)]
struct QuizRecord {
    quiz: Quiz,
    attempts: Vec<AttemptRecord>,
}

impl QuizRecord {
    fn graded_count(&self) -> u32 {
        self.attempts.iter().filter(|a| a.result.is_some()).count() as u32
    }
}

/// In-memory grading service holding the answer keys.
///
/// Used by the console binary and as a reference implementation of the
/// scoring and attempt-accounting rules.
#[derive(Debug, Default)]
pub struct LocalGrader {
    quizzes: Mutex<HashMap<String, QuizRecord>>,
}

impl LocalGrader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quiz(quiz: Quiz) -> Self {
        let mut quizzes = HashMap::new();
        quizzes.insert(
            quiz.id.clone(),
            QuizRecord {
                quiz,
                attempts: Vec::new(),
            },
        );
        Self {
            quizzes: Mutex::new(quizzes),
        }
    }

    /// Registers or replaces a quiz, keeping any attempt history.
    pub fn add_quiz(&self, quiz: Quiz) -> Result<(), AttemptError> {
        let mut quizzes = self.lock()?;
        match quizzes.get_mut(&quiz.id) {
            Some(record) => record.quiz = quiz,
            None => {
                quizzes.insert(
                    quiz.id.clone(),
                    QuizRecord {
                        quiz,
                        attempts: Vec::new(),
                    },
                );
            }
        }
        Ok(())
    }

    pub fn graded_attempts(&self, quiz_id: &str) -> Result<u32, AttemptError> {
        let quizzes = self.lock()?;
        Ok(quizzes.get(quiz_id).map(QuizRecord::graded_count).unwrap_or(0))
    }

    pub fn attempt_started_at(
        &self,
        quiz_id: &str,
        attempt_id: &str,
    ) -> Result<Option<DateTime<Utc>>, AttemptError> {
        let quizzes = self.lock()?;
        Ok(quizzes
            .get(quiz_id)
            .and_then(|r| r.attempts.iter().find(|a| a.attempt_id == attempt_id))
            .map(|a| a.started_at))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, QuizRecord>>, AttemptError> {
        self.quizzes
            .lock()
            .map_err(|_| AttemptError::SubmissionFailed("grader state poisoned".to_string()))
    }
}

#[async_trait]
impl GradingService for LocalGrader {
    async fn start_attempt(&self, quiz_id: &str) -> Result<StartedAttempt, AttemptError> {
        let mut quizzes = self.lock()?;
        let record = quizzes
            .get_mut(quiz_id)
            .ok_or_else(|| AttemptError::QuizUnavailable(format!("unknown quiz {}", quiz_id)))?;

        let used = record.graded_count();
        if let Some(max) = record.quiz.attempt_cap() {
            if used >= max {
                return Err(AttemptError::AttemptLimitExceeded {
                    used,
                    max: max as i32,
                });
            }
        }

        let attempt_id = Uuid::new_v4().to_string();
        record.attempts.push(AttemptRecord {
            attempt_id: attempt_id.clone(),
            started_at: Utc::now(),
            result: None,
        });
        tracing::debug!("Opened attempt {} for quiz '{}'", attempt_id, quiz_id);

        Ok(StartedAttempt {
            attempt_id,
            quiz: record.quiz.public_view(),
        })
    }

    async fn submit_attempt(
        &self,
        quiz_id: &str,
        attempt_id: &str,
        answers: &AnswerSheet,
    ) -> Result<SubmissionResult, AttemptError> {
        let mut quizzes = self.lock()?;
        let record = quizzes
            .get_mut(quiz_id)
            .ok_or_else(|| AttemptError::NotFound(format!("quiz {}", quiz_id)))?;

        let graded_before = record.graded_count();
        let quiz = record.quiz.clone();
        let attempt = record
            .attempts
            .iter_mut()
            .find(|a| a.attempt_id == attempt_id)
            .ok_or_else(|| AttemptError::NotFound(format!("attempt {}", attempt_id)))?;

        // Resubmitting a graded attempt returns the stored result unchanged.
        if let Some(result) = &attempt.result {
            return Ok(result.clone());
        }

        let graded = grade(&quiz, answers);
        let attempt_number = graded_before + 1;
        let (total_attempts, remaining_attempts) = match quiz.attempt_cap() {
            Some(max) => (max as i32, max.saturating_sub(attempt_number) as i32),
            None => (UNLIMITED_ATTEMPTS, UNLIMITED_ATTEMPTS),
        };

        let result = SubmissionResult {
            score: graded.score,
            passed: graded.score >= quiz.passing_score,
            attempt_number,
            total_attempts,
            remaining_attempts,
            feedback: graded.feedback,
            submitted_at: Some(Utc::now()),
        };
        attempt.result = Some(result.clone());

        tracing::info!(
            "Graded attempt {} of quiz '{}': {}/{} points, score {}",
            attempt_number,
            quiz_id,
            graded.earned,
            graded.possible,
            result.score
        );
        Ok(result)
    }
}

struct Graded {
    earned: i32,
    possible: i32,
    score: u32,
    feedback: Vec<QuestionFeedback>,
}

fn grade(quiz: &Quiz, answers: &AnswerSheet) -> Graded {
    let mut earned = 0;
    let mut possible = 0;
    let mut feedback = Vec::with_capacity(quiz.questions.len());

    for question in &quiz.questions {
        let requires_review = question.question_type == QuestionType::Essay;
        let is_correct = !requires_review && answer_is_correct(question, answers.get(&question.id));
        let points_earned = if is_correct { question.points } else { 0 };

        if !requires_review {
            possible += question.points;
            earned += points_earned;
        }

        feedback.push(QuestionFeedback {
            question_id: question.id.clone(),
            is_correct,
            points_earned,
            points_possible: question.points,
            correct_option_ids: question.correct_option_ids(),
            explanation: question.explanation.clone(),
            requires_review,
        });
    }

    Graded {
        earned,
        possible,
        score: calculate_score(earned, possible),
        feedback,
    }
}

/// Points-weighted percentage rounded to the nearest integer.
fn calculate_score(earned: i32, possible: i32) -> u32 {
    if possible <= 0 {
        return 0;
    }
    ((earned as f64 / possible as f64) * 100.0).round().clamp(0.0, 100.0) as u32
}

fn answer_is_correct(question: &Question, answer: Option<&AnswerValue>) -> bool {
    let correct: HashSet<&str> = question
        .answers
        .iter()
        .filter(|a| a.is_correct == Some(true))
        .map(|a| a.id.as_str())
        .collect();

    match (question.question_type, answer) {
        (QuestionType::SingleChoice | QuestionType::TrueFalse, Some(AnswerValue::Choice(id))) => {
            correct.contains(id.as_str())
        }
        (QuestionType::MultipleChoice, Some(AnswerValue::MultiChoice(ids))) => {
            let selected: HashSet<&str> = ids.iter().map(String::as_str).collect();
            !selected.is_empty() && selected == correct
        }
        (QuestionType::ShortAnswer, Some(AnswerValue::Text(text))) => {
            let given = normalize(text);
            !given.is_empty()
                && question
                    .answers
                    .iter()
                    .filter(|a| a.is_correct == Some(true))
                    .any(|a| normalize(&a.text) == given)
        }
        _ => false,
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}
