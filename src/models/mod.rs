// src/models/mod.rs

pub mod answer;
pub mod quiz;
pub mod submission;

pub use answer::{AnswerSheet, AnswerValue};
pub use quiz::{AnswerOption, Question, QuestionType, Quiz};
pub use submission::{QuestionFeedback, StartedAttempt, SubmissionResult, UNLIMITED_ATTEMPTS};
