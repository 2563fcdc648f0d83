// src/models/quiz.rs

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AttemptError;

/// Question type as stored in quiz definitions (`single_choice`, `essay`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    SingleChoice,
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Essay,
}

impl QuestionType {
    /// Types answered by picking option ids rather than typing text.
    pub fn is_choice(self) -> bool {
        matches!(
            self,
            QuestionType::SingleChoice | QuestionType::MultipleChoice | QuestionType::TrueFalse
        )
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuestionType::SingleChoice => "single_choice",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Essay => "essay",
        };
        f.write_str(name)
    }
}

/// One selectable option of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AnswerOption {
    #[validate(length(min = 1, max = 100))]
    pub id: String,

    #[validate(length(max = 500))]
    pub text: String,

    /// `None` when the grading service hides correctness from the taker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Question {
    #[validate(length(min = 1, max = 100))]
    pub id: String,

    /// Presentation order when questions are not shuffled.
    #[serde(default)]
    pub order: i32,

    #[validate(length(min = 1, max = 2000))]
    pub text: String,

    pub question_type: QuestionType,

    /// For short answers the options list the accepted responses.
    #[serde(default)]
    #[validate(nested)]
    pub answers: Vec<AnswerOption>,

    #[serde(default = "default_points")]
    #[validate(range(min = 0))]
    pub points: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 2000))]
    pub explanation: Option<String>,
}

fn default_points() -> i32 {
    1
}

impl Question {
    pub fn option(&self, option_id: &str) -> Option<&AnswerOption> {
        self.answers.iter().find(|a| a.id == option_id)
    }

    pub fn correct_option_ids(&self) -> Vec<String> {
        self.answers
            .iter()
            .filter(|a| a.is_correct == Some(true))
            .map(|a| a.id.clone())
            .collect()
    }

    fn check(&self) -> Result<(), AttemptError> {
        let mut seen = HashSet::new();
        for option in &self.answers {
            if !seen.insert(option.id.as_str()) {
                return Err(AttemptError::InvalidQuiz(format!(
                    "question {} has duplicate option id {}",
                    self.id, option.id
                )));
            }
        }

        match self.question_type {
            QuestionType::TrueFalse if self.answers.len() != 2 => {
                Err(AttemptError::InvalidQuiz(format!(
                    "true/false question {} needs exactly 2 options",
                    self.id
                )))
            }
            t if t.is_choice() && self.answers.is_empty() => Err(AttemptError::InvalidQuiz(
                format!("{} question {} has no options", t, self.id),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Quiz {
    #[validate(length(min = 1, max = 100))]
    pub id: String,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    #[serde(default)]
    #[validate(nested)]
    pub questions: Vec<Question>,

    /// Minutes. `None` means untimed.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub time_limit: Option<u32>,

    /// `None` or -1 means unlimited.
    #[serde(default)]
    #[validate(range(min = -1))]
    pub max_attempts: Option<i32>,

    /// Percentage required to pass.
    #[validate(range(min = 0, max = 100))]
    pub passing_score: u32,

    #[serde(default)]
    pub shuffle_questions: bool,

    #[serde(default)]
    pub shuffle_answers: bool,
}

impl Quiz {
    /// Parses and validates a quiz definition.
    pub fn from_json(raw: &str) -> Result<Self, AttemptError> {
        let quiz: Quiz = serde_json::from_str(raw)?;
        quiz.check()?;
        Ok(quiz)
    }

    /// Field validation plus the structural rules `validator` cannot express.
    pub fn check(&self) -> Result<(), AttemptError> {
        self.validate()?;

        let mut seen = HashSet::new();
        for question in &self.questions {
            if !seen.insert(question.id.as_str()) {
                return Err(AttemptError::InvalidQuiz(format!(
                    "duplicate question id {}",
                    question.id
                )));
            }
            question.check()?;
        }
        Ok(())
    }

    /// Maximum attempts, `None` when unlimited.
    pub fn attempt_cap(&self) -> Option<u32> {
        match self.max_attempts {
            Some(max) if max >= 0 => Some(max as u32),
            _ => None,
        }
    }

    pub fn time_limit_seconds(&self) -> Option<u64> {
        self.time_limit.map(|minutes| u64::from(minutes) * 60)
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn total_points(&self) -> i32 {
        self.questions.iter().map(|q| q.points).sum()
    }

    /// Copy safe to hand to the taker: correctness and explanations removed.
    pub fn public_view(&self) -> Quiz {
        let mut public = self.clone();
        for question in &mut public.questions {
            question.explanation = None;
            for option in &mut question.answers {
                option.is_correct = None;
            }
        }
        public
    }
}
