// src/models/answer.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::quiz::{Question, QuestionType};

/// A submitted value, shaped by the question type it answers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerValue {
    /// Option id for single choice and true/false.
    Choice(String),
    /// Option ids for multiple choice.
    MultiChoice(Vec<String>),
    /// Free text for short answer and essay.
    Text(String),
}

impl AnswerValue {
    /// Empty value of the right shape for `question_type`.
    pub fn blank_for(question_type: QuestionType) -> Self {
        match question_type {
            QuestionType::SingleChoice | QuestionType::TrueFalse => {
                AnswerValue::Choice(String::new())
            }
            QuestionType::MultipleChoice => AnswerValue::MultiChoice(Vec::new()),
            QuestionType::ShortAnswer | QuestionType::Essay => AnswerValue::Text(String::new()),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::Choice(id) => id.trim().is_empty(),
            AnswerValue::MultiChoice(ids) => ids.iter().all(|id| id.trim().is_empty()),
            AnswerValue::Text(text) => text.trim().is_empty(),
        }
    }

    pub fn matches_type(&self, question_type: QuestionType) -> bool {
        matches!(
            (self, question_type),
            (
                AnswerValue::Choice(_),
                QuestionType::SingleChoice | QuestionType::TrueFalse
            ) | (AnswerValue::MultiChoice(_), QuestionType::MultipleChoice)
                | (
                    AnswerValue::Text(_),
                    QuestionType::ShortAnswer | QuestionType::Essay
                )
        )
    }
}

/// Answers of one attempt keyed by question id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerSheet(HashMap<String, AnswerValue>);

impl AnswerSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every question mapped to its blank value.
    pub fn blank_for(questions: &[Question]) -> Self {
        Self(
            questions
                .iter()
                .map(|q| (q.id.clone(), AnswerValue::blank_for(q.question_type)))
                .collect(),
        )
    }

    pub fn insert(&mut self, question_id: impl Into<String>, value: AnswerValue) {
        self.0.insert(question_id.into(), value);
    }

    pub fn remove(&mut self, question_id: &str) -> Option<AnswerValue> {
        self.0.remove(question_id)
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerValue> {
        self.0.get(question_id)
    }

    pub fn is_answered(&self, question_id: &str) -> bool {
        self.0.get(question_id).is_some_and(|v| !v.is_blank())
    }

    /// Number of non-blank answers.
    pub fn answered_count(&self) -> usize {
        self.0.values().filter(|v| !v.is_blank()).count()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AnswerValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, AnswerValue)> for AnswerSheet {
    fn from_iter<I: IntoIterator<Item = (String, AnswerValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
