// src/controller/ordering.rs

use rand::Rng;

use crate::models::{Question, Quiz};
use crate::utils::shuffle::fisher_yates;

/// Question sequence for a new attempt.
///
/// Shuffled when `shuffle_questions` is set, otherwise sorted by `order`
/// (stable, so equal orders keep file order). Each answer list is shuffled
/// independently when `shuffle_answers` is set.
pub fn presentation_order<R: Rng + ?Sized>(quiz: &Quiz, rng: &mut R) -> Vec<Question> {
    let mut questions = quiz.questions.clone();

    if quiz.shuffle_questions {
        fisher_yates(&mut questions, rng);
    } else {
        questions.sort_by_key(|q| q.order);
    }

    if quiz.shuffle_answers {
        for question in &mut questions {
            fisher_yates(&mut question.answers, rng);
        }
    }

    questions
}
