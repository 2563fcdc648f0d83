// src/handlers/session.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::MissedTickBehavior;

use super::command::{Command, HELP};
use super::console::ConsoleEnvironment;
use crate::{
    controller::{
        AttemptStatus, IntegrityEvent, IntegrityFeed, IntegritySource, QuizAttemptController,
        SubmissionRequest,
    },
    error::AttemptError,
    grading::GradingService,
    models::{AnswerValue, Question, QuestionType, Quiz, SubmissionResult, UNLIMITED_ATTEMPTS},
    state::AppState,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// One console-hosted attempt: input lines, the one-second tick and the
/// integrity feed all land here and are applied to the controller in turn.
pub struct Session<G: GradingService + ?Sized> {
    controller: QuizAttemptController<ConsoleEnvironment>,
    grader: Arc<G>,
    feed: Option<IntegrityFeed>,
    tick_interval: Duration,
}

impl<G: GradingService + ?Sized> Session<G> {
    pub fn new(state: &AppState<G>, quiz: Quiz) -> Self {
        let mut env = ConsoleEnvironment::new();
        let feed = env.subscribe();
        let controller = QuizAttemptController::new(quiz, env, state.config.policy)
            .with_attempts_used(state.config.attempts_used);

        Self {
            controller,
            grader: Arc::clone(&state.grader),
            feed: Some(feed),
            tick_interval: state.config.tick_interval,
        }
    }

    pub fn controller(&self) -> &QuizAttemptController<ConsoleEnvironment> {
        &self.controller
    }

    pub fn take_output(&mut self) -> Vec<String> {
        self.controller.environment_mut().drain()
    }

    /// Applies one command. Errors are reported to the user, never returned.
    pub async fn handle(&mut self, command: Command) -> Flow {
        match self.execute(command).await {
            Ok(flow) => flow,
            Err(e) => {
                self.say(format!("error: {}", e));
                Flow::Continue
            }
        }
    }

    pub async fn on_tick(&mut self) {
        let request = self.controller.tick();
        self.send(request).await;
    }

    pub async fn on_integrity(&mut self, event: IntegrityEvent) {
        let request = self.controller.record_violation(event);
        self.send(request).await;
    }

    /// Applies signals already queued on the feed without waiting.
    pub async fn process_pending_signals(&mut self) {
        while let Some(event) = self.feed.as_mut().and_then(IntegrityFeed::try_recv) {
            self.on_integrity(event).await;
        }
    }

    /// Runs until `quit` or end of input. The attempt is abandoned on the
    /// way out whatever ended the loop.
    pub async fn run<R, W>(mut self, input: R, mut output: W) -> Result<(), AttemptError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut feed = self
            .feed
            .take()
            .ok_or_else(|| AttemptError::Io("integrity feed already consumed".to_string()))?;

        let outcome = self.event_loop(&mut feed, input, &mut output).await;

        self.controller.abandon();
        let flushed = self.flush(&mut output).await;
        tracing::info!("Console session for quiz '{}' closed", self.controller.quiz().id);
        outcome.and(flushed)
    }

    async fn event_loop<R, W>(
        &mut self,
        feed: &mut IntegrityFeed,
        input: R,
        output: &mut W,
    ) -> Result<(), AttemptError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.split(b'\n');
        let mut ticker = tokio::time::interval(self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        self.intro();
        self.flush(output).await?;

        loop {
            let flow = tokio::select! {
                biased;

                Some(event) = feed.recv() => {
                    self.on_integrity(event).await;
                    Flow::Continue
                }
                segment = lines.next_segment() => match segment {
                    Ok(Some(bytes)) => self.on_line(&decode_line(&bytes)).await,
                    Ok(None) => Flow::Quit,
                    Err(e) => {
                        tracing::error!("Console input failed: {}", e);
                        self.say(format!("input error: {}", e));
                        Flow::Quit
                    }
                },
                _ = ticker.tick() => {
                    self.on_tick().await;
                    Flow::Continue
                }
            };
            self.flush(output).await?;
            if flow == Flow::Quit {
                return Ok(());
            }
        }
    }

    async fn on_line(&mut self, line: &str) -> Flow {
        match line.parse::<Command>() {
            Ok(command) => self.handle(command).await,
            Err(msg) => {
                self.say(msg);
                Flow::Continue
            }
        }
    }

    async fn execute(&mut self, command: Command) -> Result<Flow, AttemptError> {
        match command {
            Command::Help => self.say(HELP),
            Command::Start => {
                self.controller.start(&*self.grader).await?;
                self.show_question();
            }
            Command::Next => {
                self.controller.next()?;
                self.show_question();
            }
            Command::Previous => {
                self.controller.previous()?;
                self.show_question();
            }
            Command::Goto(number) => {
                let index = number
                    .checked_sub(1)
                    .ok_or_else(|| AttemptError::NotFound("question 0".to_string()))?;
                self.controller.jump_to(index)?;
                self.show_question();
            }
            Command::Answer(raw) => {
                let value = {
                    let question = self.current_question()?;
                    parse_answer(question, &raw)
                };
                self.controller.answer_current(value)?;
                self.say_progress();
            }
            Command::Toggle(raw) => {
                let (question_id, option_id) = {
                    let question = self.current_question()?;
                    (question.id.clone(), resolve_option(question, &raw))
                };
                self.controller.toggle_choice(&question_id, &option_id)?;
                self.say_progress();
            }
            Command::Clear => {
                let question_id = self.current_question()?.id.clone();
                self.controller.clear_answer(&question_id)?;
                self.say_progress();
            }
            Command::Submit => {
                if !self.controller.request_submit()? {
                    if self.controller.submission_in_flight() {
                        self.say("A submission is already in progress.");
                    } else {
                        self.say("This attempt is already submitted.");
                    }
                }
            }
            Command::Confirm => {
                let request = self.controller.confirm_submit()?;
                self.send(request).await;
            }
            Command::Cancel => {
                self.controller.cancel_submit();
                self.say("Submit cancelled.");
            }
            Command::Retry => {
                let request = self.controller.retry_submission()?;
                self.send(request).await;
            }
            Command::Feedback => {
                self.controller.toggle_feedback()?;
                self.show_feedback();
            }
            Command::Retake => {
                self.controller.retake()?;
                self.say(format!(
                    "Ready for attempt {}. Type start to begin.",
                    self.controller.attempt_number()
                ));
            }
            Command::Status => self.show_status(),
            Command::Quit => {
                self.controller.abandon();
                self.say("Bye.");
                return Ok(Flow::Quit);
            }
            Command::Signal(event) => {
                if !self.controller.environment().signal(event) {
                    self.say("integrity feed is not connected");
                }
            }
        }
        Ok(Flow::Continue)
    }

    async fn send(&mut self, request: Option<SubmissionRequest>) {
        let Some(request) = request else {
            return;
        };
        // Failures are already surfaced through the environment notice.
        if let Ok(result) = self.controller.dispatch(&*self.grader, request).await {
            self.show_result(&result);
        }
    }

    fn current_question(&self) -> Result<&Question, AttemptError> {
        if self.controller.status() != AttemptStatus::InProgress {
            return Err(AttemptError::InvalidTransition {
                action: "answer",
                status: self.controller.status(),
            });
        }
        self.controller
            .current_question()
            .ok_or_else(|| AttemptError::NotFound("current question".to_string()))
    }

    fn say(&mut self, line: impl Into<String>) {
        self.controller.environment_mut().say(line);
    }

    fn intro(&mut self) {
        let quiz = self.controller.quiz();
        let mut lines = vec![format!("{} ({} questions)", quiz.title, quiz.questions.len())];
        if let Some(minutes) = quiz.time_limit {
            lines.push(format!("Time limit: {} minutes", minutes));
        }
        lines.push(format!("Passing score: {}%", quiz.passing_score));
        match quiz.attempt_cap() {
            Some(max) => lines.push(format!(
                "Attempts: {} of {} used",
                self.controller.attempts_used(),
                max
            )),
            None => lines.push("Attempts: unlimited".to_string()),
        }
        if self.controller.status() == AttemptStatus::Unavailable {
            lines.push("This quiz has no questions and cannot be taken.".to_string());
        } else {
            lines.push("Type start to begin, help for commands.".to_string());
        }
        for line in lines {
            self.say(line);
        }
    }

    fn show_question(&mut self) {
        let Some(question) = self.controller.current_question() else {
            return;
        };
        let total = self.controller.questions().len();
        let index = self.controller.current_index();
        let answered = self.controller.answers().is_answered(&question.id);

        let mut lines = vec![format!(
            "Question {}/{} [{}, {} pt]{}",
            index + 1,
            total,
            question.question_type,
            question.points,
            if answered { " (answered)" } else { "" }
        )];
        lines.push(format!("  {}", question.text));
        if question.question_type.is_choice() {
            for option in &question.answers {
                lines.push(format!("    {}) {}", option.id, option.text));
            }
        }
        for line in lines {
            self.say(line);
        }
    }

    fn say_progress(&mut self) {
        let progress = self.controller.progress();
        self.say(format!(
            "{} of {} answered ({}%)",
            progress.answered, progress.total, progress.percent
        ));
    }

    fn show_status(&mut self) {
        let controller = &self.controller;
        let progress = controller.progress();
        let mut line = format!(
            "attempt {}: {}, {}/{} answered, elapsed {}",
            controller.attempt_number(),
            controller.status(),
            progress.answered,
            progress.total,
            clock(controller.elapsed_seconds())
        );
        if let Some(remaining) = controller.remaining_seconds() {
            if controller.status() == AttemptStatus::InProgress {
                line.push_str(&format!(", remaining {}", clock(remaining)));
            }
        }
        line.push_str(&format!(", violations {}", controller.violation_count()));
        self.say(line);
    }

    fn show_result(&mut self, result: &SubmissionResult) {
        let attempts = if result.total_attempts == UNLIMITED_ATTEMPTS {
            format!("attempt {}", result.attempt_number)
        } else {
            format!("attempt {} of {}", result.attempt_number, result.total_attempts)
        };
        self.say(format!(
            "Result: {}%, {} ({}). Type feedback for details.",
            result.score,
            if result.passed { "passed" } else { "not passed" },
            attempts
        ));
        if result.allows_retake() {
            self.say("You may retake this quiz.");
        }
    }

    fn show_feedback(&mut self) {
        let lines: Vec<String> = match self.controller.feedback() {
            None => vec!["Feedback hidden.".to_string()],
            Some(items) if items.is_empty() => vec!["No feedback available.".to_string()],
            Some(items) => items
                .iter()
                .enumerate()
                .flat_map(|(i, item)| {
                    let verdict = if item.requires_review {
                        "awaiting review".to_string()
                    } else if item.is_correct {
                        format!("correct ({}/{})", item.points_earned, item.points_possible)
                    } else {
                        format!(
                            "incorrect ({}/{}), expected {}",
                            item.points_earned,
                            item.points_possible,
                            item.correct_option_ids.join(", ")
                        )
                    };
                    let mut out = vec![format!("{}. {}: {}", i + 1, item.question_id, verdict)];
                    if let Some(explanation) = &item.explanation {
                        out.push(format!("   {}", explanation));
                    }
                    out
                })
                .collect(),
        };
        for line in lines {
            self.say(line);
        }
    }

    async fn flush<W: AsyncWrite + Unpin>(&mut self, output: &mut W) -> Result<(), AttemptError> {
        for line in self.take_output() {
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }
        output.flush().await?;
        Ok(())
    }
}

/// Input bytes that are not UTF-8 become replacement characters.
fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Maps console input onto the answer shape of `question`.
fn parse_answer(question: &Question, raw: &str) -> AnswerValue {
    match question.question_type {
        QuestionType::SingleChoice | QuestionType::TrueFalse => {
            AnswerValue::Choice(resolve_option(question, raw))
        }
        QuestionType::MultipleChoice => AnswerValue::MultiChoice(
            raw.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(|part| resolve_option(question, part))
                .collect(),
        ),
        QuestionType::ShortAnswer | QuestionType::Essay => AnswerValue::Text(raw.to_string()),
    }
}

/// Accepts an option id, or a 1-based option number when no id matches.
fn resolve_option(question: &Question, raw: &str) -> String {
    let raw = raw.trim();
    if question.option(raw).is_some() {
        return raw.to_string();
    }
    match raw.parse::<usize>() {
        Ok(n) if n >= 1 && n <= question.answers.len() => question.answers[n - 1].id.clone(),
        _ => raw.to_string(),
    }
}

fn clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
