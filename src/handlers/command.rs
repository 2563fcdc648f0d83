// src/handlers/command.rs

use std::str::FromStr;

use crate::controller::IntegrityEvent;

/// One line of console input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Start,
    Next,
    Previous,
    /// 1-based question number.
    Goto(usize),
    Answer(String),
    Toggle(String),
    Clear,
    Submit,
    Confirm,
    Cancel,
    Retry,
    Feedback,
    Retake,
    Status,
    Quit,
    /// Simulated host signal, for terminals that cannot observe focus themselves.
    Signal(IntegrityEvent),
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "help" | "?" => Command::Help,
            "start" => Command::Start,
            "next" | "n" => Command::Next,
            "prev" | "previous" | "p" => Command::Previous,
            "goto" | "g" => {
                let number: usize = rest
                    .parse()
                    .map_err(|_| format!("goto needs a question number, got {:?}", rest))?;
                if number == 0 {
                    return Err("question numbers start at 1".to_string());
                }
                Command::Goto(number)
            }
            "answer" | "a" => {
                if rest.is_empty() {
                    return Err("answer needs a value".to_string());
                }
                Command::Answer(rest.to_string())
            }
            "toggle" | "t" => {
                if rest.is_empty() {
                    return Err("toggle needs an option id".to_string());
                }
                Command::Toggle(rest.to_string())
            }
            "clear" => Command::Clear,
            "submit" => Command::Submit,
            "confirm" | "yes" => Command::Confirm,
            "cancel" | "no" => Command::Cancel,
            "retry" => Command::Retry,
            "feedback" | "f" => Command::Feedback,
            "retake" => Command::Retake,
            "status" | "s" => Command::Status,
            "quit" | "exit" | "q" => Command::Quit,
            "blur" => Command::Signal(IntegrityEvent::WindowBlurred),
            "hide" => Command::Signal(IntegrityEvent::TabHidden),
            "fullscreen-exit" => Command::Signal(IntegrityEvent::FullscreenExited),
            "printscreen" => Command::Signal(IntegrityEvent::ScreenshotAttempt),
            "" => return Err("empty input, type help".to_string()),
            other => return Err(format!("unknown command {:?}, type help", other)),
        };
        Ok(command)
    }
}

pub const HELP: &str = "\
commands:
  start                 begin the attempt
  next | prev | goto N  move between questions
  answer VALUE          answer the current question (option id, ids separated by commas, or text)
  toggle ID             add/remove one option of a multiple-choice answer
  clear                 clear the current answer
  submit, confirm       submit once every question is answered
  cancel                cancel a pending submit
  retry                 resend a failed submission
  feedback              show/hide per-question results
  retake                start over when attempts remain
  status                show progress and time
  quit                  leave
  blur | hide | fullscreen-exit | printscreen   simulate a host integrity signal";
