// src/utils/poll.rs

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AttemptError;

/// Status reported by a background task (e.g. a bulk admin action).
#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus<T> {
    Pending,
    Running { progress: u8 },
    Completed(T),
    Failed(String),
}

impl<T> TaskStatus<T> {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed(_) | TaskStatus::Failed(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

/// Source of delays, swapped for a fake in tests.
#[async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Calls `fetch` until it reports a terminal status or `policy.max_attempts` is spent.
///
/// * `Completed(v)` returns `Ok(v)`.
/// * `Failed(msg)` returns `AttemptError::TaskFailed`.
/// * Errors from `fetch` are propagated as-is.
/// * Running out of attempts returns `AttemptError::PollTimeout`.
pub async fn poll_until_terminal<T, C, F, Fut>(
    clock: &C,
    policy: PollPolicy,
    mut fetch: F,
) -> Result<T, AttemptError>
where
    C: Clock + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<TaskStatus<T>, AttemptError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match fetch().await? {
            TaskStatus::Completed(value) => return Ok(value),
            TaskStatus::Failed(msg) => {
                tracing::error!("Background task failed after {} polls: {}", attempt, msg);
                return Err(AttemptError::TaskFailed(msg));
            }
            TaskStatus::Running { progress } => {
                tracing::debug!("Task running ({}%), poll {}", progress, attempt);
            }
            TaskStatus::Pending => {
                tracing::debug!("Task pending, poll {}", attempt);
            }
        }

        if attempt >= policy.max_attempts {
            tracing::warn!("Giving up on task after {} polls", attempt);
            return Err(AttemptError::PollTimeout { attempts: attempt });
        }
        clock.sleep(policy.interval).await;
    }
}
