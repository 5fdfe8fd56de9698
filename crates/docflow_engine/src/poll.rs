use std::time::Duration;

use docflow_core::{Operation, TaskId, Ticket};
use engine_logging::{engine_debug, engine_info, engine_warn};
use tokio_util::sync::CancellationToken;

use crate::{DocumentApi, EngineEvent, StatusCheckError, StatusReply, TaskPayload};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Delay between the end of one status request and the start of the next.
    pub interval: Duration,
    /// Hard cap on status requests; `None` polls until a terminal reply.
    pub max_attempts: Option<u32>,
    /// Consecutive unrecognized replies tolerated before giving up.
    pub max_unrecognized: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: None,
            max_unrecognized: Some(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PollError {
    #[error("{0}")]
    Backend(String),
    #[error("status check failed: {0}")]
    StatusCheck(#[from] StatusCheckError),
    #[error("polling cancelled")]
    Cancelled,
    #[error("no recognizable status after {attempts} attempts")]
    Unrecognized { attempts: u32 },
    #[error("task still pending after {attempts} attempts")]
    AttemptsExhausted { attempts: u32 },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelProgressSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelProgressSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelProgressSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

/// Sequential status poller: one request in flight per task, a fixed delay
/// between requests, and a cancellation token checked at every await point.
#[derive(Debug, Clone, Default)]
pub struct StatusPoller {
    policy: PollPolicy,
}

impl StatusPoller {
    pub fn new(policy: PollPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    pub async fn run(
        &self,
        api: &dyn DocumentApi,
        ticket: Ticket,
        operation: Operation,
        task_id: &TaskId,
        cancel: &CancellationToken,
        sink: &dyn ProgressSink,
    ) -> Result<TaskPayload, PollError> {
        let mut attempt: u32 = 0;
        let mut unrecognized: u32 = 0;

        loop {
            attempt += 1;
            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                reply = api.check_status(operation, task_id) => reply?,
            };
            engine_debug!(
                "Poll ticket={} task={} attempt={} reply={}",
                ticket,
                task_id,
                attempt,
                reply.kind()
            );

            match reply {
                StatusReply::Ready(payload) => {
                    engine_info!(
                        "Task {} ({}) finished after {} attempts",
                        task_id,
                        operation,
                        attempt
                    );
                    return Ok(payload);
                }
                StatusReply::Failed(message) => {
                    engine_warn!("Task {} ({}) failed: {}", task_id, operation, message);
                    return Err(PollError::Backend(message));
                }
                StatusReply::Pending => unrecognized = 0,
                StatusReply::Unrecognized => {
                    unrecognized += 1;
                    if self
                        .policy
                        .max_unrecognized
                        .is_some_and(|max| unrecognized >= max)
                    {
                        engine_warn!(
                            "Task {} ({}) gave {} unrecognized replies in a row",
                            task_id,
                            operation,
                            unrecognized
                        );
                        return Err(PollError::Unrecognized { attempts: attempt });
                    }
                }
            }

            if self.policy.max_attempts.is_some_and(|max| attempt >= max) {
                return Err(PollError::AttemptsExhausted { attempts: attempt });
            }
            sink.emit(EngineEvent::PollAttempt { ticket, attempt });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(PollError::Cancelled),
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }
    }
}
