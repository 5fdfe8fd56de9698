use std::path::PathBuf;

use docflow_core::{Effect, Msg, TaskFailure};
use docflow_engine::{AtomicFileWriter, EngineEvent, EngineHandle, PollError};
use engine_logging::{engine_debug, engine_error, engine_info};

/// Carries out the effects requested by `update` against the engine and the
/// local filesystem.
pub struct EffectRunner {
    engine: EngineHandle,
    output_dir: PathBuf,
    saved: Vec<PathBuf>,
    failures: Vec<String>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, output_dir: PathBuf) -> Self {
        Self {
            engine,
            output_dir,
            saved: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Submit { ticket, request } => {
                    engine_info!(
                        "Submit ticket={} operation={} file={}",
                        ticket,
                        request.operation,
                        request.source.name()
                    );
                    self.engine.submit(ticket, request);
                }
                Effect::StartPolling {
                    ticket,
                    operation,
                    task_id,
                } => {
                    engine_info!("Polling {} task {} (ticket {})", operation, task_id, ticket);
                    self.engine.start_polling(ticket, operation, task_id);
                }
                Effect::CancelPolling { ticket } => {
                    self.engine.cancel_polling(ticket);
                }
                Effect::Release { handle } => {
                    engine_debug!("Releasing {}", handle);
                    self.engine.store().revoke(handle);
                }
                Effect::SaveResource { handle, filename } => {
                    let outcome = self.engine.store().save(handle, &self.output_dir, &filename);
                    self.record_save(&filename, outcome.map_err(|err| err.to_string()));
                }
                Effect::SaveJson { filename, contents } => {
                    let writer = AtomicFileWriter::new(self.output_dir.clone());
                    let outcome = writer.write(&filename, contents.as_bytes());
                    self.record_save(&filename, outcome.map_err(|err| err.to_string()));
                }
            }
        }
    }

    fn record_save(&mut self, filename: &str, outcome: Result<PathBuf, String>) {
        match outcome {
            Ok(path) => {
                engine_info!("Saved {:?}", path);
                self.saved.push(path);
            }
            Err(err) => {
                engine_error!("Failed to save {}: {}", filename, err);
                self.failures.push(format!("Failed to save {filename}: {err}"));
            }
        }
    }

    pub fn take_saved(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.saved)
    }

    pub fn take_failures(&mut self) -> Vec<String> {
        std::mem::take(&mut self.failures)
    }
}

pub fn map_event(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::Submitted { ticket, task_id } => Msg::TaskSubmitted { ticket, task_id },
        EngineEvent::SubmitFailed { ticket, error } => Msg::SubmissionFailed {
            ticket,
            message: error.to_string(),
        },
        EngineEvent::PollAttempt { ticket, attempt } => Msg::PollProgress { ticket, attempt },
        EngineEvent::PollFinished {
            ticket,
            result: Ok(result),
        } => Msg::TaskSucceeded { ticket, result },
        EngineEvent::PollFinished {
            ticket,
            result: Err(err),
        } => Msg::TaskFailed {
            ticket,
            failure: map_poll_error(err),
        },
    }
}

fn map_poll_error(err: PollError) -> TaskFailure {
    match err {
        PollError::Backend(message) => TaskFailure::Backend(message),
        PollError::StatusCheck(inner) => TaskFailure::StatusCheck(inner.to_string()),
        other => TaskFailure::StatusCheck(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docflow_core::TaskId;
    use docflow_engine::{StatusCheckError, SubmissionError};
    use pretty_assertions::assert_eq;

    #[test]
    fn submit_failure_carries_the_error_text() {
        let msg = map_event(EngineEvent::SubmitFailed {
            ticket: 2,
            error: SubmissionError::MissingTaskId,
        });
        assert_eq!(
            msg,
            Msg::SubmissionFailed {
                ticket: 2,
                message: "No task ID received".into()
            }
        );
    }

    #[test]
    fn backend_errors_stay_verbatim() {
        let msg = map_event(EngineEvent::PollFinished {
            ticket: 1,
            result: Err(PollError::Backend("X".into())),
        });
        assert_eq!(
            msg,
            Msg::TaskFailed {
                ticket: 1,
                failure: TaskFailure::Backend("X".into())
            }
        );
    }

    #[test]
    fn transport_errors_become_status_check_failures() {
        let inner = StatusCheckError::HttpStatus(502);
        let expected = inner.to_string();
        let msg = map_event(EngineEvent::PollFinished {
            ticket: 1,
            result: Err(PollError::StatusCheck(inner)),
        });
        assert_eq!(
            msg,
            Msg::TaskFailed {
                ticket: 1,
                failure: TaskFailure::StatusCheck(expected)
            }
        );
    }

    #[test]
    fn submitted_and_progress_map_directly() {
        assert_eq!(
            map_event(EngineEvent::Submitted {
                ticket: 4,
                task_id: TaskId::new("abc")
            }),
            Msg::TaskSubmitted {
                ticket: 4,
                task_id: TaskId::new("abc")
            }
        );
        assert_eq!(
            map_event(EngineEvent::PollAttempt {
                ticket: 4,
                attempt: 3
            }),
            Msg::PollProgress {
                ticket: 4,
                attempt: 3
            }
        );
    }
}
