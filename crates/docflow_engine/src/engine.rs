use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use docflow_core::{Operation, SubmitRequest, TaskId, Ticket};
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiSettings, DocumentApi, ReqwestDocumentApi};
use crate::input::InputResolver;
use crate::poll::{ChannelProgressSink, PollError, PollPolicy, StatusPoller};
use crate::store::ResourceStore;
use crate::EngineEvent;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api: ApiSettings,
    pub poll: PollPolicy,
    pub samples_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            poll: PollPolicy::default(),
            samples_dir: PathBuf::from("samples"),
        }
    }
}

enum EngineCommand {
    Submit {
        ticket: Ticket,
        request: SubmitRequest,
    },
    StartPolling {
        ticket: Ticket,
        operation: Operation,
        task_id: TaskId,
    },
    CancelPolling {
        ticket: Ticket,
    },
}

type PollRegistry = Arc<Mutex<HashMap<Ticket, CancellationToken>>>;

/// The engine thread has exited; no further events will arrive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("engine thread stopped")]
pub struct EngineStopped;

/// Background executor for one page controller.
///
/// Tickets are only unique within a page, so each page gets its own handle.
/// Dropping the handle cancels every running poll.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    store: ResourceStore,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Self {
        let api: Arc<dyn DocumentApi> = Arc::new(ReqwestDocumentApi::new(config.api.clone()));
        Self::with_api(config, api)
    }

    pub fn with_api(config: EngineConfig, api: Arc<dyn DocumentApi>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let store = ResourceStore::new();
        let resolver = InputResolver::new(config.samples_dir.clone(), store.clone());
        let poller = StatusPoller::new(config.poll.clone());
        let worker_store = store.clone();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    engine_error!("Failed to start the engine runtime: {}", err);
                    return;
                }
            };
            let polls: PollRegistry = Arc::new(Mutex::new(HashMap::new()));
            let worker = Worker {
                api,
                resolver,
                poller,
                store: worker_store,
                polls: polls.clone(),
                event_tx,
            };
            while let Ok(command) = cmd_rx.recv() {
                let worker = worker.clone();
                match command {
                    EngineCommand::Submit { ticket, request } => {
                        runtime.spawn(async move { worker.submit(ticket, request).await });
                    }
                    EngineCommand::StartPolling {
                        ticket,
                        operation,
                        task_id,
                    } => {
                        let cancel = CancellationToken::new();
                        lock_polls(&polls).insert(ticket, cancel.clone());
                        runtime.spawn(async move {
                            worker.poll(ticket, operation, task_id, cancel).await
                        });
                    }
                    EngineCommand::CancelPolling { ticket } => {
                        if let Some(cancel) = lock_polls(&polls).remove(&ticket) {
                            engine_debug!("Cancelling poll for ticket {}", ticket);
                            cancel.cancel();
                        }
                    }
                }
            }
            for (_, cancel) in lock_polls(&polls).drain() {
                cancel.cancel();
            }
        });

        Self {
            cmd_tx,
            event_rx,
            store,
        }
    }

    pub fn submit(&self, ticket: Ticket, request: SubmitRequest) {
        let _ = self.cmd_tx.send(EngineCommand::Submit { ticket, request });
    }

    pub fn start_polling(&self, ticket: Ticket, operation: Operation, task_id: TaskId) {
        let _ = self.cmd_tx.send(EngineCommand::StartPolling {
            ticket,
            operation,
            task_id,
        });
    }

    pub fn cancel_polling(&self, ticket: Ticket) {
        let _ = self.cmd_tx.send(EngineCommand::CancelPolling { ticket });
    }

    pub fn store(&self) -> &ResourceStore {
        &self.store
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Waits up to `timeout` for the next event. `Ok(None)` means nothing
    /// arrived in time.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<EngineEvent>, EngineStopped> {
        match self.event_rx.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(None),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(EngineStopped),
        }
    }
}

fn lock_polls(
    polls: &PollRegistry,
) -> std::sync::MutexGuard<'_, HashMap<Ticket, CancellationToken>> {
    polls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Clone)]
struct Worker {
    api: Arc<dyn DocumentApi>,
    resolver: InputResolver,
    poller: StatusPoller,
    store: ResourceStore,
    polls: PollRegistry,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl Worker {
    async fn submit(&self, ticket: Ticket, request: SubmitRequest) {
        let result = match self.resolver.resolve(&request.source).await {
            Ok(upload) => {
                self.api
                    .submit(request.operation, &upload, request.params.as_ref())
                    .await
            }
            Err(err) => Err(err),
        };
        let event = match result {
            Ok(task_id) => {
                engine_info!(
                    "Ticket {} submitted {} as task {}",
                    ticket,
                    request.operation,
                    task_id
                );
                EngineEvent::Submitted { ticket, task_id }
            }
            Err(error) => {
                engine_warn!("Ticket {} submission failed: {}", ticket, error);
                EngineEvent::SubmitFailed { ticket, error }
            }
        };
        let _ = self.event_tx.send(event);
    }

    async fn poll(
        &self,
        ticket: Ticket,
        operation: Operation,
        task_id: TaskId,
        cancel: CancellationToken,
    ) {
        let sink = ChannelProgressSink::new(self.event_tx.clone());
        let outcome = self
            .poller
            .run(self.api.as_ref(), ticket, operation, &task_id, &cancel, &sink)
            .await;
        lock_polls(&self.polls).remove(&ticket);

        if matches!(outcome, Err(PollError::Cancelled)) {
            engine_debug!("Poll for ticket {} stopped after cancellation", ticket);
            return;
        }
        let result = outcome.map(|payload| self.store.materialize(operation, payload));
        let _ = self.event_tx.send(EngineEvent::PollFinished { ticket, result });
    }
}
