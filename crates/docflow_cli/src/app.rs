use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use docflow_core::{
    find_sample, update, ControllerStatus, ExtractionParams, Msg, Operation, PageState,
    PageViewModel, UploadedFile,
};
use docflow_engine::{ensure_output_dir, EngineHandle, ResourceStore};
use engine_logging::{engine_debug, engine_warn};

use crate::config::AppConfig;
use crate::effects::{map_event, EffectRunner};
use crate::render;

const EVENT_WAIT: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub enum InputSource {
    File(PathBuf),
    Sample(String),
}

#[derive(Debug, Clone)]
pub struct RunRequest {
    pub operation: Operation,
    pub source: Option<InputSource>,
    /// Only sent for extraction.
    pub params: Option<ExtractionParams>,
}

#[derive(Debug)]
pub struct RunSummary {
    /// Page as it looked when the task finished, before it was cleared.
    pub view: PageViewModel,
    pub saved: Vec<PathBuf>,
    pub finished_at: DateTime<Utc>,
}

/// Runs one operation to completion. Ctrl-C clears the page.
pub fn run(config: AppConfig, request: RunRequest) -> Result<RunSummary> {
    let (msg_tx, msg_rx) = mpsc::channel();
    install_interrupt_handler(msg_tx);
    run_with_inbox(config, request, msg_rx)
}

pub fn run_with_inbox(
    config: AppConfig,
    request: RunRequest,
    inbox: mpsc::Receiver<Msg>,
) -> Result<RunSummary> {
    ensure_output_dir(&config.output_dir)
        .with_context(|| format!("output directory {:?} is unusable", config.output_dir))?;

    let engine = EngineHandle::new(config.engine);
    let mut controller = PageController::new(
        request.operation,
        EffectRunner::new(engine, config.output_dir),
    );
    let seed = seed_messages(&request, controller.runner.engine().store())?;
    controller.drive(seed, &inbox)
}

fn seed_messages(request: &RunRequest, store: &ResourceStore) -> Result<Vec<Msg>> {
    let mut seed = Vec::new();
    match &request.source {
        Some(InputSource::File(path)) => {
            let bytes = fs::read(path).with_context(|| format!("failed to read {:?}", path))?;
            let name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "document.pdf".to_string());
            let size = bytes.len() as u64;
            let preview = store.store_upload(name.clone(), Bytes::from(bytes));
            seed.push(Msg::FileUploaded(UploadedFile {
                name,
                size,
                preview,
            }));
        }
        Some(InputSource::Sample(name)) => {
            if find_sample(name).is_none() {
                engine_warn!("Unknown sample {:?}; see `docflow samples`", name);
            }
            seed.push(Msg::SampleSelected(name.clone()));
        }
        None => {}
    }
    if let Some(params) = request.params {
        seed.push(Msg::ThresholdChanged(params.threshold));
        seed.push(Msg::CorrectorToggled(params.use_corrector));
    }
    seed.push(Msg::StartClicked);
    Ok(seed)
}

fn install_interrupt_handler(msg_tx: mpsc::Sender<Msg>) {
    thread::spawn(move || {
        let runtime = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime,
            Err(err) => {
                engine_warn!("Ctrl-C handling unavailable: {}", err);
                return;
            }
        };
        if runtime.block_on(tokio::signal::ctrl_c()).is_ok() {
            engine_warn!("Interrupted, clearing the page");
            let _ = msg_tx.send(Msg::ClearClicked);
        }
    });
}

struct PageController {
    operation: Operation,
    state: PageState,
    runner: EffectRunner,
    last_status: Option<String>,
}

impl PageController {
    fn new(operation: Operation, runner: EffectRunner) -> Self {
        Self {
            operation,
            state: PageState::new(operation),
            runner,
            last_status: None,
        }
    }

    fn drive(&mut self, seed: Vec<Msg>, inbox: &mpsc::Receiver<Msg>) -> Result<RunSummary> {
        for msg in seed {
            self.dispatch(msg);
        }
        while self.state.in_flight().is_some() {
            while let Ok(msg) = inbox.try_recv() {
                self.dispatch(msg);
            }
            if self.state.in_flight().is_none() {
                break;
            }
            if let Some(event) = self.runner.engine().recv_timeout(EVENT_WAIT)? {
                self.dispatch(map_event(event));
            }
        }
        self.finish()
    }

    fn finish(&mut self) -> Result<RunSummary> {
        let succeeded = self.state.status() == ControllerStatus::Succeeded;
        if succeeded {
            self.dispatch(Msg::DownloadClicked);
        }
        let view = self.state.view();
        let saved = self.runner.take_saved();
        let failures = self.runner.take_failures();

        self.apply(Msg::ClearClicked);
        let live = self.runner.engine().store().live_count();
        if live > 0 {
            engine_warn!("{} resources still held after clearing the page", live);
        }

        if !succeeded {
            let message = view
                .error
                .clone()
                .unwrap_or_else(|| format!("Interrupted before the {} finished", self.operation));
            bail!(message);
        }
        if let Some(failure) = failures.into_iter().next() {
            bail!(failure);
        }
        Ok(RunSummary {
            view,
            saved,
            finished_at: Utc::now(),
        })
    }

    fn dispatch(&mut self, msg: Msg) {
        if self.apply(msg) {
            self.render();
        }
    }

    /// Runs `update` and its effects; returns whether the page changed.
    fn apply(&mut self, msg: Msg) -> bool {
        engine_debug!("dispatch {:?}", msg);
        let state = std::mem::replace(&mut self.state, PageState::new(self.operation));
        let (mut state, effects) = update(state, msg);
        let was_dirty = state.consume_dirty();
        self.state = state;
        self.runner.run(effects);
        was_dirty
    }

    fn render(&mut self) {
        let line = render::status_line(&self.state.view());
        if self.last_status.as_deref() != Some(line.as_str()) {
            eprintln!("{line}");
            self.last_status = Some(line);
        }
    }
}
