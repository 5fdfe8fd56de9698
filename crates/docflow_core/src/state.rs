use std::fmt;

use crate::field::ExtractionFields;
use crate::samples::SampleFile;
use crate::view_model::PageViewModel;

/// Identifies one submission made by a page controller.
///
/// Every engine event carries the ticket it was issued for; events whose
/// ticket is no longer in flight are stale and never change the page.
pub type Ticket = u64;

/// Fixed mode tag always sent with extraction requests.
pub const EXTRACTION_MODE: &str = "administrative";

/// File name used when an extraction result is saved as JSON.
pub const EXTRACTION_JSON_FILENAME: &str = "extraction-results.json";

pub const DOCX_MIME: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const PDF_MIME: &str = "application/pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Extraction,
    Conversion,
    TextLayer,
}

impl Operation {
    pub fn submit_path(self) -> &'static str {
        match self {
            Operation::Extraction => "/info_extract",
            Operation::Conversion => "/ocr_extract",
            Operation::TextLayer => "/textlayer_extract",
        }
    }

    pub fn status_path(self) -> &'static str {
        match self {
            Operation::Extraction => "/info_extract_status",
            Operation::Conversion => "/ocr_extract_status",
            Operation::TextLayer => "/textlayer_extract_status",
        }
    }

    /// MIME type of the binary result, `None` for structured results.
    pub fn result_mime(self) -> Option<&'static str> {
        match self {
            Operation::Extraction => None,
            Operation::Conversion => Some(DOCX_MIME),
            Operation::TextLayer => Some(PDF_MIME),
        }
    }

    /// Filename used when the backend does not provide one.
    pub fn default_filename(self) -> &'static str {
        match self {
            Operation::Extraction => EXTRACTION_JSON_FILENAME,
            Operation::Conversion => "converted-document.docx",
            Operation::TextLayer => "enhanced-document.pdf",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Operation::Extraction => "extraction",
            Operation::Conversion => "conversion",
            Operation::TextLayer => "text layer addition",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Opaque task token issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to an in-memory resource held by the engine's resource store.
///
/// Whoever holds a handle owns the resource and must release it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource:{}", self.0)
    }
}

/// A user-provided file whose bytes already live in the resource store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub name: String,
    pub size: u64,
    pub preview: ResourceHandle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSelection {
    Sample(SampleFile),
    Upload(UploadedFile),
}

impl FileSelection {
    pub fn name(&self) -> &str {
        match self {
            FileSelection::Sample(sample) => sample.name,
            FileSelection::Upload(file) => &file.name,
        }
    }

    pub fn preview(&self) -> Option<ResourceHandle> {
        match self {
            FileSelection::Sample(_) => None,
            FileSelection::Upload(file) => Some(file.preview),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionParams {
    pub threshold: f64,
    pub use_corrector: bool,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            use_corrector: true,
        }
    }
}

/// Everything the engine needs to submit one task.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitRequest {
    pub operation: Operation,
    pub source: FileSelection,
    /// Present only for extraction.
    pub params: Option<ExtractionParams>,
}

/// A materialized binary result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryResult {
    pub handle: ResourceHandle,
    pub filename: String,
    pub mime: String,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskResult {
    Binary(BinaryResult),
    Structured(ExtractionFields),
}

impl TaskResult {
    pub fn handle(&self) -> Option<ResourceHandle> {
        match self {
            TaskResult::Binary(result) => Some(result.handle),
            TaskResult::Structured(_) => None,
        }
    }
}

/// Why a running task ended without a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// The status response carried an `error` field.
    Backend(String),
    /// The status request itself failed.
    StatusCheck(String),
}

/// User-visible error state of a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageError {
    Validation(String),
    Submission(String),
    StatusCheck(String),
    Backend(String),
}

impl PageError {
    pub fn message(&self) -> &str {
        match self {
            PageError::Validation(msg)
            | PageError::Submission(msg)
            | PageError::StatusCheck(msg)
            | PageError::Backend(msg) => msg,
        }
    }
}

impl fmt::Display for PageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Idle,
    Submitting { ticket: Ticket },
    Polling {
        ticket: Ticket,
        task_id: TaskId,
        attempts: u32,
    },
    Succeeded(TaskResult),
    Failed(PageError),
}

/// Coarse controller status, derived from phase and selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerStatus {
    #[default]
    Idle,
    FileSelected,
    Submitting,
    Polling,
    Succeeded,
    Failed,
}

/// State of one page controller.
#[derive(Debug, Clone, PartialEq)]
pub struct PageState {
    operation: Operation,
    selection: Option<FileSelection>,
    params: ExtractionParams,
    phase: Phase,
    notice: Option<PageError>,
    last_ticket: Ticket,
    dirty: bool,
}

impl PageState {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            selection: None,
            params: ExtractionParams::default(),
            phase: Phase::Idle,
            notice: None,
            last_ticket: 0,
            dirty: false,
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn selection(&self) -> Option<&FileSelection> {
        self.selection.as_ref()
    }

    pub fn params(&self) -> ExtractionParams {
        self.params
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn status(&self) -> ControllerStatus {
        match &self.phase {
            Phase::Idle if self.selection.is_some() => ControllerStatus::FileSelected,
            Phase::Idle => ControllerStatus::Idle,
            Phase::Submitting { .. } => ControllerStatus::Submitting,
            Phase::Polling { .. } => ControllerStatus::Polling,
            Phase::Succeeded(_) => ControllerStatus::Succeeded,
            Phase::Failed(_) => ControllerStatus::Failed,
        }
    }

    /// Ticket of the submission currently in flight, if any.
    pub fn in_flight(&self) -> Option<Ticket> {
        match &self.phase {
            Phase::Submitting { ticket } | Phase::Polling { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }

    pub fn task_id(&self) -> Option<&TaskId> {
        match &self.phase {
            Phase::Polling { task_id, .. } => Some(task_id),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&TaskResult> {
        match &self.phase {
            Phase::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    /// The error shown to the user: a task failure or a rejected action.
    pub fn error(&self) -> Option<&PageError> {
        match &self.phase {
            Phase::Failed(err) => Some(err),
            _ => self.notice.as_ref(),
        }
    }

    /// Every resource handle this page currently owns.
    pub fn held_resources(&self) -> Vec<ResourceHandle> {
        let mut handles = Vec::new();
        if let Some(preview) = self.selection.as_ref().and_then(FileSelection::preview) {
            handles.push(preview);
        }
        if let Some(handle) = self.result().and_then(TaskResult::handle) {
            handles.push(handle);
        }
        handles
    }

    pub fn view(&self) -> PageViewModel {
        PageViewModel::from_state(self, self.dirty)
    }

    /// Returns whether the state changed since the last call and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.mark_dirty();
    }

    pub(crate) fn set_selection(&mut self, selection: Option<FileSelection>) {
        self.selection = selection;
        self.mark_dirty();
    }

    pub(crate) fn set_notice(&mut self, notice: Option<PageError>) {
        if self.notice != notice {
            self.notice = notice;
            self.mark_dirty();
        }
    }

    pub(crate) fn params_mut(&mut self) -> &mut ExtractionParams {
        self.mark_dirty();
        &mut self.params
    }

    pub(crate) fn phase_mut(&mut self) -> &mut Phase {
        &mut self.phase
    }

    pub(crate) fn next_ticket(&mut self) -> Ticket {
        self.last_ticket += 1;
        self.last_ticket
    }
}
