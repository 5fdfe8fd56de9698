use crate::{TaskFailure, TaskId, TaskResult, Ticket, UploadedFile};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User picked a bundled sample by name.
    SampleSelected(String),
    /// User provided a file; its bytes are already in the resource store.
    FileUploaded(UploadedFile),
    /// Extraction confidence threshold moved.
    ThresholdChanged(f64),
    /// Extraction "use corrector" checkbox toggled.
    CorrectorToggled(bool),
    /// User clicked the start button.
    StartClicked,
    /// User cleared the selected file.
    ClearClicked,
    /// User asked to save the current result.
    DownloadClicked,
    /// Engine: the backend accepted the upload.
    TaskSubmitted { ticket: Ticket, task_id: TaskId },
    /// Engine: the upload could not be submitted.
    SubmissionFailed { ticket: Ticket, message: String },
    /// Engine: a status request was answered without a terminal result.
    PollProgress { ticket: Ticket, attempt: u32 },
    /// Engine: the task finished and its result is materialized.
    TaskSucceeded { ticket: Ticket, result: TaskResult },
    /// Engine: the task ended without a result.
    TaskFailed { ticket: Ticket, failure: TaskFailure },
    /// Fallback for placeholder wiring.
    NoOp,
}
