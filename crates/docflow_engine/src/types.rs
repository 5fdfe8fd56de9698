use bytes::Bytes;
use docflow_core::{ExtractionFields, TaskId, TaskResult, Ticket};

use crate::{PollError, SubmissionError};

/// A file ready to be sent as the `binary_file` form part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub bytes: Bytes,
}

/// Terminal success payload of a status request.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskPayload {
    Document { bytes: Bytes, filename: String },
    Fields(ExtractionFields),
}

/// Classification of a single status response.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusReply {
    Pending,
    /// JSON that matches none of the known shapes.
    Unrecognized,
    Failed(String),
    Ready(TaskPayload),
}

impl StatusReply {
    pub fn kind(&self) -> &'static str {
        match self {
            StatusReply::Pending => "pending",
            StatusReply::Unrecognized => "unrecognized",
            StatusReply::Failed(_) => "failed",
            StatusReply::Ready(_) => "ready",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Submitted {
        ticket: Ticket,
        task_id: TaskId,
    },
    SubmitFailed {
        ticket: Ticket,
        error: SubmissionError,
    },
    PollAttempt {
        ticket: Ticket,
        attempt: u32,
    },
    PollFinished {
        ticket: Ticket,
        result: Result<TaskResult, PollError>,
    },
}
