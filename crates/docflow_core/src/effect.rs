use crate::{Operation, ResourceHandle, SubmitRequest, TaskId, Ticket};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Submit {
        ticket: Ticket,
        request: SubmitRequest,
    },
    StartPolling {
        ticket: Ticket,
        operation: Operation,
        task_id: TaskId,
    },
    /// Invalidate the poll loop started for `ticket`.
    CancelPolling { ticket: Ticket },
    /// Revoke a resource the page no longer references.
    Release { handle: ResourceHandle },
    /// Save a stored binary result under `filename`.
    SaveResource {
        handle: ResourceHandle,
        filename: String,
    },
    /// Save serialized extraction results under `filename`.
    SaveJson { filename: String, contents: String },
}
