//! Docflow core: pure page-controller state machine and view-model helpers.
mod effect;
mod field;
mod msg;
mod samples;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use field::{ExtractedField, ExtractionFields, FieldValue};
pub use msg::Msg;
pub use samples::{find_sample, sample_catalog, SampleFile};
pub use state::{
    BinaryResult, ControllerStatus, ExtractionParams, FileSelection, Operation, PageError,
    PageState, Phase, ResourceHandle, SubmitRequest, TaskFailure, TaskId, TaskResult, Ticket,
    UploadedFile, DOCX_MIME, EXTRACTION_JSON_FILENAME, EXTRACTION_MODE, PDF_MIME,
};
pub use update::update;
pub use view_model::{FieldRowView, PageViewModel, ResultView};
