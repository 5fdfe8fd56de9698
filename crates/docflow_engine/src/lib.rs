//! Docflow engine: backend client, status polling and result materialization.
mod api;
mod classify;
mod disposition;
mod engine;
mod input;
mod persist;
mod poll;
mod store;
mod types;

pub use api::{
    ApiSettings, DocumentApi, ReqwestDocumentApi, StatusCheckError, SubmissionError,
    BASE_URL_ENV, DEFAULT_BASE_URL, REQUEST_TIMEOUT_ENV,
};
pub use classify::classify_status;
pub use disposition::{filename_from_content_disposition, result_filename};
pub use engine::{EngineConfig, EngineHandle, EngineStopped};
pub use input::InputResolver;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poll::{ChannelProgressSink, PollError, PollPolicy, ProgressSink, StatusPoller};
pub use store::{ResourceStore, StoredResource};
pub use types::{EngineEvent, StatusReply, TaskPayload, Upload};
