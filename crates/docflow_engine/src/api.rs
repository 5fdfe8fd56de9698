use std::time::Duration;

use bytes::Bytes;
use docflow_core::{ExtractionParams, Operation, TaskId, EXTRACTION_MODE, PDF_MIME};
use engine_logging::{engine_debug, engine_info};
use futures_util::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::classify::classify_status;
use crate::{StatusReply, Upload};

pub const DEFAULT_BASE_URL: &str = "http://192.168.20.150/document_api";
pub const BASE_URL_ENV: &str = "DOCFLOW_API_BASE_URL";
pub const REQUEST_TIMEOUT_ENV: &str = "DOCFLOW_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Applies to each individual request, not to the whole poll loop.
    pub request_timeout: Duration,
    pub max_result_bytes: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            max_result_bytes: 200 * 1024 * 1024,
        }
    }
}

impl ApiSettings {
    /// Defaults overridden by `DOCFLOW_API_BASE_URL` and
    /// `DOCFLOW_REQUEST_TIMEOUT_SECS` when set.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|url| !url.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(secs) = lookup(REQUEST_TIMEOUT_ENV).and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.request_timeout = Duration::from_secs(secs);
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
    #[error("could not read input file: {0}")]
    Input(String),
    #[error("{0}")]
    Transport(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("server responded with http status {0}")]
    HttpStatus(u16),
    #[error("unreadable submission response: {0}")]
    InvalidResponse(String),
    #[error("No task ID received")]
    MissingTaskId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StatusCheckError {
    #[error("invalid endpoint url: {0}")]
    InvalidUrl(String),
    #[error("{0}")]
    Transport(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("server responded with http status {0}")]
    HttpStatus(u16),
    #[error("result too large (max {max_bytes} bytes)")]
    TooLarge { max_bytes: u64 },
}

/// Request/response contract of the document-processing backend.
#[async_trait::async_trait]
pub trait DocumentApi: Send + Sync {
    async fn submit(
        &self,
        operation: Operation,
        upload: &Upload,
        params: Option<&ExtractionParams>,
    ) -> Result<TaskId, SubmissionError>;

    async fn check_status(
        &self,
        operation: Operation,
        task_id: &TaskId,
    ) -> Result<StatusReply, StatusCheckError>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    #[serde(default)]
    task_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ReqwestDocumentApi {
    settings: ApiSettings,
}

impl ReqwestDocumentApi {
    pub fn new(settings: ApiSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ApiSettings {
        &self.settings
    }

    fn build_client(&self) -> Result<reqwest::Client, reqwest::Error> {
        reqwest::Client::builder()
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .build()
    }

    /// Joins an endpoint path onto the base url, keeping any base path prefix.
    fn endpoint(&self, path: &str) -> Result<url::Url, url::ParseError> {
        let base = self.settings.base_url.trim_end_matches('/');
        url::Url::parse(&format!("{base}{path}"))
    }
}

#[async_trait::async_trait]
impl DocumentApi for ReqwestDocumentApi {
    async fn submit(
        &self,
        operation: Operation,
        upload: &Upload,
        params: Option<&ExtractionParams>,
    ) -> Result<TaskId, SubmissionError> {
        let url = self
            .endpoint(operation.submit_path())
            .map_err(|err| SubmissionError::InvalidUrl(err.to_string()))?;
        let client = self.build_client().map_err(map_submit_error)?;

        let part = Part::bytes(upload.bytes.to_vec())
            .file_name(upload.filename.clone())
            .mime_str(PDF_MIME)
            .map_err(map_submit_error)?;
        let mut form = Form::new().part("binary_file", part);
        if let Some(params) = params {
            form = form
                .text("threshold", params.threshold.to_string())
                .text("use_corrector", params.use_corrector.to_string())
                .text("mode", EXTRACTION_MODE);
        }

        engine_info!(
            "Submitting {} file={} bytes={} url={}",
            operation,
            upload.filename,
            upload.bytes.len(),
            url
        );
        let response = client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(map_submit_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmissionError::HttpStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(map_submit_error)?;
        let parsed: SubmitResponse = serde_json::from_slice(&body)
            .map_err(|err| SubmissionError::InvalidResponse(err.to_string()))?;
        match parsed.task_id {
            Some(id) if !id.is_empty() => Ok(TaskId::new(id)),
            _ => Err(SubmissionError::MissingTaskId),
        }
    }

    async fn check_status(
        &self,
        operation: Operation,
        task_id: &TaskId,
    ) -> Result<StatusReply, StatusCheckError> {
        let mut url = self
            .endpoint(operation.status_path())
            .map_err(|err| StatusCheckError::InvalidUrl(err.to_string()))?;
        url.query_pairs_mut().append_pair("task_id", task_id.as_str());
        let client = self.build_client().map_err(map_status_error)?;

        let response = client.get(url).send().await.map_err(map_status_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(StatusCheckError::HttpStatus(status.as_u16()));
        }

        let max_bytes = self.settings.max_result_bytes;
        if response.content_length().is_some_and(|len| len > max_bytes) {
            return Err(StatusCheckError::TooLarge { max_bytes });
        }
        let content_type = header_string(&response, CONTENT_TYPE);
        let content_disposition = header_string(&response, CONTENT_DISPOSITION);

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_status_error)?;
            if body.len() as u64 + chunk.len() as u64 > max_bytes {
                return Err(StatusCheckError::TooLarge { max_bytes });
            }
            body.extend_from_slice(&chunk);
        }
        engine_debug!(
            "Status response for {} task={} content_type={:?} bytes={}",
            operation,
            task_id,
            content_type,
            body.len()
        );

        Ok(classify_status(
            operation,
            content_type.as_deref(),
            content_disposition.as_deref(),
            Bytes::from(body),
        ))
    }
}

fn header_string(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string())
}

fn map_submit_error(err: reqwest::Error) -> SubmissionError {
    if err.is_timeout() {
        return SubmissionError::Timeout(err.to_string());
    }
    SubmissionError::Transport(err.to_string())
}

fn map_status_error(err: reqwest::Error) -> StatusCheckError {
    if err.is_timeout() {
        return StatusCheckError::Timeout(err.to_string());
    }
    StatusCheckError::Transport(err.to_string())
}
