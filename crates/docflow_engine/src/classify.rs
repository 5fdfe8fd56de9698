use bytes::Bytes;
use docflow_core::{ExtractionFields, Operation};
use serde_json::Value;

use crate::disposition::result_filename;
use crate::{StatusReply, TaskPayload};

const PENDING: &str = "PENDING";

/// Classifies one status response.
///
/// Extraction status is always JSON. For the document operations a non-JSON
/// content type means the finished document itself is being streamed back.
pub fn classify_status(
    operation: Operation,
    content_type: Option<&str>,
    content_disposition: Option<&str>,
    body: Bytes,
) -> StatusReply {
    let json = content_type.is_some_and(is_json_content_type);
    if !json && operation != Operation::Extraction {
        return StatusReply::Ready(TaskPayload::Document {
            filename: result_filename(operation, content_disposition),
            bytes: body,
        });
    }

    match serde_json::from_slice::<Value>(&body) {
        Ok(value) => classify_json(operation, value),
        Err(_) => StatusReply::Unrecognized,
    }
}

fn classify_json(operation: Operation, value: Value) -> StatusReply {
    let Value::Object(mut map) = value else {
        return StatusReply::Unrecognized;
    };

    if map.get("status").and_then(Value::as_str) == Some(PENDING) {
        return StatusReply::Pending;
    }
    if operation == Operation::Extraction {
        if let Some(Value::Object(info)) = map.remove("info") {
            return StatusReply::Ready(TaskPayload::Fields(ExtractionFields::from_json_map(info)));
        }
    }
    match map.remove("error") {
        Some(Value::String(message)) if !message.is_empty() => StatusReply::Failed(message),
        Some(Value::Null | Value::Bool(false)) | Some(Value::String(_)) | None => {
            StatusReply::Unrecognized
        }
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => StatusReply::Unrecognized,
        Some(other) => StatusReply::Failed(other.to_string()),
    }
}

fn is_json_content_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}
