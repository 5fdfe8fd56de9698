use std::time::Duration;

use bytes::Bytes;
use docflow_core::{ExtractionParams, FieldValue, Operation, TaskId};
use docflow_engine::{
    ApiSettings, DocumentApi, ReqwestDocumentApi, StatusCheckError, StatusReply, SubmissionError,
    TaskPayload, Upload,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn api_for(server: &MockServer) -> ReqwestDocumentApi {
    ReqwestDocumentApi::new(ApiSettings {
        base_url: format!("{}/document_api", server.uri()),
        ..ApiSettings::default()
    })
}

fn upload() -> Upload {
    Upload {
        filename: "TTG-970.pdf".into(),
        bytes: Bytes::from_static(b"%PDF-1.4 sample"),
    }
}

#[tokio::test]
async fn extraction_submit_sends_all_form_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/document_api/info_extract"))
        .and(body_string_contains(r#"name="binary_file"; filename="TTG-970.pdf""#))
        .and(body_string_contains(r#"name="threshold""#))
        .and(body_string_contains("0.5"))
        .and(body_string_contains(r#"name="use_corrector""#))
        .and(body_string_contains("true"))
        .and(body_string_contains(r#"name="mode""#))
        .and(body_string_contains("administrative"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"task_id": "abc"})))
        .expect(1)
        .mount(&server)
        .await;

    let task_id = api_for(&server)
        .submit(
            Operation::Extraction,
            &upload(),
            Some(&ExtractionParams::default()),
        )
        .await
        .expect("submit ok");
    assert_eq!(task_id, TaskId::new("abc"));
}

#[tokio::test]
async fn conversion_submit_sends_only_the_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/document_api/ocr_extract"))
        .and(body_string_contains(r#"name="binary_file""#))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"task_id": "c-1"})))
        .mount(&server)
        .await;

    let task_id = api_for(&server)
        .submit(Operation::Conversion, &upload(), None)
        .await
        .unwrap();
    assert_eq!(task_id.as_str(), "c-1");

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(!body.contains(r#"name="threshold""#));
    assert!(!body.contains(r#"name="mode""#));
}

#[tokio::test]
async fn submit_without_task_id_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/document_api/textlayer_extract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "queued"})))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .submit(Operation::TextLayer, &upload(), None)
        .await
        .unwrap_err();
    assert_eq!(err, SubmissionError::MissingTaskId);
    assert_eq!(err.to_string(), "No task ID received");
}

#[tokio::test]
async fn submit_http_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = api_for(&server)
        .submit(Operation::Conversion, &upload(), None)
        .await
        .unwrap_err();
    assert_eq!(err, SubmissionError::HttpStatus(503));
}

#[tokio::test]
async fn status_request_carries_task_id_and_reads_info() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/document_api/info_extract_status"))
        .and(query_param("task_id", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "info": {"Số hiệu văn bản": {"text": "970", "conf": 95}}
        })))
        .mount(&server)
        .await;

    let reply = api_for(&server)
        .check_status(Operation::Extraction, &TaskId::new("abc"))
        .await
        .unwrap();
    match reply {
        StatusReply::Ready(TaskPayload::Fields(fields)) => {
            let value = fields.get("Số hiệu văn bản").expect("field present");
            assert!(matches!(value, FieldValue::Scored { .. }));
            assert_eq!(value.display_lines(), vec!["970"]);
            assert_eq!(value.confidence(), Some("95"));
        }
        other => panic!("unexpected reply {other:?}"),
    }
}

#[tokio::test]
async fn binary_status_response_is_a_document_with_header_filename() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/document_api/ocr_extract_status"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Content-Disposition",
                    r#"attachment; filename="TTG-970.docx""#,
                )
                .set_body_raw(b"PK\x03\x04docx".to_vec(), "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let reply = api_for(&server)
        .check_status(Operation::Conversion, &TaskId::new("c-1"))
        .await
        .unwrap();
    assert_eq!(
        reply,
        StatusReply::Ready(TaskPayload::Document {
            bytes: Bytes::from_static(b"PK\x03\x04docx"),
            filename: "TTG-970.docx".into(),
        })
    );
}

#[tokio::test]
async fn status_pending_and_error_replies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("task_id", "pending"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "PENDING"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("task_id", "broken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "X"})))
        .mount(&server)
        .await;

    let api = api_for(&server);
    assert_eq!(
        api.check_status(Operation::TextLayer, &TaskId::new("pending"))
            .await
            .unwrap(),
        StatusReply::Pending
    );
    assert_eq!(
        api.check_status(Operation::TextLayer, &TaskId::new("broken"))
            .await
            .unwrap(),
        StatusReply::Failed("X".into())
    );
}

#[tokio::test]
async fn status_times_out_per_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_millis(250))
                .set_body_json(serde_json::json!({"status": "PENDING"})),
        )
        .mount(&server)
        .await;

    let api = ReqwestDocumentApi::new(ApiSettings {
        base_url: server.uri(),
        request_timeout: Duration::from_millis(50),
        ..ApiSettings::default()
    });
    let err = api
        .check_status(Operation::Conversion, &TaskId::new("slow"))
        .await
        .unwrap_err();
    assert!(matches!(err, StatusCheckError::Timeout(_)), "{err:?}");
}

#[tokio::test]
async fn oversized_result_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(vec![0u8; 64], "application/pdf"))
        .mount(&server)
        .await;

    let api = ReqwestDocumentApi::new(ApiSettings {
        base_url: server.uri(),
        max_result_bytes: 16,
        ..ApiSettings::default()
    });
    let err = api
        .check_status(Operation::TextLayer, &TaskId::new("big"))
        .await
        .unwrap_err();
    assert_eq!(err, StatusCheckError::TooLarge { max_bytes: 16 });
}
