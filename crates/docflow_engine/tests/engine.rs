use std::fs;
use std::time::{Duration, Instant};

use docflow_core::{
    find_sample, FileSelection, Operation, SubmitRequest, TaskResult, UploadedFile, DOCX_MIME,
};
use docflow_engine::{
    ApiSettings, EngineConfig, EngineEvent, EngineHandle, PollError, PollPolicy, SubmissionError,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INTERVAL: Duration = Duration::from_millis(40);

fn engine_for(server: &MockServer, samples_dir: &TempDir) -> EngineHandle {
    EngineHandle::new(EngineConfig {
        api: ApiSettings {
            base_url: server.uri(),
            ..ApiSettings::default()
        },
        poll: PollPolicy {
            interval: INTERVAL,
            ..PollPolicy::default()
        },
        samples_dir: samples_dir.path().to_path_buf(),
    })
}

fn samples_with_ttg() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("TTG-970.pdf"), b"%PDF-1.4 ttg").unwrap();
    dir
}

fn sample_request(operation: Operation) -> SubmitRequest {
    SubmitRequest {
        operation,
        source: FileSelection::Sample(*find_sample("TTG-970.pdf").unwrap()),
        params: None,
    }
}

/// Waits for the next event that is not a poll attempt.
fn next_milestone(engine: &EngineHandle) -> EngineEvent {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        match engine
            .recv_timeout(Duration::from_millis(100))
            .expect("engine running")
        {
            Some(EngineEvent::PollAttempt { .. }) | None => continue,
            Some(event) => return event,
        }
    }
    panic!("engine produced no event in time");
}

async fn mount_pending_then(server: &MockServer, status_path: &str, pending: u64, done: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(status_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "PENDING"})))
        .up_to_n_times(pending)
        .with_priority(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(status_path))
        .respond_with(done)
        .with_priority(2)
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sample_conversion_runs_to_a_stored_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ocr_extract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"task_id": "c-1"})))
        .mount(&server)
        .await;
    mount_pending_then(
        &server,
        "/ocr_extract_status",
        2,
        ResponseTemplate::new(200)
            .insert_header("Content-Disposition", r#"attachment; filename="TTG-970.docx""#)
            .set_body_raw(b"PK\x03\x04".to_vec(), "application/octet-stream"),
    )
    .await;

    let samples = samples_with_ttg();
    let engine = engine_for(&server, &samples);
    let started = Instant::now();
    engine.submit(1, sample_request(Operation::Conversion));

    let task_id = match next_milestone(&engine) {
        EngineEvent::Submitted { ticket: 1, task_id } => task_id,
        other => panic!("unexpected event {other:?}"),
    };
    engine.start_polling(1, Operation::Conversion, task_id);

    let result = match next_milestone(&engine) {
        EngineEvent::PollFinished { ticket: 1, result } => result.expect("success"),
        other => panic!("unexpected event {other:?}"),
    };
    assert!(started.elapsed() >= INTERVAL * 2);

    let TaskResult::Binary(binary) = result else {
        panic!("expected binary result");
    };
    assert_eq!(binary.filename, "TTG-970.docx");
    assert_eq!(binary.mime, DOCX_MIME);
    let stored = engine.store().get(binary.handle).unwrap();
    assert_eq!(&stored.bytes[..], b"PK\x03\x04");

    let status_requests = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|request| request.url.path() == "/ocr_extract_status")
        .count();
    assert_eq!(status_requests, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn uploads_are_read_from_the_store() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/textlayer_extract"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"task_id": "t-1"})))
        .mount(&server)
        .await;

    let samples = TempDir::new().unwrap();
    let engine = engine_for(&server, &samples);
    let preview = engine
        .store()
        .store_upload("mine.pdf", bytes::Bytes::from_static(b"%PDF-uploaded"));
    engine.submit(
        5,
        SubmitRequest {
            operation: Operation::TextLayer,
            source: FileSelection::Upload(UploadedFile {
                name: "mine.pdf".into(),
                size: 13,
                preview,
            }),
            params: None,
        },
    );

    assert!(matches!(
        next_milestone(&engine),
        EngineEvent::Submitted { ticket: 5, .. }
    ));
    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("%PDF-uploaded"));
    assert!(body.contains(r#"filename="mine.pdf""#));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn missing_sample_fails_submission_without_a_request() {
    let server = MockServer::start().await;
    let samples = TempDir::new().unwrap();
    let engine = engine_for(&server, &samples);
    engine.submit(1, sample_request(Operation::Conversion));

    match next_milestone(&engine) {
        EngineEvent::SubmitFailed {
            ticket: 1,
            error: SubmissionError::Input(_),
        } => {}
        other => panic!("unexpected event {other:?}"),
    }
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn backend_error_finishes_the_poll() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/textlayer_extract_status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"error": "X"})))
        .expect(1)
        .mount(&server)
        .await;

    let samples = TempDir::new().unwrap();
    let engine = engine_for(&server, &samples);
    engine.start_polling(3, Operation::TextLayer, docflow_core::TaskId::new("t"));

    match next_milestone(&engine) {
        EngineEvent::PollFinished { ticket: 3, result } => {
            assert_eq!(result, Err(PollError::Backend("X".into())));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cancelled_poll_reports_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/ocr_extract_status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "PENDING"})))
        .mount(&server)
        .await;

    let samples = TempDir::new().unwrap();
    let engine = engine_for(&server, &samples);
    engine.start_polling(1, Operation::Conversion, docflow_core::TaskId::new("c"));

    // Let at least one attempt happen, then invalidate the loop.
    let deadline = Instant::now() + Duration::from_secs(5);
    while !matches!(
        engine.recv_timeout(Duration::from_millis(50)),
        Ok(Some(EngineEvent::PollAttempt { ticket: 1, .. }))
    ) {
        assert!(Instant::now() < deadline, "no poll attempt observed");
    }
    engine.cancel_polling(1);
    tokio::time::sleep(INTERVAL * 3).await;
    let requests_after_cancel = server.received_requests().await.unwrap().len();

    tokio::time::sleep(INTERVAL * 5).await;
    assert_eq!(
        server.received_requests().await.unwrap().len(),
        requests_after_cancel
    );
    while let Some(event) = engine.try_recv() {
        assert!(
            !matches!(event, EngineEvent::PollFinished { .. }),
            "cancelled poll must not finish: {event:?}"
        );
    }
}
