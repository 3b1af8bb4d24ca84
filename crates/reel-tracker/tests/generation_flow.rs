//! End-to-end tracker flows against a mock generation backend.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use reel_client::{JobClient, JobClientConfig};
use reel_models::{Artifact, ConnectionMode, Phase};
use reel_tracker::{GenerationTracker, Lifecycle, TrackerConfig};

fn tracker_for(server: &MockServer) -> GenerationTracker {
    let client = JobClient::new(JobClientConfig {
        base_url: server.uri(),
        ..JobClientConfig::default()
    })
    .expect("client should build");

    GenerationTracker::new(
        client,
        TrackerConfig {
            poll_interval: Duration::from_millis(50),
            artifact_fetch_delay: Duration::ZERO,
            ..TrackerConfig::default()
        },
    )
}

fn sse_body(frames: &[&str]) -> String {
    frames
        .iter()
        .map(|f| format!("data: {}\n\n", f))
        .collect::<String>()
}

async fn mount_start(server: &MockServer, job_id: &str) {
    Mock::given(method("POST"))
        .and(path("/generate_video_stream"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "job_id": job_id,
            "status": "started"
        })))
        .mount(server)
        .await;
}

async fn mount_cleanup(server: &MockServer, job_id: &str) {
    Mock::given(method("DELETE"))
        .and(path(format!("/cleanup/{}", job_id)))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
}

#[tokio::test]
async fn streaming_happy_path() {
    let server = MockServer::start().await;
    mount_start(&server, "abc").await;
    mount_cleanup(&server, "abc").await;

    let body = sse_body(&[
        r#"{"message":"Analyzing content"}"#,
        r#"{"message":"Creating 4 video segments..."}"#,
        r#"{"message":"Combining audio and videos..."}"#,
        r#"{"status":"complete","video_path":"videos/abc_final.mp4"}"#,
    ]);
    Mock::given(method("GET"))
        .and(path("/stream_logs/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/get_video/abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"\x00binaryvideo".to_vec(), "video/mp4"),
        )
        .mount(&server)
        .await;

    let mut tracker = tracker_for(&server);
    let artifact = tracker.generate("hello world").await.unwrap();

    assert!(matches!(artifact, Artifact::Media(ref b) if b.len() == 12));

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.lifecycle, Lifecycle::Complete);
    assert_eq!(snapshot.progress.phase, Phase::Complete);
    assert_eq!(snapshot.progress.percent, 100);
    assert_eq!(
        snapshot.logs,
        [
            "Analyzing content",
            "Creating 4 video segments...",
            "Combining audio and videos..."
        ]
    );
    assert!(snapshot.artifact.is_some());
}

#[tokio::test]
async fn failover_to_polling_completes_the_job() {
    let server = MockServer::start().await;
    mount_start(&server, "abc").await;
    mount_cleanup(&server, "abc").await;

    // Stream delivers one message, then the server closes the connection
    // without a completion frame: a transport failure.
    Mock::given(method("GET"))
        .and(path("/stream_logs/abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(sse_body(&[r#"{"message":"Analyzing content"}"#]), "text/event-stream"),
        )
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/job_status/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "complete",
            "progress": 100,
            "logs": ["Analyzing content", "Rendering video..."]
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/get_video/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://cdn.example.com/abc_final.mp4"
        })))
        .mount(&server)
        .await;

    let mut tracker = tracker_for(&server);
    let mut watch = tracker.subscribe();

    let artifact = tracker.generate("hello").await.unwrap();
    assert_eq!(artifact.url(), Some("https://cdn.example.com/abc_final.mp4"));

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.lifecycle, Lifecycle::Complete);
    // Streamed line not duplicated by the polled batch.
    assert_eq!(snapshot.logs, ["Analyzing content", "Rendering video..."]);

    // The watch channel observed the failover to polling.
    let final_snapshot = watch.borrow_and_update();
    assert_eq!(final_snapshot.connection.mode, ConnectionMode::Poll);
}

#[tokio::test]
async fn start_failure_is_fatal_and_opens_no_sources() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/generate_video_stream"))
        .respond_with(ResponseTemplate::new(503).set_body_string("no workers"))
        .mount(&server)
        .await;

    let mut tracker = tracker_for(&server);
    let err = tracker.generate("hello").await.unwrap_err();
    assert!(err.is_fatal());

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.lifecycle, Lifecycle::Failed);
    assert!(!snapshot.progress.message.is_empty());
    assert!(snapshot.progress.message.starts_with("Error:"));
    assert_eq!(snapshot.progress.percent, 0);
    assert!(snapshot.logs.is_empty());

    // Only the start request ever went out.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn artifact_failure_falls_back_to_placeholder() {
    let server = MockServer::start().await;
    mount_start(&server, "abc").await;
    mount_cleanup(&server, "abc").await;

    Mock::given(method("GET"))
        .and(path("/stream_logs/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&["DONE: videos/abc_final.mp4"]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/get_video/abc"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut tracker = tracker_for(&server);
    let artifact = tracker.generate("hello").await.unwrap();

    assert_eq!(artifact.url(), Some(reel_tracker::FALLBACK_VIDEO_URL));
    assert_eq!(tracker.snapshot().lifecycle, Lifecycle::Complete);
}

#[tokio::test]
async fn error_sentinel_fails_over_then_fails_the_run() {
    let server = MockServer::start().await;
    mount_start(&server, "abc").await;
    mount_cleanup(&server, "abc").await;

    Mock::given(method("GET"))
        .and(path("/stream_logs/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[r#"{"message":"ERROR: voice synthesis failed"}"#]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/job_status/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "error",
            "message": "voice synthesis failed"
        })))
        .mount(&server)
        .await;

    let mut tracker = tracker_for(&server);
    let err = tracker.generate("hello").await.unwrap_err();
    assert!(err.to_string().contains("voice synthesis failed"));

    let snapshot = tracker.snapshot();
    assert_eq!(snapshot.lifecycle, Lifecycle::Failed);
    assert!(snapshot.progress.message.contains("voice synthesis failed"));
    // The sentinel frame itself never reached the log sink.
    assert!(snapshot.logs.is_empty());
}

#[tokio::test]
async fn transient_poll_failures_do_not_end_the_run() {
    let server = MockServer::start().await;
    mount_start(&server, "abc").await;
    mount_cleanup(&server, "abc").await;

    // Immediate transport failure: stream endpoint not mocked at all would
    // 404; serve an empty stream instead so the adapter sees EOF.
    Mock::given(method("GET"))
        .and(path("/stream_logs/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("", "text/event-stream"))
        .mount(&server)
        .await;

    // First poll fails, second completes.
    Mock::given(method("GET"))
        .and(path("/job_status/abc"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/job_status/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "complete",
            "progress": 100
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/get_video/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://cdn.example.com/abc_final.mp4"
        })))
        .mount(&server)
        .await;

    let mut tracker = tracker_for(&server);
    let artifact = tracker.generate("hello").await.unwrap();
    assert!(artifact.is_remote());
    assert_eq!(tracker.snapshot().lifecycle, Lifecycle::Complete);
}

#[tokio::test]
async fn restarting_releases_the_previous_job() {
    let server = MockServer::start().await;
    mount_start(&server, "abc").await;
    mount_cleanup(&server, "abc").await;

    Mock::given(method("GET"))
        .and(path("/stream_logs/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            sse_body(&[r#"{"status":"complete"}"#]),
            "text/event-stream",
        ))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/get_video/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "url": "https://cdn.example.com/abc_final.mp4"
        })))
        .mount(&server)
        .await;

    let mut tracker = tracker_for(&server);
    tracker.generate("first").await.unwrap();
    tracker.generate("second").await.unwrap();

    // Each completed run released its job exactly once; the second run's
    // implicit cleanup had nothing left to release.
    let cleanups = server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.url.path().starts_with("/cleanup/"))
        .count();
    assert_eq!(cleanups, 2);
}
