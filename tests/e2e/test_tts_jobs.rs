use crate::e2e::helpers;

use aivoice_backend::domain::tts::JobStatus;
use aivoice_backend::infrastructure::storage::AudioStorage;
use helpers::stub_tts::{BROKEN_VOICE, SLOW_VOICE};
use helpers::{TestContext, TEST_MAX_TEXT_CHARS};
use hyper::StatusCode;
use serde_json::{json, Value};
use test_context::test_context;
use uuid::Uuid;

const TWO_SENTENCES: &str = "The first sentence is here. The second sentence follows it.";

fn slow_text() -> String {
    // Several chunks at 400ms each keeps the job processing long enough to act on it
    (1..=6)
        .map(|i| format!("Sentence number {} is read out loud.", i))
        .collect::<Vec<_>>()
        .join(" ")
}

fn position(haystack: &[u8], needle: &str) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle.as_bytes())
}

// ============================================================================
// Submission
// ============================================================================

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_create_pending_job(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/api/tts", &json!({ "text": TWO_SENTENCES }))
        .await
        .unwrap();

    response.assert_status(StatusCode::CREATED);

    let body = response.body.as_ref().unwrap();
    assert!(body.get("id").and_then(|v| v.as_str()).is_some());
    assert_eq!(body["text"], TWO_SENTENCES);
    assert_eq!(body["voice"], "stub");
    assert_eq!(body["rate"], "+0%");
    assert_eq!(body["pitch"], "+0Hz");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["processed_chunks"], 0);
    assert!(body["total_chunks"].as_i64().unwrap() >= 2);
    assert!(body.get("audio_url").is_none());
    assert!(body.get("error_message").is_none());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_store_canonical_voice_parameters(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/tts",
            &json!({ "text": "Hello there.", "voice": "stub", "rate": "10%", "pitch": "-2Hz" }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::CREATED);

    let body = response.body.as_ref().unwrap();
    assert_eq!(body["rate"], "+10%");
    assert_eq!(body["pitch"], "-2Hz");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_empty_text(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/api/tts", &json!({ "text": "   " }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("Text cannot be empty");
    assert_eq!(ctx.fixtures.count_jobs().await.unwrap(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_text_without_speakable_content(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/api/tts", &json!({ "text": "<p></p>" }))
        .await
        .unwrap();

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(ctx.fixtures.count_jobs().await.unwrap(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_oversized_text(ctx: &TestContext) {
    let text = "a".repeat(TEST_MAX_TEXT_CHARS + 1);
    let response = ctx
        .client
        .post("/api/tts", &json!({ "text": text }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE)
        .assert_error_message("characters or less");
    assert_eq!(ctx.fixtures.count_jobs().await.unwrap(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_accept_text_at_the_limit(ctx: &TestContext) {
    let text = "word ".repeat(TEST_MAX_TEXT_CHARS / 5);
    assert_eq!(text.chars().count(), TEST_MAX_TEXT_CHARS);

    let response = ctx
        .client
        .post("/api/tts", &json!({ "text": text }))
        .await
        .unwrap();

    response.assert_status(StatusCode::CREATED);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_unknown_voice(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/api/tts", &json!({ "text": "Hello.", "voice": "nobody" }))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("not supported");
    assert_eq!(ctx.fixtures.count_jobs().await.unwrap(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_malformed_rate_and_pitch(ctx: &TestContext) {
    let response = ctx
        .client
        .post("/api/tts", &json!({ "text": "Hello.", "rate": "fast" }))
        .await
        .unwrap();
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = ctx
        .client
        .post("/api/tts", &json!({ "text": "Hello.", "pitch": "+2%" }))
        .await
        .unwrap();
    response.assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(ctx.fixtures.count_jobs().await.unwrap(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_process_job_with_ssml_preset(ctx: &TestContext) {
    let response = ctx
        .client
        .post(
            "/api/tts",
            &json!({ "text": TWO_SENTENCES, "ssml_preset": "bedtime_soft" }),
        )
        .await
        .unwrap();

    response.assert_status(StatusCode::CREATED);
    let body = response.body.as_ref().unwrap();
    assert_eq!(body["ssml_preset"], "BEDTIME_SOFT");

    let job_id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();
    let job = ctx.wait_for_terminal(job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["ssml_preset"], "BEDTIME_SOFT");
    assert_eq!(job["processed_chunks"], job["total_chunks"]);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_unknown_ssml_preset(ctx: &TestContext) {
    ctx.client
        .post("/api/tts", &json!({ "text": "Hello.", "ssml_preset": "LULLABY" }))
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("unknown ssml_preset");

    assert_eq!(ctx.fixtures.count_jobs().await.unwrap(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_invalid_json(ctx: &TestContext) {
    let response = ctx.client.post_raw("/api/tts", "{not json").await.unwrap();

    assert!(response.status.is_client_error());
    assert_eq!(ctx.fixtures.count_jobs().await.unwrap(), 0);
}

// ============================================================================
// Processing
// ============================================================================

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_complete_job_and_serve_audio(ctx: &TestContext) {
    let job_id = ctx.submit_job(json!({ "text": TWO_SENTENCES })).await;

    let job = ctx.wait_for_terminal(job_id).await;
    assert_eq!(job["status"], "completed");
    assert_eq!(job["processed_chunks"], job["total_chunks"]);
    assert_eq!(
        job["audio_url"].as_str(),
        Some(format!("/api/tts/{}/audio", job_id).as_str())
    );
    assert!(job.get("completed_at").is_some());
    assert!(job.get("error_message").is_none());

    let response = ctx
        .client
        .get(&format!("/api/tts/{}/audio", job_id))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "audio/mpeg")
        .assert_header(
            "content-disposition",
            &format!("attachment; filename=\"tts_{}.mp3\"", job_id),
        );

    let audio = &response.body_bytes;
    assert!(audio.starts_with(b"ID3"));
    assert_eq!(job["file_size_bytes"].as_u64(), Some(audio.len() as u64));
    assert_eq!(
        response.header("content-length").map(String::as_str),
        Some(audio.len().to_string().as_str())
    );

    // Chunks are assembled in text order
    let first = position(audio, "first sentence").expect("first chunk missing");
    let second = position(audio, "second sentence").expect("second chunk missing");
    assert!(first < second);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_progress_through_status_endpoint(ctx: &TestContext) {
    let job_id = ctx.submit_job(json!({ "text": TWO_SENTENCES })).await;
    ctx.wait_for_terminal(job_id).await;

    let response = ctx
        .client
        .get(&format!("/api/tts/{}/status", job_id))
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);

    let body = response.body.as_ref().unwrap();
    assert_eq!(body["task_id"], job_id.to_string());
    assert_eq!(body["status"], "completed");
    assert_eq!(body["progress"].as_f64(), Some(1.0));
    assert_eq!(
        body["result_url"].as_str(),
        Some(format!("/api/tts/{}/audio", job_id).as_str())
    );
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_report_partial_progress_while_processing(ctx: &TestContext) {
    let job_id = ctx
        .submit_job(json!({ "text": slow_text(), "voice": SLOW_VOICE }))
        .await;
    ctx.wait_for_status(job_id, "processing").await;

    let body: Value = ctx
        .client
        .get(&format!("/api/tts/{}/status", job_id))
        .await
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(body["status"], "processing");
    let progress = body["progress"].as_f64().unwrap();
    assert!((0.0..1.0).contains(&progress), "progress was {}", progress);
    assert!(body.get("result_url").is_none());

    let job = ctx.wait_for_terminal(job_id).await;
    assert_eq!(job["status"], "completed");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_job_when_provider_rejects(ctx: &TestContext) {
    let job_id = ctx
        .submit_job(json!({ "text": TWO_SENTENCES, "voice": BROKEN_VOICE }))
        .await;

    let job = ctx.wait_for_terminal(job_id).await;
    assert_eq!(job["status"], "failed");
    assert!(job.get("audio_url").is_none());

    let message = job["error_message"].as_str().unwrap();
    assert!(message.contains("chunk 1 of"), "unexpected message: {}", message);

    let status: Value = ctx
        .client
        .get(&format!("/api/tts/{}/status", job_id))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(status["message"].as_str(), Some(message));

    ctx.client
        .get(&format!("/api/tts/{}/audio", job_id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_process_concurrent_submissions(ctx: &TestContext) {
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(
            ctx.submit_job(json!({ "text": format!("Job number {} speaks.", i) }))
                .await,
        );
    }

    for id in ids {
        let job = ctx.wait_for_terminal(id).await;
        assert_eq!(job["status"], "completed");
    }
}

// ============================================================================
// Reads
// ============================================================================

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_return_404_for_unknown_job(ctx: &TestContext) {
    let id = Uuid::new_v4();

    for path in [
        format!("/api/tts/{}", id),
        format!("/api/tts/{}/status", id),
        format!("/api/tts/{}/audio", id),
    ] {
        ctx.client
            .get(&path)
            .await
            .unwrap()
            .assert_status(StatusCode::NOT_FOUND);
    }

    ctx.client
        .post_empty(&format!("/api/tts/{}/cancel", id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
    ctx.client
        .delete(&format!("/api/tts/{}", id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_malformed_job_id(ctx: &TestContext) {
    let response = ctx.client.get("/api/tts/not-a-uuid").await.unwrap();
    assert!(response.status.is_client_error());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_not_serve_audio_for_pending_job(ctx: &TestContext) {
    let job = ctx
        .fixtures
        .create_job("Waiting in line.", JobStatus::Pending)
        .await
        .unwrap();

    ctx.client
        .get(&format!("/api/tts/{}/audio", job.id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_list_jobs_newest_first(ctx: &TestContext) {
    let older = ctx
        .fixtures
        .create_job("Older job.", JobStatus::Completed)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let newer = ctx
        .fixtures
        .create_job("Newer job.", JobStatus::Failed)
        .await
        .unwrap();

    let jobs: Vec<Value> = ctx.client.get("/api/tts").await.unwrap().json().unwrap();

    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["id"], newer.id.to_string());
    assert_eq!(jobs[1]["id"], older.id.to_string());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_filter_and_page_job_list(ctx: &TestContext) {
    for i in 0..3 {
        ctx.fixtures
            .create_job(&format!("Done {}.", i), JobStatus::Completed)
            .await
            .unwrap();
    }
    ctx.fixtures
        .create_job("Broken.", JobStatus::Failed)
        .await
        .unwrap();

    let completed: Vec<Value> = ctx
        .client
        .get("/api/tts?status=completed")
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(completed.len(), 3);
    assert!(completed.iter().all(|job| job["status"] == "completed"));

    let failed: Vec<Value> = ctx
        .client
        .get("/api/tts?status=failed")
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(failed.len(), 1);

    let page: Vec<Value> = ctx
        .client
        .get("/api/tts?skip=1&limit=2")
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(page.len(), 2);

    let rest: Vec<Value> = ctx
        .client
        .get("/api/tts?skip=3&limit=2")
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(rest.len(), 1);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_unknown_status_filter(ctx: &TestContext) {
    let response = ctx.client.get("/api/tts?status=sleeping").await.unwrap();
    assert!(response.status.is_client_error());
}

// ============================================================================
// Cancellation
// ============================================================================

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_cancel_pending_job(ctx: &TestContext) {
    let job = ctx
        .fixtures
        .create_job("Never started.", JobStatus::Pending)
        .await
        .unwrap();

    let response = ctx
        .client
        .post_empty(&format!("/api/tts/{}/cancel", job.id))
        .await
        .unwrap();

    response.assert_status(StatusCode::OK);
    assert_eq!(response.body.as_ref().unwrap()["status"], "cancelled");

    let stored: Value = ctx
        .client
        .get(&format!("/api/tts/{}", job.id))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(stored["status"], "cancelled");
    assert!(stored.get("audio_url").is_none());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_cancel_processing_job_without_producing_audio(ctx: &TestContext) {
    let job_id = ctx
        .submit_job(json!({ "text": slow_text(), "voice": SLOW_VOICE }))
        .await;
    ctx.wait_for_status(job_id, "processing").await;

    ctx.client
        .post_empty(&format!("/api/tts/{}/cancel", job_id))
        .await
        .unwrap()
        .assert_status(StatusCode::OK);

    // Give the worker time to notice and stop
    tokio::time::sleep(std::time::Duration::from_millis(1_000)).await;

    let job = ctx.wait_for_terminal(job_id).await;
    assert_eq!(job["status"], "cancelled");
    assert!(job.get("audio_url").is_none());
    assert!(job.get("error_message").is_none());

    ctx.client
        .get(&format!("/api/tts/{}/audio", job_id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
    assert!(ctx
        .storage
        .read(&AudioStorage::job_audio_key(job_id))
        .await
        .is_err());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_reject_cancelling_finished_job(ctx: &TestContext) {
    for status in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
        let job = ctx
            .fixtures
            .create_job("Already done.", status)
            .await
            .unwrap();

        ctx.client
            .post_empty(&format!("/api/tts/{}/cancel", job.id))
            .await
            .unwrap()
            .assert_status(StatusCode::BAD_REQUEST)
            .assert_error_message("already");

        let stored: Value = ctx
            .client
            .get(&format!("/api/tts/{}", job.id))
            .await
            .unwrap()
            .json()
            .unwrap();
        assert_eq!(stored["status"], status.as_str());
    }
}

// ============================================================================
// Deletion
// ============================================================================

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_delete_completed_job_and_audio(ctx: &TestContext) {
    let job = ctx
        .fixtures
        .create_job("Delete me.", JobStatus::Completed)
        .await
        .unwrap();
    let output_path = job.output_path.clone().unwrap();
    assert!(ctx.storage.read(&output_path).await.is_ok());

    ctx.client
        .delete(&format!("/api/tts/{}", job.id))
        .await
        .unwrap()
        .assert_status(StatusCode::NO_CONTENT);

    ctx.client
        .get(&format!("/api/tts/{}", job.id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND);
    assert!(ctx.storage.read(&output_path).await.is_err());
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_delete_pending_job(ctx: &TestContext) {
    let job = ctx
        .fixtures
        .create_job("Pending delete.", JobStatus::Pending)
        .await
        .unwrap();

    ctx.client
        .delete(&format!("/api/tts/{}", job.id))
        .await
        .unwrap()
        .assert_status(StatusCode::NO_CONTENT);
    assert_eq!(ctx.fixtures.count_jobs().await.unwrap(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_refuse_to_delete_processing_job(ctx: &TestContext) {
    let job = ctx
        .fixtures
        .create_job("Busy right now.", JobStatus::Processing)
        .await
        .unwrap();

    ctx.client
        .delete(&format!("/api/tts/{}", job.id))
        .await
        .unwrap()
        .assert_status(StatusCode::CONFLICT)
        .assert_error_message("cancel it first");

    let stored: Value = ctx
        .client
        .get(&format!("/api/tts/{}", job.id))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(stored["status"], "processing");
}

// ============================================================================
// Request ids
// ============================================================================

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_echo_incoming_request_id(ctx: &TestContext) {
    let response = ctx
        .client
        .get_with_headers("/api/tts", &[("x-request-id", "client-supplied-id")])
        .await
        .unwrap();

    response
        .assert_status(StatusCode::OK)
        .assert_header("x-request-id", "client-supplied-id");
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_attach_request_id_to_errors(ctx: &TestContext) {
    let response = ctx
        .client
        .get(&format!("/api/tts/{}", Uuid::new_v4()))
        .await
        .unwrap();

    response
        .assert_status(StatusCode::NOT_FOUND)
        .assert_header_exists("x-request-id");
}
