use crate::e2e::helpers;

use aivoice_backend::domain::tts::housekeeping::INTERRUPTED_MESSAGE;
use aivoice_backend::domain::tts::{Housekeeper, HousekeepingSettings, JobStatus};
use aivoice_backend::infrastructure::repositories::PgTtsJobRepository;
use helpers::fixtures::FIXTURE_AUDIO;
use helpers::TestContext;
use hyper::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use test_context::test_context;

fn housekeeper(ctx: &TestContext) -> Housekeeper {
    Housekeeper::new(
        Arc::new(PgTtsJobRepository::new(Arc::new(ctx.pool.clone()))),
        ctx.storage.clone(),
        HousekeepingSettings {
            audio_retention: Some(Duration::from_secs(24 * 3600)),
            stale_after: Duration::from_secs(600),
            interval: Duration::from_secs(3600),
        },
    )
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_expire_audio_of_old_completed_jobs(ctx: &TestContext) {
    let old = ctx
        .fixtures
        .create_job("Yesterday's news.", JobStatus::Completed)
        .await
        .unwrap();
    let recent = ctx
        .fixtures
        .create_job("Today's news.", JobStatus::Completed)
        .await
        .unwrap();
    ctx.fixtures.backdate_job(old.id, 48).await.unwrap();

    let report = housekeeper(ctx).run_once().await.unwrap();
    assert_eq!(report.expired_audio, 1);
    assert_eq!(report.interrupted_jobs, 0);

    let job: Value = ctx
        .client
        .get(&format!("/api/tts/{}", old.id))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(job["status"], "completed");
    assert!(job.get("audio_url").is_none());
    assert!(job.get("file_size_bytes").is_none());
    assert!(job.get("audio_expired_at").is_some());

    ctx.client
        .get(&format!("/api/tts/{}/audio", old.id))
        .await
        .unwrap()
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_message("expired");
    assert!(ctx
        .storage
        .read(old.output_path.as_deref().unwrap())
        .await
        .is_err());

    let audio = ctx
        .client
        .get(&format!("/api/tts/{}/audio", recent.id))
        .await
        .unwrap();
    audio.assert_status(StatusCode::OK);
    assert_eq!(audio.body_bytes, FIXTURE_AUDIO);

    // A second pass finds nothing left to expire
    assert_eq!(housekeeper(ctx).run_once().await.unwrap().expired_audio, 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_refuse_to_save_expired_audio(ctx: &TestContext) {
    let job = ctx
        .fixtures
        .create_job("Gone already.", JobStatus::Completed)
        .await
        .unwrap();
    ctx.fixtures.backdate_job(job.id, 30).await.unwrap();
    housekeeper(ctx).run_once().await.unwrap();

    ctx.client
        .post(
            "/api/saved-audios",
            &json!({ "task_id": job.id, "name": "Too late" }),
        )
        .await
        .unwrap()
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_error_message("Task audio has expired");

    assert_eq!(ctx.fixtures.count_saved_audios().await.unwrap(), 0);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_keep_saved_copies_when_job_audio_expires(ctx: &TestContext) {
    let job = ctx
        .fixtures
        .create_job("Worth keeping.", JobStatus::Completed)
        .await
        .unwrap();
    let saved: Value = ctx
        .client
        .post("/api/saved-audios", &json!({ "task_id": job.id, "name": "Keeper" }))
        .await
        .unwrap()
        .json()
        .unwrap();

    ctx.fixtures.backdate_job(job.id, 48).await.unwrap();
    assert_eq!(housekeeper(ctx).run_once().await.unwrap().expired_audio, 1);

    let audio = ctx
        .client
        .get(saved["audio_url"].as_str().unwrap())
        .await
        .unwrap();
    audio.assert_status(StatusCode::OK);
    assert_eq!(audio.body_bytes, FIXTURE_AUDIO);
}

#[test_context(TestContext)]
#[tokio::test]
async fn it_should_fail_jobs_left_processing_by_a_dead_worker(ctx: &TestContext) {
    let stuck = ctx
        .fixtures
        .create_job("Never finished.", JobStatus::Processing)
        .await
        .unwrap();
    let active = ctx
        .fixtures
        .create_job("Still going.", JobStatus::Processing)
        .await
        .unwrap();
    ctx.fixtures.backdate_job(stuck.id, 1).await.unwrap();

    ctx.client
        .delete(&format!("/api/tts/{}", stuck.id))
        .await
        .unwrap()
        .assert_status(StatusCode::CONFLICT);

    let report = housekeeper(ctx).run_once().await.unwrap();
    assert_eq!(report.interrupted_jobs, 1);

    let job: Value = ctx
        .client
        .get(&format!("/api/tts/{}", stuck.id))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(job["status"], "failed");
    assert_eq!(job["error_message"], INTERRUPTED_MESSAGE);

    let job: Value = ctx
        .client
        .get(&format!("/api/tts/{}", active.id))
        .await
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(job["status"], "processing");

    ctx.client
        .delete(&format!("/api/tts/{}", stuck.id))
        .await
        .unwrap()
        .assert_status(StatusCode::NO_CONTENT);
}
