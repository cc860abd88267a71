use aivoice_backend::infrastructure::config::{
    Config, Environment, LogFormat, QueueBackend, TtsProvider,
};
use aivoice_backend::infrastructure::storage::AudioStorage;
use anyhow::Result;
use axum::Router;
use once_cell::sync::Lazy;
use serde_json::Value;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use testcontainers::{clients::Cli, Container};
use testcontainers_modules::postgres::Postgres;
use tokio::net::TcpListener;
use uuid::Uuid;

use aivoice_backend::domain::tts::WorkerPool;

pub mod stub_tts;

use api_client::TestClient;
use db_pool::{DatabasePool, PooledDatabase};
use fixtures::TestFixtures;

/// Chunk size used by the test app, small enough that short texts span several chunks
pub const TEST_CHUNK_CHARS: usize = 40;

pub const TEST_MAX_TEXT_CHARS: usize = 2_000;

// Docker client for test containers
static DOCKER: Lazy<Cli> = Lazy::new(Cli::default);

// Shared PostgreSQL container for all tests
static SHARED_CONTAINER: Lazy<SharedContainer> = Lazy::new(|| SharedContainer::new());

// Global database pool
static DB_POOL: Lazy<DatabasePool> = Lazy::new(|| DatabasePool::new(SHARED_CONTAINER.port));

/// Shared container that lives for the duration of all tests
struct SharedContainer {
    _container: Container<'static, Postgres>,
    port: u16,
}

impl SharedContainer {
    fn new() -> Self {
        let container = DOCKER.run(Postgres::default());
        let port = container.get_host_port_ipv4(5432);

        println!("🐳 Started shared PostgreSQL container on port {}", port);

        Self {
            _container: container,
            port,
        }
    }
}

pub struct TestContext {
    pub client: TestClient,
    #[allow(dead_code)]
    pub pool: PgPool,
    #[allow(dead_code)]
    pub config: Config,
    pub fixtures: TestFixtures,
    pub storage: AudioStorage,
    workers: WorkerPool,
    _storage_dir: TempDir,
    _db: PooledDatabase,
}

impl AsyncTestContext for TestContext {
    fn setup() -> impl std::future::Future<Output = Self> + Send {
        async {
            // Get a database from the shared pool
            let pooled_db = DB_POOL
                .get_database()
                .await
                .expect("Failed to get database from pool");

            let storage_dir = tempfile::tempdir().expect("Failed to create storage dir");

            // Create test configuration
            let config = Config {
                database_url: pooled_db.database_url.clone(),
                host: "127.0.0.1".to_string(),
                port: 0, // Will be assigned by the OS
                environment: Environment::Development,
                log_format: LogFormat::Pretty,
                storage_path: storage_dir.path().to_path_buf(),
                tts_provider: TtsProvider::Polly,
                aws_region: "us-east-1".to_string(),
                openai_api_key: None,
                openai_tts_model: "tts-1".to_string(),
                tts_default_voice: None,
                tts_default_rate: "+0%".to_string(),
                tts_default_pitch: "+0Hz".to_string(),
                max_text_chars: TEST_MAX_TEXT_CHARS,
                max_chars_per_chunk: TEST_CHUNK_CHARS,
                max_retries: 2,
                retry_backoff_ms: 10,
                synthesis_timeout_secs: 5,
                tts_cache_enabled: false, // Disable cache in tests to avoid test pollution
                worker_concurrency: 2,
                queue_backend: QueueBackend::Memory,
                queue_poll_interval_ms: 50,
                audio_retention_hours: 24,
                stale_job_secs: 600,
                housekeeping_interval_secs: 300,
            };

            let (app, storage, workers) = create_app_with_stub_tts(&config, pooled_db.pool.clone())
                .await
                .expect("Failed to create app");

            // Start server
            let listener = TcpListener::bind("127.0.0.1:0")
                .await
                .expect("Failed to bind listener");
            let addr = listener.local_addr().expect("Failed to get local addr");
            let base_url = format!("http://{}", addr);

            tokio::spawn(async move {
                axum::serve(listener, app).await.unwrap();
            });

            // Wait for server to be ready
            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

            // Create test client and fixtures
            let client = TestClient::new(&base_url);
            let fixtures = TestFixtures::new(pooled_db.pool.clone(), storage.clone());

            Self {
                client,
                pool: pooled_db.pool.clone(),
                config,
                fixtures,
                storage,
                workers,
                _storage_dir: storage_dir,
                _db: pooled_db,
            }
        }
    }

    fn teardown(self) -> impl std::future::Future<Output = ()> + Send {
        async {
            // Stop workers before the database goes back to the pool.
            // Database cleanup happens automatically via Drop on PooledDatabase
            self.workers.shutdown().await;
        }
    }
}

impl TestContext {
    /// Submit a job and return its id
    #[allow(dead_code)]
    pub async fn submit_job(&self, body: Value) -> Uuid {
        let response = self.client.post("/api/tts", &body).await.unwrap();
        let job: Value = response.json().unwrap();
        job["id"]
            .as_str()
            .and_then(|id| Uuid::parse_str(id).ok())
            .unwrap_or_else(|| panic!("submission returned no id: {}", job))
    }

    /// Poll a job until it reaches a terminal status, returning the job body
    #[allow(dead_code)]
    pub async fn wait_for_terminal(&self, job_id: Uuid) -> Value {
        let path = format!("/api/tts/{}", job_id);
        for _ in 0..100 {
            let job: Value = self.client.get(&path).await.unwrap().json().unwrap();
            match job["status"].as_str() {
                Some("completed") | Some("failed") | Some("cancelled") => return job,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
        panic!("job {} did not finish in time", job_id);
    }

    /// Poll a job until it reaches `status`
    #[allow(dead_code)]
    pub async fn wait_for_status(&self, job_id: Uuid, status: &str) -> Value {
        let path = format!("/api/tts/{}", job_id);
        for _ in 0..100 {
            let job: Value = self.client.get(&path).await.unwrap().json().unwrap();
            if job["status"].as_str() == Some(status) {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("job {} never reached {}", job_id, status);
    }
}

/// Wire the application the same way `main` does, with an offline synthesizer
/// and the in-process queue
async fn create_app_with_stub_tts(
    config: &Config,
    pool: PgPool,
) -> Result<(Router, AudioStorage, WorkerPool)> {
    use aivoice_backend::{
        controllers::{health::HealthState, saved_audio::SavedAudioController, tts::TtsController},
        domain::{
            saved_audio::SavedAudioService,
            tts::{Chunker, JobRunner, RetryPolicy, SubmissionSettings, TtsJobService},
        },
        infrastructure::{
            http::build_router,
            queue::{JobQueue, MemoryJobQueue},
            repositories::{PgTtsJobRepository, SavedAudioRepository, TtsJobRepository, TtsRepository},
        },
    };

    let storage = AudioStorage::new(config.storage_path.clone());
    storage.ensure_dirs().await?;

    let pool = Arc::new(pool);
    let synthesizer: Arc<dyn TtsRepository> =
        Arc::new(stub_tts::StubTtsRepository::new(config.max_chars_per_chunk));

    // Instantiate repositories and the queue
    let job_repo: Arc<dyn TtsJobRepository> = Arc::new(PgTtsJobRepository::new(pool.clone()));
    let saved_audio_repo = Arc::new(SavedAudioRepository::new(pool.clone()));
    let queue: Arc<dyn JobQueue> = Arc::new(MemoryJobQueue::new());
    queue.connect().await?;

    // Instantiate services and workers
    let chunker = Chunker::new(config.max_chars_per_chunk)?;
    let tts_service = Arc::new(TtsJobService::new(
        job_repo.clone(),
        queue.clone(),
        synthesizer.clone(),
        storage.clone(),
        chunker,
        SubmissionSettings {
            max_text_chars: config.max_text_chars,
            default_rate: config.tts_default_rate.clone(),
            default_pitch: config.tts_default_pitch.clone(),
        },
    ));
    let saved_audio_service = Arc::new(SavedAudioService::new(
        saved_audio_repo,
        job_repo.clone(),
        storage.clone(),
    ));
    let runner = Arc::new(JobRunner::new(
        job_repo,
        synthesizer.clone(),
        storage.clone(),
        chunker,
        RetryPolicy {
            max_attempts: config.max_retries,
            initial_backoff: Duration::from_millis(config.retry_backoff_ms),
            ..RetryPolicy::default()
        },
        config.synthesis_timeout(),
        config.tts_cache_enabled,
    ));
    let workers = WorkerPool::start(queue.clone(), runner, config.worker_concurrency);

    // Instantiate controllers
    let health_state = Arc::new(HealthState {
        pool,
        queue,
        synthesizer,
    });
    let tts_controller = Arc::new(TtsController::new(tts_service));
    let saved_audio_controller = Arc::new(SavedAudioController::new(saved_audio_service));

    let app = build_router(health_state, tts_controller, saved_audio_controller);
    Ok((app, storage, workers))
}
