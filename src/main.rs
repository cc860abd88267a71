use aivoice_backend::controllers::{
    health::HealthState, saved_audio::SavedAudioController, tts::TtsController,
};
use aivoice_backend::domain::saved_audio::SavedAudioService;
use aivoice_backend::domain::tts::{
    Chunker, Housekeeper, HousekeepingSettings, JobRunner, RetryPolicy, SubmissionSettings,
    TtsJobService, TtsJobServiceApi, WorkerPool,
};
use aivoice_backend::infrastructure::config::{Config, LogFormat, QueueBackend, TtsProvider};
use aivoice_backend::infrastructure::db::{check_connection, create_pool, run_migrations};
use aivoice_backend::infrastructure::http::{build_router, start_http_server};
use aivoice_backend::infrastructure::queue::{JobQueue, MemoryJobQueue, PgJobQueue};
use aivoice_backend::infrastructure::repositories::{
    OpenAiTtsRepository, PgTtsJobRepository, PollyTtsRepository, SavedAudioRepository,
    TtsJobRepository, TtsRepository,
};
use aivoice_backend::infrastructure::storage::AudioStorage;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        "Starting AI Voice Backend on {}:{}",
        config.host,
        config.port
    );

    // Create database connection pool
    let pool = create_pool(&config.database_url).await?;
    tracing::info!("Database connection pool created");

    // Verify database connection
    check_connection(&pool).await?;
    tracing::info!("Database connection verified");

    run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    let storage = AudioStorage::new(config.storage_path.clone());
    storage.ensure_dirs().await?;

    let pool = Arc::new(pool);
    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Instantiate the TTS provider
    let synthesizer = create_synthesizer(&config).await;
    tracing::info!(
        provider = synthesizer.provider_name(),
        default_voice = synthesizer.default_voice(),
        "TTS provider initialized"
    );

    // 2. Instantiate repositories and the job queue (inject db pool)
    tracing::info!("Instantiating repositories...");
    let job_repo: Arc<dyn TtsJobRepository> = Arc::new(PgTtsJobRepository::new(pool.clone()));
    let saved_audio_repo = Arc::new(SavedAudioRepository::new(pool.clone()));

    let queue: Arc<dyn JobQueue> = match config.queue_backend {
        QueueBackend::Postgres => Arc::new(PgJobQueue::new(
            pool.clone(),
            config.queue_poll_interval(),
        )),
        QueueBackend::Memory => Arc::new(MemoryJobQueue::new()),
    };
    queue.connect().await?;

    // 3. Instantiate services and the job runner
    tracing::info!("Instantiating services...");
    let max_chunk_chars = config
        .max_chars_per_chunk
        .min(synthesizer.max_chunk_chars());
    if max_chunk_chars < config.max_chars_per_chunk {
        tracing::warn!(
            configured = config.max_chars_per_chunk,
            provider_limit = synthesizer.max_chunk_chars(),
            "Chunk size exceeds provider limit, clamping"
        );
    }
    let chunker = Chunker::new(max_chunk_chars)?;

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
        job_repo.clone(),
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

    // 4. Start workers and pick up jobs left over from a previous run
    let workers = if config.worker_concurrency > 0 {
        Some(WorkerPool::start(
            queue.clone(),
            runner,
            config.worker_concurrency,
        ))
    } else {
        tracing::warn!("WORKER_CONCURRENCY is 0, jobs will only be queued");
        None
    };

    // Fail jobs a previous run left processing, then requeue the pending ones
    let housekeeper = Arc::new(Housekeeper::new(
        job_repo.clone(),
        storage.clone(),
        HousekeepingSettings {
            audio_retention: config.audio_retention(),
            stale_after: config.stale_job_after(),
            interval: config.housekeeping_interval(),
        },
    ));
    let report = housekeeper.run_once().await?;
    tracing::info!(
        interrupted_jobs = report.interrupted_jobs,
        expired_audio = report.expired_audio,
        "Startup housekeeping finished"
    );

    let recovered = tts_service.recover_pending().await?;
    tracing::info!(count = recovered, "Pending job recovery finished");

    let housekeeping = housekeeper.start();

    // 5. Instantiate controllers (inject services)
    tracing::info!("Instantiating controllers...");
    let health_state = Arc::new(HealthState {
        pool: pool.clone(),
        queue: queue.clone(),
        synthesizer: synthesizer.clone(),
    });
    let tts_controller = Arc::new(TtsController::new(tts_service));
    let saved_audio_controller = Arc::new(SavedAudioController::new(saved_audio_service));

    let app = build_router(health_state, tts_controller, saved_audio_controller);

    // Start HTTP server with all routes
    start_http_server(config, app, shutdown_signal()).await?;

    housekeeping.shutdown().await;

    match workers {
        Some(workers) => workers.shutdown().await,
        None => queue.close().await,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn create_synthesizer(config: &Config) -> Arc<dyn TtsRepository> {
    match config.tts_provider {
        TtsProvider::Polly => {
            tracing::info!("Initializing AWS Polly client with region: {}", config.aws_region);

            // Check for AWS credentials in environment (for debugging)
            let has_access_key = std::env::var("AWS_ACCESS_KEY_ID").is_ok();
            let has_secret_key = std::env::var("AWS_SECRET_ACCESS_KEY").is_ok();
            if !has_access_key || !has_secret_key {
                tracing::warn!("AWS credentials not found in environment variables. Will attempt to use other credential providers (instance metadata, etc.)");
            }

            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(config.aws_region.clone()))
                .load()
                .await;

            let polly_client = Arc::new(aws_sdk_polly::Client::new(&aws_config));
            Arc::new(PollyTtsRepository::new(
                polly_client,
                config.tts_default_voice.clone(),
            ))
        }
        TtsProvider::OpenAi => {
            let mut openai_config = async_openai::config::OpenAIConfig::new();
            if let Some(api_key) = &config.openai_api_key {
                openai_config = openai_config.with_api_key(api_key);
            }
            let client = Arc::new(async_openai::Client::with_config(openai_config));
            Arc::new(OpenAiTtsRepository::new(
                client,
                config.openai_tts_model.clone(),
                config.tts_default_voice.clone(),
            ))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    tracing::info!("Shutdown signal received");
}

fn init_logging(config: &Config) {
    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "aivoice_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "aivoice_backend=debug,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
