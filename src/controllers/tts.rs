use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::tts::{
        CreateTtsJobRequest, ListTtsJobsQuery, TaskStatusResponse, TtsJobResponse, TtsJobService,
        TtsJobServiceApi,
    },
    error::{AppError, AppResult},
};

pub struct TtsController {
    tts_service: Arc<TtsJobService>,
}

impl TtsController {
    pub fn new(tts_service: Arc<TtsJobService>) -> Self {
        Self { tts_service }
    }

    /// POST /api/tts - Submit a text-to-speech job
    pub async fn create_job(
        State(controller): State<Arc<TtsController>>,
        Json(request): Json<CreateTtsJobRequest>,
    ) -> AppResult<(StatusCode, Json<TtsJobResponse>)> {
        let job = controller.tts_service.submit(request).await?;
        Ok((StatusCode::CREATED, Json(job)))
    }

    /// GET /api/tts - List jobs, newest first
    pub async fn list_jobs(
        State(controller): State<Arc<TtsController>>,
        Query(query): Query<ListTtsJobsQuery>,
    ) -> AppResult<Json<Vec<TtsJobResponse>>> {
        let jobs = controller.tts_service.list_jobs(query).await?;
        Ok(Json(jobs))
    }

    /// GET /api/tts/{id} - Get a job
    pub async fn get_job(
        State(controller): State<Arc<TtsController>>,
        Path(job_id): Path<Uuid>,
    ) -> AppResult<Json<TtsJobResponse>> {
        let job = controller.tts_service.get_job(job_id).await?;
        Ok(Json(job))
    }

    /// GET /api/tts/{id}/status - Poll job progress
    pub async fn get_status(
        State(controller): State<Arc<TtsController>>,
        Path(job_id): Path<Uuid>,
    ) -> AppResult<Json<TaskStatusResponse>> {
        let status = controller.tts_service.get_status(job_id).await?;
        Ok(Json(status))
    }

    /// GET /api/tts/{id}/audio - Download the assembled audio
    pub async fn get_audio(
        State(controller): State<Arc<TtsController>>,
        Path(job_id): Path<Uuid>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let audio = controller.tts_service.get_audio(job_id).await?;
        let headers = audio_headers(&format!("tts_{}.mp3", job_id), audio.len())?;
        Ok((StatusCode::OK, headers, Body::from(audio)))
    }

    /// POST /api/tts/{id}/cancel - Cancel a pending or processing job
    pub async fn cancel_job(
        State(controller): State<Arc<TtsController>>,
        Path(job_id): Path<Uuid>,
    ) -> AppResult<Json<TtsJobResponse>> {
        let job = controller.tts_service.cancel(job_id).await?;
        Ok(Json(job))
    }

    /// DELETE /api/tts/{id} - Delete a job and its audio
    pub async fn delete_job(
        State(controller): State<Arc<TtsController>>,
        Path(job_id): Path<Uuid>,
    ) -> AppResult<StatusCode> {
        controller.tts_service.delete(job_id).await?;
        Ok(StatusCode::NO_CONTENT)
    }
}

/// Headers for an MP3 download
pub fn audio_headers(filename: &str, size: usize) -> AppResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("audio/mpeg"));
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
        .map_err(|e| AppError::Internal(format!("invalid download filename: {}", e)))?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    Ok(headers)
}
