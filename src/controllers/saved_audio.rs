use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use super::tts::audio_headers;
use crate::{
    domain::saved_audio::{
        CreateSavedAudioRequest, SavedAudioListResponse, SavedAudioResponse, SavedAudioService,
        SavedAudioServiceApi,
    },
    error::AppResult,
};

pub struct SavedAudioController {
    saved_audio_service: Arc<SavedAudioService>,
}

impl SavedAudioController {
    pub fn new(saved_audio_service: Arc<SavedAudioService>) -> Self {
        Self {
            saved_audio_service,
        }
    }

    /// POST /api/saved-audios - Save a completed job's audio under a name
    pub async fn create_saved_audio(
        State(controller): State<Arc<SavedAudioController>>,
        Json(request): Json<CreateSavedAudioRequest>,
    ) -> AppResult<(StatusCode, Json<SavedAudioResponse>)> {
        let saved = controller.saved_audio_service.save(request).await?;
        Ok((StatusCode::CREATED, Json(saved)))
    }

    /// GET /api/saved-audios - List saved audios, newest first
    pub async fn list_saved_audios(
        State(controller): State<Arc<SavedAudioController>>,
    ) -> AppResult<Json<SavedAudioListResponse>> {
        let saved_audios = controller.saved_audio_service.list().await?;
        Ok(Json(SavedAudioListResponse { saved_audios }))
    }

    /// GET /api/saved-audios/{id}/audio - Download a saved audio
    pub async fn get_saved_audio_file(
        State(controller): State<Arc<SavedAudioController>>,
        Path(id): Path<Uuid>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let audio = controller.saved_audio_service.get_audio(id).await?;
        let headers = audio_headers(&format!("saved_{}.mp3", id), audio.len())?;
        Ok((StatusCode::OK, headers, Body::from(audio)))
    }

    /// DELETE /api/saved-audios/{id} - Delete a saved audio
    pub async fn delete_saved_audio(
        State(controller): State<Arc<SavedAudioController>>,
        Path(id): Path<Uuid>,
    ) -> AppResult<StatusCode> {
        controller.saved_audio_service.delete(id).await?;
        Ok(StatusCode::NO_CONTENT)
    }
}
