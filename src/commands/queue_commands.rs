use crate::api::models::Track;
use crate::audio::queue::{PersistedQueueState, QueueState};
use crate::audio::transport::TransportPhase;
use crate::error::AppError;

use crate::AppState;

pub async fn get_queue(state: &AppState) -> Result<QueueState, AppError> {
    Ok(state.controller.queue())
}

pub async fn add_to_queue(state: &AppState, track: Track) -> Result<(), AppError> {
    state.controller.enqueue(track);
    Ok(())
}

pub async fn remove_from_queue(state: &AppState, index: usize) -> Result<(), AppError> {
    state
        .controller
        .remove_from_queue(index)
        .map(|_| ())
        .ok_or_else(|| AppError::NotFound(format!("No queue entry at index {}", index)))
}

pub async fn reorder_queue(state: &AppState, from: usize, to: usize) -> Result<(), AppError> {
    state.controller.move_in_queue(from, to);
    Ok(())
}

pub async fn clear_queue(state: &AppState) -> Result<(), AppError> {
    state.controller.clear_queue();
    Ok(())
}

pub async fn play_queue_track(state: &AppState, index: usize) -> Result<TransportPhase, AppError> {
    state
        .controller
        .play_index(index)
        .await
        .ok_or_else(|| AppError::NotFound("Track index out of bounds".into()))
}

/// Write the queue next to the config file.
pub async fn save_queue_state(state: &AppState) -> Result<(), AppError> {
    let persisted = state.controller.persisted_queue();
    let path = state.config.read().await.queue_file()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let content = serde_json::to_string_pretty(&persisted)?;
    std::fs::write(&path, content)?;
    log::info!("[save_queue_state] {} tracks", persisted.tracks.len());
    Ok(())
}

pub async fn load_saved_queue(state: &AppState) -> Result<QueueState, AppError> {
    let path = state.config.read().await.queue_file()?;
    if !path.exists() {
        return Ok(state.controller.queue());
    }

    let content = std::fs::read_to_string(&path)?;
    let persisted: PersistedQueueState = serde_json::from_str(&content)?;
    state.controller.restore_queue(persisted);
    Ok(state.controller.queue())
}
