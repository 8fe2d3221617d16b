use crate::api::models::Track;
use crate::audio::transport::{TransportPhase, TransportState};
use crate::error::AppError;
use crate::events::PlaybackState;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerPrefs {
    pub volume: f32,
}

pub async fn play_track(state: &AppState, track: Track) -> Result<TransportPhase, AppError> {
    log::info!("[play_track] track_id={}", track.id);
    Ok(state.controller.play(track).await)
}

/// Replace the queue with `tracks` and start at `start_index`.
pub async fn play_tracks(
    state: &AppState,
    tracks: Vec<Track>,
    start_index: usize,
) -> Result<TransportPhase, AppError> {
    log::info!(
        "[play_tracks] {} tracks, start_index={}",
        tracks.len(),
        start_index
    );
    if start_index >= tracks.len() {
        return Err(AppError::NotFound(format!(
            "No track at index {}",
            start_index
        )));
    }

    state.controller.set_queue(tracks);
    state
        .controller
        .play_index(start_index)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No track at index {}", start_index)))
}

pub async fn pause(state: &AppState) -> Result<(), AppError> {
    state.controller.pause();
    Ok(())
}

pub async fn resume(state: &AppState) -> Result<(), AppError> {
    state.controller.resume();
    Ok(())
}

pub async fn stop(state: &AppState) -> Result<(), AppError> {
    state.controller.stop();
    Ok(())
}

/// `fraction` of the current track's duration. Returns whether a seek was issued.
pub async fn seek(state: &AppState, fraction: f64) -> Result<bool, AppError> {
    Ok(state.controller.seek_to(fraction))
}

pub async fn set_volume(state: &AppState, volume: f32) -> Result<f32, AppError> {
    Ok(state.controller.set_volume(volume))
}

pub async fn get_volume(state: &AppState) -> Result<f32, AppError> {
    Ok(state.controller.volume())
}

pub async fn get_playback_state(state: &AppState) -> Result<PlaybackState, AppError> {
    Ok(PlaybackState::of(&state.controller.transport()))
}

pub async fn get_transport(state: &AppState) -> Result<TransportState, AppError> {
    Ok(state.controller.transport())
}

pub async fn next_track(state: &AppState) -> Result<bool, AppError> {
    Ok(state.controller.next().await)
}

pub async fn previous_track(state: &AppState) -> Result<bool, AppError> {
    Ok(state.controller.previous().await)
}

pub async fn get_player_prefs(state: &AppState) -> Result<PlayerPrefs, AppError> {
    let config = state.config.read().await;
    Ok(PlayerPrefs {
        volume: config.volume,
    })
}

/// Persist the controller's current volume.
pub async fn save_player_prefs(state: &AppState) -> Result<(), AppError> {
    let volume = state.controller.volume();
    let mut config = state.config.write().await;
    config.volume = volume;
    config.save()?;
    Ok(())
}
