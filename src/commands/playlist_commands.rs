use crate::api::models::{Playlist, Track};
use crate::error::AppError;

use crate::AppState;

pub async fn get_playlists(state: &AppState) -> Result<Vec<Playlist>, AppError> {
    let user_id = state.user_id()?;
    state.collection.playlists(&user_id).await
}

pub async fn get_playlist_tracks(
    state: &AppState,
    playlist_id: String,
) -> Result<Vec<Track>, AppError> {
    state.collection.playlist_tracks(&playlist_id).await
}

pub async fn create_playlist(
    state: &AppState,
    name: String,
    description: Option<String>,
) -> Result<Playlist, AppError> {
    let user_id = state.user_id()?;
    state
        .collection
        .create_playlist(&user_id, &name, description.as_deref())
        .await
}

/// Returns false when the track was already in the playlist.
pub async fn add_to_playlist(
    state: &AppState,
    playlist_id: String,
    track: Track,
) -> Result<bool, AppError> {
    state.collection.add_to_playlist(&playlist_id, &track).await
}

pub async fn remove_from_playlist(
    state: &AppState,
    playlist_id: String,
    track_id: String,
) -> Result<(), AppError> {
    state
        .collection
        .remove_from_playlist(&playlist_id, &track_id)
        .await
}

pub async fn delete_playlist(state: &AppState, playlist_id: String) -> Result<(), AppError> {
    let user_id = state.user_id()?;
    state.collection.delete_playlist(&user_id, &playlist_id).await
}
