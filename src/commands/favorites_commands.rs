use crate::api::models::Track;
use crate::error::AppError;
use std::collections::HashSet;

use crate::AppState;

pub async fn get_favorites(state: &AppState) -> Result<Vec<Track>, AppError> {
    let user_id = state.user_id()?;
    state.collection.refresh_likes(&user_id).await
}

pub async fn get_favorite_ids(state: &AppState) -> Result<HashSet<String>, AppError> {
    Ok(state.collection.liked_ids())
}

pub async fn is_favorite(state: &AppState, track_id: String) -> Result<bool, AppError> {
    Ok(state.collection.is_liked(&track_id))
}

/// Like or unlike `track`. Returns the liked state afterwards; a failed
/// write leaves it unchanged and raises a notice.
pub async fn toggle_favorite(state: &AppState, track: Track, add: bool) -> Result<bool, AppError> {
    let user_id = state.user_id()?;
    if add {
        Ok(state.collection.like(&user_id, &track).await)
    } else {
        let removed = state.collection.unlike(&user_id, &track.id).await;
        Ok(!removed && state.collection.is_liked(&track.id))
    }
}
