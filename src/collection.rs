use crate::api::models::{Playlist, Track};
use crate::api::store::PersistenceStore;
use crate::error::{AppError, AppResult};
use crate::events::NoticePayload;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// The signed-in user's library: liked tracks and playlists.
///
/// Local state only changes after the store confirms a write. Failures are
/// reported on the notice channel and leave local state as it was.
pub struct Collection {
    store: Arc<dyn PersistenceStore>,
    liked: Mutex<HashSet<String>>,
    notices: broadcast::Sender<NoticePayload>,
}

impl Collection {
    pub fn new(store: Arc<dyn PersistenceStore>, notices: broadcast::Sender<NoticePayload>) -> Self {
        Self {
            store,
            liked: Mutex::new(HashSet::new()),
            notices,
        }
    }

    fn liked(&self) -> MutexGuard<'_, HashSet<String>> {
        self.liked.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn notify(&self, context: &str, err: &AppError) {
        log::warn!("[collection] {}: {}", context, err);
        let _ = self.notices.send(NoticePayload::from_error(context, err));
    }

    fn reported<T>(&self, context: &str, result: AppResult<T>) -> AppResult<T> {
        if let Err(e) = &result {
            self.notify(context, e);
        }
        result
    }

    /// Local liked indicator.
    pub fn is_liked(&self, track_id: &str) -> bool {
        self.liked().contains(track_id)
    }

    pub fn liked_ids(&self) -> HashSet<String> {
        self.liked().clone()
    }

    /// Reload the liked set from the store.
    pub async fn refresh_likes(&self, user_id: &str) -> AppResult<Vec<Track>> {
        let tracks = self.reported(
            "Couldn't load liked songs",
            self.store.liked_tracks(user_id).await,
        )?;
        *self.liked() = tracks.iter().map(|t| t.id.clone()).collect();
        log::info!("[collection] {} liked tracks", tracks.len());
        Ok(tracks)
    }

    /// Forget everything, e.g. after sign-out.
    pub fn clear(&self) {
        self.liked().clear();
    }

    /// Like `track`. Returns whether the track is now liked; false when the
    /// store rejected the write.
    pub async fn like(&self, user_id: &str, track: &Track) -> bool {
        let stored = match self.store.is_liked(user_id, &track.id).await {
            Ok(true) => Ok(()),
            Ok(false) => self.store.add_like(user_id, track).await,
            Err(e) => Err(e),
        };
        match stored {
            Ok(()) => {
                self.liked().insert(track.id.clone());
                true
            }
            Err(e) => {
                self.notify("Couldn't like song", &e);
                false
            }
        }
    }

    /// Returns whether the like was removed.
    pub async fn unlike(&self, user_id: &str, track_id: &str) -> bool {
        match self.store.remove_like(user_id, track_id).await {
            Ok(()) => {
                self.liked().remove(track_id);
                true
            }
            Err(e) => {
                self.notify("Couldn't remove like", &e);
                false
            }
        }
    }

    /// Returns the liked state after the toggle.
    pub async fn toggle_like(&self, user_id: &str, track: &Track) -> bool {
        if self.is_liked(&track.id) {
            !self.unlike(user_id, &track.id).await
        } else {
            self.like(user_id, track).await
        }
    }

    pub async fn playlists(&self, user_id: &str) -> AppResult<Vec<Playlist>> {
        self.reported(
            "Couldn't load playlists",
            self.store.list_playlists(user_id).await,
        )
    }

    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Playlist> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Config("Playlist name cannot be empty".into()));
        }
        self.reported(
            "Couldn't create playlist",
            self.store.create_playlist(user_id, name, description).await,
        )
    }

    pub async fn delete_playlist(&self, user_id: &str, playlist_id: &str) -> AppResult<()> {
        self.reported(
            "Couldn't delete playlist",
            self.store.delete_playlist(user_id, playlist_id).await,
        )
    }

    pub async fn playlist_tracks(&self, playlist_id: &str) -> AppResult<Vec<Track>> {
        self.reported(
            "Couldn't load playlist",
            self.store.playlist_tracks(playlist_id).await,
        )
    }

    /// Returns false when the track was already in the playlist.
    pub async fn add_to_playlist(&self, playlist_id: &str, track: &Track) -> AppResult<bool> {
        let result = self.add_if_absent(playlist_id, track).await;
        self.reported("Couldn't add to playlist", result)
    }

    async fn add_if_absent(&self, playlist_id: &str, track: &Track) -> AppResult<bool> {
        let existing = self.store.playlist_tracks(playlist_id).await?;
        if existing.iter().any(|t| t.id == track.id) {
            log::debug!("[collection] {} already in playlist {}", track.id, playlist_id);
            return Ok(false);
        }
        self.store.add_to_playlist(playlist_id, track).await?;
        Ok(true)
    }

    pub async fn remove_from_playlist(&self, playlist_id: &str, track_id: &str) -> AppResult<()> {
        self.reported(
            "Couldn't remove from playlist",
            self.store.remove_from_playlist(playlist_id, track_id).await,
        )
    }
}
