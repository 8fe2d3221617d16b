use crate::api::client::RestClient;
use crate::api::models::{Playlist, Track, TrackRecord};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Remote persistence for playlists and liked tracks, keyed by an opaque user id.
///
/// Inserts are not idempotent on the store side; callers check membership
/// before adding.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn list_playlists(&self, user_id: &str) -> AppResult<Vec<Playlist>>;
    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Playlist>;
    async fn delete_playlist(&self, user_id: &str, playlist_id: &str) -> AppResult<()>;
    async fn playlist_tracks(&self, playlist_id: &str) -> AppResult<Vec<Track>>;
    async fn add_to_playlist(&self, playlist_id: &str, track: &Track) -> AppResult<()>;
    async fn remove_from_playlist(&self, playlist_id: &str, track_id: &str) -> AppResult<()>;

    async fn liked_tracks(&self, user_id: &str) -> AppResult<Vec<Track>>;
    async fn add_like(&self, user_id: &str, track: &Track) -> AppResult<()>;
    async fn remove_like(&self, user_id: &str, track_id: &str) -> AppResult<()>;
    async fn is_liked(&self, user_id: &str, track_id: &str) -> AppResult<bool>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PlaylistTrackRow {
    playlist_id: String,
    #[serde(flatten)]
    track: TrackRecord,
}

#[derive(Debug, Serialize, Deserialize)]
struct LikedTrackRow {
    user_id: String,
    #[serde(flatten)]
    track: TrackRecord,
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

pub struct SupabaseStore {
    client: RestClient,
}

impl SupabaseStore {
    pub fn new(client: RestClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PersistenceStore for SupabaseStore {
    async fn list_playlists(&self, user_id: &str) -> AppResult<Vec<Playlist>> {
        let user = eq(user_id);
        let response = self
            .client
            .get_with_query(
                "/playlists",
                &[
                    ("select", "*"),
                    ("user_id", user.as_str()),
                    ("order", "created_at.desc"),
                ],
            )
            .await?;
        let playlists: Vec<Playlist> = response.json().await?;
        Ok(playlists)
    }

    async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: Option<&str>,
    ) -> AppResult<Playlist> {
        let body = serde_json::json!({
            "id": uuid::Uuid::new_v4().to_string(),
            "user_id": user_id,
            "name": name,
            "description": description,
        });

        let response = self.client.post("/playlists", &body).await?;
        let mut created: Vec<Playlist> = response.json().await?;
        created
            .pop()
            .ok_or_else(|| AppError::Config("Failed to parse created playlist".into()))
    }

    async fn delete_playlist(&self, user_id: &str, playlist_id: &str) -> AppResult<()> {
        let playlist = eq(playlist_id);
        self.client
            .delete_with_query("/playlist_tracks", &[("playlist_id", playlist.as_str())])
            .await?;

        let user = eq(user_id);
        self.client
            .delete_with_query(
                "/playlists",
                &[("id", playlist.as_str()), ("user_id", user.as_str())],
            )
            .await?;
        Ok(())
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> AppResult<Vec<Track>> {
        let playlist = eq(playlist_id);
        let response = self
            .client
            .get_with_query(
                "/playlist_tracks",
                &[
                    ("select", "*"),
                    ("playlist_id", playlist.as_str()),
                    ("order", "added_at.asc"),
                ],
            )
            .await?;
        let rows: Vec<PlaylistTrackRow> = response.json().await?;
        Ok(rows.into_iter().map(|row| Track::from(row.track)).collect())
    }

    async fn add_to_playlist(&self, playlist_id: &str, track: &Track) -> AppResult<()> {
        let row = PlaylistTrackRow {
            playlist_id: playlist_id.to_string(),
            track: TrackRecord::from(track),
        };
        self.client
            .post("/playlist_tracks", &serde_json::to_value(&row)?)
            .await?;
        Ok(())
    }

    async fn remove_from_playlist(&self, playlist_id: &str, track_id: &str) -> AppResult<()> {
        let playlist = eq(playlist_id);
        let track = eq(track_id);
        self.client
            .delete_with_query(
                "/playlist_tracks",
                &[("playlist_id", playlist.as_str()), ("track_id", track.as_str())],
            )
            .await?;
        Ok(())
    }

    async fn liked_tracks(&self, user_id: &str) -> AppResult<Vec<Track>> {
        let user = eq(user_id);
        let response = self
            .client
            .get_with_query(
                "/liked_tracks",
                &[
                    ("select", "*"),
                    ("user_id", user.as_str()),
                    ("order", "created_at.desc"),
                ],
            )
            .await?;
        let rows: Vec<LikedTrackRow> = response.json().await?;
        Ok(rows.into_iter().map(|row| Track::from(row.track)).collect())
    }

    async fn add_like(&self, user_id: &str, track: &Track) -> AppResult<()> {
        let row = LikedTrackRow {
            user_id: user_id.to_string(),
            track: TrackRecord::from(track),
        };
        self.client
            .post("/liked_tracks", &serde_json::to_value(&row)?)
            .await?;
        Ok(())
    }

    async fn remove_like(&self, user_id: &str, track_id: &str) -> AppResult<()> {
        let user = eq(user_id);
        let track = eq(track_id);
        self.client
            .delete_with_query(
                "/liked_tracks",
                &[("user_id", user.as_str()), ("track_id", track.as_str())],
            )
            .await?;
        Ok(())
    }

    async fn is_liked(&self, user_id: &str, track_id: &str) -> AppResult<bool> {
        let user = eq(user_id);
        let track = eq(track_id);
        let response = self
            .client
            .get_with_query(
                "/liked_tracks",
                &[
                    ("select", "track_id"),
                    ("user_id", user.as_str()),
                    ("track_id", track.as_str()),
                    ("limit", "1"),
                ],
            )
            .await?;
        let rows: Vec<serde_json::Value> = response.json().await?;
        Ok(!rows.is_empty())
    }
}
