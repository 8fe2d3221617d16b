use serde::{Deserialize, Serialize};

/// How a track can actually be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum PlayableSource {
    DirectUrl(String),
    ExternalVideo(String),
    Unresolved,
}

impl PlayableSource {
    /// Build a source from the optional fields a catalog or store row carries.
    /// A video id wins over a direct URL, mirroring backend selection order.
    pub fn from_parts(video_id: Option<String>, stream_url: Option<String>) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        match (non_empty(video_id), non_empty(stream_url)) {
            (Some(id), _) => PlayableSource::ExternalVideo(id),
            (None, Some(url)) => PlayableSource::DirectUrl(url),
            (None, None) => PlayableSource::Unresolved,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, PlayableSource::Unresolved)
    }

    pub fn video_id(&self) -> Option<&str> {
        match self {
            PlayableSource::ExternalVideo(id) => Some(id),
            _ => None,
        }
    }

    pub fn stream_url(&self) -> Option<&str> {
        match self {
            PlayableSource::DirectUrl(url) => Some(url),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub artwork_url: Option<String>,
    /// Catalog duration in seconds; the backend's reported duration is authoritative.
    pub duration_hint: f64,
    pub source: PlayableSource,
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.into(),
            artwork_url: None,
            duration_hint: 0.0,
            source: PlayableSource::Unresolved,
        }
    }

    pub fn with_source(mut self, source: PlayableSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_artwork(mut self, url: impl Into<String>) -> Self {
        self.artwork_url = Some(url.into());
        self
    }

    pub fn with_duration_hint(mut self, seconds: f64) -> Self {
        self.duration_hint = seconds.max(0.0);
        self
    }

    pub fn with_video_id(&self, video_id: impl Into<String>) -> Self {
        self.clone()
            .with_source(PlayableSource::ExternalVideo(video_id.into()))
    }

    pub fn artwork_url_sized(&self, width: u32, height: u32) -> Option<String> {
        self.artwork_url
            .as_ref()
            .map(|url| resolve_artwork_url(url, width, height))
    }
}

/// Flat row shape used by the persistence store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackRecord {
    pub track_id: String,
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub stream_url: Option<String>,
}

impl From<&Track> for TrackRecord {
    fn from(track: &Track) -> Self {
        Self {
            track_id: track.id.clone(),
            title: track.title.clone(),
            artist: track.artist.clone(),
            artwork_url: track.artwork_url.clone(),
            duration: Some(track.duration_hint),
            video_id: track.source.video_id().map(String::from),
            stream_url: track.source.stream_url().map(String::from),
        }
    }
}

impl From<TrackRecord> for Track {
    fn from(record: TrackRecord) -> Self {
        Track {
            id: record.track_id,
            title: record.title,
            artist: record.artist,
            artwork_url: record.artwork_url,
            duration_hint: record.duration.unwrap_or(0.0).max(0.0),
            source: PlayableSource::from_parts(record.video_id, record.stream_url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    #[serde(alias = "user_id")]
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, alias = "created_at")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: Option<String>,
}

// Auth types
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: u64,
    pub token_type: String,
    pub user: Option<UserResponse>,
}

#[derive(Debug, Deserialize)]
pub struct UserResponse {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<UserResponse> for AuthUser {
    fn from(user: UserResponse) -> Self {
        AuthUser {
            id: user.id,
            email: user.email,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub email: Option<String>,
}

/// Catalog artwork URLs embed their size (`.../100x100bb.jpg`); swap in the requested one.
pub fn resolve_artwork_url(url: &str, width: u32, height: u32) -> String {
    if url.contains("{width}") || url.contains("{height}") {
        return url
            .replace("{width}", &width.to_string())
            .replace("{height}", &height.to_string());
    }
    url.replace("100x100", &format!("{}x{}", width, height))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_id_wins_over_stream_url() {
        let source = PlayableSource::from_parts(
            Some("dQw4w9WgXcQ".into()),
            Some("https://cdn.example/a.m4a".into()),
        );
        assert_eq!(source, PlayableSource::ExternalVideo("dQw4w9WgXcQ".into()));
    }

    #[test]
    fn blank_fields_are_unresolved() {
        let source = PlayableSource::from_parts(Some("  ".into()), Some(String::new()));
        assert!(source.is_unresolved());
        assert_eq!(
            PlayableSource::from_parts(None, Some("https://x/y.mp3".into())).stream_url(),
            Some("https://x/y.mp3")
        );
    }

    #[test]
    fn record_conversion_keeps_identity_and_source() {
        let track = Track::new("t1", "Song", "Band")
            .with_artwork("https://img/100x100bb.jpg")
            .with_duration_hint(201.5)
            .with_source(PlayableSource::DirectUrl("https://cdn/t1.m4a".into()));
        let record = TrackRecord::from(&track);
        assert_eq!(record.video_id, None);
        let back = Track::from(record);
        assert_eq!(back, track);
    }

    #[test]
    fn with_video_id_leaves_original_untouched() {
        let track = Track::new("t1", "Song", "Band");
        let resolved = track.with_video_id("abc");
        assert!(track.source.is_unresolved());
        assert_eq!(resolved.source.video_id(), Some("abc"));
        assert_eq!(resolved.id, track.id);
    }

    #[test]
    fn artwork_is_resized() {
        assert_eq!(
            resolve_artwork_url("https://img/a/100x100bb.jpg", 600, 600),
            "https://img/a/600x600bb.jpg"
        );
        assert_eq!(
            resolve_artwork_url("https://img/{width}x{height}.jpg", 480, 480),
            "https://img/480x480.jpg"
        );
    }

    #[test]
    fn playlist_reads_store_rows() {
        let row = serde_json::json!({
            "id": "p1",
            "user_id": "u1",
            "name": "Road trip",
            "description": null,
            "created_at": "2024-05-01T10:00:00Z"
        });
        let playlist: Playlist = serde_json::from_value(row).unwrap();
        assert_eq!(playlist.user_id, "u1");
        assert!(playlist.created_at.is_some());
    }

    #[test]
    fn track_serializes_tagged_source() {
        let track = Track::new("t1", "Song", "Band")
            .with_source(PlayableSource::ExternalVideo("vid".into()));
        let value = serde_json::to_value(&track).unwrap();
        assert_eq!(value["source"]["kind"], "externalVideo");
        assert_eq!(value["source"]["value"], "vid");
        assert_eq!(value["durationHint"], 0.0);
    }
}
