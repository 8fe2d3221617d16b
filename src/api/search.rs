use crate::api::client::check_response;
use crate::api::models::{PlayableSource, Track};
use crate::config::AppConfig;
use crate::error::AppResult;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Free-text catalog lookup. Results carry no playable handle guarantee.
#[async_trait]
pub trait CatalogSearch: Send + Sync {
    async fn search(&self, query: &str, limit: u32) -> AppResult<Vec<Track>>;
}

/// Catalog backed by the iTunes Search API.
pub struct ItunesCatalog {
    http: reqwest::Client,
    config: Arc<RwLock<AppConfig>>,
}

impl ItunesCatalog {
    pub fn new(http: reqwest::Client, config: Arc<RwLock<AppConfig>>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl CatalogSearch for ItunesCatalog {
    async fn search(&self, query: &str, limit: u32) -> AppResult<Vec<Track>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let config = self.config.read().await;
        let base = config.catalog_url.trim_end_matches('/').to_string();
        let country = config.country_code.clone();
        drop(config);

        let limit = limit.clamp(1, 200).to_string();
        let response = self
            .http
            .get(format!("{}/search", base))
            .query(&[
                ("term", query),
                ("media", "music"),
                ("entity", "song"),
                ("limit", limit.as_str()),
                ("country", country.as_str()),
            ])
            .send()
            .await?;

        let body: serde_json::Value = check_response(response).await?.json().await?;
        let tracks = parse_search_results(&body);
        log::info!("[search] '{}' -> {} tracks", query, tracks.len());
        Ok(tracks)
    }
}

pub fn parse_search_results(body: &serde_json::Value) -> Vec<Track> {
    body.get("results")
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(parse_track).collect())
        .unwrap_or_default()
}

pub fn parse_track(item: &serde_json::Value) -> Option<Track> {
    // Non-song hits (music videos, podcasts) share the endpoint.
    if let Some(kind) = item.get("kind").and_then(|v| v.as_str()) {
        if kind != "song" {
            return None;
        }
    }

    let id = match item.get("trackId") {
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(serde_json::Value::String(s)) => s.clone(),
        _ => return None,
    };
    let title = item.get("trackName")?.as_str()?.to_string();
    let artist = item
        .get("artistName")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown Artist")
        .to_string();

    let duration = item
        .get("trackTimeMillis")
        .and_then(|v| v.as_f64())
        .map(|ms| ms / 1000.0)
        .unwrap_or(0.0);

    let artwork_url = item
        .get("artworkUrl100")
        .or_else(|| item.get("artworkUrl60"))
        .and_then(|v| v.as_str())
        .map(String::from);

    let preview = item
        .get("previewUrl")
        .and_then(|v| v.as_str())
        .map(String::from);

    let mut track = Track::new(id, title, artist)
        .with_duration_hint(duration)
        .with_source(PlayableSource::from_parts(None, preview));
    track.artwork_url = artwork_url;
    Some(track)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_songs_and_skips_other_kinds() {
        let body = serde_json::json!({
            "resultCount": 3,
            "results": [
                {
                    "kind": "song",
                    "trackId": 1440857781,
                    "trackName": "Harvest Moon",
                    "artistName": "Neil Young",
                    "trackTimeMillis": 303000,
                    "artworkUrl100": "https://is1.mzstatic.com/a/100x100bb.jpg",
                    "previewUrl": "https://audio-ssl.itunes.apple.com/p.m4a"
                },
                { "kind": "music-video", "trackId": 2, "trackName": "Clip" },
                { "kind": "song", "trackId": 3, "trackName": "No Preview", "artistName": "X" }
            ]
        });

        let tracks = parse_search_results(&body);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, "1440857781");
        assert_eq!(tracks[0].duration_hint, 303.0);
        assert_eq!(
            tracks[0].source.stream_url(),
            Some("https://audio-ssl.itunes.apple.com/p.m4a")
        );
        assert!(tracks[1].source.is_unresolved());
    }

    #[test]
    fn missing_results_yield_empty_list() {
        assert!(parse_search_results(&serde_json::json!({})).is_empty());
    }
}
