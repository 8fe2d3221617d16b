use crate::api::client::check_response;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Maps (title, artist) to an external video identifier.
#[async_trait]
pub trait VideoResolver: Send + Sync {
    /// `Ok(None)` means the lookup succeeded but found nothing playable.
    async fn resolve(&self, title: &str, artist: &str) -> AppResult<Option<String>>;
}

/// Resolver backed by the YouTube Data API v3 search endpoint.
pub struct YoutubeResolver {
    http: reqwest::Client,
    config: Arc<RwLock<AppConfig>>,
}

impl YoutubeResolver {
    pub fn new(http: reqwest::Client, config: Arc<RwLock<AppConfig>>) -> Self {
        Self { http, config }
    }
}

#[async_trait]
impl VideoResolver for YoutubeResolver {
    async fn resolve(&self, title: &str, artist: &str) -> AppResult<Option<String>> {
        let config = self.config.read().await;
        let base = config.youtube_api_url.trim_end_matches('/').to_string();
        let key = config.youtube_api_key.clone();
        drop(config);

        if key.is_empty() {
            return Err(AppError::Config("Video API key is not configured".into()));
        }

        let query = format!("{} {}", title.trim(), artist.trim());
        let response = self
            .http
            .get(format!("{}/search", base))
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("videoCategoryId", "10"),
                ("maxResults", "1"),
                ("q", query.trim()),
                ("key", key.as_str()),
            ])
            .send()
            .await?;

        let body: serde_json::Value = check_response(response).await?.json().await?;
        let video_id = first_video_id(&body);
        log::info!("[resolve] '{}' -> {:?}", query.trim(), video_id);
        Ok(video_id)
    }
}

fn first_video_id(body: &serde_json::Value) -> Option<String> {
    body.get("items")?
        .as_array()?
        .iter()
        .filter_map(|item| item.get("id")?.get("videoId")?.as_str())
        .find(|id| !id.is_empty())
        .map(String::from)
}
