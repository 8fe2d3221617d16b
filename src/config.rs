use crate::error::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_anon_key: String,
    #[serde(default)]
    pub youtube_api_key: String,
    #[serde(default = "default_youtube_api_url")]
    pub youtube_api_url: String,
    #[serde(default = "default_catalog_url")]
    pub catalog_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default = "default_country_code")]
    pub country_code: String,
    #[serde(default = "default_volume")]
    pub volume: f32,
    /// File this config was loaded from; `save` writes back to it.
    #[serde(skip)]
    pub location: Option<PathBuf>,
}

fn default_youtube_api_url() -> String {
    "https://www.googleapis.com/youtube/v3".to_string()
}

fn default_catalog_url() -> String {
    "https://itunes.apple.com".to_string()
}

fn default_country_code() -> String {
    "US".to_string()
}

fn default_volume() -> f32 {
    1.0
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            youtube_api_key: String::new(),
            youtube_api_url: default_youtube_api_url(),
            catalog_url: default_catalog_url(),
            access_token: None,
            refresh_token: None,
            expires_at: None,
            user_id: None,
            email: None,
            country_code: default_country_code(),
            volume: default_volume(),
            location: None,
        }
    }
}

impl AppConfig {
    pub fn config_dir() -> AppResult<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("Cannot find home directory".into()))?;
        Ok(home.join(".pocketplay"))
    }

    pub fn config_path() -> AppResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn queue_path() -> AppResult<PathBuf> {
        Ok(Self::config_dir()?.join("queue.json"))
    }

    /// Queue snapshot path, kept next to whichever config file is in use.
    pub fn queue_file(&self) -> AppResult<PathBuf> {
        match self.location.as_deref().and_then(Path::parent) {
            Some(dir) => Ok(dir.join("queue.json")),
            None => Self::queue_path(),
        }
    }

    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> AppResult<()> {
        match &self.location {
            Some(path) => self.save_to(path),
            None => self.save_to(&Self::config_path()?),
        }
    }

    /// Pin this config to a file other than the default location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Config(format!(
                "Config file not found at {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&content)?;
        config.volume = sanitize_volume(config.volume);
        config.location = Some(path.to_path_buf());
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Loads the config, writing defaults to disk when none exists yet.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            log::warn!("Failed to load config: {}. Using defaults.", e);
            let default_config = AppConfig::default();
            if let Err(save_err) = default_config.save() {
                log::error!("Failed to save default config: {}", save_err);
            }
            default_config
        })
    }

    fn validate(&self) -> AppResult<()> {
        for (name, value) in [
            ("supabase_url", &self.supabase_url),
            ("youtube_api_url", &self.youtube_api_url),
            ("catalog_url", &self.catalog_url),
        ] {
            if value.is_empty() {
                continue;
            }
            url::Url::parse(value)
                .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e)))?;
        }
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some() && self.user_id.is_some()
    }

    pub fn is_token_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => Utc::now() >= expires,
            None => true,
        }
    }

    pub fn clear_session(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
        self.expires_at = None;
        self.user_id = None;
        self.email = None;
    }
}

pub(crate) fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_finite() {
        volume.clamp(0.0, 1.0)
    } else {
        default_volume()
    }
}
