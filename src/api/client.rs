use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use std::sync::Arc;
use tokio::sync::RwLock;

const REST_PREFIX: &str = "/rest/v1";
const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP client for the hosted document store (PostgREST dialect).
pub struct RestClient {
    http: reqwest::Client,
    config: Arc<RwLock<AppConfig>>,
}

impl RestClient {
    pub fn new(config: Arc<RwLock<AppConfig>>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pocketplay/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    async fn url(&self, path: &str) -> AppResult<String> {
        let config = self.config.read().await;
        if config.supabase_url.is_empty() {
            return Err(AppError::Config("Store URL is not configured".into()));
        }
        Ok(format!(
            "{}{}{}",
            config.supabase_url.trim_end_matches('/'),
            REST_PREFIX,
            path
        ))
    }

    async fn auth_headers(&self) -> AppResult<HeaderMap> {
        let config = self.config.read().await;
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        headers.insert(
            "apikey",
            HeaderValue::from_str(&config.supabase_anon_key)
                .map_err(|e| AppError::Config(e.to_string()))?,
        );

        // Row-level security keys off the user's token; fall back to the anon key.
        let bearer = config
            .access_token
            .as_deref()
            .unwrap_or(&config.supabase_anon_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", bearer))
                .map_err(|e| AppError::Config(e.to_string()))?,
        );

        Ok(headers)
    }

    /// Send a request built from fresh auth headers. A 401 triggers one token
    /// refresh and a single retry.
    async fn send(
        &self,
        build: impl Fn(HeaderMap) -> reqwest::RequestBuilder,
    ) -> AppResult<reqwest::Response> {
        let response = build(self.auth_headers().await?).send().await?;
        if response.status() != reqwest::StatusCode::UNAUTHORIZED {
            return check_response(response).await;
        }

        self.refresh_token().await?;
        let response = build(self.auth_headers().await?).send().await?;
        check_response(response).await
    }

    pub async fn get_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<reqwest::Response> {
        let url = self.url(path).await?;
        self.send(|headers| self.http.get(&url).headers(headers).query(query))
            .await
    }

    /// Insert rows; the store echoes the inserted representation back.
    pub async fn post(&self, path: &str, body: &serde_json::Value) -> AppResult<reqwest::Response> {
        let url = self.url(path).await?;
        self.send(|mut headers| {
            headers.insert("Prefer", HeaderValue::from_static("return=representation"));
            self.http.post(&url).headers(headers).json(body)
        })
        .await
    }

    pub async fn delete_with_query(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<reqwest::Response> {
        let url = self.url(path).await?;
        self.send(|headers| self.http.delete(&url).headers(headers).query(query))
            .await
    }

    async fn refresh_token(&self) -> AppResult<()> {
        let mut config = self.config.write().await;

        let refresh_token = config
            .refresh_token
            .as_ref()
            .ok_or(AppError::AuthRequired)?
            .clone();

        let token = crate::api::auth::refresh_session(
            &self.http,
            &config.supabase_url,
            &config.supabase_anon_key,
            &refresh_token,
        )
        .await
        .map_err(|e| {
            log::warn!("Store token refresh failed: {}", e);
            AppError::TokenExpired
        })?;

        config.access_token = Some(token.access_token);
        if let Some(rt) = token.refresh_token {
            config.refresh_token = Some(rt);
        }
        config.expires_at =
            Some(chrono::Utc::now() + chrono::Duration::seconds(token.expires_in as i64));
        if let Err(e) = config.save() {
            log::error!("Failed to save refreshed token: {}", e);
        }

        Ok(())
    }
}

/// Map a non-success status onto the error taxonomy.
pub(crate) async fn check_response(response: reqwest::Response) -> AppResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else if status == reqwest::StatusCode::UNAUTHORIZED {
        Err(AppError::AuthRequired)
    } else if status == reqwest::StatusCode::FORBIDDEN {
        let message = response.text().await.unwrap_or_default();
        Err(AppError::PermissionDenied(message))
    } else if status == reqwest::StatusCode::NOT_FOUND {
        Err(AppError::NotFound("Resource not found".into()))
    } else {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".into());
        Err(AppError::Api {
            status: status.as_u16(),
            message,
        })
    }
}
