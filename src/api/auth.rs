use crate::api::client::check_response;
use crate::api::models::{AuthUser, TokenResponse, UserResponse};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};

const AUTH_PREFIX: &str = "/auth/v1";

/// Session-based identity provider.
///
/// Changes to the signed-in user are published on a watch channel so the
/// rest of the app can mirror them without polling.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    fn current_user(&self) -> Option<AuthUser>;
    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>>;
    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthUser>;
    async fn sign_up(&self, email: &str, password: &str) -> AppResult<AuthUser>;
    async fn sign_out(&self) -> AppResult<()>;
    /// Re-validate the stored session against the provider.
    async fn restore_session(&self) -> AppResult<Option<AuthUser>>;
}

fn auth_url(base: &str, path: &str) -> AppResult<String> {
    if base.is_empty() {
        return Err(AppError::Config("Auth URL is not configured".into()));
    }
    Ok(format!("{}{}{}", base.trim_end_matches('/'), AUTH_PREFIX, path))
}

/// Exchange a refresh token for a new session.
pub async fn refresh_session(
    http: &reqwest::Client,
    base_url: &str,
    anon_key: &str,
    refresh_token: &str,
) -> AppResult<TokenResponse> {
    let url = auth_url(base_url, "/token")?;
    let response = http
        .post(&url)
        .query(&[("grant_type", "refresh_token")])
        .header("apikey", anon_key)
        .json(&serde_json::json!({ "refresh_token": refresh_token }))
        .send()
        .await?;

    if !response.status().is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Api {
            status: 401,
            message: format!("Token refresh failed: {}", body),
        });
    }

    let token: TokenResponse = response.json().await?;
    Ok(token)
}

pub struct SupabaseAuth {
    http: reqwest::Client,
    config: Arc<RwLock<AppConfig>>,
    user_tx: watch::Sender<Option<AuthUser>>,
}

impl SupabaseAuth {
    pub fn new(http: reqwest::Client, config: Arc<RwLock<AppConfig>>) -> Self {
        let (user_tx, _) = watch::channel(None);
        Self {
            http,
            config,
            user_tx,
        }
    }

    async fn endpoint(&self, path: &str) -> AppResult<(String, String)> {
        let config = self.config.read().await;
        let url = auth_url(&config.supabase_url, path)?;
        Ok((url, config.supabase_anon_key.clone()))
    }

    async fn store_session(&self, token: TokenResponse) -> AppResult<AuthUser> {
        let user: AuthUser = token
            .user
            .map(AuthUser::from)
            .ok_or_else(|| AppError::Api {
                status: 500,
                message: "Session response carried no user".into(),
            })?;

        let mut config = self.config.write().await;
        config.access_token = Some(token.access_token);
        config.refresh_token = token.refresh_token;
        config.expires_at =
            Some(chrono::Utc::now() + chrono::Duration::seconds(token.expires_in as i64));
        config.user_id = Some(user.id.clone());
        config.email = user.email.clone();
        if let Err(e) = config.save() {
            log::error!("Failed to save session: {}", e);
        }
        drop(config);

        self.publish(Some(user.clone()));
        Ok(user)
    }

    async fn forget_session(&self) {
        let mut config = self.config.write().await;
        config.clear_session();
        if let Err(e) = config.save() {
            log::error!("Failed to save cleared session: {}", e);
        }
        drop(config);
        self.publish(None);
    }

    fn publish(&self, user: Option<AuthUser>) {
        self.user_tx.send_if_modified(|current| {
            if *current == user {
                false
            } else {
                *current = user;
                true
            }
        });
    }

    async fn fetch_user(&self, access_token: &str) -> AppResult<AuthUser> {
        let (url, anon_key) = self.endpoint("/user").await?;
        let response = self
            .http
            .get(&url)
            .header("apikey", anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;
        let user: UserResponse = check_response(response).await?.json().await?;
        Ok(user.into())
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    fn current_user(&self) -> Option<AuthUser> {
        self.user_tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<AuthUser>> {
        self.user_tx.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> AppResult<AuthUser> {
        let (url, anon_key) = self.endpoint("/token").await?;
        let response = self
            .http
            .post(&url)
            .query(&[("grant_type", "password")])
            .header("apikey", anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        // Bad credentials come back as 400 from the password grant.
        if response.status() == reqwest::StatusCode::BAD_REQUEST {
            let body = response.text().await.unwrap_or_default();
            log::warn!("[sign_in] rejected: {}", body);
            return Err(AppError::AuthRequired);
        }

        let token: TokenResponse = check_response(response).await?.json().await?;
        let user = self.store_session(token).await?;
        log::info!("[sign_in] signed in as {}", user.id);
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> AppResult<AuthUser> {
        let (url, anon_key) = self.endpoint("/signup").await?;
        let response = self
            .http
            .post(&url)
            .header("apikey", anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: serde_json::Value = check_response(response).await?.json().await?;

        // With email confirmation enabled the provider returns a bare user and no session.
        if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)?;
            return self.store_session(token).await;
        }
        let user: UserResponse = serde_json::from_value(body)?;
        log::info!("[sign_up] account {} created, awaiting confirmation", user.id);
        Ok(user.into())
    }

    async fn sign_out(&self) -> AppResult<()> {
        let token = self.config.read().await.access_token.clone();
        if let Some(token) = token {
            let (url, anon_key) = self.endpoint("/logout").await?;
            let result = self
                .http
                .post(&url)
                .header("apikey", anon_key)
                .bearer_auth(token)
                .send()
                .await;
            // The local session is dropped even when the provider is unreachable.
            match result {
                Ok(response) => {
                    if let Err(e) = check_response(response).await {
                        log::warn!("[sign_out] provider rejected logout: {}", e);
                    }
                }
                Err(e) => log::warn!("[sign_out] logout request failed: {}", e),
            }
        }
        self.forget_session().await;
        Ok(())
    }

    async fn restore_session(&self) -> AppResult<Option<AuthUser>> {
        let config = self.config.read().await;
        let access_token = config.access_token.clone();
        let refresh_token = config.refresh_token.clone();
        let expired = config.is_token_expired();
        let base_url = config.supabase_url.clone();
        let anon_key = config.supabase_anon_key.clone();
        drop(config);

        let Some(access_token) = access_token else {
            return Ok(None);
        };

        if expired {
            let Some(rt) = refresh_token else {
                self.forget_session().await;
                return Ok(None);
            };
            return match refresh_session(&self.http, &base_url, &anon_key, &rt).await {
                Ok(token) => {
                    let mut token = token;
                    if token.user.is_none() {
                        token.user = Some(UserResponse {
                            id: self.fetch_user(&token.access_token).await?.id,
                            email: None,
                        });
                    }
                    self.store_session(token).await.map(Some)
                }
                Err(e) => {
                    log::warn!("Session refresh failed: {}. User will need to sign in.", e);
                    self.forget_session().await;
                    Ok(None)
                }
            };
        }

        match self.fetch_user(&access_token).await {
            Ok(user) => {
                self.publish(Some(user.clone()));
                Ok(Some(user))
            }
            Err(AppError::AuthRequired) => {
                self.forget_session().await;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
