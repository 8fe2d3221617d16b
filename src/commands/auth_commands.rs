use crate::api::models::{AuthStatus, AuthUser};
use crate::error::AppError;

use crate::AppState;

fn status(user: Option<AuthUser>) -> AuthStatus {
    match user {
        Some(user) => AuthStatus {
            authenticated: true,
            user_id: Some(user.id),
            email: user.email,
        },
        None => AuthStatus {
            authenticated: false,
            user_id: None,
            email: None,
        },
    }
}

pub async fn check_auth_status(state: &AppState) -> Result<AuthStatus, AppError> {
    Ok(status(state.auth.current_user()))
}

pub async fn sign_in(
    state: &AppState,
    email: String,
    password: String,
) -> Result<AuthStatus, AppError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Config("Email and password are required".into()));
    }
    let user = state.auth.sign_in(email, &password).await?;
    log::info!("[sign_in] user_id={}", user.id);
    Ok(status(Some(user)))
}

pub async fn sign_up(
    state: &AppState,
    email: String,
    password: String,
) -> Result<AuthStatus, AppError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Config("Email and password are required".into()));
    }
    let user = state.auth.sign_up(email, &password).await?;
    log::info!("[sign_up] user_id={}", user.id);
    // Providers that require email confirmation return a user without a session.
    Ok(status(state.auth.current_user()))
}

pub async fn sign_out(state: &AppState) -> Result<AuthStatus, AppError> {
    state.auth.sign_out().await?;
    log::info!("[sign_out]");
    Ok(status(None))
}

pub async fn restore_session(state: &AppState) -> Result<AuthStatus, AppError> {
    let user = state.auth.restore_session().await?;
    Ok(status(user))
}
