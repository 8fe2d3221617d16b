use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Token expired")]
    TokenExpired,

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a failed external call, so callers can tell
/// "not found" from "try again later" from "not allowed".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    NotFound,
    Transient,
    PermissionDenied,
    Unauthenticated,
    Invalid,
}

impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("AppError", 3)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("failure", &self.failure_kind())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl AppError {
    fn kind(&self) -> &str {
        match self {
            AppError::Http(_) => "http",
            AppError::Json(_) => "json",
            AppError::Audio(_) => "audio",
            AppError::Decode(_) => "decode",
            AppError::AuthRequired => "auth_required",
            AppError::TokenExpired => "token_expired",
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::Api { .. } => "api",
            AppError::Config(_) => "config",
            AppError::NotFound(_) => "not_found",
            AppError::Io(_) => "io",
        }
    }

    pub fn failure_kind(&self) -> FailureKind {
        match self {
            AppError::NotFound(_) => FailureKind::NotFound,
            AppError::PermissionDenied(_) => FailureKind::PermissionDenied,
            AppError::AuthRequired | AppError::TokenExpired => FailureKind::Unauthenticated,
            AppError::Api { status, .. } => match *status {
                401 => FailureKind::Unauthenticated,
                403 => FailureKind::PermissionDenied,
                404 => FailureKind::NotFound,
                408 | 429 => FailureKind::Transient,
                s if s >= 500 => FailureKind::Transient,
                _ => FailureKind::Invalid,
            },
            AppError::Http(e) if e.is_decode() => FailureKind::Invalid,
            AppError::Http(_) | AppError::Io(_) | AppError::Audio(_) => FailureKind::Transient,
            AppError::Json(_) | AppError::Decode(_) | AppError::Config(_) => FailureKind::Invalid,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.failure_kind() == FailureKind::Transient
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_status_maps_to_failure_kind() {
        let kind = |status| {
            AppError::Api {
                status,
                message: String::new(),
            }
            .failure_kind()
        };
        assert_eq!(kind(401), FailureKind::Unauthenticated);
        assert_eq!(kind(403), FailureKind::PermissionDenied);
        assert_eq!(kind(404), FailureKind::NotFound);
        assert_eq!(kind(429), FailureKind::Transient);
        assert_eq!(kind(503), FailureKind::Transient);
        assert_eq!(kind(422), FailureKind::Invalid);
    }

    #[test]
    fn serializes_kind_and_message() {
        let err = AppError::NotFound("playlist p1".into());
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(value["kind"], "not_found");
        assert_eq!(value["failure"], "not_found");
        assert_eq!(value["message"], "Not found: playlist p1");
    }

    #[test]
    fn auth_errors_are_unauthenticated() {
        assert_eq!(
            AppError::TokenExpired.failure_kind(),
            FailureKind::Unauthenticated
        );
        assert!(!AppError::AuthRequired.is_transient());
        assert!(AppError::Audio("device lost".into()).is_transient());
    }
}
