use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type NewsbreakResult<T> = Result<T, KnownErrors>;

#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum KnownErrors {
    #[error("username \"{username}\" is already taken")]
    UsernameTaken { username: String },

    #[error("email is already registered")]
    EmailInUse,

    #[error("invalid email or password")]
    InvalidCredential,

    #[error("not logged in")]
    NotAuthenticated,

    #[error("backend unavailable: {context}")]
    BackendUnavailable { context: String },

    #[error("profile update failed: {context}")]
    ProfileUpdateFailed { context: String },

    #[error("registry and profile disagree for account {account}")]
    InconsistentState { account: String },

    #[error("invalid input")]
    InvalidInput,

    #[error("invalid id")]
    InvalidId,

    #[error("the backlog is empty")]
    EmptyBacklog,

    #[error("internal error: {context}")]
    InternalError { context: String },
}

impl KnownErrors {
    fn status(&self) -> StatusCode {
        match self {
            KnownErrors::UsernameTaken { .. } | KnownErrors::EmailInUse => StatusCode::CONFLICT,
            KnownErrors::InvalidCredential | KnownErrors::NotAuthenticated => {
                StatusCode::UNAUTHORIZED
            }
            KnownErrors::InvalidInput | KnownErrors::InvalidId | KnownErrors::EmptyBacklog => {
                StatusCode::BAD_REQUEST
            }
            KnownErrors::BackendUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            KnownErrors::ProfileUpdateFailed { .. }
            | KnownErrors::InconsistentState { .. }
            | KnownErrors::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for KnownErrors {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for KnownErrors {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                KnownErrors::BackendUnavailable {
                    context: e.to_string(),
                }
            }
            _ => KnownErrors::InternalError {
                context: e.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for KnownErrors {
    fn from(e: serde_json::Error) -> Self {
        KnownErrors::InternalError {
            context: e.to_string(),
        }
    }
}

impl From<tokio::task::JoinError> for KnownErrors {
    fn from(e: tokio::task::JoinError) -> Self {
        KnownErrors::InternalError {
            context: e.to_string(),
        }
    }
}

impl From<bcrypt::BcryptError> for KnownErrors {
    fn from(e: bcrypt::BcryptError) -> Self {
        KnownErrors::InternalError {
            context: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for KnownErrors {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            KnownErrors::BackendUnavailable {
                context: e.to_string(),
            }
        } else {
            KnownErrors::InternalError {
                context: e.to_string(),
            }
        }
    }
}
