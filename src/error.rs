//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("invalid primary key: entity {entity} column {column}")]
    InvalidPrimaryKey { entity: String, column: String },
    #[error("invalid foreign key: {entity}.{relation} column {column} not found on {side}")]
    InvalidForeignKey {
        entity: String,
        relation: String,
        column: String,
        side: String,
    },
    #[error("duplicate entity: {0}")]
    DuplicateEntity(String),
    #[error("duplicate relation: {entity}.{relation}")]
    DuplicateRelation { entity: String, relation: String },
    #[error("invalid condition on {owner}: {message}")]
    InvalidCondition { owner: String, message: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("unknown relation '{relation}' on {entity}")]
    UnknownRelation { entity: String, relation: String },
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            AppError::UnknownRelation { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "unknown_relation"),
            AppError::UnknownEntity(_) => (StatusCode::INTERNAL_SERVER_ERROR, "unknown_entity"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable"),
            AppError::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code, "request failed");
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
