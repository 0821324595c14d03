use axum::http::StatusCode;
use thiserror::Error;

/// Failures raised by a persistence gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("store rejected request with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("store returned malformed row: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("store file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store returned no row for {0}")]
    MissingRow(&'static str),
    #[error("{table}.{column} refers to missing row {value}")]
    MissingReference {
        table: &'static str,
        column: &'static str,
        value: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a habit name")]
    EmptyName,
}

/// Everything a board transition can fail with.
#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: message.into(),
        }
    }
}

impl From<BoardError> for AppError {
    fn from(err: BoardError) -> Self {
        match err {
            BoardError::Validation(err) => Self::bad_request(err.to_string()),
            BoardError::Store(err) => Self::bad_gateway(err.to_string()),
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
