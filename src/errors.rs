use axum::http::StatusCode;

/// Failure to read from the backing store.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("statement is not read-only: {0}")]
    NotReadOnly(String),
    #[error("database lock poisoned")]
    Poisoned,
    #[error("task join error: {0}")]
    Join(String),
}

/// Failure to turn a table into a chart.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ChartError {
    #[error("column `{0}` not found")]
    MissingColumn(String),
    #[error("column `{column}` holds non-numeric value `{value}`")]
    NonNumeric { column: String, value: String },
    #[error("no data to plot")]
    NoData,
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

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::not_found(err.to_string())
        } else {
            Self::internal(err)
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
