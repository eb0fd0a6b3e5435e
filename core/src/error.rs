use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Analytics have not been computed yet")]
    NotComputed,

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("Failed to read {table} records: {reason}")]
    SourceReadFailure { table: &'static str, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;

/// How a failure should surface at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorStatus {
    NotFound,
    ClientInput,
    RetryableServer,
    Server,
}

impl AnalyticsError {
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound { kind, name: name.into() }
    }

    pub fn source_read(table: &'static str, reason: impl ToString) -> Self {
        Self::SourceReadFailure { table, reason: reason.to_string() }
    }

    pub fn status(&self) -> ErrorStatus {
        match self {
            Self::NotComputed | Self::NotFound { .. } => ErrorStatus::NotFound,
            Self::InvalidRequest(_)                   => ErrorStatus::ClientInput,
            Self::SourceReadFailure { .. }
            | Self::Database(_)
            | Self::Io(_)                             => ErrorStatus::RetryableServer,
            Self::Serialization(_) | Self::Other(_)   => ErrorStatus::Server,
        }
    }
}
