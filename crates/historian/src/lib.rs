mod backend;
pub use backend::{should_record, LokiBackend};

mod client;
pub use client::{HttpLokiClient, LokiClient, Stream, StreamEntry};

mod config;
pub use config::LokiConfig;

mod entry;
pub use entry::{LogEntry, ValuesBlob, SCHEMA_VERSION};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid Loki endpoint '{0}'")]
    InvalidEndpoint(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("Loki responded with {status}: {body:?}")]
    BadResponse {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("push was cancelled before it completed")]
    Cancelled,
}

pub type Result<Ok> = std::result::Result<Ok, Error>;
