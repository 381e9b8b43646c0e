//! Error types for the rebalancer.

use std::path::PathBuf;

/// All errors that can occur during a rebalance run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to read input file {path}: {source}")]
    InputRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse input JSON: {0}")]
    InputParse(#[from] serde_json::Error),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("no price available for {symbol}")]
    PriceUnavailable { symbol: String },

    #[error("quote request failed: {0}")]
    Transport(String),

    #[error("failed to write report {path}: {source}")]
    ReportWrite {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        // reqwest errors embed the request URL, which carries the API key as
        // a query parameter. Strip everything after '?' before display.
        let msg = err.to_string();
        let sanitized = match msg.find('?') {
            Some(idx) => format!("{}?<query redacted>", &msg[..idx]),
            None => msg,
        };
        Error::Transport(sanitized)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
