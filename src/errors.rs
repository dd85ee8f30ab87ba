// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedpipeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("stage '{stage}' could not be started: {source}")]
    StageSpawn {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact {path:?} is malformed: {message}")]
    ArtifactMalformed { path: PathBuf, message: String },

    #[error("port {port} is already in use")]
    PortInUse { port: u16 },

    #[error("could not bind file server to {addr}: {source}")]
    ServerBind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("a pipeline run is already in progress")]
    RunInProgress,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FeedpipeError>;
