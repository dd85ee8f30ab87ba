// src/config/mod.rs

//! Configuration loading, validation and persistence.
//!
//! Responsibilities:
//! - Define the TOML-backed data model with its defaults (`model.rs`).
//! - Load and save the config document (`loader.rs`).
//! - Validate basic invariants like the stage count (`validate.rs`).
//! - Load and save the plain-text feed list (`feeds.rs`).

pub mod feeds;
pub mod loader;
pub mod model;
pub mod validate;

pub use feeds::FeedList;
pub use loader::{default_config_path, load_and_validate, load_from_path, save_to_path};
pub use model::{
    ApiConfig, AppConfig, Folders, PathsSection, PipelineSection, ServerSection,
    SimilarityOptions, StageConfig,
};
pub use validate::{PIPELINE_STAGE_COUNT, validate_config};
