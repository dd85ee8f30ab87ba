// src/artifact/mod.rs

//! The pipeline's output artifact (the regenerated feed document).
//!
//! - [`inspector`] parses the artifact and reports item counts / stats.
//! - [`publish`] copies it into the file server's static root.

pub mod inspector;
pub mod publish;

pub use inspector::{ArtifactStats, OutputInspector, count_items_in};
pub use publish::publish_artifact;
