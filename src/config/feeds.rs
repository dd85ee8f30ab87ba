// src/config/feeds.rs

//! The feed list: a plain-text file with one feed URL per line, stored
//! separately from the structured config document.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::errors::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedList {
    urls: Vec<String>,
}

impl FeedList {
    /// Parse feed text. Lines are trimmed and blank lines dropped.
    pub fn parse(text: &str) -> Self {
        let urls = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { urls }
    }

    /// Load the list from disk; a missing file is an empty list.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = ?path, "feeds file not found; starting with an empty list");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_text())?;
        Ok(())
    }

    pub fn to_text(&self) -> String {
        let mut text = self.urls.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        text
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
