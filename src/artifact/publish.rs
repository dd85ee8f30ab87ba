// src/artifact/publish.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::errors::Result;

/// Copy the artifact into `static_root` so the file server can serve it.
///
/// The copy is written to a temporary sibling and renamed into place, so a
/// reader of the published file sees either the previous version or the new
/// one, never a partial write.
///
/// Returns `None` if there is no artifact. A copy published by an earlier
/// call is then removed, so the server answers 404 instead of a stale feed.
pub fn publish_artifact(artifact: &Path, static_root: &Path) -> Result<Option<PathBuf>> {
    let Some(file_name) = artifact.file_name() else {
        return Ok(None);
    };
    if !artifact.is_file() {
        let stale = static_root.join(file_name);
        match fs::remove_file(&stale) {
            Ok(()) => info!(published = ?stale, "artifact is gone; withdrew published copy"),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(artifact = ?artifact, "nothing to publish")
            }
            Err(e) => return Err(e.into()),
        }
        return Ok(None);
    }

    fs::create_dir_all(static_root)?;
    let destination = static_root.join(file_name);
    let staging = static_root.join(format!(".{}.tmp", file_name.to_string_lossy()));

    fs::copy(artifact, &staging)?;
    fs::rename(&staging, &destination)?;

    info!(from = ?artifact, to = ?destination, "artifact published");
    Ok(Some(destination))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publishes_copy_and_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("uglyfeeds").join("uglyfeed.xml");
        fs::create_dir_all(artifact.parent().unwrap()).unwrap();
        fs::write(&artifact, "<rss><item/></rss>").unwrap();

        let root = dir.path().join("static");
        let published = publish_artifact(&artifact, &root).unwrap().unwrap();

        assert_eq!(published, root.join("uglyfeed.xml"));
        assert_eq!(fs::read_to_string(&published).unwrap(), "<rss><item/></rss>");
        let entries: Vec<_> = fs::read_dir(&root).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn missing_artifact_is_not_published() {
        let dir = tempfile::tempdir().unwrap();
        let res = publish_artifact(&dir.path().join("uglyfeed.xml"), &dir.path().join("static")).unwrap();
        assert!(res.is_none());
        assert!(!dir.path().join("static").exists());
    }

    #[test]
    fn vanished_artifact_withdraws_the_published_copy() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("uglyfeed.xml");
        let root = dir.path().join("static");
        fs::write(&artifact, "<rss/>").unwrap();
        let published = publish_artifact(&artifact, &root).unwrap().unwrap();

        fs::remove_file(&artifact).unwrap();
        assert!(publish_artifact(&artifact, &root).unwrap().is_none());
        assert!(!published.exists());
        assert!(root.is_dir());
    }
}
