// src/artifact/inspector.rs

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::debug;

use crate::errors::{FeedpipeError, Result};

/// Tag counted as one feed entry, at any depth.
const ITEM_TAG: &[u8] = b"item";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Quick stats about the artifact, as shown on the inspection surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStats {
    pub item_count: usize,
    pub last_checked: DateTime<Local>,
    pub path: PathBuf,
}

/// Reads the feed document produced by the last stage. Never writes it.
#[derive(Debug, Clone)]
pub struct OutputInspector {
    path: PathBuf,
}

impl OutputInspector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of `item` elements in the artifact.
    ///
    /// A missing or empty file counts as 0. Malformed markup is an
    /// [`FeedpipeError::ArtifactMalformed`] error.
    pub fn count_items(&self) -> Result<usize> {
        match self.read()? {
            Some(bytes) => count_items_in(&self.path, &bytes),
            None => Ok(0),
        }
    }

    /// Stats for the artifact, or `None` when the file does not exist.
    pub fn stats(&self) -> Result<Option<ArtifactStats>> {
        let Some(bytes) = self.read()? else {
            return Ok(None);
        };
        let item_count = count_items_in(&self.path, &bytes)?;
        Ok(Some(ArtifactStats {
            item_count,
            last_checked: Local::now(),
            path: self.path.clone(),
        }))
    }

    fn read(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.path, "artifact not found");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Count `item` elements in an XML document.
///
/// Whitespace-only input is an empty document and yields 0. Anything else
/// must be a single well-formed root element; mismatched or unclosed
/// elements, text outside the root, a second root or no root at all are
/// reported as malformed.
pub fn count_items_in(path: &Path, xml: &[u8]) -> Result<usize> {
    let xml = xml.strip_prefix(UTF8_BOM).unwrap_or(xml);
    if is_blank(xml) {
        return Ok(0);
    }

    let malformed = |message: String| FeedpipeError::ArtifactMalformed {
        path: path.to_path_buf(),
        message,
    };

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut depth: usize = 0;
    let mut root_seen = false;
    let mut count = 0;

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => {
                return Err(malformed(format!(
                    "{} at byte {}",
                    e,
                    reader.error_position()
                )));
            }
        };
        let at = reader.buffer_position();

        match event {
            Event::Start(ref e) | Event::Empty(ref e) => {
                if depth == 0 {
                    if root_seen {
                        return Err(malformed(format!("second root element at byte {at}")));
                    }
                    root_seen = true;
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
                if e.name().as_ref() == ITEM_TAG {
                    count += 1;
                }
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
            }
            Event::Text(ref t) if depth == 0 && !is_blank(t) => {
                return Err(malformed(format!("text outside the root element at byte {at}")));
            }
            Event::CData(_) if depth == 0 => {
                return Err(malformed(format!("CDATA outside the root element at byte {at}")));
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if depth != 0 {
        return Err(malformed(format!("{depth} element(s) left unclosed")));
    }
    if !root_seen {
        return Err(malformed("no root element".to_string()));
    }

    Ok(count)
}

fn is_blank(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(xml: &str) -> Result<usize> {
        count_items_in(Path::new("feed.xml"), xml.as_bytes())
    }

    #[test]
    fn counts_items_at_any_depth() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>UglyFeed</title>
    <item><title>a</title></item>
    <item><title>b</title></item>
    <group><item><title>nested</title></item></group>
    <item/>
  </channel>
</rss>"#;
        assert_eq!(count(xml).unwrap(), 4);
    }

    #[test]
    fn item_lookalikes_are_not_counted() {
        let xml = "<rss><channel><items/><itemized>x</itemized><title>item</title></channel></rss>";
        assert_eq!(count(xml).unwrap(), 0);
    }

    #[test]
    fn empty_document_has_no_items() {
        assert_eq!(count("").unwrap(), 0);
        assert_eq!(count(" \n\t").unwrap(), 0);
    }

    #[test]
    fn mismatched_tags_are_malformed() {
        let err = count("<rss><channel><item></channel></rss>").unwrap_err();
        assert!(matches!(err, FeedpipeError::ArtifactMalformed { .. }), "{err:?}");
    }

    #[test]
    fn unclosed_root_is_malformed() {
        let err = count("<rss><channel><item></item>").unwrap_err();
        assert!(matches!(err, FeedpipeError::ArtifactMalformed { .. }), "{err:?}");
    }

    #[test]
    fn plain_text_is_malformed() {
        let err = count("this is not xml at all").unwrap_err();
        assert!(matches!(err, FeedpipeError::ArtifactMalformed { .. }), "{err:?}");
    }

    #[test]
    fn second_root_is_malformed() {
        let err = count("<rss><item/></rss><rss><item/></rss>").unwrap_err();
        assert!(matches!(err, FeedpipeError::ArtifactMalformed { .. }), "{err:?}");
        assert!(count("<item/><item/>").is_err());
    }

    #[test]
    fn trailing_text_after_root_is_malformed() {
        let err = count("<rss><item/></rss>garbage").unwrap_err();
        assert!(matches!(err, FeedpipeError::ArtifactMalformed { .. }), "{err:?}");
        assert!(count("<rss><item/></rss><![CDATA[x]]>").is_err());
    }

    #[test]
    fn document_without_root_is_malformed() {
        let err = count(r#"<?xml version="1.0"?><!-- nothing here -->"#).unwrap_err();
        assert!(matches!(err, FeedpipeError::ArtifactMalformed { .. }), "{err:?}");
    }

    #[test]
    fn prolog_comments_and_bom_around_the_root_are_fine() {
        let xml = "\u{feff}<?xml version=\"1.0\"?>\n<!-- generated -->\n<rss><item/></rss>\n<!-- end -->\n";
        assert_eq!(count(xml).unwrap(), 1);
    }

    #[test]
    fn missing_file_counts_zero_but_has_no_stats() {
        let dir = tempfile::tempdir().unwrap();
        let inspector = OutputInspector::new(dir.path().join("uglyfeed.xml"));
        assert_eq!(inspector.count_items().unwrap(), 0);
        assert!(inspector.stats().unwrap().is_none());
    }

    #[test]
    fn empty_file_has_stats_with_zero_items() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("uglyfeed.xml");
        std::fs::write(&path, "").unwrap();

        let stats = OutputInspector::new(&path).stats().unwrap().unwrap();
        assert_eq!(stats.item_count, 0);
        assert_eq!(stats.path, path);
    }
}
