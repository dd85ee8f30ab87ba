pub mod builders;
pub mod fake_stages;

use std::fs;
use std::path::Path;
use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt};

pub use builders::{AppConfigBuilder, sh_stage};
pub use fake_stages::{ScriptedStages, StageScript};

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Minimal RSS document with `items` entries.
pub fn feed_xml(items: usize) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss version=\"2.0\">\n<channel>\n<title>test feed</title>\n",
    );
    for i in 0..items {
        xml.push_str(&format!(
            "<item><title>entry {i}</title><link>https://example.com/{i}</link></item>\n"
        ));
    }
    xml.push_str("</channel>\n</rss>\n");
    xml
}

/// Write a feed with `items` entries to `path`, creating parent directories.
pub fn write_feed(path: &Path, items: usize) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create artifact dir");
    }
    fs::write(path, feed_xml(items)).expect("write artifact");
}
