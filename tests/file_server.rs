// tests/file_server.rs

use std::error::Error;
use std::fs;
use std::net::TcpListener as StdTcpListener;
use std::time::Duration;

use reqwest::header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES, PRAGMA};
use tempfile::TempDir;

use feedpipe::errors::FeedpipeError;
use feedpipe::server::{NO_CACHE, ServerSettings, start_file_server};
use feedpipe_test_utils::{feed_xml, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn settings(dir: &TempDir, port: u16) -> ServerSettings {
    ServerSettings {
        bind_address: "127.0.0.1".to_string(),
        port,
        static_root: dir.path().to_path_buf(),
        artifact_extension: "xml".to_string(),
    }
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .build()
        .unwrap()
}

fn assert_no_cache_headers(resp: &reqwest::Response) {
    let headers = resp.headers();
    assert_eq!(headers[CONTENT_TYPE], "application/xml");
    assert_eq!(headers[CACHE_CONTROL], NO_CACHE);
    assert_eq!(headers[PRAGMA], "no-cache");
    assert_eq!(headers[EXPIRES], "0");
}

#[tokio::test]
async fn artifact_is_served_with_xml_type_and_no_cache_headers() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    fs::write(dir.path().join("uglyfeed.xml"), feed_xml(3))?;

    let server = start_file_server(&settings(&dir, 0)).await?;
    let url = format!("http://{}/uglyfeed.xml", server.local_addr());

    let resp = with_timeout(client().get(&url).send()).await?;
    assert_eq!(resp.status(), 200);
    assert_no_cache_headers(&resp);
    assert_eq!(resp.text().await?, feed_xml(3));

    server.shutdown(Duration::from_secs(1)).await;
    Ok(())
}

#[tokio::test]
async fn missing_artifact_is_404_with_the_same_headers() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;

    let server = start_file_server(&settings(&dir, 0)).await?;
    let url = format!("http://{}/uglyfeed.xml", server.local_addr());

    let resp = with_timeout(client().get(&url).send()).await?;
    assert_eq!(resp.status(), 404);
    assert_no_cache_headers(&resp);

    server.shutdown(Duration::from_secs(1)).await;
    Ok(())
}

#[tokio::test]
async fn other_files_are_served_statically() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    fs::write(dir.path().join("readme.txt"), "hello")?;

    let server = start_file_server(&settings(&dir, 0)).await?;
    let base = format!("http://{}", server.local_addr());

    let resp = with_timeout(client().get(format!("{base}/readme.txt")).send()).await?;
    assert_eq!(resp.status(), 200);
    assert!(resp.headers().get(PRAGMA).is_none());
    assert_eq!(resp.text().await?, "hello");

    let resp = with_timeout(client().get(format!("{base}/nope.txt")).send()).await?;
    assert_eq!(resp.status(), 404);

    server.shutdown(Duration::from_secs(1)).await;
    Ok(())
}

#[tokio::test]
async fn occupied_port_is_reported() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let blocker = StdTcpListener::bind("127.0.0.1:0")?;
    let port = blocker.local_addr()?.port();

    match start_file_server(&settings(&dir, port)).await {
        Err(FeedpipeError::PortInUse { port: reported }) => assert_eq!(reported, port),
        Err(other) => panic!("expected PortInUse, got {other:?}"),
        Ok(_) => panic!("second listener bound to an occupied port"),
    }
    Ok(())
}

#[tokio::test]
async fn hard_stop_releases_the_port() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    fs::write(dir.path().join("uglyfeed.xml"), feed_xml(1))?;

    let first = start_file_server(&settings(&dir, 0)).await?;
    let port = first.local_addr().port();
    let url = format!("http://{}/uglyfeed.xml", first.local_addr());
    assert_eq!(with_timeout(client().get(&url).send()).await?.status(), 200);

    with_timeout(first.shutdown(Duration::from_secs(1))).await;
    assert!(with_timeout(client().get(&url).send()).await.is_err());

    let second = start_file_server(&settings(&dir, port)).await?;
    assert_eq!(second.local_addr().port(), port);
    assert_eq!(with_timeout(client().get(&url).send()).await?.status(), 200);

    second.shutdown(Duration::from_secs(1)).await;
    Ok(())
}
