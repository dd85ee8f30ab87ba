// tests/process_pipeline.rs
//
// End-to-end with real subprocesses: `sh` stages, the on-disk artifact, the
// published copy and the file server.

#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::sync::Arc;

use tempfile::TempDir;

use feedpipe::config::FeedList;
use feedpipe::engine::{AppContext, ServerStart};
use feedpipe::exec::ProcessStageRunner;
use feedpipe::history::JobStatus;
use feedpipe_test_utils::{AppConfigBuilder, init_tracing, sh_stage, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn real_stages_produce_and_serve_the_feed() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let artifact = dir.path().join("out").join("feed.xml");

    let render = format!(
        "mkdir -p '{}' && printf '<rss><channel><item/><item/><item/></channel></rss>' > '{}'",
        dir.path().join("out").display(),
        artifact.display()
    );
    let cfg = AppConfigBuilder::new(dir.path())
        .stages(vec![
            sh_stage("fetch", "echo fetched 3 feeds"),
            sh_stage("rewrite", "echo model unavailable 1>&2; exit 4"),
            sh_stage("render", &render),
        ])
        .build();

    let ctx = AppContext::new(
        dir.path().join("config.toml"),
        cfg.clone(),
        FeedList::default(),
        Arc::new(ProcessStageRunner::new()),
    );
    ctx.ensure_workspace_dirs()?;

    let report = with_timeout(ctx.run_now()).await?;
    assert_eq!(report.record.status, JobStatus::Success);
    assert_eq!(report.record.new_items, Some(3));
    assert_eq!(report.info_log[0], "Output of fetch:\nfetched 3 feeds");
    assert_eq!(
        report.consolidated_errors(),
        "Errors or logs of rewrite:\nmodel unavailable"
    );
    assert_eq!(report.stages[1].result.as_ref().and_then(|r| r.exit_code), Some(4));

    let published = cfg.paths.static_root.join("feed.xml");
    assert_eq!(fs::read(&published)?, fs::read(&artifact)?);

    let ServerStart::Started(addr) = ctx.start_server().await? else {
        panic!("server should start");
    };
    let client = reqwest::Client::builder().pool_max_idle_per_host(0).build()?;
    let body = with_timeout(client.get(format!("http://{addr}/feed.xml")).send())
        .await?
        .text()
        .await?;
    assert_eq!(body.matches("<item/>").count(), 3);

    with_timeout(ctx.shutdown()).await;
    Ok(())
}

#[tokio::test]
async fn unlaunchable_stage_fails_the_run_but_not_the_others() -> TestResult {
    init_tracing();
    let dir = TempDir::new()?;
    let marker = dir.path().join("render-ran");

    let cfg = AppConfigBuilder::new(dir.path())
        .stages(vec![
            sh_stage("fetch", "true"),
            feedpipe::config::StageConfig {
                name: "rewrite".to_string(),
                program: dir.path().join("missing-binary").display().to_string(),
                args: vec![],
                working_dir: None,
            },
            sh_stage("render", &format!("touch '{}'", marker.display())),
        ])
        .stage_timeout_secs(30)
        .build();

    let ctx = AppContext::new(
        dir.path().join("config.toml"),
        cfg,
        FeedList::default(),
        Arc::new(ProcessStageRunner::new()),
    );

    let report = with_timeout(ctx.run_now()).await?;
    assert_eq!(report.record.status, JobStatus::Failure);
    assert!(marker.exists());
    assert!(report.consolidated_errors().contains("Stage rewrite could not be started"));
    assert_eq!(ctx.history().len(), 1);
    Ok(())
}
