#![allow(dead_code)]

use std::path::Path;

use feedpipe::config::{AppConfig, StageConfig, validate_config};
use feedpipe::types::{ScheduleUnit, StopMode};

/// Builder for `AppConfig` rooted in a temp directory.
///
/// Paths default to `<root>/input/feeds.txt`, `<root>/out/feed.xml` and
/// `<root>/static`; the server binds `127.0.0.1` on an ephemeral port.
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    pub fn new(root: &Path) -> Self {
        let mut config = AppConfig::default();
        config.paths.feeds = root.join("input").join("feeds.txt");
        config.paths.artifact = root.join("out").join("feed.xml");
        config.paths.static_root = root.join("static");
        config.folders.output_folder = root.join("output");
        config.folders.rewritten_folder = root.join("rewritten");
        config.server.bind_address = "127.0.0.1".to_string();
        config.server.port = 0;
        config.server.shutdown_grace_secs = 1;
        Self { config }
    }

    pub fn stages(mut self, stages: Vec<StageConfig>) -> Self {
        self.config.pipeline.stages = stages;
        self
    }

    pub fn stage_timeout_secs(mut self, secs: u64) -> Self {
        self.config.pipeline.stage_timeout_secs = secs;
        self
    }

    pub fn allow_overlap(mut self, val: bool) -> Self {
        self.config.pipeline.allow_overlap = val;
        self
    }

    pub fn schedule(mut self, enabled: bool, interval: u32, unit: ScheduleUnit) -> Self {
        self.config.scheduling_enabled = enabled;
        self.config.scheduling_interval = interval;
        self.config.scheduling_period = unit;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.server.port = port;
        self
    }

    pub fn stop_mode(mut self, mode: StopMode) -> Self {
        self.config.server.stop_mode = mode;
        self
    }

    pub fn build(self) -> AppConfig {
        validate_config(&self.config).expect("Failed to build valid config from builder");
        self.config
    }
}

/// A stage that runs `sh -c <script>`.
pub fn sh_stage(name: &str, script: &str) -> StageConfig {
    StageConfig {
        name: name.to_string(),
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        working_dir: None,
    }
}
