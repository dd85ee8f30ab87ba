// src/engine/lifecycle.rs

//! Ownership of the long-lived background tasks.
//!
//! At most one file server and at most one schedule loop are tracked at a
//! time. Start operations are idempotent from the caller's point of view:
//! starting something that is already tracked and alive is a warning, not a
//! second instance.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::exec::PipelineExecutor;
use crate::schedule::{ScheduleConfig, SchedulerHandle, spawn_scheduler};
use crate::server::{ServerHandle, ServerSettings, start_file_server};
use crate::types::StopMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStart {
    Started(SocketAddr),
    AlreadyRunning(SocketAddr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerStart {
    Started(ScheduleConfig),
    AlreadyRunning(ScheduleConfig),
    /// The config has scheduling turned off; nothing was spawned.
    Disabled,
}

#[derive(Debug, Default)]
pub struct LifecycleManager {
    server: Mutex<Option<ServerHandle>>,
    scheduler: Mutex<Option<SchedulerHandle>>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn start_server(&self, settings: &ServerSettings) -> Result<ServerStart> {
        let mut slot = self.server.lock().await;

        if let Some(handle) = slot.as_ref() {
            if handle.is_alive() {
                warn!(addr = %handle.local_addr(), "file server is already running");
                return Ok(ServerStart::AlreadyRunning(handle.local_addr()));
            }
            debug!(addr = %handle.local_addr(), "tracked file server has exited; replacing it");
            slot.take();
        }

        let handle = start_file_server(settings).await?;
        let addr = handle.local_addr();
        *slot = Some(handle);
        Ok(ServerStart::Started(addr))
    }

    /// Stop the tracked server. Returns false if none was tracked.
    pub async fn stop_server(&self, mode: StopMode, grace: Duration) -> bool {
        let handle = self.server.lock().await.take();
        let Some(handle) = handle else {
            warn!("file server is not running");
            return false;
        };

        match mode {
            StopMode::Hard => handle.shutdown(grace).await,
            StopMode::Soft => handle.detach(),
        }
        true
    }

    /// Address of the tracked server, if it is alive.
    pub async fn server_addr(&self) -> Option<SocketAddr> {
        self.server
            .lock()
            .await
            .as_ref()
            .filter(|h| h.is_alive())
            .map(ServerHandle::local_addr)
    }

    pub async fn start_scheduler(
        &self,
        config: ScheduleConfig,
        executor: Arc<PipelineExecutor>,
    ) -> SchedulerStart {
        if !config.enabled {
            debug!(schedule = %config, "scheduling disabled; not starting scheduler");
            return SchedulerStart::Disabled;
        }

        let mut slot = self.scheduler.lock().await;
        if let Some(handle) = slot.as_ref() {
            if handle.is_alive() {
                warn!(schedule = %handle.config(), "scheduler is already running");
                return SchedulerStart::AlreadyRunning(handle.config());
            }
            slot.take();
        }

        *slot = Some(spawn_scheduler(config, executor));
        SchedulerStart::Started(config)
    }

    /// Stop the tracked schedule loop. A run in flight still completes.
    pub async fn stop_scheduler(&self) -> bool {
        match self.scheduler.lock().await.take() {
            Some(handle) => {
                info!(schedule = %handle.config(), "stopping scheduler");
                drop(handle.stop());
                true
            }
            None => false,
        }
    }

    /// Replace the tracked loop with one using `config`. With scheduling
    /// disabled this only stops the current loop.
    pub async fn reschedule(
        &self,
        config: ScheduleConfig,
        executor: Arc<PipelineExecutor>,
    ) -> SchedulerStart {
        self.stop_scheduler().await;
        self.start_scheduler(config, executor).await
    }

    /// Config of the tracked schedule loop, if it is alive.
    pub async fn scheduler_config(&self) -> Option<ScheduleConfig> {
        self.scheduler
            .lock()
            .await
            .as_ref()
            .filter(|h| h.is_alive())
            .map(SchedulerHandle::config)
    }

    /// Stop everything; used on process exit.
    pub async fn shutdown(&self, grace: Duration) {
        self.stop_scheduler().await;
        if self.server.lock().await.is_some() {
            self.stop_server(StopMode::Hard, grace).await;
        }
    }
}
