// src/schedule/mod.rs

//! Recurring pipeline schedule.
//!
//! A single ticker task per [`SchedulerHandle`]. The lifecycle manager
//! keeps at most one handle tracked; reconfiguring means stopping the
//! tracked loop and spawning a new one with the new [`ScheduleConfig`].

pub mod scheduler;

use std::fmt;
use std::time::Duration;

use crate::types::ScheduleUnit;

pub use scheduler::{SchedulerHandle, spawn_scheduler};

/// `scheduling_enabled` / `scheduling_interval` / `scheduling_period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub enabled: bool,
    pub interval: u32,
    pub unit: ScheduleUnit,
}

impl ScheduleConfig {
    pub fn every(interval: u32, unit: ScheduleUnit) -> Self {
        Self {
            enabled: true,
            interval,
            unit,
        }
    }

    /// Time between two fires. An interval of 0 is treated as 1.
    pub fn period(&self) -> Duration {
        self.unit.duration(self.interval.max(1))
    }
}

impl fmt::Display for ScheduleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.enabled { "enabled" } else { "disabled" };
        write!(f, "every {} {} ({state})", self.interval, self.unit)
    }
}
