// src/engine/mod.rs

pub mod context;
pub mod lifecycle;

pub use context::AppContext;
pub use lifecycle::{LifecycleManager, SchedulerStart, ServerStart};
