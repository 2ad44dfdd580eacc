//! Four independent telemetry samplers, all disabled by default. The
//! Sampler Scheduler (in `cortex-dashboard`) is the sole caller of
//! `update()`; the dashboard UI only ever reads `snapshot()`.

pub mod history;
pub mod models;
pub mod processes;
pub mod system;

pub use history::HistorySampler;
pub use models::{ModelInfo, ModelSampler, ModelSnapshot};
pub use processes::{ProcessEntry, ProcessSampler};
pub use system::{GpuSnapshot, SystemSampler, SystemSnapshot};

/// Uniform shape shared by every sampler: an `enabled` admission gate and a
/// thread-safe `update()` that publishes into an internal snapshot.
#[async_trait::async_trait]
pub trait Sampler: Send + Sync {
    fn enabled(&self) -> bool;
    fn enable(&self);
    async fn update(&self);
}
