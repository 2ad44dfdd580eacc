//! Bundles the four telemetry samplers (C2) behind a single handle. All four
//! start disabled; Bench and Doctor both enable all four, and only Bench
//! enables GPU sampling (§4.2).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cortex_telemetry::{HistorySampler, ModelSampler, ProcessSampler, Sampler, SystemSampler};

pub struct Samplers {
    pub system: Arc<SystemSampler>,
    pub processes: Arc<ProcessSampler>,
    pub models: Arc<ModelSampler>,
    pub history: Arc<HistorySampler>,
    pub monitoring: AtomicBool,
}

impl Samplers {
    pub fn new(model_base_url: impl Into<String>) -> Self {
        Self {
            system: Arc::new(SystemSampler::new()),
            processes: Arc::new(ProcessSampler::new()),
            models: Arc::new(ModelSampler::new(model_base_url)),
            history: Arc::new(HistorySampler::new()),
            monitoring: AtomicBool::new(false),
        }
    }

    /// Enable all four samplers; used to start Bench and Doctor.
    pub fn enable_all(&self) {
        self.system.enable();
        self.processes.enable();
        self.models.enable();
        self.history.enable();
        self.monitoring.store(true, Ordering::Release);
    }

    pub fn enable_gpu(&self) {
        self.system.enable_gpu();
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::Acquire)
    }

    /// Called by the scheduler tick: update every sampler that is enabled.
    pub async fn tick(&self) {
        if !self.is_monitoring() {
            return;
        }
        if self.system.enabled() {
            self.system.update().await;
        }
        if self.processes.enabled() {
            self.processes.update().await;
        }
        if self.models.enabled() {
            self.models.update().await;
        }
        if self.history.enabled() {
            self.history.update().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enable_all_turns_on_every_sampler_but_not_gpu() {
        let samplers = Samplers::new("http://localhost:11434");
        samplers.enable_all();
        assert!(samplers.system.enabled());
        assert!(samplers.processes.enabled());
        assert!(samplers.models.enabled());
        assert!(samplers.history.enabled());
        samplers.tick().await;
        assert!(samplers.system.snapshot().gpu.is_none());
    }

    #[tokio::test]
    async fn tick_is_a_no_op_until_monitoring_starts() {
        let samplers = Samplers::new("http://localhost:11434");
        samplers.tick().await;
        assert_eq!(samplers.system.snapshot().ram_total_mb, 0);
    }
}
