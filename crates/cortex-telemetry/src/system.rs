//! CPU/RAM/GPU sampling. The first CPU read establishes a baseline with a
//! blocking interval; later reads are non-blocking differential samples —
//! `sysinfo::System::refresh_cpu_usage` requires exactly this two-step
//! protocol to report meaningful percentages.

use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sysinfo::System;

use crate::Sampler;

const CPU_BASELINE_WAIT: Duration = Duration::from_millis(200);

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GpuSnapshot {
    pub utilization_pct: f32,
    pub vram_used_mb: u64,
    pub vram_total_mb: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SystemSnapshot {
    pub cpu_pct: f32,
    pub ram_used_mb: u64,
    pub ram_total_mb: u64,
    pub gpu: Option<GpuSnapshot>,
}

struct Inner {
    sys: System,
    baseline_done: bool,
    snapshot: SystemSnapshot,
}

/// System metrics sampler. GPU sampling is off by default and is turned on
/// only by the Bench operation (§4.2) — every other caller gets `gpu: None`.
pub struct SystemSampler {
    enabled: Mutex<bool>,
    gpu_enabled: Mutex<bool>,
    inner: Mutex<Inner>,
}

impl SystemSampler {
    pub fn new() -> Self {
        let mut sys = System::new_all();
        sys.refresh_cpu_usage();
        Self {
            enabled: Mutex::new(false),
            gpu_enabled: Mutex::new(false),
            inner: Mutex::new(Inner {
                sys,
                baseline_done: false,
                snapshot: SystemSnapshot::default(),
            }),
        }
    }

    pub fn enable_gpu(&self) {
        *self.gpu_enabled.lock().unwrap() = true;
    }

    pub fn snapshot(&self) -> SystemSnapshot {
        self.inner.lock().unwrap().snapshot.clone()
    }

    async fn read_gpu() -> Option<GpuSnapshot> {
        let output = tokio::process::Command::new("nvidia-smi")
            .args([
                "--query-gpu=utilization.gpu,memory.used,memory.total",
                "--format=csv,noheader,nounits",
            ])
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let text = String::from_utf8_lossy(&output.stdout);
        let first_line = text.lines().next()?;
        let mut fields = first_line.split(',').map(|s| s.trim());
        let util: f32 = fields.next()?.parse().ok()?;
        let used: u64 = fields.next()?.parse().ok()?;
        let total: u64 = fields.next()?.parse().ok()?;
        Some(GpuSnapshot {
            utilization_pct: util,
            vram_used_mb: used,
            vram_total_mb: total,
        })
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Sampler for SystemSampler {
    fn enabled(&self) -> bool {
        *self.enabled.lock().unwrap()
    }

    fn enable(&self) {
        *self.enabled.lock().unwrap() = true;
    }

    async fn update(&self) {
        let gpu_enabled = *self.gpu_enabled.lock().unwrap();
        let needs_baseline = {
            let inner = self.inner.lock().unwrap();
            !inner.baseline_done
        };
        if needs_baseline {
            tokio::time::sleep(CPU_BASELINE_WAIT).await;
        }
        let gpu = if gpu_enabled {
            Self::read_gpu().await
        } else {
            None
        };

        let mut inner = self.inner.lock().unwrap();
        inner.sys.refresh_cpu_usage();
        inner.sys.refresh_memory();
        inner.baseline_done = true;

        let cpu_pct = inner.sys.global_cpu_usage();
        let ram_total_mb = inner.sys.total_memory() / 1024 / 1024;
        let ram_used_mb = inner.sys.used_memory() / 1024 / 1024;

        inner.snapshot = SystemSnapshot {
            cpu_pct,
            ram_used_mb,
            ram_total_mb,
            gpu,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_sampler_never_publishes() {
        let sampler = SystemSampler::new();
        assert!(!sampler.enabled());
        assert_eq!(sampler.snapshot().ram_total_mb, 0);
    }

    #[tokio::test]
    async fn enabling_and_updating_publishes_a_snapshot() {
        let sampler = SystemSampler::new();
        sampler.enable();
        sampler.update().await;
        assert!(sampler.snapshot().ram_total_mb > 0);
    }

    #[tokio::test]
    async fn gpu_is_none_unless_bench_enables_it() {
        let sampler = SystemSampler::new();
        sampler.enable();
        sampler.update().await;
        assert!(sampler.snapshot().gpu.is_none());
    }
}
