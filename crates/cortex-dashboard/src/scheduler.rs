//! Sampler Scheduler (C3): a single cooperative loop ticking at ~1 Hz on a
//! dedicated background task. It fans out to enabled samplers and, when the
//! Progress tab is active, recomputes `elapsed`/`eta` under the state
//! mutex — the only other writer of those two fields.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cortex_core::Tab;

use crate::samplers::Samplers;
use crate::store::Store;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

pub struct Scheduler {
    running: Arc<AtomicBool>,
}

impl Scheduler {
    pub fn spawn(store: Arc<Store>, samplers: Arc<Samplers>) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let running_clone = running.clone();
        tokio::spawn(async move {
            while running_clone.load(Ordering::Acquire) {
                samplers.tick().await;
                store.with_state(|s| {
                    if s.current_tab == Tab::Progress {
                        s.progress.recompute_eta();
                    }
                });
                tokio::time::sleep(TICK_INTERVAL).await;
            }
        });
        Self { running }
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::{OpState, Operation};

    #[tokio::test]
    async fn eta_is_recomputed_only_on_progress_tab() {
        let store = Arc::new(Store::new());
        store.try_start(Operation::Bench, 4, OpState::InProgress);
        store.with_state(|s| {
            s.current_tab = Tab::Home;
            s.progress.current_step = 2;
        });
        let samplers = Arc::new(Samplers::new("http://localhost:11434"));
        let scheduler = Scheduler::spawn(store.clone(), samplers);
        tokio::time::sleep(Duration::from_millis(50)).await;
        scheduler.stop();
        store.with_state(|s| assert_eq!(s.progress.elapsed_secs, 0.0));
    }
}
