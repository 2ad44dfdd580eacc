//! The State Store (C1): one aggregate behind one mutex, plus one
//! lock-free cancellation flag (§4.1, §5). Every mutation is a short
//! critical section; invariant (5) — at most one worker in flight — is
//! enforced by check-and-set inside `try_start`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use cortex_core::{CheckResult, OpState, Operation, ProgressRecord, Tab};

pub const MAX_INPUT_LEN: usize = 128;

#[derive(Debug, Default)]
pub struct DashboardState {
    pub current_tab: Tab,
    pub progress: ProgressRecord,
    pub input_buffer: String,
    pub pending_commands: Vec<String>,
    pub cached_elevation_secret: Option<String>,
    pub last_pressed_key_label: Option<String>,
    pub doctor_results: Vec<CheckResult>,
    pub doctor_running: bool,
    pub bench_running: bool,
    /// Audit target label for the in-flight operation (package name, or the
    /// operation's display label for Bench/Doctor).
    pub current_target: String,
}

/// Authoritative dashboard state plus the one-bit cancellation signal.
pub struct Store {
    state: Mutex<DashboardState>,
    cancelled: AtomicBool,
}

impl Store {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DashboardState::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Run `f` under the single mutex and return its result — the only way
    /// to read or mutate dashboard state.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut DashboardState) -> R) -> R {
        let mut guard = self.state.lock().unwrap();
        f(&mut guard)
    }

    /// Check-and-set admission for a new operation (invariant 5). Returns
    /// `true` and resets `progress`/cancellation if admitted; `false` and
    /// leaves state untouched otherwise.
    pub fn try_start(&self, operation: Operation, total_steps: u32, initial_state: OpState) -> bool {
        let mut guard = self.state.lock().unwrap();
        if guard.progress.state.is_active() {
            return false;
        }
        guard.progress = ProgressRecord::fresh(operation, total_steps);
        guard.progress.state = initial_state;
        guard.pending_commands.clear();
        guard.input_buffer.clear();
        self.cancelled.store(false, Ordering::Release);
        true
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_start_is_a_no_op_while_active() {
        let store = Store::new();
        assert!(store.try_start(Operation::Install, 2, OpState::WaitingInput));
        assert!(!store.try_start(Operation::Bench, 4, OpState::Processing));
        store.with_state(|s| assert_eq!(s.progress.operation, Some(Operation::Install)));
    }

    #[test]
    fn start_succeeds_again_once_terminal() {
        let store = Store::new();
        assert!(store.try_start(Operation::Doctor, 5, OpState::Processing));
        store.with_state(|s| s.progress.state = OpState::Completed);
        assert!(store.try_start(Operation::Bench, 4, OpState::Processing));
    }

    #[test]
    fn cancellation_flag_is_cleared_by_a_new_start() {
        let store = Store::new();
        store.try_start(Operation::Install, 1, OpState::WaitingInput);
        store.cancel();
        assert!(store.is_cancelled());
        store.with_state(|s| s.progress.state = OpState::Failed);
        store.try_start(Operation::Bench, 3, OpState::Processing);
        assert!(!store.is_cancelled());
    }
}
