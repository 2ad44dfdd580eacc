use serde::{Deserialize, Serialize};

/// Which dashboard tab is currently focused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tab {
    #[default]
    Home,
    Progress,
}

impl Tab {
    pub fn toggled(self) -> Self {
        match self {
            Self::Home => Self::Progress,
            Self::Progress => Self::Home,
        }
    }
}

/// The operation an in-flight worker is driving.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Install,
    Bench,
    Doctor,
}

impl Operation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Install => "Install",
            Self::Bench => "System Benchmark",
            Self::Doctor => "System Doctor",
        }
    }
}

/// Shared operation state machine (see module docs on `cortex_dashboard::engine`
/// for the full transition diagram).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpState {
    Idle,
    WaitingInput,
    WaitingConfirmation,
    WaitingPassword,
    Processing,
    InProgress,
    Completed,
    Failed,
}

impl OpState {
    /// States in which an operation is considered "active" for the purpose of
    /// invariant (5): at most one worker in flight at a time.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::Processing
                | Self::InProgress
                | Self::WaitingInput
                | Self::WaitingConfirmation
                | Self::WaitingPassword
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// One entry in a doctor/bench report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub detail: String,
}

impl CheckResult {
    pub fn ok(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: true,
            detail: detail.into(),
        }
    }

    pub fn fail(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            passed: false,
            detail: detail.into(),
        }
    }
}

/// Mutable progress record shown on the Progress tab.
///
/// Reset to [`ProgressRecord::fresh`] by every operation starter before the
/// state machine transitions out of `Idle`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub state: OpState,
    pub operation: Option<Operation>,
    pub operation_label: String,
    pub current_step: u32,
    pub total_steps: u32,
    pub step_description: String,
    pub items: Vec<String>,
    pub error_message: Option<String>,
    pub success_message: Option<String>,
    pub start_time: Option<chrono::DateTime<chrono::Utc>>,
    pub elapsed_secs: f64,
    pub eta_secs: f64,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            state: OpState::Idle,
            operation: None,
            operation_label: String::new(),
            current_step: 0,
            total_steps: 0,
            step_description: String::new(),
            items: Vec::new(),
            error_message: None,
            success_message: None,
            start_time: None,
            elapsed_secs: 0.0,
            eta_secs: 0.0,
        }
    }
}

impl ProgressRecord {
    /// A clean record for a freshly-started operation.
    pub fn fresh(operation: Operation, total_steps: u32) -> Self {
        Self {
            state: OpState::Processing,
            operation: Some(operation),
            operation_label: operation.label().to_string(),
            total_steps,
            start_time: Some(chrono::Utc::now()),
            ..Default::default()
        }
    }

    /// ETA formula from the scheduler: `elapsed / current_step * (total - current)`,
    /// or zero when no step has completed yet.
    pub fn recompute_eta(&mut self) {
        if let Some(start) = self.start_time {
            self.elapsed_secs = (chrono::Utc::now() - start).num_milliseconds() as f64 / 1000.0;
        }
        self.eta_secs = if self.current_step > 0 {
            let remaining = self.total_steps.saturating_sub(self.current_step);
            self.elapsed_secs / self.current_step as f64 * remaining as f64
        } else {
            0.0
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_toggles() {
        assert_eq!(Tab::Home.toggled(), Tab::Progress);
        assert_eq!(Tab::Progress.toggled(), Tab::Home);
    }

    #[test]
    fn active_states() {
        assert!(OpState::Processing.is_active());
        assert!(OpState::WaitingPassword.is_active());
        assert!(!OpState::Idle.is_active());
        assert!(!OpState::Completed.is_active());
    }

    #[test]
    fn eta_zero_before_any_step() {
        let mut p = ProgressRecord::fresh(Operation::Bench, 4);
        p.current_step = 0;
        p.recompute_eta();
        assert_eq!(p.eta_secs, 0.0);
    }

    #[test]
    fn eta_zero_when_complete() {
        let mut p = ProgressRecord::fresh(Operation::Bench, 4);
        p.current_step = 4;
        p.recompute_eta();
        assert_eq!(p.eta_secs, 0.0);
    }
}
