use serde::{Deserialize, Serialize};

/// The lifecycle action an audit record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Install,
    InstallConfirmed,
    InstallExecute,
    Bench,
    Doctor,
    Cancel,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::InstallConfirmed => "install_confirmed",
            Self::InstallExecute => "install_execute",
            Self::Bench => "bench",
            Self::Doctor => "doctor",
            Self::Cancel => "cancel",
        }
    }
}

/// Lifecycle outcome of an audited operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Started,
    Succeeded,
    Failed,
    Cancelled,
}

/// One line of the append-only audit log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub action: AuditAction,
    pub target: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub outcome: AuditOutcome,
}

impl AuditRecord {
    pub fn new(action: AuditAction, target: impl Into<String>, outcome: AuditOutcome) -> Self {
        Self {
            action,
            target: target.into(),
            timestamp: chrono::Utc::now(),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trips_through_json() {
        let record = AuditRecord::new(AuditAction::InstallExecute, "nginx", AuditOutcome::Succeeded);
        let line = serde_json::to_string(&record).unwrap();
        let parsed: AuditRecord = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.target, "nginx");
        assert_eq!(parsed.outcome, AuditOutcome::Succeeded);
    }

    #[test]
    fn action_str_matches_schema() {
        assert_eq!(AuditAction::Install.as_str(), "install");
        assert_eq!(AuditAction::InstallConfirmed.as_str(), "install_confirmed");
        assert_eq!(AuditAction::Cancel.as_str(), "cancel");
    }
}
