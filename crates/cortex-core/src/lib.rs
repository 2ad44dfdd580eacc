//! Shared types for the Cortex dashboard: the operation state machine,
//! progress records, and audit record schema. No I/O lives here.

pub mod audit;
pub mod error;
pub mod text;
pub mod types;

pub use audit::{AuditAction, AuditOutcome, AuditRecord};
pub use error::AppError;
pub use types::{CheckResult, OpState, Operation, ProgressRecord, Tab};
