//! Append-only audit log (§5, §6): one JSON line per lifecycle event,
//! written via read-entire-file → append → fsync → rename so a crash
//! mid-write never corrupts the file. The whole sequence runs under one
//! mutex — `AuditWriteError` is logged and swallowed, never surfaced to the
//! dashboard UI (§7).

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use cortex_core::AuditRecord;
use tracing::warn;

#[async_trait::async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, record: AuditRecord);
}

/// Appends JSONL records to a file, guarded by a single mutex (§5).
pub struct JsonlAuditSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlAuditSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn write_sync(&self, record: &AuditRecord) -> anyhow::Result<()> {
        let _guard = self.lock.lock().unwrap();

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut existing = String::new();
        if self.path.exists() {
            File::open(&self.path)?.read_to_string(&mut existing)?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        existing.push_str(&line);

        let tmp_path = self.path.with_extension("tmp");
        {
            let mut tmp = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&tmp_path)?;
            tmp.write_all(existing.as_bytes())?;
            tmp.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuditSink for JsonlAuditSink {
    async fn record(&self, record: AuditRecord) {
        if let Err(err) = self.write_sync(&record) {
            warn!(error = %err, "audit write failed");
        }
    }
}

/// Parses every well-formed line of a JSONL audit file, skipping malformed
/// trailing lines. Used by tests to verify crash recovery (§8).
pub fn read_all(path: &Path) -> Vec<AuditRecord> {
    let Ok(content) = fs::read_to_string(path) else {
        return Vec::new();
    };
    content
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}

/// In-memory sink for Operation Engine tests — never touches the filesystem.
pub mod testing {
    use super::AuditSink;
    use cortex_core::AuditRecord;
    use std::sync::Mutex;

    pub struct FakeAuditSink {
        pub records: Mutex<Vec<AuditRecord>>,
    }

    impl FakeAuditSink {
        pub fn new() -> Self {
            Self {
                records: Mutex::new(Vec::new()),
            }
        }

        pub fn records(&self) -> Vec<AuditRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl Default for FakeAuditSink {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait::async_trait]
    impl AuditSink for FakeAuditSink {
        async fn record(&self, record: AuditRecord) {
            self.records.lock().unwrap().push(record);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::{AuditAction, AuditOutcome};
    use tempfile::tempdir;
    use testing::FakeAuditSink;

    #[tokio::test]
    async fn appends_records_in_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.db");
        let sink = JsonlAuditSink::new(&path);
        sink.record(AuditRecord::new(AuditAction::Install, "nginx", AuditOutcome::Started))
            .await;
        sink.record(AuditRecord::new(
            AuditAction::InstallExecute,
            "nginx",
            AuditOutcome::Succeeded,
        ))
        .await;

        let records = read_all(&path);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].action, AuditAction::Install);
        assert_eq!(records[1].outcome, AuditOutcome::Succeeded);
    }

    #[tokio::test]
    async fn survives_a_crash_mid_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("history.db");
        let sink = JsonlAuditSink::new(&path);
        sink.record(AuditRecord::new(AuditAction::Doctor, "doctor", AuditOutcome::Started))
            .await;

        // Simulate a crash before the rename: the temp file is left behind
        // with new content, but the target file is untouched.
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, "{not valid json\n").unwrap();

        let records = read_all(&path);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].action, AuditAction::Doctor);
    }

    #[tokio::test]
    async fn fake_sink_records_everything_in_memory() {
        let sink = FakeAuditSink::new();
        sink.record(AuditRecord::new(AuditAction::Cancel, "x", AuditOutcome::Cancelled))
            .await;
        assert_eq!(sink.records.lock().unwrap().len(), 1);
    }
}
