//! Relevant-process enumeration.
//!
//! Privacy invariant: only `pid` and `name` are ever captured. `sysinfo`
//! hands back command-line arguments for free via `Process::cmd()`; we never
//! call it, and `ProcessEntry` has no field that could hold them.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sysinfo::System;

use crate::Sampler;

const KEYWORDS: &[&str] = &[
    "python",
    "node",
    "ollama",
    "llama",
    "bert",
    "gpt",
    "transformers",
    "inference",
    "pytorch",
    "tensorflow",
    "cortex",
    "cuda",
];

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessEntry {
    pub pid: u32,
    pub name: String,
}

fn matches_keyword(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    KEYWORDS.iter().any(|kw| lower.contains(kw))
}

pub struct ProcessSampler {
    enabled: Mutex<bool>,
    snapshot: Mutex<Vec<ProcessEntry>>,
}

impl ProcessSampler {
    pub fn new() -> Self {
        Self {
            enabled: Mutex::new(false),
            snapshot: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Vec<ProcessEntry> {
        self.snapshot.lock().unwrap().clone()
    }
}

impl Default for ProcessSampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Sampler for ProcessSampler {
    fn enabled(&self) -> bool {
        *self.enabled.lock().unwrap()
    }

    fn enable(&self) {
        *self.enabled.lock().unwrap() = true;
    }

    async fn update(&self) {
        let mut sys = System::new_all();
        sys.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        let entries: Vec<ProcessEntry> = sys
            .processes()
            .values()
            .filter_map(|proc| {
                let name = proc.name().to_string_lossy().to_string();
                matches_keyword(&name).then(|| ProcessEntry {
                    pid: proc.pid().as_u32(),
                    name,
                })
            })
            .collect();
        *self.snapshot.lock().unwrap() = entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_matching_is_case_insensitive() {
        assert!(matches_keyword("Python3.11"));
        assert!(matches_keyword("OLLAMA"));
        assert!(!matches_keyword("bash"));
    }

    #[tokio::test]
    async fn disabled_sampler_keeps_empty_snapshot() {
        let sampler = ProcessSampler::new();
        assert!(sampler.snapshot().is_empty());
    }

    #[test]
    fn entry_carries_no_cmdline_field() {
        // Compile-time privacy check: ProcessEntry has exactly pid + name.
        let entry = ProcessEntry {
            pid: 1,
            name: "python".to_string(),
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("cmd"));
        assert!(!json.contains("args"));
    }
}
