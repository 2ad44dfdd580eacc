//! One-shot shell-history loader. Unlike the other three samplers this is
//! not periodic: the first `update()` call populates the buffer and every
//! later call is a no-op, per the idempotence requirement.

use std::path::PathBuf;
use std::sync::Mutex;

use crate::Sampler;

const MAX_LINES: usize = 200;

fn search_list() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut paths = Vec::new();
    if let Some(home) = home {
        paths.push(home.join(".bash_history"));
        paths.push(home.join(".zsh_history"));
        paths.push(home.join(".local/share/fish/fish_history"));
    }
    paths
}

fn is_metadata_line(line: &str) -> bool {
    // fish/zsh extended history lines look like `: 1700000000:0;actual command`.
    line.starts_with(": ") && line.contains(';')
}

fn strip_metadata(line: &str) -> &str {
    if is_metadata_line(line) {
        line.splitn(2, ';').nth(1).unwrap_or(line)
    } else {
        line
    }
}

fn load_tail(path: &std::path::Path, max_lines: usize) -> Vec<String> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let mut lines: Vec<String> = content
        .lines()
        .map(strip_metadata)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if lines.len() > max_lines {
        let start = lines.len() - max_lines;
        lines = lines.split_off(start);
    }
    lines
}

pub struct HistorySampler {
    enabled: Mutex<bool>,
    loaded: Mutex<bool>,
    snapshot: Mutex<Vec<String>>,
}

impl HistorySampler {
    pub fn new() -> Self {
        Self {
            enabled: Mutex::new(false),
            loaded: Mutex::new(false),
            snapshot: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.snapshot.lock().unwrap().clone()
    }
}

impl Default for HistorySampler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Sampler for HistorySampler {
    fn enabled(&self) -> bool {
        *self.enabled.lock().unwrap()
    }

    fn enable(&self) {
        *self.enabled.lock().unwrap() = true;
    }

    async fn update(&self) {
        let mut loaded = self.loaded.lock().unwrap();
        if *loaded {
            return;
        }
        for path in search_list() {
            if path.exists() {
                *self.snapshot.lock().unwrap() = load_tail(&path, MAX_LINES);
                break;
            }
        }
        *loaded = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn strips_zsh_metadata_prefix() {
        assert_eq!(strip_metadata(": 1700000000:0;ls -la"), "ls -la");
    }

    #[test]
    fn leaves_plain_lines_untouched() {
        assert_eq!(strip_metadata("ls -la"), "ls -la");
    }

    #[test]
    fn filters_blank_lines_and_caps_tail() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".bash_history");
        let content = (0..300)
            .map(|i| format!("cmd{i}"))
            .collect::<Vec<_>>()
            .join("\n\n");
        std::fs::write(&path, content).unwrap();
        let lines = load_tail(&path, MAX_LINES);
        assert_eq!(lines.len(), MAX_LINES);
        assert_eq!(lines.last().unwrap(), "cmd299");
    }

    #[tokio::test]
    async fn second_update_is_a_no_op() {
        let sampler = HistorySampler::new();
        sampler.enable();
        sampler.update().await;
        let first = sampler.snapshot();
        sampler.update().await;
        let second = sampler.snapshot();
        assert_eq!(first, second);
    }
}
