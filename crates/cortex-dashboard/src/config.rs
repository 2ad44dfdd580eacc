//! `~/.cortex/preferences.yaml` — the one optional config file the core
//! reads. Env overrides file, file overrides the built-in default, exactly
//! as `cortex_telemetry::ModelSampler::resolve_base_url` expects.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct Preferences {
    ollama_api_base: Option<String>,
}

fn cortex_dir() -> Option<PathBuf> {
    directories::UserDirs::new().map(|d| d.home_dir().join(".cortex"))
}

pub fn preferences_path() -> Option<PathBuf> {
    cortex_dir().map(|d| d.join("preferences.yaml"))
}

pub fn history_db_path() -> Option<PathBuf> {
    cortex_dir().map(|d| d.join("history.db"))
}

fn load_preferences() -> Preferences {
    let Some(path) = preferences_path() else {
        return Preferences::default();
    };
    let Ok(content) = std::fs::read_to_string(&path) else {
        return Preferences::default();
    };
    serde_yaml::from_str(&content).unwrap_or_default()
}

/// Resolve the model-server base URL: `OLLAMA_API_BASE` env var, then the
/// preferences file, then the built-in default.
pub fn resolve_model_base_url() -> String {
    let env_override = std::env::var("OLLAMA_API_BASE").ok();
    let file_value = load_preferences().ollama_api_base;
    cortex_telemetry::ModelSampler::resolve_base_url(env_override, file_value)
}

/// §6: one of `ANTHROPIC_API_KEY`, `OPENAI_API_KEY` must be present.
pub fn has_llm_credentials() -> bool {
    std::env::var_os("ANTHROPIC_API_KEY").is_some() || std::env::var_os("OPENAI_API_KEY").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_check_requires_one_of_two_vars() {
        std::env::remove_var("ANTHROPIC_API_KEY");
        std::env::remove_var("OPENAI_API_KEY");
        assert!(!has_llm_credentials());
        std::env::set_var("ANTHROPIC_API_KEY", "sk-test");
        assert!(has_llm_credentials());
        std::env::remove_var("ANTHROPIC_API_KEY");
    }
}
