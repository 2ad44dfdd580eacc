//! Local model-server discovery over HTTP. Network failures collapse to
//! "server unavailable" with no retries — the dashboard must never stall on
//! a dead model server.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::Sampler;

const HTTP_TIMEOUT: Duration = Duration::from_secs(2);
const AVAILABLE_MODELS_TTL: Duration = Duration::from_secs(5);
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub size_bytes: u64,
}

#[derive(Deserialize)]
struct TagsResponse {
    models: Vec<TagsModel>,
}

#[derive(Deserialize)]
struct TagsModel {
    name: String,
    #[serde(default)]
    size: u64,
}

#[derive(Deserialize)]
struct PsResponse {
    models: Vec<PsModel>,
}

#[derive(Deserialize)]
struct PsModel {
    name: String,
    #[serde(default)]
    size: u64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub running: Vec<ModelInfo>,
    pub available: Vec<ModelInfo>,
    pub server_unavailable: bool,
}

struct Cache {
    available: Vec<ModelInfo>,
    fetched_at: Option<Instant>,
}

pub struct ModelSampler {
    enabled: Mutex<bool>,
    base_url: String,
    client: reqwest::Client,
    cache: Mutex<Cache>,
    snapshot: Mutex<ModelSnapshot>,
}

impl ModelSampler {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            enabled: Mutex::new(false),
            base_url: if base_url.is_empty() {
                DEFAULT_BASE_URL.to_string()
            } else {
                base_url
            },
            client: reqwest::Client::builder()
                .timeout(HTTP_TIMEOUT)
                .build()
                .unwrap_or_default(),
            cache: Mutex::new(Cache {
                available: Vec::new(),
                fetched_at: None,
            }),
            snapshot: Mutex::new(ModelSnapshot::default()),
        }
    }

    /// Resolve the base URL per §6: env overrides file, file overrides default.
    pub fn resolve_base_url(env_override: Option<String>, file_value: Option<String>) -> String {
        env_override
            .or(file_value)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        self.snapshot.lock().unwrap().clone()
    }

    async fn fetch_running(&self) -> Option<Vec<ModelInfo>> {
        let url = format!("{}/api/ps", self.base_url);
        let resp = self.client.get(url).send().await.ok()?;
        let body: PsResponse = resp.json().await.ok()?;
        Some(
            body.models
                .into_iter()
                .map(|m| ModelInfo {
                    name: m.name,
                    size_bytes: m.size,
                })
                .collect(),
        )
    }

    async fn fetch_available(&self) -> Option<Vec<ModelInfo>> {
        let url = format!("{}/api/tags", self.base_url);
        let resp = self.client.get(url).send().await.ok()?;
        let body: TagsResponse = resp.json().await.ok()?;
        Some(
            body.models
                .into_iter()
                .map(|m| ModelInfo {
                    name: m.name,
                    size_bytes: m.size,
                })
                .collect(),
        )
    }

    async fn available_cached(&self) -> Vec<ModelInfo> {
        {
            let cache = self.cache.lock().unwrap();
            if let Some(fetched_at) = cache.fetched_at {
                if fetched_at.elapsed() < AVAILABLE_MODELS_TTL {
                    return cache.available.clone();
                }
            }
        }
        match self.fetch_available().await {
            Some(models) => {
                let mut cache = self.cache.lock().unwrap();
                cache.available = models.clone();
                cache.fetched_at = Some(Instant::now());
                models
            }
            None => self.cache.lock().unwrap().available.clone(),
        }
    }
}

#[async_trait::async_trait]
impl Sampler for ModelSampler {
    fn enabled(&self) -> bool {
        *self.enabled.lock().unwrap()
    }

    fn enable(&self) {
        *self.enabled.lock().unwrap() = true;
    }

    async fn update(&self) {
        let running = self.fetch_running().await;
        let available = self.available_cached().await;
        let server_unavailable = running.is_none();
        *self.snapshot.lock().unwrap() = ModelSnapshot {
            running: running.unwrap_or_default(),
            available,
            server_unavailable,
        };
    }
}
