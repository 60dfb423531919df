//! Cluster config — serde structs for canopy.json
//!
//! Pure types and parsing only. Every field is optional; a missing or
//! malformed file falls back to defaults so the demo always starts.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub coordinator: Option<String>,
    pub workers: Vec<String>,
    #[serde(rename = "periodMs")]
    pub period_ms: Option<u64>,
    pub iterations: Option<u64>,
    #[serde(rename = "logDir")]
    pub log_dir: Option<String>,
}

impl ClusterConfig {
    /// Load from a specific path.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Discover from ./canopy.json.
    pub fn discover() -> Self {
        Self::load(&PathBuf::from("canopy.json"))
    }

    pub fn coordinator_name(&self) -> &str {
        self.coordinator.as_deref().unwrap_or("main")
    }

    /// Worker names, or `render_0..render_{n-1}` when the file names none.
    pub fn worker_names(&self, fallback_count: usize) -> Vec<String> {
        if self.workers.is_empty() {
            (0..fallback_count).map(|i| format!("render_{i}")).collect()
        } else {
            self.workers.clone()
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.unwrap_or(16))
    }
}
