use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Profile file macros are saved to and loaded from.
    pub profile: PathBuf,
    /// Title pattern of the window to target on startup.
    pub window_title: Option<String>,
    pub color_poll_ms: u64,
    /// Macros that were running at exit; restarted on the next launch.
    pub autostart: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: PathBuf::from("profile.json"),
            window_title: None,
            color_poll_ms: 100,
            autostart: Vec::new(),
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, path: &Path) {
        if let Ok(json) = serde_json::to_string_pretty(self) {
            let _ = std::fs::write(path, json);
        }
    }

    pub fn color_poll(&self) -> Duration {
        Duration::from_millis(self.color_poll_ms.max(1))
    }
}
