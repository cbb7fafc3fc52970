//! Pipeline configuration.

use crate::error::ConfigError;
use crate::layout::LayoutParam;
use cgmath::Vector2;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Configuration of a container's pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Window size; the root layout constraint
    pub window: WindowConfig,

    /// How long a thread waits for a synchronous task on another thread, in milliseconds
    pub sync_task_timeout_ms: u64,

    /// Maximum number of UI tasks run per frame (0 for no limit)
    pub max_ui_tasks_per_frame: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f64,
    pub height: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig {
            width: 1280.,
            height: 720.,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            window: WindowConfig::default(),
            sync_task_timeout_ms: 5000,
            max_ui_tasks_per_frame: 0,
        }
    }
}

impl PipelineConfig {
    /// Parses and validates a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(source: &str) -> Result<PipelineConfig, ConfigError> {
        let config: PipelineConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<PipelineConfig, ConfigError> {
        let source = fs::read_to_string(path)?;
        PipelineConfig::from_toml_str(&source)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let WindowConfig { width, height } = self.window;
        if !(width.is_finite() && width > 0.) || !(height.is_finite() && height > 0.) {
            return Err(ConfigError::Invalid(format!(
                "window size must be positive and finite, got {}x{}",
                width, height
            )));
        }
        if self.sync_task_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "sync_task_timeout_ms must not be zero".into(),
            ));
        }
        Ok(())
    }

    /// The constraint handed to the root render node.
    pub fn root_layout_param(&self) -> LayoutParam {
        LayoutParam::tight(Vector2::new(self.window.width, self.window.height))
    }

    pub fn sync_task_timeout(&self) -> Duration {
        Duration::from_millis(self.sync_task_timeout_ms)
    }
}
