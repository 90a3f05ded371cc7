use anyhow::Result;
use config::{Config, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use svckit::config::{ApiConfig, ObservabilityConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DashConfig {
    pub api: ApiConfig,
    pub dashboard: DashboardConfig,
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub poll_interval_secs: u64,
    pub export_dir: PathBuf,
    pub notification_ttl_secs: u64,
    pub report_delay_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 30,
            export_dir: PathBuf::from("."),
            notification_ttl_secs: 4,
            report_delay_ms: 2000,
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_secs(self.notification_ttl_secs.max(1))
    }

    pub fn report_delay(&self) -> Duration {
        Duration::from_millis(self.report_delay_ms)
    }
}

/// Load the YAML file at `path` (optional) with `TRIAGE_DASH__SECTION__KEY`
/// environment overrides on top.
pub fn load_config(path: &str) -> Result<DashConfig> {
    let config = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix("TRIAGE_DASH")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(config.try_deserialize()?)
}
