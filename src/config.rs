//! Configuration provider. The configuration is a plain value: it is read from `config.json`
//! at start-up and on explicit reconfiguration and handed to the engine as a whole.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    accounting::budget::DailyBudget,
    fs::operations::{read_locked, write_atomic},
};

pub const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub budget: DailyBudget,
    pub enabled: bool,
    /// Pause accrual while the session is locked.
    pub pause_on_lock: bool,
    /// Overtime allowance opened when the budget runs out, in minutes.
    pub default_overtime_minutes: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            budget: DailyBudget::default(),
            enabled: true,
            pause_on_lock: true,
            default_overtime_minutes: 0.,
        }
    }
}

pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE_NAME)
}

impl BudgetConfig {
    /// Loads the configuration, writing the defaults on first use.
    pub async fn load(dir: &Path) -> Result<Self> {
        let path = config_path(dir);
        let bytes = read_locked(&path)
            .await
            .with_context(|| format!("Failed to read configuration {path:?}"))?;

        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Failed to parse configuration {path:?}")),
            None => {
                info!("No configuration at {path:?}, writing defaults");
                let config = Self::default();
                config.save(dir).await?;
                Ok(config)
            }
        }
    }

    pub async fn save(&self, dir: &Path) -> Result<()> {
        let path = config_path(dir);
        let bytes = serde_json::to_vec_pretty(self)?;
        write_atomic(&path, &bytes)
            .await
            .with_context(|| format!("Failed to write configuration {path:?}"))
    }
}
