use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the ledger service.
    pub ledger_url: String,
    /// Base URL of the miner intake server, used by the CLI.
    pub miner_url: String,
    /// Socket address the miner intake server binds to.
    pub listen_addr: String,
    /// Log file for the miner. Logs go to stderr when unset.
    pub log_file: Option<String>,
    /// Upper bound on offsets tried per block. Unbounded when unset.
    pub max_pow_attempts: Option<u64>,
}

impl Config {
    fn expand_path(path: &str) -> PathBuf {
        let expanded = shellexpand::tilde(path);
        PathBuf::from(expanded.into_owned())
    }

    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot find home directory"))?;
        Ok(home.join(".blockmint").join("config.json"))
    }

    /// Log file path with tilde expansion applied.
    pub fn log_file_resolved(&self) -> Option<PathBuf> {
        self.log_file.as_deref().map(Self::expand_path)
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    /// Reads the file at `path`, writing defaults there first if it is missing.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!(
                "Configuration file not found. Creating default configuration: {:?}",
                path
            );
            let cfg = Self::default();
            cfg.save_to(path)?;
            return Ok(cfg);
        }
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {:?}", path))?;
        serde_json::from_str(&data)
            .with_context(|| format!("Configuration file format error in {:?}", path))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
        Ok(())
    }

    /// Updates one field from its textual form. An empty value clears the
    /// optional fields.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "ledger_url" => self.ledger_url = value.to_string(),
            "miner_url" => self.miner_url = value.to_string(),
            "listen_addr" => self.listen_addr = value.to_string(),
            "log_file" => {
                self.log_file = (!value.is_empty()).then(|| value.to_string());
            }
            "max_pow_attempts" => {
                self.max_pow_attempts = if value.is_empty() {
                    None
                } else {
                    Some(
                        value
                            .parse()
                            .with_context(|| format!("max_pow_attempts must be a number: {}", value))?,
                    )
                };
            }
            _ => bail!("Unknown configuration key: {}", key),
        }
        Ok(())
    }

    pub fn view(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn init_default() -> Result<PathBuf> {
        let path = Self::default_path()?;
        Self::default().save_to(&path)?;
        Ok(path)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_url: "http://127.0.0.1:44347".to_string(),
            miner_url: "http://127.0.0.1:44334".to_string(),
            listen_addr: "127.0.0.1:44334".to_string(),
            log_file: None,
            max_pow_attempts: None,
        }
    }
}
