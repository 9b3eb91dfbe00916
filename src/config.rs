//! Configuration loading and defaults for the index's ambient tunables:
//! page size, buffer pool size, and the base directory index/relation
//! files are created under.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// Runtime configuration for the B+-tree index.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Page size in bytes. Default 8192 (8 KiB), matching `PAGE_SIZE`.
    pub page_size: u32,

    /// Buffer pool frame count (resident pages before eviction). Default 1024.
    pub buffer_pool_size: usize,

    /// Base directory index and relation files are created under. Default ".".
    pub data_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: 8192,
            buffer_pool_size: 1024,
            data_dir: ".".to_string(),
        }
    }
}

impl Config {
    /// Load config from a TOML file. Defaults to `Config::default()`.
    /// Empty file returns default config.
    pub fn from_path(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        let c: Config = toml::from_str(&s)?;
        c.validate()?;
        Ok(c)
    }

    /// Use default config. Convenience for tests and minimal setups.
    pub fn default_config() -> Self {
        Self::default()
    }

    fn validate(&self) -> Result<()> {
        if self.page_size != crate::storage::PAGE_SIZE as u32 {
            anyhow::bail!(
                "page_size must equal the compiled-in PAGE_SIZE ({}); fanouts are derived at compile time",
                crate::storage::PAGE_SIZE
            );
        }
        if self.buffer_pool_size == 0 {
            anyhow::bail!("buffer_pool_size must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_valid() {
        let c = Config::default();
        c.validate().unwrap();
        assert_eq!(c.page_size, 8192);
    }
}
