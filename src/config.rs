use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Record stream: one `latitude,longitude,language` line per record.
    pub records: PathBuf,
    /// GeoJSON FeatureCollection defining the cell partition.
    pub grid: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RunConfig {
    /// Number of record lines carried per message to a worker.
    #[serde(default = "default_batch_size")]
    pub batch_size_per_message: usize,
    /// Total pool size N: one coordinator plus N-1 workers. N = 1 runs
    /// everything in the coordinator without a pool.
    #[serde(default = "default_processes")]
    pub processes: usize,
}

fn default_batch_size() -> usize {
    50
}

fn default_processes() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            batch_size_per_message: default_batch_size(),
            processes: default_processes(),
        }
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size_per_message == 0 {
            bail!("batch_size_per_message must be positive");
        }
        if self.processes == 0 {
            bail!("processes must be at least 1");
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_run_section() {
        let config: AppConfig = toml::from_str(
            r#"
            [input]
            records = "records.txt"
            grid = "grid.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.run.batch_size_per_message, 50);
        assert!(config.run.processes >= 1);
        assert!(config.run.validate().is_ok());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let run = RunConfig {
            batch_size_per_message: 0,
            processes: 4,
        };
        assert!(run.validate().is_err());
    }

    #[test]
    fn zero_processes_is_rejected() {
        let run = RunConfig {
            batch_size_per_message: 50,
            processes: 0,
        };
        assert!(run.validate().is_err());
    }
}
