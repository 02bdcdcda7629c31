//! Cross-platform application paths

use std::fs;
use std::path::{Path, PathBuf};

use neuroforge::config::Config;
use tracing::{info, warn};

use crate::error::DaemonError;

#[derive(Debug, Clone)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self, DaemonError> {
        let base = dirs::data_dir().ok_or(DaemonError::NoDataDir)?;
        Self::at(base.join("neuroforge"))
    }

    /// Use an explicit directory (created if missing).
    pub fn at(data_dir: PathBuf) -> Result<Self, DaemonError> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.data_dir.join("config.json")
    }
}

/// Read and validate `config.json`.
pub fn read_config(path: &Path) -> Result<Config, DaemonError> {
    let raw = fs::read_to_string(path)?;
    let cfg: Config = serde_json::from_str(&raw)?;
    cfg.validate()?;
    Ok(cfg)
}

/// `config.json` if present and valid, defaults otherwise.
pub fn load_config(paths: &AppPaths) -> Config {
    let path = paths.config_file();
    if !path.exists() {
        info!("No config at {:?}; using defaults", path);
        return Config::default();
    }
    match read_config(&path) {
        Ok(cfg) => {
            info!("Loaded config from {:?}", path);
            cfg
        }
        Err(e) => {
            warn!("Ignoring config at {:?}: {}", path, e);
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("neuroforged-test-{}-{}", name, std::process::id()))
    }

    #[test]
    fn missing_config_falls_back() {
        let paths = AppPaths::at(temp_dir("missing")).unwrap();
        let _ = fs::remove_file(paths.config_file());
        assert_eq!(load_config(&paths), Config::default());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let paths = AppPaths::at(temp_dir("partial")).unwrap();
        fs::write(paths.config_file(), r#"{"engine": {"population_size": 12, "seed": 5}}"#).unwrap();
        let cfg = load_config(&paths);
        assert_eq!(cfg.engine.population_size, 12);
        assert_eq!(cfg.engine.seed, Some(5));
        assert_eq!(cfg.scene, Default::default());
        let _ = fs::remove_dir_all(paths.data_dir());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let paths = AppPaths::at(temp_dir("invalid")).unwrap();
        fs::write(paths.config_file(), r#"{"engine": {"population_size": 1}}"#).unwrap();
        assert!(matches!(read_config(&paths.config_file()), Err(DaemonError::Config(_))));
        assert_eq!(load_config(&paths), Config::default());
        let _ = fs::remove_dir_all(paths.data_dir());
    }
}
