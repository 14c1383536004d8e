//! `bw.toml` loading and data-directory resolution.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use bw_core::EngineConfig;

use crate::error::Result;

pub const DATA_DIR_ENV: &str = "BW_DATA_DIR";
pub const CONFIG_FILE: &str = "bw.toml";

/// `~/.breathwave`, or `./.breathwave` when no home directory is known.
pub fn default_base_dir() -> PathBuf {
    dirs_home().join(".breathwave")
}

fn dirs_home() -> PathBuf {
    env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// `$BW_DATA_DIR` when set and non-empty, otherwise the default base dir.
pub fn resolve_data_dir() -> PathBuf {
    env::var(DATA_DIR_ENV)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(default_base_dir)
}

/// Parse and validate a TOML document. Missing tables and fields keep defaults.
pub fn parse_config(text: &str) -> Result<EngineConfig> {
    let config: EngineConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config_file(path: &Path) -> Result<EngineConfig> {
    let text = fs::read_to_string(path)?;
    let config = parse_config(&text)?;
    tracing::info!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Explicit path wins; then `<data_dir>/bw.toml` if it exists; then defaults.
pub fn load_config(explicit: Option<&Path>, data_dir: &Path) -> Result<EngineConfig> {
    if let Some(path) = explicit {
        return load_config_file(path);
    }
    let candidate = data_dir.join(CONFIG_FILE);
    if candidate.is_file() {
        return load_config_file(&candidate);
    }
    tracing::debug!(dir = %data_dir.display(), "no bw.toml, using defaults");
    Ok(EngineConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreError;

    #[test]
    fn test_empty_document_is_default() {
        assert_eq!(parse_config("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_tables() {
        let cfg = parse_config(
            r#"
            [estimator]
            window_ms = 20000
            smoothing_radius = 3

            [selector]
            enable_entrainment = false

            [session]
            confidence_gate = 0.4
            "#,
        )
        .unwrap();
        assert_eq!(cfg.estimator.window_ms, 20_000);
        assert_eq!(cfg.estimator.smoothing_radius, 3);
        assert_eq!(cfg.estimator.min_samples, 50);
        assert!(!cfg.selector.enable_entrainment);
        assert!(cfg.selector.enable_overrides);
        assert_eq!(cfg.session.confidence_gate, 0.4);
        assert_eq!(cfg.session.cue_gate, 0.5);
    }

    #[test]
    fn test_syntax_error_is_config_error() {
        let err = parse_config("[estimator\nwindow_ms = 1").unwrap_err();
        assert!(matches!(err, StoreError::Config(_)));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = parse_config("[estimator]\nwindow_ms = 0\n").unwrap_err();
        assert!(err.to_string().contains("estimator.window_ms"));
    }

    #[test]
    fn test_resolution_order() {
        let dir = tempfile::tempdir().unwrap();

        // nothing on disk
        assert_eq!(
            load_config(None, dir.path()).unwrap(),
            EngineConfig::default()
        );

        fs::write(dir.path().join(CONFIG_FILE), "[moments]\ncapacity = 7\n").unwrap();
        assert_eq!(load_config(None, dir.path()).unwrap().moments.capacity, 7);

        let explicit = dir.path().join("other.toml");
        fs::write(&explicit, "[simulated]\nperiod_ms = 5000.0\n").unwrap();
        let cfg = load_config(Some(&explicit), dir.path()).unwrap();
        assert_eq!(cfg.simulated.period_ms, 5_000.0);
        assert_eq!(cfg.moments.capacity, 20);
    }

    #[test]
    fn test_missing_explicit_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("nope.toml")), dir.path()).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
