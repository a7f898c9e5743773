mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./clipgate.toml",
        "~/.config/clipgate/config.toml",
        "/etc/clipgate/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
fn validate_config(config: &Config) -> Result<()> {
    if config.scheduler.chunk_size == 0 {
        anyhow::bail!("Scheduler chunk size cannot be 0");
    }

    if config.scheduler.timeout_secs == 0 {
        anyhow::bail!("Scheduler timeout cannot be 0");
    }

    if config.policy.allowed_formats.is_empty() {
        anyhow::bail!("Policy must allow at least one container format");
    }

    if config.policy.allowed_video_codecs.is_empty() {
        anyhow::bail!("Policy must allow at least one video codec");
    }

    if config.policy.max_size_mib <= 0.0 {
        anyhow::bail!("Policy size limit must be positive");
    }

    if config.bridge.host_base_url.is_empty() {
        tracing::warn!("Bridge host_base_url is empty; redirect fallback will be unusable");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.scheduler.chunk_size, 4 * 1024 * 1024);
        assert_eq!(config.scheduler.timeout_secs, 45);
        assert_eq!(config.bridge.announce_budget, 10);
        assert_eq!(config.bridge.poll_budget, 40);
        assert!((config.policy.max_size_mib - 200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn partial_file_overrides_one_section() {
        let config: Config = toml::from_str(
            r#"
            [scheduler]
            chunk_size = 65536

            [policy]
            max_size_mib = 500.0
            "#,
        )
        .unwrap();
        assert_eq!(config.scheduler.chunk_size, 65536);
        assert_eq!(config.scheduler.timeout_secs, 45);
        assert!((config.policy.max_size_mib - 500.0).abs() < f64::EPSILON);
        assert!(config.policy.allowed_formats.contains(&"mp4".to_string()));
    }

    #[test]
    fn zero_chunk_size_is_rejected() {
        let config: Config = toml::from_str("[scheduler]\nchunk_size = 0\n").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn empty_format_list_is_rejected() {
        let config: Config = toml::from_str("[policy]\nallowed_formats = []\n").unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(load_config_or_default(Some(&path)).is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[bridge]\nhost_base_url = \"http://10.0.0.2:8501\"\n").unwrap();
        let config = load_config(&path).unwrap();
        assert_eq!(config.bridge.host_base_url, "http://10.0.0.2:8501");
    }
}
