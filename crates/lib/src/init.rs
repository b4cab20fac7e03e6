//! Initialize the configuration directory: create ~/.nexus, a default config and an empty settings file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config;

/// Create the config directory and default files if they do not exist.
/// - Creates the config directory (parent of config file path).
/// - Writes `config.json` with `{}` if missing.
/// - Writes the settings file (see [`config::resolve_settings_path`]) with `{}` if missing.
///
/// Existing files are left untouched. Returns the config directory.
pub fn init_config_dir(config_path: &Path) -> Result<PathBuf> {
    let config_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(config_dir)
        .with_context(|| format!("creating config directory {}", config_dir.display()))?;

    if !config_path.exists() {
        std::fs::write(config_path, b"{}")
            .with_context(|| format!("writing default config to {}", config_path.display()))?;
        log::info!("created default config at {}", config_path.display());
    }

    let (cfg, _) = config::load_config(Some(config_path.to_path_buf()))?;
    let settings_path = config::resolve_settings_path(&cfg, config_path);
    if !settings_path.exists() {
        if let Some(parent) = settings_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating settings directory {}", parent.display()))?;
        }
        std::fs::write(&settings_path, b"{}")
            .with_context(|| format!("writing settings file {}", settings_path.display()))?;
        log::info!("created settings file at {}", settings_path.display());
    } else {
        log::debug!("settings file already exists at {}, skipping", settings_path.display());
    }

    Ok(config_dir.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("nexus-init-test-{}", uuid::Uuid::new_v4()))
            .join("config.json")
    }

    #[test]
    fn creates_config_and_settings() {
        let path = temp_config_path();
        let dir = init_config_dir(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
        assert_eq!(std::fs::read_to_string(dir.join("settings.json")).unwrap(), "{}");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn leaves_existing_files_alone() {
        let path = temp_config_path();
        let dir = path.parent().unwrap().to_path_buf();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(&path, r#"{"settings":{"path":"state/user.json"}}"#).unwrap();

        init_config_dir(&path).unwrap();
        init_config_dir(&path).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("state/user.json"));
        assert!(dir.join("state").join("user.json").exists());
        assert!(!dir.join("settings.json").exists());
        let _ = std::fs::remove_dir_all(dir);
    }
}
