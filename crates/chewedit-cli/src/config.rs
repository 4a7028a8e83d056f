// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_STATUS_CLEAR_SECS: u64 = 4;
const MAX_STATUS_CLEAR_SECS: u64 = 60;
const DEFAULT_LOG_LEVEL: &str = "info";
pub const LOG_ENV: &str = "CHEWEDIT_LOG";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            ui: Ui::default(),
            logging: Logging::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub system_dir: Option<String>,
    pub user_dir: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ui {
    pub status_clear_secs: Option<u64>,
}

impl Default for Ui {
    fn default() -> Self {
        Self {
            status_clear_secs: Some(DEFAULT_STATUS_CLEAR_SECS),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Logging {
    pub level: Option<String>,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("CHEWEDIT_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set CHEWEDIT_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(chewedit_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [storage], [ui], and [logging]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        for (key, value) in [
            ("system_dir", &self.storage.system_dir),
            ("user_dir", &self.storage.user_dir),
        ] {
            if let Some(dir) = value
                && dir.trim().is_empty()
            {
                bail!(
                    "storage.{key} in {} is empty; remove it to use the default directory",
                    path.display()
                );
            }
        }

        if let Some(secs) = self.ui.status_clear_secs
            && !(1..=MAX_STATUS_CLEAR_SECS).contains(&secs)
        {
            bail!(
                "ui.status_clear_secs in {} must be between 1 and {MAX_STATUS_CLEAR_SECS}, got {secs}",
                path.display()
            );
        }

        if let Some(level) = &self.logging.level {
            EnvFilter::try_new(level).with_context(|| {
                format!(
                    "logging.level {level:?} in {} is not a valid filter; use a level such as \"info\" or \"chewedit_db=debug\"",
                    path.display()
                )
            })?;
        }

        Ok(())
    }

    pub fn system_dir(&self) -> PathBuf {
        match &self.storage.system_dir {
            Some(dir) => PathBuf::from(dir),
            None => chewedit_db::default_system_dir(),
        }
    }

    pub fn user_dir(&self) -> Result<PathBuf> {
        match &self.storage.user_dir {
            Some(dir) => Ok(PathBuf::from(dir)),
            None => chewedit_db::default_user_dir(),
        }
    }

    pub fn status_clear(&self) -> Duration {
        Duration::from_secs(
            self.ui
                .status_clear_secs
                .unwrap_or(DEFAULT_STATUS_CLEAR_SECS),
        )
    }

    /// `CHEWEDIT_LOG` wins over the configured level.
    pub fn log_filter(&self) -> String {
        env::var(LOG_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| {
                self.logging
                    .level
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_owned())
            })
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# chewedit config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is the first entry of CHEWING_PATH, else {}\n# system_dir = \"/usr/share/libchewing\"\n# Optional. Default is CHEWEDIT_USER_DIR, else the platform data dir (for example ~/.local/share/chewing)\n# user_dir = \"/absolute/path/to/chewing\"\n\n[ui]\nstatus_clear_secs = {DEFAULT_STATUS_CLEAR_SECS}\n\n[logging]\n# Overridden by {LOG_ENV}\nlevel = \"{DEFAULT_LOG_LEVEL}\"\n",
            path.display(),
            chewedit_db::default_system_dir().display(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, LOG_ENV};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.status_clear(), Duration::from_secs(4));
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[ui]\nstatus_clear_secs = 3\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[storage], [ui], and [logging]"));
        Ok(())
    }

    #[test]
    fn v1_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[storage]\nsystem_dir = \"/opt/chewing\"\nuser_dir = \"/home/me/chewing\"\n[ui]\nstatus_clear_secs = 9\n[logging]\nlevel = \"chewedit_db=debug\"\n",
        )?;
        let config = Config::load(&path)?;
        assert_eq!(config.system_dir(), PathBuf::from("/opt/chewing"));
        assert_eq!(config.user_dir()?, PathBuf::from("/home/me/chewing"));
        assert_eq!(config.status_clear(), Duration::from_secs(9));
        assert_eq!(config.logging.level.as_deref(), Some("chewedit_db=debug"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn status_clear_is_bounded() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[ui]\nstatus_clear_secs = 0\n")?;
        let error = Config::load(&path).expect_err("zero seconds should fail");
        assert!(error.to_string().contains("between 1 and 60"));
        Ok(())
    }

    #[test]
    fn empty_storage_dir_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[storage]\nuser_dir = \"  \"\n")?;
        let error = Config::load(&path).expect_err("blank dir should fail");
        assert!(error.to_string().contains("storage.user_dir"));
        Ok(())
    }

    #[test]
    fn bad_log_level_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[logging]\nlevel = \"chewedit=loud\"\n")?;
        let error = Config::load(&path).expect_err("bad filter should fail");
        assert!(error.to_string().contains("not a valid filter"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("CHEWEDIT_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("CHEWEDIT_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn user_dir_prefers_config_over_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n[storage]\nuser_dir = \"/from/config\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("CHEWEDIT_USER_DIR", "/from/env");
        }
        let config = Config::load(&path)?;
        let from_config = config.user_dir()?;
        let from_env = Config::default().user_dir()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("CHEWEDIT_USER_DIR");
        }
        assert_eq!(from_config, PathBuf::from("/from/config"));
        assert_eq!(from_env, PathBuf::from("/from/env"));
        Ok(())
    }

    #[test]
    fn log_env_overrides_configured_level() {
        let _guard = env_lock();
        let config = Config::default();
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var(LOG_ENV, "trace");
        }
        let overridden = config.log_filter();
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var(LOG_ENV);
        }
        assert_eq!(overridden, "trace");
        assert_eq!(config.log_filter(), "info");
    }

    #[test]
    fn example_config_parses_as_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        assert!(example.contains("[storage]"));
        assert!(example.contains("[logging]"));

        std::fs::write(&path, example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.status_clear(), Duration::from_secs(4));
        Ok(())
    }
}
