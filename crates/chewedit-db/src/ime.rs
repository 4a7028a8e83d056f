// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use chewedit_app::{ImeConfig, TsfSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::Catalog;

pub const SETTINGS_FILE: &str = "chewedit-ime.toml";
pub const SYMBOLS_FILE: &str = "symbols.dat";
pub const SWKB_FILE: &str = "swkb.dat";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct SettingsFile {
    chewing_tsf: TsfSettings,
}

/// Persists the input method configuration. Settings live in a TOML file in
/// the user directory; the symbol tables are plain text files that fall back
/// to the system copies until the user changes them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImeStore {
    system_dir: PathBuf,
    user_dir: PathBuf,
}

impl ImeStore {
    pub fn new(system_dir: impl Into<PathBuf>, user_dir: impl Into<PathBuf>) -> Self {
        Self {
            system_dir: system_dir.into(),
            user_dir: user_dir.into(),
        }
    }

    pub fn for_catalog(catalog: &Catalog) -> Self {
        Self::new(catalog.system_dir(), catalog.user_dir())
    }

    pub fn settings_path(&self) -> PathBuf {
        self.user_dir.join(SETTINGS_FILE)
    }

    pub fn load(&self) -> Result<ImeConfig> {
        let path = self.settings_path();
        let chewing_tsf = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("read IME settings {}", path.display()))?;
            let file: SettingsFile = toml::from_str(&content).with_context(|| {
                format!(
                    "parse IME settings {} -- fix the file or delete it to restore defaults",
                    path.display()
                )
            })?;
            file.chewing_tsf
        } else {
            debug!(path = %path.display(), "no IME settings yet, using defaults");
            TsfSettings::default()
        };

        Ok(ImeConfig {
            symbols_dat: self.read_table(SYMBOLS_FILE)?,
            swkb_dat: self.read_table(SWKB_FILE)?,
            chewing_tsf,
        })
    }

    pub fn save(&self, config: &ImeConfig) -> Result<()> {
        config.validate().context("cannot save IME settings")?;
        fs::create_dir_all(&self.user_dir)
            .with_context(|| format!("create user directory {}", self.user_dir.display()))?;

        let path = self.settings_path();
        let content = toml::to_string_pretty(&SettingsFile {
            chewing_tsf: config.chewing_tsf.clone(),
        })
        .context("encode IME settings")?;
        fs::write(&path, content)
            .with_context(|| format!("write IME settings {}", path.display()))?;

        self.write_table(SYMBOLS_FILE, &config.symbols_dat)?;
        self.write_table(SWKB_FILE, &config.swkb_dat)?;
        info!(path = %path.display(), "IME settings saved");
        Ok(())
    }

    fn read_table(&self, name: &str) -> Result<String> {
        for dir in [&self.user_dir, &self.system_dir] {
            let path = dir.join(name);
            if path.is_file() {
                return fs::read_to_string(&path)
                    .with_context(|| format!("read {}", path.display()));
            }
        }
        Ok(String::new())
    }

    /// Writes a user copy only when it differs from the system table.
    fn write_table(&self, name: &str, content: &str) -> Result<()> {
        let system_path = self.system_dir.join(name);
        let system = fs::read_to_string(&system_path).unwrap_or_default();
        let user_path = self.user_dir.join(name);
        if content == system && !user_path.exists() {
            return Ok(());
        }
        fs::write(&user_path, content).with_context(|| format!("write {}", user_path.display()))
    }
}

pub fn import_config(path: &Path) -> Result<ImeConfig> {
    let content =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let config: ImeConfig = toml::from_str(&content)
        .with_context(|| format!("{} is not a valid settings file", path.display()))?;
    config.validate()?;
    info!(path = %path.display(), "IME settings imported");
    Ok(config)
}

pub fn export_config(path: &Path, config: &ImeConfig) -> Result<()> {
    let content = toml::to_string_pretty(config).context("encode IME settings")?;
    fs::write(path, content).with_context(|| format!("write {}", path.display()))?;
    info!(path = %path.display(), "IME settings exported");
    Ok(())
}
