// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use chewedit_app::{DictionaryCategory, DictionaryResource};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::{DICTIONARY_EXTENSION, DictionaryFile, personal_info};

pub const PERSONAL_FILE: &str = "chewing.sqlite3";
pub const DROP_IN_DIR: &str = "drop-in";

const FALLBACK_SYSTEM_DIR: &str = "/usr/share/libchewing";

/// First entry of `CHEWING_PATH`, else the packaged dictionary directory.
pub fn default_system_dir() -> PathBuf {
    env::var_os("CHEWING_PATH")
        .and_then(|value| env::split_paths(&value).find(|path| !path.as_os_str().is_empty()))
        .unwrap_or_else(|| PathBuf::from(FALLBACK_SYSTEM_DIR))
}

pub fn default_user_dir() -> Result<PathBuf> {
    if let Some(override_dir) = env::var_os("CHEWEDIT_USER_DIR") {
        return Ok(PathBuf::from(override_dir));
    }
    let data_root = dirs::data_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set CHEWEDIT_USER_DIR to a writable directory")
    })?;
    Ok(data_root.join("chewing"))
}

/// Where dictionaries live: read-only system files, drop-in extensions under
/// the system directory, and the single personal dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    system_dir: PathBuf,
    user_dir: PathBuf,
}

impl Catalog {
    pub fn new(system_dir: impl Into<PathBuf>, user_dir: impl Into<PathBuf>) -> Self {
        Self {
            system_dir: system_dir.into(),
            user_dir: user_dir.into(),
        }
    }

    pub fn system_dir(&self) -> &Path {
        &self.system_dir
    }

    pub fn user_dir(&self) -> &Path {
        &self.user_dir
    }

    pub fn drop_in_dir(&self) -> PathBuf {
        self.system_dir.join(DROP_IN_DIR)
    }

    pub fn personal_path(&self) -> PathBuf {
        self.user_dir.join(PERSONAL_FILE)
    }

    /// Opens the personal dictionary, creating an empty one on first use.
    pub fn ensure_personal(&self) -> Result<DictionaryFile> {
        DictionaryFile::create(&self.personal_path(), &personal_info())
            .context("open personal dictionary")
    }

    pub fn explore(&self) -> Result<Vec<DictionaryResource>> {
        let personal_path = self.personal_path();
        let mut resources = scan_dir(&self.system_dir, DictionaryCategory::System)?;
        resources.extend(scan_dir(&self.drop_in_dir(), DictionaryCategory::Extension)?);
        resources.retain(|resource| resource.path != personal_path);

        let personal = self.ensure_personal()?;
        let name = display_name(&personal, &personal_path);
        resources.push(DictionaryResource::new(
            DictionaryCategory::Personal,
            name,
            &personal_path,
        ));

        debug!(count = resources.len(), "explored dictionaries");
        Ok(resources)
    }

    /// Category of `path` as [`Catalog::explore`] would report it.
    pub fn categorize(&self, path: &Path) -> DictionaryCategory {
        if path == self.personal_path() {
            DictionaryCategory::Personal
        } else if path.parent() == Some(self.drop_in_dir().as_path()) {
            DictionaryCategory::Extension
        } else {
            DictionaryCategory::System
        }
    }
}

fn scan_dir(dir: &Path, category: DictionaryCategory) -> Result<Vec<DictionaryResource>> {
    if !dir.is_dir() {
        debug!(dir = %dir.display(), "dictionary directory missing, skipping");
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("read dictionary dir {}", dir.display()))?
    {
        let path = entry?.path();
        let is_dictionary = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(DICTIONARY_EXTENSION));
        if is_dictionary {
            paths.push(path);
        }
    }
    paths.sort();

    let mut resources = Vec::with_capacity(paths.len());
    for path in paths {
        match DictionaryFile::open_read_only(&path) {
            Ok(dictionary) => {
                let name = display_name(&dictionary, &path);
                resources.push(DictionaryResource::new(category, name, &path));
            }
            Err(error) => {
                warn!(path = %path.display(), error = %format!("{error:#}"), "skipping unreadable dictionary");
            }
        }
    }
    Ok(resources)
}

fn display_name(dictionary: &DictionaryFile, path: &Path) -> String {
    match dictionary.info() {
        Ok(info) if !info.name.trim().is_empty() => info.name,
        _ => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
    }
}
