// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DictionaryRecord {
    pub phrase: String,
    pub bopomofo: String,
    pub frequency: u32,
}

impl DictionaryRecord {
    pub fn new(phrase: impl Into<String>, bopomofo: impl Into<String>, frequency: u32) -> Self {
        Self {
            phrase: phrase.into(),
            bopomofo: bopomofo.into(),
            frequency,
        }
    }

    /// The record appended by an insert: empty phrase and reading, frequency 0.
    pub fn blank() -> Self {
        Self::default()
    }
}

/// Raw text of the phrase form before it becomes a record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordDraft {
    pub phrase: String,
    pub bopomofo: String,
    pub frequency: String,
}

impl RecordDraft {
    pub fn from_record(record: &DictionaryRecord) -> Self {
        Self {
            phrase: record.phrase.clone(),
            bopomofo: record.bopomofo.clone(),
            frequency: record.frequency.to_string(),
        }
    }

    pub fn into_record(self) -> DictionaryRecord {
        DictionaryRecord {
            frequency: coerce_frequency(&self.frequency),
            phrase: self.phrase,
            bopomofo: self.bopomofo,
        }
    }
}

/// Parses a frequency field. Anything that is not a non-negative integer
/// that fits in `u32` becomes 0.
pub fn coerce_frequency(input: &str) -> u32 {
    input.trim().parse::<u32>().unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DictionaryCategory {
    System,
    Extension,
    Personal,
}

impl DictionaryCategory {
    pub const ALL: [Self; 3] = [Self::System, Self::Extension, Self::Personal];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Extension => "extension",
            Self::Personal => "personal",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "system" => Some(Self::System),
            "extension" => Some(Self::Extension),
            "personal" => Some(Self::Personal),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::System => "系統",
            Self::Extension => "擴充",
            Self::Personal => "個人",
        }
    }

    pub const fn is_editable(self) -> bool {
        matches!(self, Self::Personal)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryResource {
    pub category: DictionaryCategory,
    pub name: String,
    pub path: PathBuf,
}

impl DictionaryResource {
    pub fn new(category: DictionaryCategory, name: impl Into<String>, path: &Path) -> Self {
        Self {
            category,
            name: name.into(),
            path: path.to_path_buf(),
        }
    }

    pub const fn is_editable(&self) -> bool {
        self.category.is_editable()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryInfo {
    pub name: String,
    pub version: String,
    pub copyright: String,
    pub license: String,
    pub software: String,
}

impl DictionaryInfo {
    pub fn rows(&self) -> [(&'static str, &str); 5] {
        [
            ("名稱", self.name.as_str()),
            ("版本", self.version.as_str()),
            ("著作權", self.copyright.as_str()),
            ("授權方式", self.license.as_str()),
            ("製作軟體", self.software.as_str()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FontFamily {
    pub name: String,
    pub display_name: String,
}
