// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use chewedit_app::{DictionaryCategory, DictionaryRecord, DictionaryResource};
use std::fs;
use std::path::PathBuf;

const WORDS: [(&str, &str); 16] = [
    ("新", "ㄒㄧㄣ"),
    ("酷", "ㄎㄨˋ"),
    ("音", "ㄧㄣ"),
    ("注", "ㄓㄨˋ"),
    ("詞", "ㄘˊ"),
    ("庫", "ㄎㄨˋ"),
    ("輸", "ㄕㄨ"),
    ("入", "ㄖㄨˋ"),
    ("法", "ㄈㄚˇ"),
    ("電", "ㄉㄧㄢˋ"),
    ("腦", "ㄋㄠˇ"),
    ("中", "ㄓㄨㄥ"),
    ("文", "ㄨㄣˊ"),
    ("字", "ㄗˋ"),
    ("典", "ㄉㄧㄢˇ"),
    ("的", "ㄉㄜ˙"),
];

/// Two records used throughout the session tests.
pub fn sample_records() -> Vec<DictionaryRecord> {
    vec![
        DictionaryRecord::new("a", "ㄚ", 5),
        DictionaryRecord::new("b", "ㄅ", 3),
    ]
}

pub fn chinese_records() -> Vec<DictionaryRecord> {
    vec![
        DictionaryRecord::new("新酷音", "ㄒㄧㄣ ㄎㄨˋ ㄧㄣ", 12),
        DictionaryRecord::new("注音", "ㄓㄨˋ ㄧㄣ", 8),
        DictionaryRecord::new("詞庫", "ㄘˊ ㄎㄨˋ", 0),
    ]
}

pub fn resource(category: DictionaryCategory, path: PathBuf) -> DictionaryResource {
    DictionaryResource {
        category,
        name: format!("{} fixture", category.as_str()),
        path,
    }
}

/// A temporary system/user directory pair. The drop-in directory exists but
/// is empty.
pub struct Dirs {
    pub root: tempfile::TempDir,
    pub system: PathBuf,
    pub user: PathBuf,
}

impl Dirs {
    pub fn new() -> Result<Self> {
        let root = tempfile::tempdir().context("create temp dir")?;
        let system = root.path().join("system");
        let user = root.path().join("user");
        fs::create_dir_all(system.join("drop-in")).context("create system dirs")?;
        Ok(Self { root, system, user })
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.root.path().join(name)
    }
}

pub fn csv_text(records: &[DictionaryRecord]) -> String {
    let mut text = String::from("phrase,bopomofo,frequency\n");
    for record in records {
        text.push_str(&format!(
            "{},{},{}\n",
            record.phrase, record.bopomofo, record.frequency
        ));
    }
    text
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of valid dictionary records.
#[derive(Debug, Clone)]
pub struct PhraseFaker {
    rng: DeterministicRng,
}

impl PhraseFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    pub fn record(&mut self) -> DictionaryRecord {
        let length = 1 + self.rng.int_n(4);
        let mut phrase = String::new();
        let mut readings = Vec::with_capacity(length);
        for _ in 0..length {
            let (word, reading) = WORDS[self.rng.int_n(WORDS.len())];
            phrase.push_str(word);
            readings.push(reading);
        }
        let frequency = self.rng.int_n(1000) as u32;
        DictionaryRecord::new(phrase, readings.join(" "), frequency)
    }

    pub fn records(&mut self, count: usize) -> Vec<DictionaryRecord> {
        (0..count).map(|_| self.record()).collect()
    }
}
