// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod catalog;
pub mod fonts;
pub mod ime;
pub mod transfer;

pub use catalog::{Catalog, default_system_dir, default_user_dir};
pub use fonts::{font_dirs, scan_fonts, system_fonts};
pub use ime::{ImeStore, export_config, import_config};
pub use transfer::{ImportReport, export_csv, import_file, read_csv, write_csv};

use anyhow::{Context, Result, anyhow, bail};
use chewedit_app::bopomofo::canonical_reading;
use chewedit_app::{DictionaryInfo, DictionaryRecord};
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::{debug, info};

pub const APP_NAME: &str = "chewedit";
pub const SOFTWARE_NAME: &str = concat!("chewedit ", env!("CARGO_PKG_VERSION"));
pub const DICTIONARY_EXTENSION: &str = "sqlite3";

const REQUIRED_SCHEMA: &[(&str, &[&str])] = &[
    ("info", &["key", "value"]),
    ("entries", &["id", "phrase", "bopomofo", "frequency"]),
];

const INFO_NAME: &str = "name";
const INFO_VERSION: &str = "version";
const INFO_COPYRIGHT: &str = "copyright";
const INFO_LICENSE: &str = "license";
const INFO_SOFTWARE: &str = "software";
const INFO_UPDATED_AT: &str = "updated_at";

/// Info written into a freshly created personal dictionary.
pub fn personal_info() -> DictionaryInfo {
    DictionaryInfo {
        name: "我的詞庫".to_owned(),
        version: "1.0.0".to_owned(),
        copyright: "Unknown".to_owned(),
        license: "Unknown".to_owned(),
        software: SOFTWARE_NAME.to_owned(),
    }
}

/// One dictionary file: an `info` key/value table and the ordered `entries`.
pub struct DictionaryFile {
    conn: Connection,
    path: Option<PathBuf>,
}

impl DictionaryFile {
    pub fn open_read_only(path: &Path) -> Result<Self> {
        Self::open_existing(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
    }

    /// Opens `path`, creating the file and its schema with `info` when it
    /// does not exist yet.
    pub fn create(path: &Path, info: &DictionaryInfo) -> Result<Self> {
        validate_db_path(&path.to_string_lossy())?;
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dictionary directory {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("open dictionary at {}", path.display()))?;
        configure_connection(&conn)?;
        let dictionary = Self {
            conn,
            path: Some(path.to_path_buf()),
        };
        if !has_user_tables(&dictionary.conn)? {
            info!(path = %path.display(), "creating dictionary");
            dictionary.bootstrap()?;
            dictionary.set_info(info)?;
        } else {
            validate_schema(&dictionary.conn)?;
        }
        Ok(dictionary)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory dictionary")?;
        configure_connection(&conn)?;
        Ok(Self { conn, path: None })
    }

    fn open_existing(path: &Path, flags: OpenFlags) -> Result<Self> {
        validate_db_path(&path.to_string_lossy())?;
        if !path.is_file() {
            bail!(
                "dictionary {} does not exist -- pick one from the dictionary list",
                path.display()
            );
        }
        let conn = Connection::open_with_flags(path, flags)
            .with_context(|| format!("open dictionary at {}", path.display()))?;
        configure_connection(&conn)?;
        if !has_user_tables(&conn)? {
            bail!(
                "{} is not a dictionary file -- import it instead of opening it",
                path.display()
            );
        }
        validate_schema(&conn)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn bootstrap(&self) -> Result<()> {
        if has_user_tables(&self.conn)? {
            validate_schema(&self.conn)?;
        } else {
            self.conn
                .execute_batch(include_str!("sql/schema.sql"))
                .context("create schema")?;
        }
        Ok(())
    }

    pub fn entries(&self) -> Result<Vec<DictionaryRecord>> {
        let mut stmt = self
            .conn
            .prepare(
                "
                SELECT phrase, bopomofo, frequency
                FROM entries
                ORDER BY id ASC
                ",
            )
            .context("prepare entries query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DictionaryRecord {
                    phrase: row.get(0)?,
                    bopomofo: row.get(1)?,
                    frequency: row.get(2)?,
                })
            })
            .context("query entries")?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("collect entries")
    }

    /// Replaces every entry with `records`, keeping their order. Readings are
    /// checked first and written back in canonical form; nothing is written
    /// if any of them is invalid.
    pub fn replace_entries(&mut self, records: &[DictionaryRecord]) -> Result<()> {
        let readings = check_readings(records)?;
        let now = now_rfc3339()?;

        let tx = self
            .conn
            .transaction()
            .context("begin dictionary transaction")?;
        tx.execute("DELETE FROM entries", [])
            .context("clear entries")?;
        {
            let mut stmt = tx
                .prepare("INSERT INTO entries (phrase, bopomofo, frequency) VALUES (?, ?, ?)")
                .context("prepare entry insert")?;
            for (record, reading) in records.iter().zip(&readings) {
                stmt.execute(params![record.phrase, reading, record.frequency])
                    .with_context(|| format!("insert entry {:?}", record.phrase))?;
            }
        }
        for (key, value) in [(INFO_SOFTWARE, SOFTWARE_NAME), (INFO_UPDATED_AT, now.as_str())] {
            put_info(&tx, key, value)?;
        }
        tx.commit().context("commit dictionary transaction")?;

        info!(
            path = ?self.path,
            entries = records.len(),
            "dictionary entries replaced"
        );
        Ok(())
    }

    pub fn info(&self) -> Result<DictionaryInfo> {
        Ok(DictionaryInfo {
            name: self.info_value(INFO_NAME)?.unwrap_or_default(),
            version: self.info_value(INFO_VERSION)?.unwrap_or_default(),
            copyright: self.info_value(INFO_COPYRIGHT)?.unwrap_or_default(),
            license: self.info_value(INFO_LICENSE)?.unwrap_or_default(),
            software: self.info_value(INFO_SOFTWARE)?.unwrap_or_default(),
        })
    }

    pub fn set_info(&self, info: &DictionaryInfo) -> Result<()> {
        for (key, value) in [
            (INFO_NAME, &info.name),
            (INFO_VERSION, &info.version),
            (INFO_COPYRIGHT, &info.copyright),
            (INFO_LICENSE, &info.license),
            (INFO_SOFTWARE, &info.software),
        ] {
            put_info(&self.conn, key, value)?;
        }
        debug!(name = %info.name, "dictionary info written");
        Ok(())
    }

    fn info_value(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM info WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("read dictionary info {key}"))
    }
}

/// Checks every reading and returns them in canonical form. The error names
/// the first offending entry by its 1-based position.
pub fn check_readings(records: &[DictionaryRecord]) -> Result<Vec<String>> {
    records
        .iter()
        .enumerate()
        .map(|(position, record)| {
            canonical_reading(&record.bopomofo).map_err(|error| {
                anyhow!(
                    "entry {} ({:?}) has an invalid reading: {error}",
                    position + 1,
                    record.phrase
                )
            })
        })
        .collect()
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("dictionary path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "dictionary path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("dictionary path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    if path.contains('?') {
        bail!(
            "dictionary path {path:?} contains '?'; remove query parameters and use a plain file path"
        );
    }

    Ok(())
}

fn put_info(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "
        INSERT INTO info (key, value)
        VALUES (?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value
        ",
        params![key, value],
    )
    .with_context(|| format!("write dictionary info {key}"))?;
    Ok(())
}

fn has_user_tables(conn: &Connection) -> Result<bool> {
    let count: i64 = conn
        .query_row(
            "
            SELECT COUNT(*)
            FROM sqlite_master
            WHERE type = 'table'
              AND name NOT LIKE 'sqlite_%'
            ",
            [],
            |row| row.get(0),
        )
        .context("count user tables")?;
    Ok(count > 0)
}

fn validate_schema(conn: &Connection) -> Result<()> {
    for (table, required_columns) in REQUIRED_SCHEMA {
        let columns = table_columns(conn, table)?;
        if columns.is_empty() {
            bail!(
                "dictionary is missing required table `{table}`; use a chewedit dictionary or import the file"
            );
        }

        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|column| !columns.contains(*column))
            .collect();
        if !missing.is_empty() {
            bail!(
                "table `{table}` is missing required columns: {}; re-import the dictionary",
                missing.join(", ")
            );
        }
    }
    Ok(())
}

fn table_columns(conn: &Connection, table: &str) -> Result<BTreeSet<String>> {
    let mut stmt = conn
        .prepare(&format!("PRAGMA table_info({table})"))
        .with_context(|| format!("inspect columns for {table}"))?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(1))
        .with_context(|| format!("query column info for {table}"))?;

    rows.collect::<rusqlite::Result<BTreeSet<_>>>()
        .with_context(|| format!("collect columns for {table}"))
}

fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        PRAGMA foreign_keys = ON;
        PRAGMA busy_timeout = 5000;
        ",
    )
    .context("configure sqlite pragmas")
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current timestamp")
}
