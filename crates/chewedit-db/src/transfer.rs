// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Moving entries between the personal dictionary and outside files.
//!
//! CSV files hold one entry per line as `phrase,bopomofo,frequency`. An
//! optional header line and `#` comment lines are ignored; exported text
//! fields are always quoted so phrases starting with `#` are read back.

use anyhow::{Context, Result, bail};
use chewedit_app::bopomofo::canonical_reading;
use chewedit_app::{DictionaryRecord, coerce_frequency};
use std::path::Path;
use tracing::{debug, info};

use crate::{Catalog, DICTIONARY_EXTENSION, DictionaryFile};

const CSV_HEADER: [&str; 3] = ["phrase", "bopomofo", "frequency"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
}

/// Parsed CSV rows. Rows without a phrase or with an invalid reading are
/// counted in `skipped` instead of failing the whole file.
pub fn read_csv(path: &Path) -> Result<(Vec<DictionaryRecord>, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open CSV file {}", path.display()))?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (line, row) in reader.records().enumerate() {
        let row = row.with_context(|| format!("read CSV file {}", path.display()))?;
        let phrase = row.get(0).unwrap_or("");
        if line == 0 && phrase.eq_ignore_ascii_case(CSV_HEADER[0]) {
            continue;
        }
        let reading = canonical_reading(row.get(1).unwrap_or(""));
        match reading {
            Ok(bopomofo) if !phrase.is_empty() => records.push(DictionaryRecord {
                phrase: phrase.to_owned(),
                bopomofo,
                frequency: coerce_frequency(row.get(2).unwrap_or("")),
            }),
            Ok(_) => {
                debug!(line = line + 1, "skipping CSV row without phrase");
                skipped += 1;
            }
            Err(error) => {
                debug!(line = line + 1, %error, "skipping CSV row with invalid reading");
                skipped += 1;
            }
        }
    }
    Ok((records, skipped))
}

pub fn write_csv(path: &Path, records: &[DictionaryRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::NonNumeric)
        .from_path(path)
        .with_context(|| format!("create CSV file {}", path.display()))?;
    writer
        .write_record(CSV_HEADER)
        .context("write CSV header")?;
    for record in records {
        let frequency = record.frequency.to_string();
        writer
            .write_record([
                record.phrase.as_str(),
                record.bopomofo.as_str(),
                frequency.as_str(),
            ])
            .with_context(|| format!("write CSV row {:?}", record.phrase))?;
    }
    writer
        .flush()
        .with_context(|| format!("flush CSV file {}", path.display()))
}

/// Overwrites the personal dictionary with the entries of `source`, either a
/// CSV file or another dictionary file.
pub fn import_file(catalog: &Catalog, source: &Path) -> Result<ImportReport> {
    let personal_path = catalog.personal_path();
    if source == personal_path {
        bail!(
            "{} is the personal dictionary already -- pick another file to import",
            source.display()
        );
    }

    let is_dictionary = source
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(DICTIONARY_EXTENSION));
    let (records, skipped) = if is_dictionary {
        let entries = DictionaryFile::open_read_only(source)?.entries()?;
        keep_valid(entries)
    } else {
        read_csv(source)?
    };

    let mut personal = catalog.ensure_personal()?;
    personal
        .replace_entries(&records)
        .context("cannot import dictionary")?;

    let report = ImportReport {
        imported: records.len(),
        skipped,
    };
    info!(
        source = %source.display(),
        imported = report.imported,
        skipped = report.skipped,
        "imported dictionary"
    );
    Ok(report)
}

/// Writes the personal dictionary to `dest` as CSV and returns the number of
/// entries written.
pub fn export_csv(catalog: &Catalog, dest: &Path) -> Result<usize> {
    let personal = catalog.ensure_personal()?;
    let records = personal.entries()?;
    write_csv(dest, &records).context("cannot export dictionary")?;
    info!(dest = %dest.display(), entries = records.len(), "exported dictionary");
    Ok(records.len())
}

/// Same rules as [`read_csv`]: entries need a phrase and a valid reading.
fn keep_valid(entries: Vec<DictionaryRecord>) -> (Vec<DictionaryRecord>, usize) {
    let total = entries.len();
    let records: Vec<_> = entries
        .into_iter()
        .filter_map(|record| {
            if record.phrase.trim().is_empty() {
                return None;
            }
            let bopomofo = canonical_reading(&record.bopomofo).ok()?;
            Some(DictionaryRecord { bopomofo, ..record })
        })
        .collect();
    let skipped = total - records.len();
    (records, skipped)
}
