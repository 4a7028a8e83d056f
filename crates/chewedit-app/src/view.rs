// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{DictionaryRecord, MasterIndex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewRow {
    pub index: MasterIndex,
    pub record: DictionaryRecord,
}

/// Rows of the record sequence whose phrase contains the filter text, in
/// master order. Built by [`project`]; never edited in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredView {
    filter: String,
    rows: Vec<ViewRow>,
}

impl FilteredView {
    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn rows(&self) -> &[ViewRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, row: usize) -> Option<&ViewRow> {
        self.rows.get(row)
    }

    pub fn master_index_at(&self, row: usize) -> Option<MasterIndex> {
        self.rows.get(row).map(|entry| entry.index)
    }

    pub fn row_of(&self, index: MasterIndex) -> Option<usize> {
        self.rows.iter().position(|entry| entry.index == index)
    }
}

pub fn matches_filter(record: &DictionaryRecord, filter: &str) -> bool {
    record.phrase.contains(filter)
}

pub fn project(records: &[DictionaryRecord], filter: &str) -> FilteredView {
    let rows = records
        .iter()
        .enumerate()
        .filter(|(_, record)| matches_filter(record, filter))
        .map(|(index, record)| ViewRow {
            index: MasterIndex::new(index),
            record: record.clone(),
        })
        .collect();
    FilteredView {
        filter: filter.to_owned(),
        rows,
    }
}
