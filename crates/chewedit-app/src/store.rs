// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::{DictionaryRecord, DictionaryResource, MasterIndex};

/// The authoritative record sequence of one opened dictionary.
///
/// Editability is taken from the resource category when the store is created
/// and never changes afterwards. Duplicated phrase/reading pairs are allowed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStore {
    resource: DictionaryResource,
    editable: bool,
    records: Vec<DictionaryRecord>,
}

impl RecordStore {
    pub fn new(resource: DictionaryResource) -> Self {
        let editable = resource.is_editable();
        Self {
            resource,
            editable,
            records: Vec::new(),
        }
    }

    pub fn resource(&self) -> &DictionaryResource {
        &self.resource
    }

    pub const fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: MasterIndex) -> Option<&DictionaryRecord> {
        self.records.get(index.get())
    }

    pub fn contains(&self, index: MasterIndex) -> bool {
        index.get() < self.records.len()
    }

    pub fn load(&mut self, records: Vec<DictionaryRecord>) {
        self.records = records;
    }

    pub fn insert(&mut self, record: DictionaryRecord) -> Result<MasterIndex> {
        self.ensure_editable("add entries to")?;
        self.records.push(record);
        Ok(MasterIndex::new(self.records.len() - 1))
    }

    /// Removes the record at `index`; an index past the end is a no-op.
    pub fn remove(&mut self, index: MasterIndex) -> Result<Option<DictionaryRecord>> {
        self.ensure_editable("delete entries from")?;
        if !self.contains(index) {
            return Ok(None);
        }
        Ok(Some(self.records.remove(index.get())))
    }

    pub fn update(&mut self, index: MasterIndex, record: DictionaryRecord) -> Result<bool> {
        self.ensure_editable("edit entries in")?;
        match self.records.get_mut(index.get()) {
            Some(slot) => {
                *slot = record;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn records(&self) -> &[DictionaryRecord] {
        &self.records
    }

    pub fn snapshot(&self) -> Vec<DictionaryRecord> {
        self.records.clone()
    }

    /// Fails with a message naming the dictionary when it is read-only.
    pub fn ensure_editable(&self, action: &str) -> Result<()> {
        if !self.editable {
            bail!(
                "cannot {action} {} dictionary {:?} -- only personal dictionaries are editable",
                self.resource.category.as_str(),
                self.resource.name
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::RecordStore;
    use crate::{DictionaryCategory, DictionaryRecord, DictionaryResource, MasterIndex};
    use anyhow::Result;
    use std::path::Path;

    fn personal() -> RecordStore {
        RecordStore::new(DictionaryResource::new(
            DictionaryCategory::Personal,
            "我的詞庫",
            Path::new("/tmp/chewing.sqlite3"),
        ))
    }

    fn records() -> Vec<DictionaryRecord> {
        vec![
            DictionaryRecord::new("a", "ㄚ", 5),
            DictionaryRecord::new("b", "ㄅ", 3),
        ]
    }

    #[test]
    fn snapshot_after_load_is_verbatim() {
        let mut store = personal();
        store.load(records());
        assert_eq!(store.snapshot(), records());
    }

    #[test]
    fn insert_appends_and_returns_last_index() -> Result<()> {
        let mut store = personal();
        store.load(records());
        let index = store.insert(DictionaryRecord::blank())?;
        assert_eq!(index, MasterIndex::new(2));
        assert_eq!(store.get(index), Some(&DictionaryRecord::blank()));
        Ok(())
    }

    #[test]
    fn remove_shifts_following_records() -> Result<()> {
        let mut store = personal();
        store.load(records());
        let removed = store.remove(MasterIndex::new(0))?;
        assert_eq!(removed, Some(DictionaryRecord::new("a", "ㄚ", 5)));
        assert_eq!(store.get(MasterIndex::new(0)), Some(&records()[1]));
        Ok(())
    }

    #[test]
    fn remove_missing_index_is_noop() -> Result<()> {
        let mut store = personal();
        store.load(records());
        assert_eq!(store.remove(MasterIndex::new(9))?, None);
        assert_eq!(store.snapshot(), records());
        Ok(())
    }

    #[test]
    fn update_replaces_in_place() -> Result<()> {
        let mut store = personal();
        store.load(records());
        assert!(store.update(MasterIndex::new(1), DictionaryRecord::new("c", "ㄘ", 1))?);
        assert_eq!(store.records()[1].phrase, "c");
        assert!(!store.update(MasterIndex::new(5), DictionaryRecord::blank())?);
        Ok(())
    }

    #[test]
    fn duplicates_are_permitted() -> Result<()> {
        let mut store = personal();
        store.insert(DictionaryRecord::new("a", "ㄚ", 1))?;
        store.insert(DictionaryRecord::new("a", "ㄚ", 1))?;
        assert_eq!(store.len(), 2);
        Ok(())
    }

    #[test]
    fn read_only_store_rejects_mutation() {
        let mut store = RecordStore::new(DictionaryResource::new(
            DictionaryCategory::System,
            "內建詞庫",
            Path::new("/usr/share/chewing/tsi.dat"),
        ));
        store.load(records());

        let error = store
            .insert(DictionaryRecord::blank())
            .expect_err("system dictionary should be read-only");
        assert!(error.to_string().contains("only personal dictionaries"));
        assert!(store.remove(MasterIndex::new(0)).is_err());
        assert!(store.update(MasterIndex::new(0), DictionaryRecord::blank()).is_err());
        assert_eq!(store.snapshot(), records());
    }
}
