// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use chewedit_app::bopomofo::parse_reading;
use chewedit_app::{
    DictionaryCategory, DictionaryInfo, DictionaryRecord, DictionaryResource, FontFamily,
    ImeConfig, RequestId, SavePayload,
};
use chewedit_db::{Catalog, DictionaryFile, ImeStore, personal_info};
use chewedit_tui::{ImportSummary, InternalEvent};
use std::path::Path;
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, warn};

/// Backend for the TUI and the one-shot commands, over the local dictionary
/// directories.
pub struct DictionaryRuntime {
    catalog: Catalog,
    ime: ImeStore,
}

impl DictionaryRuntime {
    pub fn new(catalog: Catalog) -> Self {
        let ime = ImeStore::for_catalog(&catalog);
        Self { catalog, ime }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Touches everything startup needs: the dictionary list (creating the
    /// personal dictionary) and the IME settings.
    pub fn check(&self) -> Result<usize> {
        let resources = self.catalog.explore()?;
        self.ime.load()?.validate()?;
        Ok(resources.len())
    }
}

fn save_payload(catalog: &Catalog, payload: &SavePayload) -> Result<()> {
    let category = catalog.categorize(&payload.path);
    if category != DictionaryCategory::Personal {
        bail!(
            "{} is a {} dictionary -- only the personal dictionary can be saved",
            payload.path.display(),
            category.as_str()
        );
    }
    let mut dictionary = DictionaryFile::create(&payload.path, &personal_info())?;
    dictionary.replace_entries(&payload.records)
}

impl chewedit_tui::AppRuntime for DictionaryRuntime {
    fn explore(&mut self) -> Result<Vec<DictionaryResource>> {
        self.catalog.explore()
    }

    fn dictionary_info(&mut self, resource: &DictionaryResource) -> Result<DictionaryInfo> {
        DictionaryFile::open_read_only(&resource.path)?.info()
    }

    fn load_dictionary(
        &mut self,
        resource: &DictionaryResource,
    ) -> Result<Vec<DictionaryRecord>> {
        DictionaryFile::open_read_only(&resource.path)?.entries()
    }

    fn save_dictionary(&mut self, payload: &SavePayload) -> Result<()> {
        save_payload(&self.catalog, payload)
    }

    fn validate_reading(&mut self, bopomofo: &str) -> Result<()> {
        parse_reading(bopomofo)?;
        Ok(())
    }

    fn import_dictionary(&mut self, source: &Path) -> Result<ImportSummary> {
        let report = chewedit_db::import_file(&self.catalog, source)?;
        Ok(ImportSummary {
            imported: report.imported,
            skipped: report.skipped,
        })
    }

    fn export_dictionary(&mut self, dest: &Path) -> Result<usize> {
        chewedit_db::export_csv(&self.catalog, dest)
    }

    fn load_config(&mut self) -> Result<ImeConfig> {
        self.ime.load()
    }

    fn save_config(&mut self, config: &ImeConfig) -> Result<()> {
        self.ime.save(config)
    }

    fn import_config(&mut self, path: &Path) -> Result<ImeConfig> {
        chewedit_db::import_config(path)
    }

    fn export_config(&mut self, path: &Path, config: &ImeConfig) -> Result<()> {
        chewedit_db::export_config(path, config)
    }

    fn system_fonts(&mut self) -> Result<Vec<FontFamily>> {
        chewedit_db::system_fonts()
    }

    fn spawn_validation(
        &mut self,
        request_id: RequestId,
        bopomofo: &str,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let bopomofo = bopomofo.to_owned();
        thread::Builder::new()
            .name("chewedit-validate".to_owned())
            .spawn(move || {
                let result = parse_reading(&bopomofo)
                    .map(|_| ())
                    .map_err(|error| error.to_string());
                debug!(%request_id, ok = result.is_ok(), "reading checked");
                if tx
                    .send(InternalEvent::ValidationFinished { request_id, result })
                    .is_err()
                {
                    debug!(%request_id, "reading check finished after the UI exited");
                }
            })
            .context("spawn reading check worker")?;
        Ok(())
    }

    fn spawn_save(&mut self, payload: SavePayload, tx: Sender<InternalEvent>) -> Result<()> {
        let catalog = self.catalog.clone();
        thread::Builder::new()
            .name("chewedit-save".to_owned())
            .spawn(move || {
                let result =
                    save_payload(&catalog, &payload).map_err(|error| format!("{error:#}"));
                if let Err(message) = &result {
                    warn!(path = %payload.path.display(), %message, "save failed");
                }
                if tx
                    .send(InternalEvent::SaveFinished {
                        path: payload.path,
                        result,
                    })
                    .is_err()
                {
                    warn!("save finished after the UI exited");
                }
            })
            .context("spawn save worker")?;
        Ok(())
    }
}
