// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow, bail};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::{
    DictionaryRecord, DictionaryResource, FilteredView, MasterIndex, RecordDraft, RecordStore,
    RequestId, Selection, project,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Saved,
    Abandoned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Saving,
    Closed(CloseReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    PickRow(usize),
    Search(String),
    Insert,
    Delete,
    Update(RecordDraft),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    FilterChanged(String),
    ViewRecomputed { rows: usize },
    SelectionChanged(Selection),
    RecordInserted(MasterIndex),
    RecordDeleted(MasterIndex),
    RecordUpdated(MasterIndex),
    ValidationRequested {
        request_id: RequestId,
        bopomofo: String,
    },
    ValidationFailed {
        request_id: RequestId,
        message: String,
    },
    SaveFailed(String),
    Closed(CloseReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavePayload {
    pub path: PathBuf,
    pub records: Vec<DictionaryRecord>,
}

/// Editing state for one opened dictionary.
///
/// The view is recomputed from the store after every filter change and every
/// mutation, and the selection always names a master index that exists in
/// the store. Changing the filter drops the selection even when the selected
/// record stays visible.
#[derive(Debug, Clone)]
pub struct EditSession {
    store: RecordStore,
    filter: String,
    view: FilteredView,
    selection: Selection,
    phase: SessionPhase,
    dirty: bool,
    last_request: RequestId,
    pending_checks: BTreeSet<RequestId>,
}

impl EditSession {
    pub fn open(resource: DictionaryResource, records: Vec<DictionaryRecord>) -> Self {
        info!(
            path = %resource.path.display(),
            category = resource.category.as_str(),
            records = records.len(),
            "open dictionary session"
        );
        let mut store = RecordStore::new(resource);
        store.load(records);
        let view = project(store.records(), "");
        Self {
            store,
            filter: String::new(),
            view,
            selection: Selection::Unselected,
            phase: SessionPhase::Active,
            dirty: false,
            last_request: RequestId::new(0),
            pending_checks: BTreeSet::new(),
        }
    }

    /// Continues request numbering after `last`, so results addressed to an
    /// earlier session never match a check issued by this one.
    pub fn with_requests_after(mut self, last: RequestId) -> Self {
        self.last_request = last;
        self
    }

    /// Most recent reading check id handed out by this session.
    pub const fn last_request(&self) -> RequestId {
        self.last_request
    }

    pub fn resource(&self) -> &DictionaryResource {
        self.store.resource()
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn view(&self) -> &FilteredView {
        &self.view
    }

    pub const fn selection(&self) -> Selection {
        self.selection
    }

    pub fn selected_record(&self) -> Option<&DictionaryRecord> {
        self.selection
            .index()
            .and_then(|index| self.store.get(index))
    }

    /// View row of the current selection, if it is visible.
    pub fn selected_row(&self) -> Option<usize> {
        self.selection
            .index()
            .and_then(|index| self.view.row_of(index))
    }

    pub const fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub const fn is_editable(&self) -> bool {
        self.store.is_editable()
    }

    pub fn can_insert(&self) -> bool {
        self.is_editable() && self.phase == SessionPhase::Active
    }

    pub fn can_delete(&self) -> bool {
        self.can_insert() && self.selection.is_selected()
    }

    pub fn dispatch(&mut self, command: SessionCommand) -> Result<Vec<SessionEvent>> {
        match command {
            SessionCommand::PickRow(row) => self.pick_row(row),
            SessionCommand::Search(text) => self.search(&text),
            SessionCommand::Insert => self.insert(),
            SessionCommand::Delete => self.delete(),
            SessionCommand::Update(draft) => self.update(draft),
        }
    }

    pub fn pick_row(&mut self, row: usize) -> Result<Vec<SessionEvent>> {
        self.ensure_open()?;
        if !self.selection.pick(&self.view, row) {
            return Ok(Vec::new());
        }
        Ok(vec![SessionEvent::SelectionChanged(self.selection)])
    }

    pub fn search(&mut self, text: &str) -> Result<Vec<SessionEvent>> {
        self.ensure_open()?;
        Ok(self.set_filter(text))
    }

    pub fn insert(&mut self) -> Result<Vec<SessionEvent>> {
        self.ensure_mutable()?;
        let index = self.store.insert(DictionaryRecord::blank())?;
        self.dirty = true;
        debug!(%index, "inserted blank record");

        let mut events = vec![SessionEvent::RecordInserted(index)];
        events.extend(self.set_filter(""));
        self.selection.select(index);
        events.push(SessionEvent::SelectionChanged(self.selection));
        Ok(events)
    }

    pub fn delete(&mut self) -> Result<Vec<SessionEvent>> {
        self.ensure_mutable()?;
        let index = self
            .selection
            .index()
            .ok_or_else(|| anyhow!("no entry selected -- pick an entry to delete"))?;
        let removed = self.store.remove(index)?;
        let mut events = Vec::new();
        if removed.is_some() {
            self.dirty = true;
            debug!(%index, "deleted record");
            events.push(SessionEvent::RecordDeleted(index));
        }
        events.push(self.recompute());
        self.selection.clear();
        events.push(SessionEvent::SelectionChanged(self.selection));
        Ok(events)
    }

    pub fn update(&mut self, draft: RecordDraft) -> Result<Vec<SessionEvent>> {
        self.ensure_mutable()?;
        let index = self
            .selection
            .index()
            .ok_or_else(|| anyhow!("no entry selected -- pick an entry to edit"))?;
        self.store.ensure_editable("edit entries in")?;

        let record = draft.into_record();
        self.last_request = self.last_request.next();
        self.pending_checks.insert(self.last_request);
        let mut events = vec![SessionEvent::ValidationRequested {
            request_id: self.last_request,
            bopomofo: record.bopomofo.clone(),
        }];

        if !self.store.update(index, record)? {
            bail!("selected entry {index} is no longer in the dictionary");
        }
        self.dirty = true;
        debug!(%index, "updated record");
        events.push(SessionEvent::RecordUpdated(index));
        events.push(self.recompute());
        Ok(events)
    }

    /// Locks the session and hands out the save payload. Mutations are
    /// rejected until [`EditSession::finish_save`] runs.
    pub fn begin_save(&mut self) -> Result<SavePayload> {
        self.ensure_mutable()?;
        if !self.store.is_editable() {
            bail!(
                "dictionary {:?} is read-only -- only personal dictionaries can be saved",
                self.store.resource().name
            );
        }
        self.phase = SessionPhase::Saving;
        info!(
            path = %self.store.resource().path.display(),
            records = self.store.len(),
            "save started"
        );
        Ok(SavePayload {
            path: self.store.resource().path.clone(),
            records: self.store.snapshot(),
        })
    }

    pub fn finish_save(&mut self, result: Result<()>) -> Vec<SessionEvent> {
        if self.phase != SessionPhase::Saving {
            debug!(phase = ?self.phase, "discarding save response");
            return Vec::new();
        }
        match result {
            Ok(()) => {
                info!("save finished");
                self.dirty = false;
                self.phase = SessionPhase::Closed(CloseReason::Saved);
                vec![SessionEvent::Closed(CloseReason::Saved)]
            }
            Err(error) => {
                let message = format!("{error:#}");
                info!(%message, "save failed");
                self.phase = SessionPhase::Active;
                vec![SessionEvent::SaveFailed(message)]
            }
        }
    }

    pub fn abandon(&mut self) -> Vec<SessionEvent> {
        if matches!(self.phase, SessionPhase::Closed(_)) {
            return Vec::new();
        }
        info!(dirty = self.dirty, "session abandoned");
        self.store.load(Vec::new());
        self.filter.clear();
        self.view = FilteredView::default();
        self.selection.clear();
        self.pending_checks.clear();
        self.dirty = false;
        self.phase = SessionPhase::Closed(CloseReason::Abandoned);
        vec![SessionEvent::Closed(CloseReason::Abandoned)]
    }

    /// Reports the outcome of a reading check. Failures are advisory and the
    /// record that triggered the check stays as it is.
    pub fn validation_finished(
        &mut self,
        request_id: RequestId,
        result: std::result::Result<(), String>,
    ) -> Vec<SessionEvent> {
        if matches!(self.phase, SessionPhase::Closed(_)) {
            return Vec::new();
        }
        if !self.pending_checks.remove(&request_id) {
            debug!(%request_id, "discarding reading check this session did not issue");
            return Vec::new();
        }
        match result {
            Ok(()) => Vec::new(),
            Err(message) => vec![SessionEvent::ValidationFailed {
                request_id,
                message,
            }],
        }
    }

    fn set_filter(&mut self, text: &str) -> Vec<SessionEvent> {
        self.filter.clear();
        self.filter.push_str(text);
        let recomputed = self.recompute();
        self.selection.clear();
        vec![
            SessionEvent::FilterChanged(self.filter.clone()),
            recomputed,
            SessionEvent::SelectionChanged(self.selection),
        ]
    }

    fn recompute(&mut self) -> SessionEvent {
        self.view = project(self.store.records(), &self.filter);
        SessionEvent::ViewRecomputed {
            rows: self.view.len(),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if let SessionPhase::Closed(_) = self.phase {
            bail!("dictionary session is closed -- open the dictionary again");
        }
        Ok(())
    }

    fn ensure_mutable(&self) -> Result<()> {
        self.ensure_open()?;
        if self.phase == SessionPhase::Saving {
            bail!("save in progress -- wait for it to finish before editing");
        }
        Ok(())
    }
}
