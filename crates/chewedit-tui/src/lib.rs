// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use chewedit_app::keymap::{self, Keymap};
use chewedit_app::{
    AppCommand, AppMode, AppState, CloseReason, DictionaryInfo, DictionaryRecord,
    DictionaryResource, EditSession, FontFamily, FormKind, ImeConfig, KEYBIND_ACTIONS, RecordDraft,
    RequestId, SavePayload, Screen, Selection, SessionEvent, SessionPhase, conv_engine_label,
    english_layout_label, keyboard_layout_label, sel_keys_label, update_channel_label,
};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{execute, terminal};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Tabs};
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

const UNBOUND: &str = "(unbound)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    /// How long a status message stays before it is cleared.
    pub status_clear: Duration,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            status_clear: Duration::from_secs(4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

/// Backend operations the interface needs. Reading checks and saves are
/// started through the `spawn_*` methods and report back on the internal
/// channel; the provided versions run inline and post their result.
pub trait AppRuntime {
    fn explore(&mut self) -> Result<Vec<DictionaryResource>>;
    fn dictionary_info(&mut self, resource: &DictionaryResource) -> Result<DictionaryInfo>;
    fn load_dictionary(&mut self, resource: &DictionaryResource)
    -> Result<Vec<DictionaryRecord>>;
    fn save_dictionary(&mut self, payload: &SavePayload) -> Result<()>;
    fn validate_reading(&mut self, bopomofo: &str) -> Result<()>;
    fn import_dictionary(&mut self, source: &Path) -> Result<ImportSummary>;
    fn export_dictionary(&mut self, dest: &Path) -> Result<usize>;
    fn load_config(&mut self) -> Result<ImeConfig>;
    fn save_config(&mut self, config: &ImeConfig) -> Result<()>;
    fn import_config(&mut self, path: &Path) -> Result<ImeConfig>;
    fn export_config(&mut self, path: &Path, config: &ImeConfig) -> Result<()>;
    fn system_fonts(&mut self) -> Result<Vec<FontFamily>>;
    fn spawn_validation(
        &mut self,
        request_id: RequestId,
        bopomofo: &str,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let result = self
            .validate_reading(bopomofo)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::ValidationFinished { request_id, result })
            .map_err(|_| anyhow!("validation event channel closed"))?;
        Ok(())
    }
    fn spawn_save(&mut self, payload: SavePayload, tx: Sender<InternalEvent>) -> Result<()> {
        let result = self
            .save_dictionary(&payload)
            .map_err(|error| format!("{error:#}"));
        tx.send(InternalEvent::SaveFinished {
            path: payload.path,
            result,
        })
        .map_err(|_| anyhow!("save event channel closed"))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InternalEvent {
    ClearStatus {
        token: u64,
    },
    ValidationFinished {
        request_id: RequestId,
        result: std::result::Result<(), String>,
    },
    SaveFinished {
        path: PathBuf,
        result: std::result::Result<(), String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhraseField {
    Phrase,
    Bopomofo,
    Frequency,
}

impl PhraseField {
    const ALL: [Self; 3] = [Self::Phrase, Self::Bopomofo, Self::Frequency];

    const fn label(self) -> &'static str {
        match self {
            Self::Phrase => "phrase",
            Self::Bopomofo => "bopomofo",
            Self::Frequency => "frequency",
        }
    }

    fn step(self, delta: isize) -> Self {
        let current = Self::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0) as isize;
        let len = Self::ALL.len() as isize;
        Self::ALL[(current + delta).rem_euclid(len) as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PhraseForm {
    draft: RecordDraft,
    field: PhraseField,
    compose: Option<&'static Keymap>,
}

impl PhraseForm {
    fn new(draft: RecordDraft) -> Self {
        Self {
            draft,
            field: PhraseField::Phrase,
            compose: None,
        }
    }

    fn value(&self, field: PhraseField) -> &str {
        match field {
            PhraseField::Phrase => &self.draft.phrase,
            PhraseField::Bopomofo => &self.draft.bopomofo,
            PhraseField::Frequency => &self.draft.frequency,
        }
    }

    fn field_mut(&mut self) -> &mut String {
        match self.field {
            PhraseField::Phrase => &mut self.draft.phrase,
            PhraseField::Bopomofo => &mut self.draft.bopomofo,
            PhraseField::Frequency => &mut self.draft.frequency,
        }
    }

    /// Typed keys on the reading field go through the keymap while
    /// composition is on.
    fn type_char(&mut self, ch: char) {
        let symbol = match (self.field, self.compose) {
            (PhraseField::Bopomofo, Some(keymap)) => keymap.symbol_for(ch),
            _ => None,
        };
        match symbol {
            Some(symbol) => self.field_mut().push_str(symbol),
            None => self.field_mut().push(ch),
        }
    }

    fn toggle_compose(&mut self) {
        self.compose = match self.compose {
            Some(_) => None,
            None => Some(&keymap::STANDARD),
        };
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptKind {
    ImportDictionary,
    ExportDictionary,
    ImportConfig,
    ExportConfig,
    Keybinding { action: &'static str },
}

impl PromptKind {
    const fn form_kind(self) -> FormKind {
        match self {
            Self::ImportDictionary | Self::ImportConfig => FormKind::ImportPath,
            Self::ExportDictionary | Self::ExportConfig => FormKind::ExportPath,
            Self::Keybinding { .. } => FormKind::Keybinding,
        }
    }

    fn title(self) -> String {
        match self {
            Self::ImportDictionary => "import into personal dictionary (csv or sqlite3)".to_owned(),
            Self::ExportDictionary => "export personal dictionary to csv".to_owned(),
            Self::ImportConfig => "import settings from".to_owned(),
            Self::ExportConfig => "export settings to".to_owned(),
            Self::Keybinding { action } => format!("key for {action}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct PromptState {
    kind: PromptKind,
    input: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InfoOverlay {
    resource: DictionaryResource,
    info: DictionaryInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct SettingsUiState {
    config: Option<ImeConfig>,
    fonts: Vec<FontFamily>,
    row: usize,
    dirty: bool,
}

#[derive(Debug, Clone, Default)]
struct ViewData {
    resources: Vec<DictionaryResource>,
    explorer_row: usize,
    info: Option<InfoOverlay>,
    session: Option<EditSession>,
    editor_row: usize,
    search_input: String,
    phrase_form: Option<PhraseForm>,
    prompt: Option<PromptState>,
    settings: SettingsUiState,
    status_token: u64,
    status_clear: Duration,
    // Reading check ids keep counting across sessions.
    last_request: RequestId,
}

pub fn run_app<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    options: UiOptions,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen).context("enter alternate screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let mut view_data = ViewData {
        status_clear: options.status_clear,
        ..ViewData::default()
    };
    let (internal_tx, internal_rx) = mpsc::channel();

    if let Err(error) = refresh_view_data(state, runtime, &mut view_data) {
        state.dispatch(AppCommand::SetStatus(format!("load failed: {error:#}")));
    }

    let mut result = Ok(());
    loop {
        process_internal_events(state, &mut view_data, &internal_tx, &internal_rx);

        if let Err(error) = terminal.draw(|frame| render(frame, state, &view_data)) {
            result = Err(error).context("draw frame");
            break;
        }

        let has_event = event::poll(Duration::from_millis(120)).context("poll event")?;
        if has_event {
            match event::read().context("read event")? {
                Event::Key(key) => {
                    if handle_key_event(state, runtime, &mut view_data, &internal_tx, key) {
                        break;
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    disable_raw_mode().context("disable raw mode")?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen).context("leave alternate screen")?;
    result
}

fn process_internal_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    tx: &Sender<InternalEvent>,
    rx: &Receiver<InternalEvent>,
) {
    while let Ok(event) = rx.try_recv() {
        match event {
            InternalEvent::ClearStatus { token } if token == view_data.status_token => {
                state.dispatch(AppCommand::ClearStatus);
            }
            InternalEvent::ClearStatus { .. } => {}
            InternalEvent::ValidationFinished { request_id, result } => {
                let Some(session) = view_data.session.as_mut() else {
                    debug!(%request_id, "reading check finished after the session closed");
                    continue;
                };
                let events = session.validation_finished(request_id, result);
                apply_session_events(state, view_data, tx, &events);
            }
            InternalEvent::SaveFinished { path, result } => {
                let Some(session) = view_data
                    .session
                    .as_mut()
                    .filter(|session| session.resource().path == path)
                else {
                    debug!(path = %path.display(), "save finished for a closed session");
                    continue;
                };
                let events = session.finish_save(result.map_err(anyhow::Error::msg));
                apply_session_events(state, view_data, tx, &events);
            }
        }
    }
}

fn schedule_status_clear(internal_tx: &Sender<InternalEvent>, token: u64, after: Duration) {
    let sender = internal_tx.clone();
    thread::spawn(move || {
        thread::sleep(after);
        let _ = sender.send(InternalEvent::ClearStatus { token });
    });
}

fn emit_status(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    message: impl Into<String>,
) {
    state.dispatch(AppCommand::SetStatus(message.into()));
    view_data.status_token = view_data.status_token.saturating_add(1);
    schedule_status_clear(internal_tx, view_data.status_token, view_data.status_clear);
}

fn refresh_view_data<R: AppRuntime>(
    state: &AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
) -> Result<()> {
    match state.screen {
        Screen::Explorer => {
            view_data.resources = runtime.explore()?;
            view_data.explorer_row = view_data
                .explorer_row
                .min(view_data.resources.len().saturating_sub(1));
        }
        Screen::Settings => {
            if view_data.settings.config.is_none() {
                load_settings(runtime, view_data)?;
            }
        }
        Screen::Editor => {}
    }
    Ok(())
}

fn load_settings<R: AppRuntime>(runtime: &mut R, view_data: &mut ViewData) -> Result<()> {
    let config = runtime.load_config()?;
    let fonts = runtime.system_fonts().unwrap_or_else(|error| {
        warn!(error = %format!("{error:#}"), "font scan failed");
        Vec::new()
    });
    view_data.settings = SettingsUiState {
        config: Some(config),
        fonts,
        row: view_data.settings.row.min(KEYBIND_ACTIONS.len() - 1),
        dirty: false,
    };
    Ok(())
}

fn dispatch_and_refresh<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    command: AppCommand,
    internal_tx: &Sender<InternalEvent>,
) {
    state.dispatch(command);
    if let Err(error) = refresh_view_data(state, runtime, view_data) {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("load failed: {error:#}"),
        );
    }
}

fn handle_key_event<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if key.code == KeyCode::Char('q') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match state.mode {
        AppMode::Form(FormKind::Info) => {
            view_data.info = None;
            state.dispatch(AppCommand::ExitToNav);
            false
        }
        AppMode::Form(FormKind::ConfirmAbandon) => {
            handle_confirm_key(state, view_data, internal_tx, key);
            false
        }
        AppMode::Form(FormKind::Phrase) => {
            handle_phrase_form_key(state, runtime, view_data, internal_tx, key);
            false
        }
        AppMode::Form(FormKind::ImportPath | FormKind::ExportPath | FormKind::Keybinding) => {
            handle_prompt_key(state, runtime, view_data, internal_tx, key);
            false
        }
        AppMode::Search => {
            handle_search_key(state, view_data, internal_tx, key);
            false
        }
        AppMode::Nav => match state.screen {
            Screen::Explorer => handle_explorer_key(state, runtime, view_data, internal_tx, key),
            Screen::Settings => handle_settings_key(state, runtime, view_data, internal_tx, key),
            Screen::Editor => {
                handle_editor_key(state, runtime, view_data, internal_tx, key);
                false
            }
        },
    }
}

fn handle_tab_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    let command = match key.code {
        KeyCode::Char('f') | KeyCode::Tab => AppCommand::NextTab,
        KeyCode::Char('b') | KeyCode::BackTab => AppCommand::PrevTab,
        _ => return false,
    };
    dispatch_and_refresh(state, runtime, view_data, command, internal_tx);
    true
}

fn handle_explorer_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if handle_tab_key(state, runtime, view_data, internal_tx, key) {
        return false;
    }

    let len = view_data.resources.len();
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.explorer_row = step(view_data.explorer_row, 1, len);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.explorer_row = step(view_data.explorer_row, -1, len);
        }
        KeyCode::Enter => open_selected_dictionary(state, runtime, view_data, internal_tx),
        KeyCode::Char('i') => show_info(state, runtime, view_data, internal_tx),
        KeyCode::Char('I') => open_prompt(state, view_data, PromptKind::ImportDictionary, ""),
        KeyCode::Char('E') => open_prompt(state, view_data, PromptKind::ExportDictionary, ""),
        KeyCode::Char('r') => {
            dispatch_and_refresh(state, runtime, view_data, AppCommand::ExitToNav, internal_tx);
            let count = view_data.resources.len();
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("{count} dictionaries"),
            );
        }
        _ => {}
    }
    false
}

fn selected_resource(view_data: &ViewData) -> Option<&DictionaryResource> {
    view_data.resources.get(view_data.explorer_row)
}

fn open_selected_dictionary<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(resource) = selected_resource(view_data).cloned() else {
        emit_status(state, view_data, internal_tx, "no dictionary to open");
        return;
    };
    let records = match runtime.load_dictionary(&resource) {
        Ok(records) => records,
        Err(error) => {
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("open failed: {error:#}"),
            );
            return;
        }
    };

    let editable = resource.is_editable();
    let name = resource.name.clone();
    let last_request = view_data
        .session
        .as_ref()
        .map_or(view_data.last_request, EditSession::last_request);
    view_data.session =
        Some(EditSession::open(resource, records).with_requests_after(last_request));
    view_data.editor_row = 0;
    view_data.search_input.clear();
    view_data.phrase_form = None;
    state.dispatch(AppCommand::OpenEditor);
    if !editable {
        emit_status(
            state,
            view_data,
            internal_tx,
            format!("{name} is read-only"),
        );
    }
}

fn show_info<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(resource) = selected_resource(view_data).cloned() else {
        return;
    };
    match runtime.dictionary_info(&resource) {
        Ok(info) => {
            view_data.info = Some(InfoOverlay { resource, info });
            state.dispatch(AppCommand::OpenForm(FormKind::Info));
        }
        Err(error) => emit_status(
            state,
            view_data,
            internal_tx,
            format!("info failed: {error:#}"),
        ),
    }
}

fn open_prompt(state: &mut AppState, view_data: &mut ViewData, kind: PromptKind, input: &str) {
    view_data.prompt = Some(PromptState {
        kind,
        input: input.to_owned(),
    });
    state.dispatch(AppCommand::OpenForm(kind.form_kind()));
}

fn handle_prompt_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(prompt) = view_data.prompt.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };

    match key.code {
        KeyCode::Esc => {
            view_data.prompt = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Backspace => {
            prompt.input.pop();
        }
        KeyCode::Enter => {
            let input = prompt.input.trim().to_owned();
            let kind = prompt.kind;
            if input.is_empty() {
                let message = match kind {
                    PromptKind::Keybinding { .. } => "type a key combination first",
                    _ => "type a path first",
                };
                emit_status(state, view_data, internal_tx, message);
                return;
            }
            view_data.prompt = None;
            state.dispatch(AppCommand::ExitToNav);
            run_prompt(state, runtime, view_data, internal_tx, kind, &input);
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            prompt.input.push(ch);
        }
        _ => {}
    }
}

fn run_prompt<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    kind: PromptKind,
    input: &str,
) {
    let path = Path::new(input);
    let message = match kind {
        PromptKind::ImportDictionary => match runtime.import_dictionary(path) {
            Ok(summary) => {
                if let Err(error) = refresh_view_data(state, runtime, view_data) {
                    warn!(error = %format!("{error:#}"), "reload after import failed");
                }
                format!(
                    "imported {} entries into the personal dictionary ({} skipped)",
                    summary.imported, summary.skipped
                )
            }
            Err(error) => format!("import failed: {error:#}"),
        },
        PromptKind::ExportDictionary => match runtime.export_dictionary(path) {
            Ok(count) => format!("exported {count} entries to {input}"),
            Err(error) => format!("export failed: {error:#}"),
        },
        PromptKind::ImportConfig => match runtime.import_config(path) {
            Ok(config) => {
                view_data.settings.config = Some(config);
                view_data.settings.dirty = true;
                "settings imported -- press s to save them".to_owned()
            }
            Err(error) => format!("import failed: {error:#}"),
        },
        PromptKind::ExportConfig => {
            let result = match view_data.settings.config.as_ref() {
                Some(config) => runtime.export_config(path, config),
                None => Err(anyhow!("settings are not loaded")),
            };
            match result {
                Ok(()) => format!("settings exported to {input}"),
                Err(error) => format!("export failed: {error:#}"),
            }
        }
        PromptKind::Keybinding { action } => match view_data.settings.config.as_mut() {
            Some(config) => {
                config.set_keybind(action, input);
                view_data.settings.dirty = true;
                format!("{action} bound to {input}")
            }
            None => "settings are not loaded".to_owned(),
        },
    };
    emit_status(state, view_data, internal_tx, message);
}

fn handle_settings_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) -> bool {
    if handle_tab_key(state, runtime, view_data, internal_tx, key) {
        return false;
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Char('j') | KeyCode::Down => {
            view_data.settings.row = step(view_data.settings.row, 1, KEYBIND_ACTIONS.len());
        }
        KeyCode::Char('k') | KeyCode::Up => {
            view_data.settings.row = step(view_data.settings.row, -1, KEYBIND_ACTIONS.len());
        }
        KeyCode::Enter => {
            let Some(config) = view_data.settings.config.as_ref() else {
                return false;
            };
            let action = KEYBIND_ACTIONS[view_data.settings.row.min(KEYBIND_ACTIONS.len() - 1)];
            let current = config.keybind_for(action).to_owned();
            open_prompt(state, view_data, PromptKind::Keybinding { action }, &current);
        }
        KeyCode::Char('s') => {
            let result = match view_data.settings.config.as_ref() {
                Some(config) => runtime.save_config(config),
                None => Err(anyhow!("settings are not loaded")),
            };
            let message = match result {
                Ok(()) => {
                    view_data.settings.dirty = false;
                    "settings saved".to_owned()
                }
                Err(error) => format!("save failed: {error:#}"),
            };
            emit_status(state, view_data, internal_tx, message);
        }
        KeyCode::Char('r') => {
            let message = match load_settings(runtime, view_data) {
                Ok(()) => "settings reloaded".to_owned(),
                Err(error) => format!("load failed: {error:#}"),
            };
            emit_status(state, view_data, internal_tx, message);
        }
        KeyCode::Char('I') => open_prompt(state, view_data, PromptKind::ImportConfig, ""),
        KeyCode::Char('E') => open_prompt(state, view_data, PromptKind::ExportConfig, ""),
        _ => {}
    }
    false
}

fn handle_editor_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            move_editor_cursor(state, runtime, view_data, internal_tx, 1);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            move_editor_cursor(state, runtime, view_data, internal_tx, -1);
        }
        KeyCode::Char('g') | KeyCode::Home => {
            pick_editor_row(state, runtime, view_data, internal_tx, 0);
        }
        KeyCode::Char('G') | KeyCode::End => {
            let last = view_data
                .session
                .as_ref()
                .map_or(0, |session| session.view().len().saturating_sub(1));
            pick_editor_row(state, runtime, view_data, internal_tx, last);
        }
        KeyCode::Char('/') => {
            if let Some(session) = view_data.session.as_ref() {
                view_data.search_input = session.filter().to_owned();
                state.dispatch(AppCommand::StartSearch);
            }
        }
        KeyCode::Enter | KeyCode::Char('e') => {
            open_phrase_form(state, view_data, internal_tx);
        }
        KeyCode::Char('a') => {
            let result = match view_data.session.as_mut() {
                Some(session) => session.insert(),
                None => return,
            };
            if handle_session_result(state, runtime, view_data, internal_tx, result) {
                open_phrase_form(state, view_data, internal_tx);
            }
        }
        KeyCode::Char('d') => {
            let result = match view_data.session.as_mut() {
                Some(session) => session.delete(),
                None => return,
            };
            if handle_session_result(state, runtime, view_data, internal_tx, result) {
                emit_status(state, view_data, internal_tx, "entry deleted");
            }
        }
        KeyCode::Char('s') => save_session(state, runtime, view_data, internal_tx),
        KeyCode::Esc | KeyCode::Char('q') => leave_editor(state, view_data, internal_tx),
        _ => {}
    }
}

fn move_editor_cursor<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    delta: isize,
) {
    let Some(session) = view_data.session.as_ref() else {
        return;
    };
    let len = session.view().len();
    if len == 0 {
        return;
    }
    // The first move after the selection was dropped lands on the cursor row.
    let target = match session.selected_row() {
        Some(row) => step(row, delta, len),
        None => view_data.editor_row.min(len - 1),
    };
    pick_editor_row(state, runtime, view_data, internal_tx, target);
}

fn pick_editor_row<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    row: usize,
) {
    let result = match view_data.session.as_mut() {
        Some(session) => session.pick_row(row),
        None => return,
    };
    handle_session_result(state, runtime, view_data, internal_tx, result);
}

fn handle_search_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Esc | KeyCode::Enter => {
            state.dispatch(AppCommand::ExitToNav);
            return;
        }
        KeyCode::Backspace => {
            view_data.search_input.pop();
        }
        KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            view_data.search_input.push(ch);
        }
        _ => return,
    }

    let text = view_data.search_input.clone();
    let result = match view_data.session.as_mut() {
        Some(session) => session.search(&text),
        None => return,
    };
    match result {
        Ok(events) => apply_session_events(state, view_data, internal_tx, &events),
        Err(error) => emit_status(state, view_data, internal_tx, format!("{error:#}")),
    }
}

fn open_phrase_form(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(session) = view_data.session.as_ref() else {
        return;
    };
    if !session.is_editable() {
        emit_status(
            state,
            view_data,
            internal_tx,
            "read-only dictionary -- only personal dictionaries are editable",
        );
        return;
    }
    let Some(record) = session.selected_record() else {
        emit_status(
            state,
            view_data,
            internal_tx,
            "no entry selected -- move to an entry first",
        );
        return;
    };
    view_data.phrase_form = Some(PhraseForm::new(RecordDraft::from_record(record)));
    state.dispatch(AppCommand::OpenForm(FormKind::Phrase));
}

fn handle_phrase_form_key<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    let Some(form) = view_data.phrase_form.as_mut() else {
        state.dispatch(AppCommand::ExitToNav);
        return;
    };

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Esc => {
            view_data.phrase_form = None;
            state.dispatch(AppCommand::ExitToNav);
        }
        KeyCode::Tab | KeyCode::Down => form.field = form.field.step(1),
        KeyCode::BackTab | KeyCode::Up => form.field = form.field.step(-1),
        KeyCode::Backspace => {
            form.field_mut().pop();
        }
        KeyCode::Char('k') if ctrl => {
            form.toggle_compose();
            let label = form.compose.map_or("off", |keymap| keymap.name);
            emit_status(
                state,
                view_data,
                internal_tx,
                format!("keymap: {label}"),
            );
        }
        KeyCode::Char(ch) if !ctrl => form.type_char(ch),
        KeyCode::Enter => submit_phrase_form(state, runtime, view_data, internal_tx),
        _ => {}
    }
}

fn submit_phrase_form<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(draft) = view_data.phrase_form.as_ref().map(|form| form.draft.clone()) else {
        return;
    };
    let result = match view_data.session.as_mut() {
        Some(session) => session.update(draft),
        None => return,
    };
    if handle_session_result(state, runtime, view_data, internal_tx, result) {
        view_data.phrase_form = None;
        state.dispatch(AppCommand::ExitToNav);
        emit_status(state, view_data, internal_tx, "entry updated");
    }
}

fn save_session<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let payload = match view_data.session.as_mut().map(EditSession::begin_save) {
        Some(Ok(payload)) => payload,
        Some(Err(error)) => {
            emit_status(state, view_data, internal_tx, format!("{error:#}"));
            return;
        }
        None => return,
    };
    emit_status(
        state,
        view_data,
        internal_tx,
        format!("saving {} entries", payload.records.len()),
    );
    if let Err(error) = runtime.spawn_save(payload, internal_tx.clone()) {
        let events = match view_data.session.as_mut() {
            Some(session) => session.finish_save(Err(error)),
            None => return,
        };
        apply_session_events(state, view_data, internal_tx, &events);
    }
}

fn leave_editor(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let Some(session) = view_data.session.as_ref() else {
        state.dispatch(AppCommand::CloseEditor);
        return;
    };
    if session.phase() == SessionPhase::Saving {
        emit_status(
            state,
            view_data,
            internal_tx,
            "save in progress -- wait for it to finish",
        );
        return;
    }
    if session.is_dirty() {
        state.dispatch(AppCommand::OpenForm(FormKind::ConfirmAbandon));
        return;
    }
    abandon_session(state, view_data, internal_tx);
}

fn handle_confirm_key(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    key: KeyEvent,
) {
    match key.code {
        KeyCode::Char('y') => abandon_session(state, view_data, internal_tx),
        KeyCode::Char('n') | KeyCode::Esc => {
            state.dispatch(AppCommand::ExitToNav);
        }
        _ => {}
    }
}

fn abandon_session(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
) {
    let events = match view_data.session.as_mut() {
        Some(session) => session.abandon(),
        None => return,
    };
    apply_session_events(state, view_data, internal_tx, &events);
}

/// Applies the outcome of a session command and starts any reading checks it
/// asked for. Returns false when the command was rejected.
fn handle_session_result<R: AppRuntime>(
    state: &mut AppState,
    runtime: &mut R,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    result: Result<Vec<SessionEvent>>,
) -> bool {
    let events = match result {
        Ok(events) => events,
        Err(error) => {
            emit_status(state, view_data, internal_tx, format!("{error:#}"));
            return false;
        }
    };

    for event in &events {
        if let SessionEvent::ValidationRequested {
            request_id,
            bopomofo,
        } = event
            && let Err(error) = runtime.spawn_validation(*request_id, bopomofo, internal_tx.clone())
        {
            warn!(%request_id, error = %format!("{error:#}"), "reading check not started");
        }
    }
    apply_session_events(state, view_data, internal_tx, &events);
    true
}

fn apply_session_events(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    events: &[SessionEvent],
) {
    for event in events {
        match event {
            SessionEvent::FilterChanged(_) => view_data.editor_row = 0,
            SessionEvent::ViewRecomputed { rows } => {
                view_data.editor_row = view_data.editor_row.min(rows.saturating_sub(1));
            }
            SessionEvent::SelectionChanged(Selection::Selected(index)) => {
                if let Some(row) = view_data
                    .session
                    .as_ref()
                    .and_then(|session| session.view().row_of(*index))
                {
                    view_data.editor_row = row;
                }
            }
            SessionEvent::ValidationFailed { message, .. } => {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("reading check: {message}"),
                );
            }
            SessionEvent::SaveFailed(message) => {
                emit_status(
                    state,
                    view_data,
                    internal_tx,
                    format!("save failed: {message}"),
                );
            }
            SessionEvent::Closed(reason) => close_editor(state, view_data, internal_tx, *reason),
            SessionEvent::SelectionChanged(Selection::Unselected)
            | SessionEvent::RecordInserted(_)
            | SessionEvent::RecordDeleted(_)
            | SessionEvent::RecordUpdated(_)
            | SessionEvent::ValidationRequested { .. } => {}
        }
    }
}

fn close_editor(
    state: &mut AppState,
    view_data: &mut ViewData,
    internal_tx: &Sender<InternalEvent>,
    reason: CloseReason,
) {
    let mut name = String::new();
    if let Some(session) = view_data.session.take() {
        view_data.last_request = session.last_request();
        name = session.resource().name.clone();
    }
    view_data.phrase_form = None;
    view_data.search_input.clear();
    view_data.editor_row = 0;
    state.dispatch(AppCommand::CloseEditor);
    let message = match reason {
        CloseReason::Saved => format!("saved {name}"),
        CloseReason::Abandoned => format!("closed {name}"),
    };
    emit_status(state, view_data, internal_tx, message);
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    current
        .saturating_add_signed(delta)
        .min(len.saturating_sub(1))
}

/// Rows to draw so that `cursor` stays on screen.
fn visible_window(len: usize, cursor: usize, height: usize) -> Range<usize> {
    if height == 0 || len == 0 {
        return 0..0;
    }
    let start = cursor.saturating_sub(height - 1).min(len.saturating_sub(height));
    start..(start + height).min(len)
}

fn render(frame: &mut ratatui::Frame<'_>, state: &AppState, view_data: &ViewData) {
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(frame.area());

    if state.screen == Screen::Editor {
        let breadcrumb = Paragraph::new(breadcrumb_text(view_data))
            .block(Block::default().title("chewedit").borders(Borders::ALL));
        frame.render_widget(breadcrumb, layout[0]);
    } else {
        let selected = Screen::TABS
            .iter()
            .position(|screen| *screen == state.screen)
            .unwrap_or(0);
        let tabs = Tabs::new(Screen::TABS.iter().map(|screen| screen.label()))
            .block(Block::default().title("chewedit").borders(Borders::ALL))
            .style(Style::default().fg(Color::White))
            .highlight_style(
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .select(selected);
        frame.render_widget(tabs, layout[0]);
    }

    match state.screen {
        Screen::Explorer => render_explorer(frame, layout[1], view_data),
        Screen::Settings => {
            let title = if view_data.settings.dirty {
                "settings (modified)"
            } else {
                "settings"
            };
            let body = Paragraph::new(settings_text(&view_data.settings))
                .block(Block::default().title(title).borders(Borders::ALL));
            frame.render_widget(body, layout[1]);
        }
        Screen::Editor => render_editor(frame, layout[1], state, view_data),
    }

    let status_widget = Paragraph::new(status_text(state, view_data))
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(status_widget, layout[2]);

    if let Some(info) = &view_data.info {
        let area = centered_rect(60, 40, frame.area());
        frame.render_widget(Clear, area);
        let overlay = Paragraph::new(info_overlay_text(&info.info)).block(
            Block::default()
                .title(format!("{} info", info.resource.name))
                .borders(Borders::ALL),
        );
        frame.render_widget(overlay, area);
    }

    if let Some(form) = &view_data.phrase_form {
        let area = centered_rect(60, 40, frame.area());
        frame.render_widget(Clear, area);
        let overlay = Paragraph::new(phrase_form_text(form))
            .block(Block::default().title("entry").borders(Borders::ALL));
        frame.render_widget(overlay, area);
    }

    if let Some(prompt) = &view_data.prompt {
        let area = centered_rect(70, 20, frame.area());
        frame.render_widget(Clear, area);
        let overlay = Paragraph::new(format!("{}_", prompt.input))
            .block(Block::default().title(prompt.kind.title()).borders(Borders::ALL));
        frame.render_widget(overlay, area);
    }

    if state.mode == AppMode::Form(FormKind::ConfirmAbandon) {
        let area = centered_rect(50, 20, frame.area());
        frame.render_widget(Clear, area);
        let overlay = Paragraph::new("discard unsaved changes? y/n")
            .style(Style::default().fg(Color::Red))
            .block(Block::default().title("close").borders(Borders::ALL));
        frame.render_widget(overlay, area);
    }
}

fn render_explorer(frame: &mut ratatui::Frame<'_>, area: Rect, view_data: &ViewData) {
    let height = usize::from(area.height.saturating_sub(3));
    let window = visible_window(view_data.resources.len(), view_data.explorer_row, height);
    let rows = view_data.resources[window.clone()]
        .iter()
        .zip(window)
        .map(|(resource, row_index)| {
            let mut style = Style::default();
            if !resource.is_editable() {
                style = style.fg(Color::Gray);
            }
            if row_index == view_data.explorer_row {
                style = Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD);
            }
            Row::new(vec![
                Cell::from(resource.category.label()),
                Cell::from(resource.name.clone()),
                Cell::from(resource.path.display().to_string()),
            ])
            .style(style)
        });

    let header = Row::new(["type", "name", "path"].map(|label| {
        Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let table = Table::new(
        rows,
        [
            Constraint::Length(6),
            Constraint::Percentage(30),
            Constraint::Min(10),
        ],
    )
    .header(header)
    .column_spacing(1)
    .block(
        Block::default()
            .title(format!("dictionaries ({})", view_data.resources.len()))
            .borders(Borders::ALL),
    );
    frame.render_widget(table, area);
}

fn render_editor(
    frame: &mut ratatui::Frame<'_>,
    area: Rect,
    state: &AppState,
    view_data: &ViewData,
) {
    let Some(session) = &view_data.session else {
        let empty = Paragraph::new(String::new())
            .block(Block::default().borders(Borders::ALL).title("editor"));
        frame.render_widget(empty, area);
        return;
    };

    let view_rows = session.view().rows();
    let selected = session.selected_row();
    let cursor = selected.unwrap_or(view_data.editor_row);
    let height = usize::from(area.height.saturating_sub(3));
    let window = visible_window(view_rows.len(), cursor, height);

    let rows = view_rows[window.clone()]
        .iter()
        .zip(window)
        .map(|(row, row_index)| {
            let style = if Some(row_index) == selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(row.record.phrase.clone()),
                Cell::from(row.record.bopomofo.clone()),
                Cell::from(row.record.frequency.to_string()),
            ])
            .style(style)
        });

    let header = Row::new(["phrase", "bopomofo", "freq"].map(|label| {
        Cell::from(label).style(
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
    }));
    let mut title = editor_title(session);
    if state.mode == AppMode::Search {
        title = format!("{title} | /{}_", view_data.search_input);
    }
    let table = Table::new(
        rows,
        [
            Constraint::Percentage(40),
            Constraint::Percentage(45),
            Constraint::Min(6),
        ],
    )
    .header(header)
    .column_spacing(1)
    .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(table, area);
}

fn breadcrumb_text(view_data: &ViewData) -> String {
    match &view_data.session {
        Some(session) => format!(
            "{} > {} ({})",
            Screen::Explorer.label(),
            session.resource().name,
            session.resource().category.label()
        ),
        None => Screen::Editor.label().to_owned(),
    }
}

fn editor_title(session: &EditSession) -> String {
    let mut title = format!(
        "{} | {}/{} entries",
        session.resource().name,
        session.view().len(),
        session.store().len()
    );
    if !session.filter().is_empty() {
        title.push_str(&format!(" | filter: {}", session.filter()));
    }
    if !session.is_editable() {
        title.push_str(" | read-only");
    }
    if session.is_dirty() {
        title.push_str(" | modified");
    }
    if session.phase() == SessionPhase::Saving {
        title.push_str(" | saving");
    }
    title
}

fn info_overlay_text(info: &DictionaryInfo) -> String {
    info.rows()
        .iter()
        .map(|(label, value)| format!("{label}: {value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn phrase_form_text(form: &PhraseForm) -> String {
    let mut lines: Vec<String> = PhraseField::ALL
        .iter()
        .map(|field| {
            let marker = if *field == form.field { ">" } else { " " };
            format!("{marker} {:<10} {}", field.label(), form.value(*field))
        })
        .collect();
    lines.push(String::new());
    lines.push(format!(
        "keymap: {}",
        form.compose.map_or("off", |keymap| keymap.name)
    ));
    lines.push("tab field | ctrl+k keymap | enter apply | esc cancel".to_owned());
    lines.join("\n")
}

fn settings_text(settings: &SettingsUiState) -> String {
    let Some(config) = &settings.config else {
        return "settings not loaded -- press r to retry".to_owned();
    };
    let tsf = &config.chewing_tsf;

    let font_note = if settings.fonts.is_empty()
        || settings
            .fonts
            .iter()
            .any(|font| font.name == tsf.font_family || font.display_name == tsf.font_family)
    {
        ""
    } else {
        " (not installed)"
    };

    let mut lines = vec![
        format!("keyboard layout:  {}", keyboard_layout_label(tsf.keyboard_layout)),
        format!("conversion:       {}", conv_engine_label(tsf.conv_engine)),
        format!("selection keys:   {}", sel_keys_label(tsf.sel_key_type)),
        format!(
            "candidates:       {} per row, {} per page",
            tsf.cand_per_row, tsf.cand_per_page
        ),
        format!(
            "font:             {} {}{font_note}",
            tsf.font_family, tsf.font_size
        ),
        format!(
            "english layout:   {}",
            english_layout_label(tsf.simulate_english_layout)
        ),
        format!(
            "update channel:   {}",
            update_channel_label(&tsf.auto_check_update_channel)
        ),
        format!(
            "symbol tables:    symbols.dat {} lines, swkb.dat {} lines",
            config.symbols_dat.lines().count(),
            config.swkb_dat.lines().count()
        ),
        String::new(),
        "keybindings:".to_owned(),
    ];
    for (row, action) in KEYBIND_ACTIONS.iter().enumerate() {
        let marker = if row == settings.row { ">" } else { " " };
        let key = match config.keybind_for(action) {
            "" => UNBOUND,
            key => key,
        };
        lines.push(format!("{marker} {action:<28} {key}"));
    }
    lines.join("\n")
}

fn status_text(state: &AppState, view_data: &ViewData) -> String {
    let saving = view_data
        .session
        .as_ref()
        .is_some_and(|session| session.phase() == SessionPhase::Saving);
    let (mode, hints) = match state.mode {
        AppMode::Nav if saving => ("SAVING", "editing is paused until the save finishes"),
        AppMode::Nav => (
            "NAV",
            match state.screen {
                Screen::Explorer => {
                    "j/k | enter open | i info | I import | E export | r reload | f/b tabs | q quit"
                }
                Screen::Settings => {
                    "j/k | enter rebind | s save | r reload | I import | E export | f/b tabs | q quit"
                }
                Screen::Editor => {
                    "j/k g/G | / search | enter edit | a add | d delete | s save | esc close"
                }
            },
        ),
        AppMode::Search => ("SEARCH", "type to filter | enter/esc done"),
        AppMode::Form(FormKind::Phrase) => (
            "FORM",
            "tab field | ctrl+k keymap | enter apply | esc cancel",
        ),
        AppMode::Form(FormKind::Info) => ("INFO", "any key close"),
        AppMode::Form(FormKind::ConfirmAbandon) => ("CONFIRM", "y discard | n keep editing"),
        AppMode::Form(FormKind::ImportPath | FormKind::ExportPath | FormKind::Keybinding) => {
            ("INPUT", "enter confirm | esc cancel")
        }
    };
    match &state.status_line {
        Some(status) => format!("{mode} | {status} | {hints} | ctrl+q"),
        None => format!("{mode} | {hints} | ctrl+q"),
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::{
        AppRuntime, ImportSummary, InternalEvent, PhraseField, PhraseForm, SettingsUiState,
        ViewData, editor_title, handle_key_event, phrase_form_text, process_internal_events,
        refresh_view_data, settings_text, status_text, step, visible_window,
    };
    use anyhow::{Result, anyhow, bail};
    use chewedit_app::bopomofo::parse_reading;
    use chewedit_app::{
        AppMode, AppState, DictionaryCategory, DictionaryInfo, DictionaryRecord,
        DictionaryResource, EditSession, FontFamily, FormKind, ImeConfig, MasterIndex,
        RecordDraft, RequestId, SavePayload, Screen, SessionPhase,
    };
    use chewedit_testkit::{resource, sample_records};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use std::path::{Path, PathBuf};
    use std::sync::mpsc;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct TestRuntime {
        resources: Vec<DictionaryResource>,
        records: Vec<DictionaryRecord>,
        saved: Option<SavePayload>,
        fail_save: bool,
        config: ImeConfig,
        saved_config: Option<ImeConfig>,
        imported: Vec<PathBuf>,
        defer_validation: bool,
    }

    impl TestRuntime {
        fn new() -> Self {
            Self {
                resources: vec![
                    resource(
                        DictionaryCategory::Personal,
                        PathBuf::from("/dicts/chewing.sqlite3"),
                    ),
                    resource(DictionaryCategory::System, PathBuf::from("/dicts/tsi.sqlite3")),
                ],
                records: sample_records(),
                ..Self::default()
            }
        }
    }

    impl AppRuntime for TestRuntime {
        fn explore(&mut self) -> Result<Vec<DictionaryResource>> {
            Ok(self.resources.clone())
        }

        fn dictionary_info(&mut self, resource: &DictionaryResource) -> Result<DictionaryInfo> {
            Ok(DictionaryInfo {
                name: resource.name.clone(),
                version: "1.0.0".to_owned(),
                ..DictionaryInfo::default()
            })
        }

        fn load_dictionary(
            &mut self,
            _resource: &DictionaryResource,
        ) -> Result<Vec<DictionaryRecord>> {
            Ok(self.records.clone())
        }

        fn save_dictionary(&mut self, payload: &SavePayload) -> Result<()> {
            if self.fail_save {
                bail!("disk full");
            }
            self.saved = Some(payload.clone());
            Ok(())
        }

        fn validate_reading(&mut self, bopomofo: &str) -> Result<()> {
            parse_reading(bopomofo)?;
            Ok(())
        }

        fn import_dictionary(&mut self, source: &Path) -> Result<ImportSummary> {
            self.imported.push(source.to_path_buf());
            Ok(ImportSummary {
                imported: 3,
                skipped: 1,
            })
        }

        fn export_dictionary(&mut self, _dest: &Path) -> Result<usize> {
            Ok(self.records.len())
        }

        fn load_config(&mut self) -> Result<ImeConfig> {
            Ok(self.config.clone())
        }

        fn save_config(&mut self, config: &ImeConfig) -> Result<()> {
            self.saved_config = Some(config.clone());
            Ok(())
        }

        fn import_config(&mut self, _path: &Path) -> Result<ImeConfig> {
            Err(anyhow!("not a valid settings file"))
        }

        fn export_config(&mut self, _path: &Path, _config: &ImeConfig) -> Result<()> {
            Ok(())
        }

        fn system_fonts(&mut self) -> Result<Vec<FontFamily>> {
            Ok(vec![FontFamily {
                name: "NotoSansCJK".to_owned(),
                display_name: "Noto Sans CJK".to_owned(),
            }])
        }

        fn spawn_validation(
            &mut self,
            request_id: RequestId,
            bopomofo: &str,
            tx: mpsc::Sender<InternalEvent>,
        ) -> Result<()> {
            if self.defer_validation {
                return Ok(());
            }
            let result = self
                .validate_reading(bopomofo)
                .map_err(|error| error.to_string());
            tx.send(InternalEvent::ValidationFinished { request_id, result })
                .map_err(|_| anyhow!("closed"))?;
            Ok(())
        }
    }

    struct Harness {
        state: AppState,
        runtime: TestRuntime,
        view_data: ViewData,
        tx: mpsc::Sender<InternalEvent>,
        rx: mpsc::Receiver<InternalEvent>,
    }

    impl Harness {
        fn new(runtime: TestRuntime) -> Self {
            let (tx, rx) = mpsc::channel();
            let mut harness = Self {
                state: AppState::default(),
                runtime,
                view_data: ViewData {
                    status_clear: Duration::from_secs(60),
                    ..ViewData::default()
                },
                tx,
                rx,
            };
            refresh_view_data(&harness.state, &mut harness.runtime, &mut harness.view_data)
                .expect("initial refresh");
            harness
        }

        fn press(&mut self, key: KeyEvent) -> bool {
            let quit = handle_key_event(
                &mut self.state,
                &mut self.runtime,
                &mut self.view_data,
                &self.tx,
                key,
            );
            process_internal_events(&mut self.state, &mut self.view_data, &self.tx, &self.rx);
            quit
        }

        fn code(&mut self, code: KeyCode) -> bool {
            self.press(KeyEvent::new(code, KeyModifiers::NONE))
        }

        fn ctrl(&mut self, ch: char) -> bool {
            self.press(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::CONTROL))
        }

        fn type_text(&mut self, text: &str) {
            for ch in text.chars() {
                self.code(KeyCode::Char(ch));
            }
        }

        fn session(&self) -> &EditSession {
            self.view_data.session.as_ref().expect("open session")
        }

        fn status(&self) -> &str {
            self.state.status_line.as_deref().unwrap_or_default()
        }
    }

    #[test]
    fn ctrl_q_quits_from_any_mode() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Char('/'));
        assert_eq!(harness.state.mode, AppMode::Search);
        assert!(harness.ctrl('q'));
    }

    #[test]
    fn tabs_rotate_and_load_settings() {
        let mut harness = Harness::new(TestRuntime::new());
        assert_eq!(harness.view_data.resources.len(), 2);

        harness.code(KeyCode::Char('f'));
        assert_eq!(harness.state.screen, Screen::Settings);
        assert!(harness.view_data.settings.config.is_some());
        assert_eq!(harness.view_data.settings.fonts.len(), 1);

        harness.code(KeyCode::Char('b'));
        assert_eq!(harness.state.screen, Screen::Explorer);
    }

    #[test]
    fn enter_opens_selected_dictionary() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Enter);
        assert_eq!(harness.state.screen, Screen::Editor);
        assert_eq!(harness.session().store().records(), sample_records());
        assert!(harness.session().is_editable());
    }

    #[test]
    fn info_overlay_opens_and_any_key_closes() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Char('j'));
        harness.code(KeyCode::Char('i'));
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Info));
        let info = harness.view_data.info.as_ref().expect("info overlay");
        assert_eq!(info.resource.category, DictionaryCategory::System);

        harness.code(KeyCode::Char('x'));
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert!(harness.view_data.info.is_none());
    }

    #[test]
    fn editing_an_entry_with_keymap_composition() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Char('j'));
        assert_eq!(harness.session().selected_row(), Some(0));

        harness.code(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Phrase));
        harness.code(KeyCode::Tab);
        harness.code(KeyCode::Backspace);
        harness.ctrl('k');
        assert!(harness.status().contains("Standard"));
        harness.type_text("vu06");
        harness.code(KeyCode::Enter);

        assert_eq!(harness.state.mode, AppMode::Nav);
        assert_eq!(
            harness.session().store().records()[0],
            DictionaryRecord::new("a", "ㄒㄧㄢˊ", 5)
        );
        assert!(harness.session().is_dirty());
        assert_eq!(harness.status(), "entry updated");
    }

    #[test]
    fn invalid_reading_is_reported_but_kept() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Char('a'));
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Phrase));
        harness.type_text("c");
        harness.code(KeyCode::Tab);
        harness.type_text("x");
        harness.code(KeyCode::Enter);

        assert!(harness.status().starts_with("reading check:"), "{}", harness.status());
        assert_eq!(
            harness.session().store().records()[2],
            DictionaryRecord::new("c", "x", 0)
        );
        assert_eq!(harness.session().selected_row(), Some(2));
    }

    #[test]
    fn search_filters_and_drops_selection() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Char('j'));
        harness.code(KeyCode::Char('/'));
        harness.type_text("b");
        assert_eq!(harness.session().view().len(), 1);
        assert_eq!(harness.session().selected_row(), None);

        harness.code(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Nav);
        harness.code(KeyCode::Char('j'));
        assert_eq!(
            harness.session().selection().index(),
            Some(MasterIndex::new(1))
        );
        assert!(editor_title(harness.session()).contains("filter: b"));
    }

    #[test]
    fn delete_without_selection_reports_error() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Char('d'));
        assert!(harness.status().contains("no entry selected"));
        assert_eq!(harness.session().store().len(), 2);

        harness.code(KeyCode::Char('j'));
        harness.code(KeyCode::Char('d'));
        assert_eq!(harness.status(), "entry deleted");
        assert_eq!(
            harness.session().store().records(),
            &[DictionaryRecord::new("b", "ㄅ", 3)]
        );
    }

    #[test]
    fn save_closes_editor_and_hands_records_to_backend() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Char('a'));
        harness.code(KeyCode::Esc);
        harness.code(KeyCode::Char('s'));

        assert_eq!(harness.state.screen, Screen::Explorer);
        assert!(harness.view_data.session.is_none());
        let saved = harness.runtime.saved.as_ref().expect("saved payload");
        assert_eq!(saved.path, PathBuf::from("/dicts/chewing.sqlite3"));
        assert_eq!(saved.records.len(), 3);
        assert!(harness.status().starts_with("saved"));
    }

    #[test]
    fn failed_save_keeps_session_open() {
        let mut runtime = TestRuntime::new();
        runtime.fail_save = true;
        let mut harness = Harness::new(runtime);
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Char('s'));

        assert_eq!(harness.state.screen, Screen::Editor);
        assert_eq!(harness.session().phase(), SessionPhase::Active);
        assert!(harness.status().contains("disk full"), "{}", harness.status());
    }

    #[test]
    fn read_only_dictionary_rejects_edits() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Char('j'));
        harness.code(KeyCode::Enter);
        assert!(harness.status().contains("read-only"));
        assert!(!harness.session().is_editable());

        harness.code(KeyCode::Char('a'));
        assert!(harness.status().contains("only personal dictionaries"));
        assert_eq!(harness.session().store().len(), 2);

        harness.code(KeyCode::Char('s'));
        assert!(harness.status().contains("read-only"));
        assert!(harness.runtime.saved.is_none());
    }

    #[test]
    fn leaving_dirty_session_asks_first() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Char('a'));
        harness.code(KeyCode::Esc);
        harness.code(KeyCode::Esc);
        assert_eq!(
            harness.state.mode,
            AppMode::Form(FormKind::ConfirmAbandon)
        );

        harness.code(KeyCode::Char('n'));
        assert_eq!(harness.state.screen, Screen::Editor);
        assert_eq!(harness.state.mode, AppMode::Nav);

        harness.code(KeyCode::Esc);
        harness.code(KeyCode::Char('y'));
        assert_eq!(harness.state.screen, Screen::Explorer);
        assert!(harness.view_data.session.is_none());
        assert!(harness.runtime.saved.is_none());
    }

    #[test]
    fn late_validation_after_close_is_ignored() {
        let mut runtime = TestRuntime::new();
        runtime.defer_validation = true;
        let mut harness = Harness::new(runtime);
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Char('a'));
        harness.type_text("z");
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Esc);
        harness.code(KeyCode::Char('y'));
        assert!(harness.view_data.session.is_none());

        harness
            .tx
            .send(InternalEvent::ValidationFinished {
                request_id: RequestId::new(1),
                result: Err("bopomofo reading is required".to_owned()),
            })
            .expect("send");
        process_internal_events(
            &mut harness.state,
            &mut harness.view_data,
            &harness.tx,
            &harness.rx,
        );
        assert!(harness.status().starts_with("closed"));
    }

    #[test]
    fn late_validation_does_not_reach_reopened_dictionary() {
        let mut runtime = TestRuntime::new();
        runtime.defer_validation = true;
        let mut harness = Harness::new(runtime);
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Char('a'));
        harness.type_text("z");
        harness.code(KeyCode::Enter);
        harness.code(KeyCode::Esc);
        harness.code(KeyCode::Char('y'));
        assert!(harness.view_data.session.is_none());

        harness.code(KeyCode::Enter);
        let session = harness.view_data.session.as_ref().expect("reopened");
        assert_eq!(session.last_request(), RequestId::new(1));

        harness
            .tx
            .send(InternalEvent::ValidationFinished {
                request_id: RequestId::new(1),
                result: Err("bopomofo reading is required".to_owned()),
            })
            .expect("send");
        process_internal_events(
            &mut harness.state,
            &mut harness.view_data,
            &harness.tx,
            &harness.rx,
        );
        assert!(
            !harness.status().starts_with("reading check"),
            "{}",
            harness.status()
        );
        assert_eq!(harness.state.screen, Screen::Editor);
    }

    #[test]
    fn stale_status_clear_is_ignored() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Char('r'));
        assert_eq!(harness.status(), "2 dictionaries");
        let token = harness.view_data.status_token;

        harness
            .tx
            .send(InternalEvent::ClearStatus { token: token - 1 })
            .expect("send");
        harness.code(KeyCode::Null);
        assert_eq!(harness.status(), "2 dictionaries");

        harness
            .tx
            .send(InternalEvent::ClearStatus { token })
            .expect("send");
        harness.code(KeyCode::Null);
        assert_eq!(harness.state.status_line, None);
    }

    #[test]
    fn import_prompt_runs_backend_import() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Char('I'));
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::ImportPath));
        harness.code(KeyCode::Enter);
        assert_eq!(harness.status(), "type a path first");

        harness.type_text("words.csv");
        harness.code(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Nav);
        assert_eq!(harness.runtime.imported, vec![PathBuf::from("words.csv")]);
        assert!(harness.status().contains("imported 3 entries"));
        assert!(harness.status().contains("1 skipped"));
    }

    #[test]
    fn keybinding_prompt_upserts_and_saves() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Char('f'));
        harness.code(KeyCode::Char('j'));
        harness.code(KeyCode::Enter);
        assert_eq!(harness.state.mode, AppMode::Form(FormKind::Keybinding));
        harness.type_text("Ctrl+H");
        harness.code(KeyCode::Enter);

        assert!(harness.view_data.settings.dirty);
        assert!(settings_text(&harness.view_data.settings).contains("Ctrl+H"));

        harness.code(KeyCode::Char('s'));
        let saved = harness.runtime.saved_config.as_ref().expect("saved config");
        assert_eq!(saved.keybind_for("toggle_hsu_keyboard"), "Ctrl+H");
        assert!(!harness.view_data.settings.dirty);
    }

    #[test]
    fn failed_config_import_keeps_current_settings() {
        let mut harness = Harness::new(TestRuntime::new());
        harness.code(KeyCode::Char('f'));
        harness.code(KeyCode::Char('I'));
        harness.type_text("broken.toml");
        harness.code(KeyCode::Enter);
        assert!(harness.status().contains("not a valid settings file"));
        assert!(!harness.view_data.settings.dirty);
    }

    #[test]
    fn phrase_form_text_marks_active_field() {
        let mut form = PhraseForm::new(RecordDraft::from_record(&DictionaryRecord::new(
            "注音",
            "ㄓㄨˋ ㄧㄣ",
            8,
        )));
        form.field = PhraseField::Frequency;
        let text = phrase_form_text(&form);
        assert!(text.contains("> frequency  8"), "{text}");
        assert!(text.contains("keymap: off"));
    }

    #[test]
    fn settings_text_flags_missing_font() {
        let settings = SettingsUiState {
            config: Some(ImeConfig::default()),
            fonts: vec![FontFamily {
                name: "NotoSansCJK".to_owned(),
                display_name: "Noto Sans CJK".to_owned(),
            }],
            row: 0,
            dirty: false,
        };
        let text = settings_text(&settings);
        assert!(text.contains("Segoe UI 16 (not installed)"), "{text}");
        assert!(text.contains("> toggle_simplified_chinese"));
        assert!(text.contains("(unbound)"));
    }

    #[test]
    fn status_text_shows_mode_and_message() {
        let mut state = AppState::default();
        let view_data = ViewData::default();
        assert!(status_text(&state, &view_data).starts_with("NAV | j/k"));
        state.status_line = Some("saved".to_owned());
        state.mode = AppMode::Search;
        assert!(status_text(&state, &view_data).starts_with("SEARCH | saved |"));
    }

    #[test]
    fn cursor_helpers_clamp() {
        assert_eq!(step(0, -1, 3), 0);
        assert_eq!(step(2, 1, 3), 2);
        assert_eq!(step(1, 1, 0), 0);
        assert_eq!(visible_window(100, 0, 10), 0..10);
        assert_eq!(visible_window(100, 25, 10), 16..26);
        assert_eq!(visible_window(5, 4, 10), 0..5);
        assert_eq!(visible_window(5, 0, 0), 0..0);
    }
}
