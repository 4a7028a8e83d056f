// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Explorer,
    Settings,
    Editor,
}

impl Screen {
    /// Screens reachable by tab rotation. The editor is entered by opening a
    /// dictionary instead.
    pub const TABS: [Self; 2] = [Self::Explorer, Self::Settings];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Explorer => "Dictionaries",
            Self::Settings => "Settings",
            Self::Editor => "Editor",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Phrase,
    Info,
    ImportPath,
    ExportPath,
    Keybinding,
    ConfirmAbandon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    Nav,
    Search,
    Form(FormKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    pub screen: Screen,
    pub mode: AppMode,
    pub status_line: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            screen: Screen::Explorer,
            mode: AppMode::Nav,
            status_line: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    NextTab,
    PrevTab,
    OpenEditor,
    CloseEditor,
    StartSearch,
    OpenForm(FormKind),
    ExitToNav,
    SetStatus(String),
    ClearStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    ScreenChanged(Screen),
    ModeChanged(AppMode),
    StatusUpdated(String),
    StatusCleared,
}

impl AppState {
    pub fn dispatch(&mut self, command: AppCommand) -> Vec<AppEvent> {
        match command {
            AppCommand::NextTab => self.rotate_tab(1),
            AppCommand::PrevTab => self.rotate_tab(-1),
            AppCommand::OpenEditor => {
                self.screen = Screen::Editor;
                self.mode = AppMode::Nav;
                vec![
                    AppEvent::ScreenChanged(self.screen),
                    AppEvent::ModeChanged(self.mode),
                ]
            }
            AppCommand::CloseEditor => {
                self.screen = Screen::Explorer;
                self.mode = AppMode::Nav;
                vec![
                    AppEvent::ScreenChanged(self.screen),
                    AppEvent::ModeChanged(self.mode),
                ]
            }
            AppCommand::StartSearch => {
                if self.screen != Screen::Editor {
                    return Vec::new();
                }
                self.mode = AppMode::Search;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::OpenForm(kind) => {
                self.mode = AppMode::Form(kind);
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::ExitToNav => {
                self.mode = AppMode::Nav;
                vec![AppEvent::ModeChanged(self.mode)]
            }
            AppCommand::SetStatus(message) => vec![self.set_status(&message)],
            AppCommand::ClearStatus => {
                self.status_line = None;
                vec![AppEvent::StatusCleared]
            }
        }
    }

    fn rotate_tab(&mut self, delta: isize) -> Vec<AppEvent> {
        if self.screen == Screen::Editor || self.mode != AppMode::Nav {
            return Vec::new();
        }
        let tabs = Screen::TABS;
        let current = tabs
            .iter()
            .position(|tab| *tab == self.screen)
            .unwrap_or(0) as isize;
        let len = tabs.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.screen = tabs[next];
        vec![AppEvent::ScreenChanged(self.screen)]
    }

    fn set_status(&mut self, message: &str) -> AppEvent {
        self.status_line = Some(message.to_owned());
        AppEvent::StatusUpdated(message.to_owned())
    }
}
