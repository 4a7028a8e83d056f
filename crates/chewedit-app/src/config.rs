// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// Actions that can be bound to a key combination.
pub const KEYBIND_ACTIONS: [&str; 2] = ["toggle_simplified_chinese", "toggle_hsu_keyboard"];

pub const UPDATE_CHANNELS: [&str; 3] = ["none", "stable", "development"];

const KEYBOARD_LAYOUTS: [(i32, &str); 10] = [
    (0, "標準鍵盤"),
    (1, "許氏鍵盤"),
    (2, "IBM 鍵盤"),
    (3, "精業鍵盤"),
    (4, "倚天鍵盤"),
    (5, "倚天 26 鍵"),
    (8, "大千 26 鍵"),
    (9, "漢語拼音"),
    (10, "台灣華語羅馬拼音"),
    (11, "注音二式"),
];

const SEL_KEYS: [&str; 6] = [
    "1234567890",
    "asdfghjkl;",
    "asdfzxcv89",
    "asdfjkl789",
    "aoeuhtn789",
    "1234qweras",
];

const CONV_ENGINES: [&str; 3] = ["簡單注音", "智慧選詞", "模糊智慧選詞"];

const ENGLISH_LAYOUTS: [&str; 7] = [
    "無",
    "Dvorak",
    "Carplx (QGMLWY)",
    "Colemak",
    "Colemak-DH ANSI",
    "Colemak-DH Orth",
    "Workman",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keybinding {
    pub key: String,
    pub action: String,
}

/// Input method settings. The editing core never interprets these beyond the
/// keybinding upsert and the label helpers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TsfSettings {
    pub switch_lang_with_shift: bool,
    pub enable_fullwidth_toggle_key: bool,
    pub enable_caps_lock: bool,
    pub show_notification: bool,
    pub enable_auto_learn: bool,
    pub esc_clean_all_buf: bool,
    pub full_shape_symbols: bool,
    pub upper_case_with_shift: bool,
    pub add_phrase_forward: bool,
    pub phrase_choice_rearward: bool,
    pub easy_symbols_with_shift: bool,
    pub easy_symbols_with_shift_ctrl: bool,
    pub cursor_cand_list: bool,
    pub show_cand_with_space_key: bool,
    pub advance_after_selection: bool,
    pub default_full_space: bool,
    pub default_english: bool,
    pub output_simp_chinese: bool,
    pub sel_key_type: i32,
    pub conv_engine: i32,
    pub cand_per_row: i32,
    pub cand_per_page: i32,
    pub font_size: i32,
    pub font_family: String,
    pub font_fg_color: String,
    pub font_bg_color: String,
    pub font_highlight_fg_color: String,
    pub font_highlight_bg_color: String,
    pub font_number_fg_color: String,
    pub keyboard_layout: i32,
    pub simulate_english_layout: i32,
    pub shift_key_sensitivity: i32,
    pub auto_check_update_channel: String,
    pub keybind: Vec<Keybinding>,
}

impl Default for TsfSettings {
    fn default() -> Self {
        Self {
            switch_lang_with_shift: true,
            enable_fullwidth_toggle_key: false,
            enable_caps_lock: true,
            show_notification: true,
            enable_auto_learn: true,
            esc_clean_all_buf: false,
            full_shape_symbols: true,
            upper_case_with_shift: false,
            add_phrase_forward: true,
            phrase_choice_rearward: false,
            easy_symbols_with_shift: true,
            easy_symbols_with_shift_ctrl: false,
            cursor_cand_list: true,
            show_cand_with_space_key: false,
            advance_after_selection: true,
            default_full_space: false,
            default_english: false,
            output_simp_chinese: false,
            sel_key_type: 0,
            conv_engine: 1,
            cand_per_row: 3,
            cand_per_page: 9,
            font_size: 16,
            font_family: "Segoe UI".to_owned(),
            font_fg_color: "000000FF".to_owned(),
            font_bg_color: "FAFAFAFF".to_owned(),
            font_highlight_fg_color: "FFFFFFFF".to_owned(),
            font_highlight_bg_color: "000000FF".to_owned(),
            font_number_fg_color: "0000FFFF".to_owned(),
            keyboard_layout: 0,
            simulate_english_layout: 0,
            shift_key_sensitivity: 200,
            auto_check_update_channel: "stable".to_owned(),
            keybind: Vec::new(),
        }
    }
}

/// Everything the settings screen loads and saves in one piece.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImeConfig {
    pub symbols_dat: String,
    pub swkb_dat: String,
    pub chewing_tsf: TsfSettings,
}

impl ImeConfig {
    /// Binds `key` to `action`. An existing binding for the action keeps its
    /// position; otherwise the binding goes to the end.
    pub fn set_keybind(&mut self, action: &str, key: &str) {
        let keybind = &mut self.chewing_tsf.keybind;
        match keybind.iter_mut().find(|binding| binding.action == action) {
            Some(binding) => binding.key = key.to_owned(),
            None => keybind.push(Keybinding {
                key: key.to_owned(),
                action: action.to_owned(),
            }),
        }
    }

    pub fn keybind_for(&self, action: &str) -> &str {
        self.chewing_tsf
            .keybind
            .iter()
            .find(|binding| binding.action == action)
            .map_or("", |binding| binding.key.as_str())
    }

    pub fn validate(&self) -> Result<()> {
        let settings = &self.chewing_tsf;
        for (field, value) in [
            ("cand_per_row", settings.cand_per_row),
            ("cand_per_page", settings.cand_per_page),
        ] {
            if !(1..=10).contains(&value) {
                bail!("chewing_tsf.{field} must be between 1 and 10, got {value}");
            }
        }
        if settings.font_size <= 0 {
            bail!(
                "chewing_tsf.font_size must be positive, got {}",
                settings.font_size
            );
        }
        if !(100..=1000).contains(&settings.shift_key_sensitivity) {
            bail!(
                "chewing_tsf.shift_key_sensitivity must be between 100 and 1000 ms, got {}",
                settings.shift_key_sensitivity
            );
        }
        if !indexes(settings.sel_key_type, SEL_KEYS.len()) {
            bail!(
                "chewing_tsf.sel_key_type must be 0-{}, got {}",
                SEL_KEYS.len() - 1,
                settings.sel_key_type
            );
        }
        if !indexes(settings.conv_engine, CONV_ENGINES.len()) {
            bail!(
                "chewing_tsf.conv_engine must be 0-{}, got {}",
                CONV_ENGINES.len() - 1,
                settings.conv_engine
            );
        }
        if !KEYBOARD_LAYOUTS
            .iter()
            .any(|(value, _)| *value == settings.keyboard_layout)
        {
            bail!(
                "chewing_tsf.keyboard_layout {} is not a known layout -- use one of {}",
                settings.keyboard_layout,
                KEYBOARD_LAYOUTS
                    .iter()
                    .map(|(value, _)| value.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        if !indexes(settings.simulate_english_layout, ENGLISH_LAYOUTS.len()) {
            bail!(
                "chewing_tsf.simulate_english_layout must be 0-{}, got {}",
                ENGLISH_LAYOUTS.len() - 1,
                settings.simulate_english_layout
            );
        }
        if !UPDATE_CHANNELS.contains(&settings.auto_check_update_channel.as_str()) {
            bail!(
                "chewing_tsf.auto_check_update_channel {:?} is not valid -- use one of {}",
                settings.auto_check_update_channel,
                UPDATE_CHANNELS.join(", ")
            );
        }
        for (field, value) in [
            ("font_fg_color", &settings.font_fg_color),
            ("font_bg_color", &settings.font_bg_color),
            ("font_highlight_fg_color", &settings.font_highlight_fg_color),
            ("font_highlight_bg_color", &settings.font_highlight_bg_color),
            ("font_number_fg_color", &settings.font_number_fg_color),
        ] {
            if value.len() != 8 || !value.chars().all(|ch| ch.is_ascii_hexdigit()) {
                bail!("chewing_tsf.{field} must be 8 hex digits (RRGGBBAA), got {value:?}");
            }
        }
        Ok(())
    }
}

fn indexes(value: i32, len: usize) -> bool {
    usize::try_from(value).is_ok_and(|index| index < len)
}

pub fn sel_keys_label(sel_key_type: i32) -> &'static str {
    usize::try_from(sel_key_type)
        .ok()
        .and_then(|index| SEL_KEYS.get(index))
        .copied()
        .unwrap_or(SEL_KEYS[0])
}

pub fn conv_engine_label(conv_engine: i32) -> &'static str {
    usize::try_from(conv_engine)
        .ok()
        .and_then(|index| CONV_ENGINES.get(index))
        .copied()
        .unwrap_or(CONV_ENGINES[1])
}

pub fn keyboard_layout_label(layout: i32) -> &'static str {
    KEYBOARD_LAYOUTS
        .iter()
        .find(|(value, _)| *value == layout)
        .map_or(KEYBOARD_LAYOUTS[0].1, |(_, label)| label)
}

pub fn english_layout_label(layout: i32) -> &'static str {
    usize::try_from(layout)
        .ok()
        .and_then(|index| ENGLISH_LAYOUTS.get(index))
        .copied()
        .unwrap_or(ENGLISH_LAYOUTS[0])
}

pub fn update_channel_label(channel: &str) -> &'static str {
    match channel {
        "none" => "停用",
        "development" => "預覽版",
        _ => "穩定版",
    }
}
