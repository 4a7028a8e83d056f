// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Keyboard layouts for composing bopomofo readings from typed keys.

/// Physical key rows of a US keyboard, top to bottom.
const KEY_ROWS: [&str; 4] = ["1234567890-", "qwertyuiop", "asdfghjkl;", "zxcvbnm,./"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Keymap {
    pub name: &'static str,
    pub layout: [&'static [&'static str]; 4],
}

pub const STANDARD: Keymap = Keymap {
    name: "Standard",
    layout: [
        &["ㄅ", "ㄉ", "ˇ", "ˋ", "ㄓ", "ˊ", "˙", "ㄚ", "ㄞ", "ㄢ", "ㄦ"],
        &["ㄆ", "ㄊ", "ㄍ", "ㄐ", "ㄔ", "ㄗ", "ㄧ", "ㄛ", "ㄟ", "ㄣ"],
        &["ㄇ", "ㄋ", "ㄎ", "ㄑ", "ㄕ", "ㄘ", "ㄨ", "ㄜ", "ㄠ", "ㄤ"],
        &["ㄈ", "ㄌ", "ㄏ", "ㄒ", "ㄖ", "ㄙ", "ㄩ", "ㄝ", "ㄡ", "ㄥ"],
    ],
};

pub static ALL: [Keymap; 1] = [STANDARD];

pub fn by_name(name: &str) -> Option<&'static Keymap> {
    ALL.iter().find(|keymap| keymap.name.eq_ignore_ascii_case(name))
}

impl Keymap {
    pub fn symbol_for(&self, key: char) -> Option<&'static str> {
        let key = key.to_ascii_lowercase();
        KEY_ROWS
            .iter()
            .zip(self.layout.iter())
            .find_map(|(keys, symbols)| {
                keys.chars()
                    .position(|candidate| candidate == key)
                    .and_then(|column| symbols.get(column).copied())
            })
    }

    /// Translates typed keys into a reading. Keys outside the layout, including
    /// the space between syllables, are kept as typed.
    pub fn compose(&self, keys: &str) -> String {
        keys.chars()
            .fold(String::with_capacity(keys.len() * 3), |mut out, key| {
                match self.symbol_for(key) {
                    Some(symbol) => out.push_str(symbol),
                    None => out.push(key),
                }
                out
            })
    }
}

#[cfg(test)]
mod tests {
    use super::{STANDARD, by_name};

    #[test]
    fn standard_rows_line_up_with_keys() {
        assert_eq!(STANDARD.symbol_for('1'), Some("ㄅ"));
        assert_eq!(STANDARD.symbol_for('-'), Some("ㄦ"));
        assert_eq!(STANDARD.symbol_for('u'), Some("ㄧ"));
        assert_eq!(STANDARD.symbol_for(';'), Some("ㄤ"));
        assert_eq!(STANDARD.symbol_for('/'), Some("ㄥ"));
        assert_eq!(STANDARD.symbol_for('Z'), Some("ㄈ"));
        assert_eq!(STANDARD.symbol_for('!'), None);
    }

    #[test]
    fn compose_builds_multi_syllable_reading() {
        assert_eq!(STANDARD.compose("vu06 dj4"), "ㄒㄧㄢˊ ㄎㄨˋ");
        assert_eq!(STANDARD.compose("5j4 up"), "ㄓㄨˋ ㄧㄣ");
    }

    #[test]
    fn compose_keeps_bopomofo_input() {
        assert_eq!(STANDARD.compose("ㄅㄚ"), "ㄅㄚ");
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(by_name("standard"), Some(&STANDARD));
        assert_eq!(by_name("dvorak"), None);
    }
}
