// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Bopomofo reading syntax.
//!
//! A reading is a whitespace separated list of syllables. Each syllable is
//! written initial, medial, rime, tone, where every part is optional but at
//! least one of the first three must be present.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Slot {
    Initial,
    Medial,
    Rime,
    Tone,
}

impl Slot {
    fn of(symbol: char) -> Option<Self> {
        match symbol {
            'ㄅ'..='ㄙ' => Some(Self::Initial),
            'ㄧ'..='ㄩ' => Some(Self::Medial),
            'ㄚ'..='ㄦ' => Some(Self::Rime),
            '˙' | 'ˊ' | 'ˇ' | 'ˋ' | 'ˉ' => Some(Self::Tone),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingError {
    Empty,
    UnknownSymbol { cluster: String, symbol: char },
    OutOfOrder { cluster: String, symbol: char },
    ToneOnly { cluster: String },
}

impl fmt::Display for ReadingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("bopomofo reading is required"),
            Self::UnknownSymbol { cluster, symbol } => write!(
                f,
                "{cluster:?} is not a valid syllable: {symbol:?} is not a bopomofo symbol -- separate syllables with spaces"
            ),
            Self::OutOfOrder { cluster, symbol } => write!(
                f,
                "{cluster:?} is not a valid syllable: {symbol:?} is out of place -- write initial, medial, rime, then tone"
            ),
            Self::ToneOnly { cluster } => write!(
                f,
                "{cluster:?} is not a valid syllable: a tone mark needs a sound before it"
            ),
        }
    }
}

impl std::error::Error for ReadingError {}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Syllable {
    pub initial: Option<char>,
    pub medial: Option<char>,
    pub rime: Option<char>,
    pub tone: Option<char>,
}

impl FromStr for Syllable {
    type Err = ReadingError;

    fn from_str(cluster: &str) -> Result<Self, Self::Err> {
        let mut syllable = Self::default();
        let mut last: Option<Slot> = None;
        for symbol in cluster.chars() {
            let slot = Slot::of(symbol).ok_or_else(|| ReadingError::UnknownSymbol {
                cluster: cluster.to_owned(),
                symbol,
            })?;
            if last.is_some_and(|previous| previous >= slot) {
                return Err(ReadingError::OutOfOrder {
                    cluster: cluster.to_owned(),
                    symbol,
                });
            }
            last = Some(slot);
            match slot {
                Slot::Initial => syllable.initial = Some(symbol),
                Slot::Medial => syllable.medial = Some(symbol),
                Slot::Rime => syllable.rime = Some(symbol),
                Slot::Tone => syllable.tone = Some(symbol),
            }
        }
        if syllable.initial.is_none() && syllable.medial.is_none() && syllable.rime.is_none() {
            return Err(ReadingError::ToneOnly {
                cluster: cluster.to_owned(),
            });
        }
        Ok(syllable)
    }
}

impl fmt::Display for Syllable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for symbol in [self.initial, self.medial, self.rime, self.tone]
            .into_iter()
            .flatten()
        {
            write!(f, "{symbol}")?;
        }
        Ok(())
    }
}

/// Replaces look-alike characters users commonly type: the visible space
/// `␣` and the CJK numeral `一`, which is easy to confuse with `ㄧ`.
pub fn normalize(input: &str) -> String {
    input.replace('␣', " ").replace('一', "ㄧ")
}

pub fn parse_reading(input: &str) -> Result<Vec<Syllable>, ReadingError> {
    let normalized = normalize(input);
    let clusters: Vec<&str> = normalized.split_whitespace().collect();
    if clusters.is_empty() {
        return Err(ReadingError::Empty);
    }
    clusters.into_iter().map(Syllable::from_str).collect()
}

/// Parses `input` and writes it back with single spaces between syllables.
pub fn canonical_reading(input: &str) -> Result<String, ReadingError> {
    let syllables = parse_reading(input)?;
    Ok(syllables
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" "))
}
