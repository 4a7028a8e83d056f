// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use chewedit_app::FontFamily;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

const FONT_EXTENSIONS: [&str; 4] = ["ttf", "otf", "ttc", "otc"];
const MAX_DEPTH: usize = 6;

/// Platform font directories that exist on this machine.
pub fn font_dirs() -> Vec<PathBuf> {
    let mut dirs_found = Vec::new();
    if let Some(user_fonts) = dirs::font_dir() {
        dirs_found.push(user_fonts);
    }
    for system in [
        "/usr/share/fonts",
        "/usr/local/share/fonts",
        "/Library/Fonts",
        "/System/Library/Fonts",
    ] {
        dirs_found.push(PathBuf::from(system));
    }
    dirs_found.retain(|dir| dir.is_dir());
    dirs_found
}

pub fn system_fonts() -> Result<Vec<FontFamily>> {
    Ok(scan_fonts(&font_dirs()))
}

/// Font families found under `dirs`, one per family name. Families with
/// non-ASCII display names sort first. Entries that cannot be read are
/// skipped.
pub fn scan_fonts(dirs: &[PathBuf]) -> Vec<FontFamily> {
    let mut families = BTreeMap::new();
    for dir in dirs {
        let entries = WalkDir::new(dir)
            .max_depth(MAX_DEPTH)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(error) => {
                    debug!(%error, "skipping unreadable font entry");
                    None
                }
            });
        for entry in entries {
            if !entry.file_type().is_file() || !is_font_file(entry.path()) {
                continue;
            }
            if let Some(family) = entry
                .path()
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(family_from_stem)
            {
                families.entry(family.name.clone()).or_insert(family);
            }
        }
    }
    let mut fonts: Vec<FontFamily> = families.into_values().collect();
    fonts.sort_by(compare_fonts);
    debug!(count = fonts.len(), "scanned system fonts");
    fonts
}

fn is_font_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        FONT_EXTENSIONS
            .iter()
            .any(|candidate| ext.eq_ignore_ascii_case(candidate))
    })
}

/// `NotoSansCJK-Bold` becomes `NotoSansCJK` shown as `Noto Sans CJK`.
pub fn family_from_stem(stem: &str) -> Option<FontFamily> {
    let name = stem.split('-').next().unwrap_or(stem).replace('_', " ");
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    Some(FontFamily {
        name: name.to_owned(),
        display_name: split_words(name),
    })
}

fn split_words(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous: Option<char> = None;
    for ch in name.chars() {
        if let Some(prev) = previous
            && ch.is_ascii_uppercase()
            && prev.is_ascii_lowercase()
        {
            out.push(' ');
        }
        out.push(ch);
        previous = Some(ch);
    }
    out
}

fn compare_fonts(a: &FontFamily, b: &FontFamily) -> Ordering {
    let a_localized = !a.display_name.is_ascii();
    let b_localized = !b.display_name.is_ascii();
    b_localized
        .cmp(&a_localized)
        .then_with(|| a.display_name.cmp(&b.display_name))
}

#[cfg(test)]
mod tests {
    use super::{family_from_stem, scan_fonts};
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn family_names_drop_style_suffix() {
        let family = family_from_stem("NotoSansCJK-Bold").expect("family");
        assert_eq!(family.name, "NotoSansCJK");
        assert_eq!(family.display_name, "Noto Sans CJK");
        assert_eq!(
            family_from_stem("DejaVu_Sans").map(|f| f.display_name),
            Some("DejaVu Sans".to_owned())
        );
        assert!(family_from_stem("-Regular").is_none());
    }

    #[test]
    fn scan_dedups_and_puts_localized_first() -> Result<()> {
        let dir = tempdir()?;
        let nested = dir.path().join("truetype").join("noto");
        fs::create_dir_all(&nested)?;
        for file in [
            "NotoSans-Regular.ttf",
            "NotoSans-Bold.ttf",
            "Arial.TTF",
            "源泉圓體-Regular.otf",
            "readme.txt",
        ] {
            fs::write(nested.join(file), b"")?;
        }

        let fonts = scan_fonts(&[dir.path().to_path_buf()]);
        let names: Vec<_> = fonts.iter().map(|font| font.name.as_str()).collect();
        assert_eq!(names, vec!["源泉圓體", "Arial", "NotoSans"]);
        Ok(())
    }

    #[test]
    fn missing_dirs_are_ignored() -> Result<()> {
        let dir = tempdir()?;
        let fonts = scan_fonts(&[dir.path().join("nope")]);
        assert!(fonts.is_empty());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_entries_do_not_hide_other_fonts() -> Result<()> {
        use std::os::unix::fs::symlink;

        let dir = tempdir()?;
        let nested = dir.path().join("truetype");
        fs::create_dir_all(&nested)?;
        fs::write(nested.join("NotoSans-Regular.ttf"), b"")?;
        symlink(dir.path().join("gone.ttf"), nested.join("Broken-Regular.ttf"))?;
        symlink(dir.path(), nested.join("loop"))?;

        let fonts = scan_fonts(&[dir.path().to_path_buf()]);
        let names: Vec<_> = fonts.iter().map(|font| font.name.as_str()).collect();
        assert_eq!(names, vec!["NotoSans"]);
        Ok(())
    }
}
