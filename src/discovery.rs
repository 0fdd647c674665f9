//! File discovery and source loading.
//!
//! Walks a directory tree for `.bas`/`.cls`/`.frm` files, decodes each as
//! Latin-1 (the encoding exported modules are conventionally saved in), and
//! for `.frm` files strips the binary-ish GUI header down to the first
//! `Attribute VB_Name` line and harvests `Begin <Class.Type> <Name>` control
//! declarations so they can be appended to the module as public variables.
//! Grounded in `original_source/src/discovery.py`'s `load_module_file` /
//! `harvest_form_controls`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use ignore::WalkBuilder;

use crate::ast::ModuleKind;

/// Map a file extension to the module kind it produces, or `None` if the
/// extension isn't one this analyzer reads.
pub fn module_kind_for_extension(ext: &str) -> Option<ModuleKind> {
    match ext.to_ascii_lowercase().as_str() {
        "bas" => Some(ModuleKind::Module),
        "cls" => Some(ModuleKind::Class),
        "frm" => Some(ModuleKind::Form),
        _ => None,
    }
}

/// Recursively discover `.bas`/`.cls`/`.frm` files under `root`, respecting
/// `.gitignore` and skipping hidden entries. Order is not guaranteed.
pub fn discover_source_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .require_git(false)
        .build();

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let ext = match entry.path().extension().and_then(|e| e.to_str()) {
            Some(e) => e,
            None => continue,
        };
        if module_kind_for_extension(ext).is_some() {
            files.push(entry.path().to_path_buf());
        }
    }

    Ok(files)
}

/// Read `path`'s bytes and decode them as Latin-1 — every byte maps
/// directly to the Unicode code point of the same value, so this can never
/// fail on input UTF-8 would reject.
pub fn read_source_latin1(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(bytes.into_iter().map(|b| b as char).collect())
}

/// For `.frm` files, drop everything before the line containing the first
/// `Attribute VB_Name` occurrence. Files without that marker are returned
/// unchanged (recovery: let the parser's own recovery handle the rest).
pub fn strip_frm_header(text: &str) -> &str {
    match text.find("Attribute VB_Name") {
        None => text,
        Some(idx) => {
            let line_start = text[..idx].rfind('\n').map(|p| p + 1).unwrap_or(0);
            &text[line_start..]
        }
    }
}

/// Harvest `Begin <Class.Type> <Name>` declarations from a form's GUI
/// header section. Indentation is ignored; every matching line anywhere in
/// the text is collected, including the form's own top-level `Begin` line.
/// Returns `(class_type, control_name)` pairs borrowing from `text`.
pub fn harvest_form_controls(text: &str) -> Vec<(&str, &str)> {
    let mut controls = Vec::new();
    for line in text.lines() {
        let trimmed = line.trim_start();
        let rest = match strip_ci_prefix(trimmed, "begin") {
            Some(r) if r.starts_with(char::is_whitespace) => r,
            _ => continue,
        };
        let parts: Vec<&str> = rest.split_whitespace().collect();
        if parts.len() == 2 {
            controls.push((parts[0], parts[1]));
        }
    }
    controls
}

fn strip_ci_prefix<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    if s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}
