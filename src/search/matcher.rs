//! Candidate filtering and term matching

use std::path::{Component, Path};

/// Extension of launchable binaries
pub const EXECUTABLE_EXTENSION: &str = "exe";
/// Extension of shell shortcut files
pub const SHORTCUT_EXTENSION: &str = "lnk";

/// Kind of file the search is interested in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Executable,
    Shortcut,
}

impl CandidateKind {
    /// Classify a file by extension (case-insensitive); `None` for anything else
    pub fn classify(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case(EXECUTABLE_EXTENSION) {
            Some(CandidateKind::Executable)
        } else if ext.eq_ignore_ascii_case(SHORTCUT_EXTENSION) {
            Some(CandidateKind::Shortcut)
        } else {
            None
        }
    }
}

/// Check whether a candidate file matches the (already lower-cased) term.
///
/// The file name matches on substring, while directory names must be equal
/// to the term as a whole. `Games/Mario/foo.exe` matches "mario" but
/// `Games/SuperMarioBros/foo.exe` does not.
pub fn matches(folded_term: &str, path: &Path) -> bool {
    let name_hit = path
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase().contains(folded_term))
        .unwrap_or(false);

    if name_hit {
        return true;
    }

    path.parent()
        .map(|dir| dir_has_component(dir, folded_term))
        .unwrap_or(false)
}

fn dir_has_component(dir: &Path, folded_term: &str) -> bool {
    dir.components().any(|component| match component {
        Component::Normal(name) => name.to_string_lossy().to_lowercase() == folded_term,
        _ => false,
    })
}

/// Directories starting with a dot are never walked
pub fn is_hidden_dir(name: &str) -> bool {
    name.starts_with('.')
}

/// Path ends in the executable extension.
///
/// Works on raw strings because resolved shortcut targets are usually
/// Windows paths, which `Path` does not split on non-Windows hosts.
pub fn is_executable_target(target: &str) -> bool {
    let name = file_name_of(target);
    match name.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && ext.eq_ignore_ascii_case(EXECUTABLE_EXTENSION),
        None => false,
    }
}

/// File name without extension, splitting on both separator styles
pub fn display_stem(target: &str) -> String {
    let name = file_name_of(target);
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => name.to_string(),
    }
}

fn file_name_of(target: &str) -> &str {
    target
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or(target)
}
