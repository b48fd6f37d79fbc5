//! Shared types for pet-launcher
//!
//! This crate contains the plain data exchanged between the search worker,
//! the controller that owns it, and whatever front end renders results.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A validated search request
///
/// The term is trimmed and case-folded once here so the worker never has to
/// re-normalise it. The root list is a snapshot taken when the request was
/// created; later configuration edits do not affect a running search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSearchRequest")]
pub struct SearchRequest {
    term: String,
    folded_term: String,
    roots: Vec<PathBuf>,
}

/// Wire shape of a request; always validated through [`SearchRequest::new`]
#[derive(Deserialize)]
struct RawSearchRequest {
    term: String,
    roots: Vec<PathBuf>,
}

impl TryFrom<RawSearchRequest> for SearchRequest {
    type Error = RequestError;

    fn try_from(raw: RawSearchRequest) -> Result<Self, Self::Error> {
        Self::new(raw.term, raw.roots)
    }
}

impl SearchRequest {
    /// Build a request, rejecting empty terms and empty root sets
    pub fn new(term: impl AsRef<str>, roots: Vec<PathBuf>) -> Result<Self, RequestError> {
        let term = term.as_ref().trim();
        if term.is_empty() {
            return Err(RequestError::EmptyTerm);
        }
        if roots.is_empty() {
            return Err(RequestError::NoRoots);
        }

        Ok(Self {
            term: term.to_string(),
            folded_term: term.to_lowercase(),
            roots,
        })
    }

    /// The term as the user typed it (trimmed)
    pub fn term(&self) -> &str {
        &self.term
    }

    /// Lower-cased term used for matching
    pub fn folded_term(&self) -> &str {
        &self.folded_term
    }

    /// Roots in the order they will be searched
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}

/// Reasons a request is refused before any search starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestError {
    /// Search term was empty or whitespace
    EmptyTerm,
    /// No root directories to search
    NoRoots,
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::EmptyTerm => write!(f, "Search term must not be empty"),
            RequestError::NoRoots => write!(f, "No search directories configured"),
        }
    }
}

impl std::error::Error for RequestError {}

/// A launchable file found by the search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Name shown to the user
    pub display_name: String,
    /// Path handed to the launcher
    pub target_path: PathBuf,
    /// Whether the hit was a shortcut file (resolved or not)
    pub via_shortcut: bool,
}

impl SearchResult {
    pub fn new(display_name: impl Into<String>, target_path: impl AsRef<Path>) -> Self {
        Self {
            display_name: display_name.into(),
            target_path: target_path.as_ref().to_path_buf(),
            via_shortcut: false,
        }
    }

    pub fn from_shortcut(display_name: impl Into<String>, target_path: impl AsRef<Path>) -> Self {
        Self {
            via_shortcut: true,
            ..Self::new(display_name, target_path)
        }
    }
}

/// Diagnostics gathered while walking
///
/// Purely informational: a search with skipped subtrees still completes
/// normally and is indistinguishable from one that simply found less.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub matched: usize,
    pub skipped_subtrees: usize,
    pub skipped_roots: usize,
    pub cancelled: bool,
}

/// Item flowing from the worker to the consumer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchEvent {
    /// One matching file
    Found { generation: u64, result: SearchResult },
    /// Completion sentinel, always the last event of a search
    Complete { generation: u64, stats: SearchStats },
}

impl SearchEvent {
    /// Search this event belongs to
    pub fn generation(&self) -> u64 {
        match self {
            SearchEvent::Found { generation, .. } | SearchEvent::Complete { generation, .. } => {
                *generation
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, SearchEvent::Complete { .. })
    }

    /// Single-line JSON form, used for machine-readable output
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Entry in the games catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEntry {
    pub name: String,
    pub path: String,
}

impl GameEntry {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl From<&SearchResult> for GameEntry {
    fn from(result: &SearchResult) -> Self {
        Self {
            name: result.display_name.clone(),
            path: result.target_path.to_string_lossy().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_trims_and_folds_term() {
        let request = SearchRequest::new("  Mario ", vec![PathBuf::from("/games")]).unwrap();
        assert_eq!(request.term(), "Mario");
        assert_eq!(request.folded_term(), "mario");
        assert_eq!(request.roots(), &[PathBuf::from("/games")]);
    }

    #[test]
    fn request_rejects_blank_term() {
        let err = SearchRequest::new("   ", vec![PathBuf::from("/games")]).unwrap_err();
        assert_eq!(err, RequestError::EmptyTerm);
    }

    #[test]
    fn request_rejects_missing_roots() {
        let err = SearchRequest::new("mario", Vec::new()).unwrap_err();
        assert_eq!(err, RequestError::NoRoots);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = SearchEvent::Complete {
            generation: 3,
            stats: SearchStats::default(),
        };
        let json = event.to_json().unwrap();
        assert!(json.contains("\"type\":\"complete\""));
        assert!(json.contains("\"generation\":3"));
    }

    #[test]
    fn decoded_request_is_validated() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"term":" Mario ","folded_term":"zelda","roots":["/games"]}"#)
                .unwrap();
        assert_eq!(request.term(), "Mario");
        assert_eq!(request.folded_term(), "mario");

        let empty = serde_json::from_str::<SearchRequest>(r#"{"term":"  ","roots":["/games"]}"#);
        assert!(empty.is_err());
        let rootless = serde_json::from_str::<SearchRequest>(r#"{"term":"mario","roots":[]}"#);
        assert!(rootless.is_err());
    }
}
