//! Recursive walk producing search events
//!
//! Runs on the worker thread. Every per-entry problem is absorbed here; the
//! only thing the consumer ever sees is results followed by one completion.

use std::path::Path;
use std::sync::mpsc::Sender;

use pet_launcher_core::{SearchEvent, SearchRequest, SearchResult, SearchStats};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use super::matcher::{self, CandidateKind};
use super::session::CancellationToken;
use super::shortcut::{Resolution, ShortcutResolver};

/// Walk every root of `request`, streaming matches into `sink`.
///
/// Always finishes by sending exactly one [`SearchEvent::Complete`], also
/// when cancelled or when no root exists. Nothing but that sentinel is sent
/// once cancellation has been observed.
pub fn run(
    request: &SearchRequest,
    token: &CancellationToken,
    resolver: &dyn ShortcutResolver,
    sink: &Sender<SearchEvent>,
    generation: u64,
) -> SearchStats {
    let mut stats = SearchStats::default();

    'roots: for root in request.roots() {
        if token.is_cancelled() {
            stats.cancelled = true;
            break;
        }

        if !root.is_dir() {
            debug!("Skipping missing root {:?}", root);
            stats.skipped_roots += 1;
            continue;
        }

        let walker = WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !is_hidden_subdir(e));

        for entry in walker {
            // Checked for every directory and file before it is handled
            if token.is_cancelled() {
                stats.cancelled = true;
                break 'roots;
            }

            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    // Unreadable directory: walkdir drops its subtree and moves on
                    debug!("Error walking {:?}: {}", e.path().unwrap_or(root.as_path()), e);
                    stats.skipped_subtrees += 1;
                    continue;
                }
            };

            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            let Some(kind) = CandidateKind::classify(path) else {
                continue;
            };
            if !matcher::matches(request.folded_term(), path) {
                continue;
            }

            let result = build_result(kind, path, resolver);
            let event = SearchEvent::Found { generation, result };
            if sink.send(event).is_err() {
                // Nobody is listening any more, same as being cancelled
                stats.cancelled = true;
                break 'roots;
            }
            stats.matched += 1;
        }
    }

    let _ = sink.send(SearchEvent::Complete { generation, stats });
    stats
}

fn is_hidden_subdir(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && matcher::is_hidden_dir(&entry.file_name().to_string_lossy())
}

/// Turn a matching file into a result, resolving shortcuts when possible
fn build_result(kind: CandidateKind, path: &Path, resolver: &dyn ShortcutResolver) -> SearchResult {
    match kind {
        CandidateKind::Executable => SearchResult::new(file_stem(path), path),
        CandidateKind::Shortcut => match resolver.resolve(path) {
            Resolution::Resolved(target) => {
                let target_str = target.to_string_lossy();
                if matcher::is_executable_target(&target_str) {
                    SearchResult::from_shortcut(matcher::display_stem(&target_str), &target)
                } else {
                    debug!("Shortcut {:?} points at non-executable {:?}", path, target);
                    SearchResult::from_shortcut(file_stem(path), path)
                }
            }
            Resolution::Failed | Resolution::Unsupported => {
                SearchResult::from_shortcut(file_stem(path), path)
            }
        },
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::shortcut::tests::link_with_local_path;
    use crate::search::shortcut::{LinkFileResolver, UnsupportedResolver};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::mpsc;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn collect(
        term: &str,
        roots: Vec<PathBuf>,
        resolver: &dyn ShortcutResolver,
    ) -> (Vec<SearchResult>, Vec<SearchEvent>) {
        let request = SearchRequest::new(term, roots).unwrap();
        let (tx, rx) = mpsc::channel();
        run(&request, &CancellationToken::new(), resolver, &tx, 1);
        drop(tx);

        let events: Vec<SearchEvent> = rx.iter().collect();
        let results = events
            .iter()
            .filter_map(|e| match e {
                SearchEvent::Found { result, .. } => Some(result.clone()),
                SearchEvent::Complete { .. } => None,
            })
            .collect();
        (results, events)
    }

    fn names(results: &[SearchResult]) -> Vec<String> {
        let mut names: Vec<String> = results.iter().map(|r| r.display_name.clone()).collect();
        names.sort();
        names
    }

    #[test]
    fn finds_executables_by_name_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("SuperMario.exe"));
        touch(&root.join("Games/Mario/foo.exe"));
        touch(&root.join("Games/SuperMarioBros/bar.exe"));
        touch(&root.join("Games/Mario/readme.txt"));

        let (results, events) = collect("mario", vec![root.to_path_buf()], &UnsupportedResolver);
        assert_eq!(names(&results), vec!["SuperMario", "foo"]);

        let completions = events.iter().filter(|e| e.is_complete()).count();
        assert_eq!(completions, 1);
        assert!(events.last().unwrap().is_complete());

        let (results, _) = collect("SuperMarioBros", vec![root.to_path_buf()], &UnsupportedResolver);
        assert_eq!(names(&results), vec!["bar"]);
    }

    #[test]
    fn text_files_never_match() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("launcher/readme.txt"));
        touch(&dir.path().join("launcher/launcher.exe"));
        touch(&dir.path().join("launcher/launcher.lnk"));

        let (results, _) = collect("launcher", vec![dir.path().to_path_buf()], &UnsupportedResolver);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.target_path.ends_with("readme.txt")));
    }

    #[test]
    fn unresolved_shortcut_falls_back_to_itself() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("Mario Kart.lnk");
        touch(&link);

        let (results, _) = collect("kart", vec![dir.path().to_path_buf()], &LinkFileResolver::new());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].display_name, "Mario Kart");
        assert_eq!(results[0].target_path, link);
        assert!(results[0].via_shortcut);
    }

    #[test]
    fn resolved_shortcut_reports_target() {
        let dir = tempfile::tempdir().unwrap();
        let link = dir.path().join("Play Zelda.lnk");
        fs::write(&link, link_with_local_path(r"C:\Games\Zelda\Zelda.exe")).unwrap();
        let doc = dir.path().join("Zelda Manual.lnk");
        fs::write(&doc, link_with_local_path(r"C:\Games\Zelda\manual.pdf")).unwrap();

        let (results, _) = collect("zelda", vec![dir.path().to_path_buf()], &LinkFileResolver::new());
        let mut results = results;
        results.sort_by(|a, b| a.display_name.cmp(&b.display_name));

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].display_name, "Zelda");
        assert_eq!(results[0].target_path, PathBuf::from(r"C:\Games\Zelda\Zelda.exe"));
        assert_eq!(results[1].display_name, "Zelda Manual");
        assert_eq!(results[1].target_path, doc);
    }

    #[test]
    fn hidden_directories_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join(".git/hooks/mario.exe"));
        touch(&dir.path().join(".mario/game.exe"));
        touch(&dir.path().join("visible/mario.exe"));

        let (results, _) = collect("mario", vec![dir.path().to_path_buf()], &UnsupportedResolver);
        assert_eq!(results.len(), 1);
        assert!(results[0].target_path.starts_with(dir.path().join("visible")));
    }

    #[test]
    fn invalid_roots_still_complete() {
        let dir = tempfile::tempdir().unwrap();
        let file_root = dir.path().join("not-a-dir.exe");
        touch(&file_root);

        let request = SearchRequest::new(
            "mario",
            vec![dir.path().join("missing"), file_root],
        )
        .unwrap();
        let (tx, rx) = mpsc::channel();
        let stats = run(&request, &CancellationToken::new(), &UnsupportedResolver, &tx, 7);
        drop(tx);

        let events: Vec<SearchEvent> = rx.iter().collect();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].generation(), 7);
        assert_eq!(stats.skipped_roots, 2);
        assert_eq!(stats.matched, 0);
    }

    #[test]
    fn roots_are_searched_in_order() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        touch(&first.path().join("mario-one.exe"));
        touch(&second.path().join("mario-two.exe"));

        let (results, _) = collect(
            "mario",
            vec![first.path().to_path_buf(), second.path().to_path_buf()],
            &UnsupportedResolver,
        );
        let order: Vec<&str> = results.iter().map(|r| r.display_name.as_str()).collect();
        assert_eq!(order, vec!["mario-one", "mario-two"]);
    }

    #[test]
    fn cancelled_token_emits_only_completion() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("mario.exe"));

        let request = SearchRequest::new("mario", vec![dir.path().to_path_buf()]).unwrap();
        let token = CancellationToken::new();
        token.cancel();

        let (tx, rx) = mpsc::channel();
        let stats = run(&request, &token, &UnsupportedResolver, &tx, 1);
        drop(tx);

        let events: Vec<SearchEvent> = rx.iter().collect();
        assert_eq!(events.len(), 1);
        assert!(events[0].is_complete());
        assert!(stats.cancelled);
    }

    #[test]
    fn disconnected_consumer_stops_the_walk() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("a/mario.exe"));
        touch(&dir.path().join("b/mario.exe"));

        let request = SearchRequest::new("mario", vec![dir.path().to_path_buf()]).unwrap();
        let (tx, rx) = mpsc::channel();
        drop(rx);

        let stats = run(&request, &CancellationToken::new(), &UnsupportedResolver, &tx, 1);
        assert!(stats.cancelled);
        assert_eq!(stats.matched, 0);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_subtree_does_not_stop_the_search() {
        use std::os::unix::fs::PermissionsExt;

        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        let locked = first.path().join("locked");
        touch(&locked.join("mario-hidden.exe"));
        touch(&first.path().join("open/mario-sibling.exe"));
        touch(&second.path().join("mario-next-root.exe"));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        // Root ignores permission bits, in which case there is nothing to test
        let readable_anyway = fs::read_dir(&locked).is_ok();

        let request = SearchRequest::new(
            "mario",
            vec![first.path().to_path_buf(), second.path().to_path_buf()],
        )
        .unwrap();
        let (tx, rx) = mpsc::channel();
        let stats = run(&request, &CancellationToken::new(), &UnsupportedResolver, &tx, 1);
        drop(tx);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let found: Vec<String> = rx
            .iter()
            .filter_map(|e| match e {
                SearchEvent::Found { result, .. } => Some(result.display_name),
                SearchEvent::Complete { .. } => None,
            })
            .collect();

        assert!(found.contains(&"mario-sibling".to_string()));
        assert!(found.contains(&"mario-next-root".to_string()));
        if !readable_anyway {
            assert_eq!(stats.skipped_subtrees, 1);
            assert!(!found.contains(&"mario-hidden".to_string()));
        }
    }

    /// Resolver that cancels the search the first time it is asked
    struct CancelOnResolve {
        token: CancellationToken,
    }

    impl ShortcutResolver for CancelOnResolve {
        fn resolve(&self, _path: &Path) -> Resolution {
            self.token.cancel();
            Resolution::Unsupported
        }

        fn name(&self) -> &'static str {
            "cancel-on-resolve"
        }
    }

    #[test]
    fn nothing_but_the_sentinel_follows_a_mid_walk_cancel() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..20 {
            touch(&dir.path().join(format!("sub{i}/mario{i}.lnk")));
        }

        let token = CancellationToken::new();
        let resolver = CancelOnResolve {
            token: token.clone(),
        };
        let request = SearchRequest::new("mario", vec![dir.path().to_path_buf()]).unwrap();
        let (tx, rx) = mpsc::channel();
        let stats = run(&request, &token, &resolver, &tx, 3);
        drop(tx);

        let events: Vec<SearchEvent> = rx.iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SearchEvent::Found { generation: 3, .. }));
        assert!(matches!(
            events[1],
            SearchEvent::Complete { generation: 3, stats: SearchStats { cancelled: true, matched: 1, .. } }
        ));
        assert!(stats.cancelled);
        assert_eq!(stats.matched, 1);
    }
}
