//! Search controller
//!
//! Owns the single result queue and at most one worker thread feeding it.
//! Restarting always cancels and joins the previous worker before the next
//! one is spawned, so two workers never write into the queue at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use pet_launcher_core::{SearchEvent, SearchRequest, SearchStats};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::shortcut::ShortcutResolver;
use super::walker;

/// Shared flag used to stop a running search cooperatively
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request stop
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Check if stop was requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// Session errors
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to spawn search worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Worker currently attached to the queue
struct ActiveSearch {
    generation: u64,
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Controller for background searches
pub struct SearchSession {
    resolver: Arc<dyn ShortcutResolver>,
    tx: Sender<SearchEvent>,
    rx: Receiver<SearchEvent>,
    active: Option<ActiveSearch>,
    generation: u64,
}

impl SearchSession {
    /// Create an idle session
    pub fn new(resolver: Arc<dyn ShortcutResolver>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            resolver,
            tx,
            rx,
            active: None,
            generation: 0,
        }
    }

    /// Start a new search, replacing any running one.
    ///
    /// Returns the generation number tagged on every event of this search.
    /// Events of the previous search that are still queued stay in the
    /// queue, ahead of anything the new worker produces.
    pub fn start(&mut self, request: SearchRequest) -> Result<u64, SessionError> {
        self.stop();

        self.generation += 1;
        let generation = self.generation;
        let token = CancellationToken::new();

        info!(
            "Search #{} started for {:?} across {} roots (resolver: {})",
            generation,
            request.term(),
            request.roots().len(),
            self.resolver.name()
        );

        let worker_token = token.clone();
        let resolver = Arc::clone(&self.resolver);
        let tx = self.tx.clone();
        let handle = thread::Builder::new()
            .name(format!("pet-search-{generation}"))
            .spawn(move || {
                let stats = walker::run(&request, &worker_token, &*resolver, &tx, generation);
                info!(
                    "Search #{} finished: {} matches, {} skipped subtrees, {} skipped roots{}",
                    generation,
                    stats.matched,
                    stats.skipped_subtrees,
                    stats.skipped_roots,
                    if stats.cancelled { " (cancelled)" } else { "" }
                );
            })?;

        self.active = Some(ActiveSearch {
            generation,
            token,
            handle,
        });

        Ok(generation)
    }

    /// Ask the running search to stop without waiting for it
    pub fn cancel(&self) {
        if let Some(active) = &self.active {
            debug!("Cancelling search #{}", active.generation);
            active.token.cancel();
        }
    }

    /// Cancel the running search and wait until its worker has exited
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.token.cancel();
            self.join(active);
        }
    }

    /// Drain every event queued so far without blocking
    pub fn poll(&mut self) -> Vec<SearchEvent> {
        let events: Vec<SearchEvent> = self.rx.try_iter().collect();

        // Reap a worker that has already sent its sentinel
        if self
            .active
            .as_ref()
            .is_some_and(|active| active.handle.is_finished())
        {
            if let Some(active) = self.active.take() {
                self.join(active);
            }
        }

        events
    }

    /// Whether a worker is still attached and running
    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.handle.is_finished())
    }

    /// Generation of the most recently started search (0 before the first)
    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    fn join(&self, active: ActiveSearch) {
        if active.handle.join().is_err() {
            // The walker never got to send its sentinel; send one for it
            warn!("Search #{} worker panicked", active.generation);
            let stats = SearchStats {
                cancelled: true,
                ..SearchStats::default()
            };
            let _ = self.tx.send(SearchEvent::Complete {
                generation: active.generation,
                stats,
            });
        }
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.stop();
    }
}
