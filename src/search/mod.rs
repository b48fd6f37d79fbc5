//! Background search for games and shortcuts
//!
//! - `matcher`: which files are candidates and how the term matches them
//! - `shortcut`: best-effort `.lnk` resolution
//! - `walker`: the recursive walk run on the worker thread
//! - `session`: start/cancel/restart of the worker and the result queue
//! - `ticker`: fixed-period polling of the queue

pub mod matcher;
pub mod session;
pub mod shortcut;
pub mod ticker;
pub mod walker;

// Re-export main types
pub use session::SearchSession;
pub use shortcut::resolver_for;
pub use ticker::{Ticker, DEFAULT_POLL_INTERVAL};
