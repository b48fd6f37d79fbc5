//! Platform-specific implementations

#[cfg(windows)]
pub mod windows;

#[cfg(unix)]
pub mod linux;

use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Stdio};

use directories::{BaseDirs, UserDirs};

/// Roots searched when the user has not configured any.
///
/// Program directories first, then home, desktop, documents and the roaming
/// application-data directory. Entries that cannot be determined are left
/// out; exact duplicates are dropped.
pub fn fallback_roots() -> Vec<PathBuf> {
    #[cfg(windows)]
    let mut roots = windows::program_dirs();
    #[cfg(unix)]
    let mut roots = linux::program_dirs();

    if let Some(user_dirs) = UserDirs::new() {
        roots.push(user_dirs.home_dir().to_path_buf());
        if let Some(desktop) = user_dirs.desktop_dir() {
            roots.push(desktop.to_path_buf());
        }
        if let Some(documents) = user_dirs.document_dir() {
            roots.push(documents.to_path_buf());
        }
    }

    if let Some(base_dirs) = BaseDirs::new() {
        roots.push(base_dirs.data_dir().to_path_buf());
    }

    let mut unique = Vec::with_capacity(roots.len());
    for root in roots {
        if !unique.contains(&root) {
            unique.push(root);
        }
    }
    unique
}

/// Start `path` as a detached process with no inherited stdio
pub fn spawn_detached(path: &Path) -> io::Result<Child> {
    #[cfg(windows)]
    let mut command = windows::launch_command(path);
    #[cfg(unix)]
    let mut command = linux::launch_command(path);

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
}

/// Open a URL with the desktop's default handler
pub fn open_url(url: &str) -> io::Result<Child> {
    #[cfg(windows)]
    let mut command = windows::open_command(url);
    #[cfg(unix)]
    let mut command = linux::open_command(url);

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
}
