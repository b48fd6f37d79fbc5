//! Unix-specific platform implementation

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::search::matcher::CandidateKind;

/// System-wide directories where games and tools are installed
pub fn program_dirs() -> Vec<PathBuf> {
    ["/opt", "/usr/games", "/usr/local/games"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

/// Build the command that launches `path`.
///
/// Executables run directly from their own directory (binfmt handlers take
/// care of foreign binaries); anything else goes to the desktop opener.
pub fn launch_command(path: &Path) -> Command {
    let runs_directly = CandidateKind::classify(path) == Some(CandidateKind::Executable)
        || path.extension().is_none();

    if runs_directly {
        let mut command = Command::new(path);
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            command.current_dir(dir);
        }
        command
    } else {
        open_command(path)
    }
}

/// Hand a file or URL to the desktop opener
pub fn open_command(target: impl AsRef<OsStr>) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(target);
    command
}
