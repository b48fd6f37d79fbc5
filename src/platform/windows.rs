//! Windows-specific platform implementation

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::search::matcher::CandidateKind;

/// `Program Files` directories from the environment
pub fn program_dirs() -> Vec<PathBuf> {
    ["ProgramFiles", "ProgramFiles(x86)"]
        .iter()
        .filter_map(|var| std::env::var_os(var))
        .map(PathBuf::from)
        .collect()
}

/// Build the command that launches `path`.
///
/// Executables are started directly from their own directory; shortcuts and
/// everything else are handed to the shell so the association decides.
pub fn launch_command(path: &Path) -> Command {
    if CandidateKind::classify(path) == Some(CandidateKind::Executable) {
        let mut command = Command::new(path);
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            command.current_dir(dir);
        }
        command
    } else {
        open_command(path)
    }
}

/// Hand a file or URL to the shell's `start`
pub fn open_command(target: impl AsRef<OsStr>) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", ""]).arg(target);
    command
}
