//! Shortcut (`.lnk`) resolution
//!
//! Resolution is best-effort. Resolvers never fail the search: every problem
//! is folded into [`Resolution::Failed`] or [`Resolution::Unsupported`] and
//! the walker falls back to launching the shortcut itself.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

/// Outcome of asking a resolver for a shortcut's target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Target path read from the shortcut
    Resolved(PathBuf),
    /// The shortcut could not be read or has no usable target
    Failed,
    /// This resolver cannot resolve shortcuts at all
    Unsupported,
}

/// Collaborator that turns a shortcut file into its target path
///
/// Implementations must be cheap to share across the worker thread.
pub trait ShortcutResolver: Send + Sync {
    /// Resolve the shortcut at `path`
    fn resolve(&self, path: &Path) -> Resolution;

    /// Name of this resolver for logging
    fn name(&self) -> &'static str;
}

/// Shortcut parsing errors
#[derive(Error, Debug)]
pub enum ShortcutError {
    #[error("Failed to read shortcut: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shortcut is {0} bytes, larger than any real shell link")]
    TooLarge(u64),

    #[error("Not a shell link file")]
    BadHeader,

    #[error("Shortcut truncated at offset {0}")]
    Truncated(usize),

    #[error("Shortcut has no local target")]
    NoTarget,
}

// Shell link layout constants
const HEADER_SIZE: usize = 0x4C;
const LINK_CLSID: [u8; 16] = [
    0x01, 0x14, 0x02, 0x00, 0x00, 0x00, 0x00, 0x00, 0xC0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x46,
];
const FLAGS_OFFSET: usize = 0x14;
const MAX_LINK_SIZE: u64 = 1 << 20;

const HAS_LINK_TARGET_ID_LIST: u32 = 0x0000_0001;
const HAS_LINK_INFO: u32 = 0x0000_0002;
const HAS_NAME: u32 = 0x0000_0004;
const HAS_RELATIVE_PATH: u32 = 0x0000_0008;
const IS_UNICODE: u32 = 0x0000_0080;
const FORCE_NO_LINK_INFO: u32 = 0x0000_0100;

const VOLUME_ID_AND_LOCAL_BASE_PATH: u32 = 0x0000_0001;
const LINK_INFO_UNICODE_HEADER: u32 = 0x24;

/// Portable reader for Windows shell link files
///
/// Reads the target straight from the binary format, so it works the same
/// on every platform and needs no shell APIs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkFileResolver;

impl LinkFileResolver {
    pub fn new() -> Self {
        Self
    }

    /// Read and parse a shortcut file
    pub fn read_target(path: &Path) -> Result<PathBuf, ShortcutError> {
        let size = fs::metadata(path)?.len();
        if size > MAX_LINK_SIZE {
            return Err(ShortcutError::TooLarge(size));
        }

        let bytes = fs::read(path)?;
        Self::parse(&bytes, path.parent())
    }

    /// Parse shell link bytes.
    ///
    /// The local base path from `LinkInfo` wins; otherwise the relative path
    /// string is joined onto `link_dir`.
    pub fn parse(bytes: &[u8], link_dir: Option<&Path>) -> Result<PathBuf, ShortcutError> {
        if read_u32(bytes, 0)? as usize != HEADER_SIZE
            || bytes.get(4..20) != Some(&LINK_CLSID[..])
        {
            return Err(ShortcutError::BadHeader);
        }

        let flags = read_u32(bytes, FLAGS_OFFSET)?;
        let mut cursor = HEADER_SIZE;

        if flags & HAS_LINK_TARGET_ID_LIST != 0 {
            let id_list_size = read_u16(bytes, cursor)? as usize;
            cursor += 2 + id_list_size;
        }

        if flags & HAS_LINK_INFO != 0 && flags & FORCE_NO_LINK_INFO == 0 {
            let link_info_size = read_u32(bytes, cursor)? as usize;
            let link_info = bytes
                .get(cursor..cursor + link_info_size)
                .ok_or(ShortcutError::Truncated(cursor))?;

            if let Some(target) = local_target(link_info)? {
                return Ok(PathBuf::from(target));
            }
            cursor += link_info_size;
        }

        let unicode = flags & IS_UNICODE != 0;
        if flags & HAS_NAME != 0 {
            let (_, next) = read_counted_string(bytes, cursor, unicode)?;
            cursor = next;
        }

        if flags & HAS_RELATIVE_PATH != 0 {
            let (relative, _) = read_counted_string(bytes, cursor, unicode)?;
            if !relative.is_empty() {
                let relative = native_separators(&relative);
                return Ok(match link_dir {
                    Some(dir) => dir.join(relative),
                    None => PathBuf::from(relative),
                });
            }
        }

        Err(ShortcutError::NoTarget)
    }
}

impl ShortcutResolver for LinkFileResolver {
    fn resolve(&self, path: &Path) -> Resolution {
        match Self::read_target(path) {
            Ok(target) => Resolution::Resolved(target),
            Err(e) => {
                debug!("Could not resolve shortcut {:?}: {}", path, e);
                Resolution::Failed
            }
        }
    }

    fn name(&self) -> &'static str {
        "shell-link"
    }
}

/// Resolver used when shortcut resolution is switched off
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedResolver;

impl ShortcutResolver for UnsupportedResolver {
    fn resolve(&self, _path: &Path) -> Resolution {
        Resolution::Unsupported
    }

    fn name(&self) -> &'static str {
        "unsupported"
    }
}

/// Pick a resolver based on configuration
pub fn resolver_for(enabled: bool) -> Arc<dyn ShortcutResolver> {
    if enabled {
        Arc::new(LinkFileResolver::new())
    } else {
        Arc::new(UnsupportedResolver)
    }
}

/// Local base path (plus common suffix) from a `LinkInfo` block
fn local_target(link_info: &[u8]) -> Result<Option<String>, ShortcutError> {
    let header_size = read_u32(link_info, 4)?;
    let info_flags = read_u32(link_info, 8)?;
    if info_flags & VOLUME_ID_AND_LOCAL_BASE_PATH == 0 {
        return Ok(None);
    }

    let base_offset = read_u32(link_info, 16)? as usize;
    let suffix_offset = read_u32(link_info, 24)? as usize;

    // Newer writers also store unicode copies; prefer them when present
    if header_size >= LINK_INFO_UNICODE_HEADER {
        let unicode_base = read_u32(link_info, 28)? as usize;
        let unicode_suffix = read_u32(link_info, 32)? as usize;
        if unicode_base != 0 {
            let mut target = read_utf16_z(link_info, unicode_base)?;
            if unicode_suffix != 0 {
                target.push_str(&read_utf16_z(link_info, unicode_suffix)?);
            }
            if !target.is_empty() {
                return Ok(Some(target));
            }
        }
    }

    let mut target = read_ansi_z(link_info, base_offset)?;
    if suffix_offset != 0 {
        target.push_str(&read_ansi_z(link_info, suffix_offset)?);
    }

    Ok((!target.is_empty()).then_some(target))
}

fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, ShortcutError> {
    bytes
        .get(offset..offset + 2)
        .and_then(|s| <[u8; 2]>::try_from(s).ok())
        .map(u16::from_le_bytes)
        .ok_or(ShortcutError::Truncated(offset))
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, ShortcutError> {
    bytes
        .get(offset..offset + 4)
        .and_then(|s| <[u8; 4]>::try_from(s).ok())
        .map(u32::from_le_bytes)
        .ok_or(ShortcutError::Truncated(offset))
}

/// NUL-terminated single-byte string
fn read_ansi_z(bytes: &[u8], offset: usize) -> Result<String, ShortcutError> {
    let tail = bytes.get(offset..).ok_or(ShortcutError::Truncated(offset))?;
    let end = tail
        .iter()
        .position(|&b| b == 0)
        .ok_or(ShortcutError::Truncated(offset))?;
    Ok(String::from_utf8_lossy(&tail[..end]).into_owned())
}

/// NUL-terminated UTF-16LE string
fn read_utf16_z(bytes: &[u8], offset: usize) -> Result<String, ShortcutError> {
    let tail = bytes.get(offset..).ok_or(ShortcutError::Truncated(offset))?;
    let mut units = Vec::new();
    for pair in tail.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        if unit == 0 {
            return Ok(String::from_utf16_lossy(&units));
        }
        units.push(unit);
    }
    Err(ShortcutError::Truncated(offset))
}

/// Length-prefixed `StringData` entry; returns the string and the next offset
fn read_counted_string(
    bytes: &[u8],
    offset: usize,
    unicode: bool,
) -> Result<(String, usize), ShortcutError> {
    let count = read_u16(bytes, offset)? as usize;
    let start = offset + 2;
    let len = if unicode { count * 2 } else { count };
    let raw = bytes
        .get(start..start + len)
        .ok_or(ShortcutError::Truncated(start))?;

    let value = if unicode {
        let units: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8_lossy(raw).into_owned()
    };

    Ok((value, start + len))
}

fn native_separators(path: &str) -> String {
    if cfg!(windows) {
        path.to_string()
    } else {
        path.replace('\\', std::path::MAIN_SEPARATOR_STR)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn header(flags: u32) -> Vec<u8> {
        let mut bytes = vec![0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&(HEADER_SIZE as u32).to_le_bytes());
        bytes[4..20].copy_from_slice(&LINK_CLSID);
        bytes[FLAGS_OFFSET..FLAGS_OFFSET + 4].copy_from_slice(&flags.to_le_bytes());
        bytes
    }

    /// Minimal shell link pointing at `target` through `LinkInfo`
    pub(crate) fn link_with_local_path(target: &str) -> Vec<u8> {
        let mut bytes = header(HAS_LINK_TARGET_ID_LIST | HAS_LINK_INFO);

        // Empty ID list (just the terminal id)
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&[0, 0]);

        let header_size = 0x1Cu32;
        let base_offset = header_size;
        let suffix_offset = base_offset + target.len() as u32 + 1;
        let total = suffix_offset + 1;

        bytes.extend_from_slice(&total.to_le_bytes());
        bytes.extend_from_slice(&header_size.to_le_bytes());
        bytes.extend_from_slice(&VOLUME_ID_AND_LOCAL_BASE_PATH.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // volume id offset (unused here)
        bytes.extend_from_slice(&base_offset.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes()); // network link offset
        bytes.extend_from_slice(&suffix_offset.to_le_bytes());
        bytes.extend_from_slice(target.as_bytes());
        bytes.push(0);
        bytes.push(0); // empty suffix
        bytes
    }

    fn link_with_relative_path(relative: &str) -> Vec<u8> {
        let mut bytes = header(HAS_RELATIVE_PATH | IS_UNICODE);
        let units: Vec<u16> = relative.encode_utf16().collect();
        bytes.extend_from_slice(&(units.len() as u16).to_le_bytes());
        for unit in units {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        bytes
    }

    #[test]
    fn parses_local_base_path() {
        let bytes = link_with_local_path(r"C:\Games\Mario\Mario.exe");
        let target = LinkFileResolver::parse(&bytes, None).unwrap();
        assert_eq!(target, PathBuf::from(r"C:\Games\Mario\Mario.exe"));
    }

    #[test]
    fn relative_path_is_joined_to_link_dir() {
        let bytes = link_with_relative_path(r"bin\game.exe");
        let target = LinkFileResolver::parse(&bytes, Some(Path::new("shortcuts"))).unwrap();
        let expected = Path::new("shortcuts").join(native_separators(r"bin\game.exe"));
        assert_eq!(target, expected);
    }

    #[test]
    fn rejects_foreign_files() {
        let err = LinkFileResolver::parse(b"#!/bin/sh\necho hi\n", None).unwrap_err();
        assert!(matches!(err, ShortcutError::BadHeader | ShortcutError::Truncated(_)));
    }

    #[test]
    fn truncated_link_info_is_an_error() {
        let mut bytes = link_with_local_path(r"C:\x.exe");
        bytes.truncate(HEADER_SIZE + 10);
        assert!(matches!(
            LinkFileResolver::parse(&bytes, None),
            Err(ShortcutError::Truncated(_))
        ));
    }

    #[test]
    fn header_only_link_has_no_target() {
        let bytes = header(0);
        assert!(matches!(
            LinkFileResolver::parse(&bytes, None),
            Err(ShortcutError::NoTarget)
        ));
    }

    #[test]
    fn resolver_reports_failure_for_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.lnk");
        fs::write(&path, b"not a link").unwrap();

        assert_eq!(LinkFileResolver::new().resolve(&path), Resolution::Failed);
        assert_eq!(UnsupportedResolver.resolve(&path), Resolution::Unsupported);
    }
}
