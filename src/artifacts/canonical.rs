//! Canonical JSON encoding
//!
//! Every document goes through `serde_json::Value` first. Its object map is
//! ordered by key, so the output has sorted keys at every level.

use crate::error::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Sorted keys, 2-space indent, trailing newline
pub fn to_canonical_pretty<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    let mut text = serde_json::to_string_pretty(&value)?;
    text.push('\n');
    Ok(text)
}

/// Sorted keys, `,`/`:` separators, no whitespace, no trailing newline
pub fn to_canonical_compact<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value)?;
    Ok(serde_json::to_string(&value)?)
}

/// Write `value` as canonical pretty JSON to `path`
pub fn write_canonical_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    fs::write(path, to_canonical_pretty(value)?)?;
    Ok(())
}

/// Temp sibling a document is staged in before it is renamed into place
pub fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
