//! Unique blob names derived from client file names.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond timestamp generator that never repeats within a process.
///
/// Each call returns `max(now_ms, last + 1)`, so two uploads landing in the
/// same millisecond still get distinct names.
#[derive(Debug, Default)]
pub struct UniqueStamp {
    last: AtomicU64,
}

impl UniqueStamp {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    pub fn next(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let prev = self
            .last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(prev + 1)
    }
}

/// Reduce a client-supplied file name to a safe single path component.
///
/// Directory parts are dropped, anything outside `[A-Za-z0-9._-]` becomes
/// `_`, and leading dots are removed so the result can never be hidden or
/// climb out of its directory.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Name used by the local store: `<stamp>-<file name>`.
pub fn local_name(stamp: u64, file_name: &str) -> String {
    format!("{stamp}-{}", sanitize_file_name(file_name))
}

/// Object id used by the remote store: `<stamp>-<file name without extension>`.
pub fn remote_id(stamp: u64, file_name: &str) -> String {
    let name = sanitize_file_name(file_name);
    let stem = match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => name.as_str(),
    };
    format!("{stamp}-{stem}")
}
