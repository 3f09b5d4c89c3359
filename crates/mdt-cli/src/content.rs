//! File loading with encoding detection, and directory scanning.
//!
//! Text is decoded through a fixed detection chain: UTF-8 BOM, UTF-16
//! BOMs, strict UTF-8, then a total Latin-1 fallback that maps every byte
//! to the corresponding code point. Files with a NUL byte near the start
//! are treated as binary and compared by content hash only, never
//! line-diffed.

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use walkdir::WalkDir;

use mdt_sync::{EntryKind, TreeEntry};

const BINARY_SNIFF_LEN: usize = 8192;

/// Detected encoding of a loaded text file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Utf8Bom,
    Utf16Le,
    Utf16Be,
    Latin1,
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Utf8Bom => "utf-8 with BOM",
            TextEncoding::Utf16Le => "utf-16le",
            TextEncoding::Utf16Be => "utf-16be",
            TextEncoding::Latin1 => "latin-1",
        };
        f.write_str(label)
    }
}

/// Contents of a loaded file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileContent {
    Text { text: String, encoding: TextEncoding },
    Binary { hash: String },
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Read and decode one file.
pub fn load_file(path: &Path) -> anyhow::Result<FileContent> {
    let bytes =
        fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(decode(&bytes))
}

/// Decode raw bytes through the detection chain.
pub fn decode(bytes: &[u8]) -> FileContent {
    if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        return match std::str::from_utf8(rest) {
            Ok(text) => FileContent::Text {
                text: text.to_string(),
                encoding: TextEncoding::Utf8Bom,
            },
            Err(_) => FileContent::Binary { hash: hash_bytes(bytes) },
        };
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        return match decode_utf16(rest, u16::from_le_bytes) {
            Some(text) => FileContent::Text { text, encoding: TextEncoding::Utf16Le },
            None => FileContent::Binary { hash: hash_bytes(bytes) },
        };
    }
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        return match decode_utf16(rest, u16::from_be_bytes) {
            Some(text) => FileContent::Text { text, encoding: TextEncoding::Utf16Be },
            None => FileContent::Binary { hash: hash_bytes(bytes) },
        };
    }
    let sniff = &bytes[..bytes.len().min(BINARY_SNIFF_LEN)];
    if sniff.contains(&0) {
        return FileContent::Binary { hash: hash_bytes(bytes) };
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => FileContent::Text { text: text.to_string(), encoding: TextEncoding::Utf8 },
        Err(_) => FileContent::Text {
            // Total fallback: every byte maps to its code point, so no
            // input is unrepresentable and nothing is dropped.
            text: bytes.iter().map(|&b| b as char).collect(),
            encoding: TextEncoding::Latin1,
        },
    }
}

/// Strict UTF-16 decode. An odd byte count or an unpaired surrogate means
/// the content is not text under the claimed BOM and `None` is returned.
fn decode_utf16(bytes: &[u8], from_bytes: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| from_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

fn build_matcher(root: &Path, patterns: &[String]) -> anyhow::Result<Gitignore> {
    let mut builder = GitignoreBuilder::new(root);
    for pattern in patterns {
        builder
            .add_line(None, pattern)
            .with_context(|| format!("invalid ignore pattern {pattern:?}"))?;
    }
    Ok(builder.build()?)
}

/// Scan a directory into a tree snapshot.
///
/// Paths come back relative to `root`, '/'-separated. Entries matching an
/// ignore pattern are skipped, ignored directories without descending.
/// Files that cannot be read are reported to stderr and skipped; the scan
/// continues with their siblings.
pub fn scan_tree(root: &Path, patterns: &[String]) -> anyhow::Result<Vec<TreeEntry>> {
    let matcher = build_matcher(root, patterns)?;
    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let rel = entry.path().strip_prefix(root).unwrap_or_else(|_| entry.path());
            !matcher.matched(rel, entry.file_type().is_dir()).is_ignore()
        });

    let mut entries = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                eprintln!("warning: {err}");
                continue;
            }
        };
        let rel = entry.path().strip_prefix(root)?;
        let path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                eprintln!("warning: {}: {err}", entry.path().display());
                continue;
            }
        };
        let modified: DateTime<Utc> = metadata
            .modified()
            .map(DateTime::from)
            .unwrap_or_default();
        if entry.file_type().is_dir() {
            entries.push(TreeEntry {
                path,
                kind: EntryKind::Directory,
                size: 0,
                modified,
                content_hash: String::new(),
            });
        } else if entry.file_type().is_file() {
            let bytes = match fs::read(entry.path()) {
                Ok(bytes) => bytes,
                Err(err) => {
                    eprintln!("warning: {}: {err}", entry.path().display());
                    continue;
                }
            };
            entries.push(TreeEntry {
                path,
                kind: EntryKind::File,
                size: metadata.len(),
                modified,
                content_hash: hash_bytes(&bytes),
            });
        }
        // Symlinks and other special files are not compared.
    }
    tracing::debug!(root = %root.display(), entries = entries.len(), "tree scanned");
    Ok(entries)
}
