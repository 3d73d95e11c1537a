// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! History entries.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::uri;

/// Longest preview, in characters.
pub const PREVIEW_CHARS: usize = 64;

/// Broad category of clipboard content.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Plain text.
    Text,
    /// Formatted text (HTML, RTF).
    RichText,
    /// Raster image.
    Image,
    /// A list of file paths.
    FilePaths,
    /// Vector graphics.
    Vector,
    /// Animated image.
    Animation,
    /// Video.
    Video,
    /// 3D model.
    Model3d,
    /// Paged document.
    Document,
    /// Anything else.
    Unknown,
}

impl EntryKind {
    /// Classify a MIME type.
    pub fn from_mime(mime: &str) -> Self {
        let essence = mime
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "text/html" | "text/rtf" | "application/rtf" => Self::RichText,
            "text/uri-list" => Self::FilePaths,
            "image/gif" | "image/apng" => Self::Animation,
            "image/svg+xml" | "application/postscript" => Self::Vector,
            "application/pdf" => Self::Document,
            "utf8_string" | "string" | "text" => Self::Text,
            e if e.starts_with("text/") => Self::Text,
            e if e.starts_with("image/") => Self::Image,
            e if e.starts_with("video/") => Self::Video,
            e if e.starts_with("model/") => Self::Model3d,
            _ => Self::Unknown,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::RichText => "Rich text",
            Self::Image => "Image",
            Self::FilePaths => "Files",
            Self::Vector => "Vector image",
            Self::Animation => "Animation",
            Self::Video => "Video",
            Self::Model3d => "3D model",
            Self::Document => "Document",
            Self::Unknown => "Data",
        }
    }
}

/// One observed clipboard content.
///
/// Two entries are equal when kind, size, MIME type and payload match; the timestamp and the
/// preview do not take part.
#[derive(Clone, Debug)]
pub struct ClipboardEntry {
    /// Category.
    pub kind: EntryKind,
    /// Text payload (text, rich text, and the URI list of file entries).
    pub text: String,
    /// Byte payload of binary entries.
    pub data: Vec<u8>,
    /// MIME type.
    pub mime: String,
    /// When the content was observed.
    pub timestamp: DateTime<Utc>,
    /// Single-line summary, at most [`PREVIEW_CHARS`] characters.
    pub preview: String,
    /// Payload size in bytes.
    pub size: usize,
}

impl PartialEq for ClipboardEntry {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.size == other.size
            && self.mime == other.mime
            && self.text == other.text
            && self.data == other.data
    }
}

impl Eq for ClipboardEntry {}

impl ClipboardEntry {
    /// A plain-text entry.
    pub fn text(text: impl Into<String>) -> Self {
        Self::textual(text.into(), "text/plain;charset=utf-8")
    }

    /// A textual entry with an explicit MIME type (HTML, RTF, …).
    pub fn textual(text: String, mime: &str) -> Self {
        let kind = match EntryKind::from_mime(mime) {
            EntryKind::RichText => EntryKind::RichText,
            _ => EntryKind::Text,
        };
        Self {
            kind,
            preview: preview_of(&text),
            size: text.len(),
            text,
            data: Vec::new(),
            mime: mime.to_owned(),
            timestamp: Utc::now(),
        }
    }

    /// A binary entry; the kind is derived from `mime`.
    pub fn binary(data: Vec<u8>, mime: &str) -> Self {
        let kind = EntryKind::from_mime(mime);
        Self {
            kind,
            preview: format!("{} ({}, {})", kind.label(), mime, human_size(data.len())),
            size: data.len(),
            text: String::new(),
            data,
            mime: mime.to_owned(),
            timestamp: Utc::now(),
        }
    }

    /// A file list entry.
    pub fn files(paths: &[PathBuf]) -> Self {
        let text = uri::encode_uri_list(paths);
        let preview = match paths {
            [] => String::from("No files"),
            [one] => preview_of(&display_name(one)),
            [first, rest @ ..] => {
                preview_of(&format!("{} and {} more", display_name(first), rest.len()))
            }
        };
        Self {
            kind: EntryKind::FilePaths,
            preview,
            size: text.len(),
            text,
            data: Vec::new(),
            mime: String::from("text/uri-list"),
            timestamp: Utc::now(),
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or(path.as_os_str())
        .to_string_lossy()
        .into_owned()
}

/// Collapse whitespace runs to single spaces and cut to [`PREVIEW_CHARS`].
fn preview_of(text: &str) -> String {
    let line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if line.chars().count() <= PREVIEW_CHARS {
        return line;
    }
    let mut cut: String = line.chars().take(PREVIEW_CHARS - 3).collect();
    cut.push_str("...");
    cut
}

fn human_size(bytes: usize) -> String {
    const KIB: usize = 1024;
    const MIB: usize = 1024 * 1024;
    match bytes {
        b if b >= MIB => format!("{:.1} MiB", b as f64 / MIB as f64),
        b if b >= KIB => format!("{:.1} KiB", b as f64 / KIB as f64),
        b => format!("{b} B"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_mime() {
        assert_eq!(EntryKind::from_mime("image/png"), EntryKind::Image);
        assert_eq!(EntryKind::from_mime("image/gif"), EntryKind::Animation);
        assert_eq!(EntryKind::from_mime("image/svg+xml"), EntryKind::Vector);
        assert_eq!(EntryKind::from_mime("video/mp4"), EntryKind::Video);
        assert_eq!(EntryKind::from_mime("model/gltf+json"), EntryKind::Model3d);
        assert_eq!(EntryKind::from_mime("application/pdf"), EntryKind::Document);
        assert_eq!(EntryKind::from_mime("text/html; charset=utf-8"), EntryKind::RichText);
        assert_eq!(EntryKind::from_mime("TEXT/PLAIN"), EntryKind::Text);
        assert_eq!(EntryKind::from_mime("application/x-thing"), EntryKind::Unknown);
    }

    #[test]
    fn equality_ignores_timestamp_and_preview() {
        let a = ClipboardEntry::text("hello");
        let mut b = ClipboardEntry::text("hello");
        b.timestamp = a.timestamp + chrono::Duration::seconds(30);
        b.preview = String::from("something else");
        assert_eq!(a, b);
        assert_ne!(a, ClipboardEntry::text("hello!"));
        assert_ne!(a, ClipboardEntry::textual(String::from("hello"), "text/html"));
    }

    #[test]
    fn previews_are_single_line_and_bounded() {
        let entry = ClipboardEntry::text("first line\n\tsecond   line");
        assert_eq!(entry.preview, "first line second line");

        let long = ClipboardEntry::text("x".repeat(500));
        assert_eq!(long.preview.chars().count(), PREVIEW_CHARS);
        assert!(long.preview.ends_with("..."));
        assert_eq!(long.size, 500);
    }

    #[test]
    fn binary_and_file_entries() {
        let image = ClipboardEntry::binary(vec![0; 2048], "image/png");
        assert_eq!(image.kind, EntryKind::Image);
        assert_eq!(image.preview, "Image (image/png, 2.0 KiB)");

        let files = ClipboardEntry::files(&[PathBuf::from("/tmp/a.txt"), PathBuf::from("/tmp/b")]);
        assert_eq!(files.kind, EntryKind::FilePaths);
        assert_eq!(files.preview, "a.txt and 1 more");
        assert_eq!(files.text, "file:///tmp/a.txt\nfile:///tmp/b");
    }
}
