// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selection protocol vocabulary.

use std::borrow::Cow;
use std::fmt;

use crate::raw::NativeHandle;

/// A named selection.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Selection {
    /// The explicit copy/paste selection (`CLIPBOARD`).
    Clipboard,
    /// The implicit highlight selection (`PRIMARY`).
    Primary,
}

impl Selection {
    /// Protocol name of the selection.
    pub fn name(self) -> &'static str {
        match self {
            Self::Clipboard => "CLIPBOARD",
            Self::Primary => "PRIMARY",
        }
    }
}

/// A conversion target: a protocol atom name or a MIME type.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Target(Cow<'static, str>);

impl Target {
    /// Asks the owner for the list of targets it supports.
    pub const TARGETS: Self = Self::from_static("TARGETS");
    /// UTF-8 text.
    pub const UTF8_STRING: Self = Self::from_static("UTF8_STRING");
    /// Latin-1 text.
    pub const STRING: Self = Self::from_static("STRING");
    /// Text in an owner-chosen encoding.
    pub const TEXT: Self = Self::from_static("TEXT");
    /// Plain text MIME type.
    pub const TEXT_PLAIN: Self = Self::from_static("text/plain");
    /// UTF-8 plain text MIME type.
    pub const TEXT_PLAIN_UTF8: Self = Self::from_static("text/plain;charset=utf-8");
    /// Newline-separated list of URIs.
    pub const URI_LIST: Self = Self::from_static("text/uri-list");
    /// PNG image.
    pub const IMAGE_PNG: Self = Self::from_static("image/png");
    /// JPEG image.
    pub const IMAGE_JPEG: Self = Self::from_static("image/jpeg");
    /// BMP image.
    pub const IMAGE_BMP: Self = Self::from_static("image/bmp");

    /// A target from a static name.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// A target from an owned name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// The target name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this target names a text encoding.
    pub fn is_text(&self) -> bool {
        [
            Self::UTF8_STRING,
            Self::STRING,
            Self::TEXT,
            Self::TEXT_PLAIN,
            Self::TEXT_PLAIN_UTF8,
        ]
        .contains(self)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Target({})", self.0)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Data stored on a window property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Property {
    /// Raw bytes (format 8) tagged with their type.
    Bytes {
        /// Type of the data, normally the requested target.
        kind: Target,
        /// The payload.
        data: Vec<u8>,
    },
    /// A list of targets (format 32 atom list), the answer to a `TARGETS` request.
    Targets(Vec<Target>),
}

/// Another client asks us, the owner, to convert a selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionRequest {
    /// Window that wants the data.
    pub requestor: NativeHandle,
    /// Selection being converted.
    pub selection: Selection,
    /// Requested target.
    pub target: Target,
    /// Property on `requestor` to store the result in.
    pub property: Option<String>,
    /// Server timestamp of the request.
    pub time: u64,
}

/// The answer to a conversion. `property == None` means the owner refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionNotify {
    /// Window that asked for the data.
    pub requestor: NativeHandle,
    /// Selection that was converted.
    pub selection: Selection,
    /// Target that was requested.
    pub target: Target,
    /// Property holding the data, or `None` on refusal.
    pub property: Option<String>,
    /// Server timestamp of the request being answered.
    pub time: u64,
}

impl SelectionNotify {
    /// Build the reply for `request`, storing into its property or refusing.
    pub fn reply_to(request: &SelectionRequest, accepted: bool) -> Self {
        Self {
            requestor: request.requestor,
            selection: request.selection,
            target: request.target.clone(),
            property: if accepted {
                request.property.clone()
            } else {
                None
            },
            time: request.time,
        }
    }
}

/// We lost ownership of a selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelectionClear {
    /// Selection that was lost.
    pub selection: Selection,
    /// Our window that owned it.
    pub owner: NativeHandle,
}

/// Selection protocol traffic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectionEvent {
    /// Incoming conversion request.
    Request(SelectionRequest),
    /// Answer to one of our conversion requests.
    Notify(SelectionNotify),
    /// Ownership lost.
    Clear(SelectionClear),
}
