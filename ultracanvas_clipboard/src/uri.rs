// Copyright 2025 the UltraCanvas Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! `text/uri-list` encoding of file paths.

use std::path::{Path, PathBuf};

/// Encode paths as newline-separated `file://` URIs, percent-encoding each path segment.
pub(crate) fn encode_uri_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| file_uri(p))
        .collect::<Vec<_>>()
        .join("\n")
}

fn file_uri(path: &Path) -> String {
    let path = path.to_string_lossy();
    let encoded: Vec<_> = path
        .split('/')
        .map(|segment| urlencoding::encode(segment))
        .collect();
    let joined = encoded.join("/");
    if joined.starts_with('/') {
        format!("file://{joined}")
    } else {
        format!("file:///{joined}")
    }
}

/// Decode a URI list, keeping `file://` URIs only.
///
/// Lines may end in `\n` or `\r\n`; blank lines and `#` comments are skipped.
pub(crate) fn decode_uri_list(list: &str) -> Vec<PathBuf> {
    list.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let rest = line.strip_prefix("file://")?;
            let rest = rest.strip_prefix("localhost").unwrap_or(rest);
            match urlencoding::decode(rest) {
                Ok(path) => Some(PathBuf::from(path.into_owned())),
                Err(error) => {
                    tracing::trace!(uri = line, %error, "undecodable file URI skipped");
                    None
                }
            }
        })
        .collect()
}
