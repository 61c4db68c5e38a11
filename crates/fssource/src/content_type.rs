//! Content type detection for indexed files.
//!
//! Types come from the file extension when it is a known one, otherwise from
//! the leading bytes of the file. The result is stored as index metadata; file
//! contents are never interpreted beyond this.

use std::io::{self, Read};

use memchr::memchr;

use crate::handle::FilesystemHandle;

/// Number of leading bytes read when sniffing.
pub const SNIFF_LEN: usize = 512;

pub const TEXT_PLAIN: &str = "text/plain";
pub const OCTET_STREAM: &str = "application/octet-stream";

// ---------------------------------------------------------------------------
// Extension table
// ---------------------------------------------------------------------------

const EXTENSION_TYPES: &[(&[&str], &str)] = &[
    (&["txt", "text", "log"], TEXT_PLAIN),
    (&["md", "markdown"], "text/markdown"),
    (&["go"], "text/x-go"),
    (&["mod"], "text/x-go-mod"),
    (&["rs"], "text/x-rust"),
    (&["py"], "text/x-python"),
    (&["rb", "gemspec"], "text/x-ruby"),
    (&["js", "mjs", "cjs"], "text/javascript"),
    (&["java"], "text/x-java"),
    (&["sh", "bash"], "text/x-shellscript"),
    (&["html", "htm"], "text/html"),
    (&["css"], "text/css"),
    (&["csv"], "text/csv"),
    (&["json"], "application/json"),
    (&["toml"], "application/toml"),
    (&["yaml", "yml"], "application/yaml"),
    (&["xml", "pom"], "application/xml"),
    (&["jar", "war", "ear", "jpi", "hpi"], "application/java-archive"),
    (&["zip", "whl", "egg", "nupkg"], "application/zip"),
    (&["gz", "tgz"], "application/gzip"),
    (&["tar"], "application/x-tar"),
    (&["bz2"], "application/x-bzip2"),
    (&["xz"], "application/x-xz"),
    (&["zst"], "application/zstd"),
    (&["deb"], "application/vnd.debian.binary-package"),
    (&["rpm"], "application/x-rpm"),
    (&["pdf"], "application/pdf"),
    (&["png"], "image/png"),
    (&["jpg", "jpeg"], "image/jpeg"),
    (&["gif"], "image/gif"),
    (&["svg"], "image/svg+xml"),
    (&["wasm"], "application/wasm"),
    (&["exe", "dll"], "application/vnd.microsoft.portable-executable"),
];

/// Looks up a content type by file extension (case-insensitive).
pub fn content_type_for_name(name: &str) -> Option<&'static str> {
    let split = name.rfind('.')?;
    if split == 0 || split + 1 >= name.len() {
        return None;
    }
    let extension = name[split + 1..].to_ascii_lowercase();
    EXTENSION_TYPES
        .iter()
        .find(|(extensions, _)| extensions.contains(&extension.as_str()))
        .map(|(_, content_type)| *content_type)
}

// ---------------------------------------------------------------------------
// Magic numbers
// ---------------------------------------------------------------------------

const MAGIC_TYPES: &[(&[u8], &str)] = &[
    (b"\x7fELF", "application/x-executable"),
    (b"\xfe\xed\xfa\xce", "application/x-mach-binary"),
    (b"\xfe\xed\xfa\xcf", "application/x-mach-binary"),
    (b"\xce\xfa\xed\xfe", "application/x-mach-binary"),
    (b"\xcf\xfa\xed\xfe", "application/x-mach-binary"),
    (b"\xca\xfe\xba\xbe", "application/x-mach-binary"),
    (b"MZ", "application/vnd.microsoft.portable-executable"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1f\x8b", "application/gzip"),
    (b"BZh", "application/x-bzip2"),
    (b"\xfd7zXZ\x00", "application/x-xz"),
    (b"\x28\xb5\x2f\xfd", "application/zstd"),
    (b"%PDF-", "application/pdf"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xff\xd8\xff", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"\x00asm", "application/wasm"),
    (b"!<arch>\n", "application/x-archive"),
    (b"#!/bin/sh", "text/x-shellscript"),
    (b"#!/bin/bash", "text/x-shellscript"),
    (b"#!/usr/bin/env bash", "text/x-shellscript"),
    (b"#!/usr/bin/env python", "text/x-python"),
];

/// Classifies leading file bytes.
///
/// Known magic numbers win; otherwise data without NUL bytes that decodes as
/// UTF-8 (allowing a truncated trailing character) is plain text.
pub fn sniff_content_type(head: &[u8]) -> &'static str {
    if let Some((_, content_type)) = MAGIC_TYPES.iter().find(|(magic, _)| head.starts_with(magic)) {
        return *content_type;
    }
    if head.len() > 262 && &head[257..262] == b"ustar" {
        return "application/x-tar";
    }
    if memchr(0, head).is_some() {
        return OCTET_STREAM;
    }
    match std::str::from_utf8(head) {
        Ok(_) => TEXT_PLAIN,
        Err(error) if error.error_len().is_none() => TEXT_PLAIN,
        Err(_) => OCTET_STREAM,
    }
}

/// Detects the content type of a file in `fs`.
pub fn detect_content_type(
    fs: &dyn FilesystemHandle,
    path: &str,
    name: &str,
) -> io::Result<&'static str> {
    if let Some(content_type) = content_type_for_name(name) {
        return Ok(content_type);
    }

    let mut head = Vec::with_capacity(SNIFF_LEN);
    fs.open(path)?.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(sniff_content_type(&head))
}
