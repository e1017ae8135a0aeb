// SPDX-FileCopyrightText: 2026 Rivulet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reads files from disk into message attachments.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rivulet_core::{Attachment, AttachmentKind, RivuletError};

/// Largest file `/attach` accepts.
pub const MAX_ATTACHMENT_BYTES: u64 = 5 * 1024 * 1024;

/// Images travel base64-encoded; everything else must be UTF-8 text.
pub fn load_attachment(path: &Path) -> Result<Attachment, RivuletError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| RivuletError::Internal(format!("{} is not a file", path.display())))?;

    let size = std::fs::metadata(path)
        .map_err(|e| RivuletError::Internal(format!("cannot read {}: {e}", path.display())))?
        .len();
    if size > MAX_ATTACHMENT_BYTES {
        return Err(RivuletError::Internal(format!(
            "{name} is {size} bytes, the limit is {MAX_ATTACHMENT_BYTES}"
        )));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| RivuletError::Internal(format!("cannot read {}: {e}", path.display())))?;

    if let Some(mime_type) = image_mime(path) {
        return Ok(Attachment {
            name,
            kind: AttachmentKind::Image,
            payload: STANDARD.encode(&bytes),
            mime_type: mime_type.to_string(),
        });
    }

    let payload = String::from_utf8(bytes)
        .map_err(|_| RivuletError::Internal(format!("{name} is neither text nor a known image type")))?;
    Ok(Attachment {
        mime_type: text_mime(path).to_string(),
        name,
        kind: AttachmentKind::File,
        payload,
    })
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

fn image_mime(path: &Path) -> Option<&'static str> {
    match extension(path)?.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}

fn text_mime(path: &Path) -> &'static str {
    match extension(path).as_deref() {
        Some("md" | "markdown") => "text/markdown",
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        Some("html" | "htm") => "text/html",
        _ => "text/plain",
    }
}
