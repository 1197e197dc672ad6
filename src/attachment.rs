use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{debug, error};

use crate::errors::AssistantError;
use crate::session::AssistantSession;

/// Best-effort media type from the file extension. Non-image files are not
/// rejected here.
pub fn media_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Reads a file into a `data:` URL.
pub fn read_data_url(path: &Path) -> Result<String, AssistantError> {
    let bytes = fs::read(path).map_err(|e| {
        error!("Failed to read attachment {}: {e}", path.display());
        AssistantError::AttachmentRead { path: path.display().to_string(), source: e }
    })?;
    Ok(format!("data:{};base64,{}", media_type(path), STANDARD.encode(bytes)))
}

/// Loads the first selected file as the session's pending image. No selection
/// or a failed read leaves the session without an image.
pub fn capture(session: &mut AssistantSession, selected: &[PathBuf]) -> Result<bool, AssistantError> {
    let Some(path) = selected.first() else {
        session.attach_image(None);
        return Ok(false);
    };

    match read_data_url(path) {
        Ok(data_url) => {
            debug!("Attached {} ({} bytes encoded)", path.display(), data_url.len());
            session.attach_image(Some(data_url));
            Ok(true)
        }
        Err(e) => {
            session.attach_image(None);
            Err(e)
        }
    }
}
