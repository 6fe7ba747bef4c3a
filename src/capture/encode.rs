/// Turns raw captured bytes into the store's self-contained image payload
///
/// The bytes are stored as captured (no recompression or resizing). Encoding
/// here means: identify the format, check the header decodes, and record the
/// MIME type so the payload renders as a data URL anywhere.
use image::ImageReader;
use std::io::Cursor;
use tokio::task;

use crate::error::{PhotoError, Result};
use crate::state::EncodedImage;

/// Bytes handed back by the platform image source
#[derive(Clone, PartialEq, Eq)]
pub struct RawCapture {
    pub bytes: Vec<u8>,
    /// Original file name when the source has one
    pub file_name: Option<String>,
}

impl std::fmt::Debug for RawCapture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawCapture")
            .field("len", &self.bytes.len())
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// Encode a capture off the async runtime
pub async fn encode_capture(capture: RawCapture) -> Result<EncodedImage> {
    task::spawn_blocking(move || encode_capture_blocking(capture))
        .await
        .map_err(|e| PhotoError::Encode(format!("Task join error: {}", e)))?
}

fn encode_capture_blocking(capture: RawCapture) -> Result<EncodedImage> {
    if capture.bytes.is_empty() {
        return Err(PhotoError::Encode("capture is empty".into()));
    }

    let format = image::guess_format(&capture.bytes)
        .map_err(|e| PhotoError::Encode(format!("unrecognised image format: {}", e)))?;

    let (width, height) = ImageReader::with_format(Cursor::new(&capture.bytes), format)
        .into_dimensions()
        .map_err(|e| PhotoError::Encode(format!("unreadable {:?} header: {}", format, e)))?;

    tracing::debug!(
        "📷 Encoded capture {:?}: {:?} {}x{} ({} bytes)",
        capture.file_name,
        format,
        width,
        height,
        capture.bytes.len()
    );

    Ok(EncodedImage::new(format.to_mime_type(), capture.bytes))
}
