/// Platform image acquisition
///
/// An `ImageSource` suspends until the user either hands back an image or
/// abandons the flow. Abandoning is `Ok(None)`, never an error.
use rfd::FileDialog;
use std::future::Future;
use std::path::PathBuf;
use tokio::task;

use super::encode::RawCapture;
use crate::error::{PhotoError, Result};

/// Extensions offered by the desktop picker (formats `image` can identify)
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tif", "tiff"];

pub trait ImageSource: Send + Sync {
    /// Acquire one image. `Ok(None)` means the user cancelled.
    fn acquire(&self) -> impl Future<Output = Result<Option<RawCapture>>> + Send;
}

/// Native file dialog. On devices where the picker offers the camera,
/// this is the camera flow; on desktop it picks an existing photo.
#[derive(Debug, Clone)]
pub struct FilePickerSource {
    title: String,
    start_dir: Option<PathBuf>,
}

impl FilePickerSource {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            start_dir: dirs::picture_dir(),
        }
    }
}

impl Default for FilePickerSource {
    fn default() -> Self {
        Self::new("Select Job Photo")
    }
}

impl ImageSource for FilePickerSource {
    async fn acquire(&self) -> Result<Option<RawCapture>> {
        let title = self.title.clone();
        let start_dir = self.start_dir.clone();

        // The dialog blocks until the user acts
        let picked = task::spawn_blocking(move || {
            let mut dialog = FileDialog::new()
                .set_title(&title)
                .add_filter("Images", IMAGE_EXTENSIONS);
            if let Some(dir) = start_dir {
                dialog = dialog.set_directory(dir);
            }
            dialog.pick_file()
        })
        .await
        .map_err(|e| PhotoError::Acquisition(format!("Task join error: {}", e)))?;

        let Some(path) = picked else {
            return Ok(None);
        };

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| PhotoError::Acquisition(format!("{}: {}", path.display(), e)))?;

        Ok(Some(RawCapture {
            bytes,
            file_name: path
                .file_name()
                .map(|name| name.to_string_lossy().to_string()),
        }))
    }
}
