/// Diagnostics export of every stored photo as JSON
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::store::PhotoStore;
use crate::error::{PhotoError, Result};

/// Write all photos to `path` as a JSON array. Images are inlined as data URLs.
/// Returns the number of photos written.
pub async fn export_all(store: &PhotoStore, path: &Path) -> Result<usize> {
    let photos = store.get_all().await?;
    let count = photos.len();
    let path = path.to_path_buf();

    tokio::task::spawn_blocking(move || {
        let file = File::create(&path)
            .map_err(|e| PhotoError::Export(format!("cannot create {}: {}", path.display(), e)))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &photos)
            .map_err(|e| PhotoError::Export(e.to_string()))?;
        writer
            .flush()
            .map_err(|e| PhotoError::Export(e.to_string()))?;
        tracing::info!("📦 Exported {} photos to {}", count, path.display());
        Ok(count)
    })
    .await
    .map_err(|e| PhotoError::Export(format!("Task join error: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::{EncodedImage, NewPhoto, Photo, PhotoKind};

    #[tokio::test]
    async fn test_export_writes_every_photo() {
        let store = PhotoStore::in_memory();
        for (id, job_id) in [("a", 1), ("b", 2)] {
            let photo = NewPhoto {
                job_id,
                customer_id: 1,
                kind: PhotoKind::Before,
                image: EncodedImage::new("image/png", vec![1, 2, 3]),
                timestamp: chrono::Utc::now(),
                coordinates: None,
                notes: None,
            }
            .with_id(id.into());
            store.save(photo).await.unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photos.json");
        assert_eq!(export_all(&store, &path).await.unwrap(), 2);

        let written: Vec<Photo> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, store.get_all().await.unwrap());
    }
}
