use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;
use tokio::task;

use super::data::{CustomerId, EncodedImage, JobId, Photo};
use crate::error::{PhotoError, Result};

/// Where the photo database lives
#[derive(Debug, Clone, PartialEq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

/// A live connection to the photo database, shared by every caller
#[derive(Clone)]
pub struct StoreHandle {
    conn: Arc<Mutex<Connection>>,
}

impl PartialEq for StoreHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle").finish_non_exhaustive()
    }
}

/// The PhotoStore keeps photo records in an on-device SQLite database.
///
/// Records are keyed by `id` with secondary indexes on `job_id` and
/// `customer_id`. The store is constructed explicitly and injected into
/// its consumers; the database itself is opened lazily by `open()`.
pub struct PhotoStore {
    location: StoreLocation,
    page_limit: Option<u32>,
    handle: OnceCell<StoreHandle>,
}

impl PhotoStore {
    /// Store backed by a database file. Nothing touches the disk until `open()`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_location(StoreLocation::File(path.into()))
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::with_location(StoreLocation::Memory)
    }

    fn with_location(location: StoreLocation) -> Self {
        PhotoStore {
            location,
            page_limit: None,
            handle: OnceCell::new(),
        }
    }

    /// Cap the database size in pages. Writes past the cap fail with
    /// `WriteFailure`; nothing is ever evicted to make room.
    pub fn with_page_limit(mut self, pages: Option<u32>) -> Self {
        self.page_limit = pages;
        self
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Open the database and create the schema if needed.
    ///
    /// Safe to call any number of times, concurrently: every caller gets
    /// the same handle. A failed open is not cached, so a later call
    /// retries.
    pub async fn open(&self) -> Result<StoreHandle> {
        let handle = self
            .handle
            .get_or_try_init(|| {
                let location = self.location.clone();
                let page_limit = self.page_limit;
                async move {
                    task::spawn_blocking(move || open_blocking(&location, page_limit))
                        .await
                        .map_err(|e| {
                            PhotoError::StorageUnavailable(format!("Task join error: {}", e))
                        })?
                }
            })
            .await?;
        Ok(handle.clone())
    }

    /// Insert or overwrite a photo by id. Returns once the write is committed.
    pub async fn save(&self, photo: Photo) -> Result<()> {
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(write_failure)?;
            tx.execute(
                "INSERT INTO photos
                    (id, job_id, customer_id, kind, mime_type, image, timestamp, latitude, longitude, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(id) DO UPDATE SET
                    job_id = excluded.job_id,
                    customer_id = excluded.customer_id,
                    kind = excluded.kind,
                    mime_type = excluded.mime_type,
                    image = excluded.image,
                    timestamp = excluded.timestamp,
                    latitude = excluded.latitude,
                    longitude = excluded.longitude,
                    notes = excluded.notes",
                params![
                    photo.id,
                    photo.job_id,
                    photo.customer_id,
                    photo.kind.as_str(),
                    photo.image.mime_type,
                    photo.image.bytes,
                    photo.timestamp.to_rfc3339(),
                    photo.latitude,
                    photo.longitude,
                    photo.notes,
                ],
            )
            .map_err(write_failure)?;
            tx.commit().map_err(write_failure)?;
            tracing::debug!(id = %photo.id, job_id = photo.job_id, "photo saved");
            Ok(())
        })
        .await
    }

    /// All photos for a job, in insertion order
    pub async fn get_by_job(&self, job_id: JobId) -> Result<Vec<Photo>> {
        self.with_conn(move |conn| {
            query_photos(
                conn,
                &format!("{} WHERE job_id = ?1 ORDER BY rowid", SELECT_PHOTOS),
                Some(job_id),
            )
        })
        .await
    }

    /// All photos for a customer, in insertion order
    pub async fn get_by_customer(&self, customer_id: CustomerId) -> Result<Vec<Photo>> {
        self.with_conn(move |conn| {
            query_photos(
                conn,
                &format!("{} WHERE customer_id = ?1 ORDER BY rowid", SELECT_PHOTOS),
                Some(customer_id),
            )
        })
        .await
    }

    /// Full scan, for diagnostics and export
    pub async fn get_all(&self) -> Result<Vec<Photo>> {
        self.with_conn(|conn| {
            query_photos(conn, &format!("{} ORDER BY rowid", SELECT_PHOTOS), None)
        })
        .await
    }

    /// Remove a photo. Deleting an id that is not stored is not an error.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let tx = conn.transaction().map_err(write_failure)?;
            let removed = tx
                .execute("DELETE FROM photos WHERE id = ?1", params![id])
                .map_err(write_failure)?;
            tx.commit().map_err(write_failure)?;
            if removed == 0 {
                tracing::debug!(id = %id, "delete of missing photo ignored");
            }
            Ok(())
        })
        .await
    }

    /// Number of stored photos
    pub async fn count(&self) -> Result<i64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM photos", [], |row| row.get(0))
                .map_err(read_failure)
        })
        .await
    }

    /// Look up a single photo by id
    pub async fn get(&self, id: &str) -> Result<Option<Photo>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    &format!("{} WHERE id = ?1", SELECT_PHOTOS),
                    params![id],
                    PhotoRow::from_row,
                )
                .optional()
                .map_err(read_failure)?;
            row.map(PhotoRow::into_photo).transpose()
        })
        .await
    }

    /// Run blocking database work off the async runtime
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let handle = self.open().await?;
        task::spawn_blocking(move || {
            // A poisoned lock only means another task panicked mid-call;
            // SQLite rolled back its transaction, so the connection is usable.
            let mut conn = handle
                .conn
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            f(&mut conn)
        })
        .await
        .map_err(|e| PhotoError::StorageUnavailable(format!("Task join error: {}", e)))?
    }
}

impl std::fmt::Debug for PhotoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoStore")
            .field("location", &self.location)
            .field("page_limit", &self.page_limit)
            .field("open", &self.handle.initialized())
            .finish()
    }
}

const SELECT_PHOTOS: &str = "SELECT id, job_id, customer_id, kind, mime_type, image, timestamp, latitude, longitude, notes FROM photos";

fn open_blocking(location: &StoreLocation, page_limit: Option<u32>) -> Result<StoreHandle> {
    let conn = match location {
        StoreLocation::File(path) => open_file(path)?,
        StoreLocation::Memory => Connection::open_in_memory().map_err(storage_unavailable)?,
    };

    init_schema(&conn)?;

    if let Some(pages) = page_limit {
        let applied: i64 = conn
            .pragma_update_and_check(None, "max_page_count", pages, |row| row.get(0))
            .map_err(storage_unavailable)?;
        tracing::debug!("Photo store capped at {} pages", applied);
    }

    match location {
        StoreLocation::File(path) => tracing::info!("📁 Photo store opened at: {}", path.display()),
        StoreLocation::Memory => tracing::info!("📁 Photo store opened in memory"),
    }

    Ok(StoreHandle {
        conn: Arc::new(Mutex::new(conn)),
    })
}

fn open_file(path: &Path) -> Result<Connection> {
    // Ensure the parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            PhotoError::StorageUnavailable(format!(
                "cannot create {}: {}",
                parent.display(),
                e
            ))
        })?;
    }
    Connection::open(path).map_err(storage_unavailable)
}

/// Create the photos table and its indexes if they don't exist.
/// The schema is additive only.
fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS photos (
            id              TEXT PRIMARY KEY NOT NULL,
            job_id          INTEGER NOT NULL,
            customer_id     INTEGER NOT NULL,
            kind            TEXT NOT NULL,
            mime_type       TEXT NOT NULL,
            image           BLOB NOT NULL,
            timestamp       TEXT NOT NULL,
            latitude        REAL,
            longitude       REAL,
            notes           TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_photos_job_id ON photos(job_id);
        CREATE INDEX IF NOT EXISTS idx_photos_customer_id ON photos(customer_id);",
    )
    .map_err(storage_unavailable)
}

fn query_photos(conn: &Connection, sql: &str, key: Option<i64>) -> Result<Vec<Photo>> {
    let mut stmt = conn.prepare(sql).map_err(read_failure)?;
    let rows = match key {
        Some(key) => stmt.query_map(params![key], PhotoRow::from_row),
        None => stmt.query_map([], PhotoRow::from_row),
    }
    .map_err(read_failure)?;

    // One damaged row must not hide the rest of the job
    let mut photos = Vec::new();
    for row in rows {
        match row.map_err(read_failure)?.into_photo() {
            Ok(photo) => photos.push(photo),
            Err(e) => tracing::warn!(error = %e, "skipping unreadable photo record"),
        }
    }
    Ok(photos)
}

/// A row as SQLite hands it back, before validation
struct PhotoRow {
    id: String,
    job_id: i64,
    customer_id: i64,
    kind: String,
    mime_type: String,
    image: Vec<u8>,
    timestamp: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    notes: Option<String>,
}

impl PhotoRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(PhotoRow {
            id: row.get(0)?,
            job_id: row.get(1)?,
            customer_id: row.get(2)?,
            kind: row.get(3)?,
            mime_type: row.get(4)?,
            image: row.get(5)?,
            timestamp: row.get(6)?,
            latitude: row.get(7)?,
            longitude: row.get(8)?,
            notes: row.get(9)?,
        })
    }

    fn into_photo(self) -> Result<Photo> {
        let kind = self.kind.parse().map_err(|reason| PhotoError::CorruptRecord {
            id: self.id.clone(),
            reason,
        })?;
        let timestamp = chrono::DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| PhotoError::CorruptRecord {
                id: self.id.clone(),
                reason: format!("bad timestamp '{}': {}", self.timestamp, e),
            })?
            .with_timezone(&chrono::Utc);

        Ok(Photo {
            id: self.id,
            job_id: self.job_id,
            customer_id: self.customer_id,
            kind,
            image: EncodedImage::new(self.mime_type, self.image),
            timestamp,
            latitude: self.latitude,
            longitude: self.longitude,
            notes: self.notes,
        })
    }
}

fn storage_unavailable(e: rusqlite::Error) -> PhotoError {
    PhotoError::StorageUnavailable(e.to_string())
}

fn write_failure(e: rusqlite::Error) -> PhotoError {
    PhotoError::WriteFailure(e.to_string())
}

fn read_failure(e: rusqlite::Error) -> PhotoError {
    PhotoError::ReadFailure(e.to_string())
}
