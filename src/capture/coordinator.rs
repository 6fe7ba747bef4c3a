use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex};
use uuid::Uuid;

use super::encode::encode_capture;
use super::location::{fix_within, LocationProvider, DEFAULT_LOCATION_TIMEOUT};
use super::source::ImageSource;
use crate::error::Result;
use crate::state::{CustomerId, JobId, NewPhoto, Photo, PhotoKind, PhotoStore};

/// What observers of a job see
#[derive(Debug, Clone, PartialEq)]
pub struct JobPhotos {
    pub photos: Vec<Photo>,
    pub is_loading: bool,
}

impl Default for JobPhotos {
    fn default() -> Self {
        // Nothing has been queried yet
        Self {
            photos: Vec::new(),
            is_loading: true,
        }
    }
}

/// One capture gesture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub job_id: JobId,
    pub customer_id: CustomerId,
    pub kind: PhotoKind,
    pub notes: Option<String>,
}

impl CaptureRequest {
    pub fn new(job_id: JobId, customer_id: CustomerId, kind: PhotoKind) -> Self {
        Self {
            job_id,
            customer_id,
            kind,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// The photo is durably stored
    Saved(Photo),
    /// The user backed out of the image flow; nothing was written
    Cancelled,
}

/// A job's shared feed. Refreshes of one job run one at a time so a slow
/// query can never publish over a newer result.
struct JobFeed {
    sender: watch::Sender<JobPhotos>,
    refreshing: Arc<AsyncMutex<()>>,
}

impl JobFeed {
    fn new() -> Self {
        Self {
            sender: watch::Sender::new(JobPhotos::default()),
            refreshing: Arc::new(AsyncMutex::new(())),
        }
    }
}

/// Captures photos for jobs and keeps per-job photo feeds current.
///
/// Captures are independent of each other; nothing here serializes them.
/// The store serializes the writes.
pub struct CaptureCoordinator<S, L> {
    store: Arc<PhotoStore>,
    source: S,
    location: L,
    location_timeout: Duration,
    feeds: Mutex<HashMap<JobId, JobFeed>>,
}

impl<S: ImageSource, L: LocationProvider> CaptureCoordinator<S, L> {
    pub fn new(store: Arc<PhotoStore>, source: S, location: L) -> Self {
        Self {
            store,
            source,
            location,
            location_timeout: DEFAULT_LOCATION_TIMEOUT,
            feeds: Mutex::new(HashMap::new()),
        }
    }

    /// Shorten the location wait. Values above the 5 second bound are capped.
    pub fn with_location_timeout(mut self, timeout: Duration) -> Self {
        if timeout > DEFAULT_LOCATION_TIMEOUT {
            tracing::warn!(
                requested = ?timeout,
                "location timeout capped at {:?}",
                DEFAULT_LOCATION_TIMEOUT
            );
        }
        self.location_timeout = timeout.min(DEFAULT_LOCATION_TIMEOUT);
        self
    }

    pub fn store(&self) -> &Arc<PhotoStore> {
        &self.store
    }

    /// Acquire, geotag and store one photo.
    ///
    /// Cancelling the image flow returns `CaptureOutcome::Cancelled` with no
    /// side effects. A missing or late location fix never fails the capture.
    pub async fn request_capture(&self, request: CaptureRequest) -> Result<CaptureOutcome> {
        let Some(raw) = self.source.acquire().await? else {
            tracing::info!(job_id = request.job_id, "capture cancelled");
            return Ok(CaptureOutcome::Cancelled);
        };

        let image = encode_capture(raw).await?;

        let coordinates = match fix_within(&self.location, self.location_timeout).await {
            Ok(fix) => Some(fix),
            Err(reason) => {
                tracing::warn!(job_id = request.job_id, %reason, "saving photo without coordinates");
                None
            }
        };

        let photo = self
            .add_photo(NewPhoto {
                job_id: request.job_id,
                customer_id: request.customer_id,
                kind: request.kind,
                image,
                timestamp: Utc::now(),
                coordinates,
                notes: request.notes,
            })
            .await?;

        tracing::info!(
            "📸 Captured {} photo {} for job {}",
            photo.kind,
            photo.id,
            photo.job_id
        );
        Ok(CaptureOutcome::Saved(photo))
    }

    /// Assign an id, persist, then refresh the job's feed
    pub async fn add_photo(&self, photo: NewPhoto) -> Result<Photo> {
        let photo = photo.with_id(Uuid::new_v4().to_string());
        self.store.save(photo.clone()).await?;
        // The photo is committed; a failed re-query is logged by refresh
        let _ = self.refresh(photo.job_id).await;
        Ok(photo)
    }

    /// Delete by id, then refresh every observed job
    pub async fn delete_photo(&self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        let jobs: Vec<JobId> = self.lock_feeds().keys().copied().collect();
        for job_id in jobs {
            let _ = self.refresh(job_id).await;
        }
        Ok(())
    }

    /// Live view of a job's photos. Starts in the loading state until the
    /// next `refresh`. Every subscriber to a job shares one feed.
    pub fn subscribe(&self, job_id: JobId) -> watch::Receiver<JobPhotos> {
        self.lock_feeds()
            .entry(job_id)
            .or_insert_with(JobFeed::new)
            .sender
            .subscribe()
    }

    /// Re-query a job and publish the result to its feed.
    ///
    /// On failure the feed keeps its previous photos and leaves the
    /// loading state.
    pub async fn refresh(&self, job_id: JobId) -> Result<Vec<Photo>> {
        let gate = self
            .lock_feeds()
            .get(&job_id)
            .map(|feed| Arc::clone(&feed.refreshing));
        // Held until the result is published
        let _turn = match gate {
            Some(gate) => Some(gate.lock_owned().await),
            None => None,
        };

        self.publish(job_id, |feed| feed.is_loading = true);

        match self.store.get_by_job(job_id).await {
            Ok(photos) => {
                let published = photos.clone();
                self.publish(job_id, move |feed| {
                    feed.photos = published;
                    feed.is_loading = false;
                });
                Ok(photos)
            }
            Err(e) => {
                tracing::warn!(job_id, error = %e, "failed to load photos");
                self.publish(job_id, |feed| feed.is_loading = false);
                Err(e)
            }
        }
    }

    /// Photos across all of a customer's jobs
    pub async fn photos_for_customer(&self, customer_id: CustomerId) -> Result<Vec<Photo>> {
        self.store.get_by_customer(customer_id).await
    }

    fn publish(&self, job_id: JobId, update: impl FnOnce(&mut JobPhotos)) {
        if let Some(feed) = self.lock_feeds().get(&job_id) {
            feed.sender.send_modify(update);
        }
    }

    fn lock_feeds(&self) -> MutexGuard<'_, HashMap<JobId, JobFeed>> {
        self.feeds.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
