use std::sync::Arc;
use tokio::sync::watch;

use super::viewer::{DeletePress, PhotoViewer};
use crate::capture::coordinator::{CaptureCoordinator, JobPhotos};
use crate::capture::location::LocationProvider;
use crate::capture::source::ImageSource;
use crate::error::Result;
use crate::state::{JobId, Photo, PhotoKind};

/// The first before and first after photo, shown side by side
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonPair {
    pub before: Photo,
    pub after: Photo,
}

/// A job's photos grouped for display
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GalleryView {
    pub comparison: Option<ComparisonPair>,
    /// Before photos not used by the comparison pair
    pub extra_before: Vec<Photo>,
    /// After photos not used by the comparison pair
    pub extra_after: Vec<Photo>,
}

impl GalleryView {
    /// Partition by kind, keeping the order the store returned.
    pub fn from_photos(photos: &[Photo]) -> Self {
        let (mut before, mut after): (Vec<Photo>, Vec<Photo>) = photos
            .iter()
            .cloned()
            .partition(|p| p.kind == PhotoKind::Before);

        let comparison = if !before.is_empty() && !after.is_empty() {
            Some(ComparisonPair {
                before: before.remove(0),
                after: after.remove(0),
            })
        } else {
            None
        };

        GalleryView {
            comparison,
            extra_before: before,
            extra_after: after,
        }
    }

    pub fn len(&self) -> usize {
        self.extra_before.len() + self.extra_after.len() + if self.comparison.is_some() { 2 } else { 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, id: &str) -> Option<&Photo> {
        self.comparison
            .iter()
            .flat_map(|pair| [&pair.before, &pair.after])
            .chain(self.extra_before.iter())
            .chain(self.extra_after.iter())
            .find(|p| p.id == id)
    }
}

/// What the gallery section should render
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryState {
    Loading,
    Empty,
    Ready,
}

/// Result of a delete button press handled end to end
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteStep {
    Armed,
    Deleted,
    Ignored,
}

/// Drives the before/after gallery of one job and its photo viewer
pub struct GalleryPresenter<S, L> {
    coordinator: Arc<CaptureCoordinator<S, L>>,
    job_id: Option<JobId>,
    feed: Option<watch::Receiver<JobPhotos>>,
    is_loading: bool,
    view: GalleryView,
    viewer: PhotoViewer,
}

impl<S: ImageSource, L: LocationProvider> GalleryPresenter<S, L> {
    pub fn new(coordinator: Arc<CaptureCoordinator<S, L>>) -> Self {
        Self {
            coordinator,
            job_id: None,
            feed: None,
            is_loading: true,
            view: GalleryView::default(),
            viewer: PhotoViewer::new(),
        }
    }

    /// Subscribe to a job's photos, query them and build the view
    pub async fn load(&mut self, job_id: JobId) -> Result<&GalleryView> {
        self.watch(job_id);
        self.coordinator.refresh(job_id).await?;
        if let Some(feed) = self.feed.as_mut() {
            let latest = feed.borrow_and_update().clone();
            self.apply(&latest);
        }
        Ok(&self.view)
    }

    /// Follow a job's feed without querying. Someone else refreshes it.
    pub fn watch(&mut self, job_id: JobId) {
        if self.job_id == Some(job_id) {
            return;
        }
        self.viewer.close();
        self.job_id = Some(job_id);
        self.is_loading = true;
        self.view = GalleryView::default();
        self.feed = Some(self.coordinator.subscribe(job_id));
    }

    /// Pick up changes published by other components (e.g. a capture).
    /// Returns true when the view was rebuilt.
    pub fn sync(&mut self) -> bool {
        let Some(feed) = self.feed.as_mut() else {
            return false;
        };
        if !feed.has_changed().unwrap_or(false) {
            return false;
        }
        let latest = feed.borrow_and_update().clone();
        self.apply(&latest);
        true
    }

    /// Rebuild the view from a feed value
    pub fn apply(&mut self, photos: &JobPhotos) {
        self.is_loading = photos.is_loading;
        self.view = GalleryView::from_photos(&photos.photos);

        // The open photo may have been deleted elsewhere
        if let Some(open) = self.viewer.photo() {
            if self.view.find(&open.id).is_none() && !photos.is_loading {
                self.viewer.close();
            }
        }
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.job_id
    }

    pub fn view(&self) -> &GalleryView {
        &self.view
    }

    pub fn state(&self) -> GalleryState {
        if self.is_loading {
            GalleryState::Loading
        } else if self.view.is_empty() {
            GalleryState::Empty
        } else {
            GalleryState::Ready
        }
    }

    pub fn viewer(&self) -> &PhotoViewer {
        &self.viewer
    }

    /// Open a photo of this gallery full screen. Returns false for unknown ids.
    pub fn open(&mut self, id: &str) -> bool {
        match self.view.find(id) {
            Some(photo) => {
                let photo = photo.clone();
                self.viewer.open(photo);
                true
            }
            None => false,
        }
    }

    pub fn close_viewer(&mut self) {
        self.viewer.close();
    }

    /// First half of a delete press, for callers that run the delete themselves
    pub fn press_delete(&mut self) -> DeletePress {
        self.viewer.press_delete()
    }

    /// Second half: report whether the delete went through
    pub fn finish_delete(&mut self, deleted: bool) {
        self.viewer.finish_delete(deleted);
        self.sync();
    }

    /// Handle a delete press, running the delete when confirmed.
    ///
    /// Errors are returned to the caller; the viewer stays open and
    /// disarmed so the user can try again.
    pub async fn delete_pressed(&mut self) -> Result<DeleteStep> {
        match self.press_delete() {
            DeletePress::Armed => Ok(DeleteStep::Armed),
            DeletePress::Ignored => Ok(DeleteStep::Ignored),
            DeletePress::Execute(id) => match self.coordinator.delete_photo(&id).await {
                Ok(()) => {
                    self.finish_delete(true);
                    Ok(DeleteStep::Deleted)
                }
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "photo delete failed");
                    self.finish_delete(false);
                    Err(e)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::coordinator::{CaptureOutcome, CaptureRequest};
    use crate::capture::location::NoLocation;
    use crate::gallery::viewer::DeleteConfirm;
    use crate::state::{EncodedImage, PhotoStore};
    use crate::testing::StaticSource;
    use chrono::Utc;

    type TestCoordinator = CaptureCoordinator<StaticSource, NoLocation>;

    fn setup() -> (Arc<TestCoordinator>, GalleryPresenter<StaticSource, NoLocation>) {
        let coordinator = Arc::new(CaptureCoordinator::new(
            Arc::new(PhotoStore::in_memory()),
            StaticSource::photo(),
            NoLocation,
        ));
        let presenter = GalleryPresenter::new(coordinator.clone());
        (coordinator, presenter)
    }

    async fn capture(coordinator: &TestCoordinator, job_id: JobId, kind: PhotoKind) -> Photo {
        match coordinator
            .request_capture(CaptureRequest::new(job_id, 1, kind))
            .await
            .unwrap()
        {
            CaptureOutcome::Saved(photo) => photo,
            CaptureOutcome::Cancelled => panic!("capture was cancelled"),
        }
    }

    fn photo(id: &str, kind: PhotoKind) -> Photo {
        Photo {
            id: id.into(),
            job_id: 1,
            customer_id: 1,
            kind,
            image: EncodedImage::new("image/png", vec![1]),
            timestamp: Utc::now(),
            latitude: None,
            longitude: None,
            notes: None,
        }
    }

    #[test]
    fn test_pair_needs_both_kinds() {
        let only_before = GalleryView::from_photos(&[
            photo("b1", PhotoKind::Before),
            photo("b2", PhotoKind::Before),
        ]);
        assert_eq!(only_before.comparison, None);
        assert_eq!(only_before.extra_before.len(), 2);
        assert!(only_before.extra_after.is_empty());

        let only_after = GalleryView::from_photos(&[photo("a1", PhotoKind::After)]);
        assert_eq!(only_after.comparison, None);
        assert_eq!(only_after.extra_after.len(), 1);

        let empty = GalleryView::from_photos(&[]);
        assert!(empty.is_empty());
        assert_eq!(empty.comparison, None);
    }

    #[test]
    fn test_pair_uses_first_of_each_in_store_order() {
        let view = GalleryView::from_photos(&[
            photo("a1", PhotoKind::After),
            photo("b1", PhotoKind::Before),
            photo("a2", PhotoKind::After),
            photo("b2", PhotoKind::Before),
        ]);
        let pair = view.comparison.as_ref().unwrap();
        assert_eq!(pair.before.id, "b1");
        assert_eq!(pair.after.id, "a1");
        assert_eq!(view.extra_before.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), ["b2"]);
        assert_eq!(view.extra_after.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), ["a2"]);
        assert_eq!(view.len(), 4);
        assert_eq!(view.find("a2").map(|p| p.kind), Some(PhotoKind::After));
        assert!(view.find("zzz").is_none());
    }

    #[tokio::test]
    async fn test_third_before_does_not_replace_pair() {
        let (coordinator, mut presenter) = setup();
        let before = capture(&coordinator, 9, PhotoKind::Before).await;
        let after = capture(&coordinator, 9, PhotoKind::After).await;

        let view = presenter.load(9).await.unwrap();
        let pair = view.comparison.clone().unwrap();
        assert_eq!(pair.before, before);
        assert_eq!(pair.after, after);
        assert!(view.extra_before.is_empty());
        assert!(view.extra_after.is_empty());

        let third = capture(&coordinator, 9, PhotoKind::Before).await;
        assert!(presenter.sync());

        let view = presenter.view();
        let pair = view.comparison.as_ref().unwrap();
        assert_eq!(pair.before, before);
        assert_eq!(pair.after, after);
        assert_eq!(view.extra_before, vec![third]);
        assert!(view.extra_after.is_empty());
    }

    #[tokio::test]
    async fn test_states() {
        let (coordinator, mut presenter) = setup();
        assert_eq!(presenter.state(), GalleryState::Loading);

        presenter.load(3).await.unwrap();
        assert_eq!(presenter.state(), GalleryState::Empty);

        capture(&coordinator, 3, PhotoKind::Before).await;
        presenter.sync();
        assert_eq!(presenter.state(), GalleryState::Ready);
        assert!(presenter.view().comparison.is_none());
    }

    #[tokio::test]
    async fn test_confirmed_delete_removes_photo_and_closes_viewer() {
        let (coordinator, mut presenter) = setup();
        let before = capture(&coordinator, 5, PhotoKind::Before).await;
        capture(&coordinator, 5, PhotoKind::After).await;
        presenter.load(5).await.unwrap();

        assert!(presenter.open(&before.id));
        assert_eq!(presenter.delete_pressed().await.unwrap(), DeleteStep::Armed);
        assert_eq!(presenter.viewer().confirm(), DeleteConfirm::ConfirmArmed);
        assert_eq!(coordinator.store().count().await.unwrap(), 2);

        assert_eq!(presenter.delete_pressed().await.unwrap(), DeleteStep::Deleted);
        assert!(!presenter.viewer().is_open());
        assert!(presenter.view().find(&before.id).is_none());
        assert!(presenter.view().comparison.is_none());
        assert_eq!(coordinator.store().get_by_job(5).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_closing_viewer_cancels_armed_delete() {
        let (coordinator, mut presenter) = setup();
        let before = capture(&coordinator, 5, PhotoKind::Before).await;
        presenter.load(5).await.unwrap();

        presenter.open(&before.id);
        presenter.delete_pressed().await.unwrap();
        presenter.close_viewer();

        presenter.open(&before.id);
        assert_eq!(presenter.delete_pressed().await.unwrap(), DeleteStep::Armed);
        assert_eq!(coordinator.store().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_open_unknown_id() {
        let (_, mut presenter) = setup();
        presenter.load(1).await.unwrap();
        assert!(!presenter.open("missing"));
        assert_eq!(presenter.delete_pressed().await.unwrap(), DeleteStep::Ignored);
    }
}
