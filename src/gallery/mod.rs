/// Before/after gallery for a job
///
/// - Grouping photos into a comparison pair plus extras (presenter.rs)
/// - The full-screen viewer and its delete confirmation (viewer.rs)

pub mod presenter;
pub mod viewer;

pub use presenter::{ComparisonPair, DeleteStep, GalleryPresenter, GalleryState, GalleryView};
pub use viewer::{DeleteConfirm, DeletePress, PhotoDetails, PhotoViewer};
