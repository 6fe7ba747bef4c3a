/// Photo capture module
///
/// This module handles:
/// - Acquiring an image from the platform (source.rs)
/// - Validating and packaging the captured bytes (encode.rs)
/// - Best-effort location tagging with a deadline (location.rs)
/// - Orchestrating a capture and the per-job photo feeds (coordinator.rs)

pub mod coordinator;
pub mod encode;
pub mod location;
pub mod source;

pub use coordinator::{CaptureCoordinator, CaptureOutcome, CaptureRequest, JobPhotos};
pub use location::{ConfiguredLocation, FixedLocation, LocationProvider, NoLocation};
pub use source::{FilePickerSource, ImageSource};
