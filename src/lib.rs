//! Offline before/after photo capture and local storage for field crews.
//!
//! Three layers, leaf first:
//! - [`state::PhotoStore`] keeps photo records in an indexed on-device database
//! - [`capture::CaptureCoordinator`] captures, geotags and commits photos and
//!   publishes a live photo list per job
//! - [`gallery::GalleryPresenter`] groups a job's photos into a before/after
//!   comparison and drives the full-screen viewer

pub mod capture;
pub mod config;
pub mod error;
pub mod gallery;
pub mod logging;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{LocationUnavailable, PhotoError, Result};
