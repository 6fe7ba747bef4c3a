/// Photo persistence
///
/// This module handles everything that touches the device database:
/// - Shared data structures (data.rs)
/// - The indexed SQLite photo store (store.rs)
/// - JSON export of the whole store (export.rs)

pub mod data;
pub mod export;
pub mod store;

pub use data::{Coordinates, CustomerId, EncodedImage, JobId, NewPhoto, Photo, PhotoId, PhotoKind};
pub use store::PhotoStore;
