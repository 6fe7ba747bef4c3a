//! Test doubles for the platform seams

use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::capture::encode::RawCapture;
use crate::capture::location::LocationProvider;
use crate::capture::source::ImageSource;
use crate::error::{LocationUnavailable, Result};
use crate::state::Coordinates;

/// A tiny valid PNG
pub fn png_bytes() -> Vec<u8> {
    let img = RgbImage::from_pixel(4, 3, Rgb([22, 163, 74]));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode test png");
    bytes
}

/// Image source that hands back fixed bytes, or cancels when empty
pub struct StaticSource {
    bytes: Option<Vec<u8>>,
    pub calls: AtomicUsize,
}

impl StaticSource {
    pub fn photo() -> Self {
        Self::with_bytes(png_bytes())
    }

    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Some(bytes),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn cancelled() -> Self {
        Self {
            bytes: None,
            calls: AtomicUsize::new(0),
        }
    }
}

impl ImageSource for StaticSource {
    async fn acquire(&self) -> Result<Option<RawCapture>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bytes.clone().map(|bytes| RawCapture {
            bytes,
            file_name: Some("capture.png".into()),
        }))
    }
}

/// Location provider that answers after a delay
pub struct DelayedLocation {
    delay: Duration,
    fix: Coordinates,
}

impl DelayedLocation {
    pub fn new(delay: Duration, fix: Coordinates) -> Self {
        Self { delay, fix }
    }
}

impl LocationProvider for DelayedLocation {
    async fn current_fix(&self) -> std::result::Result<Coordinates, LocationUnavailable> {
        tokio::time::sleep(self.delay).await;
        Ok(self.fix)
    }
}
