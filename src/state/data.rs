/// Shared data structures for the photo feature
///
/// These structs represent the data model that flows between
/// the store, the capture coordinator and the gallery.
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque foreign key into the job domain
pub type JobId = i64;
/// Opaque foreign key into the customer domain
pub type CustomerId = i64;
/// Client-generated photo identifier (UUID v4 string)
pub type PhotoId = String;

/// Whether a photo documents the state before or after the work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoKind {
    Before,
    After,
}

impl PhotoKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoKind::Before => "before",
            PhotoKind::After => "after",
        }
    }

    /// Human label used by the viewer badge
    pub fn label(&self) -> &'static str {
        match self {
            PhotoKind::Before => "Before",
            PhotoKind::After => "After",
        }
    }
}

impl fmt::Display for PhotoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhotoKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(PhotoKind::Before),
            "after" => Ok(PhotoKind::After),
            other => Err(format!("unknown photo kind '{}'", other)),
        }
    }
}

/// A fully encoded image payload, self-contained (no file path reference)
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// MIME type, e.g. "image/jpeg"
    pub mime_type: String,
    /// The encoded file bytes exactly as captured
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Render as a `data:` URL
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

// Payloads are megabytes; keep Debug output readable
impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl Serialize for EncodedImage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.data_url())
    }
}

impl<'de> Deserialize<'de> for EncodedImage {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let url = String::deserialize(deserializer)?;
        let rest = url
            .strip_prefix("data:")
            .ok_or_else(|| serde::de::Error::custom("image is not a data URL"))?;
        let (mime_type, payload) = rest
            .split_once(";base64,")
            .ok_or_else(|| serde::de::Error::custom("image data URL is not base64"))?;
        let bytes = STANDARD.decode(payload).map_err(serde::de::Error::custom)?;
        Ok(EncodedImage::new(mime_type, bytes))
    }
}

/// Latitude/longitude pair from a location fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// A single before/after photo bound to a job. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Photo {
    pub id: PhotoId,
    pub job_id: JobId,
    pub customer_id: CustomerId,
    #[serde(rename = "type")]
    pub kind: PhotoKind,
    pub image: EncodedImage,
    pub timestamp: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub notes: Option<String>,
}

impl Photo {
    /// Coordinates, only when both halves are present
    pub fn coordinates(&self) -> Option<Coordinates> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates {
                latitude,
                longitude,
            }),
            _ => None,
        }
    }
}

/// A photo record before the store assigns its id
#[derive(Debug, Clone, PartialEq)]
pub struct NewPhoto {
    pub job_id: JobId,
    pub customer_id: CustomerId,
    pub kind: PhotoKind,
    pub image: EncodedImage,
    pub timestamp: DateTime<Utc>,
    pub coordinates: Option<Coordinates>,
    pub notes: Option<String>,
}

impl NewPhoto {
    pub fn with_id(self, id: PhotoId) -> Photo {
        Photo {
            id,
            job_id: self.job_id,
            customer_id: self.customer_id,
            kind: self.kind,
            image: self.image,
            timestamp: self.timestamp,
            latitude: self.coordinates.map(|c| c.latitude),
            longitude: self.coordinates.map(|c| c.longitude),
            notes: self.notes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parses_stored_values() {
        assert_eq!("before".parse::<PhotoKind>().unwrap(), PhotoKind::Before);
        assert_eq!("after".parse::<PhotoKind>().unwrap(), PhotoKind::After);
        assert!("During".parse::<PhotoKind>().is_err());
    }

    #[test]
    fn test_data_url() {
        let image = EncodedImage::new("image/png", vec![1, 2, 3]);
        assert_eq!(image.data_url(), "data:image/png;base64,AQID");
    }

    #[test]
    fn test_coordinates_need_both_halves() {
        let mut photo = NewPhoto {
            job_id: 1,
            customer_id: 1,
            kind: PhotoKind::Before,
            image: EncodedImage::new("image/png", vec![]),
            timestamp: Utc::now(),
            coordinates: None,
            notes: None,
        }
        .with_id("p1".into());
        assert_eq!(photo.coordinates(), None);

        photo.latitude = Some(42.3601);
        assert_eq!(photo.coordinates(), None);

        photo.longitude = Some(-71.0589);
        assert_eq!(
            photo.coordinates(),
            Some(Coordinates {
                latitude: 42.3601,
                longitude: -71.0589
            })
        );
    }

    #[test]
    fn test_json_uses_record_field_names() {
        let photo = NewPhoto {
            job_id: 7,
            customer_id: 3,
            kind: PhotoKind::After,
            image: EncodedImage::new("image/jpeg", vec![0xff, 0xd8]),
            timestamp: "2026-01-01T08:00:00Z".parse().unwrap(),
            coordinates: None,
            notes: Some("Cleared and salted".into()),
        }
        .with_id("p2".into());

        let json = serde_json::to_value(&photo).unwrap();
        assert_eq!(json["jobId"], 7);
        assert_eq!(json["type"], "after");
        assert_eq!(json["image"], "data:image/jpeg;base64,/9g=");

        let restored: Photo = serde_json::from_value(json).unwrap();
        assert_eq!(restored, photo);
    }
}
