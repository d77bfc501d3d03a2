//! Embedded image attachments.
//!
//! Images attached during intake travel as self-contained `data:` URLs
//! (`data:<media type>;base64,<payload>`), so a record never points at an external file on the
//! wire. On disk the store keeps the bytes content-addressed next to the record document and
//! rehydrates them on read.

use crate::{RecordError, RecordResult};
use base64::{engine::general_purpose, Engine as _};
use std::fmt;

const DATA_URL_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// An image attached to a treatment record: its media type plus raw bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBlob {
    media_type: String,
    bytes: Vec<u8>,
}

impl ImageBlob {
    /// Creates an image blob from a known media type.
    ///
    /// # Errors
    ///
    /// Returns [`RecordError::NotAnImage`] unless `media_type` is an `image/*` type.
    pub fn new(media_type: impl Into<String>, bytes: Vec<u8>) -> RecordResult<Self> {
        let media_type = media_type.into().trim().to_ascii_lowercase();
        if !is_image_media_type(&media_type) {
            return Err(RecordError::NotAnImage);
        }
        Ok(Self { media_type, bytes })
    }

    /// Builds an image blob from uploaded bytes.
    ///
    /// The media type is sniffed from the content; `declared` is only used when the content
    /// is not recognised.
    pub fn from_upload(bytes: Vec<u8>, declared: Option<&str>) -> RecordResult<Self> {
        let detected = infer::get(&bytes).map(|kind| kind.mime_type().to_owned());
        match detected.or_else(|| declared.map(str::to_owned)) {
            Some(media_type) => Self::new(media_type, bytes),
            None => Err(RecordError::NotAnImage),
        }
    }

    /// Parses a `data:<media type>;base64,<payload>` URL.
    pub fn from_data_url(input: &str) -> RecordResult<Self> {
        let rest = input
            .trim()
            .strip_prefix(DATA_URL_PREFIX)
            .ok_or_else(|| RecordError::InvalidInput("image must be a data: URL".into()))?;
        let (media_type, payload) = rest.split_once(BASE64_MARKER).ok_or_else(|| {
            RecordError::InvalidInput("image data URL must be base64 encoded".into())
        })?;
        let bytes = general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| RecordError::InvalidInput(format!("invalid base64 image data: {}", e)))?;
        Self::new(media_type, bytes)
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "{}{}{}{}",
            DATA_URL_PREFIX,
            self.media_type,
            BASE64_MARKER,
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

fn is_image_media_type(media_type: &str) -> bool {
    media_type
        .strip_prefix("image/")
        .is_some_and(|subtype| !subtype.is_empty())
}

impl fmt::Debug for ImageBlob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBlob")
            .field("media_type", &self.media_type)
            .field("size_bytes", &self.bytes.len())
            .finish()
    }
}

impl serde::Serialize for ImageBlob {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_data_url())
    }
}

impl<'de> serde::Deserialize<'de> for ImageBlob {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        ImageBlob::from_data_url(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

    #[test]
    fn test_data_url_round_trip() {
        let blob = ImageBlob::new("image/png", PNG_HEADER.to_vec()).unwrap();
        let url = blob.to_data_url();

        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(ImageBlob::from_data_url(&url).unwrap(), blob);
    }

    #[test]
    fn test_from_upload_prefers_detected_type() {
        let blob = ImageBlob::from_upload(PNG_HEADER.to_vec(), Some("image/jpeg")).unwrap();
        assert_eq!(blob.media_type(), "image/png");
    }

    #[test]
    fn test_from_upload_falls_back_to_declared_type() {
        let blob = ImageBlob::from_upload(b"opaque".to_vec(), Some("image/x-scan")).unwrap();
        assert_eq!(blob.media_type(), "image/x-scan");

        assert!(matches!(
            ImageBlob::from_upload(b"opaque".to_vec(), None),
            Err(RecordError::NotAnImage)
        ));
    }

    #[test]
    fn test_rejects_non_image_media_types() {
        assert!(matches!(
            ImageBlob::new("application/pdf", vec![1, 2, 3]),
            Err(RecordError::NotAnImage)
        ));
        assert!(matches!(
            ImageBlob::from_data_url("data:text/plain;base64,aGVsbG8="),
            Err(RecordError::NotAnImage)
        ));
    }

    #[test]
    fn test_rejects_malformed_data_urls() {
        assert!(ImageBlob::from_data_url("http://example.com/x.png").is_err());
        assert!(ImageBlob::from_data_url("data:image/png,raw").is_err());
        assert!(ImageBlob::from_data_url("data:image/png;base64,@@@").is_err());
    }

    #[test]
    fn test_serde_uses_data_url_string() {
        let blob = ImageBlob::new("image/png", PNG_HEADER.to_vec()).unwrap();
        let json = serde_json::to_string(&blob).unwrap();

        assert!(json.starts_with("\"data:image/png;base64,"));
        let back: ImageBlob = serde_json::from_str(&json).unwrap();
        assert_eq!(back, blob);
    }
}
