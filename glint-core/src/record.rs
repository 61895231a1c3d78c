//! List records and decoded images.

use std::sync::Arc;

use image::DynamicImage;

use crate::key::ContentKey;

/// One list entry: the remote image identity plus the label shown beside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceRecord {
    /// Source URL of the image.
    pub identity: String,
    /// Text shown in the row.
    pub display_label: String,
}

impl ResourceRecord {
    /// Build a record from a URL and a label.
    pub fn new(
        identity: impl Into<String>,
        display_label: impl Into<String>,
    ) -> Self {
        Self {
            identity: identity.into(),
            display_label: display_label.into(),
        }
    }
}

/// A decoded image handed to the list consumer.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    /// Identity the image was requested for.
    pub identity: String,
    /// Cache entry the bytes live under.
    pub key: ContentKey,
    /// Encoded bytes exactly as stored in the cache.
    pub bytes: Arc<[u8]>,
    /// Decoded width in pixels.
    pub width: u32,
    /// Decoded height in pixels.
    pub height: u32,
    /// Decoded pixels.
    pub image: Arc<DynamicImage>,
}

impl LoadedImage {
    /// `(width, height)` in pixels.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
