use std::fmt;
use std::fs;
use std::path::Path;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Supported image media types.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ImageMediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,

    #[serde(rename = "image/png")]
    Png,

    #[serde(rename = "image/gif")]
    Gif,

    #[serde(rename = "image/webp")]
    Webp,
}

impl ImageMediaType {
    /// The MIME type declared to the provider.
    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageMediaType::Jpeg => "image/jpeg",
            ImageMediaType::Png => "image/png",
            ImageMediaType::Gif => "image/gif",
            ImageMediaType::Webp => "image/webp",
        }
    }

    /// Guess the media type from a file extension.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageMediaType::Jpeg),
            "png" => Some(ImageMediaType::Png),
            "gif" => Some(ImageMediaType::Gif),
            "webp" => Some(ImageMediaType::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for ImageMediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// An image selected by the user, held in memory until it is sent.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    /// Display name, usually the file name.
    pub name: String,

    /// Declared media type.
    pub media_type: ImageMediaType,

    /// Raw image bytes.
    pub data: Vec<u8>,
}

impl ImageAttachment {
    /// Create an attachment from raw bytes.
    pub fn new(name: impl Into<String>, media_type: ImageMediaType, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            data,
        }
    }

    /// Read an attachment from a file path.
    ///
    /// The media type is determined from the file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let media_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(ImageMediaType::from_extension)
            .ok_or_else(|| {
                Error::validation(
                    "Unsupported image type. Must be jpeg, png, gif, or webp",
                    Some(path.display().to_string()),
                )
            })?;
        let data = fs::read(path)
            .map_err(|err| Error::io(format!("failed to read {}", path.display()), err))?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, media_type, data))
    }

    /// Base64-encode the image bytes.
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.data)
    }

    /// The reference kept in the conversation history.
    pub fn reference(&self) -> ImageRef {
        ImageRef {
            name: self.name.clone(),
            media_type: self.media_type,
            size: self.data.len(),
        }
    }
}

impl fmt::Debug for ImageAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAttachment")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// A lightweight reference to an image that was attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageRef {
    /// Display name, usually the file name.
    pub name: String,

    /// Declared media type.
    pub media_type: ImageMediaType,

    /// Size of the image in bytes.
    pub size: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_type_from_extension() {
        assert_eq!(
            ImageMediaType::from_extension("JPG"),
            Some(ImageMediaType::Jpeg)
        );
        assert_eq!(
            ImageMediaType::from_extension("webp"),
            Some(ImageMediaType::Webp)
        );
        assert_eq!(ImageMediaType::from_extension("bmp"), None);
    }

    #[test]
    fn base64_and_reference() {
        let image = ImageAttachment::new("cut.png", ImageMediaType::Png, b"Hello World".to_vec());
        assert_eq!(image.to_base64(), "SGVsbG8gV29ybGQ=");
        let reference = image.reference();
        assert_eq!(reference.name, "cut.png");
        assert_eq!(reference.media_type, ImageMediaType::Png);
        assert_eq!(reference.size, 11);
    }

    #[test]
    fn from_path_rejects_unknown_extension() {
        let err = ImageAttachment::from_path("wound.bmp").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("burn.jpeg");
        std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();
        let image = ImageAttachment::from_path(&path).unwrap();
        assert_eq!(image.name, "burn.jpeg");
        assert_eq!(image.media_type, ImageMediaType::Jpeg);
        assert_eq!(image.data, vec![0xff, 0xd8, 0xff]);
    }

    #[test]
    fn media_type_serialization() {
        let json = serde_json::to_string(&ImageMediaType::Gif).unwrap();
        assert_eq!(json, r#""image/gif""#);
    }
}
