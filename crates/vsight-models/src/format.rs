//! Accepted video container formats.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Error returned for files outside the upload allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unsupported video format: {0} (allowed: mp4, mov, avi, webm)")]
pub struct UnsupportedFormat(pub String);

/// Video formats accepted for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum VideoFormat {
    Mp4,
    Mov,
    Avi,
    Webm,
}

impl VideoFormat {
    pub const ALL: [VideoFormat; 4] = [VideoFormat::Mp4, VideoFormat::Mov, VideoFormat::Avi, VideoFormat::Webm];

    pub fn extension(&self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "mp4",
            VideoFormat::Mov => "mov",
            VideoFormat::Avi => "avi",
            VideoFormat::Webm => "webm",
        }
    }

    /// MIME type declared to the remote service.
    pub fn mime_type(&self) -> &'static str {
        match self {
            VideoFormat::Mp4 => "video/mp4",
            VideoFormat::Mov => "video/quicktime",
            VideoFormat::Avi => "video/x-msvideo",
            VideoFormat::Webm => "video/webm",
        }
    }

    /// Resolve a bare extension (case-insensitive, leading dot allowed).
    pub fn from_extension(ext: &str) -> Result<Self, UnsupportedFormat> {
        let ext = ext.trim().trim_start_matches('.');
        VideoFormat::ALL
            .into_iter()
            .find(|f| f.extension().eq_ignore_ascii_case(ext))
            .ok_or_else(|| UnsupportedFormat(ext.to_string()))
    }

    /// Resolve the format from a file name such as `lobby cam.MOV`.
    pub fn from_filename(name: &str) -> Result<Self, UnsupportedFormat> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| UnsupportedFormat(name.to_string()))?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for VideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}
