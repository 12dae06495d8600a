//! Upload policy: quota, type allow-list and size ceilings
//!
//! Checks run in a fixed order (quota, then type, then size) and touch
//! nothing but the candidate file and the user's current upload count.
//! The declared MIME type is trusted; file contents are not sniffed.

use crate::error::UploadError;
use crate::models::{CandidateFile, MediaKind};

/// Maximum successful uploads per account
pub const MAX_USER_UPLOADS: i32 = 5;
/// Image size ceiling (1 MiB)
pub const MAX_IMAGE_SIZE: usize = 1024 * 1024;
/// Video size ceiling (5 MiB)
pub const MAX_VIDEO_SIZE: usize = 5 * 1024 * 1024;

const ALLOWED_IMAGE_TYPES: &[&str] = &[
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
];

const ALLOWED_VIDEO_TYPES: &[&str] = &[
    "video/mp4",
    "video/webm",
    "video/ogg",
    "video/avi",
    "video/mov",
    "video/quicktime",
];

#[derive(Debug, Clone)]
pub struct UploadPolicy {
    pub max_uploads: i32,
    pub max_image_size: usize,
    pub max_video_size: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_uploads: MAX_USER_UPLOADS,
            max_image_size: MAX_IMAGE_SIZE,
            max_video_size: MAX_VIDEO_SIZE,
        }
    }
}

impl UploadPolicy {
    /// Validate a candidate upload for a user who has `upload_count` uploads
    pub fn validate(&self, file: &CandidateFile, upload_count: i32) -> Result<MediaKind, UploadError> {
        self.check_quota(upload_count)?;

        let kind = classify(&file.content_type).ok_or_else(|| UploadError::UnsupportedType {
            content_type: file.content_type.clone(),
        })?;

        let limit = self.ceiling(kind);
        if file.size() > limit {
            return Err(UploadError::FileTooLarge { kind, limit });
        }

        Ok(kind)
    }

    /// Quota alone; usable before the file has been received
    pub fn check_quota(&self, upload_count: i32) -> Result<(), UploadError> {
        if upload_count >= self.max_uploads {
            return Err(UploadError::QuotaExceeded {
                limit: self.max_uploads,
            });
        }
        Ok(())
    }

    pub fn ceiling(&self, kind: MediaKind) -> usize {
        match kind {
            MediaKind::Image => self.max_image_size,
            MediaKind::Video => self.max_video_size,
        }
    }

    /// The largest file any upload may carry
    pub fn largest_ceiling(&self) -> usize {
        self.max_image_size.max(self.max_video_size)
    }
}

/// Map a declared MIME type onto the allow-lists
pub fn classify(content_type: &str) -> Option<MediaKind> {
    let essence = normalize_content_type(content_type);

    if ALLOWED_IMAGE_TYPES.contains(&essence.as_str()) {
        Some(MediaKind::Image)
    } else if ALLOWED_VIDEO_TYPES.contains(&essence.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// Lower-cased MIME type without parameters (`image/PNG; q=1` -> `image/png`)
pub fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}
