use crate::models::DEFAULT_VIDEO_CONTENT_TYPE;

pub fn detect_video_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [_, _, _, _, b'f', b't', b'y', b'p', b'q', b't', ..] => "video/quicktime",
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => "video/mp4",
        [0x1A, 0x45, 0xDF, 0xA3, ..] => "video/webm",
        _ => {
            tracing::warn!(
                "Unrecognized video format (first 8 bytes: {:02X?}), falling back to {}",
                &bytes[..bytes.len().min(8)],
                DEFAULT_VIDEO_CONTENT_TYPE
            );
            DEFAULT_VIDEO_CONTENT_TYPE
        }
    }
}

/// Whether a declared content type names actual media rather than a generic
/// byte stream.
pub fn is_media_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    essence.starts_with("video/") || essence.starts_with("image/") || essence.starts_with("audio/")
}
