//! Content-type resolution.
//!
//! Each category carries its own MIME rule: video and audio are fixed,
//! image and text are refined by the original file's extension.

use crate::types::ContentCategory;

/// MIME type of the watermark transform's output, regardless of source.
pub const WATERMARK_MIME: &str = "video/mp4";

impl ContentCategory {
    /// The category's default MIME type, used when the extension does not
    /// refine it.
    pub fn default_mime(&self) -> &'static str {
        match self {
            ContentCategory::Video => "video/mp4",
            ContentCategory::Audio => "audio/mpeg",
            ContentCategory::Image => "image/jpeg",
            ContentCategory::Text => "text/plain",
        }
    }

    /// Resolve the MIME type for a file of this category.
    ///
    /// `file_name` is the original upload name; only its extension is
    /// consulted.
    pub fn resolve_mime(&self, file_name: &str) -> &'static str {
        let ext = extension(file_name);
        match self {
            ContentCategory::Video => "video/mp4",
            ContentCategory::Audio => "audio/mpeg",
            ContentCategory::Image => match ext.as_deref() {
                Some("png") => "image/png",
                Some("gif") => "image/gif",
                Some("webp") => "image/webp",
                _ => "image/jpeg",
            },
            ContentCategory::Text => match ext.as_deref() {
                Some("pdf") => "application/pdf",
                _ => "text/plain",
            },
        }
    }

    /// Whether the watermark transform applies to this category.
    pub fn supports_watermark(&self) -> bool {
        matches!(self, ContentCategory::Video)
    }
}

fn extension(file_name: &str) -> Option<String> {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => Some(ext.to_ascii_lowercase()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_audio_fixed() {
        assert_eq!(ContentCategory::Video.resolve_mime("clip.mkv"), "video/mp4");
        assert_eq!(ContentCategory::Audio.resolve_mime("track.wav"), "audio/mpeg");
    }

    #[test]
    fn test_image_refined_by_extension() {
        assert_eq!(ContentCategory::Image.resolve_mime("a.png"), "image/png");
        assert_eq!(ContentCategory::Image.resolve_mime("a.GIF"), "image/gif");
        assert_eq!(ContentCategory::Image.resolve_mime("a.webp"), "image/webp");
        assert_eq!(ContentCategory::Image.resolve_mime("a.jpg"), "image/jpeg");
        assert_eq!(ContentCategory::Image.resolve_mime("noext"), "image/jpeg");
    }

    #[test]
    fn test_text_refined_by_extension() {
        assert_eq!(ContentCategory::Text.resolve_mime("doc.pdf"), "application/pdf");
        assert_eq!(ContentCategory::Text.resolve_mime("doc.txt"), "text/plain");
        assert_eq!(ContentCategory::Text.resolve_mime("doc"), "text/plain");
    }

    #[test]
    fn test_watermark_support() {
        assert!(ContentCategory::Video.supports_watermark());
        assert!(!ContentCategory::Audio.supports_watermark());
        assert!(!ContentCategory::Image.supports_watermark());
        assert!(!ContentCategory::Text.supports_watermark());
    }
}
