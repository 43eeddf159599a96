//! Originality-score normalization.
//!
//! Every content category is checked by a different upstream engine, and
//! each engine reports similarity or distance on its own scale and
//! polarity. This module folds all of them into one convention: a boolean
//! verdict plus a 0-100 score where higher means more original.
//!
//! The verdict gates securing and delivery, and the marketplace's default
//! listing filter depends on it, so the per-category rules here are
//! load-bearing rather than cosmetic.

use serde::{Deserialize, Serialize};

use crate::types::ContentCategory;

/// Raw response from an originality engine.
///
/// A superset of every engine's fields; each category reads only its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineReport {
    /// Verdict string. Audio and image engines shout (`"ORIGINAL"`),
    /// video and text engines do not (`"Original"`).
    #[serde(default)]
    pub status: Option<String>,

    /// Audio: similarity percentage of the best fingerprint match.
    #[serde(default)]
    pub top_score: Option<f64>,

    /// Image: perceptual-hash distance of the nearest match.
    /// `-1` means no match was found at all.
    #[serde(default)]
    pub distance: Option<i64>,

    /// Video: visual similarity, 0.0-1.0.
    #[serde(default)]
    pub visual_score: Option<f64>,

    /// Video: similarity of the audio track, 0-100.
    #[serde(default)]
    pub audio_score: Option<f64>,

    /// Text: similarity, 0.0-1.0.
    #[serde(default)]
    pub similarity_score: Option<f64>,
}

/// Normalized originality result: `is_original` plus a 0-100 score where
/// higher is more original.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalityVerdict {
    pub is_original: bool,
    pub score: u8,
}

impl OriginalityVerdict {
    pub fn new(is_original: bool, score: u8) -> Self {
        Self { is_original, score }
    }
}

impl ContentCategory {
    /// Normalize a raw engine report for this category.
    pub fn normalize(&self, report: &EngineReport) -> OriginalityVerdict {
        match self {
            // Audio reports a similarity percentage; invert it.
            ContentCategory::Audio => OriginalityVerdict::new(
                report.status.as_deref() == Some("ORIGINAL"),
                invert_similarity(report.top_score.unwrap_or(0.0)),
            ),

            // Image reports a hash distance: 0 is an exact match, 32+ maps
            // to fully original. -1 is the no-match sentinel.
            ContentCategory::Image => {
                let distance = report.distance.unwrap_or(100);
                let score = if distance < 0 {
                    100
                } else {
                    let scaled = (distance as f64 / 32.0 * 100.0).round();
                    scaled.min(100.0) as u8
                };
                OriginalityVerdict::new(report.status.as_deref() == Some("ORIGINAL"), score)
            }

            // Video reports visual (0.0-1.0) and audio-track (0-100)
            // similarities; the worse of the two decides.
            ContentCategory::Video => {
                let visual = report.visual_score.unwrap_or(0.0) * 100.0;
                let audio = report.audio_score.unwrap_or(0.0);
                OriginalityVerdict::new(
                    report.status.as_deref() == Some("Original"),
                    invert_similarity(visual.max(audio)),
                )
            }

            // Text reports a 0.0-1.0 similarity; invert it.
            ContentCategory::Text => OriginalityVerdict::new(
                report.status.as_deref() == Some("Original"),
                invert_similarity(report.similarity_score.unwrap_or(0.0) * 100.0),
            ),
        }
    }
}

/// Convert a 0-100 similarity into a 0-100 originality score.
fn invert_similarity(similarity: f64) -> u8 {
    (100.0 - similarity).clamp(0.0, 100.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(status: &str) -> EngineReport {
        EngineReport {
            status: Some(status.to_string()),
            ..EngineReport::default()
        }
    }

    #[test]
    fn test_audio_inverts_similarity() {
        let mut r = report("ORIGINAL");
        r.top_score = Some(20.0);
        let v = ContentCategory::Audio.normalize(&r);
        assert!(v.is_original);
        assert_eq!(v.score, 80);
    }

    #[test]
    fn test_audio_similarity_over_100_clamps() {
        let mut r = report("DUPLICATE");
        r.top_score = Some(140.0);
        let v = ContentCategory::Audio.normalize(&r);
        assert!(!v.is_original);
        assert_eq!(v.score, 0);
    }

    #[test]
    fn test_image_duplicate_distance_scaling() {
        let mut r = report("DUPLICATE");
        r.distance = Some(5);
        let v = ContentCategory::Image.normalize(&r);
        assert!(!v.is_original);
        assert_eq!(v.score, 16); // round(5 / 32 * 100)
    }

    #[test]
    fn test_image_no_match_sentinel() {
        let mut r = report("ORIGINAL");
        r.distance = Some(-1);
        let v = ContentCategory::Image.normalize(&r);
        assert!(v.is_original);
        assert_eq!(v.score, 100);
    }

    #[test]
    fn test_image_large_distance_caps_at_100() {
        let mut r = report("ORIGINAL");
        r.distance = Some(64);
        assert_eq!(ContentCategory::Image.normalize(&r).score, 100);
    }

    #[test]
    fn test_image_missing_distance_reads_as_original() {
        let r = report("ORIGINAL");
        assert_eq!(ContentCategory::Image.normalize(&r).score, 100);
    }

    #[test]
    fn test_video_takes_worse_of_both_tracks() {
        let mut r = report("Original");
        r.visual_score = Some(0.3); // 30% similar
        r.audio_score = Some(55.0); // 55% similar, the worse one
        let v = ContentCategory::Video.normalize(&r);
        assert!(v.is_original);
        assert_eq!(v.score, 45);
    }

    #[test]
    fn test_text_inverts_fractional_similarity() {
        let mut r = report("Duplicate");
        r.similarity_score = Some(0.92);
        let v = ContentCategory::Text.normalize(&r);
        assert!(!v.is_original);
        assert_eq!(v.score, 8);
    }

    #[test]
    fn test_status_casing_is_per_engine() {
        // The audio engine shouts; the text engine does not. Casing from
        // the wrong engine must not read as original.
        let mut audio = report("Original");
        audio.top_score = Some(0.0);
        assert!(!ContentCategory::Audio.normalize(&audio).is_original);

        let mut text = report("ORIGINAL");
        text.similarity_score = Some(0.0);
        assert!(!ContentCategory::Text.normalize(&text).is_original);
    }

    #[test]
    fn test_report_parses_engine_json() {
        let raw = r#"{"status":"DUPLICATE","distance":5,"matched_label":"abc123"}"#;
        let r: EngineReport = serde_json::from_str(raw).unwrap();
        let v = ContentCategory::Image.normalize(&r);
        assert!(!v.is_original);
        assert_eq!(v.score, 16);
    }

    #[test]
    fn test_empty_report_defaults() {
        let v = ContentCategory::Audio.normalize(&EngineReport::default());
        assert!(!v.is_original);
        assert_eq!(v.score, 100); // no similarity reported
    }
}
