//! Proptest strategies for property-based testing.

use proptest::prelude::*;

use vaultstream_core::{ContentCategory, EngineReport, LicenseTier};

/// Strategy over all content categories.
pub fn content_category() -> impl Strategy<Value = ContentCategory> {
    prop_oneof![
        Just(ContentCategory::Video),
        Just(ContentCategory::Audio),
        Just(ContentCategory::Image),
        Just(ContentCategory::Text),
    ]
}

/// Strategy over all license tiers.
pub fn license_tier() -> impl Strategy<Value = LicenseTier> {
    prop_oneof![
        Just(LicenseTier::OneTime),
        Just(LicenseTier::Limited),
        Just(LicenseTier::Commercial),
        Just(LicenseTier::Exclusive),
    ]
}

/// Strategy over raw engine reports, covering every field any engine
/// reports plus out-of-range values.
pub fn engine_report() -> impl Strategy<Value = EngineReport> {
    (
        proptest::option::of(prop_oneof![
            Just("ORIGINAL".to_string()),
            Just("Original".to_string()),
            Just("DUPLICATE".to_string()),
            Just("Duplicate".to_string()),
        ]),
        proptest::option::of(-10.0f64..150.0),
        proptest::option::of(-1i64..200),
        proptest::option::of(0.0f64..1.5),
        proptest::option::of(-10.0f64..150.0),
        proptest::option::of(0.0f64..1.5),
    )
        .prop_map(
            |(status, top_score, distance, visual_score, audio_score, similarity_score)| {
                EngineReport {
                    status,
                    top_score,
                    distance,
                    visual_score,
                    audio_score,
                    similarity_score,
                }
            },
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        /// Normalized scores stay in range for any report any engine
        /// could produce.
        #[test]
        fn score_always_in_range(
            category in content_category(),
            report in engine_report(),
        ) {
            let verdict = category.normalize(&report);
            prop_assert!(verdict.score <= 100);
        }

        /// A report with no status is never original, whatever the
        /// numbers say.
        #[test]
        fn no_status_never_original(
            category in content_category(),
            mut report in engine_report(),
        ) {
            report.status = None;
            prop_assert!(!category.normalize(&report).is_original);
        }
    }
}
