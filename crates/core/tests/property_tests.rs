//! Property-based tests for the scoring and aggregation invariants.
//!
//! Every score stays within 0..=100 for arbitrary inputs, the peak set
//! stays ordered and bounded, and audio smoothing settles on a steady signal.

use chrono::Utc;
use emotrack_core::audio::{AudioEmotionEstimator, AudioEmotionMetrics, SpectralSample};
use emotrack_core::config::{
    AggregationConfig, AudioConfig, BlendWeights, ScoringConfig, ScoringStrategy, TrendConfig,
};
use emotrack_core::emotion::{
    Emotion, EmotionalTrend, FacialEmotionScorer, FacialFeatureEstimator, FacialFeatures,
    FacialProbabilities, Landmark,
};
use emotrack_core::frame::EmotionState;
use emotrack_core::session::SessionAggregator;
use proptest::prelude::*;

fn probabilities() -> impl Strategy<Value = FacialProbabilities> {
    prop::array::uniform7(0.0f64..=1.0).prop_map(|v| FacialProbabilities {
        neutral: v[0],
        happy: v[1],
        sad: v[2],
        angry: v[3],
        fearful: v[4],
        disgusted: v[5],
        surprised: v[6],
    })
}

fn in_range(v: f64) -> bool {
    v.is_finite() && (0.0..=100.0).contains(&v)
}

fn state(stress: f64, anxiety: f64) -> EmotionState {
    EmotionState {
        primary_emotion: Emotion::Neutral,
        confidence: 50.0,
        stress_level: stress,
        anxiety_level: anxiety,
        emotional_trend: EmotionalTrend::Neutral,
        facial_features: FacialFeatures::FALLBACK,
        audio_analysis: AudioEmotionMetrics {
            stress: 0.0,
            confidence: 50.0,
            excitement: 0.0,
            nervousness: 0.0,
            pitch: 50.0,
            volume: 50.0,
            speech_rate: 0.0,
        },
        combined_analysis: None,
        timestamp: Utc::now(),
    }
}

// ============================================================================
// Facial scoring
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    #[test]
    fn weighted_scores_are_bounded(p in probabilities()) {
        let scorer = FacialEmotionScorer::new(&ScoringConfig::default(), &TrendConfig::default());
        let s = scorer.score(&p);
        prop_assert!(in_range(s.stress_level), "stress {}", s.stress_level);
        prop_assert!(in_range(s.anxiety_level), "anxiety {}", s.anxiety_level);
        prop_assert!(in_range(s.confidence), "confidence {}", s.confidence);
    }

    #[test]
    fn linear_scores_are_bounded(p in probabilities()) {
        let cfg = ScoringConfig {
            strategy: ScoringStrategy::Linear,
            ..Default::default()
        };
        let s = FacialEmotionScorer::new(&cfg, &TrendConfig::default()).score(&p);
        prop_assert!(in_range(s.stress_level));
        prop_assert!(in_range(s.anxiety_level));
    }

    /// A neutral label with non-zero confidence only happens below the threshold.
    #[test]
    fn labelled_emotion_clears_threshold(p in probabilities()) {
        let scorer = FacialEmotionScorer::new(&ScoringConfig::default(), &TrendConfig::default());
        let (emotion, confidence) = scorer.primary_emotion(&p);
        if emotion != Emotion::Neutral {
            prop_assert!(confidence >= 65.0);
        }
    }

    #[test]
    fn features_stay_in_unit_range(
        points in prop::collection::vec((-500.0f64..500.0, -500.0f64..500.0), 468..480),
    ) {
        let mesh: Vec<Landmark> = points.into_iter().map(|(x, y)| Landmark::new(x, y)).collect();
        let f = FacialFeatureEstimator::default().estimate(&mesh);
        for v in [f.eye_openness, f.brow_tension, f.mouth_tension] {
            prop_assert!((0.0..=1.0).contains(&v), "feature {}", v);
        }
    }
}

// ============================================================================
// Audio
// ============================================================================

fn spectrum() -> impl Strategy<Value = Vec<f32>> {
    prop::collection::vec(
        prop_oneof![
            8 => -200.0f32..50.0,
            1 => Just(f32::NEG_INFINITY),
            1 => Just(f32::NAN),
        ],
        1..256,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn audio_metrics_are_bounded(frames in prop::collection::vec(spectrum(), 1..8)) {
        let mut est = AudioEmotionEstimator::new(&AudioConfig::default());
        for bins in frames {
            let sample = SpectralSample::new(bins);
            let m = est.analyze(sample.as_ref()).expect("non-empty sample");
            let all = [
                m.stress, m.confidence, m.excitement, m.nervousness, m.pitch, m.volume, m.speech_rate,
            ];
            for v in all {
                prop_assert!(in_range(v), "metric {}", v);
            }
        }
    }

    /// After enough identical frames the smoothed value is within 0.1 of the raw one.
    #[test]
    fn smoothing_settles_on_steady_signal(start in spectrum(), level in -140.0f32..-20.0) {
        let steady = SpectralSample::new(vec![level; 64]).expect("non-empty");
        let raw = AudioEmotionEstimator::new(&AudioConfig::default())
            .analyze(Some(&steady))
            .expect("reading");

        let mut est = AudioEmotionEstimator::new(&AudioConfig::default());
        est.analyze(SpectralSample::new(start).as_ref());
        let mut last = None;
        for _ in 0..25 {
            last = est.analyze(Some(&steady));
        }
        let last = last.expect("reading");
        prop_assert!((last.stress - raw.stress).abs() < 0.1);
        prop_assert!((last.confidence - raw.confidence).abs() < 0.1);
        prop_assert!((last.nervousness - raw.nervousness).abs() < 0.1);
    }
}

// ============================================================================
// Aggregation
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn peak_set_is_ordered_and_bounded(values in prop::collection::vec(-50.0f64..150.0, 1..60)) {
        let cfg = AggregationConfig {
            stress_blend: BlendWeights::new(1.0, 0.0),
            ..Default::default()
        };
        let mut agg = SessionAggregator::new(&cfg);
        let mut seen = Vec::new();
        for v in values {
            agg.update(&state(v, 0.0));
            seen.push(v.clamp(0.0, 100.0));

            let a = &agg.aggregates().stress;
            prop_assert!(a.peaks.len() <= 3);
            prop_assert!(a.peaks.windows(2).all(|w| w[0] >= w[1]));
            prop_assert!(a.peaks.iter().all(|p| seen.contains(p)));
            prop_assert!(in_range(a.value));
            prop_assert!(a.confidence > 0.0 && a.confidence <= 100.0);

            let mut top = seen.clone();
            top.sort_by(|x, y| y.total_cmp(x));
            prop_assert_eq!(a.max_peak(), top.first().copied());
        }
    }
}
