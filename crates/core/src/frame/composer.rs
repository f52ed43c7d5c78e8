use crate::audio::AudioEmotionMetrics;
use crate::emotion::{FacialFeatures, FacialProbabilities, FacialScores};
use crate::frame::{CombinedAnalysis, CombinedEmotion, EmotionState};
use chrono::{DateTime, Utc};

/// Merges the facial and audio results of one tick into an [`EmotionState`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameStateComposer {
    include_combined: bool,
}

impl FrameStateComposer {
    pub fn new(include_combined: bool) -> Self {
        Self { include_combined }
    }

    pub fn compose(
        &self,
        scores: &FacialScores,
        probabilities: &FacialProbabilities,
        audio: &AudioEmotionMetrics,
        features: FacialFeatures,
        timestamp: DateTime<Utc>,
    ) -> EmotionState {
        EmotionState {
            primary_emotion: scores.primary_emotion,
            confidence: scores.confidence,
            stress_level: scores.stress_level,
            anxiety_level: scores.anxiety_level,
            emotional_trend: scores.emotional_trend,
            facial_features: features,
            audio_analysis: *audio,
            combined_analysis: self
                .include_combined
                .then(|| combine(probabilities, audio)),
            timestamp,
        }
    }
}

/// Cross-modal view: facial fear/anger/happiness against the smoothed audio
/// indicators.
pub fn combine(p: &FacialProbabilities, audio: &AudioEmotionMetrics) -> CombinedAnalysis {
    let overall_stress = bounded(p.fearful * 40.0 + p.angry * 30.0 + audio.stress / 100.0 * 30.0);
    let overall_confidence =
        bounded((1.0 - p.fearful) * 40.0 + audio.confidence / 100.0 * 60.0);

    let candidates = [
        (CombinedEmotion::Confident, overall_confidence),
        (CombinedEmotion::Stressed, overall_stress),
        (
            CombinedEmotion::Nervous,
            bounded(p.fearful * 50.0 + audio.nervousness / 100.0 * 50.0),
        ),
        (
            CombinedEmotion::Excited,
            bounded(p.happy * 40.0 + audio.excitement / 100.0 * 60.0),
        ),
    ];
    // on equal scores the later candidate wins
    let mut dominant = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.1 >= dominant.1 {
            dominant = *candidate;
        }
    }

    CombinedAnalysis {
        overall_stress,
        overall_confidence,
        dominant_emotion: dominant.0,
    }
}

fn bounded(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
