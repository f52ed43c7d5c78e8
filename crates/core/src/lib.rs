#![deny(warnings)]

pub mod audio;
pub mod config;
pub mod detect;
pub mod emotion;
pub mod frame;
pub mod pipeline;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::audio::AudioEmotionMetrics;
    use crate::emotion::{Emotion, EmotionalTrend, FacialFeatures};
    use crate::frame::EmotionState;
    use chrono::Utc;

    /// A frame with the given facial scores and audio indicators that mirror them.
    pub fn state_with(stress: f64, anxiety: f64, confidence: f64) -> EmotionState {
        EmotionState {
            primary_emotion: Emotion::Neutral,
            confidence,
            stress_level: stress,
            anxiety_level: anxiety,
            emotional_trend: EmotionalTrend::Neutral,
            facial_features: FacialFeatures::FALLBACK,
            audio_analysis: AudioEmotionMetrics {
                stress,
                confidence,
                excitement: 0.0,
                nervousness: anxiety,
                pitch: 50.0,
                volume: 50.0,
                speech_rate: 0.0,
            },
            combined_analysis: None,
            timestamp: Utc::now(),
        }
    }
}
