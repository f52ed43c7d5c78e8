mod composer;

use crate::audio::AudioEmotionMetrics;
use crate::emotion::{Emotion, EmotionalTrend, FacialFeatures};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use composer::{combine, FrameStateComposer};

/// Candidate labels for the cross-modal dominant state. On a tie the one
/// declared last wins.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CombinedEmotion {
    Confident,
    Stressed,
    Nervous,
    Excited,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CombinedAnalysis {
    pub overall_stress: f64,
    pub overall_confidence: f64,
    pub dominant_emotion: CombinedEmotion,
}

/// Coarse severity band for a stress/anxiety reading.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Calm,
    Elevated,
    High,
}

impl AlertLevel {
    pub fn from_score(score: f64) -> Self {
        if score > 70.0 {
            Self::High
        } else if score > 50.0 {
            Self::Elevated
        } else {
            Self::Calm
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Calm => "calm",
            Self::Elevated => "elevated",
            Self::High => "high",
        }
    }
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One committed observation. Built once per successful tick and never
/// modified afterwards.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmotionState {
    pub primary_emotion: Emotion,
    pub confidence: f64,
    pub stress_level: f64,
    pub anxiety_level: f64,
    pub emotional_trend: EmotionalTrend,
    pub facial_features: FacialFeatures,
    pub audio_analysis: AudioEmotionMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined_analysis: Option<CombinedAnalysis>,
    pub timestamp: DateTime<Utc>,
}

impl EmotionState {
    pub fn alert_level(&self) -> AlertLevel {
        AlertLevel::from_score(self.stress_level.max(self.anxiety_level))
    }
}
