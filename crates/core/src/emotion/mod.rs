mod features;
mod scorer;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub use features::{
    FacialFeatureEstimator, FacialFeatures, GeometricFeatureExtractor, Landmark,
    LandmarkFeatureExtractor,
};
pub use scorer::{
    classify_trend, FacialEmotionScorer, FacialScores, LinearModel, StressAnxietyModel,
    WeightedModel,
};

/// The closed set of facial expression categories reported by the detector.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fearful,
    Disgusted,
    Surprised,
}

impl Emotion {
    /// Declaration order; every tie-break over categories follows it.
    pub const ALL: [Emotion; 7] = [
        Emotion::Neutral,
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fearful,
        Emotion::Disgusted,
        Emotion::Surprised,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Neutral => "neutral",
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
            Self::Fearful => "fearful",
            Self::Disgusted => "disgusted",
            Self::Surprised => "surprised",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProbabilityError {
    #[error("probability vector is missing category {0}")]
    MissingCategory(Emotion),
    #[error("probability for {emotion} is not finite: {value}")]
    NonFinite { emotion: Emotion, value: f64 },
    #[error("unknown emotion category {0:?}")]
    UnknownCategory(String),
}

/// Independent per-category model outputs, each clamped to 0..=1. They are
/// not required to sum to one.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct FacialProbabilities {
    pub neutral: f64,
    pub happy: f64,
    pub sad: f64,
    pub angry: f64,
    pub fearful: f64,
    pub disgusted: f64,
    pub surprised: f64,
}

impl FacialProbabilities {
    /// Builds a vector from exactly the seven category names. A missing,
    /// unknown or non-finite entry is an integration error.
    pub fn from_map(values: &BTreeMap<String, f64>) -> Result<Self, ProbabilityError> {
        if let Some(unknown) = values
            .keys()
            .find(|k| !Emotion::ALL.iter().any(|e| e.as_str() == k.as_str()))
        {
            return Err(ProbabilityError::UnknownCategory(unknown.clone()));
        }

        let mut out = Self::default();
        for emotion in Emotion::ALL {
            let value = *values
                .get(emotion.as_str())
                .ok_or(ProbabilityError::MissingCategory(emotion))?;
            if !value.is_finite() {
                return Err(ProbabilityError::NonFinite { emotion, value });
            }
            *out.slot_mut(emotion) = value.clamp(0.0, 1.0);
        }
        Ok(out)
    }

    /// Returns a copy with every entry clamped to 0..=1; non-finite entries become 0.
    pub fn clamped(mut self) -> Self {
        for emotion in Emotion::ALL {
            let slot = self.slot_mut(emotion);
            *slot = if slot.is_finite() {
                (*slot).clamp(0.0, 1.0)
            } else {
                0.0
            };
        }
        self
    }

    pub fn get(&self, emotion: Emotion) -> f64 {
        match emotion {
            Emotion::Neutral => self.neutral,
            Emotion::Happy => self.happy,
            Emotion::Sad => self.sad,
            Emotion::Angry => self.angry,
            Emotion::Fearful => self.fearful,
            Emotion::Disgusted => self.disgusted,
            Emotion::Surprised => self.surprised,
        }
    }

    fn slot_mut(&mut self, emotion: Emotion) -> &mut f64 {
        match emotion {
            Emotion::Neutral => &mut self.neutral,
            Emotion::Happy => &mut self.happy,
            Emotion::Sad => &mut self.sad,
            Emotion::Angry => &mut self.angry,
            Emotion::Fearful => &mut self.fearful,
            Emotion::Disgusted => &mut self.disgusted,
            Emotion::Surprised => &mut self.surprised,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Emotion, f64)> + '_ {
        Emotion::ALL.into_iter().map(move |e| (e, self.get(e)))
    }

    pub fn sum(&self) -> f64 {
        self.iter().map(|(_, p)| p).sum()
    }
}

/// Discrete per-frame classification of the stress/anxiety/valence picture.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalTrend {
    HighlyStressed,
    HighlyAnxious,
    ModeratelyTense,
    VeryPositive,
    Positive,
    Composed,
    Melancholic,
    Neutral,
}

impl EmotionalTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighlyStressed => "highly_stressed",
            Self::HighlyAnxious => "highly_anxious",
            Self::ModeratelyTense => "moderately_tense",
            Self::VeryPositive => "very_positive",
            Self::Positive => "positive",
            Self::Composed => "composed",
            Self::Melancholic => "melancholic",
            Self::Neutral => "neutral",
        }
    }

    /// Short feedback sentence shown alongside a frame.
    pub fn guidance(&self) -> &'static str {
        match self {
            Self::HighlyStressed => {
                "You appear to be experiencing significant stress. Consider taking a few deep breaths."
            }
            Self::HighlyAnxious => "Signs of anxiety detected. Try to stay calm and focused.",
            Self::ModeratelyTense => "Moderate tension detected. Maintain steady breathing.",
            Self::Positive => "You appear confident and positive!",
            Self::Composed => "You're maintaining good composure.",
            _ => "Your emotional state appears balanced.",
        }
    }
}

impl fmt::Display for EmotionalTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_map() -> BTreeMap<String, f64> {
        Emotion::ALL
            .iter()
            .map(|e| (e.as_str().to_owned(), 0.1))
            .collect()
    }

    #[test]
    fn from_map_requires_every_category() {
        let mut map = full_map();
        map.remove("disgusted");
        assert_eq!(
            FacialProbabilities::from_map(&map).unwrap_err(),
            ProbabilityError::MissingCategory(Emotion::Disgusted)
        );
    }

    #[test]
    fn from_map_rejects_unknown_names() {
        let mut map = full_map();
        map.insert("stressed".to_owned(), 0.4);
        assert!(matches!(
            FacialProbabilities::from_map(&map),
            Err(ProbabilityError::UnknownCategory(name)) if name == "stressed"
        ));
    }

    #[test]
    fn from_map_clamps_out_of_range_values() {
        let mut map = full_map();
        map.insert("happy".to_owned(), 1.7);
        map.insert("sad".to_owned(), -0.2);
        let p = FacialProbabilities::from_map(&map).expect("valid map");
        assert_eq!(p.happy, 1.0);
        assert_eq!(p.sad, 0.0);
    }

    #[test]
    fn from_map_rejects_nan() {
        let mut map = full_map();
        map.insert("fearful".to_owned(), f64::NAN);
        assert!(matches!(
            FacialProbabilities::from_map(&map),
            Err(ProbabilityError::NonFinite {
                emotion: Emotion::Fearful,
                ..
            })
        ));
    }

    #[test]
    fn trend_labels_serialize_snake_case() {
        let json = serde_json::to_string(&EmotionalTrend::HighlyStressed).expect("serialize");
        assert_eq!(json, "\"highly_stressed\"");
        assert_eq!(EmotionalTrend::Melancholic.guidance(), EmotionalTrend::Neutral.guidance());
    }
}
