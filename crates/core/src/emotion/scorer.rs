use crate::config::{ScoringConfig, ScoringStrategy, TrendConfig};
use crate::emotion::{Emotion, EmotionalTrend, FacialProbabilities};
use serde::{Deserialize, Serialize};

/// Maps a facial probability vector onto stress and anxiety scores in 0..=100.
pub trait StressAnxietyModel: Send + Sync {
    fn stress(&self, p: &FacialProbabilities) -> f64;
    fn anxiety(&self, p: &FacialProbabilities) -> f64;
}

/// Weighted tables with a non-linear stress curve, discounted by neutrality.
#[derive(Clone, Debug)]
pub struct WeightedModel {
    config: ScoringConfig,
}

impl WeightedModel {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }
}

impl StressAnxietyModel for WeightedModel {
    fn stress(&self, p: &FacialProbabilities) -> f64 {
        let base = (self.config.stress_weights.weighted_sum(p) * 100.0).max(0.0);
        let intensity = (base / 100.0).powf(self.config.stress_exponent) * 100.0;
        let neutral_discount = (1.0 - p.neutral).max(0.0);
        bounded(intensity * neutral_discount)
    }

    fn anxiety(&self, p: &FacialProbabilities) -> f64 {
        let base = self.config.anxiety_weights.weighted_sum(p);
        let rapid_change = if p.surprised > self.config.rapid_change_threshold {
            self.config.rapid_change_multiplier
        } else {
            1.0
        };
        bounded(base * (1.0 - p.neutral) * rapid_change * 100.0)
    }
}

/// Legacy scoring: plain means of the negative categories, no weighting.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinearModel;

impl StressAnxietyModel for LinearModel {
    fn stress(&self, p: &FacialProbabilities) -> f64 {
        bounded((p.fearful + p.angry + p.sad) / 3.0 * 100.0)
    }

    fn anxiety(&self, p: &FacialProbabilities) -> f64 {
        bounded((p.fearful + p.surprised) / 2.0 * 100.0)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct FacialScores {
    pub primary_emotion: Emotion,
    pub confidence: f64,
    pub stress_level: f64,
    pub anxiety_level: f64,
    pub emotional_trend: EmotionalTrend,
}

pub struct FacialEmotionScorer {
    model: Box<dyn StressAnxietyModel>,
    confidence_threshold: f64,
    trend: TrendConfig,
}

impl FacialEmotionScorer {
    pub fn new(scoring: &ScoringConfig, trend: &TrendConfig) -> Self {
        let model: Box<dyn StressAnxietyModel> = match scoring.strategy {
            ScoringStrategy::Weighted => Box::new(WeightedModel::new(scoring.clone())),
            ScoringStrategy::Linear => Box::new(LinearModel),
        };
        Self::with_model(model, scoring.confidence_threshold, trend.clone())
    }

    pub fn with_model(
        model: Box<dyn StressAnxietyModel>,
        confidence_threshold: f64,
        trend: TrendConfig,
    ) -> Self {
        Self {
            model,
            confidence_threshold,
            trend,
        }
    }

    pub fn score(&self, probabilities: &FacialProbabilities) -> FacialScores {
        let p = probabilities.clamped();
        let stress_level = self.model.stress(&p);
        let anxiety_level = self.model.anxiety(&p);
        let (primary_emotion, confidence) = self.primary_emotion(&p);
        let emotional_trend = classify_trend(stress_level, anxiety_level, &p, &self.trend);

        FacialScores {
            primary_emotion,
            confidence,
            stress_level,
            anxiety_level,
            emotional_trend,
        }
    }

    /// Picks the strongest category and a dominance-tempered confidence.
    /// Below the threshold the label falls back to neutral but the computed
    /// confidence is still reported.
    pub fn primary_emotion(&self, p: &FacialProbabilities) -> (Emotion, f64) {
        let mut top = (Emotion::Neutral, f64::NEG_INFINITY);
        let mut second = 0.0_f64;
        for (emotion, value) in p.iter() {
            if value > top.1 {
                if top.1.is_finite() {
                    second = top.1;
                }
                top = (emotion, value);
            } else if value > second {
                second = value;
            }
        }

        let (emotion, value) = top;
        let total = p.sum();
        if value <= 0.0 || total <= 0.0 {
            return (Emotion::Neutral, 0.0);
        }

        let dominance = (value - second) / value;
        let confidence = bounded((value / total) * (1.0 + dominance) * 50.0);
        if confidence < self.confidence_threshold * 100.0 {
            (Emotion::Neutral, confidence)
        } else {
            (emotion, confidence)
        }
    }
}

/// First matching rule wins; the rules overlap, so order is significant.
pub fn classify_trend(
    stress: f64,
    anxiety: f64,
    p: &FacialProbabilities,
    t: &TrendConfig,
) -> EmotionalTrend {
    if stress > t.severe && anxiety > t.tense {
        EmotionalTrend::HighlyStressed
    } else if anxiety > t.severe && stress > t.elevated {
        EmotionalTrend::HighlyAnxious
    } else if stress > t.tense || anxiety > t.tense {
        EmotionalTrend::ModeratelyTense
    } else if p.happy > t.very_positive_happy && p.neutral < t.very_positive_neutral_ceiling {
        EmotionalTrend::VeryPositive
    } else if p.happy > t.positive_happy {
        EmotionalTrend::Positive
    } else if p.neutral > t.composed_neutral {
        EmotionalTrend::Composed
    } else if p.sad > t.melancholic_sad && p.neutral > t.melancholic_neutral {
        EmotionalTrend::Melancholic
    } else {
        EmotionalTrend::Neutral
    }
}

fn bounded(v: f64) -> f64 {
    if v.is_finite() {
        v.clamp(0.0, 100.0)
    } else {
        0.0
    }
}
