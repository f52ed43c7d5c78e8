use crate::config::AnalysisConfig;
use crate::frame::{AlertLevel, EmotionState};
use crate::session::aggregator::EmotionAggregates;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrendReport {
    pub direction: TrendDirection,
    pub intensity: f64,
    pub level: AlertLevel,
    pub description: String,
}

/// Short-window direction and aggregate intensity.
#[derive(Clone, Debug)]
pub struct TrendAnalyzer {
    config: AnalysisConfig,
}

impl TrendAnalyzer {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn analyze(
        &self,
        history: &[EmotionState],
        aggregates: &EmotionAggregates,
    ) -> TrendReport {
        let direction = self.direction(history);
        let intensity = self.intensity(aggregates);
        let level = AlertLevel::from_score(intensity);
        TrendReport {
            direction,
            intensity,
            level,
            description: describe(level, direction),
        }
    }

    /// Compares only the two newest frames of the recent window.
    pub fn direction(&self, history: &[EmotionState]) -> TrendDirection {
        let start = history.len().saturating_sub(self.config.trend_window);
        let [.., previous, recent] = &history[start..] else {
            return TrendDirection::Stable;
        };

        let stress = recent.stress_level - previous.stress_level;
        let anxiety = recent.anxiety_level - previous.anxiety_level;
        if stress.abs() < self.config.stable_delta && anxiety.abs() < self.config.stable_delta {
            TrendDirection::Stable
        } else if (stress + anxiety) / 2.0 > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Decreasing
        }
    }

    /// Bounded by the same peak-set approximation as the aggregates; empty
    /// peak sets count as zero.
    pub fn intensity(&self, aggregates: &EmotionAggregates) -> f64 {
        let stress = aggregates.stress.max_peak().unwrap_or(0.0);
        let anxiety = aggregates.anxiety.max_peak().unwrap_or(0.0);
        let confidence = aggregates.confidence.value;
        let raw = stress * self.config.peak_stress_weight
            + anxiety * self.config.peak_anxiety_weight
            + (100.0 - confidence) * self.config.confidence_weight;
        raw.clamp(0.0, 100.0)
    }
}

fn describe(level: AlertLevel, direction: TrendDirection) -> String {
    let level = match level {
        AlertLevel::Calm => "Emotional intensity is low",
        AlertLevel::Elevated => "Emotional intensity is elevated",
        AlertLevel::High => "Emotional intensity is high",
    };
    let direction = match direction {
        TrendDirection::Increasing => "rising",
        TrendDirection::Decreasing => "easing",
        TrendDirection::Stable => "holding steady",
    };
    format!("{level} and {direction}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::aggregator::AggregatedEmotion;
    use crate::test_support::state_with;

    fn analyzer() -> TrendAnalyzer {
        TrendAnalyzer::new(&AnalysisConfig::default())
    }

    #[test]
    fn short_history_is_stable() {
        assert_eq!(analyzer().direction(&[]), TrendDirection::Stable);
        assert_eq!(
            analyzer().direction(&[state_with(90.0, 90.0, 0.0)]),
            TrendDirection::Stable
        );
    }

    #[test]
    fn small_changes_are_stable() {
        let h = [state_with(20.0, 20.0, 0.0), state_with(24.0, 16.0, 0.0)];
        assert_eq!(analyzer().direction(&h), TrendDirection::Stable);
    }

    #[test]
    fn direction_follows_mean_delta_of_last_two() {
        let up = [
            state_with(80.0, 80.0, 0.0),
            state_with(20.0, 20.0, 0.0),
            state_with(30.0, 18.0, 0.0),
        ];
        assert_eq!(analyzer().direction(&up), TrendDirection::Increasing);

        let down = [state_with(30.0, 30.0, 0.0), state_with(20.0, 32.0, 0.0)];
        assert_eq!(analyzer().direction(&down), TrendDirection::Decreasing);
    }

    #[test]
    fn intensity_weights_peaks_and_confidence() {
        let aggregates = EmotionAggregates {
            stress: AggregatedEmotion {
                peaks: vec![80.0, 40.0],
                ..Default::default()
            },
            anxiety: AggregatedEmotion {
                peaks: vec![50.0],
                ..Default::default()
            },
            confidence: AggregatedEmotion {
                value: 60.0,
                ..Default::default()
            },
        };
        let report = analyzer().analyze(&[], &aggregates);
        // 32 + 20 + 8
        assert!((report.intensity - 60.0).abs() < 1e-9);
        assert_eq!(report.level, AlertLevel::Elevated);
        assert_eq!(
            report.description,
            "Emotional intensity is elevated and holding steady."
        );
    }

    #[test]
    fn empty_aggregates_read_as_low_confidence_only() {
        let report = analyzer().analyze(&[], &EmotionAggregates::default());
        assert!((report.intensity - 20.0).abs() < 1e-9);
        assert_eq!(report.level, AlertLevel::Calm);
    }
}
