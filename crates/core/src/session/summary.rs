use crate::emotion::Emotion;
use crate::frame::EmotionState;
use crate::session::aggregator::mean_and_variance;
use serde::{Deserialize, Serialize};

/// Whole-session report, recomputed from the full history on demand.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub average_stress: f64,
    pub average_anxiety: f64,
    pub average_confidence: f64,
    pub peak_stress: f64,
    /// `100 - mean(var(stress), var(anxiety))`; negative for very erratic sessions.
    pub emotional_stability: f64,
    pub dominant_emotion: Emotion,
    pub frame_count: usize,
    pub duration_secs: f64,
}

impl SessionSummary {
    pub fn empty() -> Self {
        Self {
            average_stress: 0.0,
            average_anxiety: 0.0,
            average_confidence: 0.0,
            peak_stress: 0.0,
            emotional_stability: 100.0,
            dominant_emotion: Emotion::Neutral,
            frame_count: 0,
            duration_secs: 0.0,
        }
    }

    pub fn from_history(history: &[EmotionState]) -> Self {
        let (Some(first), Some(last)) = (history.first(), history.last()) else {
            return Self::empty();
        };

        let stress: Vec<f64> = history.iter().map(|s| s.stress_level).collect();
        let anxiety: Vec<f64> = history.iter().map(|s| s.anxiety_level).collect();
        let n = history.len() as f64;

        let (average_stress, stress_variance) = mean_and_variance(&stress);
        let (average_anxiety, anxiety_variance) = mean_and_variance(&anxiety);
        let average_confidence = history.iter().map(|s| s.confidence).sum::<f64>() / n;
        let peak_stress = stress.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        let duration_ms = (last.timestamp - first.timestamp).num_milliseconds().max(0);

        Self {
            average_stress,
            average_anxiety,
            average_confidence,
            peak_stress,
            emotional_stability: 100.0 - (stress_variance + anxiety_variance) / 2.0,
            dominant_emotion: dominant_emotion(history),
            frame_count: history.len(),
            duration_secs: duration_ms as f64 / 1000.0,
        }
    }
}

impl Default for SessionSummary {
    fn default() -> Self {
        Self::empty()
    }
}

/// Most frequent primary emotion; on equal counts the one seen first wins.
fn dominant_emotion(history: &[EmotionState]) -> Emotion {
    let mut counts: Vec<(Emotion, usize)> = Vec::with_capacity(Emotion::ALL.len());
    for state in history {
        match counts.iter_mut().find(|(e, _)| *e == state.primary_emotion) {
            Some((_, n)) => *n += 1,
            None => counts.push((state.primary_emotion, 1)),
        }
    }

    let mut best: Option<(Emotion, usize)> = None;
    for (emotion, count) in counts {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((emotion, count));
        }
    }
    best.map_or(Emotion::Neutral, |(e, _)| e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::state_with;
    use chrono::Duration;

    #[test]
    fn empty_history_has_fixed_defaults() {
        let s = SessionSummary::from_history(&[]);
        assert_eq!(s, SessionSummary::empty());
        assert_eq!(s.emotional_stability, 100.0);
        assert_eq!(s.dominant_emotion, Emotion::Neutral);
    }

    #[test]
    fn averages_peak_and_stability() {
        let history = vec![
            state_with(20.0, 10.0, 50.0),
            state_with(40.0, 30.0, 70.0),
        ];
        let s = SessionSummary::from_history(&history);
        assert_eq!(s.average_stress, 30.0);
        assert_eq!(s.average_anxiety, 20.0);
        assert_eq!(s.average_confidence, 60.0);
        assert_eq!(s.peak_stress, 40.0);
        // both variances are 100
        assert_eq!(s.emotional_stability, 0.0);
        assert_eq!(s.frame_count, 2);
    }

    #[test]
    fn stability_goes_negative_for_erratic_sessions() {
        let history = vec![state_with(0.0, 0.0, 0.0), state_with(100.0, 100.0, 0.0)];
        assert_eq!(SessionSummary::from_history(&history).emotional_stability, -2400.0);
    }

    #[test]
    fn dominant_tie_goes_to_first_seen() {
        let mut history = Vec::new();
        for emotion in [Emotion::Sad, Emotion::Happy, Emotion::Happy, Emotion::Sad] {
            let mut s = state_with(0.0, 0.0, 0.0);
            s.primary_emotion = emotion;
            history.push(s);
        }
        assert_eq!(dominant_emotion(&history), Emotion::Sad);

        history[3].primary_emotion = Emotion::Happy;
        assert_eq!(dominant_emotion(&history), Emotion::Happy);
    }

    #[test]
    fn duration_spans_first_to_last_frame() {
        let mut a = state_with(0.0, 0.0, 0.0);
        let mut b = a.clone();
        b.timestamp = a.timestamp + Duration::milliseconds(2500);
        a.primary_emotion = Emotion::Angry;
        let s = SessionSummary::from_history(&[a, b]);
        assert_eq!(s.duration_secs, 2.5);
    }
}
