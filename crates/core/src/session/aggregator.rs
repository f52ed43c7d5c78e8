use crate::config::{AggregationConfig, AggregationMode};
use crate::frame::EmotionState;
use serde::{Deserialize, Serialize};

/// Running statistics for one tracked metric.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AggregatedEmotion {
    pub value: f64,
    /// 100 for a perfectly consistent sample, falling as variance grows.
    pub confidence: f64,
    /// Largest observed values, descending, never longer than the peak-set size.
    pub peaks: Vec<f64>,
    pub variance: f64,
}

impl AggregatedEmotion {
    pub fn max_peak(&self) -> Option<f64> {
        self.peaks.first().copied()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct EmotionAggregates {
    pub stress: AggregatedEmotion,
    pub anxiety: AggregatedEmotion,
    pub confidence: AggregatedEmotion,
}

/// Welford accumulator backing [`AggregationMode::Exact`].
#[derive(Clone, Copy, Debug, Default)]
struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    fn push(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (x - self.mean);
    }

    fn variance(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.m2 / self.count as f64).max(0.0)
        }
    }
}

/// Incrementally folds each committed frame into per-metric aggregates.
///
/// In [`AggregationMode::BoundedWindow`] the mean and variance are taken over
/// the current peak set plus the new value only, so each update is O(peak set)
/// and the "average" is biased towards the largest observations. Use
/// [`AggregationMode::Exact`] for a true running mean over the whole stream;
/// the peak set is tracked the same way in both modes.
#[derive(Clone, Debug)]
pub struct SessionAggregator {
    config: AggregationConfig,
    aggregates: EmotionAggregates,
    stats: [RunningStats; 3],
}

impl SessionAggregator {
    pub fn new(config: &AggregationConfig) -> Self {
        Self {
            config: config.clone(),
            aggregates: EmotionAggregates::default(),
            stats: [RunningStats::default(); 3],
        }
    }

    pub fn update(&mut self, state: &EmotionState) {
        let audio = &state.audio_analysis;
        let stress = self.config.stress_blend.blend(state.stress_level, audio.stress);
        let anxiety = self
            .config
            .anxiety_blend
            .blend(state.anxiety_level, audio.nervousness);
        let confidence = self
            .config
            .confidence_blend
            .blend(state.confidence, audio.confidence);

        let mode = self.config.mode;
        let k = self.config.peak_set_size;
        let [s, a, c] = &mut self.stats;
        update_metric(&mut self.aggregates.stress, s, stress, mode, k);
        update_metric(&mut self.aggregates.anxiety, a, anxiety, mode, k);
        update_metric(&mut self.aggregates.confidence, c, confidence, mode, k);
    }

    pub fn aggregates(&self) -> &EmotionAggregates {
        &self.aggregates
    }

    pub fn reset(&mut self) {
        self.aggregates = EmotionAggregates::default();
        self.stats = [RunningStats::default(); 3];
    }
}

fn update_metric(
    agg: &mut AggregatedEmotion,
    stats: &mut RunningStats,
    value: f64,
    mode: AggregationMode,
    peak_set_size: usize,
) {
    let value = if value.is_finite() {
        value.clamp(0.0, 100.0)
    } else {
        0.0
    };

    let mut working = Vec::with_capacity(agg.peaks.len() + 1);
    working.extend_from_slice(&agg.peaks);
    working.push(value);

    let (mean, variance) = match mode {
        AggregationMode::BoundedWindow => mean_and_variance(&working),
        AggregationMode::Exact => {
            stats.push(value);
            (stats.mean, stats.variance())
        }
    };

    working.sort_by(|a, b| b.total_cmp(a));
    working.truncate(peak_set_size);

    agg.value = mean;
    agg.variance = variance;
    agg.confidence = 100.0 / (1.0 + variance / 100.0);
    agg.peaks = working;
}

/// Population mean and variance; `(0, 0)` for an empty slice.
pub(crate) fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance)
}
