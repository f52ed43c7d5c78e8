mod estimator;
mod spectral;

use serde::{Deserialize, Serialize};

pub use estimator::AudioEmotionEstimator;
pub use spectral::SpectralFeatureExtractor;

/// One snapshot of frequency magnitudes (dB-like, roughly -140..-20), index
/// order = frequency bin order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct SpectralSample {
    bins: Vec<f32>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("spectral sample has no bins")]
pub struct EmptySpectrum;

impl SpectralSample {
    /// Returns `None` for an empty snapshot: no reading this tick.
    pub fn new(bins: Vec<f32>) -> Option<Self> {
        (!bins.is_empty()).then_some(Self { bins })
    }

    pub fn bins(&self) -> &[f32] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }
}

impl TryFrom<Vec<f32>> for SpectralSample {
    type Error = EmptySpectrum;

    fn try_from(bins: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(bins).ok_or(EmptySpectrum)
    }
}

impl From<SpectralSample> for Vec<f32> {
    fn from(sample: SpectralSample) -> Self {
        sample.bins
    }
}

/// Normalized band energies (0..=1) plus the 0..=100 voice proxies.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct SpectralFeatures {
    pub low: f64,
    pub mid: f64,
    pub high: f64,
    pub pitch: f64,
    pub volume: f64,
    pub speech_rate: f64,
}

/// Audio-derived emotion indicators, each in 0..=100.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AudioEmotionMetrics {
    pub stress: f64,
    pub confidence: f64,
    pub excitement: f64,
    pub nervousness: f64,
    pub pitch: f64,
    pub volume: f64,
    pub speech_rate: f64,
}

/// Pull-based audio collaborator: hands out the current spectrum on demand.
pub trait AudioSource: Send + Sync {
    fn snapshot(&self) -> Option<SpectralSample>;
}
