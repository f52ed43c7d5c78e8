use crate::audio::{AudioEmotionMetrics, SpectralFeatureExtractor, SpectralSample};
use crate::config::AudioConfig;

/// Turns spectral snapshots into [`AudioEmotionMetrics`], exponentially
/// smoothing the four emotion indicators against the previous reading.
///
/// Pitch, volume and speech rate are passed through unsmoothed.
#[derive(Clone, Debug)]
pub struct AudioEmotionEstimator {
    extractor: SpectralFeatureExtractor,
    alpha: f64,
    previous: Option<AudioEmotionMetrics>,
}

impl AudioEmotionEstimator {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            extractor: SpectralFeatureExtractor::new(config),
            alpha: config.smoothing_alpha,
            previous: None,
        }
    }

    /// `None` in means no reading this tick; the smoothing state is left untouched.
    pub fn analyze(&mut self, sample: Option<&SpectralSample>) -> Option<AudioEmotionMetrics> {
        let sample = sample.filter(|s| !s.is_empty())?;
        let f = self.extractor.extract(sample);

        let raw = AudioEmotionMetrics {
            stress: percent(f.high * 0.6 + f.mid * 0.4),
            confidence: percent(1.0 - (f.low * 0.3 + f.mid * 0.7)),
            excitement: percent(f.high * 0.7 + f.mid * 0.3),
            nervousness: percent(f.mid * 0.6 + f.high * 0.4),
            pitch: f.pitch,
            volume: f.volume,
            speech_rate: f.speech_rate,
        };

        let smoothed = match self.previous {
            None => raw,
            Some(prev) => AudioEmotionMetrics {
                stress: self.blend(raw.stress, prev.stress),
                confidence: self.blend(raw.confidence, prev.confidence),
                excitement: self.blend(raw.excitement, prev.excitement),
                nervousness: self.blend(raw.nervousness, prev.nervousness),
                ..raw
            },
        };
        self.previous = Some(smoothed);
        Some(smoothed)
    }

    /// Drops the smoothing history so the next reading passes through raw.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn previous(&self) -> Option<&AudioEmotionMetrics> {
        self.previous.as_ref()
    }

    fn blend(&self, new: f64, previous: f64) -> f64 {
        (new * self.alpha + previous * (1.0 - self.alpha)).clamp(0.0, 100.0)
    }
}

fn percent(unit: f64) -> f64 {
    (unit * 100.0).clamp(0.0, 100.0)
}
