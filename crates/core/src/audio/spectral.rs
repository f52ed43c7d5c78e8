use crate::audio::{SpectralFeatures, SpectralSample};
use crate::config::AudioConfig;

/// Splits a spectrum into fixed low/mid/high bands and derives loudness and
/// voicing proxies.
#[derive(Clone, Debug)]
pub struct SpectralFeatureExtractor {
    low_bins: usize,
    mid_bins: usize,
    high_bins: usize,
    floor_db: f64,
    span_db: f64,
}

impl SpectralFeatureExtractor {
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            low_bins: config.low_bins,
            mid_bins: config.mid_bins,
            high_bins: config.high_bins,
            floor_db: config.floor_db,
            span_db: config.span_db,
        }
    }

    pub fn extract(&self, sample: &SpectralSample) -> SpectralFeatures {
        // Silent bins come back as -inf from most analysers.
        let bins: Vec<f64> = sample
            .bins()
            .iter()
            .map(|&b| {
                let b = f64::from(b);
                if b.is_finite() {
                    b
                } else {
                    self.floor_db
                }
            })
            .collect();

        let mid_start = self.low_bins;
        let high_start = mid_start + self.mid_bins;
        let low = self.band_energy(&bins, 0, self.low_bins);
        let mid = self.band_energy(&bins, mid_start, self.mid_bins);
        let high = self.band_energy(&bins, high_start, self.high_bins);

        SpectralFeatures {
            low,
            mid,
            high,
            pitch: self.pitch(&bins),
            volume: self.volume(&bins),
            speech_rate: speech_rate(&bins),
        }
    }

    /// Mean over the bins present in `[start, start + len)`; a band past the
    /// end of the sample reads as 0.
    fn band_energy(&self, bins: &[f64], start: usize, len: usize) -> f64 {
        let end = (start + len).min(bins.len());
        let band = bins.get(start..end).unwrap_or_default();
        if band.is_empty() {
            return 0.0;
        }
        let mean = band.iter().sum::<f64>() / band.len() as f64;
        ((mean - self.floor_db) / self.span_db).clamp(0.0, 1.0)
    }

    fn pitch(&self, bins: &[f64]) -> f64 {
        if bins.is_empty() {
            return 0.0;
        }
        let mean_abs = bins.iter().map(|b| b.abs()).sum::<f64>() / bins.len() as f64;
        let full_range = 2.0 * self.floor_db.abs();
        ((mean_abs + self.floor_db.abs()) / full_range * 100.0).clamp(0.0, 100.0)
    }

    fn volume(&self, bins: &[f64]) -> f64 {
        if bins.is_empty() {
            return 0.0;
        }
        let offset = self.floor_db.abs();
        let mean_sq = bins.iter().map(|b| (b + offset).powi(2)).sum::<f64>() / bins.len() as f64;
        (mean_sq.sqrt() / offset * 100.0).clamp(0.0, 100.0)
    }
}

/// Sign changes between neighbouring bins, scaled so that one crossing per
/// two bins saturates at 100.
fn speech_rate(bins: &[f64]) -> f64 {
    if bins.is_empty() {
        return 0.0;
    }
    let crossings = bins
        .windows(2)
        .filter(|w| (w[1] >= 0.0) != (w[0] >= 0.0))
        .count();
    (crossings as f64 / bins.len() as f64 * 200.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> SpectralFeatureExtractor {
        SpectralFeatureExtractor::new(&AudioConfig::default())
    }

    fn sample(bins: Vec<f32>) -> SpectralSample {
        SpectralSample::new(bins).expect("non-empty")
    }

    #[test]
    fn bands_normalize_against_floor_and_span() {
        let mut bins = vec![-140.0_f32; 10];
        bins.extend(vec![-110.0_f32; 20]);
        bins.extend(vec![-60.0_f32; 20]);
        let f = extractor().extract(&sample(bins));
        assert_eq!(f.low, 0.0);
        assert!((f.mid - 0.5).abs() < 1e-9);
        assert_eq!(f.high, 1.0);
    }

    #[test]
    fn short_sample_reads_missing_bands_as_silent() {
        let f = extractor().extract(&sample(vec![-80.0; 12]));
        assert_eq!(f.low, 1.0);
        assert!((f.mid - 1.0).abs() < 1e-9);
        assert_eq!(f.high, 0.0);
    }

    #[test]
    fn negative_infinity_is_treated_as_floor() {
        let f = extractor().extract(&sample(vec![f32::NEG_INFINITY; 64]));
        assert_eq!(f.low, 0.0);
        assert_eq!(f.volume, 0.0);
        assert!(f.pitch.is_finite() && f.pitch <= 100.0);
    }

    #[test]
    fn volume_and_pitch_proxies() {
        let f = extractor().extract(&sample(vec![-70.0; 50]));
        // rms(70) / 140
        assert!((f.volume - 50.0).abs() < 1e-9);
        // (70 + 140) / 280
        assert!((f.pitch - 75.0).abs() < 1e-9);
    }

    #[test]
    fn empty_bins_yield_zeroed_features() {
        let empty = SpectralSample { bins: Vec::new() };
        let f = extractor().extract(&empty);
        for v in [f.low, f.mid, f.high, f.pitch, f.volume, f.speech_rate] {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn speech_rate_counts_sign_changes() {
        let alternating: Vec<f32> = (0..10).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let f = extractor().extract(&sample(alternating));
        assert_eq!(f.speech_rate, 100.0);

        let f = extractor().extract(&sample(vec![-1.0, -1.0, 1.0, 1.0]));
        assert!((f.speech_rate - 50.0).abs() < 1e-9);
    }
}
