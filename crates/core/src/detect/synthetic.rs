use crate::audio::{AudioSource, SpectralSample};
use crate::detect::{DetectError, DetectedFace, FaceDetector, VideoFrame};
use crate::emotion::FacialProbabilities;
use futures::future::BoxFuture;
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};

/// Seeded stand-in detector for demos and soak runs. Emits plausible,
/// low-intensity expression vectors without landmarks.
pub struct SyntheticFaceDetector {
    rng: Mutex<StdRng>,
    presence: f64,
}

impl SyntheticFaceDetector {
    /// `presence` is the probability that a frame contains a face.
    pub fn new(seed: u64, presence: f64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            presence: presence.clamp(0.0, 1.0),
        }
    }
}

impl FaceDetector for SyntheticFaceDetector {
    fn detect(
        &self,
        _frame: VideoFrame,
    ) -> BoxFuture<'_, Result<Option<DetectedFace>, DetectError>> {
        let face = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            if rng.random::<f64>() < self.presence {
                Some(DetectedFace {
                    probabilities: FacialProbabilities {
                        neutral: rng.random::<f64>() * 0.3,
                        happy: rng.random::<f64>() * 0.2,
                        sad: rng.random::<f64>() * 0.1,
                        angry: rng.random::<f64>() * 0.1,
                        fearful: rng.random::<f64>() * 0.2,
                        disgusted: rng.random::<f64>() * 0.05,
                        surprised: rng.random::<f64>() * 0.05,
                    },
                    landmarks: Vec::new(),
                })
            } else {
                None
            }
        };
        async move { Ok(face) }.boxed()
    }
}

/// Seeded spectrum generator shaped like a quiet voice.
pub struct SyntheticAudioSource {
    rng: Mutex<StdRng>,
    bins: usize,
}

impl SyntheticAudioSource {
    pub fn new(seed: u64, bins: usize) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            bins,
        }
    }
}

impl AudioSource for SyntheticAudioSource {
    fn snapshot(&self) -> Option<SpectralSample> {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let bins = (0..self.bins)
            .map(|i| {
                // energy rolls off towards the high bins
                let tilt = i as f32 * 0.5;
                rng.random_range(-100.0_f32..-50.0) - tilt
            })
            .collect();
        SpectralSample::new(bins)
    }
}
