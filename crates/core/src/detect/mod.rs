mod replay;
mod synthetic;

use crate::emotion::{FacialProbabilities, Landmark};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use replay::{RecordedFace, RecordedFrame, ReplayAudioSource, ReplayError, ReplayFaceDetector};
pub use synthetic::{SyntheticAudioSource, SyntheticFaceDetector};

/// One video tick. The pixel payload is opaque to the engine and only
/// interpreted by the detector.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoFrame {
    pub sequence: u64,
    pub captured_at: DateTime<Utc>,
    /// Encoded image handed to the detector as-is. Empty for replayed and
    /// synthetic sessions, whose detectors key off `sequence` instead.
    pub data: Arc<[u8]>,
}

impl VideoFrame {
    pub fn new(sequence: u64, captured_at: DateTime<Utc>) -> Self {
        Self::with_data(sequence, captured_at, Vec::<u8>::new())
    }

    pub fn with_data(
        sequence: u64,
        captured_at: DateTime<Utc>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            sequence,
            captured_at,
            data: data.into(),
        }
    }
}

/// The single face a detector reports for a frame.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DetectedFace {
    pub probabilities: FacialProbabilities,
    pub landmarks: Vec<Landmark>,
}

#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("face detector not ready")]
    NotReady,
    #[error("face detection failed: {0}")]
    Failed(String),
}

/// External face detector. `Ok(None)` means no face in this frame.
pub trait FaceDetector: Send + Sync {
    fn detect(
        &self,
        frame: VideoFrame,
    ) -> BoxFuture<'_, Result<Option<DetectedFace>, DetectError>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    /// Reports a face only when the frame carries pixels.
    struct PayloadDetector;

    impl FaceDetector for PayloadDetector {
        fn detect(
            &self,
            frame: VideoFrame,
        ) -> BoxFuture<'_, Result<Option<DetectedFace>, DetectError>> {
            async move {
                if frame.data.is_empty() {
                    return Ok(None);
                }
                Ok(Some(DetectedFace {
                    probabilities: FacialProbabilities {
                        neutral: f64::from(frame.data[0]) / 255.0,
                        ..Default::default()
                    },
                    landmarks: Vec::new(),
                }))
            }
            .boxed()
        }
    }

    #[test]
    fn detector_reads_frame_payload() {
        let now = Utc::now();
        let blank = futures::executor::block_on(PayloadDetector.detect(VideoFrame::new(0, now)))
            .expect("detect");
        assert!(blank.is_none());

        let frame = VideoFrame::with_data(1, now, vec![255_u8, 0, 0]);
        assert_eq!(frame.data.len(), 3);
        let face = futures::executor::block_on(PayloadDetector.detect(frame))
            .expect("detect")
            .expect("face");
        assert_eq!(face.probabilities.neutral, 1.0);
    }
}
