use crate::audio::{AudioSource, SpectralSample};
use crate::detect::{DetectError, DetectedFace, FaceDetector, VideoFrame};
use crate::emotion::{FacialProbabilities, Landmark, ProbabilityError};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Mutex, PoisonError};

/// One line of a recorded session log.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct RecordedFrame {
    #[serde(default)]
    pub face: Option<RecordedFace>,
    #[serde(default)]
    pub spectrum: Option<Vec<f32>>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RecordedFace {
    pub probabilities: BTreeMap<String, f64>,
    #[serde(default)]
    pub landmarks: Vec<[f64; 2]>,
}

impl RecordedFace {
    pub fn to_detected(&self) -> Result<DetectedFace, ProbabilityError> {
        Ok(DetectedFace {
            probabilities: FacialProbabilities::from_map(&self.probabilities)?,
            landmarks: self
                .landmarks
                .iter()
                .map(|[x, y]| Landmark::new(*x, *y))
                .collect(),
        })
    }
}

impl RecordedFrame {
    /// Parses a JSON-lines log. Blank lines are skipped; line numbers in
    /// errors are 1-based.
    pub fn parse_log(raw: &str) -> Result<Vec<RecordedFrame>, ReplayError> {
        raw.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                serde_json::from_str(line).map_err(|e| ReplayError::Parse {
                    line: i + 1,
                    details: e.to_string(),
                })
            })
            .collect()
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ReplayError {
    #[error("line {line}: {details}")]
    Parse { line: usize, details: String },
    #[error("frame {frame}: {source}")]
    Face {
        frame: usize,
        #[source]
        source: ProbabilityError,
    },
}

/// Serves recorded faces by frame sequence number.
pub struct ReplayFaceDetector {
    faces: Vec<Option<DetectedFace>>,
}

impl ReplayFaceDetector {
    /// Validates every recorded face up front so a malformed log fails before
    /// the session starts rather than mid-stream.
    pub fn from_frames(frames: &[RecordedFrame]) -> Result<Self, ReplayError> {
        let faces = frames
            .iter()
            .enumerate()
            .map(|(frame, f)| {
                f.face
                    .as_ref()
                    .map(RecordedFace::to_detected)
                    .transpose()
                    .map_err(|source| ReplayError::Face { frame, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { faces })
    }
}

impl FaceDetector for ReplayFaceDetector {
    fn detect(
        &self,
        frame: VideoFrame,
    ) -> BoxFuture<'_, Result<Option<DetectedFace>, DetectError>> {
        async move {
            let idx = usize::try_from(frame.sequence)
                .map_err(|e| DetectError::Failed(e.to_string()))?;
            Ok(self.faces.get(idx).cloned().flatten())
        }
        .boxed()
    }
}

/// Hands out recorded spectra in order, one per snapshot.
pub struct ReplayAudioSource {
    queue: Mutex<VecDeque<Option<SpectralSample>>>,
}

impl ReplayAudioSource {
    pub fn from_frames(frames: &[RecordedFrame]) -> Self {
        let queue = frames
            .iter()
            .map(|f| f.spectrum.clone().and_then(SpectralSample::new))
            .collect();
        Self {
            queue: Mutex::new(queue),
        }
    }
}

impl AudioSource for ReplayAudioSource {
    fn snapshot(&self) -> Option<SpectralSample> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .flatten()
    }
}
