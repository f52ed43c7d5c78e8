use crate::audio::AudioSource;
use crate::detect::{FaceDetector, VideoFrame};
use crate::frame::EmotionState;
use crate::session::{Session, SessionError};
use tokio::sync::{mpsc, watch};

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Drives one [`Session`] from an external tick source.
///
/// Each received [`VideoFrame`] is one tick: the detector is awaited, then the
/// audio source is sampled and all scoring runs synchronously. A stop request
/// is honoured between ticks only; a tick that is already waiting on the
/// detector finishes and its result is kept.
pub struct Pipeline<D, A> {
    pub detector: D,
    pub audio: A,
    pub session: Session,
}

impl<D, A> Pipeline<D, A>
where
    D: FaceDetector,
    A: AudioSource,
{
    pub fn new(detector: D, audio: A, session: Session) -> Self {
        Self {
            detector,
            audio,
            session,
        }
    }

    /// Runs until the frame channel closes or `stop` flips to `true` (or its
    /// sender is dropped). Committed records are forwarded to `states` when
    /// given; a closed consumer does not stop the session. Returns the
    /// finished session so the caller can read the history and summary.
    pub async fn run(
        mut self,
        mut frames: mpsc::Receiver<VideoFrame>,
        mut stop: watch::Receiver<bool>,
        states: Option<mpsc::Sender<EmotionState>>,
    ) -> Result<Session, PipelineError> {
        self.session.start()?;
        let mut ticks: u64 = 0;

        loop {
            if *stop.borrow_and_update() {
                break;
            }
            let frame = tokio::select! {
                biased;
                changed = stop.changed() => {
                    if changed.is_err() {
                        tracing::debug!("stop handle dropped");
                        break;
                    }
                    continue;
                }
                frame = frames.recv() => match frame {
                    Some(frame) => frame,
                    None => break,
                },
            };

            let timestamp = frame.captured_at;
            let sequence = frame.sequence;
            let face = match self.detector.detect(frame).await {
                Ok(face) => face,
                Err(e) => {
                    tracing::warn!(error = %e, sequence, "face detection failed, skipping tick");
                    None
                }
            };
            if *stop.borrow() {
                self.session.request_stop();
            }

            let spectrum = self.audio.snapshot();
            ticks += 1;
            if let Some(state) =
                self.session
                    .process(face.as_ref(), spectrum.as_ref(), timestamp)?
            {
                if let Some(tx) = &states {
                    if tx.send(state).await.is_err() {
                        tracing::debug!("state consumer closed");
                    }
                }
            }
        }

        self.session.request_stop();
        self.session.finish();
        tracing::info!(
            ticks,
            frames = self.session.history().len(),
            "pipeline finished"
        );
        Ok(self.session)
    }
}
