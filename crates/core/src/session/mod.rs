mod aggregator;
mod summary;
mod trend;

use crate::audio::{AudioEmotionEstimator, SpectralSample};
use crate::config::{ConfigError, EngineConfig};
use crate::detect::DetectedFace;
use crate::emotion::{FacialEmotionScorer, FacialFeatureEstimator, LandmarkFeatureExtractor};
use crate::frame::{EmotionState, FrameStateComposer};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use aggregator::{AggregatedEmotion, EmotionAggregates, SessionAggregator};
pub use summary::SessionSummary;
pub use trend::{TrendAnalyzer, TrendDirection, TrendReport};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Running,
    /// Stop requested; the tick already in flight may still commit.
    Stopping,
    Stopped,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot start a session that is {0:?}")]
    AlreadyActive(SessionState),
    #[error("session is {0:?} and not accepting frames")]
    NotAccepting(SessionState),
}

/// One analysis session: owns the smoothing state, the append-only history
/// and the running aggregates. Exclusive `&mut` access keeps ticks
/// non-reentrant.
pub struct Session {
    config: EngineConfig,
    scorer: FacialEmotionScorer,
    features: FacialFeatureEstimator,
    audio: AudioEmotionEstimator,
    composer: FrameStateComposer,
    aggregator: SessionAggregator,
    trend: TrendAnalyzer,
    history: Vec<EmotionState>,
    state: SessionState,
    started_at: Option<DateTime<Utc>>,
}

impl Session {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            scorer: FacialEmotionScorer::new(&config.scoring, &config.trend),
            features: FacialFeatureEstimator::default(),
            audio: AudioEmotionEstimator::new(&config.audio),
            composer: FrameStateComposer::new(config.combined_analysis),
            aggregator: SessionAggregator::new(&config.aggregation),
            trend: TrendAnalyzer::new(&config.analysis),
            history: Vec::new(),
            state: SessionState::Idle,
            started_at: None,
            config,
        })
    }

    pub fn with_feature_extractor(mut self, extractor: Box<dyn LandmarkFeatureExtractor>) -> Self {
        self.features = FacialFeatureEstimator::new(extractor);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Clears history, smoothing state and aggregates, then starts accepting
    /// frames. Valid from `Idle` or `Stopped`.
    pub fn start(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle | SessionState::Stopped => {}
            other => return Err(SessionError::AlreadyActive(other)),
        }
        self.history.clear();
        self.audio.reset();
        self.aggregator.reset();
        self.started_at = Some(Utc::now());
        self.state = SessionState::Running;
        info!("session started");
        Ok(())
    }

    pub fn request_stop(&mut self) {
        if self.state == SessionState::Running {
            self.state = SessionState::Stopping;
            debug!("session stop requested");
        }
    }

    /// Freezes the session; later commits are rejected.
    pub fn finish(&mut self) {
        if matches!(self.state, SessionState::Running | SessionState::Stopping) {
            self.state = SessionState::Stopped;
            self.audio.reset();
            info!(frames = self.history.len(), "session stopped");
        }
    }

    pub fn is_accepting(&self) -> bool {
        matches!(self.state, SessionState::Running | SessionState::Stopping)
    }

    /// Runs one tick of numeric work. Audio is analysed every tick so the
    /// smoothing keeps pace with the capture even when no face is present.
    /// Returns `Ok(None)` when either modality is missing.
    pub fn process(
        &mut self,
        face: Option<&DetectedFace>,
        spectrum: Option<&SpectralSample>,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<EmotionState>, SessionError> {
        if !self.is_accepting() {
            return Err(SessionError::NotAccepting(self.state));
        }

        let audio = self.audio.analyze(spectrum);
        let (Some(face), Some(audio)) = (face, audio) else {
            debug!(
                face = face.is_some(),
                audio = audio.is_some(),
                "incomplete tick skipped"
            );
            return Ok(None);
        };

        let scores = self.scorer.score(&face.probabilities);
        let features = self.features.estimate(&face.landmarks);
        let state = self.composer.compose(
            &scores,
            &face.probabilities,
            &audio,
            features,
            timestamp,
        );
        self.commit(state.clone())?;
        Ok(Some(state))
    }

    /// Appends a finished record and folds it into the aggregates.
    pub fn commit(&mut self, state: EmotionState) -> Result<(), SessionError> {
        if !self.is_accepting() {
            return Err(SessionError::NotAccepting(self.state));
        }
        debug!(
            primary = %state.primary_emotion,
            stress = state.stress_level,
            anxiety = state.anxiety_level,
            "frame committed"
        );
        self.aggregator.update(&state);
        self.history.push(state);
        Ok(())
    }

    pub fn history(&self) -> &[EmotionState] {
        &self.history
    }

    pub fn aggregates(&self) -> &EmotionAggregates {
        self.aggregator.aggregates()
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary::from_history(&self.history)
    }

    pub fn trend(&self) -> TrendReport {
        self.trend.analyze(&self.history, self.aggregator.aggregates())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::FacialProbabilities;
    use crate::test_support::state_with;

    fn face() -> DetectedFace {
        DetectedFace {
            probabilities: FacialProbabilities {
                happy: 0.9,
                neutral: 0.05,
                ..Default::default()
            },
            landmarks: Vec::new(),
        }
    }

    fn spectrum() -> SpectralSample {
        SpectralSample::new(vec![-100.0; 64]).expect("non-empty")
    }

    fn running() -> Session {
        let mut s = Session::new(EngineConfig::default()).expect("valid config");
        s.start().expect("start");
        s
    }

    #[test]
    fn commits_when_both_modalities_present() {
        let mut s = running();
        let state = s
            .process(Some(&face()), Some(&spectrum()), Utc::now())
            .expect("accepting")
            .expect("complete tick");
        assert_eq!(state.primary_emotion, crate::emotion::Emotion::Happy);
        assert_eq!(s.history().len(), 1);
        assert_eq!(s.aggregates().stress.peaks.len(), 1);
    }

    #[test]
    fn skips_ticks_missing_a_modality() {
        let mut s = running();
        assert!(s.process(None, Some(&spectrum()), Utc::now()).expect("ok").is_none());
        assert!(s.process(Some(&face()), None, Utc::now()).expect("ok").is_none());
        assert!(s.history().is_empty());
    }

    #[test]
    fn in_flight_tick_commits_while_stopping() {
        let mut s = running();
        s.request_stop();
        assert_eq!(s.state(), SessionState::Stopping);
        assert!(s
            .process(Some(&face()), Some(&spectrum()), Utc::now())
            .expect("still accepting")
            .is_some());

        s.finish();
        assert_eq!(
            s.commit(state_with(1.0, 1.0, 1.0)),
            Err(SessionError::NotAccepting(SessionState::Stopped))
        );
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn restart_clears_previous_session() {
        let mut s = running();
        s.commit(state_with(90.0, 90.0, 10.0)).expect("commit");
        s.finish();
        s.start().expect("restart");
        assert!(s.history().is_empty());
        assert!(s.aggregates().stress.peaks.is_empty());
        assert_eq!(s.summary(), SessionSummary::empty());
    }

    #[test]
    fn idle_session_rejects_frames_and_double_start() {
        let mut s = Session::new(EngineConfig::default()).expect("valid config");
        assert_eq!(
            s.process(None, None, Utc::now()),
            Err(SessionError::NotAccepting(SessionState::Idle))
        );
        s.start().expect("start");
        assert_eq!(
            s.start(),
            Err(SessionError::AlreadyActive(SessionState::Running))
        );
    }

    #[test]
    fn audio_smoothing_does_not_leak_across_sessions() {
        let mut s = running();
        s.process(
            Some(&face()),
            SpectralSample::new(vec![-80.0; 64]).as_ref(),
            Utc::now(),
        )
        .expect("ok");
        s.finish();
        s.start().expect("restart");
        let state = s
            .process(
                Some(&face()),
                SpectralSample::new(vec![-140.0; 64]).as_ref(),
                Utc::now(),
            )
            .expect("ok")
            .expect("complete");
        assert_eq!(state.audio_analysis.stress, 0.0);
    }
}
