use crate::emotion::{Emotion, FacialProbabilities};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.3;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.65;
pub const DEFAULT_PEAK_SET_SIZE: usize = 3;
pub const DEFAULT_TREND_WINDOW: usize = 5;
pub const ENV_CONFIG_PATH: &str = "EMOTRACK_CONFIG";
pub const ENV_SMOOTHING_ALPHA: &str = "EMOTRACK_SMOOTHING_ALPHA";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "EMOTRACK_CONFIDENCE_THRESHOLD";
pub const ENV_PEAK_SET_SIZE: &str = "EMOTRACK_PEAK_SET_SIZE";

/// Spectral band layout and smoothing for the audio path.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub smoothing_alpha: f64,
    pub low_bins: usize,
    pub mid_bins: usize,
    pub high_bins: usize,
    /// Magnitude (dB) mapped to 0.0 by band normalization.
    pub floor_db: f64,
    /// Width (dB) of the range mapped onto 0.0..=1.0.
    pub span_db: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            low_bins: 10,
            mid_bins: 20,
            high_bins: 20,
            floor_db: -140.0,
            span_db: 60.0,
        }
    }
}

/// Per-category weights applied to a facial probability vector.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmotionWeights {
    pub neutral: f64,
    pub happy: f64,
    pub sad: f64,
    pub angry: f64,
    pub fearful: f64,
    pub disgusted: f64,
    pub surprised: f64,
}

impl EmotionWeights {
    pub fn stress() -> Self {
        Self {
            fearful: 0.35,
            angry: 0.25,
            sad: 0.20,
            surprised: 0.10,
            disgusted: 0.10,
            ..Self::default()
        }
    }

    pub fn anxiety() -> Self {
        Self {
            fearful: 0.45,
            surprised: 0.25,
            sad: 0.15,
            disgusted: 0.15,
            ..Self::default()
        }
    }

    pub fn weight(&self, emotion: Emotion) -> f64 {
        match emotion {
            Emotion::Neutral => self.neutral,
            Emotion::Happy => self.happy,
            Emotion::Sad => self.sad,
            Emotion::Angry => self.angry,
            Emotion::Fearful => self.fearful,
            Emotion::Disgusted => self.disgusted,
            Emotion::Surprised => self.surprised,
        }
    }

    pub fn weighted_sum(&self, probabilities: &FacialProbabilities) -> f64 {
        probabilities
            .iter()
            .map(|(emotion, p)| self.weight(emotion) * p)
            .sum()
    }

    fn validate(&self, table: &'static str) -> Result<(), ConfigError> {
        for emotion in Emotion::ALL {
            let w = self.weight(emotion);
            if !w.is_finite() || w < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    table,
                    emotion: emotion.as_str(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    /// Weighted, non-linear stress and anxiety scoring.
    #[default]
    Weighted,
    /// Legacy unweighted means, kept for comparison runs.
    Linear,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringConfig {
    pub strategy: ScoringStrategy,
    pub stress_weights: EmotionWeights,
    pub anxiety_weights: EmotionWeights,
    pub stress_exponent: f64,
    pub rapid_change_threshold: f64,
    pub rapid_change_multiplier: f64,
    /// Fraction in 0..=1; primary emotions below `threshold * 100` confidence are labelled neutral.
    pub confidence_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            strategy: ScoringStrategy::default(),
            stress_weights: EmotionWeights::stress(),
            anxiety_weights: EmotionWeights::anxiety(),
            stress_exponent: 1.5,
            rapid_change_threshold: 0.3,
            rapid_change_multiplier: 1.2,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

/// Thresholds for the per-frame emotional trend label. Stress and anxiety
/// thresholds are on the 0..=100 scale, probability thresholds on 0..=1.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TrendConfig {
    pub severe: f64,
    pub tense: f64,
    pub elevated: f64,
    pub very_positive_happy: f64,
    pub very_positive_neutral_ceiling: f64,
    pub positive_happy: f64,
    pub composed_neutral: f64,
    pub melancholic_sad: f64,
    pub melancholic_neutral: f64,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            severe: 75.0,
            tense: 60.0,
            elevated: 50.0,
            very_positive_happy: 0.5,
            very_positive_neutral_ceiling: 0.3,
            positive_happy: 0.3,
            composed_neutral: 0.6,
            melancholic_sad: 0.3,
            melancholic_neutral: 0.3,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Mean and variance over the peak set plus the newest value.
    #[default]
    BoundedWindow,
    /// Exact running mean and variance over every observation.
    Exact,
}

/// Facial/audio mix used to derive each aggregated metric.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlendWeights {
    pub facial: f64,
    pub audio: f64,
}

impl BlendWeights {
    pub const fn new(facial: f64, audio: f64) -> Self {
        Self { facial, audio }
    }

    pub fn blend(&self, facial: f64, audio: f64) -> f64 {
        facial * self.facial + audio * self.audio
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AggregationConfig {
    pub mode: AggregationMode,
    pub peak_set_size: usize,
    pub stress_blend: BlendWeights,
    pub anxiety_blend: BlendWeights,
    pub confidence_blend: BlendWeights,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            mode: AggregationMode::default(),
            peak_set_size: DEFAULT_PEAK_SET_SIZE,
            stress_blend: BlendWeights::new(0.7, 0.3),
            anxiety_blend: BlendWeights::new(0.6, 0.4),
            confidence_blend: BlendWeights::new(0.5, 0.5),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub trend_window: usize,
    pub stable_delta: f64,
    pub peak_stress_weight: f64,
    pub peak_anxiety_weight: f64,
    pub confidence_weight: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            trend_window: DEFAULT_TREND_WINDOW,
            stable_delta: 5.0,
            peak_stress_weight: 0.4,
            peak_anxiety_weight: 0.4,
            confidence_weight: 0.2,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub audio: AudioConfig,
    pub scoring: ScoringConfig,
    pub trend: TrendConfig,
    pub aggregation: AggregationConfig,
    pub analysis: AnalysisConfig,
    /// Attach the cross-modal combined analysis to every frame record.
    pub combined_analysis: bool,
}

impl EngineConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let cfg: Self =
            serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            details: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let alpha = self.audio.smoothing_alpha;
        if !(alpha > 0.0 && alpha <= 1.0) {
            return Err(ConfigError::SmoothingAlpha(alpha));
        }
        if self.audio.low_bins == 0 || self.audio.mid_bins == 0 || self.audio.high_bins == 0 {
            return Err(ConfigError::EmptyBand);
        }
        if !self.audio.span_db.is_finite() || self.audio.span_db <= 0.0 {
            return Err(ConfigError::BandSpan(self.audio.span_db));
        }
        if !self.audio.floor_db.is_finite() {
            return Err(ConfigError::BandSpan(self.audio.floor_db));
        }

        self.scoring.stress_weights.validate("stress")?;
        self.scoring.anxiety_weights.validate("anxiety")?;
        let threshold = self.scoring.confidence_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::ConfidenceThreshold(threshold));
        }
        for (name, value) in [
            ("stress_exponent", self.scoring.stress_exponent),
            ("rapid_change_multiplier", self.scoring.rapid_change_multiplier),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NonPositive { name, value });
            }
        }

        if self.aggregation.peak_set_size == 0 {
            return Err(ConfigError::ZeroPeakSet);
        }
        for (name, b) in [
            ("stress_blend", self.aggregation.stress_blend),
            ("anxiety_blend", self.aggregation.anxiety_blend),
            ("confidence_blend", self.aggregation.confidence_blend),
        ] {
            if !(b.facial.is_finite() && b.audio.is_finite()) || b.facial < 0.0 || b.audio < 0.0 {
                return Err(ConfigError::InvalidBlend(name));
            }
        }

        if self.analysis.trend_window < 2 {
            return Err(ConfigError::TrendWindow(self.analysis.trend_window));
        }
        Ok(())
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("smoothing alpha must be in (0, 1], got {0}")]
    SmoothingAlpha(f64),
    #[error("spectral bands must contain at least one bin")]
    EmptyBand,
    #[error("band normalization range must be finite and positive, got {0}")]
    BandSpan(f64),
    #[error("{table} weight for {emotion} must be finite and >= 0")]
    InvalidWeight {
        table: &'static str,
        emotion: &'static str,
    },
    #[error("confidence threshold must be in [0, 1], got {0}")]
    ConfidenceThreshold(f64),
    #[error("{name} must be finite and > 0, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error("peak set size must be > 0")]
    ZeroPeakSet,
    #[error("{0} weights must be finite and >= 0")]
    InvalidBlend(&'static str),
    #[error("trend window must cover at least 2 frames, got {0}")]
    TrendWindow(usize),
    #[error("invalid value for {key}: {value}")]
    InvalidOverride { key: String, value: String },
    #[error("failed to read config {path:?}: {details}")]
    Read { path: PathBuf, details: String },
    #[error("invalid config: {0}")]
    Parse(String),
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

/// Values supplied on the command line; each wins over its environment variable.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub smoothing_alpha: Option<f64>,
    pub confidence_threshold: Option<f64>,
    pub peak_set_size: Option<usize>,
}

/// Builds the engine configuration: CLI value, then environment, then config
/// file, then built-in defaults.
pub fn resolve_engine_config(
    overrides: ConfigOverrides,
    env: &impl Env,
) -> Result<EngineConfig, ConfigError> {
    let path = overrides
        .config_path
        .or_else(|| env.var(ENV_CONFIG_PATH).map(PathBuf::from));
    let mut cfg = match path {
        Some(p) => EngineConfig::load(&p)?,
        None => EngineConfig::default(),
    };

    if let Some(v) = resolve_parsed(overrides.smoothing_alpha, ENV_SMOOTHING_ALPHA, env)? {
        cfg.audio.smoothing_alpha = v;
    }
    if let Some(v) = resolve_parsed(overrides.confidence_threshold, ENV_CONFIDENCE_THRESHOLD, env)?
    {
        cfg.scoring.confidence_threshold = v;
    }
    if let Some(v) = resolve_parsed(overrides.peak_set_size, ENV_PEAK_SET_SIZE, env)? {
        cfg.aggregation.peak_set_size = v;
    }

    cfg.validate()?;
    Ok(cfg)
}

pub fn resolve_parsed<T: std::str::FromStr>(
    cli_value: Option<T>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<T>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(v)),
        None => match env.var(env_key) {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::InvalidOverride {
                    key: env_key.to_owned(),
                    value: raw,
                }),
            None => Ok(None),
        },
    }
}
