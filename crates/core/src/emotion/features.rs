use serde::{Deserialize, Serialize};

/// A 2D landmark point in image coordinates.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
}

impl Landmark {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn distance(&self, other: &Landmark) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Descriptive facial geometry, each value in 0..=1.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FacialFeatures {
    pub eye_openness: f64,
    pub brow_tension: f64,
    pub mouth_tension: f64,
}

impl FacialFeatures {
    pub const FALLBACK: FacialFeatures = FacialFeatures {
        eye_openness: 0.5,
        brow_tension: 0.5,
        mouth_tension: 0.5,
    };
}

impl Default for FacialFeatures {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// Derives [`FacialFeatures`] from a landmark set. Returns `None` when the
/// landmarks do not have the shape the extractor understands.
pub trait LandmarkFeatureExtractor: Send + Sync {
    fn extract(&self, landmarks: &[Landmark]) -> Option<FacialFeatures>;
}

// Indices into the 468-point face mesh topology.
const MESH_POINTS: usize = 468;
const RIGHT_EYE_OUTER: usize = 33;
const RIGHT_EYE_INNER: usize = 133;
const RIGHT_EYE_UPPER: usize = 159;
const RIGHT_EYE_LOWER: usize = 145;
const LEFT_EYE_INNER: usize = 362;
const LEFT_EYE_OUTER: usize = 263;
const LEFT_EYE_UPPER: usize = 386;
const LEFT_EYE_LOWER: usize = 374;
const RIGHT_BROW_MID: usize = 105;
const LEFT_BROW_MID: usize = 334;
const UPPER_LIP_INNER: usize = 13;
const LOWER_LIP_INNER: usize = 14;
const MOUTH_RIGHT: usize = 61;
const MOUTH_LEFT: usize = 291;

// Calibration ratios for a neutral adult face.
const EYE_RATIO_CLOSED: f64 = 0.10;
const EYE_RATIO_OPEN: f64 = 0.35;
const BROW_RAISE_RELAXED: f64 = 0.30;
const BROW_RAISE_FURROWED: f64 = 0.15;
const LIP_APERTURE_OPEN: f64 = 0.40;
const MOUTH_WIDTH_RELAXED: f64 = 0.55;
const MOUTH_WIDTH_STRETCHED: f64 = 0.80;

/// Distance ratios on a dense face mesh, normalized by the outer inter-ocular
/// distance so the result is independent of face size in the frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeometricFeatureExtractor;

impl LandmarkFeatureExtractor for GeometricFeatureExtractor {
    fn extract(&self, landmarks: &[Landmark]) -> Option<FacialFeatures> {
        if landmarks.len() < MESH_POINTS {
            return None;
        }
        let pt = |i: usize| {
            let p = landmarks[i];
            (p.x.is_finite() && p.y.is_finite()).then_some(p)
        };

        let interocular = pt(RIGHT_EYE_OUTER)?.distance(&pt(LEFT_EYE_OUTER)?);
        if interocular <= f64::EPSILON {
            return None;
        }

        let right_eye = eye_ratio(
            pt(RIGHT_EYE_UPPER)?,
            pt(RIGHT_EYE_LOWER)?,
            pt(RIGHT_EYE_OUTER)?,
            pt(RIGHT_EYE_INNER)?,
        )?;
        let left_eye = eye_ratio(
            pt(LEFT_EYE_UPPER)?,
            pt(LEFT_EYE_LOWER)?,
            pt(LEFT_EYE_INNER)?,
            pt(LEFT_EYE_OUTER)?,
        )?;
        let eye_openness = ramp((right_eye + left_eye) / 2.0, EYE_RATIO_CLOSED, EYE_RATIO_OPEN);

        let brow_raise = (pt(RIGHT_BROW_MID)?.distance(&pt(RIGHT_EYE_UPPER)?)
            + pt(LEFT_BROW_MID)?.distance(&pt(LEFT_EYE_UPPER)?))
            / 2.0
            / interocular;
        let brow_tension = ramp(brow_raise, BROW_RAISE_RELAXED, BROW_RAISE_FURROWED);

        let mouth_width = pt(MOUTH_RIGHT)?.distance(&pt(MOUTH_LEFT)?);
        if mouth_width <= f64::EPSILON {
            return None;
        }
        let aperture = pt(UPPER_LIP_INNER)?.distance(&pt(LOWER_LIP_INNER)?) / mouth_width;
        let pressed = ramp(aperture, LIP_APERTURE_OPEN, 0.0);
        let stretched = ramp(
            mouth_width / interocular,
            MOUTH_WIDTH_RELAXED,
            MOUTH_WIDTH_STRETCHED,
        );
        let mouth_tension = (pressed + stretched) / 2.0;

        Some(FacialFeatures {
            eye_openness,
            brow_tension,
            mouth_tension,
        })
    }
}

fn eye_ratio(upper: Landmark, lower: Landmark, a: Landmark, b: Landmark) -> Option<f64> {
    let width = a.distance(&b);
    (width > f64::EPSILON).then(|| upper.distance(&lower) / width)
}

/// Linear map of `value` from `[from, to]` onto 0..=1, clamped. `from` may be
/// greater than `to` for inverted scales.
fn ramp(value: f64, from: f64, to: f64) -> f64 {
    let t = (value - from) / (to - from);
    if t.is_finite() {
        t.clamp(0.0, 1.0)
    } else {
        0.5
    }
}

/// Wraps a [`LandmarkFeatureExtractor`] with the fixed neutral fallback.
pub struct FacialFeatureEstimator {
    extractor: Box<dyn LandmarkFeatureExtractor>,
}

impl FacialFeatureEstimator {
    pub fn new(extractor: Box<dyn LandmarkFeatureExtractor>) -> Self {
        Self { extractor }
    }

    pub fn estimate(&self, landmarks: &[Landmark]) -> FacialFeatures {
        if landmarks.is_empty() {
            return FacialFeatures::FALLBACK;
        }
        match self.extractor.extract(landmarks) {
            Some(f) => f,
            None => {
                tracing::debug!(points = landmarks.len(), "landmarks unusable, using fallback features");
                FacialFeatures::FALLBACK
            }
        }
    }
}

impl Default for FacialFeatureEstimator {
    fn default() -> Self {
        Self::new(Box::new(GeometricFeatureExtractor))
    }
}
