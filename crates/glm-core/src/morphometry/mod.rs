//! Hypsographic profiles (height/area tables) for idealised lake basins.

mod shapes;

pub use shapes::{BasinShape, CircularBasin, TruncatedPyramid};

use crate::domain::{BlockKind, GlmError, GlmResult, ParamValue};
use crate::nml::NmlBlock;
use tracing::debug;

/// Guards against step sizes that would produce an unusable table.
const MAX_PROFILE_POINTS: usize = 100_000;

/// A step count is rounded when depth / step lands this close to an integer.
const STEP_ROUNDING_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    /// Height relative to the surface; `0` at the surface, negative below.
    pub height: f64,
    pub area: f64,
    pub volume: f64,
}

/// Heights strictly increase from `-depth` to `0`; areas never decrease.
#[derive(Debug, Clone, PartialEq)]
pub struct MorphometryProfile {
    points: Vec<ProfilePoint>,
}

impl MorphometryProfile {
    pub fn points(&self) -> &[ProfilePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn heights(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.height).collect()
    }

    pub fn areas(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.area).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.volume).collect()
    }

    /// Heights shifted onto an absolute datum, such as the crest elevation
    /// when `H` is given in metres above sea level.
    pub fn heights_above(&self, datum: f64) -> Vec<f64> {
        self.points.iter().map(|point| point.height + datum).collect()
    }

    /// Writes `bsn_vals`, `H` and `A` into a morphometry block in one
    /// assignment. `datum` is added to every height.
    pub fn apply_to(&self, block: &mut NmlBlock, datum: f64) -> GlmResult<()> {
        if block.kind() != BlockKind::Morphometry {
            return Err(GlmError::invalid_parameter(format!(
                "a morphometry profile cannot be applied to '{}'",
                block.kind().header()
            )));
        }
        if !datum.is_finite() {
            return Err(GlmError::invalid_parameter(format!(
                "datum must be finite, got {}",
                datum
            )));
        }

        block.set_many([
            ("bsn_vals", ParamValue::from(self.len())),
            ("H", ParamValue::RealList(self.heights_above(datum))),
            ("A", ParamValue::RealList(self.areas())),
        ])
    }
}

/// Samples `shape` every `step` metres from the floor to the surface. The
/// last sample always lands exactly on the surface, so the final interval
/// may be shorter than `step`.
pub fn derive_profile<S>(shape: &S, step: f64) -> GlmResult<MorphometryProfile>
where
    S: BasinShape + ?Sized,
{
    if !step.is_finite() || step <= 0.0 {
        return Err(GlmError::invalid_geometry(format!(
            "profile step must be a positive finite number, got {}",
            step
        )));
    }

    let depth = shape.depth();
    let intervals = interval_count(depth, step);
    if intervals + 1 > MAX_PROFILE_POINTS {
        return Err(GlmError::invalid_geometry(format!(
            "a step of {} m over {} m would produce more than {} profile points",
            step, depth, MAX_PROFILE_POINTS
        )));
    }

    let points: Vec<ProfilePoint> = (0..=intervals)
        .map(|index| {
            let elevation = if index == intervals {
                depth
            } else {
                index as f64 * step
            };
            ProfilePoint {
                height: elevation - depth,
                area: shape.area_at(elevation),
                volume: shape.volume_at(elevation),
            }
        })
        .collect();

    debug!(depth, step, points = points.len(), "derived morphometry profile");
    Ok(MorphometryProfile { points })
}

/// Profile of a truncated-pyramid basin, the usual idealisation for GLM
/// reservoirs.
pub fn derive(
    depth: f64,
    surface_width: f64,
    surface_length: f64,
    side_slope: f64,
    step: f64,
) -> GlmResult<MorphometryProfile> {
    let basin = TruncatedPyramid::new(depth, surface_width, surface_length, side_slope)?;
    derive_profile(&basin, step)
}

fn interval_count(depth: f64, step: f64) -> usize {
    let ratio = depth / step;
    let rounded = ratio.round();
    let intervals = if (ratio - rounded).abs() <= STEP_ROUNDING_TOLERANCE * ratio.max(1.0) {
        rounded
    } else {
        ratio.ceil()
    };
    (intervals.max(1.0)).min(MAX_PROFILE_POINTS as f64) as usize
}
