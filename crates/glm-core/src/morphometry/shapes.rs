use crate::domain::{GlmError, GlmResult};
use std::f64::consts::PI;

/// Plan-view geometry of an idealised basin, measured upward from the
/// deepest point. `elevation` runs from `0` at the floor to `depth()` at
/// the surface.
pub trait BasinShape {
    fn depth(&self) -> f64;

    fn area_at(&self, elevation: f64) -> f64;

    /// Volume held below `elevation`.
    fn volume_at(&self, elevation: f64) -> f64;
}

/// Rectangular basin whose walls rise at `side_slope` (rise over run) on
/// every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TruncatedPyramid {
    depth: f64,
    side_slope: f64,
    base_width: f64,
    base_length: f64,
}

impl TruncatedPyramid {
    pub fn new(
        depth: f64,
        surface_width: f64,
        surface_length: f64,
        side_slope: f64,
    ) -> GlmResult<Self> {
        ensure_positive("depth", depth)?;
        ensure_positive("surface width", surface_width)?;
        ensure_positive("surface length", surface_length)?;
        ensure_positive("side slope", side_slope)?;

        let inset = 2.0 * depth / side_slope;
        let base_width = surface_width - inset;
        let base_length = surface_length - inset;
        if base_width < 0.0 || base_length < 0.0 {
            return Err(GlmError::invalid_geometry(format!(
                "a basin {} m deep with side slope {} narrows by {} m, more than its \
                 {} x {} m surface",
                depth, side_slope, inset, surface_width, surface_length
            )));
        }

        Ok(Self {
            depth,
            side_slope,
            base_width,
            base_length,
        })
    }

    pub const fn base_width(&self) -> f64 {
        self.base_width
    }

    pub const fn base_length(&self) -> f64 {
        self.base_length
    }

    fn widen(&self, elevation: f64) -> f64 {
        2.0 * elevation / self.side_slope
    }
}

impl BasinShape for TruncatedPyramid {
    fn depth(&self) -> f64 {
        self.depth
    }

    fn area_at(&self, elevation: f64) -> f64 {
        let grow = self.widen(elevation);
        (self.base_width + grow).max(0.0) * (self.base_length + grow).max(0.0)
    }

    fn volume_at(&self, elevation: f64) -> f64 {
        let h = elevation.max(0.0);
        let s = self.side_slope;
        self.base_length * self.base_width * h
            + h * h * (self.base_length + self.base_width) / s
            + 4.0 * h.powi(3) / (3.0 * s * s)
    }
}

/// Circular basin (inverted cone frustum) whose wall rises at `side_slope`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularBasin {
    depth: f64,
    side_slope: f64,
    base_radius: f64,
}

impl CircularBasin {
    pub fn new(depth: f64, surface_radius: f64, side_slope: f64) -> GlmResult<Self> {
        ensure_positive("depth", depth)?;
        ensure_positive("surface radius", surface_radius)?;
        ensure_positive("side slope", side_slope)?;

        let base_radius = surface_radius - depth / side_slope;
        if base_radius < 0.0 {
            return Err(GlmError::invalid_geometry(format!(
                "a circular basin {} m deep with side slope {} needs a surface radius of at least {} m, got {}",
                depth,
                side_slope,
                depth / side_slope,
                surface_radius
            )));
        }

        Ok(Self {
            depth,
            side_slope,
            base_radius,
        })
    }

    pub const fn base_radius(&self) -> f64 {
        self.base_radius
    }

    fn radius_at(&self, elevation: f64) -> f64 {
        (self.base_radius + elevation / self.side_slope).max(0.0)
    }
}

impl BasinShape for CircularBasin {
    fn depth(&self) -> f64 {
        self.depth
    }

    fn area_at(&self, elevation: f64) -> f64 {
        PI * self.radius_at(elevation).powi(2)
    }

    fn volume_at(&self, elevation: f64) -> f64 {
        let h = elevation.max(0.0);
        let (r0, r1) = (self.base_radius, self.radius_at(h));
        PI * h * (r0 * r0 + r0 * r1 + r1 * r1) / 3.0
    }
}

fn ensure_positive(label: &str, value: f64) -> GlmResult<()> {
    if value.is_finite() && value > 0.0 {
        return Ok(());
    }
    Err(GlmError::invalid_geometry(format!(
        "{} must be a positive finite number, got {}",
        label, value
    )))
}
