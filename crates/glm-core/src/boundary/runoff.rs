use super::series::{FlowSeries, IntoTimestamp, Resolution};
use crate::domain::{GlmError, GlmResult};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;
use tracing::debug;

/// How daily precipitation over a catchment becomes inflow volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunoffModel {
    /// A fixed fraction of the rain falling on the catchment runs off.
    Coefficient(f64),
    /// Rain beyond a daily depth (metres) runs off completely.
    Threshold(f64),
}

impl RunoffModel {
    /// Exactly one of the two options must be given.
    pub fn from_options(coefficient: Option<f64>, threshold: Option<f64>) -> GlmResult<Self> {
        let model = match (coefficient, threshold) {
            (Some(coefficient), None) => Self::Coefficient(coefficient),
            (None, Some(threshold)) => Self::Threshold(threshold),
            (Some(_), Some(_)) => {
                return Err(GlmError::invalid_parameter(
                    "give either a runoff coefficient or a runoff threshold, not both",
                ));
            }
            (None, None) => {
                return Err(GlmError::invalid_parameter(
                    "a runoff coefficient or a runoff threshold is required",
                ));
            }
        };

        let value = match model {
            Self::Coefficient(value) | Self::Threshold(value) => value,
        };
        if !value.is_finite() || value < 0.0 {
            return Err(GlmError::invalid_parameter(format!(
                "runoff {} must be a non-negative finite number, got {}",
                model.label(),
                value
            )));
        }
        Ok(model)
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Coefficient(_) => "coefficient",
            Self::Threshold(_) => "threshold",
        }
    }

    /// Runoff volume for one day of `precipitation` metres over
    /// `catchment_area` square metres. Never negative.
    pub fn runoff(self, precipitation: f64, catchment_area: f64) -> f64 {
        let volume = match self {
            Self::Coefficient(coefficient) => precipitation * catchment_area * coefficient,
            Self::Threshold(threshold) => (precipitation - threshold) * catchment_area,
        };
        volume.max(0.0)
    }
}

/// Turns precipitation samples into a daily inflow series.
///
/// Samples are summed per calendar day before the model is applied. Days
/// between the first and last sample with no samples count as dry.
pub fn derive_runoff(
    precipitation: &[(NaiveDateTime, f64)],
    catchment_area: f64,
    model: RunoffModel,
) -> GlmResult<FlowSeries> {
    if !catchment_area.is_finite() || catchment_area <= 0.0 {
        return Err(GlmError::invalid_parameter(format!(
            "catchment area must be a positive finite number, got {}",
            catchment_area
        )));
    }
    if precipitation.is_empty() {
        return Err(GlmError::invalid_parameter(
            "precipitation series is empty",
        ));
    }

    let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for (timestamp, depth) in precipitation {
        if !depth.is_finite() {
            return Err(GlmError::invalid_parameter(format!(
                "precipitation at {} is not a finite number",
                timestamp
            )));
        }
        *daily.entry(timestamp.date()).or_insert(0.0) += depth;
    }

    let (Some(first), Some(last)) = (
        daily.keys().next().copied(),
        daily.keys().next_back().copied(),
    ) else {
        return Err(GlmError::invalid_parameter(
            "precipitation series is empty",
        ));
    };

    let values: Vec<f64> = first
        .iter_days()
        .take_while(|day| *day <= last)
        .map(|day| model.runoff(daily.get(&day).copied().unwrap_or(0.0), catchment_area))
        .collect();

    debug!(
        days = values.len(),
        model = model.label(),
        "derived runoff series"
    );
    Ok(FlowSeries::from_values(
        first.into_timestamp(),
        Resolution::Daily,
        0.0,
        values,
    ))
}
