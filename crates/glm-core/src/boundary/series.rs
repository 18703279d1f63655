use crate::common::serialization::write_text_artifact;
use crate::domain::{GlmError, GlmResult};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::info;

pub const CSV_HEADER: &str = "time,flow";
const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const ACCEPTED_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    #[default]
    Daily,
    Hourly,
}

impl Resolution {
    pub const fn seconds(self) -> i64 {
        match self {
            Self::Daily => 86_400,
            Self::Hourly => 3_600,
        }
    }

    pub fn step(self) -> TimeDelta {
        TimeDelta::seconds(self.seconds())
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Hourly => "hourly",
        }
    }
}

impl Display for Resolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Anything that names an instant on a series grid. Dates mean midnight.
pub trait IntoTimestamp {
    fn into_timestamp(self) -> NaiveDateTime;
}

impl IntoTimestamp for NaiveDateTime {
    fn into_timestamp(self) -> NaiveDateTime {
        self
    }
}

impl IntoTimestamp for NaiveDate {
    fn into_timestamp(self) -> NaiveDateTime {
        self.and_time(NaiveTime::MIN)
    }
}

/// Parses `YYYY-MM-DD` or `YYYY-MM-DD hh:mm[:ss]`.
pub fn parse_timestamp(raw: &str) -> GlmResult<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        return Ok(date.into_timestamp());
    }
    ACCEPTED_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .ok_or_else(|| {
            GlmError::invalid_parameter(format!(
                "'{}' is not a date (YYYY-MM-DD) or datetime (YYYY-MM-DD hh:mm:ss)",
                raw
            ))
        })
}

/// A flow value for every step between two inclusive endpoints.
///
/// The grid is fixed at construction; values can be overwritten but the
/// series never grows or shrinks.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowSeries {
    start: NaiveDateTime,
    resolution: Resolution,
    base_value: f64,
    values: Vec<f64>,
}

impl FlowSeries {
    /// Daily series from `start` to `end`, every day set to `base_value`.
    pub fn new<T: IntoTimestamp>(start: T, end: T, base_value: f64) -> GlmResult<Self> {
        Self::with_resolution(start, end, Resolution::Daily, base_value)
    }

    pub fn hourly<T: IntoTimestamp>(start: T, end: T, base_value: f64) -> GlmResult<Self> {
        Self::with_resolution(start, end, Resolution::Hourly, base_value)
    }

    pub fn with_resolution<T: IntoTimestamp>(
        start: T,
        end: T,
        resolution: Resolution,
        base_value: f64,
    ) -> GlmResult<Self> {
        let (start, end) = (start.into_timestamp(), end.into_timestamp());
        if end < start {
            return Err(GlmError::invalid_range(format!(
                "series end {} is before its start {}",
                end.format(DATETIME_FORMAT),
                start.format(DATETIME_FORMAT)
            )));
        }
        ensure_flow("base value", base_value)?;

        let steps = (end - start).num_seconds() / resolution.seconds();
        let len = usize::try_from(steps).map_err(|_| {
            GlmError::invalid_range("series span does not fit in memory".to_string())
        })? + 1;

        Ok(Self {
            start,
            resolution,
            base_value,
            values: vec![base_value; len],
        })
    }

    pub(crate) fn from_values(
        start: NaiveDateTime,
        resolution: Resolution,
        base_value: f64,
        values: Vec<f64>,
    ) -> Self {
        Self {
            start,
            resolution,
            base_value,
            values,
        }
    }

    pub const fn start(&self) -> NaiveDateTime {
        self.start
    }

    /// Last grid point; never later than the `end` given at construction.
    pub fn end(&self) -> NaiveDateTime {
        self.timestamp(self.values.len().saturating_sub(1))
    }

    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub const fn base_value(&self) -> f64 {
        self.base_value
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value_at<T: IntoTimestamp>(&self, timestamp: T) -> Option<f64> {
        let index = self.index_of(timestamp.into_timestamp()).ok()?;
        self.values.get(index).copied()
    }

    /// Overwrites the value at each listed timestamp. All timestamps and
    /// values are checked before anything changes.
    pub fn set_discrete<T>(&mut self, timestamps: &[T], values: &[f64]) -> GlmResult<()>
    where
        T: IntoTimestamp + Copy,
    {
        if timestamps.len() != values.len() {
            return Err(GlmError::length_mismatch(format!(
                "{} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }

        let mut updates = Vec::with_capacity(values.len());
        for (timestamp, value) in timestamps.iter().zip(values) {
            ensure_flow("flow", *value)?;
            updates.push((self.index_of(timestamp.into_timestamp())?, *value));
        }
        for (index, value) in updates {
            self.values[index] = value;
        }
        Ok(())
    }

    /// Sets every grid point from `from` to `to`, both inclusive.
    pub fn set_range<T: IntoTimestamp>(&mut self, from: T, to: T, value: f64) -> GlmResult<()> {
        let (from, to) = (from.into_timestamp(), to.into_timestamp());
        if to < from {
            return Err(GlmError::invalid_range(format!(
                "range end {} is before its start {}",
                to.format(DATETIME_FORMAT),
                from.format(DATETIME_FORMAT)
            )));
        }
        ensure_flow("flow", value)?;
        self.ensure_within(from)?;
        self.ensure_within(to)?;

        let step = self.resolution.seconds();
        let first = ((from - self.start).num_seconds() + step - 1) / step;
        let last = (to - self.start).num_seconds() / step;
        for index in first..=last {
            if let Some(slot) = usize::try_from(index)
                .ok()
                .and_then(|index| self.values.get_mut(index))
            {
                *slot = value;
            }
        }
        Ok(())
    }

    /// `(timestamp, value)` pairs in time order. The iterator borrows the
    /// series and can be cloned to walk it again.
    pub fn rows(&self) -> SeriesRows<'_> {
        SeriesRows {
            series: self,
            index: 0,
        }
    }

    /// Daily totals of an hourly series; a daily series is returned as is.
    /// Partial first and last days sum only the hours they contain.
    pub fn daily_totals(&self) -> FlowSeries {
        if self.resolution == Resolution::Daily {
            return self.clone();
        }

        let first_day = self.start.date();
        let mut totals: Vec<f64> = Vec::new();
        for (timestamp, value) in self.rows() {
            let day = (timestamp.date() - first_day).num_days() as usize;
            if totals.len() <= day {
                totals.resize(day + 1, 0.0);
            }
            totals[day] += value;
        }

        let steps_per_day = (Resolution::Daily.seconds() / self.resolution.seconds()) as f64;
        Self::from_values(
            first_day.into_timestamp(),
            Resolution::Daily,
            self.base_value * steps_per_day,
            totals,
        )
    }

    /// Converts per-step volumes into rates per second (m3/day to m3/s for a
    /// daily series).
    pub fn to_rate_per_second(&self) -> FlowSeries {
        let divisor = self.resolution.seconds() as f64;
        Self::from_values(
            self.start,
            self.resolution,
            self.base_value / divisor,
            self.values.iter().map(|value| value / divisor).collect(),
        )
    }

    /// CSV text with a `time,flow` header. Hourly series must be resampled
    /// to daily totals first; GLM reads daily boundary files here.
    pub fn to_csv(&self, resample_daily: bool) -> GlmResult<String> {
        let daily;
        let series = match (self.resolution, resample_daily) {
            (Resolution::Daily, _) => self,
            (Resolution::Hourly, true) => {
                daily = self.daily_totals();
                &daily
            }
            (Resolution::Hourly, false) => {
                return Err(GlmError::resolution(
                    "hourly series must be resampled to daily before writing",
                ));
            }
        };

        let mut csv = String::from(CSV_HEADER);
        csv.push('\n');
        for (timestamp, value) in series.rows() {
            csv.push_str(&timestamp.format(DATE_FORMAT).to_string());
            csv.push(',');
            csv.push_str(&value.to_string());
            csv.push('\n');
        }
        Ok(csv)
    }

    pub fn write(&self, path: &Path, resample_daily: bool) -> GlmResult<()> {
        let csv = self.to_csv(resample_daily)?;
        write_text_artifact(path, &csv).map_err(|source| {
            GlmError::io(format!(
                "failed to write series '{}': {}",
                path.display(),
                source
            ))
        })?;
        info!(path = %path.display(), rows = csv.lines().count() - 1, "wrote flow series");
        Ok(())
    }

    fn timestamp(&self, index: usize) -> NaiveDateTime {
        self.start + TimeDelta::seconds(index as i64 * self.resolution.seconds())
    }

    fn ensure_within(&self, timestamp: NaiveDateTime) -> GlmResult<()> {
        if timestamp < self.start || timestamp > self.end() {
            return Err(GlmError::date_out_of_range(format!(
                "{} is outside the series {} to {}",
                timestamp.format(DATETIME_FORMAT),
                self.start.format(DATETIME_FORMAT),
                self.end().format(DATETIME_FORMAT)
            )));
        }
        Ok(())
    }

    fn index_of(&self, timestamp: NaiveDateTime) -> GlmResult<usize> {
        self.ensure_within(timestamp)?;
        let offset = (timestamp - self.start).num_seconds();
        let step = self.resolution.seconds();
        if offset % step != 0 {
            return Err(GlmError::date_out_of_range(format!(
                "{} is not on the {} grid starting {}",
                timestamp.format(DATETIME_FORMAT),
                self.resolution,
                self.start.format(DATETIME_FORMAT)
            )));
        }
        Ok((offset / step) as usize)
    }
}

#[derive(Debug, Clone)]
pub struct SeriesRows<'a> {
    series: &'a FlowSeries,
    index: usize,
}

impl Iterator for SeriesRows<'_> {
    type Item = (NaiveDateTime, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let value = *self.series.values.get(self.index)?;
        let timestamp = self.series.timestamp(self.index);
        self.index += 1;
        Some((timestamp, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.series.values.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for SeriesRows<'_> {}

fn ensure_flow(label: &str, value: f64) -> GlmResult<()> {
    if value.is_finite() && value >= 0.0 {
        return Ok(());
    }
    Err(GlmError::invalid_parameter(format!(
        "{} must be a non-negative finite number, got {}",
        label, value
    )))
}
