//! Precipitation samples from a meteorology CSV, the usual input for
//! catchment runoff.

use super::series::parse_timestamp;
use crate::domain::{GlmError, GlmResult};
use chrono::NaiveDateTime;
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetCsvConfig {
    pub time_column: String,
    pub precip_column: String,
    /// chrono format for the time column. `None` accepts `YYYY-MM-DD` and
    /// `YYYY-MM-DD hh:mm[:ss]`.
    pub time_format: Option<String>,
    pub delimiter: char,
}

impl Default for MetCsvConfig {
    fn default() -> Self {
        Self {
            time_column: "time".to_string(),
            precip_column: "Rain".to_string(),
            time_format: None,
            delimiter: ',',
        }
    }
}

impl MetCsvConfig {
    pub fn with_columns(mut self, time_column: &str, precip_column: &str) -> Self {
        self.time_column = time_column.to_string();
        self.precip_column = precip_column.to_string();
        self
    }

    pub fn with_time_format(mut self, time_format: &str) -> Self {
        self.time_format = Some(time_format.to_string());
        self
    }
}

pub fn read_precipitation(
    path: &Path,
    config: &MetCsvConfig,
) -> GlmResult<Vec<(NaiveDateTime, f64)>> {
    let content = fs::read_to_string(path).map_err(|source| {
        GlmError::io(format!(
            "failed to read meteorology file '{}': {}",
            path.display(),
            source
        ))
    })?;
    parse_precipitation(&content, config)
}

pub fn parse_precipitation(
    content: &str,
    config: &MetCsvConfig,
) -> GlmResult<Vec<(NaiveDateTime, f64)>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(index, line)| (index + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let Some((header_line, header)) = lines.next() else {
        return Err(GlmError::parse(1, "meteorology file is empty"));
    };
    let columns = split_row(header, config.delimiter);
    let time_index = column_index(&columns, &config.time_column, header_line)?;
    let precip_index = column_index(&columns, &config.precip_column, header_line)?;

    let mut samples = Vec::new();
    for (line, row) in lines {
        let fields = split_row(row, config.delimiter);
        let (Some(time), Some(precip)) = (fields.get(time_index), fields.get(precip_index))
        else {
            return Err(GlmError::parse(
                line,
                format!(
                    "expected at least {} columns, found {}",
                    time_index.max(precip_index) + 1,
                    fields.len()
                ),
            ));
        };

        let timestamp = parse_time(time, config.time_format.as_deref())
            .map_err(|message| GlmError::parse(line, message))?;
        let depth = precip.parse::<f64>().map_err(|_| {
            GlmError::parse(
                line,
                format!("'{}' value '{}' is not a number", config.precip_column, precip),
            )
        })?;
        samples.push((timestamp, depth));
    }

    debug!(samples = samples.len(), column = %config.precip_column, "read precipitation");
    Ok(samples)
}

/// Splits one CSV row. Double-quoted fields may contain the delimiter, and
/// `""` inside them stands for a literal quote.
fn split_row(row: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = row.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ch if ch == delimiter && !quoted => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            ch => current.push(ch),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn column_index(columns: &[String], name: &str, line: usize) -> GlmResult<usize> {
    columns
        .iter()
        .position(|column| *column == name)
        .ok_or_else(|| {
            GlmError::parse(
                line,
                format!(
                    "column '{}' not found (columns: {})",
                    name,
                    columns.join(", ")
                ),
            )
        })
}

fn parse_time(raw: &str, format: Option<&str>) -> Result<NaiveDateTime, String> {
    match format {
        Some(format) => NaiveDateTime::parse_from_str(raw, format)
            .map_err(|_| format!("time '{}' does not match format '{}'", raw, format)),
        None => parse_timestamp(raw).map_err(|error| error.message().to_string()),
    }
}
