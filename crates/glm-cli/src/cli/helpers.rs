use super::CliError;
use anyhow::Context;
use chrono::NaiveDateTime;
use glm_core::boundary::parse_timestamp;
use glm_core::common::serialization::write_text_artifact;
use std::fs;
use std::path::{Path, PathBuf};

pub(super) fn read_input_text(path: &Path) -> Result<String, CliError> {
    fs::read_to_string(path)
        .with_context(|| format!("failed to read input '{}'", path.display()))
        .map_err(CliError::from)
}

pub(super) fn write_output_text(path: &Path, content: &str) -> Result<(), CliError> {
    write_text_artifact(path, content)
        .with_context(|| format!("failed to write output '{}'", path.display()))
        .map_err(CliError::from)
}

pub(super) fn ensure_directory(path: &Path) -> Result<(), CliError> {
    fs::create_dir_all(path)
        .with_context(|| format!("failed to create output directory '{}'", path.display()))
        .map_err(CliError::from)
}

pub(super) fn resolve_cli_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// `DATE=VALUE`, as given to `--set`.
pub(super) fn parse_point_spec(spec: &str) -> Result<(NaiveDateTime, f64), CliError> {
    let (date, value) = spec.split_once('=').ok_or_else(|| {
        CliError::Usage(format!("--set expects DATE=VALUE, got '{}'", spec))
    })?;
    let timestamp = parse_timestamp(date.trim())?;
    Ok((timestamp, parse_flow_value(value, "--set", spec)?))
}

/// `FROM..TO=VALUE`, as given to `--range`.
pub(super) fn parse_range_spec(
    spec: &str,
) -> Result<(NaiveDateTime, NaiveDateTime, f64), CliError> {
    let usage = || CliError::Usage(format!("--range expects FROM..TO=VALUE, got '{}'", spec));
    let (span, value) = spec.split_once('=').ok_or_else(usage)?;
    let (from, to) = span.split_once("..").ok_or_else(usage)?;

    let from = parse_timestamp(from.trim())?;
    let to = parse_timestamp(to.trim())?;
    Ok((from, to, parse_flow_value(value, "--range", spec)?))
}

fn parse_flow_value(raw: &str, option: &str, spec: &str) -> Result<f64, CliError> {
    raw.trim().parse::<f64>().map_err(|_| {
        CliError::Usage(format!(
            "{} value '{}' in '{}' is not a number",
            option,
            raw.trim(),
            spec
        ))
    })
}
