use super::CliError;
use super::helpers::{read_input_text, resolve_cli_path};
use glm_core::boundary::Resolution;
use glm_core::domain::{GlmError, GlmErrorKind};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Project file read by `glmkit build`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct ProjectConfig {
    /// Inline `{ "block": { "param": value } }` mapping, or a path to a
    /// JSON mapping or an existing `.nml` file.
    pub(super) namelist: NamelistSource,

    /// Replaces `bsn_vals`, `H` and `A` with a derived basin profile.
    #[serde(default)]
    pub(super) morphometry: Option<MorphometryConfig>,

    #[serde(default)]
    pub(super) outflow: Option<OutflowConfig>,

    #[serde(default)]
    pub(super) inflow: Option<InflowConfig>,

    #[serde(default = "default_output_dir")]
    pub(super) output_dir: PathBuf,

    #[serde(default = "default_nml_file")]
    pub(super) nml_file: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(super) enum NamelistSource {
    File(PathBuf),
    Inline(Map<String, Value>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct MorphometryConfig {
    pub(super) depth: f64,
    pub(super) width: f64,
    pub(super) length: f64,
    #[serde(default = "default_side_slope")]
    pub(super) slope: f64,
    #[serde(default = "default_step")]
    pub(super) step: f64,
    #[serde(default)]
    pub(super) datum: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct OutflowConfig {
    pub(super) start: String,
    pub(super) end: String,
    #[serde(default)]
    pub(super) base: f64,
    #[serde(default)]
    pub(super) resolution: Resolution,
    #[serde(default)]
    pub(super) points: Vec<OutflowPoint>,
    #[serde(default)]
    pub(super) ranges: Vec<OutflowRange>,
    #[serde(default)]
    pub(super) per_second: bool,
    #[serde(default)]
    pub(super) resample_daily: bool,
    #[serde(default = "default_outflow_file")]
    pub(super) file: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct OutflowPoint {
    pub(super) date: String,
    pub(super) value: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct OutflowRange {
    pub(super) from: String,
    pub(super) to: String,
    pub(super) value: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub(super) struct InflowConfig {
    pub(super) met: PathBuf,
    #[serde(default = "default_date_col")]
    pub(super) date_col: String,
    #[serde(default = "default_precip_col")]
    pub(super) precip_col: String,
    #[serde(default)]
    pub(super) date_format: Option<String>,
    pub(super) catchment_area: f64,
    #[serde(default)]
    pub(super) runoff_coef: Option<f64>,
    #[serde(default)]
    pub(super) runoff_threshold: Option<f64>,
    #[serde(default)]
    pub(super) per_second: bool,
    #[serde(default = "default_inflow_file")]
    pub(super) file: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_nml_file() -> String {
    "glm3.nml".to_string()
}
fn default_side_slope() -> f64 {
    3.0
}
fn default_step() -> f64 {
    1.0
}
fn default_outflow_file() -> String {
    "outflow.csv".to_string()
}
fn default_inflow_file() -> String {
    "inflow.csv".to_string()
}
fn default_date_col() -> String {
    "time".to_string()
}
fn default_precip_col() -> String {
    "Rain".to_string()
}

impl ProjectConfig {
    /// Reads a project file; relative paths inside it are resolved against
    /// the directory that holds it.
    pub(super) fn load(path: &Path) -> Result<Self, CliError> {
        let text = read_input_text(path)?;
        let config: Self = serde_json::from_str(&text).map_err(|error| {
            GlmError::new(
                GlmErrorKind::Parse,
                format!("invalid project file '{}': {}", path.display(), error),
            )
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.resolve_paths(base_dir))
    }

    fn resolve_paths(mut self, base_dir: &Path) -> Self {
        if let NamelistSource::File(path) = &mut self.namelist {
            *path = resolve_cli_path(base_dir, path);
        }
        if let Some(inflow) = self.inflow.as_mut() {
            inflow.met = resolve_cli_path(base_dir, &inflow.met);
        }
        self.output_dir = resolve_cli_path(base_dir, &self.output_dir);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{NamelistSource, ProjectConfig};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    #[test]
    fn defaults_fill_optional_sections_and_paths_resolve() {
        let temp = TempDir::new().expect("tempdir should be created");
        let project = temp.path().join("project.json");
        fs::write(
            &project,
            r#"{
                "namelist": "lake.json",
                "morphometry": { "depth": 5, "width": 40, "length": 62 },
                "inflow": { "met": "met.csv", "catchment_area": 1000, "runoff_coef": 0.3 },
                "output_dir": "out"
            }"#,
        )
        .expect("project file should be written");

        let config = ProjectConfig::load(&project).expect("project should load");
        assert!(
            matches!(&config.namelist, NamelistSource::File(path) if path == &temp.path().join("lake.json"))
        );
        let morphometry = config.morphometry.expect("morphometry section should load");
        assert_eq!(morphometry.slope, 3.0);
        assert_eq!(morphometry.step, 1.0);
        let inflow = config.inflow.expect("inflow section should load");
        assert_eq!(inflow.met, temp.path().join("met.csv"));
        assert_eq!(inflow.precip_col, "Rain");
        assert_eq!(config.output_dir, temp.path().join("out"));
        assert_eq!(config.nml_file, "glm3.nml");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let temp = TempDir::new().expect("tempdir should be created");
        let project = temp.path().join("project.json");
        fs::write(&project, r#"{ "namelist": {}, "outflows": {} }"#)
            .expect("project file should be written");

        let error = ProjectConfig::load(&project).expect_err("unknown section should fail");
        assert!(error.to_string().contains("outflows"));
    }

    #[test]
    fn inline_namelists_deserialize_as_mappings() {
        let temp = TempDir::new().expect("tempdir should be created");
        let project = temp.path().join("project.json");
        fs::write(&project, r#"{ "namelist": { "time": { "timefmt": 2 } } }"#)
            .expect("project file should be written");

        let config = ProjectConfig::load(&project).expect("project should load");
        assert!(matches!(config.namelist, NamelistSource::Inline(ref map) if map.contains_key("time")));
        assert_eq!(config.output_dir, temp.path().join(Path::new(".")));
    }
}
