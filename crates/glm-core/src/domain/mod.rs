pub mod errors;

pub use errors::{
    ExitPlaceholder, GlmError, GlmErrorCategory, GlmErrorKind, GlmResult,
};

use std::fmt::{Display, Formatter};

/// Namelist sections understood by GLM, declared in the order they are
/// written to a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BlockKind {
    GlmSetup,
    Mixing,
    WqSetup,
    Morphometry,
    Time,
    Output,
    InitProfiles,
    Light,
    BirdModel,
    Sediment,
    SnowIce,
    Meteorology,
    Inflow,
    Outflow,
}

impl BlockKind {
    pub const ALL: [BlockKind; 14] = [
        BlockKind::GlmSetup,
        BlockKind::Mixing,
        BlockKind::WqSetup,
        BlockKind::Morphometry,
        BlockKind::Time,
        BlockKind::Output,
        BlockKind::InitProfiles,
        BlockKind::Light,
        BlockKind::BirdModel,
        BlockKind::Sediment,
        BlockKind::SnowIce,
        BlockKind::Meteorology,
        BlockKind::Inflow,
        BlockKind::Outflow,
    ];

    pub const REQUIRED: [BlockKind; 4] = [
        BlockKind::GlmSetup,
        BlockKind::Morphometry,
        BlockKind::Time,
        BlockKind::InitProfiles,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::GlmSetup => "glm_setup",
            Self::Mixing => "mixing",
            Self::WqSetup => "wq_setup",
            Self::Morphometry => "morphometry",
            Self::Time => "time",
            Self::Output => "output",
            Self::InitProfiles => "init_profiles",
            Self::Light => "light",
            Self::BirdModel => "bird_model",
            Self::Sediment => "sediment",
            Self::SnowIce => "snowice",
            Self::Meteorology => "meteorology",
            Self::Inflow => "inflow",
            Self::Outflow => "outflow",
        }
    }

    pub fn header(self) -> String {
        format!("&{}", self.name())
    }

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }

    /// Resolves a block name as written in a namelist header, a JSON key, or
    /// a command line. The leading `&` is optional and hyphens count as
    /// underscores.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = name
            .trim()
            .trim_start_matches('&')
            .to_ascii_lowercase()
            .replace('-', "_");

        match normalized.as_str() {
            "glm_setup" | "setup" => Some(Self::GlmSetup),
            "mixing" => Some(Self::Mixing),
            "wq_setup" => Some(Self::WqSetup),
            "morphometry" => Some(Self::Morphometry),
            "time" => Some(Self::Time),
            "output" => Some(Self::Output),
            "init_profiles" => Some(Self::InitProfiles),
            "light" => Some(Self::Light),
            "bird_model" => Some(Self::BirdModel),
            "sediment" => Some(Self::Sediment),
            "snowice" | "snow_ice" | "ice_snow" => Some(Self::SnowIce),
            "meteorology" => Some(Self::Meteorology),
            "inflow" | "inflows" => Some(Self::Inflow),
            "outflow" | "outflows" => Some(Self::Outflow),
            _ => None,
        }
    }
}

impl Display for BlockKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str((*self).name())
    }
}

/// A single namelist parameter value.
///
/// `DateTime` holds the validated `YYYY-MM-DD hh:mm:ss` text; it renders
/// quoted, exactly like `Str`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    DateTime(String),
    RealList(Vec<f64>),
    IntList(Vec<i64>),
    BoolList(Vec<bool>),
    StrList(Vec<String>),
}

impl ParamValue {
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Real(_) => "real",
            Self::Str(_) => "string",
            Self::DateTime(_) => "datetime",
            Self::RealList(_) => "real list",
            Self::IntList(_) => "integer list",
            Self::BoolList(_) => "boolean list",
            Self::StrList(_) => "string list",
        }
    }

    pub fn list_len(&self) -> Option<usize> {
        match self {
            Self::RealList(values) => Some(values.len()),
            Self::IntList(values) => Some(values.len()),
            Self::BoolList(values) => Some(values.len()),
            Self::StrList(values) => Some(values.len()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) | Self::DateTime(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_real_list(&self) -> Option<&[f64]> {
        match self {
            Self::RealList(values) => Some(values),
            _ => None,
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(values: Vec<f64>) -> Self {
        Self::RealList(values)
    }
}

impl From<&[f64]> for ParamValue {
    fn from(values: &[f64]) -> Self {
        Self::RealList(values.to_vec())
    }
}

impl From<Vec<i64>> for ParamValue {
    fn from(values: Vec<i64>) -> Self {
        Self::IntList(values)
    }
}

impl From<Vec<bool>> for ParamValue {
    fn from(values: Vec<bool>) -> Self {
        Self::BoolList(values)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(values: Vec<String>) -> Self {
        Self::StrList(values)
    }
}

impl From<Vec<&str>> for ParamValue {
    fn from(values: Vec<&str>) -> Self {
        Self::StrList(values.into_iter().map(ToOwned::to_owned).collect())
    }
}
