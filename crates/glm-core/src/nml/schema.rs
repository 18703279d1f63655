use crate::domain::{BlockKind, ParamValue};
use chrono::NaiveDateTime;

pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Spellings accepted on input; values are stored in [`DATETIME_FORMAT`].
const DATETIME_INPUT_FORMATS: [&str; 2] = [DATETIME_FORMAT, "%Y-%m-%d %H:%M"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Bool,
    Int,
    Real,
    Str,
    DateTime,
    RealList,
    IntList,
    BoolList,
    StrList,
}

impl ParamType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "boolean",
            Self::Int => "integer",
            Self::Real => "real",
            Self::Str => "string",
            Self::DateTime => "datetime",
            Self::RealList => "real list",
            Self::IntList => "integer list",
            Self::BoolList => "boolean list",
            Self::StrList => "string list",
        }
    }

    pub const fn is_list(self) -> bool {
        matches!(
            self,
            Self::RealList | Self::IntList | Self::BoolList | Self::StrList
        )
    }

    /// Converts `value` into this type, applying the lossless promotions a
    /// namelist reader would: integer to real, scalar to one-element list.
    /// The error is a short reason suitable for a diagnostic.
    pub fn coerce(self, value: ParamValue) -> Result<ParamValue, String> {
        let found = value.type_name();
        let mismatch = || format!("expects {}, got {}", self.name(), found);

        let coerced = match (self, value) {
            (Self::Bool, ParamValue::Bool(flag)) => ParamValue::Bool(flag),
            (Self::Int, ParamValue::Int(value)) => ParamValue::Int(value),
            (Self::Int, ParamValue::Real(value)) if is_integral(value) => {
                ParamValue::Int(value as i64)
            }
            (Self::Real, ParamValue::Real(value)) => ParamValue::Real(value),
            (Self::Real, ParamValue::Int(value)) => ParamValue::Real(value as f64),
            (Self::Str, ParamValue::Str(text)) => ParamValue::Str(text),
            (Self::DateTime, ParamValue::Str(text) | ParamValue::DateTime(text)) => {
                let parsed = DATETIME_INPUT_FORMATS
                    .iter()
                    .find_map(|format| NaiveDateTime::parse_from_str(text.trim(), format).ok())
                    .ok_or_else(|| {
                        format!("expects a datetime formatted 'YYYY-MM-DD hh:mm:ss', got '{text}'")
                    })?;
                ParamValue::DateTime(parsed.format(DATETIME_FORMAT).to_string())
            }
            (Self::RealList, ParamValue::RealList(values)) => ParamValue::RealList(values),
            (Self::RealList, ParamValue::IntList(values)) => {
                ParamValue::RealList(values.into_iter().map(|value| value as f64).collect())
            }
            (Self::RealList, ParamValue::Real(value)) => ParamValue::RealList(vec![value]),
            (Self::RealList, ParamValue::Int(value)) => ParamValue::RealList(vec![value as f64]),
            (Self::IntList, ParamValue::IntList(values)) => ParamValue::IntList(values),
            (Self::IntList, ParamValue::Int(value)) => ParamValue::IntList(vec![value]),
            (Self::BoolList, ParamValue::BoolList(values)) => ParamValue::BoolList(values),
            (Self::BoolList, ParamValue::Bool(flag)) => ParamValue::BoolList(vec![flag]),
            (Self::StrList, ParamValue::StrList(values)) => ParamValue::StrList(values),
            (Self::StrList, ParamValue::Str(text)) => ParamValue::StrList(vec![text]),
            _ => return Err(mismatch()),
        };

        let problem = match &coerced {
            ParamValue::Real(value) if !value.is_finite() => Some("must be a finite number"),
            ParamValue::RealList(values) if values.iter().any(|value| !value.is_finite()) => {
                Some("must contain only finite numbers")
            }
            other if other.list_len() == Some(0) => Some("must contain at least one element"),
            _ => None,
        };

        match problem {
            Some(reason) => Err(reason.to_string()),
            None => Ok(coerced),
        }
    }
}

fn is_integral(value: f64) -> bool {
    value.is_finite() && value.fract() == 0.0 && value.abs() < i64::MAX as f64
}

/// How the length of a list parameter is tied to its siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthRule {
    Free,
    Count(&'static str),
    Product(&'static str, &'static str),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(&'static str),
}

impl ParamDefault {
    pub fn to_value(self, ty: ParamType) -> ParamValue {
        let value = match self {
            Self::Bool(flag) => ParamValue::Bool(flag),
            Self::Int(value) => ParamValue::Int(value),
            Self::Real(value) => ParamValue::Real(value),
            Self::Str(text) => ParamValue::Str(text.to_string()),
        };
        ty.coerce(value.clone()).unwrap_or(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub ty: ParamType,
    pub length: LengthRule,
    pub default: Option<ParamDefault>,
}

const fn param(name: &'static str, ty: ParamType) -> ParamSpec {
    ParamSpec {
        name,
        ty,
        length: LengthRule::Free,
        default: None,
    }
}

const fn counted(name: &'static str, ty: ParamType, count: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        ty,
        length: LengthRule::Count(count),
        default: None,
    }
}

const fn real(name: &'static str, default: f64) -> ParamSpec {
    ParamSpec {
        name,
        ty: ParamType::Real,
        length: LengthRule::Free,
        default: Some(ParamDefault::Real(default)),
    }
}

const fn int(name: &'static str, default: i64) -> ParamSpec {
    ParamSpec {
        name,
        ty: ParamType::Int,
        length: LengthRule::Free,
        default: Some(ParamDefault::Int(default)),
    }
}

const fn flag(name: &'static str, default: bool) -> ParamSpec {
    ParamSpec {
        name,
        ty: ParamType::Bool,
        length: LengthRule::Free,
        default: Some(ParamDefault::Bool(default)),
    }
}

const fn text(name: &'static str, default: &'static str) -> ParamSpec {
    ParamSpec {
        name,
        ty: ParamType::Str,
        length: LengthRule::Free,
        default: Some(ParamDefault::Str(default)),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BlockSchema {
    pub kind: BlockKind,
    pub params: &'static [ParamSpec],
}

impl BlockSchema {
    /// Position of `name` in declaration order. Names match without regard
    /// to ASCII case, as a Fortran namelist reader does.
    pub fn position(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.params
            .iter()
            .position(|spec| spec.name.eq_ignore_ascii_case(name))
    }

    pub fn param(&self, name: &str) -> Option<&'static ParamSpec> {
        let params: &'static [ParamSpec] = self.params;
        self.position(name).map(|index| &params[index])
    }
}

use ParamType::{
    Bool as B, BoolList as BL, DateTime as DT, Int as I, IntList as IL, Real as R,
    RealList as RL, Str as S, StrList as SL,
};

const GLM_SETUP: &[ParamSpec] = &[
    param("sim_name", S),
    int("max_layers", 500),
    real("min_layer_vol", 0.025),
    real("min_layer_thick", 0.15),
    real("max_layer_thick", 1.5),
    int("density_model", 1),
    flag("non_avg", true),
];

const MIXING: &[ParamSpec] = &[
    int("surface_mixing", 1),
    real("coef_mix_conv", 0.2),
    real("coef_wind_stir", 0.23),
    real("coef_mix_shear", 0.3),
    real("coef_mix_turb", 0.51),
    real("coef_mix_KH", 0.3),
    int("deep_mixing", 2),
    real("coef_mix_hyp", 0.5),
    real("diff", 0.0),
];

const WQ_SETUP: &[ParamSpec] = &[
    text("wq_lib", "aed2"),
    param("wq_nml_file", S),
    flag("bioshade_feedback", true),
    flag("mobility_off", false),
    int("ode_method", 1),
    real("split_factor", 1.0),
    flag("repair_state", true),
];

const MORPHOMETRY: &[ParamSpec] = &[
    param("lake_name", S),
    param("latitude", R),
    param("longitude", R),
    param("base_elev", R),
    param("crest_elev", R),
    param("bsn_len", R),
    param("bsn_wid", R),
    param("bsn_vals", I),
    counted("H", RL, "bsn_vals"),
    counted("A", RL, "bsn_vals"),
];

const TIME: &[ParamSpec] = &[
    int("timefmt", 2),
    param("start", DT),
    param("stop", DT),
    real("dt", 3600.0),
    param("num_days", I),
    real("timezone", 0.0),
];

const OUTPUT: &[ParamSpec] = &[
    text("out_dir", "output"),
    text("out_fn", "output"),
    int("nsave", 24),
    param("csv_lake_fname", S),
    param("csv_point_nlevs", I),
    param("csv_point_fname", S),
    counted("csv_point_frombot", BL, "csv_point_nlevs"),
    counted("csv_point_at", RL, "csv_point_nlevs"),
    param("csv_point_nvars", I),
    counted("csv_point_vars", SL, "csv_point_nvars"),
    param("csv_outlet_allinone", B),
    param("csv_outlet_fname", S),
    param("csv_outlet_nvars", I),
    counted("csv_outlet_vars", SL, "csv_outlet_nvars"),
    param("csv_ovrflw_fname", S),
];

const INIT_PROFILES: &[ParamSpec] = &[
    param("lake_depth", R),
    param("num_depths", I),
    counted("the_depths", RL, "num_depths"),
    counted("the_temps", RL, "num_depths"),
    counted("the_sals", RL, "num_depths"),
    param("num_wq_vars", I),
    counted("wq_names", SL, "num_wq_vars"),
    ParamSpec {
        name: "wq_init_vals",
        ty: RL,
        length: LengthRule::Product("num_wq_vars", "num_depths"),
        default: None,
    },
];

const LIGHT: &[ParamSpec] = &[
    int("light_mode", 0),
    real("Kw", 0.2),
    param("Kw_file", S),
    param("n_bands", I),
    counted("light_extc", RL, "n_bands"),
    counted("energy_frac", RL, "n_bands"),
    param("Benthic_Imin", R),
];

const BIRD_MODEL: &[ParamSpec] = &[
    param("AP", R),
    param("Oz", R),
    param("WatVap", R),
    param("AOD500", R),
    param("AOD380", R),
    param("Albedo", R),
];

const SEDIMENT: &[ParamSpec] = &[
    param("sed_heat_Ksoil", R),
    param("sed_temp_depth", R),
    counted("sed_temp_mean", RL, "n_zones"),
    counted("sed_temp_amplitude", RL, "n_zones"),
    counted("sed_temp_peak_doy", RL, "n_zones"),
    param("benthic_mode", I),
    param("n_zones", I),
    counted("zone_heights", RL, "n_zones"),
    counted("sed_reflectivity", RL, "n_zones"),
    counted("sed_roughness", RL, "n_zones"),
];

const SNOWICE: &[ParamSpec] = &[
    param("snow_albedo_factor", R),
    param("snow_rho_max", R),
    param("snow_rho_min", R),
];

const METEOROLOGY: &[ParamSpec] = &[
    flag("met_sw", true),
    param("meteo_fl", S),
    flag("subdaily", true),
    param("time_fmt", S),
    param("rad_mode", I),
    param("albedo_mode", I),
    real("sw_factor", 1.0),
    param("lw_type", S),
    param("cloud_mode", I),
    real("lw_factor", 1.0),
    param("atm_stab", I),
    real("rh_factor", 1.0),
    real("at_factor", 1.0),
    param("ce", R),
    param("ch", R),
    param("rain_sw", B),
    real("rain_factor", 1.0),
    param("catchrain", B),
    param("rain_threshold", R),
    param("runoff_coef", R),
    param("cd", R),
    real("wind_factor", 1.0),
    param("fetch_mode", I),
    param("num_dir", I),
    param("wind_dir", R),
    param("fetch_scale", R),
];

const INFLOW: &[ParamSpec] = &[
    param("num_inflows", I),
    counted("names_of_strms", SL, "num_inflows"),
    counted("subm_flag", BL, "num_inflows"),
    counted("strm_hf_angle", RL, "num_inflows"),
    counted("strmbd_slope", RL, "num_inflows"),
    counted("strmbd_drag", RL, "num_inflows"),
    counted("coef_inf_entrain", RL, "num_inflows"),
    counted("inflow_factor", RL, "num_inflows"),
    counted("inflow_fl", SL, "num_inflows"),
    param("inflow_varnum", I),
    counted("inflow_vars", SL, "inflow_varnum"),
    param("time_fmt", S),
];

const OUTFLOW: &[ParamSpec] = &[
    param("num_outlet", I),
    counted("outflow_fl", SL, "num_outlet"),
    param("time_fmt", S),
    counted("outflow_factor", RL, "num_outlet"),
    counted("outflow_thick_limit", RL, "num_outlet"),
    counted("single_layer_draw", BL, "num_outlet"),
    counted("flt_off_sw", BL, "num_outlet"),
    counted("outlet_type", IL, "num_outlet"),
    counted("outl_elvs", RL, "num_outlet"),
    counted("bsn_len_outl", RL, "num_outlet"),
    counted("bsn_wid_outl", RL, "num_outlet"),
    param("crit_O2", I),
    param("crit_O2_dep", I),
    param("crit_O2_days", I),
    param("outlet_crit", I),
    param("O2name", S),
    param("O2idx", S),
    param("target_temp", R),
    param("min_lake_temp", R),
    param("fac_range_upper", R),
    param("fac_range_lower", R),
    param("mix_withdraw", B),
    param("coupl_oxy_sw", B),
    param("withdrTemp_fl", S),
    param("seepage", B),
    param("seepage_rate", R),
    param("crest_width", R),
    param("crest_factor", R),
];

static SCHEMAS: [BlockSchema; 14] = [
    BlockSchema { kind: BlockKind::GlmSetup, params: GLM_SETUP },
    BlockSchema { kind: BlockKind::Mixing, params: MIXING },
    BlockSchema { kind: BlockKind::WqSetup, params: WQ_SETUP },
    BlockSchema { kind: BlockKind::Morphometry, params: MORPHOMETRY },
    BlockSchema { kind: BlockKind::Time, params: TIME },
    BlockSchema { kind: BlockKind::Output, params: OUTPUT },
    BlockSchema { kind: BlockKind::InitProfiles, params: INIT_PROFILES },
    BlockSchema { kind: BlockKind::Light, params: LIGHT },
    BlockSchema { kind: BlockKind::BirdModel, params: BIRD_MODEL },
    BlockSchema { kind: BlockKind::Sediment, params: SEDIMENT },
    BlockSchema { kind: BlockKind::SnowIce, params: SNOWICE },
    BlockSchema { kind: BlockKind::Meteorology, params: METEOROLOGY },
    BlockSchema { kind: BlockKind::Inflow, params: INFLOW },
    BlockSchema { kind: BlockKind::Outflow, params: OUTFLOW },
];

pub fn schema_for(kind: BlockKind) -> &'static BlockSchema {
    &SCHEMAS[kind as usize]
}

#[cfg(test)]
mod tests {
    use super::{LengthRule, ParamType, schema_for};
    use crate::domain::{BlockKind, ParamValue};

    #[test]
    fn every_block_has_a_schema_in_matching_slot() {
        for kind in BlockKind::ALL {
            let schema = schema_for(kind);
            assert_eq!(schema.kind, kind);
            assert!(!schema.params.is_empty());
        }
    }

    #[test]
    fn parameter_lookup_ignores_case() {
        let light = schema_for(BlockKind::Light);
        assert_eq!(light.param("kw").map(|spec| spec.name), Some("Kw"));
        assert_eq!(light.position("Kw"), Some(1));
        assert!(light.param("kw_value").is_none());
    }

    #[test]
    fn linked_lengths_are_declared() {
        let init = schema_for(BlockKind::InitProfiles);
        assert_eq!(
            init.param("the_temps").map(|spec| spec.length),
            Some(LengthRule::Count("num_depths"))
        );
        assert_eq!(
            init.param("wq_init_vals").map(|spec| spec.length),
            Some(LengthRule::Product("num_wq_vars", "num_depths"))
        );
    }

    #[test]
    fn coercion_promotes_without_losing_information() {
        assert_eq!(
            ParamType::Real.coerce(ParamValue::Int(3)),
            Ok(ParamValue::Real(3.0))
        );
        assert_eq!(
            ParamType::RealList.coerce(ParamValue::Real(1.5)),
            Ok(ParamValue::RealList(vec![1.5]))
        );
        assert_eq!(
            ParamType::Int.coerce(ParamValue::Real(500.0)),
            Ok(ParamValue::Int(500))
        );
        assert!(ParamType::Int.coerce(ParamValue::Real(0.5)).is_err());
        assert!(ParamType::Bool.coerce(ParamValue::Int(1)).is_err());
    }

    #[test]
    fn coercion_rejects_non_finite_and_empty_values() {
        assert!(ParamType::Real.coerce(ParamValue::Real(f64::NAN)).is_err());
        assert!(
            ParamType::RealList
                .coerce(ParamValue::RealList(vec![1.0, f64::INFINITY]))
                .is_err()
        );
        assert!(ParamType::StrList.coerce(ParamValue::StrList(Vec::new())).is_err());
    }

    #[test]
    fn datetimes_are_checked_and_normalized() {
        assert_eq!(
            ParamType::DateTime.coerce(ParamValue::from(" 1997-01-01 00:00:00 ")),
            Ok(ParamValue::DateTime("1997-01-01 00:00:00".into()))
        );
        assert_eq!(
            ParamType::DateTime.coerce(ParamValue::from("1997-01-01 12:00")),
            Ok(ParamValue::DateTime("1997-01-01 12:00:00".into()))
        );
        let reason = ParamType::DateTime
            .coerce(ParamValue::from("1997-13-01"))
            .expect_err("invalid month should be rejected");
        assert!(reason.contains("YYYY-MM-DD hh:mm:ss"));
    }
}
