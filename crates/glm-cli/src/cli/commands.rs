use super::CliError;
use super::config::{
    InflowConfig, MorphometryConfig, NamelistSource, OutflowConfig, OutflowPoint, OutflowRange,
    ProjectConfig,
};
use super::helpers::*;
use glm_core::boundary::{
    FlowSeries, MetCsvConfig, Resolution, RunoffModel, derive_runoff, parse_timestamp,
    read_precipitation,
};
use glm_core::convert::{StructuredNamelist, document_to_structured};
use glm_core::domain::{BlockKind, GlmError};
use glm_core::morphometry::{MorphometryProfile, derive};
use glm_core::nml::NmlDocument;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(clap::Args)]
pub(super) struct JsonToNmlArgs {
    /// JSON file mapping block names to parameter objects
    #[arg(long)]
    input: PathBuf,

    /// Namelist output path
    #[arg(long, default_value = "glm3.nml")]
    output: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct NmlToJsonArgs {
    /// Namelist input path
    #[arg(long)]
    input: PathBuf,

    /// JSON output path (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct ValidateArgs {
    /// Namelist input path
    #[arg(long)]
    input: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct MorphometryArgs {
    /// Basin depth in metres
    #[arg(long)]
    depth: f64,

    /// Surface width in metres
    #[arg(long)]
    width: f64,

    /// Surface length in metres
    #[arg(long)]
    length: f64,

    /// Side slope as rise over run
    #[arg(long, default_value_t = 3.0)]
    slope: f64,

    /// Height increment between profile points in metres
    #[arg(long, default_value_t = 1.0)]
    step: f64,

    /// Elevation added to every height (e.g. crest level above sea level)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    datum: f64,

    /// Print the volume below each height as a third column
    #[arg(long)]
    volumes: bool,

    /// Rewrite the morphometry block of this namelist instead of printing
    #[arg(long)]
    nml: Option<PathBuf>,
}

#[derive(clap::Args)]
pub(super) struct OutflowsArgs {
    /// First timestamp (YYYY-MM-DD or YYYY-MM-DD hh:mm:ss)
    #[arg(long)]
    start: String,

    /// Last timestamp, inclusive
    #[arg(long)]
    end: String,

    /// Flow assigned to every step before overrides
    #[arg(long, default_value_t = 0.0)]
    base: f64,

    /// Build an hourly series instead of a daily one
    #[arg(long)]
    hourly: bool,

    /// Override one step, as DATE=VALUE (repeatable)
    #[arg(long = "set", value_name = "DATE=VALUE")]
    points: Vec<String>,

    /// Override an inclusive span, as FROM..TO=VALUE (repeatable)
    #[arg(long = "range", value_name = "FROM..TO=VALUE")]
    ranges: Vec<String>,

    /// Convert per-step volumes to per-second rates
    #[arg(long)]
    per_second: bool,

    /// Sum an hourly series into daily totals before writing
    #[arg(long)]
    resample_daily: bool,

    /// CSV output path
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
#[command(group(clap::ArgGroup::new("runoff").required(true).args(["runoff_coef", "runoff_threshold"])))]
pub(super) struct InflowsArgs {
    /// Meteorological CSV with a date column and a precipitation column
    #[arg(long)]
    met: PathBuf,

    /// Name of the precipitation column (metres per sample)
    #[arg(long, default_value = "Rain")]
    precip_col: String,

    /// Name of the date column
    #[arg(long, default_value = "time")]
    date_col: String,

    /// chrono format of the date column
    #[arg(long)]
    date_format: Option<String>,

    /// Catchment area in square metres
    #[arg(long)]
    catchment_area: f64,

    /// Fraction of precipitation that becomes runoff
    #[arg(long)]
    runoff_coef: Option<f64>,

    /// Daily precipitation depth that must be exceeded before runoff starts
    #[arg(long)]
    runoff_threshold: Option<f64>,

    /// Convert daily volumes to per-second rates
    #[arg(long)]
    per_second: bool,

    /// CSV output path
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
pub(super) struct BuildArgs {
    /// JSON project file
    #[arg(long)]
    project: PathBuf,
}

pub(super) fn run_json_to_nml_command(args: JsonToNmlArgs) -> Result<i32, CliError> {
    let document = StructuredNamelist::from_path(&args.input)?.to_document()?;
    document.write(&args.output)?;

    println!(
        "wrote {} ({} blocks)",
        args.output.display(),
        document.len()
    );
    Ok(0)
}

pub(super) fn run_nml_to_json_command(args: NmlToJsonArgs) -> Result<i32, CliError> {
    let text = read_input_text(&args.input)?;
    let document = NmlDocument::from_text(&text)?;
    let json = encode_structured_json(&document)?;

    match args.output {
        Some(path) => {
            write_output_text(&path, &(json + "\n"))?;
            println!("wrote {} ({} blocks)", path.display(), document.len());
        }
        None => println!("{}", json),
    }
    Ok(0)
}

fn encode_structured_json(document: &NmlDocument) -> Result<String, GlmError> {
    serde_json::to_string_pretty(&Value::Object(document_to_structured(document)))
        .map_err(|error| {
            GlmError::internal(format!("failed to encode namelist as JSON: {}", error))
        })
}

pub(super) fn run_validate_command(args: ValidateArgs) -> Result<i32, CliError> {
    let text = read_input_text(&args.input)?;
    let document = NmlDocument::from_text(&text)?;
    document.validate()?;

    println!(
        "{}: ok ({})",
        args.input.display(),
        document.block_names().join(", ")
    );
    Ok(0)
}

pub(super) fn run_morphometry_command(args: MorphometryArgs) -> Result<i32, CliError> {
    let config = MorphometryConfig {
        depth: args.depth,
        width: args.width,
        length: args.length,
        slope: args.slope,
        step: args.step,
        datum: args.datum,
    };
    let profile = derive_morphometry(&config)?;

    if let Some(path) = args.nml {
        let mut document = NmlDocument::from_text(&read_input_text(&path)?)?;
        profile.apply_to(document.block_or_insert(BlockKind::Morphometry), config.datum)?;
        document.write(&path)?;
        println!("updated {} ({} profile points)", path.display(), profile.len());
        return Ok(0);
    }

    print!("{}", render_profile_table(&profile, config.datum, args.volumes));
    Ok(0)
}

pub(super) fn run_outflows_command(args: OutflowsArgs) -> Result<i32, CliError> {
    let points = args
        .points
        .iter()
        .map(|spec| {
            parse_point_spec(spec).map(|(timestamp, value)| OutflowPoint {
                date: timestamp.to_string(),
                value,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let ranges = args
        .ranges
        .iter()
        .map(|spec| {
            parse_range_spec(spec).map(|(from, to, value)| OutflowRange {
                from: from.to_string(),
                to: to.to_string(),
                value,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let config = OutflowConfig {
        start: args.start,
        end: args.end,
        base: args.base,
        resolution: if args.hourly {
            Resolution::Hourly
        } else {
            Resolution::Daily
        },
        points,
        ranges,
        per_second: args.per_second,
        resample_daily: args.resample_daily,
        file: args.output.display().to_string(),
    };
    let series = build_outflow_series(&config)?;
    series.write(&args.output, false)?;

    println!("wrote {} ({} rows)", args.output.display(), series.len());
    Ok(0)
}

pub(super) fn run_inflows_command(args: InflowsArgs) -> Result<i32, CliError> {
    let config = InflowConfig {
        met: args.met,
        date_col: args.date_col,
        precip_col: args.precip_col,
        date_format: args.date_format,
        catchment_area: args.catchment_area,
        runoff_coef: args.runoff_coef,
        runoff_threshold: args.runoff_threshold,
        per_second: args.per_second,
        file: args.output.display().to_string(),
    };
    let series = build_inflow_series(&config)?;
    series.write(&args.output, false)?;

    println!("wrote {} ({} rows)", args.output.display(), series.len());
    Ok(0)
}

pub(super) fn run_build_command(args: BuildArgs) -> Result<i32, CliError> {
    let project = ProjectConfig::load(&args.project)?;
    let mut document = load_project_namelist(&project.namelist)?;

    if let Some(morphometry) = &project.morphometry {
        let profile = derive_morphometry(morphometry)?;
        profile.apply_to(document.block_or_insert(BlockKind::Morphometry), morphometry.datum)?;
    }

    // Every input is checked before the first file is written.
    document.validate()?;
    let outflow = project
        .outflow
        .as_ref()
        .map(|config| build_outflow_series(config).map(|series| (config.file.as_str(), series)))
        .transpose()?;
    let inflow = project
        .inflow
        .as_ref()
        .map(|config| build_inflow_series(config).map(|series| (config.file.as_str(), series)))
        .transpose()?;

    ensure_directory(&project.output_dir)?;
    let nml_path = project.output_dir.join(&project.nml_file);
    document.write(&nml_path)?;
    println!("wrote {} ({} blocks)", nml_path.display(), document.len());

    for (file, series) in outflow.iter().chain(inflow.iter()) {
        let path = project.output_dir.join(file);
        series.write(&path, false)?;
        println!("wrote {} ({} rows)", path.display(), series.len());
    }

    info!(project = %args.project.display(), "build finished");
    Ok(0)
}

fn load_project_namelist(source: &NamelistSource) -> Result<NmlDocument, CliError> {
    let document = match source {
        NamelistSource::Inline(blocks) => {
            StructuredNamelist::from_value(Value::Object(blocks.clone()))?.to_document()?
        }
        NamelistSource::File(path) if has_extension(path, "nml") => {
            NmlDocument::from_text(&read_input_text(path)?)?
        }
        NamelistSource::File(path) => StructuredNamelist::from_path(path)?.to_document()?,
    };
    Ok(document)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|value| value.to_str())
        .is_some_and(|value| value.eq_ignore_ascii_case(extension))
}

fn derive_morphometry(config: &MorphometryConfig) -> Result<MorphometryProfile, CliError> {
    Ok(derive(
        config.depth,
        config.width,
        config.length,
        config.slope,
        config.step,
    )?)
}

fn render_profile_table(profile: &MorphometryProfile, datum: f64, volumes: bool) -> String {
    let mut table = String::from(if volumes {
        "height,area,volume\n"
    } else {
        "height,area\n"
    });
    for point in profile.points() {
        let height = point.height + datum;
        if volumes {
            table.push_str(&format!("{},{},{}\n", height, point.area, point.volume));
        } else {
            table.push_str(&format!("{},{}\n", height, point.area));
        }
    }
    table
}

/// Base series, then ranges, then single points; later overrides win. The
/// result is ready to write without further resampling when
/// `resample_daily` is set.
fn build_outflow_series(config: &OutflowConfig) -> Result<FlowSeries, CliError> {
    let start = parse_timestamp(&config.start)?;
    let end = parse_timestamp(&config.end)?;
    let mut series = FlowSeries::with_resolution(start, end, config.resolution, config.base)?;

    for range in &config.ranges {
        series.set_range(
            parse_timestamp(&range.from)?,
            parse_timestamp(&range.to)?,
            range.value,
        )?;
    }

    if !config.points.is_empty() {
        let timestamps = config
            .points
            .iter()
            .map(|point| parse_timestamp(&point.date))
            .collect::<Result<Vec<_>, _>>()?;
        let values: Vec<f64> = config.points.iter().map(|point| point.value).collect();
        series.set_discrete(&timestamps, &values)?;
    }

    if config.resample_daily {
        series = series.daily_totals();
    }
    if config.per_second {
        series = series.to_rate_per_second();
    }
    debug!(
        rows = series.len(),
        resolution = %series.resolution(),
        "built outflow series"
    );
    Ok(series)
}

fn build_inflow_series(config: &InflowConfig) -> Result<FlowSeries, CliError> {
    let model = RunoffModel::from_options(config.runoff_coef, config.runoff_threshold)?;

    let mut csv = MetCsvConfig::default().with_columns(&config.date_col, &config.precip_col);
    if let Some(format) = &config.date_format {
        csv = csv.with_time_format(format);
    }
    let precipitation = read_precipitation(&config.met, &csv)?;

    let mut series = derive_runoff(&precipitation, config.catchment_area, model)?;
    if config.per_second {
        series = series.to_rate_per_second();
    }
    debug!(rows = series.len(), model = model.label(), "built inflow series");
    Ok(series)
}
