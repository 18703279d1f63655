use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const LAKE_JSON: &str = r#"
{
  "glm_setup": { "sim_name": "Sparkling", "max_layers": 500, "min_layer_vol": 0.5 },
  "morphometry": {
    "lake_name": "Sparkling",
    "latitude": 46.0,
    "longitude": -89.7,
    "bsn_vals": 3,
    "H": [-4, -2, 0],
    "A": [100, 2500, 6400]
  },
  "time": {
    "timefmt": 2,
    "start": "1997-01-01 12:00:00",
    "stop": "1997-02-01 12:00:00",
    "dt": 3600
  },
  "init_profiles": {
    "lake_depth": 4,
    "num_depths": 2,
    "the_depths": [1, 3],
    "the_temps": [4.0, 4.5],
    "the_sals": [0, 0]
  }
}
"#;

fn glmkit(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_glmkit"))
        .args(args)
        .output()
        .expect("glmkit should launch")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("temp paths should be valid UTF-8")
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent dir should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn json_to_nml_and_back_preserves_parameters() {
    let temp = TempDir::new().expect("tempdir should be created");
    let json_path = temp.path().join("lake.json");
    let nml_path = temp.path().join("glm3.nml");
    let back_path = temp.path().join("back.json");
    write_file(&json_path, LAKE_JSON);

    let output = glmkit(&[
        "json-to-nml",
        "--input",
        path_arg(&json_path),
        "--output",
        path_arg(&nml_path),
    ]);
    assert_success(&output);

    let nml = fs::read_to_string(&nml_path).expect("namelist should be written");
    assert!(nml.starts_with("&glm_setup\n   sim_name = 'Sparkling'\n"));
    assert!(nml.contains("   H = -4.0, -2.0, 0.0\n"));
    assert!(nml.contains("   start = '1997-01-01 12:00:00'\n"));
    let setup = nml.find("&glm_setup").expect("glm_setup should render");
    let morphometry = nml.find("&morphometry").expect("morphometry should render");
    let time = nml.find("&time").expect("time should render");
    let init = nml.find("&init_profiles").expect("init_profiles should render");
    assert!(setup < morphometry && morphometry < time && time < init);

    let output = glmkit(&[
        "nml-to-json",
        "--input",
        path_arg(&nml_path),
        "--output",
        path_arg(&back_path),
    ]);
    assert_success(&output);

    let parsed: Value = serde_json::from_str(
        &fs::read_to_string(&back_path).expect("json should be written"),
    )
    .expect("json output should parse");
    assert_eq!(parsed["&glm_setup"]["sim_name"], "Sparkling");
    assert_eq!(parsed["&morphometry"]["bsn_vals"], 3);
    assert_eq!(parsed["&morphometry"]["A"][2].as_f64(), Some(6400.0));
    assert_eq!(parsed["&time"]["start"], "1997-01-01 12:00:00");
}

#[test]
fn nml_to_json_prints_to_stdout_without_output() {
    let temp = TempDir::new().expect("tempdir should be created");
    let nml_path = temp.path().join("light.nml");
    write_file(
        &nml_path,
        "! light only\n&light\n   light_mode = 0\n   Kw = 0.57 ! extinction\n/\n",
    );

    let output = glmkit(&["nml-to-json", "--input", path_arg(&nml_path)]);
    assert_success(&output);

    let parsed: Value =
        serde_json::from_slice(&output.stdout).expect("stdout should hold a JSON mapping");
    assert_eq!(parsed["&light"]["Kw"].as_f64(), Some(0.57));
}

#[test]
fn validate_reports_missing_blocks_with_input_exit_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let nml_path = temp.path().join("glm3.nml");
    write_file(
        &nml_path,
        "&glm_setup\n   sim_name = 'x'\n/\n&init_profiles\n   lake_depth = 4.0\n/\n",
    );

    let output = glmkit(&["validate", "--input", path_arg(&nml_path)]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("ERROR: [INPUT.MISSING_BLOCK]"), "stderr: {stderr}");
    assert!(stderr.contains("&morphometry"));
    assert!(stderr.contains("&time"));
    assert!(stderr.contains("FATAL EXIT CODE: 2"));
}

#[test]
fn json_to_nml_rejects_unknown_parameters_without_writing() {
    let temp = TempDir::new().expect("tempdir should be created");
    let json_path = temp.path().join("bad.json");
    let nml_path = temp.path().join("glm3.nml");
    write_file(&json_path, r#"{ "time": { "timefmt": 2, "bogus": 1 } }"#);

    let output = glmkit(&[
        "json-to-nml",
        "--input",
        path_arg(&json_path),
        "--output",
        path_arg(&nml_path),
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("INPUT.UNKNOWN_PARAMETER"));
    assert!(!nml_path.exists(), "no namelist should be written");
}

#[test]
fn missing_input_file_is_an_io_failure() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = glmkit(&[
        "validate",
        "--input",
        path_arg(&temp.path().join("absent.nml")),
    ]);

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("[IO.SYSTEM]"));
}

#[test]
fn morphometry_prints_profile_table() {
    let output = glmkit(&[
        "morphometry",
        "--depth",
        "5",
        "--width",
        "40",
        "--length",
        "62",
        "--slope",
        "3",
    ]);
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.first().copied(), Some("height,area"));
    assert_eq!(lines.len(), 7);
    assert_eq!(lines[1].split(',').next(), Some("-5"));
    let (height, area) = lines[6]
        .split_once(',')
        .expect("surface row should have two columns");
    assert_eq!(height, "0");
    let area: f64 = area.parse().expect("area should be numeric");
    assert!((area - 2480.0).abs() < 1e-6);
}

#[test]
fn morphometry_rewrites_the_namelist_block() {
    let temp = TempDir::new().expect("tempdir should be created");
    let json_path = temp.path().join("lake.json");
    let nml_path = temp.path().join("glm3.nml");
    write_file(&json_path, LAKE_JSON);
    assert_success(&glmkit(&[
        "json-to-nml",
        "--input",
        path_arg(&json_path),
        "--output",
        path_arg(&nml_path),
    ]));

    let output = glmkit(&[
        "morphometry",
        "--depth",
        "5",
        "--width",
        "40",
        "--length",
        "62",
        "--nml",
        path_arg(&nml_path),
    ]);
    assert_success(&output);

    let nml = fs::read_to_string(&nml_path).expect("namelist should be readable");
    assert!(nml.contains("   bsn_vals = 6\n"));
    assert!(nml.contains("   H = -5.0, -4.0, -3.0, -2.0, -1.0, 0.0\n"));
    assert!(nml.contains("   lake_name = 'Sparkling'\n"));
}

#[test]
fn outflows_writes_daily_series_with_overrides() {
    let temp = TempDir::new().expect("tempdir should be created");
    let csv_path = temp.path().join("outflow.csv");

    let output = glmkit(&[
        "outflows",
        "--start",
        "1997-01-01",
        "--end",
        "1997-01-11",
        "--set",
        "1997-01-05=1.2",
        "--range",
        "1997-01-08..1997-01-09=0.5",
        "--output",
        path_arg(&csv_path),
    ]);
    assert_success(&output);

    let csv = fs::read_to_string(&csv_path).expect("outflow csv should be written");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 12);
    assert_eq!(lines[0], "time,flow");
    assert_eq!(lines[1], "1997-01-01,0");
    assert_eq!(lines[5], "1997-01-05,1.2");
    assert_eq!(lines[8], "1997-01-08,0.5");
    assert_eq!(lines[9], "1997-01-09,0.5");
    assert_eq!(lines[11], "1997-01-11,0");
}

#[test]
fn outflows_rejects_dates_outside_the_series() {
    let temp = TempDir::new().expect("tempdir should be created");
    let csv_path = temp.path().join("outflow.csv");

    let output = glmkit(&[
        "outflows",
        "--start",
        "1997-01-01",
        "--end",
        "1997-01-11",
        "--set",
        "1997-02-01=1.0",
        "--output",
        path_arg(&csv_path),
    ]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("INPUT.DATE_OUT_OF_RANGE"));
    assert!(!csv_path.exists());
}

#[test]
fn hourly_outflows_require_resampling() {
    let temp = TempDir::new().expect("tempdir should be created");
    let csv_path = temp.path().join("outflow.csv");
    let base_args = [
        "outflows",
        "--start",
        "2020-01-01 00:00:00",
        "--end",
        "2020-01-02 23:00:00",
        "--hourly",
        "--base",
        "1",
        "--output",
        path_arg(&csv_path),
    ];

    let output = glmkit(&base_args);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("INPUT.RESOLUTION"));

    let mut resampled = base_args.to_vec();
    resampled.push("--resample-daily");
    assert_success(&glmkit(&resampled));
    let csv = fs::read_to_string(&csv_path).expect("resampled csv should be written");
    assert_eq!(csv, "time,flow\n2020-01-01,24\n2020-01-02,24\n");
}

#[test]
fn inflows_apply_runoff_threshold() {
    let temp = TempDir::new().expect("tempdir should be created");
    let met_path = temp.path().join("met.csv");
    let csv_path = temp.path().join("inflow.csv");
    write_file(
        &met_path,
        "Date,Rain\n1997-01-01,0.05\n1997-01-02,0.005\n",
    );

    let output = glmkit(&[
        "inflows",
        "--met",
        path_arg(&met_path),
        "--date-col",
        "Date",
        "--catchment-area",
        "1000",
        "--runoff-threshold",
        "0.01",
        "--output",
        path_arg(&csv_path),
    ]);
    assert_success(&output);

    let csv = fs::read_to_string(&csv_path).expect("inflow csv should be written");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "time,flow");
    let first: f64 = lines[1]
        .split(',')
        .nth(1)
        .and_then(|value| value.parse().ok())
        .expect("first row should hold a number");
    assert!((first - 40.0).abs() < 1e-9);
    assert_eq!(lines[2], "1997-01-02,0");
}

#[test]
fn inflows_require_exactly_one_runoff_model() {
    let temp = TempDir::new().expect("tempdir should be created");
    let met_path = temp.path().join("met.csv");
    write_file(&met_path, "time,Rain\n1997-01-01,0.05\n");

    let output = glmkit(&[
        "inflows",
        "--met",
        path_arg(&met_path),
        "--catchment-area",
        "1000",
        "--output",
        path_arg(&temp.path().join("inflow.csv")),
    ]);

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn build_writes_namelist_and_boundary_files() {
    let temp = TempDir::new().expect("tempdir should be created");
    write_file(&temp.path().join("lake.json"), LAKE_JSON);
    write_file(
        &temp.path().join("data/met.csv"),
        "time,Rain\n1997-01-01 00:00,0.01\n1997-01-01 12:00,0.01\n1997-01-02 00:00,0\n",
    );
    let project = temp.path().join("project.json");
    write_file(
        &project,
        r#"{
            "namelist": "lake.json",
            "morphometry": { "depth": 4, "width": 40, "length": 62, "step": 2 },
            "outflow": {
                "start": "1997-01-01",
                "end": "1997-01-03",
                "base": 2.0,
                "points": [{ "date": "1997-01-02", "value": 5.0 }]
            },
            "inflow": { "met": "data/met.csv", "catchment_area": 1000, "runoff_coef": 0.5 },
            "output_dir": "run"
        }"#,
    );

    let output = glmkit(&["build", "--project", path_arg(&project)]);
    assert_success(&output);

    let run_dir = temp.path().join("run");
    let nml = fs::read_to_string(run_dir.join("glm3.nml")).expect("namelist should be built");
    assert!(nml.contains("   H = -4.0, -2.0, 0.0\n"));
    assert_eq!(
        fs::read_to_string(run_dir.join("outflow.csv")).expect("outflow should be built"),
        "time,flow\n1997-01-01,2\n1997-01-02,5\n1997-01-03,2\n"
    );
    assert_eq!(
        fs::read_to_string(run_dir.join("inflow.csv")).expect("inflow should be built"),
        "time,flow\n1997-01-01,10\n1997-01-02,0\n"
    );
}

#[test]
fn build_writes_nothing_when_the_namelist_is_invalid() {
    let temp = TempDir::new().expect("tempdir should be created");
    let project = temp.path().join("project.json");
    write_file(
        &project,
        r#"{
            "namelist": { "time": { "timefmt": 2 } },
            "outflow": { "start": "1997-01-01", "end": "1997-01-03" },
            "output_dir": "run"
        }"#,
    );

    let output = glmkit(&["build", "--project", path_arg(&project)]);

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("INPUT.MISSING_BLOCK"));
    assert!(!temp.path().join("run").exists());
}
