use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Fast profile: no cycles, holds of a few 10 ms ticks
const PROFILE: &str = r#"
[profile]
cycles = 0
cooldown_s = 0.05

[profile.activation]
temperature = 95.0
ramp_rate = 4.0
hold_s = 0.05

[profile.denature]
temperature = 98.0
ramp_rate = 4.0
hold_s = 0.05

[profile.anneal]
temperature = 60.0
ramp_rate = 4.0
hold_s = 0.05

[profile.equilibration]
temperature = 50.0
ramp_rate = 4.0
hold_s = 0.05
"#;

fn config_text(port: &str, with_profile: bool) -> String {
    let mut toml = format!(
        r#"
[device]
port = "{port}"

[sampling]
tick_ms = 10

[calibration.bottom]
offset = 0.5224
gain = 0.8228

[calibration.top]
offset = 1.5425
gain = 0.7747
"#
    );
    if with_profile {
        toml.push_str(PROFILE);
    }
    toml
}

fn write_config(dir: &tempfile::TempDir, port: &str, with_profile: bool) -> PathBuf {
    let path = dir.path().join("cfg.toml");
    fs::write(&path, config_text(port, with_profile)).unwrap();
    path
}

fn tecctl(cfg: &PathBuf) -> Command {
    let mut cmd = Command::cargo_bin("tecctl").unwrap();
    cmd.arg("--config").arg(cfg).arg("--log-level").arg("warn");
    cmd
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["self-check"], 0, "self-check complete", "stdout")]
#[case(&["run"], 0, "run complete", "stdout")]
#[case(&["monitor", "--seconds", "0.05"], 0, "5 records", "stdout")]
#[case(&["setpoint", "--temp", "60", "--seconds", "0.03"], 0, "physical bottom", "stdout")]
#[case(&["setpoint"], 2, "required", "stderr")]
#[case(&["square-wave", "--ramps", "0"], 2, "ramp rate must be > 0", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "sim", true);

    let mut cmd = tecctl(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[test]
fn run_prints_one_line_per_tick_then_summary() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "sim", true);

    let out = tecctl(&cfg).arg("run").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let lines: Vec<&str> = stdout.lines().collect();
    // activation, equilibration and cool-down: 5 ticks each
    assert_eq!(lines.len(), 16, "{stdout}");
    assert!(lines[..15].iter().all(|l| l.starts_with("t=")));
    assert!(lines[0].contains("ch1 top") && lines[0].contains("ch2 bottom"));
    assert!(lines[15].starts_with("run complete: 15 records"));
}

#[test]
fn json_mode_emits_samples_and_summary() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "sim", true);

    let out = tecctl(&cfg).arg("--json").arg("run").output().unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let values: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let (summary, samples) = values.split_last().unwrap();
    assert_eq!(samples.len(), 15);
    assert!(samples.iter().all(|v| v["sample"]["channels"].is_array()));
    assert_eq!(summary["status"], "ok");
    assert_eq!(summary["command"], "run");
    assert_eq!(summary["cycles_completed"], 0);
    assert_eq!(summary["records"], 15);
}

#[test]
fn samples_file_gets_one_object_per_record() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "sim", true);
    let samples = dir.path().join("samples.jsonl");

    tecctl(&cfg)
        .arg("--samples")
        .arg(&samples)
        .args(["monitor", "--seconds", "0.05"])
        .assert()
        .success();

    let text = fs::read_to_string(&samples).unwrap();
    let rows: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["elapsed_s"], 0.0);
    for row in &rows {
        let ch = row["channels"].as_array().unwrap();
        assert_eq!(ch.len(), 2);
        assert_eq!(ch[0]["instance"], 1);
        assert_eq!(ch[1]["zone"], "bottom");
    }
}

#[test]
fn missing_profile_is_a_config_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "sim", false);

    tecctl(&cfg)
        .arg("run")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no profile"));
}

#[test]
fn profile_file_overrides_missing_inline_profile() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "sim", false);
    let profile = dir.path().join("profile.toml");
    fs::write(&profile, PROFILE).unwrap();

    tecctl(&cfg)
        .arg("--profile")
        .arg(&profile)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("run complete: 15 records"));
}

#[test]
fn invalid_config_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(
        &path,
        config_text("sim", false).replace("tick_ms = 10", "tick_ms = 0"),
    )
    .unwrap();

    tecctl(&path)
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("tick_ms"));
}

#[test]
fn missing_config_file_exits_with_config_code() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.toml");

    tecctl(&path).arg("self-check").assert().code(2);
}

#[test]
fn unknown_port_is_a_device_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "/dev/ttyUSB9", true);

    tecctl(&cfg)
        .arg("self-check")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("no such port"));
}

#[test]
fn json_errors_are_structured() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "/dev/ttyUSB9", true);

    let out = tecctl(&cfg)
        .arg("--json")
        .arg("self-check")
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(3));
    let stderr = String::from_utf8(out.stderr).unwrap();
    let last = stderr.lines().last().unwrap();
    let v: serde_json::Value = serde_json::from_str(last).unwrap();
    assert_eq!(v["reason"], "DeviceError");
    assert!(v["message"].as_str().unwrap().contains("no such port"));
}

#[rstest]
fn cli_reports_bad_calibration_header() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "sim", true);

    let bad_csv = dir.path().join("calib.csv");
    let mut f = fs::File::create(&bad_csv).unwrap();
    writeln!(f, "unit,zone,T_offset").unwrap();
    writeln!(f, "3,top,1.5").unwrap();

    tecctl(&cfg)
        .arg("--calibration")
        .arg(&bad_csv)
        .arg("--unit")
        .arg("3")
        .arg("self-check")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unit,zone,offset,gain"));
}

#[test]
fn calibration_csv_selects_unit() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "sim", true);
    let csv = dir.path().join("calib.csv");
    fs::write(
        &csv,
        "unit,zone,offset,gain\n3,bottom,1.0,2.0\n3,top,0.0,1.0\n4,bottom,0.0,1.0\n4,top,0.0,1.0\n",
    )
    .unwrap();

    let out = tecctl(&cfg)
        .arg("--json")
        .arg("--calibration")
        .arg(&csv)
        .arg("--unit")
        .arg("3")
        .args(["setpoint", "--temp", "50"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    let v: serde_json::Value = serde_json::from_str(stdout.lines().last().unwrap()).unwrap();
    assert_eq!(v["bottom_physical"], 101.0);
    assert_eq!(v["top_physical"], 50.0);
}

#[test]
fn unknown_unit_is_a_config_error() {
    let dir = tempdir().unwrap();
    let cfg = write_config(&dir, "sim", true);
    let csv = dir.path().join("calib.csv");
    fs::write(&csv, "unit,zone,offset,gain\n3,bottom,1.0,2.0\n3,top,0.0,1.0\n").unwrap();

    tecctl(&cfg)
        .arg("--calibration")
        .arg(&csv)
        .arg("--unit")
        .arg("7")
        .arg("self-check")
        .assert()
        .code(2);
}
