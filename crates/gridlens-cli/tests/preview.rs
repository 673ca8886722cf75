use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::error::Error;
use std::path::PathBuf;

#[derive(Deserialize)]
struct PreviewOutput {
    rows: Vec<serde_json::Value>,
    row_count: usize,
    column_count: usize,
    price_areas: Vec<String>,
    production_groups: Vec<String>,
}

fn sample_csv() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join("test_data/production_sample.csv")
        .to_string_lossy()
        .to_string()
}

#[test]
fn preview_lists_shape_and_keys() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("gridlens");
    cmd.args(["preview", "--data", &sample_csv(), "--rows", "3"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let value: PreviewOutput = serde_json::from_slice(&out)?;
    assert_eq!(value.rows.len(), 3);
    assert_eq!(value.row_count, 480);
    assert_eq!(value.column_count, 5);
    assert_eq!(value.price_areas, ["NO1", "NO2"]);
    assert_eq!(value.production_groups, ["hydro", "solar"]);
    assert!(value.rows[0].get("priceArea").is_some());
    Ok(())
}

#[test]
fn preview_rows_come_from_config() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let config = dir.path().join("gridlens.toml");
    std::fs::write(
        &config,
        format!("preview_rows = 2\ndata_path = {:?}\n", sample_csv()),
    )?;
    let mut cmd = cargo_bin_cmd!("gridlens");
    cmd.args(["preview", "--config", config.to_str().expect("utf8 path")]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let value: PreviewOutput = serde_json::from_slice(&out)?;
    assert_eq!(value.rows.len(), 2);
    Ok(())
}

#[test]
fn missing_dataset_is_a_hard_failure() {
    let mut cmd = cargo_bin_cmd!("gridlens");
    cmd.args(["preview", "--data", "/nonexistent/production.csv"]);
    cmd.assert().failure().code(1);

    let mut cmd = cargo_bin_cmd!("gridlens");
    cmd.arg("preview");
    cmd.assert().failure();
}

#[test]
fn help_text_prints_one_topic() {
    let mut cmd = cargo_bin_cmd!("gridlens");
    cmd.args(["help-text", "spectrogram-key-frequencies"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8_lossy(&out);
    assert!(text.contains("0.042 cycles/hour"));
    assert!(!text.contains("STL decomposes"));
}
