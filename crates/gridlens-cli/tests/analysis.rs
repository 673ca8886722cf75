use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::error::Error;
use std::path::PathBuf;

fn sample_csv() -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("workspace root")
        .join("test_data/production_sample.csv")
        .to_string_lossy()
        .to_string()
}

fn run(args: &[&str], code: i32) -> Result<Value, Box<dyn Error>> {
    let data = sample_csv();
    let mut cmd = cargo_bin_cmd!("gridlens");
    cmd.args(["--data", &data]).args(args);
    let out = cmd.assert().code(code).get_output().stdout.clone();
    Ok(serde_json::from_slice(&out)?)
}

#[test]
fn stl_outputs_four_panel_figure() -> Result<(), Box<dyn Error>> {
    let value = run(&["stl", "--area", "NO1", "--group", "hydro"], 0)?;
    let fig = &value["figure"];
    assert_eq!(fig["title"], "STL Decomposition: hydro in NO1");
    let panels = fig["panels"].as_array().expect("panels");
    assert_eq!(panels.len(), 4);
    assert_eq!(panels[3]["y"]["label"], "Residual");
    let points = panels[0]["series"][0]["Line"]["points"]
        .as_array()
        .expect("points");
    assert_eq!(points.len(), 120);
    Ok(())
}

#[test]
fn spectrogram_outputs_power_grid() -> Result<(), Box<dyn Error>> {
    let value = run(
        &[
            "spectrogram",
            "--area",
            "NO2",
            "--group",
            "hydro",
            "--window-length",
            "48",
            "--window-overlap",
            "24",
        ],
        0,
    )?;
    let fig = &value["figure"];
    assert_eq!(
        fig["title"],
        "Spectrogram: hydro Production in NO2\nWindow: 48h, Overlap: 24h"
    );
    let map = &fig["panels"][0]["series"][0]["Heatmap"];
    // ceil((120 - 24) / 24) segments, 48 / 2 + 1 bins
    assert_eq!(map["x"].as_array().expect("times").len(), 4);
    assert_eq!(map["y"].as_array().expect("frequencies").len(), 25);
    assert_eq!(map["z"].as_array().expect("power").len(), 25);
    Ok(())
}

#[test]
fn unknown_selection_reports_no_data() -> Result<(), Box<dyn Error>> {
    let value = run(
        &[
            "stl",
            "--area",
            "nonexistent_area",
            "--group",
            "nonexistent_group",
        ],
        2,
    )?;
    assert_eq!(value["error"]["kind"], "NoData");
    assert_eq!(
        value["error"]["message"],
        "No data available for selected combination"
    );
    Ok(())
}

#[test]
fn zero_window_is_invalid() -> Result<(), Box<dyn Error>> {
    let value = run(
        &[
            "spectrogram",
            "--area",
            "NO1",
            "--group",
            "solar",
            "--window-length",
            "0",
        ],
        2,
    )?;
    assert_eq!(value["error"]["kind"], "InvalidParameters");
    assert_eq!(
        value["error"]["message"],
        "Invalid window settings for spectrogram"
    );
    Ok(())
}

#[test]
fn window_longer_than_overlap_but_series_too_short() -> Result<(), Box<dyn Error>> {
    let value = run(
        &[
            "spectrogram",
            "--area",
            "NO1",
            "--group",
            "solar",
            "--window-length",
            "400",
            "--window-overlap",
            "200",
        ],
        2,
    )?;
    assert_eq!(
        value["error"]["message"],
        "Not enough data for selected window/overlap settings"
    );
    Ok(())
}

#[test]
fn plot_filters_months_and_standardizes() -> Result<(), Box<dyn Error>> {
    let value = run(
        &[
            "plot",
            "--area",
            "NO2",
            "--group",
            "solar",
            "--from",
            "2021-02",
            "--smooth",
            "--standardize",
        ],
        0,
    )?;
    let panel = &value["figure"]["panels"][0];
    assert_eq!(panel["y"]["label"], "z-score");
    let points = panel["series"][0]["Line"]["points"]
        .as_array()
        .expect("points");
    assert_eq!(points.len(), 72);

    let value = run(
        &["plot", "--area", "NO2", "--group", "solar", "--first-month"],
        0,
    )?;
    let points = value["figure"]["panels"][0]["series"][0]["Line"]["points"]
        .as_array()
        .expect("points")
        .len();
    assert_eq!(points, 48);
    Ok(())
}

#[test]
fn plot_without_group_draws_every_group_of_the_area() -> Result<(), Box<dyn Error>> {
    let value = run(&["plot", "--area", "NO1", "--smooth", "--standardize"], 0)?;
    let fig = &value["figure"];
    assert_eq!(fig["title"], "Production in NO1");
    let panels = fig["panels"].as_array().expect("panels");
    assert_eq!(panels.len(), 1);
    assert_eq!(panels[0]["y"]["label"], "z-score");
    let series = panels[0]["series"].as_array().expect("series");
    assert_eq!(series.len(), 2);
    let names: Vec<_> = series.iter().map(|s| s["Line"]["name"].clone()).collect();
    assert_eq!(names, ["hydro", "solar"]);
    for line in series {
        let points = line["Line"]["points"].as_array().expect("points");
        assert_eq!(points.len(), 120);
    }

    let value = run(&["plot", "--area", "NO2", "--first-month"], 0)?;
    let series = value["figure"]["panels"][0]["series"]
        .as_array()
        .expect("series");
    assert_eq!(series.len(), 2);
    assert!(series
        .iter()
        .all(|s| s["Line"]["points"].as_array().map(Vec::len) == Some(48)));
    Ok(())
}

#[test]
fn first_month_summarizes_each_group() -> Result<(), Box<dyn Error>> {
    let value = run(&["first-month", "--area", "NO1"], 0)?;
    let rows = value.as_array().expect("rows");
    assert_eq!(rows.len(), 2);
    for row in rows {
        assert_eq!(row["month"]["year"], 2021);
        assert_eq!(row["month"]["month"], 1);
        assert_eq!(row["samples"], 48);
    }

    let value = run(&["first-month", "--area", "NO9"], 2)?;
    assert_eq!(value["error"]["kind"], "NoData");
    Ok(())
}

#[test]
fn bad_month_is_reported_as_invalid() -> Result<(), Box<dyn Error>> {
    let value = run(
        &["plot", "--area", "NO1", "--group", "hydro", "--from", "2021-13"],
        2,
    )?;
    assert_eq!(value["error"]["kind"], "InvalidParameters");
    Ok(())
}

#[test]
fn failed_analysis_writes_no_image() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("stl.png");
    let value = run(
        &[
            "stl",
            "--area",
            "NO9",
            "--group",
            "hydro",
            "--out",
            out.to_str().expect("utf8 path"),
        ],
        2,
    )?;
    assert_eq!(value["error"]["kind"], "NoData");
    assert!(!out.exists());
    Ok(())
}
