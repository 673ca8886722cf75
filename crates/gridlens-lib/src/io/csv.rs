use crate::dataset::{Dataset, ProductionRecord};
use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use log::info;
use std::io::Read;
use std::path::Path;

/// Parse production rows (`priceArea,productionGroup,startTime,endTime,quantityKwh`).
pub fn read_production<R: Read>(reader: R) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();
    for (idx, result) in reader.deserialize::<ProductionRecord>().enumerate() {
        // Header is line 1.
        let record = result.with_context(|| format!("reading production row {}", idx + 2))?;
        records.push(record);
    }
    Ok(Dataset::new(records))
}

/// Load a production CSV from disk.
pub fn load_production_csv(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let dataset = read_production(file)?;
    if dataset.is_empty() {
        anyhow::bail!("no production rows found in {}", path.display());
    }
    info!(
        "loaded {} production rows from {}",
        dataset.len(),
        path.display()
    );
    Ok(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_offsets_and_empty_quantities() {
        let text = "priceArea,productionGroup,startTime,endTime,quantityKwh\n\
                    NO1,hydro,2021-01-01T01:00:00+01:00,2021-01-01T02:00:00+01:00,12.5\n\
                    NO1,hydro,2021-01-01T02:00:00+01:00,,\n";
        let ds = read_production(text.as_bytes()).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records[0].start_time.to_rfc3339(), "2021-01-01T00:00:00+00:00");
        assert_eq!(ds.records[0].quantity_kwh, Some(12.5));
        assert!(ds.records[1].end_time.is_none());
        assert!(ds.records[1].quantity_kwh.is_none());
    }

    #[test]
    fn reports_row_number_on_bad_timestamp() {
        let text = "priceArea,productionGroup,startTime,endTime,quantityKwh\n\
                    NO1,hydro,yesterday,,1.0\n";
        let err = read_production(text.as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("row 2"));
    }

    #[test]
    fn loads_fixture_file() {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let path = manifest_dir
            .parent()
            .and_then(|p| p.parent())
            .expect("workspace root")
            .join("test_data/production_sample.csv");
        let ds = load_production_csv(&path).unwrap();
        assert_eq!(ds.price_areas(), vec!["NO1", "NO2"]);
        assert_eq!(ds.production_groups(), vec!["hydro", "solar"]);
    }
}
