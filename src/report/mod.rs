//! Report writer
//!
//! A report is a directory:
//!
//! ```text
//! out/
//! ├── index.html     the page (see [`html`])
//! ├── report.json    {"samples": {...}, "summary_data": [...]}
//! └── plots/         per-genome detail fragments
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use gunc_viz::{report, ReportData};
//!
//! report::generate("gunc-report", &data)?;
//! let data = report::load("gunc-report")?;
//! ```

pub mod html;

use crate::error::{Error, Result};
use crate::record::ReportData;
use chrono::Local;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub const INDEX_FILE: &str = "index.html";
pub const DATA_FILE: &str = "report.json";
pub const DEFAULT_TITLE: &str = "GUNC quality report";

#[derive(Serialize)]
struct ReportFile<'a> {
    generated_at: &'a str,
    #[serde(flatten)]
    data: &'a ReportData,
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path).map(BufWriter::new).map_err(|e| Error::io(path, e))
}

/// Write `index.html` and `report.json` into `out`, creating it if needed.
/// Returns the path of the page.
pub fn generate<P: AsRef<Path>>(out: P, data: &ReportData) -> Result<PathBuf> {
    let out = out.as_ref();
    fs::create_dir_all(out).map_err(|e| Error::io(out, e))?;
    let generated_at = Local::now().to_rfc3339();

    let data_path = out.join(DATA_FILE);
    let mut writer = create(&data_path)?;
    serde_json::to_writer_pretty(
        &mut writer,
        &ReportFile {
            generated_at: &generated_at,
            data,
        },
    )?;
    writer.flush().map_err(|e| Error::io(&data_path, e))?;

    let index_path = out.join(INDEX_FILE);
    let mut writer = create(&index_path)?;
    html::write(&mut writer, data, DEFAULT_TITLE, &generated_at)
        .and_then(|_| writer.flush())
        .map_err(|e| Error::io(&index_path, e))?;

    tracing::info!(
        out = %out.display(),
        records = data.records.len(),
        samples = data.groups.len(),
        "report written"
    );
    Ok(index_path)
}

/// Read the data of a report written by [`generate`].
pub fn load<P: AsRef<Path>>(report_dir: P) -> Result<ReportData> {
    ReportData::load(report_dir.as_ref().join(DATA_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::QualityRecord;
    use tempfile::TempDir;

    // ==========================================================================
    // REPORT DIRECTORY
    // ==========================================================================

    fn data() -> ReportData {
        ReportData::from_records(vec![
            QualityRecord::new("S1", "magA", "kingdom").with_scores(0.9, 0.05).with_passed(true),
            QualityRecord::new("S2", "magB", "kingdom").with_scores(0.6, 0.4),
        ])
    }

    #[test]
    fn test_generate_writes_both_files() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("nested/report");
        let index = generate(&out, &data()).unwrap();

        assert_eq!(index, out.join(INDEX_FILE));
        assert!(index.is_file());
        assert!(out.join(DATA_FILE).is_file());
    }

    #[test]
    fn test_data_file_shape() {
        let tmp = TempDir::new().unwrap();
        generate(tmp.path(), &data()).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(tmp.path().join(DATA_FILE)).unwrap()).unwrap();

        assert_eq!(json["samples"]["S1"], serde_json::json!(["magA"]));
        assert_eq!(json["summary_data"][0]["mag_id"], "magA");
        assert_eq!(json["summary_data"][0]["pass_gunc"], true);
        assert!(json["generated_at"].is_string());
    }

    #[test]
    fn test_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let original = data();
        generate(tmp.path(), &original).unwrap();
        let loaded = load(tmp.path()).unwrap();

        assert_eq!(loaded.records, original.records);
        assert_eq!(loaded.groups, original.groups);
    }

    #[test]
    fn test_load_missing_report() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(load(tmp.path()), Err(Error::Io { .. })));
    }
}
