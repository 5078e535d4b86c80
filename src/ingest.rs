//! GUNC results directory scanner
//!
//! Accepts either a directory of per-sample results or a single flat result:
//!
//! ```text
//! results/                         results/
//! ├── sample1/                     ├── gunc_output/
//! │   ├── gunc_output/             │   └── *.all_levels.tsv
//! │   │   └── *.all_levels.tsv     ├── diamond_output/
//! │   ├── diamond_output/          └── plots/*.viz.html
//! │   └── plots/*.viz.html
//! └── sample2/ ...                 (one sample, id "")
//! ```
//!
//! Every row of every `*.all_levels.tsv` becomes a [`QualityRecord`]. The
//! genomes offered for drill-down come from the detail fragments already
//! rendered under `plots/`, else from the diamond outputs, else from the
//! table itself.

use crate::error::{Error, Result};
use crate::fragment::{Mode, FRAGMENT_SUFFIX, PLOTS_DIR};
use crate::record::{GroupIndex, QualityRecord, ReportData};
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const GUNC_OUTPUT_DIR: &str = "gunc_output";
pub const DIAMOND_OUTPUT_DIR: &str = "diamond_output";
pub const ALL_LEVELS_SUFFIX: &str = ".all_levels.tsv";

/// GUNC column names that differ from the report field names
const COLUMN_RENAMES: [(&str, &str); 2] = [("genome", "mag_id"), ("pass.GUNC", "pass_gunc")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleDir {
    /// `""` for a flat result
    pub sample_id: String,
    pub path: PathBuf,
}

/// Everything read from one sample directory
#[derive(Debug, Clone)]
pub struct SampleResult {
    pub sample_id: String,
    pub records: Vec<QualityRecord>,
    /// Sorted, deduplicated genome ids
    pub entities: Vec<String>,
    /// Rendered detail fragments, keyed by genome id
    pub fragments: Vec<(String, PathBuf)>,
}

fn is_result_dir(path: &Path) -> bool {
    path.join(GUNC_OUTPUT_DIR).is_dir() || path.join(DIAMOND_OUTPUT_DIR).is_dir()
}

/// Find the sample directories under `results`.
pub fn discover(results: &Path) -> Result<Vec<SampleDir>> {
    let meta = fs::metadata(results).map_err(|e| Error::io(results, e))?;
    if !meta.is_dir() {
        return Err(Error::io(
            results,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory"),
        ));
    }

    if is_result_dir(results) {
        return Ok(vec![SampleDir {
            sample_id: String::new(),
            path: results.to_path_buf(),
        }]);
    }

    let samples: Vec<SampleDir> = WalkDir::new(results)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir() && is_result_dir(e.path()))
        .filter_map(|e| {
            let sample_id = e.file_name().to_str()?.to_string();
            Some(SampleDir {
                sample_id,
                path: e.into_path(),
            })
        })
        .collect();

    tracing::debug!(results = %results.display(), samples = samples.len(), "discovered samples");
    Ok(samples)
}

/// Files directly inside `dir` whose name ends with `suffix`, sorted by name
fn files_with_suffix(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    if !dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_str().is_some_and(|n| n.ends_with(suffix)))
        .map(|e| e.into_path())
        .collect()
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or_default()
}

/// Parse one `*.all_levels.tsv` table.
///
/// Cells go through the same lenient deserialization as injected report
/// data: metrics may be numeric strings, `pass.GUNC` is normalized once,
/// unknown columns are kept as strings.
pub fn parse_all_levels(text: &str, path: &Path, sample_id: &str) -> Result<Vec<QualityRecord>> {
    let table_error = |line: usize, message: String| Error::Table {
        path: path.to_path_buf(),
        line,
        message,
    };

    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end_matches('\r')))
        .filter(|(_, l)| !l.trim().is_empty());

    let Some((_, header)) = lines.next() else {
        return Ok(Vec::new());
    };
    let columns: Vec<String> = header
        .split('\t')
        .map(|c| {
            let c = c.trim();
            COLUMN_RENAMES
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
                .to_string()
        })
        .collect();

    for (field, column) in [("mag_id", "genome"), ("taxonomic_level", "taxonomic_level")] {
        if !columns.iter().any(|c| c == field) {
            return Err(table_error(1, format!("missing column `{}`", column)));
        }
    }

    let mut records = Vec::new();
    for (line, row) in lines {
        let cells: Vec<&str> = row.split('\t').collect();
        if cells.len() != columns.len() {
            return Err(table_error(
                line,
                format!("expected {} columns, found {}", columns.len(), cells.len()),
            ));
        }

        let mut object: Map<String, Value> = columns
            .iter()
            .zip(&cells)
            .map(|(c, v)| (c.clone(), Value::String(v.trim().to_string())))
            .collect();
        object.insert("sample_id".to_string(), Value::String(sample_id.to_string()));

        let record: QualityRecord = serde_json::from_value(Value::Object(object))
            .map_err(|e| table_error(line, e.to_string()))?;
        records.push(record);
    }
    Ok(records)
}

fn read_all_levels(path: &Path, sample_id: &str) -> Result<Vec<QualityRecord>> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    parse_all_levels(&text, path, sample_id)
}

/// Read the tables, fragments and genome list of one sample.
pub fn scan_sample(dir: &SampleDir) -> Result<SampleResult> {
    let mut records = Vec::new();
    for table in files_with_suffix(&dir.path.join(GUNC_OUTPUT_DIR), ALL_LEVELS_SUFFIX) {
        records.extend(read_all_levels(&table, &dir.sample_id)?);
    }

    let fragments: Vec<(String, PathBuf)> = files_with_suffix(&dir.path.join(PLOTS_DIR), FRAGMENT_SUFFIX)
        .into_iter()
        .filter_map(|p| {
            let entity = file_name(&p).strip_suffix(FRAGMENT_SUFFIX)?.to_string();
            Some((entity, p))
        })
        .collect();

    let entities: BTreeSet<String> = if !fragments.is_empty() {
        fragments.iter().map(|(entity, _)| entity.clone()).collect()
    } else {
        let diamond: BTreeSet<String> = files_with_suffix(&dir.path.join(DIAMOND_OUTPUT_DIR), "")
            .iter()
            .filter_map(|p| file_name(p).split('.').next())
            .filter(|stem| !stem.is_empty())
            .map(str::to_string)
            .collect();
        if diamond.is_empty() {
            records.iter().map(|r| r.entity_id.clone()).collect()
        } else {
            diamond
        }
    };

    if records.is_empty() {
        tracing::warn!(sample = %dir.sample_id, path = %dir.path.display(), "no GUNC summary tables found");
    }

    Ok(SampleResult {
        sample_id: dir.sample_id.clone(),
        records,
        entities: entities.into_iter().collect(),
        fragments,
    })
}

/// Scan every sample in parallel. `on_sample` is called from worker threads
/// as each sample finishes.
pub fn scan<F>(samples: &[SampleDir], on_sample: F) -> Result<Vec<SampleResult>>
where
    F: Fn(&SampleResult) + Sync,
{
    samples
        .par_iter()
        .map(|dir| {
            let result = scan_sample(dir)?;
            on_sample(&result);
            Ok(result)
        })
        .collect()
}

/// Fold scanned samples into the data injected into the report.
pub fn assemble(samples: &[SampleResult]) -> ReportData {
    let mut groups = GroupIndex::new();
    let mut records = Vec::new();
    for sample in samples {
        groups.insert(sample.sample_id.clone(), sample.entities.clone());
        records.extend(sample.records.iter().cloned());
    }
    ReportData::new(records, groups)
}

/// Copy every rendered fragment to where the viewer will look for it.
/// Returns the number of files copied.
pub fn copy_fragments(samples: &[SampleResult], out: &Path, mode: Mode) -> Result<usize> {
    let mut copied = 0;
    for sample in samples {
        for (entity, source) in &sample.fragments {
            let dest = out.join(mode.detail_path(&sample.sample_id, entity));
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            fs::copy(source, &dest).map_err(|e| Error::io(source, e))?;
            copied += 1;
        }
    }
    tracing::debug!(copied, out = %out.display(), "copied detail fragments");
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const HEADER: &str = "genome\tn_genes_called\tn_genes_mapped\tn_contigs\ttaxonomic_level\tproportion_genes_retained_in_major_clades\tgenes_retained_index\tclade_separation_score\tcontamination_portion\tn_effective_surplus_clades\tmean_hit_identity\treference_representation_score\tpass.GUNC";

    fn row(genome: &str, level: &str, contamination: &str, rrs: &str, pass: &str) -> String {
        format!(
            "{}\t2000\t1900\t40\t{}\t0.98\t0.93\t0.1\t{}\t0.05\t0.95\t{}\t{}",
            genome, level, contamination, rrs, pass
        )
    }

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn sample_tree(root: &Path, sample: &str, genomes: &[&str], with_plots: bool) {
        let base = if sample.is_empty() { root.to_path_buf() } else { root.join(sample) };
        let mut table = vec![HEADER.to_string()];
        for g in genomes {
            table.push(row(g, "kingdom", "0.01", "0.9", "True"));
            table.push(row(g, "species", "0.2", "0.7", "False"));
        }
        write(&base.join(GUNC_OUTPUT_DIR).join("x.all_levels.tsv"), &table.join("\n"));
        for g in genomes {
            write(&base.join(DIAMOND_OUTPUT_DIR).join(format!("{}.diamond.out", g)), "");
            if with_plots {
                write(&base.join(PLOTS_DIR).join(format!("{}.viz.html", g)), &format!("<p>{}</p>", g));
            }
        }
    }

    // ==========================================================================
    // TABLE PARSING
    // ==========================================================================

    #[test]
    fn test_parse_all_levels() {
        let text = format!("{}\n{}\n", HEADER, row("mag1", "kingdom", "0.02", "0.91", "True"));
        let records = parse_all_levels(&text, Path::new("t.tsv"), "S1").unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.sample_id, "S1");
        assert_eq!(r.entity_id, "mag1");
        assert_eq!(r.taxonomic_level, "kingdom");
        assert_eq!(r.reference_score, Some(0.91));
        assert_eq!(r.contamination, Some(0.02));
        assert_eq!(r.n_contigs, Some(40.0));
        assert!(r.passed);
        assert_eq!(r.extra["mean_hit_identity"], "0.95");
    }

    #[test]
    fn test_parse_pass_spellings() {
        let text = [
            HEADER.to_string(),
            row("a", "kingdom", "0", "1", "False"),
            row("b", "kingdom", "0", "1", "pass"),
            row("c", "kingdom", "0", "1", "nan"),
        ]
        .join("\n");
        let records = parse_all_levels(&text, Path::new("t.tsv"), "").unwrap();
        let passed: Vec<bool> = records.iter().map(|r| r.passed).collect();
        assert_eq!(passed, vec![false, true, false]);
    }

    #[test]
    fn test_parse_missing_metrics() {
        let text = format!("{}\n{}", HEADER, row("a", "genus", "nan", "", "True"));
        let records = parse_all_levels(&text, Path::new("t.tsv"), "").unwrap();
        assert_eq!(records[0].contamination, None);
        assert_eq!(records[0].reference_score, None);
    }

    #[test]
    fn test_parse_ragged_row() {
        let text = format!("{}\nmag1\t1\t2\n", HEADER);
        let err = parse_all_levels(&text, Path::new("t.tsv"), "").unwrap_err();
        match err {
            Error::Table { line, .. } => assert_eq!(line, 2),
            other => panic!("expected table error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_missing_genome_column() {
        let err = parse_all_levels("foo\tbar\n1\t2", Path::new("t.tsv"), "").unwrap_err();
        assert!(err.to_string().contains("`genome`"));
    }

    #[test]
    fn test_parse_empty_and_crlf() {
        assert!(parse_all_levels("", Path::new("t.tsv"), "").unwrap().is_empty());
        let text = format!("{}\r\n{}\r\n", HEADER, row("a", "kingdom", "0.1", "0.8", "True"));
        let records = parse_all_levels(&text, Path::new("t.tsv"), "").unwrap();
        assert!(records[0].passed);
    }

    // ==========================================================================
    // DIRECTORY SCANNING
    // ==========================================================================

    #[test]
    fn test_discover_per_sample() {
        let tmp = TempDir::new().unwrap();
        sample_tree(tmp.path(), "S2", &["m1"], false);
        sample_tree(tmp.path(), "S1", &["m1"], false);
        fs::create_dir_all(tmp.path().join("unrelated")).unwrap();

        let samples = discover(tmp.path()).unwrap();
        let ids: Vec<&str> = samples.iter().map(|s| s.sample_id.as_str()).collect();
        assert_eq!(ids, vec!["S1", "S2"]);
    }

    #[test]
    fn test_discover_flat() {
        let tmp = TempDir::new().unwrap();
        sample_tree(tmp.path(), "", &["m1"], false);
        let samples = discover(tmp.path()).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].sample_id, "");
    }

    #[test]
    fn test_discover_missing_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(discover(&tmp.path().join("nope")), Err(Error::Io { .. })));
    }

    #[test]
    fn test_entities_from_diamond_outputs() {
        let tmp = TempDir::new().unwrap();
        sample_tree(tmp.path(), "S1", &["magB", "magA"], false);
        let dirs = discover(tmp.path()).unwrap();
        let result = scan_sample(&dirs[0]).unwrap();
        assert_eq!(result.entities, vec!["magA", "magB"]);
        assert_eq!(result.records.len(), 4);
        assert!(result.fragments.is_empty());
    }

    #[test]
    fn test_entities_prefer_fragments() {
        let tmp = TempDir::new().unwrap();
        sample_tree(tmp.path(), "S1", &["magA"], true);
        write(&tmp.path().join("S1").join(DIAMOND_OUTPUT_DIR).join("extra.diamond.out"), "");
        let dirs = discover(tmp.path()).unwrap();
        let result = scan_sample(&dirs[0]).unwrap();
        assert_eq!(result.entities, vec!["magA"]);
        assert_eq!(result.fragments.len(), 1);
    }

    #[test]
    fn test_scan_and_copy_grouped() {
        let tmp = TempDir::new().unwrap();
        let results = tmp.path().join("results");
        let out = tmp.path().join("out");
        sample_tree(&results, "S1", &["magA", "magB"], true);
        sample_tree(&results, "S2", &["magC"], true);

        let dirs = discover(&results).unwrap();
        let seen = std::sync::atomic::AtomicUsize::new(0);
        let scanned = scan(&dirs, |_| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })
        .unwrap();
        assert_eq!(seen.into_inner(), 2);

        let data = assemble(&scanned);
        assert_eq!(data.records.len(), 6);
        assert_eq!(data.groups.entities("S1").unwrap(), vec!["magA", "magB"]);

        let mode = Mode::detect(&data.groups);
        assert_eq!(mode, Mode::Grouped);
        assert_eq!(copy_fragments(&scanned, &out, mode).unwrap(), 3);
        let copied = fs::read_to_string(out.join("plots/S2/magC.viz.html")).unwrap();
        assert_eq!(copied, "<p>magC</p>");
    }

    #[test]
    fn test_scan_and_copy_flat() {
        let tmp = TempDir::new().unwrap();
        let results = tmp.path().join("results");
        let out = tmp.path().join("out");
        sample_tree(&results, "", &["magA"], true);

        let scanned = scan(&discover(&results).unwrap(), |_| {}).unwrap();
        let data = assemble(&scanned);
        let mode = Mode::detect(&data.groups);
        assert_eq!(mode, Mode::EntityOnly);
        copy_fragments(&scanned, &out, mode).unwrap();
        assert!(out.join("plots/magA.viz.html").is_file());
    }

    #[test]
    fn test_scan_propagates_table_errors() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("S1").join(GUNC_OUTPUT_DIR).join("bad.all_levels.tsv"), "genome\n");
        let err = scan(&discover(tmp.path()).unwrap(), |_| {}).unwrap_err();
        assert!(matches!(err, Error::Table { .. }));
    }
}
