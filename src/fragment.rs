//! Per-genome detail fragments
//!
//! `gunc plot` writes one `<genome>.viz.html` per genome. The report keeps them
//! under `plots/`, namespaced by sample unless the report has no sample
//! dimension:
//!
//! ```text
//! plots/<entity>.viz.html           entity-only reports
//! plots/<sample>/<entity>.viz.html  everything else
//! ```
//!
//! Fragments carry their own `<script>` blocks. Markup injected through
//! `innerHTML` never runs those, so [`DetailFragment::parse`] splits them out
//! and the host re-creates each one as a live script element.

use crate::error::FetchError;
use crate::record::GroupIndex;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

pub const PLOTS_DIR: &str = "plots";
pub const FRAGMENT_SUFFIX: &str = ".viz.html";

/// Whether the report has a sample dimension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Grouped,
    /// Single implicit `""` sample; the sample selector is meaningless
    EntityOnly,
}

impl Mode {
    pub fn detect(groups: &GroupIndex) -> Self {
        if groups.is_entity_only() {
            Mode::EntityOnly
        } else {
            Mode::Grouped
        }
    }

    pub fn is_entity_only(self) -> bool {
        self == Mode::EntityOnly
    }

    pub fn detail_path(self, sample: &str, entity: &str) -> String {
        match self {
            Mode::EntityOnly => format!("{}/{}{}", PLOTS_DIR, entity, FRAGMENT_SUFFIX),
            Mode::Grouped => format!("{}/{}/{}{}", PLOTS_DIR, sample, entity, FRAGMENT_SUFFIX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Script {
    pub attributes: BTreeMap<String, String>,
    pub body: String,
}

impl Script {
    pub fn src(&self) -> Option<&str> {
        self.attributes.get("src").map(String::as_str)
    }
}

/// A fetched fragment with its scripts lifted out of the markup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailFragment {
    pub markup: String,
    pub scripts: Vec<Script>,
}

fn script_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>").expect("valid regex"))
}

fn attribute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_:][-A-Za-z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
            .expect("valid regex")
    })
}

impl DetailFragment {
    pub fn parse(html: &str) -> Self {
        let scripts = script_re()
            .captures_iter(html)
            .map(|caps| Script {
                attributes: parse_attributes(caps.get(1).map_or("", |m| m.as_str())),
                body: caps.get(2).map_or("", |m| m.as_str()).to_string(),
            })
            .collect();
        let markup = script_re().replace_all(html, "").into_owned();

        Self { markup, scripts }
    }
}

fn parse_attributes(raw: &str) -> BTreeMap<String, String> {
    attribute_re()
        .captures_iter(raw)
        .map(|caps| {
            let name = caps[1].to_ascii_lowercase();
            let value = caps
                .get(2)
                .or_else(|| caps.get(3))
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            (name, value.to_string())
        })
        .collect()
}

/// What the detail panel currently shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DetailContent {
    Empty,
    Fragment(DetailFragment),
    Warning {
        sample: String,
        entity: String,
        path: String,
        html: String,
    },
}

impl DetailContent {
    pub fn warning(sample: &str, entity: &str, path: &str, error: &FetchError) -> Self {
        let html = format!(
            r#"<div class="alert alert-warning" role="alert"><strong>Could not load the detail plot for genome <code>{entity}</code> in sample <code>{sample}</code>.</strong><br>Tried <code>{path}</code> ({error}).</div>"#,
            entity = html_escape(entity),
            sample = html_escape(sample),
            path = html_escape(path),
            error = html_escape(&error.to_string()),
        );
        DetailContent::Warning {
            sample: sample.to_string(),
            entity: entity.to_string(),
            path: path.to_string(),
            html,
        }
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Anything that can hand back a fragment for a report-relative path
pub trait FragmentSource {
    fn fetch(&self, path: &str) -> Result<String, FetchError>;
}

impl<F> FragmentSource for F
where
    F: Fn(&str) -> Result<String, FetchError>,
{
    fn fetch(&self, path: &str) -> Result<String, FetchError> {
        self(path)
    }
}

/// Reads fragments from a report directory on disk
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a report-relative path, refusing anything that escapes the root
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let rel = Path::new(path.trim_start_matches('/'));
        if rel.components().all(|c| matches!(c, Component::Normal(_))) {
            Some(self.root.join(rel))
        } else {
            None
        }
    }
}

impl FragmentSource for DirSource {
    fn fetch(&self, path: &str) -> Result<String, FetchError> {
        let full = self.resolve(path).ok_or(FetchError::Status(403))?;
        std::fs::read_to_string(&full).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => FetchError::Status(404),
            std::io::ErrorKind::PermissionDenied => FetchError::Status(403),
            _ => FetchError::Transport(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_paths() {
        assert_eq!(Mode::EntityOnly.detail_path("", "magA"), "plots/magA.viz.html");
        assert_eq!(Mode::Grouped.detail_path("S1", "magX"), "plots/S1/magX.viz.html");
    }

    #[test]
    fn test_mode_detection() {
        let mut groups = GroupIndex::new();
        groups.insert("", vec!["magA".into()]);
        assert_eq!(Mode::detect(&groups), Mode::EntityOnly);

        groups.insert("S1", vec![]);
        assert_eq!(Mode::detect(&groups), Mode::Grouped);
    }

    // ==========================================================================
    // SCRIPT EXTRACTION
    // ==========================================================================
    //
    // Plotly-style fragments ship an external library tag followed by an
    // inline script that draws into a div. Both must survive, in order.
    // ==========================================================================

    #[test]
    fn test_parse_splits_scripts() {
        let html = r#"<div id="plot"></div>
<script type="text/javascript" src="https://cdn.plot.ly/plotly.min.js"></script>
<SCRIPT>Plotly.newPlot("plot", []);</SCRIPT>"#;
        let fragment = DetailFragment::parse(html);

        assert_eq!(fragment.scripts.len(), 2);
        assert_eq!(fragment.scripts[0].src(), Some("https://cdn.plot.ly/plotly.min.js"));
        assert_eq!(fragment.scripts[0].attributes.get("type").map(String::as_str), Some("text/javascript"));
        assert_eq!(fragment.scripts[1].src(), None);
        assert_eq!(fragment.scripts[1].body, r#"Plotly.newPlot("plot", []);"#);
        assert!(fragment.markup.contains(r#"<div id="plot"></div>"#));
        assert!(!fragment.markup.to_lowercase().contains("<script"));
    }

    #[test]
    fn test_parse_without_scripts() {
        let fragment = DetailFragment::parse("<p>static</p>");
        assert!(fragment.scripts.is_empty());
        assert_eq!(fragment.markup, "<p>static</p>");
    }

    #[test]
    fn test_multiline_script_body() {
        let fragment = DetailFragment::parse("<script defer>\nvar a = 1;\nvar b = 2;\n</script>");
        assert_eq!(fragment.scripts[0].body, "\nvar a = 1;\nvar b = 2;\n");
        assert_eq!(fragment.scripts[0].attributes.get("defer").map(String::as_str), Some(""));
    }

    #[test]
    fn test_warning_names_everything() {
        let content = DetailContent::warning("S1", "magX", "plots/S1/magX.viz.html", &FetchError::Status(404));
        match content {
            DetailContent::Warning { html, .. } => {
                assert!(html.contains("S1"));
                assert!(html.contains("magX"));
                assert!(html.contains("plots/S1/magX.viz.html"));
                assert!(html.contains("HTTP 404"));
            }
            other => panic!("expected warning, got {:?}", other),
        }
    }

    #[test]
    fn test_warning_escapes_ids() {
        let content = DetailContent::warning("<b>", "x\"y", "p", &FetchError::Transport("down".into()));
        if let DetailContent::Warning { html, .. } = content {
            assert!(html.contains("&lt;b&gt;"));
            assert!(html.contains("x&quot;y"));
        }
    }

    // ==========================================================================
    // DIRECTORY SOURCE
    // ==========================================================================

    #[test]
    fn test_dir_source_reads_and_reports_404() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("plots/S1")).unwrap();
        std::fs::write(dir.path().join("plots/S1/m1.viz.html"), "<p>m1</p>").unwrap();

        let source = DirSource::new(dir.path());
        assert_eq!(source.fetch("plots/S1/m1.viz.html").unwrap(), "<p>m1</p>");
        assert_eq!(source.fetch("plots/S1/m2.viz.html"), Err(FetchError::Status(404)));
    }

    #[test]
    fn test_dir_source_refuses_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let source = DirSource::new(dir.path());
        assert_eq!(source.fetch("../etc/passwd"), Err(FetchError::Status(403)));
        assert!(source.resolve("plots/../x").is_none());
        assert!(source.resolve("/plots/x").is_some());
    }
}
