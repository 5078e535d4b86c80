//! gunc-viz - Interactive viewer for GUNC genome quality reports
//!
//! GUNC scores metagenome-assembled genomes (MAGs) for chimerism and
//! contamination at every taxonomic level. gunc-viz turns a directory of GUNC
//! results into a report with two views:
//!
//! - a **summary plot**: reference representation score against
//!   contamination portion, one point per genome, filterable by taxonomic
//!   level, sample and pass/fail
//! - a **drill-down**: pick a sample, then a genome, and see the detail plot
//!   GUNC rendered for it
//!
//! # Architecture
//!
//! The page is a dumb surface. Controllers read control values and push
//! updates through the [`UiPort`] trait; nothing else knows about the page.
//!
//! ```text
//! ReportData ──▶ DrillDownController ──▶ SummaryPlotBuilder ──▶ UiPort
//!                        │                                         ▲
//!                        └──▶ FragmentSource ──▶ DetailContent ────┘
//! ```
//!
//! [`HeadlessUi`] is the in-memory implementation used by tests, by
//! `gunc-viz spec`, and by the [`serve`] host, which ships its snapshots to
//! the browser.
//!
//! # Quick Start
//!
//! ```no_run
//! use gunc_viz::{DrillDownController, HeadlessUi, ReportData, ViewerOptions};
//!
//! let data = ReportData::load("gunc-report/report.json")?;
//! let mut controller = DrillDownController::new(data, ViewerOptions::default());
//! let mut ui = HeadlessUi::new();
//! controller.initialize(&mut ui);
//!
//! println!("{}", ui.snapshot()["text"]["count-pass"]);
//! # Ok::<(), gunc_viz::Error>(())
//! ```
//!
//! # Modules
//!
//! - [`record`]: quality records, sample index, report data
//! - [`plot`]: filtering, axis bounds, chart documents
//! - [`drilldown`]: sample/genome selectors and detail loading
//! - [`fragment`]: detail fragment paths, parsing and sources
//! - [`ingest`]: reading a GUNC results directory
//! - [`report`]: writing the report directory
//! - [`serve`]: the interactive HTTP host

pub mod config;
pub mod drilldown;
pub mod error;
pub mod fragment;
pub mod ingest;
pub mod plot;
pub mod record;
pub mod report;
pub mod serve;
pub mod ui;

pub use config::ViewerOptions;
pub use drilldown::{DrillDownController, LoadOutcome, PendingLoad};
pub use error::{Error, FetchError, Result};
pub use fragment::{DetailContent, DetailFragment, DirSource, FragmentSource, Mode};
pub use plot::{ChartSpec, FilterState, Plot, RangeControl, SummaryCounts, SummaryPlotBuilder};
pub use record::{GroupIndex, QualityRecord, ReportData};
pub use ui::{Element, HeadlessUi, SelectOption, UiPort};
