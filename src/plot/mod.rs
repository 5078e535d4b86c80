//! Summary scatter plot
//!
//! One point per genome at the selected taxonomic level: reference
//! representation score against contamination portion. Building a plot is a
//! pure function of the records and a [`FilterState`]; [`SummaryPlotBuilder::render`]
//! then pushes the result through a [`UiPort`]:
//!
//! 1. keep records at the selected level (and sample, if one is picked)
//! 2. optionally keep passing genomes only
//! 3. nothing left: mount a "no data" placeholder
//! 4. otherwise frame the axes on what is left (see [`bounds`])
//! 5. update the sample / pass / fail counters
//! 6. mount the chart and hand its range sliders to the controls area
//!
//! Filled points passed GUNC, hollow points failed, whatever the filter.

pub mod bounds;
pub mod spec;

pub use bounds::{AxisBounds, Domain};
pub use spec::{ChartSpec, RangeControl, NO_DATA_MESSAGE};

use crate::config::ViewerOptions;
use crate::fragment::Mode;
use crate::record::{QualityRecord, ReportData};
use crate::ui::{Element, UiPort};
use std::collections::BTreeSet;

/// Control state for one render. Read fresh every time, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterState {
    pub level: String,
    pub pass_only: bool,
    /// `None` shows every sample
    pub sample: Option<String>,
    pub reverse_y: bool,
}

impl FilterState {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            pass_only: false,
            sample: None,
            reverse_y: false,
        }
    }

    pub fn with_sample(mut self, sample: impl Into<String>) -> Self {
        let sample = sample.into();
        self.sample = if sample.is_empty() { None } else { Some(sample) };
        self
    }

    pub fn with_pass_only(mut self, pass_only: bool) -> Self {
        self.pass_only = pass_only;
        self
    }

    pub fn with_reverse_y(mut self, reverse_y: bool) -> Self {
        self.reverse_y = reverse_y;
        self
    }

    /// Read the filters off the page. A missing or empty level selector
    /// falls back to the configured level, then to the first level in the data.
    pub fn read<U: UiPort + ?Sized>(ui: &U, data: &ReportData, options: &ViewerOptions) -> Self {
        let levels = data.taxonomic_levels();
        let level = ui
            .value(Element::LevelSelect)
            .filter(|l| !l.is_empty())
            .or_else(|| levels.iter().find(|l| **l == options.default_level).cloned())
            .or_else(|| levels.first().cloned())
            .unwrap_or_default();

        Self::new(level)
            .with_sample(ui.value(Element::SampleSelect).unwrap_or_default())
            .with_pass_only(ui.checked(Element::PassOnlyToggle))
            .with_reverse_y(ui.checked(Element::ReverseYToggle))
    }

    pub fn matches(&self, record: &QualityRecord) -> bool {
        record.taxonomic_level == self.level
            && self.sample.as_ref().map_or(true, |s| record.sample_id == *s)
            && (!self.pass_only || record.passed)
    }

    pub fn apply<'a>(&self, records: &'a [QualityRecord]) -> Vec<&'a QualityRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryCounts {
    /// Distinct samples; `None` when the report has no sample dimension
    pub samples: Option<usize>,
    pub passing: usize,
    pub failing: usize,
}

impl SummaryCounts {
    pub fn from_records(records: &[&QualityRecord], mode: Mode) -> Self {
        let samples = match mode {
            Mode::EntityOnly => None,
            Mode::Grouped => Some(
                records
                    .iter()
                    .map(|r| r.sample_id.as_str())
                    .collect::<BTreeSet<_>>()
                    .len(),
            ),
        };
        let passing = records.iter().filter(|r| r.passed).count();

        Self {
            samples,
            passing,
            failing: records.len() - passing,
        }
    }

    pub fn total(&self) -> usize {
        self.passing + self.failing
    }

    pub fn samples_label(&self) -> String {
        self.samples.map_or_else(|| "-".to_string(), |n| n.to_string())
    }
}

/// Everything one render produced
#[derive(Debug, Clone, PartialEq)]
pub struct Plot {
    pub spec: ChartSpec,
    pub counts: SummaryCounts,
    /// `None` for the empty placeholder
    pub bounds: Option<AxisBounds>,
    pub controls: Vec<RangeControl>,
}

#[derive(Debug, Clone)]
pub struct SummaryPlotBuilder {
    options: ViewerOptions,
    /// Every sample in the report, so colors stay put across filters
    color_domain: Vec<String>,
}

impl SummaryPlotBuilder {
    pub fn new(data: &ReportData, options: ViewerOptions) -> Self {
        Self {
            color_domain: data.sample_ids(),
            options,
        }
    }

    pub fn options(&self) -> &ViewerOptions {
        &self.options
    }

    pub fn build(&self, records: &[QualityRecord], filter: &FilterState, mode: Mode) -> Plot {
        let visible = filter.apply(records);
        let counts = SummaryCounts::from_records(&visible, mode);

        if visible.is_empty() {
            return Plot {
                spec: ChartSpec::placeholder(self.options.chart_height, NO_DATA_MESSAGE),
                counts,
                bounds: None,
                controls: Vec::new(),
            };
        }

        let bounds = AxisBounds::compute(&visible);
        let controls = spec::range_controls(&bounds, self.options.slider_step);
        let spec = ChartSpec::scatter(
            &visible,
            &bounds,
            &controls,
            filter.reverse_y,
            &self.color_domain,
            &self.options,
        );

        Plot {
            spec,
            counts,
            bounds: Some(bounds),
            controls,
        }
    }

    /// Build and show a plot. Never fails: a surface that cannot mount the
    /// chart gets an error in the log and the rest of the page keeps working.
    pub fn render<U: UiPort + ?Sized>(
        &self,
        ui: &mut U,
        records: &[QualityRecord],
        filter: &FilterState,
        mode: Mode,
    ) -> Plot {
        let plot = self.build(records, filter, mode);

        for (element, text) in [
            (Element::SampleCount, plot.counts.samples_label()),
            (Element::PassCount, plot.counts.passing.to_string()),
            (Element::FailCount, plot.counts.failing.to_string()),
        ] {
            if ui.has(element) {
                ui.set_text(element, &text);
            }
        }

        if let Err(e) = ui.mount_chart(&plot.spec) {
            tracing::error!(error = %e, level = %filter.level, "summary plot not rendered");
            return plot;
        }

        if ui.has(Element::Controls) {
            ui.place_controls(&plot.controls);
        }

        tracing::debug!(
            level = %filter.level,
            sample = filter.sample.as_deref().unwrap_or("*"),
            pass_only = filter.pass_only,
            points = plot.counts.total(),
            "summary plot rendered"
        );
        plot
    }
}
