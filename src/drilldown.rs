//! Sample → genome drill-down
//!
//! Two cascading selectors and one detail card:
//!
//! ```text
//! sample selector ──changed──▶ genome selector repopulated, plot re-filtered
//!                                   │ first genome auto-selected
//!                                   ▼
//! genome selector ──changed──▶ detail card: loading… ──▶ fragment | warning
//! ```
//!
//! Reports without a sample dimension (a single `""` group) lock the sample
//! selector and go straight to the genome list.
//!
//! Detail loads are two-phase so hosts with real asynchronous fetches can
//! drive them: [`DrillDownController::begin_load`] resets the card and hands
//! back a [`PendingLoad`]; [`DrillDownController::complete_load`] shows the
//! result. Every new load (or hiding the card) bumps a generation counter, and
//! a completion carrying an older token is dropped, so a slow response for a
//! previous genome can never overwrite the current one.

use crate::config::ViewerOptions;
use crate::error::FetchError;
use crate::fragment::{DetailContent, DetailFragment, FragmentSource, Mode};
use crate::plot::{FilterState, Plot, SummaryPlotBuilder};
use crate::record::ReportData;
use crate::ui::{Element, SelectOption, UiPort};

pub const ALL_SAMPLES_LABEL: &str = "All samples";
pub const ALL_GENOMES_LABEL: &str = "All MAGs";

/// A detail fetch that has been started but not yet shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingLoad {
    pub token: u64,
    pub sample: String,
    pub entity: String,
    /// Report-relative path of the fragment
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Shown,
    Failed(FetchError),
    /// Superseded by a newer selection; nothing was touched
    Stale,
}

#[derive(Debug, Clone)]
pub struct DrillDownController {
    data: ReportData,
    builder: SummaryPlotBuilder,
    mode: Mode,
    generation: u64,
}

impl DrillDownController {
    pub fn new(data: ReportData, options: ViewerOptions) -> Self {
        let builder = SummaryPlotBuilder::new(&data, options);
        let mode = Mode::detect(&data.groups);
        Self {
            data,
            builder,
            mode,
            generation: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn data(&self) -> &ReportData {
        &self.data
    }

    /// Set up every control for a freshly loaded page
    pub fn initialize<U: UiPort + ?Sized>(&mut self, ui: &mut U) -> Option<PendingLoad> {
        if ui.has(Element::LevelSelect) {
            let levels = self.data.taxonomic_levels();
            let options: Vec<SelectOption> = levels.iter().map(SelectOption::plain).collect();
            ui.set_options(Element::LevelSelect, &options);
            let preferred = &self.builder.options().default_level;
            if levels.contains(preferred) {
                ui.set_value(Element::LevelSelect, preferred);
            }
        }

        tracing::info!(
            mode = ?self.mode,
            samples = self.data.groups.len(),
            records = self.data.records.len(),
            "drill-down initialized"
        );

        match self.mode {
            Mode::EntityOnly => {
                ui.set_options(Element::SampleSelect, &[SelectOption::new("", ALL_GENOMES_LABEL)]);
                ui.set_value(Element::SampleSelect, "");
                ui.set_enabled(Element::SampleSelect, false);
                ui.set_enabled(Element::EntitySelect, true);
                self.sample_changed(ui)
            }
            Mode::Grouped => {
                let mut options = vec![SelectOption::new("", ALL_SAMPLES_LABEL)];
                options.extend(
                    self.data
                        .groups
                        .samples()
                        .filter(|s| !s.is_empty())
                        .map(SelectOption::plain),
                );
                ui.set_options(Element::SampleSelect, &options);
                ui.set_value(Element::SampleSelect, "");
                ui.set_enabled(Element::SampleSelect, true);
                ui.set_options(Element::EntitySelect, &[]);
                ui.set_enabled(Element::EntitySelect, false);
                self.render_summary(ui);
                None
            }
        }
    }

    /// Rebuild the genome list for the selected sample, re-filter the plot and
    /// load the first genome if there is one.
    pub fn sample_changed<U: UiPort + ?Sized>(&mut self, ui: &mut U) -> Option<PendingLoad> {
        let sample = ui.value(Element::SampleSelect).unwrap_or_default();
        let entities = self.entities(&sample);

        let options: Vec<SelectOption> = entities
            .iter()
            .flatten()
            .map(SelectOption::plain)
            .collect();
        ui.set_options(Element::EntitySelect, &options);
        ui.set_enabled(Element::EntitySelect, entities.is_some());

        self.render_summary(ui);

        match options.first() {
            Some(first) => {
                ui.set_value(Element::EntitySelect, &first.value);
                self.entity_changed(ui)
            }
            None => {
                self.hide_detail(ui);
                None
            }
        }
    }

    pub fn entity_changed<U: UiPort + ?Sized>(&mut self, ui: &mut U) -> Option<PendingLoad> {
        let sample = ui.value(Element::SampleSelect).unwrap_or_default();
        let entity = ui.value(Element::EntitySelect).filter(|e| !e.is_empty());

        match entity {
            Some(entity) if self.entities(&sample).is_some() => {
                Some(self.begin_load(ui, &sample, &entity))
            }
            _ => {
                self.hide_detail(ui);
                None
            }
        }
    }

    /// Level, pass-only or axis toggles changed
    pub fn filters_changed<U: UiPort + ?Sized>(&mut self, ui: &mut U) -> Plot {
        self.render_summary(ui)
    }

    pub fn render_summary<U: UiPort + ?Sized>(&self, ui: &mut U) -> Plot {
        let filter = FilterState::read(&*ui, &self.data, self.builder.options());
        self.builder.render(ui, &self.data.records, &filter, self.mode)
    }

    /// Show the card in its loading state and start a new generation
    pub fn begin_load<U: UiPort + ?Sized>(&mut self, ui: &mut U, sample: &str, entity: &str) -> PendingLoad {
        self.generation += 1;
        let path = self.mode.detail_path(sample, entity);

        ui.set_visible(Element::PlotCard, true);
        if ui.has(Element::Loading) {
            ui.set_visible(Element::Loading, true);
        }
        ui.set_detail(DetailContent::Empty);

        tracing::debug!(sample, entity, path = %path, token = self.generation, "loading detail view");
        PendingLoad {
            token: self.generation,
            sample: sample.to_string(),
            entity: entity.to_string(),
            path,
        }
    }

    pub fn complete_load<U: UiPort + ?Sized>(
        &mut self,
        ui: &mut U,
        pending: &PendingLoad,
        result: Result<String, FetchError>,
    ) -> LoadOutcome {
        if pending.token != self.generation {
            tracing::debug!(
                path = %pending.path,
                token = pending.token,
                current = self.generation,
                "discarding stale detail view"
            );
            return LoadOutcome::Stale;
        }

        if ui.has(Element::Loading) {
            ui.set_visible(Element::Loading, false);
        }

        match result {
            Ok(html) => {
                ui.set_detail(DetailContent::Fragment(DetailFragment::parse(&html)));
                LoadOutcome::Shown
            }
            Err(e) => {
                tracing::warn!(
                    sample = %pending.sample,
                    entity = %pending.entity,
                    path = %pending.path,
                    error = %e,
                    "detail view unavailable"
                );
                ui.set_detail(DetailContent::warning(&pending.sample, &pending.entity, &pending.path, &e));
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Fetch and show in one go, for sources that answer immediately
    pub fn load<U, S>(&mut self, ui: &mut U, source: &S, pending: &PendingLoad) -> LoadOutcome
    where
        U: UiPort + ?Sized,
        S: FragmentSource + ?Sized,
    {
        let result = source.fetch(&pending.path);
        self.complete_load(ui, pending, result)
    }

    /// Genomes offered for a sample. In grouped mode `""` is "All samples",
    /// even when the index also carries a `""` group.
    fn entities(&self, sample: &str) -> Option<Vec<String>> {
        if self.mode == Mode::Grouped && sample.is_empty() {
            return None;
        }
        self.data.groups.entities(sample)
    }

    fn hide_detail<U: UiPort + ?Sized>(&mut self, ui: &mut U) {
        self.generation += 1;
        ui.set_visible(Element::PlotCard, false);
        if ui.has(Element::Loading) {
            ui.set_visible(Element::Loading, false);
        }
    }
}
