//! The page, seen from the controller
//!
//! Controllers never touch a DOM. They read control values and push updates
//! through [`UiPort`], which a host implements for whatever surface it has.
//! [`HeadlessUi`] is the in-memory host: it records everything it is told and
//! can be serialized as a snapshot for a browser to apply.

use crate::error::{Error, Result};
use crate::fragment::DetailContent;
use crate::plot::{ChartSpec, RangeControl};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Every element of the report page the controllers know about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    LevelSelect,
    PassOnlyToggle,
    ReverseYToggle,
    SampleSelect,
    EntitySelect,
    /// Card wrapping the detail view; hidden until a genome is picked
    PlotCard,
    PlotContent,
    Loading,
    SampleCount,
    PassCount,
    FailCount,
    Chart,
    Controls,
}

impl Element {
    pub const ALL: [Element; 13] = [
        Element::LevelSelect,
        Element::PassOnlyToggle,
        Element::ReverseYToggle,
        Element::SampleSelect,
        Element::EntitySelect,
        Element::PlotCard,
        Element::PlotContent,
        Element::Loading,
        Element::SampleCount,
        Element::PassCount,
        Element::FailCount,
        Element::Chart,
        Element::Controls,
    ];

    /// Elements a page may leave out
    pub const OPTIONAL: [Element; 8] = [
        Element::LevelSelect,
        Element::PassOnlyToggle,
        Element::ReverseYToggle,
        Element::Loading,
        Element::SampleCount,
        Element::PassCount,
        Element::FailCount,
        Element::Controls,
    ];

    /// DOM id in the generated report page
    pub fn id(self) -> &'static str {
        match self {
            Element::LevelSelect => "taxonomic-level",
            Element::PassOnlyToggle => "pass-only",
            Element::ReverseYToggle => "reverse-y",
            Element::SampleSelect => "sample-select",
            Element::EntitySelect => "mag-select",
            Element::PlotCard => "plot-card",
            Element::PlotContent => "plot-content",
            Element::Loading => "plot-loading",
            Element::SampleCount => "count-samples",
            Element::PassCount => "count-pass",
            Element::FailCount => "count-fail",
            Element::Chart => "summary-plot",
            Element::Controls => "plot-controls",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self { value: value.into(), label: label.into() }
    }

    /// Option whose label is its value
    pub fn plain(value: impl Into<String>) -> Self {
        let value = value.into();
        Self { label: value.clone(), value }
    }
}

pub trait UiPort {
    /// Whether the element exists on this surface
    fn has(&self, element: Element) -> bool;

    /// Current value of a select control
    fn value(&self, element: Element) -> Option<String>;

    fn checked(&self, element: Element) -> bool;

    fn set_value(&mut self, element: Element, value: &str);

    /// Replace all options of a select. The selection moves to the first option.
    fn set_options(&mut self, element: Element, options: &[SelectOption]);

    fn set_enabled(&mut self, element: Element, enabled: bool);

    fn set_visible(&mut self, element: Element, visible: bool);

    fn set_text(&mut self, element: Element, text: &str);

    fn mount_chart(&mut self, spec: &ChartSpec) -> Result<()>;

    /// Place the chart's interactive controls, dropping any placed earlier
    fn place_controls(&mut self, controls: &[RangeControl]);

    fn set_detail(&mut self, content: DetailContent);
}

/// In-memory page
#[derive(Debug, Clone)]
pub struct HeadlessUi {
    present: BTreeSet<Element>,
    values: BTreeMap<Element, String>,
    checked: BTreeSet<Element>,
    options: BTreeMap<Element, Vec<SelectOption>>,
    disabled: BTreeSet<Element>,
    hidden: BTreeSet<Element>,
    text: BTreeMap<Element, String>,
    chart: Option<ChartSpec>,
    controls: Vec<RangeControl>,
    detail: DetailContent,
    mount_error: Option<String>,
    mounts: usize,
}

impl Default for HeadlessUi {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessUi {
    /// A page with every element present; the detail card starts hidden
    pub fn new() -> Self {
        Self::with_elements(Element::ALL)
    }

    pub fn with_elements<I: IntoIterator<Item = Element>>(elements: I) -> Self {
        let mut hidden = BTreeSet::new();
        hidden.insert(Element::PlotCard);
        hidden.insert(Element::Loading);
        Self {
            present: elements.into_iter().collect(),
            values: BTreeMap::new(),
            checked: BTreeSet::new(),
            options: BTreeMap::new(),
            disabled: BTreeSet::new(),
            hidden,
            text: BTreeMap::new(),
            chart: None,
            controls: Vec::new(),
            detail: DetailContent::Empty,
            mount_error: None,
            mounts: 0,
        }
    }

    /// Remove an element, as on a page that leaves it out
    pub fn without(mut self, element: Element) -> Self {
        self.present.remove(&element);
        self
    }

    /// Make every following mount fail with `message`
    pub fn failing_mounts(mut self, message: &str) -> Self {
        self.mount_error = Some(message.to_string());
        self
    }

    /// Tick or untick a checkbox, as a user would
    pub fn set_checked(&mut self, element: Element, checked: bool) {
        if checked {
            self.checked.insert(element);
        } else {
            self.checked.remove(&element);
        }
    }

    pub fn options(&self, element: Element) -> &[SelectOption] {
        self.options.get(&element).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn option_values(&self, element: Element) -> Vec<String> {
        self.options(element).iter().map(|o| o.value.clone()).collect()
    }

    pub fn is_enabled(&self, element: Element) -> bool {
        !self.disabled.contains(&element)
    }

    pub fn is_visible(&self, element: Element) -> bool {
        !self.hidden.contains(&element)
    }

    pub fn text(&self, element: Element) -> Option<&str> {
        self.text.get(&element).map(String::as_str)
    }

    pub fn chart(&self) -> Option<&ChartSpec> {
        self.chart.as_ref()
    }

    pub fn controls(&self) -> &[RangeControl] {
        &self.controls
    }

    pub fn detail(&self) -> &DetailContent {
        &self.detail
    }

    /// Number of charts mounted so far
    pub fn mounts(&self) -> usize {
        self.mounts
    }

    /// Full page state keyed by DOM id
    pub fn snapshot(&self) -> Value {
        let by_id = |map: &BTreeMap<Element, String>| -> Map<String, Value> {
            map.iter()
                .map(|(e, v)| (e.id().to_string(), Value::String(v.clone())))
                .collect()
        };
        let ids = |set: &BTreeSet<Element>| -> Vec<&'static str> { set.iter().map(|e| e.id()).collect() };
        let options: Map<String, Value> = self
            .options
            .iter()
            .map(|(e, opts)| (e.id().to_string(), json!(opts)))
            .collect();

        json!({
            "values": by_id(&self.values),
            "checked": ids(&self.checked),
            "options": options,
            "disabled": ids(&self.disabled),
            "hidden": ids(&self.hidden),
            "text": by_id(&self.text),
            "chart": self.chart,
            "controls": self.controls,
            "detail": self.detail,
        })
    }
}

impl UiPort for HeadlessUi {
    fn has(&self, element: Element) -> bool {
        self.present.contains(&element)
    }

    fn value(&self, element: Element) -> Option<String> {
        if !self.has(element) {
            return None;
        }
        self.values.get(&element).cloned()
    }

    fn checked(&self, element: Element) -> bool {
        self.has(element) && self.checked.contains(&element)
    }

    fn set_value(&mut self, element: Element, value: &str) {
        self.values.insert(element, value.to_string());
    }

    fn set_options(&mut self, element: Element, options: &[SelectOption]) {
        match options.first() {
            Some(first) => self.values.insert(element, first.value.clone()),
            None => self.values.remove(&element),
        };
        self.options.insert(element, options.to_vec());
    }

    fn set_enabled(&mut self, element: Element, enabled: bool) {
        if enabled {
            self.disabled.remove(&element);
        } else {
            self.disabled.insert(element);
        }
    }

    fn set_visible(&mut self, element: Element, visible: bool) {
        if visible {
            self.hidden.remove(&element);
        } else {
            self.hidden.insert(element);
        }
    }

    fn set_text(&mut self, element: Element, text: &str) {
        self.text.insert(element, text.to_string());
    }

    fn mount_chart(&mut self, spec: &ChartSpec) -> Result<()> {
        if let Some(message) = &self.mount_error {
            return Err(Error::Mount(message.clone()));
        }
        self.chart = Some(spec.clone());
        self.mounts += 1;
        Ok(())
    }

    fn place_controls(&mut self, controls: &[RangeControl]) {
        self.controls = controls.to_vec();
    }

    fn set_detail(&mut self, content: DetailContent) {
        self.detail = content;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_ids_unique() {
        let ids: BTreeSet<&str> = Element::ALL.iter().map(|e| e.id()).collect();
        assert_eq!(ids.len(), Element::ALL.len());
    }

    #[test]
    fn test_set_options_selects_first() {
        let mut ui = HeadlessUi::new();
        ui.set_value(Element::EntitySelect, "old");
        ui.set_options(Element::EntitySelect, &[SelectOption::plain("a"), SelectOption::plain("b")]);
        assert_eq!(ui.value(Element::EntitySelect).as_deref(), Some("a"));

        ui.set_options(Element::EntitySelect, &[]);
        assert_eq!(ui.value(Element::EntitySelect), None);
    }

    #[test]
    fn test_missing_element_reads_empty() {
        let mut ui = HeadlessUi::new().without(Element::PassOnlyToggle);
        ui.set_checked(Element::PassOnlyToggle, true);
        assert!(!ui.checked(Element::PassOnlyToggle));
        assert!(!ui.has(Element::PassOnlyToggle));
    }

    #[test]
    fn test_detail_card_starts_hidden() {
        let ui = HeadlessUi::new();
        assert!(!ui.is_visible(Element::PlotCard));
        assert!(!ui.is_visible(Element::Loading));
        assert!(ui.is_visible(Element::Chart));
    }

    #[test]
    fn test_snapshot_uses_dom_ids() {
        let mut ui = HeadlessUi::new();
        ui.set_text(Element::PassCount, "3");
        ui.set_enabled(Element::EntitySelect, false);
        let snap = ui.snapshot();
        assert_eq!(snap["text"]["count-pass"], "3");
        assert_eq!(snap["disabled"], json!(["mag-select"]));
        assert_eq!(snap["detail"]["kind"], "empty");
    }

    #[test]
    fn test_failing_mounts() {
        let mut ui = HeadlessUi::new().failing_mounts("boom");
        let spec = ChartSpec::placeholder(450, "nothing");
        assert!(matches!(ui.mount_chart(&spec), Err(Error::Mount(_))));
        assert!(ui.chart().is_none());
        assert_eq!(ui.mounts(), 0);
    }
}
