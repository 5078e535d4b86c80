//! Vega-Lite documents for the summary plot

use super::bounds::{AxisBounds, Domain};
use crate::config::ViewerOptions;
use crate::record::QualityRecord;
use serde::Serialize;
use serde_json::{json, Value};

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";
pub const NO_DATA_MESSAGE: &str = "No data available for the selected filters";

pub const MIN_SCORE_PARAM: &str = "min_rrs";
pub const MAX_CONTAMINATION_PARAM: &str = "max_contamination";

/// A finished chart document, handed to the rendering surface as-is
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ChartSpec(Value);

/// A live range slider owned by the chart.
///
/// The chart never places its own widgets; the host receives these handles
/// and puts them where the page wants them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeControl {
    /// Vega-Lite parameter the slider drives
    pub param: String,
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub value: f64,
}

impl RangeControl {
    /// Unbound variable param; the host's slider drives it by name
    fn to_param(&self) -> Value {
        json!({"name": self.param, "value": self.value})
    }
}

/// The two threshold sliders, spanning the same domains as the axes
pub fn range_controls(bounds: &AxisBounds, step: f64) -> Vec<RangeControl> {
    vec![
        RangeControl {
            param: MIN_SCORE_PARAM.to_string(),
            label: "Min. reference representation score".to_string(),
            min: bounds.x.min,
            max: bounds.x.max,
            step,
            value: bounds.x.min,
        },
        RangeControl {
            param: MAX_CONTAMINATION_PARAM.to_string(),
            label: "Max. contamination portion".to_string(),
            min: bounds.y.min,
            max: bounds.y.max,
            step,
            value: bounds.y.max,
        },
    ]
}

impl ChartSpec {
    pub fn scatter(
        records: &[&QualityRecord],
        bounds: &AxisBounds,
        controls: &[RangeControl],
        reverse_y: bool,
        samples: &[String],
        options: &ViewerOptions,
    ) -> Self {
        let mut params = vec![json!({"name": "grid", "select": "interval", "bind": "scales"})];
        params.extend(controls.iter().map(RangeControl::to_param));

        let color = json!({
            "field": "sample_id",
            "type": "nominal",
            "title": "Sample",
            "scale": {"scheme": options.color_scheme, "domain": samples},
        });

        ChartSpec(json!({
            "$schema": VEGA_LITE_SCHEMA,
            "width": "container",
            "height": options.chart_height,
            "data": {"values": records},
            "params": params,
            "transform": [{
                "filter": format!(
                    "datum.reference_representation_score >= {} && datum.contamination_portion <= {}",
                    MIN_SCORE_PARAM, MAX_CONTAMINATION_PARAM
                )
            }],
            "mark": {"type": "point", "filled": true, "strokeWidth": 1.5},
            "encoding": {
                "x": axis("reference_representation_score", "Reference representation score", bounds.x, false),
                "y": axis("contamination_portion", "Contamination portion", bounds.y, reverse_y),
                "size": {
                    "field": "clade_separation_score",
                    "type": "quantitative",
                    "title": "Clade separation score",
                },
                "fill": color,
                "stroke": {
                    "field": "sample_id",
                    "type": "nominal",
                    "scale": {"scheme": options.color_scheme, "domain": samples},
                    "legend": null,
                },
                "fillOpacity": {
                    "condition": {"test": "datum.pass_gunc", "value": 0.8},
                    "value": 0,
                },
                "tooltip": [
                    {"field": "sample_id", "type": "nominal", "title": "Sample"},
                    {"field": "mag_id", "type": "nominal", "title": "MAG"},
                    {"field": "reference_representation_score", "type": "quantitative", "title": "Reference representation score", "format": ".3f"},
                    {"field": "contamination_portion", "type": "quantitative", "title": "Contamination portion", "format": ".3f"},
                    {"field": "clade_separation_score", "type": "quantitative", "title": "Clade separation score", "format": ".3f"},
                    {"field": "n_contigs", "type": "quantitative", "title": "Contigs"},
                    {"field": "n_genes_mapped", "type": "quantitative", "title": "Genes mapped"},
                    {"field": "pass_gunc", "type": "nominal", "title": "Passed GUNC"},
                ],
            },
        }))
    }

    /// A chart holding nothing but a centered message
    pub fn placeholder(height: u32, message: &str) -> Self {
        ChartSpec(json!({
            "$schema": VEGA_LITE_SCHEMA,
            "width": "container",
            "height": height,
            "data": {"values": [{}]},
            "mark": {
                "type": "text",
                "align": "center",
                "baseline": "middle",
                "fontSize": 16,
                "color": "#7d8590",
            },
            "encoding": {
                "x": {"value": {"expr": "width / 2"}},
                "y": {"value": {"expr": "height / 2"}},
                "text": {"value": message},
            },
        }))
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn is_placeholder(&self) -> bool {
        self.0["mark"]["type"] == "text"
    }

    /// Number of points handed to the chart
    pub fn point_count(&self) -> usize {
        if self.is_placeholder() {
            return 0;
        }
        self.0["data"]["values"].as_array().map_or(0, Vec::len)
    }

    pub fn x_domain(&self) -> Option<[f64; 2]> {
        domain_of(&self.0["encoding"]["x"])
    }

    pub fn y_domain(&self) -> Option<[f64; 2]> {
        domain_of(&self.0["encoding"]["y"])
    }

    pub fn y_reversed(&self) -> bool {
        self.0["encoding"]["y"]["scale"]["reverse"] == true
    }
}

fn axis(field: &str, title: &str, domain: Domain, reverse: bool) -> Value {
    json!({
        "field": field,
        "type": "quantitative",
        "title": title,
        "scale": {"domain": domain.to_array(), "reverse": reverse},
    })
}

fn domain_of(encoding: &Value) -> Option<[f64; 2]> {
    let d = encoding["scale"]["domain"].as_array()?;
    Some([d.first()?.as_f64()?, d.get(1)?.as_f64()?])
}
