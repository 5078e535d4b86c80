//! The report page
//!
//! A thin renderer: it holds no state of its own. Every control change is
//! posted to `/api/event`, and the snapshot that comes back is applied to the
//! DOM as-is.

use crate::fragment::html_escape;
use crate::record::ReportData;
use crate::ui::Element;
use std::io::{self, Write};

const VEGA: &str = "https://cdn.jsdelivr.net/npm/vega@5";
const VEGA_LITE: &str = "https://cdn.jsdelivr.net/npm/vega-lite@5";
const VEGA_EMBED: &str = "https://cdn.jsdelivr.net/npm/vega-embed@6";

/// Event name the page sends for each control
pub fn control_name(element: Element) -> Option<&'static str> {
    match element {
        Element::SampleSelect => Some("sample"),
        Element::EntitySelect => Some("entity"),
        Element::LevelSelect => Some("level"),
        Element::PassOnlyToggle => Some("pass_only"),
        Element::ReverseYToggle => Some("reverse_y"),
        _ => None,
    }
}

/// `id`, `data-ui` and, for inputs, `data-control` attributes of an element
fn attrs(element: Element) -> String {
    let mut out = format!(r#"id="{id}" data-ui="{id}""#, id = element.id());
    if let Some(control) = control_name(element) {
        out.push_str(&format!(r#" data-control="{}""#, control));
    }
    out
}

pub fn write<W: Write>(writer: &mut W, data: &ReportData, title: &str, generated_at: &str) -> io::Result<()> {
    let genomes: usize = data
        .groups
        .samples()
        .filter_map(|s| data.groups.entities(s))
        .map(|e| e.len())
        .sum();

    write!(writer, r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script src="{vega}"></script>
    <script src="{vega_lite}"></script>
    <script src="{vega_embed}"></script>
    <style>
        :root {{
            --bg: #0d1117;
            --card: #161b22;
            --border: #30363d;
            --text: #e6edf3;
            --dim: #7d8590;
            --pass: #3fb950;
            --fail: #f85149;
            --warn: #d29922;
            --accent: #58a6ff;
        }}
        * {{ box-sizing: border-box; margin: 0; padding: 0; }}
        body {{
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
            background: var(--bg);
            color: var(--text);
            line-height: 1.5;
        }}
        .container {{ max-width: 1600px; margin: 0 auto; padding: 2rem; }}
        [hidden] {{ display: none !important; }}

        .header {{
            display: flex;
            align-items: baseline;
            gap: 1rem;
            margin-bottom: 2rem;
            padding-bottom: 1rem;
            border-bottom: 1px solid var(--border);
        }}
        .logo {{ font-size: 2rem; font-weight: 800; color: var(--accent); }}
        .subtitle {{ color: var(--dim); }}

        .stats {{
            display: grid;
            grid-template-columns: repeat(3, 1fr);
            gap: 1rem;
            margin-bottom: 2rem;
        }}
        .stat {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.5rem;
            text-align: center;
        }}
        .stat-value {{ font-size: 3rem; font-weight: 700; line-height: 1; }}
        .stat-label {{ color: var(--dim); font-size: 0.875rem; text-transform: uppercase; letter-spacing: 0.05em; margin-top: 0.5rem; }}
        .stat.pass .stat-value {{ color: var(--pass); }}
        .stat.fail .stat-value {{ color: var(--fail); }}

        .card {{
            background: var(--card);
            border: 1px solid var(--border);
            border-radius: 12px;
            padding: 1.5rem;
            margin-bottom: 2rem;
        }}
        .card-title {{ font-size: 1rem; font-weight: 600; margin-bottom: 1rem; color: var(--dim); }}
        .toolbar {{ display: flex; flex-wrap: wrap; gap: 1.5rem; align-items: center; margin-bottom: 1rem; }}
        label {{ color: var(--dim); font-size: 0.875rem; }}
        select {{
            background: var(--bg);
            color: var(--text);
            border: 1px solid var(--border);
            border-radius: 6px;
            padding: 0.375rem 0.75rem;
            margin-left: 0.5rem;
        }}
        select:disabled {{ opacity: 0.5; }}
        #{chart} {{ width: 100%; }}
        #{controls} {{ display: flex; gap: 2rem; margin-top: 1rem; color: var(--dim); font-size: 0.875rem; }}
        .alert-warning {{
            border: 1px solid var(--warn);
            border-radius: 8px;
            padding: 1rem;
            color: var(--warn);
        }}
        .loading {{ color: var(--dim); padding: 2rem; text-align: center; }}
        #status {{ color: var(--fail); margin-bottom: 1rem; }}
        .footer {{ color: var(--dim); font-size: 0.75rem; margin-top: 2rem; }}
    </style>
</head>
<body>
<div class="container">
    <div class="header">
        <span class="logo">{title}</span>
        <span class="subtitle">{samples} sample(s), {genomes} genome(s)</span>
    </div>

    <div id="status" hidden></div>

    <div class="stats">
        <div class="stat"><div class="stat-value" {sample_count}>-</div><div class="stat-label">Samples</div></div>
        <div class="stat pass"><div class="stat-value" {pass_count}>0</div><div class="stat-label">Passed</div></div>
        <div class="stat fail"><div class="stat-value" {fail_count}>0</div><div class="stat-label">Failed</div></div>
    </div>

    <div class="card">
        <div class="card-title">Reference representation vs. contamination</div>
        <div class="toolbar">
            <label>Taxonomic level <select {level}></select></label>
            <label><input type="checkbox" {pass_only}> Passing genomes only</label>
            <label><input type="checkbox" {reverse_y}> Reverse contamination axis</label>
        </div>
        <div {chart_attrs}></div>
        <div {controls_attrs}></div>
    </div>

    <div class="card">
        <div class="card-title">Genome detail</div>
        <div class="toolbar">
            <label>Sample <select {sample}></select></label>
            <label>MAG <select {entity}></select></label>
        </div>
        <div {card} hidden>
            <div class="loading" {loading} hidden>Loading…</div>
            <div {content}></div>
        </div>
    </div>

    <div class="footer">Generated {generated_at}</div>
</div>
"#,
        title = html_escape(title),
        vega = VEGA,
        vega_lite = VEGA_LITE,
        vega_embed = VEGA_EMBED,
        chart = Element::Chart.id(),
        controls = Element::Controls.id(),
        samples = data.groups.samples().filter(|s| !s.is_empty()).count(),
        genomes = genomes,
        sample_count = attrs(Element::SampleCount),
        pass_count = attrs(Element::PassCount),
        fail_count = attrs(Element::FailCount),
        level = attrs(Element::LevelSelect),
        pass_only = attrs(Element::PassOnlyToggle),
        reverse_y = attrs(Element::ReverseYToggle),
        chart_attrs = attrs(Element::Chart),
        controls_attrs = attrs(Element::Controls),
        sample = attrs(Element::SampleSelect),
        entity = attrs(Element::EntitySelect),
        card = attrs(Element::PlotCard),
        loading = attrs(Element::Loading),
        content = attrs(Element::PlotContent),
        generated_at = html_escape(generated_at),
    )?;

    writer.write_all(PAGE_SCRIPT.as_bytes())?;
    writer.write_all(b"</body>\n</html>\n")?;
    Ok(())
}

/// Applies server snapshots to the DOM and forwards control events
const PAGE_SCRIPT: &str = r#"<script>
const applied = { chart: null, detail: null, options: {}, view: null };

function showStatus(message) {
    const status = document.getElementById('status');
    status.textContent = message || '';
    status.hidden = !message;
}

function rehostScripts(target, scripts) {
    for (const s of scripts) {
        const el = document.createElement('script');
        for (const [name, value] of Object.entries(s.attributes)) {
            el.setAttribute(name, value);
        }
        el.textContent = s.body;
        target.appendChild(el);
    }
}

function applyDetail(detail) {
    const key = JSON.stringify(detail);
    if (key === applied.detail) return;
    applied.detail = key;
    const content = document.getElementById('plot-content');
    if (!content) return;
    switch (detail.kind) {
        case 'fragment':
            content.innerHTML = detail.markup;
            rehostScripts(content, detail.scripts);
            break;
        case 'warning':
            content.innerHTML = detail.html;
            break;
        default:
            content.innerHTML = '';
    }
}

function placeControls(controls) {
    const area = document.getElementById('plot-controls');
    if (!area) return;
    area.replaceChildren(...controls.map(c => {
        const label = document.createElement('label');
        const input = document.createElement('input');
        const shown = document.createElement('span');
        Object.assign(input, { type: 'range', min: c.min, max: c.max, step: c.step, value: c.value });
        shown.textContent = Number(c.value).toFixed(2);
        input.addEventListener('input', () => {
            shown.textContent = Number(input.value).toFixed(2);
            if (applied.view) applied.view.signal(c.param, Number(input.value)).runAsync();
        });
        label.append(c.label + ' ', input, shown);
        return label;
    }));
}

async function applyChart(chart, controls) {
    const key = JSON.stringify(chart);
    if (!chart || key === applied.chart) return;
    applied.chart = key;
    placeControls(controls || []);
    try {
        const result = await vegaEmbed('#summary-plot', chart, { actions: false });
        applied.view = result.view;
    } catch (err) {
        applied.view = null;
        console.error('summary plot not rendered', err);
    }
}

function apply(snapshot) {
    for (const [id, options] of Object.entries(snapshot.options)) {
        const el = document.getElementById(id);
        const key = JSON.stringify(options);
        if (!el || applied.options[id] === key) continue;
        applied.options[id] = key;
        el.replaceChildren(...options.map(o => new Option(o.label, o.value)));
    }
    for (const [id, value] of Object.entries(snapshot.values)) {
        const el = document.getElementById(id);
        if (el) el.value = value;
    }
    for (const el of document.querySelectorAll('[data-ui]')) {
        const id = el.dataset.ui;
        el.hidden = snapshot.hidden.includes(id);
        if ('disabled' in el) el.disabled = snapshot.disabled.includes(id);
        if (el.type === 'checkbox') el.checked = snapshot.checked.includes(id);
    }
    for (const [id, text] of Object.entries(snapshot.text)) {
        const el = document.getElementById(id);
        if (el) el.textContent = text;
    }
    applyDetail(snapshot.detail);
    return applyChart(snapshot.chart, snapshot.controls);
}

async function request(url, options) {
    try {
        const response = await fetch(url, options);
        const body = await response.json();
        if (!body.ok) throw new Error(body.error || ('HTTP ' + response.status));
        showStatus(null);
        await apply(body.data);
        if (body.data.pending != null) {
            return request('/api/detail', { method: 'POST' });
        }
    } catch (err) {
        showStatus('Report server unavailable. Run `gunc-viz serve <report dir>` to explore this report. (' + err.message + ')');
    }
}

for (const el of document.querySelectorAll('[data-control]')) {
    el.addEventListener('change', () => {
        const value = el.type === 'checkbox' ? String(el.checked) : el.value;
        request('/api/event', {
            method: 'POST',
            headers: { 'Content-Type': 'application/x-www-form-urlencoded' },
            body: new URLSearchParams({ control: el.dataset.control, value }),
        });
    });
}

request('/api/state');
</script>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::QualityRecord;

    fn render(data: &ReportData) -> String {
        let mut out = Vec::new();
        write(&mut out, data, "GUNC <report>", "2024-01-01T00:00:00Z").unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_page_has_every_element() {
        let html = render(&ReportData::default());
        for element in Element::ALL {
            assert!(
                html.contains(&format!(r#"id="{}""#, element.id())),
                "page should contain #{}",
                element.id()
            );
        }
    }

    #[test]
    fn test_page_wires_controls() {
        let html = render(&ReportData::default());
        for control in ["sample", "entity", "level", "pass_only", "reverse_y"] {
            assert!(html.contains(&format!(r#"data-control="{}""#, control)));
        }
        assert!(html.contains("/api/event"));
        assert!(html.contains("/api/detail"));
        assert!(html.contains("snapshot.controls"));
        assert!(html.contains("vega-embed@6"));
    }

    #[test]
    fn test_title_escaped() {
        let html = render(&ReportData::default());
        assert!(html.contains("GUNC &lt;report&gt;"));
        assert!(!html.contains("<title>GUNC <report>"));
    }

    #[test]
    fn test_header_counts() {
        let data = ReportData::from_records(vec![
            QualityRecord::new("S1", "a", "kingdom"),
            QualityRecord::new("S1", "b", "kingdom"),
            QualityRecord::new("S2", "c", "kingdom"),
        ]);
        let html = render(&data);
        assert!(html.contains("2 sample(s), 3 genome(s)"));
    }

    #[test]
    fn test_detail_card_starts_hidden() {
        let html = render(&ReportData::default());
        assert!(html.contains(r#"id="plot-card" data-ui="plot-card" hidden"#));
    }
}
