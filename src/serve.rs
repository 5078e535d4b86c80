//! HTTP server for the interactive report
//!
//! `gunc-viz serve ./report` → loads `report.json`, starts the server, opens
//! the browser.
//!
//! One [`Session`] holds the controller and its in-memory page. Requests are
//! handled one at a time, so control events are applied in arrival order and
//! every response carries the complete page state. A selection answers with
//! the card in its loading state and a `pending` token; the page then asks
//! `/api/detail` for the fragment.
//!
//! | Route                    | Answer                                   |
//! |--------------------------|------------------------------------------|
//! | `GET /`                  | the report page                          |
//! | `GET /api/state`         | current snapshot                         |
//! | `GET/POST /api/event`    | apply `control=...&value=...`, snapshot  |
//! | `GET/POST /api/detail`   | finish the pending detail load, snapshot |
//! | `GET /plots/...`         | detail fragment files                    |

use crate::config::ViewerOptions;
use crate::drilldown::{DrillDownController, LoadOutcome, PendingLoad};
use crate::error::{Error, Result};
use crate::fragment::{DirSource, PLOTS_DIR};
use crate::record::ReportData;
use crate::report::{self, html};
use crate::ui::{Element, HeadlessUi, UiPort};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::io::Read;
use std::path::{Path, PathBuf};
use tiny_http::{Header, Method, Request, Response, Server};

#[derive(Serialize)]
struct ApiResponse<T> {
    ok: bool,
    data: Option<T>,
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn success(data: T) -> Self {
        Self { ok: true, data: Some(data), error: None }
    }
}

impl ApiResponse<()> {
    fn failure(message: impl Into<String>) -> Self {
        Self { ok: false, data: None, error: Some(message.into()) }
    }
}

/// Which control changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Control {
    Sample,
    Entity,
    Level,
    PassOnly,
    ReverseY,
}

impl Control {
    pub fn element(self) -> Element {
        match self {
            Control::Sample => Element::SampleSelect,
            Control::Entity => Element::EntitySelect,
            Control::Level => Element::LevelSelect,
            Control::PassOnly => Element::PassOnlyToggle,
            Control::ReverseY => Element::ReverseYToggle,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EventParams {
    pub control: Control,
    #[serde(default)]
    pub value: String,
}

impl EventParams {
    /// From a query string, form body or JSON body, in that order
    pub fn parse(query: Option<&str>, body: &str) -> Option<Self> {
        if let Some(params) = query.and_then(|q| serde_urlencoded::from_str::<EventParams>(q).ok()) {
            return Some(params);
        }
        let body = body.trim();
        if body.is_empty() {
            return None;
        }
        serde_urlencoded::from_str(body)
            .ok()
            .or_else(|| serde_json::from_str(body).ok())
    }
}

fn is_on(value: &str) -> bool {
    matches!(value, "true" | "on" | "1")
}

/// An HTTP answer, before it is written to the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self { status, content_type: "application/json", body },
            Err(e) => Self::text(500, &e.to_string()),
        }
    }

    fn text(status: u16, body: &str) -> Self {
        Self { status, content_type: "text/plain; charset=utf-8", body: body.as_bytes().to_vec() }
    }

    fn not_found() -> Self {
        Self::text(404, "Not found")
    }
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// One viewer: controller, page state and the report it reads from
pub struct Session {
    controller: DrillDownController,
    ui: HeadlessUi,
    source: DirSource,
    page: String,
    /// Detail load started by the last selection, finished by `/api/detail`
    pending: Option<PendingLoad>,
}

impl Session {
    pub fn new<P: Into<PathBuf>>(data: ReportData, options: ViewerOptions, report_dir: P) -> Self {
        let mut page = Vec::new();
        let generated_at = chrono::Local::now().to_rfc3339();
        if let Err(e) = html::write(&mut page, &data, report::DEFAULT_TITLE, &generated_at) {
            tracing::error!(error = %e, "failed to render report page");
        }

        let mut session = Self {
            controller: DrillDownController::new(data, options),
            ui: HeadlessUi::new(),
            source: DirSource::new(report_dir),
            page: String::from_utf8_lossy(&page).into_owned(),
            pending: None,
        };
        session.pending = session.controller.initialize(&mut session.ui);
        session
    }

    /// Load the report in `report_dir` with the given options
    pub fn open<P: AsRef<Path>>(report_dir: P, options: ViewerOptions) -> Result<Self> {
        let report_dir = report_dir.as_ref();
        let data = report::load(report_dir)?;
        Ok(Self::new(data, options, report_dir))
    }

    /// Fetch the detail view of the current selection, if one is waiting
    pub fn finish_load(&mut self) -> Option<LoadOutcome> {
        let pending = self.pending.take()?;
        Some(self.controller.load(&mut self.ui, &self.source, &pending))
    }

    pub fn ui(&self) -> &HeadlessUi {
        &self.ui
    }

    /// Page state, plus the token of a detail load still to be finished
    pub fn snapshot(&self) -> Value {
        let mut snapshot = self.ui.snapshot();
        if let Some(object) = snapshot.as_object_mut() {
            object.insert("pending".to_string(), json!(self.pending.as_ref().map(|p| p.token)));
        }
        snapshot
    }

    /// Apply one control change the way the page would have.
    /// Changes to disabled controls are ignored.
    pub fn apply(&mut self, event: &EventParams) {
        let element = event.control.element();
        if !self.ui.is_enabled(element) {
            tracing::debug!(control = ?event.control, "ignoring event on disabled control");
            return;
        }

        match event.control {
            Control::Sample => {
                self.ui.set_value(element, &event.value);
                self.pending = self.controller.sample_changed(&mut self.ui);
            }
            Control::Entity => {
                self.ui.set_value(element, &event.value);
                self.pending = self.controller.entity_changed(&mut self.ui);
            }
            Control::Level => {
                self.ui.set_value(element, &event.value);
                self.controller.filters_changed(&mut self.ui);
            }
            Control::PassOnly | Control::ReverseY => {
                self.ui.set_checked(element, is_on(&event.value));
                self.controller.filters_changed(&mut self.ui);
            }
        }
    }

    /// Route one request
    pub fn handle(&mut self, method: &Method, url: &str, body: &str) -> Reply {
        let mut parts = url.splitn(2, '?');
        let path = parts.next().unwrap_or("/");
        let query = parts.next();

        match (method, path) {
            (&Method::Get, "/") | (&Method::Get, "/index.html") => Reply {
                status: 200,
                content_type: "text/html; charset=utf-8",
                body: self.page.clone().into_bytes(),
            },

            (&Method::Get, "/api/state") => Reply::json(200, &ApiResponse::success(self.snapshot())),

            (&Method::Get, "/api/event") | (&Method::Post, "/api/event") => {
                match EventParams::parse(query, body) {
                    Some(event) => {
                        tracing::debug!(control = ?event.control, value = %event.value, "event");
                        self.apply(&event);
                        Reply::json(200, &ApiResponse::success(self.snapshot()))
                    }
                    None => Reply::json(400, &ApiResponse::failure("expected control=<name>&value=<value>")),
                }
            }

            (&Method::Get, "/api/detail") | (&Method::Post, "/api/detail") => {
                if let Some(outcome) = self.finish_load() {
                    tracing::debug!(?outcome, "detail view settled");
                }
                Reply::json(200, &ApiResponse::success(self.snapshot()))
            }

            (&Method::Get, p) if p.starts_with(&format!("/{}/", PLOTS_DIR)) => self.static_file(p),

            _ => Reply::not_found(),
        }
    }

    fn static_file(&self, path: &str) -> Reply {
        let Some(full) = self.source.resolve(path) else {
            return Reply::text(403, "Forbidden");
        };
        match std::fs::read(&full) {
            Ok(body) => Reply { status: 200, content_type: content_type(&full), body },
            Err(_) => Reply::not_found(),
        }
    }
}

/// Start server, open browser, serve the report
pub fn start<P: AsRef<Path>>(port: u16, report_dir: P, options: ViewerOptions, open_browser: bool) -> Result<()> {
    let report_dir = report_dir.as_ref();
    let mut session = Session::open(report_dir, options)?;

    let addr = format!("127.0.0.1:{}", port);
    let server = Server::http(&addr).map_err(|e| Error::Server {
        addr: addr.clone(),
        message: e.to_string(),
    })?;

    let url = format!("http://localhost:{}", port);
    eprintln!("\n\x1b[1;32mgunc-viz\x1b[0m");
    eprintln!("   {}", url);
    eprintln!("   Report: {}\n", report_dir.display());
    tracing::info!(%url, report = %report_dir.display(), "serving report");

    if open_browser {
        if let Err(e) = open::that(&url) {
            tracing::warn!(error = %e, "could not open browser");
        }
    }

    for request in server.incoming_requests() {
        if let Err(e) = handle_request(request, &mut session) {
            tracing::warn!(error = %e, "request failed");
        }
    }

    Ok(())
}

fn handle_request(mut request: Request, session: &mut Session) -> std::io::Result<()> {
    let url = request.url().to_string();
    let method = request.method().clone();

    let mut body = String::new();
    if method == Method::Post {
        request.as_reader().read_to_string(&mut body)?;
    }

    let reply = session.handle(&method, &url, &body);
    tracing::debug!(method = %method, %url, status = reply.status, "request");

    let mut response = Response::from_data(reply.body).with_status_code(reply.status);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], reply.content_type.as_bytes()) {
        response.add_header(header);
    }
    request.respond(response)
}
