//! Request routing, independent of the socket layer.

use super::AppState;
use super::eda;
use super::forms::{self, Form};
use super::render::{self, PredictionView};
use crate::Error;
use crate::synthetic;

const HTML: &str = "text/html; charset=utf-8";
const CSV: &str = "text/csv; charset=utf-8";
const MAX_SYNTHETIC_ROWS: usize = 5000;

/// Fully rendered response.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    /// Suggested file name for downloads.
    pub attachment: Option<String>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: HTML,
            attachment: None,
            body: body.into_bytes(),
        }
    }

    pub fn error(status: u16, title: &str, message: &str) -> Self {
        Self::html(status, render::error_page(title, message))
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Route one request; `url` may carry a query string.
pub fn handle(
    state: &AppState,
    method: &str,
    url: &str,
    content_type: Option<&str>,
    body: &[u8],
) -> Reply {
    let (path, query) = url.split_once('?').unwrap_or((url, ""));
    match (method, path) {
        ("GET", "/") | ("HEAD", "/") => Reply::html(
            200,
            render::home_page(
                state.model_status(),
                &state.settings.server,
                &PredictionView::default(),
            ),
        ),
        ("POST", "/predict") => predict(state, body),
        ("POST", "/upload") => upload(state, content_type, body),
        ("GET", "/synthetic.csv") => synthetic_csv(query),
        (_, "/" | "/predict" | "/upload" | "/synthetic.csv") => {
            Reply::error(405, "Method not allowed", &format!("{method} is not supported on {path}."))
        }
        _ => Reply::html(404, render::not_found_page(path)),
    }
}

fn predict(state: &AppState, body: &[u8]) -> Reply {
    let artifact = match &state.model {
        Ok(artifact) => artifact,
        Err(message) => return Reply::error(503, "No model available", message),
    };
    let form = Form::urlencoded(body);
    let mut view = PredictionView::default();
    let mut raw = Vec::with_capacity(artifact.feature_names().len());
    let mut invalid = Vec::new();
    for name in artifact.feature_names() {
        let text = form.value(name).unwrap_or_default();
        if text.is_empty() {
            raw.push(None);
            if artifact.pipeline.missing.imputes() {
                view.imputed.push(name.clone());
            }
        } else {
            match parse_feature(&text) {
                Some(value) => raw.push(Some(value)),
                None => {
                    invalid.push(format!("'{text}' for {name}"));
                    raw.push(None);
                }
            }
        }
        view.inputs.push(text);
    }

    let status = if !invalid.is_empty() {
        view.result = Some(Err(format!("Not a number: {}.", invalid.join(", "))));
        400
    } else {
        match artifact.predict(&raw) {
            Ok(prediction) => {
                tracing::info!(
                    "Predicted {} (p={:.3})",
                    prediction.label,
                    prediction.probability
                );
                view.result = Some(Ok(prediction));
                200
            }
            Err(err @ Error::SchemaMismatch(_)) => {
                view.result = Some(Err(err.to_string()));
                400
            }
            Err(err) => {
                tracing::error!("Prediction failed: {err}");
                view.result = Some(Err(err.to_string()));
                500
            }
        }
    };
    if status != 200 {
        view.imputed.clear();
    }
    Reply::html(
        status,
        render::home_page(Ok(artifact), &state.settings.server, &view),
    )
}

/// Accepts `1.5`, `-2`, and a decimal comma (`1,5`).
fn parse_feature(text: &str) -> Option<f64> {
    let value = match text.parse::<f64>() {
        Ok(value) => value,
        Err(_) => text.replacen(',', ".", 1).parse::<f64>().ok()?,
    };
    value.is_finite().then_some(value)
}

fn upload(state: &AppState, content_type: Option<&str>, body: &[u8]) -> Reply {
    let Some(boundary) = content_type.and_then(forms::multipart_boundary) else {
        return Reply::error(400, "Upload rejected", "expected a multipart/form-data body");
    };
    let form = match forms::parse_multipart(body, &boundary) {
        Ok(form) => form,
        Err(message) => return Reply::error(400, "Upload rejected", &message),
    };
    if form.value("action").as_deref() == Some("download") {
        return match eda::export_csv(&form, &state.settings.server) {
            Ok((file_name, body)) => Reply {
                status: 200,
                content_type: CSV,
                attachment: Some(file_name),
                body,
            },
            Err(message) => {
                tracing::warn!("Export rejected: {message}");
                Reply::error(400, "Upload rejected", &message)
            }
        };
    }
    match eda::analyze(&form, &state.settings.server, state.model.as_ref().ok()) {
        Ok(report) => Reply::html(
            200,
            render::upload_page(state.model_status(), &state.settings.server, &report),
        ),
        Err(message) => {
            tracing::warn!("Upload rejected: {message}");
            Reply::error(400, "Upload rejected", &message)
        }
    }
}

fn synthetic_csv(query: &str) -> Reply {
    let form = Form::urlencoded(query.as_bytes());
    let parse = |name: &str, default: u64| -> Result<u64, String> {
        match form.value(name) {
            None => Ok(default),
            Some(text) if text.is_empty() => Ok(default),
            Some(text) => text
                .parse()
                .map_err(|_| format!("'{text}' is not a valid value for {name}")),
        }
    };
    let params = parse("rows", 300).and_then(|rows| {
        let seed = parse("seed", 42)?;
        let missing = parse("missing", 0)?;
        Ok((rows, seed, missing))
    });
    let (rows, seed, missing) = match params {
        Ok(params) => params,
        Err(message) => return Reply::error(400, "Bad request", &message),
    };
    let rows = (rows as usize).clamp(1, MAX_SYNTHETIC_ROWS);
    let mut table = synthetic::generate_sports(rows, seed);
    table.inject_missing(missing.min(30) as f64 / 100.0, seed);
    let mut body = Vec::new();
    if let Err(err) = table.write_csv(&mut body) {
        return Reply::error(500, "Export failed", &err.to_string());
    }
    Reply {
        status: 200,
        content_type: CSV,
        attachment: Some(format!("sports_{rows}_{seed}.csv")),
        body,
    }
}
