//! HTML pages.

use std::fmt::Write;

use super::charts::{self, ChartKind};
use super::eda::{BatchPredictions, EdaReport, MAX_COLUMNS};
use crate::config::ServerSettings;
use crate::dataset::Cell;
use crate::ml::Prediction;
use crate::stats::{CategoryCounts, NumericSummary};
use crate::store::ModelArtifact;

/// Loaded model, or the message explaining why none is available.
pub type ModelStatus<'a> = Result<&'a ModelArtifact, &'a str>;

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0 auto;max-width:1080px;padding:0 16px 48px;color:#222}\
h1{font-size:1.6rem}h2{font-size:1.2rem;margin-top:2rem;border-bottom:1px solid #ddd}\
table{border-collapse:collapse;margin:8px 0;font-size:.9rem}th,td{border:1px solid #ccc;padding:3px 8px;text-align:right}\
th{background:#f3f3f3}td.text{text-align:left}\
.panel{border:1px solid #ccc;border-radius:6px;padding:12px 16px;margin:12px 0}\
.error{border-color:#c0392b;background:#fdecea}.ok{border-color:#2e7d32;background:#eef7ee}.notice{color:#555}\
form.grid{display:grid;grid-template-columns:repeat(auto-fill,minmax(220px,1fr));gap:8px 16px;align-items:end}\
label{display:block;font-size:.85rem;color:#444}input,select{width:100%;box-sizing:border-box}\
.chart{max-width:100%;height:auto}.chart-title{font-size:14px;font-weight:600}.tick{font-size:10px;fill:#555}\
.charts{display:flex;flex-wrap:wrap;gap:16px}";

/// Escape text for HTML bodies and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width, initial-scale=1\"><title>{title}</title><style>{STYLE}</style></head><body><h1><a href=\"/\" style=\"color:inherit;text-decoration:none\">tabpredict</a></h1>{body}</body></html>",
        title = escape_html(title),
    )
}

/// Upload form fields naming the column for each chart.
const CHART_COLUMN_FIELDS: [(&str, &str); 6] = [
    ("bar_column", "Bar chart column (categorical)"),
    ("pie_column", "Pie chart column (categorical)"),
    ("hist_column", "Histogram column (numeric)"),
    ("scatter_x", "Scatter X (numeric)"),
    ("scatter_y", "Scatter Y (numeric)"),
    ("scatter_color", "Scatter colour (categorical, optional)"),
];

/// State of the manual prediction form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionView {
    /// Raw text entered per model feature, in feature order.
    pub inputs: Vec<String>,
    /// Features left blank and filled by the model's imputation values.
    pub imputed: Vec<String>,
    pub result: Option<Result<Prediction, String>>,
}

/// The single page: model status, prediction form, upload form.
pub fn home_page(model: ModelStatus<'_>, settings: &ServerSettings, view: &PredictionView) -> String {
    let mut body = String::new();
    model_panel(&mut body, model);
    if let Ok(artifact) = model {
        predict_section(&mut body, artifact, view);
    }
    upload_section(&mut body, settings);
    layout("tabpredict", &body)
}

fn model_panel(out: &mut String, model: ModelStatus<'_>) {
    match model {
        Ok(artifact) => {
            let _ = write!(
                out,
                "<div class=\"panel ok\"><strong>Model loaded:</strong> {kind} predicting <code>{label}</code> from {n} feature(s); classes: {classes}. <span class=\"notice\">id {id}, created {created}</span></div>",
                kind = escape_html(artifact.kind().as_str()),
                label = escape_html(&artifact.label_column),
                n = artifact.feature_names().len(),
                classes = escape_html(&artifact.classes().join(", ")),
                id = escape_html(&artifact.model_id),
                created = escape_html(&artifact.created_at),
            );
        }
        Err(message) => {
            let _ = write!(
                out,
                "<div class=\"panel error\"><strong>No model available.</strong> {}<br>Run <code>tabpredict-train</code> to create one, then restart the application. Uploads and statistics still work.</div>",
                escape_html(message)
            );
        }
    }
}

fn predict_section(out: &mut String, artifact: &ModelArtifact, view: &PredictionView) {
    out.push_str("<h2>Predict</h2><form class=\"grid\" method=\"post\" action=\"/predict\">");
    for (idx, name) in artifact.feature_names().iter().enumerate() {
        let value = view.inputs.get(idx).map(String::as_str).unwrap_or("");
        let _ = write!(
            out,
            "<div><label for=\"f{idx}\">{label}</label><input id=\"f{idx}\" name=\"{name}\" type=\"text\" inputmode=\"decimal\" value=\"{value}\"></div>",
            label = escape_html(name),
            name = escape_html(name),
            value = escape_html(value),
        );
    }
    out.push_str("<div><button type=\"submit\">Predict</button></div></form>");
    if artifact.pipeline.missing.imputes() {
        out.push_str("<p class=\"notice\">Blank fields are filled with the values learned during training.</p>");
    }

    match &view.result {
        None => {}
        Some(Err(message)) => {
            let _ = write!(out, "<div class=\"panel error\">{}</div>", escape_html(message));
        }
        Some(Ok(prediction)) => {
            let _ = write!(
                out,
                "<div class=\"panel ok\"><strong>Predicted {label}:</strong> {value} with probability {p:.1}%</div>",
                label = escape_html(&artifact.label_column),
                value = escape_html(&prediction.label),
                p = prediction.probability * 100.0,
            );
            if !view.imputed.is_empty() {
                let _ = write!(
                    out,
                    "<p class=\"notice\">Imputed: {}</p>",
                    escape_html(&view.imputed.join(", "))
                );
            }
            out.push_str("<table><tr><th>class</th><th>probability</th></tr>");
            for (class, p) in &prediction.probabilities {
                let _ = write!(
                    out,
                    "<tr><td class=\"text\">{}</td><td>{:.4}</td></tr>",
                    escape_html(class),
                    p
                );
            }
            out.push_str("</table>");
            let bars: Vec<(String, f64)> = prediction.probabilities.clone();
            out.push_str(&charts::bar_chart("Class probabilities", &bars));
        }
    }
}

fn upload_section(out: &mut String, settings: &ServerSettings) {
    let max_rows = settings.max_sample_rows;
    let _ = write!(
        out,
        "<h2>Explore a CSV</h2><form class=\"grid\" method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\
<div><label for=\"file\">CSV file</label><input id=\"file\" name=\"file\" type=\"file\" accept=\".csv,text/csv\" required></div>\
<div><label for=\"delimiter\">Delimiter</label><select id=\"delimiter\" name=\"delimiter\"><option value=\",\">comma (,)</option><option value=\";\">semicolon (;)</option><option value=\"tab\">tab</option></select></div>\
<div><label for=\"decimal\">Decimal separator</label><select id=\"decimal\" name=\"decimal\"><option value=\".\">point (.)</option><option value=\",\">comma (,)</option></select></div>\
<div><label for=\"encoding\">Encoding</label><select id=\"encoding\" name=\"encoding\"><option value=\"utf-8\">utf-8</option><option value=\"latin-1\">latin-1</option></select></div>\
<div><label for=\"na_values\">Missing-value tokens (comma separated)</label><input id=\"na_values\" name=\"na_values\" value=\"NA,N/A,.,null,\"></div>\
<div><label for=\"sample_rows\">Sample rows (max {max_rows})</label><input id=\"sample_rows\" name=\"sample_rows\" type=\"number\" min=\"1\" max=\"{max_rows}\" value=\"{max_rows}\"></div>\
<div><label for=\"seed\">Sampling seed</label><input id=\"seed\" name=\"seed\" type=\"number\" min=\"0\" value=\"123\"></div>\
<div><label for=\"columns\">Columns (up to {MAX_COLUMNS}, blank = first {MAX_COLUMNS})</label><input id=\"columns\" name=\"columns\" placeholder=\"edad, puntos, equipo\"></div>\
<div><label for=\"missing_pct\">Inject missing values (%)</label><input id=\"missing_pct\" name=\"missing_pct\" type=\"number\" min=\"0\" max=\"30\" step=\"5\" value=\"0\"></div>\
<div><label for=\"bins\">Histogram bins</label><input id=\"bins\" name=\"bins\" type=\"number\" min=\"5\" max=\"60\" value=\"25\"></div>"
    );
    for (name, label) in CHART_COLUMN_FIELDS {
        let _ = write!(
            out,
            "<div><label for=\"{name}\">{label}</label><input id=\"{name}\" name=\"{name}\" placeholder=\"first suitable column\"></div>"
        );
    }
    out.push_str("<div>");
    for kind in ChartKind::ALL {
        let checked = if ChartKind::DEFAULT.contains(&kind) { " checked" } else { "" };
        let _ = write!(
            out,
            "<label><input type=\"checkbox\" name=\"chart\" value=\"{value}\" style=\"width:auto\"{checked}> {label}</label>",
            value = kind.as_str(),
            label = escape_html(kind.label()),
        );
    }
    out.push_str(
        "</div><div><button type=\"submit\" name=\"action\" value=\"analyze\">Analyze</button> <button type=\"submit\" name=\"action\" value=\"download\">Download processed CSV</button></div></form>\
<p class=\"notice\">No data at hand? Download a <a href=\"/synthetic.csv?rows=300&amp;seed=42\">synthetic sports dataset</a>.</p>",
    );
}

/// Result page for `POST /upload`.
pub fn upload_page(model: ModelStatus<'_>, settings: &ServerSettings, report: &EdaReport) -> String {
    let mut body = String::new();
    model_panel(&mut body, model);
    let _ = write!(
        body,
        "<h2>{name}</h2><p>{total} row(s) read, {shown} analysed; {cols} of {all} column(s) shown; {missing} missing cell(s).</p>",
        name = escape_html(&report.file_name),
        total = report.total_rows,
        shown = report.table.row_count(),
        cols = report.table.column_count(),
        all = report.all_columns.len(),
        missing = report.table.missing_cells(),
    );
    for notice in &report.notices {
        let _ = write!(body, "<p class=\"notice\">{}</p>", escape_html(notice));
    }
    let _ = write!(
        body,
        "<p class=\"notice\">All columns: {}</p>",
        escape_html(&report.all_columns.join(", "))
    );

    body.push_str("<h2>Preview</h2>");
    preview_table(&mut body, report, settings.preview_rows);

    if !report.summaries.is_empty() {
        body.push_str("<h2>Numeric summary</h2>");
        summary_table(&mut body, &report.summaries);
    }
    if !report.counts.is_empty() {
        body.push_str("<h2>Category counts</h2><div class=\"charts\">");
        for counts in &report.counts {
            counts_table(&mut body, counts);
        }
        body.push_str("</div>");
    }
    if let Some(matrix) = &report.correlation {
        body.push_str("<h2>Correlation</h2>");
        body.push_str(&charts::correlation_table(matrix));
    }
    if !report.charts.is_empty() {
        body.push_str("<h2>Charts</h2><div class=\"charts\">");
        for chart in &report.charts {
            body.push_str(&chart.html);
        }
        body.push_str("</div>");
    }
    match &report.predictions {
        None => {}
        Some(Err(message)) => {
            let _ = write!(
                body,
                "<h2>Predictions</h2><p class=\"notice\">{}</p>",
                escape_html(message)
            );
        }
        Some(Ok(batch)) => predictions_table(&mut body, batch),
    }
    body.push_str("<p><a href=\"/\">Back</a></p>");
    layout(&format!("tabpredict: {}", report.file_name), &body)
}

fn preview_table(out: &mut String, report: &EdaReport, limit: usize) {
    out.push_str("<table><tr>");
    for header in report.table.headers() {
        let _ = write!(out, "<th>{}</th>", escape_html(header));
    }
    out.push_str("</tr>");
    for row in report.table.rows().iter().take(limit) {
        out.push_str("<tr>");
        for cell in row {
            match cell {
                Cell::Number { value, .. } => {
                    let _ = write!(out, "<td>{}</td>", format_number(*value));
                }
                Cell::Text(text) => {
                    let _ = write!(out, "<td class=\"text\">{}</td>", escape_html(text));
                }
                Cell::Missing => out.push_str("<td class=\"notice\">NA</td>"),
            }
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    if report.table.row_count() > limit {
        let _ = write!(
            out,
            "<p class=\"notice\">First {limit} of {} rows.</p>",
            report.table.row_count()
        );
    }
}

fn summary_table(out: &mut String, summaries: &[NumericSummary]) {
    out.push_str("<table><tr><th></th><th>count</th><th>missing</th><th>mean</th><th>std</th><th>min</th><th>25%</th><th>50%</th><th>75%</th><th>max</th></tr>");
    for s in summaries {
        let _ = write!(
            out,
            "<tr><th>{}</th><td>{}</td><td>{}</td>",
            escape_html(&s.column),
            s.count,
            s.missing
        );
        for value in [s.mean, s.std, s.min, s.q25, s.median, s.q75, s.max] {
            let _ = write!(out, "<td>{}</td>", value.map(format_number).unwrap_or_default());
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
}

fn counts_table(out: &mut String, counts: &CategoryCounts) {
    let _ = write!(
        out,
        "<table><tr><th class=\"text\">{}</th><th>count</th></tr>",
        escape_html(&counts.column)
    );
    for (value, count) in &counts.counts {
        let _ = write!(
            out,
            "<tr><td class=\"text\">{}</td><td>{count}</td></tr>",
            escape_html(value)
        );
    }
    if counts.missing > 0 {
        let _ = write!(
            out,
            "<tr><td class=\"text notice\">(missing)</td><td>{}</td></tr>",
            counts.missing
        );
    }
    out.push_str("</table>");
}

fn predictions_table(out: &mut String, batch: &BatchPredictions) {
    out.push_str("<h2>Predictions</h2>");
    if let Some(accuracy) = batch.accuracy {
        let _ = write!(
            out,
            "<p>Accuracy against <code>{}</code>: {:.1}%</p>",
            escape_html(batch.label_column.as_deref().unwrap_or_default()),
            accuracy * 100.0
        );
    }
    out.push_str("<table><tr><th>row</th>");
    if batch.label_column.is_some() {
        out.push_str("<th>actual</th>");
    }
    out.push_str("<th>predicted</th><th>probability</th></tr>");
    for row in &batch.rows {
        let _ = write!(out, "<tr><td>{}</td>", row.row);
        if batch.label_column.is_some() {
            let _ = write!(
                out,
                "<td class=\"text\">{}</td>",
                escape_html(row.actual.as_deref().unwrap_or("NA"))
            );
        }
        match &row.outcome {
            Ok((label, p)) => {
                let _ = write!(
                    out,
                    "<td class=\"text\">{}</td><td>{:.3}</td></tr>",
                    escape_html(label),
                    p
                );
            }
            Err(message) => {
                let _ = write!(
                    out,
                    "<td class=\"text notice\" colspan=\"2\">{}</td></tr>",
                    escape_html(message)
                );
            }
        }
    }
    out.push_str("</table>");
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.3}")
    }
}

/// Page shown for rejected requests.
pub fn error_page(title: &str, message: &str) -> String {
    let body = format!(
        "<h2>{}</h2><div class=\"panel error\">{}</div><p><a href=\"/\">Back</a></p>",
        escape_html(title),
        escape_html(message)
    );
    layout(title, &body)
}

pub fn not_found_page(path: &str) -> String {
    error_page("Not found", &format!("Nothing is served at {path}."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html("<a href=\"x\">&'</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn missing_model_message_is_rendered() {
        let page = home_page(
            Err("Model unavailable at models/model.json: cannot read artifact"),
            &ServerSettings::default(),
            &PredictionView::default(),
        );
        assert!(page.contains("No model available."));
        assert!(page.contains("models/model.json"));
        assert!(!page.contains("action=\"/predict\""));
        assert!(page.contains("action=\"/upload\""));
        assert!(page.contains("value=\"latin-1\""));
        assert!(page.contains("name=\"scatter_color\""));
        assert!(page.contains("value=\"download\""));
    }

    #[test]
    fn not_found_escapes_path() {
        let page = not_found_page("/<script>");
        assert!(page.contains("/&lt;script&gt;"));
    }

    #[test]
    fn numbers_drop_trailing_zeros_for_integers() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(2.5), "2.500");
    }
}
