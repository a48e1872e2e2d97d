//! Exploratory analysis of an uploaded CSV.

use std::borrow::Cow;
use std::collections::BTreeMap;

use super::charts::{self, ChartKind};
use super::forms::Form;
use crate::config::ServerSettings;
use crate::dataset::{ColumnKind, CsvOptions, DEFAULT_NA_VALUES, Table};
use crate::stats::{self, CategoryCounts, CorrelationMatrix, NumericSummary};
use crate::store::ModelArtifact;

/// Most columns shown at once.
pub const MAX_COLUMNS: usize = 6;
pub const MAX_MISSING_PCT: f64 = 30.0;
pub const DEFAULT_SAMPLE_SEED: u64 = 123;
pub const DEFAULT_BINS: usize = 25;

/// Character encoding of the uploaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    Latin1,
}

impl TextEncoding {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "utf-8" | "utf8" => Some(TextEncoding::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" => Some(TextEncoding::Latin1),
            _ => None,
        }
    }

    /// Re-encode `data` as UTF-8 for the CSV reader.
    pub fn to_utf8(self, data: &[u8]) -> Cow<'_, [u8]> {
        match self {
            TextEncoding::Utf8 => Cow::Borrowed(data),
            // Every ISO-8859-1 byte is the code point of the same value.
            TextEncoding::Latin1 => Cow::Owned(
                data.iter()
                    .map(|&byte| char::from(byte))
                    .collect::<String>()
                    .into_bytes(),
            ),
        }
    }
}

/// Columns picked for individual charts; `None` takes the first suitable column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartColumns {
    pub bar: Option<String>,
    pub pie: Option<String>,
    pub histogram: Option<String>,
    pub scatter_x: Option<String>,
    pub scatter_y: Option<String>,
    /// Categorical column colouring the scatter points.
    pub scatter_color: Option<String>,
}

impl ChartColumns {
    fn from_form(form: &Form) -> Self {
        let pick = |name: &str| {
            form.value(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty() && value != "(none)")
        };
        Self {
            bar: pick("bar_column"),
            pie: pick("pie_column"),
            histogram: pick("hist_column"),
            scatter_x: pick("scatter_x"),
            scatter_y: pick("scatter_y"),
            scatter_color: pick("scatter_color"),
        }
    }
}

/// Options read from the upload form.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadOptions {
    pub csv: CsvOptions,
    pub encoding: TextEncoding,
    pub sample_rows: usize,
    pub seed: u64,
    /// Empty selects the first [`MAX_COLUMNS`] columns.
    pub columns: Vec<String>,
    pub missing_pct: f64,
    pub bins: usize,
    pub charts: Vec<ChartKind>,
    pub chart_columns: ChartColumns,
}

impl UploadOptions {
    pub fn from_form(form: &Form, settings: &ServerSettings) -> Result<Self, String> {
        let delimiter = match form.value("delimiter").as_deref() {
            None | Some("") | Some(",") => b',',
            Some(";") => b';',
            Some("tab") | Some("\\t") | Some("\t") => b'\t',
            Some(other) => return Err(format!("unsupported delimiter '{other}'")),
        };
        let decimal_comma = match form.value("decimal").as_deref() {
            None | Some("") | Some(".") => false,
            Some(",") => true,
            Some(other) => return Err(format!("unsupported decimal separator '{other}'")),
        };
        let encoding = match form.value("encoding") {
            None => TextEncoding::Utf8,
            Some(value) => TextEncoding::parse(&value)
                .ok_or_else(|| format!("unsupported encoding '{value}'"))?,
        };
        if decimal_comma && delimiter == b',' {
            return Err("decimal comma requires ';' or tab as the delimiter".to_string());
        }
        let mut na_values: Vec<String> = match form.field("na_values") {
            Some(field) => field.text().split(',').map(|v| v.trim().to_string()).collect(),
            None => DEFAULT_NA_VALUES.iter().map(|v| (*v).to_string()).collect(),
        };
        if !na_values.iter().any(String::is_empty) {
            na_values.push(String::new());
        }

        let max_rows = settings.max_sample_rows.max(1);
        let sample_rows = parse_number(form, "sample_rows", max_rows)?.clamp(1, max_rows);
        let seed = parse_number(form, "seed", DEFAULT_SAMPLE_SEED)?;
        let missing_pct = parse_number(form, "missing_pct", 0.0f64)?;
        if !missing_pct.is_finite() {
            return Err("missing_pct must be a number".to_string());
        }
        let missing_pct = missing_pct.clamp(0.0, MAX_MISSING_PCT);
        let bins = parse_number(form, "bins", DEFAULT_BINS)?.clamp(5, 60);

        let mut columns: Vec<String> = Vec::new();
        for value in form.values("columns") {
            for name in value.split(',').map(str::trim).filter(|n| !n.is_empty()) {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.to_string());
                }
            }
        }
        if columns.len() > MAX_COLUMNS {
            return Err(format!(
                "select at most {MAX_COLUMNS} columns ({} given)",
                columns.len()
            ));
        }

        let requested = form.values("chart");
        let charts = if form.field("chart").is_none() {
            ChartKind::DEFAULT.to_vec()
        } else {
            let mut charts = Vec::new();
            for name in &requested {
                let kind = ChartKind::parse(name).ok_or_else(|| format!("unknown chart '{name}'"))?;
                if !charts.contains(&kind) {
                    charts.push(kind);
                }
            }
            charts
        };

        Ok(Self {
            csv: CsvOptions {
                delimiter,
                decimal_comma,
                na_values,
            },
            encoding,
            sample_rows,
            seed,
            columns,
            missing_pct,
            bins,
            charts,
            chart_columns: ChartColumns::from_form(form),
        })
    }
}

fn parse_number<T: std::str::FromStr>(form: &Form, name: &str, default: T) -> Result<T, String> {
    match form.value(name) {
        None => Ok(default),
        Some(text) if text.is_empty() => Ok(default),
        Some(text) => text
            .parse::<T>()
            .map_err(|_| format!("'{text}' is not a valid value for {name}")),
    }
}

/// A rendered chart with its heading.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedChart {
    pub title: String,
    pub html: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictedRow {
    /// 1-based row number within the sample.
    pub row: usize,
    pub actual: Option<String>,
    /// Predicted label and its probability, or why the row could not be scored.
    pub outcome: Result<(String, f64), String>,
}

/// Model predictions for the sampled rows.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchPredictions {
    pub label_column: Option<String>,
    pub rows: Vec<PredictedRow>,
    /// Share of scored rows whose prediction matches the label column.
    pub accuracy: Option<f64>,
}

/// Everything the upload result page shows.
#[derive(Debug, Clone, PartialEq)]
pub struct EdaReport {
    pub file_name: String,
    pub total_rows: usize,
    pub options: UploadOptions,
    pub all_columns: Vec<String>,
    /// Sampled, column-restricted table with injected missing values.
    pub table: Table,
    pub summaries: Vec<NumericSummary>,
    pub counts: Vec<CategoryCounts>,
    pub correlation: Option<CorrelationMatrix>,
    pub charts: Vec<RenderedChart>,
    pub notices: Vec<String>,
    /// `None` when no model is loaded.
    pub predictions: Option<Result<BatchPredictions, String>>,
}

/// Upload after sampling, column selection and missing-value injection.
struct ProcessedUpload {
    file_name: String,
    options: UploadOptions,
    full: Table,
    sampled: Table,
    table: Table,
    notices: Vec<String>,
}

fn process_upload(form: &Form, settings: &ServerSettings) -> Result<ProcessedUpload, String> {
    let options = UploadOptions::from_form(form, settings)?;
    let file = form
        .field("file")
        .filter(|field| !field.data.is_empty())
        .ok_or("choose a CSV file to upload")?;
    let file_name = file
        .filename
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "upload.csv".to_string());
    let data = options.encoding.to_utf8(&file.data);
    let full = Table::from_reader(data.as_ref(), &file_name, &options.csv)
        .map_err(|err| format!("{}: {err}", err.kind()))?;
    if full.row_count() == 0 {
        return Err("the file has a header but no data rows".to_string());
    }
    tracing::info!(
        "Upload {file_name}: {} rows x {} columns",
        full.row_count(),
        full.column_count()
    );

    let sampled = full.sample_rows(options.sample_rows, options.seed);
    let columns = if options.columns.is_empty() {
        full.headers().iter().take(MAX_COLUMNS).cloned().collect()
    } else {
        options.columns.clone()
    };
    let mut table = sampled
        .select_columns(&columns)
        .map_err(|err| format!("{}: {err}", err.kind()))?;
    table.inject_missing(options.missing_pct / 100.0, options.seed);

    let mut notices = Vec::new();
    if sampled.row_count() < full.row_count() {
        notices.push(format!(
            "Showing a random sample of {} of {} rows (seed {}).",
            sampled.row_count(),
            full.row_count(),
            options.seed
        ));
    }
    if options.missing_pct > 0.0 {
        notices.push(format!(
            "Injected missing values into about {:.0}% of cells.",
            options.missing_pct
        ));
    }
    Ok(ProcessedUpload {
        file_name,
        options,
        full,
        sampled,
        table,
        notices,
    })
}

/// The analysed table (sampled, selected columns, injected gaps) as CSV,
/// with a download file name.
pub fn export_csv(form: &Form, settings: &ServerSettings) -> Result<(String, Vec<u8>), String> {
    let upload = process_upload(form, settings)?;
    let mut body = Vec::new();
    upload
        .table
        .write_csv(&mut body)
        .map_err(|err| format!("export failed: {err}"))?;
    let stem = upload
        .file_name
        .strip_suffix(".csv")
        .unwrap_or(&upload.file_name);
    Ok((format!("{stem}_actual.csv"), body))
}

/// Parse the upload and build the report.
pub fn analyze(
    form: &Form,
    settings: &ServerSettings,
    model: Option<&ModelArtifact>,
) -> Result<EdaReport, String> {
    let ProcessedUpload {
        file_name,
        options,
        full,
        sampled,
        table,
        mut notices,
    } = process_upload(form, settings)?;
    let predictions = model.map(|artifact| predict_rows(artifact, &sampled));

    let summaries = stats::describe(&table);
    let counts = stats::value_counts(&table);
    let numeric = table.numeric_columns();
    let correlation = if options.charts.contains(&ChartKind::Correlation) {
        if numeric.len() >= 2 {
            Some(stats::correlation_matrix(&table))
        } else {
            notices.push("Correlation needs at least two numeric columns.".to_string());
            None
        }
    } else {
        None
    };
    let charts = build_charts(&table, &options, &mut notices);

    Ok(EdaReport {
        file_name,
        total_rows: full.row_count(),
        all_columns: full.headers().to_vec(),
        options,
        table,
        summaries,
        counts,
        correlation,
        charts,
        notices,
        predictions,
    })
}

/// Resolve a chart column: the requested one if it has the right kind,
/// otherwise the first column of `kind` not in `skip`.
fn chart_column(
    table: &Table,
    requested: Option<&str>,
    kind: ColumnKind,
    skip: Option<usize>,
) -> Result<Option<usize>, String> {
    let Some(name) = requested else {
        return Ok((0..table.column_count())
            .find(|&idx| table.column_kind(idx) == kind && Some(idx) != skip));
    };
    let idx = table
        .column_index(name)
        .ok_or_else(|| format!("'{name}' is not among the analysed columns"))?;
    if table.column_kind(idx) != kind {
        let wanted = match kind {
            ColumnKind::Numeric => "numeric",
            ColumnKind::Categorical => "categorical",
        };
        return Err(format!("'{name}' is not a {wanted} column"));
    }
    Ok(Some(idx))
}

fn build_charts(
    table: &Table,
    options: &UploadOptions,
    notices: &mut Vec<String>,
) -> Vec<RenderedChart> {
    let picks = &options.chart_columns;
    let mut charts = Vec::new();
    for kind in &options.charts {
        let rendered = match kind {
            ChartKind::Bar | ChartKind::Pie => {
                let requested = if *kind == ChartKind::Bar { &picks.bar } else { &picks.pie };
                category_chart(table, *kind, requested.as_deref())
            }
            ChartKind::Histogram => histogram_chart(table, picks.histogram.as_deref(), options.bins),
            ChartKind::Scatter => scatter_chart(table, picks),
            ChartKind::Correlation => continue,
        };
        match rendered {
            Ok(Some(chart)) => charts.push(chart),
            Ok(None) => {}
            Err(message) => notices.push(format!("{}: {message}.", kind.label())),
        }
    }
    charts
}

fn category_chart(
    table: &Table,
    kind: ChartKind,
    requested: Option<&str>,
) -> Result<Option<RenderedChart>, String> {
    let idx = chart_column(table, requested, ColumnKind::Categorical, None)?
        .ok_or("needs a categorical column")?;
    let counts = stats::count_values(&table.headers()[idx], &table.text_values(idx));
    let mut slices: Vec<(String, f64)> = counts
        .counts
        .iter()
        .map(|(value, count)| (value.clone(), *count as f64))
        .collect();
    if counts.missing > 0 {
        slices.push(("(missing)".to_string(), counts.missing as f64));
    }
    let chart = if kind == ChartKind::Bar {
        let title = format!("Count by {}", counts.column);
        let html = charts::bar_chart(&title, &slices);
        RenderedChart { title, html }
    } else {
        let title = format!("Distribution of {}", counts.column);
        let html = charts::pie_chart(&title, &slices);
        RenderedChart { title, html }
    };
    Ok(Some(chart))
}

fn histogram_chart(
    table: &Table,
    requested: Option<&str>,
    bins: usize,
) -> Result<Option<RenderedChart>, String> {
    let idx = chart_column(table, requested, ColumnKind::Numeric, None)?
        .ok_or("needs a numeric column")?;
    let name = &table.headers()[idx];
    Ok(stats::histogram(&table.numeric_values(idx), bins).map(|hist| {
        let title = format!("Histogram of {name}");
        let html = charts::histogram_chart(&title, &hist);
        RenderedChart { title, html }
    }))
}

fn scatter_chart(table: &Table, picks: &ChartColumns) -> Result<Option<RenderedChart>, String> {
    let x_idx = chart_column(table, picks.scatter_x.as_deref(), ColumnKind::Numeric, None)?;
    let y_idx = chart_column(table, picks.scatter_y.as_deref(), ColumnKind::Numeric, x_idx)?;
    let (Some(x_idx), Some(y_idx)) = (x_idx, y_idx) else {
        return Err("needs at least two numeric columns".to_string());
    };
    if x_idx == y_idx {
        return Err("choose two different columns".to_string());
    }
    let color_idx = match picks.scatter_color.as_deref() {
        Some(name) => chart_column(table, Some(name), ColumnKind::Categorical, None)?,
        None => None,
    };

    let colors = color_idx.map(|idx| table.text_values(idx));
    let mut groups: BTreeMap<String, Vec<(f64, f64)>> = BTreeMap::new();
    let xs = table.numeric_values(x_idx);
    let ys = table.numeric_values(y_idx);
    for (row, (x, y)) in xs.into_iter().zip(ys).enumerate() {
        let (Some(x), Some(y)) = (x, y) else {
            continue;
        };
        let group = match &colors {
            Some(values) => values[row].clone().unwrap_or_else(|| "(missing)".to_string()),
            None => String::new(),
        };
        groups.entry(group).or_default().push((x, y));
    }
    let series: Vec<(String, Vec<(f64, f64)>)> = groups.into_iter().collect();

    let (x_name, y_name) = (&table.headers()[x_idx], &table.headers()[y_idx]);
    let title = match color_idx {
        Some(idx) => format!("{x_name} vs {y_name} by {}", table.headers()[idx]),
        None => format!("{x_name} vs {y_name}"),
    };
    let html = charts::scatter_chart(&title, x_name, y_name, &series);
    Ok(Some(RenderedChart { title, html }))
}

/// Score every sampled row whose model features are all present as columns.
fn predict_rows(artifact: &ModelArtifact, table: &Table) -> Result<BatchPredictions, String> {
    let mut feature_idx = Vec::with_capacity(artifact.feature_names().len());
    let mut absent = Vec::new();
    for name in artifact.feature_names() {
        match table.column_index(name) {
            Some(idx) => feature_idx.push(idx),
            None => absent.push(name.as_str()),
        }
    }
    if !absent.is_empty() {
        return Err(format!(
            "predictions need the model feature column(s): {}",
            absent.join(", ")
        ));
    }
    let label_idx = table.column_index(&artifact.label_column);
    let label_values = label_idx.map(|idx| table.text_values(idx));
    let columns: Vec<Vec<Option<f64>>> = feature_idx
        .iter()
        .map(|&idx| table.numeric_values(idx))
        .collect();

    let mut rows = Vec::with_capacity(table.row_count());
    let mut scored = 0usize;
    let mut correct = 0usize;
    for row in 0..table.row_count() {
        let raw: Vec<Option<f64>> = columns.iter().map(|column| column[row]).collect();
        let actual = label_values.as_ref().and_then(|values| values[row].clone());
        let outcome = artifact
            .predict(&raw)
            .map(|prediction| (prediction.label, prediction.probability))
            .map_err(|err| err.to_string());
        if let (Ok((label, _)), Some(actual)) = (&outcome, &actual) {
            scored += 1;
            if label == actual {
                correct += 1;
            }
        }
        rows.push(PredictedRow {
            row: row + 1,
            actual,
            outcome,
        });
    }
    Ok(BatchPredictions {
        label_column: label_idx.map(|_| artifact.label_column.clone()),
        rows,
        accuracy: (scored > 0).then(|| correct as f64 / scored as f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::forms::FormField;

    fn field(name: &str, value: &str) -> FormField {
        FormField {
            name: name.to_string(),
            filename: None,
            data: value.as_bytes().to_vec(),
        }
    }

    fn file(contents: &str) -> FormField {
        FormField {
            name: "file".to_string(),
            filename: Some("players.csv".to_string()),
            data: contents.as_bytes().to_vec(),
        }
    }

    fn csv() -> String {
        let mut text = String::from("equipo,edad,puntos,rebotes,a,b,c\n");
        for i in 0..40 {
            let team = ["Tigres", "Leones"][i % 2];
            text.push_str(&format!("{team},{},{},{},1,2,3\n", 20 + i % 10, i * 2, i % 7));
        }
        text
    }

    #[test]
    fn defaults_follow_the_upload_form() {
        let options =
            UploadOptions::from_form(&Form::default(), &ServerSettings::default()).unwrap();
        assert_eq!(options.csv.delimiter, b',');
        assert_eq!(options.sample_rows, 500);
        assert_eq!(options.seed, 123);
        assert_eq!(options.charts, ChartKind::DEFAULT.to_vec());
        assert!(options.csv.na_values.contains(&String::new()));
    }

    #[test]
    fn rejects_too_many_columns_and_bad_numbers() {
        let form = Form::from_fields(vec![field("columns", "a,b,c,d,e,f,g")]);
        assert!(UploadOptions::from_form(&form, &ServerSettings::default()).is_err());
        let form = Form::from_fields(vec![field("seed", "abc")]);
        assert!(UploadOptions::from_form(&form, &ServerSettings::default()).is_err());
    }

    #[test]
    fn report_uses_first_six_columns_and_samples() {
        let form = Form::from_fields(vec![
            file(&csv()),
            field("sample_rows", "25"),
            field("chart", "bar"),
            field("chart", "scatter"),
            field("chart", "correlation"),
        ]);
        let report = analyze(&form, &ServerSettings::default(), None).unwrap();
        assert_eq!(report.total_rows, 40);
        assert_eq!(report.table.row_count(), 25);
        assert_eq!(report.table.column_count(), 6);
        assert_eq!(report.counts[0].column, "equipo");
        assert_eq!(report.charts.len(), 2);
        assert!(report.correlation.is_some());
        assert!(report.predictions.is_none());
    }

    #[test]
    fn missing_file_is_reported() {
        let err = analyze(&Form::default(), &ServerSettings::default(), None).unwrap_err();
        assert!(err.contains("CSV"));
    }

    #[test]
    fn unknown_column_is_schema_mismatch() {
        let form = Form::from_fields(vec![file(&csv()), field("columns", "nope")]);
        let err = analyze(&form, &ServerSettings::default(), None).unwrap_err();
        assert!(err.starts_with("SchemaMismatch"));
    }

    #[test]
    fn charts_use_the_chosen_columns() {
        let form = Form::from_fields(vec![
            file(&csv()),
            field("chart", "bar"),
            field("chart", "histogram"),
            field("chart", "scatter"),
            field("hist_column", "puntos"),
            field("scatter_x", "rebotes"),
            field("scatter_y", "edad"),
            field("scatter_color", "equipo"),
        ]);
        let report = analyze(&form, &ServerSettings::default(), None).unwrap();
        let titles: Vec<&str> = report.charts.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Count by equipo", "Histogram of puntos", "rebotes vs edad by equipo"]
        );
        assert!(report.charts[2].html.contains(">Leones</text>"));
        assert!(report.charts[2].html.contains(">Tigres</text>"));
    }

    #[test]
    fn unsuitable_chart_column_becomes_a_notice() {
        let form = Form::from_fields(vec![
            file(&csv()),
            field("chart", "bar"),
            field("chart", "histogram"),
            field("bar_column", "edad"),
            field("hist_column", "equipo"),
        ]);
        let report = analyze(&form, &ServerSettings::default(), None).unwrap();
        assert!(report.charts.is_empty());
        assert!(report.notices.iter().any(|n| n.contains("'edad' is not a categorical column")));
        assert!(report.notices.iter().any(|n| n.contains("'equipo' is not a numeric column")));
    }

    #[test]
    fn latin1_upload_is_decoded() {
        let mut field_file = file("");
        field_file.data = b"pa\xEDs,puntos\nEspa\xF1a,3\nPer\xFA,4\n".to_vec();
        let utf8 = Form::from_fields(vec![field_file.clone()]);
        let err = analyze(&utf8, &ServerSettings::default(), None).unwrap_err();
        assert!(err.starts_with("DataUnavailable"), "{err}");

        let latin1 = Form::from_fields(vec![field_file, field("encoding", "latin-1")]);
        let report = analyze(&latin1, &ServerSettings::default(), None).unwrap();
        assert_eq!(report.table.headers()[0], "país");
        assert_eq!(report.counts[0].column, "país");
        assert!(report.counts[0].counts.iter().any(|(value, _)| value == "España"));
    }

    #[test]
    fn export_returns_the_processed_table() {
        let form = Form::from_fields(vec![
            file(&csv()),
            field("sample_rows", "10"),
            field("columns", "puntos, equipo"),
        ]);
        let (name, body) = export_csv(&form, &ServerSettings::default()).unwrap();
        assert_eq!(name, "players_actual.csv");
        let text = String::from_utf8(body).unwrap();
        assert_eq!(text.lines().count(), 11);
        assert!(text.starts_with("puntos,equipo\n"));
        let report = analyze(&form, &ServerSettings::default(), None).unwrap();
        let mut expected = Vec::new();
        report.table.write_csv(&mut expected).unwrap();
        assert_eq!(text.as_bytes(), expected.as_slice());
    }
}
