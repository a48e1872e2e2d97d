//! In-memory CSV table with per-cell missing values and inferred column kinds.

use std::collections::HashSet;
use std::io::{Read, Write};
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::Error;

/// Tokens read as missing unless configured otherwise.
pub const DEFAULT_NA_VALUES: &[&str] = &["", "NA", "N/A", "null", "NaN", "."];

/// Parsing options for CSV input.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvOptions {
    /// Field delimiter byte (`,`, `;` or tab).
    pub delimiter: u8,
    /// Treat `,` as the decimal separator in numbers.
    pub decimal_comma: bool,
    /// Exact (trimmed) cell values treated as missing.
    pub na_values: Vec<String>,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            decimal_comma: false,
            na_values: DEFAULT_NA_VALUES.iter().map(|v| (*v).to_string()).collect(),
        }
    }
}

/// One parsed CSV cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Parsed number and, when read from CSV, the text it was written as.
    Number { value: f64, raw: Option<String> },
    Text(String),
    Missing,
}

impl Cell {
    /// Number cell with no source text.
    pub fn number(value: f64) -> Self {
        Cell::Number { value, raw: None }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number { value, .. } => Some(*value),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Text form of the cell as it was read (`007` stays `007`); `None` when missing.
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Number {
                raw: Some(raw), ..
            } => Some(raw.clone()),
            Cell::Number { value, raw: None } => Some(format!("{value}")),
            Cell::Text(text) => Some(text.clone()),
            Cell::Missing => None,
        }
    }

    /// Field written by [`Table::write_csv`]: numbers in `.` decimal form, missing as empty.
    fn csv_field(&self) -> String {
        match self {
            Cell::Number { value, .. } => format!("{value}"),
            Cell::Text(text) => text.clone(),
            Cell::Missing => String::new(),
        }
    }
}

/// Inferred column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every present cell is a number (an all-missing column counts as numeric).
    Numeric,
    /// At least one present cell is text.
    Categorical,
}

/// Rectangular table of cells under a header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Build a table, checking header uniqueness and row widths.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, Error> {
        check_headers(&headers)?;
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != headers.len())
        {
            return Err(Error::SchemaMismatch(format!(
                "row {} has {} fields, expected {}",
                idx + 1,
                row.len(),
                headers.len()
            )));
        }
        Ok(Self { headers, rows })
    }

    /// Read a CSV file with a header row.
    pub fn from_path(path: &Path, options: &CsvOptions) -> Result<Self, Error> {
        let source_name = path.display().to_string();
        let reader = reader_builder(options)
            .from_path(path)
            .map_err(|source| classify_csv_error(&source_name, source))?;
        parse_records(reader, &source_name, options)
    }

    /// Read CSV data from any reader (uploads, in-memory fixtures).
    pub fn from_reader<R: Read>(
        reader: R,
        source_name: &str,
        options: &CsvOptions,
    ) -> Result<Self, Error> {
        parse_records(reader_builder(options).from_reader(reader), source_name, options)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn column_kind(&self, idx: usize) -> ColumnKind {
        let has_text = self
            .rows
            .iter()
            .any(|row| matches!(row.get(idx), Some(Cell::Text(_))));
        if has_text {
            ColumnKind::Categorical
        } else {
            ColumnKind::Numeric
        }
    }

    /// Indices of numeric columns, in header order.
    pub fn numeric_columns(&self) -> Vec<usize> {
        (0..self.column_count())
            .filter(|&idx| self.column_kind(idx) == ColumnKind::Numeric)
            .collect()
    }

    /// Indices of categorical columns, in header order.
    pub fn categorical_columns(&self) -> Vec<usize> {
        (0..self.column_count())
            .filter(|&idx| self.column_kind(idx) == ColumnKind::Categorical)
            .collect()
    }

    /// Column values as numbers; text and missing cells become `None`.
    pub fn numeric_values(&self, idx: usize) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.get(idx).and_then(Cell::as_number))
            .collect()
    }

    /// Column values as text; missing cells become `None`.
    pub fn text_values(&self, idx: usize) -> Vec<Option<String>> {
        self.rows
            .iter()
            .map(|row| row.get(idx).and_then(Cell::as_text))
            .collect()
    }

    /// Random subset of `n` rows (original order kept); the whole table when `n` covers it.
    pub fn sample_rows(&self, n: usize, seed: u64) -> Table {
        if n >= self.rows.len() {
            return self.clone();
        }
        let mut rng = StdRng::seed_from_u64(seed);
        let mut picked = rand::seq::index::sample(&mut rng, self.rows.len(), n).into_vec();
        picked.sort_unstable();
        Table {
            headers: self.headers.clone(),
            rows: picked.into_iter().map(|idx| self.rows[idx].clone()).collect(),
        }
    }

    /// Keep only the named columns, in the given order.
    pub fn select_columns(&self, names: &[String]) -> Result<Table, Error> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column_index(name) {
                Some(idx) => indices.push(idx),
                None => missing.push(name.as_str()),
            }
        }
        if !missing.is_empty() {
            return Err(Error::SchemaMismatch(format!(
                "unknown column(s): {}",
                missing.join(", ")
            )));
        }
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&idx| row[idx].clone()).collect())
            .collect();
        Table::new(names.to_vec(), rows)
    }

    /// Blank each cell independently with probability `fraction`.
    pub fn inject_missing(&mut self, fraction: f64, seed: u64) {
        let fraction = fraction.clamp(0.0, 1.0);
        if fraction == 0.0 {
            return;
        }
        let mut rng = StdRng::seed_from_u64(seed);
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                if rng.random::<f64>() < fraction {
                    *cell = Cell::Missing;
                }
            }
        }
    }

    /// Count of missing cells across the whole table.
    pub fn missing_cells(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.iter())
            .filter(|cell| cell.is_missing())
            .count()
    }

    /// Write the table as comma-separated CSV; missing cells are written empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record(&self.headers)?;
        for row in &self.rows {
            out.write_record(row.iter().map(Cell::csv_field))?;
        }
        out.flush()?;
        Ok(())
    }
}

fn reader_builder(options: &CsvOptions) -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder
        .delimiter(options.delimiter)
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::All);
    builder
}

fn parse_records<R: Read>(
    mut reader: csv::Reader<R>,
    source_name: &str,
    options: &CsvOptions,
) -> Result<Table, Error> {
    let headers: Vec<String> = reader
        .headers()
        .map_err(|source| classify_csv_error(source_name, source))?
        .iter()
        .map(|header| header.to_string())
        .collect();
    check_headers(&headers)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| classify_csv_error(source_name, source))?;
        rows.push(record.iter().map(|raw| parse_cell(raw, options)).collect());
    }
    tracing::debug!(
        "Parsed {} rows x {} columns from {}",
        rows.len(),
        headers.len(),
        source_name
    );
    Ok(Table { headers, rows })
}

fn check_headers(headers: &[String]) -> Result<(), Error> {
    if headers.is_empty() || headers.iter().all(|header| header.is_empty()) {
        return Err(Error::SchemaMismatch("CSV has no header row".to_string()));
    }
    let mut seen = HashSet::new();
    for header in headers {
        if !seen.insert(header.as_str()) {
            return Err(Error::SchemaMismatch(format!(
                "duplicate column name '{header}'"
            )));
        }
    }
    Ok(())
}

fn parse_cell(raw: &str, options: &CsvOptions) -> Cell {
    if options.na_values.iter().any(|na| na == raw) {
        return Cell::Missing;
    }
    let parsed = if options.decimal_comma {
        raw.replace(',', ".").parse::<f64>()
    } else {
        raw.parse::<f64>()
    };
    match parsed {
        Ok(value) if value.is_finite() => Cell::Number {
            value,
            raw: Some(raw.to_string()),
        },
        _ => Cell::Text(raw.to_string()),
    }
}

fn classify_csv_error(source_name: &str, source: csv::Error) -> Error {
    if let csv::ErrorKind::UnequalLengths {
        pos,
        expected_len,
        len,
    } = source.kind()
    {
        let line = pos
            .as_ref()
            .map(|pos| pos.line().to_string())
            .unwrap_or_else(|| "?".to_string());
        return Error::SchemaMismatch(format!(
            "{source_name} line {line} has {len} fields, expected {expected_len}"
        ));
    }
    Error::DataUnavailable {
        source_name: source_name.to_string(),
        source,
    }
}
