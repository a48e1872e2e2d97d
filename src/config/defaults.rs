use std::path::PathBuf;

pub(super) const MIN_TEST_FRACTION: f64 = 0.05;
pub(super) const MAX_TEST_FRACTION: f64 = 0.95;
/// Upper bound on rows kept from an uploaded CSV.
pub(super) const MAX_SAMPLE_ROWS: usize = 500;
pub(super) const MIN_SAMPLE_ROWS: usize = 10;

pub(super) fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/dataset.csv")
}

pub(super) fn default_label_column() -> String {
    "label".to_string()
}

pub(super) fn default_delimiter() -> char {
    ','
}

pub(super) fn default_decimal() -> char {
    '.'
}

pub(super) fn default_na_values() -> Vec<String> {
    crate::dataset::DEFAULT_NA_VALUES
        .iter()
        .map(|value| (*value).to_string())
        .collect()
}

pub(super) fn default_test_fraction() -> f64 {
    0.2
}

pub(super) fn default_seed() -> Option<u64> {
    Some(42)
}

pub(super) fn default_model_path() -> PathBuf {
    PathBuf::from("models/model.json")
}

pub(super) fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub(super) fn default_port() -> u16 {
    8501
}

pub(super) fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

pub(super) fn default_max_sample_rows() -> usize {
    MAX_SAMPLE_ROWS
}

pub(super) fn default_preview_rows() -> usize {
    50
}

pub(super) fn clamp_test_fraction(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(MIN_TEST_FRACTION, MAX_TEST_FRACTION)
    } else {
        default_test_fraction()
    }
}

pub(super) fn clamp_sample_rows(value: usize) -> usize {
    value.clamp(MIN_SAMPLE_ROWS, MAX_SAMPLE_ROWS)
}
