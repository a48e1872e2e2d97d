//! Descriptive statistics for exploratory views of a [`Table`].

use std::collections::HashMap;

use crate::dataset::Table;

/// `describe`-style summary of one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub missing: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1); `None` below two values.
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

/// Frequency table of one categorical column, most frequent first.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryCounts {
    pub column: String,
    /// `(value, count)`; ties ordered by value.
    pub counts: Vec<(String, usize)>,
    pub missing: usize,
}

impl CategoryCounts {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, c)| c).sum()
    }
}

/// Pairwise Pearson correlations between numeric columns.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    /// `None` where fewer than two complete pairs exist or a side is constant.
    pub values: Vec<Vec<Option<f64>>>,
}

/// Equal-width histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// `bins + 1` ascending edges.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

/// Summaries for every numeric column, in header order.
pub fn describe(table: &Table) -> Vec<NumericSummary> {
    table
        .numeric_columns()
        .into_iter()
        .map(|idx| summarize(&table.headers()[idx], &table.numeric_values(idx)))
        .collect()
}

pub fn summarize(column: &str, values: &[Option<f64>]) -> NumericSummary {
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    present.sort_by(f64::total_cmp);
    let count = present.len();
    let mean = (count > 0).then(|| present.iter().sum::<f64>() / count as f64);
    let std = match (mean, count) {
        (Some(mean), n) if n >= 2 => {
            let ss: f64 = present.iter().map(|v| (v - mean).powi(2)).sum();
            Some((ss / (n - 1) as f64).sqrt())
        }
        _ => None,
    };
    NumericSummary {
        column: column.to_string(),
        count,
        missing: values.len() - count,
        mean,
        std,
        min: present.first().copied(),
        q25: quantile(&present, 0.25),
        median: quantile(&present, 0.5),
        q75: quantile(&present, 0.75),
        max: present.last().copied(),
    }
}

/// Linear-interpolated quantile of sorted values.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Value counts for every categorical column, in header order.
pub fn value_counts(table: &Table) -> Vec<CategoryCounts> {
    table
        .categorical_columns()
        .into_iter()
        .map(|idx| count_values(&table.headers()[idx], &table.text_values(idx)))
        .collect()
}

pub fn count_values(column: &str, values: &[Option<String>]) -> CategoryCounts {
    let mut tally: HashMap<&str, usize> = HashMap::new();
    let mut missing = 0usize;
    for value in values {
        match value {
            Some(value) => *tally.entry(value.as_str()).or_default() += 1,
            None => missing += 1,
        }
    }
    let mut counts: Vec<(String, usize)> = tally
        .into_iter()
        .map(|(value, count)| (value.to_string(), count))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    CategoryCounts {
        column: column.to_string(),
        counts,
        missing,
    }
}

/// Pearson correlation over rows where both values are present.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }
    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

pub fn correlation_matrix(table: &Table) -> CorrelationMatrix {
    let columns = table.numeric_columns();
    let values: Vec<Vec<Option<f64>>> = columns.iter().map(|&idx| table.numeric_values(idx)).collect();
    let matrix = values
        .iter()
        .map(|a| values.iter().map(|b| pearson(a, b)).collect())
        .collect();
    CorrelationMatrix {
        columns: columns
            .iter()
            .map(|&idx| table.headers()[idx].clone())
            .collect(),
        values: matrix,
    }
}

/// Equal-width histogram of the present values; `None` when there are none.
pub fn histogram(values: &[Option<f64>], bins: usize) -> Option<Histogram> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let bins = bins.max(1);
    let min = present.iter().copied().reduce(f64::min)?;
    let max = present.iter().copied().reduce(f64::max)?;
    let (min, max) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };
    let width = (max - min) / bins as f64;
    let edges = (0..=bins).map(|i| min + width * i as f64).collect();
    let mut counts = vec![0usize; bins];
    for v in present {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    Some(Histogram { edges, counts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CsvOptions;

    fn table(text: &str) -> Table {
        Table::from_reader(text.as_bytes(), "inline", &CsvOptions::default()).unwrap()
    }

    #[test]
    fn describe_matches_hand_computed_values() {
        let table = table("x,team\n1,a\n2,b\n3,a\n4,\nNA,a\n");
        let summary = &describe(&table)[0];
        assert_eq!(summary.count, 4);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.mean, Some(2.5));
        let std = summary.std.unwrap();
        assert!((std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(summary.min, Some(1.0));
        assert_eq!(summary.q25, Some(1.75));
        assert_eq!(summary.median, Some(2.5));
        assert_eq!(summary.q75, Some(3.25));
        assert_eq!(summary.max, Some(4.0));
    }

    #[test]
    fn value_counts_sort_by_frequency() {
        let table = table("team\nb\na\na\nNA\nc\nb\na\n");
        let counts = &value_counts(&table)[0];
        assert_eq!(
            counts.counts,
            vec![("a".into(), 3), ("b".into(), 2), ("c".into(), 1)]
        );
        assert_eq!(counts.missing, 1);
        assert_eq!(counts.total(), 6);
    }

    #[test]
    fn pearson_uses_complete_pairs_only() {
        let a = [Some(1.0), Some(2.0), Some(3.0), None];
        let b = [Some(2.0), Some(4.0), Some(6.0), Some(100.0)];
        assert!((pearson(&a, &b).unwrap() - 1.0).abs() < 1e-12);
        let constant = [Some(1.0), Some(1.0), Some(1.0), Some(1.0)];
        assert_eq!(pearson(&a, &constant), None);
    }

    #[test]
    fn correlation_matrix_is_symmetric_with_unit_diagonal() {
        let table = table("a,b,c\n1,3,9\n2,1,7\n3,2,8\n4,5,1\n");
        let matrix = correlation_matrix(&table);
        assert_eq!(matrix.columns, vec!["a", "b", "c"]);
        for i in 0..3 {
            assert!((matrix.values[i][i].unwrap() - 1.0).abs() < 1e-12);
            for j in 0..3 {
                assert_eq!(matrix.values[i][j], matrix.values[j][i]);
            }
        }
    }

    #[test]
    fn histogram_counts_every_value() {
        let values: Vec<Option<f64>> = vec![Some(0.0), Some(1.0), Some(2.0), Some(10.0), None];
        let hist = histogram(&values, 5).unwrap();
        assert_eq!(hist.edges.len(), 6);
        assert_eq!(hist.counts, vec![2, 1, 0, 0, 1]);
        assert_eq!(histogram(&[None], 5), None);
        let single = histogram(&[Some(3.0)], 2).unwrap();
        assert_eq!(single.counts.iter().sum::<usize>(), 1);
    }
}
