//! Inline SVG charts.

use std::fmt::Write;

use super::render::escape_html;
use crate::stats::{CorrelationMatrix, Histogram};

const WIDTH: f64 = 560.0;
const HEIGHT: f64 = 300.0;
const MARGIN_LEFT: f64 = 56.0;
const MARGIN_RIGHT: f64 = 16.0;
const MARGIN_TOP: f64 = 32.0;
const MARGIN_BOTTOM: f64 = 64.0;
const PALETTE: &[&str] = &[
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac",
];

/// Chart kinds offered on the upload form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Histogram,
    Scatter,
    Pie,
    Correlation,
}

impl ChartKind {
    pub const ALL: [ChartKind; 5] = [
        ChartKind::Bar,
        ChartKind::Histogram,
        ChartKind::Scatter,
        ChartKind::Pie,
        ChartKind::Correlation,
    ];
    pub const DEFAULT: [ChartKind; 3] = [ChartKind::Bar, ChartKind::Histogram, ChartKind::Scatter];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Histogram => "histogram",
            ChartKind::Scatter => "scatter",
            ChartKind::Pie => "pie",
            ChartKind::Correlation => "correlation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartKind::Bar => "Bar (categorical)",
            ChartKind::Histogram => "Histogram (numeric)",
            ChartKind::Scatter => "Scatter",
            ChartKind::Pie => "Pie (categorical)",
            ChartKind::Correlation => "Correlation (numeric)",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }
}

fn open_svg(out: &mut String, title: &str) {
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" class="chart" viewBox="0 0 {WIDTH} {HEIGHT}" width="{WIDTH}" height="{HEIGHT}" role="img"><title>{title}</title><text x="{x}" y="20" text-anchor="middle" class="chart-title">{title}</text>"#,
        x = WIDTH / 2.0,
        title = escape_html(title),
    );
}

fn plot_area() -> (f64, f64, f64, f64) {
    (
        MARGIN_LEFT,
        MARGIN_TOP,
        WIDTH - MARGIN_LEFT - MARGIN_RIGHT,
        HEIGHT - MARGIN_TOP - MARGIN_BOTTOM,
    )
}

fn axes(out: &mut String, y_max: f64) {
    let (left, top, width, height) = plot_area();
    let bottom = top + height;
    let _ = write!(
        out,
        r##"<line x1="{left}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="#333"/><line x1="{left}" y1="{top}" x2="{left}" y2="{bottom}" stroke="#333"/><text x="{lx}" y="{ty}" text-anchor="end" class="tick">{max}</text><text x="{lx}" y="{bottom}" text-anchor="end" class="tick">0</text>"##,
        right = left + width,
        lx = left - 4.0,
        ty = top + 4.0,
        max = format_tick(y_max),
    );
}

fn format_tick(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e9 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Vertical bars, one per `(label, value)`.
pub fn bar_chart(title: &str, bars: &[(String, f64)]) -> String {
    let mut out = String::new();
    open_svg(&mut out, title);
    let (left, top, width, height) = plot_area();
    let max = bars.iter().map(|(_, v)| *v).fold(0.0f64, f64::max);
    let max = if max > 0.0 { max } else { 1.0 };
    axes(&mut out, max);
    let slot = width / bars.len().max(1) as f64;
    for (idx, (label, value)) in bars.iter().enumerate() {
        let bar_height = height * value.max(0.0) / max;
        let x = left + slot * idx as f64 + slot * 0.1;
        let y = top + height - bar_height;
        let _ = write!(
            out,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{bar_height:.1}" fill="{fill}"><title>{label}: {value}</title></rect><text x="{tx:.1}" y="{ty:.1}" text-anchor="end" transform="rotate(-35 {tx:.1} {ty:.1})" class="tick">{label}</text>"#,
            w = slot * 0.8,
            fill = PALETTE[idx % PALETTE.len()],
            label = escape_html(label),
            value = format_tick(*value),
            tx = x + slot * 0.4,
            ty = top + height + 14.0,
        );
    }
    out.push_str("</svg>");
    out
}

pub fn histogram_chart(title: &str, histogram: &Histogram) -> String {
    let mut out = String::new();
    open_svg(&mut out, title);
    let (left, top, width, height) = plot_area();
    let max = histogram.counts.iter().copied().max().unwrap_or(0).max(1) as f64;
    axes(&mut out, max);
    let bins = histogram.counts.len().max(1) as f64;
    let bin_width = width / bins;
    for (idx, &count) in histogram.counts.iter().enumerate() {
        let bar_height = height * count as f64 / max;
        let _ = write!(
            out,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{bin_width:.1}" height="{bar_height:.1}" fill="{fill}" stroke="white"><title>[{lo}, {hi}): {count}</title></rect>"#,
            x = left + bin_width * idx as f64,
            y = top + height - bar_height,
            fill = PALETTE[0],
            lo = format_tick(histogram.edges[idx]),
            hi = format_tick(histogram.edges[idx + 1]),
        );
    }
    if let (Some(first), Some(last)) = (histogram.edges.first(), histogram.edges.last()) {
        let _ = write!(
            out,
            r#"<text x="{left}" y="{y}" class="tick">{first}</text><text x="{right}" y="{y}" text-anchor="end" class="tick">{last}</text>"#,
            y = top + height + 14.0,
            right = left + width,
            first = format_tick(*first),
            last = format_tick(*last),
        );
    }
    out.push_str("</svg>");
    out
}

/// Points grouped into named series; a single unnamed series draws no legend.
pub fn scatter_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[(String, Vec<(f64, f64)>)],
) -> String {
    let mut out = String::new();
    open_svg(&mut out, title);
    let (left, top, width, height) = plot_area();
    let range = |values: Vec<f64>| {
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            (0.0, 1.0)
        } else if max > min {
            (min, max)
        } else {
            (min - 0.5, max + 0.5)
        }
    };
    let points = || series.iter().flat_map(|(_, points)| points.iter());
    let (x_min, x_max) = range(points().map(|p| p.0).collect());
    let (y_min, y_max) = range(points().map(|p| p.1).collect());
    let _ = write!(
        out,
        r##"<rect x="{left}" y="{top}" width="{width}" height="{height}" fill="none" stroke="#333"/>"##
    );
    let legend = series.len() > 1 || series.iter().any(|(name, _)| !name.is_empty());
    for (idx, (name, points)) in series.iter().enumerate() {
        let fill = PALETTE[idx % PALETTE.len()];
        for (x, y) in points {
            let cx = left + width * (x - x_min) / (x_max - x_min);
            let cy = top + height - height * (y - y_min) / (y_max - y_min);
            let _ = write!(
                out,
                r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="3" fill="{fill}" fill-opacity="0.7"/>"#
            );
        }
        if legend {
            let _ = write!(
                out,
                r#"<circle cx="{lx}" cy="{ly}" r="4" fill="{fill}"/><text x="{tx}" y="{ty}" class="tick">{name}</text>"#,
                lx = left + width - 110.0,
                ly = top + 10.0 + 14.0 * idx as f64,
                tx = left + width - 102.0,
                ty = top + 14.0 + 14.0 * idx as f64,
                name = escape_html(name),
            );
        }
    }
    let _ = write!(
        out,
        r#"<text x="{mid}" y="{by}" text-anchor="middle" class="axis">{x_label} ({x0} to {x1})</text><text x="14" y="{my}" text-anchor="middle" transform="rotate(-90 14 {my})" class="axis">{y_label} ({y0} to {y1})</text>"#,
        mid = left + width / 2.0,
        by = top + height + 32.0,
        my = top + height / 2.0,
        x_label = escape_html(x_label),
        y_label = escape_html(y_label),
        x0 = format_tick(x_min),
        x1 = format_tick(x_max),
        y0 = format_tick(y_min),
        y1 = format_tick(y_max),
    );
    out.push_str("</svg>");
    out
}

pub fn pie_chart(title: &str, slices: &[(String, f64)]) -> String {
    let mut out = String::new();
    open_svg(&mut out, title);
    let total: f64 = slices.iter().map(|(_, v)| v.max(0.0)).sum();
    let (cx, cy, r) = (HEIGHT / 2.0, HEIGHT / 2.0 + 10.0, HEIGHT / 2.0 - 40.0);
    if total <= 0.0 {
        out.push_str("</svg>");
        return out;
    }
    let mut angle = -std::f64::consts::FRAC_PI_2;
    for (idx, (label, value)) in slices.iter().enumerate() {
        let share = value.max(0.0) / total;
        let fill = PALETTE[idx % PALETTE.len()];
        if share >= 1.0 {
            let _ = write!(out, r#"<circle cx="{cx}" cy="{cy}" r="{r}" fill="{fill}"/>"#);
        } else if share > 0.0 {
            let end = angle + share * std::f64::consts::TAU;
            let large = if share > 0.5 { 1 } else { 0 };
            let _ = write!(
                out,
                r#"<path d="M {cx} {cy} L {x0:.2} {y0:.2} A {r} {r} 0 {large} 1 {x1:.2} {y1:.2} Z" fill="{fill}"><title>{label}: {pct:.1}%</title></path>"#,
                x0 = cx + r * angle.cos(),
                y0 = cy + r * angle.sin(),
                x1 = cx + r * end.cos(),
                y1 = cy + r * end.sin(),
                label = escape_html(label),
                pct = share * 100.0,
            );
            angle = end;
        }
        let _ = write!(
            out,
            r#"<rect x="{lx}" y="{ly}" width="10" height="10" fill="{fill}"/><text x="{tx}" y="{ty}" class="tick">{label} ({pct:.1}%)</text>"#,
            lx = HEIGHT + 10.0,
            ly = MARGIN_TOP + 16.0 * idx as f64,
            tx = HEIGHT + 26.0,
            ty = MARGIN_TOP + 9.0 + 16.0 * idx as f64,
            label = escape_html(label),
            pct = share * 100.0,
        );
    }
    out.push_str("</svg>");
    out
}

/// Correlation matrix as an HTML table with diverging cell colours.
pub fn correlation_table(matrix: &CorrelationMatrix) -> String {
    let mut out = String::from(r#"<table class="corr"><tr><th></th>"#);
    for column in &matrix.columns {
        let _ = write!(out, "<th>{}</th>", escape_html(column));
    }
    out.push_str("</tr>");
    for (column, row) in matrix.columns.iter().zip(&matrix.values) {
        let _ = write!(out, "<tr><th>{}</th>", escape_html(column));
        for value in row {
            match value {
                Some(r) => {
                    let _ = write!(
                        out,
                        r#"<td style="background:{}">{r:.2}</td>"#,
                        diverging_colour(*r)
                    );
                }
                None => out.push_str("<td>n/a</td>"),
            }
        }
        out.push_str("</tr>");
    }
    out.push_str("</table>");
    out
}

/// Blue for negative, red for positive, white at zero.
fn diverging_colour(r: f64) -> String {
    let t = r.clamp(-1.0, 1.0).abs();
    let fade = (255.0 * (1.0 - t * 0.75)).round() as u8;
    if r >= 0.0 {
        format!("rgb(255,{fade},{fade})")
    } else {
        format!("rgb({fade},{fade},255)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_chart_escapes_labels_and_draws_each_bar() {
        let svg = bar_chart(
            "Counts",
            &[("<b>".to_string(), 2.0), ("ok".to_string(), 1.0)],
        );
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert_eq!(svg.matches("<rect").count(), 2);
        assert!(svg.contains("&lt;b&gt;"));
        assert!(!svg.contains("<b>"));
    }

    #[test]
    fn pie_chart_handles_single_slice() {
        let svg = pie_chart("One", &[("all".to_string(), 5.0)]);
        assert!(svg.contains("<circle"));
    }

    #[test]
    fn correlation_table_marks_missing_cells() {
        let matrix = CorrelationMatrix {
            columns: vec!["a".into(), "b".into()],
            values: vec![vec![Some(1.0), None], vec![None, Some(1.0)]],
        };
        let html = correlation_table(&matrix);
        assert_eq!(html.matches("n/a").count(), 2);
        assert!(html.contains("rgb(255,64,64)"));
    }

    #[test]
    fn scatter_legend_only_for_named_series() {
        let plain = scatter_chart("xy", "x", "y", &[(String::new(), vec![(0.0, 1.0), (2.0, 3.0)])]);
        assert_eq!(plain.matches("<circle").count(), 2);
        let grouped = scatter_chart(
            "xy",
            "x",
            "y",
            &[
                ("Leones".to_string(), vec![(0.0, 1.0)]),
                ("Tigres".to_string(), vec![(2.0, 3.0)]),
            ],
        );
        assert_eq!(grouped.matches("<circle").count(), 4);
        assert!(grouped.contains(">Tigres</text>"));
        assert!(grouped.contains(PALETTE[1]));
    }

    #[test]
    fn chart_kinds_parse_by_name() {
        for kind in ChartKind::ALL {
            assert_eq!(ChartKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ChartKind::parse("radar"), None);
    }
}
