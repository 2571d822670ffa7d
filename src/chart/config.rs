use crate::chart::plan::{ChartKind, ChartPlan};
use crate::db::row::{ResultSet, Scalar};
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use tracing::debug;

// Dark-theme palette, applied to every chart kind.
const BACKGROUND_COLOR: &str = "#2b2b2b";
const TEXT_COLOR: &str = "#ffffff";
const SERIES_COLOR: &str = "#7cb5ec";
const HISTOGRAM_COLOR: &str = "#90ed7d";

const PIE_COLLAPSE_THRESHOLD: usize = 15;
const PIE_TOP_CATEGORIES: usize = 10;

#[derive(Debug, PartialEq)]
pub enum ConfigError {
    EmptyResult,
    TooFewColumns { kind: ChartKind, have: usize },
    MissingColumn(String),
    NoNumericColumn,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::EmptyResult => write!(f, "result set has no rows to chart"),
            ConfigError::TooFewColumns { kind, have } => {
                write!(f, "{} chart needs more columns than the {} available", kind, have)
            }
            ConfigError::MissingColumn(name) => {
                write!(f, "column '{}' is not present in the result set", name)
            }
            ConfigError::NoNumericColumn => {
                write!(f, "no numeric column available for a histogram")
            }
        }
    }
}

impl Error for ConfigError {}

/// Declarative, rendering-ready chart description in Highcharts shape.
/// Constructed once per chart request and handed straight to rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartConfig {
    pub chart: ChartSpec,
    pub title: TitleSpec,
    #[serde(rename = "xAxis", skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<AxisSpec>,
    #[serde(rename = "yAxis", skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<AxisSpec>,
    #[serde(rename = "plotOptions", skip_serializing_if = "Option::is_none")]
    pub plot_options: Option<PlotOptions>,
    pub series: Vec<Series>,
    pub tooltip: Tooltip,
    pub credits: Credits,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "backgroundColor")]
    pub background_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleSpec {
    pub text: String,
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStyle {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<TitleSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    pub labels: LabelSpec,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelSpec {
    pub style: TextStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlotOptions {
    pub pie: PiePlotOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PiePlotOptions {
    #[serde(rename = "innerSize")]
    pub inner_size: String,
    #[serde(rename = "dataLabels")]
    pub data_labels: LabelStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelStyle {
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub data: SeriesData,
    #[serde(rename = "showInLegend", skip_serializing_if = "Option::is_none")]
    pub show_in_legend: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesData {
    /// Plain y values, positioned by category index.
    Values(Vec<f64>),
    /// Named slices for pie charts.
    Named(Vec<NamedPoint>),
    /// (x, y) pairs for scatter plots.
    Points(Vec<(f64, f64)>),
    /// Histogram bins with center, range label and count.
    Bins(Vec<HistogramBin>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedPoint {
    pub name: String,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    /// Range label, e.g. "1.0-2.8".
    pub name: String,
    /// Bin center.
    pub x: f64,
    /// Count of values in the bin.
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tooltip {
    #[serde(rename = "pointFormat")]
    pub point_format: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Credits {
    pub enabled: bool,
}

/// Turns a chart plan and a result set into a rendering-ready configuration.
/// Pure and idempotent: identical inputs yield structurally identical output.
pub fn build_config(rows: &ResultSet, plan: &ChartPlan) -> Result<ChartConfig, ConfigError> {
    if rows.is_empty() {
        return Err(ConfigError::EmptyResult);
    }

    match plan.kind {
        ChartKind::Bar => bar_config(rows, plan),
        ChartKind::Pie => pie_config(rows, plan),
        ChartKind::Histogram => histogram_config(rows, plan),
        ChartKind::Scatter => scatter_config(rows, plan),
        ChartKind::Line => line_config(rows, plan),
    }
}

/// Resolves the x/y columns for the two-axis chart kinds.
fn xy_columns(rows: &ResultSet, plan: &ChartPlan) -> Result<(usize, usize), ConfigError> {
    if rows.columns.len() < 2 {
        return Err(ConfigError::TooFewColumns {
            kind: plan.kind,
            have: rows.columns.len(),
        });
    }
    let x = rows
        .column_index(&plan.x)
        .ok_or_else(|| ConfigError::MissingColumn(plan.x.clone()))?;
    let y_name = plan.y.as_deref().ok_or(ConfigError::TooFewColumns {
        kind: plan.kind,
        have: rows.columns.len(),
    })?;
    let y = rows
        .column_index(y_name)
        .ok_or_else(|| ConfigError::MissingColumn(y_name.to_string()))?;
    Ok((x, y))
}

fn bar_config(rows: &ResultSet, plan: &ChartPlan) -> Result<ChartConfig, ConfigError> {
    let (x, y) = xy_columns(rows, plan)?;
    let y_name = rows.columns[y].clone();

    let categories: Vec<String> = rows
        .rows
        .iter()
        .map(|row| row[x].to_display_string())
        .collect();
    let data: Vec<f64> = rows.rows.iter().map(|row| row[y].to_f64_lossy()).collect();

    Ok(ChartConfig {
        chart: chart_spec("column"),
        title: title_spec(&plan.title),
        x_axis: Some(AxisSpec {
            title: None,
            categories: Some(categories),
            labels: label_spec(),
        }),
        y_axis: Some(AxisSpec {
            title: Some(title_spec(&y_name)),
            categories: None,
            labels: label_spec(),
        }),
        plot_options: None,
        series: vec![Series {
            name: y_name,
            color: Some(SERIES_COLOR.to_string()),
            data: SeriesData::Values(data),
            show_in_legend: None,
        }],
        tooltip: Tooltip {
            point_format: "<b>{series.name}: {point.y}</b>".to_string(),
        },
        credits: Credits { enabled: false },
    })
}

fn pie_config(rows: &ResultSet, plan: &ChartPlan) -> Result<ChartConfig, ConfigError> {
    let (x, y) = xy_columns(rows, plan)?;
    let y_name = rows.columns[y].clone();

    let points: Vec<NamedPoint> = rows
        .rows
        .iter()
        .map(|row| NamedPoint {
            name: row[x].to_display_string(),
            y: row[y].to_f64_lossy(),
        })
        .collect();

    let data = collapse_pie_slices(points);

    Ok(ChartConfig {
        chart: chart_spec("pie"),
        title: title_spec(&plan.title),
        x_axis: None,
        y_axis: None,
        plot_options: Some(PlotOptions {
            pie: PiePlotOptions {
                inner_size: "50%".to_string(),
                data_labels: LabelStyle {
                    color: TEXT_COLOR.to_string(),
                },
            },
        }),
        series: vec![Series {
            name: y_name,
            color: None,
            data: SeriesData::Named(data),
            show_in_legend: Some(true),
        }],
        tooltip: Tooltip {
            point_format: "<b>{point.name}: {point.y}</b>".to_string(),
        },
        credits: Credits { enabled: false },
    })
}

/// Wide pies are unreadable: past 15 distinct categories, keep the 10
/// largest by summed value and fold the rest into a single "Others" slice,
/// omitted when its total is not positive.
fn collapse_pie_slices(points: Vec<NamedPoint>) -> Vec<NamedPoint> {
    let mut sums: BTreeMap<String, f64> = BTreeMap::new();
    for point in &points {
        *sums.entry(point.name.clone()).or_insert(0.0) += point.y;
    }

    if sums.len() <= PIE_COLLAPSE_THRESHOLD {
        return points;
    }

    let mut ranked: Vec<(String, f64)> = sums.into_iter().collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let mut collapsed: Vec<NamedPoint> = ranked
        .iter()
        .take(PIE_TOP_CATEGORIES)
        .map(|(name, sum)| NamedPoint {
            name: name.clone(),
            y: *sum,
        })
        .collect();

    let others: f64 = ranked.iter().skip(PIE_TOP_CATEGORIES).map(|(_, sum)| sum).sum();
    if others > 0.0 {
        collapsed.push(NamedPoint {
            name: "Others".to_string(),
            y: others,
        });
    }

    debug!("Collapsed pie to {} slices", collapsed.len());
    collapsed
}

fn histogram_config(rows: &ResultSet, plan: &ChartPlan) -> Result<ChartConfig, ConfigError> {
    // First column whose non-null values are all numeric carries the
    // distribution.
    let numeric_col = rows
        .columns
        .iter()
        .enumerate()
        .find(|(idx, _)| {
            let mut seen = false;
            for row in &rows.rows {
                match &row[*idx] {
                    Scalar::Null => {}
                    cell if cell.is_numeric() => seen = true,
                    _ => return false,
                }
            }
            seen
        })
        .map(|(idx, name)| (idx, name.clone()));

    let (idx, col_name) = numeric_col.ok_or(ConfigError::NoNumericColumn)?;

    let values: Vec<f64> = rows
        .rows
        .iter()
        .filter(|row| !row[idx].is_null())
        .map(|row| row[idx].to_f64_lossy())
        .collect();

    let bins = histogram_bins(&values);

    Ok(ChartConfig {
        chart: chart_spec("column"),
        title: title_spec(&format!("{} - Distribution of {}", plan.title, col_name)),
        x_axis: Some(AxisSpec {
            title: Some(title_spec(&col_name)),
            categories: None,
            labels: label_spec(),
        }),
        y_axis: Some(AxisSpec {
            title: Some(title_spec("Frequency")),
            categories: None,
            labels: label_spec(),
        }),
        plot_options: None,
        series: vec![Series {
            name: "Frequency".to_string(),
            color: Some(HISTOGRAM_COLOR.to_string()),
            data: SeriesData::Bins(bins),
            show_in_legend: None,
        }],
        tooltip: Tooltip {
            point_format: "<b>Count: {point.y}</b>".to_string(),
        },
        credits: Credits { enabled: false },
    })
}

/// Equal-width binning: `min(10, n / 2)` bins with a floor of 2. Every bin
/// is half-open except the last, whose upper edge is inclusive so the
/// maximum value is counted.
pub fn histogram_bins(values: &[f64]) -> Vec<HistogramBin> {
    if values.is_empty() {
        return Vec::new();
    }

    let min_val = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    let num_bins = (values.len() / 2).min(10).max(2);
    let bin_width = (max_val - min_val) / num_bins as f64;

    (0..num_bins)
        .map(|i| {
            let bin_start = min_val + i as f64 * bin_width;
            let bin_end = min_val + (i + 1) as f64 * bin_width;
            let last = i == num_bins - 1;

            let count = values
                .iter()
                .filter(|&&v| v >= bin_start && (v < bin_end || (last && v <= bin_end)))
                .count();

            HistogramBin {
                name: format!("{:.1}-{:.1}", bin_start, bin_end),
                x: (bin_start + bin_end) / 2.0,
                y: count as f64,
            }
        })
        .collect()
}

fn scatter_config(rows: &ResultSet, plan: &ChartPlan) -> Result<ChartConfig, ConfigError> {
    let (x, y) = xy_columns(rows, plan)?;
    let y_name = rows.columns[y].clone();

    let data: Vec<(f64, f64)> = rows
        .rows
        .iter()
        .map(|row| (row[x].to_f64_lossy(), row[y].to_f64_lossy()))
        .collect();

    Ok(ChartConfig {
        chart: chart_spec("scatter"),
        title: title_spec(&plan.title),
        x_axis: Some(AxisSpec {
            title: Some(title_spec(&rows.columns[x])),
            categories: None,
            labels: label_spec(),
        }),
        y_axis: Some(AxisSpec {
            title: Some(title_spec(&y_name)),
            categories: None,
            labels: label_spec(),
        }),
        plot_options: None,
        series: vec![Series {
            name: y_name,
            color: Some(SERIES_COLOR.to_string()),
            data: SeriesData::Points(data),
            show_in_legend: None,
        }],
        tooltip: Tooltip {
            point_format: "<b>{point.x}, {point.y}</b>".to_string(),
        },
        credits: Credits { enabled: false },
    })
}

fn line_config(rows: &ResultSet, plan: &ChartPlan) -> Result<ChartConfig, ConfigError> {
    let (x, y) = xy_columns(rows, plan)?;
    let y_name = rows.columns[y].clone();

    let categories: Vec<String> = rows
        .rows
        .iter()
        .map(|row| row[x].to_display_string())
        .collect();
    let data: Vec<f64> = rows.rows.iter().map(|row| row[y].to_f64_lossy()).collect();

    Ok(ChartConfig {
        chart: chart_spec("line"),
        title: title_spec(&plan.title),
        x_axis: Some(AxisSpec {
            title: Some(title_spec(&rows.columns[x])),
            categories: Some(categories),
            labels: label_spec(),
        }),
        y_axis: Some(AxisSpec {
            title: Some(title_spec(&y_name)),
            categories: None,
            labels: label_spec(),
        }),
        plot_options: None,
        series: vec![Series {
            name: y_name,
            color: Some(SERIES_COLOR.to_string()),
            data: SeriesData::Values(data),
            show_in_legend: None,
        }],
        tooltip: Tooltip {
            point_format: "<b>{series.name}: {point.y}</b>".to_string(),
        },
        credits: Credits { enabled: false },
    })
}

fn chart_spec(kind: &str) -> ChartSpec {
    ChartSpec {
        kind: kind.to_string(),
        background_color: BACKGROUND_COLOR.to_string(),
    }
}

fn title_spec(text: &str) -> TitleSpec {
    TitleSpec {
        text: text.to_string(),
        style: TextStyle {
            color: TEXT_COLOR.to_string(),
        },
    }
}

fn label_spec() -> LabelSpec {
    LabelSpec {
        style: TextStyle {
            color: TEXT_COLOR.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::plan::ChartKind;

    fn dept_count() -> ResultSet {
        ResultSet::new(
            vec!["dept".into(), "count".into()],
            vec![
                vec![Scalar::Text("Eng".into()), Scalar::Int(5)],
                vec![Scalar::Text("Sales".into()), Scalar::Int(3)],
            ],
        )
    }

    fn bar_plan() -> ChartPlan {
        ChartPlan::new(ChartKind::Bar, "dept", Some("count".into()))
    }

    #[test]
    fn bar_categories_and_series_match_rows() {
        let config = build_config(&dept_count(), &bar_plan()).unwrap();

        let categories = config.x_axis.unwrap().categories.unwrap();
        assert_eq!(categories, vec!["Eng", "Sales"]);
        match &config.series[0].data {
            SeriesData::Values(values) => assert_eq!(values, &vec![5.0, 3.0]),
            other => panic!("expected plain values, got {:?}", other),
        }
        assert_eq!(config.series[0].name, "count");
        assert_eq!(config.chart.kind, "column");
    }

    #[test]
    fn bar_lengths_track_row_count() {
        let n = 23;
        let rows = ResultSet::new(
            vec!["k".into(), "v".into()],
            (0..n)
                .map(|i| vec![Scalar::Text(format!("k{}", i)), Scalar::Int(i as i64)])
                .collect(),
        );
        let plan = ChartPlan::new(ChartKind::Bar, "k", Some("v".into()));
        let config = build_config(&rows, &plan).unwrap();
        assert_eq!(config.x_axis.unwrap().categories.unwrap().len(), n);
        match &config.series[0].data {
            SeriesData::Values(values) => assert_eq!(values.len(), n),
            other => panic!("expected plain values, got {:?}", other),
        }
    }

    #[test]
    fn identical_inputs_yield_identical_configs() {
        let rows = dept_count();
        let plan = bar_plan();
        assert_eq!(
            build_config(&rows, &plan).unwrap(),
            build_config(&rows, &plan).unwrap()
        );
    }

    #[test]
    fn numeric_cast_failure_degrades_to_zero() {
        let rows = ResultSet::new(
            vec!["dept".into(), "count".into()],
            vec![
                vec![Scalar::Text("Eng".into()), Scalar::Text("oops".into())],
                vec![Scalar::Text("Sales".into()), Scalar::Null],
            ],
        );
        let config = build_config(&rows, &bar_plan()).unwrap();
        match &config.series[0].data {
            SeriesData::Values(values) => assert_eq!(values, &vec![0.0, 0.0]),
            other => panic!("expected plain values, got {:?}", other),
        }
    }

    #[test]
    fn missing_column_is_reported() {
        let plan = ChartPlan::new(ChartKind::Bar, "nope", Some("count".into()));
        assert_eq!(
            build_config(&dept_count(), &plan),
            Err(ConfigError::MissingColumn("nope".into()))
        );
    }

    #[test]
    fn bar_needs_two_columns() {
        let rows = ResultSet::new(
            vec!["only".into()],
            vec![vec![Scalar::Int(1)]],
        );
        let plan = ChartPlan::new(ChartKind::Bar, "only", None);
        assert!(matches!(
            build_config(&rows, &plan),
            Err(ConfigError::TooFewColumns { .. })
        ));
    }

    #[test]
    fn empty_rows_fail() {
        let rows = ResultSet::new(vec!["dept".into(), "count".into()], vec![]);
        assert_eq!(build_config(&rows, &bar_plan()), Err(ConfigError::EmptyResult));
    }

    fn wide_pie_rows(values: impl Fn(usize) -> i64) -> ResultSet {
        ResultSet::new(
            vec!["cat".into(), "v".into()],
            (0..20)
                .map(|i| vec![Scalar::Text(format!("c{:02}", i)), Scalar::Int(values(i))])
                .collect(),
        )
    }

    #[test]
    fn wide_pie_collapses_to_top_ten_plus_others() {
        let rows = wide_pie_rows(|i| i as i64 + 1);
        let plan = ChartPlan::new(ChartKind::Pie, "cat", Some("v".into()));
        let config = build_config(&rows, &plan).unwrap();

        match &config.series[0].data {
            SeriesData::Named(slices) => {
                assert_eq!(slices.len(), 11);
                let others = slices.last().unwrap();
                assert_eq!(others.name, "Others");
                // values 1..=20; top ten are 11..=20, remainder sums 1..=10
                assert_eq!(others.y, 55.0);
                assert_eq!(slices[0].y, 20.0);
            }
            other => panic!("expected named slices, got {:?}", other),
        }
    }

    #[test]
    fn others_slice_omitted_when_not_positive() {
        // Ten positive categories, the remaining ten are zero.
        let rows = wide_pie_rows(|i| if i < 10 { 10 } else { 0 });
        let plan = ChartPlan::new(ChartKind::Pie, "cat", Some("v".into()));
        let config = build_config(&rows, &plan).unwrap();

        match &config.series[0].data {
            SeriesData::Named(slices) => {
                assert_eq!(slices.len(), 10);
                assert!(slices.iter().all(|s| s.name != "Others"));
            }
            other => panic!("expected named slices, got {:?}", other),
        }
    }

    #[test]
    fn narrow_pie_keeps_per_row_slices() {
        let config = build_config(
            &dept_count(),
            &ChartPlan::new(ChartKind::Pie, "dept", Some("count".into())),
        )
        .unwrap();
        match &config.series[0].data {
            SeriesData::Named(slices) => {
                assert_eq!(slices.len(), 2);
                assert_eq!(slices[0].name, "Eng");
                assert_eq!(slices[0].y, 5.0);
            }
            other => panic!("expected named slices, got {:?}", other),
        }
        assert!(config.plot_options.is_some());
    }

    #[test]
    fn histogram_bins_follow_the_width_rule() {
        let values: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let bins = histogram_bins(&values);

        // n = 10 -> min(10, 5) = 5 bins
        assert_eq!(bins.len(), 5);
        let total: f64 = bins.iter().map(|b| b.y).sum();
        assert_eq!(total, 10.0);
        // Last bin is upper-inclusive, so the max value lands there.
        assert_eq!(bins.last().unwrap().y, 2.0); // [8.2, 10.0] holds 9 and 10
    }

    #[test]
    fn tiny_inputs_still_get_two_bins() {
        let bins = histogram_bins(&[1.0, 2.0]);
        assert_eq!(bins.len(), 2);
        assert_eq!(bins.iter().map(|b| b.y).sum::<f64>(), 2.0);
    }

    #[test]
    fn histogram_selects_first_numeric_column() {
        let rows = ResultSet::new(
            vec!["label".into(), "score".into()],
            vec![
                vec![Scalar::Text("a".into()), Scalar::Int(1)],
                vec![Scalar::Text("b".into()), Scalar::Int(2)],
                vec![Scalar::Text("c".into()), Scalar::Int(3)],
                vec![Scalar::Text("d".into()), Scalar::Int(4)],
            ],
        );
        let plan = ChartPlan::new(ChartKind::Histogram, "label", None);
        let config = build_config(&rows, &plan).unwrap();
        assert!(config.title.text.contains("Distribution of score"));
        assert_eq!(config.series[0].name, "Frequency");
    }

    #[test]
    fn histogram_without_numeric_column_fails() {
        let rows = ResultSet::new(
            vec!["a".into()],
            vec![vec![Scalar::Text("x".into())], vec![Scalar::Text("y".into())]],
        );
        let plan = ChartPlan::new(ChartKind::Histogram, "a", None);
        assert_eq!(build_config(&rows, &plan), Err(ConfigError::NoNumericColumn));
    }

    #[test]
    fn scatter_passes_points_through() {
        let rows = ResultSet::new(
            vec!["x".into(), "y".into()],
            vec![
                vec![Scalar::Int(1), Scalar::Float(2.5)],
                vec![Scalar::Int(2), Scalar::Float(3.5)],
            ],
        );
        let plan = ChartPlan::new(ChartKind::Scatter, "x", Some("y".into()));
        let config = build_config(&rows, &plan).unwrap();
        match &config.series[0].data {
            SeriesData::Points(points) => {
                assert_eq!(points, &vec![(1.0, 2.5), (2.0, 3.5)]);
            }
            other => panic!("expected points, got {:?}", other),
        }
    }

    #[test]
    fn config_serializes_in_highcharts_shape() {
        let config = build_config(&dept_count(), &bar_plan()).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["chart"]["type"], "column");
        assert_eq!(json["chart"]["backgroundColor"], "#2b2b2b");
        assert_eq!(json["xAxis"]["categories"][0], "Eng");
        assert_eq!(json["credits"]["enabled"], false);
    }
}
