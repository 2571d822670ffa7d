use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_TITLE: &str = "Data Visualization";

/// The fixed chart vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Pie,
    Line,
    Scatter,
    Histogram,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Pie => "pie",
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
            ChartKind::Histogram => "histogram",
        }
    }

    /// Parses a user hint or model reply into a chart kind. Accepts the
    /// loose spellings users actually type ("pie chart", "donut", "column",
    /// "distribution").
    pub fn parse(text: &str) -> Option<ChartKind> {
        match text.trim().to_lowercase().as_str() {
            "pie" | "pie chart" | "donut" => Some(ChartKind::Pie),
            "bar" | "bar chart" | "column" => Some(ChartKind::Bar),
            "line" | "line chart" | "timeseries" => Some(ChartKind::Line),
            "scatter" | "scatter plot" => Some(ChartKind::Scatter),
            "histogram" | "distribution" => Some(ChartKind::Histogram),
            _ => None,
        }
    }

    /// Whether this kind needs both an x and a y column.
    pub fn needs_y(&self) -> bool {
        !matches!(self, ChartKind::Histogram)
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decided chart: type plus column roles, prior to rendering-library
/// configuration. The x column (and y, when the kind requires one) must be
/// present in the result set it will be charted from; `build_config`
/// enforces that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPlan {
    pub kind: ChartKind,
    pub x: String,
    pub y: Option<String>,
    pub color: Option<String>,
    pub title: String,
}

impl ChartPlan {
    pub fn new(kind: ChartKind, x: impl Into<String>, y: Option<String>) -> Self {
        Self {
            kind,
            x: x.into(),
            y,
            color: None,
            title: DEFAULT_TITLE.to_string(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hint_spellings() {
        assert_eq!(ChartKind::parse("pie"), Some(ChartKind::Pie));
        assert_eq!(ChartKind::parse("Pie Chart"), Some(ChartKind::Pie));
        assert_eq!(ChartKind::parse("donut"), Some(ChartKind::Pie));
        assert_eq!(ChartKind::parse("column"), Some(ChartKind::Bar));
        assert_eq!(ChartKind::parse("distribution"), Some(ChartKind::Histogram));
        assert_eq!(ChartKind::parse("sankey"), None);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ChartKind::Histogram).unwrap(),
            "\"histogram\""
        );
    }
}
