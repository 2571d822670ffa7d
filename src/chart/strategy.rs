use crate::chart::plan::{ChartKind, ChartPlan, DEFAULT_TITLE};
use crate::db::row::{ResultSet, Scalar};
use crate::llm::LlmClient;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Caller-supplied context for planning: the original question (used by the
/// model-assisted strategy), an explicit chart-type hint, and an optional
/// title.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanContext<'a> {
    pub question: Option<&'a str>,
    pub hint: Option<&'a str>,
    pub title: Option<&'a str>,
}

impl<'a> PlanContext<'a> {
    fn title_or_default(&self) -> String {
        self.title.unwrap_or(DEFAULT_TITLE).to_string()
    }
}

/// A chart-planning policy. All strategies map the same inputs to the same
/// output type; an empty result set always plans to `None`.
#[async_trait]
pub trait ChartStrategy: Send + Sync {
    async fn plan(&self, rows: &ResultSet, ctx: &PlanContext<'_>) -> Option<ChartPlan>;
}

/// Rule-based planning from column count and shape, no model call.
///
/// An explicit hint overrides inference verbatim. Otherwise: exactly two
/// columns with an all-numeric second column classify as pie for small
/// results (≤ 10 rows) and bar beyond that; everything else defaults to a
/// bar over the first two columns.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicStrategy;

impl HeuristicStrategy {
    pub fn plan_sync(&self, rows: &ResultSet, ctx: &PlanContext<'_>) -> Option<ChartPlan> {
        if rows.is_empty() {
            return None;
        }

        if let Some(kind) = ctx.hint.and_then(ChartKind::parse) {
            return plan_for_kind(kind, rows, ctx);
        }

        let kind = if rows.columns.len() == 2 && column_is_numeric(rows, 1) {
            if rows.row_count() <= 10 {
                ChartKind::Pie
            } else {
                ChartKind::Bar
            }
        } else {
            ChartKind::Bar
        };

        plan_for_kind(kind, rows, ctx)
    }
}

#[async_trait]
impl ChartStrategy for HeuristicStrategy {
    async fn plan(&self, rows: &ResultSet, ctx: &PlanContext<'_>) -> Option<ChartPlan> {
        self.plan_sync(rows, ctx)
    }
}

/// Maps a decided kind onto the first columns that can carry it.
fn plan_for_kind(kind: ChartKind, rows: &ResultSet, ctx: &PlanContext<'_>) -> Option<ChartPlan> {
    let title = ctx.title_or_default();
    if !kind.needs_y() {
        let x = rows.columns.first()?.clone();
        return Some(ChartPlan::new(kind, x, None).with_title(title));
    }

    if rows.columns.len() < 2 {
        debug!("{} chart needs two columns, result has {}", kind, rows.columns.len());
        return None;
    }
    Some(
        ChartPlan::new(kind, rows.columns[0].clone(), Some(rows.columns[1].clone()))
            .with_title(title),
    )
}

/// Multi-signal planning: classifies every column as numeric, categorical or
/// date-like and derives a ranked candidate list.
#[derive(Debug, Default, Clone, Copy)]
pub struct SuggestionSetStrategy;

const MAX_SUGGESTIONS: usize = 4;
const MAX_CATEGORICAL_DISTINCT: usize = 20;
const MAX_PIE_DISTINCT: usize = 8;

impl SuggestionSetStrategy {
    /// Candidate plans in priority order: bar, pie (small category sets),
    /// scatter, line, histogram; capped at four. Falls back to a bare bar
    /// over the first two columns when nothing else applies.
    pub fn suggest(&self, rows: &ResultSet, ctx: &PlanContext<'_>) -> Vec<ChartPlan> {
        if rows.is_empty() {
            return Vec::new();
        }

        let title = ctx.title_or_default();
        let numeric = numeric_column_names(rows);
        let categorical = categorical_column_names(rows);
        let datelike = datelike_column_names(rows);

        let mut suggestions = Vec::new();

        if let (Some(cat), Some(num)) = (categorical.first(), numeric.first()) {
            suggestions.push(
                ChartPlan::new(ChartKind::Bar, cat.clone(), Some(num.clone()))
                    .with_title(title.clone()),
            );
            if distinct_count(rows, cat) <= MAX_PIE_DISTINCT {
                suggestions.push(
                    ChartPlan::new(ChartKind::Pie, cat.clone(), Some(num.clone()))
                        .with_title(title.clone()),
                );
            }
        }

        if numeric.len() >= 2 {
            suggestions.push(
                ChartPlan::new(
                    ChartKind::Scatter,
                    numeric[0].clone(),
                    Some(numeric[1].clone()),
                )
                .with_title(title.clone()),
            );
        }

        if let (Some(date), Some(num)) = (datelike.first(), numeric.first()) {
            suggestions.push(
                ChartPlan::new(ChartKind::Line, date.clone(), Some(num.clone()))
                    .with_title(title.clone()),
            );
        }

        if let Some(num) = numeric.first() {
            suggestions
                .push(ChartPlan::new(ChartKind::Histogram, num.clone(), None).with_title(title.clone()));
        }

        suggestions.truncate(MAX_SUGGESTIONS);

        if suggestions.is_empty() && rows.columns.len() >= 2 {
            suggestions.push(
                ChartPlan::new(
                    ChartKind::Bar,
                    rows.columns[0].clone(),
                    Some(rows.columns[1].clone()),
                )
                .with_title(title),
            );
        }

        suggestions
    }
}

#[async_trait]
impl ChartStrategy for SuggestionSetStrategy {
    async fn plan(&self, rows: &ResultSet, ctx: &PlanContext<'_>) -> Option<ChartPlan> {
        self.suggest(rows, ctx).into_iter().next()
    }
}

/// Delegates the type/title decision to the language model, constrained to
/// the fixed chart vocabulary. Malformed replies, collaborator errors and
/// empty results all fall back to the heuristic strategy.
pub struct ModelAssistedStrategy {
    llm: Arc<LlmClient>,
    fallback: HeuristicStrategy,
}

impl ModelAssistedStrategy {
    pub fn new(llm: Arc<LlmClient>) -> Self {
        Self {
            llm,
            fallback: HeuristicStrategy,
        }
    }

    fn build_prompt(&self, rows: &ResultSet, question: &str) -> String {
        let sample: Vec<_> = rows.to_json_rows().into_iter().take(3).collect();
        let sample_json =
            serde_json::to_string(&sample).unwrap_or_else(|_| "[]".to_string());

        format!(
            r#"Based on the following natural language query and the SQL results structure, suggest:
1. The best chart type (pie, bar, line, scatter, or histogram)
2. An appropriate chart title

Natural Language Query: "{}"

Data Structure:
Columns: {:?}
Sample Data: {}
Total Rows: {}

Respond in this exact format:
Chart Type: [pie/bar/line/scatter/histogram]
Title: [suggested title]
"#,
            question,
            rows.columns,
            sample_json,
            rows.row_count()
        )
    }
}

#[async_trait]
impl ChartStrategy for ModelAssistedStrategy {
    async fn plan(&self, rows: &ResultSet, ctx: &PlanContext<'_>) -> Option<ChartPlan> {
        if rows.is_empty() {
            return None;
        }

        let question = ctx.question.unwrap_or("");
        let prompt = self.build_prompt(rows, question);

        let reply = match self.llm.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Chart suggestion failed, falling back to heuristic: {}", e);
                return self.fallback.plan_sync(rows, ctx);
            }
        };

        match parse_suggestion(&reply) {
            Some((kind, title)) => {
                let suggestion_ctx = PlanContext {
                    title: Some(title.as_str()),
                    ..*ctx
                };
                plan_for_kind(kind, rows, &suggestion_ctx)
                    .or_else(|| self.fallback.plan_sync(rows, ctx))
            }
            None => {
                warn!("Malformed chart suggestion reply, falling back to heuristic");
                self.fallback.plan_sync(rows, ctx)
            }
        }
    }
}

/// Parses the two labeled lines (`Chart Type: …`, `Title: …`) from a model
/// reply. Both must be present and the type must be in the vocabulary.
pub fn parse_suggestion(reply: &str) -> Option<(ChartKind, String)> {
    let mut kind = None;
    let mut title = None;

    for line in reply.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("Chart Type:") {
            kind = ChartKind::parse(rest.trim().trim_matches(|c| c == '[' || c == ']'));
        } else if let Some(rest) = line.strip_prefix("Title:") {
            let t = rest.trim();
            if !t.is_empty() {
                title = Some(t.to_string());
            }
        }
    }

    Some((kind?, title?))
}

fn column_is_numeric(rows: &ResultSet, idx: usize) -> bool {
    if idx >= rows.columns.len() {
        return false;
    }
    rows.rows.iter().all(|row| row[idx].is_numeric())
}

/// Columns whose non-null values are all numeric (with at least one value).
fn numeric_column_names(rows: &ResultSet) -> Vec<String> {
    rows.columns
        .iter()
        .enumerate()
        .filter(|(idx, _)| {
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
        .map(|(_, name)| name.clone())
        .collect()
}

/// Non-numeric columns with a bounded number of distinct values.
fn categorical_column_names(rows: &ResultSet) -> Vec<String> {
    let numeric: BTreeSet<String> = numeric_column_names(rows).into_iter().collect();
    rows.columns
        .iter()
        .enumerate()
        .filter(|(idx, name)| {
            !numeric.contains(*name)
                && rows.rows.iter().any(|row| !row[*idx].is_null())
                && distinct_count(rows, name.as_str()) <= MAX_CATEGORICAL_DISTINCT
        })
        .map(|(_, name)| name.clone())
        .collect()
}

/// Non-numeric columns whose non-null values all parse as dates.
fn datelike_column_names(rows: &ResultSet) -> Vec<String> {
    rows.columns
        .iter()
        .enumerate()
        .filter(|(idx, _)| {
            let mut seen = false;
            for row in &rows.rows {
                match &row[*idx] {
                    Scalar::Null => {}
                    cell if cell.is_date_like() => seen = true,
                    _ => return false,
                }
            }
            seen
        })
        .map(|(_, name)| name.clone())
        .collect()
}

fn distinct_count(rows: &ResultSet, column: &str) -> usize {
    match rows.column_values(column) {
        Some(values) => values
            .iter()
            .map(|v| v.to_display_string())
            .collect::<BTreeSet<_>>()
            .len(),
        None => 0,
    }
}
