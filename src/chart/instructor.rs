use crate::chart::plan::{ChartKind, ChartPlan, DEFAULT_TITLE};
use crate::llm::{strip_code_fence, LlmClient};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct InstructionReply {
    chart_type: String,
    x_axis: String,
    y_axis: Option<String>,
    color: Option<String>,
    title: Option<String>,
}

/// Translates a free-form chart instruction ("bar chart of users by
/// department, in red") into a plan by asking the model for a JSON object.
/// Unparsable replies and collaborator errors degrade to `None`.
pub async fn extract_chart_plan(llm: &LlmClient, instruction: &str) -> Option<ChartPlan> {
    let prompt = format!(
        r#"You're a chart-building assistant. Convert this instruction into chart config JSON:
"{}"

Respond with only a JSON object in this shape:
{{
    "chart_type": "bar",
    "x_axis": "department",
    "y_axis": "user_count",
    "color": "red",
    "title": "Users by Department"
}}

chart_type must be one of: bar, pie, line, scatter, histogram."#,
        instruction
    );

    let reply = match llm.complete(&prompt).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Chart instruction extraction failed: {}", e);
            return None;
        }
    };

    parse_instruction_reply(&reply)
}

fn parse_instruction_reply(reply: &str) -> Option<ChartPlan> {
    let body = strip_code_fence(reply);
    let parsed: InstructionReply = match serde_json::from_str(&body) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Chart instruction reply was not valid JSON: {}", e);
            return None;
        }
    };

    let kind = ChartKind::parse(&parsed.chart_type)?;
    let mut plan = ChartPlan::new(kind, parsed.x_axis, parsed.y_axis)
        .with_title(parsed.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()));
    plan.color = parsed.color;
    Some(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_json_reply() {
        let reply = r#"{"chart_type": "bar", "x_axis": "department", "y_axis": "user_count", "color": "red", "title": "Users by Department"}"#;
        let plan = parse_instruction_reply(reply).unwrap();
        assert_eq!(plan.kind, ChartKind::Bar);
        assert_eq!(plan.x, "department");
        assert_eq!(plan.y.as_deref(), Some("user_count"));
        assert_eq!(plan.color.as_deref(), Some("red"));
        assert_eq!(plan.title, "Users by Department");
    }

    #[test]
    fn parses_fenced_json_reply() {
        let reply = "```json\n{\"chart_type\": \"pie\", \"x_axis\": \"region\", \"y_axis\": \"sales\"}\n```";
        let plan = parse_instruction_reply(reply).unwrap();
        assert_eq!(plan.kind, ChartKind::Pie);
        assert_eq!(plan.title, DEFAULT_TITLE);
    }

    #[test]
    fn rejects_invalid_json_and_unknown_kinds() {
        assert!(parse_instruction_reply("not json at all").is_none());
        assert!(
            parse_instruction_reply(r#"{"chart_type": "mosaic", "x_axis": "a"}"#).is_none()
        );
    }
}
