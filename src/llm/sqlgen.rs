use crate::llm::{strip_code_fence, LlmClient, LlmError};
use std::error::Error;
use std::fmt;
use tracing::{debug, error, info};

#[derive(Debug)]
pub enum SqlGenError {
    /// The schema snapshot was empty; there is nothing to prompt with.
    EmptySchema,
    Llm(LlmError),
}

impl fmt::Display for SqlGenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlGenError::EmptySchema => {
                write!(f, "database schema is empty, cannot generate SQL")
            }
            SqlGenError::Llm(e) => write!(f, "{}", e),
        }
    }
}

impl Error for SqlGenError {}

impl From<LlmError> for SqlGenError {
    fn from(e: LlmError) -> Self {
        SqlGenError::Llm(e)
    }
}

/// Combines the schema snapshot and the user's question into one prompt,
/// invokes the language model once, and extracts a clean SQL statement from
/// the reply. No retries; collaborator failures surface as typed errors.
pub async fn synthesize_sql(
    client: &LlmClient,
    question: &str,
    schema: &str,
) -> Result<String, SqlGenError> {
    if schema.trim().is_empty() {
        error!("Schema snapshot is empty, skipping SQL generation");
        return Err(SqlGenError::EmptySchema);
    }

    let prompt = build_prompt(question, schema);
    debug!("SQL generation prompt:\n{}", prompt);

    let reply = client.complete(&prompt).await?;
    let sql = strip_code_fence(&reply);

    if sql.is_empty() {
        return Err(SqlGenError::Llm(LlmError::ResponseError(
            "model reply contained no SQL".to_string(),
        )));
    }

    info!("Generated SQL: {}", sql);
    Ok(sql)
}

fn build_prompt(question: &str, schema: &str) -> String {
    format!(
        r#"You are an assistant that converts natural language questions into SQL queries for DuckDB.
You will be provided with the database schema below. Your task is to generate the SQL query
that answers the natural language question.
Do NOT include any explanations, comments, or additional text in your response, just the SQL query.
Ensure the SQL query is syntactically correct for DuckDB.

Database Schema:
{}

Natural Language Question:
"{}"

SQL Query:
"#,
        schema, question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmConfig;

    fn offline_client() -> LlmClient {
        // Ollama backend needs no credential; precondition checks fire
        // before any request goes out.
        LlmClient::new(&LlmConfig {
            backend: "ollama".to_string(),
            model: "sqlcoder".to_string(),
            api_key: None,
            api_url: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn empty_schema_fails_before_invoking_model() {
        let client = offline_client();
        match synthesize_sql(&client, "how many users?", "  ").await {
            Err(SqlGenError::EmptySchema) => {}
            other => panic!("expected EmptySchema, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn prompt_embeds_schema_and_question() {
        let prompt = build_prompt("how many users?", "Table: users\n  id: INTEGER");
        assert!(prompt.contains("Table: users"));
        assert!(prompt.contains("\"how many users?\""));
        assert!(prompt.contains("DuckDB"));
    }
}
