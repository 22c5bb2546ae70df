//! Prompt construction for LLM requests.
//!
//! Builds the system instructions and user content for the two generation
//! calls of a pipeline run.

/// System prompt template for SQL generation.
const SQL_GENERATION_TEMPLATE: &str = r#"You are an expert PostgreSQL database administrator. Translate the user's request into a single executable SQL statement for the database described below.

DATABASE SCHEMA:
{schema}

INSTRUCTIONS:
- Generate only valid PostgreSQL SQL
- You may write SELECT queries, DDL (CREATE, ALTER, DROP) and DML (INSERT, UPDATE, DELETE) as the request requires
- Use only tables and columns that appear in the schema

OUTPUT FORMAT:
Output ONLY the SQL statement and nothing else. No explanations."#;

/// System instruction for answering after a mutating statement.
pub const MUTATION_CONFIRMATION_PROMPT: &str = r#"You are an assistant that reports on database changes. The user asked for a change, a SQL statement was executed, and you are given its execution result.

INSTRUCTIONS:
- Confirm what action was performed
- State clearly whether it succeeded or failed; if it failed, explain the error in plain language
- If the result contains changed data, summarize it briefly"#;

/// System instruction for answering after a read-only statement.
pub const READ_ANSWER_PROMPT: &str = r#"You are an assistant that answers questions from database query results. The user asked a question, a SQL query was executed, and you are given its result.

INSTRUCTIONS:
- Answer the original question directly from the result
- When the result has several rows or columns, present it as a markdown table
- When the result is a single value, answer with a plain sentence
- If the execution failed, explain the error in plain language instead of guessing an answer"#;

/// Builds the SQL-generation system prompt with the schema injected.
pub fn sql_generation_prompt(schema: &str) -> String {
    SQL_GENERATION_TEMPLATE.replace("{schema}", schema)
}

/// Selects the answer instruction for the statement's classification.
pub fn answer_instruction(is_mutating: bool) -> &'static str {
    if is_mutating {
        MUTATION_CONFIRMATION_PROMPT
    } else {
        READ_ANSWER_PROMPT
    }
}

/// Builds the user content for the answer call.
///
/// Both branches carry the question, the executed SQL and the rendered
/// execution result.
pub fn answer_user_content(question: &str, sql: &str, result: &str, is_mutating: bool) -> String {
    let label = if is_mutating {
        "Original request"
    } else {
        "Original question"
    };

    format!(
        "{}: {}\n\nExecuted SQL:\n```sql\n{}\n```\n\nExecution Result:\n{}",
        label, question, sql, result
    )
}
