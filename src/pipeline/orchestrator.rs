//! Pipeline orchestrator.
//!
//! Coordinates the database client, LLM client and safety classifier to turn
//! a question into a natural-language answer.

use std::sync::Arc;

use tracing::{debug, info, info_span, Instrument};

use super::state::{PipelineState, Stage};
use crate::db::{introspect_schema, DatabaseClient};
use crate::error::Result;
use crate::llm::prompt::{answer_instruction, answer_user_content, sql_generation_prompt};
use crate::llm::{extract_sql, LlmClient};
use crate::query::QueryExecutor;
use crate::safety::{is_mutating, matched_keyword};

/// The stage sequence bound to its collaborators.
///
/// Holds no per-request data; clone it or wrap it in an `Arc` to share it.
#[derive(Clone)]
pub struct Pipeline {
    db: Arc<dyn DatabaseClient>,
    llm: Arc<dyn LlmClient>,
}

impl Pipeline {
    /// Creates a pipeline over the given database and LLM clients.
    pub fn new(db: Arc<dyn DatabaseClient>, llm: Arc<dyn LlmClient>) -> Self {
        Self { db, llm }
    }

    /// Runs every stage for `question` and returns the completed state.
    ///
    /// Schema and execution failures are folded into the state as text. Only
    /// a failure of the LLM (or a stage ordering fault) is returned as an
    /// error.
    pub async fn run(&self, question: &str) -> Result<PipelineState> {
        let span = info_span!("pipeline", question = %question);

        async move {
            let mut state = PipelineState::new(question);
            for stage in Stage::ORDER {
                self.run_stage(stage, &mut state).await?;
            }
            Ok(state)
        }
        .instrument(span)
        .await
    }

    /// Runs the pipeline and returns only the final answer.
    pub async fn answer(&self, question: &str) -> Result<String> {
        let state = self.run(question).await?;
        Ok(state.final_answer()?.to_string())
    }

    /// Runs the pipeline once, then closes the database whether or not the
    /// run succeeded. A run error takes precedence over a close error.
    pub async fn run_once(&self, question: &str) -> Result<PipelineState> {
        let outcome = self.run(question).await;
        let closed = self.close().await;
        let state = outcome?;
        closed?;
        Ok(state)
    }

    /// Closes the database client.
    pub async fn close(&self) -> Result<()> {
        self.db.close().await
    }

    /// Runs a single stage against `state`.
    ///
    /// Fails with an internal error when `stage` is not the next one due.
    pub async fn run_stage(&self, stage: Stage, state: &mut PipelineState) -> Result<()> {
        state.check_ready(stage)?;
        debug!("Running stage {}", stage);

        match stage {
            Stage::FetchSchema => {
                let schema = introspect_schema(self.db.as_ref()).await;
                state.set_schema(schema)?;
            }
            Stage::GenerateSql => {
                let instruction = sql_generation_prompt(state.schema()?);
                let reply = self.llm.generate(&instruction, state.question()).await?;
                let sql = extract_sql(&reply);
                info!("Generated SQL: {}", sql);
                state.set_sql_text(sql)?;
            }
            Stage::Classify => {
                let sql = state.sql_text()?;
                let mutating = is_mutating(sql);
                match matched_keyword(sql) {
                    Some(keyword) => debug!("Classified as mutating (matched {})", keyword),
                    None => debug!("Classified as read-only"),
                }
                state.set_is_mutating(mutating)?;
            }
            Stage::Execute => {
                let result = QueryExecutor::new(self.db.as_ref())
                    .execute(state.sql_text()?)
                    .await;
                info!("Execution result: {}", result.render());
                state.set_execution(result)?;
            }
            Stage::GenerateResponse => {
                let mutating = state.is_mutating()?;
                let content = answer_user_content(
                    state.question(),
                    state.sql_text()?,
                    &state.execution_result()?,
                    mutating,
                );
                let answer = self
                    .llm
                    .generate(answer_instruction(mutating), &content)
                    .await?;
                state.set_final_answer(answer)?;
            }
        }

        state.complete(stage);
        Ok(())
    }
}
