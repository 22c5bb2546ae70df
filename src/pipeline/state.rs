//! Pipeline phases, stages and the per-run state accumulator.

use crate::error::{AgentError, Result};
use crate::query::ExecutionResult;

/// Where a pipeline run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Start,
    SchemaFetched,
    SqlGenerated,
    Classified,
    Executed,
    ResponseGenerated,
}

impl Phase {
    /// Returns true once the final answer has been written.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::ResponseGenerated)
    }
}

/// One step of the fixed pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchSchema,
    GenerateSql,
    Classify,
    Execute,
    GenerateResponse,
}

impl Stage {
    /// The stages in the only order they may run.
    pub const ORDER: [Stage; 5] = [
        Stage::FetchSchema,
        Stage::GenerateSql,
        Stage::Classify,
        Stage::Execute,
        Stage::GenerateResponse,
    ];

    /// Phase the state must be in before this stage runs.
    pub fn requires(&self) -> Phase {
        match self {
            Self::FetchSchema => Phase::Start,
            Self::GenerateSql => Phase::SchemaFetched,
            Self::Classify => Phase::SqlGenerated,
            Self::Execute => Phase::Classified,
            Self::GenerateResponse => Phase::Executed,
        }
    }

    /// Phase the state is in after this stage succeeds.
    pub fn produces(&self) -> Phase {
        match self {
            Self::FetchSchema => Phase::SchemaFetched,
            Self::GenerateSql => Phase::SqlGenerated,
            Self::Classify => Phase::Classified,
            Self::Execute => Phase::Executed,
            Self::GenerateResponse => Phase::ResponseGenerated,
        }
    }

    /// Stage name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FetchSchema => "fetch_schema",
            Self::GenerateSql => "generate_sql",
            Self::Classify => "classify",
            Self::Execute => "execute",
            Self::GenerateResponse => "generate_response",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A field that may be written exactly once.
#[derive(Debug, Clone, PartialEq)]
struct Slot<T> {
    name: &'static str,
    value: Option<T>,
}

impl<T> Slot<T> {
    fn new(name: &'static str) -> Self {
        Self { name, value: None }
    }

    fn set(&mut self, value: T) -> Result<()> {
        if self.value.is_some() {
            return Err(AgentError::internal(format!(
                "pipeline field '{}' written twice",
                self.name
            )));
        }
        self.value = Some(value);
        Ok(())
    }

    fn get(&self) -> Result<&T> {
        self.value.as_ref().ok_or_else(|| {
            AgentError::internal(format!("pipeline field '{}' read before it was written", self.name))
        })
    }
}

/// State accumulated by one pipeline run.
///
/// Owned by a single run and never shared. Every field except `question`
/// starts empty and is written once by the stage that produces it.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    phase: Phase,
    question: String,
    schema: Slot<String>,
    sql_text: Slot<String>,
    is_mutating: Slot<bool>,
    execution: Slot<ExecutionResult>,
    final_answer: Slot<String>,
}

impl PipelineState {
    /// Creates the state for a new run.
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            phase: Phase::Start,
            question: question.into(),
            schema: Slot::new("schema"),
            sql_text: Slot::new("sql_text"),
            is_mutating: Slot::new("is_mutating"),
            execution: Slot::new("execution_result"),
            final_answer: Slot::new("final_answer"),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn schema(&self) -> Result<&str> {
        self.schema.get().map(String::as_str)
    }

    pub fn sql_text(&self) -> Result<&str> {
        self.sql_text.get().map(String::as_str)
    }

    pub fn is_mutating(&self) -> Result<bool> {
        self.is_mutating.get().copied()
    }

    /// The structured execution outcome.
    pub fn execution(&self) -> Result<&ExecutionResult> {
        self.execution.get()
    }

    /// The execution outcome as rendered text.
    pub fn execution_result(&self) -> Result<String> {
        self.execution.get().map(ExecutionResult::render)
    }

    pub fn final_answer(&self) -> Result<&str> {
        self.final_answer.get().map(String::as_str)
    }

    pub(crate) fn set_schema(&mut self, schema: String) -> Result<()> {
        self.schema.set(schema)
    }

    pub(crate) fn set_sql_text(&mut self, sql: String) -> Result<()> {
        self.sql_text.set(sql)
    }

    pub(crate) fn set_is_mutating(&mut self, is_mutating: bool) -> Result<()> {
        self.is_mutating.set(is_mutating)
    }

    pub(crate) fn set_execution(&mut self, result: ExecutionResult) -> Result<()> {
        self.execution.set(result)
    }

    pub(crate) fn set_final_answer(&mut self, answer: String) -> Result<()> {
        self.final_answer.set(answer)
    }

    /// Fails unless `stage` is the next stage to run.
    pub(crate) fn check_ready(&self, stage: Stage) -> Result<()> {
        if self.phase != stage.requires() {
            return Err(AgentError::internal(format!(
                "stage '{}' cannot run in phase {:?} (requires {:?})",
                stage,
                self.phase,
                stage.requires()
            )));
        }
        Ok(())
    }

    /// Records that `stage` finished.
    pub(crate) fn complete(&mut self, stage: Stage) {
        self.phase = stage.produces();
    }
}
