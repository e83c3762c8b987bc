//! Run domain types
//!
//! A run is one end-to-end pipeline attempt. It is created when the pipeline
//! starts, appended to as steps complete and finalized exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Overall status of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Success,
    /// Abandoned after at least one step succeeded
    Partial,
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunStatus::Success | RunStatus::Partial | RunStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RunStatus::Pending),
            "running" => Ok(RunStatus::Running),
            "success" => Ok(RunStatus::Success),
            "partial" => Ok(RunStatus::Partial),
            "failed" => Ok(RunStatus::Failed),
            other => Err(format!("unknown run status '{}'", other)),
        }
    }
}

/// Pipeline step kinds, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Call,
    Extract,
    Transform,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepKind::Call => write!(f, "call"),
            StepKind::Extract => write!(f, "extract"),
            StepKind::Transform => write!(f, "transform"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failed,
}

/// Classification of a recorded failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ConfigNotFound,
    OracleFailure,
    ValidationFailure,
    MalformedOutput,
    GenerationExhausted,
    CallFailure,
    StoreFailure,
    Expression,
    InvalidPipeline,
    Cancelled,
}

/// Failure detail recorded in the run trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepError {
    pub kind: ErrorKind,
    pub message: String,
    /// Offending schema or instance path, when the failure has one
    #[serde(default)]
    pub path: Option<String>,
}

/// Result of one executed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub kind: StepKind,
    pub config_id: String,
    /// Revision actually used, after any repair
    pub revision: u32,
    pub status: StepStatus,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Oracle attempts spent on this step
    pub retries: u32,
    /// sha256 of the canonical JSON input
    pub input_digest: String,
    #[serde(default)]
    pub error: Option<StepError>,
}

/// One end-to-end execution attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: Uuid,
    pub status: RunStatus,
    /// Index of the step currently executing
    #[serde(default)]
    pub current_step: Option<usize>,
    #[serde(default)]
    pub steps: Vec<StepRecord>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Run {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            status: RunStatus::Pending,
            current_step: None,
            steps: Vec::new(),
            output: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves the run to `Running` at step `index`
    pub fn start_step(&mut self, index: usize) {
        self.status = RunStatus::Running;
        self.current_step = Some(index);
    }

    pub fn push_step(&mut self, record: StepRecord) {
        self.steps.push(record);
    }

    pub fn succeeded_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Success)
            .count()
    }

    pub fn finish_success(&mut self, output: Value) {
        self.status = RunStatus::Success;
        self.current_step = None;
        self.output = Some(output);
        self.completed_at = Some(Utc::now());
    }

    pub fn finish_failed(&mut self, error: impl Into<String>) {
        self.finish(RunStatus::Failed, error);
    }

    /// Finalizes a run that stopped before completing every step
    pub fn finish_abandoned(&mut self, error: impl Into<String>) {
        let status = if self.succeeded_steps() > 0 {
            RunStatus::Partial
        } else {
            RunStatus::Failed
        };
        self.finish(status, error);
    }

    fn finish(&mut self, status: RunStatus, error: impl Into<String>) {
        self.status = status;
        self.current_step = None;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }
}

impl Default for Run {
    fn default() -> Self {
        Self::new()
    }
}
