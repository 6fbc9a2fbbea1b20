use serde::{Deserialize, Serialize};

/// Message returned to callers when the external tool exceeds its deadline.
pub const TIMEOUT_MESSAGE: &str = "Build timed out. Please check your YAML configuration.";

/// Four-way classification of an external tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum OutcomeKind {
    Success,
    ToolFailure,
    Timeout,
    InfrastructureError,
}

/// Immutable record of one external tool invocation.
#[derive(Debug, Clone)]
pub struct InvocationResult {
    kind: OutcomeKind,
    exit_code: Option<i32>,
    stdout: String,
    stderr: String,
    message: Option<String>,
    duration_ms: u64,
}

impl InvocationResult {
    /// Classify a process that exited before the deadline.
    pub fn exited(exit_code: Option<i32>, stdout: String, stderr: String, duration_ms: u64) -> Self {
        let kind = if exit_code == Some(0) {
            OutcomeKind::Success
        } else {
            OutcomeKind::ToolFailure
        };
        Self {
            kind,
            exit_code,
            stdout,
            stderr,
            message: None,
            duration_ms,
        }
    }

    pub fn timed_out(duration_ms: u64) -> Self {
        Self {
            kind: OutcomeKind::Timeout,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            message: Some(TIMEOUT_MESSAGE.to_string()),
            duration_ms,
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        Self {
            kind: OutcomeKind::InfrastructureError,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            message: Some(message.into()),
            duration_ms: 0,
        }
    }

    pub fn kind(&self) -> OutcomeKind {
        self.kind
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn stdout(&self) -> &str {
        &self.stdout
    }

    pub fn stderr(&self) -> &str {
        &self.stderr
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}

/// JSON body returned by the build endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildResponse {
    pub success: bool,
    pub output: Option<String>,
    pub error: Option<String>,
}

impl BuildResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }
}

impl From<&InvocationResult> for BuildResponse {
    fn from(result: &InvocationResult) -> Self {
        match result.kind {
            OutcomeKind::Success => Self {
                success: true,
                output: Some(result.stdout.clone()),
                error: None,
            },
            OutcomeKind::ToolFailure => Self::failure(result.stderr.clone()),
            OutcomeKind::Timeout => Self::failure(TIMEOUT_MESSAGE),
            OutcomeKind::InfrastructureError => {
                Self::failure(result.message.clone().unwrap_or_default())
            }
        }
    }
}
