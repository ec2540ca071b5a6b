use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Upload,
    Analyze,
}

impl Stage {
    pub(crate) fn fallback_message(&self) -> &'static str {
        match self {
            Stage::Upload => "Upload failed. Please check the file and try again.",
            Stage::Analyze => "Analysis failed. Please try again.",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Upload => f.write_str("upload"),
            Stage::Analyze => f.write_str("analyze"),
        }
    }
}

/// Network or service failure during one of the two remote calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    pub stage: Stage,
    pub status: Option<u16>,
    /// `detail`/`message` from the service's error body, used verbatim.
    pub server_message: Option<String>,
    /// Protocol-level detail for logs; never shown to the operator.
    pub detail: String,
}

impl TransportError {
    pub fn user_message(&self) -> String {
        self.server_message
            .clone()
            .unwrap_or_else(|| self.stage.fallback_message().to_string())
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} call failed", self.stage)?;
        if let Some(status) = self.status {
            write!(f, " (status={status})")?;
        }
        write!(f, ": {}", self.detail)
    }
}

impl std::error::Error for TransportError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    /// Rejected locally before any network call.
    Validation(String),
    /// Another submission is still uploading or analyzing.
    AlreadyInProgress,
    Transport(TransportError),
}

impl WorkflowError {
    /// The single message shown to the operator.
    pub fn user_message(&self) -> String {
        match self {
            WorkflowError::Validation(reason) => reason.clone(),
            WorkflowError::AlreadyInProgress => {
                "An analysis is already running. Please wait for it to finish.".to_string()
            }
            WorkflowError::Transport(err) => err.user_message(),
        }
    }
}

impl fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowError::Validation(reason) => write!(f, "validation error: {reason}"),
            WorkflowError::AlreadyInProgress => f.write_str("an analysis is already in progress"),
            WorkflowError::Transport(err) => write!(f, "transport error: {err}"),
        }
    }
}

impl std::error::Error for WorkflowError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            WorkflowError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for WorkflowError {
    fn from(err: TransportError) -> Self {
        WorkflowError::Transport(err)
    }
}
