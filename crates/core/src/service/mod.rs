pub mod http;

use crate::workflow::error::TransportError;

/// A file picked by the operator for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// The remote analysis backend.
#[async_trait::async_trait]
pub trait AnalysisService: Send + Sync {
    async fn upload(&self, business_id: u64, file: &SelectedFile) -> Result<(), TransportError>;

    /// Returns the raw JSON payload; callers normalize it.
    async fn analyze(&self, business_id: u64) -> Result<serde_json::Value, TransportError>;
}
