//! Credential & dataset intake: validates the "start agent" inputs and swaps
//! a freshly built agent into the session.

use bytes::Bytes;
use tracing::{info, warn};

use crate::agents::AgentFactory;
use crate::dataset::{Dataset, DatasetSummary};
use crate::session::Session;
use crate::types::ConfigError;

#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn new(file_name: Option<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name,
            bytes: bytes.into(),
        }
    }
}

/// Builds an agent for `file` and installs it in `session`, clearing the
/// history. On any error the session is left as it was.
pub async fn configure(
    session: &mut Session,
    factory: &dyn AgentFactory,
    credential: &str,
    file: Option<UploadedFile>,
) -> Result<DatasetSummary, ConfigError> {
    let credential = credential.trim();
    if credential.is_empty() {
        return Err(ConfigError::MissingCredential);
    }

    let file = match file {
        Some(file) if !file.bytes.is_empty() => file,
        _ => return Err(ConfigError::MissingFile),
    };

    let dataset = Dataset::from_csv_bytes(&file.bytes).map_err(|e| {
        warn!(file = ?file.file_name, error = %e, "Uploaded file is not a readable CSV");
        ConfigError::Parse(e.to_string())
    })?;
    let summary = dataset.summary();

    let agent = factory.create(dataset, credential).await.map_err(|e| {
        warn!(error = %e, "Agent creation failed");
        ConfigError::AgentCreation(e.to_string())
    })?;

    session.replace_agent(agent);
    info!(
        file = ?file.file_name,
        rows = summary.rows,
        columns = summary.columns.len(),
        "Agent configured"
    );
    Ok(summary)
}
