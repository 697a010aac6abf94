//! File read tool: read-only filesystem access.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use steward_core::error::ToolError;
use steward_core::Tool;
use tracing::debug;

/// Maximum bytes returned in one read.
const MAX_READ_BYTES: u64 = 64 * 1024;

/// Read files, scoped to a root directory.
pub struct FileReadTool {
    root: PathBuf,
}

impl FileReadTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolve a requested path inside the root, rejecting escapes.
    fn resolve(&self, requested: &str) -> Result<PathBuf, ToolError> {
        let path = Path::new(requested);
        if path.is_absolute() || path.components().any(|c| c.as_os_str() == "..") {
            return Err(ToolError::PermissionDenied {
                tool_name: "file_read".into(),
                reason: format!("Path '{requested}' escapes the workspace root"),
            });
        }
        Ok(self.root.join(path))
    }
}

#[async_trait]
impl Tool for FileReadTool {
    fn name(&self) -> &str {
        "file_read"
    }

    fn description(&self) -> &str {
        "Read a text file relative to the workspace root and return its contents."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "path": {
                    "type": "string",
                    "description": "Path relative to the workspace root"
                }
            },
            "required": ["path"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let requested = arguments["path"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'path' argument".into()))?;

        let path = self.resolve(requested)?;
        debug!(path = %path.display(), "Reading file");

        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "file_read".into(),
                reason: format!("{requested}: {e}"),
            })?;

        if metadata.len() > MAX_READ_BYTES {
            return Err(ToolError::ExecutionFailed {
                tool_name: "file_read".into(),
                reason: format!(
                    "{requested}: file is {} bytes, limit is {MAX_READ_BYTES}",
                    metadata.len()
                ),
            });
        }

        let content =
            tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "file_read".into(),
                    reason: format!("{requested}: {e}"),
                })?;

        Ok(serde_json::json!({
            "path": requested,
            "content": content,
        }))
    }
}
