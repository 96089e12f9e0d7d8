// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Platform detection tool handler.

use async_trait::async_trait;

use crate::error::ToolError;
use crate::tools::registry::{ToolHandler, ToolOutput};
use crate::tools::ToolDefinition;

/// Handler for the `get_platform` tool.
///
/// Reports the platform label the `shell_helper` tool expects as its
/// `platform` argument.
pub struct PlatformHandler;

/// Detect the host platform label.
pub fn detect_platform() -> &'static str {
    if cfg!(target_os = "windows") {
        "Windows"
    } else if cfg!(unix) {
        "*nix"
    } else {
        "Unknown"
    }
}

#[async_trait]
impl ToolHandler for PlatformHandler {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            "get_platform",
            "Get the operating system platform of the host running this server",
        )
    }

    async fn execute(&self, _input: serde_json::Value) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::success(detect_platform()))
    }
}
