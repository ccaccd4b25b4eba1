// SPDX-License-Identifier: MIT OR Apache-2.0
//! Output formatting for CLI display.

use afd_result::CommandResult;
use serde::Serialize;
use serde_json::Value;

/// How a result envelope is rendered on stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Compact single-line JSON.
    Json,
    /// Pretty-printed, indented JSON.
    JsonPretty,
}

impl OutputFormat {
    /// `JsonPretty` if `pretty`, else `Json`.
    #[must_use]
    pub fn from_pretty_flag(pretty: bool) -> Self {
        if pretty {
            Self::JsonPretty
        } else {
            Self::Json
        }
    }
}

/// Render any serializable value per the configured [`OutputFormat`].
#[must_use]
pub fn render<T: Serialize>(format: OutputFormat, value: &T) -> String {
    match format {
        OutputFormat::Json => serde_json::to_string(value).unwrap_or_else(|_| "null".to_string()),
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string()),
    }
}

/// Render a [`CommandResult`] and return the process exit code the spec's
/// CLI table assigns it: `0` on `success:true`, `1` on `success:false`.
#[must_use]
pub fn render_result(format: OutputFormat, result: &CommandResult<Value>) -> (String, i32) {
    let exit_code = if result.is_success() { 0 } else { 1 };
    (render(format, result), exit_code)
}
