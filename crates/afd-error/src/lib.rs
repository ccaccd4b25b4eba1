// SPDX-License-Identifier: MIT OR Apache-2.0
//! Closed error taxonomy with stable codes for AFD commands.
//!
//! Every [`CommandError`] carries an [`ErrorCode`] drawn from a fixed set (the
//! framework never adds codes silently — see §7 of the design), a
//! human-readable message, an optional retry hint, and arbitrary structured
//! context. Use the builder returned by [`CommandError::new`] to construct
//! errors fluently.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorCode
// ---------------------------------------------------------------------------

/// Machine-readable, stable error code.
///
/// Each variant serialises to a `SCREAMING_SNAKE_CASE` string that is
/// guaranteed not to change across patch releases. Custom domain codes are
/// permitted in addition to this taxonomy (see [`CommandError::custom`]), but
/// these eleven are the ones the invoker and MCP layer reason about directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input failed schema parse.
    ValidationError,
    /// Target entity does not exist.
    NotFound,
    /// Preconditions or state prevents the action.
    Conflict,
    /// Caller lacks permission.
    Forbidden,
    /// Caller was throttled.
    RateLimited,
    /// Requested update is a no-op.
    NoChanges,
    /// Invocation was cancelled or timed out.
    Cancelled,
    /// Command name is not registered.
    CommandNotFound,
    /// Command is registered but blocked by exposure policy for this interface.
    CommandNotExposed,
    /// Handler raised an unhandled panic/exception.
    CommandExecutionError,
    /// Unexpected server fault.
    InternalError,
}

impl ErrorCode {
    /// Whether retrying the same invocation might succeed.
    ///
    /// This is the taxonomy default; [`CommandError::retryable`] may be
    /// overridden per instance but should rarely disagree with this.
    #[must_use]
    pub fn default_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Cancelled)
    }

    /// Stable `&'static str` representation (e.g. `"VALIDATION_ERROR"`).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Forbidden => "FORBIDDEN",
            Self::RateLimited => "RATE_LIMITED",
            Self::NoChanges => "NO_CHANGES",
            Self::Cancelled => "CANCELLED",
            Self::CommandNotFound => "COMMAND_NOT_FOUND",
            Self::CommandNotExposed => "COMMAND_NOT_EXPOSED",
            Self::CommandExecutionError => "COMMAND_EXECUTION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CommandError
// ---------------------------------------------------------------------------

/// Structured, actionable failure returned in a result envelope's `error`
/// field.
///
/// `code` may be one of the closed [`ErrorCode`] variants (via
/// [`CommandError::new`]) or a custom domain string (via
/// [`CommandError::custom`]); both serialise identically.
///
/// # Builder usage
///
/// ```
/// use afd_error::{CommandError, ErrorCode};
///
/// let err = CommandError::new(ErrorCode::NotFound, "todo '123' not found")
///     .with_suggestion("Use `todo-list` to discover valid ids")
///     .with_details("id", "123");
/// assert_eq!(err.code, "NOT_FOUND");
/// assert_eq!(err.retryable, false);
/// ```
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandError {
    /// Machine-readable code, either from [`ErrorCode`] or a custom domain
    /// string.
    pub code: String,
    /// Human-readable message describing what went wrong.
    pub message: String,
    /// What the caller can do about it. Present whenever reasonable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Whether retrying the same invocation might succeed. Defaults to
    /// `false`; the taxonomy fixes it where the cause is inherently
    /// transient.
    pub retryable: bool,
    /// Additional structured context for diagnostics (e.g. `cause` for
    /// contained panics).
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl CommandError {
    /// Create a new error from a taxonomy code, seeding `retryable` from
    /// [`ErrorCode::default_retryable`].
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_str().to_string(),
            message: message.into(),
            suggestion: None,
            retryable: code.default_retryable(),
            details: BTreeMap::new(),
        }
    }

    /// Create an error with a domain-specific code outside the closed
    /// taxonomy. `retryable` defaults to `false`.
    #[must_use]
    pub fn custom(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            suggestion: None,
            retryable: false,
            details: BTreeMap::new(),
        }
    }

    /// Attach an actionable suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Override the retryable flag.
    #[must_use]
    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Attach a single key/value diagnostic detail. The value is converted
    /// via [`serde_json::to_value`]; if serialisation fails the entry is
    /// silently skipped.
    #[must_use]
    pub fn with_details(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.details.insert(key.into(), v);
        }
        self
    }

    /// Whether `code` matches one of the closed taxonomy's string values.
    #[must_use]
    pub fn is_taxonomy_code(&self) -> bool {
        ALL_CODES.iter().any(|c| c.as_str() == self.code)
    }
}

impl fmt::Debug for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("CommandError");
        d.field("code", &self.code);
        d.field("message", &self.message);
        d.field("retryable", &self.retryable);
        if let Some(ref s) = self.suggestion {
            d.field("suggestion", s);
        }
        if !self.details.is_empty() {
            d.field("details", &self.details);
        }
        d.finish()
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (suggestion: {s})")?;
        }
        Ok(())
    }
}

impl std::error::Error for CommandError {}

/// Convenience constructors for the taxonomy's eleven codes.
impl CommandError {
    /// [`ErrorCode::ValidationError`].
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationError, message)
    }

    /// [`ErrorCode::NotFound`].
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// [`ErrorCode::CommandNotFound`] for an unregistered command name.
    #[must_use]
    pub fn command_not_found(name: &str) -> Self {
        Self::new(ErrorCode::CommandNotFound, format!("command '{name}' is not registered"))
            .with_suggestion("Call the help bootstrap tool to list registered commands")
            .with_details("name", name)
    }

    /// [`ErrorCode::CommandNotExposed`] for an exposure-gate rejection.
    #[must_use]
    pub fn command_not_exposed(name: &str, interface: &str) -> Self {
        Self::new(
            ErrorCode::CommandNotExposed,
            format!("command '{name}' is not exposed on the '{interface}' interface"),
        )
        .with_details("name", name)
        .with_details("interface", interface)
    }

    /// [`ErrorCode::CommandExecutionError`] wrapping a contained panic or
    /// handler error.
    #[must_use]
    pub fn execution_error(cause: impl Into<String>) -> Self {
        Self::new(ErrorCode::CommandExecutionError, "the command handler failed unexpectedly")
            .with_details("cause", cause.into())
    }

    /// [`ErrorCode::Cancelled`].
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "invocation was cancelled")
    }

    /// [`ErrorCode::RateLimited`].
    #[must_use]
    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::RateLimited, message)
    }

    /// [`ErrorCode::InternalError`].
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

const ALL_CODES: &[ErrorCode] = &[
    ErrorCode::ValidationError,
    ErrorCode::NotFound,
    ErrorCode::Conflict,
    ErrorCode::Forbidden,
    ErrorCode::RateLimited,
    ErrorCode::NoChanges,
    ErrorCode::Cancelled,
    ErrorCode::CommandNotFound,
    ErrorCode::CommandNotExposed,
    ErrorCode::CommandExecutionError,
    ErrorCode::InternalError,
];

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn basic_construction() {
        let err = CommandError::new(ErrorCode::InternalError, "boom");
        assert_eq!(err.code, "INTERNAL_ERROR");
        assert_eq!(err.message, "boom");
        assert!(err.suggestion.is_none());
        assert!(err.details.is_empty());
    }

    #[test]
    fn default_retryable_matches_taxonomy() {
        assert!(!CommandError::new(ErrorCode::ValidationError, "x").retryable);
        assert!(CommandError::new(ErrorCode::RateLimited, "x").retryable);
        assert!(CommandError::new(ErrorCode::Cancelled, "x").retryable);
        assert!(!CommandError::new(ErrorCode::CommandNotFound, "x").retryable);
    }

    #[test]
    fn display_without_suggestion() {
        let err = CommandError::new(ErrorCode::NotFound, "no such todo");
        assert_eq!(err.to_string(), "[NOT_FOUND] no such todo");
    }

    #[test]
    fn display_with_suggestion() {
        let err = CommandError::new(ErrorCode::RateLimited, "too fast")
            .with_suggestion("wait 60s and retry");
        let s = err.to_string();
        assert!(s.contains("too fast"));
        assert!(s.contains("wait 60s and retry"));
    }

    #[test]
    fn builder_chaining() {
        let err = CommandError::new(ErrorCode::Conflict, "already exists")
            .with_suggestion("rename and retry")
            .with_details("id", "abc")
            .with_retryable(false);
        assert_eq!(err.details["id"], serde_json::json!("abc"));
        assert!(!err.retryable);
    }

    #[test]
    fn custom_code_is_not_taxonomy() {
        let err = CommandError::custom("TODO_ALREADY_DONE", "already complete");
        assert!(!err.is_taxonomy_code());
        assert!(!err.retryable);
    }

    #[test]
    fn taxonomy_code_detected() {
        let err = CommandError::not_found("missing");
        assert!(err.is_taxonomy_code());
    }

    #[test]
    fn command_not_found_helper() {
        let err = CommandError::command_not_found("todo-create");
        assert_eq!(err.code, "COMMAND_NOT_FOUND");
        assert_eq!(err.details["name"], serde_json::json!("todo-create"));
        assert!(!err.retryable);
    }

    #[test]
    fn command_not_exposed_helper() {
        let err = CommandError::command_not_exposed("todo-delete", "mcp");
        assert_eq!(err.code, "COMMAND_NOT_EXPOSED");
        assert_eq!(err.details["interface"], serde_json::json!("mcp"));
    }

    #[test]
    fn execution_error_wraps_cause() {
        let err = CommandError::execution_error("panicked at index 3");
        assert_eq!(err.code, "COMMAND_EXECUTION_ERROR");
        assert_eq!(
            err.details["cause"],
            serde_json::json!("panicked at index 3")
        );
        assert!(!err.retryable);
    }

    #[test]
    fn serde_roundtrip_omits_empty_fields() {
        let err = CommandError::not_found("x");
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("suggestion"));
        assert!(!json.contains("details"));
        let back: CommandError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn all_codes_have_unique_as_str() {
        let mut seen = HashSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.as_str()));
        }
        assert_eq!(seen.len(), ALL_CODES.len());
    }

    #[test]
    fn error_code_count_matches_taxonomy() {
        assert_eq!(ALL_CODES.len(), 11);
    }

    #[test]
    fn error_code_serde_roundtrip() {
        let json = serde_json::to_string(&ErrorCode::ValidationError).unwrap();
        assert_eq!(json, r#""VALIDATION_ERROR""#);
        let back: ErrorCode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ErrorCode::ValidationError);
    }

    #[test]
    fn std_error_impl() {
        let err = CommandError::internal("fault");
        let _: &dyn std::error::Error = &err;
    }
}
