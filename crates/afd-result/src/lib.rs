// SPDX-License-Identifier: MIT OR Apache-2.0
//! Result envelope returned by every AFD command.
//!
//! [`CommandResult<T>`] carries either `data` or `error`, never both, plus a
//! set of UX-enabling fields (confidence, reasoning, sources, warnings) that
//! let a calling agent or human reason about trust without parsing prose.
//! [`batch_result`] groups the outcome of an item-by-item operation without
//! ever failing the envelope just because some items failed.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use afd_error::CommandError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ---------------------------------------------------------------------------
// Supporting UX types
// ---------------------------------------------------------------------------

/// An information source backing a result, for attribution and verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// Human-readable label (file path, URL, document title, ...).
    pub label: String,
    /// Optional machine-resolvable locator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

/// One step of a multi-step plan, surfaced for progress visualization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    /// Short description of the step.
    pub description: String,
    /// Whether the step has completed.
    pub done: bool,
}

/// An alternative the handler considered but did not choose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alternative<T> {
    /// The alternative payload.
    pub data: T,
    /// Why this alternative was not chosen.
    pub reason: String,
    /// Confidence in this alternative, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Severity of a non-fatal [`Warning`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational, no action required.
    Info,
    /// Worth surfacing to the caller.
    Warning,
}

/// A non-fatal issue attached to an otherwise successful (or failed) result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Warning {
    /// Machine-readable code, e.g. `"PARTIAL_SUCCESS"`.
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// Defaults to [`Severity::Warning`] when absent on the wire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

impl Warning {
    /// Construct a warning with the given code and message, no explicit
    /// severity (callers may treat absence as [`Severity::Warning`]).
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity: None,
        }
    }
}

/// Execution metadata populated by the invoker on every returned result.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultMetadata {
    /// Handler wall-clock time in milliseconds. Always set by the invoker.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<u64>,
    /// Version of the command definition that produced this result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command_version: Option<String>,
    /// Trace id propagated from the invocation context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Free-form key/value extension data.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// CommandResult
// ---------------------------------------------------------------------------

/// The envelope returned by every AFD command, parametric over payload `T`.
///
/// Invariant: `success == true` iff `data` is present and `error` is absent;
/// `success == false` iff the reverse. Construct instances via [`success`],
/// [`success_with`], or [`error`] rather than the struct literal to keep the
/// invariant mechanically enforced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommandResult<T> {
    /// `true` when `data` is present, `false` when `error` is present.
    pub success: bool,
    /// Present iff `success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Present iff `!success`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
    /// Handler's confidence in the result, constrained to `[0, 1]` when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// Why this result was produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    /// Sources backing the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<Source>>,
    /// Multi-step plan, for long-running or staged operations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<PlanStep>>,
    /// Alternatives considered but not returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<Alternative<T>>>,
    /// Non-fatal issues surfaced alongside the result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<Warning>>,
    /// Suggested recovery actions, independent of any particular error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
    /// Name of a command that would undo this result's effect.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo_command: Option<String>,
    /// Arguments to pass to `undo_command`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub undo_args: Option<HashMap<String, serde_json::Value>>,
    /// Populated by the invoker; never set by handlers directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResultMetadata>,
}

/// Optional UX fields accepted by [`success_with`].
#[derive(Debug, Clone, Default)]
pub struct ResultOptions<T> {
    /// See [`CommandResult::confidence`].
    pub confidence: Option<f64>,
    /// See [`CommandResult::reasoning`].
    pub reasoning: Option<String>,
    /// See [`CommandResult::sources`].
    pub sources: Option<Vec<Source>>,
    /// See [`CommandResult::plan`].
    pub plan: Option<Vec<PlanStep>>,
    /// See [`CommandResult::alternatives`].
    pub alternatives: Option<Vec<Alternative<T>>>,
    /// See [`CommandResult::warnings`].
    pub warnings: Option<Vec<Warning>>,
    /// See [`CommandResult::suggestions`].
    pub suggestions: Option<Vec<String>>,
    /// See [`CommandResult::undo_command`].
    pub undo_command: Option<String>,
    /// See [`CommandResult::undo_args`].
    pub undo_args: Option<HashMap<String, serde_json::Value>>,
}

fn empty_envelope<T>() -> CommandResult<T> {
    CommandResult {
        success: false,
        data: None,
        error: None,
        confidence: None,
        reasoning: None,
        sources: None,
        plan: None,
        alternatives: None,
        warnings: None,
        suggestions: None,
        undo_command: None,
        undo_args: None,
        metadata: None,
    }
}

/// Build a successful envelope with no UX extras.
#[must_use]
pub fn success<T>(data: T) -> CommandResult<T> {
    CommandResult {
        success: true,
        data: Some(data),
        ..empty_envelope()
    }
}

/// Build a successful envelope with the given [`ResultOptions`].
///
/// `confidence`, if set, is clamped into `[0, 1]` so the invariant in §3 of
/// the design can never be violated by a careless handler.
#[must_use]
pub fn success_with<T>(data: T, opts: ResultOptions<T>) -> CommandResult<T> {
    CommandResult {
        success: true,
        data: Some(data),
        confidence: opts.confidence.map(|c| c.clamp(0.0, 1.0)),
        reasoning: opts.reasoning,
        sources: opts.sources,
        plan: opts.plan,
        alternatives: opts.alternatives,
        warnings: opts.warnings,
        suggestions: opts.suggestions,
        undo_command: opts.undo_command,
        undo_args: opts.undo_args,
        ..empty_envelope()
    }
}

/// Build a failed envelope from a [`CommandError`].
#[must_use]
pub fn error<T>(err: CommandError) -> CommandResult<T> {
    CommandResult {
        success: false,
        error: Some(err),
        ..empty_envelope()
    }
}

/// Build a failed envelope with warnings attached (e.g. partial diagnostic
/// context gathered before the failure was determined).
#[must_use]
pub fn error_with<T>(err: CommandError, warnings: Vec<Warning>) -> CommandResult<T> {
    CommandResult {
        success: false,
        error: Some(err),
        warnings: Some(warnings),
        ..empty_envelope()
    }
}

impl<T> CommandResult<T> {
    /// `true` when this is a well-formed success envelope.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.success && self.data.is_some() && self.error.is_none()
    }

    /// `true` when this is a well-formed failure envelope.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        !self.success && self.error.is_some() && self.data.is_none()
    }
}

// ---------------------------------------------------------------------------
// Batch helper
// ---------------------------------------------------------------------------

/// One item's failure within a [`batch_result`] call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchFailure<I> {
    /// Position of the item in the original input slice.
    pub index: usize,
    /// The input that failed.
    pub input: I,
    /// Why it failed.
    pub error: CommandError,
}

/// Counts for a [`BatchResult`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    /// Total items attempted.
    pub total: usize,
    /// Items that succeeded.
    pub success_count: usize,
    /// Items that failed.
    pub failure_count: usize,
}

/// Per-item outcomes of a batch operation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult<T, I> {
    /// Successful item outputs, in input order.
    pub succeeded: Vec<T>,
    /// Failed items with their index and error.
    pub failed: Vec<BatchFailure<I>>,
    /// Aggregate counts.
    pub summary: BatchSummary,
}

/// Run `f` over every item in `inputs`, collecting successes and failures.
///
/// Always returns `success: true`: batch operations never fail the overall
/// envelope just because some items did. A `PARTIAL_SUCCESS` warning is
/// attached when at least one item failed and at least one succeeded or when
/// all items failed.
#[must_use]
pub fn batch_result<T, I, F>(inputs: Vec<I>, mut f: F) -> CommandResult<BatchResult<T, I>>
where
    I: Clone,
    F: FnMut(usize, &I) -> Result<T, CommandError>,
{
    let total = inputs.len();
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();

    for (index, input) in inputs.iter().enumerate() {
        match f(index, input) {
            Ok(output) => succeeded.push(output),
            Err(err) => failed.push(BatchFailure {
                index,
                input: input.clone(),
                error: err,
            }),
        }
    }

    let summary = BatchSummary {
        total,
        success_count: succeeded.len(),
        failure_count: failed.len(),
    };

    let data = BatchResult {
        succeeded,
        failed,
        summary,
    };

    if data.summary.failure_count > 0 {
        let message = format!(
            "{} of {} items failed",
            data.summary.failure_count, data.summary.total
        );
        success_with(
            data,
            ResultOptions {
                warnings: Some(vec![Warning::new("PARTIAL_SUCCESS", message)]),
                ..Default::default()
            },
        )
    } else {
        success(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use afd_error::ErrorCode;

    #[test]
    fn success_sets_invariant_fields() {
        let r = success(42);
        assert!(r.is_success());
        assert!(!r.is_failure());
        assert_eq!(r.data, Some(42));
        assert!(r.error.is_none());
    }

    #[test]
    fn error_sets_invariant_fields() {
        let r: CommandResult<i32> = error(CommandError::not_found("x"));
        assert!(r.is_failure());
        assert!(!r.is_success());
        assert!(r.data.is_none());
    }

    #[test]
    fn success_with_clamps_confidence() {
        let r = success_with(
            "x",
            ResultOptions {
                confidence: Some(5.0),
                ..Default::default()
            },
        );
        assert_eq!(r.confidence, Some(1.0));

        let r2 = success_with(
            "x",
            ResultOptions {
                confidence: Some(-5.0),
                ..Default::default()
            },
        );
        assert_eq!(r2.confidence, Some(0.0));
    }

    #[test]
    fn json_omits_absent_optionals() {
        let r = success("hi".to_string());
        let json = serde_json::to_string(&r).unwrap();
        assert!(json.contains("\"success\":true"));
        assert!(!json.contains("\"error\""));
        assert!(!json.contains("\"confidence\""));
    }

    #[test]
    fn batch_all_success_has_no_warning() {
        let r = batch_result(vec![1, 2, 3], |_, x| Ok(x * 2));
        assert!(r.success);
        assert!(r.warnings.is_none());
        let data = r.data.unwrap();
        assert_eq!(data.succeeded, vec![2, 4, 6]);
        assert_eq!(data.summary.success_count, 3);
        assert_eq!(data.summary.failure_count, 0);
    }

    #[test]
    fn batch_partial_failure_still_succeeds() {
        let r = batch_result(vec![1, 0, 3], |_, x| {
            if *x == 0 {
                Err(CommandError::new(ErrorCode::ValidationError, "zero"))
            } else {
                Ok(*x)
            }
        });
        assert!(r.success, "batch results are always success:true");
        let warnings = r.warnings.unwrap();
        assert_eq!(warnings[0].code, "PARTIAL_SUCCESS");
        let data = r.data.unwrap();
        assert_eq!(data.summary.failure_count, 1);
        assert_eq!(data.failed[0].index, 1);
        assert_eq!(data.failed[0].input, 0);
    }

    #[test]
    fn batch_all_failures_still_returns_success_true() {
        let r: CommandResult<BatchResult<i32, i32>> =
            batch_result(vec![0, 0], |_, _| Err(CommandError::internal("boom")));
        assert!(r.success);
        assert_eq!(r.data.unwrap().summary.failure_count, 2);
    }

    #[test]
    fn warning_default_has_no_severity() {
        let w = Warning::new("CODE", "msg");
        assert!(w.severity.is_none());
    }
}
