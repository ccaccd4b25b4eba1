// SPDX-License-Identifier: MIT OR Apache-2.0
//! Persisted `connect` state: which remote MCP server (if any) the CLI
//! should talk to instead of its own in-process registry.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Remote server the CLI was last told to `connect` to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Base URL of the MCP server, e.g. `http://localhost:3100`.
    pub url: String,
    /// Session id handed back by the server's `/sse` endpoint.
    pub session_id: String,
}

fn session_path() -> PathBuf {
    PathBuf::from(".afd").join("session.json")
}

/// Persist a session so later CLI invocations in the same directory reuse
/// it without another `connect`.
pub fn save(session: &Session) -> anyhow::Result<()> {
    save_at(&session_path(), session)
}

fn save_at(path: &Path, session: &Session) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(session)?)?;
    Ok(())
}

/// Load the last-saved session, if any. Absence is not an error — it just
/// means the CLI should fall back to its in-process registry.
#[must_use]
pub fn load() -> Option<Session> {
    load_at(&session_path())
}

fn load_at(path: &Path) -> Option<Session> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

/// Forget the persisted session, returning the CLI to in-process mode.
pub fn clear() -> anyhow::Result<()> {
    let path = session_path();
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
