use serde_json::json;

use super::error::err;
use super::types::{AppState, Request};
use crate::store;

/// Pulls a required string param, or builds the `bad_params` response.
pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("missing required string param: {}", key),
                None,
            )
        })
}

pub fn required_bool(req: &Request, key: &str) -> Result<bool, serde_json::Value> {
    req.params.get(key).and_then(|v| v.as_bool()).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            format!("missing required bool param: {}", key),
            None,
        )
    })
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

pub fn required_str_array(req: &Request, key: &str) -> Result<Vec<String>, serde_json::Value> {
    let items = req
        .params
        .get(key)
        .and_then(|v| v.as_array())
        .ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("missing required array param: {}", key),
                None,
            )
        })?;
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item.as_str() {
            Some(s) => out.push(s.to_string()),
            None => {
                return Err(err(
                    &req.id,
                    "bad_params",
                    format!("{} must contain only strings", key),
                    None,
                ))
            }
        }
    }
    Ok(out)
}

/// Writes the in-memory ledger back to the workspace document. Mutating
/// handlers call this after the ledger change; a `Some` return is the
/// ready-to-send `io_failed` response.
pub fn persist(state: &AppState, id: &str) -> Option<serde_json::Value> {
    let (Some(workspace), Some(ledger)) = (state.workspace.as_ref(), state.ledger.as_ref()) else {
        return None;
    };
    match store::save_ledger(workspace, ledger) {
        Ok(()) => None,
        Err(e) => Some(err(
            id,
            "io_failed",
            format!("failed to persist ledger: {:#}", e),
            Some(json!({
                "path": store::ledger_path(workspace).to_string_lossy(),
            })),
        )),
    }
}
