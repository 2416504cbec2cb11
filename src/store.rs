use crate::ledger::Ledger;
use anyhow::Context;
use std::path::{Path, PathBuf};

pub const LEDGER_FILE: &str = "attendance.json";

pub fn ledger_path(workspace: &Path) -> PathBuf {
    workspace.join(LEDGER_FILE)
}

/// Open (creating if needed) a workspace directory and rehydrate its ledger.
/// A missing or unreadable document is not an error: the tracker starts over
/// with an empty ledger and today selected rather than refusing to load.
pub fn open_workspace(workspace: &Path) -> anyhow::Result<Ledger> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace.to_string_lossy()
        )
    })?;
    Ok(load_or_default(&ledger_path(workspace)))
}

fn load_or_default(path: &Path) -> Ledger {
    let Ok(text) = std::fs::read_to_string(path) else {
        return Ledger::default();
    };
    match serde_json::from_str::<Ledger>(&text) {
        Ok(mut ledger) => {
            ledger.normalize();
            ledger
        }
        Err(_) => Ledger::default(),
    }
}

/// Rewrite the whole document after a mutation. The write goes to a temp
/// sibling first and is renamed into place, so an interrupted save cannot
/// leave a truncated document behind.
pub fn save_ledger(workspace: &Path, ledger: &Ledger) -> anyhow::Result<()> {
    let path = ledger_path(workspace);
    let tmp = workspace.join(format!("{}.saving", LEDGER_FILE));
    let text =
        serde_json::to_string_pretty(ledger).context("failed to serialize ledger document")?;
    std::fs::write(&tmp, text)
        .with_context(|| format!("failed to write {}", tmp.to_string_lossy()))?;
    std::fs::rename(&tmp, &path)
        .with_context(|| format!("failed to move document to {}", path.to_string_lossy()))?;
    Ok(())
}
