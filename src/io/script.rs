//! Capture script loading
//!
//! A script is either a JSON array of actions or JSONL (one action per line,
//! blank lines skipped).

use crate::services::capture_loop::CaptureAction;
use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::info;

pub fn load_script<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<CaptureAction>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let actions =
        parse_script(&text).with_context(|| format!("Failed to parse script {}", path.display()))?;
    info!(file = %path.display(), actions = %actions.len(), "script_loaded");
    Ok(actions)
}

pub fn parse_script(text: &str) -> anyhow::Result<Vec<CaptureAction>> {
    if text.trim_start().starts_with('[') {
        return serde_json::from_str(text).context("Invalid action array");
    }

    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid action on line {}", i + 1))
        })
        .collect()
}
