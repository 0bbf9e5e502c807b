use anyhow::{bail, Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};

/// Where exports land when the preferences don't name a directory.
pub fn default_export_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join("claude_exports"))
}

/// Copy a transcript file into `export_dir` under a timestamped name
/// (`YYYYmmdd_HHMMSS_<original>`), creating the directory if needed.
/// Returns the destination path.
pub fn export_transcript(transcript_path: &str, export_dir: &Path) -> Result<PathBuf> {
    if transcript_path.is_empty() {
        bail!("no transcript path provided");
    }
    let source = Path::new(transcript_path);
    if !source.exists() {
        bail!("transcript file does not exist: {transcript_path}");
    }

    fs::create_dir_all(export_dir)
        .with_context(|| format!("creating export directory {}", export_dir.display()))?;

    let original = source
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("transcript.jsonl");
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let dest = export_dir.join(format!("{stamp}_{original}"));

    fs::copy(source, &dest)
        .with_context(|| format!("copying transcript to {}", dest.display()))?;
    Ok(dest)
}
