/*!
 * File system helpers for the CLI.
 */

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;
use walkdir::WalkDir;

use crate::subtitle_processor::SubtitleFormat;

/// Collect subtitle files under a path.
///
/// A file path returns itself (when the extension is supported); a directory
/// is walked recursively. Results are sorted for deterministic processing
/// order.
pub fn find_subtitle_files<P: AsRef<Path>>(input: P) -> Result<Vec<PathBuf>> {
    let input = input.as_ref();

    if input.is_file() {
        return if SubtitleFormat::from_path(input).is_some() {
            Ok(vec![input.to_path_buf()])
        } else {
            Err(anyhow::anyhow!(
                "Unsupported subtitle format: {}",
                input.display()
            ))
        };
    }

    let mut files: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| SubtitleFormat::from_path(path).is_some())
        .collect();

    files.sort();
    debug!("Found {} subtitle files under {}", files.len(), input.display());
    Ok(files)
}

/// Write a file atomically: write to a temp file in the same directory,
/// then rename into place.
pub fn atomic_write<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
    let path = path.as_ref();
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    temp.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write output for {}", path.display()))?;
    temp.persist(path)
        .with_context(|| format!("Failed to persist output to {}", path.display()))?;
    Ok(())
}

/// Output path for a translated subtitle: `<stem>.<target>.<ext>` next to
/// the input, or under `output_dir` when given.
pub fn output_path(input: &Path, target_lang: &str, output_dir: Option<&Path>) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("subtitle");
    let ext = input
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("srt");
    let file_name = format!("{}.{}.{}", stem, target_lang, ext);

    match output_dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}
