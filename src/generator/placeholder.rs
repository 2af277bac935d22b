use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const FALLBACK_STEM: &str = "output";

/// File name without directories or extension, split on both `/` and `\`
/// so Windows paths behave the same on every host. Everything after the
/// first `.` is dropped.
pub fn input_stem(file: &str) -> String {
    let base = file.rsplit(['/', '\\']).next().unwrap_or(file);
    let stem = base.split('.').next().unwrap_or(base).trim();
    if stem.is_empty() {
        String::from(FALLBACK_STEM)
    } else {
        stem.to_string()
    }
}

/// One candidate output path per input, `<stem><stamp_ms>` for a single file
/// and `<stem><stamp_ms>_<n>` (1-based) when several are given, so inputs
/// sharing a basename never collide.
pub fn placeholder_output_paths(output_dir: &Path, files: &[String], stamp_ms: i64) -> Vec<PathBuf> {
    let multiple = files.len() > 1;
    files
        .iter()
        .enumerate()
        .map(|(idx, file)| {
            let stem = input_stem(file.as_str());
            let name = if multiple {
                format!("{stem}{stamp_ms}_{}", idx + 1)
            } else {
                format!("{stem}{stamp_ms}")
            };
            output_dir.join(name)
        })
        .collect()
}

pub fn ensure_output_dir(output_dir: &Path) -> io::Result<()> {
    if output_dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(output_dir)
}

pub fn display_path(path: &Path) -> String {
    path.to_string_lossy().to_string()
}
