use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Other,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Self {
        match lowercase_extension(path).as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" | "tif" | "tiff" | "svg" => {
                Self::Image
            }
            "mp4" | "mov" | "mkv" | "avi" | "webm" | "flv" | "wmv" | "m4v" | "mpeg" | "mpg"
            | "3gp" | "ts" => Self::Video,
            "mp3" | "wav" | "aac" | "flac" | "ogg" | "m4a" | "opus" | "wma" => Self::Audio,
            _ => Self::Other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputFileRecord {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub size: u64,
    pub created_at: String,
    pub created_unix_ms: i64,
}

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read output directory '{path}': {source}")]
    ReadDir { path: PathBuf, source: io::Error },
    #[error("file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read file '{path}': {source}")]
    ReadFile { path: PathBuf, source: io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInventory {
    output_dir: PathBuf,
}

impl OutputInventory {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_path()
    }

    /// Regular files in the output directory, newest first. A directory that
    /// does not exist yet is simply empty.
    pub fn list(&self) -> Result<Vec<OutputFileRecord>, InventoryError> {
        let read_dir_error = |source| InventoryError::ReadDir {
            path: self.output_dir.clone(),
            source,
        };
        let entries = match fs::read_dir(self.output_dir.as_path()) {
            Ok(entries) => entries,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(read_dir_error(error)),
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(read_dir_error)?;
            let meta = match entry.metadata() {
                Ok(meta) if meta.is_file() => meta,
                // Vanished between listing and stat, or not a regular file.
                _ => continue,
            };
            let path = entry.path();
            let created = meta
                .created()
                .or_else(|_| meta.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            let created: DateTime<Utc> = created.into();
            records.push(OutputFileRecord {
                name: entry.file_name().to_string_lossy().to_string(),
                path: path.to_string_lossy().to_string(),
                kind: MediaKind::from_path(path.as_path()),
                size: meta.len(),
                created_at: created.to_rfc3339(),
                created_unix_ms: created.timestamp_millis(),
            });
        }

        records.sort_by(|a, b| {
            b.created_unix_ms
                .cmp(&a.created_unix_ms)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(records)
    }
}

/// Reads the whole file into a `data:` URI. Meant for small preview
/// artifacts only.
pub fn read_as_data_uri(path: &Path) -> Result<String, InventoryError> {
    if !path.is_file() {
        return Err(InventoryError::NotFound(path.to_path_buf()));
    }
    let bytes = fs::read(path).map_err(|source| InventoryError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(format!(
        "data:{};base64,{}",
        mime_for_path(path),
        BASE64_STANDARD.encode(bytes.as_slice())
    ))
}

pub fn mime_for_path(path: &Path) -> &'static str {
    match lowercase_extension(path).as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "mkv" => "video/x-matroska",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "opus" => "audio/ogg",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        _ => "application/octet-stream",
    }
}

fn lowercase_extension(path: &Path) -> String {
    path.extension()
        .and_then(|v| v.to_str())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "ffmpeg_copilot_inventory_{label}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(dir.as_path());
        dir
    }

    #[test]
    fn classification_is_by_extension_case_insensitive() {
        assert_eq!(MediaKind::from_path(Path::new("a/b.PNG")), MediaKind::Image);
        assert_eq!(MediaKind::from_path(Path::new("clip.mkv")), MediaKind::Video);
        assert_eq!(MediaKind::from_path(Path::new("song.Flac")), MediaKind::Audio);
        assert_eq!(MediaKind::from_path(Path::new("notes.txt")), MediaKind::Other);
        assert_eq!(MediaKind::from_path(Path::new("clip1700000")), MediaKind::Other);
    }

    #[test]
    fn missing_directory_lists_empty() {
        let inventory = OutputInventory::new(temp_dir("missing"));
        assert!(inventory.list().expect("list").is_empty());
    }

    #[test]
    fn list_skips_directories_and_reports_sizes() {
        let dir = temp_dir("listing");
        fs::create_dir_all(dir.join("nested")).expect("mkdir");
        fs::write(dir.join("a.mp4"), b"12345").expect("write");
        fs::write(dir.join("b.wav"), b"12").expect("write");

        let records = OutputInventory::new(dir.clone()).list().expect("list");
        assert_eq!(records.len(), 2);
        let video = records
            .iter()
            .find(|r| r.name == "a.mp4")
            .expect("video listed");
        assert_eq!(video.kind, MediaKind::Video);
        assert_eq!(video.size, 5);
        assert_eq!(PathBuf::from(video.path.as_str()), dir.join("a.mp4"));
        assert!(records.windows(2).all(|w| w[0].created_unix_ms >= w[1].created_unix_ms));
    }

    #[test]
    fn png_data_uri_round_trips() {
        let dir = temp_dir("datauri");
        fs::create_dir_all(dir.as_path()).expect("mkdir");
        let bytes: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 255, 7];
        let path = dir.join("frame.png");
        fs::write(path.as_path(), bytes.as_slice()).expect("write");

        let uri = read_as_data_uri(path.as_path()).expect("read");
        let encoded = uri
            .strip_prefix("data:image/png;base64,")
            .expect("png prefix");
        let decoded = BASE64_STANDARD.decode(encoded).expect("valid base64");
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn unknown_extension_uses_octet_stream_and_missing_file_errors() {
        assert_eq!(mime_for_path(Path::new("x.bin")), "application/octet-stream");
        let err = read_as_data_uri(temp_dir("nofile").join("x.png").as_path())
            .expect_err("missing file");
        assert!(matches!(err, InventoryError::NotFound(_)));
    }
}
