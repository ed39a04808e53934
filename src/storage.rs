use std::env;
use std::fmt::{Display, Formatter};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::domain::{Sheet, SheetHeader};

const ENTRIES_MARKER: &str = "\n=== ENTRIES ===\n";
const RECENT_SHEETS_FILE: &str = "recent_sheets.txt";
const MAX_RECENT_SHEETS: usize = 50;
const DEFAULT_OWNER: &str = "local";

#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    TomlDecode(toml::de::Error),
    TomlEncode(toml::ser::Error),
    JsonDecode(serde_json::Error),
    JsonEncode(serde_json::Error),
    NoSheetSelected,
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(err) => write!(f, "io error: {err}"),
            StorageError::TomlDecode(err) => write!(f, "failed to parse TOML header: {err}"),
            StorageError::TomlEncode(err) => write!(f, "failed to encode TOML header: {err}"),
            StorageError::JsonDecode(err) => write!(f, "failed to parse JSONL entry: {err}"),
            StorageError::JsonEncode(err) => write!(f, "failed to encode JSONL entry: {err}"),
            StorageError::NoSheetSelected => write!(
                f,
                "no sheet selected: pass --sheet <path>, set WEEKLOG_SHEET, or pick one from `sheets`"
            ),
        }
    }
}

impl std::error::Error for StorageError {}

pub fn load_sheet(path: &Path) -> Result<Sheet, StorageError> {
    let raw = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Sheet::new(DEFAULT_OWNER)),
        Err(err) => return Err(StorageError::Io(err)),
    };

    if raw.trim().is_empty() {
        return Ok(Sheet::new(DEFAULT_OWNER));
    }

    let (header_blob, entries_blob) = match raw.split_once(ENTRIES_MARKER) {
        Some((header, entries)) => (header, entries),
        None => (raw.as_str(), ""),
    };

    let header: SheetHeader = toml::from_str(header_blob).map_err(StorageError::TomlDecode)?;
    let mut entries = Vec::new();
    for line in entries_blob.lines() {
        if line.trim().is_empty() {
            continue;
        }
        entries.push(serde_json::from_str(line).map_err(StorageError::JsonDecode)?);
    }

    Ok(Sheet { header, entries })
}

pub fn save_sheet(path: &Path, sheet: &Sheet) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(StorageError::Io)?;
        }
    }

    let header = toml::to_string_pretty(&sheet.header).map_err(StorageError::TomlEncode)?;
    let mut file = fs::File::create(path).map_err(StorageError::Io)?;
    file.write_all(header.as_bytes()).map_err(StorageError::Io)?;
    file.write_all(ENTRIES_MARKER.as_bytes())
        .map_err(StorageError::Io)?;

    for entry in &sheet.entries {
        let line = serde_json::to_string(entry).map_err(StorageError::JsonEncode)?;
        file.write_all(line.as_bytes()).map_err(StorageError::Io)?;
        file.write_all(b"\n").map_err(StorageError::Io)?;
    }

    Ok(())
}

pub fn resolve_sheet_path(cli_path: Option<PathBuf>) -> Result<PathBuf, StorageError> {
    if let Some(path) = cli_path {
        return Ok(absolutize(path));
    }

    if let Some(path) = env::var_os("WEEKLOG_SHEET") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return Ok(absolutize(path));
        }
    }

    if let Ok(mut recent) = recent_sheets(MAX_RECENT_SHEETS) {
        if let Some(path) = recent.drain(..).next() {
            return Ok(path);
        }
    }

    Err(StorageError::NoSheetSelected)
}

pub fn remember_sheet(path: &Path) -> Result<(), std::io::Error> {
    let path = absolutize(path.to_path_buf());
    let mut entries = recent_sheets(MAX_RECENT_SHEETS)?;
    entries.retain(|entry| entry != &path);
    entries.insert(0, path);
    entries.truncate(MAX_RECENT_SHEETS);

    let state_dir = state_dir();
    fs::create_dir_all(&state_dir)?;
    let mut file = fs::File::create(state_dir.join(RECENT_SHEETS_FILE))?;
    for entry in &entries {
        writeln!(file, "{}", entry.display())?;
    }

    Ok(())
}

pub fn recent_sheets(limit: usize) -> Result<Vec<PathBuf>, std::io::Error> {
    let raw = match fs::read_to_string(state_dir().join(RECENT_SHEETS_FILE)) {
        Ok(raw) => raw,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .take(limit)
        .map(PathBuf::from)
        .collect())
}

fn state_dir() -> PathBuf {
    if let Some(path) = env::var_os("WEEKLOG_STATE_DIR") {
        return PathBuf::from(path);
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(path) = env::var_os("LOCALAPPDATA") {
            return PathBuf::from(path).join("weeklog");
        }
    }

    if let Some(path) = env::var_os("XDG_STATE_HOME") {
        return PathBuf::from(path).join("weeklog");
    }

    if let Some(path) = env::var_os("HOME") {
        return PathBuf::from(path)
            .join(".local")
            .join("state")
            .join("weeklog");
    }

    PathBuf::from(".weeklog")
}

fn absolutize(path: PathBuf) -> PathBuf {
    let path = if path.is_absolute() {
        path
    } else if let Ok(cwd) = env::current_dir() {
        cwd.join(path)
    } else {
        path
    };

    if path.exists() {
        fs::canonicalize(&path).unwrap_or(path)
    } else {
        path
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use chrono::{Duration, TimeZone, Utc};

    use crate::domain::{Sheet, normalize_tags};

    use super::{load_sheet, save_sheet};

    #[test]
    fn round_trips_header_and_entries() {
        let mut sheet = Sheet::new("ada");
        sheet.header.week_start = "sunday".to_string();
        sheet.header.utc_offset_minutes = Some(120);

        let start = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let id = sheet
            .start_entry(
                "Write spec".to_string(),
                normalize_tags(["work", "deep"]),
                start,
            )
            .expect("start should work");
        sheet
            .stop_entry(start + Duration::hours(1))
            .expect("stop should work");
        sheet
            .start_entry("Review".to_string(), normalize_tags(["work"]), start + Duration::hours(2))
            .expect("second start should work");

        let path = temp_file("weeklog_storage_roundtrip.sheet");
        save_sheet(&path, &sheet).expect("save should succeed");
        let loaded = load_sheet(&path).expect("load should succeed");

        assert_eq!(loaded.header.owner, "ada");
        assert_eq!(loaded.header.week_start, "sunday");
        assert_eq!(loaded.header.utc_offset_minutes, Some(120));
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.entries[0].id, id);
        assert_eq!(
            loaded.entries[0].tags,
            normalize_tags(["deep", "work"])
        );
        assert!(loaded.open_entry().is_some());
        let _ = fs::remove_file(path);
    }

    #[test]
    fn missing_file_loads_a_fresh_sheet() {
        let path = temp_file("weeklog_storage_missing.sheet");
        let _ = fs::remove_file(&path);
        let sheet = load_sheet(&path).expect("load should succeed");
        assert!(sheet.entries.is_empty());
    }

    fn temp_file(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("{}_{}", name, std::process::id()));
        path
    }
}
