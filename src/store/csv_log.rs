//! CSV log primitives: read, append and atomic rewrite.

use super::StoreError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// All rows of a log. A missing or empty file yields no rows.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !has_content(path)? {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| StoreError::csv(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| StoreError::csv(path, e))
}

/// Last row of a log, if any.
pub fn last_row<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    Ok(read_rows(path)?.pop())
}

/// Append rows, writing the header only when the file is new or empty.
pub fn append_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StoreError> {
    if rows.is_empty() {
        return Ok(());
    }
    let write_header = !has_content(path)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::io(path, e))?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(write_header)
        .from_writer(file);
    for row in rows {
        writer.serialize(row).map_err(|e| StoreError::csv(path, e))?;
    }
    writer.flush().map_err(|e| StoreError::io(path, e))
}

/// Replace the whole log atomically: write a sibling temp file, sync it, rename over.
pub fn rewrite_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StoreError> {
    let temp_path = temp_sibling(path);
    {
        let file = File::create(&temp_path).map_err(|e| StoreError::io(&temp_path, e))?;
        let mut writer = csv::Writer::from_writer(file);
        for row in rows {
            writer
                .serialize(row)
                .map_err(|e| StoreError::csv(&temp_path, e))?;
        }
        let mut file = writer
            .into_inner()
            .map_err(|e| StoreError::io(&temp_path, e.into_error()))?;
        file.flush().map_err(|e| StoreError::io(&temp_path, e))?;
        file.sync_all().map_err(|e| StoreError::io(&temp_path, e))?;
    }
    fs::rename(&temp_path, path).map_err(|e| StoreError::io(path, e))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn has_content(path: &Path) -> Result<bool, StoreError> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len() > 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StoreError::io(path, e)),
    }
}
