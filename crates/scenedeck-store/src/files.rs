//! JSON file helpers.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::Result;

/// Read and parse a JSON file. Returns `None` if the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let data = match std::fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&data)?))
}

/// Write a value as pretty-printed JSON, creating parent directories.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Write `value` only if `path` does not exist yet.
pub fn write_json_if_missing<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    write_json(path, value)?;
    tracing::info!(path = %path.display(), "created data file");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let value: Option<Vec<u32>> = read_json(&dir.path().join("none.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("v.json");
        write_json(&path, &vec![1, 2, 3]).unwrap();
        let back: Option<Vec<u32>> = read_json(&path).unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
        // pretty printed with two-space indentation
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  1"));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "[1,").unwrap();
        assert_matches!(
            read_json::<Vec<u32>>(&path),
            Err(crate::errors::StoreError::Json(_))
        );
    }

    #[test]
    fn write_if_missing_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("v.json");
        assert!(write_json_if_missing(&path, &vec![1]).unwrap());
        assert!(!write_json_if_missing(&path, &vec![2]).unwrap());
        let back: Option<Vec<u32>> = read_json(&path).unwrap();
        assert_eq!(back, Some(vec![1]));
    }
}
