//! Loading and saving proof files.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

/// Line terminator written to disk.
#[cfg(windows)]
pub const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_ENDING: &str = "\n";

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("Failed to open file {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to read file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write to {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to open file {} ({size} bytes, limit is {capacity})", path.display())]
    TooLarge {
        path: PathBuf,
        size: u64,
        capacity: usize,
    },
    #[error("Failed to open file {} (not valid UTF-8)", path.display())]
    NotUtf8 { path: PathBuf },
}

/// Read `path` into a string of at most `capacity` bytes.
///
/// Line endings are normalized to `\n`.
pub fn load(path: &Path, capacity: usize) -> Result<String, FileError> {
    let metadata = fs::metadata(path).map_err(|source| FileError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    if metadata.len() > capacity as u64 {
        return Err(FileError::TooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            capacity,
        });
    }

    let bytes = fs::read(path).map_err(|source| FileError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    // The file may have grown between the metadata call and the read.
    if bytes.len() > capacity {
        return Err(FileError::TooLarge {
            path: path.to_path_buf(),
            size: bytes.len() as u64,
            capacity,
        });
    }
    let text = String::from_utf8(bytes).map_err(|_| FileError::NotUtf8 {
        path: path.to_path_buf(),
    })?;

    Ok(if text.contains("\r\n") {
        text.replace("\r\n", "\n")
    } else {
        text
    })
}

/// Write `text` to `path`, terminated by exactly one trailing newline if it
/// lacks one, using the host line ending.
pub fn save(path: &Path, text: &str) -> Result<(), FileError> {
    let contents = to_disk_format(text);
    let write_err = |source: io::Error| FileError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut file = fs::File::create(path).map_err(write_err)?;
    file.write_all(contents.as_bytes()).map_err(write_err)?;
    file.flush().map_err(write_err)?;
    Ok(())
}

/// Apply trailing-newline and line-ending normalization.
pub fn to_disk_format(text: &str) -> String {
    let mut out = if LINE_ENDING == "\n" {
        text.to_string()
    } else {
        text.replace("\r\n", "\n").replace('\n', LINE_ENDING)
    };
    if !out.ends_with('\n') {
        out.push_str(LINE_ENDING);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_appends_single_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proof.ndp");

        save(&path, "p -> q").unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.ends_with(LINE_ENDING));
        assert!(!written.ends_with(&format!("{LINE_ENDING}{LINE_ENDING}")));

        save(&path, "p -> q\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), written);
    }

    #[test]
    fn save_empty_buffer_writes_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.ndp");
        save(&path, "").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), LINE_ENDING);
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope").join("proof.ndp");
        let err = save(&path, "x").unwrap_err();
        assert!(matches!(err, FileError::Write { .. }));
        assert!(err.to_string().starts_with("Failed to write to "));
    }

    #[test]
    fn load_round_trips_saved_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("proof.ndp");
        save(&path, "a\nb").unwrap();
        assert_eq!(load(&path, 1024).unwrap(), "a\nb\n");
    }

    #[test]
    fn load_normalizes_crlf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dos.ndp");
        fs::write(&path, "a\r\nb\r\n").unwrap();
        assert_eq!(load(&path, 1024).unwrap(), "a\nb\n");
    }

    #[test]
    fn load_rejects_oversized_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("big.ndp");
        fs::write(&path, "x".repeat(17)).unwrap();
        let err = load(&path, 16).unwrap_err();
        assert!(matches!(err, FileError::TooLarge { size: 17, capacity: 16, .. }));
        assert_eq!(load(&path, 17).unwrap().len(), 17);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        let err = load(&dir.path().join("missing.ndp"), 16).unwrap_err();
        assert!(matches!(err, FileError::Open { .. }));
        assert!(err.to_string().starts_with("Failed to open file "));
    }

    #[test]
    fn load_rejects_invalid_utf8() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bin.ndp");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();
        assert!(matches!(
            load(&path, 16).unwrap_err(),
            FileError::NotUtf8 { .. }
        ));
    }

    #[test]
    fn load_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.ndp");
        fs::write(&path, "").unwrap();
        assert_eq!(load(&path, 16).unwrap(), "");
    }
}
