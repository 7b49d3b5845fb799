use crate::encoding::UTF8_BOM;
use crate::error::Result;
use crate::frame::Frame;
use chrono::Local;
use log::{debug, info, warn};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Receives intermediate and final tables for inspection.
///
/// Sinks must not fail the load that feeds them.
pub trait DebugSink {
    fn dump(&self, frame: &Frame, name: &str);
}

impl<F> DebugSink for F
where
    F: Fn(&Frame, &str),
{
    fn dump(&self, frame: &Frame, name: &str) {
        self(frame, name)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DebugSink for NullSink {
    fn dump(&self, _frame: &Frame, _name: &str) {}
}

/// Writes each non-empty frame to `{dir}/{YYYYmmdd_HHMMSS}_{name}.csv`
/// as UTF-8 with a byte-order mark.
#[derive(Debug, Clone)]
pub struct CsvDumpSink {
    dir: PathBuf,
}

impl CsvDumpSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, frame: &Frame, name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = self.dir.join(format!("{}_{}.csv", timestamp, name));

        let mut file = File::create(&path)?;
        file.write_all(UTF8_BOM)?;
        file.write_all(frame.to_csv_string()?.as_bytes())?;
        Ok(path)
    }
}

impl DebugSink for CsvDumpSink {
    fn dump(&self, frame: &Frame, name: &str) {
        if frame.is_empty() {
            debug!("Skipping debug dump of empty table '{}'", name);
            return;
        }
        match self.write(frame, name) {
            Ok(path) => info!("Saved table '{}' to {}", name, path.display()),
            Err(e) => warn!("Failed to save table '{}': {}", name, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn frame() -> Frame {
        Frame::new(
            vec!["部門コード".to_string(), "金額".to_string()],
            vec![vec!["0101".to_string(), "100".to_string()]],
        )
    }

    #[test]
    fn test_csv_dump_writes_bom_prefixed_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvDumpSink::new(dir.path().join("dbug"));

        let path = sink.write(&frame(), "ledger").unwrap();
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .ends_with("_ledger.csv"));

        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        assert_eq!(text, "部門コード,金額\n0101,100\n");
    }

    #[test]
    fn test_csv_dump_skips_empty_frames() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("dbug");
        let sink = CsvDumpSink::new(&target);

        sink.dump(&Frame::default(), "empty");
        assert!(!target.exists());
    }

    #[test]
    fn test_closure_sink() {
        let seen = RefCell::new(Vec::new());
        let sink = |frame: &Frame, name: &str| {
            seen.borrow_mut().push((name.to_string(), frame.len()));
        };

        sink.dump(&frame(), "result");
        NullSink.dump(&frame(), "ignored");
        assert_eq!(seen.into_inner(), vec![("result".to_string(), 1)]);
    }
}
