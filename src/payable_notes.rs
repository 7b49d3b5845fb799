use crate::debug::{DebugSink, NullSink};
use crate::encoding::{decode_or_error, read_file_bytes};
use crate::error::{IngestError, Result};
use crate::frame::Frame;
use crate::ledger::normalize_department_ledger;
use crate::schema::{LedgerTable, PayableNotesLayout};
use log::{error, info, warn};
use std::path::Path;

/// Loads the payable-notes export into the ledger schema.
///
/// The export has no metadata header and carries no report date. Source
/// columns are optional individually: absent ones are left out of the
/// result, and only a file with none of them is rejected.
pub struct PayableNotesLoader {
    layout: PayableNotesLayout,
    sink: Box<dyn DebugSink>,
}

impl Default for PayableNotesLoader {
    fn default() -> Self {
        Self::new(PayableNotesLayout::default())
    }
}

impl PayableNotesLoader {
    pub fn new(layout: PayableNotesLayout) -> Self {
        Self {
            layout,
            sink: Box::new(NullSink),
        }
    }

    pub fn with_debug_sink(mut self, sink: impl DebugSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn load(&self, path: impl AsRef<Path>) -> Result<LedgerTable> {
        let path = path.as_ref();
        self.load_inner(path).map_err(|e| {
            error!("Failed to load payable notes {}: {}", path.display(), e);
            e
        })
    }

    fn load_inner(&self, path: &Path) -> Result<LedgerTable> {
        self.layout.validate()?;
        let columns = &self.layout.source_columns;

        let bytes = read_file_bytes(path)?;
        let (text, encoding) = decode_or_error(path, &bytes, &self.layout.encodings)?;
        let body = Frame::from_csv_str(&text)?;

        let required = columns.as_list();
        let missing = body.missing_columns(&required);
        if missing.len() == required.len() {
            return Err(IngestError::MissingColumns {
                path: path.to_path_buf(),
                missing,
            });
        }
        if !missing.is_empty() {
            warn!(
                "Columns {:?} not found in {}; continuing with the rest",
                missing,
                path.display()
            );
        }

        let frame = normalize_department_ledger(&body, columns, &self.layout.account, None);
        info!(
            "Normalized {} payable-note rows from {} ({})",
            frame.len(),
            path.display(),
            encoding
        );
        self.sink.dump(&frame, "payable_notes_result");

        Ok(LedgerTable {
            frame,
            report_date: None,
            raw_report_date: None,
            encoding,
        })
    }
}

pub fn load_payable_notes(path: impl AsRef<Path>) -> Result<LedgerTable> {
    PayableNotesLoader::default().load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::TextEncoding;
    use crate::schema::{COL_AMOUNT, COL_DATE, COL_DEPARTMENT_NAME, LEDGER_COLUMNS};
    use encoding_rs::SHIFT_JIS;
    use std::io::Write;

    fn write_file(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file
    }

    #[test]
    fn test_full_columns() {
        let csv = "\u{FEFF}依頼部門コード,依頼部門名,支払先,手形金額\n0301,名古屋支店,C社,8000\n";
        let file = write_file(csv.as_bytes());

        let table = load_payable_notes(file.path()).unwrap();
        assert_eq!(table.frame.columns(), &LEDGER_COLUMNS);
        assert_eq!(table.report_date, None);
        let records = table.records();
        assert_eq!(records[0].account_code, "BS2003");
        assert_eq!(records[0].account_name, "★支払手形");
        assert_eq!(records[0].amount, Some(8000.0));
        assert_eq!(table.frame.get(0, COL_DATE), Some(""));
    }

    #[test]
    fn test_partial_columns_are_kept() {
        let csv = "依頼部門名,手形金額\n名古屋支店,8000\n";
        let file = write_file(csv.as_bytes());

        let table = load_payable_notes(file.path()).unwrap();
        assert_eq!(
            table.frame.columns(),
            &["日付", "部門名", "勘定科目コード", "勘定科目名", "金額"]
        );
        assert_eq!(table.frame.get(0, COL_DEPARTMENT_NAME), Some("名古屋支店"));
        assert_eq!(table.frame.get(0, COL_AMOUNT), Some("8000"));
    }

    #[test]
    fn test_blank_department_codes_are_dropped() {
        let csv = "依頼部門コード,依頼部門名,手形金額\n0301,名古屋支店,8000\n ,小計,8000\n";
        let file = write_file(csv.as_bytes());

        let table = load_payable_notes(file.path()).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.records().iter().all(|r| !r.department_code.is_empty()));
    }

    #[test]
    fn test_no_known_columns() {
        let file = write_file("a,b\n1,2\n".as_bytes());
        let result = load_payable_notes(file.path());
        assert!(matches!(
            result,
            Err(IngestError::MissingColumns { missing, .. }) if missing.len() == 3
        ));
    }

    #[test]
    fn test_cp932_fallback() {
        let (bytes, _, _) = SHIFT_JIS.encode("依頼部門コード,依頼部門名,手形金額\n0301,名古屋支店,8000\n");
        let file = write_file(&bytes);

        let table = load_payable_notes(file.path()).unwrap();
        assert_eq!(table.encoding, TextEncoding::Cp932);
        assert_eq!(table.len(), 1);
    }
}
