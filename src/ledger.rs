use crate::debug::{DebugSink, NullSink};
use crate::encoding::{decode_or_error, read_file_bytes, read_header_window, TextEncoding};
use crate::error::{IngestError, Result};
use crate::frame::Frame;
use crate::header::parse_report_date;
use crate::schema::{
    AccountTag, LedgerLayout, LedgerTable, SourceColumns, COL_ACCOUNT_CODE, COL_ACCOUNT_NAME,
    COL_DATE, DATE_FORMAT, LEDGER_COLUMNS,
};
use crate::utils::skip_lines;
use chrono::NaiveDate;
use log::{debug, error, info, warn};
use std::path::Path;

/// Loads the credit-balance ledger export: a metadata header carrying the
/// report date, followed by a per-department table.
pub struct LedgerLoader {
    layout: LedgerLayout,
    sink: Box<dyn DebugSink>,
}

impl Default for LedgerLoader {
    fn default() -> Self {
        Self::new(LedgerLayout::default())
    }
}

impl LedgerLoader {
    pub fn new(layout: LedgerLayout) -> Self {
        Self {
            layout,
            sink: Box::new(NullSink),
        }
    }

    pub fn with_debug_sink(mut self, sink: impl DebugSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn layout(&self) -> &LedgerLayout {
        &self.layout
    }

    /// Runs the full load. Every failure is logged here before it is
    /// returned; an unreadable report date is not a failure.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<LedgerTable> {
        let path = path.as_ref();
        self.load_inner(path).map_err(|e| {
            error!("Failed to load credit-balance ledger {}: {}", path.display(), e);
            e
        })
    }

    fn load_inner(&self, path: &Path) -> Result<LedgerTable> {
        self.layout.validate()?;
        let layout = &self.layout;

        let (header, header_encoding) =
            read_header_window(path, layout.header_lines, &layout.encodings)?;

        // The header window can decode under an encoding the body rejects
        // (an ASCII header over a cp932 body), so the body gets the full
        // candidate list with the header's winner first.
        let candidates: Vec<TextEncoding> = std::iter::once(header_encoding)
            .chain(
                layout
                    .encodings
                    .iter()
                    .copied()
                    .filter(|e| *e != header_encoding),
            )
            .collect();
        let bytes = read_file_bytes(path)?;
        let (text, encoding) = decode_or_error(path, &bytes, &candidates)?;

        let header_date = if encoding == header_encoding {
            parse_report_date(&header, layout)
        } else {
            warn!(
                "{} header decodes as {} but the body needs {}; re-reading the header",
                path.display(),
                header_encoding,
                encoding
            );
            let header: Vec<String> = text
                .lines()
                .take(layout.header_lines)
                .map(str::to_string)
                .collect();
            parse_report_date(&header, layout)
        };

        let body = Frame::from_csv_str(skip_lines(&text, layout.header_lines))?;
        if body.columns().is_empty() {
            return Err(IngestError::EmptyBody(path.to_path_buf()));
        }
        debug!(
            "Loaded {} body rows with columns {:?}",
            body.len(),
            body.columns()
        );

        let missing = body.missing_columns(&layout.source_columns.as_list());
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns {
                path: path.to_path_buf(),
                missing,
            });
        }

        let frame = normalize_department_ledger(
            &body,
            &layout.source_columns,
            &layout.account,
            header_date.date,
        );
        info!(
            "Normalized {} department rows from {} ({})",
            frame.len(),
            path.display(),
            encoding
        );
        self.sink.dump(&frame, "credit_balance_result");

        Ok(LedgerTable {
            frame,
            report_date: header_date.date,
            raw_report_date: header_date.raw,
            encoding,
        })
    }
}

/// Maps a department table onto the ledger schema.
///
/// Source columns absent from `body` are skipped rather than rejected;
/// callers that require them check beforehand.
pub(crate) fn normalize_department_ledger(
    body: &Frame,
    columns: &SourceColumns,
    account: &AccountTag,
    date: Option<NaiveDate>,
) -> Frame {
    let mut frame = body.select(&columns.as_list());

    let dropped = frame.retain_non_blank(&columns.department_code);
    if dropped > 0 {
        debug!("Dropped {} rows without a department code", dropped);
    }

    for (from, to) in columns.rename_pairs() {
        frame.rename(from, to);
    }

    let date_cell = date
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default();
    frame.with_constant(COL_DATE, &date_cell);
    frame.with_constant(COL_ACCOUNT_CODE, &account.code);
    frame.with_constant(COL_ACCOUNT_NAME, &account.name);

    frame.select(&LEDGER_COLUMNS)
}

pub fn load_credit_balance(path: impl AsRef<Path>) -> Result<LedgerTable> {
    LedgerLoader::default().load(path)
}
