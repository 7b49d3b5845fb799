//! # Ledger Ingest
//!
//! Loaders for CSV exports from a departmental accounting system, turning
//! semi-structured reports into normalized tables that downstream balance
//! sheet work can join and aggregate.
//!
//! ## Core Concepts
//!
//! - **Credit-balance ledger**: a report with a 13-line metadata header (the
//!   report date sits in line 5, field 2) followed by a per-department table
//! - **Classification table**: a flat lookup from account code to three
//!   levels of balance sheet category
//! - **Location table**: a flat lookup from department code to location
//! - **Encoding fallback**: exports arrive as UTF-8 (often with a BOM) or as
//!   cp932; each loader tries candidates in order
//! - **Ledger schema**: every department ledger is normalized to
//!   `[日付, 部門コード, 部門名, 勘定科目コード, 勘定科目名, 金額]`
//!
//! Loaders return [`Result`]; failures are logged through the `log` facade
//! at the point they occur, so callers that only need the table can use
//! `.ok()`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ledger_ingest::*;
//!
//! let ledger = load_credit_balance("与信残高表_202408.csv")?;
//! println!("{:?}: {} rows", ledger.report_date, ledger.len());
//!
//! let classes = load_classification("部門別BS対象科目.csv")?;
//! let index = classes.by_account_code();
//! for record in ledger.records() {
//!     if let Some(class) = index.get(&record.account_code) {
//!         println!("{} {} {:?}", record.department_name, class.classification_1, record.amount);
//!     }
//! }
//! ```

pub mod classification;
pub mod debug;
pub mod encoding;
pub mod error;
pub mod frame;
pub mod header;
pub mod ledger;
pub mod location;
pub mod payable_notes;
pub mod schema;
pub mod utils;

pub use classification::{load_classification, ClassificationLoader};
pub use debug::{CsvDumpSink, DebugSink, NullSink};
pub use encoding::{decode_first, read_header_window, TextEncoding};
pub use error::{IngestError, Result};
pub use frame::Frame;
pub use header::{parse_report_date, HeaderDate};
pub use ledger::{load_credit_balance, LedgerLoader};
pub use location::{load_location, LocationLoader};
pub use payable_notes::{load_payable_notes, PayableNotesLoader};
pub use schema::*;
pub use utils::{parse_amount, parse_date_token};
