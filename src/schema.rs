use crate::encoding::TextEncoding;
use crate::error::{IngestError, Result};
use crate::frame::Frame;
use crate::utils::parse_amount;
use chrono::NaiveDate;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const COL_DATE: &str = "日付";
pub const COL_DEPARTMENT_CODE: &str = "部門コード";
pub const COL_DEPARTMENT_NAME: &str = "部門名";
pub const COL_ACCOUNT_CODE: &str = "勘定科目コード";
pub const COL_ACCOUNT_NAME: &str = "勘定科目名";
pub const COL_AMOUNT: &str = "金額";

/// Column order of every normalized ledger table.
pub const LEDGER_COLUMNS: [&str; 6] = [
    COL_DATE,
    COL_DEPARTMENT_CODE,
    COL_DEPARTMENT_NAME,
    COL_ACCOUNT_CODE,
    COL_ACCOUNT_NAME,
    COL_AMOUNT,
];

pub const COL_CLASSIFICATION_1: &str = "分類1";
pub const COL_CLASSIFICATION_2: &str = "分類2";
pub const COL_CLASSIFICATION_3: &str = "分類3";

pub const COL_LOCATION: &str = "場所";

pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn default_encodings() -> Vec<TextEncoding> {
    TextEncoding::DEFAULT_ORDER.to_vec()
}

/// Source-to-canonical column names for a department ledger export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceColumns {
    pub department_code: String,
    pub department_name: String,
    pub amount: String,
}

impl SourceColumns {
    pub fn as_list(&self) -> [&str; 3] {
        [&self.department_code, &self.department_name, &self.amount]
    }

    pub fn rename_pairs(&self) -> [(&str, &'static str); 3] {
        [
            (&self.department_code, COL_DEPARTMENT_CODE),
            (&self.department_name, COL_DEPARTMENT_NAME),
            (&self.amount, COL_AMOUNT),
        ]
    }
}

/// Fixed account tag stamped onto every row of a single-account export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountTag {
    pub code: String,
    pub name: String,
}

/// File contract for the credit-balance ledger export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerLayout {
    /// Metadata lines preceding the tabular body.
    pub header_lines: usize,
    /// Zero-based header line holding the report date.
    pub date_line: usize,
    /// Zero-based comma-separated field of `date_line` holding the date.
    pub date_field: usize,
    pub source_columns: SourceColumns,
    pub account: AccountTag,
    pub encodings: Vec<TextEncoding>,
}

impl Default for LedgerLayout {
    fn default() -> Self {
        Self {
            header_lines: 13,
            date_line: 4,
            date_field: 1,
            source_columns: SourceColumns {
                department_code: "計上部門コード".to_string(),
                department_name: "計上部門名".to_string(),
                amount: "受取手形".to_string(),
            },
            account: AccountTag {
                code: "BS1013".to_string(),
                name: "★受取手形".to_string(),
            },
            encodings: default_encodings(),
        }
    }
}

impl LedgerLayout {
    pub fn from_json(json: &str) -> Result<Self> {
        let layout: Self = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    /// A `date_line` beyond `header_lines` is allowed; such a layout simply
    /// never finds a report date.
    pub fn validate(&self) -> Result<()> {
        validate_encodings(&self.encodings)?;
        validate_column_names(&self.source_columns.as_list())
    }
}

/// File contract for the account classification lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationLayout {
    pub account_code: String,
    pub classifications: [String; 3],
    pub encodings: Vec<TextEncoding>,
}

impl Default for ClassificationLayout {
    fn default() -> Self {
        Self {
            account_code: COL_ACCOUNT_CODE.to_string(),
            classifications: [
                COL_CLASSIFICATION_1.to_string(),
                COL_CLASSIFICATION_2.to_string(),
                COL_CLASSIFICATION_3.to_string(),
            ],
            encodings: default_encodings(),
        }
    }
}

impl ClassificationLayout {
    pub fn from_json(json: &str) -> Result<Self> {
        let layout: Self = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    /// Required columns in output order.
    pub fn required_columns(&self) -> [&str; 4] {
        [
            &self.account_code,
            &self.classifications[0],
            &self.classifications[1],
            &self.classifications[2],
        ]
    }

    pub fn validate(&self) -> Result<()> {
        validate_encodings(&self.encodings)?;
        validate_column_names(&self.required_columns())
    }
}

/// File contract for the department-to-location lookup table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationLayout {
    pub department_code: String,
    pub location: String,
    pub encodings: Vec<TextEncoding>,
}

impl Default for LocationLayout {
    fn default() -> Self {
        Self {
            department_code: COL_DEPARTMENT_CODE.to_string(),
            location: COL_LOCATION.to_string(),
            encodings: default_encodings(),
        }
    }
}

impl LocationLayout {
    pub fn from_json(json: &str) -> Result<Self> {
        let layout: Self = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn required_columns(&self) -> [&str; 2] {
        [&self.department_code, &self.location]
    }

    pub fn validate(&self) -> Result<()> {
        validate_encodings(&self.encodings)?;
        validate_column_names(&self.required_columns())
    }
}

/// File contract for the payable-notes export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PayableNotesLayout {
    pub source_columns: SourceColumns,
    pub account: AccountTag,
    pub encodings: Vec<TextEncoding>,
}

impl Default for PayableNotesLayout {
    fn default() -> Self {
        Self {
            source_columns: SourceColumns {
                department_code: "依頼部門コード".to_string(),
                department_name: "依頼部門名".to_string(),
                amount: "手形金額".to_string(),
            },
            account: AccountTag {
                code: "BS2003".to_string(),
                name: "★支払手形".to_string(),
            },
            encodings: default_encodings(),
        }
    }
}

impl PayableNotesLayout {
    pub fn from_json(json: &str) -> Result<Self> {
        let layout: Self = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<()> {
        validate_encodings(&self.encodings)?;
        validate_column_names(&self.source_columns.as_list())
    }
}

fn validate_encodings(encodings: &[TextEncoding]) -> Result<()> {
    if encodings.is_empty() {
        return Err(IngestError::InvalidLayout(
            "at least one candidate encoding is required".to_string(),
        ));
    }
    Ok(())
}

fn validate_column_names(names: &[&str]) -> Result<()> {
    for (idx, name) in names.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(IngestError::InvalidLayout(format!(
                "required column #{} has an empty name",
                idx
            )));
        }
        if names[..idx].contains(name) {
            return Err(IngestError::InvalidLayout(format!(
                "column '{}' is listed more than once",
                name
            )));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRecord {
    pub date: Option<NaiveDate>,
    pub department_code: String,
    pub department_name: String,
    pub account_code: String,
    pub account_name: String,
    pub amount: Option<f64>,
}

/// A normalized department ledger with the columns of [`LEDGER_COLUMNS`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTable {
    pub frame: Frame,
    pub report_date: Option<NaiveDate>,
    /// The header token the report date was parsed from, as written.
    pub raw_report_date: Option<String>,
    pub encoding: TextEncoding,
}

impl LedgerTable {
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    pub fn records(&self) -> Vec<LedgerRecord> {
        let frame = &self.frame;
        frame
            .rows()
            .iter()
            .map(|row| {
                let raw_amount = cell(frame, row, COL_AMOUNT);
                let amount = parse_amount(&raw_amount);
                if amount.is_none() && !raw_amount.trim().is_empty() {
                    warn!("Amount '{}' is not numeric; leaving it empty", raw_amount);
                }
                LedgerRecord {
                    date: NaiveDate::parse_from_str(&cell(frame, row, COL_DATE), DATE_FORMAT).ok(),
                    department_code: cell(frame, row, COL_DEPARTMENT_CODE),
                    department_name: cell(frame, row, COL_DEPARTMENT_NAME),
                    account_code: cell(frame, row, COL_ACCOUNT_CODE),
                    account_name: cell(frame, row, COL_ACCOUNT_NAME),
                    amount,
                }
            })
            .collect()
    }

    pub fn total_amount(&self) -> f64 {
        self.records().iter().filter_map(|r| r.amount).sum()
    }
}

fn cell(frame: &Frame, row: &[String], column: &str) -> String {
    frame
        .column_index(column)
        .map(|idx| row[idx].clone())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub account_code: String,
    pub classification_1: String,
    pub classification_2: String,
    pub classification_3: String,
}

/// Account-code to category lookup, projected to the four required columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationTable {
    pub frame: Frame,
    pub encoding: TextEncoding,
}

impl ClassificationTable {
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    /// Rows in file order. Cells are read by position, which matches the
    /// layout's required-column order.
    pub fn records(&self) -> Vec<ClassificationRecord> {
        self.frame
            .rows()
            .iter()
            .map(|row| {
                let at = |idx: usize| row.get(idx).cloned().unwrap_or_default();
                ClassificationRecord {
                    account_code: at(0),
                    classification_1: at(1),
                    classification_2: at(2),
                    classification_3: at(3),
                }
            })
            .collect()
    }

    /// Index by account code. The first row for a code wins.
    pub fn by_account_code(&self) -> BTreeMap<String, ClassificationRecord> {
        let mut index = BTreeMap::new();
        for record in self.records() {
            if index.contains_key(&record.account_code) {
                warn!(
                    "Duplicate account code '{}' in classification table; keeping first",
                    record.account_code
                );
                continue;
            }
            index.insert(record.account_code.clone(), record);
        }
        index
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub department_code: String,
    pub location: String,
}

/// Department-code to location lookup. Codes are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationTable {
    pub frame: Frame,
    pub encoding: TextEncoding,
}

impl LocationTable {
    pub fn len(&self) -> usize {
        self.frame.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.is_empty()
    }

    pub fn records(&self) -> Vec<LocationRecord> {
        self.frame
            .rows()
            .iter()
            .map(|row| LocationRecord {
                department_code: row.first().cloned().unwrap_or_default(),
                location: row.get(1).cloned().unwrap_or_default(),
            })
            .collect()
    }

    /// Index by department code. The first row for a code wins.
    pub fn by_department_code(&self) -> BTreeMap<String, LocationRecord> {
        let mut index = BTreeMap::new();
        for record in self.records() {
            if index.contains_key(&record.department_code) {
                warn!(
                    "Duplicate department code '{}' in location table; keeping first",
                    record.department_code
                );
                continue;
            }
            index.insert(record.department_code.clone(), record);
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ledger_layout_is_valid() {
        let layout = LedgerLayout::default();
        assert!(layout.validate().is_ok());
        assert_eq!(layout.header_lines, 13);
        assert_eq!(layout.source_columns.amount, "受取手形");
    }

    #[test]
    fn test_ledger_layout_from_partial_json() {
        let layout = LedgerLayout::from_json(
            r#"{"header_lines": 9, "date_line": 2, "encodings": ["cp932"]}"#,
        )
        .unwrap();
        assert_eq!(layout.header_lines, 9);
        assert_eq!(layout.date_line, 2);
        assert_eq!(layout.date_field, 1);
        assert_eq!(layout.encodings, vec![TextEncoding::Cp932]);
        assert_eq!(layout.account.code, "BS1013");
    }

    #[test]
    fn test_ledger_layout_rejects_blank_source_column() {
        let result = LedgerLayout::from_json(
            r#"{"source_columns": {"department_code": " ", "department_name": "計上部門名", "amount": "受取手形"}}"#,
        );
        assert!(matches!(result, Err(IngestError::InvalidLayout(_))));
    }

    #[test]
    fn test_layout_rejects_empty_encodings() {
        let result = ClassificationLayout::from_json(r#"{"encodings": []}"#);
        assert!(matches!(result, Err(IngestError::InvalidLayout(_))));
    }

    #[test]
    fn test_layout_rejects_duplicate_columns() {
        let mut layout = ClassificationLayout::default();
        layout.classifications[2] = layout.classifications[1].clone();
        assert!(matches!(
            layout.validate(),
            Err(IngestError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_ledger_records() {
        let frame = Frame::new(
            LEDGER_COLUMNS.iter().map(|c| c.to_string()).collect(),
            vec![
                vec!["2024-08-01", "0101", "Tokyo", "BS1013", "★受取手形", "1,500"],
                vec!["", "0202", "Osaka", "BS1013", "★受取手形", ""],
            ]
            .into_iter()
            .map(|r| r.into_iter().map(str::to_string).collect())
            .collect(),
        );
        let table = LedgerTable {
            frame,
            report_date: NaiveDate::from_ymd_opt(2024, 8, 1),
            raw_report_date: Some("2024年8月".to_string()),
            encoding: TextEncoding::Utf8Sig,
        };

        let records = table.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2024, 8, 1));
        assert_eq!(records[0].department_code, "0101");
        assert_eq!(records[0].amount, Some(1500.0));
        assert_eq!(records[1].date, None);
        assert_eq!(records[1].amount, None);
        assert_eq!(table.total_amount(), 1500.0);
    }

    #[test]
    fn test_classification_index_keeps_first() {
        let frame = Frame::new(
            ClassificationLayout::default()
                .required_columns()
                .iter()
                .map(|c| c.to_string())
                .collect(),
            vec![
                vec!["BS1013", "資産", "流動資産", "受取手形"],
                vec!["BS2003", "負債", "流動負債", "支払手形"],
                vec!["BS1013", "重複", "重複", "重複"],
            ]
            .into_iter()
            .map(|r| r.into_iter().map(str::to_string).collect())
            .collect(),
        );
        let table = ClassificationTable {
            frame,
            encoding: TextEncoding::Utf8Sig,
        };

        let index = table.by_account_code();
        assert_eq!(index.len(), 2);
        assert_eq!(index["BS1013"].classification_1, "資産");
        assert_eq!(index["BS2003"].classification_3, "支払手形");
    }

    #[test]
    fn test_location_layout_from_json() {
        let layout = LocationLayout::from_json(r#"{"location": "所在地"}"#).unwrap();
        assert_eq!(layout.required_columns(), ["部門コード", "所在地"]);
        assert_eq!(layout.encodings, vec![TextEncoding::Utf8Sig, TextEncoding::Cp932]);

        let result = LocationLayout::from_json(r#"{"location": "部門コード"}"#);
        assert!(matches!(result, Err(IngestError::InvalidLayout(_))));
    }

    #[test]
    fn test_location_index_keeps_text_codes() {
        let table = LocationTable {
            frame: Frame::new(
                vec![COL_DEPARTMENT_CODE.to_string(), COL_LOCATION.to_string()],
                vec![
                    vec!["0101".to_string(), "東京".to_string()],
                    vec!["101".to_string(), "大阪".to_string()],
                    vec!["0101".to_string(), "重複".to_string()],
                ],
            ),
            encoding: TextEncoding::Utf8Sig,
        };

        let index = table.by_department_code();
        assert_eq!(index.len(), 2);
        assert_eq!(index["0101"].location, "東京");
        assert_eq!(index["101"].location, "大阪");
    }
}
