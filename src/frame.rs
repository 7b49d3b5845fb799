use crate::error::{IngestError, Result};
use crate::utils::is_blank;
use csv::{ReaderBuilder, WriterBuilder};
use log::debug;
use serde::{Deserialize, Serialize};

/// An in-memory table of text cells addressed by column name.
///
/// Every row has exactly one cell per column, including frames read back
/// from JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFrame")]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct RawFrame {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<String>>,
}

impl From<RawFrame> for Frame {
    fn from(raw: RawFrame) -> Self {
        Frame::new(raw.columns, raw.rows)
    }
}

impl Frame {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Parses CSV text whose first record is the header row.
    ///
    /// Parsing is permissive: short rows are padded with empty cells and
    /// surplus cells beyond the header width are discarded.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let columns: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let width = columns.len();

        let mut rows = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result?;
            if record.len() != width {
                debug!(
                    "Row {} has {} fields, header has {}; normalizing",
                    index + 1,
                    record.len(),
                    width
                );
            }
            let mut row: Vec<String> = record.iter().take(width).map(str::to_string).collect();
            row.resize(width, String::new());
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Names from `required` that are not columns of this frame, in order.
    pub fn missing_columns<S: AsRef<str>>(&self, required: &[S]) -> Vec<String> {
        required
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| !self.has_column(name))
            .map(str::to_string)
            .collect()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| r[idx].as_str())
    }

    pub fn column_values(&self, column: &str) -> Option<Vec<&str>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Projects onto `names` in the given order. Names that are not columns
    /// of this frame are skipped.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Frame {
        let picked: Vec<(usize, &str)> = names
            .iter()
            .map(AsRef::as_ref)
            .filter_map(|name| self.column_index(name).map(|idx| (idx, name)))
            .collect();

        let columns = picked.iter().map(|(_, name)| name.to_string()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| picked.iter().map(|(idx, _)| row[*idx].clone()).collect())
            .collect();

        Frame { columns, rows }
    }

    /// Drops every row whose `column` cell is blank. Returns the number of
    /// rows removed.
    pub fn retain_non_blank(&mut self, column: &str) -> usize {
        let Some(idx) = self.column_index(column) else {
            return 0;
        };
        let before = self.rows.len();
        self.rows.retain(|row| !is_blank(&row[idx]));
        before - self.rows.len()
    }

    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(idx) => {
                self.columns[idx] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// Sets `column` to `value` on every row, adding the column if needed.
    pub fn with_constant(&mut self, column: &str, value: &str) {
        match self.column_index(column) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.to_string();
                }
            }
            None => {
                self.columns.push(column.to_string());
                for row in &mut self.rows {
                    row.push(value.to_string());
                }
            }
        }
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| IngestError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| {
            IngestError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}
