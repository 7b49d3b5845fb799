use crate::schema::{LedgerLayout, DATE_FORMAT};
use crate::utils::parse_date_token;
use chrono::NaiveDate;
use log::{info, warn};

/// Date information pulled from the metadata header of a ledger export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderDate {
    /// The date cell with surrounding whitespace and quotes stripped.
    pub raw: Option<String>,
    pub date: Option<NaiveDate>,
}

/// Extracts the report date from `lines` at the layout's line and field.
///
/// A short header, a line without the field, or an unparseable token all
/// yield `date: None`; none of them are errors.
pub fn parse_report_date(lines: &[String], layout: &LedgerLayout) -> HeaderDate {
    let Some(line) = lines.get(layout.date_line) else {
        warn!(
            "Header has {} lines; expected at least {} for the report date",
            lines.len(),
            layout.date_line + 1
        );
        return HeaderDate::default();
    };

    let fields: Vec<&str> = line.trim().split(',').collect();
    let Some(field) = fields.get(layout.date_field) else {
        warn!(
            "Header line {} has {} fields; no report date at field {}",
            layout.date_line + 1,
            fields.len(),
            layout.date_field + 1
        );
        return HeaderDate::default();
    };

    let raw = field.trim().trim_matches('"').trim().to_string();
    let date = parse_date_token(&raw);
    match date {
        Some(date) => info!(
            "Report date '{}' parsed as {}",
            raw,
            date.format(DATE_FORMAT)
        ),
        None => warn!("Report date '{}' could not be parsed as a date", raw),
    }

    HeaderDate {
        raw: Some(raw),
        date,
    }
}
