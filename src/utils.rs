use chrono::NaiveDate;

/// Parses a report-date token as written in ledger export headers.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`, `YYYYMMDD`, `MM/DD/YYYY`,
/// the Japanese `YYYY年M月D日` form, and year-month forms (`YYYY-MM`,
/// `YYYY年M月`) which resolve to the first day of the month. A trailing time
/// component is ignored.
pub fn parse_date_token(token: &str) -> Option<NaiveDate> {
    let token = token.trim();
    let date_part = token.split_whitespace().next()?;
    let date_part = date_part.split('T').next()?;

    if date_part.len() == 8 && date_part.chars().all(|c| c.is_ascii_digit()) {
        return NaiveDate::parse_from_str(date_part, "%Y%m%d").ok();
    }

    let normalized: String = date_part
        .chars()
        .filter(|c| *c != '日')
        .map(|c| match c {
            '年' | '月' | '-' | '.' | '/' => '/',
            other => other,
        })
        .collect();
    let parts: Vec<&str> = normalized.trim_end_matches('/').split('/').collect();

    match parts.as_slice() {
        [year, month, day] if year.len() == 4 => ymd(year, month, day),
        [month, day, year] if year.len() == 4 && month.len() <= 2 => ymd(year, month, day),
        [year, month] if year.len() == 4 => ymd(year, month, "1"),
        _ => None,
    }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parses a monetary cell. Thousands separators and currency marks are
/// dropped; `△`/`▲` prefixes and parentheses mark negatives. Blank cells are
/// `None`, as are cells that still fail to parse.
pub fn parse_amount(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (negative, body) = if let Some(rest) = trimmed
        .strip_prefix('△')
        .or_else(|| trimmed.strip_prefix('▲'))
    {
        (true, rest)
    } else if let Some(rest) = trimmed.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        (true, rest)
    } else {
        (false, trimmed)
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, ',' | '¥' | '￥' | '円' | ' '))
        .collect();

    let value: f64 = cleaned.parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Returns `text` with its first `n` lines removed.
pub fn skip_lines(text: &str, n: usize) -> &str {
    if n == 0 {
        return text;
    }
    match text.match_indices('\n').nth(n - 1) {
        Some((idx, _)) => &text[idx + 1..],
        None => "",
    }
}

pub fn is_blank(cell: &str) -> bool {
    cell.trim().is_empty()
}
