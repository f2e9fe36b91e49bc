//! Lenient date parsing for survey answer cells.

use chrono::NaiveDate;

const DELIMITED_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d"];

/// Parses a birthdate-like cell.
///
/// Accepts compact `YYYYMMDD` and `YYYY-MM-DD`, `YYYY/MM/DD`, `YYYY.MM.DD`.
/// Anything after the first whitespace or `T` (a time part) is ignored.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use survey_common::parse_lenient_date;
///
/// let expected = NaiveDate::from_ymd_opt(2018, 4, 10);
/// assert_eq!(parse_lenient_date("20180410"), expected);
/// assert_eq!(parse_lenient_date("2018/04/10"), expected);
/// assert_eq!(parse_lenient_date("2018-04-10T09:30:00"), expected);
/// assert_eq!(parse_lenient_date("unknown"), None);
/// ```
pub fn parse_lenient_date(value: &str) -> Option<NaiveDate> {
    let token = value
        .trim()
        .split(|c: char| c.is_whitespace() || c == 'T')
        .next()?;
    if token.is_empty() {
        return None;
    }
    if token.len() == 8 && token.bytes().all(|b| b.is_ascii_digit()) {
        return parse_compact(token);
    }
    DELIMITED_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(token, format).ok())
}

fn parse_compact(token: &str) -> Option<NaiveDate> {
    let year = token.get(0..4)?.parse().ok()?;
    let month = token.get(4..6)?.parse().ok()?;
    let day = token.get(6..8)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
