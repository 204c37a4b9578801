// Utility helpers for parsing, month ordering and number formatting.
//
// This module centralizes the "dirty" cell handling so the rest of the code
// can assume clean, typed values.
use chrono::{NaiveDate, NaiveDateTime};
use num_format::{Locale, ToFormattedString};

/// Parse a spreadsheet cell into `f64` while being forgiving about the
/// formatting that shows up in exported metric sheets.
///
/// - Trims whitespace.
/// - Strips a trailing `%`, a leading currency sign and thousands separators.
/// - Accepts scientific notation (`1.5E+05`).
/// - Returns `None` for text (`n/a`) and non-finite words (`NaN`, `inf`).
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.strip_suffix('%').unwrap_or(s);
    let s = s.trim_start_matches(['¥', '￥', '$']).trim();
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Interpret a month label as a calendar date (first day of the month when
/// no day is given). Returns `None` for labels in any other shape.
pub fn parse_month_label(label: &str) -> Option<NaiveDate> {
    let s = label.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    // Spreadsheet exports often carry a midnight timestamp.
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    let with_day = format!("{}-01", s.replace('/', "-"));
    if let Ok(d) = NaiveDate::parse_from_str(&with_day, "%Y-%m-%d") {
        return Some(d);
    }
    NaiveDate::parse_from_str(&format!("{}1日", s), "%Y年%m月%d日").ok()
}

/// Arithmetic mean; `None` for an empty slice instead of NaN.
pub fn mean(v: &[f64]) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    let sum: f64 = v.iter().copied().sum();
    Some(sum / v.len() as f64)
}

pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let neg = n.is_sign_negative() && n != 0.0;
    let s = format!("{:.*}", decimals, n.abs());
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    // Beyond u128 keep the digits as they are rather than losing them.
    let mut res = int_part
        .parse::<u128>()
        .map(|v| v.to_formatted_string(&Locale::en))
        .unwrap_or_else(|_| int_part.to_string());
    if let Some(frac) = frac_part {
        if decimals > 0 {
            res.push('.');
            res.push_str(frac);
        }
    }
    if neg && res.chars().any(|c| c.is_ascii_digit() && c != '0') {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    // Counts in console messages (e.g. `1,234 rows loaded`).
    n.to_formatted_string(&Locale::en)
}
