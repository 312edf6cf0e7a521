//! PostgreSQL-compatible scalar functions registered in the SQLite engine.
//! These cover semantics a pure text rewrite cannot express: regex matching,
//! SIMILAR TO, PG date formatting, UUID generation, hashing.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

const DETERMINISTIC: FunctionFlags = FunctionFlags::SQLITE_UTF8
    .union(FunctionFlags::SQLITE_DETERMINISTIC);

/// Registers every helper on the connection.
pub fn register_pg_functions(conn: &Connection) -> rusqlite::Result<()> {
    // gen_random_uuid() -> UUID v4 string
    conn.create_scalar_function("gen_random_uuid", 0, FunctionFlags::SQLITE_UTF8, |_ctx| {
        Ok(uuid::Uuid::new_v4().to_string())
    })?;

    // md5(value) -> lowercase hex digest; NULL in, NULL out
    conn.create_scalar_function("md5", 1, DETERMINISTIC, |ctx| {
        let digest = match ctx.get_raw(0) {
            ValueRef::Null => return Ok(None),
            ValueRef::Text(s) => md5::compute(s),
            ValueRef::Blob(b) => md5::compute(b),
            ValueRef::Integer(n) => md5::compute(n.to_string()),
            ValueRef::Real(f) => md5::compute(f.to_string()),
        };
        Ok(Some(format!("{:x}", digest)))
    })?;

    // split_part(string, delimiter, field) -> nth field, 1-indexed
    conn.create_scalar_function("split_part", 3, DETERMINISTIC, |ctx| {
        if any_null(&[ctx.get_raw(0), ctx.get_raw(1), ctx.get_raw(2)]) {
            return Ok(None);
        }
        let text: String = ctx.get(0)?;
        let delim: String = ctx.get(1)?;
        let field: i64 = ctx.get(2)?;

        let parts: Vec<&str> = text.split(delim.as_str()).collect();
        if field < 1 || field as usize > parts.len() {
            return Ok(Some(String::new()));
        }
        Ok(Some(parts[field as usize - 1].to_string()))
    })?;

    // pg_regex_match(str, pattern, case_insensitive) -> 0/1
    conn.create_scalar_function("pg_regex_match", 3, DETERMINISTIC, |ctx| {
        if any_null(&[ctx.get_raw(0), ctx.get_raw(1)]) {
            return Ok(0i64);
        }
        let text: String = ctx.get(0)?;
        let mut pattern: String = ctx.get(1)?;
        let case_insensitive: i64 = ctx.get(2).unwrap_or(0);
        if case_insensitive == 1 {
            pattern = format!("(?i){pattern}");
        }
        let matched = Regex::new(&pattern)
            .map(|re| re.is_match(&text))
            .unwrap_or(false);
        Ok(matched as i64)
    })?;

    // pg_similar_match(str, pattern) -> 0/1 against a SQL SIMILAR TO pattern
    conn.create_scalar_function("pg_similar_match", 2, DETERMINISTIC, |ctx| {
        if any_null(&[ctx.get_raw(0), ctx.get_raw(1)]) {
            return Ok(0i64);
        }
        let text: String = ctx.get(0)?;
        let pattern: String = ctx.get(1)?;
        let matched = Regex::new(&similar_to_regex(&pattern))
            .map(|re| re.is_match(&text))
            .unwrap_or(false);
        Ok(matched as i64)
    })?;

    // pg_to_char(datetime_text, pg_format) -> formatted string
    conn.create_scalar_function("pg_to_char", 2, DETERMINISTIC, |ctx| {
        if any_null(&[ctx.get_raw(0), ctx.get_raw(1)]) {
            return Ok(None);
        }
        let value: String = ctx.get(0)?;
        let format: String = ctx.get(1)?;
        match parse_datetime(&value) {
            Some(t) => Ok(Some(format_pg_style(t, &format))),
            None => Ok(Some(value)),
        }
    })?;

    // pg_typeof(value) -> PG type name
    conn.create_scalar_function("pg_typeof", 1, DETERMINISTIC, |ctx| {
        let name = match ctx.get_raw(0) {
            ValueRef::Null => "unknown",
            ValueRef::Integer(_) => "integer",
            ValueRef::Real(_) => "double precision",
            ValueRef::Text(_) => "text",
            ValueRef::Blob(_) => "bytea",
        };
        Ok(name.to_string())
    })?;

    Ok(())
}

fn any_null(values: &[ValueRef]) -> bool {
    values.iter().any(|v| matches!(v, ValueRef::Null))
}

/// Parses a datetime string in the shapes SQLite commonly stores.
fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%SZ",
    ];
    for f in FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, f) {
            return Some(t);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    if let Ok(tm) = NaiveTime::parse_from_str(s, "%H:%M:%S") {
        return Some(NaiveDate::from_ymd_opt(1970, 1, 1)?.and_time(tm));
    }
    None
}

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const DAYS: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

/// Formats a datetime with PostgreSQL to_char patterns. The patterns are
/// matched in one left-to-right scan; listing order decides ties, so the
/// name forms (Month, Day) must precede their prefixes (Mon, DD, MM).
fn format_pg_style(t: NaiveDateTime, pg_fmt: &str) -> String {
    let month_name = MONTHS[t.month() as usize - 1];
    let month_abbr = &month_name[..3];
    let day_name = DAYS[t.weekday().num_days_from_sunday() as usize];
    let day_abbr = &day_name[..3];
    let meridiem = if t.hour() < 12 { "AM" } else { "PM" };

    let pairs: [(&str, String); 24] = [
        ("YYYY", format!("{:04}", t.year())),
        ("YY", format!("{:02}", t.year() % 100)),
        ("Month", month_name.to_string()),
        ("MONTH", month_name.to_uppercase()),
        ("month", month_name.to_lowercase()),
        ("Mon", month_abbr.to_string()),
        ("MON", month_abbr.to_uppercase()),
        ("mon", month_abbr.to_lowercase()),
        ("MM", format!("{:02}", t.month())),
        ("Day", day_name.to_string()),
        ("DAY", day_name.to_uppercase()),
        ("day", day_name.to_lowercase()),
        ("Dy", day_abbr.to_string()),
        ("DY", day_abbr.to_uppercase()),
        ("dy", day_abbr.to_lowercase()),
        ("DD", format!("{:02}", t.day())),
        ("HH24", format!("{:02}", t.hour())),
        ("HH12", format!("{:02}", (t.hour() + 11) % 12 + 1)),
        ("HH", format!("{:02}", t.hour())),
        ("MI", format!("{:02}", t.minute())),
        ("SS", format!("{:02}", t.second())),
        ("AM", meridiem.to_string()),
        ("PM", meridiem.to_string()),
        ("Q", format!("{}", (t.month() - 1) / 3 + 1)),
    ];

    let mut out = String::with_capacity(pg_fmt.len());
    let mut rest = pg_fmt;
    'outer: while !rest.is_empty() {
        for (pat, rep) in &pairs {
            if rest.starts_with(pat) {
                out.push_str(rep);
                rest = &rest[pat.len()..];
                continue 'outer;
            }
        }
        let ch = rest.chars().next().unwrap();
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

/// Converts a SQL SIMILAR TO pattern to an anchored regex: `%` matches any
/// substring, `_` any character, `| ( )` keep their meaning, and regex
/// metacharacters are escaped.
fn similar_to_regex(pattern: &str) -> String {
    let mut re = String::with_capacity(pattern.len() + 2);
    re.push('^');
    for ch in pattern.chars() {
        match ch {
            '%' => re.push_str(".*"),
            '_' => re.push('.'),
            '|' | '(' | ')' => re.push(ch),
            '.' | '^' | '$' | '+' | '?' | '{' | '}' | '[' | ']' | '\\' | '*' => {
                re.push('\\');
                re.push(ch);
            }
            _ => re.push(ch),
        }
    }
    re.push('$');
    re
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn similar_to_pattern_conversion() {
        assert_eq!(similar_to_regex("%(foo|bar)%"), "^.*(foo|bar).*$");
        assert_eq!(similar_to_regex("a_c"), "^a.c$");
        assert_eq!(similar_to_regex("50%"), "^50.*$");
        assert_eq!(similar_to_regex("a.b"), "^a\\.b$");
        assert_eq!(similar_to_regex("x*y"), "^x\\*y$");
    }

    #[test]
    fn similar_to_matching() {
        let re = Regex::new(&similar_to_regex("%(foo|bar)%")).unwrap();
        assert!(re.is_match("xxfooyy"));
        assert!(re.is_match("bar"));
        assert!(!re.is_match("baz"));

        // Anchored: pattern must cover the whole string
        let re = Regex::new(&similar_to_regex("abc")).unwrap();
        assert!(re.is_match("abc"));
        assert!(!re.is_match("xabcx"));
    }

    #[test]
    fn datetime_parsing() {
        assert!(parse_datetime("2024-03-15 14:30:05").is_some());
        assert!(parse_datetime("2024-03-15T14:30:05").is_some());
        assert!(parse_datetime("2024-03-15").is_some());
        assert!(parse_datetime("14:30:05").is_some());
        assert!(parse_datetime("not a date").is_none());

        let t = parse_datetime("2024-03-15").unwrap();
        assert_eq!((t.hour(), t.minute(), t.second()), (0, 0, 0));
    }

    #[test]
    fn pg_style_formatting() {
        // 2024-03-15 was a Friday
        let t = ts(2024, 3, 15, 14, 30, 5);
        assert_eq!(format_pg_style(t, "YYYY-MM-DD"), "2024-03-15");
        assert_eq!(format_pg_style(t, "HH24:MI:SS"), "14:30:05");
        assert_eq!(format_pg_style(t, "Mon DD, YYYY"), "Mar 15, 2024");
        assert_eq!(format_pg_style(t, "Month"), "March");
        assert_eq!(format_pg_style(t, "MONTH"), "MARCH");
        assert_eq!(format_pg_style(t, "Day"), "Friday");
        assert_eq!(format_pg_style(t, "Dy"), "Fri");
        assert_eq!(format_pg_style(t, "HH12:MI PM"), "02:30 PM");
        assert_eq!(format_pg_style(t, "Q"), "1");
        assert_eq!(format_pg_style(t, "YY"), "24");
    }

    #[test]
    fn morning_meridiem() {
        let t = ts(2024, 3, 15, 9, 0, 0);
        assert_eq!(format_pg_style(t, "HH12 AM"), "09 AM");
        let midnight = ts(2024, 3, 15, 0, 0, 0);
        assert_eq!(format_pg_style(midnight, "HH12"), "12");
    }
}
