use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chumsky::prelude::*;

use crate::ast::Value;
use crate::tokens::*;

use super::utils::*;

/// Formats tried, in order, after RFC 3339.
const DATE_TIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

const LIST_STOP: &[char] = &[LIST_SEPARATOR, LIST_OPEN, LIST_CLOSE];

/// A right-hand side literal before typing.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Quoted(String),
    Bare(String),
}

impl Literal {
    pub fn into_value(self) -> Value {
        match self {
            Literal::Quoted(s) => match parse_date(&s) {
                Some(t) => Value::Timestamp(t),
                None => Value::String(s),
            },
            Literal::Bare(s) => bare_value(s),
        }
    }

    pub fn into_string(self) -> String {
        match self {
            Literal::Quoted(s) | Literal::Bare(s) => s,
        }
    }
}

fn literal(stop: &'static [char]) -> impl Psr<Literal> {
    quoted(STRING_QUOTE)
        .map(Literal::Quoted)
        .or(bareword(stop).map(Literal::Bare))
}

fn list() -> impl Psr<Vec<Literal>> {
    let items = literal(LIST_STOP)
        .padded()
        .separated_by(just(LIST_SEPARATOR))
        .allow_trailing();
    items
        .clone()
        .delimited_by(just(LIST_OPEN), just(LIST_CLOSE))
        .or(items)
}

fn bare_value(s: String) -> Value {
    match s.as_str() {
        LITERAL_TRUE => return Value::Bool(true),
        LITERAL_FALSE => return Value::Bool(false),
        LITERAL_NULL | LITERAL_NULL_UPPER => return Value::Null,
        _ => {}
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        if f.is_finite() {
            return Value::Float(f);
        }
    }
    match parse_date(&s) {
        Some(t) => Value::Timestamp(t),
        None => Value::String(s),
    }
}

pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&t));
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| Utc.from_utc_datetime(&t))
}

/// Removes one pair of enclosing parentheses.
fn strip_parens(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix(GROUP_OPEN)
        .and_then(|t| t.strip_suffix(GROUP_CLOSE))
        .map(str::trim)
        .unwrap_or(text)
}

fn literal_text(text: &str) -> Option<Literal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.starts_with(STRING_QUOTE) {
        return unquote(text).map(Literal::Quoted);
    }
    Some(Literal::Bare(text.to_string()))
}

/// A single typed value. Quoted text stays a string unless it reads as a date.
pub fn scalar(text: &str) -> Option<Value> {
    literal_text(text).map(Literal::into_value)
}

/// Pattern operators take their right-hand side as text, quoted or not.
pub fn pattern(text: &str) -> Option<String> {
    literal_text(text).map(Literal::into_string)
}

/// `[a, b, c]`, with the brackets optional and the whole thing optionally parenthesized.
pub fn set(text: &str) -> Option<Vec<Value>> {
    let text = strip_parens(text);
    if text.is_empty() {
        return None;
    }
    padded_to_end(list())
        .parse(text)
        .ok()
        .map(|items| items.into_iter().map(Literal::into_value).collect())
}

/// `low..high`, optionally parenthesized.
pub fn range(text: &str) -> Option<(Value, Value)> {
    let text = strip_parens(text);
    let at = find_unquoted(text, RANGE_SEPARATOR)?;
    let low = scalar(&text[..at])?;
    let high = scalar(&text[at + RANGE_SEPARATOR.len()..])?;
    Some((low, high))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Value {
        Value::Timestamp(Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap())
    }

    #[test]
    fn test_scalar() {
        assert_eq!(scalar("25"), Some(Value::Int(25)));
        assert_eq!(scalar("-3"), Some(Value::Int(-3)));
        assert_eq!(scalar("2.5"), Some(Value::Float(2.5)));
        assert_eq!(scalar("1e3"), Some(Value::Float(1000.0)));
        assert_eq!(scalar("true"), Some(Value::Bool(true)));
        assert_eq!(scalar("false"), Some(Value::Bool(false)));
        assert_eq!(scalar("null"), Some(Value::Null));
        assert_eq!(scalar("NULL"), Some(Value::Null));
        assert_eq!(scalar("NaN"), Some(Value::String("NaN".to_string())));
        assert_eq!(scalar("shipped"), Some(Value::String("shipped".to_string())));
        assert_eq!(scalar(""), None);
        assert_eq!(scalar("  "), None);
    }

    #[test]
    fn test_quoted_scalar() {
        assert_eq!(scalar(r#""22""#), Some(Value::String("22".to_string())));
        assert_eq!(scalar(r#""true""#), Some(Value::String("true".to_string())));
        assert_eq!(scalar(r#""a b""#), Some(Value::String("a b".to_string())));
        assert_eq!(scalar(r#""unterminated"#), None);
        assert_eq!(scalar(r#""2021-03-04""#), Some(ts(2021, 3, 4, 0, 0, 0)));
    }

    #[test]
    fn test_dates() {
        assert_eq!(scalar("2021-03-04"), Some(ts(2021, 3, 4, 0, 0, 0)));
        assert_eq!(scalar("2021/03/04"), Some(ts(2021, 3, 4, 0, 0, 0)));
        assert_eq!(scalar("2021-03-04T05:06:07"), Some(ts(2021, 3, 4, 5, 6, 7)));
        assert_eq!(scalar("2021-03-04T05:06:07Z"), Some(ts(2021, 3, 4, 5, 6, 7)));
        assert_eq!(
            scalar("2021-03-04T05:06:07+02:00"),
            Some(ts(2021, 3, 4, 3, 6, 7))
        );
        assert_eq!(
            scalar(r#""2021-03-04 05:06:07""#),
            Some(ts(2021, 3, 4, 5, 6, 7))
        );
        assert_eq!(scalar(r#""2021-03-04 05:06""#), Some(ts(2021, 3, 4, 5, 6, 0)));
        assert_eq!(
            scalar("2021-13-04"),
            Some(Value::String("2021-13-04".to_string()))
        );
    }

    #[test]
    fn test_pattern() {
        assert_eq!(pattern(r#""%e%""#), Some("%e%".to_string()));
        assert_eq!(pattern("%e%"), Some("%e%".to_string()));
        assert_eq!(pattern(r#""2021-03-04""#), Some("2021-03-04".to_string()));
        assert_eq!(pattern(""), None);
    }

    #[test]
    fn test_set() {
        assert_eq!(
            set("[1, 2, 3]"),
            Some(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
        );
        assert_eq!(
            set(r#"x,"y, z""#),
            Some(vec![
                Value::String("x".to_string()),
                Value::String("y, z".to_string())
            ])
        );
        assert_eq!(set("(1,null)"), Some(vec![Value::Int(1), Value::Null]));
        assert_eq!(set("[]"), Some(vec![]));
        assert_eq!(set("[1,2"), None);
        assert_eq!(set(""), None);
    }

    #[test]
    fn test_range() {
        assert_eq!(range("10..20"), Some((Value::Int(10), Value::Int(20))));
        assert_eq!(range("(10..20)"), Some((Value::Int(10), Value::Int(20))));
        assert_eq!(range("-1.5..-0.5"), Some((Value::Float(-1.5), Value::Float(-0.5))));
        assert_eq!(
            range(r#""a..b"..c"#),
            Some((
                Value::String("a..b".to_string()),
                Value::String("c".to_string())
            ))
        );
        assert_eq!(range("20..10"), Some((Value::Int(20), Value::Int(10))));
        assert_eq!(range("10"), None);
        assert_eq!(range("10.."), None);
    }
}
