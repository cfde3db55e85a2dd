use itertools::Itertools;
use qfilter_parser::ast::Value;

use super::dialect::Dialect;

const QUOTES: [char; 3] = ['\'', '"', '`'];

/// Byte offsets of the `?` placeholders in `sql`, skipping any inside single-quoted,
/// double-quoted or backtick-quoted spans.
pub fn placeholders(sql: &str) -> impl Iterator<Item = usize> + '_ {
    let mut open: Option<char> = None;
    sql.char_indices().filter_map(move |(i, c)| match open {
        Some(q) => {
            if c == q {
                open = None;
            }
            None
        }
        None if QUOTES.contains(&c) => {
            open = Some(c);
            None
        }
        None if c == '?' => Some(i),
        None => None,
    })
}

pub fn literal(value: &Value, dialect: &dyn Dialect) -> String {
    match value {
        Value::Int(v) => v.to_string(),
        Value::Float(v) if v.is_finite() => v.to_string(),
        Value::Float(_) | Value::Null => "NULL".to_string(),
        Value::Bool(v) => dialect.boolean(*v).to_string(),
        Value::String(s) => dialect.quote_string(s),
        Value::Timestamp(t) => dialect.timestamp(t),
        Value::List(values) => format!("({})", values.iter().map(|v| literal(v, dialect)).join(", ")),
    }
}

/// Replaces placeholders with literals, in order. Placeholders beyond the last argument stay.
pub fn inline(sql: &str, args: &[Value], dialect: &dyn Dialect) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut rest = 0;
    for (at, arg) in placeholders(sql).zip(args) {
        out.push_str(&sql[rest..at]);
        out.push_str(&literal(arg, dialect));
        rest = at + 1;
    }
    out.push_str(&sql[rest..]);
    out
}
