use chrono::SecondsFormat;
use qfilter_parser::ast::{Expr, Value};
use serde_json::{Map, Value as Json};

fn single(key: impl Into<String>, value: Json) -> Json {
    let mut map = Map::new();
    map.insert(key.into(), value);
    Json::Object(map)
}

fn field_op(field: &str, op: &str, value: Json) -> Json {
    single(field, single(op, value))
}

/// Extended-JSON form of a value: timestamps are `{"$date": "<rfc3339>"}`.
pub fn value(v: &Value) -> Json {
    match v {
        Value::Int(n) => Json::from(*n),
        Value::Float(n) => Json::from(*n),
        Value::Bool(b) => Json::from(*b),
        Value::String(s) => Json::from(s.as_str()),
        Value::Timestamp(t) => single(
            "$date",
            Json::from(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        ),
        Value::Null => Json::Null,
        Value::List(values) => Json::Array(values.iter().map(value).collect()),
    }
}

/// An anchored regex matching what the LIKE pattern matches.
pub fn like_to_regex(pattern: &str) -> String {
    let mut out = String::from("^");
    let mut literal = String::new();
    for c in pattern.chars() {
        let wildcard = match c {
            '%' => ".*",
            '_' => ".",
            _ => {
                literal.push(c);
                continue;
            }
        };
        out.push_str(&regex::escape(&literal));
        literal.clear();
        out.push_str(wildcard);
    }
    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}

fn regex_match(field: &str, pattern: String, case_insensitive: bool) -> Json {
    let mut condition = Map::new();
    condition.insert("$regex".to_string(), Json::from(pattern));
    if case_insensitive {
        condition.insert("$options".to_string(), Json::from("i"));
    }
    single(field, Json::Object(condition))
}

fn values(vs: &[Value]) -> Json {
    Json::Array(vs.iter().map(value).collect())
}

/// A Mongo query filter for `expr`.
pub fn filter(expr: &Expr) -> Json {
    match expr {
        Expr::Eq { field, value: v } => field_op(field, "$eq", value(v)),
        Expr::Neq { field, value: v } => field_op(field, "$ne", value(v)),
        Expr::Gt { field, value: v } => field_op(field, "$gt", value(v)),
        Expr::Gte { field, value: v } => field_op(field, "$gte", value(v)),
        Expr::Lt { field, value: v } => field_op(field, "$lt", value(v)),
        Expr::Lte { field, value: v } => field_op(field, "$lte", value(v)),
        Expr::Like { field, pattern } => regex_match(field, like_to_regex(pattern), false),
        Expr::ILike { field, pattern } => regex_match(field, like_to_regex(pattern), true),
        Expr::Regex { field, pattern } => regex_match(field, pattern.clone(), false),
        Expr::In { field, values: vs } => field_op(field, "$in", values(vs)),
        Expr::NotIn { field, values: vs } => field_op(field, "$nin", values(vs)),
        Expr::Between { field, low, high } => {
            let mut range = Map::new();
            range.insert("$gte".to_string(), value(low));
            range.insert("$lte".to_string(), value(high));
            single(field, Json::Object(range))
        }
        Expr::IsNull { field } => field_op(field, "$eq", Json::Null),
        Expr::NotNull { field } => field_op(field, "$ne", Json::Null),
        Expr::And(operands) => single("$and", operands.iter().map(filter).collect()),
        Expr::Or(operands) => single("$or", operands.iter().map(filter).collect()),
        Expr::Not(operand) => single("$nor", Json::Array(vec![filter(operand)])),
    }
}
