use std::{
    collections::HashMap,
    convert::Infallible,
    fmt::{self, Display, Formatter},
    str::FromStr,
};

use chrono::SecondsFormat;
use qfilter_parser::ast::{Expr, Page, Preloads, SortEntry, Value};
use serde::Serialize;

use crate::errors::Result;

/// The policy-applied form of a parsed filter that adapters render. Adapters only ever read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompiledQuery {
    pub filter: Option<Expr>,
    pub sort: Vec<SortEntry>,
    pub page: Page,
    pub preloads: Preloads,
    /// Empty means every column.
    pub selected: Vec<String>,
    pub group_by: Vec<String>,
}

/// Where a query is rendered against: the base table (or collection) and, for preloads, the
/// collection each relation lives in when it differs from the relation name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderContext {
    pub table: Option<String>,
    pub collections: HashMap<String, String>,
}

impl RenderContext {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            ..Default::default()
        }
    }

    pub fn with_collection(
        mut self,
        relation: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        self.collections.insert(relation.into(), collection.into());
        self
    }

    pub fn collection_for<'a>(&'a self, relation: &'a str) -> &'a str {
        self.collections
            .get(relation)
            .map(String::as_str)
            .unwrap_or(relation)
    }
}

/// One section of a rendered query. Tags are read case-insensitively, and `_` may stand in for
/// the space of two-word tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Part {
    Select,
    From,
    Where,
    OrderBy,
    Limit,
    Offset,
    Join,
    GroupBy,
    Aggregate,
    Find,
    Unknown(String),
}

impl Part {
    pub const SQL_DEFAULT: [Part; 8] = [
        Part::Select,
        Part::From,
        Part::Join,
        Part::Where,
        Part::GroupBy,
        Part::OrderBy,
        Part::Limit,
        Part::Offset,
    ];

    pub const DOCUMENT_DEFAULT: [Part; 1] = [Part::Find];

    pub fn tag(&self) -> &str {
        match self {
            Part::Select => "SELECT",
            Part::From => "FROM",
            Part::Where => "WHERE",
            Part::OrderBy => "ORDER BY",
            Part::Limit => "LIMIT",
            Part::Offset => "OFFSET",
            Part::Join => "JOIN",
            Part::GroupBy => "GROUP BY",
            Part::Aggregate => "AGGREGATE",
            Part::Find => "FIND",
            Part::Unknown(tag) => tag,
        }
    }

    /// Parses a comma-separated list such as `"select, from, where"`.
    pub fn parse_list(list: &str) -> Vec<Part> {
        list.split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .filter_map(|tag| tag.parse().ok())
            .collect()
    }
}

impl FromStr for Part {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split(|c: char| c.is_whitespace() || c == '_')
            .filter(|w| !w.is_empty())
            .map(str::to_ascii_uppercase)
            .collect::<Vec<_>>()
            .join(" ");
        Ok(match normalized.as_str() {
            "SELECT" => Part::Select,
            "FROM" => Part::From,
            "WHERE" => Part::Where,
            "ORDER BY" => Part::OrderBy,
            "LIMIT" => Part::Limit,
            "OFFSET" => Part::Offset,
            "JOIN" => Part::Join,
            "GROUP BY" => Part::GroupBy,
            "AGGREGATE" => Part::Aggregate,
            "FIND" => Part::Find,
            _ => Part::Unknown(s.trim().to_string()),
        })
    }
}

impl Display for Part {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlQuery {
    pub sql: String,
    pub args: Vec<Value>,
}

impl SqlQuery {
    /// Arguments as plain JSON values. Timestamps become RFC 3339 strings.
    pub fn args_json(&self) -> Vec<serde_json::Value> {
        self.args.iter().map(plain_json).collect()
    }
}

fn plain_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Int(v) => Json::from(*v),
        Value::Float(v) => Json::from(*v),
        Value::Bool(v) => Json::from(*v),
        Value::String(s) => Json::from(s.as_str()),
        Value::Timestamp(t) => Json::from(t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        Value::Null => Json::Null,
        Value::List(values) => Json::Array(values.iter().map(plain_json).collect()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentQuery {
    pub collection: String,
    /// Rendered parts keyed by their tag, in render order.
    pub parts: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Query {
    Sql(SqlQuery),
    Document(DocumentQuery),
}

/// Turns a [`CompiledQuery`] into a backend query. `parts` selects and orders the sections to
/// emit; `None` means the adapter's default.
pub trait Adapter: Send + Sync {
    fn name(&self) -> &str;

    fn render_sql(
        &self,
        query: &CompiledQuery,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<String>;

    fn render_query(
        &self,
        query: &CompiledQuery,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<Query>;

    /// Human-readable text with arguments inlined. Never meant to be executed.
    fn render_explain(
        &self,
        query: &CompiledQuery,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<String> {
        self.render_sql(query, ctx, parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_from_str() {
        assert_eq!("select".parse(), Ok(Part::Select));
        assert_eq!("Order By".parse(), Ok(Part::OrderBy));
        assert_eq!("group_by".parse(), Ok(Part::GroupBy));
        assert_eq!("  ORDER   BY ".parse(), Ok(Part::OrderBy));
        assert_eq!(
            "HAVING".parse(),
            Ok::<_, Infallible>(Part::Unknown("HAVING".to_string()))
        );
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(
            Part::parse_list("select, from,,where"),
            vec![Part::Select, Part::From, Part::Where]
        );
    }

    #[test]
    fn test_collection_for() {
        let ctx = RenderContext::table("users").with_collection("orders", "order_docs");
        assert_eq!(ctx.collection_for("orders"), "order_docs");
        assert_eq!(ctx.collection_for("items"), "items");
    }

    #[test]
    fn test_args_json() {
        let query = SqlQuery {
            sql: "?".to_string(),
            args: vec![Value::Int(1), Value::from("a"), Value::Null],
        };
        assert_eq!(
            serde_json::Value::Array(query.args_json()).to_string(),
            r#"[1,"a",null]"#
        );
    }
}
