use chrono::{DateTime, Utc};

use super::regex_op::regex_operator;

pub trait Dialect: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &'static str;

    /// Quote a table or column for use in SQL.
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string for use in SQL.
    fn quote_string(&self, string: &str) -> String;

    /// Render a timestamp literal. Fractional seconds are kept when there are any.
    fn timestamp(&self, timestamp: &DateTime<Utc>) -> String {
        self.quote_string(&timestamp.format("%Y-%m-%d %H:%M:%S%.f").to_string())
    }

    fn boolean(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    /// Render a possibly dotted field name. Each segment is quoted on its own.
    fn field(&self, name: &str) -> String {
        name.split('.')
            .map(|segment| self.quote_identifier(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Render a table and column reference
    fn table_column(&self, table: &str, column: &str) -> String {
        format!("{}.{}", self.quote_identifier(table), self.field(column))
    }

    fn regex_operator(&self) -> String {
        regex_operator()
    }
}
