use qfilter_parser::ast::SortEntry;

pub use super::expr::SqlExpr;

/// A SELECT statement before rendering. Identifiers are stored unquoted; conditions are already
/// rendered fragments.
#[derive(Debug, Default, Clone)]
pub struct Select {
    pub table: String,
    /// Empty means `*`.
    pub columns: Vec<String>,
    pub joins: Vec<Join>,
    pub conditions: SqlExpr,
    pub grouping: Vec<String>,
    pub sorting: Vec<SortEntry>,
    /// Zero means no LIMIT.
    pub limit: u64,
    /// Zero means no OFFSET.
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub table: String,
    /// Empty conditions join on `1=1`.
    pub conditions: SqlExpr,
}

impl From<String> for Select {
    fn from(table: String) -> Self {
        Self {
            table,
            ..Default::default()
        }
    }
}
