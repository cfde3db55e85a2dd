use super::dialect::Dialect;

/// Backtick identifiers, as MySQL, MariaDB and SQLite accept them.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Standard;

impl Dialect for Standard {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!("`{}`", ident.replace('`', "``"))
    }

    fn quote_string(&self, string: &str) -> String {
        format!("'{}'", string.replace('\'', "''"))
    }
}
