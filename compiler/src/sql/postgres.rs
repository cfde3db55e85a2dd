use chrono::{DateTime, Utc};

use super::{
    dialect::Dialect,
    regex_op::{regex_operator, DEFAULT_REGEX_OPERATOR},
};

const POSIX_MATCH: &str = "~";

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        format!(r#""{}""#, ident.replace('"', r#""""#))
    }

    // TODO: standard_conforming_strings=off servers still treat `\` as an escape here; switch to
    // E'' literals if explain output ever has to run on them.
    fn quote_string(&self, string: &str) -> String {
        format!("'{}'", string.replace('\'', "''"))
    }

    fn timestamp(&self, timestamp: &DateTime<Utc>) -> String {
        format!(
            "TIMESTAMPTZ {}",
            self.quote_string(&timestamp.to_rfc3339())
        )
    }

    /// Postgres has no `REGEXP`, so the process-wide default maps to its POSIX match operator.
    fn regex_operator(&self) -> String {
        let op = regex_operator();
        if op == DEFAULT_REGEX_OPERATOR {
            POSIX_MATCH.to_string()
        } else {
            op
        }
    }
}
