use regex::Regex;

use crate::{
    adapter::{Query, RenderContext, SqlQuery},
    Compiler, Options, ValidationMode,
};

/// A compiler that parses leniently, as generated filters are not always valid filter text.
pub fn lenient() -> Compiler {
    Compiler::new(Options {
        validation: ValidationMode::Off,
        ..Default::default()
    })
}

pub fn sql_query(compiler: &Compiler, adapter: &str, table: &str) -> SqlQuery {
    match compiler.render_query(adapter, &RenderContext::table(table), None) {
        Ok(Query::Sql(q)) => q,
        other => panic!("expected an SQL query, got {other:?}"),
    }
}

/// Every backtick-quoted identifier in `sql`.
pub fn identifiers(sql: &str) -> Vec<String> {
    let quoted = Regex::new(r"`([^`]*)`").unwrap();
    quoted
        .captures_iter(sql)
        .map(|c| c[1].to_string())
        .collect()
}

#[test]
fn test_identifiers() {
    assert_eq!(
        identifiers("SELECT * FROM `t` JOIN `o` ON `o`.`a` = ?"),
        vec!["t", "o", "o", "a"]
    );
}
