use qfilter::{parser, Compiler, Query, RenderContext, POSTGRES_ADAPTER, SQL_ADAPTER};
use serde_json::json;
use wasm_bindgen::prelude::*;

fn adapter_for(dialect: &str) -> Result<&'static str, String> {
    match dialect {
        "" | "standard" | "sql" => Ok(SQL_ADAPTER),
        "postgres" => Ok(POSTGRES_ADAPTER),
        _ => Err("Invalid dialect".to_string()),
    }
}

/// Compiles `filter` against `table` and returns `{"sql": ..., "args": [...]}` as JSON text.
#[wasm_bindgen]
pub fn compile(filter: &str, table: &str, dialect: &str) -> Result<String, String> {
    let adapter = adapter_for(dialect)?;
    let compiler = Compiler::default();
    let query = compiler
        .compile(filter, adapter, &RenderContext::table(table), None)
        .map_err(|e| e.to_string())?;
    match query {
        Query::Sql(q) => Ok(json!({"sql": q.sql, "args": q.args_json()}).to_string()),
        Query::Document(_) => Err("Invalid dialect".to_string()),
    }
}

/// Fails with the first structural problem found.
#[wasm_bindgen]
pub fn validate(filter: &str) -> Result<(), String> {
    parser::validate(filter).map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn repair(filter: &str) -> String {
    parser::repair(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile() {
        let out: serde_json::Value =
            serde_json::from_str(&compile("id=1", "users", "postgres").unwrap()).unwrap();
        assert_eq!(
            out,
            json!({"sql": r#"SELECT * FROM "users" WHERE "id" = ?"#, "args": [1]})
        );
        assert!(compile("id=1", "users", "oracle").is_err());
    }

    #[test]
    fn test_validate() {
        assert!(validate("a=1 and b=2").is_ok());
        assert_eq!(
            validate("a=1 and").unwrap_err(),
            "Filter ends with the operator `and` at line 1, column 5"
        );
    }

    #[test]
    fn test_repair() {
        assert_eq!(repair("(a=1"), "(a=1)");
    }
}
