pub fn no_table() -> String {
    "A table name is required to render SQL.".to_string()
}

pub fn no_collection() -> String {
    "A collection name is required to render a document query.".to_string()
}

pub fn unknown_adapter(name: &str) -> String {
    format!("No adapter is registered under the name `{name}`.")
}

pub fn unknown_naming_strategy(name: &str) -> String {
    format!("Naming strategy `{name}` does not exist. Use `as-is` or `snake-case`.")
}

pub fn unknown_validation_mode(name: &str) -> String {
    format!("Validation mode `{name}` does not exist. Use `off`, `strict` or `repair`.")
}

pub fn unknown_identifier_resolution(name: &str) -> String {
    format!("Identifier resolution `{name}` does not exist. Use `strict` or `flexible`.")
}
