use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;

pub const DEFAULT_REGEX_OPERATOR: &str = "REGEXP";

static REGEX_OPERATOR: Lazy<RwLock<String>> =
    Lazy::new(|| RwLock::new(DEFAULT_REGEX_OPERATOR.to_string()));

/// Sets the operator every SQL adapter without an override uses for regex matches, for the whole
/// process. `REGEXP` suits MySQL and SQLite; Postgres wants `~`.
pub fn set_regex_operator(op: impl Into<String>) {
    *REGEX_OPERATOR
        .write()
        .unwrap_or_else(PoisonError::into_inner) = op.into();
}

pub fn regex_operator() -> String {
    REGEX_OPERATOR
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn reset_regex_operator() {
    set_regex_operator(DEFAULT_REGEX_OPERATOR);
}
