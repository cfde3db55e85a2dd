use serde::Serialize;
use thiserror::Error;

/// Characters of surrounding input kept on either side of an error position.
const CONTEXT_RADIUS: usize = 20;

/// A structural problem in filter text, located by byte offset and by 1-based line and column.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub position: usize,
    /// The input around `position`.
    pub context: String,
    pub suggestion: String,
}

impl ParseError {
    pub fn new(
        input: &str,
        position: usize,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        let position = floor_char_boundary(input, position);
        let (line, column) = line_col(input, position);
        Self {
            message: message.into(),
            line,
            column,
            position,
            context: context(input, position),
            suggestion: suggestion.into(),
        }
    }
}

/// Repair ran but its output still fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("unable to repair filter: {diagnostic}")]
pub struct RepairError {
    pub original: String,
    pub repaired: String,
    pub diagnostic: ParseError,
}

fn floor_char_boundary(input: &str, mut position: usize) -> usize {
    position = position.min(input.len());
    while !input.is_char_boundary(position) {
        position -= 1;
    }
    position
}

pub fn line_col(input: &str, position: usize) -> (usize, usize) {
    let before = &input[..floor_char_boundary(input, position)];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}

fn context(input: &str, position: usize) -> String {
    let start = input[..position]
        .char_indices()
        .rev()
        .nth(CONTEXT_RADIUS - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let end = input[position..]
        .char_indices()
        .nth(CONTEXT_RADIUS)
        .map(|(i, _)| position + i)
        .unwrap_or(input.len());
    input[start..end].to_string()
}

pub mod msg {
    pub fn unmatched_close(c: char) -> String {
        format!("Unmatched closing `{c}`")
    }

    pub fn unclosed_open(c: char) -> String {
        format!("Unclosed `{c}`")
    }

    pub fn mismatched_close(open: char, close: char) -> String {
        format!("`{close}` does not match the open `{open}`")
    }

    pub fn remove_or_open(open: char) -> String {
        format!("Remove it or add a matching `{open}` before it")
    }

    pub fn add_close(close: char) -> String {
        format!("Add a matching `{close}`")
    }

    pub fn unterminated_string() -> String {
        "Unterminated string literal".to_string()
    }

    pub fn close_string() -> String {
        "Add a closing `\"`".to_string()
    }

    pub fn trailing_operator(token: &str) -> String {
        format!("Filter ends with the operator `{token}`")
    }

    pub fn empty_section(section: &str) -> String {
        format!("Section `{section}` has no entries")
    }

    pub fn fill_or_remove_section() -> String {
        "Add entries after it or remove it".to_string()
    }

    pub fn leading_operator(token: &str) -> String {
        format!("Filter starts with the operator `{token}`")
    }

    pub fn dangling_not() -> String {
        "`not` has nothing to negate".to_string()
    }

    pub fn complete_or_remove() -> String {
        "Add an operand after it or remove it".to_string()
    }

    pub fn remove_leading() -> String {
        "Remove it or add an operand before it".to_string()
    }
}
