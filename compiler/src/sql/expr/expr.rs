use std::fmt::{Display, Formatter};

use qfilter_parser::ast::Value;

/// A fragment of SQL together with the arguments of its `?` placeholders, in textual order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SqlExpr {
    pub content: String,
    pub args: Vec<Value>,
}

impl SqlExpr {
    pub fn empty() -> SqlExpr {
        SqlExpr::default()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Text without arguments: identifiers, keywords, inlined numbers.
    pub fn atom(content: impl Into<String>) -> SqlExpr {
        SqlExpr {
            content: content.into(),
            args: vec![],
        }
    }

    pub fn placeholder(value: Value) -> SqlExpr {
        SqlExpr {
            content: "?".to_string(),
            args: vec![value],
        }
    }

    pub fn parenthesize(self) -> SqlExpr {
        SqlExpr {
            content: format!("({})", self.content),
            args: self.args,
        }
    }

    /// Joins non-empty fragments with `separator`, concatenating their arguments in the same
    /// order.
    pub fn join(parts: impl IntoIterator<Item = SqlExpr>, separator: &str) -> SqlExpr {
        let mut joined = SqlExpr::empty();
        for part in parts.into_iter().filter(|p| !p.is_empty()) {
            if !joined.is_empty() {
                joined.content.push_str(separator);
            }
            joined.content.push_str(&part.content);
            joined.args.extend(part.args);
        }
        joined
    }

    /// Number of `?` placeholders outside quoted spans.
    pub fn placeholder_count(&self) -> usize {
        crate::sql::explain::placeholders(&self.content).count()
    }
}

impl Display for SqlExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}
