use log::debug;
use regex::Regex;

use crate::ast::{Expr, Operator};

use super::utils::QuoteScanner;
use super::values;

/// Locates the comparison operator of an atom: the earliest offset outside quotes where any
/// operator starts. When several operators start at that offset, the first in
/// [`Operator::TABLE`] wins, so `!=~` beats `!=` and `>=` beats `>`.
pub fn find_operator(text: &str) -> Option<(Operator, usize)> {
    QuoteScanner::new(text)
        .filter(|&(pos, _, structural)| structural && text.is_char_boundary(pos))
        .find_map(|(pos, _, _)| {
            Operator::TABLE
                .iter()
                .find(|op| text[pos..].starts_with(op.symbol()))
                .map(|op| (*op, pos))
        })
}

/// The operator a token starts with, if any.
pub fn leading_operator(text: &str) -> Option<Operator> {
    match find_operator(text) {
        Some((op, 0)) => Some(op),
        _ => None,
    }
}

/// Builds the expression for `field <op> rhs`. Returns `None` when the right-hand side does
/// not fit the operator.
pub fn build(op: Operator, field: String, rhs: &str) -> Option<Expr> {
    let expr = match op {
        Operator::Null => Expr::IsNull { field },
        Operator::NotNull => Expr::NotNull { field },
        Operator::Like => Expr::Like {
            field,
            pattern: values::pattern(rhs)?,
        },
        Operator::NotLike => Expr::not(Expr::Like {
            field,
            pattern: values::pattern(rhs)?,
        }),
        Operator::ILike => Expr::ILike {
            field,
            pattern: values::pattern(rhs)?,
        },
        Operator::Regex => Expr::Regex {
            field,
            pattern: regex_pattern(rhs)?,
        },
        Operator::NotRegex => Expr::not(Expr::Regex {
            field,
            pattern: regex_pattern(rhs)?,
        }),
        Operator::In => Expr::In {
            field,
            values: values::set(rhs)?,
        },
        Operator::NotIn => Expr::NotIn {
            field,
            values: values::set(rhs)?,
        },
        Operator::Between => {
            let (low, high) = values::range(rhs)?;
            Expr::Between { field, low, high }
        }
        Operator::Eq => Expr::Eq {
            field,
            value: values::scalar(rhs)?,
        },
        Operator::Neq => Expr::Neq {
            field,
            value: values::scalar(rhs)?,
        },
        Operator::Gt => Expr::Gt {
            field,
            value: values::scalar(rhs)?,
        },
        Operator::Gte => Expr::Gte {
            field,
            value: values::scalar(rhs)?,
        },
        Operator::Lt => Expr::Lt {
            field,
            value: values::scalar(rhs)?,
        },
        Operator::Lte => Expr::Lte {
            field,
            value: values::scalar(rhs)?,
        },
    };
    Some(expr)
}

fn regex_pattern(rhs: &str) -> Option<String> {
    let pattern = values::pattern(rhs)?;
    match Regex::new(&pattern) {
        Ok(_) => Some(pattern),
        Err(e) => {
            debug!("dropping invalid regex `{pattern}`: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Value;

    #[test]
    fn test_find_operator() {
        assert_eq!(find_operator("age>25"), Some((Operator::Gt, 3)));
        assert_eq!(find_operator("age>=25"), Some((Operator::Gte, 3)));
        assert_eq!(find_operator("a!=~x"), Some((Operator::NotRegex, 1)));
        assert_eq!(find_operator("a!=^x"), Some((Operator::NotLike, 1)));
        assert_eq!(find_operator("a!=x"), Some((Operator::Neq, 1)));
        assert_eq!(find_operator("a.=^x"), Some((Operator::ILike, 1)));
        assert_eq!(find_operator("a=^x"), Some((Operator::Like, 1)));
        assert_eq!(find_operator("s<nin>[1]"), Some((Operator::NotIn, 1)));
        assert_eq!(find_operator("d<notnull>"), Some((Operator::NotNull, 1)));
        assert_eq!(find_operator("d<null>"), Some((Operator::Null, 1)));
        assert_eq!(find_operator("p<bet>1..2"), Some((Operator::Between, 1)));
        assert_eq!(find_operator("p<=2"), Some((Operator::Lte, 1)));
        assert_eq!(find_operator(r#"name="a>b""#), Some((Operator::Eq, 4)));
        assert_eq!(find_operator(r#""x=y"<1"#), Some((Operator::Lt, 5)));
        assert_eq!(find_operator("plain"), None);
    }

    #[test]
    fn test_earliest_offset_wins() {
        assert_eq!(find_operator("a=b>c"), Some((Operator::Eq, 1)));
        assert_eq!(find_operator("user.name=x"), Some((Operator::Eq, 9)));
    }

    #[test]
    fn test_leading_operator() {
        assert_eq!(leading_operator(">25"), Some(Operator::Gt));
        assert_eq!(leading_operator("<in>"), Some(Operator::In));
        assert_eq!(leading_operator("a>1"), None);
    }

    #[test]
    fn test_build() {
        assert_eq!(
            build(Operator::NotLike, "n".to_string(), r#""%a%""#),
            Some(Expr::not(Expr::Like {
                field: "n".to_string(),
                pattern: "%a%".to_string()
            }))
        );
        assert_eq!(
            build(Operator::Regex, "n".to_string(), "^a.*$"),
            Some(Expr::Regex {
                field: "n".to_string(),
                pattern: "^a.*$".to_string()
            })
        );
        assert_eq!(build(Operator::Regex, "n".to_string(), "(unclosed"), None);
        assert_eq!(
            build(Operator::Null, "d".to_string(), ""),
            Some(Expr::IsNull {
                field: "d".to_string()
            })
        );
        assert_eq!(build(Operator::Eq, "a".to_string(), ""), None);
        assert_eq!(
            build(Operator::Gte, "a".to_string(), "1.5"),
            Some(Expr::Gte {
                field: "a".to_string(),
                value: Value::Float(1.5)
            })
        );
        assert_eq!(build(Operator::Between, "p".to_string(), "1"), None);
    }
}
