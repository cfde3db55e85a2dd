use itertools::Itertools;
use qfilter_parser::ast::Value;

use super::SqlExpr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conjunction {
    And,
    Or,
}

fn binary_op(a: SqlExpr, op: &str, b: SqlExpr) -> SqlExpr {
    SqlExpr::join([a, SqlExpr::atom(op), b], " ")
}

fn sql_func(name: &str, args: impl IntoIterator<Item = SqlExpr>) -> SqlExpr {
    let inner = SqlExpr::join(args, ", ");
    SqlExpr {
        content: format!("{name}({})", inner.content),
        args: inner.args,
    }
}

fn placeholders(values: Vec<Value>) -> SqlExpr {
    SqlExpr::join(values.into_iter().map(value::placeholder), ", ").parenthesize()
}

pub mod cmp {
    use super::*;

    /// A set of conditions joined by `AND` or `OR`. Empty conditions are skipped; two or more
    /// remaining ones are always parenthesized.
    pub fn condition_set(
        conditions: impl IntoIterator<Item = SqlExpr>,
        conjunction: Conjunction,
    ) -> SqlExpr {
        let separator = match conjunction {
            Conjunction::And => " AND ",
            Conjunction::Or => " OR ",
        };
        let mut conditions = conditions
            .into_iter()
            .filter(|c| !c.is_empty())
            .collect_vec();
        match conditions.len() {
            0 => SqlExpr::empty(),
            1 => conditions.remove(0),
            _ => SqlExpr::join(conditions, separator).parenthesize(),
        }
    }

    pub fn and(conditions: impl IntoIterator<Item = SqlExpr>) -> SqlExpr {
        condition_set(conditions, Conjunction::And)
    }

    pub fn or(conditions: impl IntoIterator<Item = SqlExpr>) -> SqlExpr {
        condition_set(conditions, Conjunction::Or)
    }

    pub fn not(a: SqlExpr) -> SqlExpr {
        if a.is_empty() {
            return a;
        }
        let inner = a.parenthesize();
        SqlExpr {
            content: format!("NOT {}", inner.content),
            args: inner.args,
        }
    }

    pub fn comparison(a: SqlExpr, op: &str, b: SqlExpr) -> SqlExpr {
        binary_op(a, op, b)
    }

    pub fn eq(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, "=", b)
    }

    pub fn neq(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, "<>", b)
    }

    pub fn gt(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, ">", b)
    }

    pub fn gte(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, ">=", b)
    }

    pub fn lt(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, "<", b)
    }

    pub fn lte(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, "<=", b)
    }

    pub fn like(a: SqlExpr, b: SqlExpr) -> SqlExpr {
        comparison(a, "LIKE", b)
    }

    /// Empty lists render nothing, which the surrounding condition set then skips.
    pub fn in_list(a: SqlExpr, values: Vec<Value>) -> SqlExpr {
        if values.is_empty() {
            return SqlExpr::empty();
        }
        comparison(a, "IN", placeholders(values))
    }

    pub fn not_in_list(a: SqlExpr, values: Vec<Value>) -> SqlExpr {
        if values.is_empty() {
            return SqlExpr::empty();
        }
        comparison(a, "NOT IN", placeholders(values))
    }

    pub fn between(a: SqlExpr, low: SqlExpr, high: SqlExpr) -> SqlExpr {
        SqlExpr::join([a, SqlExpr::atom("BETWEEN"), low, SqlExpr::atom("AND"), high], " ")
    }

    pub fn is_null(a: SqlExpr) -> SqlExpr {
        SqlExpr::join([a, SqlExpr::atom("IS NULL")], " ")
    }

    pub fn is_not_null(a: SqlExpr) -> SqlExpr {
        SqlExpr::join([a, SqlExpr::atom("IS NOT NULL")], " ")
    }
}

pub mod strings {
    use super::*;

    pub fn lower(a: SqlExpr) -> SqlExpr {
        sql_func("LOWER", [a])
    }
}

pub mod value {
    use super::*;

    pub fn placeholder(v: Value) -> SqlExpr {
        SqlExpr::placeholder(v)
    }

    pub fn always_true() -> SqlExpr {
        SqlExpr::atom("1=1")
    }
}
