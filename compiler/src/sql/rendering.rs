use itertools::Itertools;
use log::trace;
use qfilter_parser::ast::SortDirection;

use crate::adapter::Part;

use super::{
    dialect::Dialect,
    expr::build::value,
    tree::{Join, Select, SqlExpr},
};

pub trait Render {
    fn render(&self, dialect: &dyn Dialect) -> SqlExpr;
}

impl Render for Join {
    fn render(&self, dialect: &dyn Dialect) -> SqlExpr {
        let conditions = if self.conditions.is_empty() {
            value::always_true()
        } else {
            self.conditions.clone()
        };
        let head = SqlExpr::atom(format!(
            "JOIN {} ON",
            dialect.quote_identifier(&self.table)
        ));
        SqlExpr::join([head, conditions], " ")
    }
}

impl Render for Vec<Join> {
    fn render(&self, dialect: &dyn Dialect) -> SqlExpr {
        SqlExpr::join(self.iter().map(|j| j.render(dialect)), " ")
    }
}

impl Select {
    /// One part of the statement; empty when the statement has nothing for it.
    pub fn render_part(&self, part: &Part, dialect: &dyn Dialect) -> SqlExpr {
        let fields = |names: &[String]| names.iter().map(|n| dialect.field(n)).join(", ");
        match part {
            Part::Select if self.columns.is_empty() => SqlExpr::atom("SELECT *"),
            Part::Select => SqlExpr::atom(format!("SELECT {}", fields(&self.columns))),
            Part::From => SqlExpr::atom(format!("FROM {}", dialect.quote_identifier(&self.table))),
            Part::Join => self.joins.render(dialect),
            Part::Where if self.conditions.is_empty() => SqlExpr::empty(),
            Part::Where => SqlExpr::join([SqlExpr::atom("WHERE"), self.conditions.clone()], " "),
            Part::GroupBy if self.grouping.is_empty() => SqlExpr::empty(),
            Part::GroupBy => SqlExpr::atom(format!("GROUP BY {}", fields(&self.grouping))),
            Part::OrderBy if self.sorting.is_empty() => SqlExpr::empty(),
            Part::OrderBy => {
                let entries = self
                    .sorting
                    .iter()
                    .map(|s| {
                        let direction = match s.direction {
                            SortDirection::Asc => "ASC",
                            SortDirection::Desc => "DESC",
                        };
                        format!("{} {direction}", dialect.field(&s.field))
                    })
                    .join(", ");
                SqlExpr::atom(format!("ORDER BY {entries}"))
            }
            Part::Limit if self.limit > 0 => SqlExpr::atom(format!("LIMIT {}", self.limit)),
            Part::Offset if self.offset > 0 => SqlExpr::atom(format!("OFFSET {}", self.offset)),
            Part::Limit | Part::Offset => SqlExpr::empty(),
            Part::Aggregate | Part::Find | Part::Unknown(_) => {
                trace!("SQL has no `{part}` part");
                SqlExpr::empty()
            }
        }
    }

    /// The given parts in the given order, separated by single spaces. Arguments follow the
    /// order in which their placeholders are emitted.
    pub fn render_parts(&self, parts: &[Part], dialect: &dyn Dialect) -> SqlExpr {
        SqlExpr::join(parts.iter().map(|p| self.render_part(p, dialect)), " ")
    }
}

impl Render for Select {
    fn render(&self, dialect: &dyn Dialect) -> SqlExpr {
        self.render_parts(&Part::SQL_DEFAULT, dialect)
    }
}
