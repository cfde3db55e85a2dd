use qfilter_parser::ast::{Expr, Value};

use crate::{
    adapter::{Adapter, CompiledQuery, Part, Query, RenderContext, SqlQuery},
    errors::{msg, Error, Result},
};

use super::{
    dialect::Dialect,
    explain::inline,
    expr::{
        build::{cmp, strings, value},
        SqlExpr,
    },
    rendering::Render,
    standard::Standard,
    tree::{Join, Select},
};

/// Renders parametrized SQL with `?` placeholders.
#[derive(Debug)]
pub struct SqlAdapter {
    name: String,
    dialect: Box<dyn Dialect>,
    regex_operator: Option<String>,
}

impl Default for SqlAdapter {
    fn default() -> Self {
        Self::new(Standard)
    }
}

impl SqlAdapter {
    pub fn new(dialect: impl Dialect + 'static) -> Self {
        Self::with_dialect(Box::new(dialect))
    }

    /// For dialects picked at runtime, see [`super::dialect_by_name`].
    pub fn with_dialect(dialect: Box<dyn Dialect>) -> Self {
        Self {
            name: dialect.name().to_string(),
            dialect,
            regex_operator: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Uses `op` for regex matches instead of the process-wide operator.
    pub fn with_regex_operator(mut self, op: impl Into<String>) -> Self {
        self.regex_operator = Some(op.into());
        self
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    fn regex_op(&self) -> String {
        self.regex_operator
            .clone()
            .unwrap_or_else(|| self.dialect.regex_operator())
    }

    /// `relation` qualifies every field, as the conditions of a preload join need.
    pub fn condition(&self, expr: &Expr, relation: Option<&str>) -> SqlExpr {
        let field = |name: &str| {
            SqlExpr::atom(match relation {
                Some(table) => self.dialect.table_column(table, name),
                None => self.dialect.field(name),
            })
        };
        let arg = |v: &Value| value::placeholder(v.clone());

        match expr {
            Expr::Eq { field: f, value: Value::Null } => cmp::is_null(field(f)),
            Expr::Neq { field: f, value: Value::Null } => cmp::is_not_null(field(f)),
            Expr::Eq { field: f, value: v } => cmp::eq(field(f), arg(v)),
            Expr::Neq { field: f, value: v } => cmp::neq(field(f), arg(v)),
            Expr::Gt { field: f, value: v } => cmp::gt(field(f), arg(v)),
            Expr::Gte { field: f, value: v } => cmp::gte(field(f), arg(v)),
            Expr::Lt { field: f, value: v } => cmp::lt(field(f), arg(v)),
            Expr::Lte { field: f, value: v } => cmp::lte(field(f), arg(v)),
            Expr::Like { field: f, pattern } => {
                cmp::like(field(f), arg(&Value::from(pattern.as_str())))
            }
            Expr::ILike { field: f, pattern } => cmp::like(
                strings::lower(field(f)),
                strings::lower(arg(&Value::from(pattern.as_str()))),
            ),
            Expr::Regex { field: f, pattern } => cmp::comparison(
                field(f),
                &self.regex_op(),
                arg(&Value::from(pattern.as_str())),
            ),
            Expr::In { field: f, values } => cmp::in_list(field(f), values.clone()),
            Expr::NotIn { field: f, values } => cmp::not_in_list(field(f), values.clone()),
            Expr::Between { field: f, low, high } => cmp::between(field(f), arg(low), arg(high)),
            Expr::IsNull { field: f } => cmp::is_null(field(f)),
            Expr::NotNull { field: f } => cmp::is_not_null(field(f)),
            Expr::And(operands) => cmp::and(operands.iter().map(|e| self.condition(e, relation))),
            Expr::Or(operands) => cmp::or(operands.iter().map(|e| self.condition(e, relation))),
            Expr::Not(operand) => cmp::not(self.condition(operand, relation)),
        }
    }

    pub fn select(&self, query: &CompiledQuery, ctx: &RenderContext) -> Result<Select> {
        let table = ctx
            .table
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::AdapterMismatch(msg::no_table()))?;
        let joins = query
            .preloads
            .iter()
            .map(|(relation, exprs)| Join {
                table: relation.clone(),
                conditions: cmp::and(exprs.iter().map(|e| self.condition(e, Some(relation)))),
            })
            .collect();
        Ok(Select {
            columns: query.selected.clone(),
            joins,
            conditions: query
                .filter
                .as_ref()
                .map(|f| self.condition(f, None))
                .unwrap_or_default(),
            grouping: query.group_by.clone(),
            sorting: query.sort.clone(),
            limit: query.page.take,
            offset: query.page.skip,
            ..Select::from(table)
        })
    }

    fn render(
        &self,
        query: &CompiledQuery,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<SqlQuery> {
        let select = self.select(query, ctx)?;
        let rendered = match parts {
            Some(parts) => select.render_parts(parts, self.dialect()),
            None => select.render(self.dialect()),
        };
        Ok(SqlQuery {
            sql: rendered.content,
            args: rendered.args,
        })
    }
}

impl Adapter for SqlAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn render_sql(
        &self,
        query: &CompiledQuery,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<String> {
        self.render(query, ctx, parts).map(|q| q.sql)
    }

    fn render_query(
        &self,
        query: &CompiledQuery,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<Query> {
        self.render(query, ctx, parts).map(Query::Sql)
    }

    fn render_explain(
        &self,
        query: &CompiledQuery,
        ctx: &RenderContext,
        parts: Option<&[Part]>,
    ) -> Result<String> {
        let q = self.render(query, ctx, parts)?;
        Ok(inline(&q.sql, &q.args, self.dialect()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use qfilter_parser::{ast::Page, parse};

    use super::*;
    use crate::sql::Postgres;

    fn compiled(dsl: &str) -> CompiledQuery {
        let doc = parse(dsl);
        CompiledQuery {
            filter: doc.filter,
            sort: doc.sort,
            page: doc.page,
            preloads: doc.preloads,
            ..Default::default()
        }
    }

    fn render(dsl: &str) -> SqlQuery {
        let adapter = SqlAdapter::default().with_regex_operator("REGEXP");
        match adapter.render_query(&compiled(dsl), &RenderContext::table("t"), None) {
            Ok(Query::Sql(q)) => q,
            other => panic!("unexpected render result {other:?}"),
        }
    }

    #[test]
    fn test_comparisons() {
        let q = render("a=1 b!=2 c>3 d>=4 e<5 f<=6");
        assert_eq!(
            q.sql,
            "SELECT * FROM `t` WHERE (((((`a` = ? AND `b` <> ?) AND `c` > ?) AND `d` >= ?) \
             AND `e` < ?) AND `f` <= ?)"
        );
        assert_eq!(q.args.len(), 6);
    }

    #[test]
    fn test_null_equality() {
        let q = render("a=null or b!=null");
        assert_eq!(q.sql, "SELECT * FROM `t` WHERE (`a` IS NULL OR `b` IS NOT NULL)");
        assert!(q.args.is_empty());
    }

    #[test]
    fn test_patterns() {
        let q = render(r#"name=^"%ann%" and email.=^"%X%" and code=~"^a.+""#);
        assert_eq!(
            q.sql,
            "SELECT * FROM `t` WHERE ((`name` LIKE ? AND LOWER(`email`) LIKE LOWER(?)) \
             AND `code` REGEXP ?)"
        );
        assert_eq!(
            q.args,
            vec![Value::from("%ann%"), Value::from("%X%"), Value::from("^a.+")]
        );
    }

    #[test]
    fn test_negated_patterns() {
        let q = render(r#"name!=^"%ann%""#);
        assert_eq!(q.sql, "SELECT * FROM `t` WHERE NOT (`name` LIKE ?)");
    }

    #[test]
    fn test_sets_and_ranges() {
        let q = render("s<in>[1,2,3] and x<nin>[4] and p<bet>1..9 and d<null> and e<notnull>");
        assert_eq!(
            q.sql,
            "SELECT * FROM `t` WHERE ((((`s` IN (?, ?, ?) AND `x` NOT IN (?)) \
             AND `p` BETWEEN ? AND ?) AND `d` IS NULL) AND `e` IS NOT NULL)"
        );
        assert_eq!(q.args.len(), 6);
    }

    #[test]
    fn test_empty_set_renders_nothing() {
        let q = render("s<in>[] and a=1");
        assert_eq!(q.sql, "SELECT * FROM `t` WHERE `a` = ?");
        assert_eq!(render("s<in>[]").sql, "SELECT * FROM `t`");
    }

    #[test]
    fn test_preload_join() {
        let q = render(r#"id>5 load=[orders:status="open" | items]"#);
        assert_eq!(
            q.sql,
            "SELECT * FROM `t` JOIN `orders` ON `orders`.`status` = ? JOIN `items` ON 1=1 \
             WHERE `id` > ?"
        );
        assert_eq!(q.args, vec![Value::from("open"), Value::Int(5)]);
    }

    #[test]
    fn test_paging() {
        let mut query = compiled("a=1");
        query.page = Page { skip: 20, take: 0 };
        let sql = SqlAdapter::default()
            .render_sql(&query, &RenderContext::table("t"), None)
            .unwrap();
        assert_eq!(sql, "SELECT * FROM `t` WHERE `a` = ? OFFSET 20");
    }

    #[test]
    fn test_no_table() {
        let result = SqlAdapter::default().render_sql(&compiled("a=1"), &RenderContext::default(), None);
        assert_eq!(result, Err(Error::AdapterMismatch(msg::no_table())));
    }

    #[test]
    fn test_explain() {
        let sql = SqlAdapter::new(Postgres)
            .render_explain(
                &compiled(r#"name="O'Brien" and age>30"#),
                &RenderContext::table("people"),
                None,
            )
            .unwrap();
        assert_eq!(
            sql,
            r#"SELECT * FROM "people" WHERE ("name" = 'O''Brien' AND "age" > 30)"#
        );
    }

    #[test]
    fn test_parts() {
        let parts = Part::parse_list("where, order by, limit");
        let sql = SqlAdapter::default()
            .render_sql(
                &compiled("a=1 sort=a:desc page=take:5"),
                &RenderContext::table("t"),
                Some(&parts),
            )
            .unwrap();
        assert_eq!(sql, "WHERE `a` = ? ORDER BY `a` DESC LIMIT 5");
    }
}
