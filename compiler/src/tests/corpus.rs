use pretty_assertions::assert_eq;
use qfilter_parser::ast::Value;

use super::test_utils::sql_query;
use crate::{Compiler, POSTGRES_ADAPTER, SQL_ADAPTER};

enum Expected {
    Exact(&'static str),
    Contains(&'static [&'static str]),
}

struct Case {
    name: &'static str,
    dsl: &'static str,
    adapter: &'static str,
    table: &'static str,
    ignore: &'static [&'static str],
    sql: Expected,
    args: Vec<Value>,
}

impl Default for Case {
    fn default() -> Self {
        Case {
            name: "",
            dsl: "",
            adapter: SQL_ADAPTER,
            table: "t",
            ignore: &[],
            sql: Expected::Exact(""),
            args: vec![],
        }
    }
}

fn s(v: &str) -> Value {
    Value::from(v)
}

fn cases() -> Vec<Case> {
    vec![
        Case {
            name: "simple comparison",
            dsl: "id=1",
            sql: Expected::Exact("SELECT * FROM `t` WHERE `id` = ?"),
            args: vec![Value::Int(1)],
            ..Default::default()
        },
        Case {
            name: "and binds tighter than or",
            dsl: "a=1 and b=2 or c=3",
            sql: Expected::Exact("SELECT * FROM `t` WHERE ((`a` = ? AND `b` = ?) OR `c` = ?)"),
            args: vec![Value::Int(1), Value::Int(2), Value::Int(3)],
            ..Default::default()
        },
        Case {
            name: "parentheses override precedence",
            dsl: "a=1 and (b=2 or c=3)",
            sql: Expected::Exact("SELECT * FROM `t` WHERE (`a` = ? AND (`b` = ? OR `c` = ?))"),
            args: vec![Value::Int(1), Value::Int(2), Value::Int(3)],
            ..Default::default()
        },
        Case {
            name: "composite with every section",
            dsl: r#"(id=1 and vendorId="22") and bank_id=11 or expedition_type=^"%e%" sort=id:desc page=skip:0,take:10"#,
            table: "test_models",
            ignore: &["bank_id"],
            sql: Expected::Exact(
                "SELECT * FROM `test_models` WHERE ((`id` = ? AND `vendor_id` = ?) \
                 OR `expedition_type` LIKE ?) ORDER BY `id` DESC LIMIT 10",
            ),
            args: vec![Value::Int(1), s("22"), s("%e%")],
            ..Default::default()
        },
        Case {
            name: "between, null and set",
            dsl: "price<bet>(10..20) and deleted_at<null> and status<nin>[x,y]",
            sql: Expected::Contains(&[
                "`price` BETWEEN ? AND ?",
                "`deleted_at` IS NULL",
                "`status` NOT IN (?, ?)",
            ]),
            args: vec![Value::Int(10), Value::Int(20), s("x"), s("y")],
            ..Default::default()
        },
        Case {
            name: "preload with qualified condition",
            dsl: r#"load=[orders:status="shipped"] id>0"#,
            table: "users",
            sql: Expected::Exact(
                "SELECT * FROM `users` JOIN `orders` ON `orders`.`status` = ? WHERE `id` > ?",
            ),
            args: vec![s("shipped"), Value::Int(0)],
            ..Default::default()
        },
        Case {
            name: "empty filter selects the whole table",
            dsl: "",
            sql: Expected::Exact("SELECT * FROM `t`"),
            ..Default::default()
        },
        Case {
            name: "not over a group",
            dsl: "not (a=1 or b=2) and c<notnull>",
            sql: Expected::Exact(
                "SELECT * FROM `t` WHERE (NOT ((`a` = ? OR `b` = ?)) AND `c` IS NOT NULL)",
            ),
            args: vec![Value::Int(1), Value::Int(2)],
            ..Default::default()
        },
        Case {
            name: "case-insensitive like",
            dsl: r#"name.=^"%ann%""#,
            sql: Expected::Exact("SELECT * FROM `t` WHERE LOWER(`name`) LIKE LOWER(?)"),
            args: vec![s("%ann%")],
            ..Default::default()
        },
        Case {
            name: "postgres quoting",
            dsl: r#"firstName="Ann" sort=lastName page=skip:5"#,
            adapter: POSTGRES_ADAPTER,
            table: "people",
            sql: Expected::Exact(
                r#"SELECT * FROM "people" WHERE "first_name" = ? ORDER BY "last_name" ASC OFFSET 5"#,
            ),
            args: vec![s("Ann")],
            ..Default::default()
        },
        Case {
            name: "ignored field in sort and preload",
            dsl: r#"a=1 sort=secret:desc,a load=[orders:secret=2|items]"#,
            ignore: &["secret"],
            sql: Expected::Exact(
                "SELECT * FROM `t` JOIN `orders` ON 1=1 JOIN `items` ON 1=1 WHERE `a` = ? \
                 ORDER BY `a` ASC",
            ),
            args: vec![Value::Int(1)],
            ..Default::default()
        },
    ]
}

fn run(case: &Case) {
    let compiler = Compiler::default();
    compiler.set_ignored_fields(case.ignore.iter().copied());
    if let Err(e) = compiler.parse(case.dsl) {
        panic!("case `{}` failed to parse: {e}", case.name);
    }
    let query = sql_query(&compiler, case.adapter, case.table);
    match &case.sql {
        Expected::Exact(sql) => assert_eq!(&query.sql, sql, "case `{}`", case.name),
        Expected::Contains(fragments) => {
            for fragment in fragments.iter() {
                assert!(
                    query.sql.contains(fragment),
                    "case `{}`: `{}` does not contain `{fragment}`",
                    case.name,
                    query.sql
                );
            }
        }
    }
    assert_eq!(query.args, case.args, "case `{}`", case.name);
}

#[test]
fn test_corpus() {
    for case in cases() {
        run(&case);
    }
}
