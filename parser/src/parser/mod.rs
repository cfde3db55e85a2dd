pub mod lexer;
pub mod operators;
pub mod sections;
pub mod tree;
pub mod utils;
pub mod values;

use log::debug;

use crate::ast::{Document, Operator};
use crate::tokens::*;

use lexer::{Lexer, Token};
use tree::{Logic, Node};

/// Per-call parsing state. The stack holds one node list per open parenthesis, with the root
/// list at the bottom.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    stack: Vec<Vec<Node>>,
    document: Document,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            lexer: Lexer::new(input),
            stack: vec![Vec::new()],
            document: Document::default(),
        }
    }

    pub fn parse(mut self) -> Document {
        while let Some(token) = self.lexer.next() {
            self.step(token);
        }
        while self.stack.len() > 1 {
            self.close_group();
        }
        let root = self.stack.pop().unwrap_or_default();
        self.document.filter = tree::assemble(root);
        self.document
    }

    fn step(&mut self, token: Token<'a>) {
        if token.is_group_open() {
            self.stack.push(Vec::new());
            return;
        }
        if token.is_group_close() {
            if self.stack.len() > 1 {
                self.close_group();
            } else {
                debug!("ignoring unmatched `)` at {}", token.start);
            }
            return;
        }
        match token.text {
            KEYWORD_AND => self.push(Node::Logic(Logic::And)),
            KEYWORD_OR => self.push(Node::Logic(Logic::Or)),
            KEYWORD_NOT => self.push(Node::Logic(Logic::Not)),
            text if text.starts_with(SECTION_LOAD) => self.load(token),
            text if text.starts_with(SECTION_SORT) => {
                let entries = sections::sort(&text[SECTION_SORT.len()..]);
                self.document.sort.extend(entries);
            }
            text if text.starts_with(SECTION_PAGE) => {
                sections::apply_page(&mut self.document.page, &text[SECTION_PAGE.len()..]);
            }
            _ => self.atom(token),
        }
    }

    fn push(&mut self, node: Node) {
        if let Some(current) = self.stack.last_mut() {
            current.push(node);
        }
    }

    fn close_group(&mut self) {
        if let Some(children) = self.stack.pop() {
            self.push(Node::Group(children));
        }
    }

    /// Cuts the bracketed block out of the raw input, parses each section as a filter of its
    /// own and resumes lexing after the closing bracket.
    fn load(&mut self, token: Token<'a>) {
        let input = self.lexer.input();
        let open = token.start + SECTION_LOAD.len() - 1;
        let (body, resume) = match utils::block_end(input, open) {
            Some(end) => (&input[open + 1..end - 1], end),
            None => {
                debug!("load block at {} is never closed", token.start);
                (&input[open + 1..], input.len())
            }
        };
        self.lexer.seek(resume);

        for section in sections::load_sections(body) {
            let filters = self
                .document
                .preloads
                .entry(section.relation.to_string())
                .or_default();
            let Some(text) = section.filter else {
                continue;
            };
            let nested = Parser::new(text).parse();
            if !nested.sort.is_empty() || !nested.page.is_empty() || !nested.preloads.is_empty() {
                debug!(
                    "ignoring sort, page and load sections inside preload `{}`",
                    section.relation
                );
            }
            filters.extend(nested.filter);
        }
    }

    /// Reads one comparison, pulling in following tokens when the operator or the value was
    /// separated from the field by whitespace.
    fn atom(&mut self, token: Token<'a>) {
        let input = self.lexer.input();

        let (op, op_start, carrier) = match operators::find_operator(token.text) {
            Some((op, offset)) => (op, token.start + offset, token),
            None => {
                let next = self.lexer.peek().and_then(|next| {
                    operators::leading_operator(next.text).map(|op| (op, next))
                });
                match next {
                    Some((op, next)) => {
                        self.lexer.next();
                        (op, next.start, next)
                    }
                    None => {
                        debug!("dropping `{}`: no comparison operator", token.text);
                        return;
                    }
                }
            }
        };

        let Some(field) = field_name(&input[token.start..op_start]) else {
            debug!("dropping comparison at {}: missing field", token.start);
            return;
        };

        let op_end = op_start + op.symbol().len();
        let rhs = if !op.takes_value() {
            ""
        } else if op_end < carrier.end() {
            let end = self.gather_list(op, op_end, carrier.end());
            &input[op_end..end]
        } else {
            match self.value_after_operator(op) {
                Some((start, end)) => &input[start..end],
                None => {
                    debug!("dropping `{field}{}`: missing value", op.symbol());
                    return;
                }
            }
        };

        match operators::build(op, field.clone(), rhs) {
            Some(expr) => self.push(Node::Expr(expr)),
            None => debug!("dropping `{field}{}{rhs}`: invalid value", op.symbol()),
        }
    }

    /// The span of the value when it starts in a later token (`age> 25`).
    fn value_after_operator(&mut self, op: Operator) -> Option<(usize, usize)> {
        let next = self.lexer.peek()?;
        if next.is_group_open() {
            if !(op.is_set() || op == Operator::Between) {
                return None;
            }
            self.lexer.next();
            return Some((next.start, self.gather_group()));
        }
        if next.is_group_close() || is_keyword(next.text) {
            return None;
        }
        self.lexer.next();
        Some((next.start, self.gather_list(op, next.start, next.end())))
    }

    /// Consumes tokens up to the parenthesis closing an already consumed `(`, returning the
    /// offset just past it.
    fn gather_group(&mut self) -> usize {
        let mut depth = 1;
        let mut end = self.lexer.input().len();
        for token in self.lexer.by_ref() {
            if token.is_group_open() {
                depth += 1;
            } else if token.is_group_close() {
                depth -= 1;
            }
            end = token.end();
            if depth == 0 {
                break;
            }
        }
        end
    }

    /// Set values may be spread over several tokens (`[1, 2, 3]`); keeps consuming until the
    /// brackets balance.
    fn gather_list(&mut self, op: Operator, start: usize, mut end: usize) -> usize {
        if !op.is_set() {
            return end;
        }
        let input = self.lexer.input();
        while utils::bracket_balance(&input[start..end]) > 0 {
            match self.lexer.peek() {
                Some(next) if !next.is_group_open() && !next.is_group_close() => {
                    self.lexer.next();
                    end = next.end();
                }
                _ => break,
            }
        }
        end
    }
}

fn is_keyword(text: &str) -> bool {
    matches!(text, KEYWORD_AND | KEYWORD_OR | KEYWORD_NOT)
}

/// The left-hand side of a comparison, unquoted when written as a string literal.
fn field_name(text: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.starts_with(STRING_QUOTE) {
        return utils::unquote(text).filter(|f| !f.is_empty());
    }
    Some(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Expr, Page, SortEntry, Value};
    use pretty_assertions::assert_eq;

    fn parse(input: &str) -> Document {
        Parser::new(input).parse()
    }

    fn filter(input: &str) -> Option<Expr> {
        parse(input).filter
    }

    fn cmp(field: &str, value: impl Into<Value>) -> Expr {
        Expr::Eq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    fn gt(field: &str, value: impl Into<Value>) -> Expr {
        Expr::Gt {
            field: field.to_string(),
            value: value.into(),
        }
    }

    #[test]
    fn test_simple() {
        assert_eq!(filter("id=1"), Some(cmp("id", 1)));
        assert_eq!(filter(""), None);
        assert_eq!(parse("   "), Document::default());
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            filter("a=1 and b=2 or c=3"),
            Some(Expr::Or(vec![
                Expr::And(vec![cmp("a", 1), cmp("b", 2)]),
                cmp("c", 3)
            ]))
        );
        assert_eq!(
            filter("a=1 and (b=2 or c=3)"),
            Some(Expr::And(vec![
                cmp("a", 1),
                Expr::Or(vec![cmp("b", 2), cmp("c", 3)])
            ]))
        );
        assert_eq!(
            filter("not a=1 or not (b=2)"),
            Some(Expr::Or(vec![
                Expr::not(cmp("a", 1)),
                Expr::not(cmp("b", 2))
            ]))
        );
    }

    #[test]
    fn test_spaced_operator_and_value() {
        assert_eq!(filter("age > 25"), Some(gt("age", 25)));
        assert_eq!(filter("age >25"), Some(gt("age", 25)));
        assert_eq!(filter("age> 25"), Some(gt("age", 25)));
        assert_eq!(
            filter("age > 25 and name = \"x y\""),
            Some(Expr::And(vec![gt("age", 25), cmp("name", "x y")]))
        );
    }

    #[test]
    fn test_missing_value_is_dropped() {
        assert_eq!(filter("a= and b=2"), Some(cmp("b", 2)));
        assert_eq!(filter("a>"), None);
        assert_eq!(filter("=5 b=2"), Some(cmp("b", 2)));
        assert_eq!(filter("name"), None);
    }

    #[test]
    fn test_sets() {
        let status = |values: Vec<Value>| Expr::In {
            field: "status".to_string(),
            values,
        };
        let expected = Some(status(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
        assert_eq!(filter("status<in>[1,2,3]"), expected);
        assert_eq!(filter("status<in>[1, 2, 3]"), expected);
        assert_eq!(filter("status <in> [1, 2, 3]"), expected);
        assert_eq!(filter("status<in>(1,2,3)"), expected);
        assert_eq!(filter("status<in>1,2,3"), expected);
        assert_eq!(
            filter("status<nin>[x,y] and a=1"),
            Some(Expr::And(vec![
                Expr::NotIn {
                    field: "status".to_string(),
                    values: vec![Value::from("x"), Value::from("y")],
                },
                cmp("a", 1)
            ]))
        );
    }

    #[test]
    fn test_between_and_null() {
        assert_eq!(
            filter("price<bet>(10..20) and deleted_at<null>"),
            Some(Expr::And(vec![
                Expr::Between {
                    field: "price".to_string(),
                    low: Value::Int(10),
                    high: Value::Int(20),
                },
                Expr::IsNull {
                    field: "deleted_at".to_string()
                }
            ]))
        );
        assert_eq!(
            filter("price <bet> 1.5..2"),
            Some(Expr::Between {
                field: "price".to_string(),
                low: Value::Float(1.5),
                high: Value::Int(2),
            })
        );
        assert_eq!(
            filter("d<notnull> e=1"),
            Some(Expr::And(vec![
                Expr::NotNull {
                    field: "d".to_string()
                },
                cmp("e", 1)
            ]))
        );
    }

    #[test]
    fn test_patterns() {
        assert_eq!(
            filter(r#"expedition_type=^"%e%""#),
            Some(Expr::Like {
                field: "expedition_type".to_string(),
                pattern: "%e%".to_string(),
            })
        );
        assert_eq!(
            filter("name.=^jo%"),
            Some(Expr::ILike {
                field: "name".to_string(),
                pattern: "jo%".to_string(),
            })
        );
        assert_eq!(
            filter(r#"name!=~"^a""#),
            Some(Expr::not(Expr::Regex {
                field: "name".to_string(),
                pattern: "^a".to_string(),
            }))
        );
        assert_eq!(filter(r#"name=~"(" and a=1"#), Some(cmp("a", 1)));
    }

    #[test]
    fn test_sort_and_page() {
        let doc = parse("sort=id:desc a=1 page=skip:0,take:10 sort=name");
        assert_eq!(doc.filter, Some(cmp("a", 1)));
        assert_eq!(doc.sort, vec![SortEntry::desc("id"), SortEntry::asc("name")]);
        assert_eq!(doc.page, Page { skip: 0, take: 10 });

        assert_eq!(parse("page=skip:-4,take:-1").page, Page::default());
    }

    #[test]
    fn test_load() {
        let doc = parse(r#"load=[orders:status="shipped"] id>0"#);
        assert_eq!(doc.filter, Some(gt("id", 0)));
        assert_eq!(
            doc.preloads.get("orders"),
            Some(&vec![cmp("status", "shipped")])
        );

        let doc = parse("load=[a:x=1 and (y=2 or z=3) | b | a:w<in>[1, 2]]id=1");
        assert_eq!(doc.filter, Some(cmp("id", 1)));
        assert_eq!(doc.preloads.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(doc.preloads["a"].len(), 2);
        assert!(doc.preloads["b"].is_empty());

        let doc = parse("id=1 load=[a:x=1");
        assert_eq!(doc.filter, Some(cmp("id", 1)));
        assert_eq!(doc.preloads["a"], vec![cmp("x", 1)]);
    }

    #[test]
    fn test_unbalanced_parens() {
        assert_eq!(
            filter("(a=1 and (b=2"),
            Some(Expr::And(vec![cmp("a", 1), cmp("b", 2)]))
        );
        assert_eq!(
            filter("a=1) or b=2"),
            Some(Expr::Or(vec![cmp("a", 1), cmp("b", 2)]))
        );
    }

    #[test]
    fn test_quoted_field() {
        assert_eq!(filter(r#""first name"="Ann""#), Some(cmp("first name", "Ann")));
    }

    #[test]
    fn test_display_round_trip() {
        let text = r#"((a=1 and b="x \"y\"") or not (c<in>[1,"two",null])) sort=a:desc page=skip:2,take:5 load=[r:q<bet>1..2|s]"#;
        let doc = parse(text);
        assert_eq!(doc.to_string(), text);
        assert_eq!(parse(&doc.to_string()), doc);
    }
}
