mod parser;

pub mod ast;
pub mod error;
pub mod tokens;
pub mod validate;

pub use error::{ParseError, RepairError};
pub use parser::lexer::{tokenize, Token};
pub use parser::values::parse_date;
pub use validate::{diagnose, repair, repair_checked, validate};

use ast::{Document, Expr};

/// Parses filter text leniently. Never fails: whatever cannot be understood is dropped.
pub fn parse(input: &str) -> ast::Document {
    parser::Parser::new(input).parse()
}

/// Parses only after the text passes every structural check.
pub fn parse_strict(input: &str) -> Result<Document, ParseError> {
    validate(input)?;
    Ok(parse(input))
}

/// The filter expression alone, ignoring sort, page and load sections.
pub fn parse_filter(input: &str) -> Option<Expr> {
    parse(input).filter
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{Page, SortEntry, Value};

    #[test]
    fn test_parse_document() {
        let doc = parse(
            r#"(id=1 and vendorId="22") and bank_id=11 or expedition_type=^"%e%" sort=id:desc page=skip:0,take:10"#,
        );
        assert_eq!(doc.sort, vec![SortEntry::desc("id")]);
        assert_eq!(doc.page, Page { skip: 0, take: 10 });
        let filter = doc.filter.map(|f| f.to_string());
        assert_eq!(
            filter.as_deref(),
            Some(r#"(((id=1 and vendorId="22") and bank_id=11) or expedition_type=^"%e%")"#)
        );
    }

    #[test]
    fn test_parse_strict() {
        assert!(parse_strict("a=1 and").is_err());
        assert_eq!(
            parse_strict("a=1").map(|d| d.filter),
            Ok(Some(Expr::Eq {
                field: "a".to_string(),
                value: Value::Int(1)
            }))
        );
    }

    #[test]
    fn test_never_panics_on_odd_input() {
        for input in [
            "(((", ")))", "\"", "\\", "load=[", "load=[|||]", "sort=", "page=", "<in>", "a<in>[",
            "a<bet>(", "a<bet>..", "=", "é<ü>ö", "not not not", "a=1 load=[b:load=[c:x=1]]",
        ] {
            let _ = parse(input);
            let _ = repair_checked(input);
        }
    }
}
