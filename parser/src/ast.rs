use std::fmt::{self, Display, Formatter, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::tokens::*;

/// Relationship name → filters applying to the joined entity. Insertion order is kept so that
/// renderers emit joins in the order the caller wrote them.
pub type Preloads = IndexMap<String, Vec<Expr>>;

/// Everything one parse of a filter string produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub filter: Option<Expr>,
    pub sort: Vec<SortEntry>,
    pub page: Page,
    pub preloads: Preloads,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.filter.is_none()
            && self.sort.is_empty()
            && self.page.is_empty()
            && self.preloads.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Timestamp(DateTime<Utc>),
    Null,
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

/// A filter expression. Leaf variants name the field they test; `And`/`Or`/`Not` combine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Eq { field: String, value: Value },
    Neq { field: String, value: Value },
    Gt { field: String, value: Value },
    Gte { field: String, value: Value },
    Lt { field: String, value: Value },
    Lte { field: String, value: Value },
    Like { field: String, pattern: String },
    ILike { field: String, pattern: String },
    Regex { field: String, pattern: String },
    In { field: String, values: Vec<Value> },
    NotIn { field: String, values: Vec<Value> },
    Between { field: String, low: Value, high: Value },
    IsNull { field: String },
    NotNull { field: String },
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

impl Expr {
    /// Builds a conjunction, collapsing it when fewer than two operands remain.
    pub fn and(operands: Vec<Expr>) -> Option<Expr> {
        Self::combine(operands, Expr::And)
    }

    /// Builds a disjunction, collapsing it when fewer than two operands remain.
    pub fn or(operands: Vec<Expr>) -> Option<Expr> {
        Self::combine(operands, Expr::Or)
    }

    pub fn not(operand: Expr) -> Expr {
        Expr::Not(Box::new(operand))
    }

    fn combine(mut operands: Vec<Expr>, build: fn(Vec<Expr>) -> Expr) -> Option<Expr> {
        match operands.len() {
            0 => None,
            1 => operands.pop(),
            _ => Some(build(operands)),
        }
    }

    /// The field tested by a leaf expression. Combinators have none.
    pub fn field(&self) -> Option<&str> {
        match self {
            Expr::Eq { field, .. }
            | Expr::Neq { field, .. }
            | Expr::Gt { field, .. }
            | Expr::Gte { field, .. }
            | Expr::Lt { field, .. }
            | Expr::Lte { field, .. }
            | Expr::Like { field, .. }
            | Expr::ILike { field, .. }
            | Expr::Regex { field, .. }
            | Expr::In { field, .. }
            | Expr::NotIn { field, .. }
            | Expr::Between { field, .. }
            | Expr::IsNull { field }
            | Expr::NotNull { field } => Some(field),
            Expr::And(_) | Expr::Or(_) | Expr::Not(_) => None,
        }
    }

    fn field_mut(&mut self) -> Option<&mut String> {
        match self {
            Expr::Eq { field, .. }
            | Expr::Neq { field, .. }
            | Expr::Gt { field, .. }
            | Expr::Gte { field, .. }
            | Expr::Lt { field, .. }
            | Expr::Lte { field, .. }
            | Expr::Like { field, .. }
            | Expr::ILike { field, .. }
            | Expr::Regex { field, .. }
            | Expr::In { field, .. }
            | Expr::NotIn { field, .. }
            | Expr::Between { field, .. }
            | Expr::IsNull { field }
            | Expr::NotNull { field } => Some(field),
            Expr::And(_) | Expr::Or(_) | Expr::Not(_) => None,
        }
    }

    /// All fields referenced anywhere in the tree, in traversal order.
    pub fn fields(&self) -> Vec<&str> {
        let mut fields = Vec::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, fields: &mut Vec<&'a str>) {
        match self {
            Expr::And(operands) | Expr::Or(operands) => {
                operands.iter().for_each(|e| e.collect_fields(fields))
            }
            Expr::Not(operand) => operand.collect_fields(fields),
            leaf => fields.extend(leaf.field()),
        }
    }

    /// Removes every leaf whose field fails `keep`. Combinators left without operands disappear
    /// and combinators left with a single operand are replaced by it.
    pub fn prune(self, keep: &impl Fn(&str) -> bool) -> Option<Expr> {
        match self {
            Expr::And(operands) => {
                Expr::and(operands.into_iter().filter_map(|e| e.prune(keep)).collect())
            }
            Expr::Or(operands) => {
                Expr::or(operands.into_iter().filter_map(|e| e.prune(keep)).collect())
            }
            Expr::Not(operand) => operand.prune(keep).map(Expr::not),
            leaf => match leaf.field() {
                Some(field) if keep(field) => Some(leaf),
                _ => None,
            },
        }
    }

    pub fn rename_fields(&mut self, rename: &impl Fn(&str) -> String) {
        match self {
            Expr::And(operands) | Expr::Or(operands) => {
                operands.iter_mut().for_each(|e| e.rename_fields(rename))
            }
            Expr::Not(operand) => operand.rename_fields(rename),
            leaf => {
                if let Some(field) = leaf.field_mut() {
                    *field = rename(field);
                }
            }
        }
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Expr::And(operands) | Expr::Or(operands) => operands.iter().map(Expr::leaf_count).sum(),
            Expr::Not(operand) => operand.leaf_count(),
            _ => 1,
        }
    }
}

/// The comparison operators of the filter language. Negated pattern operators have no `Expr`
/// variant of their own; they build `Not(Like)` and `Not(Regex)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    NotRegex,
    Regex,
    NotLike,
    ILike,
    Like,
    NotIn,
    In,
    Between,
    NotNull,
    Null,
    Gte,
    Lte,
    Neq,
    Gt,
    Lt,
    Eq,
}

impl Operator {
    /// Table order matters: when two operators match at the same offset the earlier one wins.
    pub const TABLE: [Operator; 16] = [
        Operator::NotRegex,
        Operator::Regex,
        Operator::NotLike,
        Operator::ILike,
        Operator::Like,
        Operator::NotIn,
        Operator::In,
        Operator::Between,
        Operator::NotNull,
        Operator::Null,
        Operator::Gte,
        Operator::Lte,
        Operator::Neq,
        Operator::Gt,
        Operator::Lt,
        Operator::Eq,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::NotRegex => COMPARE_NOT_REGEX,
            Operator::Regex => COMPARE_REGEX,
            Operator::NotLike => COMPARE_NOT_LIKE,
            Operator::ILike => COMPARE_ILIKE,
            Operator::Like => COMPARE_LIKE,
            Operator::NotIn => COMPARE_NOT_IN,
            Operator::In => COMPARE_IN,
            Operator::Between => COMPARE_BETWEEN,
            Operator::NotNull => COMPARE_NOT_NULL,
            Operator::Null => COMPARE_NULL,
            Operator::Gte => COMPARE_GTE,
            Operator::Lte => COMPARE_LTE,
            Operator::Neq => COMPARE_NEQ,
            Operator::Gt => COMPARE_GT,
            Operator::Lt => COMPARE_LT,
            Operator::Eq => COMPARE_EQ,
        }
    }

    pub fn takes_value(&self) -> bool {
        !matches!(self, Operator::Null | Operator::NotNull)
    }

    pub fn is_set(&self) -> bool {
        matches!(self, Operator::In | Operator::NotIn)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub field: String,
    pub direction: SortDirection,
}

impl SortEntry {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        if keyword.eq_ignore_ascii_case(SORT_ASC) {
            Some(SortDirection::Asc)
        } else if keyword.eq_ignore_ascii_case(SORT_DESC) {
            Some(SortDirection::Desc)
        } else {
            None
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => SORT_ASC,
            SortDirection::Desc => SORT_DESC,
        }
    }
}

/// Pagination. Zero means "not set" for both numbers.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub skip: u64,
    pub take: u64,
}

impl Page {
    /// Negative inputs are clamped to zero rather than rejected.
    pub fn clamped(skip: i64, take: i64) -> Self {
        Self {
            skip: clamp(skip),
            take: clamp(take),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.skip == 0 && self.take == 0
    }
}

pub fn clamp(n: i64) -> u64 {
    u64::try_from(n).unwrap_or(0)
}

/// Writes a string as a double-quoted literal that the lexer and value parser read back
/// unchanged.
pub fn write_quoted(f: &mut impl Write, s: &str) -> fmt::Result {
    f.write_char(STRING_QUOTE)?;
    for c in s.chars() {
        match c {
            STRING_QUOTE | STRING_ESCAPE_PREFIX => {
                f.write_char(STRING_ESCAPE_PREFIX)?;
                f.write_char(c)?;
            }
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => f.write_char(c)?,
        }
    }
    f.write_char(STRING_QUOTE)
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            // Debug keeps a fractional part, so the literal reads back as a float.
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::String(s) => write_quoted(f, s),
            Value::Timestamp(t) => {
                write_quoted(f, &t.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Value::Null => f.write_str(LITERAL_NULL),
            Value::List(values) => {
                f.write_char(LIST_OPEN)?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_char(LIST_SEPARATOR)?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_char(LIST_CLOSE)
            }
        }
    }
}

fn write_junction(f: &mut Formatter<'_>, operands: &[Expr], keyword: &str) -> fmt::Result {
    f.write_char(GROUP_OPEN)?;
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, " {keyword} ")?;
        }
        write!(f, "{operand}")?;
    }
    f.write_char(GROUP_CLOSE)
}

/// Renders the expression back into filter-language text.
impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Eq { field, value } => write!(f, "{field}{COMPARE_EQ}{value}"),
            Expr::Neq { field, value } => write!(f, "{field}{COMPARE_NEQ}{value}"),
            Expr::Gt { field, value } => write!(f, "{field}{COMPARE_GT}{value}"),
            Expr::Gte { field, value } => write!(f, "{field}{COMPARE_GTE}{value}"),
            Expr::Lt { field, value } => write!(f, "{field}{COMPARE_LT}{value}"),
            Expr::Lte { field, value } => write!(f, "{field}{COMPARE_LTE}{value}"),
            Expr::Like { field, pattern } => {
                write!(f, "{field}{COMPARE_LIKE}")?;
                write_quoted(f, pattern)
            }
            Expr::ILike { field, pattern } => {
                write!(f, "{field}{COMPARE_ILIKE}")?;
                write_quoted(f, pattern)
            }
            Expr::Regex { field, pattern } => {
                write!(f, "{field}{COMPARE_REGEX}")?;
                write_quoted(f, pattern)
            }
            Expr::In { field, values } => {
                write!(f, "{field}{COMPARE_IN}{}", Value::List(values.clone()))
            }
            Expr::NotIn { field, values } => {
                write!(f, "{field}{COMPARE_NOT_IN}{}", Value::List(values.clone()))
            }
            Expr::Between { field, low, high } => {
                write!(f, "{field}{COMPARE_BETWEEN}{low}{RANGE_SEPARATOR}{high}")
            }
            Expr::IsNull { field } => write!(f, "{field}{COMPARE_NULL}"),
            Expr::NotNull { field } => write!(f, "{field}{COMPARE_NOT_NULL}"),
            Expr::And(operands) => write_junction(f, operands, KEYWORD_AND),
            Expr::Or(operands) => write_junction(f, operands, KEYWORD_OR),
            Expr::Not(operand) => write!(f, "{KEYWORD_NOT} {GROUP_OPEN}{operand}{GROUP_CLOSE}"),
        }
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut sections: Vec<String> = Vec::new();
        if let Some(filter) = &self.filter {
            sections.push(filter.to_string());
        }
        if !self.sort.is_empty() {
            let entries = self
                .sort
                .iter()
                .map(|s| {
                    format!(
                        "{}{SECTION_PAIR_SEPARATOR}{}",
                        s.field,
                        s.direction.keyword()
                    )
                })
                .collect::<Vec<_>>()
                .join(",");
            sections.push(format!("{SECTION_SORT}{entries}"));
        }
        if !self.page.is_empty() {
            sections.push(format!(
                "{SECTION_PAGE}{PAGE_SKIP}{SECTION_PAIR_SEPARATOR}{},{PAGE_TAKE}{SECTION_PAIR_SEPARATOR}{}",
                self.page.skip, self.page.take
            ));
        }
        if !self.preloads.is_empty() {
            let mut loads = Vec::new();
            for (relation, exprs) in &self.preloads {
                if exprs.is_empty() {
                    loads.push(relation.clone());
                }
                for expr in exprs {
                    loads.push(format!("{relation}{SECTION_PAIR_SEPARATOR}{expr}"));
                }
            }
            sections.push(format!(
                "{SECTION_LOAD}{}{LIST_CLOSE}",
                loads.join(&LOAD_SEPARATOR.to_string())
            ));
        }
        f.write_str(&sections.join(" "))
    }
}
