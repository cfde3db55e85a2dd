pub const STRING_QUOTE: char = '"';
pub const STRING_ESCAPE_PREFIX: char = '\\';

pub const GROUP_OPEN: char = '(';
pub const GROUP_CLOSE: char = ')';
pub const LIST_OPEN: char = '[';
pub const LIST_CLOSE: char = ']';
pub const LIST_SEPARATOR: char = ',';
pub const RANGE_SEPARATOR: &str = "..";

pub const KEYWORD_AND: &str = "and";
pub const KEYWORD_OR: &str = "or";
pub const KEYWORD_NOT: &str = "not";

pub const SECTION_SORT: &str = "sort=";
pub const SECTION_PAGE: &str = "page=";
pub const SECTION_LOAD: &str = "load=[";
pub const SECTION_PAIR_SEPARATOR: char = ':';
pub const SECTION_ENTRY_SEPARATOR: char = ',';
pub const LOAD_SEPARATOR: char = '|';

pub const SORT_ASC: &str = "asc";
pub const SORT_DESC: &str = "desc";
pub const PAGE_SKIP: &str = "skip";
pub const PAGE_TAKE: &str = "take";

pub const LITERAL_TRUE: &str = "true";
pub const LITERAL_FALSE: &str = "false";
pub const LITERAL_NULL: &str = "null";
pub const LITERAL_NULL_UPPER: &str = "NULL";

pub const COMPARE_NOT_REGEX: &str = "!=~";
pub const COMPARE_REGEX: &str = "=~";
pub const COMPARE_NOT_LIKE: &str = "!=^";
pub const COMPARE_ILIKE: &str = ".=^";
pub const COMPARE_LIKE: &str = "=^";
pub const COMPARE_NOT_IN: &str = "<nin>";
pub const COMPARE_IN: &str = "<in>";
pub const COMPARE_BETWEEN: &str = "<bet>";
pub const COMPARE_NOT_NULL: &str = "<notnull>";
pub const COMPARE_NULL: &str = "<null>";
pub const COMPARE_GTE: &str = ">=";
pub const COMPARE_LTE: &str = "<=";
pub const COMPARE_NEQ: &str = "!=";
pub const COMPARE_GT: &str = ">";
pub const COMPARE_LT: &str = "<";
pub const COMPARE_EQ: &str = "=";
