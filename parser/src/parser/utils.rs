use chumsky::{prelude::*, text::*};

use crate::tokens::*;

/// `Psr` is an abbreviation for "Parser". This is abbreviated because it is used in many places,
/// and we don't want it to conflict with Chumsky's `Parser` trait.
///
/// This is a utility type to reduce code duplication in types. It would be easier to write as
/// follows:
///
/// ```rs
/// pub type Psr<T> = Parser<char, T, Error = Simple<char>> + Clone + 'static;
/// ```
///
/// However, we can't do that without [trait aliases][1].
///
/// [1]: https://github.com/rust-lang/rust/issues/41517
pub trait Psr<T>: Parser<char, T, Error = Simple<char>> + Clone + 'static {}
impl<S, T> Psr<T> for S where S: Parser<char, T, Error = Simple<char>> + Clone + 'static {}

pub fn quoted(quote: char) -> impl Psr<String> {
    just(quote)
        .ignore_then(
            filter(move |c| *c != STRING_ESCAPE_PREFIX && *c != quote)
                .or(escape(quote))
                .repeated(),
        )
        .then_ignore(just(quote))
        .collect::<String>()
}

pub fn escape(quote: char) -> impl Psr<char> {
    just(STRING_ESCAPE_PREFIX).ignore_then(
        just(STRING_ESCAPE_PREFIX)
            .or(just('/'))
            .or(just(quote))
            .or(just('b').to('\x08'))
            .or(just('f').to('\x0C'))
            .or(just('n').to('\n'))
            .or(just('r').to('\r'))
            .or(just('t').to('\t'))
            .or(just('u').ignore_then(
                filter(|c: &char| c.is_ascii_hexdigit())
                    .repeated()
                    .exactly(4)
                    .collect::<String>()
                    .validate(|digits, span, emit| {
                        u32::from_str_radix(&digits, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .unwrap_or_else(|| {
                                emit(Simple::custom(span, "invalid unicode character"));
                                '\u{FFFD}' // unicode replacement character
                            })
                    }),
            )),
    )
}

/// A run of non-whitespace characters that stops at a quote or any of the `stop` characters.
pub fn bareword(stop: &'static [char]) -> impl Psr<String> {
    filter(move |c: &char| !c.is_whitespace() && *c != STRING_QUOTE && !stop.contains(c))
        .repeated()
        .at_least(1)
        .collect::<String>()
}

pub fn padded_to_end<T: 'static>(p: impl Psr<T>) -> impl Psr<T> {
    whitespace()
        .ignore_then(p)
        .then_ignore(whitespace())
        .then_ignore(end())
}

/// Decodes a complete double-quoted literal, escapes included.
pub fn unquote(text: &str) -> Option<String> {
    padded_to_end(quoted(STRING_QUOTE)).parse(text).ok()
}

/// Walks the bytes of a string while tracking double-quoted spans. Each step yields the byte
/// offset, the byte, and whether that byte is structural (outside quotes and not itself a quote
/// delimiter). A backslash inside quotes escapes the following byte.
pub struct QuoteScanner<'a> {
    bytes: &'a [u8],
    pos: usize,
    in_quote: bool,
    escaped: bool,
}

impl<'a> QuoteScanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: 0,
            in_quote: false,
            escaped: false,
        }
    }

    /// True when the scan so far ended inside an unterminated quote.
    pub fn in_quote(&self) -> bool {
        self.in_quote
    }

    /// True when the scan so far ended right after a backslash inside quotes.
    pub fn escape_pending(&self) -> bool {
        self.escaped
    }
}

impl<'a> Iterator for QuoteScanner<'a> {
    type Item = (usize, u8, bool);

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.pos;
        let byte = *self.bytes.get(pos)?;
        self.pos += 1;
        if self.in_quote {
            if self.escaped {
                self.escaped = false;
            } else if byte == STRING_ESCAPE_PREFIX as u8 {
                self.escaped = true;
            } else if byte == STRING_QUOTE as u8 {
                self.in_quote = false;
            }
            return Some((pos, byte, false));
        }
        if byte == STRING_QUOTE as u8 {
            self.in_quote = true;
            return Some((pos, byte, false));
        }
        Some((pos, byte, true))
    }
}

/// First offset outside quotes at which `pattern` starts.
pub fn find_unquoted(text: &str, pattern: &str) -> Option<usize> {
    QuoteScanner::new(text)
        .find(|&(pos, _, structural)| {
            structural && text.is_char_boundary(pos) && text[pos..].starts_with(pattern)
        })
        .map(|(pos, _, _)| pos)
}

/// Splits on `separator` where it appears outside quotes and outside any bracket or
/// parenthesis nesting.
pub fn split_top_level(text: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth: usize = 0;
    let mut start = 0;
    for (pos, byte, structural) in QuoteScanner::new(text) {
        if !structural {
            continue;
        }
        match byte as char {
            LIST_OPEN | GROUP_OPEN => depth += 1,
            LIST_CLOSE | GROUP_CLOSE => depth = depth.saturating_sub(1),
            c if c == separator && depth == 0 => {
                parts.push(&text[start..pos]);
                start = pos + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

/// Given the offset of an opening bracket, returns the offset just past its matching closing
/// bracket, or `None` when the block is never closed.
pub fn block_end(input: &str, open: usize) -> Option<usize> {
    let mut depth: usize = 0;
    for (pos, byte, structural) in QuoteScanner::new(&input[open..]) {
        if !structural {
            continue;
        }
        match byte as char {
            LIST_OPEN => depth += 1,
            LIST_CLOSE => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + pos + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Bracket depth change over a span, counting only structural brackets.
pub fn bracket_balance(text: &str) -> i64 {
    QuoteScanner::new(text)
        .filter(|(_, _, structural)| *structural)
        .map(|(_, byte, _)| match byte as char {
            LIST_OPEN => 1,
            LIST_CLOSE => -1,
            _ => 0,
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted() {
        let p = |s: &str| quoted(STRING_QUOTE).then_ignore(end()).parse(s).ok();
        assert_eq!(p(r#""abc""#), Some("abc".to_string()));
        assert_eq!(p(r#""a \"b\" c""#), Some(r#"a "b" c"#.to_string()));
        assert_eq!(p(r#""tab\there""#), Some("tab\there".to_string()));
        assert_eq!(p(r#""é""#), Some("é".to_string()));
        assert_eq!(p(r#""open"#), None);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#" "%e%" "#), Some("%e%".to_string()));
        assert_eq!(unquote("bare"), None);
        assert_eq!(unquote(r#""a"b"#), None);
    }

    #[test]
    fn test_find_unquoted() {
        assert_eq!(find_unquoted(r#"a="x>y">"#, ">"), Some(7));
        assert_eq!(find_unquoted(r#""a..b"..c"#, ".."), Some(6));
        assert_eq!(find_unquoted(r#""\"..""#, ".."), None);
        assert_eq!(find_unquoted("abc", "="), None);
    }

    #[test]
    fn test_split_top_level() {
        assert_eq!(
            split_top_level(r#"a:x<in>[1|2]|b:y="p|q"|c"#, '|'),
            vec!["a:x<in>[1|2]", r#"b:y="p|q""#, "c"]
        );
        assert_eq!(split_top_level("", '|'), vec![""]);
    }

    #[test]
    fn test_block_end() {
        let input = r#"load=[a:x<in>[1,2] | b:y="]"] rest"#;
        let open = input.find('[').unwrap();
        assert_eq!(
            block_end(input, open).map(|end| &input[..end]),
            Some(r#"load=[a:x<in>[1,2] | b:y="]"]"#)
        );
        assert_eq!(block_end("load=[a:b[1]", 5), None);
    }

    #[test]
    fn test_bracket_balance() {
        assert_eq!(bracket_balance("[1,"), 1);
        assert_eq!(bracket_balance("[1,2]"), 0);
        assert_eq!(bracket_balance(r#"["]"#), 1);
    }
}
