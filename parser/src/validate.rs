//! Structural checks run before parsing, and the textual repair used in tolerant mode.

use log::trace;

use crate::error::{msg, ParseError, RepairError};
use crate::parser::lexer::{Lexer, Token};
use crate::parser::operators::find_operator;
use crate::parser::utils::{block_end, QuoteScanner};
use crate::tokens::*;

/// Repair converges in a handful of passes; this only bounds pathological input.
const MAX_REPAIR_PASSES: usize = 64;

/// Returns the first structural problem, by position.
pub fn validate(input: &str) -> Result<(), ParseError> {
    match diagnose(input).into_iter().next() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Every structural problem, ordered by position.
pub fn diagnose(input: &str) -> Vec<ParseError> {
    let mut errors = check_delimiters(input);
    errors.extend(check_operators(input));
    errors.sort_by_key(|e| e.position);
    trace!("validated {} bytes: {} problem(s)", input.len(), errors.len());
    errors
}

fn closer_for(open: char) -> char {
    if open == LIST_OPEN {
        LIST_CLOSE
    } else {
        GROUP_CLOSE
    }
}

fn opener_for(close: char) -> char {
    if close == LIST_CLOSE {
        LIST_OPEN
    } else {
        GROUP_OPEN
    }
}

fn check_delimiters(input: &str) -> Vec<ParseError> {
    let mut errors = Vec::new();
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut quote_start = None;
    let mut scanner = QuoteScanner::new(input);
    while let Some((pos, byte, structural)) = scanner.next() {
        if !structural {
            if !scanner.in_quote() {
                quote_start = None;
            } else if quote_start.is_none() {
                quote_start = Some(pos);
            }
            continue;
        }
        match byte as char {
            c @ (GROUP_OPEN | LIST_OPEN) => stack.push((c, pos)),
            c @ (GROUP_CLOSE | LIST_CLOSE) => match stack.last() {
                Some(&(open, _)) if closer_for(open) == c => {
                    stack.pop();
                }
                Some(&(open, _)) => errors.push(ParseError::new(
                    input,
                    pos,
                    msg::mismatched_close(open, c),
                    msg::add_close(closer_for(open)),
                )),
                None => errors.push(ParseError::new(
                    input,
                    pos,
                    msg::unmatched_close(c),
                    msg::remove_or_open(opener_for(c)),
                )),
            },
            _ => {}
        }
    }
    if let Some(pos) = quote_start.filter(|_| scanner.in_quote()) {
        errors.push(ParseError::new(
            input,
            pos,
            msg::unterminated_string(),
            msg::close_string(),
        ));
    }
    for (open, pos) in stack {
        errors.push(ParseError::new(
            input,
            pos,
            msg::unclosed_open(open),
            msg::add_close(closer_for(open)),
        ));
    }
    errors
}

/// Tokens with each `load=[...]` block folded into a single token.
fn top_level_tokens(input: &str) -> Vec<Token<'_>> {
    let mut lexer = Lexer::new(input);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next() {
        if token.text.starts_with(SECTION_LOAD) {
            let open = token.start + SECTION_LOAD.len() - 1;
            let end = block_end(input, open).unwrap_or(input.len());
            lexer.seek(end);
            tokens.push(Token {
                text: &input[token.start..end],
                start: token.start,
            });
        } else {
            tokens.push(token);
        }
    }
    tokens
}

fn is_binary_keyword(text: &str) -> bool {
    text == KEYWORD_AND || text == KEYWORD_OR
}

/// `not` with nothing it could negate after it.
fn is_dangling_not(token: &Token, next: Option<&Token>) -> bool {
    token.text == KEYWORD_NOT
        && match next {
            None => true,
            Some(next) => is_binary_keyword(next.text) || next.is_group_close(),
        }
}

/// The operator symbol a token ends with, when that operator still expects a value.
fn trailing_operator<'a>(token: &Token<'a>) -> Option<&'a str> {
    if is_binary_keyword(token.text) || token.text == KEYWORD_NOT {
        return Some(token.text);
    }
    let (op, offset) = find_operator(token.text)?;
    if op.takes_value() && offset + op.symbol().len() == token.text.len() {
        Some(&token.text[offset..])
    } else {
        None
    }
}

/// A bare `sort=` or `page=` with nothing after it.
fn is_empty_section(text: &str) -> bool {
    text == SECTION_SORT || text == SECTION_PAGE
}

fn check_operators(input: &str) -> Vec<ParseError> {
    let tokens = top_level_tokens(input);
    let mut errors = Vec::new();
    let Some(first) = tokens.first() else {
        return errors;
    };

    let leading = if is_binary_keyword(first.text) {
        Some(msg::leading_operator(first.text))
    } else if is_dangling_not(first, tokens.get(1)) {
        Some(msg::dangling_not())
    } else {
        None
    };
    let flagged_first = leading.is_some();
    if let Some(message) = leading {
        errors.push(ParseError::new(
            input,
            first.start,
            message,
            msg::remove_leading(),
        ));
    }

    if let Some(last) = tokens.last() {
        let same_token = tokens.len() == 1 && flagged_first;
        if let Some(op) = trailing_operator(last).filter(|_| !same_token) {
            let (message, suggestion) = if is_empty_section(last.text) {
                (msg::empty_section(last.text), msg::fill_or_remove_section())
            } else {
                (msg::trailing_operator(op), msg::complete_or_remove())
            };
            errors.push(ParseError::new(input, last.start, message, suggestion));
        }
    }
    errors
}

/// Best-effort textual fix-up: closes an open string, strips dangling operators at either end,
/// drops closers with no partner and appends the missing ones. Valid input comes back
/// unchanged, and repairing twice gives the same text as repairing once.
pub fn repair(input: &str) -> String {
    if diagnose(input).is_empty() {
        return input.to_string();
    }
    let mut text = input.to_string();
    for _ in 0..MAX_REPAIR_PASSES {
        let next = repair_pass(&text);
        if next == text {
            break;
        }
        trace!("repair pass: `{text}` -> `{next}`");
        text = next;
    }
    text
}

/// Repairs and re-validates.
pub fn repair_checked(input: &str) -> Result<String, RepairError> {
    let repaired = repair(input);
    match validate(&repaired) {
        Ok(()) => Ok(repaired),
        Err(diagnostic) => Err(RepairError {
            original: input.to_string(),
            repaired,
            diagnostic,
        }),
    }
}

fn repair_pass(text: &str) -> String {
    let text = close_quote(text);
    let text = strip_dangling(text);
    balance(&text)
}

fn close_quote(text: &str) -> String {
    let mut scanner = QuoteScanner::new(text);
    scanner.by_ref().for_each(drop);
    let mut text = text.to_string();
    if scanner.in_quote() {
        if scanner.escape_pending() {
            text.pop();
        }
        text.push(STRING_QUOTE);
    }
    text
}

fn strip_dangling(mut text: String) -> String {
    loop {
        let tokens = top_level_tokens(&text);
        let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
            return text;
        };
        if is_binary_keyword(first.text) || is_dangling_not(first, tokens.get(1)) {
            text = text[first.end()..].trim_start().to_string();
        } else if trailing_operator(last).is_some() {
            text = text[..last.start].trim_end().to_string();
        } else {
            return text;
        }
    }
}

fn balance(text: &str) -> String {
    let mut stack: Vec<char> = Vec::new();
    let mut dropped: Vec<usize> = Vec::new();
    for (pos, byte, structural) in QuoteScanner::new(text) {
        if !structural {
            continue;
        }
        match byte as char {
            c @ (GROUP_OPEN | LIST_OPEN) => stack.push(c),
            c @ (GROUP_CLOSE | LIST_CLOSE) => {
                if stack.last().map(|&open| closer_for(open)) == Some(c) {
                    stack.pop();
                } else {
                    dropped.push(pos);
                }
            }
            _ => {}
        }
    }
    let mut out: String = text
        .char_indices()
        .filter(|(i, _)| !dropped.contains(i))
        .map(|(_, c)| c)
        .collect();
    out.extend(stack.into_iter().rev().map(closer_for));
    out
}
