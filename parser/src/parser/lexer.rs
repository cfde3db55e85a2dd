//! Splits filter text into whitespace-separated tokens.
//!
//! The only state is whether the cursor sits inside a double-quoted literal. Outside quotes,
//! whitespace ends a token and each parenthesis is a token of its own. Inside quotes every byte
//! belongs to the current token, and a backslash carries the byte after it. Brackets get no
//! special treatment here; `load=[...]` blocks are cut out of the raw input by the parser.

use crate::tokens::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    /// Byte offset of the first character in the original input.
    pub start: usize,
}

impl<'a> Token<'a> {
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }

    pub fn is_group_open(&self) -> bool {
        self.text.len() == 1 && self.text.starts_with(GROUP_OPEN)
    }

    pub fn is_group_close(&self) -> bool {
        self.text.len() == 1 && self.text.starts_with(GROUP_CLOSE)
    }
}

/// A resumable cursor over the input. Cloning it is the way to look ahead.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    /// Moves the cursor to `pos`, which must be a token boundary outside quotes.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos.min(self.input.len());
    }

    pub fn peek(&self) -> Option<Token<'a>> {
        self.clone().next()
    }
}

fn is_paren(b: u8) -> bool {
    b == GROUP_OPEN as u8 || b == GROUP_CLOSE as u8
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        let src = self.input.as_bytes();
        while self.pos < src.len() && src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.pos >= src.len() {
            return None;
        }

        let start = self.pos;
        if is_paren(src[start]) {
            self.pos += 1;
            return Some(Token {
                text: &self.input[start..self.pos],
                start,
            });
        }

        let mut in_quote = false;
        let mut escaped = false;
        while self.pos < src.len() {
            let b = src[self.pos];
            if in_quote {
                if escaped {
                    escaped = false;
                } else if b == STRING_ESCAPE_PREFIX as u8 {
                    escaped = true;
                } else if b == STRING_QUOTE as u8 {
                    in_quote = false;
                }
            } else if b == STRING_QUOTE as u8 {
                in_quote = true;
            } else if b.is_ascii_whitespace() || is_paren(b) {
                break;
            }
            self.pos += 1;
        }

        Some(Token {
            text: &self.input[start..self.pos],
            start,
        })
    }
}

/// Tokenizes the whole input. Never fails: an unterminated quote runs to the end.
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}
