// src/header/tokenizer.rs

//! Quote-aware tokenizer for manifest header values
//!
//! Splits a header value on a set of delimiter characters while honoring
//! single- and double-quoted spans. The delimiter that ended each token is
//! remembered so the clause grammar can tell clause boundaries (`,`) from
//! parameter boundaries (`;`) and key/value separators (`=`).

use thiserror::Error;

/// Delimiters used by the OSGi clause grammar
pub const CLAUSE_DELIMITERS: &str = ";=,";

/// Lexical errors raised while tokenizing a header value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    #[error("unterminated {quote} quote starting at offset {offset} in: {input}")]
    UnterminatedQuote {
        quote: char,
        offset: usize,
        input: String,
    },
}

/// A single token and the delimiter that terminated it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// `None` when the token ran to the end of the input
    pub delimiter: Option<char>,
}

/// Tokenizer over a borrowed header value
#[derive(Debug, Clone)]
pub struct QuotedTokenizer<'a> {
    input: &'a str,
    delimiters: &'a str,
    pos: usize,
    last_delimiter: Option<char>,
}

impl<'a> QuotedTokenizer<'a> {
    /// Create a tokenizer with a default delimiter set
    pub fn new(input: &'a str, delimiters: &'a str) -> Self {
        Self {
            input,
            delimiters,
            pos: 0,
            last_delimiter: None,
        }
    }

    /// Next token using the default delimiter set
    pub fn next_token(&mut self) -> Result<Option<Token>, TokenizeError> {
        self.next_token_with(self.delimiters)
    }

    /// Next token using an explicit delimiter set
    ///
    /// Returns `Ok(None)` at end of input. Whitespace around unquoted text is
    /// dropped; whitespace between significant characters is kept. Quoted
    /// content is copied verbatim without the quote marks.
    pub fn next_token_with(&mut self, delimiters: &str) -> Result<Option<Token>, TokenizeError> {
        self.last_delimiter = None;
        if self.pos >= self.input.len() {
            return Ok(None);
        }

        let mut text = String::new();
        // Byte length of `text` up to and including the last significant char
        let mut significant = 0;
        let mut quoted = false;
        let mut delimiter = None;

        while let Some(c) = self.bump() {
            if delimiters.contains(c) {
                delimiter = Some(c);
                break;
            }
            match c {
                '"' | '\'' => {
                    self.quoted_span(c, &mut text)?;
                    significant = text.len();
                    quoted = true;
                }
                c if c.is_whitespace() => {
                    if !text.is_empty() {
                        text.push(c);
                    }
                }
                c => {
                    text.push(c);
                    significant = text.len();
                }
            }
        }
        text.truncate(significant);

        // Nothing but whitespace after the last delimiter
        if delimiter.is_none() && text.is_empty() && !quoted {
            return Ok(None);
        }

        self.last_delimiter = delimiter;
        Ok(Some(Token { text, delimiter }))
    }

    /// Delimiter that ended the most recent token (`None` at end of input)
    pub fn last_delimiter(&self) -> Option<char> {
        self.last_delimiter
    }

    /// Drain the remaining tokens, in order
    pub fn into_tokens(mut self) -> Result<Vec<String>, TokenizeError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token.text);
        }
        Ok(tokens)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.input[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn quoted_span(&mut self, quote: char, text: &mut String) -> Result<(), TokenizeError> {
        let offset = self.pos - quote.len_utf8();
        loop {
            match self.bump() {
                None => {
                    return Err(TokenizeError::UnterminatedQuote {
                        quote,
                        offset,
                        input: self.input.to_string(),
                    });
                }
                Some(c) if c == quote => return Ok(()),
                Some('\\') if self.peek() == Some(quote) => {
                    self.bump();
                    text.push(quote);
                }
                Some(c) => text.push(c),
            }
        }
    }
}
