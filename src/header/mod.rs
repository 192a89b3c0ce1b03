// src/header/mod.rs

//! OSGi manifest header clause grammar
//!
//! Structured headers such as `Import-Package` and `Export-Package` follow
//! the grammar:
//!
//! ```text
//! header ::= clause ( ',' clause ) *
//! clause ::= name ( ';' name ) * ( ';' key '=' value ) *
//! ```
//!
//! Keys ending in `:` are directives (`resolution:=optional`), all other
//! keys are attributes (`version="[1.0,2.0)"`). Several names may share one
//! clause; they are aliases and share a single parameter map.

mod clause;
pub mod tokenizer;

pub use clause::{is_directive, Header, Parameters, SharedParameters};
pub use tokenizer::{QuotedTokenizer, Token, TokenizeError, CLAUSE_DELIMITERS};

use thiserror::Error;

/// Directive kept when `Import-Package` is rewritten
pub const RESOLUTION_DIRECTIVE: &str = "resolution:";

/// Grammar violations inside a header value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClauseGrammarError {
    #[error("header contains name field after attribute or directive: {token} from {header}")]
    NameAfterParameter { token: String, header: String },

    #[error("clause has a parameter but no name ({token}) in: {header}")]
    MissingName { token: String, header: String },

    #[error("parameter {key} has no value in: {header}")]
    MissingValue { key: String, header: String },

    #[error("empty parameter key in: {header}")]
    EmptyKey { header: String },

    #[error("unexpected '{delimiter}' after {token} in: {header}")]
    UnexpectedDelimiter {
        delimiter: char,
        token: String,
        header: String,
    },
}

/// Errors raised while parsing a header value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error(transparent)]
    Tokenize(#[from] TokenizeError),

    #[error(transparent)]
    Grammar(#[from] ClauseGrammarError),
}
