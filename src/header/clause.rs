// src/header/clause.rs

//! Clause collections: parsing and serialization

use super::tokenizer::{QuotedTokenizer, CLAUSE_DELIMITERS};
use super::{ClauseGrammarError, HeaderError};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Parameter map shared by every alias of one clause
pub type SharedParameters = Rc<RefCell<Parameters>>;

/// Check whether a parameter key is a directive (`key:=value` in source form)
pub fn is_directive(key: &str) -> bool {
    key.ends_with(':')
}

/// Ordered attributes and directives of a clause
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    entries: IndexMap<String, String>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Insert or replace a parameter, returning the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Non-directive entries
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| !is_directive(k))
    }

    /// Directive entries (keys keep their trailing `:`)
    pub fn directives(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| is_directive(k))
    }
}

/// A parsed header: clause names mapped to their (possibly shared) parameters
///
/// Cloning a `Header` is shallow; the clone refers to the same parameter
/// maps.
#[derive(Debug, Clone, Default)]
pub struct Header {
    clauses: IndexMap<String, SharedParameters>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a header value
    ///
    /// Empty or all-whitespace input yields an empty header. Within a clause
    /// all names must come before any `key=value` parameter.
    pub fn parse(value: &str) -> Result<Self, HeaderError> {
        let mut header = Self::new();
        if value.trim().is_empty() {
            return Ok(header);
        }

        let mut qt = QuotedTokenizer::new(value, CLAUSE_DELIMITERS);
        while let Some(first) = qt.next_token()? {
            if first.delimiter == Some('=') {
                return Err(ClauseGrammarError::MissingName {
                    token: first.text,
                    header: value.to_string(),
                }
                .into());
            }

            let mut aliases = Vec::new();
            if !first.text.is_empty() {
                aliases.push(first.text);
            }
            let mut params = Parameters::new();
            let mut had_parameter = false;
            let mut delimiter = first.delimiter;

            while delimiter == Some(';') {
                let Some(token) = qt.next_token()? else {
                    delimiter = None;
                    break;
                };

                if token.delimiter == Some('=') {
                    if token.text.is_empty() {
                        return Err(ClauseGrammarError::EmptyKey {
                            header: value.to_string(),
                        }
                        .into());
                    }
                    let Some(param_value) = qt.next_token()? else {
                        return Err(ClauseGrammarError::MissingValue {
                            key: token.text,
                            header: value.to_string(),
                        }
                        .into());
                    };
                    if param_value.delimiter == Some('=') {
                        return Err(ClauseGrammarError::UnexpectedDelimiter {
                            delimiter: '=',
                            token: param_value.text,
                            header: value.to_string(),
                        }
                        .into());
                    }
                    params.insert(token.text, param_value.text);
                    had_parameter = true;
                    delimiter = param_value.delimiter;
                } else {
                    delimiter = token.delimiter;
                    if token.text.is_empty() {
                        continue;
                    }
                    if had_parameter {
                        return Err(ClauseGrammarError::NameAfterParameter {
                            token: token.text,
                            header: value.to_string(),
                        }
                        .into());
                    }
                    aliases.push(token.text);
                }
            }

            if aliases.is_empty() {
                if let Some((key, _)) = params.iter().next() {
                    return Err(ClauseGrammarError::MissingName {
                        token: key.to_string(),
                        header: value.to_string(),
                    }
                    .into());
                }
            } else {
                let shared = Rc::new(RefCell::new(params));
                for alias in aliases {
                    header.clauses.insert(alias, Rc::clone(&shared));
                }
            }

            if delimiter != Some(',') {
                break;
            }
        }

        Ok(header)
    }

    /// Serialize back to header syntax
    ///
    /// Clauses are joined by `", "`. Directives are written only when their
    /// key (including the trailing `:`) appears in `allowed_directives`;
    /// attributes are always written. Names, keys and values are quoted where
    /// needed so the output parses back to the same clauses.
    pub fn serialize(&self, allowed_directives: &[&str]) -> String {
        let mut out = String::new();
        for (index, (name, params)) in self.clauses.iter().enumerate() {
            if index > 0 {
                out.push_str(", ");
            }
            push_quoted(&mut out, name);

            for (key, value) in params.borrow().iter() {
                if is_directive(key) && !allowed_directives.contains(&key) {
                    continue;
                }
                out.push(';');
                push_quoted(&mut out, key);
                out.push('=');
                push_quoted(&mut out, value);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.clauses.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&SharedParameters> {
        self.clauses.get(name)
    }

    /// Insert a clause, replacing (and returning) any clause with that name
    pub fn insert(&mut self, name: impl Into<String>, params: SharedParameters) -> Option<SharedParameters> {
        self.clauses.insert(name.into(), params)
    }

    /// Insert a clause with an empty parameter map
    pub fn insert_empty(&mut self, name: impl Into<String>) -> Option<SharedParameters> {
        self.insert(name, Rc::new(RefCell::new(Parameters::new())))
    }

    pub fn remove(&mut self, name: &str) -> Option<SharedParameters> {
        self.clauses.shift_remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.clauses.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SharedParameters)> {
        self.clauses.iter().map(|(k, v)| (k.as_str(), v))
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty()
        || value.trim() != value
        || value.contains([',', ';', '=', '"', '\''])
}

// Embedded double quotes are escaped with a backslash. Trailing backslashes
// go after the closing quote, where they are plain characters.
fn push_quoted(out: &mut String, text: &str) {
    if !needs_quoting(text) {
        out.push_str(text);
        return;
    }
    let body = text.trim_end_matches('\\');
    out.push('"');
    for c in body.chars() {
        if c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out.push_str(&text[body.len()..]);
}
