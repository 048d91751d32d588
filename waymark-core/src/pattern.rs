//! # Path Pattern Compiler
//!
//! Turns a path pattern into an anchored regular expression plus the ordered
//! list of parameter [`Key`]s it captures.
//!
//! # Syntax
//!
//! | Pattern            | Meaning                                          |
//! |--------------------|--------------------------------------------------|
//! | `/users`           | Literal text, matched case-insensitively         |
//! | `:id`              | Named parameter, one segment                     |
//! | `:id(\d+)`         | Named parameter with a custom constraint         |
//! | `:id?`             | Optional parameter                               |
//! | `:path+`           | One or more segments, captured as a list         |
//! | `:path*`           | Zero or more segments, captured as a list        |
//! | `(\d+)`            | Unnamed group, keyed by position (`"0"`, ...)    |
//! | `\:`               | Escaped character, matched literally             |
//!
//! A parameter preceded by `/` or `.` takes that character as its prefix, so
//! an optional parameter swallows its prefix when absent.
//!
//! # Modes
//!
//! - **Exact** patterns must consume the whole path, allowing one trailing `/`.
//! - **Prefix** patterns must end at a segment boundary; the remainder is left
//!   for child routes.
//!
//! The empty pattern is strict: it never absorbs a trailing `/`.
//!
//! Compiled patterns are cached process-wide, keyed by pattern and mode.

use crate::error::PatternError;
use crate::params::{ParamValue, Params, decode_param};
use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

/// Maximum accepted pattern length in bytes.
pub const MAX_PATTERN_LENGTH: usize = 1024;

/// Maximum size of a compiled expression.
const MAX_REGEX_SIZE: usize = 1 << 20;

const DEFAULT_DELIMITER: char = '/';
const DELIMITERS: &[char] = &['.', '/'];

static CACHE: LazyLock<RwLock<HashMap<String, Arc<CompiledPattern>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Compiles `pattern`, reusing a cached result for the same pattern and mode.
pub fn compile(pattern: &str, exact: bool) -> Result<Arc<CompiledPattern>, PatternError> {
    let cache_key = format!("{pattern}|{exact}");
    if let Some(compiled) = CACHE.read().get(&cache_key) {
        return Ok(compiled.clone());
    }

    let compiled = Arc::new(CompiledPattern::new(pattern, exact)?);
    CACHE
        .write()
        .entry(cache_key)
        .or_insert_with(|| compiled.clone());
    Ok(compiled)
}

// ============================================================================
// Tokens
// ============================================================================

/// Name of a parameter key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyName {
    /// Named parameter (`:id`).
    Named(String),
    /// Unnamed group, keyed by its position among unnamed groups.
    Index(usize),
}

impl fmt::Display for KeyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A parameter captured by a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    /// Parameter name or positional index.
    pub name: KeyName,
    /// Delimiter preceding the parameter (`/`, `.` or empty).
    pub prefix: String,
    /// Separator between repeated segments.
    pub delimiter: String,
    /// Whether the parameter may be absent.
    pub optional: bool,
    /// Whether the parameter captures a list of segments.
    pub repeat: bool,
    /// Whether the parameter is followed by literal text other than its prefix.
    pub partial: bool,
    /// Constraint expression for each segment.
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Literal(String),
    Key(Key),
}

/// Splits a pattern into literal text and parameter keys.
pub(crate) fn parse(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut path = String::new();
    let mut path_escaped = false;
    let mut next_index = 0;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' && i + 1 < chars.len() {
            path.push(chars[i + 1]);
            path_escaped = true;
            i += 2;
            continue;
        }

        let (name, group, end) = match c {
            ':' => {
                let name_end = scan_name(&chars, i + 1);
                if name_end == i + 1 {
                    path.push(c);
                    i += 1;
                    continue;
                }
                let name: String = chars[i + 1..name_end].iter().collect();
                match scan_group(&chars, name_end) {
                    Some((group, group_end)) => (Some(name), Some(group), group_end),
                    None => (Some(name), None, name_end),
                }
            }
            '(' => match scan_group(&chars, i) {
                Some((group, group_end)) => (None, Some(group), group_end),
                None => {
                    path.push(c);
                    i += 1;
                    continue;
                }
            },
            _ => {
                path.push(c);
                i += 1;
                continue;
            }
        };

        let (modifier, end) = match chars.get(end) {
            Some(&m) if matches!(m, '+' | '*' | '?') => (Some(m), end + 1),
            _ => (None, end),
        };
        i = end;

        let mut prefix = String::new();
        if !path_escaped {
            if let Some(last) = path.chars().last().filter(|last| DELIMITERS.contains(last)) {
                prefix.push(last);
                path.pop();
            }
        }
        if !path.is_empty() {
            tokens.push(Token::Literal(std::mem::take(&mut path)));
            path_escaped = false;
        }

        let next = chars.get(i).copied();
        let partial = !prefix.is_empty() && next.is_some_and(|n| !prefix.starts_with(n));
        let delimiter = if prefix.is_empty() {
            DEFAULT_DELIMITER.to_string()
        } else {
            prefix.clone()
        };
        let pattern = group.unwrap_or_else(|| format!("[^{}]+?", regex::escape(&delimiter)));
        let name = match name {
            Some(name) => KeyName::Named(name),
            None => {
                next_index += 1;
                KeyName::Index(next_index - 1)
            }
        };

        tokens.push(Token::Key(Key {
            name,
            prefix,
            delimiter,
            optional: matches!(modifier, Some('?' | '*')),
            repeat: matches!(modifier, Some('+' | '*')),
            partial,
            pattern,
        }));
    }

    if !path.is_empty() {
        tokens.push(Token::Literal(path));
    }
    tokens
}

fn scan_name(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    end
}

/// Reads a parenthesized group starting at `start`. Unescaped nested
/// parentheses are not allowed; an unclosed or empty group is not a group.
fn scan_group(chars: &[char], start: usize) -> Option<(String, usize)> {
    if chars.get(start) != Some(&'(') {
        return None;
    }
    let mut group = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if i + 1 < chars.len() => {
                group.push(chars[i]);
                group.push(chars[i + 1]);
                i += 2;
            }
            '(' | '\\' => return None,
            ')' => {
                return (!group.is_empty()).then_some((group, i + 1));
            }
            c => {
                group.push(c);
                i += 1;
            }
        }
    }
    None
}

// ============================================================================
// Compiled patterns
// ============================================================================

/// Result of matching a path against a [`CompiledPattern`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMatch {
    /// The consumed portion of the input.
    pub path: String,
    /// Keys of the enclosing routes followed by this pattern's keys.
    pub keys: Vec<Key>,
    /// Parameters of the enclosing routes overlaid with this pattern's captures.
    pub params: Params,
}

/// A pattern compiled for one matching mode.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    source: String,
    exact: bool,
    regex: Regex,
    keys: Vec<Key>,
}

impl CompiledPattern {
    /// Compiles `pattern` without consulting the cache.
    pub fn new(pattern: &str, exact: bool) -> Result<Self, PatternError> {
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(PatternError::TooLong {
                len: pattern.len(),
                max: MAX_PATTERN_LENGTH,
            });
        }

        let tokens = parse(pattern);
        let expression = to_expression(&tokens, exact, pattern.is_empty());
        let regex = RegexBuilder::new(&expression)
            .case_insensitive(true)
            .size_limit(MAX_REGEX_SIZE)
            .build()
            .map_err(|e| PatternError::Regex {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;

        let keys = tokens
            .into_iter()
            .filter_map(|token| match token {
                Token::Key(key) => Some(key),
                Token::Literal(_) => None,
            })
            .collect();

        Ok(Self {
            source: pattern.to_string(),
            exact,
            regex,
            keys,
        })
    }

    /// The source pattern.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the pattern must consume the whole path.
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Keys captured by this pattern, in order.
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// Returns `true` if `path` matches.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Matches `path` with no enclosing route.
    pub fn matches(&self, path: &str) -> Option<PathMatch> {
        self.match_path(path, &[], &Params::new())
    }

    /// Matches `path`, overlaying captures on the parameters of the enclosing
    /// routes.
    ///
    /// A captured value overrides an inherited one. An absent optional
    /// capture never erases an inherited value. Absent repeating parameters
    /// that are not inherited become an empty list.
    pub fn match_path(
        &self,
        path: &str,
        parent_keys: &[Key],
        parent_params: &Params,
    ) -> Option<PathMatch> {
        let captures = self.regex.captures(path)?;
        let matched = captures.get(1).map_or("", |m| m.as_str());

        let mut params = parent_params.clone();
        for (index, key) in self.keys.iter().enumerate() {
            let name = key.name.to_string();
            let value = captures.get(index + 2).map(|m| m.as_str());
            if value.is_none() && params.contains(&name) {
                continue;
            }

            if key.repeat {
                let segments = match value {
                    Some(raw) if !raw.is_empty() => {
                        raw.split(key.delimiter.as_str()).map(decode_param).collect()
                    }
                    _ => Vec::new(),
                };
                params.insert(name, ParamValue::Repeated(segments));
            } else if let Some(raw) = value {
                params.insert(name, ParamValue::Single(decode_param(raw)));
            }
        }

        let mut keys = parent_keys.to_vec();
        keys.extend(self.keys.iter().cloned());

        Some(PathMatch {
            path: matched.to_string(),
            keys,
            params,
        })
    }
}

/// Builds the expression for a token list.
///
/// Group 1 always spans the consumed path; key captures follow in order.
/// Prefix mode consumes the segment boundary outside group 1 since the
/// engine has no lookahead.
fn to_expression(tokens: &[Token], exact: bool, strict: bool) -> String {
    let delimiter = regex::escape(&DEFAULT_DELIMITER.to_string());
    let mut route = String::new();
    let mut end_delimited = tokens.is_empty();

    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Literal(text) => {
                route.push_str(&regex::escape(text));
                end_delimited = i == tokens.len() - 1
                    && text.chars().last().is_some_and(|c| DELIMITERS.contains(&c));
            }
            Token::Key(key) => {
                let prefix = regex::escape(&key.prefix);
                let capture = if key.repeat {
                    let separator = regex::escape(&key.delimiter);
                    format!("(?:{p})(?:{separator}(?:{p}))*", p = key.pattern)
                } else {
                    format!("(?:{})", key.pattern)
                };
                if !key.optional {
                    route.push_str(&format!("{prefix}({capture})"));
                } else if key.partial {
                    route.push_str(&format!("{prefix}({capture})?"));
                } else {
                    route.push_str(&format!("(?:{prefix}({capture}))?"));
                }
            }
        }
    }

    if exact {
        let trailing = if strict {
            String::new()
        } else {
            format!("(?:{delimiter})?")
        };
        format!("^({route}{trailing})$")
    } else {
        let trailing = if strict {
            String::new()
        } else {
            format!("(?:{delimiter}$)?")
        };
        let boundary = if end_delimited {
            String::new()
        } else {
            format!("(?:{delimiter}|$)")
        };
        format!("^({route}{trailing}){boundary}")
    }
}
