//! URL generation from path patterns.
//!
//! A [`PathTemplate`] is the inverse of a compiled pattern: given parameters,
//! it produces a path that the same pattern would match.

use crate::error::{PatternError, UrlError};
use crate::params::{ParamValue, Params};
use crate::pattern::{Key, MAX_PATTERN_LENGTH, Token, parse};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use regex::{Regex, RegexBuilder};

/// Characters left untouched when encoding a segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encodes a single path segment or query component.
pub fn encode_segment(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Fills `pattern` with `params`.
///
/// Parses the pattern on every call; use [`PathTemplate`] to reuse it.
pub fn url_for_path(pattern: &str, params: &Params) -> Result<String, UrlError> {
    PathTemplate::new(pattern)?.render(params)
}

/// Joins route patterns (or matched segments) of a chain, outermost first.
///
/// Empty entries are skipped; adjacent slashes collapse to one.
pub fn join_paths<'a>(parts: impl IntoIterator<Item = &'a str>) -> String {
    parts.into_iter().fold(String::new(), |acc, part| {
        if part.is_empty() {
            acc
        } else {
            format!(
                "{}/{}",
                acc.strip_suffix('/').unwrap_or(&acc),
                part.strip_prefix('/').unwrap_or(part)
            )
        }
    })
}

enum Segment {
    Literal(String),
    Key { key: Key, check: Regex },
}

/// A parsed pattern ready to render URLs.
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl std::fmt::Debug for PathTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathTemplate")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl PathTemplate {
    /// Parses `pattern`.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        if pattern.len() > MAX_PATTERN_LENGTH {
            return Err(PatternError::TooLong {
                len: pattern.len(),
                max: MAX_PATTERN_LENGTH,
            });
        }

        let segments = parse(pattern)
            .into_iter()
            .map(|token| match token {
                Token::Literal(text) => Ok(Segment::Literal(text)),
                Token::Key(key) => {
                    let check = RegexBuilder::new(&format!("^(?:{})$", key.pattern))
                        .case_insensitive(true)
                        .build()
                        .map_err(|e| PatternError::Regex {
                            pattern: pattern.to_string(),
                            message: e.to_string(),
                        })?;
                    Ok(Segment::Key { key, check })
                }
            })
            .collect::<Result<Vec<_>, PatternError>>()?;

        Ok(Self {
            source: pattern.to_string(),
            segments,
        })
    }

    /// The source pattern.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Keys of the pattern, in order.
    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Key { key, .. } => Some(key),
            Segment::Literal(_) => None,
        })
    }

    /// Renders a path.
    ///
    /// Every supplied value is percent-encoded and checked against the
    /// parameter constraint. Missing optional parameters are omitted along
    /// with their prefix.
    pub fn render(&self, params: &Params) -> Result<String, UrlError> {
        let mut path = String::new();

        for segment in &self.segments {
            let (key, check) = match segment {
                Segment::Literal(text) => {
                    path.push_str(text);
                    continue;
                }
                Segment::Key { key, check } => (key, check),
            };
            let name = key.name.to_string();

            match params.get(&name) {
                None => {
                    if !key.optional {
                        return Err(UrlError::MissingParam { name });
                    }
                    if key.partial {
                        path.push_str(&key.prefix);
                    }
                }
                Some(ParamValue::Repeated(values)) => {
                    if !key.repeat {
                        return Err(UrlError::NotRepeatable { name });
                    }
                    if values.is_empty() {
                        if key.optional {
                            continue;
                        }
                        return Err(UrlError::EmptyRepeat { name });
                    }
                    for (index, value) in values.iter().enumerate() {
                        let encoded = checked(key, check, &name, value)?;
                        path.push_str(if index == 0 { &key.prefix } else { &key.delimiter });
                        path.push_str(&encoded);
                    }
                }
                Some(ParamValue::Single(value)) => {
                    let encoded = checked(key, check, &name, value)?;
                    path.push_str(&key.prefix);
                    path.push_str(&encoded);
                }
            }
        }

        Ok(path)
    }
}

fn checked(key: &Key, check: &Regex, name: &str, value: &str) -> Result<String, UrlError> {
    let encoded = encode_segment(value);
    if check.is_match(&encoded) {
        Ok(encoded)
    } else {
        Err(UrlError::ConstraintMismatch {
            name: name.to_string(),
            pattern: key.pattern.clone(),
            value: encoded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::CompiledPattern;

    #[test]
    fn fills_named_parameters() {
        let params = Params::new().with("id", "42").with("tab", "a b");
        assert_eq!(
            url_for_path("/users/:id/:tab", &params).unwrap(),
            "/users/42/a%20b"
        );
    }

    #[test]
    fn missing_required_parameter_fails() {
        let err = url_for_path("/users/:id", &Params::new()).unwrap_err();
        assert_eq!(err, UrlError::MissingParam { name: "id".into() });
    }

    #[test]
    fn optional_parameters_drop_their_prefix() {
        assert_eq!(url_for_path("/docs/:page?", &Params::new()).unwrap(), "/docs");
    }

    #[test]
    fn lists_only_for_repeating_keys() {
        let list = Params::new().with("path", vec!["a", "b"]);
        assert_eq!(url_for_path("/files/:path+", &list).unwrap(), "/files/a/b");
        assert_eq!(
            url_for_path("/files/:path", &list).unwrap_err(),
            UrlError::NotRepeatable { name: "path".into() }
        );

        let empty = Params::new().with("path", Vec::<String>::new());
        assert_eq!(url_for_path("/files/:path*", &empty).unwrap(), "/files");
        assert_eq!(
            url_for_path("/files/:path+", &empty).unwrap_err(),
            UrlError::EmptyRepeat { name: "path".into() }
        );
    }

    #[test]
    fn constraint_mismatch_is_reported() {
        let params = Params::new().with("id", "abc");
        assert!(matches!(
            url_for_path("/users/:id(\\d+)", &params),
            Err(UrlError::ConstraintMismatch { .. })
        ));
    }

    #[test]
    fn generated_urls_match_their_pattern() {
        let pattern = "/shop/:category/:item(\\d+)/:rest*";
        let params = Params::new()
            .with("category", "tea & coffee")
            .with("item", "12")
            .with("rest", vec!["x", "y"]);
        let url = url_for_path(pattern, &params).unwrap();
        let matched = CompiledPattern::new(pattern, true)
            .unwrap()
            .matches(&url)
            .unwrap();
        assert_eq!(matched.params, params);
    }

    #[test]
    fn joins_chain_paths() {
        assert_eq!(join_paths(["/", "users", ":id"]), "/users/:id");
        assert_eq!(join_paths(["/app/", "/users/"]), "/app/users/");
        assert_eq!(join_paths(["", "/a", ""]), "/a");
        assert_eq!(join_paths(Vec::<&str>::new()), "");
    }
}
