//! This module implements the telemetry line parser.
//!
//! A line carries a single self-closing `<node .../>` or `<meteo .../>` tag
//! whose attribute body is a sequence of `name=value` pairs. Values may be
//! double-quoted; quotes are stripped and there is no escape sequence for an
//! embedded quote. [`tokenize`] turns one line into an attribute map,
//! [`Reading::from_attrs`] turns the map into a typed reading.

use std::collections::HashMap;
use std::fmt;
use std::mem;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod domain;

pub use domain::{Reading, Station};

/// Error type used by the tokenizer
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedLine {
    /// The line is empty after trimming
    EmptyInput,
    /// The line is not a self-closing `<node ...>` or `<meteo ...>` tag
    UnrecognizedTag,
    /// An `=` was found with no attribute name before it
    EmptyName,
    /// An `=` was found while scanning an unquoted attribute value
    UnexpectedEquals,
}

impl fmt::Display for MalformedLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            MalformedLine::EmptyInput => "empty input",
            MalformedLine::UnrecognizedTag => "not a self-closing <node> or <meteo> tag",
            MalformedLine::EmptyName => "attribute name is empty",
            MalformedLine::UnexpectedEquals => "unexpected `=` in attribute value",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for MalformedLine {}

/// Scanner state while walking the attribute body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Accumulating an attribute name, up to the next `=`.
    SeekingName,
    /// Accumulating the value for the pending name, up to the next
    /// unquoted whitespace.
    SeekingValue,
}

/// Splits one telemetry line into its attribute map.
///
/// The line is trimmed and lower-cased first, so tag and attribute names are
/// case-insensitive (values are lower-cased along with the rest of the
/// line). Later duplicates of an attribute overwrite earlier ones.
///
/// Tolerated oddities, kept compatible with the deployed stations: a quoted
/// empty value (`id=""`) is stored as an empty string, a dangling name with
/// no `=` is discarded, and an unterminated quote silently consumes the rest
/// of the line.
///
/// # Examples
///
/// ```
/// let attrs = meteo_rs::tokenize("<meteo id=\"3\" temperature=\"21.5\"/>").unwrap();
/// assert_eq!(attrs["id"], "3");
/// assert_eq!(attrs["temperature"], "21.5");
/// ```
pub fn tokenize(line: &str) -> Result<HashMap<String, String>, MalformedLine> {
    let line = line.trim().to_lowercase();
    if line.is_empty() {
        return Err(MalformedLine::EmptyInput);
    }

    let body = ["<node ", "<meteo "]
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
        .and_then(|rest| rest.strip_suffix("/>"))
        .ok_or(MalformedLine::UnrecognizedTag)?
        .trim();

    let mut attrs = HashMap::new();
    let mut state = ScanState::SeekingName;
    let mut escaped = false;
    let mut buf = String::new();
    let mut name = String::new();

    for c in body.chars() {
        if escaped {
            if c == '"' {
                escaped = false;
            } else {
                buf.push(c);
            }
            continue;
        }
        match c {
            '"' => escaped = true,
            '=' => match state {
                ScanState::SeekingName => {
                    name = buf.trim().to_string();
                    buf.clear();
                    if name.is_empty() {
                        return Err(MalformedLine::EmptyName);
                    }
                    state = ScanState::SeekingValue;
                }
                ScanState::SeekingValue => return Err(MalformedLine::UnexpectedEquals),
            },
            c if c.is_whitespace() => {
                if state == ScanState::SeekingValue {
                    attrs.insert(mem::take(&mut name), buf.trim().to_string());
                    buf.clear();
                    state = ScanState::SeekingName;
                }
                // whitespace between attributes carries no meaning
            }
            c => buf.push(c),
        }
    }

    // the final attribute has no trailing whitespace to commit it
    if state == ScanState::SeekingValue && !name.is_empty() {
        attrs.insert(name, buf.trim().to_string());
    }

    Ok(attrs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn quoted_attributes() {
        let map = tokenize("<meteo id=\"3\" temperature=\"21.5\"/>").unwrap();
        assert_eq!(map, attrs(&[("id", "3"), ("temperature", "21.5")]));
    }

    #[test]
    fn unquoted_attributes() {
        let map = tokenize("<node id=3 humidity=55/>").unwrap();
        assert_eq!(map, attrs(&[("id", "3"), ("humidity", "55")]));
    }

    #[test]
    fn tag_and_names_are_case_insensitive() {
        let map = tokenize("<Meteo ID=\"7\" Name=\"Attic\"/>").unwrap();
        assert_eq!(map, attrs(&[("id", "7"), ("name", "attic")]));
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        let map = tokenize("  <node id=\"1\"/>\r").unwrap();
        assert_eq!(map, attrs(&[("id", "1")]));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(tokenize(""), Err(MalformedLine::EmptyInput));
        assert_eq!(tokenize("   \t"), Err(MalformedLine::EmptyInput));
    }

    #[test]
    fn unrecognized_tag_is_rejected() {
        assert_eq!(tokenize("<foo id=\"1\"/>"), Err(MalformedLine::UnrecognizedTag));
        assert_eq!(tokenize("<meteo id=\"1\">"), Err(MalformedLine::UnrecognizedTag));
        assert_eq!(tokenize("meteo id=\"1\""), Err(MalformedLine::UnrecognizedTag));
        // no space after the tag name means no attribute body follows
        assert_eq!(tokenize("<meteo/>"), Err(MalformedLine::UnrecognizedTag));
    }

    #[test]
    fn empty_attribute_body_yields_empty_map() {
        assert_eq!(tokenize("<meteo />").unwrap(), HashMap::new());
    }

    #[test]
    fn quoted_value_keeps_inner_whitespace_and_equals() {
        let map = tokenize("<meteo name=\"attic window\" note=\"a=b\"/>").unwrap();
        assert_eq!(map, attrs(&[("name", "attic window"), ("note", "a=b")]));
    }

    #[test]
    fn empty_quoted_value_is_kept() {
        let map = tokenize("<meteo id=\"\" name=\"x\"/>").unwrap();
        assert_eq!(map, attrs(&[("id", ""), ("name", "x")]));
    }

    #[test]
    fn dangling_name_is_discarded() {
        let map = tokenize("<meteo id=\"3\" temperature/>").unwrap();
        assert_eq!(map, attrs(&[("id", "3")]));
    }

    #[test]
    fn unterminated_quote_consumes_the_rest() {
        let map = tokenize("<meteo id=\"3 humidity=55/>").unwrap();
        assert_eq!(map, attrs(&[("id", "3 humidity=55")]));
    }

    #[test]
    fn later_duplicates_overwrite() {
        let map = tokenize("<meteo id=\"1\" id=\"2\"/>").unwrap();
        assert_eq!(map, attrs(&[("id", "2")]));
    }

    #[test]
    fn misplaced_equals_is_rejected() {
        assert_eq!(
            tokenize("<meteo id=1=2/>"),
            Err(MalformedLine::UnexpectedEquals)
        );
        assert_eq!(tokenize("<meteo =3/>"), Err(MalformedLine::EmptyName));
    }

    #[test]
    fn whitespace_inside_a_name_is_dropped() {
        // whitespace in name state is skipped without clearing the buffer
        let map = tokenize("<meteo hum idity=55/>").unwrap();
        assert_eq!(map, attrs(&[("humidity", "55")]));
    }

    #[test]
    fn reserialized_map_tokenizes_to_the_same_map() {
        let first = tokenize("<meteo id=\"3\" name=\"attic\" temperature=\"21.5\"/>").unwrap();
        let body: Vec<String> = first
            .iter()
            .map(|(k, v)| format!("{k}=\"{v}\""))
            .collect();
        let line = format!("<meteo {}/>", body.join(" "));
        assert_eq!(tokenize(&line).unwrap(), first);
    }
}
