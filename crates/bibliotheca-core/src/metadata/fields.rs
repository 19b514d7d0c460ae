//! Per-field parsers for raw container metadata.
//!
//! Every parser tolerates empty input and never fails; malformed values are
//! passed through the normalizer rather than rejected.

use once_cell::sync::Lazy;
use regex::Regex;

use super::clean::{clean, clean_keeping};
use crate::container::Attributes;

/// `Name (comment)`, possibly repeated. The last parenthesized group wins, so
/// `"A (x) B (y)"` yields `"y"`. Leading blanks inside the parentheses are
/// dropped here, trailing ones by the normalizer. The empty string matches
/// with no group and parses to `""`.
static PARENTHESIZED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*\( *([^\)]*) *\))*$").expect("valid parenthesized author regex"));

/// `role: name`. Splits on the first colon only.
static ROLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^:]*: *(.*)$").expect("valid role regex"));

/// Any `<...>` run. An unterminated `<` is left alone.
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));

const SUBJECT_DELIMITER: &str = " / ";
const UNSPECIFIED_DATE_PREFIX: &str = "Unspecified: ";
const XML_ESCAPES: [&str; 3] = ["&amp;", "&lt;", "&gt;"];

/// Semantic name of a metadata field as reported by the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataKey {
    Creator,
    Description,
    Subject,
    Date,
    Language,
    Title,
    Contributor,
    Publisher,
    Identifier,
    /// Anything else; stored under its own name.
    Other(String),
}

impl MetadataKey {
    pub fn from_name(name: &str) -> Self {
        match name {
            "creator" => Self::Creator,
            "description" => Self::Description,
            "subject" => Self::Subject,
            "date" => Self::Date,
            "language" => Self::Language,
            "title" => Self::Title,
            "contributor" => Self::Contributor,
            "publisher" => Self::Publisher,
            "identifier" => Self::Identifier,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One cleaned author per raw value, order preserved.
pub fn parse_authors(values: &[String]) -> Vec<String> {
    values.iter().map(|value| parse_author(value)).collect()
}

fn parse_author(value: &str) -> String {
    if let Some(caps) = PARENTHESIZED_RE.captures(value) {
        return clean(caps.get(2).map_or("", |m| m.as_str()));
    }
    if let Some(caps) = ROLE_RE.captures(value) {
        return clean(caps.get(1).map_or("", |m| m.as_str()));
    }
    clean(value)
}

/// Joined, cleaned, tag-stripped, with `&amp;`, `&lt;`, `&gt;` and the literal
/// `\n` escape decoded last.
pub fn parse_description(values: &[String]) -> String {
    let joined = clean_keeping(&values.join(", "), &XML_ESCAPES);
    TAG_RE
        .replace_all(&joined, "")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("\\n", "\n")
}

/// Splits `"Fiction / Drama"` style values and flattens them. No cleaning.
pub fn parse_subjects(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(SUBJECT_DELIMITER))
        .map(str::to_string)
        .collect()
}

/// First value only, without an `Unspecified: ` prefix.
pub fn parse_date(values: &[String]) -> String {
    values
        .first()
        .map(|date| {
            date.strip_prefix(UNSPECIFIED_DATE_PREFIX)
                .unwrap_or(date)
                .to_string()
        })
        .unwrap_or_default()
}

/// Title, contributor, publisher and every unhandled field.
pub fn parse_joined(values: &[String]) -> String {
    clean(&values.join(", "))
}

/// The last value whose `scheme` attribute is exactly `ISBN`.
/// Values without a matching attribute entry are ignored.
pub fn parse_isbn(values: &[String], attrs: &[Attributes]) -> Option<String> {
    values
        .iter()
        .zip(attrs)
        .filter(|(_, attr)| attr.get("scheme").map(String::as_str) == Some("ISBN"))
        .map(|(value, _)| value.clone())
        .last()
}
