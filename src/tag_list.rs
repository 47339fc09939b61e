// dkim-sign – DKIM signing of email messages
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

//! Tag lists.
//!
//! A tag list is the `tag=value; tag=value` syntax of RFC 6376, section 3.2.
//! [`TagList`] parses such input, and [`TagListBuilder`] produces the tag
//! list of a new signature.

use crate::{
    header::FieldName,
    parse::{strip_fws, strip_suffix},
    signer::ConfigurationError,
};
use std::collections::HashSet;

/// The tags every signature must carry.
pub const REQUIRED_TAGS: [&str; 6] = ["v", "a", "c", "d", "s", "h"];

pub fn is_tag_value(s: &str) -> bool {
    s.is_empty() || matches!(parse_tag_value(s), Some((rest, _)) if rest.is_empty())
}

pub fn strip_fws_from_tag_value(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\r' | '\n'))
        .collect()
}

#[derive(Debug, PartialEq, Eq)]
pub struct TagSpec<'a> {
    pub name: &'a str,
    pub value: &'a str,
}

#[derive(Debug, PartialEq, Eq)]
pub enum TagListParseError {
    DuplicateTag,
    Syntax,
}

#[derive(Debug, PartialEq, Eq)]
pub struct TagList<'a>(Vec<TagSpec<'a>>);

impl<'a> AsRef<[TagSpec<'a>]> for TagList<'a> {
    fn as_ref(&self) -> &[TagSpec<'a>] {
        &self.0
    }
}

impl<'a> TagList<'a> {
    pub fn from_str(val: &'a str) -> Result<Self, TagListParseError> {
        match parse_tag_list_internal(val) {
            Some((rest, tag_list)) if rest.is_empty() => {
                // ensure no duplicate names
                let mut names_seen = HashSet::new();
                if tag_list.iter().any(|tag| !names_seen.insert(tag.name)) {
                    return Err(TagListParseError::DuplicateTag);
                }
                Ok(TagList(tag_list))
            }
            _ => Err(TagListParseError::Syntax),
        }
    }
}

pub fn parse_tag_list_internal(val: &str) -> Option<(&str, Vec<TagSpec<'_>>)> {
    let (mut s, t) = parse_tag_spec(val)?;

    let mut tags = vec![t];

    while let Some((snext, t)) = s.strip_prefix(';').and_then(parse_tag_spec) {
        s = snext;
        tags.push(t);
    }

    let s = s.strip_prefix(';').unwrap_or(s);

    Some((s, tags))
}

fn parse_tag_spec(val: &str) -> Option<(&str, TagSpec<'_>)> {
    let s = strip_fws(val).unwrap_or(val);

    let (s, name) = parse_tag_name(s)?;

    let s = strip_fws(s).unwrap_or(s);

    let s = s.strip_prefix('=')?;

    let s = strip_fws(s).unwrap_or(s);

    let (s, value) = match parse_tag_value(s) {
        Some((s, value)) => {
            let s = strip_fws(s).unwrap_or(s);
            (s, value)
        }
        None => (s, Default::default()),
    };

    Some((s, TagSpec { name, value }))
}

fn parse_tag_name(value: &str) -> Option<(&str, &str)> {
    let s = value
        .strip_prefix(is_alpha)?
        .trim_start_matches(is_alphanum);
    Some((s, strip_suffix(value, s)))
}

// Note erratum 5070 in ABNF
fn parse_tag_value(value: &str) -> Option<(&str, &str)> {
    fn strip_tval(s: &str) -> Option<&str> {
        s.strip_prefix(is_tval_char)
            .map(|s| s.trim_start_matches(is_tval_char))
    }

    let mut s = strip_tval(value)?;

    while let Some(snext) = strip_fws(s).and_then(strip_tval) {
        s = snext;
    }

    Some((s, strip_suffix(value, s)))
}

fn is_alpha(c: char) -> bool {
    c.is_ascii_alphabetic()
}

fn is_alphanum(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

pub fn is_tval_char(c: char) -> bool {
    // printable ASCII w/o ; or non-ASCII UTF-8
    matches!(c, '!'..=':' | '<'..='~') || !c.is_ascii()
}

pub fn is_tag_name(s: &str) -> bool {
    matches!(parse_tag_name(s), Some((rest, _)) if rest.is_empty())
}

/// An ordered builder for the tag list of a new signature.
///
/// Tags are rendered in insertion order. Setting a tag that is already
/// present replaces its value in place.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TagListBuilder {
    tags: Vec<(String, String)>,
}

impl TagListBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();

        match self.tags.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.tags.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Sets the `h=` tag from a list of header names.
    pub fn set_field_list(&mut self, names: &[FieldName]) {
        let value = names
            .iter()
            .map(|name| name.as_ref())
            .collect::<Vec<_>>()
            .join(":");
        self.set("h", value);
    }

    /// Sets the `bh=` tag to an already Base64-encoded body hash.
    pub fn set_body_hash(&mut self, value: &str) {
        self.set("bh", value);
    }

    /// Sets the `b=` tag to already Base64-encoded signature data.
    pub fn set_signature_data(&mut self, value: &str) {
        self.set("b", value);
    }

    /// Checks that all required tags are present with a non-empty value.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for name in REQUIRED_TAGS {
            match self.get(name) {
                Some(v) if !v.is_empty() => {}
                _ => return Err(ConfigurationError::MissingTag(name)),
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Renders the tag list, separating tags with `"; "`.
    pub fn serialize(&self) -> String {
        self.iter()
            .map(|(n, v)| format!("{n}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}
