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

//! Representation of email header data.

use crate::{
    message::{self, ParseError},
    signature::DKIM_SIGNATURE_NAME,
};
use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    str::FromStr,
};

pub type HeaderField = (FieldName, FieldBody);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeaderFieldError;

impl Display for HeaderFieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "malformed header field")
    }
}

impl Error for HeaderFieldError {}

/// A collection of header fields that can be used for DKIM processing.
///
/// Header fields are kept in the order in which they appear in the message.
/// Names keep their original case, and repeated fields are all retained.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeaderFields(Box<[HeaderField]>);

impl HeaderFields {
    pub fn new(value: impl Into<Box<[HeaderField]>>) -> Result<Self, HeaderFieldError> {
        let value = value.into();
        if value.is_empty() {
            return Err(HeaderFieldError);
        }
        Ok(Self(value))
    }

    pub fn from_vec(value: Vec<(String, Vec<u8>)>) -> Result<Self, HeaderFieldError> {
        let value: Vec<_> = value
            .into_iter()
            .map(|(name, value)| {
                let name = FieldName::new(name)?;
                let body = FieldBody::new(value)?;
                Ok((name, body))
            })
            .collect::<Result<_, _>>()?;
        Self::new(value)
    }

    /// Returns whether a field with the given name is present.
    pub fn contains(&self, name: &FieldName) -> bool {
        self.0.iter().any(|(n, _)| n == name)
    }
}

impl AsRef<[HeaderField]> for HeaderFields {
    fn as_ref(&self) -> &[HeaderField] {
        &self.0
    }
}

impl From<HeaderFields> for Vec<HeaderField> {
    fn from(header_fields: HeaderFields) -> Self {
        header_fields.0.into()
    }
}

impl FromStr for HeaderFields {
    type Err = ParseError;

    /// Parses a header block. Lines may be terminated with CRLF or LF; a final
    /// line terminator is optional.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        message::parse_header_block(s.as_bytes())
    }
}

/// A header field name.
///
/// Comparison and hashing are case-insensitive, the original spelling is
/// retained.
#[derive(Clone, Eq)]
pub struct FieldName(Box<str>);

impl FieldName {
    pub fn new(value: impl Into<Box<str>>) -> Result<Self, HeaderFieldError> {
        let value = value.into();
        if value.is_empty() {
            return Err(HeaderFieldError);
        }
        if !value.chars().all(|c| c.is_ascii_graphic() && c != ':') {
            return Err(HeaderFieldError);
        }
        Ok(Self(value))
    }

    pub(crate) fn dkim_signature() -> Self {
        Self(DKIM_SIGNATURE_NAME.into())
    }
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl PartialEq for FieldName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl PartialEq<&str> for FieldName {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

impl Hash for FieldName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

/// A header field body: the raw bytes following the colon.
///
/// Leading whitespace and folding line breaks are part of the body. Bytes need
/// not be UTF-8.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct FieldBody(Box<[u8]>);

impl FieldBody {
    pub fn new(value: impl Into<Box<[u8]>>) -> Result<Self, HeaderFieldError> {
        let value = value.into();

        let lines = split_crlf(&value);

        // only folded continuation lines; whitespace-only lines are obsolete
        // folding syntax (RFC 5322, section 4.2) and accepted
        if !lines
            .iter()
            .skip(1)
            .all(|line| matches!(line.first(), Some(b' ' | b'\t')))
        {
            return Err(HeaderFieldError);
        }
        // no stray CR and LF
        if lines.iter().any(|line| line.contains(&b'\r') || line.contains(&b'\n')) {
            return Err(HeaderFieldError);
        }

        Ok(Self(value))
    }
}

fn split_crlf(value: &[u8]) -> Vec<&[u8]> {
    let mut lines = vec![];
    let mut rest = value;
    while let Some(i) = rest.windows(2).position(|w| w == b"\r\n") {
        lines.push(&rest[..i]);
        rest = &rest[(i + 2)..];
    }
    lines.push(rest);
    lines
}

impl AsRef<[u8]> for FieldBody {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for FieldBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldBody")
            .field(&String::from_utf8_lossy(&self.0))
            .finish()
    }
}
