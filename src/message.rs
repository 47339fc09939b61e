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

//! The email message model and reader.

use crate::header::{FieldBody, FieldName, HeaderFields};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    str,
};

/// An error that occurs when reading a raw email message.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ParseError {
    /// The input has no empty line separating the header from the body.
    MissingBodySeparator,
    /// A header line is neither a field nor a continuation of a field.
    InvalidFieldLine,
    InvalidFieldName,
    InvalidFieldBody,
    NoHeaderFields,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingBodySeparator => write!(f, "no header/body separator"),
            Self::InvalidFieldLine => write!(f, "malformed header line"),
            Self::InvalidFieldName => write!(f, "invalid header field name"),
            Self::InvalidFieldBody => write!(f, "invalid header field body"),
            Self::NoHeaderFields => write!(f, "no header fields"),
        }
    }
}

impl Error for ParseError {}

/// An email message, consisting of header fields and a body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    headers: HeaderFields,
    body: Box<[u8]>,
}

impl Message {
    pub fn new(headers: HeaderFields, body: impl Into<Box<[u8]>>) -> Self {
        Self {
            headers,
            body: body.into(),
        }
    }

    /// Reads a message from its raw bytes.
    ///
    /// The header ends at the first empty line. Header lines may be terminated
    /// with either CRLF or a bare LF. The body is everything after the empty
    /// line and is kept byte for byte.
    pub fn parse(input: &[u8]) -> Result<Self, ParseError> {
        let (header, body) = split_message(input)?;
        let headers = parse_header_block(header)?;
        Ok(Self::new(headers, body))
    }

    pub fn headers(&self) -> &HeaderFields {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

fn split_message(input: &[u8]) -> Result<(&[u8], &[u8]), ParseError> {
    let mut pos = 0;

    while let Some(i) = input[pos..].iter().position(|&b| b == b'\n') {
        let line = &input[pos..(pos + i)];
        let next = pos + i + 1;

        if line.strip_suffix(b"\r").unwrap_or(line).is_empty() {
            return Ok((&input[..pos], &input[next..]));
        }

        pos = next;
    }

    Err(ParseError::MissingBodySeparator)
}

/// Parses the header section of a message, without the separating empty line.
pub fn parse_header_block(block: &[u8]) -> Result<HeaderFields, ParseError> {
    let block = block.strip_suffix(b"\n").unwrap_or(block);

    if block.is_empty() {
        return Err(ParseError::NoHeaderFields);
    }

    let mut fields: Vec<(FieldName, Vec<u8>)> = vec![];

    for line in block.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);

        if matches!(line.first(), Some(b' ' | b'\t')) {
            let (_, value) = fields.last_mut().ok_or(ParseError::InvalidFieldLine)?;
            value.extend(b"\r\n");
            value.extend(line);
        } else {
            let i = line
                .iter()
                .position(|&b| b == b':')
                .ok_or(ParseError::InvalidFieldLine)?;
            let name = str::from_utf8(&line[..i]).map_err(|_| ParseError::InvalidFieldName)?;
            let name = FieldName::new(name).map_err(|_| ParseError::InvalidFieldName)?;
            fields.push((name, line[(i + 1)..].to_vec()));
        }
    }

    let fields: Vec<_> = fields
        .into_iter()
        .map(|(name, value)| {
            FieldBody::new(value)
                .map(|body| (name, body))
                .map_err(|_| ParseError::InvalidFieldBody)
        })
        .collect::<Result<_, _>>()?;

    HeaderFields::new(fields).map_err(|_| ParseError::NoHeaderFields)
}
