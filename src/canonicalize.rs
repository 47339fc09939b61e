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

//! Canonicalization utilities.

use crate::{
    header::{FieldName, HeaderFields},
    signature::CanonicalizationAlgorithm,
};
use std::collections::HashSet;

const SP: u8 = b' ';
const CR: u8 = b'\r';
const LF: u8 = b'\n';
const CRLF: [u8; 2] = [CR, LF];

fn is_wsp(b: u8) -> bool {
    matches!(b, b'\t' | b' ')
}

/// A canonicalizer using the body canonicalization algorithm.
///
/// Input may be fed in chunks of any size; the concatenated output does not
/// depend on where the chunk boundaries fall.
pub struct BodyCanonicalizer {
    kind: CanonicalizationAlgorithm,
    pending_cr: bool,  // CR seen, not yet known whether it starts a CRLF
    pending_wsp: bool,  // relaxed only: WSP run seen since the last content byte
    blank_line: bool,  // whether currently on an empty or blank line
    empty_lines: usize,  // number of empty lines seen and held back
    emitted: bool,  // whether any content byte has been output
}

impl BodyCanonicalizer {
    pub fn simple() -> Self {
        Self::new(CanonicalizationAlgorithm::Simple)
    }

    pub fn relaxed() -> Self {
        Self::new(CanonicalizationAlgorithm::Relaxed)
    }

    pub fn new(kind: CanonicalizationAlgorithm) -> Self {
        Self {
            kind,
            pending_cr: false,
            pending_wsp: false,
            blank_line: true,
            empty_lines: 0,
            emitted: false,
        }
    }

    // CRLF and bare LF both terminate a line and come out as CRLF; a stray CR
    // is treated like other bytes
    pub fn canonicalize_chunk(&mut self, bytes: &[u8]) -> Vec<u8> {
        let mut result = Vec::with_capacity(bytes.len());

        for &b in bytes {
            if self.pending_cr {
                self.pending_cr = false;
                if b == LF {
                    self.end_line(&mut result);
                    continue;
                }
                self.push_content(&mut result, CR);
            }

            match b {
                CR => self.pending_cr = true,
                LF => self.end_line(&mut result),
                b if is_wsp(b) && self.kind == CanonicalizationAlgorithm::Relaxed => {
                    self.pending_wsp = true;
                }
                b => self.push_content(&mut result, b),
            }
        }

        result
    }

    pub fn finish(mut self) -> Vec<u8> {
        let mut result = vec![];

        if self.pending_cr {
            self.push_content(&mut result, CR);
        }

        // trailing WSP on the last line is dropped in relaxed mode

        if !self.blank_line {
            // last line lacked a terminator
            result.extend(CRLF);
        } else if !self.emitted && self.kind == CanonicalizationAlgorithm::Simple {
            // empty body is CRLF
            result.extend(CRLF);
        }

        result
    }

    fn end_line(&mut self, result: &mut Vec<u8>) {
        self.pending_wsp = false;
        if self.blank_line {
            self.empty_lines += 1;
        } else {
            result.extend(CRLF);
            self.blank_line = true;
        }
    }

    fn push_content(&mut self, result: &mut Vec<u8>, b: u8) {
        self.flush_empty_lines(result);
        if self.pending_wsp {
            result.push(SP);
            self.pending_wsp = false;
        }
        result.push(b);
        self.emitted = true;
    }

    // write out remembered empty lines before processing a byte that ends a
    // section of empty lines
    fn flush_empty_lines(&mut self, result: &mut Vec<u8>) {
        for _ in 0..self.empty_lines {
            result.extend(CRLF);
        }
        self.empty_lines = 0;
        self.blank_line = false;
    }
}

/// Canonicalizes a complete message body.
pub fn canonicalize_body(algorithm: CanonicalizationAlgorithm, body: &[u8]) -> Vec<u8> {
    let mut canonicalizer = BodyCanonicalizer::new(algorithm);
    let mut result = canonicalizer.canonicalize_chunk(body);
    result.extend(canonicalizer.finish());
    result
}

/// Produces the header canonicalization result for some header fields.
///
/// Each selected name consumes the next unused instance of that header field,
/// starting from the bottom of the header. Names without a remaining instance
/// contribute nothing.
pub fn canonicalize_headers(
    canon_alg: CanonicalizationAlgorithm,
    headers: &HeaderFields,
    selected_headers: &[FieldName],
) -> Vec<u8> {
    let mut result = vec![];
    let mut processed_indexes = HashSet::with_capacity(selected_headers.len());

    for selected_header in selected_headers {
        for (i, (name, val)) in headers
            .as_ref()
            .iter()
            .rev()
            .enumerate()
            .filter(|(i, _)| !processed_indexes.contains(i))
        {
            if name == selected_header {
                canonicalize_header(&mut result, canon_alg, name, val);

                result.extend(CRLF);

                processed_indexes.insert(i);

                break;
            }
        }
    }

    result
}

/// Canonicalizes a single header field, without line terminator.
pub fn canonicalize_header_field(
    algorithm: CanonicalizationAlgorithm,
    name: impl AsRef<str>,
    value: impl AsRef<[u8]>,
) -> Vec<u8> {
    let mut result = vec![];
    canonicalize_header(&mut result, algorithm, name, value);
    result
}

/// Canonicalizes a header field into some result vector.
pub fn canonicalize_header(
    result: &mut Vec<u8>,
    algorithm: CanonicalizationAlgorithm,
    name: impl AsRef<str>,
    value: impl AsRef<[u8]>,
) {
    let name = name.as_ref();
    let value = value.as_ref();

    match algorithm {
        CanonicalizationAlgorithm::Simple => {
            result.extend(name.bytes());
            result.push(b':');
            result.extend(value);
        }
        CanonicalizationAlgorithm::Relaxed => {
            result.extend(name.to_ascii_lowercase().bytes());
            result.push(b':');
            canonicalize_header_relaxed(result, value);
        }
    }
}

fn canonicalize_header_relaxed(canon_headers: &mut Vec<u8>, value: &[u8]) {
    fn is_space(b: u8) -> bool {
        matches!(b, b' ' | b'\t' | b'\r' | b'\n')
    }

    let start = value.iter().position(|&b| !is_space(b)).unwrap_or(value.len());
    let end = value.iter().rposition(|&b| !is_space(b)).map_or(start, |i| i + 1);
    let value = &value[start..end];

    let mut compressing = false;
    for &b in value {
        if is_space(b) {
            if !compressing {
                canon_headers.push(SP);
                compressing = true;
            }
        } else {
            canon_headers.push(b);
            compressing = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_headers_relaxed_ok() {
        let headers = HeaderFields::from_vec(vec![
            ("from".to_owned(), b" Good \t ".to_vec()),
            ("to".to_owned(), b" see   me".to_vec()),
            ("Date".to_owned(), b" Fri 24\r\n\tfoo".to_vec()),
            ("To".to_owned(), b" another one".to_vec()),
        ])
        .unwrap();

        let selected_headers = vec![
            FieldName::new("to").unwrap(),
            FieldName::new("from").unwrap(),
            FieldName::new("to").unwrap(),
            FieldName::new("Cc").unwrap(),
        ];

        assert_eq!(
            canonicalize_headers(CanonicalizationAlgorithm::Relaxed, &headers, &selected_headers),
            b"to:another one\r\nfrom:Good\r\nto:see me\r\n",
        );
    }

    #[test]
    fn canonicalize_headers_simple_ok() {
        let headers = HeaderFields::from_vec(vec![
            ("From".to_owned(), b" Good \t ".to_vec()),
            ("Date".to_owned(), b" Fri 24\r\n\tfoo".to_vec()),
        ])
        .unwrap();

        let selected_headers = vec![FieldName::new("date").unwrap(), FieldName::new("from").unwrap()];

        assert_eq!(
            canonicalize_headers(CanonicalizationAlgorithm::Simple, &headers, &selected_headers),
            b"Date: Fri 24\r\n\tfoo\r\nFrom: Good \t \r\n",
        );
    }

    #[test]
    fn canonicalize_header_field_relaxed() {
        use CanonicalizationAlgorithm::*;

        assert_eq!(
            canonicalize_header_field(Relaxed, "Subject", " Hello   fook"),
            b"subject:Hello fook",
        );
        assert_eq!(
            canonicalize_header_field(Relaxed, "Date", " Fri 24\r\n\t foo \t"),
            b"date:Fri 24 foo",
        );
        assert_eq!(
            canonicalize_header_field(Relaxed, "Subject", " a\r\n \r\n b"),
            b"subject:a b",
        );
        assert_eq!(canonicalize_header_field(Relaxed, "X", ""), b"x:");
        assert_eq!(canonicalize_header_field(Relaxed, "X", " \t "), b"x:");
        assert_eq!(
            canonicalize_header_field(Simple, "Subject", " Hello   fook"),
            b"Subject: Hello   fook",
        );
    }

    #[test]
    fn canonicalize_header_field_relaxed_idempotent() {
        use CanonicalizationAlgorithm::Relaxed;

        let once = canonicalize_header_field(Relaxed, "SUBJECT", " a \t b\r\n  c ");
        let (name, value) = once.split_at(once.iter().position(|&b| b == b':').unwrap());
        let twice = canonicalize_header_field(
            Relaxed,
            std::str::from_utf8(name).unwrap(),
            &value[1..],
        );

        assert_eq!(once, b"subject:a b c");
        assert_eq!(once, twice);
    }

    #[test]
    fn body_canon_simple_ok() {
        let bc = BodyCanonicalizer::simple();

        let body = canonicalize_chunks(
            bc,
            &[b"well  hello \r\n", b"\r\n what agi \r\n\r\n", b"\r\n"],
        );

        assert_eq!(body, b"well  hello \r\n\r\n what agi \r\n");
    }

    #[test]
    fn body_canon_simple_empty() {
        use CanonicalizationAlgorithm::Simple;

        assert_eq!(canonicalize_body(Simple, b""), b"\r\n");
        assert_eq!(canonicalize_body(Simple, b"\r\n"), b"\r\n");
        assert_eq!(canonicalize_body(Simple, b"\r\n\r\n\r\n"), b"\r\n");
        assert_eq!(canonicalize_body(Simple, b"abc"), b"abc\r\n");
        assert_eq!(canonicalize_body(Simple, b"  \r\n"), b"  \r\n");
    }

    #[test]
    fn body_canon_relaxed_basic() {
        let bc = BodyCanonicalizer::relaxed();

        let body = canonicalize_chunks(
            bc,
            &[b"well  hello \r\n", b"\r\n what agi \r\n\r\n", b"\r\n"],
        );

        assert_eq!(body, b"well hello\r\n\r\n what agi\r\n");
    }

    #[test]
    fn body_canon_relaxed_empty() {
        use CanonicalizationAlgorithm::Relaxed;

        assert_eq!(canonicalize_body(Relaxed, b""), b"");
        assert_eq!(canonicalize_body(Relaxed, b"\r\n"), b"");
        assert_eq!(canonicalize_body(Relaxed, b" \t\r\n \r\n"), b"");
        assert_eq!(canonicalize_body(Relaxed, b"abc  "), b"abc\r\n");
    }

    #[test]
    fn body_canon_relaxed_small_chunks() {
        let bc = BodyCanonicalizer::relaxed();

        let body = canonicalize_chunks(
            bc,
            &[
                b"well ",
                b" hello \r",
                b"\n\r",
                b"\n ",
                b"what",
                b" agi \r\n",
                b"\r\n\r",
                b"\n",
            ],
        );

        assert_eq!(body, b"well hello\r\n\r\n what agi\r\n");
    }

    #[test]
    fn body_canon_bare_lf() {
        use CanonicalizationAlgorithm::*;

        assert_eq!(canonicalize_body(Simple, b"a\nb\n\n"), b"a\r\nb\r\n");
        assert_eq!(canonicalize_body(Relaxed, b"a \n\n b\n"), b"a\r\n\r\n b\r\n");
    }

    #[test]
    fn body_canon_stray_cr() {
        use CanonicalizationAlgorithm::*;

        assert_eq!(canonicalize_body(Simple, b"a\rb\r\n"), b"a\rb\r\n");
        assert_eq!(canonicalize_body(Simple, b"a\r"), b"a\r\r\n");
        assert_eq!(canonicalize_body(Relaxed, b"a \r b"), b"a \r b\r\n");
        assert_eq!(canonicalize_body(Relaxed, b"\r\n\r\r\n"), b"\r\n\r\r\n");
    }

    #[test]
    fn body_canon_idempotent() {
        use CanonicalizationAlgorithm::*;

        let bodies: [&[u8]; 5] = [
            b"",
            b"\r\n\r\n",
            b"  lead\t and trail \t\r\n\r\nnext\r\n\r\n",
            b"no terminator  ",
            b"bare\nlf \n\n",
        ];

        for alg in [Simple, Relaxed] {
            for body in bodies {
                let once = canonicalize_body(alg, body);
                assert_eq!(canonicalize_body(alg, &once), once);
            }
        }
    }

    #[test]
    fn body_canon_relaxed_no_double_spaces() {
        let body = canonicalize_body(
            CanonicalizationAlgorithm::Relaxed,
            b"a  \t b\t\tc \r\n  d   \r\n",
        );

        assert_eq!(body, b"a b c\r\n d\r\n");
        assert!(!body.windows(2).any(|w| w == b"  "));
    }

    fn canonicalize_chunks(mut bc: BodyCanonicalizer, chunks: &[&[u8]]) -> Vec<u8> {
        let mut result = vec![];
        for c in chunks {
            result.extend(bc.canonicalize_chunk(c));
        }
        result.extend(bc.finish());
        result
    }
}
