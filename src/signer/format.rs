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

use crate::{
    header::FieldName,
    message::Message,
    signer::SignRequest,
    tag_list::TagListBuilder,
    util::CanonicalStr,
};

/// The outcome of signing a message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SigningResult {
    // Usage: header_name and header_value are meant to be concatenated with
    // only an intervening colon, no additional whitespace! this is vital for
    // "simple" header canonicalization where whitespace changes are not allowed
    /// The header name, *DKIM-Signature*.
    pub header_name: String,
    /// The header value, beginning with a single space.
    pub header_value: String,
    /// The body hash recorded in the *bh=* tag.
    pub body_hash: Box<[u8]>,
    /// The signature data recorded in the *b=* tag.
    pub signature_data: Box<[u8]>,
    /// The header names recorded in the *h=* tag.
    pub signed_headers: Box<[FieldName]>,
}

impl SigningResult {
    /// Formats the complete *DKIM-Signature* header field, without line
    /// terminator.
    pub fn format_header(&self) -> String {
        format!("{}:{}", self.header_name, self.header_value)
    }

    /// Produces the signed message.
    ///
    /// The original header fields come first in their original order, then
    /// the *DKIM-Signature* header field, then an empty line and the body.
    pub fn assemble(&self, message: &Message) -> Vec<u8> {
        let body = message.body();

        let mut result = Vec::with_capacity(body.len() + 1024);

        for (name, value) in message.headers().as_ref() {
            result.extend(name.as_ref().bytes());
            result.push(b':');
            result.extend(value.as_ref());
            result.extend(b"\r\n");
        }

        result.extend(self.format_header().bytes());
        result.extend(b"\r\n");
        result.extend(b"\r\n");
        result.extend(body);

        result
    }
}

/// Builds the tag list of a signature in emission order, with empty *bh=*
/// and *b=* tags.
pub fn build_tag_list(
    request: &SignRequest,
    signed_headers: &[FieldName],
    timestamp: Option<u64>,
    expiration: Option<u64>,
) -> TagListBuilder {
    let mut tags = TagListBuilder::new();

    tags.set("v", "1");
    tags.set("a", request.algorithm.canonical_str());
    tags.set("c", request.canonicalization.canonical_str());
    tags.set("d", request.domain.as_ref());
    tags.set("s", request.selector.as_ref());

    if let Some(t) = timestamp {
        tags.set("t", t.to_string());
    }
    if let Some(x) = expiration {
        tags.set("x", x.to_string());
    }

    for (name, value) in &request.extra_tags {
        tags.set(name.as_str(), value.as_str());
    }

    tags.set_field_list(signed_headers);
    tags.set_body_hash("");
    tags.set_signature_data("");

    tags
}

/// Formats the header value for a tag list. The value begins with a single
/// space after the colon.
pub fn format_header_value(tags: &TagListBuilder) -> String {
    format!(" {}", tags.serialize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::{DomainName, Selector};

    fn make_request() -> SignRequest {
        let mut request = SignRequest::new(
            DomainName::new("example.com").unwrap(),
            Selector::new("sel").unwrap(),
        );
        request.extra_tags = vec![("i".into(), "@example.com".into())];
        request
    }

    #[test]
    fn build_tag_list_order() {
        let names = [FieldName::new("From").unwrap(), FieldName::dkim_signature()];

        let tags = build_tag_list(&make_request(), &names, Some(100), Some(200));

        assert_eq!(
            format_header_value(&tags),
            " v=1; a=rsa-sha256; c=relaxed/relaxed; d=example.com; s=sel; t=100; x=200; \
             i=@example.com; h=From:DKIM-Signature; bh=; b="
        );
    }

    #[test]
    fn build_tag_list_without_timestamp() {
        let names = [FieldName::dkim_signature()];

        let tags = build_tag_list(&make_request(), &names, None, None);

        assert!(tags.iter().map(|(n, _)| n).eq(["v", "a", "c", "d", "s", "i", "h", "bh", "b"]));
    }

    #[test]
    fn assemble_message() {
        let message = Message::parse(b"From: me\nSubject: a\n b\n\nbody\n").unwrap();

        let result = SigningResult {
            header_name: "DKIM-Signature".into(),
            header_value: " v=1; b=YQ==".into(),
            body_hash: Box::new([]),
            signature_data: Box::new([b'a']),
            signed_headers: Box::new([]),
        };

        assert_eq!(result.format_header(), "DKIM-Signature: v=1; b=YQ==");
        assert_eq!(
            result.assemble(&message),
            b"From: me\r\nSubject: a\r\n b\r\nDKIM-Signature: v=1; b=YQ==\r\n\r\nbody\n"
        );
    }
}
