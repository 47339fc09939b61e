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

//! Computation of the message hashes.

use crate::{
    canonicalize::{self, BodyCanonicalizer},
    crypto::{self, HashAlgorithm},
    header::{FieldName, HeaderFields},
    signature::{CanonicalizationAlgorithm, DKIM_SIGNATURE_NAME},
};
use tracing::trace;

/// Computes the hash of the header block that is signed.
///
/// The block consists of the selected header fields, each followed by CRLF,
/// and then the DKIM-Signature header field under construction, without a
/// trailing CRLF. A final DKIM-Signature entry in `selected_headers` stands
/// for the header field under construction.
pub fn compute_data_hash(
    hash_alg: HashAlgorithm,
    canon_alg: CanonicalizationAlgorithm,
    headers: &HeaderFields,
    selected_headers: &[FieldName],
    dkim_sig_header_name: &str,
    formatted_dkim_sig_header_value: &str,
) -> Box<[u8]> {
    debug_assert!(dkim_sig_header_name.eq_ignore_ascii_case(DKIM_SIGNATURE_NAME));

    let selected_headers = match selected_headers.split_last() {
        Some((last, rest)) if *last == DKIM_SIGNATURE_NAME => rest,
        _ => selected_headers,
    };

    // canonicalize selected headers
    let mut cheaders = canonicalize::canonicalize_headers(canon_alg, headers, selected_headers);

    // canonicalize DKIM-Signature header
    canonicalize::canonicalize_header(
        &mut cheaders,
        canon_alg,
        dkim_sig_header_name,
        formatted_dkim_sig_header_value,
    );

    // produce message digest of the canonicalized value
    crypto::digest(hash_alg, &cheaders)
}

/// Computes the hash of the canonicalized message body.
pub fn compute_body_hash(
    hash_alg: HashAlgorithm,
    canon_alg: CanonicalizationAlgorithm,
    body: &[u8],
) -> Box<[u8]> {
    let mut hasher = BodyHasher::new(hash_alg, canon_alg);
    hasher.hash_chunk(body);
    hasher.finish()
}

/// A producer of a *body hash*.
///
/// The body hasher canonicalises and hashes chunks of the message body.
pub struct BodyHasher {
    canonicalizer: BodyCanonicalizer,
    digest: Box<dyn digest::DynDigest + Send>,
    bytes_written: usize,
}

impl BodyHasher {
    pub fn new(hash_alg: HashAlgorithm, canon_alg: CanonicalizationAlgorithm) -> Self {
        Self {
            canonicalizer: BodyCanonicalizer::new(canon_alg),
            digest: crypto::new_hasher(hash_alg),
            bytes_written: 0,
        }
    }

    pub fn hash_chunk(&mut self, chunk: &[u8]) {
        let canonicalized_chunk = self.canonicalizer.canonicalize_chunk(chunk);
        self.digest.update(&canonicalized_chunk);
        self.bytes_written += canonicalized_chunk.len();
    }

    pub fn finish(mut self) -> Box<[u8]> {
        let canonicalized_chunk = self.canonicalizer.finish();
        self.digest.update(&canonicalized_chunk);
        self.bytes_written += canonicalized_chunk.len();

        trace!("hashed {} bytes of canonicalized body", self.bytes_written);

        self.digest.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util;

    #[test]
    fn body_hash_empty_bodies() {
        use CanonicalizationAlgorithm::*;

        // See §3.4.3 and §3.4.4:
        assert_eq!(
            util::encode_base64(compute_body_hash(HashAlgorithm::Sha256, Simple, b"")),
            "frcCV1k9oG9oKj3dpUqdJg1PxRT2RSN/XKdLCPjaYaY="
        );
        assert_eq!(
            util::encode_base64(compute_body_hash(HashAlgorithm::Sha256, Relaxed, b"")),
            "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn body_hasher_chunks() {
        let mut hasher = BodyHasher::new(HashAlgorithm::Sha256, CanonicalizationAlgorithm::Simple);
        hasher.hash_chunk(b"well  hello \r\n");
        hasher.hash_chunk(b"\r\n what agi \r");
        hasher.hash_chunk(b"\n\r\n");

        assert_eq!(
            hasher.finish(),
            sha256_digest(b"well  hello \r\n\r\n what agi \r\n")
        );
    }

    #[test]
    fn body_hasher_known_hash_sample() {
        let body = b"\
Hello Proff,\r\n\
\r\n\
Let\xe2\x80\x99s try this again, with line\r\n\
breaks and empty lines even.\r\n\
\r\n\
Ciao, und bis bald\r\n\
\r\n\
\r\n\
-- \r\n\
David\r\n\
";

        let hash = compute_body_hash(HashAlgorithm::Sha256, CanonicalizationAlgorithm::Relaxed, body);

        assert_eq!(
            util::encode_base64(hash),
            "RMSbeRTj/zCxWeWQXpEIbiqxH0Jqg5eYs4ORzOt3MT0="
        );
    }

    #[test]
    fn data_hash_ends_with_signature_header() {
        let headers = HeaderFields::from_vec(vec![
            ("From".to_owned(), b" me@example.com".to_vec()),
            ("Subject".to_owned(), b"  Hi  there".to_vec()),
        ])
        .unwrap();
        let selected = [
            FieldName::new("From").unwrap(),
            FieldName::new("Subject").unwrap(),
            FieldName::dkim_signature(),
        ];

        let hash = compute_data_hash(
            HashAlgorithm::Sha256,
            CanonicalizationAlgorithm::Relaxed,
            &headers,
            &selected,
            DKIM_SIGNATURE_NAME,
            " v=1; b=",
        );

        assert_eq!(
            hash,
            sha256_digest(b"from:me@example.com\r\nsubject:Hi there\r\ndkim-signature:v=1; b=")
        );
    }

    fn sha256_digest(msg: &[u8]) -> Box<[u8]> {
        crypto::digest(HashAlgorithm::Sha256, msg)
    }
}
