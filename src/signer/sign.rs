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
    crypto::{self, HashAlgorithm, SigningKey},
    header::{FieldName, HeaderFields},
    message::Message,
    message_hash,
    signature::DKIM_SIGNATURE_NAME,
    signer::{
        format::{self, SigningResult},
        request, ConfigurationError, Expiration, HeaderSelection, SignRequest, SignerError,
        Timestamp,
    },
    util,
};
use std::time::SystemTime;
use tracing::{debug, trace};

pub fn perform_signing(
    request: &SignRequest,
    signing_key: &SigningKey,
    message: &Message,
) -> Result<SigningResult, SignerError> {
    let algorithm = request.algorithm;
    let canonicalization = request.canonicalization;
    let hash_alg = algorithm.hash_algorithm();
    let headers = message.headers();

    // calculate body hash

    let body_hash =
        message_hash::compute_body_hash(hash_alg, canonicalization.body, message.body());

    // select headers

    let signed_headers = select_signed_headers(&request.header_selection, headers);

    debug!(
        "selected headers for signing: {}",
        signed_headers
            .iter()
            .map(|n| n.as_ref())
            .collect::<Vec<_>>()
            .join(":")
    );

    // calculate timestamp and expiration

    let timestamp = request.timestamp.map(|timestamp| match timestamp {
        Timestamp::Now => now_unix_secs(),
        Timestamp::Exact(t) => t,
    });

    let expiration = request.expiration.map(|expiration| match expiration {
        Expiration::After(duration) => timestamp
            .unwrap_or_else(now_unix_secs)
            .saturating_add(duration.as_secs()),
        Expiration::Exact(x) => x,
    });

    if let Some(x) = expiration {
        if x <= timestamp.unwrap_or_else(now_unix_secs) {
            return Err(ConfigurationError::InvalidExpiration.into());
        }
    }

    // prepare complete signature header with body hash except with contents of b= tag

    let mut tags = format::build_tag_list(request, &signed_headers, timestamp, expiration);
    tags.set_body_hash(&util::encode_base64(&body_hash));
    tags.set_signature_data("");
    tags.validate()?;

    let header_value = format::format_header_value(&tags);

    let data_hash = message_hash::compute_data_hash(
        hash_alg,
        canonicalization.header,
        headers,
        &signed_headers,
        DKIM_SIGNATURE_NAME,
        &header_value,
    );

    let signature_data = sign_hash(signing_key, hash_alg, &data_hash)?;

    // insert signature data into the b= tag, the only change to the value

    tags.set_signature_data(&util::encode_base64(&signature_data));

    let header_value = format::format_header_value(&tags);

    debug!(
        "created signature for domain {} with selector {}",
        request.domain, request.selector
    );

    Ok(SigningResult {
        header_name: DKIM_SIGNATURE_NAME.into(),
        header_value,
        body_hash,
        signature_data: signature_data.into(),
        signed_headers: signed_headers.into(),
    })
}

/// Selects the names for the *h=* tag.
///
/// The candidates are kept in order if the message contains such a header
/// field, each name at most once. *DKIM-Signature* is always added last.
fn select_signed_headers(selection: &HeaderSelection, headers: &HeaderFields) -> Vec<FieldName> {
    let candidates = match selection {
        HeaderSelection::Auto => request::default_signed_headers(),
        HeaderSelection::Candidates(names) => names.clone(),
    };

    let mut signed_headers: Vec<FieldName> = vec![];

    for name in candidates {
        if name != DKIM_SIGNATURE_NAME
            && headers.contains(&name)
            && !signed_headers.contains(&name)
        {
            signed_headers.push(name);
        }
    }

    signed_headers.push(FieldName::dkim_signature());

    signed_headers
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |t| t.as_secs())
}

fn sign_hash(
    signing_key: &SigningKey,
    hash_alg: HashAlgorithm,
    data_hash: &[u8],
) -> Result<Vec<u8>, SignerError> {
    match signing_key {
        SigningKey::Rsa(k) => {
            let s = crypto::sign_rsa(hash_alg, k, data_hash)?;
            trace!("RSA signing successful");
            Ok(s)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_signed_headers_auto() {
        let headers: HeaderFields = "Subject: hi\nto: you\nX-Other: x\nFrom: me\nTo: again\n"
            .parse()
            .unwrap();

        let names = select_signed_headers(&HeaderSelection::Auto, &headers);

        assert!(names
            .iter()
            .map(|n| n.as_ref())
            .eq(["From", "To", "Subject", "DKIM-Signature"]));
    }

    #[test]
    fn select_signed_headers_candidates() {
        let headers: HeaderFields = "From: me\nDKIM-Signature: v=1\nX-A: 1\n".parse().unwrap();

        let candidates = ["x-a", "Cc", "From", "DKIM-Signature", "X-A"]
            .into_iter()
            .map(|n| FieldName::new(n).unwrap())
            .collect();

        let names = select_signed_headers(&HeaderSelection::Candidates(candidates), &headers);

        assert!(names
            .iter()
            .map(|n| n.as_ref())
            .eq(["x-a", "From", "DKIM-Signature"]));
    }
}
