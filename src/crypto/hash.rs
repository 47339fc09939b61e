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

use crate::crypto::HashAlgorithm;
use digest::DynDigest;
#[cfg(feature = "pre-rfc8301")]
use sha1::Sha1;
use sha2::Sha256;

/// Computes the digest of the given bytes.
pub fn digest(hash_alg: HashAlgorithm, bytes: &[u8]) -> Box<[u8]> {
    digest_slices(hash_alg, [bytes])
}

/// Computes the digest of the concatenation of the given byte slices.
pub fn digest_slices<I, T>(hash_alg: HashAlgorithm, slices: I) -> Box<[u8]>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    let mut hasher = new_hasher(hash_alg);
    for bytes in slices {
        hasher.update(bytes.as_ref());
    }
    hasher.finalize()
}

pub(crate) fn new_hasher(hash_alg: HashAlgorithm) -> Box<dyn DynDigest + Send> {
    match hash_alg {
        HashAlgorithm::Sha256 => Box::new(Sha256::default()),
        #[cfg(feature = "pre-rfc8301")]
        HashAlgorithm::Sha1 => Box::new(Sha1::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::encode_base64;

    #[test]
    fn digest_rfc_examples() {
        // See §3.4.3:
        let hash = digest(HashAlgorithm::Sha256, b"\r\n");
        assert_eq!(encode_base64(hash), "frcCV1k9oG9oKj3dpUqdJg1PxRT2RSN/XKdLCPjaYaY=");

        // See §3.4.4:
        let hash = digest(HashAlgorithm::Sha256, b"");
        assert_eq!(encode_base64(hash), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
    }

    #[cfg(feature = "pre-rfc8301")]
    #[test]
    fn digest_rfc_examples_sha1() {
        let hash = digest(HashAlgorithm::Sha1, b"\r\n");
        assert_eq!(encode_base64(hash), "uoq1oCgLlTqpdDX/iUbLy7J1Wic=");

        let hash = digest(HashAlgorithm::Sha1, b"");
        assert_eq!(encode_base64(hash), "2jmj7l5rSw0yVb/vlWAYkK/YBwk=");
    }

    #[test]
    fn digest_slices_concatenates() {
        assert_eq!(
            digest_slices(HashAlgorithm::Sha256, ["ab", "", "c"]),
            digest(HashAlgorithm::Sha256, b"abc"),
        );
    }
}
