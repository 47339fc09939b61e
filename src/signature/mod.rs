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

//! Signature value types.

mod names;

pub use names::{DomainName, ParseDomainError, Selector};

use crate::{crypto::HashAlgorithm, util::CanonicalStr};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};

/// The name of the header field that carries a DKIM signature.
pub const DKIM_SIGNATURE_NAME: &str = "DKIM-Signature";

/// A signature algorithm.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum SignatureAlgorithm {
    /// The *rsa-sha256* signature algorithm.
    #[default]
    RsaSha256,
    /// The historic *rsa-sha1* signature algorithm.
    #[cfg(feature = "pre-rfc8301")]
    RsaSha1,
}

impl SignatureAlgorithm {
    /// Returns this signature algorithm’s hash algorithm.
    pub fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::RsaSha256 => HashAlgorithm::Sha256,
            #[cfg(feature = "pre-rfc8301")]
            Self::RsaSha1 => HashAlgorithm::Sha1,
        }
    }
}


impl CanonicalStr for SignatureAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::RsaSha256 => "rsa-sha256",
            #[cfg(feature = "pre-rfc8301")]
            Self::RsaSha1 => "rsa-sha1",
        }
    }
}

impl Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("rsa-sha256") {
            return Ok(Self::RsaSha256);
        }
        #[cfg(feature = "pre-rfc8301")]
        {
            if s.eq_ignore_ascii_case("rsa-sha1") {
                return Ok(Self::RsaSha1);
            }
        }
        Err("unsupported signature algorithm")
    }
}

/// A canonicalization algorithm.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum CanonicalizationAlgorithm {
    /// The *simple* canonicalization algorithm.
    #[default]
    Simple,
    /// The *relaxed* canonicalization algorithm.
    Relaxed,
}

impl CanonicalStr for CanonicalizationAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Relaxed => "relaxed",
        }
    }
}

impl Display for CanonicalizationAlgorithm {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

impl FromStr for CanonicalizationAlgorithm {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("simple") {
            Ok(Self::Simple)
        } else if s.eq_ignore_ascii_case("relaxed") {
            Ok(Self::Relaxed)
        } else {
            Err("unknown canonicalization algorithm")
        }
    }
}

/// A pair of header/body canonicalization algorithms.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
pub struct Canonicalization {
    /// The header canonicalization.
    pub header: CanonicalizationAlgorithm,
    /// The body canonicalization.
    pub body: CanonicalizationAlgorithm,
}

impl From<(CanonicalizationAlgorithm, CanonicalizationAlgorithm)> for Canonicalization {
    fn from((header, body): (CanonicalizationAlgorithm, CanonicalizationAlgorithm)) -> Self {
        Self { header, body }
    }
}

impl CanonicalStr for Canonicalization {
    fn canonical_str(&self) -> &'static str {
        use CanonicalizationAlgorithm::*;

        match (self.header, self.body) {
            (Simple, Simple) => "simple/simple",
            (Simple, Relaxed) => "simple/relaxed",
            (Relaxed, Simple) => "relaxed/simple",
            (Relaxed, Relaxed) => "relaxed/relaxed",
        }
    }
}

impl Display for Canonicalization {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_str())
    }
}

impl fmt::Debug for Canonicalization {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", &self.header, &self.body)
    }
}

impl FromStr for Canonicalization {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if let Some((header, body)) = s.split_once('/') {
            Self {
                header: CanonicalizationAlgorithm::from_str(header)?,
                body: CanonicalizationAlgorithm::from_str(body)?,
            }
        } else {
            Self {
                header: CanonicalizationAlgorithm::from_str(s)?,
                body: Default::default(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CanonicalizationAlgorithm::*;

    #[test]
    fn canonicalization_from_str() {
        assert_eq!("relaxed/simple".parse(), Ok(Canonicalization::from((Relaxed, Simple))));
        assert_eq!("Relaxed/Relaxed".parse(), Ok(Canonicalization::from((Relaxed, Relaxed))));
        assert_eq!("relaxed".parse(), Ok(Canonicalization::from((Relaxed, Simple))));

        assert!("relaxed/".parse::<Canonicalization>().is_err());
        assert!("strict/simple".parse::<Canonicalization>().is_err());
    }

    #[test]
    fn canonicalization_display() {
        assert_eq!(Canonicalization::from((Simple, Relaxed)).to_string(), "simple/relaxed");
    }

    #[test]
    fn signature_algorithm_from_str() {
        assert_eq!("rsa-sha256".parse(), Ok(SignatureAlgorithm::RsaSha256));
        assert!("ed25519-sha256".parse::<SignatureAlgorithm>().is_err());
        assert_eq!(SignatureAlgorithm::RsaSha256.hash_algorithm(), HashAlgorithm::Sha256);
    }

    #[cfg(feature = "pre-rfc8301")]
    #[test]
    fn signature_algorithm_sha1() {
        assert_eq!("rsa-sha1".parse(), Ok(SignatureAlgorithm::RsaSha1));
        assert_eq!(SignatureAlgorithm::RsaSha1.to_string(), "rsa-sha1");
    }
}
