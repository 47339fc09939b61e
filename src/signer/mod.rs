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

//! Signer and supporting types.

mod format;
mod request;
mod sign;

pub use self::{
    format::SigningResult,
    request::{
        default_signed_headers, Expiration, HeaderSelection, SignRequest, Timestamp,
        DEFAULT_SIGNED_HEADERS,
    },
};

use crate::{
    crypto::{CryptoError, KeyError, SigningKey},
    message::{Message, ParseError},
};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// An error in the signing configuration.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ConfigurationError {
    /// A required tag is absent or has an empty value.
    MissingTag(&'static str),
    /// A tag that is computed during signing was supplied.
    ComputedTag(&'static str),
    DuplicateTag,
    /// A tag that is not supported for signing was supplied.
    UnsupportedTag(&'static str),
    InvalidTagList,
    UnsupportedVersion,
    UnsupportedAlgorithm,
    InvalidCanonicalization,
    InvalidDomain,
    InvalidSelector,
    InvalidSignedHeaders,
    InvalidTimestamp,
    InvalidExpiration,
    InvalidExtraTags,
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTag(name) => write!(f, "missing required tag {name}="),
            Self::ComputedTag(name) => write!(f, "tag {name}= is computed and must not be supplied"),
            Self::DuplicateTag => write!(f, "duplicate tag"),
            Self::UnsupportedTag(name) => write!(f, "unsupported tag {name}="),
            Self::InvalidTagList => write!(f, "ill-formed tag list"),
            Self::UnsupportedVersion => write!(f, "unsupported version"),
            Self::UnsupportedAlgorithm => write!(f, "unsupported signature algorithm"),
            Self::InvalidCanonicalization => write!(f, "invalid canonicalization"),
            Self::InvalidDomain => write!(f, "invalid signing domain"),
            Self::InvalidSelector => write!(f, "invalid selector"),
            Self::InvalidSignedHeaders => write!(f, "invalid signed header names"),
            Self::InvalidTimestamp => write!(f, "invalid timestamp"),
            Self::InvalidExpiration => write!(f, "invalid expiration"),
            Self::InvalidExtraTags => write!(f, "invalid additional tags"),
        }
    }
}

impl Error for ConfigurationError {}

/// An error that occurs when using a [`Signer`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SignerError {
    Configuration(ConfigurationError),
    Key(KeyError),
    Parse(ParseError),
    Crypto(CryptoError),
}

impl Display for SignerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(_) => write!(f, "invalid signing configuration"),
            Self::Key(_) => write!(f, "unusable signing key"),
            Self::Parse(_) => write!(f, "malformed message"),
            Self::Crypto(_) => write!(f, "cryptographic failure"),
        }
    }
}

impl Error for SignerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Configuration(e) => Some(e),
            Self::Key(e) => Some(e),
            Self::Parse(e) => Some(e),
            Self::Crypto(e) => Some(e),
        }
    }
}

impl From<ConfigurationError> for SignerError {
    fn from(error: ConfigurationError) -> Self {
        Self::Configuration(error)
    }
}

impl From<KeyError> for SignerError {
    fn from(error: KeyError) -> Self {
        Self::Key(error)
    }
}

impl From<ParseError> for SignerError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<CryptoError> for SignerError {
    fn from(error: CryptoError) -> Self {
        Self::Crypto(error)
    }
}

/// A signer for email messages.
///
/// A signer is created from a validated [`SignRequest`] and a signing key. It
/// holds no mutable state, so one signer can sign any number of messages, also
/// concurrently from several threads. To share a key between signers, use an
/// `Arc<SigningKey>` as the key handle.
pub struct Signer<T = SigningKey> {
    request: SignRequest,
    signing_key: T,
}

impl<T> Signer<T>
where
    T: AsRef<SigningKey>,
{
    /// Creates a signer after validating the request and the key.
    pub fn new(request: SignRequest, signing_key: T) -> Result<Self, SignerError> {
        request.validate()?;
        signing_key.as_ref().validate()?;

        Ok(Self { request, signing_key })
    }

    pub fn request(&self) -> &SignRequest {
        &self.request
    }

    pub fn signing_key(&self) -> &SigningKey {
        self.signing_key.as_ref()
    }

    /// Signs a message and returns the signature without assembling the
    /// output message.
    pub fn sign_message(&self, message: &Message) -> Result<SigningResult, SignerError> {
        sign::perform_signing(&self.request, self.signing_key.as_ref(), message)
    }

    /// Signs a raw message.
    ///
    /// The result is the message with a *DKIM-Signature* header field added
    /// as the last header field. Header lines are terminated with CRLF, the
    /// body is copied unchanged.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, SignerError> {
        let message = Message::parse(message)?;

        let result = self.sign_message(&message)?;

        Ok(result.assemble(&message))
    }
}

impl Signer<SigningKey> {
    /// Creates a signer with a key read from PEM data.
    pub fn from_pem(request: SignRequest, pem: impl AsRef<[u8]>) -> Result<Self, SignerError> {
        let signing_key = SigningKey::from_pem(pem)?;
        Self::new(request, signing_key)
    }
}
