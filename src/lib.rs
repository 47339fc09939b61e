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

//! A library for signing email messages with *DomainKeys Identified Mail*
//! (DKIM) signatures as described in [RFC 6376].
//!
//! The high-level API is [`Signer`]. It is configured with a [`SignRequest`]
//! and a [`SigningKey`], and turns a raw message into the same message with a
//! *DKIM-Signature* header field added. For convenience, the relevant items
//! are re-exported at the top level.
//!
//! The building blocks of the signing process are available in additional
//! modules: canonicalization of header fields and body, computation of the
//! message hashes, and RSA signing.
//!
//! # Usage
//!
//! ```no_run
//! use dkim_sign::{DomainName, Selector, SignRequest, Signer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pem = std::fs::read("private.pem")?;
//!
//! let request = SignRequest::new(DomainName::new("example.com")?, Selector::new("sel")?);
//! let signer = Signer::from_pem(request, pem)?;
//!
//! let _signed = signer.sign(b"From: me@example.com\r\nSubject: hi\r\n\r\nHello!\r\n")?;
//! # Ok(())
//! # }
//! ```
//!
//! A request can also be given in tag-list form, for example
//! `v=1; a=rsa-sha256; c=relaxed/relaxed; d=example.com; s=sel; h=From:To:Subject`.
//!
//! # Cargo features
//!
//! The feature **`pre-rfc8301`** reverts cryptographic algorithm and key usage
//! back to before [RFC 8301]: it lowers the minimum RSA key size to 512 bits,
//! and enables dependency `sha1` and thereby the insecure, historic SHA-1 hash
//! algorithm. This is a legacy compatibility feature, its use is strongly
//! discouraged.
//!
//! [RFC 6376]: https://www.rfc-editor.org/rfc/rfc6376
//! [RFC 8301]: https://www.rfc-editor.org/rfc/rfc8301

pub mod canonicalize;
pub mod crypto;
pub mod header;
pub mod message;
pub mod message_hash;
mod parse;
pub mod signature;
pub mod signer;
pub mod tag_list;
mod util;

pub use crate::{
    crypto::{CryptoError, KeyError, SigningKey},
    header::{FieldBody, FieldName, HeaderField, HeaderFields},
    message::{Message, ParseError},
    signature::{
        Canonicalization, CanonicalizationAlgorithm, DomainName, Selector, SignatureAlgorithm,
    },
    signer::{ConfigurationError, SignRequest, Signer, SignerError, SigningResult},
    util::{decode_base64, encode_base64, Base64Error, CanonicalStr},
};
