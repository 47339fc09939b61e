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

use crate::tag_list;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseDomainError;

impl Display for ParseDomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "could not parse domain name")
    }
}

impl Error for ParseDomainError {}

/// A domain name.
///
/// This type is used to wrap the signing domain in the d= tag.
#[derive(Clone, Eq)]
pub struct DomainName(Box<str>);

impl DomainName {
    /// Creates a new domain name from the given string.
    ///
    /// Note that the string is validated and then encapsulated as-is.
    /// Equivalence comparison is case-insensitive.
    pub fn new(s: &str) -> Result<Self, ParseDomainError> {
        if s.ends_with('.') {
            return Err(ParseDomainError);
        }

        if is_valid_dns_name(s) && idna::domain_to_ascii(s).is_ok() {
            Ok(Self(s.into()))
        } else {
            Err(ParseDomainError)
        }
    }
}

impl Display for DomainName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &self.0)
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq for DomainName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Hash for DomainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

fn is_valid_dns_name(s: &str) -> bool {
    fn is_tld(s: &str) -> bool {
        is_label(s) && !s.chars().all(|c: char| c.is_ascii_digit())
    }

    if !has_valid_domain_len(s) {
        return false;
    }

    let mut labels = s.split('.').rev().peekable();

    if matches!(labels.next(), Some(l) if !is_tld(l)) {
        return false;
    }
    if labels.peek().is_none() {
        return false;
    }

    labels.all(is_label)
}

// Note that tval char forbids ; as that makes no sense in DKIM signatures.
fn is_label(s: &str) -> bool {
    has_valid_label_len(s)
        && !s.starts_with('-')
        && !s.ends_with('-')
        && s.chars().all(tag_list::is_tval_char)
}

const MAX_DOMAIN_LENGTH: usize = 253;

fn has_valid_domain_len(s: &str) -> bool {
    matches!(s.len(), 1..=MAX_DOMAIN_LENGTH)
}

fn has_valid_label_len(s: &str) -> bool {
    matches!(s.len(), 1..=63)
}

/// A selector.
///
/// This type is used to wrap a sequence of labels as used in the s= tag.
#[derive(Clone, Eq)]
pub struct Selector(Box<str>);

impl Selector {
    /// Creates a new selector from the given string.
    ///
    /// Note that the string is validated and then encapsulated as-is.
    /// Equivalence comparison is case-insensitive.
    pub fn new(s: &str) -> Result<Self, ParseDomainError> {
        // lenient parsing of domain name labels, allows things like "dkim_123"
        if !s.split('.').all(is_label) {
            return Err(ParseDomainError);
        }

        let _ = idna::domain_to_ascii(s).map_err(|_| ParseDomainError)?;
        let (_, res) = idna::domain_to_unicode(s);
        if res.is_err() {
            return Err(ParseDomainError);
        }

        Ok(Self(s.into()))
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &self.0)
    }
}

impl AsRef<str> for Selector {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Hash for Selector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_name_ok() {
        assert!(DomainName::new("example.com").is_ok());
        assert!(DomainName::new("example.中国").is_ok());
        assert!(DomainName::new("☕.example.中国").is_ok());
        assert!(DomainName::new("xn--53h.example.xn--fiqs8s").is_ok());

        assert!(DomainName::new("").is_err());
        assert!(DomainName::new("example").is_err());
        assert!(DomainName::new("example.").is_err());
        assert!(DomainName::new("example.com.").is_err());
        assert!(DomainName::new("exa;mple.com").is_err());
        assert!(DomainName::new("-example.com").is_err());
        assert!(DomainName::new("example.123").is_err());
    }

    #[test]
    fn domain_name_idna() {
        assert!(DomainName::new("☕.example.中国").is_ok());
        assert_eq!(
            DomainName::new("☕.example.中国").unwrap(),
            DomainName::new("☕.EXAMPLE.中国").unwrap()
        );
    }

    #[test]
    fn selector_ok() {
        assert!(Selector::new("example").is_ok());
        assert!(Selector::new("dkim_123").is_ok());
        assert!(Selector::new("☕.example").is_ok());
        assert!(Selector::new("xn--53h.example").is_ok());

        assert!(Selector::new("").is_err());
        assert!(Selector::new(".").is_err());
        assert!(Selector::new("example.").is_err());
        assert!(Selector::new("sel;ector").is_err());
    }
}
