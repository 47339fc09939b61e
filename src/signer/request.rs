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
    signature::{
        Canonicalization, CanonicalizationAlgorithm, DomainName, SignatureAlgorithm, Selector,
        DKIM_SIGNATURE_NAME,
    },
    signer::ConfigurationError,
    tag_list::{self, TagList, TagListParseError},
};
use std::{collections::HashSet, str::FromStr, time::Duration};

/// The header fields signed by default, in the order they appear in *h=*.
pub const DEFAULT_SIGNED_HEADERS: [&str; 7] = [
    "From",
    "Reply-To",
    "To",
    "Cc",
    "Subject",
    "Date",
    "Content-Type",
];

/// Returns the header names that are signed by default.
///
/// A message is signed with those of these header fields that it actually
/// contains.
pub fn default_signed_headers() -> Vec<FieldName> {
    DEFAULT_SIGNED_HEADERS
        .into_iter()
        .filter_map(|n| FieldName::new(n).ok())
        .collect()
}

/// A generator for the timestamp tag.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Timestamp {
    /// The time of signing.
    #[default]
    Now,
    Exact(u64),
}

/// A generator for the expiration tag.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Expiration {
    /// Expire the given duration after the signature timestamp.
    After(Duration),
    Exact(u64),
}

/// Selection of headers to include in the *h=* tag.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum HeaderSelection {
    /// Select the headers in the default set.
    #[default]
    Auto,
    /// Select from the candidate names given here, in this order.
    Candidates(Vec<FieldName>),
}

/// A request for creation of a DKIM signature.
///
/// A request is immutable input to signing. Computed values such as the body
/// hash end up in the [`SigningResult`][crate::signer::SigningResult] instead.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignRequest {
    /// The signing domain to use in the *d=* tag.
    pub domain: DomainName,
    /// The selector to use in the *s=* tag.
    pub selector: Selector,
    /// The signature algorithm to use in the *a=* tag.
    pub algorithm: SignatureAlgorithm,
    /// The canonicalization to use in the *c=* tag.
    pub canonicalization: Canonicalization,
    /// The candidate headers for the *h=* tag.
    pub header_selection: HeaderSelection,
    /// The timestamp value to record in the *t=* tag.
    pub timestamp: Option<Timestamp>,
    /// The expiration to record in the *x=* tag.
    pub expiration: Option<Expiration>,
    /// Additional tag/value pairs to include in the signature, such as *i=*.
    pub extra_tags: Vec<(String, String)>,
}

impl SignRequest {
    /// Creates a request with default settings: *rsa-sha256*,
    /// *relaxed/relaxed*, the default header set, and a timestamp.
    pub fn new(domain: DomainName, selector: Selector) -> Self {
        use CanonicalizationAlgorithm::Relaxed;

        Self {
            domain,
            selector,
            algorithm: SignatureAlgorithm::RsaSha256,
            canonicalization: Canonicalization::from((Relaxed, Relaxed)),
            header_selection: HeaderSelection::Auto,
            timestamp: Some(Timestamp::Now),
            expiration: None,
            extra_tags: vec![],
        }
    }

    /// Creates a request from tag/value pairs.
    ///
    /// Tags *v*, *a*, *c*, *d*, *s*, and *h* are required. Tags *bh* and *b*
    /// are computed and must not be given. Tags other than the known ones
    /// are included in the signature unchanged.
    pub fn from_tags<I, K, V>(tags: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut names_seen = HashSet::new();
        let mut pairs = vec![];

        for (name, value) in tags {
            let (name, value) = (name.as_ref(), value.as_ref());

            if !tag_list::is_tag_name(name) {
                return Err(ConfigurationError::InvalidTagList);
            }
            if !names_seen.insert(name.to_owned()) {
                return Err(ConfigurationError::DuplicateTag);
            }

            match name {
                "bh" => return Err(ConfigurationError::ComputedTag("bh")),
                "b" => return Err(ConfigurationError::ComputedTag("b")),
                "l" => return Err(ConfigurationError::UnsupportedTag("l")),
                "z" => return Err(ConfigurationError::UnsupportedTag("z")),
                _ => {}
            }

            pairs.push((name.to_owned(), value.trim().to_owned()));
        }

        let get = |name: &str| {
            pairs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str())
        };

        let mut required = [""; 6];
        for (value, name) in required.iter_mut().zip(tag_list::REQUIRED_TAGS) {
            *value = match get(name) {
                Some(v) if !v.is_empty() => v,
                _ => return Err(ConfigurationError::MissingTag(name)),
            };
        }
        let [v, a, c, d, s, h] = required;

        if v != "1" {
            return Err(ConfigurationError::UnsupportedVersion);
        }

        let algorithm = a
            .parse()
            .map_err(|_| ConfigurationError::UnsupportedAlgorithm)?;
        let canonicalization = c
            .parse()
            .map_err(|_| ConfigurationError::InvalidCanonicalization)?;
        let domain = DomainName::new(d).map_err(|_| ConfigurationError::InvalidDomain)?;
        let selector = Selector::new(s).map_err(|_| ConfigurationError::InvalidSelector)?;
        let header_selection = HeaderSelection::Candidates(parse_signed_headers(h)?);

        let timestamp = match get("t") {
            Some(t) => {
                let t = t.parse().map_err(|_| ConfigurationError::InvalidTimestamp)?;
                Timestamp::Exact(t)
            }
            None => Timestamp::Now,
        };

        let expiration = match get("x") {
            Some(x) => {
                let x = x.parse().map_err(|_| ConfigurationError::InvalidExpiration)?;
                Some(Expiration::Exact(x))
            }
            None => None,
        };

        let extra_tags = pairs
            .iter()
            .filter(|(n, _)| !is_known_tag(n))
            .cloned()
            .collect();

        let request = Self {
            domain,
            selector,
            algorithm,
            canonicalization,
            header_selection,
            timestamp: Some(timestamp),
            expiration,
            extra_tags,
        };

        request.validate()?;

        Ok(request)
    }

    /// Checks the request for consistency.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if let HeaderSelection::Candidates(names) = &self.header_selection {
            if names.is_empty() || names.iter().any(|n| n.as_ref().contains(';')) {
                return Err(ConfigurationError::InvalidSignedHeaders);
            }
        }

        match (self.timestamp, self.expiration) {
            (_, Some(Expiration::After(duration))) if duration.as_secs() == 0 => {
                return Err(ConfigurationError::InvalidExpiration);
            }
            (Some(Timestamp::Exact(t)), Some(Expiration::Exact(x))) if x <= t => {
                return Err(ConfigurationError::InvalidExpiration);
            }
            _ => {}
        }

        let mut tags_seen = HashSet::new();
        if self.extra_tags.iter().any(|(name, value)| {
            !tags_seen.insert(name)
                || !tag_list::is_tag_name(name)
                || !tag_list::is_tag_value(value)
                || is_known_tag(name)
                || matches!(name.as_str(), "l" | "z")
        }) {
            return Err(ConfigurationError::InvalidExtraTags);
        }

        Ok(())
    }
}

impl FromStr for SignRequest {
    type Err = ConfigurationError;

    /// Parses a request from a tag list such as
    /// `v=1; a=rsa-sha256; c=relaxed/relaxed; d=example.com; s=sel; h=From:To`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag_list = TagList::from_str(s).map_err(|e| match e {
            TagListParseError::DuplicateTag => ConfigurationError::DuplicateTag,
            TagListParseError::Syntax => ConfigurationError::InvalidTagList,
        })?;

        Self::from_tags(
            tag_list
                .as_ref()
                .iter()
                .map(|t| (t.name, tag_list::strip_fws_from_tag_value(t.value))),
        )
    }
}

// tags that are produced from the typed fields of a request
fn is_known_tag(name: &str) -> bool {
    matches!(name, "v" | "a" | "b" | "bh" | "c" | "d" | "h" | "s" | "t" | "x")
}

fn parse_signed_headers(value: &str) -> Result<Vec<FieldName>, ConfigurationError> {
    let mut names = vec![];

    for name in value.split(':') {
        let name = name.trim();
        let name = FieldName::new(name).map_err(|_| ConfigurationError::InvalidSignedHeaders)?;
        if name != DKIM_SIGNATURE_NAME {
            names.push(name);
        }
    }

    Ok(names)
}
