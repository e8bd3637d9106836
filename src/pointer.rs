//! JSON Pointer positions (RFC 6901) into a schema document.
//!
//! A [`Pointer`] is the identity of a sub-schema: the graph keys its nodes by
//! canonical pointer, never by structural equality of the sub-schema value.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An encoded JSON Pointer, e.g. `/properties/a~1b/items/0`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pointer(String);

impl Pointer {
    /// The empty pointer, addressing the whole document.
    pub fn root() -> Self {
        Pointer(String::new())
    }

    /// Parse an already encoded pointer, checking its escape sequences.
    pub fn parse(encoded: &str) -> Result<Self, String> {
        if !encoded.is_empty() && !encoded.starts_with('/') {
            return Err(format!("JSON Pointer '{}' must start with '/'", encoded));
        }
        let pointer = Pointer(encoded.to_string());
        for token in pointer.raw_tokens() {
            unescape(token)?;
        }
        Ok(pointer)
    }

    /// Parse a URI fragment such as `#/definitions/a%20b`.
    pub fn from_uri_fragment(fragment: &str) -> Result<Self, String> {
        let rest = fragment
            .strip_prefix('#')
            .ok_or_else(|| format!("'{}' is not a URI fragment", fragment))?;
        Self::parse(&percent_decode(rest)?)
    }

    /// Append one reference token.
    pub fn child(&self, token: &str) -> Self {
        let mut encoded = String::with_capacity(self.0.len() + token.len() + 1);
        encoded.push_str(&self.0);
        encoded.push('/');
        for c in token.chars() {
            match c {
                '~' => encoded.push_str("~0"),
                '/' => encoded.push_str("~1"),
                _ => encoded.push(c),
            }
        }
        Pointer(encoded)
    }

    /// Append an array index token.
    pub fn index(&self, index: usize) -> Self {
        self.child(&index.to_string())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decoded reference tokens, in order.
    pub fn tokens(&self) -> impl Iterator<Item = String> + '_ {
        // escapes were checked on construction
        self.raw_tokens()
            .map(|token| unescape(token).unwrap_or_else(|_| token.to_string()))
    }

    fn raw_tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split('/').skip(1)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("#")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

fn unescape(token: &str) -> Result<String, String> {
    let mut decoded = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            decoded.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => decoded.push('~'),
            Some('1') => decoded.push('/'),
            _ => return Err(format!("invalid escape sequence in JSON Pointer token '{}'", token)),
        }
    }
    Ok(decoded)
}

fn percent_decode(input: &str) -> Result<String, String> {
    let bytes = input.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = input
                .get(i + 1..i + 3)
                .and_then(|h| u8::from_str_radix(h, 16).ok())
                .ok_or_else(|| format!("invalid percent-encoding in '{}'", input))?;
            decoded.push(hex);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(decoded).map_err(|e| format!("URI fragment is not UTF-8: {}", e))
}
