//! Share codes and origin codes.
//!
//! A share code is the short number a party reads out to be found; an
//! origin code is the routing address a connection gets once it joins a
//! pairing exchange. The two live in separate code spaces so a discovery
//! code is never reused as a session address.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::ops::RangeInclusive;

/// Six-digit share codes
pub const SHARE_CODE_RANGE: RangeInclusive<u32> = 100_000..=999_999;

/// Length of an origin code
pub const ORIGIN_CODE_LEN: usize = 8;

/// Uppercase letters and digits without 0/O and 1/I
const ORIGIN_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeSpace {
    Share,
    Origin,
}

impl fmt::Display for CodeSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodeSpace::Share => f.write_str("share"),
            CodeSpace::Origin => f.write_str("origin"),
        }
    }
}

/// A key in one of the two code spaces.
///
/// `generate` is best-effort unique; the registry retries on collision.
pub trait Code: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static {
    const SPACE: CodeSpace;

    fn generate() -> Self;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ShareCode(u32);

impl ShareCode {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Code for ShareCode {
    const SPACE: CodeSpace = CodeSpace::Share;

    fn generate() -> Self {
        Self(rand::rng().random_range(SHARE_CODE_RANGE))
    }
}

impl fmt::Display for ShareCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OriginCode(String);

impl OriginCode {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Code for OriginCode {
    const SPACE: CodeSpace = CodeSpace::Origin;

    fn generate() -> Self {
        let mut rng = rand::rng();
        let code = (0..ORIGIN_CODE_LEN)
            .map(|_| ORIGIN_ALPHABET[rng.random_range(0..ORIGIN_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }
}

impl fmt::Display for OriginCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `destination` field as it arrives on the wire: clients send codes
/// either as JSON strings or as JSON numbers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawCode")]
pub struct Destination(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCode {
    Text(String),
    Number(u64),
}

impl From<RawCode> for Destination {
    fn from(raw: RawCode) -> Self {
        match raw {
            RawCode::Text(text) => Self(text),
            RawCode::Number(n) => Self(n.to_string()),
        }
    }
}

impl Destination {
    /// Interpret as a share code; surrounding whitespace is ignored
    pub fn to_share_code(&self) -> Option<ShareCode> {
        self.0.trim().parse().ok().map(ShareCode)
    }

    pub fn into_origin_code(self) -> OriginCode {
        OriginCode(self.0)
    }
}
