//! 128-bit interface identity.
//!
//! This module provides [`InterfaceId`], the identifier every interface
//! descriptor carries. Identities are compared bit-for-bit and rendered in
//! the usual registry text form `{xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx}`.
//!
//! # Examples
//!
//! ```
//! use xptinfo_core::InterfaceId;
//!
//! let iid: InterfaceId = "{00000000-0000-0000-c000-000000000046}".parse().unwrap();
//! assert_eq!(iid.to_string(), "{00000000-0000-0000-c000-000000000046}");
//!
//! // Synthesized identities are stable across runs.
//! assert_eq!(InterfaceId::from_name("IFoo"), InterfaceId::from_name("IFoo"));
//! ```

use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use xxhash_rust::xxh3::xxh3_128;

/// A 128-bit interface identifier.
///
/// The layout follows the classic `{m0-m1-m2-m3[0..2]-m3[2..8]}` grouping, with
/// `m0` in the most significant bits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[repr(transparent)]
pub struct InterfaceId(pub u128);

impl InterfaceId {
    /// The all-zero identity. Directory entries carrying it are looked up by name.
    pub const ZERO: InterfaceId = InterfaceId(0);

    /// Build an identity from its four classic components.
    pub const fn from_parts(m0: u32, m1: u16, m2: u16, m3: [u8; 8]) -> Self {
        let tail = u64::from_be_bytes(m3);
        InterfaceId(((m0 as u128) << 96) | ((m1 as u128) << 80) | ((m2 as u128) << 64) | tail as u128)
    }

    /// Derive a deterministic identity from an interface name.
    ///
    /// Used for descriptors synthesized at runtime that were never assigned a
    /// registered identifier.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        InterfaceId(xxh3_128(name.as_bytes()))
    }

    /// Whether this is [`InterfaceId::ZERO`].
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Split into the four classic components.
    pub const fn parts(&self) -> (u32, u16, u16, [u8; 8]) {
        let v = self.0;
        (
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v as u64).to_be_bytes(),
        )
    }
}

impl fmt::Debug for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceId({self})")
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (m0, m1, m2, m3) = self.parts();
        write!(
            f,
            "{{{m0:08x}-{m1:04x}-{m2:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}}}",
            m3[0], m3[1], m3[2], m3[3], m3[4], m3[5], m3[6], m3[7]
        )
    }
}

/// Error returned when parsing an [`InterfaceId`] from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed interface id: '{0}'")]
pub struct ParseIdError(pub String);

impl FromStr for InterfaceId {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseIdError(s.to_string());

        let body = match (s.strip_prefix('{'), s.ends_with('}')) {
            (Some(rest), true) => &rest[..rest.len() - 1],
            (None, false) => s,
            _ => return Err(malformed()),
        };

        let groups: Vec<&str> = body.split('-').collect();
        let expected = [8, 4, 4, 4, 12];
        if groups.len() != expected.len()
            || groups
                .iter()
                .zip(expected)
                .any(|(g, len)| g.len() != len || !g.bytes().all(|b| b.is_ascii_hexdigit()))
        {
            return Err(malformed());
        }

        let digits: String = groups.concat();
        u128::from_str_radix(&digits, 16)
            .map(InterfaceId)
            .map_err(|_| malformed())
    }
}
