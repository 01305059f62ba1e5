//! Domain types for dynadir.
//!
//! The protocol's only identifier is a compound `name.surname` string. It is
//! wrapped in a **newtype** so the engine, roster, and codec can't
//! accidentally treat an unvalidated `String` as an identity, and so the
//! surname can be pulled out without re-parsing at every call site.

use std::fmt;
use std::net::Ipv4Addr;

/// Maximum length of a `name.surname` identity, in bytes.
pub const MAX_FULL_NAME_LEN: usize = 127;

/// A validated `name.surname` identity.
///
/// Must contain exactly one `.`, with a non-empty given name and surname on
/// either side, and fit within [`MAX_FULL_NAME_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FullName(String);

/// Errors that can occur when validating a [`FullName`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FullNameError {
    #[error("name cannot be empty")]
    Empty,
    #[error("name '{0}' must contain exactly one '.' separating given name and surname")]
    MissingSeparator(String),
    #[error("name '{0}' has an empty given name or surname")]
    EmptyComponent(String),
    #[error("name '{name}' exceeds {max} bytes (got {got})")]
    TooLong {
        name: String,
        max: usize,
        got: usize,
    },
}

impl FullName {
    /// Parses and validates a `name.surname` string.
    pub fn new(raw: impl Into<String>) -> Result<Self, FullNameError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(FullNameError::Empty);
        }
        if raw.len() > MAX_FULL_NAME_LEN {
            return Err(FullNameError::TooLong {
                name: raw,
                max: MAX_FULL_NAME_LEN,
                got: raw.len(),
            });
        }
        let mut parts = raw.splitn(2, '.');
        let given = parts.next().unwrap_or("");
        let rest = match parts.next() {
            Some(rest) => rest,
            None => return Err(FullNameError::MissingSeparator(raw)),
        };
        // A second '.' inside the surname is fine (e.g. "ana.de.soto" is not
        // supported by the wire format's single-split parser elsewhere, but
        // FullName itself only needs "exactly one '.' boundary we split on").
        if given.is_empty() || rest.is_empty() {
            return Err(FullNameError::EmptyComponent(raw));
        }
        Ok(Self(raw))
    }

    /// The given-name component, before the first `.`.
    pub fn given_name(&self) -> &str {
        self.0.split('.').next().unwrap()
    }

    /// The surname component, everything after the first `.`.
    pub fn surname(&self) -> &str {
        &self.0[self.given_name().len() + 1..]
    }

    /// Returns true iff `other` shares this name's surname.
    pub fn same_family(&self, other: &FullName) -> bool {
        self.surname() == other.surname()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FullName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The UDP endpoint of a directory server or peer: an IPv4 address plus port.
///
/// A thin pair rather than `std::net::SocketAddrV4` alone, kept distinct so
/// call sites that build wire messages can't confuse a talk (TCP) port with
/// a directory (UDP) port — both are plain `u16` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirAddr {
    pub ip: Ipv4Addr,
    pub port: u16,
}

impl DirAddr {
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        Self { ip, port }
    }

    pub fn to_socket_addr(self) -> std::net::SocketAddr {
        std::net::SocketAddr::V4(std::net::SocketAddrV4::new(self.ip, self.port))
    }
}

impl fmt::Display for DirAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_valid() {
        let n = FullName::new("alice.stark").unwrap();
        assert_eq!(n.given_name(), "alice");
        assert_eq!(n.surname(), "stark");
    }

    #[test]
    fn full_name_rejects_missing_dot() {
        assert!(matches!(
            FullName::new("alice"),
            Err(FullNameError::MissingSeparator(_))
        ));
    }

    #[test]
    fn full_name_rejects_empty() {
        assert!(matches!(FullName::new(""), Err(FullNameError::Empty)));
    }

    #[test]
    fn full_name_rejects_empty_component() {
        assert!(matches!(
            FullName::new(".stark"),
            Err(FullNameError::EmptyComponent(_))
        ));
        assert!(matches!(
            FullName::new("alice."),
            Err(FullNameError::EmptyComponent(_))
        ));
    }

    #[test]
    fn full_name_rejects_too_long() {
        let long = format!("{}.stark", "a".repeat(MAX_FULL_NAME_LEN));
        assert!(matches!(
            FullName::new(long),
            Err(FullNameError::TooLong { .. })
        ));
    }

    #[test]
    fn same_family_compares_surname() {
        let a = FullName::new("alice.stark").unwrap();
        let b = FullName::new("bob.stark").unwrap();
        let c = FullName::new("carol.lannister").unwrap();
        assert!(a.same_family(&b));
        assert!(!a.same_family(&c));
    }

    #[test]
    fn dir_addr_display() {
        let addr = DirAddr::new(Ipv4Addr::new(10, 0, 0, 1), 30000);
        assert_eq!(addr.to_string(), "10.0.0.1:30000");
    }
}
