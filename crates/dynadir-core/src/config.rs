//! Self-identity configuration.
//!
//! Unlike the platform-persisted `AppConfig` this module's name evokes in
//! other LAN tools, there is nothing to load or save here: a `dynadir`
//! process's identity and the Surname Server's address are fixed for the
//! lifetime of the process, supplied once on the command line and never
//! written to disk (persistence across restarts is a non-goal).

use crate::types::{DirAddr, FullName, FullNameError};
use std::net::Ipv4Addr;
use thiserror::Error;

/// Default TCP chat / UDP directory port used when neither `-t` nor `-d`
/// is given on the command line.
pub const DEFAULT_PORT: u16 = 30000;

/// Default UDP port the Surname Server listens on.
pub const DEFAULT_SA_PORT: u16 = 58000;

/// Errors constructing a [`SelfConfig`] from raw CLI input.
#[derive(Debug, Error)]
pub enum SelfConfigError {
    #[error("invalid identity: {0}")]
    InvalidName(#[from] FullNameError),
    #[error("invalid IPv4 address '{0}'")]
    InvalidAddress(String),
}

/// This node's fixed identity and the address it reaches the Surname Server
/// at. Immutable once built.
#[derive(Debug, Clone)]
pub struct SelfConfig {
    pub my_name: FullName,
    pub my_ip: Ipv4Addr,
    pub my_talk_port: u16,
    pub my_dns_port: u16,
    pub sa_addr: DirAddr,
}

impl SelfConfig {
    /// Builds a `SelfConfig` from already-parsed components, validating the
    /// identity string. Port/address parsing happens in the CLI layer via
    /// `clap`'s own `value_parser`s; this constructor only enforces the
    /// cross-field invariant that a name always has a surname.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        my_ip: Ipv4Addr,
        my_talk_port: u16,
        my_dns_port: u16,
        sa_ip: Ipv4Addr,
        sa_port: u16,
    ) -> Result<Self, SelfConfigError> {
        Ok(Self {
            my_name: FullName::new(name)?,
            my_ip,
            my_talk_port,
            my_dns_port,
            sa_addr: DirAddr::new(sa_ip, sa_port),
        })
    }

    pub fn my_dir_addr(&self) -> DirAddr {
        DirAddr::new(self.my_ip, self.my_dns_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_with_valid_name() {
        let cfg = SelfConfig::new(
            "alice.stark",
            Ipv4Addr::new(10, 0, 0, 1),
            DEFAULT_PORT,
            DEFAULT_PORT,
            Ipv4Addr::new(10, 0, 0, 100),
            DEFAULT_SA_PORT,
        )
        .unwrap();
        assert_eq!(cfg.my_name.as_str(), "alice.stark");
        assert_eq!(cfg.sa_addr.port, DEFAULT_SA_PORT);
    }

    #[test]
    fn rejects_name_without_surname() {
        let err = SelfConfig::new(
            "alice",
            Ipv4Addr::new(10, 0, 0, 1),
            DEFAULT_PORT,
            DEFAULT_PORT,
            Ipv4Addr::new(10, 0, 0, 100),
            DEFAULT_SA_PORT,
        );
        assert!(err.is_err());
    }
}
