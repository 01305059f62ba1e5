//! The directory protocol's wire codec.
//!
//! Messages are line-oriented ASCII, fields separated by `;`. A single
//! datagram carries one message; `Lst` is the only multi-line message,
//! terminated by a blank line. This module replaces ad-hoc first-word
//! string dispatch with an explicit tagged union (see the design note on
//! tagged-union messages) so a malformed datagram is a single, explicit
//! decode error rather than a handler silently doing nothing.

use crate::types::{FullName, FullNameError};
use std::net::Ipv4Addr;

/// A `name;ip;talkPort;dnsPort` tuple, as carried by `REG` and inside `LST`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterInfo {
    pub name: FullName,
    pub ip: Ipv4Addr,
    pub talk_port: u16,
    pub dns_port: u16,
}

/// A `name;ip;dnsPort` tuple, as carried by `DNS` and a non-empty `FW`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsInfo {
    pub name: FullName,
    pub ip: Ipv4Addr,
    pub dns_port: u16,
}

/// A `name;ip;talkPort` tuple, as carried by a non-empty `RPL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyInfo {
    pub name: FullName,
    pub ip: Ipv4Addr,
    pub talk_port: u16,
}

/// One directory-protocol message, as sent or received over the UDP
/// directory socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Reg(RegisterInfo),
    Unr(FullName),
    Qry(FullName),
    Dns(DnsInfo),
    /// An empty vec is the GNS's "refused" signal (name collision).
    Lst(Vec<RegisterInfo>),
    /// `None` means the surname is unknown to the SS.
    Fw(Option<DnsInfo>),
    /// `None` means the name is unknown to that family's GNS.
    Rpl(Option<ReplyInfo>),
    Ok,
    Nok(Option<String>),
}

/// Errors that can occur decoding a datagram into a [`Message`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("empty datagram")]
    Empty,
    #[error("datagram is not valid UTF-8")]
    NotUtf8,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("malformed {command} body: '{text}'")]
    MalformedFields { command: &'static str, text: String },
    #[error("invalid name: {0}")]
    InvalidName(#[from] FullNameError),
    #[error("invalid IPv4 address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),
    #[error("invalid port: {0}")]
    InvalidPort(#[from] std::num::ParseIntError),
}

fn parse_register(command: &'static str, text: &str) -> Result<RegisterInfo, CodecError> {
    let fields: Vec<&str> = text.split(';').collect();
    let [name, ip, talk_port, dns_port] = fields.as_slice() else {
        return Err(CodecError::MalformedFields {
            command,
            text: text.to_string(),
        });
    };
    Ok(RegisterInfo {
        name: FullName::new(*name)?,
        ip: ip.parse()?,
        talk_port: talk_port.parse()?,
        dns_port: dns_port.parse()?,
    })
}

fn parse_dns(command: &'static str, text: &str) -> Result<DnsInfo, CodecError> {
    let fields: Vec<&str> = text.split(';').collect();
    let [name, ip, dns_port] = fields.as_slice() else {
        return Err(CodecError::MalformedFields {
            command,
            text: text.to_string(),
        });
    };
    Ok(DnsInfo {
        name: FullName::new(*name)?,
        ip: ip.parse()?,
        dns_port: dns_port.parse()?,
    })
}

fn parse_reply(command: &'static str, text: &str) -> Result<ReplyInfo, CodecError> {
    let fields: Vec<&str> = text.split(';').collect();
    let [name, ip, talk_port] = fields.as_slice() else {
        return Err(CodecError::MalformedFields {
            command,
            text: text.to_string(),
        });
    };
    Ok(ReplyInfo {
        name: FullName::new(*name)?,
        ip: ip.parse()?,
        talk_port: talk_port.parse()?,
    })
}

fn format_register(info: &RegisterInfo) -> String {
    format!(
        "{};{};{};{}",
        info.name, info.ip, info.talk_port, info.dns_port
    )
}

fn format_dns(info: &DnsInfo) -> String {
    format!("{};{};{}", info.name, info.ip, info.dns_port)
}

fn format_reply(info: &ReplyInfo) -> String {
    format!("{};{};{}", info.name, info.ip, info.talk_port)
}

/// Decodes a single datagram's bytes into a [`Message`].
pub fn decode(buf: &[u8]) -> Result<Message, CodecError> {
    let text = std::str::from_utf8(buf).map_err(|_| CodecError::NotUtf8)?;
    let mut lines = text.lines();
    let header = lines.next().ok_or(CodecError::Empty)?;
    let mut header_parts = header.splitn(2, ' ');
    let command = header_parts.next().unwrap_or("").trim();
    let rest = header_parts.next().unwrap_or("").trim();

    match command {
        "REG" => Ok(Message::Reg(parse_register("REG", rest)?)),
        "UNR" => Ok(Message::Unr(FullName::new(rest)?)),
        "QRY" => Ok(Message::Qry(FullName::new(rest)?)),
        "DNS" => Ok(Message::Dns(parse_dns("DNS", rest)?)),
        "LST" => {
            let mut contacts = Vec::new();
            for line in lines {
                let line = line.trim();
                if line.is_empty() {
                    break;
                }
                contacts.push(parse_register("LST", line)?);
            }
            Ok(Message::Lst(contacts))
        }
        "FW" => {
            if rest.is_empty() {
                Ok(Message::Fw(None))
            } else {
                Ok(Message::Fw(Some(parse_dns("FW", rest)?)))
            }
        }
        "RPL" => {
            if rest.is_empty() {
                Ok(Message::Rpl(None))
            } else {
                Ok(Message::Rpl(Some(parse_reply("RPL", rest)?)))
            }
        }
        "OK" => Ok(Message::Ok),
        "NOK" => {
            let reason = rest.strip_prefix("- ").or(if rest.is_empty() {
                None
            } else {
                Some(rest)
            });
            Ok(Message::Nok(reason.map(str::to_string)))
        }
        other => Err(CodecError::UnknownCommand(other.to_string())),
    }
}

/// Encodes a [`Message`] into the bytes to send on the wire.
pub fn encode(msg: &Message) -> Vec<u8> {
    let text = match msg {
        Message::Reg(info) => format!("REG {}", format_register(info)),
        Message::Unr(name) => format!("UNR {name}"),
        Message::Qry(name) => format!("QRY {name}"),
        Message::Dns(info) => format!("DNS {}", format_dns(info)),
        Message::Lst(contacts) => {
            let mut s = String::from("LST\n");
            for c in contacts {
                s.push_str(&format_register(c));
                s.push('\n');
            }
            s.push('\n');
            s
        }
        Message::Fw(Some(info)) => format!("FW {}", format_dns(info)),
        Message::Fw(None) => "FW".to_string(),
        Message::Rpl(Some(info)) => format!("RPL {}", format_reply(info)),
        Message::Rpl(None) => "RPL".to_string(),
        Message::Ok => "OK".to_string(),
        Message::Nok(Some(reason)) => format!("NOK - {reason}"),
        Message::Nok(None) => "NOK".to_string(),
    };
    text.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> FullName {
        FullName::new(s).unwrap()
    }

    #[test]
    fn reg_roundtrip() {
        let msg = Message::Reg(RegisterInfo {
            name: name("alice.stark"),
            ip: Ipv4Addr::new(10, 0, 0, 1),
            talk_port: 30000,
            dns_port: 30001,
        });
        let bytes = encode(&msg);
        assert_eq!(decode(&bytes).unwrap(), msg);
    }

    #[test]
    fn unr_roundtrip() {
        let msg = Message::Unr(name("alice.stark"));
        assert_eq!(decode(&encode(&msg)).unwrap(), msg);
    }

    #[test]
    fn ok_and_nok_roundtrip() {
        assert_eq!(decode(&encode(&Message::Ok)).unwrap(), Message::Ok);
        let nok = Message::Nok(Some("You do not have my surname (stark)".to_string()));
        assert_eq!(decode(&encode(&nok)).unwrap(), nok);
        assert_eq!(decode(&encode(&Message::Nok(None))).unwrap(), Message::Nok(None));
    }

    #[test]
    fn empty_fw_and_rpl_roundtrip() {
        assert_eq!(decode(&encode(&Message::Fw(None))).unwrap(), Message::Fw(None));
        assert_eq!(decode(&encode(&Message::Rpl(None))).unwrap(), Message::Rpl(None));
    }

    #[test]
    fn non_empty_fw_roundtrip() {
        let msg = Message::Fw(Some(DnsInfo {
            name: name("dave.lannister"),
            ip: Ipv4Addr::new(10, 1, 0, 1),
            dns_port: 30000,
        }));
        assert_eq!(decode(&encode(&msg)).unwrap(), msg);
    }

    #[test]
    fn lst_with_contacts_roundtrip() {
        let msg = Message::Lst(vec![
            RegisterInfo {
                name: name("alice.stark"),
                ip: Ipv4Addr::new(10, 0, 0, 1),
                talk_port: 30000,
                dns_port: 30000,
            },
            RegisterInfo {
                name: name("bob.stark"),
                ip: Ipv4Addr::new(10, 0, 0, 2),
                talk_port: 30000,
                dns_port: 30000,
            },
        ]);
        assert_eq!(decode(&encode(&msg)).unwrap(), msg);
    }

    #[test]
    fn empty_lst_is_refusal() {
        let msg = Message::Lst(vec![]);
        let bytes = encode(&msg);
        assert_eq!(std::str::from_utf8(&bytes).unwrap(), "LST\n\n");
        assert_eq!(decode(&bytes).unwrap(), Message::Lst(vec![]));
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert!(matches!(
            decode(b"HELLO there"),
            Err(CodecError::UnknownCommand(_))
        ));
    }

    #[test]
    fn malformed_reg_is_rejected() {
        assert!(matches!(
            decode(b"REG alice.stark;not-an-ip;30000;30000"),
            Err(CodecError::InvalidAddress(_))
        ));
        assert!(matches!(
            decode(b"REG alice.stark;10.0.0.1;30000"),
            Err(CodecError::MalformedFields { .. })
        ));
    }

    #[test]
    fn empty_datagram_is_rejected() {
        assert!(matches!(decode(b""), Err(CodecError::Empty)));
    }
}
