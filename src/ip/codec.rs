//! Textual IPv4 address and subnet conversion.
//!
//! Stateless helpers turning dotted-decimal text into the 32-bit values the
//! allocator works with, and back. Subnets are accepted either in prefix form
//! (`10.0.0.0/8`) or with a dotted mask (`10.0.0.0/255.0.0.0`).

use std::net::{IpAddr, Ipv4Addr};

use super::range::{AddressRange, RangeError};

/// Errors raised while parsing address or subnet text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("Invalid IPv4 address: '{text}'")]
    InvalidAddress { text: String },

    #[error("Not an IPv4 address: '{text}'")]
    NotIpv4 { text: String },

    #[error("Invalid subnet format: '{text}' (expected ADDRESS/PREFIX or ADDRESS/MASK)")]
    InvalidSubnet { text: String },

    #[error("Invalid subnet mask: '{text}'")]
    InvalidMask { text: String },

    #[error("Prefix length {prefix} exceeds 32")]
    PrefixTooLong { prefix: u32 },

    #[error(transparent)]
    Range(#[from] RangeError),
}

/// Parse a dotted-decimal IPv4 address into its big-endian integer form.
///
/// IPv4-mapped IPv6 text (`::ffff:192.168.0.1`) is accepted as well, any
/// other IPv6 address is rejected.
///
/// # Examples
/// ```
/// use ip4pool::ip::codec::parse_address;
///
/// assert_eq!(parse_address("192.168.1.0"), Ok(0xC0A8_0100));
/// assert!(parse_address("192.168.1").is_err());
/// ```
pub fn parse_address(text: &str) -> Result<u32, FormatError> {
    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(v4)) => Ok(u32::from(v4)),
        Ok(IpAddr::V6(v6)) => v6
            .to_ipv4_mapped()
            .map(u32::from)
            .ok_or_else(|| FormatError::NotIpv4 { text: text.to_string() }),
        Err(_) => Err(FormatError::InvalidAddress { text: text.to_string() }),
    }
}

/// Format a 32-bit address value as dotted-decimal text. Total for every `u32`.
pub fn format_address(addr: u32) -> String {
    Ipv4Addr::from(addr).to_string()
}

/// Parse the right-hand side of a CIDR string into a 32-bit mask.
///
/// Text containing a `.` is read as a dotted mask, anything else as a decimal
/// prefix length between 0 and 32.
pub fn parse_mask(text: &str) -> Result<u32, FormatError> {
    if text.contains('.') {
        return parse_address(text).map_err(|_| FormatError::InvalidMask { text: text.to_string() });
    }

    let prefix = text
        .parse::<u32>()
        .map_err(|_| FormatError::InvalidMask { text: text.to_string() })?;
    if prefix > 32 {
        return Err(FormatError::PrefixTooLong { prefix });
    }

    // Shifting a u32 by 32 overflows, /0 is the empty mask
    Ok(u32::MAX.checked_shl(32 - prefix).unwrap_or(0))
}

/// Parse `ADDRESS/PREFIX` or `ADDRESS/MASK` into the covered address range.
///
/// The range spans `[ip & mask, ip | !mask]`, so host bits in the address
/// part are ignored: `192.168.1.0/23` covers `192.168.0.0-192.168.1.255`.
pub fn parse_subnet(text: &str) -> Result<AddressRange, FormatError> {
    let mut parts = text.split('/');
    let (ip_text, mask_text) = match (parts.next(), parts.next(), parts.next()) {
        (Some(ip), Some(mask), None) => (ip, mask),
        _ => return Err(FormatError::InvalidSubnet { text: text.to_string() }),
    };

    let ip = parse_address(ip_text)?;
    let mask = parse_mask(mask_text)?;

    Ok(AddressRange::new(ip & mask, ip | !mask)?)
}
