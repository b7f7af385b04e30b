//! Inclusive IPv4 address ranges.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use super::codec::{format_address, parse_address, parse_subnet, FormatError};

/// Returned when a range is built with its bounds the wrong way round
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("Invalid IP range: start {from} is above end {to}")]
    Inverted { from: Ipv4Addr, to: Ipv4Addr },
}

/// Contiguous inclusive interval `[from, to]` of IPv4 address values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressRange {
    from: u32,
    to: u32,
}

impl AddressRange {
    pub fn new(from: u32, to: u32) -> Result<Self, RangeError> {
        if from > to {
            return Err(RangeError::Inverted {
                from: Ipv4Addr::from(from),
                to: Ipv4Addr::from(to),
            });
        }
        Ok(Self { from, to })
    }

    /// Lowest address in the range
    pub fn first(&self) -> u32 {
        self.from
    }

    /// Highest address in the range
    pub fn last(&self) -> u32 {
        self.to
    }

    /// Number of addresses covered. A `/0` range holds 2^32 addresses,
    /// one more than `u32` can count.
    pub fn count(&self) -> u64 {
        u64::from(self.to - self.from) + 1
    }

    pub fn contains(&self, addr: u32) -> bool {
        addr >= self.from && addr <= self.to
    }

    /// Zero-based position of `addr` inside the range, if it belongs to it
    pub fn offset_of(&self, addr: u32) -> Option<u64> {
        self.contains(addr).then(|| u64::from(addr - self.from))
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", format_address(self.from), format_address(self.to))
    }
}

/// Accepts `a.b.c.d/PREFIX`, `a.b.c.d/MASK`, `FIRST-LAST` or a single address
impl FromStr for AddressRange {
    type Err = FormatError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        if text.contains('/') {
            return parse_subnet(text);
        }

        match text.split_once('-') {
            Some((first, last)) => {
                let first = parse_address(first.trim())?;
                let last = parse_address(last.trim())?;
                Ok(AddressRange::new(first, last)?)
            }
            None => {
                let addr = parse_address(text)?;
                Ok(AddressRange::new(addr, addr)?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_address_range() {
        let range = AddressRange::new(7, 7).unwrap();
        assert_eq!(range.count(), 1);
        assert!(range.contains(7));
        assert!(!range.contains(6));
        assert!(!range.contains(8));
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        assert_eq!(
            AddressRange::new(10, 9),
            Err(RangeError::Inverted {
                from: Ipv4Addr::from(10u32),
                to: Ipv4Addr::from(9u32),
            })
        );
    }

    #[test]
    fn test_full_space_count() {
        let range = AddressRange::new(0, u32::MAX).unwrap();
        assert_eq!(range.count(), 4_294_967_296);
        assert_eq!(range.offset_of(u32::MAX), Some(u64::from(u32::MAX)));
    }

    #[test]
    fn test_offset_of() {
        let range = AddressRange::new(100, 200).unwrap();
        assert_eq!(range.offset_of(100), Some(0));
        assert_eq!(range.offset_of(200), Some(100));
        assert_eq!(range.offset_of(99), None);
        assert_eq!(range.offset_of(201), None);
    }

    #[test]
    fn test_display() {
        let range = AddressRange::new(0xC0A8_0000, 0xC0A8_01FF).unwrap();
        assert_eq!(range.to_string(), "192.168.0.0-192.168.1.255");

        let err = AddressRange::new(0xC0A8_0101, 0xC0A8_0100).unwrap_err();
        assert_eq!(err.to_string(), "Invalid IP range: start 192.168.1.1 is above end 192.168.1.0");
    }

    #[test]
    fn test_from_str_forms() {
        let subnet: AddressRange = "10.0.0.0/30".parse().unwrap();
        assert_eq!(subnet.count(), 4);

        let span: AddressRange = "10.0.0.1 - 10.0.0.9".parse().unwrap();
        assert_eq!(span.first(), 0x0A00_0001);
        assert_eq!(span.last(), 0x0A00_0009);

        let single: AddressRange = "10.0.0.5".parse().unwrap();
        assert_eq!(single.count(), 1);

        assert!(matches!(
            "10.0.0.9-10.0.0.1".parse::<AddressRange>(),
            Err(FormatError::Range(RangeError::Inverted { .. }))
        ));
        assert!("10.0.0-10.0.0.1".parse::<AddressRange>().is_err());
    }
}
