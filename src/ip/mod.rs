//! IPv4 address text handling and range arithmetic.
//!
//! This module is the stateless layer in front of the allocator: it turns
//! user-supplied addresses, ranges and CIDR subnets into the two 32-bit
//! bounds the bitmap allocator is built from.

pub mod codec;
pub mod range;

// Re-export commonly used types
pub use codec::{format_address, parse_address, parse_mask, parse_subnet, FormatError};
pub use range::{AddressRange, RangeError};
