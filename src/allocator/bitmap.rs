//! Bit-per-address occupancy map.
//!
//! Bit `n` of the map stands for address `first + n`, with bits numbered from
//! the least significant bit of byte 0. A set bit means the address is
//! assigned. Padding bits in the trailing byte are never handed out.

/// Occupancy of every address in a range, one bit each
#[derive(Debug, Clone)]
pub struct OccupancyBitmap {
    bytes: Vec<u8>,
    count: u64,
}

/// Byte index and bit index of a zero-based offset
fn position(offset: u64) -> (usize, u32) {
    ((offset / 8) as usize, (offset % 8) as u32)
}

impl OccupancyBitmap {
    /// Create an all-free bitmap tracking `count` addresses
    pub fn new(count: u64) -> Self {
        let len = count.div_ceil(8) as usize;
        Self {
            bytes: vec![0; len],
            count,
        }
    }

    /// Raw byte storage, `ceil(count / 8)` bytes long
    #[cfg(test)]
    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[cfg(test)]
    fn is_set(&self, offset: u64) -> bool {
        if offset >= self.count {
            return false;
        }
        let (byte, bit) = position(offset);
        self.bytes[byte] & (1 << bit) != 0
    }

    /// Mark `offset` occupied. Returns `false` if it was already occupied or
    /// lies past the end of the map.
    pub fn set(&mut self, offset: u64) -> bool {
        if offset >= self.count {
            return false;
        }
        let (byte, bit) = position(offset);
        let mask = 1u8 << bit;
        if self.bytes[byte] & mask != 0 {
            return false;
        }
        self.bytes[byte] |= mask;
        true
    }

    /// Mark `offset` free. Clearing a free bit is a no-op.
    pub fn clear(&mut self, offset: u64) {
        if offset >= self.count {
            return;
        }
        let (byte, bit) = position(offset);
        self.bytes[byte] &= !(1u8 << bit);
    }

    /// Find the lowest free offset, mark it occupied and return it.
    ///
    /// Bytes are scanned in ascending order, fully occupied bytes are skipped
    /// without looking at their bits, and bits within a byte are tested from
    /// least to most significant. The scan stops as soon as the absolute bit
    /// index reaches `count`, so padding bits are never returned.
    pub fn assign_lowest(&mut self) -> Option<u64> {
        for (index, byte) in self.bytes.iter_mut().enumerate() {
            if *byte == u8::MAX {
                continue;
            }
            let base = index as u64 * 8;
            for bit in 0..8u32 {
                let offset = base + u64::from(bit);
                if offset >= self.count {
                    return None;
                }
                let mask = 1u8 << bit;
                if *byte & mask == 0 {
                    *byte |= mask;
                    return Some(offset);
                }
            }
        }
        None
    }

    /// Number of occupied addresses
    pub fn occupied(&self) -> u64 {
        // Padding bits are never set, so a plain popcount is exact
        self.bytes.iter().map(|b| u64::from(b.count_ones())).sum()
    }
}
