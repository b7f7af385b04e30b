//! Trait seam for code that only needs to hand out and take back addresses.

use super::{AllocatorError, BitmapAllocator};

/// Address pool as seen by embedding code
pub trait AddressManager: Send + Sync {
    /// Lowest free address, or `-1` when none can be assigned
    fn assign(&self) -> i64;

    /// Claim exactly `addr`; `false` if out of range or taken
    fn assign_specific(&self, addr: u32) -> bool;

    fn release(&self, addr: u32);

    fn is_out_of_range(&self, addr: u32) -> bool;

    fn is_in_range(&self, addr: u32) -> bool {
        !self.is_out_of_range(addr)
    }

    fn first(&self) -> u32;

    fn last(&self) -> u32;

    fn count(&self) -> u64;

    fn close(&self) -> Result<(), AllocatorError>;
}

impl AddressManager for BitmapAllocator {
    fn assign(&self) -> i64 {
        BitmapAllocator::assign(self)
    }

    fn assign_specific(&self, addr: u32) -> bool {
        BitmapAllocator::assign_specific(self, addr)
    }

    fn release(&self, addr: u32) {
        BitmapAllocator::release(self, addr)
    }

    fn is_out_of_range(&self, addr: u32) -> bool {
        BitmapAllocator::is_out_of_range(self, addr)
    }

    fn first(&self) -> u32 {
        BitmapAllocator::first(self)
    }

    fn last(&self) -> u32 {
        BitmapAllocator::last(self)
    }

    fn count(&self) -> u64 {
        BitmapAllocator::count(self)
    }

    fn close(&self) -> Result<(), AllocatorError> {
        BitmapAllocator::close(self)
    }
}
