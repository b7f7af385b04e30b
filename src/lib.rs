//! # ip4pool - IPv4 address pool allocator
//!
//! This library manages allocation and release of individual IPv4 addresses
//! inside a fixed, contiguous range given as two bounds or a CIDR subnet.
//!
//! ## Overview
//!
//! Occupancy is tracked in a bitmap with one bit per address. A dedicated
//! worker thread owns that bitmap and services every mutating request one at
//! a time, so no address can ever be handed to two callers at once, and no
//! lock guards the bitmap.
//!
//! ## Key Features
//!
//! - **Deterministic order**: `assign` always returns the lowest free address
//! - **Specific claims**: reserve an exact address with `assign_specific`
//! - **Reuse**: released addresses are eligible again immediately
//! - **Fail fast**: calls after `close` return `Closed` instead of blocking
//! - **Timeouts**: optional per-call or per-pool request timeouts
//!
//! ## Architecture
//!
//! - `ip`: address/subnet text parsing and inclusive ranges
//! - `allocator`: the occupancy bitmap, its worker and the allocator handle
//! - `config`: YAML pool definitions and their validation
//! - `config_loader`: configuration file loading and pool start-up
//!
//! ## Example Usage
//!
//! ```rust
//! use ip4pool::{format_address, BitmapAllocator};
//!
//! let pool = BitmapAllocator::from_subnet("192.168.1.0/23")?;
//! assert_eq!(pool.count(), 512);
//!
//! let first = pool.try_assign()?;
//! assert_eq!(format_address(first), "192.168.0.0");
//!
//! pool.release(first);
//! pool.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Parsing and construction errors are typed `thiserror` enums. Operations
//! report failures through `AllocatorError` from the `try_*` methods, while
//! the plain methods fold them into sentinel values. The configuration layer
//! and binary use `color_eyre` for reporting with context.

pub mod allocator;
pub mod config;
pub mod config_loader;
pub mod ip;

pub use allocator::{
    AddressManager, AllocatorError, AllocatorOptions, AllocatorState, BitmapAllocator, BuildError,
};
pub use ip::{format_address, parse_address, parse_subnet, AddressRange, FormatError, RangeError};
