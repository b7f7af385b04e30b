//! # Bitmap Address Allocator
//!
//! Hands out individual IPv4 addresses from a fixed inclusive range and takes
//! them back, guaranteeing that no address is held by two callers at once.
//!
//! ## Components
//!
//! - `bitmap.rs`: one bit per address, ascending lowest-free scan
//! - `worker.rs`: the thread that owns the bitmap and serializes requests
//! - `pool.rs`: the [`BitmapAllocator`] handle callers hold
//! - `state.rs`: lifecycle status published by the worker
//! - `manager.rs`: the [`AddressManager`] trait for embedding code
//!
//! ## Concurrency
//!
//! Each allocator runs exactly one worker thread. Assign, assign-specific and
//! release are request/response round trips over a channel, so the bitmap has
//! a single writer and needs no lock. Bounds queries read the immutable range
//! directly and never block.
//!
//! ## Errors
//!
//! Construction failures are returned as [`BuildError`]. Operational failures
//! come back as [`AllocatorError`] from the `try_*` methods, or are folded
//! into the sentinel results (`-1`, `false`) of the plain methods.

use std::io;
use std::net::Ipv4Addr;
use std::time::Duration;

use crate::ip::{FormatError, RangeError};

pub mod bitmap;
pub mod manager;
pub mod pool;
pub mod state;
mod worker;

// Re-export commonly used types
pub use bitmap::OccupancyBitmap;
pub use manager::AddressManager;
pub use pool::BitmapAllocator;
pub use state::AllocatorState;

/// Errors that prevent an allocator from being built
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Range(#[from] RangeError),

    #[error("Failed to start allocator worker thread: {0}")]
    Spawn(#[source] io::Error),
}

/// Errors returned by allocator operations after construction
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocatorError {
    #[error("No free address left in the pool")]
    Exhausted,

    #[error("Address {addr} is outside the managed range")]
    OutOfRange { addr: Ipv4Addr },

    #[error("Address {addr} is already assigned")]
    AlreadyAssigned { addr: Ipv4Addr },

    #[error("Allocator is closed")]
    Closed,

    #[error("Request timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Allocator worker panicked")]
    WorkerPanicked,
}

/// Optional knobs for [`BitmapAllocator::with_options`]
#[derive(Debug, Clone, Default)]
pub struct AllocatorOptions {
    /// Upper bound on how long the plain `try_*` calls wait for the worker.
    /// `None` waits until the worker answers or exits.
    pub request_timeout: Option<Duration>,
    /// Worker thread name (default: `ip4pool-<first>-<last>`)
    pub worker_name: Option<String>,
}
