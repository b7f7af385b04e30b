//! The public allocator handle.
//!
//! A [`BitmapAllocator`] is a thin front for its worker thread: bounds queries
//! are answered from the immutable range, while assign, assign-specific and
//! release are request/response round trips with the worker, which is the
//! only code that ever reads or writes the bitmap.

use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, RecvTimeoutError, Sender};
use log::{debug, warn};

use super::state::{AllocatorState, SharedState};
use super::worker::{Request, Response, Worker};
use super::{AllocatorError, AllocatorOptions, BuildError};
use crate::ip::{parse_address, parse_subnet, AddressRange};

/// Bitmap-backed IPv4 address allocator over an inclusive range.
///
/// Every assignment is permanent until released. [`assign`](Self::assign)
/// always hands out the lowest free address.
///
/// ```
/// use ip4pool::BitmapAllocator;
///
/// let pool = BitmapAllocator::from_subnet("10.0.0.0/30")?;
/// assert_eq!(pool.assign(), 0x0A00_0000);
/// assert!(pool.assign_specific(0x0A00_0003));
/// pool.release(0x0A00_0000);
/// assert_eq!(pool.assign(), 0x0A00_0000);
/// pool.close()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct BitmapAllocator {
    range: AddressRange,
    requests: Sender<Request>,
    state: Arc<SharedState>,
    closed: AtomicBool,
    worker: Mutex<Option<JoinHandle<()>>>,
    request_timeout: Option<Duration>,
}

impl BitmapAllocator {
    /// Build an allocator over `[from, to]` with default options
    pub fn from_range(from: u32, to: u32) -> Result<Self, BuildError> {
        Self::with_options(AddressRange::new(from, to)?, AllocatorOptions::default())
    }

    /// Build an allocator from two dotted-decimal bounds
    pub fn from_string_range(from: &str, to: &str) -> Result<Self, BuildError> {
        let from = parse_address(from)?;
        let to = parse_address(to)?;
        Self::from_range(from, to)
    }

    /// Build an allocator covering a CIDR subnet (`a.b.c.d/n` or `a.b.c.d/mask`)
    pub fn from_subnet(subnet: &str) -> Result<Self, BuildError> {
        Self::with_options(parse_subnet(subnet)?, AllocatorOptions::default())
    }

    /// Build an allocator over `range` and start its worker thread
    pub fn with_options(
        range: AddressRange,
        options: AllocatorOptions,
    ) -> Result<Self, BuildError> {
        let (requests, receiver) = unbounded();
        let state = Arc::new(SharedState::new());
        let worker = Worker::new(range, Arc::clone(&state), receiver);

        let name = options
            .worker_name
            .unwrap_or_else(|| format!("ip4pool-{}", range));

        state.store(AllocatorState::Running);
        let handle = match thread::Builder::new().name(name).spawn(move || worker.run()) {
            Ok(handle) => handle,
            Err(e) => {
                state.store(AllocatorState::Stopped);
                return Err(BuildError::Spawn(e));
            }
        };

        Ok(Self {
            range,
            requests,
            state,
            closed: AtomicBool::new(false),
            worker: Mutex::new(Some(handle)),
            request_timeout: options.request_timeout,
        })
    }

    /// Assign the lowest free address, or return `-1` when none is left.
    ///
    /// Also returns `-1` once the allocator is closed or the request timed
    /// out; use [`try_assign`](Self::try_assign) to tell these apart.
    pub fn assign(&self) -> i64 {
        self.try_assign().map(i64::from).unwrap_or(-1)
    }

    /// Mark `addr` as assigned. Returns `false` without changing anything if
    /// it is outside the range or already assigned.
    pub fn assign_specific(&self, addr: u32) -> bool {
        self.try_assign_specific(addr).is_ok()
    }

    /// Release `addr` so it can be assigned again.
    ///
    /// Releasing a free address is a no-op. Releasing an address outside the
    /// range is deliberately a no-op as well: it cannot be assigned, so it is
    /// already in the state the caller asked for. The discard is logged; use
    /// [`try_release`](Self::try_release) for strict validation.
    pub fn release(&self, addr: u32) {
        match self.try_release(addr) {
            Ok(()) => {}
            Err(AllocatorError::OutOfRange { addr }) => {
                warn!("Ignoring release of {} outside {}", addr, self.range);
            }
            Err(e) => debug!("Release of {} not applied: {}", Ipv4Addr::from(addr), e),
        }
    }

    /// Assign the lowest free address
    pub fn try_assign(&self) -> Result<u32, AllocatorError> {
        self.call(|reply| Request::Assign { reply }, true, self.request_timeout)
    }

    pub fn try_assign_timeout(&self, timeout: Duration) -> Result<u32, AllocatorError> {
        self.call(|reply| Request::Assign { reply }, true, Some(timeout))
    }

    /// Mark exactly `addr` as assigned
    pub fn try_assign_specific(&self, addr: u32) -> Result<(), AllocatorError> {
        self.call(
            |reply| Request::AssignSpecific { addr, reply },
            true,
            self.request_timeout,
        )
        .map(drop)
    }

    pub fn try_assign_specific_timeout(
        &self,
        addr: u32,
        timeout: Duration,
    ) -> Result<(), AllocatorError> {
        self.call(
            |reply| Request::AssignSpecific { addr, reply },
            true,
            Some(timeout),
        )
        .map(drop)
    }

    /// Release `addr`, failing with `OutOfRange` if it is not managed here
    pub fn try_release(&self, addr: u32) -> Result<(), AllocatorError> {
        self.call(
            |reply| Request::Release { addr, reply },
            false,
            self.request_timeout,
        )
        .map(drop)
    }

    pub fn try_release_timeout(&self, addr: u32, timeout: Duration) -> Result<(), AllocatorError> {
        self.call(|reply| Request::Release { addr, reply }, false, Some(timeout))
            .map(drop)
    }

    pub fn is_in_range(&self, addr: u32) -> bool {
        self.range.contains(addr)
    }

    pub fn is_out_of_range(&self, addr: u32) -> bool {
        !self.range.contains(addr)
    }

    pub fn first(&self) -> u32 {
        self.range.first()
    }

    pub fn last(&self) -> u32 {
        self.range.last()
    }

    /// Number of addresses managed, up to 2^32 for a `/0` pool
    pub fn count(&self) -> u64 {
        self.range.count()
    }

    pub fn range(&self) -> AddressRange {
        self.range
    }

    /// Last lifecycle state published by the worker. Never blocks; may lag
    /// one transition behind a concurrent [`close`](Self::close).
    pub fn status(&self) -> AllocatorState {
        self.state.load()
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// Requests queued before the stop request are still answered; anything
    /// after it fails with `Closed`. Only the first call has an effect.
    pub fn close(&self) -> Result<(), AllocatorError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        debug!("Closing allocator for {}", self.range);

        // Fails only if the worker is already gone
        let _ = self.requests.send(Request::Stop);

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.join().map_err(|_| AllocatorError::WorkerPanicked)?;
        }
        Ok(())
    }

    /// Send a request to the worker and wait for its reply.
    ///
    /// On timeout the reply channel is handed back to the worker, which frees
    /// the address again if `rollback` is set and the answer went unread.
    fn call(
        &self,
        build: impl FnOnce(Sender<Response>) -> Request,
        rollback: bool,
        timeout: Option<Duration>,
    ) -> Response {
        if self.closed.load(Ordering::Acquire) {
            return Err(AllocatorError::Closed);
        }

        let (reply, response) = bounded(1);
        self.requests
            .send(build(reply))
            .map_err(|_| AllocatorError::Closed)?;

        let after = match timeout {
            Some(after) => after,
            None => return response.recv().map_err(|_| AllocatorError::Closed)?,
        };

        match response.recv_timeout(after) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Request to allocator for {} timed out after {:?}",
                    self.range, after
                );
                // Worker already gone means there is nothing left to roll back
                let _ = self.requests.send(Request::Abandon { response, rollback });
                Err(AllocatorError::Timeout { after })
            }
            Err(RecvTimeoutError::Disconnected) => Err(AllocatorError::Closed),
        }
    }
}

impl Drop for BitmapAllocator {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to shut down allocator for {}: {}", self.range, e);
        }
    }
}
