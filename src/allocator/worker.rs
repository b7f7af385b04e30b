//! The single thread that owns and mutates an allocator's bitmap.
//!
//! Callers never touch the bitmap. They push a [`Request`] onto the worker's
//! queue, each carrying its own reply channel, and wait for the answer. The
//! worker services requests strictly one at a time in queue order.

use std::net::Ipv4Addr;
use std::ops::ControlFlow;
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, trace};

use super::bitmap::OccupancyBitmap;
use super::state::{AllocatorState, SharedState};
use super::AllocatorError;
use crate::ip::AddressRange;

/// Answer to a request: the address acted on, or why nothing happened
pub(crate) type Response = Result<u32, AllocatorError>;

pub(crate) enum Request {
    Assign {
        reply: Sender<Response>,
    },
    AssignSpecific {
        addr: u32,
        reply: Sender<Response>,
    },
    Release {
        addr: u32,
        reply: Sender<Response>,
    },
    /// A caller gave up waiting. Any address still unread in `response` is
    /// freed again when `rollback` is set.
    Abandon {
        response: Receiver<Response>,
        rollback: bool,
    },
    Stop,
}

pub(crate) struct Worker {
    range: AddressRange,
    bitmap: OccupancyBitmap,
    state: Arc<SharedState>,
    requests: Receiver<Request>,
}

impl Worker {
    pub(crate) fn new(
        range: AddressRange,
        state: Arc<SharedState>,
        requests: Receiver<Request>,
    ) -> Self {
        Self {
            range,
            bitmap: OccupancyBitmap::new(range.count()),
            state,
            requests,
        }
    }

    /// Service requests until a stop request arrives or every handle is gone.
    ///
    /// Requests still queued behind the stop request are dropped together
    /// with the receiver, which disconnects their reply channels and fails
    /// those callers with `Closed` instead of leaving them blocked.
    pub(crate) fn run(mut self) {
        info!(
            "Allocator worker for {} started ({} addresses)",
            self.range,
            self.range.count()
        );

        while let Ok(request) = self.requests.recv() {
            if self.handle(request).is_break() {
                break;
            }
        }

        self.state.store(AllocatorState::Stopped);
        info!(
            "Allocator worker for {} stopped with {} addresses assigned",
            self.range,
            self.bitmap.occupied()
        );
    }

    /// Apply one request. Breaks once a stop request has been seen.
    fn handle(&mut self, request: Request) -> ControlFlow<()> {
        match request {
            Request::Assign { reply } => {
                let result = self.assign();
                self.answer(reply, result, true);
            }
            Request::AssignSpecific { addr, reply } => {
                let result = self.assign_specific(addr);
                self.answer(reply, result, true);
            }
            Request::Release { addr, reply } => {
                let result = self.release(addr);
                self.answer(reply, result, false);
            }
            Request::Abandon { response, rollback } => {
                // Queue order puts this after the abandoned request, so its
                // answer is already buffered if one was sent
                if let Ok(Ok(addr)) = response.try_recv() {
                    if rollback {
                        self.undo(addr);
                    }
                }
            }
            Request::Stop => {
                self.state.store(AllocatorState::Stopping);
                debug!("Allocator worker for {} stopping", self.range);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Send `result` back. An address nobody is waiting for is freed again
    /// when `rollback` is set.
    fn answer(&mut self, reply: Sender<Response>, result: Response, rollback: bool) {
        if let Err(unsent) = reply.send(result) {
            if let Ok(addr) = unsent.into_inner() {
                if rollback {
                    self.undo(addr);
                }
            }
        }
    }

    fn undo(&mut self, addr: u32) {
        if let Some(offset) = self.range.offset_of(addr) {
            self.bitmap.clear(offset);
            debug!("Caller gone, returned {} to the pool", Ipv4Addr::from(addr));
        }
    }

    fn assign(&mut self) -> Response {
        match self.bitmap.assign_lowest() {
            Some(offset) => {
                // offset < count, so first + offset never leaves the range
                let addr = self.range.first() + offset as u32;
                debug!("Assigned {}", Ipv4Addr::from(addr));
                Ok(addr)
            }
            None => {
                trace!("Scan of {} found no free address", self.range);
                Err(AllocatorError::Exhausted)
            }
        }
    }

    fn assign_specific(&mut self, addr: u32) -> Response {
        let offset = self.offset_of(addr)?;
        if self.bitmap.set(offset) {
            debug!("Assigned requested address {}", Ipv4Addr::from(addr));
            Ok(addr)
        } else {
            Err(AllocatorError::AlreadyAssigned {
                addr: Ipv4Addr::from(addr),
            })
        }
    }

    fn release(&mut self, addr: u32) -> Response {
        let offset = self.offset_of(addr)?;
        self.bitmap.clear(offset);
        debug!("Released {}", Ipv4Addr::from(addr));
        Ok(addr)
    }

    fn offset_of(&self, addr: u32) -> Result<u64, AllocatorError> {
        self.range.offset_of(addr).ok_or(AllocatorError::OutOfRange {
            addr: Ipv4Addr::from(addr),
        })
    }
}
