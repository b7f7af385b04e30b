//! Allocator lifecycle status shared between the handle and its worker.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::Serialize;

/// Lifecycle of an allocator: `Stopped -> Running -> Stopping -> Stopped`.
/// There is no way back to `Running` once the worker has been asked to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocatorState {
    /// Worker not started yet, or finished
    Stopped,
    /// Worker accepting requests
    Running,
    /// Stop requested, worker leaving its loop
    Stopping,
}

impl AllocatorState {
    fn to_u8(self) -> u8 {
        match self {
            AllocatorState::Stopped => 0,
            AllocatorState::Running => 1,
            AllocatorState::Stopping => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => AllocatorState::Running,
            2 => AllocatorState::Stopping,
            _ => AllocatorState::Stopped,
        }
    }
}

impl fmt::Display for AllocatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AllocatorState::Stopped => "stopped",
            AllocatorState::Running => "running",
            AllocatorState::Stopping => "stopping",
        };
        f.write_str(name)
    }
}

/// Status cell written by the worker and read by any caller without blocking
#[derive(Debug)]
pub(crate) struct SharedState(AtomicU8);

impl SharedState {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(AllocatorState::Stopped.to_u8()))
    }

    pub(crate) fn load(&self) -> AllocatorState {
        AllocatorState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub(crate) fn store(&self, state: AllocatorState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }
}
