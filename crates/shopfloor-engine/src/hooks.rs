//! Host-facing extension points: the hook sink and the worker selector.
//!
//! Both are plain trait objects injected by the host -- the engine holds
//! no global state and dispatches every outbound event through the sink
//! passed into the call that caused it. A sink handler runs synchronously
//! and may feed further notifications back into the engine once the
//! current `handle` call returns; the engine's bulk scans snapshot their
//! working sets so such reentrant feedback never invalidates an iteration.

use shopfloor_types::{Hook, WorkerId, WorkstationId};

/// Receiver for the engine's outbound hook stream.
///
/// One `dispatch` call per internal transition, in transition order.
pub trait HookSink {
    /// Receive one outbound hook.
    fn dispatch(&mut self, hook: &Hook);
}

/// A sink that drops every hook. Useful for setup phases where the host
/// does not care about the resulting hook storm.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl HookSink for NullSink {
    fn dispatch(&mut self, _hook: &Hook) {}
}

/// A sink that records every hook in order. Intended for tests and
/// diagnostics.
#[derive(Debug, Default)]
pub struct RecordingSink {
    /// All hooks received so far, oldest first.
    pub hooks: Vec<Hook>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub const fn new() -> Self {
        Self { hooks: Vec::new() }
    }

    /// Drain and return the recorded hooks.
    pub fn take(&mut self) -> Vec<Hook> {
        core::mem::take(&mut self.hooks)
    }
}

impl HookSink for RecordingSink {
    fn dispatch(&mut self, hook: &Hook) {
        self.hooks.push(*hook);
    }
}

/// Chooses which idle worker serves a queued workstation.
///
/// The host can plug in distance-based or skill-based selection here.
/// Returning `None`, or a worker not in `candidates`, leaves the
/// workstation unassigned for this scheduling round.
pub trait WorkerSelector {
    /// Pick one of `candidates` (idle workers, ascending id order) for the
    /// given workstation.
    fn select(&mut self, workstation: WorkstationId, candidates: &[WorkerId]) -> Option<WorkerId>;
}

/// The default selector: take the first available worker.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstAvailable;

impl WorkerSelector for FirstAvailable {
    fn select(&mut self, _workstation: WorkstationId, candidates: &[WorkerId]) -> Option<WorkerId> {
        candidates.first().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_available_picks_head() {
        let mut sel = FirstAvailable;
        let picked = sel.select(WorkstationId(1), &[WorkerId(3), WorkerId(5)]);
        assert_eq!(picked, Some(WorkerId(3)));
        assert_eq!(sel.select(WorkstationId(1), &[]), None);
    }

    #[test]
    fn recording_sink_keeps_order() {
        let mut sink = RecordingSink::new();
        sink.dispatch(&Hook::WorkstationQueued {
            workstation: WorkstationId(1),
        });
        sink.dispatch(&Hook::WorkstationBlocked {
            workstation: WorkstationId(1),
        });
        let hooks = sink.take();
        assert_eq!(hooks.len(), 2);
        assert!(sink.hooks.is_empty());
    }
}
