//! The assignment scheduler: matching idle workers to pending work.
//!
//! One scheduling pass runs three phases in strict precedence order:
//! dangling-item deliveries first, then queued workstations by descending
//! priority, then transports of finished items. The pass snapshots the
//! idle-worker pool and the ready queue before mutating anything, because
//! a hook dispatched mid-pass may cause the host to synchronously feed
//! further notifications back into the engine; every per-entity decision
//! re-checks live state before committing.

use tracing::warn;

use shopfloor_types::{Hook, Priority, WorkerId, WorkerState, WorkstationId, WorkstationStatus};

use crate::engine::Engine;
use crate::hooks::HookSink;

impl Engine {
    /// Run one full scheduling pass.
    ///
    /// Safe to call at any time; does nothing when there is no idle
    /// worker or no pending work.
    pub(crate) fn try_assign_workers(&mut self, sink: &mut dyn HookSink) {
        self.assign_dangling(sink);
        self.assign_workstations(sink);
        self.assign_transports(sink);
    }

    /// Phase two: hand idle workers to queued workstations.
    fn assign_workstations(&mut self, sink: &mut dyn HookSink) {
        // Snapshot: insertion order, then a stable sort so equal
        // priorities keep their queueing order.
        let mut queue: Vec<(WorkstationId, Priority)> = self
            .registry
            .queue_snapshot()
            .into_iter()
            .filter_map(|id| {
                self.registry
                    .workstation(id)
                    .map(|station| (id, station.priority))
            })
            .collect();
        queue.sort_by(|a, b| b.1.cmp(&a.1));

        for (ws_id, _) in queue {
            if self.registry.no_idle_workers() {
                break;
            }
            // Re-check live state; the queue snapshot may be stale.
            let eligible = self.registry.workstation(ws_id).is_some_and(|station| {
                station.status == WorkstationStatus::Queued
                    && station.worker.is_none()
                    && station.enabled
            });
            if !eligible {
                continue;
            }
            let candidates = self.registry.idle_snapshot();
            let Some(choice) = self.selector.select(ws_id, &candidates) else {
                continue;
            };
            if !self.registry.is_idle(choice) {
                warn!(workstation = %ws_id, worker = %choice, "selector chose a non-idle worker");
                continue;
            }
            self.assign_worker(choice, ws_id, sink);
        }
    }

    /// Bind a worker to a workstation and start its cycle.
    pub(crate) fn assign_worker(
        &mut self,
        worker_id: WorkerId,
        ws_id: WorkstationId,
        sink: &mut dyn HookSink,
    ) {
        self.registry.clear_idle(worker_id);
        if let Some(worker) = self.registry.worker_mut(worker_id) {
            worker.state = WorkerState::Working;
            worker.assignment = Some(ws_id);
        }
        if let Some(station) = self.registry.workstation_mut(ws_id) {
            station.worker = Some(worker_id);
            station.status = WorkstationStatus::Active;
        }
        self.registry.dequeue(ws_id);
        sink.dispatch(&Hook::WorkerAssigned {
            worker: worker_id,
            workstation: ws_id,
        });
        sink.dispatch(&Hook::WorkstationActivated { workstation: ws_id });
        self.enter_step(ws_id, sink);
    }
}
