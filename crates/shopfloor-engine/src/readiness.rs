//! Readiness evaluation: deciding Blocked vs Queued from storage state.
//!
//! Readiness is a pure function of the workstation's slot lists, the
//! current fill state of those slots, and the reservation map. The single
//! mutation path, [`Engine::evaluate_readiness`], updates the status,
//! keeps the ready queue consistent, and dispatches a status-change hook
//! only when the value actually changed.
//!
//! Active workstations are never touched here: while a worker is
//! assigned, the step state machine owns the status.

use shopfloor_types::{Hook, Step, StorageId, WorkstationId, WorkstationStatus};

use crate::engine::Engine;
use crate::hooks::HookSink;
use crate::registry::Workstation;

impl Engine {
    /// Whether at least one external output slot is empty and not spoken
    /// for by an in-flight delivery.
    pub(crate) fn has_free_eos(&self, station: &Workstation) -> bool {
        station
            .eos
            .iter()
            .any(|id| self.registry.is_vacant(*id) && !self.reservations.is_reserved(*id))
    }

    /// Whether the workstation could run its next step right now.
    ///
    /// - At `Pickup` (a fresh cycle): producers need all internal outputs
    ///   empty and a free external output; consumers need every external
    ///   input filled and a free external output.
    /// - At `Process` or `Store` (a cycle interrupted by losing its
    ///   worker): the staged items are already inside, so only a free
    ///   external output is required.
    pub(crate) fn is_ready(&self, station: &Workstation) -> bool {
        if !station.enabled {
            return false;
        }
        match station.step {
            Step::Process | Step::Store => self.has_free_eos(station),
            Step::Pickup => {
                if station.is_producer() {
                    self.registry.all_vacant(&station.ios) && self.has_free_eos(station)
                } else {
                    self.registry.all_filled(&station.eis) && self.has_free_eos(station)
                }
            }
        }
    }

    /// Recompute an unassigned workstation's status, maintaining the
    /// ready queue and dispatching a hook on change.
    pub(crate) fn evaluate_readiness(&mut self, id: WorkstationId, sink: &mut dyn HookSink) {
        let (old, ready) = {
            let Some(station) = self.registry.workstation(id) else {
                return;
            };
            if station.worker.is_some() {
                // Active; owned by the cycle driver.
                return;
            }
            (station.status, self.is_ready(station))
        };
        let new = if ready {
            WorkstationStatus::Queued
        } else {
            WorkstationStatus::Blocked
        };
        if old == new {
            if new == WorkstationStatus::Queued {
                self.registry.enqueue(id);
            }
            return;
        }
        if let Some(station) = self.registry.workstation_mut(id) {
            station.status = new;
        }
        if new == WorkstationStatus::Queued {
            self.registry.enqueue(id);
            sink.dispatch(&Hook::WorkstationQueued { workstation: id });
        } else {
            self.registry.dequeue(id);
            sink.dispatch(&Hook::WorkstationBlocked { workstation: id });
        }
    }

    /// Re-evaluate every workstation referencing a storage.
    pub(crate) fn reevaluate_users(&mut self, storage: StorageId, sink: &mut dyn HookSink) {
        for ws_id in self.registry.users_of(storage) {
            self.evaluate_readiness(ws_id, sink);
        }
    }
}
