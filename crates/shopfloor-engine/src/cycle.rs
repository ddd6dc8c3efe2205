//! The per-workstation cycle state machine.
//!
//! A cycle walks Pickup -> Process -> Store. Pickup stages items from
//! external inputs into internal inputs one carry at a time; Process is
//! entirely host-timed; Store carries each internal output to a free
//! external output, again one carry at a time. Producers (no input slots)
//! skip straight from Pickup to Process.
//!
//! Every wait point is observable: the engine dispatches a `*Started`
//! hook and then does nothing for that workstation until the host answers
//! with the matching completion notification. Between the two, the world
//! may change arbitrarily; each completion handler therefore re-validates
//! the selected slots before committing the transfer.

use tracing::warn;

use shopfloor_types::{
    Hook, ItemKind, Step, StorageId, WorkerId, WorkerState, WorkstationId, WorkstationStatus,
};

use crate::engine::Engine;
use crate::hooks::HookSink;
use crate::registry::Workstation;

impl Engine {
    /// Start (or resume) the workstation's current step.
    pub(crate) fn enter_step(&mut self, ws_id: WorkstationId, sink: &mut dyn HookSink) {
        let Some(station) = self.registry.workstation(ws_id) else {
            return;
        };
        let Some(worker) = station.worker else {
            return;
        };
        match station.step {
            Step::Pickup => self.begin_pickup(ws_id, sink),
            Step::Process => sink.dispatch(&Hook::ProcessStarted {
                workstation: ws_id,
                worker,
            }),
            Step::Store => self.begin_store(ws_id, sink),
        }
    }

    // -----------------------------------------------------------------------
    // Pickup
    // -----------------------------------------------------------------------

    /// Pick the next external input to stage, or advance to Process when
    /// every internal input is already filled.
    fn begin_pickup(&mut self, ws_id: WorkstationId, sink: &mut dyn HookSink) {
        let decision = {
            let Some(station) = self.registry.workstation(ws_id) else {
                return;
            };
            let Some(worker) = station.worker else {
                return;
            };
            if station.is_producer() || self.registry.all_filled(&station.iis) {
                None
            } else {
                Some((worker, self.select_pickup_source(station)))
            }
        };
        match decision {
            None => self.advance_to_process(ws_id, sink),
            Some((worker, Some((storage, kind)))) => {
                if let Some(station) = self.registry.workstation_mut(ws_id) {
                    station.selected_eis = Some(storage);
                }
                sink.dispatch(&Hook::PickupStarted {
                    worker,
                    workstation: ws_id,
                    storage,
                    kind,
                });
            }
            Some((_, None)) => {
                warn!(workstation = %ws_id, "no pickup source fits an open internal input");
                self.force_block_and_release(ws_id, sink);
            }
        }
    }

    /// The first filled external input whose item fits some empty internal
    /// input slot.
    fn select_pickup_source(&self, station: &Workstation) -> Option<(StorageId, ItemKind)> {
        station.eis.iter().find_map(|eis_id| {
            let source = self.registry.storage(*eis_id)?;
            if !source.has_item {
                return None;
            }
            let kind = source.kind?;
            let fits = station.iis.iter().any(|iis_id| {
                self.registry
                    .storage(*iis_id)
                    .is_some_and(|slot| !slot.has_item && slot.takes(kind))
            });
            fits.then_some((*eis_id, kind))
        })
    }

    fn advance_to_process(&mut self, ws_id: WorkstationId, sink: &mut dyn HookSink) {
        let worker = {
            let Some(station) = self.registry.workstation_mut(ws_id) else {
                return;
            };
            station.step = Step::Process;
            station.selected_eis = None;
            station.worker
        };
        if let Some(worker) = worker {
            sink.dispatch(&Hook::ProcessStarted {
                workstation: ws_id,
                worker,
            });
        }
    }

    /// The worker arrived at the selected external input. Transfer the
    /// item into an internal input and continue the pickup loop.
    pub(crate) fn on_pickup_completed(
        &mut self,
        worker_id: WorkerId,
        sink: &mut dyn HookSink,
    ) -> bool {
        let Some(ws_id) = self.registry.worker(worker_id).and_then(|w| w.assignment) else {
            warn!(worker = %worker_id, "pickup completion from a worker without an assignment");
            return false;
        };
        let selected = {
            let Some(station) = self.registry.workstation(ws_id) else {
                return false;
            };
            if station.step != Step::Pickup {
                warn!(workstation = %ws_id, step = ?station.step, "pickup completion outside Pickup");
                return false;
            }
            station.selected_eis
        };
        let Some(eis_id) = selected else {
            warn!(workstation = %ws_id, "pickup completion with no pickup under way");
            return false;
        };

        // The source may have been emptied while the worker walked.
        let kind = self
            .registry
            .storage(eis_id)
            .filter(|slot| slot.has_item)
            .and_then(|slot| slot.kind);
        let Some(kind) = kind else {
            warn!(workstation = %ws_id, storage = %eis_id, "pickup source emptied mid-walk");
            if let Some(station) = self.registry.workstation_mut(ws_id) {
                station.selected_eis = None;
            }
            self.force_block_and_release(ws_id, sink);
            return true;
        };

        let destination = self.registry.workstation(ws_id).and_then(|station| {
            station.iis.iter().copied().find(|iis_id| {
                self.registry
                    .storage(*iis_id)
                    .is_some_and(|slot| !slot.has_item && slot.takes(kind))
            })
        });
        let Some(iis_id) = destination else {
            warn!(workstation = %ws_id, "no internal input left for the picked item");
            if let Some(station) = self.registry.workstation_mut(ws_id) {
                station.selected_eis = None;
            }
            self.force_block_and_release(ws_id, sink);
            return true;
        };

        if let Some(slot) = self.registry.storage_mut(eis_id) {
            slot.clear();
        }
        if let Some(slot) = self.registry.storage_mut(iis_id) {
            slot.fill(Some(kind));
        }
        if let Some(station) = self.registry.workstation_mut(ws_id) {
            station.selected_eis = None;
        }
        self.reevaluate_users(eis_id, sink);
        self.begin_pickup(ws_id, sink);
        true
    }

    // -----------------------------------------------------------------------
    // Process
    // -----------------------------------------------------------------------

    /// The host's process finished: consume every staged input, mark every
    /// internal output filled (kind deferred to the host), and move on.
    pub(crate) fn on_work_completed(
        &mut self,
        ws_id: WorkstationId,
        sink: &mut dyn HookSink,
    ) -> bool {
        let (worker, iis, ios) = {
            let Some(station) = self.registry.workstation(ws_id) else {
                warn!(workstation = %ws_id, "work completion for unknown workstation");
                return false;
            };
            if station.step != Step::Process {
                warn!(workstation = %ws_id, step = ?station.step, "work completion outside Process");
                return false;
            }
            let Some(worker) = station.worker else {
                warn!(workstation = %ws_id, "work completion without an assigned worker");
                return false;
            };
            (worker, station.iis.clone(), station.ios.clone())
        };

        for iis_id in iis {
            let consumed = self.registry.storage_mut(iis_id).and_then(|slot| {
                if slot.has_item {
                    let kind = slot.kind;
                    slot.clear();
                    kind
                } else {
                    None
                }
            });
            if let Some(kind) = consumed {
                sink.dispatch(&Hook::InputConsumed {
                    workstation: ws_id,
                    storage: iis_id,
                    kind,
                });
            }
        }
        for ios_id in &ios {
            if let Some(slot) = self.registry.storage_mut(*ios_id) {
                slot.fill(None);
            }
        }
        sink.dispatch(&Hook::ProcessCompleted {
            workstation: ws_id,
            worker,
        });

        if ios.is_empty() {
            self.complete_cycle(ws_id, sink);
        } else {
            if let Some(station) = self.registry.workstation_mut(ws_id) {
                station.step = Step::Store;
            }
            self.begin_store(ws_id, sink);
        }
        true
    }

    // -----------------------------------------------------------------------
    // Store
    // -----------------------------------------------------------------------

    /// Pick the next filled internal output and a compatible free external
    /// output for it, or finish the cycle when nothing is left to carry.
    fn begin_store(&mut self, ws_id: WorkstationId, sink: &mut dyn HookSink) {
        let plan = {
            let Some(station) = self.registry.workstation(ws_id) else {
                return;
            };
            let Some(worker) = station.worker else {
                return;
            };
            match self.registry.first_filled(&station.ios) {
                None => None,
                Some(ios_id) => {
                    // The concrete kind may still be deferred; fall back to
                    // the slot's declared accept so typed outputs route
                    // correctly even before the host names the item.
                    let kind = self
                        .registry
                        .storage(ios_id)
                        .and_then(|slot| slot.kind.or(slot.accepts));
                    let destination = station.eos.iter().copied().find(|eos_id| {
                        self.registry.is_vacant(*eos_id)
                            && !self.reservations.is_reserved(*eos_id)
                            && kind.is_none_or(|k| {
                                self.registry.storage(*eos_id).is_some_and(|slot| slot.takes(k))
                            })
                    });
                    Some((worker, kind, destination))
                }
            }
        };
        match plan {
            None => self.complete_cycle(ws_id, sink),
            Some((worker, kind, Some(eos_id))) => {
                if let Some(station) = self.registry.workstation_mut(ws_id) {
                    station.selected_eos = Some(eos_id);
                }
                sink.dispatch(&Hook::StoreStarted {
                    worker,
                    workstation: ws_id,
                    storage: eos_id,
                    kind,
                });
            }
            Some((_, _, None)) => {
                warn!(workstation = %ws_id, "no free external output for the produced item");
                self.force_block_and_release(ws_id, sink);
            }
        }
    }

    /// The worker dropped one output into the selected external output.
    pub(crate) fn on_store_completed(
        &mut self,
        worker_id: WorkerId,
        sink: &mut dyn HookSink,
    ) -> bool {
        let Some(ws_id) = self.registry.worker(worker_id).and_then(|w| w.assignment) else {
            warn!(worker = %worker_id, "store completion from a worker without an assignment");
            return false;
        };
        let selected = {
            let Some(station) = self.registry.workstation(ws_id) else {
                return false;
            };
            if station.step != Step::Store {
                warn!(workstation = %ws_id, step = ?station.step, "store completion outside Store");
                return false;
            }
            station.selected_eos
        };
        let Some(eos_id) = selected else {
            warn!(workstation = %ws_id, "store completion with no store under way");
            return false;
        };

        // Someone else filled the destination while the worker walked:
        // keep the item inside and retry with another output slot.
        if self.registry.is_filled(eos_id) {
            warn!(workstation = %ws_id, storage = %eos_id, "store destination filled mid-walk");
            if let Some(station) = self.registry.workstation_mut(ws_id) {
                station.selected_eos = None;
            }
            self.begin_store(ws_id, sink);
            return true;
        }

        let source = self
            .registry
            .workstation(ws_id)
            .and_then(|station| self.registry.first_filled(&station.ios));
        let Some(ios_id) = source else {
            warn!(workstation = %ws_id, "store completion with no filled internal output");
            return false;
        };
        let kind = self
            .registry
            .storage(ios_id)
            .and_then(|slot| slot.kind.or(slot.accepts));
        if let Some(slot) = self.registry.storage_mut(ios_id) {
            slot.clear();
        }
        if let Some(slot) = self.registry.storage_mut(eos_id) {
            slot.fill(kind);
        }
        if let Some(station) = self.registry.workstation_mut(ws_id) {
            station.selected_eos = None;
        }
        self.reevaluate_users(ios_id, sink);
        self.reevaluate_users(eos_id, sink);

        let more = self
            .registry
            .workstation(ws_id)
            .is_some_and(|station| self.registry.first_filled(&station.ios).is_some());
        if more {
            self.begin_store(ws_id, sink);
        } else {
            self.complete_cycle(ws_id, sink);
        }
        true
    }

    // -----------------------------------------------------------------------
    // Cycle boundary
    // -----------------------------------------------------------------------

    /// Close the cycle, then either roll straight into the next one (the
    /// worker stays) or release the worker back to the pool.
    fn complete_cycle(&mut self, ws_id: WorkstationId, sink: &mut dyn HookSink) {
        let cycles = {
            let Some(station) = self.registry.workstation_mut(ws_id) else {
                return;
            };
            station.cycles_completed = station.cycles_completed.saturating_add(1);
            station.step = Step::Pickup;
            station.selected_eis = None;
            station.selected_eos = None;
            station.cycles_completed
        };
        sink.dispatch(&Hook::CycleCompleted {
            workstation: ws_id,
            cycles_completed: cycles,
        });
        let ready = self
            .registry
            .workstation(ws_id)
            .is_some_and(|station| self.is_ready(station));
        if ready {
            self.enter_step(ws_id, sink);
        } else {
            self.release_assignment(ws_id, sink);
        }
    }

    /// Return the assigned worker to the pool and let readiness decide the
    /// station's next status.
    pub(crate) fn release_assignment(&mut self, ws_id: WorkstationId, sink: &mut dyn HookSink) {
        let Some(worker_id) = self.release_worker_of(ws_id) else {
            return;
        };
        sink.dispatch(&Hook::WorkerReleased {
            worker: worker_id,
            workstation: ws_id,
        });
        self.evaluate_readiness(ws_id, sink);
    }

    /// Release the worker and pin the station Blocked, bypassing the
    /// readiness computation. Used when a step cannot proceed even though
    /// the readiness predicate holds (kind mismatches, raced slots);
    /// re-running readiness here would re-queue it and livelock.
    pub(crate) fn force_block_and_release(&mut self, ws_id: WorkstationId, sink: &mut dyn HookSink) {
        let released = self.release_worker_of(ws_id);
        if let Some(worker_id) = released {
            sink.dispatch(&Hook::WorkerReleased {
                worker: worker_id,
                workstation: ws_id,
            });
        }
        let changed = self
            .registry
            .workstation(ws_id)
            .is_some_and(|station| station.status != WorkstationStatus::Blocked);
        if let Some(station) = self.registry.workstation_mut(ws_id) {
            station.status = WorkstationStatus::Blocked;
        }
        self.registry.dequeue(ws_id);
        if changed {
            sink.dispatch(&Hook::WorkstationBlocked { workstation: ws_id });
        }
    }

    /// Detach the worker record from the station and return it to the
    /// idle pool. No hooks; callers dispatch.
    fn release_worker_of(&mut self, ws_id: WorkstationId) -> Option<WorkerId> {
        let worker_id = {
            let station = self.registry.workstation_mut(ws_id)?;
            let worker_id = station.worker.take()?;
            station.selected_eis = None;
            station.selected_eos = None;
            worker_id
        };
        if let Some(worker) = self.registry.worker_mut(worker_id) {
            worker.assignment = None;
            worker.state = WorkerState::Idle;
        }
        self.registry.mark_idle(worker_id);
        Some(worker_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::hooks::RecordingSink;
    use shopfloor_types::{
        Notification, StorageConfig, StorageRole, WorkerConfig, WorkstationConfig,
    };

    const VEG: ItemKind = ItemKind(1);
    const MEAT: ItemKind = ItemKind(2);

    fn slot(role: StorageRole) -> StorageConfig {
        StorageConfig::of_role(role)
    }

    fn typed_slot(role: StorageRole, accepts: ItemKind) -> StorageConfig {
        StorageConfig {
            accepts: Some(accepts),
            ..StorageConfig::of_role(role)
        }
    }

    /// Producer: IOS 30 -> EOS 40, one worker already idle.
    fn producer_rig() -> (Engine, RecordingSink) {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(30), slot(StorageRole::InternalOutput), &mut sink).unwrap();
        engine.add_storage(StorageId(40), slot(StorageRole::ExternalOutput), &mut sink).unwrap();
        engine
            .add_workstation(
                WorkstationId(100),
                WorkstationConfig {
                    ios: vec![StorageId(30)],
                    eos: vec![StorageId(40)],
                    ..WorkstationConfig::default()
                },
                &mut sink,
            )
            .unwrap();
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        sink.take();
        (engine, sink)
    }

    #[test]
    fn producer_skips_pickup() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(30), slot(StorageRole::InternalOutput), &mut sink).unwrap();
        engine.add_storage(StorageId(40), slot(StorageRole::ExternalOutput), &mut sink).unwrap();
        engine
            .add_workstation(
                WorkstationId(100),
                WorkstationConfig {
                    ios: vec![StorageId(30)],
                    eos: vec![StorageId(40)],
                    ..WorkstationConfig::default()
                },
                &mut sink,
            )
            .unwrap();
        sink.take();
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        assert_eq!(
            sink.take(),
            vec![
                Hook::WorkerAssigned { worker: WorkerId(1), workstation: WorkstationId(100) },
                Hook::WorkstationActivated { workstation: WorkstationId(100) },
                Hook::ProcessStarted { workstation: WorkstationId(100), worker: WorkerId(1) },
            ]
        );
    }

    #[test]
    fn work_completion_fills_internal_output_with_deferred_kind() {
        let (mut engine, mut sink) = producer_rig();
        assert!(engine.handle(
            Notification::WorkCompleted { workstation: WorkstationId(100) },
            &mut sink,
        ));
        let ios = engine.storage(StorageId(30)).unwrap();
        assert!(ios.has_item);
        assert!(ios.kind.is_none());
        let hooks = sink.take();
        assert!(hooks.contains(&Hook::StoreStarted {
            worker: WorkerId(1),
            workstation: WorkstationId(100),
            storage: StorageId(40),
            kind: None,
        }));
    }

    #[test]
    fn deferred_kind_resolves_before_store_completes() {
        let (mut engine, mut sink) = producer_rig();
        engine.handle(Notification::WorkCompleted { workstation: WorkstationId(100) }, &mut sink);
        // The host names the produced item while it sits in the slot.
        assert!(engine.handle(
            Notification::ItemAdded { storage: StorageId(30), kind: MEAT },
            &mut sink,
        ));
        sink.take();
        assert!(engine.handle(
            Notification::StoreCompleted { worker: WorkerId(1) },
            &mut sink,
        ));
        assert_eq!(engine.storage(StorageId(40)).unwrap().kind, Some(MEAT));
        assert!(engine.storage(StorageId(30)).unwrap().kind.is_none());
    }

    #[test]
    fn producer_rolls_into_next_cycle_when_ready() {
        let (mut engine, mut sink) = producer_rig();
        // A second output slot keeps the station ready after the store.
        engine.add_storage(StorageId(41), slot(StorageRole::ExternalOutput), &mut sink).unwrap();
        engine.attach_storage(WorkstationId(100), StorageId(41), &mut sink).unwrap();
        engine.handle(Notification::WorkCompleted { workstation: WorkstationId(100) }, &mut sink);
        sink.take();
        engine.handle(Notification::StoreCompleted { worker: WorkerId(1) }, &mut sink);
        let hooks = sink.take();
        assert!(hooks.contains(&Hook::CycleCompleted {
            workstation: WorkstationId(100),
            cycles_completed: 1,
        }));
        // Same worker, no release: the next cycle starts immediately.
        assert!(hooks.contains(&Hook::ProcessStarted {
            workstation: WorkstationId(100),
            worker: WorkerId(1),
        }));
        assert!(!hooks.iter().any(|h| matches!(h, Hook::WorkerReleased { .. })));
    }

    #[test]
    fn pickup_stages_inputs_one_carry_at_a_time() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(10), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        engine.add_storage(StorageId(11), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        engine
            .add_storage(StorageId(20), typed_slot(StorageRole::InternalInput, VEG), &mut sink)
            .unwrap();
        engine
            .add_storage(StorageId(21), typed_slot(StorageRole::InternalInput, MEAT), &mut sink)
            .unwrap();
        engine.add_storage(StorageId(40), slot(StorageRole::ExternalOutput), &mut sink).unwrap();
        engine
            .add_workstation(
                WorkstationId(100),
                WorkstationConfig {
                    eis: vec![StorageId(10), StorageId(11)],
                    iis: vec![StorageId(20), StorageId(21)],
                    eos: vec![StorageId(40)],
                    ..WorkstationConfig::default()
                },
                &mut sink,
            )
            .unwrap();
        engine.handle(Notification::ItemAdded { storage: StorageId(10), kind: VEG }, &mut sink);
        engine.handle(Notification::ItemAdded { storage: StorageId(11), kind: MEAT }, &mut sink);
        sink.take();
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        let hooks = sink.take();
        assert!(hooks.contains(&Hook::PickupStarted {
            worker: WorkerId(1),
            workstation: WorkstationId(100),
            storage: StorageId(10),
            kind: VEG,
        }));

        engine.handle(Notification::PickupCompleted { worker: WorkerId(1) }, &mut sink);
        // First carry staged the veg; the second pickup starts right away.
        assert_eq!(engine.storage(StorageId(20)).unwrap().kind, Some(VEG));
        assert!(engine.storage(StorageId(10)).unwrap().kind.is_none());
        let hooks = sink.take();
        assert!(hooks.contains(&Hook::PickupStarted {
            worker: WorkerId(1),
            workstation: WorkstationId(100),
            storage: StorageId(11),
            kind: MEAT,
        }));

        engine.handle(Notification::PickupCompleted { worker: WorkerId(1) }, &mut sink);
        // Both staged: the process starts.
        assert!(sink.take().contains(&Hook::ProcessStarted {
            workstation: WorkstationId(100),
            worker: WorkerId(1),
        }));
    }

    #[test]
    fn consumed_inputs_are_announced() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(10), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        engine.add_storage(StorageId(20), slot(StorageRole::InternalInput), &mut sink).unwrap();
        engine.add_storage(StorageId(40), slot(StorageRole::ExternalOutput), &mut sink).unwrap();
        engine
            .add_workstation(
                WorkstationId(100),
                WorkstationConfig {
                    eis: vec![StorageId(10)],
                    iis: vec![StorageId(20)],
                    eos: vec![StorageId(40)],
                    ..WorkstationConfig::default()
                },
                &mut sink,
            )
            .unwrap();
        engine.handle(Notification::ItemAdded { storage: StorageId(10), kind: VEG }, &mut sink);
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        engine.handle(Notification::PickupCompleted { worker: WorkerId(1) }, &mut sink);
        sink.take();
        engine.handle(Notification::WorkCompleted { workstation: WorkstationId(100) }, &mut sink);
        let hooks = sink.take();
        assert!(hooks.contains(&Hook::InputConsumed {
            workstation: WorkstationId(100),
            storage: StorageId(20),
            kind: VEG,
        }));
        // No internal output: the cycle closes at process completion.
        assert!(hooks.contains(&Hook::CycleCompleted {
            workstation: WorkstationId(100),
            cycles_completed: 1,
        }));
    }

    #[test]
    fn raced_pickup_source_blocks_instead_of_spinning() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(10), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        engine.add_storage(StorageId(20), slot(StorageRole::InternalInput), &mut sink).unwrap();
        engine.add_storage(StorageId(40), slot(StorageRole::ExternalOutput), &mut sink).unwrap();
        engine
            .add_workstation(
                WorkstationId(100),
                WorkstationConfig {
                    eis: vec![StorageId(10)],
                    iis: vec![StorageId(20)],
                    eos: vec![StorageId(40)],
                    ..WorkstationConfig::default()
                },
                &mut sink,
            )
            .unwrap();
        engine.handle(Notification::ItemAdded { storage: StorageId(10), kind: VEG }, &mut sink);
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        sink.take();
        // The host yanks the item out while the worker walks.
        engine.handle(Notification::ItemRemoved { storage: StorageId(10) }, &mut sink);
        sink.take();
        assert!(engine.handle(
            Notification::PickupCompleted { worker: WorkerId(1) },
            &mut sink,
        ));
        let hooks = sink.take();
        assert!(hooks.contains(&Hook::WorkerReleased {
            worker: WorkerId(1),
            workstation: WorkstationId(100),
        }));
        assert!(hooks.contains(&Hook::WorkstationBlocked { workstation: WorkstationId(100) }));
        assert_eq!(engine.worker(WorkerId(1)).unwrap().state, WorkerState::Idle);
    }

    #[test]
    fn store_with_no_free_output_blocks_and_resumes_at_store() {
        let (mut engine, mut sink) = producer_rig();
        // The only output slot fills up while the process runs.
        engine.handle(Notification::ItemAdded { storage: StorageId(40), kind: MEAT }, &mut sink);
        sink.take();
        assert!(engine.handle(
            Notification::WorkCompleted { workstation: WorkstationId(100) },
            &mut sink,
        ));
        let hooks = sink.take();
        assert!(hooks.contains(&Hook::WorkerReleased {
            worker: WorkerId(1),
            workstation: WorkstationId(100),
        }));
        assert!(hooks.contains(&Hook::WorkstationBlocked { workstation: WorkstationId(100) }));
        assert!(!hooks.iter().any(|h| matches!(h, Hook::StoreStarted { .. })));
        // The produced item stays inside, waiting at Store.
        let station = engine.workstation(WorkstationId(100)).unwrap();
        assert_eq!(station.step, Step::Store);
        assert!(engine.storage(StorageId(30)).unwrap().has_item);
        assert_eq!(engine.worker(WorkerId(1)).unwrap().state, WorkerState::Idle);

        // Freeing the output resumes the cycle where it stopped.
        engine.handle(Notification::ItemRemoved { storage: StorageId(40) }, &mut sink);
        let hooks = sink.take();
        assert!(hooks.contains(&Hook::StoreStarted {
            worker: WorkerId(1),
            workstation: WorkstationId(100),
            storage: StorageId(40),
            kind: None,
        }));
    }

    #[test]
    fn completion_in_wrong_step_is_a_violation() {
        let (mut engine, mut sink) = producer_rig();
        // The station sits at Process; a store completion is out of order.
        assert!(!engine.handle(
            Notification::StoreCompleted { worker: WorkerId(1) },
            &mut sink,
        ));
        assert!(!engine.handle(
            Notification::PickupCompleted { worker: WorkerId(1) },
            &mut sink,
        ));
    }
}
