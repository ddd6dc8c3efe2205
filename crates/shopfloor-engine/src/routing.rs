//! Item routing: dangling-item deliveries and slot-to-slot transports.
//!
//! A dangling item exists in the host's world but in no slot the engine
//! knows about (dropped on the floor, spawned by a script). The engine
//! finds it a compatible destination, reserves that slot, and sends an
//! idle worker to carry it in.
//!
//! A transport moves a finished item out of a filled external output into
//! an external input or standalone slot elsewhere, keeping pipelines
//! flowing between workstations.
//!
//! Both kinds of task reserve their destination for the duration of the
//! carry, so no other delivery and no store step can target the same slot.

use serde::Serialize;
use tracing::warn;

use shopfloor_types::{Hook, ItemId, ItemKind, Priority, StorageId, StorageRole, WorkerId, WorkerState};

use crate::engine::Engine;
use crate::hooks::HookSink;
use crate::registry::{DanglingTask, TransportTask};

/// A loose item the engine is trying to bring into a slot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DanglingItem {
    /// The item's kind.
    pub kind: ItemKind,
    /// The worker currently carrying it, if a delivery is under way.
    pub worker: Option<WorkerId>,
}

impl Engine {
    /// A destination for an item entering the floor: the first empty,
    /// unreserved external input accepting the kind, else the first such
    /// standalone slot. Ascending id order within each pass.
    fn find_destination(&self, kind: ItemKind) -> Option<StorageId> {
        for role in [StorageRole::ExternalInput, StorageRole::Standalone] {
            let found = self.registry.storages().find_map(|(id, slot)| {
                (slot.role == role
                    && !slot.has_item
                    && slot.takes(kind)
                    && !self.reservations.is_reserved(id))
                .then_some(id)
            });
            if found.is_some() {
                return found;
            }
        }
        None
    }

    // -----------------------------------------------------------------------
    // Dangling deliveries
    // -----------------------------------------------------------------------

    /// Phase one of the scheduling pass: start deliveries for unassigned
    /// dangling items, in ascending item-id order.
    pub(crate) fn assign_dangling(&mut self, sink: &mut dyn HookSink) {
        let pending: Vec<ItemId> = self
            .dangling
            .iter()
            .filter(|(_, entry)| entry.worker.is_none())
            .map(|(item, _)| *item)
            .collect();
        for item in pending {
            if self.registry.no_idle_workers() {
                break;
            }
            // Re-fetch: a hook handler may have claimed or removed it.
            let kind = match self.dangling.get(&item) {
                Some(entry) if entry.worker.is_none() => entry.kind,
                _ => continue,
            };
            let Some(target) = self.find_destination(kind) else {
                continue;
            };
            let Some(worker_id) = self.registry.first_idle() else {
                break;
            };
            if !self.reservations.reserve(target, worker_id) {
                continue;
            }
            if let Some(entry) = self.dangling.get_mut(&item) {
                entry.worker = Some(worker_id);
            }
            self.registry.clear_idle(worker_id);
            if let Some(worker) = self.registry.worker_mut(worker_id) {
                worker.state = WorkerState::Working;
                worker.dangling = Some(DanglingTask { item, kind, target });
            }
            sink.dispatch(&Hook::PickupDanglingStarted {
                worker: worker_id,
                item,
                target,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Transports
    // -----------------------------------------------------------------------

    /// Phase three of the scheduling pass: move finished items out of
    /// filled external outputs, highest storage priority first.
    pub(crate) fn assign_transports(&mut self, sink: &mut dyn HookSink) {
        let mut sources: Vec<(StorageId, Priority, ItemKind)> = self
            .registry
            .storages()
            .filter_map(|(id, slot)| {
                if slot.role != StorageRole::ExternalOutput || !slot.has_item {
                    return None;
                }
                if self.transports.contains_key(&id) {
                    return None;
                }
                slot.kind.map(|kind| (id, slot.priority, kind))
            })
            .collect();
        sources.sort_by(|a, b| b.1.cmp(&a.1));

        for (from, _, kind) in sources {
            if self.registry.no_idle_workers() {
                break;
            }
            // Re-check live state; an earlier iteration's hooks may have
            // drained or claimed this slot.
            let still_pending = self
                .registry
                .storage(from)
                .is_some_and(|slot| slot.has_item && slot.kind == Some(kind))
                && !self.transports.contains_key(&from);
            if !still_pending {
                continue;
            }
            let Some(to) = self.find_destination(kind) else {
                continue;
            };
            let Some(worker_id) = self.registry.first_idle() else {
                break;
            };
            if !self.reservations.reserve(to, worker_id) {
                continue;
            }
            self.transports.insert(from, worker_id);
            self.registry.clear_idle(worker_id);
            if let Some(worker) = self.registry.worker_mut(worker_id) {
                worker.state = WorkerState::Working;
                worker.transport = Some(TransportTask {
                    from,
                    to,
                    kind,
                    picked_up: false,
                });
            }
            sink.dispatch(&Hook::TransportStarted {
                worker: worker_id,
                from,
                to,
                kind,
            });
        }
    }

    /// The transporting worker lifted the item out of the source slot.
    pub(crate) fn on_transport_pickup_completed(
        &mut self,
        worker_id: WorkerId,
        sink: &mut dyn HookSink,
    ) -> bool {
        let task = self.registry.worker(worker_id).and_then(|w| w.transport);
        let Some(task) = task else {
            warn!(worker = %worker_id, "transport pickup from a worker without a transport");
            return false;
        };
        if task.picked_up {
            warn!(worker = %worker_id, "transport pickup reported twice");
            return false;
        }
        if let Some(slot) = self.registry.storage_mut(task.from) {
            slot.clear();
        }
        self.transports.remove(&task.from);
        if let Some(worker) = self.registry.worker_mut(worker_id) {
            if let Some(transport) = worker.transport.as_mut() {
                transport.picked_up = true;
            }
        }
        self.reevaluate_users(task.from, sink);
        true
    }

    /// The carrying worker dropped its load into the reserved destination.
    /// Completes either a dangling delivery or a transport.
    pub(crate) fn on_transport_delivery_completed(
        &mut self,
        worker_id: WorkerId,
        sink: &mut dyn HookSink,
    ) -> bool {
        if let Some(task) = self.registry.worker(worker_id).and_then(|w| w.dangling) {
            if self.registry.is_filled(task.target) {
                warn!(worker = %worker_id, storage = %task.target, "delivery into an occupied slot");
                return false;
            }
            self.reservations.release(task.target);
            self.dangling.remove(&task.item);
            if let Some(slot) = self.registry.storage_mut(task.target) {
                slot.fill(Some(task.kind));
            }
            if let Some(worker) = self.registry.worker_mut(worker_id) {
                worker.dangling = None;
                worker.state = WorkerState::Idle;
            }
            self.registry.mark_idle(worker_id);
            sink.dispatch(&Hook::ItemDelivered {
                worker: worker_id,
                storage: task.target,
                item: Some(task.item),
            });
            self.announce_standalone_fill(task.target, task.kind, sink);
            self.reevaluate_users(task.target, sink);
            return true;
        }

        let task = self.registry.worker(worker_id).and_then(|w| w.transport);
        let Some(task) = task else {
            warn!(worker = %worker_id, "delivery completion from a worker without a carry");
            return false;
        };
        if !task.picked_up {
            warn!(worker = %worker_id, "delivery completion before transport pickup");
            return false;
        }
        if self.registry.is_filled(task.to) {
            warn!(worker = %worker_id, storage = %task.to, "delivery into an occupied slot");
            return false;
        }
        self.reservations.release(task.to);
        if let Some(slot) = self.registry.storage_mut(task.to) {
            slot.fill(Some(task.kind));
        }
        if let Some(worker) = self.registry.worker_mut(worker_id) {
            worker.transport = None;
            worker.state = WorkerState::Idle;
        }
        self.registry.mark_idle(worker_id);
        sink.dispatch(&Hook::TransportCompleted {
            worker: worker_id,
            to: task.to,
        });
        self.announce_standalone_fill(task.to, task.kind, sink);
        self.reevaluate_users(task.to, sink);
        true
    }

    fn announce_standalone_fill(
        &self,
        storage: StorageId,
        kind: ItemKind,
        sink: &mut dyn HookSink,
    ) {
        let standalone = self
            .registry
            .storage(storage)
            .is_some_and(|slot| slot.role == StorageRole::Standalone);
        if standalone {
            sink.dispatch(&Hook::StandaloneItemAdded { storage, kind });
        }
    }

    // -----------------------------------------------------------------------
    // Cancellation
    // -----------------------------------------------------------------------

    /// Abort a worker's dangling delivery, releasing its reservation and
    /// marking the item unassigned again. The item record stays; the host
    /// re-registers it only if the worker had already picked it up.
    pub(crate) fn cancel_dangling(
        &mut self,
        worker_id: WorkerId,
        sink: &mut dyn HookSink,
        back_to_pool: bool,
    ) {
        let task = self.registry.worker(worker_id).and_then(|w| w.dangling);
        let Some(task) = task else {
            return;
        };
        self.reservations.release(task.target);
        if let Some(entry) = self.dangling.get_mut(&task.item) {
            entry.worker = None;
        }
        if let Some(worker) = self.registry.worker_mut(worker_id) {
            worker.dangling = None;
            if back_to_pool {
                worker.state = WorkerState::Idle;
            }
        }
        if back_to_pool {
            self.registry.mark_idle(worker_id);
        }
        sink.dispatch(&Hook::TransportCancelled { worker: worker_id });
    }

    /// Abort a worker's transport. If the item was not yet lifted, the
    /// source slot stays offered; once lifted, the item is in the host's
    /// hands and comes back as a dangling item if the host re-registers it.
    pub(crate) fn cancel_transport(
        &mut self,
        worker_id: WorkerId,
        sink: &mut dyn HookSink,
        back_to_pool: bool,
    ) {
        let task = self.registry.worker(worker_id).and_then(|w| w.transport);
        let Some(task) = task else {
            return;
        };
        self.reservations.release(task.to);
        if !task.picked_up {
            self.transports.remove(&task.from);
        }
        if let Some(worker) = self.registry.worker_mut(worker_id) {
            worker.transport = None;
            if back_to_pool {
                worker.state = WorkerState::Idle;
            }
        }
        if back_to_pool {
            self.registry.mark_idle(worker_id);
        }
        sink.dispatch(&Hook::TransportCancelled { worker: worker_id });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::hooks::RecordingSink;
    use shopfloor_types::{Notification, StorageConfig, WorkerConfig};

    const VEG: ItemKind = ItemKind(1);

    fn slot(role: StorageRole) -> StorageConfig {
        StorageConfig::of_role(role)
    }

    fn prioritized(role: StorageRole, priority: i32) -> StorageConfig {
        StorageConfig {
            priority: priority.into(),
            ..StorageConfig::of_role(role)
        }
    }

    #[test]
    fn dangling_delivery_lands_in_external_input() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(10), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        engine.add_dangling_item(ItemId(7), VEG, &mut sink);
        assert_eq!(
            sink.take(),
            vec![Hook::PickupDanglingStarted {
                worker: WorkerId(1),
                item: ItemId(7),
                target: StorageId(10),
            }]
        );
        assert_eq!(engine.reservation_holder(StorageId(10)), Some(WorkerId(1)));

        assert!(engine.handle(
            Notification::TransportDeliveryCompleted { worker: WorkerId(1) },
            &mut sink,
        ));
        assert_eq!(engine.storage(StorageId(10)).unwrap().kind, Some(VEG));
        assert_eq!(engine.reservation_holder(StorageId(10)), None);
        assert_eq!(engine.worker(WorkerId(1)).unwrap().state, WorkerState::Idle);
        assert!(sink.take().contains(&Hook::ItemDelivered {
            worker: WorkerId(1),
            storage: StorageId(10),
            item: Some(ItemId(7)),
        }));
    }

    #[test]
    fn two_items_one_destination_starts_one_delivery() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(10), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        engine.add_worker(WorkerId(2), WorkerConfig::default(), &mut sink);
        engine.add_dangling_item(ItemId(7), VEG, &mut sink);
        engine.add_dangling_item(ItemId(8), VEG, &mut sink);
        let starts = sink
            .take()
            .into_iter()
            .filter(|h| matches!(h, Hook::PickupDanglingStarted { .. }))
            .count();
        // The reservation makes the single slot unavailable to the second.
        assert_eq!(starts, 1);
        assert_eq!(engine.worker(WorkerId(2)).unwrap().state, WorkerState::Idle);
    }

    #[test]
    fn dangling_prefers_external_input_over_standalone() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(5), slot(StorageRole::Standalone), &mut sink).unwrap();
        engine.add_storage(StorageId(10), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        engine.add_dangling_item(ItemId(7), VEG, &mut sink);
        let task = engine.worker(WorkerId(1)).unwrap().dangling.unwrap();
        assert_eq!(task.target, StorageId(10));
    }

    #[test]
    fn delivery_to_standalone_announces_it() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(5), slot(StorageRole::Standalone), &mut sink).unwrap();
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        engine.add_dangling_item(ItemId(7), VEG, &mut sink);
        sink.take();
        engine.handle(Notification::TransportDeliveryCompleted { worker: WorkerId(1) }, &mut sink);
        assert!(sink.take().contains(&Hook::StandaloneItemAdded {
            storage: StorageId(5),
            kind: VEG,
        }));
    }

    #[test]
    fn transport_moves_finished_item_between_slots() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(40), slot(StorageRole::ExternalOutput), &mut sink).unwrap();
        engine.add_storage(StorageId(50), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        sink.take();
        // A finished item appears in the output slot.
        engine.handle(Notification::ItemAdded { storage: StorageId(40), kind: VEG }, &mut sink);
        assert_eq!(
            sink.take(),
            vec![Hook::TransportStarted {
                worker: WorkerId(1),
                from: StorageId(40),
                to: StorageId(50),
                kind: VEG,
            }]
        );

        assert!(engine.handle(
            Notification::TransportPickupCompleted { worker: WorkerId(1) },
            &mut sink,
        ));
        assert!(engine.storage(StorageId(40)).unwrap().kind.is_none());
        sink.take();

        assert!(engine.handle(
            Notification::TransportDeliveryCompleted { worker: WorkerId(1) },
            &mut sink,
        ));
        assert_eq!(engine.storage(StorageId(50)).unwrap().kind, Some(VEG));
        assert!(sink.take().contains(&Hook::TransportCompleted {
            worker: WorkerId(1),
            to: StorageId(50),
        }));
    }

    #[test]
    fn transport_order_follows_storage_priority() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine
            .add_storage(StorageId(40), prioritized(StorageRole::ExternalOutput, 0), &mut sink)
            .unwrap();
        engine
            .add_storage(StorageId(41), prioritized(StorageRole::ExternalOutput, 9), &mut sink)
            .unwrap();
        engine.add_storage(StorageId(50), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        for id in [40_u64, 41] {
            engine
                .handle(Notification::ItemAdded { storage: StorageId(id), kind: VEG }, &mut sink);
        }
        sink.take();
        // One worker, one free destination: the high-priority slot wins.
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        let task = engine.worker(WorkerId(1)).unwrap().transport.unwrap();
        assert_eq!(task.from, StorageId(41));
    }

    #[test]
    fn delivery_into_an_occupied_slot_is_a_violation() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(10), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        engine.add_dangling_item(ItemId(7), VEG, &mut sink);
        sink.take();
        // Something slipped into the reserved slot anyway.
        engine.registry.storage_mut(StorageId(10)).unwrap().fill(Some(ItemKind(9)));

        assert!(!engine.handle(
            Notification::TransportDeliveryCompleted { worker: WorkerId(1) },
            &mut sink,
        ));
        // The occupant survives and the carry stays in flight.
        assert_eq!(engine.storage(StorageId(10)).unwrap().kind, Some(ItemKind(9)));
        assert!(engine.worker(WorkerId(1)).unwrap().dangling.is_some());
        assert_eq!(engine.reservation_holder(StorageId(10)), Some(WorkerId(1)));
    }

    #[test]
    fn delivery_before_pickup_is_a_violation() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(40), slot(StorageRole::ExternalOutput), &mut sink).unwrap();
        engine.add_storage(StorageId(50), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        engine.handle(Notification::ItemAdded { storage: StorageId(40), kind: VEG }, &mut sink);
        assert!(!engine.handle(
            Notification::TransportDeliveryCompleted { worker: WorkerId(1) },
            &mut sink,
        ));
        // The item is still in the source slot.
        assert_eq!(engine.storage(StorageId(40)).unwrap().kind, Some(VEG));
    }

    #[test]
    fn removing_a_dangling_item_cancels_its_delivery() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(10), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        engine.add_dangling_item(ItemId(7), VEG, &mut sink);
        sink.take();
        assert!(engine.remove_dangling_item(ItemId(7), &mut sink));
        assert!(sink.take().contains(&Hook::TransportCancelled { worker: WorkerId(1) }));
        assert_eq!(engine.reservation_holder(StorageId(10)), None);
        assert_eq!(engine.worker(WorkerId(1)).unwrap().state, WorkerState::Idle);
        assert!(!engine.remove_dangling_item(ItemId(7), &mut sink));
    }

    #[test]
    fn untyped_output_item_is_not_offered_for_transport() {
        let mut engine = Engine::new();
        let mut sink = RecordingSink::new();
        engine.add_storage(StorageId(40), slot(StorageRole::ExternalOutput), &mut sink).unwrap();
        engine.add_storage(StorageId(50), slot(StorageRole::ExternalInput), &mut sink).unwrap();
        // Mark the slot filled with a deferred kind, as a finishing
        // process would.
        engine.registry.storage_mut(StorageId(40)).unwrap().fill(None);
        engine.add_worker(WorkerId(1), WorkerConfig::default(), &mut sink);
        assert!(engine.worker(WorkerId(1)).unwrap().transport.is_none());
    }
}
