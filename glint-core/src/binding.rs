//! Slot bookkeeping for list rows.

use std::collections::HashMap;
use std::sync::Arc;

use crate::coordinator::{Delivery, LoadCoordinator};
use crate::record::{LoadedImage, ResourceRecord};
use crate::request::{
    Completion, LoadRequest, RequestId, RequestState, SlotId,
};

/// Slot-aware front end used by the list UI.
///
/// Lives on the delivery context: it owns every live [`LoadRequest`] and is
/// the only place callbacks run. It is deliberately `!Send` (callbacks are
/// not required to be `Send`), so it cannot be moved onto a background task.
///
/// At most one request is live per slot. Binding a slot again cancels the
/// previous request before a new one is dispatched, and results are matched
/// on slot *and* request id, so a late result for a slot's earlier binding
/// is dropped even if the slot now shows the same record again.
#[derive(Debug)]
pub struct SlotBinding {
    coordinator: LoadCoordinator,
    slots: HashMap<SlotId, LoadRequest>,
    next_request: u64,
}

impl SlotBinding {
    /// Binding with no slots bound yet.
    pub fn new(coordinator: LoadCoordinator) -> Self {
        Self {
            coordinator,
            slots: HashMap::new(),
            next_request: 1,
        }
    }

    /// Coordinator running this binding's fetches.
    pub fn coordinator(&self) -> &LoadCoordinator {
        &self.coordinator
    }

    /// Show `record` in `slot`; `on_image` runs at most once, on this
    /// context.
    ///
    /// If the slot already has a pending request for the same identity, that
    /// request keeps running and `on_image` replaces its callback.
    pub fn bind<F>(
        &mut self,
        slot: SlotId,
        record: &ResourceRecord,
        on_image: F,
    ) -> RequestId
    where
        F: FnOnce(Option<Arc<LoadedImage>>) + 'static,
    {
        let mut completion: Completion = Box::new(on_image);

        if let Some(mut previous) = self.slots.remove(&slot) {
            if previous.identity() == record.identity {
                match previous.replace_completion(completion) {
                    Ok(()) => {
                        let id = previous.id();
                        tracing::trace!(
                            slot,
                            %id,
                            "rebind to in-flight request"
                        );
                        self.slots.insert(slot, previous);
                        return id;
                    }
                    Err(returned) => completion = returned,
                }
            }
            if previous.state() == RequestState::Pending {
                tracing::trace!(
                    slot,
                    id = %previous.id(),
                    "cancelling stale request"
                );
            }
            previous.cancel();
        }

        let id = RequestId(self.next_request);
        self.next_request += 1;

        let request =
            LoadRequest::new(id, slot, record.identity.clone(), completion);
        let ticket = request.ticket();
        self.slots.insert(slot, request);
        self.coordinator.dispatch(ticket);

        tracing::debug!(
            slot,
            %id,
            identity = %record.identity,
            "slot bound"
        );
        id
    }

    /// Cancel and forget the slot's request. Returns `true` if it was still
    /// pending.
    pub fn cancel(&mut self, slot: SlotId) -> bool {
        match self.slots.remove(&slot) {
            Some(mut request) => {
                let was_pending = request.state() == RequestState::Pending;
                request.cancel();
                was_pending
            }
            None => false,
        }
    }

    /// Cancel every slot, e.g. when the list's records are replaced.
    pub fn clear(&mut self) {
        for (_, mut request) in self.slots.drain() {
            request.cancel();
        }
    }

    /// The slot's current request id, whatever its state.
    pub fn current(&self, slot: SlotId) -> Option<RequestId> {
        self.slots.get(&slot).map(LoadRequest::id)
    }

    /// The slot's current request state, if anything is bound.
    pub fn state(&self, slot: SlotId) -> Option<RequestState> {
        self.slots.get(&slot).map(LoadRequest::state)
    }

    /// Dispatches whose results have not been routed yet, stale ones
    /// included.
    pub fn in_flight(&self) -> usize {
        self.coordinator.in_flight()
    }

    /// Route one finished dispatch. Returns `true` if a callback ran.
    pub fn deliver(&mut self, delivery: Delivery) -> bool {
        let Delivery {
            slot,
            request_id,
            identity,
            outcome,
        } = delivery;

        let Some(request) = self.slots.get_mut(&slot) else {
            tracing::trace!(
                slot,
                %request_id,
                %identity,
                "dropping result for unbound slot"
            );
            return false;
        };
        if request.id() != request_id {
            tracing::trace!(
                slot,
                %request_id,
                current = %request.id(),
                %identity,
                "dropping stale result"
            );
            return false;
        }

        request.complete(outcome.into_image()) == RequestState::Delivered
    }

    /// Route every result that is already available. Never waits.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(delivery) = self.coordinator.try_next() {
            if self.deliver(delivery) {
                delivered += 1;
            }
        }
        delivered
    }

    /// Route results as they arrive until nothing is in flight.
    pub async fn settle(&mut self) -> usize {
        let mut delivered = 0;
        while let Some(delivery) = self.coordinator.next().await {
            if self.deliver(delivery) {
                delivered += 1;
            }
        }
        delivered
    }
}
