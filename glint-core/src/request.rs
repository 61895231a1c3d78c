//! Per-slot load requests and their lifecycle.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::record::LoadedImage;

/// Stable handle for a reusable visual slot (a list row).
pub type SlotId = usize;

/// Unique id of one [`LoadRequest`]; never reused by a [`crate::SlotBinding`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req#{}", self.0)
    }
}

/// Consumer callback receiving the image, or `None` when loading failed.
///
/// Runs on the delivery context, so it need not be `Send`.
pub type Completion = Box<dyn FnOnce(Option<Arc<LoadedImage>>)>;

/// Lifecycle of a request. `Delivered` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    /// Waiting for its fetch outcome.
    Pending,
    /// The callback ran.
    Delivered,
    /// Superseded or abandoned; the callback never runs.
    Cancelled,
}

impl RequestState {
    /// `true` once no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestState::Pending)
    }
}

/// Shared cancellation flag. Setting it never interrupts work already
/// running; it only stops work from starting and results from being
/// delivered.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Set the flag. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether [`CancelFlag::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What the coordinator gets for a dispatch: enough to run the fetch and
/// route the result back, but not the callback.
#[derive(Debug, Clone)]
pub struct DispatchTicket {
    /// Request the result belongs to.
    pub request_id: RequestId,
    /// Slot the result is routed to.
    pub slot: SlotId,
    /// Identity to fetch.
    pub identity: String,
    /// Shared with the owning [`LoadRequest`].
    pub cancel: CancelFlag,
}

/// One outstanding image load for one slot.
pub struct LoadRequest {
    id: RequestId,
    slot: SlotId,
    identity: String,
    completion: Option<Completion>,
    cancel: CancelFlag,
    state: RequestState,
}

impl fmt::Debug for LoadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadRequest")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .field("identity", &self.identity)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("state", &self.state)
            .finish()
    }
}

impl LoadRequest {
    /// A pending request that will hand its outcome to `completion`.
    pub fn new(
        id: RequestId,
        slot: SlotId,
        identity: impl Into<String>,
        completion: Completion,
    ) -> Self {
        Self {
            id,
            slot,
            identity: identity.into(),
            completion: Some(completion),
            cancel: CancelFlag::default(),
            state: RequestState::Pending,
        }
    }

    /// Id assigned at creation.
    pub fn id(&self) -> RequestId {
        self.id
    }

    /// Slot this request loads into.
    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Identity being loaded.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Whether the shared flag is set, even if the state is still pending.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Ticket for the coordinator; shares this request's cancel flag.
    pub fn ticket(&self) -> DispatchTicket {
        DispatchTicket {
            request_id: self.id,
            slot: self.slot,
            identity: self.identity.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Swap in a new callback while still pending. Hands `completion` back
    /// once the request is terminal or cancelled.
    pub fn replace_completion(
        &mut self,
        completion: Completion,
    ) -> Result<(), Completion> {
        if self.state != RequestState::Pending || self.is_cancelled() {
            return Err(completion);
        }
        self.completion = Some(completion);
        Ok(())
    }

    /// Mark cancelled. A pending request moves straight to `Cancelled` and
    /// its callback is dropped unrun.
    pub fn cancel(&mut self) {
        self.cancel.cancel();
        if self.state == RequestState::Pending {
            self.state = RequestState::Cancelled;
            self.completion = None;
        }
    }

    /// Resolve the request with a fetch outcome.
    ///
    /// Invokes the callback only when still pending and not cancelled, and
    /// at most once over the request's lifetime.
    pub fn complete(
        &mut self,
        image: Option<Arc<LoadedImage>>,
    ) -> RequestState {
        if self.state.is_terminal() {
            return self.state;
        }
        if self.is_cancelled() {
            self.state = RequestState::Cancelled;
            self.completion = None;
            return self.state;
        }

        self.state = RequestState::Delivered;
        if let Some(completion) = self.completion.take() {
            completion(image);
        }
        self.state
    }
}

impl Drop for LoadRequest {
    fn drop(&mut self) {
        // Owner gone: stop any dispatch that has not started yet.
        if self.state == RequestState::Pending {
            self.cancel.cancel();
        }
    }
}
