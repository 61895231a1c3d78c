//! Disk-backed image loading for scrolling lists.
//!
//! A list UI binds each visible slot to a [`ResourceRecord`]; the image is
//! fetched at most once per cache key on background tasks, persisted in a
//! [`ContentStore`], and handed back to the slot's callback on the delivery
//! context, unless the slot has been rebound in the meantime.
//!
//! ```no_run
//! # async fn demo() -> glint_core::Result<()> {
//! use std::sync::Arc;
//! use glint_core::{
//!     ContentStore, Fetcher, HttpTransport, LoadCoordinator, ResourceRecord,
//!     SlotBinding,
//! };
//!
//! let store = ContentStore::new("/tmp/glint");
//! let transport = Arc::new(HttpTransport::new()?);
//! let fetcher = Arc::new(Fetcher::new(store, transport));
//! let coordinator = LoadCoordinator::with_current_runtime(fetcher)?;
//! let mut slots = SlotBinding::new(coordinator);
//!
//! let record = ResourceRecord::new("https://example.com/a.png", "a");
//! slots.bind(0, &record, |image| {
//!     println!("slot 0 got {:?}", image.map(|i| i.dimensions()));
//! });
//! slots.settle().await;
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod coordinator;
pub mod error;
pub mod fetcher;
pub mod key;
pub mod record;
pub mod request;
pub mod store;
pub mod transport;

pub use binding::SlotBinding;
pub use coordinator::{Delivery, FetchOutcome, LoadCoordinator};
pub use error::{LoaderError, Result};
pub use fetcher::{FetchStats, Fetcher};
pub use key::{ContentKey, KeyStrategy};
pub use record::{LoadedImage, ResourceRecord};
pub use request::{
    CancelFlag, Completion, DispatchTicket, LoadRequest, RequestId,
    RequestState, SlotId,
};
pub use store::ContentStore;
pub use transport::{HttpTransport, Transport};
