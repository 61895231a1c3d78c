//! Resolve a resource identity to image bytes through the disk cache.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use image::DynamicImage;
use tokio::sync::Mutex;

use crate::error::{LoaderError, Result};
use crate::key::{ContentKey, KeyStrategy};
use crate::record::LoadedImage;
use crate::store::ContentStore;
use crate::transport::Transport;

/// Counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Fetches answered from the content store.
    pub cache_hits: u64,
    /// Network transfers started.
    pub transfers: u64,
    /// Fetches that ended in an error.
    pub failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicU64,
    transfers: AtomicU64,
    failures: AtomicU64,
}

struct Resolved {
    key: ContentKey,
    bytes: Vec<u8>,
    /// Present when the bytes were decoded for validation on a miss.
    decoded: Option<DynamicImage>,
}

/// Cache-first image fetcher.
///
/// Every method performs file and network I/O and must only be awaited from
/// background tasks, never from the delivery context.
pub struct Fetcher {
    store: ContentStore,
    transport: Arc<dyn Transport>,
    strategy: KeyStrategy,
    /// One lock per key being resolved so a second caller waits for the
    /// first transfer and then hits the cache.
    locks: DashMap<ContentKey, Arc<Mutex<()>>>,
    counters: Counters,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("store", &self.store)
            .field("strategy", &self.strategy)
            .field("in_flight_keys", &self.locks.len())
            .finish()
    }
}

impl Fetcher {
    /// Fetcher over `store` using the default key strategy.
    pub fn new(store: ContentStore, transport: Arc<dyn Transport>) -> Self {
        Self {
            store,
            transport,
            strategy: KeyStrategy::default(),
            locks: DashMap::new(),
            counters: Counters::default(),
        }
    }

    /// Override how identities map to cache keys.
    pub fn with_key_strategy(mut self, strategy: KeyStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Backing content store.
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Strategy used by [`Fetcher::key_for`].
    pub fn key_strategy(&self) -> KeyStrategy {
        self.strategy
    }

    /// Cache key `identity` resolves to.
    pub fn key_for(&self, identity: &str) -> Result<ContentKey> {
        ContentKey::derive(identity, self.strategy)
    }

    /// Snapshot of the counters.
    pub fn stats(&self) -> FetchStats {
        FetchStats {
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            transfers: self.counters.transfers.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
        }
    }

    /// Encoded bytes for `identity`, from the cache or the network.
    ///
    /// On a miss the transferred bytes are decoded to confirm they are an
    /// image before being written to the store. Network and decode failures
    /// never write.
    pub async fn fetch(&self, identity: &str) -> Result<Vec<u8>> {
        Ok(self.resolve(identity).await?.bytes)
    }

    /// Like [`Fetcher::fetch`], also returning the decoded image.
    pub async fn fetch_image(&self, identity: &str) -> Result<LoadedImage> {
        let Resolved {
            key,
            bytes,
            decoded,
        } = self.resolve(identity).await?;

        let (bytes, image) = match decoded {
            Some(image) => (bytes, image),
            None => {
                let (bytes, decoded) = decode(bytes).await?;
                match decoded {
                    Ok(image) => (bytes, image),
                    Err(err) => {
                        self.counters
                            .failures
                            .fetch_add(1, Ordering::Relaxed);
                        tracing::warn!(
                            %key,
                            error = %err,
                            "cached entry is not a decodable image"
                        );
                        return Err(err);
                    }
                }
            }
        };

        Ok(LoadedImage {
            identity: identity.to_string(),
            key,
            width: image.width(),
            height: image.height(),
            bytes: Arc::from(bytes),
            image: Arc::new(image),
        })
    }

    async fn resolve(&self, identity: &str) -> Result<Resolved> {
        let result = self.resolve_inner(identity).await;
        if result.is_err() {
            self.counters.failures.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    async fn resolve_inner(&self, identity: &str) -> Result<Resolved> {
        let key = self.key_for(identity)?;

        let lock =
            self.locks.entry(key.clone()).or_default().value().clone();
        let result = {
            let _guard = lock.lock().await;
            self.resolve_locked(identity, key.clone()).await
        };
        drop(lock);
        // Only the map's handle left: nobody else is waiting on this key.
        self.locks
            .remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn resolve_locked(
        &self,
        identity: &str,
        key: ContentKey,
    ) -> Result<Resolved> {
        if self.store.exists(&key).await {
            match self.store.read(&key).await {
                Ok(bytes) => {
                    self.counters
                        .cache_hits
                        .fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(%key, identity, "cache hit");
                    return Ok(Resolved {
                        key,
                        bytes,
                        decoded: None,
                    });
                }
                // Vanished between the check and the read; fall through to
                // the network like any other miss.
                Err(err) if err.is_not_found() => {}
                Err(err) => return Err(err),
            }
        }

        tracing::debug!(%key, identity, "cache miss, fetching");
        self.counters.transfers.fetch_add(1, Ordering::Relaxed);
        let bytes = self.transport.get(identity).await?;

        let (bytes, decoded) = decode(bytes).await?;
        let image = decoded.map_err(|err| {
            tracing::debug!(
                %key,
                identity,
                error = %err,
                "transferred bytes rejected"
            );
            err
        })?;

        self.store.write(&key, &bytes).await?;

        Ok(Resolved {
            key,
            bytes,
            decoded: Some(image),
        })
    }
}

/// Decode on the blocking pool, handing the buffer back with the result.
async fn decode(bytes: Vec<u8>) -> Result<(Vec<u8>, Result<DynamicImage>)> {
    tokio::task::spawn_blocking(move || {
        let decoded = image::load_from_memory(&bytes)
            .map_err(|e| LoaderError::Decode(e.to_string()));
        (bytes, decoded)
    })
    .await
    .map_err(|e| LoaderError::Internal(format!("decode task failed: {e}")))
}
