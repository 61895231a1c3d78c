//! Shared fixtures for glint-core integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use glint_core::{
    ContentStore, Fetcher, KeyStrategy, LoadCoordinator, LoaderError,
    SlotBinding, Transport,
};
use image::{ImageBuffer, ImageFormat, Rgba};

/// Encode a solid `width` x `height` PNG.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img =
        ImageBuffer::from_pixel(width, height, Rgba([200u8, 40, 90, 255]));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .expect("encode png");
    buf
}

#[derive(Clone)]
enum Route {
    Body { bytes: Vec<u8>, delay: Duration },
    Fail,
}

/// In-memory transport that counts transfers per URL.
#[derive(Default)]
pub struct FakeTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn serve(&self, url: &str, bytes: Vec<u8>) -> &Self {
        self.serve_after(url, bytes, Duration::ZERO)
    }

    pub fn serve_after(
        &self,
        url: &str,
        bytes: Vec<u8>,
        delay: Duration,
    ) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Body { bytes, delay });
        self
    }

    pub fn fail(&self, url: &str) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Fail);
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str) -> glint_core::Result<Vec<u8>> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;

        let route = self.routes.lock().unwrap().get(url).cloned();
        match route {
            Some(Route::Body { bytes, delay }) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(bytes)
            }
            Some(Route::Fail) => {
                Err(LoaderError::Network(format!("refused: {url}")))
            }
            None => Err(LoaderError::Network(format!(
                "HTTP 404 Not Found: {url}"
            ))),
        }
    }
}

pub fn fetcher(dir: &Path, transport: &Arc<FakeTransport>) -> Arc<Fetcher> {
    fetcher_with(dir, transport, KeyStrategy::LastSegment)
}

pub fn fetcher_with(
    dir: &Path,
    transport: &Arc<FakeTransport>,
    strategy: KeyStrategy,
) -> Arc<Fetcher> {
    let transport: Arc<dyn Transport> = transport.clone();
    Arc::new(
        Fetcher::new(ContentStore::new(dir), transport)
            .with_key_strategy(strategy),
    )
}

pub fn binding(fetcher: Arc<Fetcher>) -> SlotBinding {
    SlotBinding::new(
        LoadCoordinator::with_current_runtime(fetcher)
            .expect("inside a runtime"),
    )
}
