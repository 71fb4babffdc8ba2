//! Shared fixtures for document integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use emoji_art_core::EmojiArt;
use emoji_art_document::{
    BackgroundState, DocumentEvent, DocumentOptions, FetchError, FetchResult, ImageFetcher,
};
use tokio::sync::{broadcast, oneshot};
use tokio::time::timeout;
use url::Url;

/// How long a test waits for an expected event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a test waits to be sure an event does not arrive.
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// A fetcher whose responses are released by the test.
///
/// Each URL must be armed with [`GatedFetcher::arm`] before it is fetched;
/// unarmed URLs answer 404.
#[derive(Default)]
pub struct GatedFetcher {
    gates: Mutex<HashMap<String, oneshot::Receiver<FetchResult<Vec<u8>>>>>,
}

impl GatedFetcher {
    /// Arm `url` and return the sender that releases its response.
    pub fn arm(&self, url: &Url) -> oneshot::Sender<FetchResult<Vec<u8>>> {
        let (tx, rx) = oneshot::channel();
        self.gates
            .lock()
            .expect("gates lock")
            .insert(url.to_string(), rx);
        tx
    }
}

#[async_trait]
impl ImageFetcher for GatedFetcher {
    async fn fetch(&self, url: &Url) -> FetchResult<Vec<u8>> {
        let gate = self.gates.lock().expect("gates lock").remove(url.as_str());
        match gate {
            Some(rx) => rx
                .await
                .unwrap_or_else(|_| Err(FetchError::Decode("gate dropped".to_string()))),
            None => Err(FetchError::Status(404)),
        }
    }
}

/// Options using `fetcher`.
pub fn options(fetcher: &Arc<GatedFetcher>) -> DocumentOptions {
    DocumentOptions::new(Arc::clone(fetcher) as Arc<dyn ImageFetcher>)
}

/// Options whose fetcher answers 404 to everything.
pub fn offline_options() -> DocumentOptions {
    options(&Arc::new(GatedFetcher::default()))
}

/// A solid PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]));
    let mut bytes = Cursor::new(Vec::new());
    img.write_to(&mut bytes, image::ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}

/// Parse a URL literal.
pub fn url(s: &str) -> Url {
    Url::parse(s).expect("valid url")
}

/// Wait for the next value snapshot, skipping background events.
pub async fn next_art(events: &mut broadcast::Receiver<DocumentEvent>) -> EmojiArt {
    loop {
        let event = timeout(EVENT_TIMEOUT, events.recv())
            .await
            .expect("timed out waiting for ArtChanged")
            .expect("event channel");
        if let DocumentEvent::ArtChanged(art) = event {
            return art;
        }
    }
}

/// Wait for the next background state, skipping value events.
pub async fn next_background(
    events: &mut broadcast::Receiver<DocumentEvent>,
) -> BackgroundState {
    loop {
        let event = timeout(EVENT_TIMEOUT, events.recv())
            .await
            .expect("timed out waiting for BackgroundChanged")
            .expect("event channel");
        if let DocumentEvent::BackgroundChanged(state) = event {
            return state;
        }
    }
}

/// Assert that no background event arrives for a while.
pub async fn assert_background_quiet(events: &mut broadcast::Receiver<DocumentEvent>) {
    let waited = timeout(QUIET_PERIOD, async {
        loop {
            match events.recv().await {
                Ok(DocumentEvent::BackgroundChanged(state)) => return state,
                Ok(DocumentEvent::ArtChanged(_)) => {}
                Err(e) => panic!("event channel: {e}"),
            }
        }
    })
    .await;
    if let Ok(state) = waited {
        panic!("unexpected background event: {state:?}");
    }
}
