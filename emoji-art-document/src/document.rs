//! The observable document controller.
//!
//! [`EmojiArtDocument`] owns one [`EmojiArt`] value. UI collaborators call
//! its intents; every intent publishes a [`DocumentEvent`] to
//! subscribers and hands an encoded snapshot to the persistence worker
//! before returning. Changing the background starts an asynchronous fetch
//! whose result is applied only if no newer fetch was started meanwhile.
//!
//! Documents spawn tasks, so they must be opened inside a tokio runtime.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use emoji_art_core::geometry::{scale_rounded, truncate};
use emoji_art_core::{
    clamp_size, Defaults, DefaultsSlot, Emoji, EmojiArt, EmojiId, Offset, Point, Storage,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use url::Url;
use uuid::Uuid;

use crate::background::{BackgroundImage, BackgroundState};
use crate::error::{FetchError, FetchResult};
use crate::fetch::{FetchConfig, HttpFetcher, ImageFetcher};
use crate::persist::Persister;
use crate::resolver::{EmbeddedUrlResolver, IdentityResolver, UrlResolver};

/// Defaults key of the single-document variant.
pub const UNTITLED_KEY: &str = "EmojiArtDocument.Untitled";

/// Default capacity of the event channel.
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Unique identifier for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Create a new unique document ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an ID from its string form.
    ///
    /// # Errors
    ///
    /// Returns an error if `s` is not a UUID.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Change notifications published by a document.
#[derive(Debug, Clone)]
pub enum DocumentEvent {
    /// An intent ran; carries the resulting snapshot.
    ArtChanged(EmojiArt),
    /// The background image cache changed.
    BackgroundChanged(BackgroundState),
}

/// Collaborators a document uses for its background.
#[derive(Clone)]
pub struct DocumentOptions {
    resolver: Arc<dyn UrlResolver>,
    fetcher: Arc<dyn ImageFetcher>,
    event_capacity: usize,
}

impl std::fmt::Debug for DocumentOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentOptions")
            .field("resolver", &self.resolver)
            .field("event_capacity", &self.event_capacity)
            .finish_non_exhaustive()
    }
}

impl DocumentOptions {
    /// Fetch backgrounds with `fetcher` and store references unchanged.
    #[must_use]
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            resolver: Arc::new(IdentityResolver),
            fetcher,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// HTTP fetching with limits from the environment and embedded image
    /// links resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_env() -> FetchResult<Self> {
        let fetcher = HttpFetcher::new(FetchConfig::from_env())?;
        Ok(Self::new(Arc::new(fetcher)).with_resolver(Arc::new(EmbeddedUrlResolver::default())))
    }

    /// Use `resolver` to canonicalize background references.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn UrlResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Use `fetcher` to retrieve background images.
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ImageFetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Buffer up to `capacity` events per subscriber.
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

struct State {
    art: EmojiArt,
    background: BackgroundState,
    /// Bumped by every background fetch; results from older fetches are
    /// discarded.
    generation: u64,
}

struct Inner {
    id: DocumentId,
    state: Mutex<State>,
    events: broadcast::Sender<DocumentEvent>,
    persister: Persister,
    storage: Arc<dyn Storage>,
    options: DocumentOptions,
}

/// An open emoji art document.
///
/// Cheap to clone; clones share the same document.
#[derive(Clone)]
pub struct EmojiArtDocument {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for EmojiArtDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmojiArtDocument")
            .field("id", &self.inner.id)
            .field("storage", &self.inner.storage)
            .finish_non_exhaustive()
    }
}

impl EmojiArtDocument {
    /// Open the document stored in `storage`.
    ///
    /// Missing, unreadable or malformed bytes open an empty document. Stored
    /// sizes outside the allowed range are clamped. If the document has a
    /// background, fetching it starts immediately.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn open(id: DocumentId, storage: Arc<dyn Storage>, options: DocumentOptions) -> Self {
        let mut art = match storage.read() {
            Ok(Some(bytes)) => EmojiArt::decode(&bytes).unwrap_or_default(),
            Ok(None) => EmojiArt::default(),
            Err(e) => {
                tracing::warn!(
                    document = %id,
                    "Failed to read {}: {e}; starting empty",
                    storage.location()
                );
                EmojiArt::default()
            }
        };
        let clamped = art.clamp_sizes();
        if clamped > 0 {
            tracing::debug!(document = %id, clamped, "Clamped stored emoji sizes");
        }
        tracing::debug!(
            document = %id,
            emojis = art.len(),
            "Opened document from {}",
            storage.location()
        );

        let (events, _) = broadcast::channel(options.event_capacity);
        let document = Self {
            inner: Arc::new(Inner {
                id,
                state: Mutex::new(State {
                    art,
                    background: BackgroundState::Absent,
                    generation: 0,
                }),
                events,
                persister: Persister::spawn(Arc::clone(&storage)),
                storage,
                options,
            }),
        };
        document.fetch_background();
        document
    }

    /// Open the single untitled document kept in `defaults`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn untitled(defaults: Defaults, options: DocumentOptions) -> Self {
        Self::open(
            DocumentId::new(),
            Arc::new(DefaultsSlot::new(defaults, UNTITLED_KEY)),
            options,
        )
    }

    /// The document's identity.
    #[must_use]
    pub fn id(&self) -> DocumentId {
        self.inner.id
    }

    /// Where the document is persisted.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn Storage> {
        &self.inner.storage
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DocumentEvent> {
        self.inner.events.subscribe()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Snapshot of the placed emoji in z-order.
    #[must_use]
    pub fn emojis(&self) -> Vec<Emoji> {
        self.lock().art.emojis().to_vec()
    }

    /// Look up one emoji.
    #[must_use]
    pub fn emoji(&self, id: EmojiId) -> Option<Emoji> {
        self.lock().art.emoji(id).cloned()
    }

    /// Snapshot of the whole value.
    #[must_use]
    pub fn art(&self) -> EmojiArt {
        self.lock().art.clone()
    }

    /// The current background reference.
    #[must_use]
    pub fn background_url(&self) -> Option<Url> {
        self.lock().art.background_url.clone()
    }

    /// The decoded background image, if ready.
    #[must_use]
    pub fn background_image(&self) -> Option<Arc<BackgroundImage>> {
        self.lock().background.image().cloned()
    }

    /// The background image cache state.
    #[must_use]
    pub fn background_state(&self) -> BackgroundState {
        self.lock().background.clone()
    }

    // -----------------------------------------------------------------------
    // Intents
    // -----------------------------------------------------------------------

    /// Place `text` at a UI location.
    ///
    /// Coordinates and size are truncated toward zero; the size is clamped
    /// to the allowed range.
    pub fn add_emoji(&self, text: &str, at: Point, size: f64) -> Emoji {
        let x = truncate(at.x);
        let y = truncate(at.y);
        let size = clamp_size(truncate(size));
        let mut state = self.lock();
        let emoji = state.art.add_emoji(text, x, y, size);
        self.commit(&state);
        emoji
    }

    /// Move an emoji by a drag offset, truncated toward zero.
    pub fn move_emoji(&self, id: EmojiId, by: Offset) {
        let dx = truncate(by.width);
        let dy = truncate(by.height);
        self.mutate("move_emoji", |art| {
            art.emoji_mut(id).is_some_and(|emoji| {
                emoji.x = emoji.x.saturating_add(dx);
                emoji.y = emoji.y.saturating_add(dy);
                true
            })
        });
    }

    /// Scale an emoji's size by `factor`, rounding half to even and clamping.
    pub fn scale_emoji(&self, id: EmojiId, factor: f64) {
        self.mutate("scale_emoji", |art| {
            art.emoji_mut(id).is_some_and(|emoji| {
                emoji.size = clamp_size(scale_rounded(emoji.size, factor));
                true
            })
        });
    }

    /// Remove an emoji.
    pub fn remove_emoji(&self, id: EmojiId) {
        self.mutate("remove_emoji", |art| art.remove_emoji(id).is_some());
    }

    /// Replace the background reference and start fetching it.
    ///
    /// The reference is canonicalized by the configured resolver. `None`
    /// clears the background.
    pub fn set_background(&self, url: Option<Url>) {
        let resolved = url.map(|u| self.inner.options.resolver.resolve(u));
        self.mutate("set_background", |art| {
            art.background_url = resolved;
            true
        });
        self.fetch_background();
    }

    /// Wait until every change made so far has been written to storage
    /// (or failed to be).
    pub async fn flush(&self) {
        self.inner.persister.flush().await;
    }

    /// Wait until no background fetch is in flight, then return the state.
    pub async fn background_settled(&self) -> BackgroundState {
        let mut events = self.subscribe();
        loop {
            let current = self.background_state();
            if !current.is_loading() {
                return current;
            }
            match events.recv().await {
                Ok(DocumentEvent::BackgroundChanged(state)) if !state.is_loading() => {
                    return state;
                }
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
                Err(broadcast::error::RecvError::Closed) => return self.background_state(),
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to the value and commit. Intents that match no emoji
    /// leave the value as is but still publish and persist it.
    fn mutate(&self, intent: &str, f: impl FnOnce(&mut EmojiArt) -> bool) {
        let mut state = self.lock();
        if !f(&mut state.art) {
            tracing::trace!(document = %self.inner.id, intent, "No matching emoji");
        }
        self.commit(&state);
    }

    /// Queue the current value for persistence and publish it. Runs under
    /// the state lock so writes and events follow mutation order.
    fn commit(&self, state: &State) {
        match state.art.encode() {
            Ok(bytes) => self.inner.persister.write(bytes),
            Err(e) => tracing::warn!(document = %self.inner.id, "Failed to encode document: {e}"),
        }
        // No subscribers is fine.
        let _ = self
            .inner
            .events
            .send(DocumentEvent::ArtChanged(state.art.clone()));
    }

    fn set_background_state(&self, state: &mut State, next: BackgroundState) {
        if state.background == next {
            return;
        }
        state.background = next.clone();
        let _ = self.inner.events.send(DocumentEvent::BackgroundChanged(next));
    }

    /// Start fetching the current background, superseding any fetch in
    /// flight.
    fn fetch_background(&self) {
        let (url, generation) = {
            let mut state = self.lock();
            state.generation += 1;
            let url = state.art.background_url.clone();
            let next = if url.is_some() {
                BackgroundState::Loading
            } else {
                BackgroundState::Absent
            };
            self.set_background_state(&mut state, next);
            (url, state.generation)
        };
        let Some(url) = url else {
            return;
        };

        tracing::debug!(document = %self.inner.id, %url, generation, "Fetching background");
        let fetcher = Arc::clone(&self.inner.options.fetcher);
        let document = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            let result = retrieve(fetcher.as_ref(), &url).await;
            complete_fetch(&document, generation, &url, result);
        });
    }
}

async fn retrieve(fetcher: &dyn ImageFetcher, url: &Url) -> FetchResult<BackgroundImage> {
    let bytes = fetcher.fetch(url).await?;
    tokio::task::spawn_blocking(move || BackgroundImage::decode(&bytes))
        .await
        .map_err(FetchError::from)?
}

fn complete_fetch(
    document: &Weak<Inner>,
    generation: u64,
    url: &Url,
    result: FetchResult<BackgroundImage>,
) {
    let Some(inner) = document.upgrade() else {
        return;
    };
    let document = EmojiArtDocument { inner };
    let mut state = document.lock();
    if state.generation != generation {
        tracing::debug!(
            document = %document.inner.id,
            %url,
            generation,
            current = state.generation,
            "Discarding superseded background"
        );
        return;
    }
    let next = match result {
        Ok(image) => {
            tracing::debug!(
                document = %document.inner.id,
                %url,
                width = image.width,
                height = image.height,
                "Background ready"
            );
            BackgroundState::Ready(Arc::new(image))
        }
        Err(e) => {
            tracing::warn!(document = %document.inner.id, %url, "Background fetch failed: {e}");
            BackgroundState::Absent
        }
    };
    document.set_background_state(&mut state, next);
}
