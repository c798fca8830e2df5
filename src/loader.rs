//! Lazy, shared loading of the rendering library.
//!
//! [`LibraryLoader`] is a three-state cell:
//!
//! ```text
//! Uninitialized ──ensure_loaded──▶ Loading(shared future) ──ok──▶ Ready(Arc<B>)
//!        ▲                                   │
//!        └───────────────err─────────────────┘
//! ```
//!
//! Exactly one load runs at a time. Callers arriving while it runs await a
//! clone of the same [`Shared`] future, so they all see the same handle or
//! the same error. A successful handle is kept for the life of the loader.
//! A failed load puts the cell back to `Uninitialized`; nothing retries on
//! its own, but the next conversion starts a fresh load. The load updates
//! the cell itself, so cancelled waiters never leave a finished load parked
//! in `Loading`.

use crate::error::{describe_panic, Pdf2ImgError};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::{debug, info, warn};

type LoadFn<B> = dyn Fn() -> BoxFuture<'static, Result<B, Pdf2ImgError>> + Send + Sync;
type SharedLoad<B> = Shared<BoxFuture<'static, Result<Arc<B>, Pdf2ImgError>>>;

enum LoadState<B> {
    Uninitialized,
    Loading { attempt: usize, pending: SharedLoad<B> },
    Ready(Arc<B>),
}

type StateCell<B> = Mutex<LoadState<B>>;

fn lock_state<B>(state: &StateCell<B>) -> MutexGuard<'_, LoadState<B>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Memoising, concurrency-safe loader for a library handle of type `B`.
pub struct LibraryLoader<B> {
    state: Arc<StateCell<B>>,
    load: Box<LoadFn<B>>,
    attempts: AtomicUsize,
}

impl<B: Send + Sync + 'static> LibraryLoader<B> {
    /// A loader whose load step is an async function.
    pub fn new<F, Fut>(load: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<B, Pdf2ImgError>> + Send + 'static,
    {
        Self {
            state: Arc::new(Mutex::new(LoadState::Uninitialized)),
            load: Box::new(move || load().boxed()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// A loader whose load step blocks (file system, network, `dlopen`);
    /// it is run on tokio's blocking pool.
    pub fn blocking<F>(load: F) -> Self
    where
        F: Fn() -> Result<B, Pdf2ImgError> + Send + Sync + 'static,
    {
        let load = Arc::new(load);
        Self::new(move || {
            let load = Arc::clone(&load);
            async move {
                tokio::task::spawn_blocking(move || (*load)())
                    .await
                    .map_err(|e| {
                        let detail = if e.is_panic() {
                            describe_panic(e.into_panic())
                        } else {
                            e.to_string()
                        };
                        Pdf2ImgError::LibraryLoad(format!("loader task failed: {detail}"))
                    })?
            }
        })
    }

    /// A loader that is already `Ready`.
    pub fn ready(handle: B) -> Self {
        Self {
            state: Arc::new(Mutex::new(LoadState::Ready(Arc::new(handle)))),
            load: Box::new(|| {
                async { Err(Pdf2ImgError::Internal("pre-loaded library reloaded".into())) }.boxed()
            }),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Return the cached handle, loading it first if necessary.
    ///
    /// The load records its own outcome before any waiter sees it, and on a
    /// tokio runtime it runs as its own task, so it finishes even when every
    /// waiter is cancelled.
    pub async fn ensure_loaded(&self) -> Result<Arc<B>, Pdf2ImgError> {
        let (pending, started) = {
            let mut state = lock_state(&self.state);
            match &*state {
                LoadState::Ready(handle) => return Ok(Arc::clone(handle)),
                LoadState::Loading { pending, .. } => {
                    debug!("Library load already in flight; waiting");
                    (pending.clone(), false)
                }
                LoadState::Uninitialized => {
                    let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    info!("Loading PDF rendering library (attempt {attempt})");
                    let pending = self.start_load(attempt);
                    *state = LoadState::Loading {
                        attempt,
                        pending: pending.clone(),
                    };
                    (pending, true)
                }
            }
        };

        if started {
            if let Ok(runtime) = tokio::runtime::Handle::try_current() {
                runtime.spawn(pending.clone());
            }
        }
        pending.await
    }

    fn start_load(&self, attempt: usize) -> SharedLoad<B> {
        let state: Weak<StateCell<B>> = Arc::downgrade(&self.state);
        let load = (self.load)();
        async move {
            let outcome = load.await.map(Arc::new);
            if let Some(state) = state.upgrade() {
                commit(&state, attempt, &outcome);
            }
            outcome
        }
        .boxed()
        .shared()
    }

    /// The cached handle, if loading has completed.
    pub fn get(&self) -> Option<Arc<B>> {
        match &*self.lock() {
            LoadState::Ready(handle) => Some(Arc::clone(handle)),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(&*self.lock(), LoadState::Loading { .. })
    }

    /// Number of loads started so far.
    pub fn load_attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, LoadState<B>> {
        lock_state(&self.state)
    }
}

/// Record the outcome of load `attempt`, unless a newer load replaced it.
fn commit<B>(state: &StateCell<B>, attempt: usize, outcome: &Result<Arc<B>, Pdf2ImgError>) {
    let mut state = lock_state(state);
    if !matches!(&*state, LoadState::Loading { attempt: current, .. } if *current == attempt) {
        return;
    }
    match outcome {
        Ok(handle) => {
            info!("PDF rendering library loaded");
            *state = LoadState::Ready(Arc::clone(handle));
        }
        Err(e) => {
            warn!("PDF rendering library failed to load: {e}");
            *state = LoadState::Uninitialized;
        }
    }
}

impl<B> std::fmt::Debug for LibraryLoader<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &*lock_state(&self.state) {
            LoadState::Uninitialized => "uninitialized",
            LoadState::Loading { .. } => "loading",
            LoadState::Ready(_) => "ready",
        };
        f.debug_struct("LibraryLoader")
            .field("state", &state)
            .field("attempts", &self.attempts.load(Ordering::SeqCst))
            .finish()
    }
}
