//! Request cancellation: tokens and the shared abort-handle registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;

/// An opaque handle used to abort one or more in-flight requests.
///
/// Tokens are caller-chosen names or numbers, or process-unique values
/// minted with [`CancelToken::unique`]. Requests issued with the same live
/// token share one abort handle, so aborting the token cancels all of them.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum CancelToken {
    /// A caller-chosen name.
    Name(String),
    /// A caller-chosen number.
    Id(u64),
    /// A process-unique token; never collides with caller-chosen ids.
    Unique(u64),
}

impl CancelToken {
    /// Mint a process-unique token.
    pub fn unique() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self::Unique(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<&str> for CancelToken {
    fn from(value: &str) -> Self {
        Self::Name(value.to_string())
    }
}

impl From<String> for CancelToken {
    fn from(value: String) -> Self {
        Self::Name(value)
    }
}

impl From<u64> for CancelToken {
    fn from(value: u64) -> Self {
        Self::Id(value)
    }
}

/// A cancellation signal observed by one in-flight request.
///
/// Each request sharing a token holds its own signal of the same handle,
/// so an abort reaches every request even after the registry entry is
/// removed.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Check whether the abort has already fired.
    pub fn is_fired(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once the abort fires.
    ///
    /// Never resolves when the handle is dropped without firing (the call
    /// completed normally and cancellation can no longer happen).
    pub async fn fired(mut self) {
        loop {
            if *self.rx.borrow() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

/// Maps live cancel tokens to their abort handles.
///
/// A handle is created lazily on first use of a token and removed on abort
/// or on normal call completion. At most one live handle exists per token;
/// creation-or-lookup is a single atomic step under the registry lock.
#[derive(Debug, Default)]
pub struct CancellationRegistry {
    handles: Mutex<HashMap<CancelToken, watch::Sender<bool>>>,
}

impl CancellationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the signal for a token, creating the handle on first use.
    pub fn signal(&self, token: &CancelToken) -> CancelSignal {
        let mut handles = self.handles.lock();
        if let Some(tx) = handles.get(token) {
            return CancelSignal { rx: tx.subscribe() };
        }
        let (tx, rx) = watch::channel(false);
        handles.insert(token.clone(), tx);
        CancelSignal { rx }
    }

    /// Abort every request currently sharing the token.
    ///
    /// Returns `true` if a live handle was fired; aborting an unknown
    /// token is a no-op.
    pub fn abort(&self, token: &CancelToken) -> bool {
        let removed = self.handles.lock().remove(token);
        match removed {
            Some(tx) => {
                // Receivers keep observing the fired state after the
                // sender is dropped.
                let _ = tx.send(true);
                true
            }
            None => false,
        }
    }

    /// Drop the token's handle after a call completes.
    ///
    /// Idempotent: removing a missing key is a no-op.
    pub fn complete(&self, token: &CancelToken) {
        self.handles.lock().remove(token);
    }

    /// Check whether a token currently has a live handle.
    pub fn contains(&self, token: &CancelToken) -> bool {
        self.handles.lock().contains_key(token)
    }
}
