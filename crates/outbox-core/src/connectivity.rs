//! Process-wide online/offline signal.
//!
//! One producer (`ConnectivitySignal::set`) and any number of consumers
//! (`ConnectivityWatch`). Backed by `tokio::sync::watch`, so a consumer that
//! is busy while several notifications arrive wakes once and sees the latest
//! state. The signal is injected wherever it is needed; there is no global.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }

    pub fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ConnectivitySignal
// ---------------------------------------------------------------------------

/// Producer side. Cloning shares the same underlying state.
#[derive(Clone)]
pub struct ConnectivitySignal {
    tx: Arc<watch::Sender<Connectivity>>,
}

impl ConnectivitySignal {
    /// Create a signal seeded with the platform's current reachability.
    pub fn new(initial: Connectivity) -> Self {
        let (tx, _) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Connectivity {
        *self.tx.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.current().is_online()
    }

    /// Publish a reachability event. Every call notifies subscribers, even
    /// when the state is unchanged.
    pub fn set(&self, state: Connectivity) {
        let previous = self.tx.send_replace(state);
        if previous != state {
            tracing::info!(from = %previous, to = %state, "connectivity changed");
        } else {
            tracing::debug!(state = %state, "duplicate connectivity event");
        }
    }

    pub fn subscribe(&self) -> ConnectivityWatch {
        ConnectivityWatch {
            rx: self.tx.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

// ---------------------------------------------------------------------------
// ConnectivityWatch
// ---------------------------------------------------------------------------

/// Consumer side: suspend until the next connectivity event.
pub struct ConnectivityWatch {
    rx: watch::Receiver<Connectivity>,
}

impl ConnectivityWatch {
    /// Wait for the next event and return the state it carries.
    ///
    /// Returns `None` once every `ConnectivitySignal` handle has been dropped.
    pub async fn next_change(&mut self) -> Option<Connectivity> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }

    pub fn current(&self) -> Connectivity {
        *self.rx.borrow()
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}
