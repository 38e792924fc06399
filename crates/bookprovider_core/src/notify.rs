//! Change notification seam.
//!
//! # Responsibility
//! - Publish "this identifier changed" after every mutation.
//! - Leave observer registration and delivery to the host.
//!
//! # Invariants
//! - Notifiers never fail the mutation that triggered them.

use crate::uri::BookUri;
use log::{debug, warn};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, PoisonError};

/// Receives identifiers whose underlying rows may have changed.
pub trait ChangeNotifier {
    fn notify_change(&self, uri: &BookUri);
}

impl<N: ChangeNotifier + ?Sized> ChangeNotifier for Arc<N> {
    fn notify_change(&self, uri: &BookUri) {
        (**self).notify_change(uri)
    }
}

impl<N: ChangeNotifier + ?Sized> ChangeNotifier for &N {
    fn notify_change(&self, uri: &BookUri) {
        (**self).notify_change(uri)
    }
}

/// Forwards changes to a channel; a disconnected receiver is logged and
/// otherwise ignored.
impl ChangeNotifier for Sender<BookUri> {
    fn notify_change(&self, uri: &BookUri) {
        if self.send(uri.clone()).is_err() {
            warn!("event=notify_change module=notify status=error error_code=receiver_closed uri={uri}");
        }
    }
}

/// Emits one debug log line per change and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl ChangeNotifier for LogNotifier {
    fn notify_change(&self, uri: &BookUri) {
        debug!("event=notify_change module=notify status=ok uri={uri}");
    }
}

/// Keeps every notified identifier in order.
#[derive(Debug, Default)]
pub struct ChangeRecorder {
    changes: Mutex<Vec<BookUri>>,
}

impl ChangeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded identifiers, oldest first.
    pub fn changes(&self) -> Vec<BookUri> {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns and clears recorded identifiers.
    pub fn take(&self) -> Vec<BookUri> {
        std::mem::take(&mut *self.changes.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl ChangeNotifier for ChangeRecorder {
    fn notify_change(&self, uri: &BookUri) {
        self.changes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(uri.clone());
    }
}
