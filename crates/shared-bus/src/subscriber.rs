//! # Subscriptions
//!
//! The consuming half of the bus. A [`Subscription`] filters on receive, so
//! a subscriber only ever sees the topics it asked for.

use crate::events::{EventFilter, LedgerEvent};
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("Event bus closed")]
    Closed,
}

/// A filtered view of the bus.
pub struct Subscription {
    receiver: broadcast::Receiver<LedgerEvent>,
    filter: EventFilter,
    lagged: u64,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<LedgerEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            lagged: 0,
        }
    }

    /// Wait for the next matching event. `None` once the bus is gone.
    pub async fn recv(&mut self) -> Option<LedgerEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => self.note_lag(missed),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next buffered matching event, without waiting.
    pub fn try_recv(&mut self) -> Result<Option<LedgerEvent>, SubscriptionError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.matches(&event) => return Ok(Some(event)),
                Ok(_) => {}
                Err(TryRecvError::Lagged(missed)) => self.note_lag(missed),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Closed) => return Err(SubscriptionError::Closed),
            }
        }
    }

    /// Take everything already buffered.
    pub fn drain(&mut self) -> Vec<LedgerEvent> {
        std::iter::from_fn(|| self.try_recv().ok().flatten()).collect()
    }

    /// Events this subscriber lost by falling behind.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }

    #[must_use]
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }

    /// Turn the subscription into a `Stream`. Lagged gaps are skipped.
    pub fn into_stream(self) -> impl Stream<Item = LedgerEvent> + Send + Unpin {
        let filter = self.filter;
        BroadcastStream::new(self.receiver)
            .filter_map(move |item| item.ok().filter(|event| filter.matches(event)))
    }

    fn note_lag(&mut self, missed: u64) {
        self.lagged += missed;
        warn!(missed, "Ledger event subscriber lagged; events dropped");
    }
}
