//! # Shared Bus - Ledger Event Channel
//!
//! Publish/subscribe surface for ledger notifications. Downstream
//! collaborators (audit logging, notifications) subscribe here and receive
//! the same typed events whether the gateway is online or emulating.
//!
//! | Topic | Events |
//! |-------|--------|
//! | `connection` | `Connected`, `Offline` |
//! | `transactions` | `Transaction` (one per settled receipt) |
//! | `citizens` | `CitizenRegistered`, `CitizenVerified` |
//! | `documents` | `DocumentUploaded`, `DocumentVerified`, `DocumentRejected` |
//! | `grievances` | `GrievanceSubmitted`, `GrievanceResolved` |

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{EventFilter, EventTopic, LedgerEvent};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Subscription, SubscriptionError};

/// Maximum events to buffer per subscriber before lagging.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
