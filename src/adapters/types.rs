//! Shared adapter types
//!
//! Lifecycle state tracked by every feed and by each streaming connection.

use std::sync::Arc;

use tokio::sync::RwLock;

/// Lifecycle of a feed (or of one streaming connection)
///
/// Streaming: `Idle → FetchingUniverse → Connecting → Streaming →
/// (Reconnecting → Connecting)* → Stopped`. Polling feeds go
/// `Idle → Polling → Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedState {
    #[default]
    Idle,
    FetchingUniverse,
    Connecting,
    Streaming,
    Reconnecting,
    Polling,
    Stopped,
}

impl std::fmt::Display for FeedState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FeedState::Idle => "idle",
            FeedState::FetchingUniverse => "fetching_universe",
            FeedState::Connecting => "connecting",
            FeedState::Streaming => "streaming",
            FeedState::Reconnecting => "reconnecting",
            FeedState::Polling => "polling",
            FeedState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}

/// State cell shared between a feed and its background tasks
pub type SharedFeedState = Arc<RwLock<FeedState>>;

pub fn new_feed_state() -> SharedFeedState {
    Arc::new(RwLock::new(FeedState::Idle))
}

/// Move `cell` to `next`, logging the transition at debug level
pub async fn transition(cell: &SharedFeedState, exchange: &'static str, next: FeedState) {
    let mut state = cell.write().await;
    let previous = *state;
    if previous != next {
        tracing::debug!(exchange, from = %previous, to = %next, "Feed state change");
        *state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_state_default() {
        assert_eq!(FeedState::default(), FeedState::Idle);
    }

    #[test]
    fn test_feed_state_display() {
        assert_eq!(FeedState::FetchingUniverse.to_string(), "fetching_universe");
        assert_eq!(FeedState::Reconnecting.to_string(), "reconnecting");
    }

    #[tokio::test]
    async fn test_transition_updates_cell() {
        let cell = new_feed_state();
        transition(&cell, "test", FeedState::Connecting).await;
        assert_eq!(*cell.read().await, FeedState::Connecting);
        transition(&cell, "test", FeedState::Stopped).await;
        assert_eq!(*cell.read().await, FeedState::Stopped);
    }
}
