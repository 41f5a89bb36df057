// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process feed of newly inserted unlocks.
//!
//! The recorder publishes every unlock it creates; each subscriber only sees
//! unlocks for the user it subscribed for. Delivery is best effort: a
//! subscriber that falls behind by more than the channel capacity skips the
//! missed events.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::models::UserBadge;

/// Buffered events before slow subscribers start lagging.
const DEFAULT_CAPACITY: usize = 256;

/// Fan-out channel for unlock events.
#[derive(Clone)]
pub struct UnlockFeed {
    sender: broadcast::Sender<UserBadge>,
}

impl UnlockFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a newly inserted unlock. Dropped if nobody is listening.
    pub fn publish(&self, unlock: UserBadge) {
        let _ = self.sender.send(unlock);
    }

    /// Subscribe to unlocks for one user.
    pub fn subscribe(&self, user_id: &str) -> UnlockSubscription {
        UnlockSubscription {
            user_id: user_id.to_string(),
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for UnlockFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Receiving end of [`UnlockFeed::subscribe`].
pub struct UnlockSubscription {
    user_id: String,
    receiver: broadcast::Receiver<UserBadge>,
}

impl UnlockSubscription {
    /// Wait for the next unlock for this user.
    ///
    /// Returns `None` once the feed has been dropped.
    pub async fn next(&mut self) -> Option<UserBadge> {
        loop {
            match self.receiver.recv().await {
                Ok(unlock) if unlock.user_id == self.user_id => return Some(unlock),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        user_id = %self.user_id,
                        skipped,
                        "Unlock subscriber lagged, events dropped"
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
