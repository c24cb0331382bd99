//! Change notification

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Aggregate alert counts published after every persisted change
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCounts {
    pub firing_alerts_count: usize,
    pub open_alerts_count: usize,
}

/// Event delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub channel: String,
    #[serde(flatten)]
    pub counts: AlertCounts,
}

/// Publishes alert counts on a well-known channel
pub struct ChangeNotifier {
    channel: String,
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeNotifier {
    pub fn new(channel: impl Into<String>, capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            channel: channel.into(),
            tx,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Publish counts; returns the number of subscribers reached
    pub fn publish(&self, counts: AlertCounts) -> usize {
        let event = ChangeEvent {
            channel: self.channel.clone(),
            counts,
        };
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(channel = %self.channel, "no subscribers for alert counts");
                0
            }
        }
    }
}
