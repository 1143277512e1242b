use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::limits::DAY_CHANNEL_CAPACITY;
use crate::model::{DayEvent, DayKey};

/// Broadcast hub: one channel per calendar day.
pub struct NotifyHub {
    channels: DashMap<DayKey, broadcast::Sender<DayEvent>>,
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NotifyHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Subscribe to changes of a day. Creates the channel if needed.
    pub fn subscribe(&self, day: DayKey) -> broadcast::Receiver<DayEvent> {
        let sender = self
            .channels
            .entry(day)
            .or_insert_with(|| broadcast::channel(DAY_CHANNEL_CAPACITY).0);
        sender.subscribe()
    }

    /// Send a notification. No-op if nobody is listening; a channel whose
    /// last receiver is gone is dropped here.
    pub fn send(&self, day: DayKey, event: &DayEvent) {
        let delivered = match self.channels.get(&day) {
            Some(sender) => sender.send(event.clone()).is_ok(),
            None => return,
        };
        if !delivered {
            self.remove_idle(day);
        }
    }

    /// Drop the day's channel if it has no receivers left.
    pub fn remove_idle(&self, day: DayKey) {
        self.channels.remove_if(&day, |_, sender| sender.receiver_count() == 0);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn subscriber_count(&self, day: DayKey) -> usize {
        self.channels.get(&day).map_or(0, |s| s.receiver_count())
    }
}
