//! Typed notification bus

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};

use crate::error::ErrorInfo;
use crate::queue::RenderOutcome;

/// Notifications published by the preview pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A render finished and replaced the output
    ContentChanged { success: bool },
    /// Something failed; the previous output stays in place
    Error(ErrorInfo),
}

/// Subscription key for a [`Notification`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    ContentChanged,
    Error,
}

impl Notification {
    pub fn topic(&self) -> Topic {
        match self {
            Notification::ContentChanged { .. } => Topic::ContentChanged,
            Notification::Error(_) => Topic::Error,
        }
    }

    /// Map a render outcome onto the notification announcing it
    pub fn from_outcome(outcome: &RenderOutcome) -> Self {
        match &outcome.error {
            None if outcome.success => Notification::ContentChanged { success: true },
            Some(error) => Notification::Error(error.clone()),
            None => Notification::Error(ErrorInfo::new(
                crate::error::ErrorCategory::Render,
                "Failed to render LaTeX content",
                format!("job {} failed without a cause", outcome.job_id),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Box<dyn FnMut(&Notification) -> Result<()> + Send>;

enum Delivery {
    Callback(Handler),
    Channel(Sender<Notification>),
}

struct Subscriber {
    id: SubscriptionId,
    topic: Topic,
    delivery: Delivery,
}

/// Synchronous publish/subscribe registry
#[derive(Default)]
pub struct NotificationBus {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one topic
    pub fn subscribe<F>(&mut self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: FnMut(&Notification) -> Result<()> + Send + 'static,
    {
        self.register(topic, Delivery::Callback(Box::new(handler)))
    }

    /// Register a channel that receives every notification on `topic`.
    ///
    /// The subscription is dropped automatically once the receiver is gone.
    pub fn subscribe_channel(&mut self, topic: Topic) -> Receiver<Notification> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.register(topic, Delivery::Channel(tx));
        rx
    }

    /// Remove a subscription; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|sub| sub.id != id);
        self.subscribers.len() != before
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.subscribers.iter().filter(|sub| sub.topic == topic).count()
    }

    /// Deliver a notification to every subscriber of its topic, in
    /// subscription order. A failing handler is logged and skipped.
    pub fn publish(&mut self, notification: &Notification) {
        let topic = notification.topic();
        log::debug!("Publishing {:?}", notification);

        self.subscribers.retain_mut(|sub| {
            if sub.topic != topic {
                return true;
            }
            match &mut sub.delivery {
                Delivery::Callback(handler) => {
                    if let Err(e) = handler(notification) {
                        log::error!("Error in notification handler for {:?}: {:#}", topic, e);
                    }
                    true
                }
                Delivery::Channel(tx) => tx.send(notification.clone()).is_ok(),
            }
        });
    }

    fn register(&mut self, topic: Topic, delivery: Delivery) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push(Subscriber {
            id,
            topic,
            delivery,
        });
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use std::sync::{Arc, Mutex};

    fn render_error() -> ErrorInfo {
        ErrorInfo::new(ErrorCategory::Render, "Failed to render LaTeX content", "boom")
    }

    #[test]
    fn test_publish_reaches_topic_subscribers_only() {
        let mut bus = NotificationBus::new();
        let changed = bus.subscribe_channel(Topic::ContentChanged);
        let errors = bus.subscribe_channel(Topic::Error);

        bus.publish(&Notification::ContentChanged { success: true });

        assert_eq!(
            changed.try_recv().ok(),
            Some(Notification::ContentChanged { success: true })
        );
        assert!(errors.try_recv().is_err());
    }

    #[test]
    fn test_failing_handler_does_not_stop_delivery() {
        let mut bus = NotificationBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        bus.subscribe(Topic::Error, |_| anyhow::bail!("handler exploded"));
        let seen_clone = Arc::clone(&seen);
        bus.subscribe(Topic::Error, move |n| {
            seen_clone.lock().unwrap().push(n.clone());
            Ok(())
        });

        bus.publish(&Notification::Error(render_error()));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[Notification::Error(render_error())]);
    }

    #[test]
    fn test_unsubscribe() {
        let mut bus = NotificationBus::new();
        let id = bus.subscribe(Topic::ContentChanged, |_| Ok(()));
        assert_eq!(bus.subscriber_count(Topic::ContentChanged), 1);

        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.subscriber_count(Topic::ContentChanged), 0);
    }

    #[test]
    fn test_dropped_channel_is_unsubscribed() {
        let mut bus = NotificationBus::new();
        let rx = bus.subscribe_channel(Topic::ContentChanged);
        drop(rx);

        bus.publish(&Notification::ContentChanged { success: true });
        assert_eq!(bus.subscriber_count(Topic::ContentChanged), 0);
    }

    #[test]
    fn test_from_outcome() {
        let ok = RenderOutcome {
            job_id: 1,
            success: true,
            error: None,
        };
        assert_eq!(
            Notification::from_outcome(&ok),
            Notification::ContentChanged { success: true }
        );

        let failed = RenderOutcome {
            job_id: 2,
            success: false,
            error: Some(render_error()),
        };
        assert_eq!(
            Notification::from_outcome(&failed),
            Notification::Error(render_error())
        );
        assert_eq!(Notification::from_outcome(&failed).topic(), Topic::Error);
    }
}
