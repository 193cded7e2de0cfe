//! Event bus implementation
//!
//! This module provides the event bus abstraction the authorization core
//! publishes audit events to, and an in-memory implementation.

use crate::types::Event;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};

/// Event bus error types.
#[derive(Debug, Error)]
pub enum EventBusError {
    /// Failed to publish event
    #[error("Failed to publish event: {0}")]
    PublishError(String),

    /// Failed to subscribe
    #[error("Failed to subscribe: {0}")]
    SubscribeError(String),

    /// No subscription with this id
    #[error("Unknown subscription: {0}")]
    UnknownSubscription(String),

    /// Channel closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for event bus operations.
pub type EventBusResult<T> = Result<T, EventBusError>;

/// Subscription handle for receiving events.
pub struct Subscription {
    /// Subscription ID
    pub id: String,
    /// Topic pattern
    pub topic: String,
    /// Event receiver
    pub receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Receive the next event.
    pub async fn recv(&mut self) -> EventBusResult<Event> {
        self.receiver
            .recv()
            .await
            .map_err(|_| EventBusError::ChannelClosed)
    }

    /// Receive an already-delivered event without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.receiver.try_recv().ok()
    }
}

/// Event handler trait for processing events.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle an event.
    async fn handle(&self, event: Event) -> EventBusResult<()>;

    /// Get the topics this handler is interested in.
    fn topics(&self) -> Vec<String>;
}

/// Event bus trait for publish/subscribe operations.
///
/// Publishers treat the bus as fire-and-forget: an error from `publish` is
/// logged by the caller and never undoes the change being described.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish an event.
    async fn publish(&self, event: Event) -> EventBusResult<()>;

    /// Subscribe to a topic pattern.
    ///
    /// Topic patterns support wildcards:
    /// - `*` matches any single segment
    /// - `#` matches zero or more segments
    ///
    /// Examples:
    /// - `document.*` matches `document.move`, `document.pin`
    /// - `*.change_access` matches access changes at every level
    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription>;

    /// Register an event handler.
    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()>;

    /// Unsubscribe.
    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()>;

    /// Get event bus stats.
    async fn stats(&self) -> EventBusStats;
}

/// Event bus statistics.
#[derive(Debug, Clone, Default)]
pub struct EventBusStats {
    /// Total events published
    pub events_published: u64,
    /// Total deliveries to subscribers and handlers
    pub events_delivered: u64,
    /// Active subscriptions
    pub active_subscriptions: usize,
    /// Registered handlers
    pub registered_handlers: usize,
}

/// Check if a topic matches a pattern.
pub fn topic_matches(pattern: &str, topic: &str) -> bool {
    let pattern_parts: Vec<&str> = pattern.split('.').collect();
    let topic_parts: Vec<&str> = topic.split('.').collect();
    segments_match(&pattern_parts, &topic_parts)
}

fn segments_match(pattern: &[&str], topic: &[&str]) -> bool {
    match (pattern.split_first(), topic.split_first()) {
        (None, None) => true,
        (Some((&"#", rest)), _) => {
            (0..=topic.len()).any(|skip| segments_match(rest, &topic[skip..]))
        }
        (Some((&"*", rest)), Some((_, topic_rest))) => segments_match(rest, topic_rest),
        (Some((segment, rest)), Some((head, topic_rest))) => {
            segment == head && segments_match(rest, topic_rest)
        }
        _ => false,
    }
}

#[derive(Default)]
struct Subscribers {
    /// One broadcast channel per distinct pattern
    channels: HashMap<String, broadcast::Sender<Event>>,
    /// Subscription id to pattern
    patterns: HashMap<String, String>,
}

/// In-memory event bus implementation.
///
/// Suitable for single-process deployments and tests. Handlers run on
/// spawned tasks so a slow sink never delays the publisher.
pub struct MemoryEventBus {
    /// Topic subscribers
    subscribers: Arc<RwLock<Subscribers>>,
    /// Registered handlers
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
    /// Statistics
    stats: Arc<RwLock<EventBusStats>>,
    /// Default channel capacity
    channel_capacity: usize,
}

impl std::fmt::Debug for MemoryEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryEventBus")
            .field("channel_capacity", &self.channel_capacity)
            .finish()
    }
}

impl MemoryEventBus {
    /// Create a new in-memory event bus.
    pub fn new() -> Self {
        Self::with_capacity(1024)
    }

    /// Create with custom channel capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(Subscribers::default())),
            handlers: Arc::new(RwLock::new(Vec::new())),
            stats: Arc::new(RwLock::new(EventBusStats::default())),
            channel_capacity: capacity,
        }
    }
}

impl Default for MemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryEventBus {
    async fn publish(&self, event: Event) -> EventBusResult<()> {
        let topic = event.topic();
        let mut delivered = 0u64;

        {
            let subscribers = self.subscribers.read().await;
            for (pattern, sender) in subscribers.channels.iter() {
                if topic_matches(pattern, &topic) {
                    // No live receivers is not an error for a fire-and-forget bus
                    if let Ok(count) = sender.send(event.clone()) {
                        delivered += count as u64;
                    }
                }
            }
        }

        {
            let handlers = self.handlers.read().await;
            for handler in handlers.iter() {
                if handler.topics().iter().any(|t| topic_matches(t, &topic)) {
                    delivered += 1;
                    let handler = handler.clone();
                    let event = event.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handler.handle(event).await {
                            tracing::error!(error = %e, "Audit event handler failed");
                        }
                    });
                }
            }
        }

        let mut stats = self.stats.write().await;
        stats.events_published += 1;
        stats.events_delivered += delivered;

        tracing::trace!(topic = %topic, event_id = %event.id, delivered, "Event published");
        Ok(())
    }

    async fn subscribe(&self, topic: &str) -> EventBusResult<Subscription> {
        if topic.is_empty() {
            return Err(EventBusError::SubscribeError(
                "topic pattern must not be empty".to_string(),
            ));
        }
        let id = uuid::Uuid::now_v7().to_string();

        let receiver = {
            let mut subscribers = self.subscribers.write().await;
            let receiver = match subscribers.channels.get(topic) {
                Some(sender) => sender.subscribe(),
                None => {
                    let (sender, receiver) = broadcast::channel(self.channel_capacity);
                    subscribers.channels.insert(topic.to_string(), sender);
                    receiver
                }
            };
            subscribers.patterns.insert(id.clone(), topic.to_string());
            receiver
        };

        self.stats.write().await.active_subscriptions += 1;

        Ok(Subscription {
            id,
            topic: topic.to_string(),
            receiver,
        })
    }

    async fn register_handler(&self, handler: Arc<dyn EventHandler>) -> EventBusResult<()> {
        self.handlers.write().await.push(handler);
        self.stats.write().await.registered_handlers += 1;
        Ok(())
    }

    async fn unsubscribe(&self, subscription_id: &str) -> EventBusResult<()> {
        {
            let mut subscribers = self.subscribers.write().await;
            let pattern = subscribers
                .patterns
                .remove(subscription_id)
                .ok_or_else(|| EventBusError::UnknownSubscription(subscription_id.to_string()))?;
            let still_used = subscribers.patterns.values().any(|p| *p == pattern);
            if !still_used {
                subscribers.channels.remove(&pattern);
            }
        }

        let mut stats = self.stats.write().await;
        stats.active_subscriptions = stats.active_subscriptions.saturating_sub(1);
        Ok(())
    }

    async fn stats(&self) -> EventBusStats {
        self.stats.read().await.clone()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AuditAction;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_memory_event_bus_publish_subscribe() {
        let bus = MemoryEventBus::new();
        let mut sub = bus.subscribe("document.*").await.unwrap();

        bus.publish(AuditAction::DocumentMove.to_event()).await.unwrap();

        let received = tokio::time::timeout(Duration::from_millis(100), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received.event_type, "document.move");
    }

    #[test]
    fn test_topic_matching() {
        // Exact match
        assert!(topic_matches("document.move", "document.move"));

        // Single wildcard
        assert!(topic_matches("document.*", "document.move_to_trash"));
        assert!(topic_matches("*.change_access", "site.change_access"));

        // Multi-segment wildcard
        assert!(topic_matches("#", "workspace.rename"));
        assert!(topic_matches("workspace.#", "workspace.rename"));
        assert!(topic_matches("workspace.#", "workspace"));
        assert!(topic_matches("#.rename", "document.rename"));

        // Non-matches
        assert!(!topic_matches("document.pin", "document.unpin"));
        assert!(!topic_matches("site.*", "workspace.create"));
        assert!(!topic_matches("document.*", "document"));
    }

    #[tokio::test]
    async fn test_stats_and_unsubscribe() {
        let bus = MemoryEventBus::new();

        let stats = bus.stats().await;
        assert_eq!(stats.events_published, 0);
        assert_eq!(stats.active_subscriptions, 0);

        let sub = bus.subscribe("site.*").await.unwrap();
        assert_eq!(bus.stats().await.active_subscriptions, 1);

        bus.publish(AuditAction::SiteCreate.to_event()).await.unwrap();
        let stats = bus.stats().await;
        assert_eq!(stats.events_published, 1);
        assert_eq!(stats.events_delivered, 1);

        bus.unsubscribe(&sub.id).await.unwrap();
        assert_eq!(bus.stats().await.active_subscriptions, 0);
        assert!(matches!(
            bus.unsubscribe(&sub.id).await,
            Err(EventBusError::UnknownSubscription(_))
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_succeeds() {
        let bus = MemoryEventBus::new();
        bus.publish(AuditAction::WorkspaceCreate.to_event())
            .await
            .unwrap();
        assert_eq!(bus.stats().await.events_delivered, 0);
    }

    struct CountingHandler {
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: Event) -> EventBusResult<()> {
            self.seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn topics(&self) -> Vec<String> {
            vec!["*.change_access".to_string()]
        }
    }

    #[tokio::test]
    async fn test_handler_receives_matching_events() {
        let bus = MemoryEventBus::new();
        let seen = Arc::new(AtomicUsize::new(0));
        bus.register_handler(Arc::new(CountingHandler { seen: seen.clone() }))
            .await
            .unwrap();

        bus.publish(AuditAction::DocumentChangeAccess.to_event())
            .await
            .unwrap();
        bus.publish(AuditAction::DocumentPin.to_event()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert_eq!(bus.stats().await.registered_handlers, 1);
    }
}
