//! # Platform Events
//!
//! Audit events for the Relay document platform and the bus they travel on.
//!
//! ## Overview
//!
//! Every committed change to the organization / workspace / document tree
//! produces exactly one [`Event`]. The authorization core publishes it after
//! the transaction commits and never waits on, or reads back, what
//! subscribers do with it.
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust,no_run
//! use platform_events::{AuditAction, EventBus, MemoryEventBus};
//! use platform_org::OrgId;
//! use platform_rbac::UserId;
//!
//! async fn publish_example() {
//!     let bus = MemoryEventBus::new();
//!
//!     let event = AuditAction::WorkspaceCreate
//!         .to_event()
//!         .with_org(OrgId(1))
//!         .with_actor(UserId(42));
//!
//!     bus.publish(event).await.unwrap();
//! }
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust,no_run
//! use platform_events::{EventBus, MemoryEventBus};
//!
//! async fn subscribe_example() {
//!     let bus = MemoryEventBus::new();
//!
//!     // Every access change, at any level
//!     let mut sub = bus.subscribe("*.change_access").await.unwrap();
//!
//!     while let Ok(event) = sub.recv().await {
//!         println!("Received: {}", event.event_type);
//!     }
//! }
//! ```
//!
//! ## Topic Patterns
//!
//! Topics are the action names, structured as `{subject}.{verb}`:
//! - `document.move` - Specific action
//! - `document.*` - Every document action
//! - `*.move_to_trash` - Soft deletes at any level
//! - `#` - All events
//!
//! Wildcards:
//! - `*` matches exactly one segment
//! - `#` matches zero or more segments

pub mod bus;
pub mod types;

// Re-export main types
pub use bus::{
    topic_matches, EventBus, EventBusError, EventBusResult, EventBusStats, EventHandler,
    MemoryEventBus, Subscription,
};
pub use types::{AuditAction, Event};
