//! # Event subscriber trait.
//!
//! Provides [`Subscriber`], the extension point for plugging custom event
//! handlers (logging, metrics, alerts) into the supervisor.
//!
//! ## Rules
//! - Handlers run on the supervisor's listener task, sequentially and in
//!   FIFO order; keep them fast and non-blocking.
//! - Handle errors internally; a subscriber can never fail the loop.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use preforkd::{Event, EventKind, Subscriber};
//!
//! struct SpawnCounter;
//!
//! #[async_trait]
//! impl Subscriber for SpawnCounter {
//!     async fn handle(&self, event: &Event) {
//!         if matches!(event.kind, EventKind::WorkerSpawned) {
//!             // increment a counter, export a metric, ...
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for supervisor observability.
#[async_trait]
pub trait Subscriber: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from the supervisor's listener task; events are delivered in
    /// FIFO order.
    async fn handle(&self, event: &Event);

    /// Returns the subscriber name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose;
    /// override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
