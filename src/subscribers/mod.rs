//! # Event subscribers for the supervisor.
//!
//! This module provides the [`Subscriber`] trait, the [`SubscriberSet`]
//! fan-out, and (behind the `logging` feature) a built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   loop / pool / shutdown ── publish(Event) ──► Bus ──► listener task
//!                                                            │
//!                                                   SubscriberSet::emit
//!                                                   ┌────────┼────────┐
//!                                                   ▼        ▼        ▼
//!                                               LogWriter  Metrics  Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscriber;
