//! Shared types for the Crab order notifier
//!
//! Wire types of the admin order channel, shared between the notifier
//! client and anything that emits order events.

pub mod message;
pub mod order;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use message::{ChannelEvent, ClientRequest, EventError};
pub use order::{DeliveryType, NewOrder, OrderStatus, OrderSummary, OrderUpdate};
