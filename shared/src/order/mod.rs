//! 订单通知类型
//!
//! Payloads carried by the admin order channel: new orders, status
//! changes and the periodic order-list snapshot.

pub mod status;
pub mod types;

// Re-exports
pub use status::{FALLBACK_BADGE_CLASS, OrderStatus};
pub use types::*;
