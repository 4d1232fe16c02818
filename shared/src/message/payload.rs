use serde::{Deserialize, Serialize};

use crate::order::OrderSummary;

/// 连接确认载荷 (`connected`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectedPayload {
    pub message: String,
}

/// 订单列表快照 (`orders_update`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdersUpdatePayload {
    #[serde(default)]
    pub orders: Vec<OrderSummary>,
}

/// 待处理订单统计 (`order_stats`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatsPayload {
    /// Signed on the wire; see [`OrderStatsPayload::pending`]
    pub pending_count: i64,
}

impl OrderStatsPayload {
    /// Pending count clamped to the displayable range
    pub fn pending(&self) -> u32 {
        self.pending_count.clamp(0, u32::MAX as i64) as u32
    }
}

/// 服务端错误 (`error`), sent when the session is not authorised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
}
