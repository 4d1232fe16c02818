//! 订单频道消息类型定义
//!
//! Named events exchanged over the admin Socket.IO channel. Inbound
//! events are decoded from `(name, data)` pairs into [`ChannelEvent`];
//! the client only ever emits [`ClientRequest`]s.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::order::{NewOrder, OrderUpdate};

pub mod payload;
pub use payload::*;

/// Inbound event names
pub mod names {
    pub const CONNECTED: &str = "connected";
    pub const NEW_ORDER: &str = "new_order";
    pub const ORDER_UPDATED: &str = "order_updated";
    pub const ORDERS_UPDATE: &str = "orders_update";
    pub const ORDER_STATS: &str = "order_stats";
    pub const ERROR: &str = "error";
    /// Outbound snapshot request
    pub const REQUEST_ORDER_UPDATE: &str = "request_order_update";
}

/// Event decode failure
#[derive(Debug, Error)]
pub enum EventError {
    #[error("event `{0}` has no payload")]
    MissingPayload(String),

    #[error("invalid payload for event `{event}`: {source}")]
    InvalidPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

/// 服务端推送事件
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    Connected(ConnectedPayload),
    NewOrder(NewOrder),
    OrderUpdated(OrderUpdate),
    OrdersUpdate(OrdersUpdatePayload),
    OrderStats(OrderStatsPayload),
    Error(ErrorPayload),
    /// Event the admin client does not handle (kitchen, comanda rooms, ...)
    Unknown(String),
}

impl ChannelEvent {
    /// Decode a named event and its first argument
    pub fn decode(name: &str, data: Option<Value>) -> Result<Self, EventError> {
        Ok(match name {
            names::CONNECTED => Self::Connected(parse(name, data)?),
            names::NEW_ORDER => Self::NewOrder(parse(name, data)?),
            names::ORDER_UPDATED => Self::OrderUpdated(parse(name, data)?),
            names::ORDERS_UPDATE => Self::OrdersUpdate(parse(name, data)?),
            names::ORDER_STATS => Self::OrderStats(parse(name, data)?),
            names::ERROR => Self::Error(parse(name, data)?),
            other => Self::Unknown(other.to_string()),
        })
    }

    /// Encode back to `(name, data)`, used by in-process servers and tests
    pub fn encode(&self) -> Result<(String, Value), serde_json::Error> {
        let data = match self {
            Self::Connected(p) => serde_json::to_value(p)?,
            Self::NewOrder(p) => serde_json::to_value(p)?,
            Self::OrderUpdated(p) => serde_json::to_value(p)?,
            Self::OrdersUpdate(p) => serde_json::to_value(p)?,
            Self::OrderStats(p) => serde_json::to_value(p)?,
            Self::Error(p) => serde_json::to_value(p)?,
            Self::Unknown(_) => Value::Null,
        };
        Ok((self.name().to_string(), data))
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Connected(_) => names::CONNECTED,
            Self::NewOrder(_) => names::NEW_ORDER,
            Self::OrderUpdated(_) => names::ORDER_UPDATED,
            Self::OrdersUpdate(_) => names::ORDERS_UPDATE,
            Self::OrderStats(_) => names::ORDER_STATS,
            Self::Error(_) => names::ERROR,
            Self::Unknown(name) => name,
        }
    }
}

fn parse<T: DeserializeOwned>(event: &str, data: Option<Value>) -> Result<T, EventError> {
    let data = data.ok_or_else(|| EventError::MissingPayload(event.to_string()))?;
    serde_json::from_value(data).map_err(|source| EventError::InvalidPayload {
        event: event.to_string(),
        source,
    })
}

/// 客户端请求 (client -> server)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientRequest {
    /// Ask the server for an `orders_update` snapshot
    RequestOrderUpdate,
}

impl ClientRequest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RequestOrderUpdate => names::REQUEST_ORDER_UPDATE,
        }
    }

    /// Event argument, `None` when the event carries no payload
    pub fn payload(&self) -> Option<Value> {
        match self {
            Self::RequestOrderUpdate => None,
        }
    }
}

impl fmt::Display for ClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use serde_json::json;

    #[test]
    fn test_decode_order_stats() {
        let event =
            ChannelEvent::decode("order_stats", Some(json!({"pending_count": 5}))).unwrap();
        match event {
            ChannelEvent::OrderStats(p) => assert_eq!(p.pending(), 5),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_decode_error_event() {
        let event =
            ChannelEvent::decode("error", Some(json!({"message": "Não autorizado"}))).unwrap();
        assert_eq!(
            event,
            ChannelEvent::Error(ErrorPayload {
                message: "Não autorizado".into()
            })
        );
        assert_eq!(event.name(), "error");
        assert!(matches!(
            ChannelEvent::decode("error", Some(json!({"detail": 1}))),
            Err(EventError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_negative_pending_count_clamps_to_zero() {
        let payload = OrderStatsPayload { pending_count: -3 };
        assert_eq!(payload.pending(), 0);
    }

    #[test]
    fn test_decode_order_updated_with_extra_fields() {
        let event = ChannelEvent::decode(
            "order_updated",
            Some(json!({
                "id": 9,
                "status": "Enviado",
                "payment_status": "Pago",
                "estimated_prep_time": 20,
                "estimated_delivery_time": null
            })),
        )
        .unwrap();
        match event {
            ChannelEvent::OrderUpdated(update) => {
                assert_eq!(update.id, 9);
                assert_eq!(update.status, OrderStatus::Shipped);
                assert_eq!(update.estimated_prep_time, Some(20));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_event_is_kept_by_name() {
        let event = ChannelEvent::decode("comanda_item_updated", Some(json!({}))).unwrap();
        assert_eq!(event, ChannelEvent::Unknown("comanda_item_updated".into()));
        assert_eq!(event.name(), "comanda_item_updated");
    }

    #[test]
    fn test_missing_and_invalid_payloads() {
        assert!(matches!(
            ChannelEvent::decode("new_order", None),
            Err(EventError::MissingPayload(name)) if name == "new_order"
        ));
        assert!(matches!(
            ChannelEvent::decode("order_stats", Some(json!({"pending": 1}))),
            Err(EventError::InvalidPayload { .. })
        ));
    }

    #[test]
    fn test_encode_keeps_event_name() {
        let event = ChannelEvent::Connected(ConnectedPayload {
            message: "Conectado ao sistema de pedidos".into(),
        });
        let (name, data) = event.encode().unwrap();
        assert_eq!(name, "connected");
        assert_eq!(ChannelEvent::decode(&name, Some(data)).unwrap(), event);
    }

    #[test]
    fn test_request_order_update_has_no_payload() {
        let request = ClientRequest::RequestOrderUpdate;
        assert_eq!(request.name(), "request_order_update");
        assert!(request.payload().is_none());
    }
}
