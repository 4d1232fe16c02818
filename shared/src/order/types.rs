//! Order payloads pushed to the admin channel

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::OrderStatus;

/// 配送方式
///
/// Only `delivery` is meaningful to the server; every other value is
/// treated as counter pickup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    Delivery,
    #[default]
    #[serde(other)]
    Pickup,
}

impl DeliveryType {
    /// Label shown on the notification card
    pub fn label(&self) -> &'static str {
        match self {
            Self::Delivery => "Entrega",
            Self::Pickup => "Retirada",
        }
    }
}

impl fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivery => write!(f, "delivery"),
            Self::Pickup => write!(f, "pickup"),
        }
    }
}

/// Order line included in `new_order`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    /// Unit price in currency unit
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

/// 新订单 (`new_order` 事件)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub id: i64,
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    /// Order total in currency unit
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(default)]
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub items_count: u32,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    /// Server formatted, `dd/mm/YYYY HH:MM`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<OrderItem>,
}

/// 订单状态变更 (`order_updated` 事件)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
    pub id: i64,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_status: Option<String>,
    /// Minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_prep_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_delivery_time: Option<String>,
}

/// One row of the `orders_update` snapshot
///
/// The server sends the latest 50 orders with more fields than the
/// client needs; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: i64,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub total: Option<Decimal>,
}

/// Count the orders still waiting for acceptance
pub fn count_pending(orders: &[OrderSummary]) -> u32 {
    orders.iter().filter(|o| o.status.is_pending()).count() as u32
}
