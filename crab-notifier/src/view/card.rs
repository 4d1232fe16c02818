//! Notification card template
//!
//! Turns a `new_order` payload into display strings; the view decides how
//! to draw them.

use rust_decimal::{Decimal, RoundingStrategy};
use shared::order::NewOrder;

pub const DETAILS_LABEL: &str = "Ver Detalhes";
pub const ACCEPT_LABEL: &str = "Aceitar";
pub const ACCEPT_BUSY_LABEL: &str = "Aceitando...";
const MISSING_PHONE: &str = "Não informado";

/// One `label: value` line of the card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardField {
    pub label: &'static str,
    pub value: String,
}

/// 新订单通知卡片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderCard {
    pub order_id: i64,
    pub title: String,
    pub fields: Vec<CardField>,
    pub details_url: String,
}

impl OrderCard {
    pub fn from_order(order: &NewOrder, details_url: String) -> Self {
        let mut fields = vec![
            field("Cliente", order.customer_name.clone()),
            field(
                "Telefone",
                order
                    .customer_phone
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .unwrap_or(MISSING_PHONE)
                    .to_string(),
            ),
            field("Total", format_currency(order.total)),
            field("Tipo", order.delivery_type.label().to_string()),
            field("Itens", order.items_count.to_string()),
        ];
        if let Some(address) = order.delivery_address.as_deref().filter(|a| !a.is_empty()) {
            fields.push(field("Endereço", address.to_string()));
        }

        Self {
            order_id: order.id,
            title: format!("Novo Pedido #{}!", order.id),
            fields,
            details_url,
        }
    }

    /// Value of a field by label
    pub fn field(&self, label: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }
}

fn field(label: &'static str, value: String) -> CardField {
    CardField { label, value }
}

/// `R$` with two decimals, half away from zero
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("R$ {rounded:.2}")
}
