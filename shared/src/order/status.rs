use serde::{Deserialize, Serialize};
use std::fmt;

/// 订单状态
///
/// The admin server sends statuses as Portuguese labels (`Pendente`,
/// `Confirmado`, ...). Anything outside the closed set is kept verbatim in
/// [`OrderStatus::Other`] so it can still be displayed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OrderStatus {
    /// 待处理
    #[default]
    Pending,
    /// 已确认
    Confirmed,
    /// 已发货
    Shipped,
    /// 已送达
    Delivered,
    /// 已取消
    Cancelled,
    /// Unknown label
    Other(String),
}

/// Badge class used for statuses outside the closed set
pub const FALLBACK_BADGE_CLASS: &str = "badge badge-secondary";

impl OrderStatus {
    /// Parse a wire label
    pub fn from_wire(label: &str) -> Self {
        match label {
            "Pendente" => Self::Pending,
            "Confirmado" => Self::Confirmed,
            "Enviado" => Self::Shipped,
            "Entregue" => Self::Delivered,
            "Cancelado" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }

    /// Wire label, also used as badge text
    pub fn as_wire(&self) -> &str {
        match self {
            Self::Pending => "Pendente",
            Self::Confirmed => "Confirmado",
            Self::Shipped => "Enviado",
            Self::Delivered => "Entregue",
            Self::Cancelled => "Cancelado",
            Self::Other(label) => label,
        }
    }

    /// CSS-style badge class for the status cell
    pub fn badge_class(&self) -> &'static str {
        match self {
            Self::Pending => "badge badge-warning",
            Self::Confirmed => "badge badge-success",
            Self::Shipped => "badge badge-info",
            Self::Delivered => "badge badge-success",
            Self::Cancelled => "badge badge-danger",
            Self::Other(_) => FALLBACK_BADGE_CLASS,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl From<String> for OrderStatus {
    fn from(label: String) -> Self {
        Self::from_wire(&label)
    }
}

impl From<OrderStatus> for String {
    fn from(status: OrderStatus) -> Self {
        status.as_wire().to_string()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}
