//! Rendering surface
//!
//! [`OrderView`] is everything the notifier touches on screen: toasts,
//! order cards, the pending counter and badges, the orders table and the
//! mute toggle. Implementations must tolerate calls for things that are
//! no longer (or never were) displayed.

pub mod card;
pub mod console;
pub mod recording;

use shared::order::OrderSummary;

pub use card::{CardField, OrderCard};
pub use console::ConsoleView;
pub use recording::{RecordingView, ViewOp};

pub type ToastId = u64;

/// 提示类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    /// Background colour of the admin theme
    pub fn color(&self) -> &'static str {
        match self {
            Self::Success => "#4CAF50",
            Self::Error => "#f44336",
            Self::Warning => "#ff9800",
            Self::Info => "#2196F3",
        }
    }
}

/// 一行提示
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub kind: ToastKind,
    /// Stays until dismissed explicitly
    pub persistent: bool,
}

/// Icon and tooltip of the mute toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuteAffordance {
    pub muted: bool,
    pub icon: &'static str,
    pub title: &'static str,
}

impl MuteAffordance {
    pub fn for_state(muted: bool) -> Self {
        if muted {
            Self {
                muted,
                icon: "fa fa-bell-slash",
                title: "Ativar notificações sonoras",
            }
        } else {
            Self {
                muted,
                icon: "fa fa-bell",
                title: "Desativar notificações sonoras",
            }
        }
    }
}

/// Screen the notifier renders into
pub trait OrderView: Send + 'static {
    fn show_toast(&mut self, toast: &Toast);

    fn dismiss_toast(&mut self, id: ToastId);

    /// Show a card, replacing any card already shown for the same order
    fn show_order_card(&mut self, card: &OrderCard);

    /// Toggle the quick-accept control between busy and ready
    fn set_card_busy(&mut self, order_id: i64, busy: bool);

    fn dismiss_card(&mut self, order_id: i64);

    /// Counter and every pending badge; badges hide at zero
    fn set_pending_count(&mut self, count: u32, pulse: bool);

    /// Full table render, done once per page load
    fn render_orders(&mut self, orders: &[OrderSummary]);

    /// Patch one row's status badge; `false` when the row is absent
    fn set_row_status(&mut self, order_id: i64, label: &str, class: &str) -> bool;

    fn set_mute_state(&mut self, affordance: MuteAffordance);

    fn navigate(&mut self, url: &str);

    /// Drop everything derived from the current page
    fn reload_page(&mut self);
}
