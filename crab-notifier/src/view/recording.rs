//! Headless view that records every call
//!
//! Cloning shares the same log, so one copy can be handed to the notifier
//! while another is inspected.

use shared::order::OrderSummary;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{MuteAffordance, OrderCard, OrderView, Toast, ToastId};

/// One recorded view call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewOp {
    Toast(Toast),
    DismissToast(ToastId),
    Card(OrderCard),
    CardBusy { order_id: i64, busy: bool },
    DismissCard(i64),
    PendingCount { count: u32, pulse: bool },
    RenderOrders(Vec<i64>),
    RowStatus { order_id: i64, label: String, class: String, found: bool },
    MuteState(MuteAffordance),
    Navigate(String),
    Reload,
}

#[derive(Debug, Default)]
struct Inner {
    ops: Vec<ViewOp>,
    rows: BTreeSet<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    inner: Arc<Mutex<Inner>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pretend the page already shows these rows
    pub fn with_rows(rows: impl IntoIterator<Item = i64>) -> Self {
        let view = Self::new();
        view.lock().rows.extend(rows);
        view
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Poisoned only by a panicking caller; the log is still usable
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, op: ViewOp) {
        self.lock().ops.push(op);
    }

    pub fn ops(&self) -> Vec<ViewOp> {
        self.lock().ops.clone()
    }

    pub fn clear(&self) {
        self.lock().ops.clear();
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                ViewOp::Toast(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    pub fn cards(&self) -> Vec<OrderCard> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                ViewOp::Card(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn dismissed_cards(&self) -> Vec<i64> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                ViewOp::DismissCard(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    /// Every `(count, pulse)` pushed to the counter
    pub fn counts(&self) -> Vec<(u32, bool)> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                ViewOp::PendingCount { count, pulse } => Some((count, pulse)),
                _ => None,
            })
            .collect()
    }

    pub fn reloads(&self) -> usize {
        self.ops().iter().filter(|op| **op == ViewOp::Reload).count()
    }
}

impl OrderView for RecordingView {
    fn show_toast(&mut self, toast: &Toast) {
        self.push(ViewOp::Toast(toast.clone()));
    }

    fn dismiss_toast(&mut self, id: ToastId) {
        self.push(ViewOp::DismissToast(id));
    }

    fn show_order_card(&mut self, card: &OrderCard) {
        self.push(ViewOp::Card(card.clone()));
    }

    fn set_card_busy(&mut self, order_id: i64, busy: bool) {
        self.push(ViewOp::CardBusy { order_id, busy });
    }

    fn dismiss_card(&mut self, order_id: i64) {
        self.push(ViewOp::DismissCard(order_id));
    }

    fn set_pending_count(&mut self, count: u32, pulse: bool) {
        self.push(ViewOp::PendingCount { count, pulse });
    }

    fn render_orders(&mut self, orders: &[OrderSummary]) {
        let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let mut inner = self.lock();
        inner.rows = ids.iter().copied().collect();
        inner.ops.push(ViewOp::RenderOrders(ids));
    }

    fn set_row_status(&mut self, order_id: i64, label: &str, class: &str) -> bool {
        let mut inner = self.lock();
        let found = inner.rows.contains(&order_id);
        inner.ops.push(ViewOp::RowStatus {
            order_id,
            label: label.to_string(),
            class: class.to_string(),
            found,
        });
        found
    }

    fn set_mute_state(&mut self, affordance: MuteAffordance) {
        self.push(ViewOp::MuteState(affordance));
    }

    fn navigate(&mut self, url: &str) {
        self.push(ViewOp::Navigate(url.to_string()));
    }

    fn reload_page(&mut self) {
        let mut inner = self.lock();
        inner.rows.clear();
        inner.ops.push(ViewOp::Reload);
    }
}
