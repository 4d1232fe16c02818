//! Terminal rendering of the order panel

use crossterm::style::{Color, Stylize};
use shared::order::OrderSummary;
use std::collections::{BTreeMap, HashSet};
use std::io::Write;

use super::card::{ACCEPT_BUSY_LABEL, ACCEPT_LABEL, DETAILS_LABEL};
use super::{MuteAffordance, OrderCard, OrderView, Toast, ToastId};

/// Line-oriented view for an operator terminal
///
/// Keeps just enough state to answer "is this row/card on screen".
pub struct ConsoleView<W: Write + Send + 'static> {
    out: W,
    cards: BTreeMap<i64, OrderCard>,
    busy: HashSet<i64>,
    rows: BTreeMap<i64, String>,
    toasts: HashSet<ToastId>,
}

impl ConsoleView<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send + 'static> ConsoleView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            cards: BTreeMap::new(),
            busy: HashSet::new(),
            rows: BTreeMap::new(),
            toasts: HashSet::new(),
        }
    }

    /// Consume the view and return the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: impl std::fmt::Display) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            tracing::debug!("Console write failed: {e}");
        }
    }

    fn draw_card(&mut self, card: &OrderCard) {
        let busy = self.busy.contains(&card.order_id);
        let accept = if busy { ACCEPT_BUSY_LABEL } else { ACCEPT_LABEL };

        self.line(format!("╭─ 🔔 {}", card.title).with(Color::Magenta).bold());
        for field in &card.fields {
            self.line(format!("│ {}: {}", field.label, field.value));
        }
        self.line(format!("│ [{DETAILS_LABEL}] {}", card.details_url));
        self.line(format!("╰─ [{accept}] accept {}", card.order_id).with(Color::Magenta));
    }
}

/// `#rrggbb` to a terminal colour
fn hex_color(hex: &str) -> Color {
    let channel = |range: std::ops::Range<usize>| {
        hex.get(range)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(0xff)
    };
    Color::Rgb {
        r: channel(1..3),
        g: channel(3..5),
        b: channel(5..7),
    }
}

impl<W: Write + Send + 'static> OrderView for ConsoleView<W> {
    fn show_toast(&mut self, toast: &Toast) {
        self.toasts.insert(toast.id);
        let text = format!(" {} ", toast.message).on(hex_color(toast.kind.color()));
        self.line(text.with(Color::White).bold());
    }

    fn dismiss_toast(&mut self, id: ToastId) {
        // Printed lines stay in the scrollback
        self.toasts.remove(&id);
    }

    fn show_order_card(&mut self, card: &OrderCard) {
        self.busy.remove(&card.order_id);
        self.cards.insert(card.order_id, card.clone());
        self.draw_card(card);
    }

    fn set_card_busy(&mut self, order_id: i64, busy: bool) {
        if !self.cards.contains_key(&order_id) {
            return;
        }
        if busy {
            self.busy.insert(order_id);
            self.line(format!("   #{order_id} {ACCEPT_BUSY_LABEL}").dim());
        } else {
            self.busy.remove(&order_id);
            self.line(format!("   #{order_id} [{ACCEPT_LABEL}] accept {order_id}").dim());
        }
    }

    fn dismiss_card(&mut self, order_id: i64) {
        if self.cards.remove(&order_id).is_some() {
            self.busy.remove(&order_id);
            self.line(format!("   Pedido #{order_id} fechado").dim());
        }
    }

    fn set_pending_count(&mut self, count: u32, pulse: bool) {
        let text = format!("Pendentes: {count}");
        if pulse {
            self.line(format!("» {text} «").with(Color::Yellow).bold());
        } else if count == 0 {
            self.line(text.dim());
        } else {
            self.line(text.with(Color::Yellow));
        }
    }

    fn render_orders(&mut self, orders: &[OrderSummary]) {
        self.rows = orders
            .iter()
            .map(|o| (o.id, o.status.as_wire().to_string()))
            .collect();

        self.line("Pedidos".bold());
        for order in orders {
            let name = order.customer_name.as_deref().unwrap_or("-");
            self.line(format!("  #{:<6} {:<12} {}", order.id, order.status, name));
        }
    }

    fn set_row_status(&mut self, order_id: i64, label: &str, class: &str) -> bool {
        let Some(status) = self.rows.get_mut(&order_id) else {
            return false;
        };
        *status = label.to_string();
        let color = match class {
            "badge badge-warning" => Color::Yellow,
            "badge badge-success" => Color::Green,
            "badge badge-info" => Color::Cyan,
            "badge badge-danger" => Color::Red,
            _ => Color::Grey,
        };
        self.line(format!("  #{order_id:<6} {}", label.with(color)));
        true
    }

    fn set_mute_state(&mut self, affordance: MuteAffordance) {
        let icon = if affordance.muted { "🔕" } else { "🔔" };
        self.line(format!("{icon} {}", affordance.title).dim());
    }

    fn navigate(&mut self, url: &str) {
        self.line(format!("→ {url}").underlined());
    }

    fn reload_page(&mut self) {
        self.cards.clear();
        self.busy.clear();
        self.rows.clear();
        self.toasts.clear();
        self.line("── recarregando ──".dim());
    }
}
