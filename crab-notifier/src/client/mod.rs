//! Notification client
//!
//! One task owns every piece of client state and reacts to four sources:
//! channel events from the [`Transport`], user actions and accept results
//! from the [`NotifierHandle`], expired timers (card, toast, reload) and the
//! periodic snapshot poll. Nothing is shared, so nothing is locked.

mod handle;

pub use handle::NotifierHandle;

use futures::StreamExt;
use shared::message::{ChannelEvent, ClientRequest};
use shared::order::{NewOrder, OrderStatus, OrderSummary, count_pending};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::time::{DelayQueue, delay_queue};

use crate::config::ORDERS_PAGE;
use crate::http::{AcceptResponse, OrderApi};
use crate::message::{Transport, TransportEvent};
use crate::preference::PreferenceStorage;
use crate::sound::SoundPlayer;
use crate::view::{MuteAffordance, OrderCard, OrderView, Toast, ToastId, ToastKind};
use crate::{ClientError, ClientResult, NotifierConfig};
use handle::Command;

pub const CONNECTED_MESSAGE: &str = "Sistema conectado";
pub const CONNECTION_LOST_MESSAGE: &str = "Conexão perdida. Tentando reconectar...";
pub const ACCEPTED_MESSAGE: &str = "Pedido aceito com sucesso!";
pub const ACCEPT_FAILED_MESSAGE: &str = "Erro ao aceitar pedido";
pub const MUTED_MESSAGE: &str = "Notificações sonoras desativadas";
pub const UNMUTED_MESSAGE: &str = "Notificações sonoras ativadas";

/// 定时任务
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Timer {
    DismissCard(i64),
    DismissToast(ToastId),
    Reload,
}

/// Real-time order notifier for the admin back office
pub struct NotificationClient {
    config: NotifierConfig,
    view: Box<dyn OrderView>,
    sound: Box<dyn SoundPlayer>,
    preferences: PreferenceStorage,
    api: Arc<dyn OrderApi>,
    transport: Box<dyn Transport>,

    muted: bool,
    /// Last count pushed to the counter, 0 after every (re)load
    last_order_count: u32,
    /// Visible cards and their auto-dismiss timer
    cards: HashMap<i64, delay_queue::Key>,
    /// Orders with an accept request in flight
    accepting: HashSet<i64>,
    connection_warning: Option<ToastId>,
    next_toast_id: ToastId,
    /// The next snapshot renders the whole table
    table_stale: bool,
    reload_pending: bool,
    timers: DelayQueue<Timer>,
    commands: Option<mpsc::UnboundedSender<Command>>,
}

impl NotificationClient {
    pub fn new(
        config: NotifierConfig,
        transport: impl Transport,
        view: impl OrderView,
        sound: impl SoundPlayer,
        api: impl OrderApi,
    ) -> Self {
        let preferences = PreferenceStorage::new(&config.work_dir);
        Self {
            config,
            view: Box::new(view),
            sound: Box::new(sound),
            preferences,
            api: Arc::new(api),
            transport: Box::new(transport),
            muted: false,
            last_order_count: 0,
            cards: HashMap::new(),
            accepting: HashSet::new(),
            connection_warning: None,
            next_toast_id: 1,
            table_stale: true,
            reload_pending: false,
            timers: DelayQueue::new(),
            commands: None,
        }
    }

    /// Spawn the event loop
    ///
    /// Refused unless the configured page is under `/admin`; the channel is
    /// only ever opened from the back office.
    pub fn start(mut self) -> ClientResult<NotifierHandle> {
        if !self.config.is_admin_page() {
            return Err(ClientError::Config(format!(
                "page {} is outside the admin area",
                self.config.page_path
            )));
        }
        self.config.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        self.commands = Some(tx.clone());

        let task = tokio::spawn(self.run(rx, shutdown.clone()));
        Ok(NotifierHandle::new(tx, shutdown, task))
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        shutdown: CancellationToken,
    ) {
        tracing::info!(page = %self.config.page_path, "Notification client started");
        self.load_page();

        let period = self.config.poll_interval.max(Duration::from_secs(1));
        let mut poll = tokio::time::interval_at(Instant::now() + period, period);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut channel_open = true;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Notification client shutting down");
                    break;
                }

                event = self.transport.recv(), if channel_open => match event {
                    Some(event) => self.handle_transport_event(event),
                    None => {
                        tracing::warn!("Order channel closed for good");
                        channel_open = false;
                        self.show_connection_warning();
                    }
                },

                Some(command) = commands.recv() => self.handle_command(command),

                Some(expired) = self.timers.next(), if !self.timers.is_empty() => {
                    self.handle_timer(expired.into_inner());
                }

                _ = poll.tick() => self.request_order_update(),
            }
        }

        self.transport.close().await;
        tracing::info!("Notification client stopped");
    }

    /// State a fresh page starts with
    fn load_page(&mut self) {
        self.muted = self.preferences.load_muted();
        self.view.set_mute_state(MuteAffordance::for_state(self.muted));
        self.last_order_count = 0;
        self.table_stale = true;
    }

    fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => {
                tracing::info!("Order channel up");
                if let Some(id) = self.connection_warning.take() {
                    self.view.dismiss_toast(id);
                }
                self.request_order_update();
            }
            TransportEvent::Disconnected { reason } => {
                tracing::warn!(%reason, "Order channel down");
                self.show_connection_warning();
            }
            TransportEvent::Event(event) => self.dispatch(event),
        }
    }

    fn dispatch(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected(payload) => {
                tracing::info!(message = %payload.message, "Server greeting");
                self.show_toast(CONNECTED_MESSAGE, ToastKind::Success);
            }
            ChannelEvent::NewOrder(order) => {
                tracing::info!(order_id = order.id, customer = %order.customer_name, "New order");
                self.show_new_order_notification(&order);
                self.play_notification_sound();
                self.request_order_update();
            }
            ChannelEvent::OrderUpdated(update) => {
                tracing::debug!(order_id = update.id, status = %update.status, "Order updated");
                self.update_order_in_list(update.id, &update.status);
                if self.config.is_orders_page() {
                    self.schedule_reload();
                }
            }
            ChannelEvent::OrdersUpdate(payload) => self.update_orders_list(&payload.orders),
            ChannelEvent::OrderStats(stats) => self.update_pending_counter(stats.pending()),
            ChannelEvent::Error(payload) => {
                tracing::warn!(message = %payload.message, "Server reported an error");
                self.show_toast(&payload.message, ToastKind::Error);
            }
            ChannelEvent::Unknown(name) => tracing::debug!(event = %name, "Ignoring event"),
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Accept(order_id) => self.quick_accept_order(order_id),
            Command::Dismiss(order_id) => self.close_notification(order_id),
            Command::OpenDetails(order_id) => {
                let url = self.details_url(order_id);
                self.view.navigate(&url);
            }
            Command::ToggleMute => self.toggle_notifications(),
            Command::Refresh => self.request_order_update(),
            Command::AcceptFinished { order_id, result } => self.finish_accept(order_id, result),
        }
    }

    fn handle_timer(&mut self, timer: Timer) {
        match timer {
            Timer::DismissCard(order_id) => {
                // The key is spent once it fires
                if self.cards.remove(&order_id).is_some() {
                    tracing::debug!(order_id, "Card timed out");
                    self.view.dismiss_card(order_id);
                }
            }
            Timer::DismissToast(id) => self.view.dismiss_toast(id),
            Timer::Reload => self.reload(),
        }
    }

    // ========== Counter & list ==========

    /// 更新待处理订单计数器
    ///
    /// Pulses only on growth from a non-zero count, so the first update after
    /// a load never animates.
    fn update_pending_counter(&mut self, count: u32) {
        let pulse = count > self.last_order_count && self.last_order_count > 0;
        self.view.set_pending_count(count, pulse);
        self.last_order_count = count;
    }

    fn update_order_in_list(&mut self, order_id: i64, status: &OrderStatus) {
        if !self
            .view
            .set_row_status(order_id, status.as_wire(), status.badge_class())
        {
            tracing::debug!(order_id, "No row for updated order");
        }
    }

    fn update_orders_list(&mut self, orders: &[OrderSummary]) {
        if self.table_stale {
            self.view.render_orders(orders);
            self.table_stale = false;
        }
        self.update_pending_counter(count_pending(orders));
    }

    // ========== Cards ==========

    fn details_url(&self, order_id: i64) -> String {
        self.config.url(&format!("{ORDERS_PAGE}/{order_id}"))
    }

    /// Show (or refresh) the card of an order and (re)arm its timer
    fn show_new_order_notification(&mut self, order: &NewOrder) {
        let card = OrderCard::from_order(order, self.details_url(order.id));
        self.view.show_order_card(&card);
        if self.accepting.contains(&order.id) {
            self.view.set_card_busy(order.id, true);
        }

        let timeout = self.config.card_timeout;
        match self.cards.get(&order.id) {
            Some(key) => self.timers.reset(key, timeout),
            None => {
                let key = self.timers.insert(Timer::DismissCard(order.id), timeout);
                self.cards.insert(order.id, key);
            }
        }
    }

    fn close_notification(&mut self, order_id: i64) {
        match self.cards.remove(&order_id) {
            Some(key) => {
                self.timers.remove(&key);
                self.view.dismiss_card(order_id);
            }
            None => tracing::debug!(order_id, "No card to dismiss"),
        }
    }

    // ========== Quick accept ==========

    fn quick_accept_order(&mut self, order_id: i64) {
        if !self.cards.contains_key(&order_id) {
            tracing::debug!(order_id, "Accept ignored, no card shown");
            return;
        }
        if !self.accepting.insert(order_id) {
            tracing::debug!(order_id, "Accept already in flight");
            return;
        }
        let Some(commands) = self.commands.clone() else {
            return;
        };

        self.view.set_card_busy(order_id, true);
        let api = self.api.clone();
        tokio::spawn(async move {
            let result = api.accept_order(order_id).await;
            let _ = commands.send(Command::AcceptFinished { order_id, result });
        });
    }

    fn finish_accept(&mut self, order_id: i64, result: ClientResult<AcceptResponse>) {
        self.accepting.remove(&order_id);
        match result {
            Ok(response) if response.success => {
                tracing::info!(order_id, "Order accepted");
                self.show_toast(ACCEPTED_MESSAGE, ToastKind::Success);
                self.close_notification(order_id);
                if let Some(status) = &response.status {
                    self.update_order_in_list(order_id, status);
                }
                self.request_order_update();
            }
            Ok(response) => {
                let message = response
                    .message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| ACCEPT_FAILED_MESSAGE.to_string());
                tracing::warn!(order_id, %message, "Accept refused");
                self.show_toast(&message, ToastKind::Error);
                self.view.set_card_busy(order_id, false);
            }
            Err(e) => {
                tracing::error!(order_id, "Accept request failed: {e}");
                self.show_toast(ACCEPT_FAILED_MESSAGE, ToastKind::Error);
                self.view.set_card_busy(order_id, false);
            }
        }
    }

    // ========== Sound & preference ==========

    fn toggle_notifications(&mut self) {
        self.muted = !self.muted;
        if let Err(e) = self.preferences.save_muted(self.muted) {
            tracing::warn!(path = %self.preferences.path().display(), "Failed to save preference: {e}");
        }
        self.view.set_mute_state(MuteAffordance::for_state(self.muted));

        if self.muted {
            self.show_toast(MUTED_MESSAGE, ToastKind::Info);
        } else {
            self.show_toast(UNMUTED_MESSAGE, ToastKind::Success);
            self.ring();
        }
    }

    fn play_notification_sound(&self) {
        if self.muted {
            tracing::debug!("Muted, not ringing");
            return;
        }
        self.ring();
    }

    fn ring(&self) {
        if let Err(e) = self.sound.play() {
            tracing::warn!("Failed to play notification sound: {e}");
        }
    }

    // ========== Channel ==========

    fn request_order_update(&self) {
        if !self.transport.is_connected() {
            tracing::trace!("Offline, skipping order update request");
            return;
        }
        if let Err(e) = self.transport.emit(ClientRequest::RequestOrderUpdate) {
            tracing::debug!("Order update request not sent: {e}");
        }
    }

    fn show_connection_warning(&mut self) {
        if self.connection_warning.is_none() {
            let id = self.push_toast(CONNECTION_LOST_MESSAGE, ToastKind::Warning, true);
            self.connection_warning = Some(id);
        }
    }

    // ========== Toasts ==========

    fn show_toast(&mut self, message: &str, kind: ToastKind) -> ToastId {
        self.push_toast(message, kind, false)
    }

    fn push_toast(&mut self, message: &str, kind: ToastKind, persistent: bool) -> ToastId {
        let id = self.next_toast_id;
        self.next_toast_id += 1;
        self.view.show_toast(&Toast {
            id,
            message: message.to_string(),
            kind,
            persistent,
        });
        if !persistent {
            self.timers
                .insert(Timer::DismissToast(id), self.config.toast_timeout);
        }
        id
    }

    // ========== Reload ==========

    /// Coalesces: one reload per burst of updates
    fn schedule_reload(&mut self) {
        if self.reload_pending {
            return;
        }
        self.reload_pending = true;
        self.timers.insert(Timer::Reload, self.config.reload_delay);
    }

    /// Page reload: the view starts over and so does page-scoped state
    fn reload(&mut self) {
        tracing::debug!("Reloading page");
        self.reload_pending = false;
        self.view.reload_page();

        for (_, key) in self.cards.drain() {
            self.timers.remove(&key);
        }
        self.connection_warning = None;
        self.load_page();

        if self.transport.is_connected() {
            self.request_order_update();
        } else {
            self.show_connection_warning();
        }
    }
}
