// crab-notifier/tests/notifier_flow.rs
// 通知客户端集成测试 (内存传输 + 录制视图)

use async_trait::async_trait;
use crab_notifier::client::{
    ACCEPT_FAILED_MESSAGE, ACCEPTED_MESSAGE, CONNECTED_MESSAGE, CONNECTION_LOST_MESSAGE,
    MUTED_MESSAGE, UNMUTED_MESSAGE,
};
use crab_notifier::sound::SoundError;
use crab_notifier::view::{MuteAffordance, ToastKind, ViewOp};
use crab_notifier::{
    AcceptResponse, ClientError, ClientRequest, ClientResult, MemoryServer, MemoryTransport,
    NotificationClient, NotifierConfig, NotifierHandle, OrderApi, OrderStatus, PreferenceStorage,
    RecordingView, SoundPlayer,
};
use shared::message::{ConnectedPayload, ErrorPayload, OrderStatsPayload, OrdersUpdatePayload};
use shared::{ChannelEvent, NewOrder, OrderSummary, OrderUpdate};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Clone, Default)]
struct CountingSound(Arc<AtomicUsize>);

impl SoundPlayer for CountingSound {
    fn play(&self) -> Result<(), SoundError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Answers accepts from a script, one entry per call
#[derive(Clone, Default)]
struct ScriptedApi {
    replies: Arc<Mutex<VecDeque<ClientResult<AcceptResponse>>>>,
    calls: Arc<Mutex<Vec<i64>>>,
}

impl ScriptedApi {
    fn reply(&self, reply: ClientResult<AcceptResponse>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl OrderApi for ScriptedApi {
    async fn accept_order(&self, order_id: i64) -> ClientResult<AcceptResponse> {
        self.calls.lock().unwrap().push(order_id);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::InvalidResponse("no scripted reply".into())))
    }
}

struct Harness {
    handle: NotifierHandle,
    server: MemoryServer,
    view: RecordingView,
    rings: Arc<AtomicUsize>,
    api: ScriptedApi,
    dir: TempDir,
}

impl Harness {
    fn start(page: &str, muted: bool) -> Self {
        Self::start_with_view(page, muted, RecordingView::new())
    }

    fn start_with_view(page: &str, muted: bool, view: RecordingView) -> Self {
        let dir = TempDir::new().unwrap();
        PreferenceStorage::new(dir.path()).save_muted(muted).unwrap();

        let config = NotifierConfig::new("http://loja.test")
            .with_page_path(page)
            .with_work_dir(dir.path());
        let (transport, server) = MemoryTransport::pair();
        let sound = CountingSound::default();
        let rings = sound.0.clone();
        let api = ScriptedApi::default();

        let handle = NotificationClient::new(config, transport, view.clone(), sound, api.clone())
            .start()
            .unwrap();

        Self {
            handle,
            server,
            view,
            rings,
            api,
            dir,
        }
    }

    fn rings(&self) -> usize {
        self.rings.load(Ordering::SeqCst)
    }

    fn muted_on_disk(&self) -> bool {
        PreferenceStorage::new(self.dir.path()).load_muted()
    }

    /// Connect and forget the requests that connecting triggers
    async fn connect(&mut self) {
        self.server.connect();
        settle().await;
        self.server.drain_requests();
    }
}

/// Let the loop drain everything queued; time is paused so this only
/// advances the clock by a millisecond.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

fn order(id: i64) -> NewOrder {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "customer_name": "Maria Silva",
        "customer_phone": "(11) 98765-4321",
        "total": 57.9,
        "delivery_type": "delivery",
        "items_count": 3,
        "status": "Pendente"
    }))
    .unwrap()
}

fn summary(id: i64, status: &str) -> OrderSummary {
    OrderSummary {
        id,
        status: OrderStatus::from_wire(status),
        customer_name: None,
        total: None,
    }
}

// ========== Counter ==========

#[tokio::test(start_paused = true)]
async fn test_order_stats_growth_pulses() {
    let h = Harness::start("/admin/pedidos", false);

    h.server
        .emit(ChannelEvent::OrderStats(OrderStatsPayload { pending_count: 2 }));
    h.server
        .emit(ChannelEvent::OrderStats(OrderStatsPayload { pending_count: 5 }));
    settle().await;

    assert_eq!(h.view.counts(), vec![(2, false), (5, true)]);
}

#[tokio::test(start_paused = true)]
async fn test_orders_update_counts_pending() {
    let h = Harness::start("/admin/pedidos", false);

    h.server.emit(ChannelEvent::OrdersUpdate(OrdersUpdatePayload {
        orders: vec![
            summary(1, "Pendente"),
            summary(2, "Confirmado"),
            summary(3, "Entregue"),
        ],
    }));
    settle().await;

    assert_eq!(h.view.counts(), vec![(1, false)]);
    assert!(h.view.ops().contains(&ViewOp::RenderOrders(vec![1, 2, 3])));
}

#[tokio::test(start_paused = true)]
async fn test_server_error_shows_one_error_toast() {
    let mut h = Harness::start("/admin", false);
    h.connect().await;
    h.view.clear();

    h.server.emit(ChannelEvent::Error(ErrorPayload {
        message: "Não autorizado".into(),
    }));
    settle().await;

    let toasts = h.view.toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].message, "Não autorizado");
    assert_eq!(toasts[0].kind, ToastKind::Error);
    assert!(!toasts[0].persistent);
    assert!(h.server.drain_requests().is_empty());
}

// ========== New orders ==========

#[tokio::test(start_paused = true)]
async fn test_new_order_shows_card_rings_and_refreshes() {
    let mut h = Harness::start("/admin", false);
    h.connect().await;

    h.server.emit(ChannelEvent::NewOrder(order(42)));
    settle().await;

    let cards = h.view.cards();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].title, "Novo Pedido #42!");
    assert_eq!(cards[0].field("Total"), Some("R$ 57.90"));
    assert_eq!(cards[0].details_url, "http://loja.test/admin/pedidos/42");
    assert_eq!(h.rings(), 1);
    assert_eq!(h.server.drain_requests(), vec![ClientRequest::RequestOrderUpdate]);
}

#[tokio::test(start_paused = true)]
async fn test_muted_new_order_is_silent() {
    let h = Harness::start("/admin", true);

    h.server.emit(ChannelEvent::NewOrder(order(1)));
    h.server.emit(ChannelEvent::NewOrder(order(2)));
    settle().await;

    assert_eq!(h.view.cards().len(), 2);
    assert_eq!(h.rings(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_card_dismisses_itself_after_ten_seconds() {
    let h = Harness::start("/admin", false);

    h.server.emit(ChannelEvent::NewOrder(order(7)));
    settle().await;
    tokio::time::sleep(Duration::from_secs(4)).await;
    h.server.emit(ChannelEvent::NewOrder(order(8)));
    settle().await;

    tokio::time::sleep(Duration::from_millis(5_500)).await;
    assert!(h.view.dismissed_cards().is_empty());

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.view.dismissed_cards(), vec![7]);

    tokio::time::sleep(Duration::from_secs(4)).await;
    assert_eq!(h.view.dismissed_cards(), vec![7, 8]);
}

#[tokio::test(start_paused = true)]
async fn test_manual_dismiss() {
    let h = Harness::start("/admin", false);

    h.server.emit(ChannelEvent::NewOrder(order(3)));
    settle().await;
    h.handle.dismiss(3).unwrap();
    settle().await;
    assert_eq!(h.view.dismissed_cards(), vec![3]);

    // The cancelled timer never fires a second dismiss
    tokio::time::sleep(Duration::from_secs(15)).await;
    assert_eq!(h.view.dismissed_cards(), vec![3]);
}

// ========== Quick accept ==========

#[tokio::test(start_paused = true)]
async fn test_quick_accept_success() {
    let mut h = Harness::start("/admin", false);
    h.connect().await;
    h.server.emit(ChannelEvent::NewOrder(order(11)));
    settle().await;
    h.server.drain_requests();
    h.view.clear();

    h.api.reply(Ok(AcceptResponse {
        success: true,
        message: Some("Pedido aceito!".into()),
        status: Some(OrderStatus::Confirmed),
    }));
    h.handle.accept(11).unwrap();
    settle().await;

    assert_eq!(h.api.calls(), vec![11]);
    let toasts = h.view.toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].message, ACCEPTED_MESSAGE);
    assert_eq!(toasts[0].kind, ToastKind::Success);
    assert_eq!(h.view.dismissed_cards(), vec![11]);
    assert_eq!(h.server.drain_requests(), vec![ClientRequest::RequestOrderUpdate]);
    assert!(
        h.view
            .ops()
            .contains(&ViewOp::CardBusy { order_id: 11, busy: true })
    );
}

#[tokio::test(start_paused = true)]
async fn test_quick_accept_network_failure() {
    let mut h = Harness::start("/admin", false);
    h.connect().await;
    h.server.emit(ChannelEvent::NewOrder(order(12)));
    settle().await;
    h.server.drain_requests();
    h.view.clear();

    h.api.reply(Err(ClientError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "connection refused",
    ))));
    h.handle.accept(12).unwrap();
    settle().await;

    let toasts = h.view.toasts();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].message, ACCEPT_FAILED_MESSAGE);
    assert_eq!(toasts[0].kind, ToastKind::Error);
    assert_eq!(
        h.view.ops().last(),
        Some(&ViewOp::CardBusy {
            order_id: 12,
            busy: false
        })
    );
    assert!(h.view.dismissed_cards().is_empty());
    assert!(h.server.drain_requests().is_empty());

    // Control is usable again: a second click issues a second request
    h.api.reply(Ok(AcceptResponse {
        success: false,
        message: Some("Pedido não está pendente".into()),
        status: None,
    }));
    h.handle.accept(12).unwrap();
    settle().await;
    assert_eq!(h.api.calls(), vec![12, 12]);
    assert_eq!(
        h.view.toasts().last().map(|t| t.message.as_str()),
        Some("Pedido não está pendente")
    );
}

#[tokio::test(start_paused = true)]
async fn test_double_click_sends_one_request() {
    let h = Harness::start("/admin", false);
    h.server.emit(ChannelEvent::NewOrder(order(13)));
    settle().await;

    h.api.reply(Ok(AcceptResponse {
        success: true,
        ..Default::default()
    }));
    h.handle.accept(13).unwrap();
    h.handle.accept(13).unwrap();
    settle().await;

    assert_eq!(h.api.calls(), vec![13]);
}

// ========== Preference ==========

#[tokio::test(start_paused = true)]
async fn test_mute_toggle_parity() {
    for initial in [false, true] {
        for toggles in 0..5usize {
            let h = Harness::start("/admin", initial);
            for _ in 0..toggles {
                h.handle.toggle_mute().unwrap();
            }
            settle().await;

            assert_eq!(
                h.muted_on_disk(),
                initial ^ (toggles % 2 == 1),
                "initial={initial} toggles={toggles}"
            );
        }
    }
}

#[tokio::test(start_paused = true)]
async fn test_toggle_feedback() {
    let h = Harness::start("/admin", false);

    h.handle.toggle_mute().unwrap();
    settle().await;
    assert_eq!(h.rings(), 0);
    assert_eq!(h.view.toasts()[0].message, MUTED_MESSAGE);
    assert_eq!(h.view.toasts()[0].kind, ToastKind::Info);

    h.handle.toggle_mute().unwrap();
    settle().await;
    assert_eq!(h.rings(), 1, "unmuting plays a sample");
    assert_eq!(h.view.toasts()[1].message, UNMUTED_MESSAGE);

    let states: Vec<_> = h
        .view
        .ops()
        .into_iter()
        .filter_map(|op| match op {
            ViewOp::MuteState(state) => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(
        states,
        vec![
            MuteAffordance::for_state(false),
            MuteAffordance::for_state(true),
            MuteAffordance::for_state(false),
        ]
    );
}

// ========== Connection ==========

#[tokio::test(start_paused = true)]
async fn test_connection_toasts() {
    let h = Harness::start("/admin", false);

    h.server.connect();
    h.server.emit(ChannelEvent::Connected(ConnectedPayload {
        message: "Conectado ao sistema de notificações".into(),
    }));
    settle().await;
    let greeting = h.view.toasts()[0].clone();
    assert_eq!(greeting.message, CONNECTED_MESSAGE);
    assert!(!greeting.persistent);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(h.view.ops().contains(&ViewOp::DismissToast(greeting.id)));

    h.server.disconnect();
    settle().await;
    let warning = h.view.toasts()[1].clone();
    assert_eq!(warning.message, CONNECTION_LOST_MESSAGE);
    assert_eq!(warning.kind, ToastKind::Warning);
    assert!(warning.persistent);

    tokio::time::sleep(Duration::from_secs(20)).await;
    assert!(!h.view.ops().contains(&ViewOp::DismissToast(warning.id)));

    h.server.connect();
    settle().await;
    assert!(h.view.ops().contains(&ViewOp::DismissToast(warning.id)));
}

#[tokio::test(start_paused = true)]
async fn test_polls_while_connected() {
    let mut h = Harness::start("/admin", false);
    assert!(h.server.drain_requests().is_empty());

    h.server.connect();
    settle().await;
    assert_eq!(h.server.drain_requests(), vec![ClientRequest::RequestOrderUpdate]);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(h.server.drain_requests(), vec![ClientRequest::RequestOrderUpdate]);

    h.server.disconnect();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert!(h.server.drain_requests().is_empty());
}

// ========== Status updates ==========

#[tokio::test(start_paused = true)]
async fn test_order_updated_patches_row_and_reloads_orders_page() {
    let mut h = Harness::start_with_view("/admin/pedidos", false, RecordingView::with_rows([5]));
    h.connect().await;
    h.server
        .emit(ChannelEvent::OrderStats(OrderStatsPayload { pending_count: 2 }));
    h.server.emit(ChannelEvent::NewOrder(order(9)));
    settle().await;
    h.server.drain_requests();

    let update = |id| {
        ChannelEvent::OrderUpdated(OrderUpdate {
            id,
            status: OrderStatus::Shipped,
            payment_status: None,
            estimated_prep_time: None,
            estimated_delivery_time: None,
        })
    };
    h.server.emit(update(5));
    h.server.emit(update(404));
    settle().await;

    assert!(h.view.ops().contains(&ViewOp::RowStatus {
        order_id: 5,
        label: "Enviado".into(),
        class: "badge badge-info".into(),
        found: true,
    }));
    assert!(h.view.ops().contains(&ViewOp::RowStatus {
        order_id: 404,
        label: "Enviado".into(),
        class: "badge badge-info".into(),
        found: false,
    }));

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    assert_eq!(h.view.reloads(), 0);

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(h.view.reloads(), 1, "two updates, one reload");
    assert_eq!(h.server.drain_requests(), vec![ClientRequest::RequestOrderUpdate]);

    // The reload took the card with it
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(h.view.dismissed_cards().is_empty());

    // Counter history restarts with the page, so growth from 2 is no pulse
    h.server
        .emit(ChannelEvent::OrderStats(OrderStatsPayload { pending_count: 4 }));
    settle().await;
    assert_eq!(h.view.counts(), vec![(2, false), (4, false)]);
}

#[tokio::test(start_paused = true)]
async fn test_order_updated_elsewhere_does_not_reload() {
    let h = Harness::start("/admin/cardapio", false);

    h.server.emit(ChannelEvent::OrderUpdated(OrderUpdate {
        id: 1,
        status: OrderStatus::Cancelled,
        payment_status: None,
        estimated_prep_time: None,
        estimated_delivery_time: None,
    }));
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(h.view.reloads(), 0);
}

// ========== Lifecycle ==========

#[tokio::test(start_paused = true)]
async fn test_open_details_navigates() {
    let h = Harness::start("/admin", false);

    h.handle.open_details(21).unwrap();
    settle().await;

    assert!(
        h.view
            .ops()
            .contains(&ViewOp::Navigate("http://loja.test/admin/pedidos/21".into()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_stop() {
    let Harness {
        handle,
        server,
        view,
        ..
    } = Harness::start("/admin", false);
    settle().await;
    assert!(handle.is_running());

    handle.stop().await;

    // Nobody is listening any more
    server.emit(ChannelEvent::NewOrder(order(1)));
    settle().await;
    assert!(view.cards().is_empty());
}

#[tokio::test]
async fn test_refuses_storefront_page() {
    let dir = TempDir::new().unwrap();
    let config = NotifierConfig::new("http://loja.test")
        .with_page_path("/cardapio")
        .with_work_dir(dir.path());
    let (transport, _server) = MemoryTransport::pair();

    let result = NotificationClient::new(
        config,
        transport,
        RecordingView::new(),
        CountingSound::default(),
        ScriptedApi::default(),
    )
    .start();

    assert!(matches!(result, Err(ClientError::Config(_))));
}
