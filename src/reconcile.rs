//! Reconcile cycles for the dashboard and orders views.
//!
//! A cycle fetches a full snapshot, then applies it to the document inside a
//! single lock scope. Cycles may overlap; each one takes a ticket before it
//! fetches and a response is only applied if no newer ticket has been
//! applied already.

use crate::api::DashboardApi;
use crate::charts::{CanvasBackend, ChartBackend, ChartManager, ChartView};
use crate::dom::{replace_rows, set_text, update_field, Document, SharedDocument};
use crate::errors::ClientError;
use crate::models::{ChartPayload, OrderFilter, OrdersPage, StatSnapshot, TimeRange};
use crate::poller::{start_polling, PollHandle};
use crate::ui::{format_amount, render_order_rows, render_recent_orders};
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::sync::Mutex;
use tracing::debug;

pub const RECENT_ORDERS_BODY: &str = "recentOrdersBody";
pub const ORDERS_TABLE_BODY: &str = "ordersTableBody";
pub const ORDER_COUNT_ALL: &str = "orderCountAll";
pub const PAGE_INFO: &str = "pageInfo";

/// Ids of every element the dashboard view writes to.
pub const DASHBOARD_ELEMENTS: [&str; 11] = [
    "statTotalRevenue",
    "statTotalOrders",
    "statActiveOrders",
    "statTotalUsers",
    "statTodaysRevenue",
    "statTodaysOrders",
    "statNewUsers",
    RECENT_ORDERS_BODY,
    "revenueChart",
    "categoryChart",
    "topSellersChart",
];

/// Ids of every element the orders view writes to.
pub const ORDERS_ELEMENTS: [&str; 8] = [
    "tabCountAll",
    "tabCountPending",
    "tabCountPreparing",
    "tabCountReady",
    "tabCountCompleted",
    ORDER_COUNT_ALL,
    ORDERS_TABLE_BODY,
    PAGE_INFO,
];

/// Orders snapshots by the moment their fetch started.
#[derive(Debug, Default)]
pub struct Sequencer {
    issued: AtomicU64,
    applied: AtomicU64,
}

impl Sequencer {
    pub fn ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Accepts `ticket` if it is newer than anything applied so far.
    pub fn admit(&self, ticket: u64) -> bool {
        self.applied.fetch_max(ticket, Ordering::SeqCst) < ticket
    }
}

/// Writes the scalar stats and the recent-orders table. Returns how many
/// scalar fields actually changed.
pub fn apply_stats(doc: &mut Document, stats: &StatSnapshot) -> usize {
    let fields = [
        ("statTotalRevenue", format_amount(stats.total_revenue)),
        ("statTotalOrders", stats.total_orders.to_string()),
        ("statActiveOrders", stats.active_orders.to_string()),
        ("statTotalUsers", stats.total_users.to_string()),
        (
            "statTodaysRevenue",
            format!("{} today", format_amount(stats.todays_revenue)),
        ),
        ("statTodaysOrders", format!("{} today", stats.todays_orders)),
        ("statNewUsers", format!("+{} this week", stats.new_users)),
    ];
    let changed = fields
        .iter()
        .filter(|(id, text)| update_field(doc, id, text))
        .count();

    if let Some(body) = doc.get_mut(RECENT_ORDERS_BODY) {
        body.set_fragment(render_recent_orders(&stats.recent_orders));
    }
    changed
}

/// Writes tab counts, pagination and the order rows, keeping ticked rows.
pub fn apply_orders(doc: &mut Document, page: &OrdersPage) {
    let counts = page.counts;
    for (id, count) in [
        ("tabCountAll", counts.all),
        ("tabCountPending", counts.pending),
        ("tabCountPreparing", counts.preparing),
        ("tabCountReady", counts.ready),
        ("tabCountCompleted", counts.completed),
    ] {
        set_text(doc, id, &format!("({count})"));
    }
    set_text(doc, ORDER_COUNT_ALL, &counts.all.to_string());
    replace_rows(doc, ORDERS_TABLE_BODY, render_order_rows(&page.orders));
    set_text(
        doc,
        PAGE_INFO,
        &format!("Page {} of {}", page.page, page.num_pages),
    );
}

pub struct DashboardView<B> {
    api: Arc<dyn DashboardApi>,
    doc: SharedDocument,
    charts: Mutex<ChartManager<B>>,
    range: TimeRange,
    stats_seq: Sequencer,
    charts_seq: Sequencer,
}

impl<B> DashboardView<B>
where
    B: ChartBackend + Send + 'static,
{
    pub fn new(api: Arc<dyn DashboardApi>, doc: SharedDocument, backend: B, range: TimeRange) -> Self {
        Self {
            api,
            doc,
            charts: Mutex::new(ChartManager::new(backend)),
            range,
            stats_seq: Sequencer::default(),
            charts_seq: Sequencer::default(),
        }
    }

    pub fn document(&self) -> &SharedDocument {
        &self.doc
    }

    pub fn charts(&self) -> &Mutex<ChartManager<B>> {
        &self.charts
    }

    pub async fn chart_views(&self) -> Vec<ChartView> {
        self.charts.lock().await.views()
    }

    pub async fn refresh_stats(&self) -> Result<(), ClientError> {
        let ticket = self.stats_seq.ticket();
        let stats = self.api.stats(self.range).await?;
        self.commit_stats(ticket, &stats).await;
        Ok(())
    }

    pub async fn refresh_charts(&self) -> Result<(), ClientError> {
        let ticket = self.charts_seq.ticket();
        let payload = self.api.charts(self.range).await?;
        self.commit_charts(ticket, &payload).await
    }

    /// One dashboard cycle: stats and charts fetched side by side.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let (stats, charts) = tokio::join!(self.refresh_stats(), self.refresh_charts());
        stats.and(charts)
    }

    async fn commit_stats(&self, ticket: u64, stats: &StatSnapshot) {
        let mut doc = self.doc.lock().await;
        if !self.stats_seq.admit(ticket) {
            debug!(ticket, "discarding stale stats snapshot");
            return;
        }
        let changed = apply_stats(&mut doc, stats);
        debug!(ticket, changed, "stats applied");
    }

    async fn commit_charts(&self, ticket: u64, payload: &ChartPayload) -> Result<(), ClientError> {
        let mut doc = self.doc.lock().await;
        if !self.charts_seq.admit(ticket) {
            debug!(ticket, "discarding stale chart payload");
            return Ok(());
        }
        let mut charts = self.charts.lock().await;
        charts.apply_payload(&mut doc, payload)
    }

    pub fn start(self: &Arc<Self>, interval: Duration) -> PollHandle {
        let view = Arc::clone(self);
        start_polling("dashboard", interval, move || {
            let view = Arc::clone(&view);
            async move { view.refresh().await }
        })
    }
}

impl DashboardView<CanvasBackend> {
    /// Releases every live chart once polling has stopped.
    pub async fn teardown(&self) {
        let mut charts = self.charts.lock().await;
        charts.teardown();
        debug!(live = charts.backend().live_count(), "dashboard charts released");
    }
}

pub struct OrdersView {
    api: Arc<dyn DashboardApi>,
    doc: SharedDocument,
    filter: OrderFilter,
    seq: Sequencer,
}

impl OrdersView {
    pub fn new(api: Arc<dyn DashboardApi>, doc: SharedDocument, filter: OrderFilter) -> Self {
        Self {
            api,
            doc,
            filter,
            seq: Sequencer::default(),
        }
    }

    pub fn filter(&self) -> &OrderFilter {
        &self.filter
    }

    pub async fn refresh(&self) -> Result<(), ClientError> {
        let ticket = self.seq.ticket();
        let page = self.api.orders(&self.filter).await?;
        self.commit(ticket, &page).await;
        Ok(())
    }

    async fn commit(&self, ticket: u64, page: &OrdersPage) {
        let mut doc = self.doc.lock().await;
        if !self.seq.admit(ticket) {
            debug!(ticket, "discarding stale orders page");
            return;
        }
        apply_orders(&mut doc, page);
    }

    pub fn start(self: &Arc<Self>, interval: Duration) -> PollHandle {
        let view = Arc::clone(self);
        start_polling("orders", interval, move || {
            let view = Arc::clone(&view);
            async move { view.refresh().await }
        })
    }
}
