//! Chart slots and the registry that owns their live instances.
//!
//! A slot holds at most one live chart. Updates of the same kind are applied
//! in place; anything else tears the old instance down before a new one is
//! created on the canvas.

use crate::dom::{Document, Element};
use crate::errors::ClientError;
use crate::models::{CategoryShare, ChartPayload, TopSeller, TrendPoint};
use crate::ui::{format_amount, NO_SALES_TEXT};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

pub const CATEGORY_COLORS: [&str; 8] = [
    "#fc8019", "#0984e3", "#00b894", "#e17055", "#6c5ce7", "#fdcb6e", "#d63031", "#00cec9",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Slot {
    Trend,
    Category,
    TopSellers,
}

impl Slot {
    pub const ALL: [Slot; 3] = [Slot::Trend, Slot::Category, Slot::TopSellers];

    pub fn canvas_id(self) -> &'static str {
        match self {
            Slot::Trend => "revenueChart",
            Slot::Category => "categoryChart",
            Slot::TopSellers => "topSellersChart",
        }
    }

    pub fn kind(self) -> ChartKind {
        match self {
            Slot::Trend => ChartKind::Line,
            Slot::Category => ChartKind::Doughnut,
            Slot::TopSellers => ChartKind::Bar,
        }
    }

    /// Element shown instead of the canvas while the slot has no data.
    pub fn placeholder_id(self) -> Option<&'static str> {
        match self {
            Slot::TopSellers => Some("topSellersNoData"),
            _ => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Slot::Trend => "Revenue trend",
            Slot::Category => "Sales by category",
            Slot::TopSellers => "Top sellers",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartKind {
    Line,
    Doughnut,
    Bar,
}

impl ChartKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartKind::Line => "line",
            ChartKind::Doughnut => "doughnut",
            ChartKind::Bar => "bar",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Dataset {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub colors: Vec<String>,
    /// Per-point revenue shown in the top-seller tooltip.
    pub revenue: Vec<f64>,
}

impl Dataset {
    pub fn from_trend(points: &[TrendPoint]) -> Self {
        Self {
            labels: points.iter().map(|p| p.label.clone()).collect(),
            values: points.iter().map(|p| p.value).collect(),
            ..Self::default()
        }
    }

    pub fn from_categories(shares: &[CategoryShare]) -> Self {
        Self {
            labels: shares.iter().map(|c| c.name.clone()).collect(),
            values: shares.iter().map(|c| c.value).collect(),
            colors: CATEGORY_COLORS
                .iter()
                .take(shares.len())
                .map(|c| c.to_string())
                .collect(),
            ..Self::default()
        }
    }

    pub fn from_top_sellers(sellers: &[TopSeller]) -> Self {
        Self {
            labels: sellers.iter().map(|s| s.label.clone()).collect(),
            values: sellers.iter().map(|s| s.value).collect(),
            revenue: sellers.iter().map(|s| s.revenue).collect(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Tooltip lines for one bar of the top-sellers chart.
    pub fn tooltip(&self, index: usize) -> Vec<String> {
        let units = self.values.get(index).copied().unwrap_or_default();
        let revenue = self.revenue.get(index).copied().unwrap_or_default();
        vec![
            format!("Units Sold: {units}"),
            format!("Total Revenue: {}", format_amount(revenue)),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ChartHandle(u64);

/// Rendering surface for charts. Implementations must refuse a second live
/// chart on a canvas that already has one.
pub trait ChartBackend {
    fn create(
        &mut self,
        canvas_id: &str,
        kind: ChartKind,
        data: &Dataset,
    ) -> Result<ChartHandle, ClientError>;

    /// Swaps data into a live chart and redraws it without animation.
    fn update(&mut self, handle: ChartHandle, data: &Dataset) -> Result<(), ClientError>;

    fn destroy(&mut self, handle: ChartHandle);

    fn dataset(&self, handle: ChartHandle) -> Option<&Dataset>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    pub canvas_id: String,
    pub kind: ChartKind,
    pub data: Dataset,
    pub redraws: u64,
}

/// In-memory chart surface used by the host page and the tests.
#[derive(Debug, Default)]
pub struct CanvasBackend {
    next_id: u64,
    live: BTreeMap<ChartHandle, Canvas>,
    created: u64,
    destroyed: u64,
    updated: u64,
}

impl CanvasBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn destroyed(&self) -> u64 {
        self.destroyed
    }

    pub fn updated(&self) -> u64 {
        self.updated
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn on_canvas(&self, canvas_id: &str) -> Option<(ChartHandle, &Canvas)> {
        self.live
            .iter()
            .find(|(_, canvas)| canvas.canvas_id == canvas_id)
            .map(|(handle, canvas)| (*handle, canvas))
    }
}

impl ChartBackend for CanvasBackend {
    fn create(
        &mut self,
        canvas_id: &str,
        kind: ChartKind,
        data: &Dataset,
    ) -> Result<ChartHandle, ClientError> {
        if self.on_canvas(canvas_id).is_some() {
            return Err(ClientError::chart(format!(
                "canvas {canvas_id} is already in use"
            )));
        }
        self.next_id += 1;
        let handle = ChartHandle(self.next_id);
        self.live.insert(
            handle,
            Canvas {
                canvas_id: canvas_id.to_string(),
                kind,
                data: data.clone(),
                redraws: 1,
            },
        );
        self.created += 1;
        Ok(handle)
    }

    fn update(&mut self, handle: ChartHandle, data: &Dataset) -> Result<(), ClientError> {
        let canvas = self
            .live
            .get_mut(&handle)
            .ok_or_else(|| ClientError::chart(format!("no live chart for {handle:?}")))?;
        canvas.data.labels.clone_from(&data.labels);
        canvas.data.values.clone_from(&data.values);
        canvas.data.colors.clone_from(&data.colors);
        canvas.data.revenue.clone_from(&data.revenue);
        canvas.redraws += 1;
        self.updated += 1;
        Ok(())
    }

    fn destroy(&mut self, handle: ChartHandle) {
        if self.live.remove(&handle).is_some() {
            self.destroyed += 1;
        }
    }

    fn dataset(&self, handle: ChartHandle) -> Option<&Dataset> {
        self.live.get(&handle).map(|canvas| &canvas.data)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Absent,
    Live(ChartKind),
}

/// What a single `render` call did to its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChange {
    /// Canvas is not on the page.
    Skipped,
    /// Empty payload on a slot without a placeholder; last chart stays.
    Kept,
    Created,
    Updated,
    Recreated,
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartView {
    pub slot: Slot,
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct LiveChart {
    handle: ChartHandle,
    kind: ChartKind,
}

pub struct ChartManager<B> {
    backend: B,
    slots: BTreeMap<Slot, LiveChart>,
}

impl<B: ChartBackend> ChartManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            slots: BTreeMap::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self, slot: Slot) -> SlotState {
        match self.slots.get(&slot) {
            Some(live) => SlotState::Live(live.kind),
            None => SlotState::Absent,
        }
    }

    pub fn handle(&self, slot: Slot) -> Option<ChartHandle> {
        self.slots.get(&slot).map(|live| live.handle)
    }

    /// Applies every series of a chart payload to its slot. All slots are
    /// attempted; the first failure is returned.
    pub fn apply_payload(
        &mut self,
        doc: &mut Document,
        payload: &ChartPayload,
    ) -> Result<(), ClientError> {
        let series = [
            (Slot::Trend, Dataset::from_trend(&payload.trend)),
            (Slot::Category, Dataset::from_categories(&payload.categories)),
            (Slot::TopSellers, Dataset::from_top_sellers(&payload.top_sellers)),
        ];

        let mut first_err = None;
        for (slot, data) in series {
            match self.render(doc, slot, slot.kind(), &data) {
                Ok(change) => debug!(?slot, ?change, "chart slot applied"),
                Err(err) => {
                    first_err.get_or_insert(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub fn render(
        &mut self,
        doc: &mut Document,
        slot: Slot,
        kind: ChartKind,
        data: &Dataset,
    ) -> Result<SlotChange, ClientError> {
        let canvas_id = slot.canvas_id();
        if !doc.contains(canvas_id) {
            return Ok(SlotChange::Skipped);
        }

        if data.is_empty() {
            let Some(placeholder_id) = slot.placeholder_id() else {
                return Ok(SlotChange::Kept);
            };
            if let Some(live) = self.slots.remove(&slot) {
                self.backend.destroy(live.handle);
            }
            if let Some(canvas) = doc.get_mut(canvas_id) {
                canvas.hide();
            }
            doc.get_or_insert_with(placeholder_id, || Element::with_text(NO_SALES_TEXT))
                .show();
            return Ok(SlotChange::Cleared);
        }

        if let Some(canvas) = doc.get_mut(canvas_id) {
            canvas.show();
        }
        if let Some(placeholder) = slot.placeholder_id().and_then(|id| doc.get_mut(id)) {
            placeholder.hide();
        }

        let mut change = SlotChange::Created;
        if let Some(live) = self.slots.get(&slot).copied() {
            if live.kind == kind {
                self.backend.update(live.handle, data)?;
                return Ok(SlotChange::Updated);
            }
            self.slots.remove(&slot);
            self.backend.destroy(live.handle);
            change = SlotChange::Recreated;
        }

        let handle = self.backend.create(canvas_id, kind, data)?;
        self.slots.insert(slot, LiveChart { handle, kind });
        Ok(change)
    }

    /// Destroys every live chart, e.g. when the view goes away.
    pub fn teardown(&mut self) {
        for (_, live) in std::mem::take(&mut self.slots) {
            self.backend.destroy(live.handle);
        }
    }

    pub fn views(&self) -> Vec<ChartView> {
        self.slots
            .iter()
            .filter_map(|(slot, live)| {
                let data = self.backend.dataset(live.handle)?;
                Some(ChartView {
                    slot: *slot,
                    kind: live.kind,
                    labels: data.labels.clone(),
                    values: data.values.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> Document {
        Document::with_elements(&["revenueChart", "categoryChart", "topSellersChart"])
    }

    fn sellers(n: usize) -> Vec<TopSeller> {
        (0..n)
            .map(|i| TopSeller {
                label: format!("Item {i}"),
                value: (10 - i) as f64,
                revenue: 100.0 * (i + 1) as f64,
            })
            .collect()
    }

    fn payload(top: usize) -> ChartPayload {
        ChartPayload {
            trend: vec![TrendPoint {
                label: "Jan 05".to_string(),
                value: 420.0,
            }],
            categories: vec![CategoryShare {
                name: "Snacks".to_string(),
                value: 120.0,
            }],
            top_sellers: sellers(top),
        }
    }

    #[test]
    fn same_shape_updates_in_place() {
        let mut doc = page();
        let mut charts = ChartManager::new(CanvasBackend::new());

        charts.apply_payload(&mut doc, &payload(3)).unwrap();
        let before = charts.handle(Slot::TopSellers).unwrap();
        charts.apply_payload(&mut doc, &payload(2)).unwrap();

        assert_eq!(charts.handle(Slot::TopSellers), Some(before));
        assert_eq!(charts.backend().created(), 3);
        assert_eq!(charts.backend().destroyed(), 0);
        assert_eq!(charts.backend().updated(), 3);
        let (_, canvas) = charts.backend().on_canvas("topSellersChart").unwrap();
        assert_eq!(canvas.data.labels.len(), 2);
        assert_eq!(canvas.redraws, 2);
    }

    #[test]
    fn emptied_top_sellers_destroy_and_show_placeholder() {
        let mut doc = page();
        let mut charts = ChartManager::new(CanvasBackend::new());

        charts.apply_payload(&mut doc, &payload(3)).unwrap();
        charts.apply_payload(&mut doc, &payload(0)).unwrap();

        assert_eq!(charts.state(Slot::TopSellers), SlotState::Absent);
        assert_eq!(charts.backend().destroyed(), 1);
        assert!(charts.backend().on_canvas("topSellersChart").is_none());
        assert!(!doc.get("topSellersChart").unwrap().visible);
        let placeholder = doc.get("topSellersNoData").unwrap();
        assert!(placeholder.visible);
        assert_eq!(placeholder.text, NO_SALES_TEXT);
    }

    #[test]
    fn refilled_top_sellers_recreate_and_hide_placeholder() {
        let mut doc = page();
        let mut charts = ChartManager::new(CanvasBackend::new());

        charts.apply_payload(&mut doc, &payload(0)).unwrap();
        assert_eq!(charts.state(Slot::TopSellers), SlotState::Absent);
        charts.apply_payload(&mut doc, &payload(0)).unwrap();
        charts.apply_payload(&mut doc, &payload(4)).unwrap();

        assert_eq!(charts.state(Slot::TopSellers), SlotState::Live(ChartKind::Bar));
        assert!(doc.get("topSellersChart").unwrap().visible);
        assert!(!doc.get("topSellersNoData").unwrap().visible);
    }

    #[test]
    fn kind_change_destroys_before_create() {
        let mut doc = page();
        let mut charts = ChartManager::new(CanvasBackend::new());
        let data = Dataset::from_trend(&payload(0).trend);

        charts.render(&mut doc, Slot::Trend, ChartKind::Bar, &data).unwrap();
        let change = charts
            .render(&mut doc, Slot::Trend, ChartKind::Line, &data)
            .unwrap();

        assert_eq!(change, SlotChange::Recreated);
        assert_eq!(charts.state(Slot::Trend), SlotState::Live(ChartKind::Line));
        assert_eq!(charts.backend().live_count(), 1);
        assert_eq!(charts.backend().destroyed(), 1);
    }

    #[test]
    fn empty_trend_keeps_last_chart() {
        let mut doc = page();
        let mut charts = ChartManager::new(CanvasBackend::new());
        charts.apply_payload(&mut doc, &payload(1)).unwrap();

        charts.apply_payload(&mut doc, &ChartPayload::default()).unwrap();

        assert_eq!(charts.state(Slot::Trend), SlotState::Live(ChartKind::Line));
        assert_eq!(charts.state(Slot::Category), SlotState::Live(ChartKind::Doughnut));
    }

    #[test]
    fn missing_canvas_is_skipped() {
        let mut doc = Document::with_elements(&["revenueChart"]);
        let mut charts = ChartManager::new(CanvasBackend::new());
        charts.apply_payload(&mut doc, &payload(2)).unwrap();

        assert_eq!(charts.state(Slot::Category), SlotState::Absent);
        assert_eq!(charts.state(Slot::TopSellers), SlotState::Absent);
        assert!(!doc.contains("topSellersNoData"));
    }

    #[test]
    fn backend_rejects_second_chart_on_canvas() {
        let mut backend = CanvasBackend::new();
        let data = Dataset::from_top_sellers(&sellers(1));
        backend.create("topSellersChart", ChartKind::Bar, &data).unwrap();
        let err = backend
            .create("topSellersChart", ChartKind::Bar, &data)
            .unwrap_err();
        assert!(matches!(err, ClientError::Chart(_)));
    }

    #[test]
    fn category_colours_follow_palette() {
        let shares: Vec<CategoryShare> = (0..10)
            .map(|i| CategoryShare {
                name: format!("c{i}"),
                value: 1.0,
            })
            .collect();
        let data = Dataset::from_categories(&shares);
        assert_eq!(data.colors.len(), CATEGORY_COLORS.len());
        assert_eq!(data.colors[0], "#fc8019");
    }

    #[test]
    fn top_seller_tooltip_shows_units_and_revenue() {
        let data = Dataset::from_top_sellers(&sellers(2));
        assert_eq!(
            data.tooltip(1),
            vec![
                "Units Sold: 9".to_string(),
                "Total Revenue: \u{20b9}200".to_string()
            ]
        );
    }

    #[test]
    fn teardown_releases_every_canvas() {
        let mut doc = page();
        let mut charts = ChartManager::new(CanvasBackend::new());
        charts.apply_payload(&mut doc, &payload(2)).unwrap();

        charts.teardown();

        assert_eq!(charts.backend().live_count(), 0);
        assert!(Slot::ALL.iter().all(|s| charts.state(*s) == SlotState::Absent));
    }
}
