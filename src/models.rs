use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    #[serde(alias = "name")]
    pub item_name: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    #[serde(default)]
    pub id: Option<u64>,
    pub token_number: String,
    pub user_id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub items_count: usize,
    pub total_amount: f64,
    pub status: String,
    pub status_display: String,
    #[serde(default)]
    pub scheduled_for: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailUser {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailItem {
    #[serde(alias = "item_name")]
    pub name: String,
    pub quantity: u32,
    pub price: f64,
}

impl DetailItem {
    pub fn subtotal(&self) -> f64 {
        self.price * f64::from(self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    pub id: u64,
    pub token_number: String,
    #[serde(default)]
    pub status: Option<String>,
    pub status_display: String,
    pub total_amount: f64,
    #[serde(default)]
    pub payment_status: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub scheduled_for: Option<String>,
    pub user: DetailUser,
    #[serde(default)]
    pub items: Vec<DetailItem>,
}

/// Body of `GET {orders}?detail_id=`: either the order or `{ "error": ".." }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DetailResponse {
    Missing { error: String },
    Found(Box<OrderDetail>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSeller {
    pub label: String,
    pub value: f64,
    #[serde(default)]
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatSnapshot {
    pub total_revenue: f64,
    pub total_orders: u64,
    pub active_orders: u64,
    pub total_users: u64,
    pub todays_revenue: f64,
    pub todays_orders: u64,
    pub new_users: u64,
    #[serde(default)]
    pub recent_orders: Vec<OrderSummary>,
    #[serde(default)]
    pub top_sellers: Vec<TopSeller>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartPayload {
    #[serde(default)]
    pub trend: Vec<TrendPoint>,
    #[serde(default)]
    pub categories: Vec<CategoryShare>,
    #[serde(default)]
    pub top_sellers: Vec<TopSeller>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderCounts {
    pub all: u64,
    pub pending: u64,
    pub preparing: u64,
    pub ready: u64,
    pub completed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdersPage {
    pub counts: OrderCounts,
    #[serde(default)]
    pub orders: Vec<OrderSummary>,
    pub page: u32,
    pub num_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    ToggleStatus,
    Delete,
}

impl UserAction {
    pub fn as_str(self) -> &'static str {
        match self {
            UserAction::ToggleStatus => "toggle_status",
            UserAction::Delete => "delete",
        }
    }
}

/// Window the dashboard aggregates over, sent as `?range=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "today")]
    Today,
    #[serde(rename = "7days")]
    SevenDays,
    #[serde(rename = "30days")]
    ThirtyDays,
    #[default]
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::Today => "today",
            TimeRange::SevenDays => "7days",
            TimeRange::ThirtyDays => "30days",
            TimeRange::All => "all",
        }
    }

    /// Unknown values fall back to `All`, as the stats endpoint does.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "today" => TimeRange::Today,
            "7days" => TimeRange::SevenDays,
            "30days" => TimeRange::ThirtyDays,
            _ => TimeRange::All,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTab {
    #[default]
    All,
    Pending,
    Preparing,
    Ready,
    Completed,
}

impl StatusTab {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusTab::All => "all",
            StatusTab::Pending => "pending",
            StatusTab::Preparing => "preparing",
            StatusTab::Ready => "ready",
            StatusTab::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "pending" => StatusTab::Pending,
            "preparing" => StatusTab::Preparing,
            "ready" => StatusTab::Ready,
            "completed" => StatusTab::Completed,
            _ => StatusTab::All,
        }
    }
}

/// Query the orders view is pinned to for the lifetime of a poller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderFilter {
    pub status: StatusTab,
    pub search: String,
    pub page: u32,
}

impl Default for OrderFilter {
    fn default() -> Self {
        Self {
            status: StatusTab::All,
            search: String::new(),
            page: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_tolerates_missing_optional_fields() {
        let order: OrderSummary = serde_json::from_value(serde_json::json!({
            "token_number": "ABC123",
            "username": "ravi",
            "user_id": 7,
            "items": [{ "quantity": 2, "item_name": "Dosa" }],
            "items_count": 1,
            "total_amount": 80.0,
            "status": "pending",
            "status_display": "Pending"
        }))
        .unwrap();

        assert_eq!(order.id, None);
        assert_eq!(order.email, None);
        assert_eq!(order.scheduled_for, None);
        assert_eq!(order.items[0].item_name, "Dosa");
    }

    #[test]
    fn detail_response_distinguishes_error_body() {
        let missing: DetailResponse =
            serde_json::from_str(r#"{"error":"Order not found"}"#).unwrap();
        assert_eq!(
            missing,
            DetailResponse::Missing {
                error: "Order not found".to_string()
            }
        );

        let found: DetailResponse = serde_json::from_value(serde_json::json!({
            "id": 3,
            "token_number": "XYZ789",
            "status": "ready",
            "status_display": "Ready",
            "total_amount": 150.0,
            "payment_status": "Paid",
            "created_at": "2026-01-05 12:30",
            "scheduled_for": null,
            "user": { "username": "asha", "email": "asha@example.com", "id": 4 },
            "items": [{ "name": "Idli", "quantity": 3, "price": 50.0 }]
        }))
        .unwrap();
        match found {
            DetailResponse::Found(detail) => {
                assert_eq!(detail.items[0].name, "Idli");
                assert_eq!(detail.items[0].subtotal(), 150.0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn chart_payload_defaults_missing_series() {
        let payload: ChartPayload = serde_json::from_str(r#"{"trend":[]}"#).unwrap();
        assert!(payload.categories.is_empty());
        assert!(payload.top_sellers.is_empty());
    }

    #[test]
    fn time_range_round_trips_query_values() {
        assert_eq!(TimeRange::parse("7days"), TimeRange::SevenDays);
        assert_eq!(TimeRange::parse("bogus"), TimeRange::All);
        assert_eq!(TimeRange::ThirtyDays.to_string(), "30days");
    }
}
