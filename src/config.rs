use crate::models::{OrderFilter, StatusTab, TimeRange};
use std::{env, time::Duration};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_POLL_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub base_url: String,
    pub stats_path: String,
    pub chart_path: String,
    pub orders_path: String,
    pub users_path: String,
    pub range: TimeRange,
    pub poll_interval: Duration,
    pub csrf_token: Option<String>,
    pub cookie: Option<String>,
    pub order_filter: OrderFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            base_url: "http://127.0.0.1:8000".to_string(),
            stats_path: "/admin-dashboard/api/stats/".to_string(),
            chart_path: "/admin-dashboard/api/chart-data/".to_string(),
            orders_path: "/admin-dashboard/api/orders/".to_string(),
            users_path: "/admin-dashboard/api/users/".to_string(),
            range: TimeRange::All,
            poll_interval: Duration::from_secs(DEFAULT_POLL_SECS),
            csrf_token: None,
            cookie: None,
            order_filter: OrderFilter::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; unset or unparsable
    /// values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let text = |key: &str, fallback: String| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .unwrap_or(fallback)
        };

        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(defaults.port);
        let poll_secs = lookup("CANTEEN_POLL_SECS")
            .and_then(|value| value.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_POLL_SECS);
        let page = lookup("CANTEEN_ORDER_PAGE")
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|page| *page > 0)
            .unwrap_or(1);

        Self {
            port,
            base_url: text("CANTEEN_BASE_URL", defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            stats_path: text("CANTEEN_STATS_PATH", defaults.stats_path),
            chart_path: text("CANTEEN_CHART_PATH", defaults.chart_path),
            orders_path: text("CANTEEN_ORDERS_PATH", defaults.orders_path),
            users_path: text("CANTEEN_USERS_PATH", defaults.users_path),
            range: lookup("CANTEEN_RANGE")
                .map(|value| TimeRange::parse(&value))
                .unwrap_or_default(),
            poll_interval: Duration::from_secs(poll_secs),
            csrf_token: lookup("CANTEEN_CSRF"),
            cookie: lookup("CANTEEN_COOKIE"),
            order_filter: OrderFilter {
                status: lookup("CANTEEN_ORDER_STATUS")
                    .map(|value| StatusTab::parse(&value))
                    .unwrap_or_default(),
                search: lookup("CANTEEN_ORDER_SEARCH").unwrap_or_default(),
                page,
            },
        }
    }

    /// Absolute upstream URL for a path (or passes an absolute URL through).
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}
