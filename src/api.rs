use crate::config::Config;
use crate::errors::ClientError;
use crate::models::{
    ActionResponse, ChartPayload, DetailResponse, OrderFilter, OrdersPage, StatSnapshot,
    TimeRange, UserAction,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const CSRF_COOKIE: &str = "csrftoken";

#[async_trait]
pub trait DashboardApi: Send + Sync {
    async fn stats(&self, range: TimeRange) -> Result<StatSnapshot, ClientError>;

    async fn charts(&self, range: TimeRange) -> Result<ChartPayload, ClientError>;

    async fn orders(&self, filter: &OrderFilter) -> Result<OrdersPage, ClientError>;

    async fn order_detail(&self, order_id: u64) -> Result<DetailResponse, ClientError>;

    async fn user_action(
        &self,
        action: UserAction,
        user_id: u64,
    ) -> Result<ActionResponse, ClientError>;
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub stats_url: String,
    pub chart_url: String,
    pub orders_url: String,
    pub users_url: String,
}

impl Endpoints {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stats_url: config.url(&config.stats_path),
            chart_url: config.url(&config.chart_path),
            orders_url: config.url(&config.orders_path),
            users_url: config.url(&config.users_path),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    endpoints: Endpoints,
    csrf_token: Option<String>,
}

impl HttpApi {
    pub fn new(client: Client, endpoints: Endpoints, csrf_token: Option<String>) -> Self {
        Self {
            client,
            endpoints,
            csrf_token,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let csrf = resolve_csrf_token(config.csrf_token.as_deref(), config.cookie.as_deref());
        Self::new(Client::new(), Endpoints::from_config(config), csrf)
    }

    /// Decodes the body whatever the status code, the admin endpoints put
    /// their error details in JSON on 4xx responses too.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| {
            if status.is_success() {
                ClientError::from(err)
            } else {
                ClientError::Status(status.as_u16())
            }
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ClientError> {
        let response = self.client.get(url).query(query).send().await?;
        Self::decode(response).await
    }
}

#[async_trait]
impl DashboardApi for HttpApi {
    async fn stats(&self, range: TimeRange) -> Result<StatSnapshot, ClientError> {
        self.get_json(&self.endpoints.stats_url, &[("range", range.to_string())])
            .await
    }

    async fn charts(&self, range: TimeRange) -> Result<ChartPayload, ClientError> {
        self.get_json(&self.endpoints.chart_url, &[("range", range.to_string())])
            .await
    }

    async fn orders(&self, filter: &OrderFilter) -> Result<OrdersPage, ClientError> {
        let query = [
            ("status", filter.status.as_str().to_string()),
            ("search", filter.search.clone()),
            ("page", filter.page.to_string()),
        ];
        self.get_json(&self.endpoints.orders_url, &query).await
    }

    async fn order_detail(&self, order_id: u64) -> Result<DetailResponse, ClientError> {
        self.get_json(
            &self.endpoints.orders_url,
            &[("detail_id", order_id.to_string())],
        )
        .await
    }

    async fn user_action(
        &self,
        action: UserAction,
        user_id: u64,
    ) -> Result<ActionResponse, ClientError> {
        let form = [
            ("action", action.as_str().to_string()),
            ("user_id", user_id.to_string()),
        ];
        let mut request = self.client.post(&self.endpoints.users_url).form(&form);
        if let Some(token) = &self.csrf_token {
            request = request.header(CSRF_HEADER, token);
        }
        let response = request.send().await?;
        Self::decode(response).await
    }
}

/// Explicit token first, otherwise the `csrftoken` cookie.
pub fn resolve_csrf_token(explicit: Option<&str>, cookie_header: Option<&str>) -> Option<String> {
    explicit
        .filter(|token| !token.trim().is_empty())
        .map(|token| token.trim().to_string())
        .or_else(|| cookie_header.and_then(|cookies| cookie_value(cookies, CSRF_COOKIE)))
}

pub fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| percent_decode(value))
    })
}

fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
