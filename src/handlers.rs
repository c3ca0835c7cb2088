use crate::dom::Element;
use crate::errors::AppError;
use crate::offline::{FetchOutcome, FetchRequest, Network};
use crate::state::AppState;
use crate::ui::render_index;
use axum::{
    extract::{Path, State},
    http::{header::ACCEPT, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::Local;
use serde_json::{json, Value};

pub const SERVED_FROM: &str = "x-served-from";

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let charts = state.dashboard.chart_views().await;
    let doc = state.doc.lock().await;
    Html(render_index(&doc, &charts, &timestamp()))
}

pub async fn document(State(state): State<AppState>) -> Json<Value> {
    let charts = state.dashboard.chart_views().await;
    let doc = state.doc.lock().await;
    Json(json!({
        "updated_at": timestamp(),
        "range": state.config.range.as_str(),
        "filter": state.orders.filter(),
        "charts": charts,
        "document": &*doc,
    }))
}

/// Runs one dashboard and one orders cycle outside the poll schedule.
pub async fn refresh(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    let (dashboard, orders) = tokio::join!(state.dashboard.refresh(), state.orders.refresh());
    dashboard?;
    orders?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn open_order(State(state): State<AppState>, Path(id): Path<u64>) -> Json<Value> {
    let outcome = state.modal.open_detail(id).await;
    Json(json!({ "outcome": outcome }))
}

pub async fn close_modal(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    match state.modal.close_detail().await {
        Some(_) => Ok(StatusCode::ACCEPTED),
        None => Err(AppError::not_found("no order modal on this page")),
    }
}

/// Flips the user's status control the way a click would, then confirms the
/// change upstream. Controls not seen before start out active.
pub async fn toggle_user(State(state): State<AppState>, Path(id): Path<u64>) -> Json<Value> {
    let control = format!("userStatus{id}");
    {
        let mut doc = state.doc.lock().await;
        let element = doc.get_or_insert_with(&control, || Element::checkbox(true));
        element.checked = !element.checked;
    }
    let outcome = state.users.toggle_status(id, &control).await;
    Json(json!({ "outcome": outcome }))
}

pub async fn delete_user(State(state): State<AppState>, Path(id): Path<u64>) -> Json<Value> {
    let outcome = state.users.delete_user(id).await;
    Json(json!({ "outcome": outcome }))
}

/// Everything else goes to the canteen site through the offline cache.
pub async fn proxy(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let path = uri.path_and_query().map_or("/", |value| value.as_str());
    let request = FetchRequest {
        method: method.clone(),
        url: state.offline.absolute(path),
        navigation: headers
            .get(ACCEPT)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|accept| accept.contains("text/html")),
    };

    let (response, source) = match state.offline.fetch(&request).await {
        FetchOutcome::Bypass => {
            if method != Method::GET {
                return Err(AppError::method_not_allowed("only GET is forwarded"));
            }
            (state.offline.network().fetch(&request.url).await?, "direct")
        }
        FetchOutcome::Network(response) => (response, "network"),
        FetchOutcome::Cache(response) => (response, "cache"),
        FetchOutcome::OfflinePage(response) => (response, "offline"),
        FetchOutcome::Unavailable => {
            return Err(AppError::service_unavailable("upstream unreachable and nothing cached"));
        }
    };

    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(SERVED_FROM, HeaderValue::from_static(source));
    Ok(response)
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}
