use crate::api::{DashboardApi, HttpApi};
use crate::charts::CanvasBackend;
use crate::config::Config;
use crate::dom::{Document, SharedDocument};
use crate::modal::{ModalLoader, MODAL_ELEMENTS};
use crate::offline::{OfflineWorker, UpstreamNetwork};
use crate::reconcile::{DashboardView, OrdersView, DASHBOARD_ELEMENTS, ORDERS_ELEMENTS};
use crate::users::UserActions;
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub doc: SharedDocument,
    pub dashboard: Arc<DashboardView<CanvasBackend>>,
    pub orders: Arc<OrdersView>,
    pub modal: Arc<ModalLoader>,
    pub users: Arc<UserActions>,
    pub offline: Arc<OfflineWorker<UpstreamNetwork>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let api: Arc<dyn DashboardApi> = Arc::new(HttpApi::from_config(&config));
        Self::with_api(config, api)
    }

    /// Every view shares one document that holds both pages and the modal.
    pub fn with_api(config: Config, api: Arc<dyn DashboardApi>) -> Self {
        let ids: Vec<&str> = DASHBOARD_ELEMENTS
            .iter()
            .chain(&ORDERS_ELEMENTS)
            .chain(&MODAL_ELEMENTS)
            .copied()
            .collect();
        let doc = Document::with_elements(&ids).shared();

        let dashboard = DashboardView::new(
            Arc::clone(&api),
            Arc::clone(&doc),
            CanvasBackend::new(),
            config.range,
        );
        let orders = OrdersView::new(
            Arc::clone(&api),
            Arc::clone(&doc),
            config.order_filter.clone(),
        );
        let modal = ModalLoader::new(Arc::clone(&api), Arc::clone(&doc));
        let users = UserActions::new(api, Arc::clone(&doc));
        let offline = OfflineWorker::new(
            config.base_url.clone(),
            UpstreamNetwork::new(Client::new()),
        );

        Self {
            config: Arc::new(config),
            doc,
            dashboard: Arc::new(dashboard),
            orders: Arc::new(orders),
            modal: Arc::new(modal),
            users: Arc::new(users),
            offline: Arc::new(offline),
        }
    }
}
