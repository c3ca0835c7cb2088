use crate::api::DashboardApi;
use crate::dom::{Document, SharedDocument};
use crate::models::DetailResponse;
use crate::reconcile::Sequencer;
use crate::ui::{render_modal_error, render_modal_footer, render_modal_loading, render_order_detail};
use serde::Serialize;
use std::{sync::Arc, time::Duration};
use tokio::task::JoinHandle;
use tracing::error;

pub const ORDER_MODAL: &str = "orderModal";
pub const MODAL_BODY: &str = "modalBody";
pub const MODAL_TITLE: &str = "modalTitle";
pub const MODAL_FOOTER: &str = "modalFooter";
pub const MODAL_ELEMENTS: [&str; 4] = [ORDER_MODAL, MODAL_BODY, MODAL_TITLE, MODAL_FOOTER];

/// Time the closing transition gets before the modal leaves the layout.
pub const CLOSE_DELAY: Duration = Duration::from_millis(300);

const SHOW_CLASS: &str = "show";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailOutcome {
    /// The page has no modal to render into.
    Unavailable,
    Loaded,
    Failed,
    /// A later `open_detail` call owns the modal now.
    Superseded,
}

/// Shows the modal with its loading shell. False when the modal is missing.
pub fn show_loading(doc: &mut Document) -> bool {
    if !doc.contains(ORDER_MODAL) || !doc.contains(MODAL_BODY) {
        return false;
    }
    if let Some(modal) = doc.get_mut(ORDER_MODAL) {
        modal.add_class(SHOW_CLASS);
        modal.show();
    }
    if let Some(body) = doc.get_mut(MODAL_BODY) {
        body.set_html(render_modal_loading());
    }
    true
}

pub struct ModalLoader {
    api: Arc<dyn DashboardApi>,
    doc: SharedDocument,
    seq: Sequencer,
}

impl ModalLoader {
    pub fn new(api: Arc<dyn DashboardApi>, doc: SharedDocument) -> Self {
        Self {
            api,
            doc,
            seq: Sequencer::default(),
        }
    }

    pub async fn open_detail(&self, order_id: u64) -> DetailOutcome {
        let ticket = self.seq.ticket();
        if !show_loading(&mut *self.doc.lock().await) {
            return DetailOutcome::Unavailable;
        }

        let result = self.api.order_detail(order_id).await;

        let mut doc = self.doc.lock().await;
        if !self.seq.admit(ticket) {
            return DetailOutcome::Superseded;
        }
        let (body_html, outcome) = match result {
            Ok(DetailResponse::Found(detail)) => {
                if let Some(title) = doc.get_mut(MODAL_TITLE) {
                    title.set_text(format!("Order #{}", detail.token_number));
                }
                if let Some(footer) = doc.get_mut(MODAL_FOOTER) {
                    footer.set_html(render_modal_footer());
                }
                (render_order_detail(&detail), DetailOutcome::Loaded)
            }
            Ok(DetailResponse::Missing { error }) => {
                (render_modal_error(&error), DetailOutcome::Failed)
            }
            Err(err) => {
                error!(order_id, "failed to load order details: {err}");
                (
                    render_modal_error("Failed to load order details"),
                    DetailOutcome::Failed,
                )
            }
        };
        match doc.get_mut(MODAL_BODY) {
            Some(body) => {
                body.set_html(body_html);
                outcome
            }
            None => DetailOutcome::Unavailable,
        }
    }

    /// Starts the closing transition; the modal is hidden after
    /// [`CLOSE_DELAY`] unless it was reopened in the meantime.
    pub async fn close_detail(&self) -> Option<JoinHandle<()>> {
        {
            let mut doc = self.doc.lock().await;
            doc.get_mut(ORDER_MODAL)?.remove_class(SHOW_CLASS);
        }

        let doc = Arc::clone(&self.doc);
        Some(tokio::spawn(async move {
            tokio::time::sleep(CLOSE_DELAY).await;
            let mut doc = doc.lock().await;
            if let Some(modal) = doc.get_mut(ORDER_MODAL) {
                if !modal.has_class(SHOW_CLASS) {
                    modal.hide();
                }
            }
        }))
    }

    /// Clicks on the backdrop (the modal element itself) close it.
    pub async fn backdrop_click(&self, target_id: &str) -> Option<JoinHandle<()>> {
        if target_id == ORDER_MODAL {
            self.close_detail().await
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::dom::Element;
    use crate::models::{DetailItem, DetailUser, OrderDetail};

    fn detail(id: u64) -> OrderDetail {
        OrderDetail {
            id,
            token_number: format!("TK{id}"),
            status: Some("ready".to_string()),
            status_display: "Ready".to_string(),
            total_amount: 130.0,
            payment_status: Some("Paid".to_string()),
            created_at: "2026-01-05 12:30".to_string(),
            scheduled_for: Some("2026-01-05 13:00".to_string()),
            user: DetailUser {
                username: "kiran".to_string(),
                email: Some("kiran@example.com".to_string()),
                id: Some(2),
            },
            items: vec![
                DetailItem {
                    name: "Tea".to_string(),
                    quantity: 2,
                    price: 15.0,
                },
                DetailItem {
                    name: "Samosa".to_string(),
                    quantity: 4,
                    price: 25.0,
                },
            ],
        }
    }

    fn loader(api: &Arc<FakeApi>) -> ModalLoader {
        let mut doc = Document::new();
        doc.insert(ORDER_MODAL, Element::hidden());
        for id in [MODAL_BODY, MODAL_TITLE, MODAL_FOOTER] {
            doc.insert(id, Element::default());
        }
        ModalLoader::new(api.clone(), doc.shared())
    }

    #[tokio::test]
    async fn loads_detail_into_modal() {
        let api = Arc::new(FakeApi::default());
        api.details
            .lock()
            .unwrap()
            .insert(5, DetailResponse::Found(Box::new(detail(5))));
        let modal = loader(&api);

        assert_eq!(modal.open_detail(5).await, DetailOutcome::Loaded);

        let doc = modal.doc.lock().await;
        let shell = doc.get(ORDER_MODAL).unwrap();
        assert!(shell.visible);
        assert!(shell.has_class("show"));
        assert_eq!(doc.text(MODAL_TITLE), Some("Order #TK5"));
        let body = doc.html(MODAL_BODY).unwrap();
        assert!(body.contains("\u{20b9}30</td>"));
        assert!(body.contains("\u{20b9}100</td>"));
        assert!(body.contains("\u{20b9}130</span>"));
        assert!(body.contains("Scheduled For"));
        assert!(doc.html(MODAL_FOOTER).unwrap().contains("Close"));
    }

    #[tokio::test]
    async fn error_body_renders_inline() {
        let api = Arc::new(FakeApi::default());
        api.details.lock().unwrap().insert(
            9,
            DetailResponse::Missing {
                error: "Order not found".to_string(),
            },
        );
        let modal = loader(&api);

        assert_eq!(modal.open_detail(9).await, DetailOutcome::Failed);

        let doc = modal.doc.lock().await;
        let body = doc.html(MODAL_BODY).unwrap();
        assert!(body.contains("modal-error"));
        assert!(body.contains("Order not found"));
    }

    #[tokio::test]
    async fn transport_failure_renders_generic_error() {
        let api = Arc::new(FakeApi::default());
        let modal = loader(&api);

        assert_eq!(modal.open_detail(1).await, DetailOutcome::Failed);

        let doc = modal.doc.lock().await;
        assert!(doc
            .html(MODAL_BODY)
            .unwrap()
            .contains("Failed to load order details"));
    }

    #[tokio::test]
    async fn missing_modal_is_a_noop() {
        let api = Arc::new(FakeApi::default());
        let modal = ModalLoader::new(api.clone(), Document::new().shared());

        assert_eq!(modal.open_detail(1).await, DetailOutcome::Unavailable);
        assert!(api.calls.lock().unwrap().is_empty());
        assert!(modal.close_detail().await.is_none());
    }

    #[test]
    fn loading_shell_is_shown_before_fetch() {
        let mut doc = Document::with_elements(&MODAL_ELEMENTS);
        assert!(show_loading(&mut doc));
        assert!(doc.html(MODAL_BODY).unwrap().contains("modal-loading"));
    }

    #[tokio::test(start_paused = true)]
    async fn close_hides_after_transition() {
        let api = Arc::new(FakeApi::default());
        api.details
            .lock()
            .unwrap()
            .insert(5, DetailResponse::Found(Box::new(detail(5))));
        let modal = loader(&api);
        modal.open_detail(5).await;

        let pending = modal.close_detail().await.unwrap();
        {
            let doc = modal.doc.lock().await;
            let shell = doc.get(ORDER_MODAL).unwrap();
            assert!(!shell.has_class("show"));
            assert!(shell.visible);
        }

        pending.await.unwrap();
        let doc = modal.doc.lock().await;
        assert!(!doc.get(ORDER_MODAL).unwrap().visible);
    }

    #[tokio::test(start_paused = true)]
    async fn backdrop_click_only_closes_on_modal() {
        let api = Arc::new(FakeApi::default());
        let modal = loader(&api);
        show_loading(&mut *modal.doc.lock().await);

        assert!(modal.backdrop_click(MODAL_BODY).await.is_none());
        let pending = modal.backdrop_click(ORDER_MODAL).await.unwrap();
        pending.await.unwrap();

        assert!(!modal.doc.lock().await.get(ORDER_MODAL).unwrap().visible);
    }
}
