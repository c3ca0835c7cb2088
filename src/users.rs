use crate::api::DashboardApi;
use crate::dom::SharedDocument;
use crate::models::UserAction;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info};

pub const NETWORK_ERROR: &str = "Network error occurred";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Applied,
    /// The server refused the change, or it never got there.
    Rejected,
    /// The user backed out of the confirmation prompt.
    Cancelled,
}

pub fn delete_prompt(username: &str) -> String {
    format!(
        "Are you sure you want to delete user \"{username}\"? This action cannot be undone."
    )
}

pub struct UserActions {
    api: Arc<dyn DashboardApi>,
    doc: SharedDocument,
}

impl UserActions {
    pub fn new(api: Arc<dyn DashboardApi>, doc: SharedDocument) -> Self {
        Self { api, doc }
    }

    /// The checkbox at `control_id` has already been flipped by the user; it
    /// is flipped back if the server does not confirm the change.
    pub async fn toggle_status(&self, user_id: u64, control_id: &str) -> ActionOutcome {
        let previous = {
            let doc = self.doc.lock().await;
            doc.get(control_id).map(|control| !control.checked)
        };

        let failure = match self.api.user_action(UserAction::ToggleStatus, user_id).await {
            Ok(response) if response.success => {
                info!(
                    user_id,
                    status = response.status.as_deref().unwrap_or_default(),
                    "user status updated"
                );
                return ActionOutcome::Applied;
            }
            Ok(response) => {
                let message = response.message.unwrap_or_default();
                error!(user_id, "status toggle refused: {message}");
                format!("Failed to update status: {message}")
            }
            Err(err) => {
                error!(user_id, "status toggle failed: {err}");
                NETWORK_ERROR.to_string()
            }
        };

        let mut doc = self.doc.lock().await;
        doc.alert(failure);
        if let (Some(previous), Some(control)) = (previous, doc.get_mut(control_id)) {
            control.checked = previous;
        }
        ActionOutcome::Rejected
    }

    /// Deletes after `confirm` accepts the prompt text.
    pub async fn confirm_delete(
        &self,
        user_id: u64,
        username: &str,
        confirm: impl FnOnce(&str) -> bool,
    ) -> ActionOutcome {
        if !confirm(&delete_prompt(username)) {
            return ActionOutcome::Cancelled;
        }
        self.delete_user(user_id).await
    }

    /// On success the page is reloaded so counts and pagination resync.
    pub async fn delete_user(&self, user_id: u64) -> ActionOutcome {
        let failure = match self.api.user_action(UserAction::Delete, user_id).await {
            Ok(response) if response.success => {
                info!(user_id, "user deleted");
                self.doc.lock().await.request_reload();
                return ActionOutcome::Applied;
            }
            Ok(response) => format!(
                "Failed to delete user: {}",
                response.message.unwrap_or_default()
            ),
            Err(err) => {
                error!(user_id, "user delete failed: {err}");
                NETWORK_ERROR.to_string()
            }
        };
        self.doc.lock().await.alert(failure);
        ActionOutcome::Rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeApi;
    use crate::dom::{Document, Element};
    use crate::models::ActionResponse;

    fn panel(api: &Arc<FakeApi>, checked: bool) -> UserActions {
        let mut doc = Document::new();
        doc.insert("userActive7", Element::checkbox(checked));
        UserActions::new(api.clone(), doc.shared())
    }

    fn respond(api: &FakeApi, success: bool, message: Option<&str>) {
        *api.action.lock().unwrap() = Some(ActionResponse {
            success,
            message: message.map(str::to_string),
            status: success.then(|| "Active".to_string()),
        });
    }

    #[tokio::test]
    async fn toggle_success_keeps_flipped_control() {
        let api = Arc::new(FakeApi::default());
        respond(&api, true, None);
        let users = panel(&api, true);

        assert_eq!(users.toggle_status(7, "userActive7").await, ActionOutcome::Applied);

        let doc = users.doc.lock().await;
        assert!(doc.get("userActive7").unwrap().checked);
        assert!(doc.alerts().is_empty());
        assert_eq!(api.calls.lock().unwrap()[0], "toggle_status:7");
    }

    #[tokio::test]
    async fn refused_toggle_reverts_and_alerts() {
        let api = Arc::new(FakeApi::default());
        respond(&api, false, Some("locked"));
        let users = panel(&api, true);

        assert_eq!(users.toggle_status(7, "userActive7").await, ActionOutcome::Rejected);

        let doc = users.doc.lock().await;
        assert!(!doc.get("userActive7").unwrap().checked);
        assert_eq!(doc.alerts().len(), 1);
        assert!(doc.alerts()[0].contains("locked"));
    }

    #[tokio::test]
    async fn network_error_reverts_toggle() {
        let api = Arc::new(FakeApi::default());
        let users = panel(&api, false);

        assert_eq!(users.toggle_status(7, "userActive7").await, ActionOutcome::Rejected);

        let doc = users.doc.lock().await;
        assert!(doc.get("userActive7").unwrap().checked);
        assert_eq!(doc.alerts(), [NETWORK_ERROR.to_string()]);
    }

    #[tokio::test]
    async fn delete_success_requests_reload() {
        let api = Arc::new(FakeApi::default());
        respond(&api, true, Some("User bob deleted"));
        let users = panel(&api, true);

        assert_eq!(users.delete_user(7).await, ActionOutcome::Applied);
        assert!(users.doc.lock().await.reload_requested());
    }

    #[tokio::test]
    async fn delete_failure_alerts_and_keeps_page() {
        let api = Arc::new(FakeApi::default());
        respond(&api, false, Some("Cannot modify your own account"));
        let users = panel(&api, true);

        assert_eq!(users.delete_user(7).await, ActionOutcome::Rejected);

        let doc = users.doc.lock().await;
        assert!(!doc.reload_requested());
        assert_eq!(
            doc.alerts()[0],
            "Failed to delete user: Cannot modify your own account"
        );
    }

    #[tokio::test]
    async fn declined_confirmation_sends_nothing() {
        let api = Arc::new(FakeApi::default());
        let users = panel(&api, true);
        let mut asked = String::new();

        let outcome = users
            .confirm_delete(7, "bob", |prompt| {
                asked = prompt.to_string();
                false
            })
            .await;

        assert_eq!(outcome, ActionOutcome::Cancelled);
        assert!(asked.contains("\"bob\""));
        assert!(api.calls.lock().unwrap().is_empty());
    }
}
