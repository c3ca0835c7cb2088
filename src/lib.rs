pub mod api;
pub mod app;
pub mod charts;
pub mod config;
pub mod dom;
pub mod errors;
pub mod handlers;
pub mod modal;
pub mod models;
pub mod offline;
pub mod poller;
pub mod reconcile;
pub mod state;
pub mod ui;
pub mod users;

pub use app::router;
pub use state::AppState;
