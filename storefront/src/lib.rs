pub mod admin_handlers;
pub mod app;
pub mod catalog_handlers;
pub mod checkout_handlers;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod lifecycle;
pub mod metrics;
pub mod order_handlers;
pub mod pricing;
pub mod sessions;
pub mod store;
pub mod webhook;

pub use app::{build_router, AppState};
pub use config::{load_config, Config};
