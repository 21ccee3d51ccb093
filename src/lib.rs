pub mod aggregate;
pub mod app;
pub mod chart;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod state;
pub mod storage;
pub mod ui;
pub mod views;

pub use app::router;
pub use config::AppConfig;
pub use state::AppState;
pub use storage::Database;
