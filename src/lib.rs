pub mod app;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod fallback;
pub mod handlers;
pub mod insight;
pub mod models;
pub mod source;
pub mod state;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use state::AppState;
