pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod server;
pub mod state;
pub mod stream_relay;
pub mod voice;

pub use config::GatewayConfig;
pub use error::AppError;
pub use server::{app_config, build_state, run_server};
pub use state::AppState;
