mod config;
mod requests_logging;
pub mod server;
mod session;
pub mod state;
mod stream;

pub use config::ServerConfig;
pub use requests_logging::{log_requests, RequestsLoggingLevel};
pub use server::{make_app, run_server};
pub use session::Session;
pub use stream::AudioResolver;
