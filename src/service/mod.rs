pub use acceptor::{Acceptor, EntrypointService, ServiceCreatedCallback, ThreadCount};
pub use app_error::{AppError, AppResult};
pub use config::{NetworkConfig, ServiceConfig, TlsConfig};
pub use tls::load_tls_config;

mod acceptor;
mod app_error;
mod config;
mod tls;
