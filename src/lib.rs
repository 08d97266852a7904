mod network;
mod service;

pub use network::EchoService;
pub use network::ServiceStream;
pub use service::{
    load_tls_config, Acceptor, AppError, AppResult, EntrypointService, NetworkConfig,
    ServiceConfig, ServiceCreatedCallback, ThreadCount, TlsConfig,
};
