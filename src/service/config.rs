use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{AppError, AppResult, ThreadCount};

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct NetworkConfig {
    pub ip: String,
    pub port: u16,
    /// requested worker pool size; 0 means one worker per hardware thread
    pub worker_threads: usize,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_file: String,
    pub key_file: String,
}

#[derive(Debug, Default, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    pub network: NetworkConfig,
    pub tls: TlsConfig,
}

impl ServiceConfig {
    pub fn set_up_config<P: AsRef<Path>>(path: P) -> AppResult<ServiceConfig> {
        let path_str = path
            .as_ref()
            .to_str()
            .ok_or(AppError::InvalidValue(format!(
                "config file path: {}",
                path.as_ref().to_string_lossy()
            )))?;
        let config = config::Config::builder()
            .add_source(config::File::with_name(path_str))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn listen_addr(&self) -> AppResult<SocketAddr> {
        let addr = format!("{}:{}", self.network.ip, self.network.port);
        addr.parse()
            .map_err(|_| AppError::InvalidValue(format!("listen address: {}", addr)))
    }

    pub fn thread_count(&self) -> ThreadCount {
        match self.network.worker_threads {
            0 => ThreadCount::Auto,
            n => ThreadCount::Fixed(n),
        }
    }
}
