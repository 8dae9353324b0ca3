//! Command-line and environment configuration.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use clap::Parser;
use todos_core::{Store, StoreError};

#[derive(Debug, Clone, Parser)]
#[command(name = "todos-server", version, about = "HTTP service for todos and tags")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "TODOS_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "TODOS_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Directory holding the collection snapshots; in-memory when unset
    #[arg(long, env = "TODOS_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Skip the association repair pass at startup
    #[arg(long, env = "TODOS_SKIP_RECONCILE")]
    pub skip_reconcile: bool,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub async fn open_store(&self) -> Result<Store, StoreError> {
        match &self.data_dir {
            Some(dir) => Store::open_dir(dir).await,
            None => Ok(Store::in_memory()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "todos-server",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--data-dir",
            "/tmp/todos",
            "--skip-reconcile",
        ])
        .unwrap();
        assert_eq!(config.addr(), "0.0.0.0:9000".parse().unwrap());
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/todos")));
        assert!(config.skip_reconcile);
    }

    #[test]
    fn rejects_invalid_port() {
        assert!(Config::try_parse_from(["todos-server", "--port", "70000"]).is_err());
    }
}
