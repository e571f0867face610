//! Process configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;

/// Caching proxy for the Go module proxy protocol.
#[derive(Debug, Parser)]
#[command(name = "astera", version, about)]
pub struct Config {
    /// Database file
    #[arg(long, default_value = "astera.db")]
    pub db: PathBuf,

    /// Listen address
    #[arg(long, default_value = ":8080")]
    pub addr: String,

    /// Import a local module cache before accepting requests
    #[arg(long)]
    pub import_local_cache: bool,

    /// Local module cache directory
    #[arg(long, default_value_os_t = default_cache_dir())]
    pub local_cache_dir: PathBuf,

    /// Expose diagnostic endpoints on port 6060
    #[arg(long)]
    pub pprof: bool,

    /// Comma-separated glob prefixes served from VCS instead of the
    /// upstream proxy
    #[arg(long, env = "GOPRIVATE", default_value = "")]
    pub goprivate: String,
}

impl Config {
    /// The listen address as a socket address. A bare `:port` binds all
    /// interfaces, mirroring the conventional listener syntax.
    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = if self.addr.starts_with(':') {
            format!("0.0.0.0{}", self.addr)
        } else {
            self.addr.clone()
        };
        Ok(addr.parse()?)
    }
}

fn default_cache_dir() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join("go/pkg/mod/cache/download")
}
