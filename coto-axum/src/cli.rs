//! Command-line arguments of the `coto` server.

use std::net::{IpAddr, SocketAddr};

use clap::Parser;

/// coto - HTTP query broker for MongoDB
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "coto")]
#[command(version)]
#[command(about = "HTTP query broker for MongoDB", long_about = None)]
pub struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// Address to bind
    #[arg(long, env = "COTO_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,
}

impl Cli {
    /// The socket address to bind.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
