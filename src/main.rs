//! MITM Detector Command Line Tool
//!
//! Runs the demonstration HTTPS server that reports TLS interception verdicts.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use log::{info, warn};

use mitm_detector::common::{init_logger, parse_socket_addr, Result};
use mitm_detector::config::DetectorConfig;
use mitm_detector::server::{MitmServer, VerdictReporter};
use mitm_detector::tls::{create_self_signed_acceptor, create_tls_acceptor};
use mitm_detector::{APP_NAME, VERSION};

/// MITM Detector: passive TLS interception detection
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Configuration file (JSON); without it, ./config.json is read if it exists
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Listen address
    #[clap(short, long)]
    listen: Option<String>,

    /// Server certificate path (PEM)
    #[clap(long)]
    cert: Option<PathBuf>,

    /// Server private key path (PEM)
    #[clap(long)]
    key: Option<PathBuf>,

    /// Generate an ephemeral self-signed certificate
    #[clap(long)]
    self_signed: bool,

    /// Subject name for the self-signed certificate
    #[clap(long)]
    server_name: Option<String>,

    /// Time allowed for the ClientHello, in milliseconds
    #[clap(long)]
    hello_timeout_ms: Option<u64>,

    /// Time allowed for the TLS handshake, in milliseconds
    #[clap(long)]
    handshake_timeout_ms: Option<u64>,

    /// Time allowed for each request read or response write, in milliseconds
    #[clap(long)]
    idle_timeout_ms: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[clap(long)]
    log_level: Option<String>,
}

impl Args {
    /// Apply command line values over the loaded configuration
    fn apply(&self, config: &mut DetectorConfig) -> Result<()> {
        if let Some(listen) = &self.listen {
            config.listen = parse_socket_addr(listen)?;
        }
        if let Some(cert) = &self.cert {
            config.cert = cert.clone();
        }
        if let Some(key) = &self.key {
            config.key = key.clone();
        }
        if self.self_signed {
            config.self_signed = true;
        }
        if let Some(server_name) = &self.server_name {
            config.server_name = server_name.clone();
        }
        if let Some(timeout) = self.hello_timeout_ms {
            config.hello_timeout_ms = timeout;
        }
        if let Some(timeout) = self.handshake_timeout_ms {
            config.handshake_timeout_ms = timeout;
        }
        if let Some(timeout) = self.idle_timeout_ms {
            config.idle_timeout_ms = timeout;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = DetectorConfig::load(args.config.as_deref())?;
    args.apply(&mut config)?;

    init_logger(&config.log_level);
    info!("Starting {} v{}", APP_NAME, VERSION);

    config.validate()?;

    let acceptor = if config.self_signed {
        create_self_signed_acceptor(&config.server_name)?
    } else {
        create_tls_acceptor(&config.cert, &config.key)?
    };
    if config.hello_timeout_ms > 30_000 {
        warn!(
            "ClientHello timeout of {} ms lets idle clients hold sockets for a long time",
            config.hello_timeout_ms
        );
    }

    info!(
        "Timeouts: ClientHello {} ms, handshake {} ms, idle {} ms",
        config.hello_timeout_ms, config.handshake_timeout_ms, config.idle_timeout_ms
    );

    let server = MitmServer::bind(&config, acceptor, Arc::new(VerdictReporter)).await?;
    info!("Server ready on {}, press Ctrl+C to stop", server.local_addr()?);

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
