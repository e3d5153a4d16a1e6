//! Detector server
//!
//! Accepts TCP connections, records each ClientHello and serves HTTP over
//! the resulting TLS session, annotating every request with a verdict.

use std::net::SocketAddr;
use std::sync::Arc;

use log::{debug, error, info};
use openssl::ssl::SslAcceptor;
use tokio::net::TcpListener;
use tokio::task::JoinSet;

use crate::common::Result;
use crate::config::DetectorConfig;
use crate::fingerprint::FingerprintTable;
use crate::listener::HelloInterceptor;
use crate::verdict::MitmAnnotator;

use super::connection::{serve_connection, ConnectionLimits};
use super::handler::RequestHandler;

/// HTTPS server that reports interception verdicts
pub struct MitmServer {
    /// Bound listening socket
    listener: TcpListener,
    /// Records ClientHellos and prepares TLS streams
    interceptor: HelloInterceptor,
    /// Verdicts over the interceptor's table
    annotator: MitmAnnotator,
    /// Application handler
    handler: Arc<dyn RequestHandler>,
    /// Per-connection size and time limits
    limits: ConnectionLimits,
}

impl MitmServer {
    /// Bind the listening socket
    ///
    /// # Errors
    ///
    /// Returns an error if the listen address cannot be bound.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use std::sync::Arc;
    /// # use mitm_detector::config::DetectorConfig;
    /// # use mitm_detector::server::{MitmServer, VerdictReporter};
    /// # use mitm_detector::tls::create_self_signed_acceptor;
    /// # async fn run() -> mitm_detector::Result<()> {
    /// let config = DetectorConfig::default();
    /// let acceptor = create_self_signed_acceptor("localhost")?;
    /// let server = MitmServer::bind(&config, acceptor, Arc::new(VerdictReporter)).await?;
    /// server.run().await
    /// # }
    /// ```
    pub async fn bind(
        config: &DetectorConfig,
        acceptor: SslAcceptor,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(config.listen).await?;
        let table = FingerprintTable::new();
        let interceptor =
            HelloInterceptor::new(Arc::new(acceptor), table.clone(), config.hello_timeout());

        Ok(Self {
            listener,
            interceptor,
            annotator: MitmAnnotator::new(table),
            handler,
            limits: ConnectionLimits::from(config),
        })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Fingerprints of the connections currently open
    pub fn table(&self) -> &FingerprintTable {
        self.interceptor.table()
    }

    /// Serve connections until the task is cancelled
    pub async fn run(self) -> Result<()> {
        info!("MITM detector listening on {}", self.local_addr()?);

        let mut tasks = JoinSet::new();

        loop {
            while let Some(result) = tasks.try_join_next() {
                match result {
                    Ok(Err(e)) => debug!("Connection ended with error: {}", e),
                    Err(e) => error!("Task error: {}", e),
                    Ok(Ok(())) => {}
                }
            }

            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("Accepted connection from {}", peer);

                    let interceptor = self.interceptor.clone();
                    let annotator = self.annotator.clone();
                    let handler = Arc::clone(&self.handler);
                    let limits = self.limits;

                    tasks.spawn(async move {
                        let accepted = interceptor.intercept(stream, peer).await?;
                        serve_connection(accepted, &annotator, handler.as_ref(), limits)
                            .await
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            }
        }
    }
}
