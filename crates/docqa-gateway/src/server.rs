use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use docqa_core::DocQa;
use tokio::sync::watch;

use crate::error::GatewayError;
use crate::router::build_router;

#[derive(Clone)]
pub(crate) struct AppState {
    pub qa: DocQa,
    pub upload_dir: PathBuf,
    pub ask_timeout: Duration,
    pub started_at: Instant,
}

pub struct GatewayServer {
    addr: SocketAddr,
    max_body_size: usize,
    cors_origins: Vec<String>,
    ask_timeout: Duration,
    upload_dir: PathBuf,
    qa: DocQa,
    shutdown_rx: watch::Receiver<bool>,
}

impl GatewayServer {
    /// Build a server from the `[gateway]`, `[storage]` and `[timeouts]` settings of
    /// the service config.
    #[must_use]
    pub fn new(qa: DocQa, shutdown_rx: watch::Receiver<bool>) -> Self {
        let config = qa.config();
        let bind = config.gateway.bind.as_str();
        let port = config.gateway.port;
        let addr: SocketAddr = format!("{bind}:{port}").parse().unwrap_or_else(|e| {
            tracing::warn!("invalid bind '{bind}': {e}, falling back to 127.0.0.1:{port}");
            SocketAddr::from(([127, 0, 0, 1], port))
        });

        if bind == "0.0.0.0" {
            tracing::warn!("gateway binding to 0.0.0.0, reachable from other hosts");
        }

        Self {
            addr,
            max_body_size: config.gateway.max_body_size,
            cors_origins: config.gateway.cors_origins.clone(),
            ask_timeout: Duration::from_secs(config.timeouts.ask_secs),
            upload_dir: config.storage.upload_dir.clone(),
            qa,
            shutdown_rx,
        }
    }

    #[must_use]
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    #[must_use]
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    #[must_use]
    pub fn with_ask_timeout(mut self, timeout: Duration) -> Self {
        self.ask_timeout = timeout;
        self
    }

    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Start the HTTP gateway server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind or encounters a fatal I/O error.
    pub async fn serve(self) -> Result<(), GatewayError> {
        let state = AppState {
            qa: self.qa,
            upload_dir: self.upload_dir,
            ask_timeout: self.ask_timeout,
            started_at: Instant::now(),
        };

        let router = build_router(state, &self.cors_origins, self.max_body_size);

        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .map_err(|e| GatewayError::Bind(self.addr.to_string(), e))?;
        tracing::info!("gateway listening on {}", self.addr);

        let mut shutdown_rx = self.shutdown_rx;
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while !*shutdown_rx.borrow_and_update() {
                if shutdown_rx.changed().await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
            tracing::info!("gateway shutting down");
        })
        .await
        .map_err(|e| GatewayError::Server(format!("{e}")))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use docqa_core::Config;

    use super::*;

    async fn test_qa(config: Config) -> DocQa {
        let mut config = config;
        config.storage.sqlite_path = ":memory:".into();
        DocQa::open(config).await.unwrap()
    }

    #[tokio::test]
    async fn server_reads_gateway_config() {
        let mut config = Config::default();
        config.gateway.port = 8090;
        config.timeouts.ask_secs = 7;
        let (_tx, rx) = watch::channel(false);
        let server = GatewayServer::new(test_qa(config).await, rx);

        assert_eq!(server.addr().port(), 8090);
        assert_eq!(server.ask_timeout, Duration::from_secs(7));
        assert_eq!(server.cors_origins.len(), 3);
    }

    #[tokio::test]
    async fn server_builder_chain() {
        let (_tx, rx) = watch::channel(false);
        let server = GatewayServer::new(test_qa(Config::default()).await, rx)
            .with_max_body_size(512)
            .with_cors_origins(vec!["http://example.test".into()])
            .with_ask_timeout(Duration::from_secs(1));

        assert_eq!(server.max_body_size, 512);
        assert_eq!(server.cors_origins, vec!["http://example.test".to_owned()]);
        assert_eq!(server.ask_timeout, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn server_invalid_bind_fallback() {
        let mut config = Config::default();
        config.gateway.bind = "not_an_ip".into();
        config.gateway.port = 9999;
        let (_tx, rx) = watch::channel(false);
        let server = GatewayServer::new(test_qa(config).await, rx);
        assert_eq!(server.addr(), SocketAddr::from(([127, 0, 0, 1], 9999)));
    }

    #[tokio::test]
    async fn serve_stops_on_shutdown_signal() {
        let mut config = Config::default();
        config.gateway.port = 0;
        let (tx, rx) = watch::channel(false);
        let server = GatewayServer::new(test_qa(config).await, rx);

        let handle = tokio::spawn(server.serve());
        tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
