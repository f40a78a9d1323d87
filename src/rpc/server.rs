//! # RPC Server
//!
//! Serves `adapter.Adapter` over gRPC, together with `grpc.health.v1.Health`
//! and server reflection. When `http_port` is set, the same adapter state is
//! also served as a JSON gateway through axum. Both listeners stop when the
//! shutdown future resolves.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::observability::{log_event_with_fields, Event};
use crate::store::ClassStore;

use super::adapter::{AdapterState, ADAPTER_SERVICE};
use super::adapter_routes::adapter_routes;
use super::config::RpcServerConfig;
use super::grpc_service::AdapterService;
use super::health_routes::health_routes;
use super::pb::{self, adapter_server::AdapterServer};

/// RPC server for the class record service
pub struct RpcServer {
    config: RpcServerConfig,
    state: Arc<AdapterState>,
}

impl RpcServer {
    /// Create a server over `store` with the given configuration
    pub fn new(store: ClassStore, config: RpcServerConfig) -> Self {
        let state = Arc::new(AdapterState::new(store, config.error_policy));
        Self { config, state }
    }

    /// gRPC socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// JSON gateway router
    pub fn router(&self) -> Router {
        let cors = if self.config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            let origins: Vec<_> = self
                .config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .merge(health_routes())
            .nest(
                &format!("/{}", ADAPTER_SERVICE),
                adapter_routes(Arc::clone(&self.state)),
            )
            .layer(cors)
    }

    /// Bind the configured addresses and serve until `shutdown` resolves.
    pub async fn start<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let grpc = TcpListener::bind(parse_addr(&self.config.socket_addr())?).await?;
        let http = match self.config.http_socket_addr() {
            Some(addr) => Some(TcpListener::bind(parse_addr(&addr)?).await?),
            None => None,
        };
        self.serve(grpc, http, shutdown).await
    }

    /// Serve on already bound listeners until `shutdown` resolves.
    ///
    /// If either server fails, the other is dropped and the error returned.
    pub async fn serve<F>(
        self,
        grpc: TcpListener,
        http: Option<TcpListener>,
        shutdown: F,
    ) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(async move {
            shutdown.await;
            let _ = stop_tx.send(true);
        });

        let grpc_server = self.serve_grpc(grpc, stopped(stop_rx.clone()));
        match http {
            Some(listener) => {
                let gateway = self.serve_gateway(listener, stopped(stop_rx));
                tokio::try_join!(grpc_server, gateway).map(|_| ())
            }
            None => grpc_server.await,
        }
    }

    async fn serve_grpc<F>(&self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?.to_string();

        let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
        health_reporter
            .set_serving::<AdapterServer<AdapterService>>()
            .await;

        let reflection_v1 = reflection().build_v1().map_err(reflection_error)?;
        let reflection_v1alpha = reflection().build_v1alpha().map_err(reflection_error)?;
        let adapter = AdapterServer::new(AdapterService::new(Arc::clone(&self.state)));

        log_event_with_fields(
            Event::Serving,
            &[
                ("addr", local_addr.as_str()),
                ("transport", "grpc"),
                ("error_policy", self.config.error_policy.as_str()),
                ("service", ADAPTER_SERVICE),
            ],
        );

        Server::builder()
            .add_service(health_service)
            .add_service(reflection_v1)
            .add_service(reflection_v1alpha)
            .add_service(adapter)
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
            .await
            .map_err(|e| {
                io::Error::new(io::ErrorKind::Other, format!("gRPC server failed: {}", e))
            })
    }

    async fn serve_gateway<F>(&self, listener: TcpListener, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener.local_addr()?.to_string();
        log_event_with_fields(
            Event::Serving,
            &[
                ("addr", local_addr.as_str()),
                ("transport", "json"),
                ("error_policy", self.config.error_policy.as_str()),
                ("service", ADAPTER_SERVICE),
            ],
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
    }
}

fn parse_addr(addr: &str) -> io::Result<SocketAddr> {
    addr.parse().map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("Invalid socket address {}: {}", addr, e),
        )
    })
}

fn reflection() -> tonic_reflection::server::Builder<'static> {
    tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(pb::FILE_DESCRIPTOR_SET)
        .register_encoded_file_descriptor_set(tonic_health::pb::FILE_DESCRIPTOR_SET)
}

fn reflection_error(e: tonic_reflection::server::Error) -> io::Error {
    io::Error::new(
        io::ErrorKind::Other,
        format!("Failed to build reflection service: {}", e),
    )
}

/// Resolves once the shutdown flag is raised or its sender is gone.
async fn stopped(mut stop: watch::Receiver<bool>) {
    while !*stop.borrow_and_update() {
        if stop.changed().await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::rpc::config::ErrorPolicy;

    fn store() -> ClassStore {
        ClassStore::new(Arc::new(Engine::in_memory()))
    }

    #[test]
    fn test_server_default_addr() {
        let server = RpcServer::new(store(), RpcServerConfig::default());
        assert_eq!(server.socket_addr(), "0.0.0.0:50051");
    }

    #[test]
    fn test_router_builds_with_origins() {
        let config = RpcServerConfig {
            cors_origins: vec!["http://localhost:3000".to_string()],
            error_policy: ErrorPolicy::Surface,
            ..RpcServerConfig::with_port(8080)
        };
        let server = RpcServer::new(store(), config);
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
        let _router = server.router();
    }

    #[tokio::test]
    async fn test_serve_stops_on_shutdown() {
        let grpc = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let http = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = RpcServer::new(store(), RpcServerConfig::default());
        server.serve(grpc, Some(http), async {}).await.unwrap();
    }

    #[tokio::test]
    async fn test_grpc_only_stops_on_shutdown() {
        let grpc = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let server = RpcServer::new(store(), RpcServerConfig::default());
        server.serve(grpc, None, async {}).await.unwrap();
    }

    #[tokio::test]
    async fn test_stopped_after_sender_dropped() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        stopped(rx).await;
    }
}
