//! # classkv RPC Module
//!
//! Remote procedure interface for the class record store.
//!
//! # gRPC (`port`, default 50051)
//!
//! - `adapter.Adapter` - List, Get, Create, Update, Delete (`proto/adapter.proto`)
//! - `grpc.health.v1.Health` - standard health checking
//! - `grpc.reflection.v1` and `v1alpha` - server reflection
//!
//! # JSON gateway (`http_port`, disabled by default)
//!
//! - `POST /adapter.Adapter/{List,Get,Create,Update,Delete}` - record service
//! - `GET /health`, `POST /grpc.health.v1.Health/Check` - health

pub mod adapter;
pub mod adapter_routes;
pub mod config;
pub mod errors;
pub mod grpc_service;
pub mod health_routes;
pub mod messages;
pub mod server;

/// Code generated from `proto/adapter.proto`
pub mod pb {
    tonic::include_proto!("adapter");

    /// Encoded descriptors for server reflection
    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("adapter_descriptor");
}

pub use adapter::{AdapterState, ADAPTER_SERVICE};
pub use config::{ErrorPolicy, RpcServerConfig};
pub use errors::{RpcError, RpcResult};
pub use grpc_service::AdapterService;
pub use messages::{Class, Classes, Empty, GetRequest, ListRequest};
pub use server::RpcServer;
