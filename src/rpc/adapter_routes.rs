//! JSON gateway for the adapter service
//!
//! One POST route per RPC method, nested under `/adapter.Adapter`:
//!
//! | Route                     | Request       | Response  |
//! |---------------------------|---------------|-----------|
//! | `/adapter.Adapter/List`   | `ListRequest` | `Classes` |
//! | `/adapter.Adapter/Get`    | `GetRequest`  | `Class`   |
//! | `/adapter.Adapter/Create` | `Class`       | `Class`   |
//! | `/adapter.Adapter/Update` | `Class`       | `Class`   |
//! | `/adapter.Adapter/Delete` | `Class`       | `Empty`   |
//!
//! `List` also accepts an empty body.

use std::sync::Arc;

use axum::{extract::State, routing::post, Json, Router};

use super::adapter::AdapterState;
use super::errors::RpcResult;
use super::messages::{Class, Classes, Empty, GetRequest, ListRequest};

/// Create adapter routes
pub fn adapter_routes(state: Arc<AdapterState>) -> Router {
    Router::new()
        .route("/List", post(list_handler))
        .route("/Get", post(get_handler))
        .route("/Create", post(create_handler))
        .route("/Update", post(update_handler))
        .route("/Delete", post(delete_handler))
        .with_state(state)
}

async fn list_handler(
    State(state): State<Arc<AdapterState>>,
    _req: Option<Json<ListRequest>>,
) -> RpcResult<Json<Classes>> {
    let records = state.list().await?;
    Ok(Json(Classes::from(records)))
}

async fn get_handler(
    State(state): State<Arc<AdapterState>>,
    Json(req): Json<GetRequest>,
) -> RpcResult<Json<Class>> {
    let record = state.get(req.id).await?;
    Ok(Json(Class::from(record)))
}

async fn create_handler(
    State(state): State<Arc<AdapterState>>,
    Json(class): Json<Class>,
) -> RpcResult<Json<Class>> {
    let record = state.create(class.into()).await?;
    Ok(Json(Class::from(record)))
}

async fn update_handler(
    State(state): State<Arc<AdapterState>>,
    Json(class): Json<Class>,
) -> RpcResult<Json<Class>> {
    let record = state.update(class.into()).await?;
    Ok(Json(Class::from(record)))
}

async fn delete_handler(
    State(state): State<Arc<AdapterState>>,
    Json(class): Json<Class>,
) -> RpcResult<Json<Empty>> {
    state.delete(class.into()).await?;
    Ok(Json(Empty {}))
}
