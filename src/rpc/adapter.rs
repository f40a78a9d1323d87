//! Adapter service operations shared by both transports
//!
//! Store calls block on fsync, so every call runs on the blocking pool. The
//! error policy is applied here, once, before any transport maps the result.

use crate::observability::CallScope;
use crate::store::{ClassRecord, ClassStore, Outcome};

use super::config::ErrorPolicy;
use super::errors::{RpcError, RpcResult};

/// Fully qualified name of the record service
pub const ADAPTER_SERVICE: &str = "adapter.Adapter";

/// State shared by the gRPC service and the JSON gateway
pub struct AdapterState {
    pub store: ClassStore,
    pub error_policy: ErrorPolicy,
}

impl AdapterState {
    pub fn new(store: ClassStore, error_policy: ErrorPolicy) -> Self {
        Self {
            store,
            error_policy,
        }
    }

    pub async fn list(&self) -> RpcResult<Vec<ClassRecord>> {
        let scope = CallScope::begin("RPC_LIST", &[]);
        let store = self.store.clone();
        let outcome = run_blocking(move || store.list()).await?;
        self.resolve(outcome, scope)
    }

    pub async fn get(&self, id: String) -> RpcResult<ClassRecord> {
        let scope = CallScope::begin("RPC_GET", &[("id", id.as_str())]);
        let store = self.store.clone();
        let outcome = run_blocking(move || store.get(&id)).await?;
        self.resolve(outcome, scope)
    }

    pub async fn create(&self, record: ClassRecord) -> RpcResult<ClassRecord> {
        let scope = CallScope::begin("RPC_CREATE", &[("id", record.id.as_str())]);
        let store = self.store.clone();
        let outcome = run_blocking(move || store.create(record)).await?;
        self.resolve(outcome, scope)
    }

    pub async fn update(&self, record: ClassRecord) -> RpcResult<ClassRecord> {
        let scope = CallScope::begin("RPC_UPDATE", &[("id", record.id.as_str())]);
        let store = self.store.clone();
        let outcome = run_blocking(move || store.update(record)).await?;
        self.resolve(outcome, scope)
    }

    pub async fn delete(&self, record: ClassRecord) -> RpcResult<()> {
        let scope = CallScope::begin("RPC_DELETE", &[("id", record.id.as_str())]);
        let store = self.store.clone();
        let outcome = run_blocking(move || store.delete(&record)).await?;
        self.resolve(outcome, scope)
    }

    /// Applies the error policy to a store outcome and closes the call scope.
    fn resolve<T>(&self, outcome: Outcome<T>, scope: CallScope) -> RpcResult<T> {
        match outcome.into_parts() {
            (value, None) => {
                scope.complete(&[]);
                Ok(value)
            }
            (value, Some(err)) => match self.error_policy {
                ErrorPolicy::Suppress => {
                    scope.complete(&[("suppressed_error", err.code())]);
                    Ok(value)
                }
                ErrorPolicy::Surface => {
                    scope.fail(&err.to_string());
                    Err(RpcError::from(err))
                }
            },
        }
    }
}

async fn run_blocking<T, F>(f: F) -> RpcResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| RpcError::Internal(format!("Store task failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::engine::Engine;

    fn state(policy: ErrorPolicy) -> AdapterState {
        AdapterState::new(ClassStore::new(Arc::new(Engine::in_memory())), policy)
    }

    #[tokio::test]
    async fn test_suppress_returns_partial_value() {
        let state = state(ErrorPolicy::Suppress);
        let record = state.get("ghost".to_string()).await.unwrap();
        assert_eq!(record, ClassRecord::new("ghost", "", ""));
    }

    #[tokio::test]
    async fn test_surface_returns_not_found() {
        let state = state(ErrorPolicy::Surface);
        let err = state.get("ghost".to_string()).await.unwrap_err();
        assert!(matches!(err, RpcError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let state = state(ErrorPolicy::Surface);
        state
            .create(ClassRecord::new("cs101", "Intro to CS", "Fall2023"))
            .await
            .unwrap();
        let records = state.list().await.unwrap();
        assert_eq!(records, vec![ClassRecord::new("cs101", "Intro to CS", "Fall2023")]);
    }
}
