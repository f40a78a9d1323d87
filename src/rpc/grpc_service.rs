//! gRPC binding of the adapter service

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::store::ClassRecord;

use super::adapter::AdapterState;
use super::pb::{self, adapter_server::Adapter};

/// `adapter.Adapter` over tonic
#[derive(Clone)]
pub struct AdapterService {
    state: Arc<AdapterState>,
}

impl AdapterService {
    pub fn new(state: Arc<AdapterState>) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl Adapter for AdapterService {
    async fn list(
        &self,
        _request: Request<pb::ListRequest>,
    ) -> Result<Response<pb::Classes>, Status> {
        let records = self.state.list().await?;
        Ok(Response::new(pb::Classes {
            classes: records.into_iter().map(pb::Class::from).collect(),
        }))
    }

    async fn get(&self, request: Request<pb::GetRequest>) -> Result<Response<pb::Class>, Status> {
        let record = self.state.get(request.into_inner().id).await?;
        Ok(Response::new(record.into()))
    }

    async fn create(&self, request: Request<pb::Class>) -> Result<Response<pb::Class>, Status> {
        let record = self.state.create(request.into_inner().into()).await?;
        Ok(Response::new(record.into()))
    }

    async fn update(&self, request: Request<pb::Class>) -> Result<Response<pb::Class>, Status> {
        let record = self.state.update(request.into_inner().into()).await?;
        Ok(Response::new(record.into()))
    }

    async fn delete(&self, request: Request<pb::Class>) -> Result<Response<pb::Empty>, Status> {
        self.state.delete(request.into_inner().into()).await?;
        Ok(Response::new(pb::Empty {}))
    }
}

impl From<ClassRecord> for pb::Class {
    fn from(record: ClassRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            semester: record.semester,
        }
    }
}

impl From<pb::Class> for ClassRecord {
    fn from(class: pb::Class) -> Self {
        ClassRecord::new(class.id, class.name, class.semester)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Engine;
    use crate::rpc::ErrorPolicy;
    use crate::store::ClassStore;
    use tonic::Code;

    fn service(policy: ErrorPolicy) -> AdapterService {
        let store = ClassStore::new(Arc::new(Engine::in_memory()));
        AdapterService::new(Arc::new(AdapterState::new(store, policy)))
    }

    fn cs101() -> pb::Class {
        pb::Class {
            id: "cs101".to_string(),
            name: "Intro to CS".to_string(),
            semester: "Fall2023".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let svc = service(ErrorPolicy::Surface);
        svc.create(Request::new(cs101())).await.unwrap();

        let fetched = svc
            .get(Request::new(pb::GetRequest {
                id: "cs101".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(fetched, cs101());
    }

    #[tokio::test]
    async fn test_surface_maps_missing_to_not_found() {
        let svc = service(ErrorPolicy::Surface);
        let status = svc
            .get(Request::new(pb::GetRequest {
                id: "ghost".to_string(),
            }))
            .await
            .unwrap_err();
        assert_eq!(status.code(), Code::NotFound);
    }

    #[tokio::test]
    async fn test_delete_returns_empty() {
        let svc = service(ErrorPolicy::Suppress);
        svc.create(Request::new(cs101())).await.unwrap();
        svc.delete(Request::new(cs101())).await.unwrap();

        let listed = svc
            .list(Request::new(pb::ListRequest {}))
            .await
            .unwrap()
            .into_inner();
        assert!(listed.classes.is_empty());
    }
}
