// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use crate::api::longrunning::{operation, Operation as ProtoOperation, Status as ProtoStatus};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::codegen::{http, BoxFuture, Context, Poll, Service};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::transport::Server;

/// One request as the server saw it.
#[derive(Debug, Clone, PartialEq)]
struct SeenRequest {
    method: &'static str,
    name: String,
    authorization: Option<String>,
    quota_project: Option<String>,
}

/// An in-process `google.longrunning.Operations` server.
#[derive(Clone, Default)]
struct MockOperations {
    operations: Arc<HashMap<String, ProtoOperation>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl MockOperations {
    fn new(operations: Vec<ProtoOperation>) -> Self {
        Self {
            operations: Arc::new(operations.into_iter().map(|op| (op.name.clone(), op)).collect()),
            seen: Arc::default(),
        }
    }

    fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().unwrap().clone()
    }

    fn record<T>(&self, method: &'static str, name: &str, request: &tonic::Request<T>) {
        let header = |key: &str| {
            request
                .metadata()
                .get(key)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.seen.lock().unwrap().push(SeenRequest {
            method,
            name: name.to_string(),
            authorization: header("authorization"),
            quota_project: header("x-goog-user-project"),
        });
    }
}

struct GetOperationSvc(MockOperations);

impl UnaryService<GetOperationRequest> for GetOperationSvc {
    type Response = ProtoOperation;
    type Future = BoxFuture<tonic::Response<ProtoOperation>, tonic::Status>;

    fn call(&mut self, request: tonic::Request<GetOperationRequest>) -> Self::Future {
        let mock = self.0.clone();
        Box::pin(async move {
            let name = request.get_ref().name.clone();
            mock.record("GetOperation", &name, &request);
            mock.operations
                .get(&name)
                .cloned()
                .map(tonic::Response::new)
                .ok_or_else(|| tonic::Status::not_found(format!("operation {name} not found")))
        })
    }
}

struct CancelOperationSvc(MockOperations);

impl UnaryService<CancelOperationRequest> for CancelOperationSvc {
    type Response = ();
    type Future = BoxFuture<tonic::Response<()>, tonic::Status>;

    fn call(&mut self, request: tonic::Request<CancelOperationRequest>) -> Self::Future {
        let mock = self.0.clone();
        Box::pin(async move {
            let name = request.get_ref().name.clone();
            mock.record("CancelOperation", &name, &request);
            Ok(tonic::Response::new(()))
        })
    }
}

impl Service<http::Request<tonic::body::Body>> for MockOperations {
    type Response = http::Response<tonic::body::Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Infallible>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<tonic::body::Body>) -> Self::Future {
        let mock = self.clone();
        match req.uri().path() {
            "/google.longrunning.Operations/GetOperation" => Box::pin(async move {
                let mut grpc = Grpc::new(tonic_prost::ProstCodec::default());
                Ok(grpc.unary(GetOperationSvc(mock), req).await)
            }),
            "/google.longrunning.Operations/CancelOperation" => Box::pin(async move {
                let mut grpc = Grpc::new(tonic_prost::ProstCodec::default());
                Ok(grpc.unary(CancelOperationSvc(mock), req).await)
            }),
            _ => Box::pin(async move {
                Ok(tonic::Status::unimplemented("unknown method").into_http())
            }),
        }
    }
}

impl NamedService for MockOperations {
    const NAME: &'static str = "google.longrunning.Operations";
}

async fn serve(mock: MockOperations) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(
        Server::builder()
            .add_service(mock)
            .serve_with_incoming(TcpListenerStream::new(listener)),
    );

    format!("http://{addr}")
}

fn any(type_url: &str, value: &[u8]) -> prost_types::Any {
    prost_types::Any {
        type_url: type_url.to_string(),
        value: value.to_vec(),
    }
}

#[test]
fn test_default_config() {
    let config = ClientConfig::default();
    assert_eq!(config.endpoint, "https://127.0.0.1:443");
    assert!(config.access_token.is_none());
    assert!(config.quota_project.is_none());
    assert!(config.ca_path.is_none());
    assert_eq!(config.request_timeout, Some(Duration::from_secs(60)));
}

#[test]
fn test_config_builder() {
    let config = ClientConfig::new("https://run.googleapis.com")
        .with_access_token("ya29.token")
        .with_quota_project("billing")
        .with_request_timeout(Duration::from_secs(5));

    assert_eq!(config.endpoint, "https://run.googleapis.com");
    assert_eq!(config.access_token.as_deref(), Some("ya29.token"));
    assert_eq!(config.quota_project.as_deref(), Some("billing"));
    assert_eq!(config.request_timeout, Some(Duration::from_secs(5)));
}

#[tokio::test]
async fn test_new_client_invalid_ca_path() {
    let config = ClientConfig::new("https://example.com")
        .with_ca_path("/nonexistent/path_12345.pem");

    let result = GrpcOperationsClient::new(config).await;
    match result {
        Err(LroError::Config(msg)) => assert!(msg.contains("Failed to read CA cert")),
        other => panic!("Expected Config error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_new_client_invalid_endpoint() {
    let result = GrpcOperationsClient::new(ClientConfig::new("http://exa mple.com")).await;
    assert!(matches!(result, Err(LroError::Config(_))));
}

#[tokio::test]
async fn test_new_client_no_listener() {
    let config = ClientConfig::new("http://127.0.0.1:1");
    let result = GrpcOperationsClient::new(config).await;
    assert!(matches!(result, Err(LroError::Transport(_))));
}

#[tokio::test]
async fn test_lazy_client_fails_on_first_call() {
    let config = ClientConfig::new("http://127.0.0.1:1")
        .with_access_token("secret")
        .with_request_timeout(Duration::from_secs(2));
    let client = GrpcOperationsClient::new_lazy(config).unwrap();

    let err = client.get_operation("operations/op-1").await.unwrap_err();
    assert!(matches!(err, LroError::Api(_)));
    assert!(!err.is_not_found());
}

#[test]
fn test_debug_does_not_leak_token() {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let client = GrpcOperationsClient::new_lazy(
            ClientConfig::new("http://127.0.0.1:1").with_access_token("secret"),
        )
        .unwrap();
        let debug = format!("{client:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret"));
    });
}

#[tokio::test]
async fn test_get_failed_operation_over_grpc() {
    let mock = MockOperations::new(vec![ProtoOperation {
        name: "operations/op-2".to_string(),
        metadata: None,
        done: true,
        result: Some(operation::Result::Error(ProtoStatus {
            code: 13,
            message: "internal".to_string(),
            details: vec![any("type.googleapis.com/google.rpc.ErrorInfo", b"quota")],
        })),
    }]);
    let endpoint = serve(mock.clone()).await;
    let config = ClientConfig::new(endpoint)
        .with_access_token("ya29.token")
        .with_quota_project("billing");
    let client = GrpcOperationsClient::new(config).await.unwrap();

    let op = client.get_operation("operations/op-2").await.unwrap();

    assert!(op.is_done());
    assert!(op.response.is_none());
    let failure = op.failure().unwrap();
    assert_eq!(failure.code, 13);
    assert_eq!(failure.message, "internal");
    assert_eq!(failure.details[0]["@type"], "type.googleapis.com/google.rpc.ErrorInfo");
    assert_eq!(failure.details[0]["value"], "cXVvdGE=");

    assert_eq!(
        mock.seen(),
        vec![SeenRequest {
            method: "GetOperation",
            name: "operations/op-2".to_string(),
            authorization: Some("Bearer ya29.token".to_string()),
            quota_project: Some("billing".to_string()),
        }]
    );
}

#[tokio::test]
async fn test_get_finished_operation_over_grpc() {
    let mock = MockOperations::new(vec![ProtoOperation {
        name: "operations/op-1".to_string(),
        metadata: Some(any("type.googleapis.com/google.cloud.run.v2.OperationMetadata", b"")),
        done: true,
        result: Some(operation::Result::Response(any(
            "type.googleapis.com/google.cloud.run.v2.Service",
            b"svc",
        ))),
    }]);
    let client = GrpcOperationsClient::new(ClientConfig::new(serve(mock.clone()).await))
        .await
        .unwrap();

    let op = client.get_operation("operations/op-1").await.unwrap();

    assert!(op.is_done());
    assert!(op.failure().is_none());
    assert_eq!(op.response_type(), Some("type.googleapis.com/google.cloud.run.v2.Service"));
    assert_eq!(op.response.as_ref().unwrap()["value"], "c3Zj");
    assert_eq!(
        op.metadata.as_ref().unwrap()["@type"],
        "type.googleapis.com/google.cloud.run.v2.OperationMetadata"
    );

    let seen = mock.seen();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].authorization.is_none());
    assert!(seen[0].quota_project.is_none());
}

#[tokio::test]
async fn test_missing_operation_over_grpc_is_not_found() {
    let mock = MockOperations::new(vec![]);
    let client = GrpcOperationsClient::new(ClientConfig::new(serve(mock).await))
        .await
        .unwrap();

    let err = client.get_operation("operations/gone").await.unwrap_err();
    assert!(err.is_not_found());
    match err {
        LroError::Api(status) => assert!(status.message().contains("operations/gone")),
        other => panic!("Expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancel_operation_over_grpc() {
    let mock = MockOperations::new(vec![]);
    let client = GrpcOperationsClient::new(ClientConfig::new(serve(mock.clone()).await))
        .await
        .unwrap();

    client.cancel_operation("operations/op-3").await.unwrap();

    let seen = mock.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "CancelOperation");
    assert_eq!(seen[0].name, "operations/op-3");
}

#[tokio::test]
async fn test_unimplemented_method_over_grpc() {
    let mock = MockOperations::new(vec![]);
    let client = GrpcOperationsClient::new(ClientConfig::new(serve(mock).await))
        .await
        .unwrap();

    let err = client.delete_operation("operations/op-3").await.unwrap_err();
    match err {
        LroError::Api(status) => assert_eq!(status.code(), tonic::Code::Unimplemented),
        other => panic!("Expected Api error, got {other:?}"),
    }
}
