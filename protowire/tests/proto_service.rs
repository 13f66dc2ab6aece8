//! End-to-end tests: generated clients talking to generated servers over a
//! real axum listener.

use std::net::SocketAddr;

use protowire::prelude::*;
use protowire::{proto_service, Verb};

#[proto_service]
pub trait Math {
    async fn add(&self, a: i32, b: i32) -> Result<i32, ProtoError>;
    async fn add_c(&self, a: i32, b: i32, token: CancellationToken) -> Result<i32, ProtoError>;
    async fn inc(&self) -> Result<(), ProtoError>;
    async fn div(&self, a: i32, b: i32) -> Result<i32, ProtoError>;
    async fn lookup(&self, id: i32) -> Result<i32, ProtoError>;
    fn sequence(&self, count: u32) -> BoxStream<'static, Result<u32, ProtoError>>;
}

struct MathImpl;

#[protowire::async_trait::async_trait]
impl Math for MathImpl {
    async fn add(&self, a: i32, b: i32) -> Result<i32, ProtoError> {
        Ok(a + b)
    }

    async fn add_c(&self, a: i32, b: i32, _token: CancellationToken) -> Result<i32, ProtoError> {
        Ok(a + b)
    }

    async fn inc(&self) -> Result<(), ProtoError> {
        Ok(())
    }

    async fn div(&self, a: i32, b: i32) -> Result<i32, ProtoError> {
        if b == 0 {
            return Err(ProtoError::service("math_error", "division by zero"));
        }
        Ok(a / b)
    }

    async fn lookup(&self, id: i32) -> Result<i32, ProtoError> {
        Err(ProtoError::status_coded(
            404,
            ErrorDescriptor::with_description("not_found", format!("no entry {id}")),
        ))
    }

    fn sequence(&self, count: u32) -> BoxStream<'static, Result<u32, ProtoError>> {
        Box::pin(protowire::futures_util::stream::iter((0..count).map(Ok)))
    }
}

#[proto_service(input = query)]
pub trait QueryMath {
    async fn add(&self, a: i32, b: i32) -> Result<i32, ProtoError>;
}

struct QueryMathImpl;

#[protowire::async_trait::async_trait]
impl QueryMath for QueryMathImpl {
    async fn add(&self, a: i32, b: i32) -> Result<i32, ProtoError> {
        Ok(a + b)
    }
}

#[proto_service(input = form)]
pub trait FormMath {
    async fn score(&self, name: String, bonus: Option<i32>) -> Result<String, ProtoError>;
}

struct FormMathImpl;

#[protowire::async_trait::async_trait]
impl FormMath for FormMathImpl {
    async fn score(&self, name: String, bonus: Option<i32>) -> Result<String, ProtoError> {
        Ok(match bonus {
            Some(bonus) => format!("{name}+{bonus}"),
            None => name,
        })
    }
}

async fn spawn(router: protowire::axum::Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        protowire::axum::serve(listener, router).await.unwrap();
    });
    addr
}

async fn math_client() -> MathClient {
    let addr = spawn(MathServer::new(MathImpl).into_router()).await;
    MathClient::with_endpoint(format!("http://{addr}"))
}

#[tokio::test]
async fn test_json_round_trip() {
    let client = math_client().await;
    assert_eq!(client.add(2, 3).await.unwrap(), 5);
    assert_eq!(client.add(-7, 7).await.unwrap(), 0);
}

#[tokio::test]
async fn test_void_method() {
    let client = math_client().await;
    client.inc().await.unwrap();
}

#[tokio::test]
async fn test_service_error_surfaces_code_and_message() {
    let client = math_client().await;
    let err = client.div(1, 0).await.unwrap_err();
    assert_eq!(err.error_code(), "math_error");
    assert_eq!(err.message(), "division by zero");
}

#[tokio::test]
async fn test_status_coded_error_keeps_its_code() {
    let client = math_client().await;
    let err = client.lookup(42).await.unwrap_err();
    assert_eq!(err.error_code(), "not_found");
    assert_eq!(err.message(), "no entry 42");
}

#[tokio::test]
async fn test_status_coded_error_status_on_the_wire() {
    let addr = spawn(MathServer::new(MathImpl).into_router()).await;
    let response = protowire::reqwest::Client::new()
        .post(format!("http://{addr}/math/lookup"))
        .header("content-type", "application/json")
        .body("42")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: protowire::serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_pre_cancelled_token_cancels_the_call() {
    let client = math_client().await;
    let token = CancellationToken::new();
    token.cancel();
    let err = client.add_c(1, 2, token).await.unwrap_err();
    assert!(err.is_cancelled());
}

#[tokio::test]
async fn test_uncancelled_token_passes_through() {
    let client = math_client().await;
    let token = CancellationToken::new();
    assert_eq!(client.add_c(1, 2, token).await.unwrap(), 3);
}

#[tokio::test]
async fn test_streaming_round_trip() {
    let client = math_client().await;
    let items: Vec<u32> = protowire::futures_util::TryStreamExt::try_collect(client.sequence(5))
        .await
        .unwrap();
    assert_eq!(items, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_query_round_trip() {
    let addr = spawn(QueryMathServer::new(QueryMathImpl).into_router()).await;
    let client = QueryMathClient::with_endpoint(format!("http://{addr}"));
    assert_eq!(client.add(20, 22).await.unwrap(), 42);
}

#[tokio::test]
async fn test_missing_query_parameter_reads_as_default() {
    let addr = spawn(QueryMathServer::new(QueryMathImpl).into_router()).await;
    let response = protowire::reqwest::get(format!("http://{addr}/query_math/add?a=5"))
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<i32>().await.unwrap(), 5);
}

#[tokio::test]
async fn test_malformed_query_parameter_is_a_generic_error() {
    let addr = spawn(QueryMathServer::new(QueryMathImpl).into_router()).await;
    let response = protowire::reqwest::get(format!("http://{addr}/query_math/add?a=abc"))
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    let body: protowire::serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "generic_error");
}

#[tokio::test]
async fn test_form_omitted_option_round_trips() {
    let addr = spawn(FormMathServer::new(FormMathImpl).into_router()).await;
    let client = FormMathClient::with_endpoint(format!("http://{addr}"));
    assert_eq!(client.score("ada".to_owned(), None).await.unwrap(), "ada");
    assert_eq!(
        client.score("ada".to_owned(), Some(5)).await.unwrap(),
        "ada+5"
    );
}

#[tokio::test]
async fn test_malformed_json_body_is_a_generic_error() {
    let addr = spawn(MathServer::new(MathImpl).into_router()).await;
    let response = protowire::reqwest::Client::new()
        .post(format!("http://{addr}/math/add"))
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 500);
    let body: protowire::serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "generic_error");
}

#[tokio::test]
async fn test_path_override_on_both_sides() {
    let router = MathServer::new(MathImpl).with_path("v1/arith").into_router();
    let addr = spawn(router).await;
    let configuration = EndpointConfiguration::from_pairs([
        ("Endpoint", format!("http://{addr}")),
        ("Path", "v1/arith".to_owned()),
    ]);
    let client = MathClient::new(&configuration, &DefaultHttpClientFactory::new());
    assert_eq!(client.add(2, 2).await.unwrap(), 4);
}

#[test]
fn test_route_table() {
    let server = MathServer::new(MathImpl);
    let entries = server.route_entries();
    let add = entries
        .iter()
        .find(|e| e.method == math_proto::Methods::Add)
        .unwrap();
    assert_eq!(add.path, "math/add");
    assert_eq!(add.verb, Verb::Post);
    let inc = entries
        .iter()
        .find(|e| e.method == math_proto::Methods::Inc)
        .unwrap();
    assert_eq!(inc.verb, Verb::Get);
}

#[test]
fn test_metadata() {
    assert_eq!(math_proto::SERVICE_PATH, "math");
    assert_eq!(math_proto::HTTP_CLIENT_PROFILE, "Math");
    assert_eq!(math_proto::Methods::COUNT, 6);
    assert_eq!(math_proto::Methods::AddC.method_id(), "add_c");
    assert!(math_proto::Methods::Inc.no_return());
    assert_eq!(query_math_proto::Methods::Add.verb(), Verb::Get);
}
