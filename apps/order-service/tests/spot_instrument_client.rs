//! Spot Instrument Client Integration Tests
//!
//! Runs the client against an in-process `SpotInstrumentService` that can be
//! told to fail, and checks the retry and error mapping behaviour.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tonic::transport::Server;
use tonic::{Code, Request, Response, Status};

use order_service::infrastructure::spot_instrument::{
    RetryConfig, SpotInstrumentClient, SpotInstrumentConfig, SpotInstrumentError,
};
use order_service::spot_proto::{
    Market, ViewMarketsRequest, ViewMarketsResponse,
    spot_instrument_service_server::{SpotInstrumentService, SpotInstrumentServiceServer},
};
use order_service::{
    MarketId, MarketValidatorError, MarketValidatorPort, REQUEST_ID_HEADER, UserRole, common_proto,
};

/// Scripted spot instrument service.
struct FakeSpotService {
    markets: Vec<Market>,
    failures: Mutex<VecDeque<Code>>,
    calls: Arc<AtomicUsize>,
    request_ids: Arc<Mutex<Vec<Option<String>>>>,
}

#[tonic::async_trait]
impl SpotInstrumentService for FakeSpotService {
    async fn view_markets(
        &self,
        request: Request<ViewMarketsRequest>,
    ) -> Result<Response<ViewMarketsResponse>, Status> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let request_id = request
            .metadata()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.request_ids.lock().push(request_id);
        if let Some(code) = self.failures.lock().pop_front() {
            return Err(Status::new(code, "injected failure"));
        }

        let roles = request.into_inner().user_roles;
        let markets = self
            .markets
            .iter()
            .filter(|m| m.allowed_roles.iter().any(|r| roles.contains(r)))
            .cloned()
            .collect();
        Ok(Response::new(ViewMarketsResponse { markets }))
    }
}

fn proto_market(id: MarketId, roles: &[common_proto::UserRole]) -> Market {
    Market {
        id: id.to_string(),
        name: "ETH-USDT".to_string(),
        enabled: true,
        deleted_at: None,
        allowed_roles: roles.iter().map(|r| i32::from(*r)).collect(),
    }
}

fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig {
        initial_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
        max_retries,
        ..RetryConfig::default()
    }
}

/// Endpoint of a running fake plus what it observed.
struct FakeHandle {
    endpoint: String,
    calls: Arc<AtomicUsize>,
    request_ids: Arc<Mutex<Vec<Option<String>>>>,
}

/// Start the fake service on a random port.
async fn start_fake(markets: Vec<Market>, failures: Vec<Code>) -> FakeHandle {
    let calls = Arc::new(AtomicUsize::new(0));
    let request_ids = Arc::new(Mutex::new(Vec::new()));
    let service = FakeSpotService {
        markets,
        failures: Mutex::new(failures.into()),
        calls: Arc::clone(&calls),
        request_ids: Arc::clone(&request_ids),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        Server::builder()
            .add_service(SpotInstrumentServiceServer::new(service))
            .serve_with_incoming(tokio_stream::wrappers::TcpListenerStream::new(listener))
            .await
            .unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    FakeHandle {
        endpoint: format!("http://{addr}"),
        calls,
        request_ids,
    }
}

#[tokio::test]
async fn returns_markets_visible_to_roles() {
    let trader_market = MarketId::generate();
    let admin_market = MarketId::generate();
    let FakeHandle { endpoint, calls, .. } = start_fake(
        vec![
            proto_market(trader_market, &[common_proto::UserRole::Trader]),
            proto_market(admin_market, &[common_proto::UserRole::Admin]),
        ],
        vec![],
    )
    .await;

    let client = SpotInstrumentClient::connect(&SpotInstrumentConfig::new(endpoint))
        .await
        .unwrap();
    let markets = client.view_markets(&[UserRole::Trader], "req-1").await.unwrap();

    assert_eq!(markets.len(), 1);
    assert_eq!(markets[0].id, trader_market);
    assert_eq!(markets[0].allowed_roles, vec![UserRole::Trader]);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn request_id_is_sent_on_every_attempt() {
    let market_id = MarketId::generate();
    let fake = start_fake(
        vec![proto_market(market_id, &[common_proto::UserRole::Trader])],
        vec![Code::Unavailable],
    )
    .await;

    let config = SpotInstrumentConfig::new(fake.endpoint).with_retry(fast_retry(2));
    let client = SpotInstrumentClient::connect_lazy(&config).unwrap();
    client
        .view_markets(&[UserRole::Trader], "order-req-7")
        .await
        .unwrap();

    let seen = fake.request_ids.lock().clone();
    assert_eq!(
        seen,
        vec![Some("order-req-7".to_string()), Some("order-req-7".to_string())]
    );
    assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let market_id = MarketId::generate();
    let FakeHandle { endpoint, calls, .. } = start_fake(
        vec![proto_market(market_id, &[common_proto::UserRole::Viewer])],
        vec![Code::Unavailable, Code::DeadlineExceeded],
    )
    .await;

    let config = SpotInstrumentConfig::new(endpoint).with_retry(fast_retry(2));
    let client = SpotInstrumentClient::connect_lazy(&config).unwrap();
    let markets = client.view_markets(&[UserRole::Viewer], "req-1").await.unwrap();

    assert_eq!(markets.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhausted_retries_report_attempts() {
    let FakeHandle { endpoint, calls, .. } = start_fake(
        vec![],
        vec![Code::Unavailable, Code::Unavailable, Code::Unavailable],
    )
    .await;

    let config = SpotInstrumentConfig::new(endpoint).with_retry(fast_retry(1));
    let client = SpotInstrumentClient::connect_lazy(&config).unwrap();
    let err = client.fetch_markets(&[UserRole::Trader], "req-1").await.unwrap_err();

    assert!(matches!(
        err,
        SpotInstrumentError::RetriesExhausted { attempts: 2, .. }
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(matches!(
        MarketValidatorError::from(err),
        MarketValidatorError::Unavailable(_)
    ));
}

#[tokio::test]
async fn permanent_failure_is_not_retried() {
    let FakeHandle { endpoint, calls, .. } =
        start_fake(vec![], vec![Code::PermissionDenied]).await;

    let config = SpotInstrumentConfig::new(endpoint).with_retry(fast_retry(3));
    let client = SpotInstrumentClient::connect_lazy(&config).unwrap();
    let err = client.view_markets(&[UserRole::Trader], "req-1").await.unwrap_err();

    assert!(matches!(err, MarketValidatorError::Rejected(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn malformed_market_is_invalid_response() {
    let mut bad = proto_market(MarketId::generate(), &[common_proto::UserRole::Trader]);
    bad.id = "not-a-uuid".to_string();
    let FakeHandle { endpoint, .. } = start_fake(vec![bad], vec![]).await;

    let client = SpotInstrumentClient::connect_lazy(&SpotInstrumentConfig::new(endpoint)).unwrap();
    let err = client.view_markets(&[UserRole::Trader], "req-1").await.unwrap_err();

    assert!(matches!(err, MarketValidatorError::InvalidResponse(_)));
}

#[tokio::test]
async fn unreachable_service_is_unavailable() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = SpotInstrumentConfig::new(format!("http://{addr}"))
        .with_connect_timeout(Duration::from_millis(200))
        .with_retry(fast_retry(1));
    let client = SpotInstrumentClient::connect_lazy(&config).unwrap();
    let err = client.view_markets(&[UserRole::Trader], "req-1").await.unwrap_err();

    assert!(matches!(err, MarketValidatorError::Unavailable(_)));
}
