//! Spot instrument gRPC client.

use async_trait::async_trait;
use tonic::Request;
use tonic::metadata::MetadataValue;
use tonic::transport::{Channel, Endpoint};
use tracing::field::Empty;

use super::config::SpotInstrumentConfig;
use super::error::SpotInstrumentError;
use super::retry::{RetryPolicy, is_retryable};
use crate::application::ports::{MarketValidatorError, MarketValidatorPort};
use crate::domain::{Market, UserRole};
use crate::infrastructure::grpc::REQUEST_ID_HEADER;
use crate::infrastructure::grpc::converters::{market_from_proto, role_to_proto};
use crate::infrastructure::grpc::proto::spot_instrument::v1::{
    ViewMarketsRequest, spot_instrument_service_client::SpotInstrumentServiceClient,
};

/// Client for the spot instrument service.
///
/// Cloning is cheap; clones share the underlying channel.
#[derive(Debug, Clone)]
pub struct SpotInstrumentClient {
    inner: SpotInstrumentServiceClient<Channel>,
    config: SpotInstrumentConfig,
}

impl SpotInstrumentClient {
    /// Connect eagerly.
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is invalid or unreachable.
    pub async fn connect(config: &SpotInstrumentConfig) -> Result<Self, SpotInstrumentError> {
        let channel = Self::create_endpoint(config)?
            .connect()
            .await
            .map_err(|e| SpotInstrumentError::InvalidConfig {
                message: format!("connect to {} failed: {e}", config.endpoint),
            })?;

        tracing::info!(endpoint = %config.endpoint, "Connected to spot instrument service");

        Ok(Self {
            inner: SpotInstrumentServiceClient::new(channel),
            config: config.clone(),
        })
    }

    /// Connect lazily (connection established on first request).
    ///
    /// # Errors
    ///
    /// Returns error if the endpoint is invalid.
    pub fn connect_lazy(config: &SpotInstrumentConfig) -> Result<Self, SpotInstrumentError> {
        let channel = Self::create_endpoint(config)?.connect_lazy();

        tracing::debug!(endpoint = %config.endpoint, "Created lazy connection to spot instrument service");

        Ok(Self {
            inner: SpotInstrumentServiceClient::new(channel),
            config: config.clone(),
        })
    }

    fn create_endpoint(config: &SpotInstrumentConfig) -> Result<Endpoint, SpotInstrumentError> {
        let endpoint = Channel::from_shared(config.endpoint.clone())
            .map_err(|e| SpotInstrumentError::InvalidConfig {
                message: format!("invalid endpoint: {e}"),
            })?
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .tcp_keepalive(Some(config.tcp_keepalive))
            .tcp_nodelay(true);

        Ok(endpoint)
    }

    /// List markets visible to `roles`, retrying transient failures.
    ///
    /// Every attempt carries `request_id` as `x-request-id` metadata.
    ///
    /// # Errors
    ///
    /// Returns error on a non-retryable status, once retries are
    /// exhausted, or if a market in the response does not decode.
    #[tracing::instrument(
        name = "spot_instrument.view_markets",
        skip_all,
        fields(request_id = %request_id, roles = ?roles, attempts = Empty)
    )]
    pub async fn fetch_markets(
        &self,
        roles: &[UserRole],
        request_id: &str,
    ) -> Result<Vec<Market>, SpotInstrumentError> {
        let message = ViewMarketsRequest {
            user_roles: roles.iter().map(|r| role_to_proto(*r) as i32).collect(),
        };
        let header = match MetadataValue::try_from(request_id) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(error = %e, "Request ID is not valid metadata, not forwarded");
                None
            }
        };
        let mut policy = RetryPolicy::new(self.config.retry.clone());

        loop {
            let mut request = Request::new(message.clone());
            if let Some(value) = &header {
                request.metadata_mut().insert(REQUEST_ID_HEADER, value.clone());
            }

            let mut client = self.inner.clone();
            let outcome = client.view_markets(request).await;
            tracing::Span::current().record("attempts", policy.attempts());
            match outcome {
                Ok(response) => {
                    return response
                        .into_inner()
                        .markets
                        .into_iter()
                        .map(market_from_proto)
                        .collect::<Result<Vec<_>, _>>()
                        .map_err(|e| SpotInstrumentError::InvalidResponse {
                            message: e.to_string(),
                        });
                }
                Err(status) if is_retryable(status.code()) => {
                    let Some(delay) = policy.next_delay() else {
                        return Err(SpotInstrumentError::RetriesExhausted {
                            attempts: policy.attempts(),
                            message: status.message().to_string(),
                        });
                    };
                    tracing::warn!(
                        code = ?status.code(),
                        attempt = policy.attempts() - 1,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "ViewMarkets failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(status) => return Err(status.into()),
            }
        }
    }
}

#[async_trait]
impl MarketValidatorPort for SpotInstrumentClient {
    async fn view_markets(
        &self,
        roles: &[UserRole],
        request_id: &str,
    ) -> Result<Vec<Market>, MarketValidatorError> {
        self.fetch_markets(roles, request_id).await.map_err(Into::into)
    }
}
