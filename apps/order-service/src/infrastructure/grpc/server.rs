//! gRPC `OrderSyncService` and `OrderStreamService` implementation.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tonic::service::interceptor::InterceptedService;
use tonic::{Request, Response, Status};
use tracing::field::{Empty, display};

use super::converters::{
    create_order_from_proto, order_query_from_proto, status_to_proto, update_to_proto,
};
use super::interceptor::{request_id, request_id_interceptor};
use super::proto::order::v1::{
    CreateOrderRequest, CreateOrderResponse, GetOrderStatusRequest, GetOrderStatusResponse,
    OrderUpdate, StreamOrderUpdatesRequest,
    order_stream_service_server::{OrderStreamService, OrderStreamServiceServer},
    order_sync_service_server::{OrderSyncService, OrderSyncServiceServer},
};
use super::status::{invalid_argument, to_status};
use crate::application::OrderServiceError;
use crate::application::services::{OrderLifecycleService, SubscriptionHandle};
use crate::domain;
use crate::infrastructure::metrics;

/// Interceptor function type used by both services.
pub type RequestIdInterceptor = fn(Request<()>) -> Result<Request<()>, Status>;

/// gRPC adapter over [`OrderLifecycleService`].
///
/// Subscriptions opened through this adapter are children of `shutdown`,
/// so cancelling it ends every open stream.
pub struct OrderGrpcServer {
    lifecycle: Arc<OrderLifecycleService>,
    shutdown: CancellationToken,
}

impl OrderGrpcServer {
    /// Create a new adapter.
    #[must_use]
    pub const fn new(lifecycle: Arc<OrderLifecycleService>, shutdown: CancellationToken) -> Self {
        Self {
            lifecycle,
            shutdown,
        }
    }

    /// `OrderSyncService` with request ID propagation.
    #[must_use]
    pub fn sync_service(
        self: &Arc<Self>,
    ) -> InterceptedService<OrderSyncServiceServer<Self>, RequestIdInterceptor> {
        InterceptedService::new(
            OrderSyncServiceServer::from_arc(Arc::clone(self)),
            request_id_interceptor as RequestIdInterceptor,
        )
    }

    /// `OrderStreamService` with request ID propagation.
    #[must_use]
    pub fn stream_service(
        self: &Arc<Self>,
    ) -> InterceptedService<OrderStreamServiceServer<Self>, RequestIdInterceptor> {
        InterceptedService::new(
            OrderStreamServiceServer::from_arc(Arc::clone(self)),
            request_id_interceptor as RequestIdInterceptor,
        )
    }
}

fn create_failure(err: &OrderServiceError) -> Status {
    metrics::record_create_failure(err.reason());
    to_status(err)
}

#[tonic::async_trait]
impl OrderSyncService for OrderGrpcServer {
    #[tracing::instrument(
        name = "grpc.create_order",
        skip_all,
        fields(
            request_id = %request_id(&request),
            user_id = %request.get_ref().user_id,
            market_id = %request.get_ref().market_id,
            order_id = Empty,
        )
    )]
    async fn create_order(
        &self,
        request: Request<CreateOrderRequest>,
    ) -> Result<Response<CreateOrderResponse>, Status> {
        let request_id = request_id(&request).to_string();
        let req = request.into_inner();

        let mut dto = create_order_from_proto(req).map_err(|e| {
            tracing::info!(request_id = %request_id, error = %e, "CreateOrder rejected");
            create_failure(&OrderServiceError::Validation(e))
        })?;
        dto.request_id = Some(request_id.clone());

        match self.lifecycle.create_order(dto).await {
            Ok(created) => {
                tracing::Span::current().record("order_id", display(created.order_id));
                tracing::debug!(
                    request_id = %request_id,
                    order_id = %created.order_id,
                    "CreateOrder completed"
                );
                Ok(Response::new(CreateOrderResponse {
                    order_id: created.order_id.to_string(),
                    status: status_to_proto(created.status).into(),
                }))
            }
            Err(e) => {
                tracing::info!(
                    request_id = %request_id,
                    reason = e.reason(),
                    error = %e,
                    "CreateOrder failed"
                );
                Err(create_failure(&e))
            }
        }
    }

    #[tracing::instrument(
        name = "grpc.get_order_status",
        skip_all,
        fields(
            request_id = %request_id(&request),
            order_id = %request.get_ref().order_id,
            user_id = %request.get_ref().user_id,
            status = Empty,
        )
    )]
    async fn get_order_status(
        &self,
        request: Request<GetOrderStatusRequest>,
    ) -> Result<Response<GetOrderStatusResponse>, Status> {
        let request_id = request_id(&request).to_string();
        let req = request.into_inner();

        let query = order_query_from_proto(&req.order_id, &req.user_id).map_err(invalid_argument)?;
        let status = self.lifecycle.get_order_status(&query).map_err(|e| {
            tracing::info!(
                request_id = %request_id,
                order_id = %query.order_id,
                reason = e.reason(),
                "GetOrderStatus failed"
            );
            to_status(&e)
        })?;
        tracing::Span::current().record("status", display(status));

        Ok(Response::new(GetOrderStatusResponse {
            status: status_to_proto(status).into(),
        }))
    }
}

#[tonic::async_trait]
impl OrderStreamService for OrderGrpcServer {
    type StreamOrderUpdatesStream = OrderUpdatesStream;

    #[tracing::instrument(
        name = "grpc.stream_order_updates",
        skip_all,
        fields(
            request_id = %request_id(&request),
            order_id = %request.get_ref().order_id,
            user_id = %request.get_ref().user_id,
        )
    )]
    async fn stream_order_updates(
        &self,
        request: Request<StreamOrderUpdatesRequest>,
    ) -> Result<Response<Self::StreamOrderUpdatesStream>, Status> {
        let request_id = request_id(&request).to_string();
        let req = request.into_inner();

        let query = order_query_from_proto(&req.order_id, &req.user_id).map_err(invalid_argument)?;
        let subscription = self
            .lifecycle
            .subscribe_to_order_status(query, &self.shutdown)
            .map_err(|e| {
                tracing::info!(
                    request_id = %request_id,
                    order_id = %query.order_id,
                    reason = e.reason(),
                    "StreamOrderUpdates refused"
                );
                to_status(&e)
            })?;

        tracing::info!(
            request_id = %request_id,
            order_id = %query.order_id,
            user_id = %query.user_id,
            "StreamOrderUpdates started"
        );

        let (updates, handle) = subscription.into_parts();
        Ok(Response::new(OrderUpdatesStream {
            updates: ReceiverStream::new(updates),
            _handle: handle,
        }))
    }
}

// =============================================================================
// Response Stream
// =============================================================================

/// Server-streaming response body for `StreamOrderUpdates`.
///
/// Owns the subscription handle: when tonic drops the stream because the
/// client went away, the polling task is cancelled with it.
#[derive(Debug)]
pub struct OrderUpdatesStream {
    updates: ReceiverStream<domain::OrderUpdate>,
    _handle: SubscriptionHandle,
}

impl Stream for OrderUpdatesStream {
    type Item = Result<OrderUpdate, Status>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.updates)
            .poll_next(cx)
            .map(|next| next.map(|update| Ok(update_to_proto(&update))))
    }
}
