//! Infrastructure Layer - Adapters and external integrations.
//!
//! Concrete implementations of the domain and application ports, plus the
//! process-level plumbing (config, telemetry, metrics, health).

/// Markets cache and the caching validator decorator.
pub mod cache;

/// Configuration loaded from the environment.
pub mod config;

/// gRPC server implementation.
pub mod grpc;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// In-memory order storage.
pub mod persistence;

/// gRPC client for the spot instrument (market validation) service.
pub mod spot_instrument;

/// OpenTelemetry tracing integration.
pub mod telemetry;
