//! Deadlines around collaborator calls.

use std::future::Future;
use std::time::Duration;

use super::error::StoreError;
use crate::gateway::GatewayError;

pub(crate) async fn gateway_call<T>(
    limit: Duration,
    operation: &str,
    call: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| GatewayError::Timeout {
            operation: operation.to_string(),
            elapsed_ms: millis(limit),
        })?
}

pub(crate) async fn store_call<T>(
    limit: Duration,
    operation: &str,
    call: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, StoreError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::Timeout {
            operation: operation.to_string(),
            elapsed_ms: millis(limit),
        })?
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
