//! Sync executor.
//!
//! Runs exactly one adapter capability call per request and always yields
//! exactly one [`Outcome`]: adapter errors, panics, timeouts and caller
//! cancellation all become failed outcomes.

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::sync::context::{SyncContext, SyncOperation};
use crate::sync::outcome::Outcome;
use crate::sync::provider::{ProviderAdapter, ProviderError, ProviderRegistry};
use crate::types::Timestamp;

/// Default bound on a single provider call.
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

pub const CANCELLED_MESSAGE: &str = "Sync cancelled before the provider responded";
pub const PANIC_MESSAGE: &str = "Provider adapter failed unexpectedly";

/// Timing and result of one adapter call.
#[derive(Debug, Clone, PartialEq)]
pub struct Execution {
    pub outcome: Outcome,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
    pub duration_ms: i64,
}

/// Invokes the adapter selected by the integration's provider type.
#[derive(Debug, Clone)]
pub struct SyncExecutor {
    registry: ProviderRegistry,
    timeout: Duration,
}

impl SyncExecutor {
    pub fn new(registry: ProviderRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the context's operation. Never fails.
    pub async fn execute(&self, ctx: &SyncContext, cancel: &CancellationToken) -> Execution {
        let started_at = Utc::now();
        let clock = Instant::now();

        let outcome = self.run(ctx, cancel).await;

        let completed_at = Utc::now();
        let duration_ms = i64::try_from(clock.elapsed().as_millis()).unwrap_or(i64::MAX);

        Execution {
            outcome,
            started_at,
            completed_at,
            duration_ms,
        }
    }

    async fn run(&self, ctx: &SyncContext, cancel: &CancellationToken) -> Outcome {
        let integration = &ctx.integration;

        if !integration.is_enabled && !matches!(ctx.operation, SyncOperation::TestConnection) {
            return Outcome::failure(format!("Integration {} is disabled", integration.name));
        }

        let provider_type = integration.provider_type();
        let Some(adapter) = self.registry.get(provider_type) else {
            return Outcome::failure(format!(
                "No adapter registered for provider '{}'",
                provider_type.as_str()
            ));
        };

        let call = AssertUnwindSafe(invoke(adapter.as_ref(), ctx)).catch_unwind();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Outcome::failure(CANCELLED_MESSAGE),
            result = tokio::time::timeout(self.timeout, call) => result,
        };

        match result {
            Ok(Ok(Ok(outcome))) => outcome,
            Ok(Ok(Err(err))) => {
                tracing::warn!(
                    integration_id = %integration.id,
                    provider = provider_type.as_str(),
                    error = %err,
                    "Provider call failed",
                );
                Outcome::failure(err.to_string())
            }
            Ok(Err(_panic)) => {
                tracing::error!(
                    integration_id = %integration.id,
                    provider = provider_type.as_str(),
                    "Provider adapter panicked",
                );
                Outcome::failure(PANIC_MESSAGE)
            }
            Err(_elapsed) => {
                tracing::warn!(
                    integration_id = %integration.id,
                    provider = provider_type.as_str(),
                    timeout_secs = self.timeout.as_secs(),
                    "Provider call timed out",
                );
                Outcome::failure(ProviderError::Timeout(self.timeout).to_string())
            }
        }
    }
}

async fn invoke(adapter: &dyn ProviderAdapter, ctx: &SyncContext) -> Result<Outcome, ProviderError> {
    let integration = &ctx.integration;
    match &ctx.operation {
        SyncOperation::TestConnection => adapter.test_connection(integration).await,
        SyncOperation::Enable(customer) => adapter.enable(integration, customer).await,
        SyncOperation::Disable(customer) => adapter.disable(integration, customer).await,
        SyncOperation::UpdateSpeed(customer) => adapter.update_speed(integration, customer).await,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::customer::CustomerSyncTarget;
    use crate::integration::{Integration, ProviderType};
    use crate::sync::action::TriggerSource;
    use crate::sync::provider::CustomAdapter;
    use crate::sync::test_helpers::{custom_integration, customer, staff_caller};

    /// Custom-typed adapter whose customer calls misbehave on demand.
    enum Misbehaving {
        Slow,
        Panics,
        Errors,
    }

    #[async_trait]
    impl ProviderAdapter for Misbehaving {
        fn provider_type(&self) -> ProviderType {
            ProviderType::Custom
        }

        async fn test_connection(&self, _integration: &Integration) -> Result<Outcome, ProviderError> {
            Ok(Outcome::success("ok"))
        }

        async fn enable(
            &self,
            _integration: &Integration,
            _customer: &CustomerSyncTarget,
        ) -> Result<Outcome, ProviderError> {
            match self {
                Self::Slow => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(Outcome::success("too late"))
                }
                Self::Panics => panic!("adapter bug"),
                Self::Errors => Err(ProviderError::Transport("no route to host".into())),
            }
        }

        async fn disable(
            &self,
            integration: &Integration,
            customer: &CustomerSyncTarget,
        ) -> Result<Outcome, ProviderError> {
            self.enable(integration, customer).await
        }

        async fn update_speed(
            &self,
            integration: &Integration,
            customer: &CustomerSyncTarget,
        ) -> Result<Outcome, ProviderError> {
            self.enable(integration, customer).await
        }
    }

    fn enable_ctx() -> SyncContext {
        let integration = custom_integration();
        SyncContext {
            tenant_id: integration.tenant_id,
            caller: staff_caller(integration.tenant_id),
            integration,
            operation: SyncOperation::Enable(customer("Eve", Some("eve"), None)),
            triggered_by: TriggerSource::Manual,
        }
    }

    fn executor(adapter: Misbehaving, timeout: Duration) -> SyncExecutor {
        SyncExecutor::new(ProviderRegistry::new().with_adapter(Arc::new(adapter)), timeout)
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_yields_failed_outcome() {
        let exec = executor(Misbehaving::Slow, Duration::from_secs(15))
            .execute(&enable_ctx(), &CancellationToken::new())
            .await;

        assert!(!exec.outcome.success);
        assert_eq!(exec.outcome.message, "Provider did not respond within 15 seconds");
    }

    #[tokio::test]
    async fn cancellation_yields_failed_outcome() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let exec = executor(Misbehaving::Slow, Duration::from_secs(15))
            .execute(&enable_ctx(), &cancel)
            .await;

        assert!(!exec.outcome.success);
        assert_eq!(exec.outcome.message, CANCELLED_MESSAGE);
    }

    #[tokio::test]
    async fn panics_are_contained() {
        let exec = executor(Misbehaving::Panics, DEFAULT_PROVIDER_TIMEOUT)
            .execute(&enable_ctx(), &CancellationToken::new())
            .await;

        assert!(!exec.outcome.success);
        assert_eq!(exec.outcome.message, PANIC_MESSAGE);
    }

    #[tokio::test]
    async fn provider_errors_become_their_message() {
        let exec = executor(Misbehaving::Errors, DEFAULT_PROVIDER_TIMEOUT)
            .execute(&enable_ctx(), &CancellationToken::new())
            .await;

        assert_eq!(exec.outcome, Outcome::failure("no route to host"));
        assert!(exec.completed_at >= exec.started_at);
        assert!(exec.duration_ms >= 0);
    }

    #[tokio::test]
    async fn disabled_integration_refuses_customer_actions() {
        let mut ctx = enable_ctx();
        ctx.integration.is_enabled = false;
        let executor = SyncExecutor::new(
            ProviderRegistry::new().with_adapter(Arc::new(CustomAdapter)),
            DEFAULT_PROVIDER_TIMEOUT,
        );

        let exec = executor.execute(&ctx, &CancellationToken::new()).await;
        assert_eq!(exec.outcome.message, format!("Integration {} is disabled", ctx.integration.name));

        ctx.operation = SyncOperation::TestConnection;
        let exec = executor.execute(&ctx, &CancellationToken::new()).await;
        assert!(exec.outcome.success);
    }

    #[tokio::test]
    async fn missing_adapter_is_a_failed_outcome() {
        let exec = SyncExecutor::new(ProviderRegistry::new(), DEFAULT_PROVIDER_TIMEOUT)
            .execute(&enable_ctx(), &CancellationToken::new())
            .await;

        assert_eq!(exec.outcome.message, "No adapter registered for provider 'custom'");
    }
}
