//! Control surface of the load-generating runner, consumed by the search.
use async_trait::async_trait;

use crate::error::RunnerError;

/// Fleet adjustment state reported by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    /// The fleet holds the commanded concurrency.
    Idle,
    /// The fleet is spawning or tearing down simulated clients.
    Adjusting,
    /// The fleet was torn down.
    Stopped,
}

/// The runner's hatch/ramp mechanism, supplied by the embedding load engine.
///
/// `set_concurrency` is asynchronous: it drives the runner into
/// [`RunnerState::Adjusting`], and the controller polls [`ClientRunner::state`]
/// until the fleet settles. Hatch time scales with the concurrency delta, so
/// the controller never assumes a fixed ramp duration.
#[async_trait]
pub trait ClientRunner: Send + Sync {
    /// Commands the fleet toward `concurrency` simulated clients, hatching or
    /// tearing down at `ramp_rate` clients per second.
    ///
    /// # Errors
    ///
    /// Returns a [`RunnerError`] when the command cannot be delivered.
    async fn set_concurrency(&self, concurrency: u64, ramp_rate: f64) -> Result<(), RunnerError>;

    /// Current adjustment state of the fleet.
    async fn state(&self) -> RunnerState;

    /// Tears the fleet down to zero immediately.
    ///
    /// # Errors
    ///
    /// Returns a [`RunnerError`] when teardown fails.
    async fn stop(&self) -> Result<(), RunnerError>;
}

#[async_trait]
impl<R> ClientRunner for std::sync::Arc<R>
where
    R: ClientRunner + ?Sized,
{
    async fn set_concurrency(&self, concurrency: u64, ramp_rate: f64) -> Result<(), RunnerError> {
        self.as_ref().set_concurrency(concurrency, ramp_rate).await
    }

    async fn state(&self) -> RunnerState {
        self.as_ref().state().await
    }

    async fn stop(&self) -> Result<(), RunnerError> {
        self.as_ref().stop().await
    }
}
