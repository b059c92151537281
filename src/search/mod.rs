//! The capacity search controller and its step state machine.
mod events;
mod state;

#[cfg(test)]
mod tests;

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::{CrestError, CrestResult, RunnerError, SearchError};
use crate::metrics::{SampleAggregator, SampleSink, StatsSnapshot, WindowHandle};
use crate::runner::{ClientRunner, RunnerState};
use crate::shutdown::{ShutdownReceiver, ShutdownSender};

pub use events::{HealthCheck, SearchEvent, StepRecord};
pub use state::{SearchState, StepDecision};

/// Cap on a single steady-state poll of the runner.
const ADJUST_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Terminal result of a completed search. Produced exactly once per run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// The failure boundary was bracketed to within the configured precision.
    Converged { concurrency: u64 },
    /// The target cannot sustain even the configured minimum load.
    Infeasible { reason: String },
    /// The ceiling was exhausted without finding a failure boundary.
    Capped { max_concurrency: u64 },
}

/// Everything `run` hands back: the outcome, the per-step records, and the
/// wall-clock envelope of the run. In-memory only.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub outcome: SearchOutcome,
    pub steps: Vec<StepRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Closed-loop controller that discovers the highest concurrency a target
/// sustains within the configured tail-latency and failure budgets.
///
/// One instance per run: the sample window, counters, and search state are
/// owned here, so parallel runs and tests never share state. Every exit path
/// of [`CapacitySearch::run`] stops the fleet and closes the aggregator.
pub struct CapacitySearch<R> {
    config: SearchConfig,
    runner: R,
    aggregator: SampleAggregator,
    events_tx: Option<mpsc::UnboundedSender<SearchEvent>>,
    shutdown_rx: ShutdownReceiver,
}

impl<R> CapacitySearch<R>
where
    R: ClientRunner,
{
    #[must_use]
    pub fn new(config: SearchConfig, runner: R, shutdown_tx: &ShutdownSender) -> Self {
        Self {
            config,
            runner,
            aggregator: SampleAggregator::spawn(),
            events_tx: None,
            shutdown_rx: shutdown_tx.subscribe(),
        }
    }

    /// Attaches an observer for step and termination events.
    #[must_use]
    pub fn with_events(mut self, events_tx: mpsc::UnboundedSender<SearchEvent>) -> Self {
        self.events_tx = Some(events_tx);
        self
    }

    /// Telemetry ingress for the load engine's delivery path.
    #[must_use]
    pub fn sink(&self) -> SampleSink {
        self.aggregator.sink()
    }

    /// Aggregator handle for fleet batch ingestion.
    #[must_use]
    pub fn window(&self) -> WindowHandle {
        self.aggregator.window()
    }

    /// Runs the search to a terminal state.
    ///
    /// # Errors
    ///
    /// Returns a [`CrestError`] for invalid configuration, an unresponsive or
    /// stopped runner, or cancellation via the shutdown signal. The fleet is
    /// stopped and the aggregator closed before any error is returned.
    pub async fn run(mut self) -> CrestResult<SearchReport> {
        let started_at = Utc::now();
        let mut steps = Vec::new();
        let outcome = self.search_loop(&mut steps).await;

        if let Err(err) = self.runner.stop().await {
            warn!("Failed to stop the runner during shutdown: {}", err);
        }
        if let Err(err) = self.aggregator.close().await {
            warn!("Failed to close the sample aggregator: {}", err);
        }

        let outcome = outcome.map_err(|err| {
            warn!("Search aborted: {}", err);
            err
        })?;
        match &outcome {
            SearchOutcome::Converged { concurrency } => {
                info!("Sweet spot found: the target sustains {} clients.", concurrency);
            }
            SearchOutcome::Infeasible { reason } => warn!("Search infeasible: {}", reason),
            SearchOutcome::Capped { max_concurrency } => {
                info!(
                    "Ceiling of {} clients reached without a failure boundary.",
                    max_concurrency
                );
            }
        }
        emit(&self.events_tx, SearchEvent::Finished(outcome.clone()));

        Ok(SearchReport {
            outcome,
            steps,
            started_at,
            finished_at: Utc::now(),
        })
    }

    async fn search_loop(&mut self, steps: &mut Vec<StepRecord>) -> CrestResult<SearchOutcome> {
        self.config.validate().map_err(CrestError::config)?;
        let mut state = SearchState::new(&self.config);
        let mut step_index: u64 = 0;
        info!(
            "Capacity search started: start {}, ceiling {}, initial stride {}.",
            self.config.start_count, self.config.max_concurrency, self.config.initial_stride
        );

        loop {
            step_index = step_index.saturating_add(1);
            let target = state.current();
            info!(
                "Step #{} will measure {} clients (stride {}, bounds [{}, {}]).",
                step_index,
                target,
                state.stride(),
                state.lower_bound(),
                state
                    .upper_bound()
                    .map_or_else(|| "?".to_owned(), |upper| upper.to_string()),
            );

            self.adjust_to(target).await?;
            debug!(
                "Runner settled at {} clients; holding {:?} for steady state.",
                target, self.config.settle_time
            );
            self.aggregator.reset().await.map_err(CrestError::metrics)?;
            self.hold(self.config.settle_time).await?;

            let snapshot = self
                .aggregator
                .snapshot(self.config.percentile)
                .await
                .map_err(CrestError::metrics)?;
            debug!(
                "Window closed: {} requests, {} samples, p{:.0} {:.1}ms, failure ratio {:.3}.",
                snapshot.requests,
                snapshot.samples,
                self.config.percentile * 100.0,
                snapshot.percentile_ms,
                snapshot.failure_ratio()
            );

            let failed_check = classify(&self.config, &snapshot, target);
            match failed_check {
                Some(HealthCheck::FailureRatio) => warn!(
                    "Step failed; acceptable failure ratio {:.1}% exceeded with {:.1}%.",
                    self.config.acceptable_failure_ratio * 100.0,
                    snapshot.failure_ratio() * 100.0
                ),
                Some(HealthCheck::TailLatency) => warn!(
                    "Step failed; acceptable p{:.0} response time of {:.0}ms exceeded with {:.0}ms.",
                    self.config.percentile * 100.0,
                    self.config.latency_limit_ms,
                    snapshot.percentile_ms
                ),
                Some(HealthCheck::NoTraffic) => warn!(
                    "Step failed; no requests observed at {} clients.",
                    target
                ),
                None => {}
            }

            let passed = failed_check.is_none();
            let decision = state.apply(passed, &self.config);
            let record = StepRecord {
                step: step_index,
                concurrency: target,
                stride: state.stride(),
                lower_bound: state.lower_bound(),
                upper_bound: state.upper_bound(),
                passed,
                failed_check,
                percentile_ms: snapshot.percentile_ms,
                failure_ratio: snapshot.failure_ratio(),
                requests: snapshot.requests,
            };
            info!(
                "Step #{} {}; bounds now [{}, {}].",
                step_index,
                if passed { "passed" } else { "failed" },
                record.lower_bound,
                record
                    .upper_bound
                    .map_or_else(|| "?".to_owned(), |upper| upper.to_string()),
            );
            steps.push(record.clone());
            emit(&self.events_tx, SearchEvent::Step(record));

            match decision {
                StepDecision::Continue { next, cooldown } => {
                    if cooldown {
                        self.cooldown_hold().await?;
                    }
                    debug!("Next step will measure {} clients.", next);
                }
                StepDecision::Converged { concurrency } => {
                    return Ok(SearchOutcome::Converged { concurrency });
                }
                StepDecision::Infeasible => {
                    return Ok(SearchOutcome::Infeasible {
                        reason: "Target can't sustain the configured minimum load; check the \
                                 runner setup and start_count."
                            .to_owned(),
                    });
                }
                StepDecision::Capped { concurrency } => {
                    return Ok(SearchOutcome::Capped {
                        max_concurrency: concurrency,
                    });
                }
            }
        }
    }

    /// Commands the runner and blocks until it leaves the adjusting state,
    /// bounded by `adjust_timeout`.
    async fn adjust_to(&mut self, concurrency: u64) -> CrestResult<()> {
        self.runner
            .set_concurrency(concurrency, self.config.ramp_rate)
            .await
            .map_err(CrestError::runner)?;
        let deadline = Instant::now()
            .checked_add(self.config.adjust_timeout)
            .unwrap_or_else(Instant::now);
        loop {
            match self.runner.state().await {
                RunnerState::Idle => return Ok(()),
                RunnerState::Stopped => return Err(CrestError::runner(RunnerError::Stopped)),
                RunnerState::Adjusting => {}
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(CrestError::runner(RunnerError::Unresponsive {
                    waited: self.config.adjust_timeout,
                    concurrency,
                }));
            }
            let tick = tokio::time::sleep(deadline.duration_since(now).min(ADJUST_POLL_INTERVAL));
            tokio::select! {
                () = shutdown_signal(&mut self.shutdown_rx) => {
                    return Err(CrestError::search(SearchError::Cancelled));
                }
                () = tick => {}
            }
        }
    }

    async fn hold(&mut self, duration: Duration) -> CrestResult<()> {
        tokio::select! {
            () = shutdown_signal(&mut self.shutdown_rx) => {
                Err(CrestError::search(SearchError::Cancelled))
            }
            () = tokio::time::sleep(duration) => Ok(()),
        }
    }

    async fn cooldown_hold(&mut self) -> CrestResult<()> {
        let Some(cooldown_time) = self.config.cooldown_time else {
            return Ok(());
        };
        info!("Initiating cooldown of {:?} to clear congestion.", cooldown_time);
        self.adjust_to(0).await?;
        self.hold(cooldown_time).await?;
        debug!("Cooldown complete; ramping back up.");
        Ok(())
    }
}

/// Health classification of one settle window. `None` means the step passed.
///
/// The failure-ratio check short-circuits the latency check. A window with no
/// requests at nonzero concurrency fails (target health cannot be confirmed);
/// at concurrency zero it passes, covering the bootstrap step of a
/// `start_count = 0` run.
fn classify(
    config: &SearchConfig,
    snapshot: &StatsSnapshot,
    concurrency: u64,
) -> Option<HealthCheck> {
    if snapshot.requests == 0 {
        return (concurrency > 0).then_some(HealthCheck::NoTraffic);
    }
    if snapshot.failure_ratio() > config.acceptable_failure_ratio {
        return Some(HealthCheck::FailureRatio);
    }
    if snapshot.percentile_ms >= config.latency_limit_ms {
        return Some(HealthCheck::TailLatency);
    }
    None
}

fn emit(events_tx: &Option<mpsc::UnboundedSender<SearchEvent>>, event: SearchEvent) {
    if let Some(tx) = events_tx {
        if tx.send(event).is_err() {
            debug!("Search observer went away; dropping progress events.");
        }
    }
}

/// Resolves when a shutdown signal arrives. A closed channel means the sender
/// was dropped without signaling, which is not a cancellation.
async fn shutdown_signal(shutdown_rx: &mut ShutdownReceiver) {
    match shutdown_rx.recv().await {
        Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
        Err(broadcast::error::RecvError::Closed) => std::future::pending::<()>().await,
    }
}
