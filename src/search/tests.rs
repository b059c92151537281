use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CapacitySearch, SearchState, StepDecision};
use crate::config::SearchConfig;
use crate::error::{CrestError, CrestResult, RunnerError, SearchError};
use crate::runner::{ClientRunner, RunnerState};
use crate::shutdown::shutdown_channel;

fn run_async_test<F>(future: F) -> CrestResult<()>
where
    F: Future<Output = CrestResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| CrestError::search(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn search_config() -> SearchConfig {
    SearchConfig {
        start_count: 0,
        max_concurrency: 1000,
        initial_stride: 100,
        precision: 200,
        settle_time: Duration::from_millis(20),
        adjust_timeout: Duration::from_millis(500),
        ..SearchConfig::default()
    }
}

#[derive(Default)]
struct FakeInner {
    concurrency: u64,
    commanded: Vec<u64>,
    stopped: bool,
    always_adjusting: bool,
}

#[derive(Default)]
struct FakeRunner {
    inner: Mutex<FakeInner>,
}

impl FakeRunner {
    fn unresponsive() -> Self {
        Self {
            inner: Mutex::new(FakeInner {
                always_adjusting: true,
                ..FakeInner::default()
            }),
        }
    }
}

#[async_trait]
impl ClientRunner for FakeRunner {
    async fn set_concurrency(&self, concurrency: u64, _ramp_rate: f64) -> Result<(), RunnerError> {
        let mut inner = self.inner.lock().await;
        inner.concurrency = concurrency;
        inner.commanded.push(concurrency);
        Ok(())
    }

    async fn state(&self) -> RunnerState {
        let inner = self.inner.lock().await;
        if inner.stopped {
            RunnerState::Stopped
        } else if inner.always_adjusting {
            RunnerState::Adjusting
        } else {
            RunnerState::Idle
        }
    }

    async fn stop(&self) -> Result<(), RunnerError> {
        self.inner.lock().await.stopped = true;
        Ok(())
    }
}

#[test]
fn slow_start_doubles_the_stride() -> CrestResult<()> {
    let config = SearchConfig {
        max_concurrency: 10_000,
        precision: 50,
        ..search_config()
    };
    let mut state = SearchState::new(&config);

    let mut targets = Vec::new();
    for _ in 0..3 {
        match state.apply(true, &config) {
            StepDecision::Continue { next, cooldown } => {
                if cooldown {
                    return Err(CrestError::search("Unexpected cooldown on a passed step"));
                }
                targets.push(next);
            }
            decision @ (StepDecision::Converged { .. }
            | StepDecision::Infeasible
            | StepDecision::Capped { .. }) => {
                return Err(CrestError::search(format!(
                    "Unexpected terminal decision {:?}",
                    decision
                )));
            }
        }
    }
    if targets != vec![200, 600, 1400] {
        return Err(CrestError::search(format!(
            "Unexpected slow-start targets {:?}",
            targets
        )));
    }
    Ok(())
}

#[test]
fn boundary_discovery_halves_the_bracket() -> CrestResult<()> {
    let config = SearchConfig {
        max_concurrency: 10_000,
        precision: 50,
        ..search_config()
    };
    let mut state = SearchState::new(&config);

    // Slow-start to 1400 through 0, 200, 600.
    for _ in 0..3 {
        state.apply(true, &config);
    }
    let decision = state.apply(false, &config);
    if state.upper_bound() != Some(1400) || state.lower_bound() != 600 {
        return Err(CrestError::search(format!(
            "Unexpected bracket [{}, {:?}]",
            state.lower_bound(),
            state.upper_bound()
        )));
    }
    if state.stride() != 400 {
        return Err(CrestError::search(format!(
            "Expected the stride to become half the bracket, got {}",
            state.stride()
        )));
    }
    if !matches!(
        decision,
        StepDecision::Continue {
            next: 1000,
            cooldown: true
        }
    ) {
        return Err(CrestError::search(format!(
            "Unexpected decision {:?}",
            decision
        )));
    }
    Ok(())
}

#[test]
fn search_converges_within_precision_of_the_boundary() -> CrestResult<()> {
    let boundary = 550;
    let config = search_config();
    let mut state = SearchState::new(&config);

    let mut lower_seen = 0;
    let mut upper_seen: Option<u64> = None;
    for _ in 0..64 {
        let passed = state.current() < boundary;
        let decision = state.apply(passed, &config);

        if state.lower_bound() < lower_seen {
            return Err(CrestError::search("Lower bound regressed"));
        }
        lower_seen = state.lower_bound();
        if let (Some(previous), Some(current)) = (upper_seen, state.upper_bound()) {
            if current > previous {
                return Err(CrestError::search("Upper bound increased"));
            }
        }
        upper_seen = state.upper_bound();

        match decision {
            StepDecision::Continue { .. } => {}
            StepDecision::Converged { concurrency } => {
                if concurrency.abs_diff(boundary) > config.precision {
                    return Err(CrestError::search(format!(
                        "Converged at {} which is not within {} of {}",
                        concurrency, config.precision, boundary
                    )));
                }
                return Ok(());
            }
            StepDecision::Infeasible | StepDecision::Capped { .. } => {
                return Err(CrestError::search(format!(
                    "Unexpected terminal decision {:?}",
                    decision
                )));
            }
        }
    }
    Err(CrestError::search("Search never reached a terminal state"))
}

#[test]
fn failing_the_first_step_is_infeasible() -> CrestResult<()> {
    let config = SearchConfig {
        start_count: 100,
        ..search_config()
    };
    let mut state = SearchState::new(&config);
    let decision = state.apply(false, &config);
    if !matches!(decision, StepDecision::Infeasible) {
        return Err(CrestError::search(format!(
            "Expected Infeasible, got {:?}",
            decision
        )));
    }
    Ok(())
}

#[test]
fn passing_the_ceiling_caps_the_search() -> CrestResult<()> {
    let config = search_config();
    let mut state = SearchState::new(&config);

    for _ in 0..64 {
        let target = state.current();
        if target > config.max_concurrency {
            return Err(CrestError::search(format!(
                "Commanded {} above the ceiling",
                target
            )));
        }
        match state.apply(true, &config) {
            StepDecision::Continue { .. } => {}
            StepDecision::Capped { concurrency } => {
                if concurrency != config.max_concurrency {
                    return Err(CrestError::search(format!(
                        "Capped at {} instead of the ceiling",
                        concurrency
                    )));
                }
                return Ok(());
            }
            decision @ (StepDecision::Converged { .. } | StepDecision::Infeasible) => {
                return Err(CrestError::search(format!(
                    "Unexpected terminal decision {:?}",
                    decision
                )));
            }
        }
    }
    Err(CrestError::search("Search never reached the ceiling"))
}

#[test]
fn stride_never_refines_below_precision() -> CrestResult<()> {
    let config = SearchConfig {
        max_concurrency: 10_000,
        precision: 50,
        ..search_config()
    };
    let mut state = SearchState::new(&config);

    for _ in 0..3 {
        state.apply(true, &config);
    }
    // Alternate around the boundary; the stride floors at the precision.
    for passed in [false, true, false, true, false] {
        state.apply(passed, &config);
        if state.upper_bound().is_some() && state.stride() < config.precision {
            return Err(CrestError::search(format!(
                "Stride {} fell below precision {}",
                state.stride(),
                config.precision
            )));
        }
    }
    Ok(())
}

#[test]
fn downward_moves_clamp_at_the_proven_lower_bound() -> CrestResult<()> {
    let config = SearchConfig {
        precision: 50,
        ..search_config()
    };
    let mut state = SearchState::new(&config);

    // 0 and 200 pass, proving a lower bound of 200.
    state.apply(true, &config);
    state.apply(true, &config);
    // 600 fails with a bracket of 400; the next target stays at or above 200.
    let decision = state.apply(false, &config);
    match decision {
        StepDecision::Continue { next, .. } => {
            if next < state.lower_bound() {
                return Err(CrestError::search(format!(
                    "Stepped to {} below the proven lower bound {}",
                    next,
                    state.lower_bound()
                )));
            }
            Ok(())
        }
        StepDecision::Converged { .. } | StepDecision::Infeasible | StepDecision::Capped { .. } => {
            Err(CrestError::search(format!(
                "Unexpected terminal decision {:?}",
                decision
            )))
        }
    }
}

#[test]
fn unresponsive_runner_aborts_with_the_fleet_stopped() -> CrestResult<()> {
    run_async_test(async {
        let runner = Arc::new(FakeRunner::unresponsive());
        let config = SearchConfig {
            adjust_timeout: Duration::from_millis(50),
            ..search_config()
        };
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        let search = CapacitySearch::new(config, Arc::clone(&runner), &shutdown_tx);

        let result = search.run().await;
        if !matches!(
            result,
            Err(CrestError::Runner(RunnerError::Unresponsive { .. }))
        ) {
            return Err(CrestError::search(format!(
                "Expected an unresponsive-runner abort, got {:?}",
                result
            )));
        }
        if !runner.inner.lock().await.stopped {
            return Err(CrestError::search("Expected the fleet to be stopped"));
        }
        Ok(())
    })
}

#[test]
fn shutdown_signal_cancels_a_pending_dwell() -> CrestResult<()> {
    run_async_test(async {
        let runner = Arc::new(FakeRunner::default());
        let config = SearchConfig {
            settle_time: Duration::from_secs(30),
            ..search_config()
        };
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        let search = CapacitySearch::new(config, Arc::clone(&runner), &shutdown_tx);

        let signal = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            drop(shutdown_tx.send(()));
        });

        let result = search.run().await;
        signal.await?;
        if !matches!(result, Err(CrestError::Search(SearchError::Cancelled))) {
            return Err(CrestError::search(format!(
                "Expected a cancellation, got {:?}",
                result
            )));
        }
        if !runner.inner.lock().await.stopped {
            return Err(CrestError::search("Expected the fleet to be stopped"));
        }
        Ok(())
    })
}

#[test]
fn invalid_config_is_rejected_before_the_loop() -> CrestResult<()> {
    run_async_test(async {
        let runner = Arc::new(FakeRunner::default());
        let config = SearchConfig {
            precision: 0,
            ..search_config()
        };
        let (shutdown_tx, _shutdown_rx) = shutdown_channel();
        let search = CapacitySearch::new(config, Arc::clone(&runner), &shutdown_tx);

        let result = search.run().await;
        if !matches!(result, Err(CrestError::Config(_))) {
            return Err(CrestError::search(format!(
                "Expected a config rejection, got {:?}",
                result
            )));
        }
        if !runner.inner.lock().await.commanded.is_empty() {
            return Err(CrestError::search(
                "Expected no concurrency command before validation",
            ));
        }
        Ok(())
    })
}
