use crate::config::SearchConfig;

/// What the controller does after a classified step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDecision {
    /// Move to `next` concurrency; `cooldown` asks for a recovery hold first.
    Continue { next: u64, cooldown: bool },
    /// The bracket narrowed to within precision around a proven lower bound.
    Converged { concurrency: u64 },
    /// The target cannot sustain even the configured minimum load.
    Infeasible,
    /// The ceiling was reached without finding a failure boundary.
    Capped { concurrency: u64 },
}

/// Mutable state of the slow-start-then-bisection search.
///
/// The step function is pure and synchronous: the controller classifies a
/// step as pass/fail from the windowed statistics and [`SearchState::apply`]
/// decides bounds, stride, and the next concurrency. Strides double while no
/// upper bound is known and halve (floored at the precision) once one is;
/// on the step that first establishes the boundary the stride is set to half
/// the bracket width so a ceiling-clamped slow-start step cannot leave the
/// stride wider than the bracket.
#[derive(Debug, Clone, Copy)]
pub struct SearchState {
    current: u64,
    stride: u64,
    lower_bound: u64,
    upper_bound: Option<u64>,
    lower_proven: bool,
}

impl SearchState {
    #[must_use]
    pub const fn new(config: &SearchConfig) -> Self {
        Self {
            current: config.start_count,
            stride: config.initial_stride,
            lower_bound: 0,
            upper_bound: None,
            lower_proven: false,
        }
    }

    #[must_use]
    pub const fn current(&self) -> u64 {
        self.current
    }

    #[must_use]
    pub const fn stride(&self) -> u64 {
        self.stride
    }

    #[must_use]
    pub const fn lower_bound(&self) -> u64 {
        self.lower_bound
    }

    #[must_use]
    pub const fn upper_bound(&self) -> Option<u64> {
        self.upper_bound
    }

    /// Folds one classified step into the search state.
    pub fn apply(&mut self, passed: bool, config: &SearchConfig) -> StepDecision {
        let found_boundary = !passed && self.upper_bound.is_none();

        if passed {
            self.lower_bound = self.current;
            self.lower_proven = true;
        } else {
            self.upper_bound = Some(self.current);
        }

        if let Some(upper) = self.upper_bound {
            let bracket = upper.saturating_sub(self.lower_bound);
            if bracket <= config.precision && self.lower_proven {
                return StepDecision::Converged {
                    concurrency: self.lower_bound,
                };
            }
            let halved = if found_boundary {
                bracket.wrapping_div(2)
            } else {
                self.stride.wrapping_div(2)
            };
            self.stride = halved.max(config.precision);
        } else {
            self.stride = self.stride.saturating_mul(2);
        }

        if passed {
            if self.current == config.max_concurrency {
                return StepDecision::Capped {
                    concurrency: config.max_concurrency,
                };
            }
            self.current = self
                .current
                .saturating_add(self.stride)
                .min(config.max_concurrency);
            StepDecision::Continue {
                next: self.current,
                cooldown: false,
            }
        } else {
            let unclamped = self.current.saturating_sub(self.stride);
            if unclamped <= config.start_count && !self.lower_proven {
                return StepDecision::Infeasible;
            }
            self.current = unclamped.max(self.lower_bound);
            StepDecision::Continue {
                next: self.current,
                cooldown: true,
            }
        }
    }
}
