use crate::config::SolverConfig;
use crate::model::Model;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// How the iteration ended. None of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    /// The residual fell to or below the tolerance.
    Converged,
    /// The iteration cap was reached with a finite residual above the tolerance.
    IterationCap,
    /// The residual is not finite, because some state kept (or acquired)
    /// a value of negative infinity during the last sweep.
    NonFinite,
}

/// Observable summary of a solver run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    pub n_iter: usize,
    pub residual: f64,
    pub elapsed_secs: f64,
    pub status: Status,
}

/// Production side of the growth model, indexed like the grid (or like time).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub output: Vec<f64>,
    pub investment: Vec<f64>,
}

/// Converged value and policy functions, indexed like the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    /// Value of each state.
    pub value: Vec<f64>,
    /// Grid index of the optimal next state.
    pub policy: Vec<usize>,
    /// Optimal next state, copied from the grid.
    pub next_state: Vec<f64>,
    /// Consumption implied by the policy.
    pub consumption: Vec<f64>,
    /// Output and investment implied by the policy, for models with production.
    pub production: Option<Production>,
}

/// Initial value function guess: the current consumption forever.
///
/// States with non-positive guess consumption start at negative infinity.
pub fn initial_guess<M: Model + ?Sized>(model: &M) -> Vec<f64> {
    let beta = model.beta();
    let sigma = model.sigma();
    let utility = model.utility();
    (0..model.grid().len())
        .map(|i| {
            let cons = model.initial_consumption(i);
            let val = utility.evaluate(cons.max(0.0), sigma) / (1.0 - beta);
            if cons <= 0.0 { f64::NEG_INFINITY } else { val }
        })
        .collect()
}

/// Apply the Bellman operator once to `v0` by exhaustive search over the grid.
///
/// Returns the updated value function and, for every state, the grid index
/// of the maximizing choice (first one on ties).
pub fn bellman<M: Model + ?Sized>(model: &M, v0: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let grid = model.grid();
    let beta = model.beta();
    let sigma = model.sigma();
    let utility = model.utility();

    let n_state = grid.len();
    let mut v1 = vec![0.0; n_state];
    let mut policy = vec![0; n_state];

    for i_state in 0..n_state {
        let resources = model.resources(i_state);

        // Infeasible choices are evaluated at zero consumption and then masked.
        let vals = grid.vals().iter().zip(v0).map(|(&next, &cont)| {
            let cons = resources - next;
            let val = utility.evaluate(cons.max(0.0), sigma) + beta * cont;
            if cons <= 0.0 { f64::NEG_INFINITY } else { val }
        });

        let (i_choice, val) = argmax(vals);
        v1[i_state] = val;
        policy[i_state] = i_choice;
    }

    (v1, policy)
}

/// Solve the model by value function iteration.
///
/// Iterates while the L2 distance between successive iterates exceeds
/// `cfg.tol` and fewer than `cfg.max_iter` sweeps have been made. The last
/// iterate is returned whether or not the tolerance was met; check
/// [`Diagnostics::status`].
pub fn solve<M: Model + ?Sized>(model: &M, cfg: &SolverConfig) -> (Solution, Diagnostics) {
    let start = Instant::now();

    let mut value = initial_guess(model);
    let mut policy = vec![0; value.len()];
    let mut residual = f64::INFINITY;
    let mut n_iter = 0;

    while residual > cfg.tol && n_iter < cfg.max_iter {
        let (v1, p1) = bellman(model, &value);
        residual = distance(&v1, &value);
        value = v1;
        policy = p1;

        n_iter += 1;
        if n_iter % 25 == 0 {
            log::debug!("iteration {n_iter:5}, residual {residual:e}");
        }
    }

    let status = if residual <= cfg.tol {
        Status::Converged
    } else if residual.is_finite() {
        Status::IterationCap
    } else {
        Status::NonFinite
    };

    let elapsed_secs = start.elapsed().as_secs_f64();
    let diagnostics = Diagnostics {
        n_iter,
        residual,
        elapsed_secs,
        status,
    };

    match status {
        Status::Converged => {
            log::info!(
                "converged in {n_iter} iterations with residual {residual:e} ({elapsed_secs:.3}s)"
            );
        }
        Status::IterationCap => {
            log::warn!("stopped at the iteration cap {n_iter} with residual {residual:e}");
        }
        Status::NonFinite => {
            log::warn!("stopped after {n_iter} iterations with non-finite residual {residual}");
        }
    }

    (derive_solution(model, value, policy), diagnostics)
}

/// Euclidean distance between two value functions.
///
/// Entries that are negative infinity in both make the distance `NaN`.
pub fn distance(v1: &[f64], v0: &[f64]) -> f64 {
    v1.iter()
        .zip(v0)
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

fn derive_solution<M: Model + ?Sized>(
    model: &M,
    mut value: Vec<f64>,
    policy: Vec<usize>,
) -> Solution {
    let grid = model.grid();

    let next_state: Vec<f64> = policy.iter().map(|&i_choice| grid[i_choice]).collect();

    let consumption: Vec<f64> = next_state
        .iter()
        .enumerate()
        .map(|(i_state, &next)| (model.resources(i_state) - next).max(0.0))
        .collect();

    for (val, &cons) in value.iter_mut().zip(&consumption) {
        if cons <= 0.0 {
            *val = f64::NEG_INFINITY;
        }
    }

    let output: Option<Vec<f64>> = (0..grid.len()).map(|i_state| model.output(i_state)).collect();
    let investment: Option<Vec<f64>> = next_state
        .iter()
        .enumerate()
        .map(|(i_state, &next)| model.investment(i_state, next))
        .collect();
    let production = output
        .zip(investment)
        .map(|(output, investment)| Production { output, investment });

    Solution {
        value,
        policy,
        next_state,
        consumption,
        production,
    }
}

fn argmax<I: IntoIterator<Item = f64>>(vals: I) -> (usize, f64) {
    let mut i_max = 0;
    let mut max = f64::NEG_INFINITY;
    for (i, val) in vals.into_iter().enumerate() {
        if val > max {
            i_max = i;
            max = val;
        }
    }
    (i_max, max)
}
