use crate::config::SimulationConfig;
use crate::model::Model;
use crate::solver::{Production, Solution};
use anyhow::{Context, Result, bail};
use rand::prelude::*;
use rand_chacha::ChaCha12Rng;
use rand_distr::Uniform;
use serde::{Deserialize, Serialize};

/// Deterministic trajectory generated by following a policy.
///
/// Every series has one entry per period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    /// Grid index of the state at the start of each period.
    pub state_idx: Vec<usize>,
    /// State chosen for the following period.
    pub next_state: Vec<f64>,
    /// Consumption in each period.
    pub consumption: Vec<f64>,
    /// Utility of consumption in each period.
    pub utility: Vec<f64>,
    /// Output and investment in each period, for models with production.
    pub production: Option<Production>,
}

/// Simulate `cfg.periods` periods starting from a uniformly drawn grid state.
///
/// The initial state is drawn with a generator seeded from `cfg.seed`, so
/// equal inputs produce identical paths. Each next state is mapped back to
/// its grid index by exact equality, which fails only if the policy holds a
/// value that is not a grid point.
pub fn simulate<M: Model + ?Sized>(
    model: &M,
    sol: &Solution,
    cfg: &SimulationConfig,
) -> Result<Path> {
    let n_state = model.grid().len();
    if sol.next_state.len() != n_state {
        bail!(
            "policy has {} states, but the grid has {n_state}",
            sol.next_state.len()
        );
    }

    let mut rng = ChaCha12Rng::seed_from_u64(cfg.seed);
    let state_dist = Uniform::new(0, n_state)?;
    let i_init = state_dist.sample(&mut rng);
    log::info!("initial state index {i_init} of {n_state}");

    // The state of each period is the choice made in the previous one.
    let mut state_idx = Vec::with_capacity(cfg.periods);
    let mut i_state = i_init;
    for _ in 0..cfg.periods {
        state_idx.push(i_state);
        let next = sol.next_state[i_state];
        i_state = model
            .grid()
            .position(next)
            .with_context(|| format!("next state {next} is not a grid point"))?;
    }

    let next_state = state_idx.iter().map(|&i| sol.next_state[i]).collect();
    let consumption: Vec<f64> = state_idx.iter().map(|&i| sol.consumption[i]).collect();
    let utility = consumption
        .iter()
        .map(|&cons| model.utility().evaluate(cons, model.sigma()))
        .collect();
    let production = sol.production.as_ref().map(|prod| Production {
        output: state_idx.iter().map(|&i| prod.output[i]).collect(),
        investment: state_idx.iter().map(|&i| prod.investment[i]).collect(),
    });

    Ok(Path {
        state_idx,
        next_state,
        consumption,
        utility,
        production,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::model::Economy;
    use crate::solver::solve;

    fn solved(toml: &str) -> (Config, Economy, Solution) {
        let cfg = Config::from_toml(toml).unwrap();
        let economy = Economy::new(&cfg);
        let (sol, _) = solve(economy.as_model(), &cfg.solver);
        (cfg, economy, sol)
    }

    #[test]
    fn path_has_requested_length() {
        let (cfg, economy, sol) =
            solved("[model]\nkind = \"cake\"\n[grid]\nlen = 40\n[simulation]\nperiods = 17\n");
        let path = simulate(economy.as_model(), &sol, &cfg.simulation).unwrap();
        assert_eq!(path.state_idx.len(), 17);
        assert_eq!(path.next_state.len(), 17);
        assert_eq!(path.consumption.len(), 17);
        assert_eq!(path.utility.len(), 17);
        assert!(path.production.is_none());
    }

    #[test]
    fn same_seed_same_path() {
        let (cfg, economy, sol) = solved("[model]\nkind = \"growth\"\n[grid]\nlen = 60\n");
        let model = economy.as_model();
        let path_a = simulate(model, &sol, &cfg.simulation).unwrap();
        let path_b = simulate(model, &sol, &cfg.simulation).unwrap();
        assert_eq!(path_a, path_b);
        for (a, b) in path_a.consumption.iter().zip(&path_b.consumption) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        let production = path_a.production.as_ref().unwrap();
        assert_eq!(production.output.len(), cfg.simulation.periods);
        assert_eq!(production.investment.len(), cfg.simulation.periods);
    }

    #[test]
    fn next_state_round_trips_to_policy_index() {
        let (cfg, economy, sol) = solved("[model]\nkind = \"growth\"\n[grid]\nlen = 60\n");
        let model = economy.as_model();
        let path = simulate(model, &sol, &cfg.simulation).unwrap();

        let i_init = path.state_idx[0];
        assert_eq!(model.grid().position(path.next_state[0]), Some(sol.policy[i_init]));

        // Each period starts where the previous one chose to go.
        for t in 1..path.state_idx.len() {
            assert_eq!(
                model.grid().position(path.next_state[t - 1]),
                Some(path.state_idx[t])
            );
        }
    }

    #[test]
    fn utility_matches_consumption() {
        let (cfg, economy, sol) = solved("[model]\nkind = \"cake\"\n[grid]\nlen = 40\n");
        let model = economy.as_model();
        let path = simulate(model, &sol, &cfg.simulation).unwrap();
        for (&cons, &util) in path.consumption.iter().zip(&path.utility) {
            assert_eq!(util.to_bits(), cons.ln().to_bits());
        }
    }

    #[test]
    fn rejects_mismatched_policy() {
        let (cfg, _, sol) = solved("[model]\nkind = \"cake\"\n[grid]\nlen = 40\n");
        let other = Economy::new(
            &Config::from_toml("[model]\nkind = \"cake\"\n[grid]\nlen = 41\n").unwrap(),
        );
        assert!(simulate(other.as_model(), &sol, &cfg.simulation).is_err());
    }
}
