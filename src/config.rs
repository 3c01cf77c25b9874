use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    ops::{Bound, RangeBounds},
    path::Path,
};

/// Solver and simulation configuration.
///
/// Loaded from a TOML file and validated before use.
/// See [`Config::from_file`] for loading.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Model parameters.
    pub model: ModelConfig,
    /// State grid parameters.
    #[serde(default)]
    pub grid: GridConfig,
    /// Value function iteration parameters.
    #[serde(default)]
    pub solver: SolverConfig,
    /// Simulation parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Model selection and its parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ModelConfig {
    Cake(CakeConfig),
    Growth(GrowthConfig),
}

/// Cake-eating model parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CakeConfig {
    /// Discount factor.
    #[serde(default = "default_cake_beta")]
    pub beta: f64,
    /// Relative risk aversion.
    #[serde(default = "default_cake_sigma")]
    pub sigma: f64,
}

/// Deterministic growth model parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrowthConfig {
    /// Discount factor.
    #[serde(default = "default_growth_beta")]
    pub beta: f64,
    /// Relative risk aversion.
    #[serde(default = "default_growth_sigma")]
    pub sigma: f64,
    /// Capital share of income.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    /// Depreciation rate of capital.
    #[serde(default = "default_delta")]
    pub delta: f64,
}

/// State grid parameters.
///
/// Missing bounds are filled in by the model, see [`Config::grid_bounds`].
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GridConfig {
    /// Number of grid points.
    #[serde(default = "default_grid_len")]
    pub len: usize,
    /// Lower bound of the grid.
    #[serde(default)]
    pub min: Option<f64>,
    /// Upper bound of the grid.
    #[serde(default)]
    pub max: Option<f64>,
}

/// Value function iteration parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    /// Stopping tolerance on the L2 distance between successive iterates.
    #[serde(default = "default_tol")]
    pub tol: f64,
    /// Maximum number of iterations.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
}

/// Simulation parameters.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Seed used to draw the initial state.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Number of simulated periods.
    #[serde(default = "default_periods")]
    pub periods: usize,
}

fn default_cake_beta() -> f64 {
    0.95
}

fn default_cake_sigma() -> f64 {
    1.0
}

fn default_growth_beta() -> f64 {
    0.96
}

fn default_growth_sigma() -> f64 {
    2.0
}

fn default_alpha() -> f64 {
    0.33
}

fn default_delta() -> f64 {
    0.05
}

fn default_grid_len() -> usize {
    300
}

fn default_tol() -> f64 {
    1e-6
}

fn default_max_iter() -> usize {
    10_000
}

fn default_seed() -> u64 {
    2025
}

fn default_periods() -> usize {
    50
}

impl Default for CakeConfig {
    fn default() -> Self {
        Self {
            beta: default_cake_beta(),
            sigma: default_cake_sigma(),
        }
    }
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            beta: default_growth_beta(),
            sigma: default_growth_sigma(),
            alpha: default_alpha(),
            delta: default_delta(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            len: default_grid_len(),
            min: None,
            max: None,
        }
    }
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            tol: default_tol(),
            max_iter: default_max_iter(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            periods: default_periods(),
        }
    }
}

impl GrowthConfig {
    /// Capital stock at which `k' = k` in the deterministic steady state.
    pub fn steady_state_capital(&self) -> f64 {
        (self.alpha / (1.0 / self.beta - 1.0 + self.delta)).powf(1.0 / (1.0 - self.alpha))
    }
}

impl ModelConfig {
    pub fn beta(&self) -> f64 {
        match self {
            ModelConfig::Cake(cake) => cake.beta,
            ModelConfig::Growth(growth) => growth.beta,
        }
    }

    pub fn sigma(&self) -> f64 {
        match self {
            ModelConfig::Cake(cake) => cake.sigma,
            ModelConfig::Growth(growth) => growth.sigma,
        }
    }
}

impl Config {
    /// Load a [`Config`] from a file.
    ///
    /// The file must be TOML-encoded and contain a serialized [`Config`].
    /// Performs validation on all parameters before returning.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    /// Parse and validate a [`Config`] from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents).context("failed to deserialize config")?;

        config.validate().context("failed to validate config")?;

        Ok(config)
    }

    /// Resolve the grid bounds, using the model defaults where unset.
    ///
    /// The cake grid defaults to `[0, 20]`. The capital grid defaults to
    /// `[0.25 kss, 1.75 kss]` around the steady state `kss`.
    pub fn grid_bounds(&self) -> (f64, f64) {
        let (min, max) = match &self.model {
            ModelConfig::Cake(_) => (0.0, 20.0),
            ModelConfig::Growth(growth) => {
                let kss = growth.steady_state_capital();
                (0.25 * kss, 1.75 * kss)
            }
        };
        (self.grid.min.unwrap_or(min), self.grid.max.unwrap_or(max))
    }

    fn validate(&self) -> Result<()> {
        let unit_open = (Bound::Excluded(0.0), Bound::Excluded(1.0));

        check_num(self.model.beta(), unit_open).context("invalid discount factor")?;
        check_num(self.model.sigma(), 1.0..).context("invalid risk aversion")?;

        if let ModelConfig::Growth(growth) = &self.model {
            check_num(growth.alpha, unit_open).context("invalid capital share")?;
            check_num(growth.delta, 0.0..=1.0).context("invalid depreciation rate")?;
        }

        check_num(self.grid.len, 6..).context("invalid grid length")?;
        let (min, max) = self.grid_bounds();
        if !(min.is_finite() && max.is_finite()) {
            bail!("grid bounds must be finite, but are [{min}, {max}]");
        }
        if !(max > min) {
            bail!("grid maximum must exceed grid minimum, but bounds are [{min}, {max}]");
        }

        check_num(self.solver.tol, (Bound::Excluded(0.0), Bound::Excluded(f64::INFINITY)))
            .context("invalid tolerance")?;
        check_num(self.solver.max_iter, 1..).context("invalid maximum number of iterations")?;

        check_num(self.simulation.periods, 1..).context("invalid number of periods")?;

        Ok(())
    }
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;

    #[test]
    fn cake_defaults() {
        let cfg = Config::from_toml("[model]\nkind = \"cake\"\n").unwrap();
        assert_eq!(cfg.model, ModelConfig::Cake(CakeConfig::default()));
        assert_eq!(cfg.grid.len, 300);
        assert_eq!(cfg.grid_bounds(), (0.0, 20.0));
        assert_eq!(cfg.solver.max_iter, 10_000);
        assert_eq!(cfg.simulation.seed, 2025);
        assert_eq!(cfg.simulation.periods, 50);
    }

    #[test]
    fn growth_overrides() {
        let cfg = Config::from_toml(
            "[model]\nkind = \"growth\"\nbeta = 0.9\ndelta = 0.1\n\n[grid]\nlen = 50\n",
        )
        .unwrap();
        let ModelConfig::Growth(growth) = &cfg.model else {
            panic!("expected growth model");
        };
        assert_approx_eq!(f64, growth.beta, 0.9);
        assert_approx_eq!(f64, growth.sigma, 2.0);
        assert_approx_eq!(f64, growth.alpha, 0.33);
        assert_approx_eq!(f64, growth.delta, 0.1);
        assert_eq!(cfg.grid.len, 50);
    }

    #[test]
    fn steady_state_inside_default_grid() {
        let cfg = Config::from_toml("[model]\nkind = \"growth\"\n").unwrap();
        let ModelConfig::Growth(growth) = &cfg.model else {
            panic!("expected growth model");
        };
        let kss = growth.steady_state_capital();
        let (kmin, kmax) = cfg.grid_bounds();
        assert!(kmin < kss && kss < kmax);
        assert_approx_eq!(f64, kmin, 0.25 * kss);
        assert_approx_eq!(f64, kmax, 1.75 * kss);
    }

    #[test]
    fn rejects_invalid_parameters() {
        let invalid = [
            "[model]\nkind = \"cake\"\nbeta = 1.0\n",
            "[model]\nkind = \"cake\"\nbeta = 0.0\n",
            "[model]\nkind = \"cake\"\nsigma = 0.5\n",
            "[model]\nkind = \"growth\"\nalpha = 1.0\n",
            "[model]\nkind = \"growth\"\ndelta = 1.5\n",
            "[model]\nkind = \"cake\"\n[grid]\nlen = 5\n",
            "[model]\nkind = \"cake\"\n[grid]\nmin = 5.0\nmax = 1.0\n",
            "[model]\nkind = \"cake\"\n[grid]\nmax = inf\n",
            "[model]\nkind = \"cake\"\n[grid]\nmin = -inf\n",
            "[model]\nkind = \"cake\"\n[grid]\nmax = nan\n",
            "[model]\nkind = \"cake\"\n[solver]\ntol = 0.0\n",
            "[model]\nkind = \"cake\"\n[solver]\ntol = inf\n",
            "[model]\nkind = \"cake\"\n[simulation]\nperiods = 0\n",
        ];
        for contents in invalid {
            assert!(Config::from_toml(contents).is_err(), "accepted {contents:?}");
        }
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(Config::from_toml("[model]\nkind = \"cake\"\ngamma = 2.0\n").is_err());
        assert!(Config::from_toml("[model]\nkind = \"cake\"\n[grid]\nsize = 10\n").is_err());
        assert!(Config::from_toml("[model]\nkind = \"cake\"\nalpha = 0.3\n").is_err());
        assert!(Config::from_toml("[model]\nkind = \"pie\"\n").is_err());
    }
}
