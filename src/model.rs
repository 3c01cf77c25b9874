use crate::config::{Config, ModelConfig};
use crate::utility::{Crra, Utility};
use serde::{Deserialize, Serialize};

/// Equally spaced grid of state values, shared by states and choices.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Grid {
    vals: Vec<f64>,
}

impl Grid {
    /// Create a grid of `len` equally spaced points from `min` to `max` inclusive.
    pub fn linspace(min: f64, max: f64, len: usize) -> Self {
        let step = (max - min) / (len - 1) as f64;
        let mut vals: Vec<_> = (0..len).map(|i| min + step * i as f64).collect();
        // Pin the endpoint so that it is exactly `max`.
        if let Some(last) = vals.last_mut() {
            *last = max;
        }
        Self { vals }
    }

    pub fn len(&self) -> usize {
        self.vals.len()
    }

    pub fn vals(&self) -> &[f64] {
        &self.vals
    }

    /// Find the index of a grid value by exact equality.
    pub fn position(&self, val: f64) -> Option<usize> {
        self.vals.iter().position(|&ele| ele == val)
    }

    /// Index of the grid point closest to `val`.
    pub fn nearest(&self, val: f64) -> usize {
        let mut i_best = 0;
        for (i, &ele) in self.vals.iter().enumerate() {
            if (ele - val).abs() < (self.vals[i_best] - val).abs() {
                i_best = i;
            }
        }
        i_best
    }
}

impl std::ops::Index<usize> for Grid {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.vals[i]
    }
}

/// Primitives of a deterministic savings problem on a grid.
///
/// Choosing next state `grid[j]` in state `i` leaves consumption
/// `resources(i) - grid[j]`.
pub trait Model {
    fn grid(&self) -> &Grid;

    fn beta(&self) -> f64;

    fn sigma(&self) -> f64;

    fn utility(&self) -> &dyn Utility;

    /// Resources available for consumption and saving in state `i`.
    fn resources(&self, i: usize) -> f64;

    /// Production in state `i`, if the model has any.
    fn output(&self, i: usize) -> Option<f64>;

    /// Gross investment when moving from state `i` to `next`, if the model has any.
    fn investment(&self, i: usize, next: f64) -> Option<f64>;

    /// Consumption used to build the initial value function guess.
    fn initial_consumption(&self, i: usize) -> f64;
}

/// Cake-eating problem: the cake `W` is split into consumption and `W'`.
pub struct CakeEating {
    grid: Grid,
    beta: f64,
    sigma: f64,
    utility: Crra,
}

impl CakeEating {
    pub fn new(grid: Grid, beta: f64, sigma: f64) -> Self {
        Self {
            grid,
            beta,
            sigma,
            utility: Crra,
        }
    }
}

impl Model for CakeEating {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn beta(&self) -> f64 {
        self.beta
    }

    fn sigma(&self) -> f64 {
        self.sigma
    }

    fn utility(&self) -> &dyn Utility {
        &self.utility
    }

    fn resources(&self, i: usize) -> f64 {
        self.grid[i]
    }

    fn output(&self, _i: usize) -> Option<f64> {
        None
    }

    fn investment(&self, _i: usize, _next: f64) -> Option<f64> {
        None
    }

    // Eat the whole cake every period.
    fn initial_consumption(&self, i: usize) -> f64 {
        self.grid[i]
    }
}

/// Deterministic growth model with output `k^alpha` and depreciation `delta`.
pub struct Growth {
    grid: Grid,
    beta: f64,
    sigma: f64,
    alpha: f64,
    delta: f64,
    utility: Crra,
}

impl Growth {
    pub fn new(grid: Grid, beta: f64, sigma: f64, alpha: f64, delta: f64) -> Self {
        Self {
            grid,
            beta,
            sigma,
            alpha,
            delta,
            utility: Crra,
        }
    }
}

impl Model for Growth {
    fn grid(&self) -> &Grid {
        &self.grid
    }

    fn beta(&self) -> f64 {
        self.beta
    }

    fn sigma(&self) -> f64 {
        self.sigma
    }

    fn utility(&self) -> &dyn Utility {
        &self.utility
    }

    fn resources(&self, i: usize) -> f64 {
        let k = self.grid[i];
        k.powf(self.alpha) + (1.0 - self.delta) * k
    }

    fn output(&self, i: usize) -> Option<f64> {
        Some(self.grid[i].powf(self.alpha))
    }

    fn investment(&self, i: usize, next: f64) -> Option<f64> {
        Some(next - (1.0 - self.delta) * self.grid[i])
    }

    // Consumption when every state is its own steady state, `k' = k`.
    fn initial_consumption(&self, i: usize) -> f64 {
        let k = self.grid[i];
        k.powf(self.alpha) - self.delta * k
    }
}

/// The model selected by the configuration.
pub enum Economy {
    Cake(CakeEating),
    Growth(Growth),
}

impl Economy {
    /// Build the grid and model described by an already validated config.
    pub fn new(cfg: &Config) -> Self {
        let (min, max) = cfg.grid_bounds();
        let grid = Grid::linspace(min, max, cfg.grid.len);
        match &cfg.model {
            ModelConfig::Cake(cake) => Economy::Cake(CakeEating::new(grid, cake.beta, cake.sigma)),
            ModelConfig::Growth(growth) => Economy::Growth(Growth::new(
                grid,
                growth.beta,
                growth.sigma,
                growth.alpha,
                growth.delta,
            )),
        }
    }

    pub fn as_model(&self) -> &dyn Model {
        match self {
            Economy::Cake(cake) => cake,
            Economy::Growth(growth) => growth,
        }
    }
}
