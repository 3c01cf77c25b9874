/// Period utility as a function of consumption.
///
/// Implementations perform no validation: zero or negative consumption
/// produces whatever the formula yields (`-inf`, `inf` or `NaN`), and the
/// caller is expected to mask those entries afterwards.
pub trait Utility {
    fn evaluate(&self, cons: f64, sigma: f64) -> f64;
}

/// Constant relative risk aversion utility, with log utility at `sigma == 1`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crra;

impl Utility for Crra {
    fn evaluate(&self, cons: f64, sigma: f64) -> f64 {
        if sigma == 1.0 {
            cons.ln()
        } else {
            cons.powf(1.0 - sigma) / (1.0 - sigma)
        }
    }
}
