use crate::errors::PricingResult;
use crate::models::PricingModel;
use crate::option::{OptionSpec, OptionType};
use statrs::distribution::{ContinuousCDF, Normal};

/// Black-Scholes closed form for European exercise.
///
/// call = S0 * Phi(d1) - K * exp(-rT) * Phi(d2)
/// put  = K * exp(-rT) * Phi(-d2) - S0 * Phi(-d1)
///
/// where d1 = (ln(S0/K) + (r + sigma^2/2) * T) / (sigma * sqrt(T))
/// and   d2 = d1 - sigma * sqrt(T)
///
/// There is no guard for sigma = 0: d1 becomes 0/0 or +-inf and the result
/// propagates as a float, the same leniency the lattice has.
#[derive(Debug, Clone)]
pub struct BlackScholesModel {
    option: OptionSpec,
    /// Standard normal distribution (created once, reused)
    normal: Normal,
}

impl BlackScholesModel {
    pub fn new(option: OptionSpec) -> Self {
        Self {
            option,
            normal: Normal::standard(),
        }
    }

    #[inline]
    fn sigma_sqrt_t(&self) -> f64 {
        self.option.volatility() * self.option.maturity().sqrt()
    }

    #[inline]
    pub fn d1(&self) -> f64 {
        let o = &self.option;
        let sigma = o.volatility();
        ((o.spot() / o.strike()).ln() + (o.rate() + 0.5 * sigma * sigma) * o.maturity())
            / self.sigma_sqrt_t()
    }

    #[inline]
    pub fn d2(&self) -> f64 {
        self.d1() - self.sigma_sqrt_t()
    }

    /// Unrounded theoretical price.
    pub fn theoretical_price(&self) -> f64 {
        let o = &self.option;
        let (d1, d2) = (self.d1(), self.d2());
        let discounted_strike = o.strike() * (-o.rate() * o.maturity()).exp();

        match o.option_type() {
            OptionType::Call => o.spot() * self.normal.cdf(d1) - discounted_strike * self.normal.cdf(d2),
            OptionType::Put => discounted_strike * self.normal.cdf(-d2) - o.spot() * self.normal.cdf(-d1),
        }
    }

    /// Theoretical price rounded to cents.
    pub fn calculate_price(&self) -> f64 {
        round_cents(self.theoretical_price())
    }
}

/// Nearest cent of the exact binary value, ties to even. Scaling by 100
/// first would round twice (2.675 is stored as 2.67499..).
/// NaN and infinities pass through unchanged.
fn round_cents(x: f64) -> f64 {
    format!("{x:.2}").parse().unwrap_or(x)
}

impl PricingModel for BlackScholesModel {
    #[inline]
    fn name(&self) -> &'static str {
        "Black-Scholes"
    }

    #[inline]
    fn option(&self) -> &OptionSpec {
        &self.option
    }

    fn price(&self) -> PricingResult<f64> {
        Ok(self.calculate_price())
    }
}
