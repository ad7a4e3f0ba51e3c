use crate::errors::{PricingError, PricingResult};
use std::fmt;
use std::str::FromStr;

/// Payoff side of a plain-vanilla contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Intrinsic value at `spot`: max(0, S - K) for calls, max(0, K - S) for puts.
    #[inline]
    pub fn payoff(self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (spot - strike).max(0.0),
            OptionType::Put => (strike - spot).max(0.0),
        }
    }
}

impl FromStr for OptionType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "call" => Ok(OptionType::Call),
            "put" => Ok(OptionType::Put),
            _ => Err(PricingError::InvalidOptionType(s.to_string())),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => f.write_str("call"),
            OptionType::Put => f.write_str("put"),
        }
    }
}

/// Economic terms of one option contract.
///
/// Read-only once built: private fields, no setters. Stack-allocated, Copy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct OptionSpec {
    spot: f64,
    strike: f64,
    rate: f64,
    maturity: f64,
    volatility: f64,
    option_type: OptionType,
}

impl OptionSpec {
    /// Validated constructor.
    ///
    /// * `spot` (S0) and `strike` (K) must be > 0
    /// * `rate` (r) is continuously compounded and may be negative
    /// * `maturity` (T) is in years and must be > 0
    /// * `volatility` (sigma) must be >= 0
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn new(
        spot: f64,
        strike: f64,
        rate: f64,
        maturity: f64,
        volatility: f64,
        option_type: OptionType,
    ) -> PricingResult<Self> {
        // Written as negated comparisons so NaN fails every bound.
        if !(spot > 0.0) || !spot.is_finite() {
            return Err(PricingError::InvalidParameter(format!("spot must be > 0, got {spot}")));
        }
        if !(strike > 0.0) || !strike.is_finite() {
            return Err(PricingError::InvalidParameter(format!("strike must be > 0, got {strike}")));
        }
        if !rate.is_finite() {
            return Err(PricingError::InvalidParameter(format!("rate must be finite, got {rate}")));
        }
        if !(maturity > 0.0) || !maturity.is_finite() {
            return Err(PricingError::InvalidParameter(format!(
                "maturity must be > 0, got {maturity}"
            )));
        }
        if !(volatility >= 0.0) || !volatility.is_finite() {
            return Err(PricingError::InvalidParameter(format!(
                "volatility must be >= 0, got {volatility}"
            )));
        }

        Ok(Self {
            spot,
            strike,
            rate,
            maturity,
            volatility,
            option_type,
        })
    }

    /// Same as [`OptionSpec::new`] but takes the option type as text
    /// (case-insensitive "call" / "put").
    pub fn parse(
        spot: f64,
        strike: f64,
        rate: f64,
        maturity: f64,
        volatility: f64,
        option_type: &str,
    ) -> PricingResult<Self> {
        let option_type = option_type.parse::<OptionType>()?;
        Self::new(spot, strike, rate, maturity, volatility, option_type)
    }

    #[inline]
    pub fn spot(&self) -> f64 {
        self.spot
    }

    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    #[inline]
    pub fn maturity(&self) -> f64 {
        self.maturity
    }

    #[inline]
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    #[inline]
    pub fn option_type(&self) -> OptionType {
        self.option_type
    }

    /// Intrinsic value of this contract if the underlying traded at `spot`.
    #[inline]
    pub fn payoff(&self, spot: f64) -> f64 {
        self.option_type.payoff(spot, self.strike)
    }
}
