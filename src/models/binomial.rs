use crate::errors::{PricingError, PricingResult};
use crate::models::PricingModel;
use crate::option::OptionSpec;

/// Cox-Ross-Rubinstein binomial lattice with optional early exercise.
///
/// Three phases, each a precondition for the next:
///   1. calibrate: dt = T/N, u = exp(sigma * sqrt(dt)), d = 1/u (unless both
///      are preset), p = (exp(r*dt) - d) / (u - d)
///   2. build the recombining price lattice S0 * u^j * d^(i-j)
///   3. backward induction from the terminal payoffs, taking
///      max(hold, intrinsic) at every node for American exercise
///
/// p is never clamped. Calibrations with p outside [0, 1] are arbitrage
/// inconsistent; they are logged and priced anyway. sigma = 0 without presets
/// gives u = d = 1 and a non-finite p, which flows into a non-finite price
/// instead of an error.
///
/// The engine owns nothing mutable: every price() call rebuilds both lattices.
#[derive(Debug, Clone)]
pub struct BinomialModel {
    option: OptionSpec,
    steps: usize,
    preset_u: Option<f64>,
    preset_d: Option<f64>,
    exercise: Exercise,
}

/// When the holder may exercise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Exercise {
    /// Any lattice node up to and including expiry.
    #[default]
    American,
    /// Expiry only. Interior nodes always hold.
    European,
}

/// Per-step factors derived from the option and the step count. Stack-allocated, Copy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LatticeCalibration {
    pub steps: usize,
    pub dt: f64,
    pub u: f64,
    pub d: f64,
    /// Risk-neutral up probability
    pub p: f64,
    /// One-step discount factor exp(-r*dt)
    pub discount: f64,
}

impl LatticeCalibration {
    /// True when p is a usable probability. Equivalent to the no-arbitrage
    /// bound d <= exp(r*dt) <= u.
    #[inline]
    pub fn is_arbitrage_free(&self) -> bool {
        self.p.is_finite() && (0.0..=1.0).contains(&self.p)
    }
}

/// Underlying prices on the recombining lattice.
/// Row i holds the i+1 reachable prices after i steps, indexed by the number
/// of up moves j.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceLattice {
    rows: Vec<Vec<f64>>,
}

impl PriceLattice {
    /// price(i, j) = spot * u^j * d^(i-j) for 0 <= j <= i <= steps.
    pub fn build(spot: f64, u: f64, d: f64, steps: usize) -> Self {
        let rows = (0..=steps)
            .map(|i| {
                (0..=i)
                    .map(|j| spot * u.powi(j as i32) * d.powi((i - j) as i32))
                    .collect()
            })
            .collect();
        Self { rows }
    }

    #[inline]
    pub fn steps(&self) -> usize {
        self.rows.len() - 1
    }

    #[inline]
    pub fn price(&self, step: usize, state: usize) -> f64 {
        self.rows[step][state]
    }

    #[inline]
    pub fn row(&self, step: usize) -> &[f64] {
        &self.rows[step]
    }
}

/// Option values on the same shape as a [`PriceLattice`].
#[derive(Debug, Clone, PartialEq)]
pub struct ValueLattice {
    rows: Vec<Vec<f64>>,
    early_exercise_nodes: usize,
}

impl ValueLattice {
    /// Backward induction over `prices`.
    fn induct(
        option: &OptionSpec,
        prices: &PriceLattice,
        calibration: &LatticeCalibration,
        exercise: Exercise,
    ) -> Self {
        let n = prices.steps();
        let p = calibration.p;
        let q = 1.0 - p;
        let discount = calibration.discount;

        let mut rows: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        rows.resize_with(n + 1, Vec::new);
        rows[n] = prices.row(n).iter().map(|&s| option.payoff(s)).collect();

        let mut early_exercise_nodes = 0;
        for i in (0..n).rev() {
            let next = &rows[i + 1];
            let row: Vec<f64> = (0..=i)
                .map(|j| {
                    let hold = discount * (p * next[j + 1] + q * next[j]);
                    match exercise {
                        Exercise::European => hold,
                        Exercise::American => {
                            let intrinsic = option.payoff(prices.price(i, j));
                            // Strict comparison: a NaN continuation stays NaN.
                            if intrinsic > hold {
                                early_exercise_nodes += 1;
                                intrinsic
                            } else {
                                hold
                            }
                        }
                    }
                })
                .collect();
            rows[i] = row;
        }

        Self {
            rows,
            early_exercise_nodes,
        }
    }

    #[inline]
    pub fn root(&self) -> f64 {
        self.rows[0][0]
    }

    #[inline]
    pub fn value(&self, step: usize, state: usize) -> f64 {
        self.rows[step][state]
    }

    #[inline]
    pub fn row(&self, step: usize) -> &[f64] {
        &self.rows[step]
    }

    /// Interior nodes where exercising strictly beat holding.
    #[inline]
    pub fn early_exercise_nodes(&self) -> usize {
        self.early_exercise_nodes
    }
}

/// Output of a full lattice run.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct LatticeValuation {
    pub price: f64,
    pub calibration: LatticeCalibration,
    pub early_exercise_nodes: usize,
}

impl BinomialModel {
    /// `steps` must be >= 1. `preset_u` / `preset_d` must be given together
    /// or not at all (checked at calibration).
    pub fn new(
        option: OptionSpec,
        steps: usize,
        preset_u: Option<f64>,
        preset_d: Option<f64>,
    ) -> PricingResult<Self> {
        if steps < 1 {
            return Err(PricingError::InvalidParameter(
                "binomial steps must be >= 1".into(),
            ));
        }
        Ok(Self {
            option,
            steps,
            preset_u,
            preset_d,
            exercise: Exercise::American,
        })
    }

    pub fn with_exercise(mut self, exercise: Exercise) -> Self {
        self.exercise = exercise;
        self
    }

    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    #[inline]
    pub fn exercise(&self) -> Exercise {
        self.exercise
    }

    /// Phase 1: derive dt, u, d, p.
    pub fn calibrate(&self) -> PricingResult<LatticeCalibration> {
        let dt = self.option.maturity() / self.steps as f64;
        let (u, d) = match (self.preset_u, self.preset_d) {
            (Some(u), Some(d)) => (u, d),
            (None, None) => {
                let u = (self.option.volatility() * dt.sqrt()).exp();
                (u, 1.0 / u)
            }
            (u, d) => {
                return Err(PricingError::InvalidParameter(format!(
                    "up and down factors must be preset together (u={u:?}, d={d:?})"
                )));
            }
        };
        let r = self.option.rate();
        let p = ((r * dt).exp() - d) / (u - d);

        Ok(LatticeCalibration {
            steps: self.steps,
            dt,
            u,
            d,
            p,
            discount: (-r * dt).exp(),
        })
    }

    /// Phase 2: the underlying price lattice for a calibration.
    pub fn price_lattice(&self, calibration: &LatticeCalibration) -> PriceLattice {
        PriceLattice::build(self.option.spot(), calibration.u, calibration.d, self.steps)
    }

    /// Phases 1-3, shared by every pricing path.
    fn run_lattice(&self) -> PricingResult<(LatticeCalibration, ValueLattice)> {
        let calibration = self.calibrate()?;
        if !calibration.is_arbitrage_free() {
            tracing::warn!(
                p = calibration.p,
                u = calibration.u,
                d = calibration.d,
                dt = calibration.dt,
                "risk-neutral probability outside [0, 1]; lattice price is not arbitrage consistent"
            );
        }

        let prices = self.price_lattice(&calibration);
        let values = ValueLattice::induct(&self.option, &prices, &calibration, self.exercise);
        Ok((calibration, values))
    }

    /// Phase 3: option values for every node.
    pub fn value_lattice(&self) -> PricingResult<ValueLattice> {
        Ok(self.run_lattice()?.1)
    }

    /// All three phases, returning the root value with its calibration.
    pub fn valuation(&self) -> PricingResult<LatticeValuation> {
        let (calibration, values) = self.run_lattice()?;
        let price = values.root();

        tracing::debug!(
            steps = self.steps,
            exercise = ?self.exercise,
            price,
            early_exercise_nodes = values.early_exercise_nodes(),
            "lattice priced"
        );

        Ok(LatticeValuation {
            price,
            calibration,
            early_exercise_nodes: values.early_exercise_nodes(),
        })
    }

    /// Present value of the option at the root node.
    pub fn price(&self) -> PricingResult<f64> {
        Ok(self.valuation()?.price)
    }
}

impl PricingModel for BinomialModel {
    #[inline]
    fn name(&self) -> &'static str {
        match self.exercise {
            Exercise::American => "Binomial (American)",
            Exercise::European => "Binomial (European)",
        }
    }

    #[inline]
    fn option(&self) -> &OptionSpec {
        &self.option
    }

    fn price(&self) -> PricingResult<f64> {
        BinomialModel::price(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::OptionType;

    fn spec(option_type: OptionType) -> OptionSpec {
        OptionSpec::new(100.0, 100.0, 0.05, 1.0, 0.2, option_type).unwrap()
    }

    #[test]
    fn test_single_step_hand_calculation() {
        let option = OptionSpec::new(100.0, 100.0, 0.0, 1.0, 0.3, OptionType::Call).unwrap();
        let model = BinomialModel::new(option, 1, None, None).unwrap();

        let u = 0.3_f64.exp();
        let d = 1.0 / u;
        let p = (1.0 - d) / (u - d);
        // r = 0: no discounting, root intrinsic is 0, down payoff is 0
        let expected = p * (100.0 * u - 100.0);

        let cal = model.calibrate().unwrap();
        assert!((cal.u - u).abs() < 1e-15);
        assert!((cal.d - d).abs() < 1e-15);
        assert!((cal.p - p).abs() < 1e-15);

        let prices = model.price_lattice(&cal);
        assert_eq!(prices.steps(), 1);
        assert_eq!(prices.price(0, 0), 100.0);
        assert!((prices.price(1, 0) - 100.0 * d).abs() < 1e-12);
        assert!((prices.price(1, 1) - 100.0 * u).abs() < 1e-12);

        let price = model.price().unwrap();
        assert!((price - expected).abs() < 1e-12, "N=1 price {price} != hand value {expected}");
        assert!((price - 14.888503362331797).abs() < 1e-9, "N=1 price {price}");
    }

    #[test]
    fn test_two_step_put_with_early_exercise() {
        let option = OptionSpec::new(100.0, 90.0, 0.05, 0.5, 0.25, OptionType::Put).unwrap();
        let model = BinomialModel::new(option, 2, None, None).unwrap();
        let valuation = model.valuation().unwrap();
        assert!(
            (valuation.price - 2.735143985851122).abs() < 1e-9,
            "two-step put {}",
            valuation.price
        );
        assert!((valuation.calibration.p - 0.5189736457076524).abs() < 1e-12);
    }

    #[test]
    fn test_price_lattice_shape_and_monotone_rows() {
        let model = BinomialModel::new(spec(OptionType::Call), 10, None, None).unwrap();
        let cal = model.calibrate().unwrap();
        let lattice = model.price_lattice(&cal);
        assert_eq!(lattice.steps(), 10);
        for i in 0..=10 {
            let row = lattice.row(i);
            assert_eq!(row.len(), i + 1, "row {i} must hold i+1 nodes");
            assert!(row.windows(2).all(|w| w[0] <= w[1]), "row {i} not monotone: {row:?}");
        }
        // Recombination: up-then-down lands back on the spot
        assert!((lattice.price(2, 1) - 100.0).abs() < 1e-10);
    }

    #[test]
    fn test_terminal_row_is_payoff() {
        let model = BinomialModel::new(spec(OptionType::Put), 5, None, None).unwrap();
        let cal = model.calibrate().unwrap();
        let prices = model.price_lattice(&cal);
        let values = model.value_lattice().unwrap();
        for j in 0..=5 {
            let expected = (100.0 - prices.price(5, j)).max(0.0);
            assert_eq!(values.value(5, j), expected);
        }
        assert_eq!(values.row(0).len(), 1);
        assert_eq!(values.root(), model.price().unwrap());
    }

    #[test]
    fn test_probability_within_bounds() {
        let option = OptionSpec::new(100.0, 100.0, 0.03, 1.0, 0.2, OptionType::Call).unwrap();
        let cal = BinomialModel::new(option, 50, None, None).unwrap().calibrate().unwrap();
        assert!(cal.p > 0.0 && cal.p < 1.0, "p={} should lie in (0, 1)", cal.p);
        assert!(cal.u > 1.0 && cal.d < 1.0 && cal.d > 0.0);
        assert!(cal.is_arbitrage_free());
        assert!((cal.dt - 0.02).abs() < 1e-15);
    }

    #[test]
    fn test_american_put_at_least_european() {
        for steps in [1, 10, 100, 250] {
            let am = BinomialModel::new(spec(OptionType::Put), steps, None, None).unwrap();
            let eu = am.clone().with_exercise(Exercise::European);
            let am_val = am.valuation().unwrap();
            let eu_val = eu.valuation().unwrap();
            assert!(
                am_val.price >= eu_val.price,
                "N={steps}: American {} < European {}",
                am_val.price,
                eu_val.price
            );
            assert_eq!(eu_val.early_exercise_nodes, 0);
        }
        let am = BinomialModel::new(spec(OptionType::Put), 200, None, None).unwrap();
        let valuation = am.valuation().unwrap();
        assert!(valuation.early_exercise_nodes > 0, "deep ITM put nodes should exercise");
    }

    #[test]
    fn test_american_call_matches_european_without_dividends() {
        let am = BinomialModel::new(spec(OptionType::Call), 200, None, None).unwrap();
        let eu = am.clone().with_exercise(Exercise::European);
        let diff = (am.price().unwrap() - eu.price().unwrap()).abs();
        assert!(diff < 1e-12, "early exercise of a call never pays with r > 0: diff={diff}");
    }

    #[test]
    fn test_straddle_rejected_before_lattice() {
        let err = OptionSpec::parse(100.0, 100.0, 0.05, 1.0, 0.2, "straddle")
            .and_then(|o| BinomialModel::new(o, 10, None, None))
            .and_then(|m| m.price())
            .unwrap_err();
        assert_eq!(err, PricingError::InvalidOptionType("straddle".into()));
    }

    #[test]
    fn test_value_lattice_matches_valuation_on_inconsistent_presets() {
        let option = OptionSpec::new(100.0, 100.0, 0.0, 1.0, 0.2, OptionType::Call).unwrap();
        let model = BinomialModel::new(option, 3, Some(1.1), Some(1.05)).unwrap();
        let values = model.value_lattice().unwrap();
        let valuation = model.valuation().unwrap();
        assert!(!valuation.calibration.is_arbitrage_free());
        assert_eq!(values.root(), valuation.price);
        assert_eq!(values.early_exercise_nodes(), valuation.early_exercise_nodes);
    }

    #[test]
    fn test_rejects_zero_steps() {
        let err = BinomialModel::new(spec(OptionType::Call), 0, None, None).unwrap_err();
        assert!(matches!(err, PricingError::InvalidParameter(_)));
    }

    #[test]
    fn test_rejects_lone_override() {
        let up_only = BinomialModel::new(spec(OptionType::Call), 10, Some(1.1), None).unwrap();
        assert!(matches!(up_only.price(), Err(PricingError::InvalidParameter(_))));

        let down_only = BinomialModel::new(spec(OptionType::Call), 10, None, Some(0.9)).unwrap();
        assert!(matches!(down_only.calibrate(), Err(PricingError::InvalidParameter(_))));
    }

    #[test]
    fn test_preset_factors_used_verbatim() {
        let model = BinomialModel::new(spec(OptionType::Call), 3, Some(1.2), Some(0.9)).unwrap();
        let cal = model.calibrate().unwrap();
        assert_eq!(cal.u, 1.2);
        assert_eq!(cal.d, 0.9);
        assert!((cal.u * cal.d - 1.0).abs() > 0.01, "u*d need not be 1 for presets");
        let prices = model.price_lattice(&cal);
        assert!((prices.price(3, 3) - 100.0 * 1.2_f64.powi(3)).abs() < 1e-10);
    }

    #[test]
    fn test_arbitrage_inconsistent_presets_still_price() {
        // exp(r*dt) = 1 < d: p = (1 - 1.05) / (1.1 - 1.05) = -1
        let option = OptionSpec::new(100.0, 100.0, 0.0, 1.0, 0.2, OptionType::Call).unwrap();
        let model = BinomialModel::new(option, 1, Some(1.1), Some(1.05)).unwrap();
        let valuation = model.valuation().unwrap();
        assert!((valuation.calibration.p + 1.0).abs() < 1e-12, "p={}", valuation.calibration.p);
        assert!(!valuation.calibration.is_arbitrage_free());
        // Not clamped: -1 * 10 + 2 * 5 = 0, intrinsic at root is 0
        assert!(valuation.price.abs() < 1e-12, "price={}", valuation.price);
    }

    #[test]
    fn test_zero_volatility_is_degenerate_not_error() {
        let option = OptionSpec::new(100.0, 100.0, 0.0, 1.0, 0.0, OptionType::Call).unwrap();
        let model = BinomialModel::new(option, 4, None, None).unwrap();
        let cal = model.calibrate().unwrap();
        assert_eq!(cal.u, 1.0);
        assert_eq!(cal.d, 1.0);
        assert!(!cal.is_arbitrage_free());
        let price = model.price().expect("degenerate lattice must not raise");
        assert!(!price.is_finite(), "expected non-finite price, got {price}");
    }

    #[test]
    fn test_price_is_idempotent() {
        let model = BinomialModel::new(spec(OptionType::Put), 75, None, None).unwrap();
        let first = model.price().unwrap();
        let second = model.price().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_trait_object() {
        let model = BinomialModel::new(spec(OptionType::Call), 20, None, None).unwrap();
        let dyn_model: &dyn PricingModel = &model;
        assert_eq!(dyn_model.name(), "Binomial (American)");
        assert_eq!(dyn_model.option(), &spec(OptionType::Call));
        assert_eq!(dyn_model.price().unwrap(), model.price().unwrap());
    }
}
