use crate::convergence::ConvergenceStudy;
use crate::errors::PricingResult;
use crate::models::binomial::{BinomialModel, Exercise, LatticeCalibration};
use crate::models::black_scholes::BlackScholesModel;
use crate::models::PricingModel;
use crate::option::OptionSpec;

/// Side-by-side output of both engines for one contract.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PricingReport {
    pub valued_at: String,
    pub option: OptionSpec,
    pub calibration: LatticeCalibration,
    pub arbitrage_free: bool,
    pub american_price: f64,
    pub european_price: f64,
    /// American minus European lattice price
    pub early_exercise_premium: f64,
    pub early_exercise_nodes: usize,
    pub black_scholes_price: f64,
    pub d1: f64,
    pub d2: f64,
    pub convergence: ConvergenceStudy,
}

impl PricingReport {
    /// Price `lattice` under both exercise styles and pair it with the
    /// closed form for the same contract.
    pub fn build(
        lattice: &BinomialModel,
        convergence: ConvergenceStudy,
        valued_at: String,
    ) -> PricingResult<Self> {
        let american = lattice.clone().with_exercise(Exercise::American).valuation()?;
        let european = lattice.clone().with_exercise(Exercise::European).valuation()?;

        let option = *lattice.option();
        let bs = BlackScholesModel::new(option);

        Ok(Self {
            valued_at,
            option,
            calibration: american.calibration,
            arbitrage_free: american.calibration.is_arbitrage_free(),
            american_price: american.price,
            european_price: european.price,
            early_exercise_premium: american.price - european.price,
            early_exercise_nodes: american.early_exercise_nodes,
            black_scholes_price: bs.calculate_price(),
            d1: bs.d1(),
            d2: bs.d2(),
            convergence,
        })
    }

    pub fn to_json(&self) -> PricingResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
