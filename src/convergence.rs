use crate::errors::PricingResult;
use crate::models::binomial::{BinomialModel, Exercise};
use crate::models::black_scholes::BlackScholesModel;
use crate::option::OptionSpec;
use smallvec::SmallVec;
use tokio::task::JoinSet;

/// Lattice vs closed-form comparison over a grid of step counts.
///
/// Each row prices the European-restricted lattice, so the reference is the
/// unrounded Black-Scholes value. Error should shrink roughly as 1/N.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConvergenceStudy {
    pub analytic_price: f64,
    pub points: SmallVec<[ConvergencePoint; 8]>,
}

/// One grid point. Stack-allocated, Copy.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct ConvergencePoint {
    pub steps: usize,
    pub lattice_price: f64,
    pub analytic_price: f64,
    pub abs_error: f64,
}

fn price_point(option: OptionSpec, steps: usize, analytic_price: f64) -> PricingResult<ConvergencePoint> {
    let lattice_price = BinomialModel::new(option, steps, None, None)?
        .with_exercise(Exercise::European)
        .price()?;
    Ok(ConvergencePoint {
        steps,
        lattice_price,
        analytic_price,
        abs_error: (lattice_price - analytic_price).abs(),
    })
}

impl ConvergenceStudy {
    /// Price every grid point on the calling thread.
    pub fn run(option: OptionSpec, steps_grid: &[usize]) -> PricingResult<Self> {
        let analytic_price = BlackScholesModel::new(option).theoretical_price();
        let points = steps_grid
            .iter()
            .map(|&steps| price_point(option, steps, analytic_price))
            .collect::<PricingResult<_>>()?;
        Ok(Self {
            analytic_price,
            points,
        })
    }

    /// Price every grid point on its own blocking worker.
    /// Each worker builds an independent engine; rows come back in grid order.
    pub async fn run_parallel(option: OptionSpec, steps_grid: &[usize]) -> PricingResult<Self> {
        let analytic_price = BlackScholesModel::new(option).theoretical_price();

        let mut workers = JoinSet::new();
        for (idx, &steps) in steps_grid.iter().enumerate() {
            workers.spawn_blocking(move || (idx, price_point(option, steps, analytic_price)));
        }

        let mut slots: Vec<Option<ConvergencePoint>> = vec![None; steps_grid.len()];
        while let Some(joined) = workers.join_next().await {
            let (idx, point) = joined?;
            let point = point?;
            tracing::debug!(steps = point.steps, abs_error = point.abs_error, "convergence point priced");
            slots[idx] = Some(point);
        }

        Ok(Self {
            analytic_price,
            points: slots.into_iter().flatten().collect(),
        })
    }

    /// True when absolute error strictly decreases along the grid.
    pub fn is_monotone(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| w[1].abs_error < w[0].abs_error)
    }

    /// Largest absolute error in the study (0 for an empty grid).
    pub fn max_error(&self) -> f64 {
        self.points
            .iter()
            .map(|pt| pt.abs_error)
            .fold(0.0, f64::max)
    }

    /// Error at the finest grid point.
    pub fn final_error(&self) -> Option<f64> {
        self.points.last().map(|pt| pt.abs_error)
    }
}
