pub mod binomial;
pub mod black_scholes;

use crate::errors::PricingResult;
use crate::option::OptionSpec;

/// Both pricing engines implement this trait.
/// An engine is built around one OptionSpec plus its own configuration
/// (step count, factor overrides), so callers can swap engines or compare
/// them side by side.
/// price() must be a pure function of the engine's inputs.
/// Send + Sync required so engines can be handed to worker threads.
pub trait PricingModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// The contract being priced. Never mutated by the engine.
    fn option(&self) -> &OptionSpec;

    /// Present value of the contract.
    fn price(&self) -> PricingResult<f64>;
}
