//! Single-underlying option pricing: a recombining binomial lattice with
//! early exercise, and the Black-Scholes closed form as its analytic reference.
//!
//! ```
//! use option_lattice::models::binomial::BinomialModel;
//! use option_lattice::models::black_scholes::BlackScholesModel;
//! use option_lattice::option::{OptionSpec, OptionType};
//!
//! let option = OptionSpec::new(100.0, 100.0, 0.05, 1.0, 0.2, OptionType::Put).unwrap();
//! let american = BinomialModel::new(option, 500, None, None).unwrap().price().unwrap();
//! let european = BlackScholesModel::new(option).calculate_price();
//! assert!(american > european);
//! ```

pub mod config;
pub mod convergence;
pub mod errors;
pub mod models;
pub mod option;
pub mod report;
